//! Identifier classification pre-pass.
//!
//! Runs over a whole unit before anything is translated, so a call can be
//! recognized as "ours" regardless of where in the file its definition sits.

use crate::context::{ClassInfo, Context};
use crate::error::{CompileError, ConstructKind};
use crate::visit;
use stepjs_syntax::{ClassDef, Expr, FunctionDef, Module, ParamKind, Stmt, StmtKind};

/// Record declarations, import bindings and resource filenames of `module`.
pub fn classify(module: &Module, ctx: &mut Context) -> Result<(), CompileError> {
    declare(&module.body, ctx);
    collect_files(&module.body, ctx)?;
    tracing::debug!(
        functions = ctx.functions().count(),
        classes = ctx.classes().count(),
        methods = ctx.methods().count(),
        files = ctx.files().len(),
        "classified unit"
    );
    Ok(())
}

/// Positional parameter names, minus the receiver for methods.
pub(crate) fn signature(def: &FunctionDef, skip_receiver: bool) -> Vec<String> {
    def.params
        .iter()
        .filter(|p| p.kind == ParamKind::Positional)
        .skip(usize::from(skip_receiver))
        .map(|p| p.name.clone())
        .collect()
}

pub(crate) fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

fn declare(stmts: &[Stmt], ctx: &mut Context) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::FunctionDef(def) => {
                ctx.register_function(def.name.as_str());
                ctx.set_function_signature(&def.name, signature(def, false));
                declare(&def.body, ctx);
            }
            StmtKind::ClassDef(class) => declare_class(class, ctx),
            StmtKind::Import(names) => {
                for alias in names {
                    let qualified = match &alias.asname {
                        Some(_) => alias.name.clone(),
                        None => alias.bound_name().to_string(),
                    };
                    ctx.register_import(alias.bound_name(), qualified);
                }
            }
            StmtKind::ImportFrom { module, names } => {
                for alias in names {
                    ctx.register_import(alias.bound_name(), format!("{module}.{}", alias.name));
                }
            }
            StmtKind::For { body, orelse, .. }
            | StmtKind::While { body, orelse, .. }
            | StmtKind::If { body, orelse, .. } => {
                declare(body, ctx);
                declare(orelse, ctx);
            }
            StmtKind::With { body, .. } => declare(body, ctx),
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                declare(body, ctx);
                for handler in handlers {
                    declare(&handler.body, ctx);
                }
                declare(orelse, ctx);
                declare(finalbody, ctx);
            }
            _ => {}
        }
    }
}

fn declare_class(class: &ClassDef, ctx: &mut Context) {
    ctx.register_class(class.name.as_str());

    let mut init_params = None;
    for stmt in &class.body {
        let StmtKind::FunctionDef(def) = &stmt.kind else {
            continue;
        };
        if def.name == "__init__" {
            init_params = Some(signature(def, true));
        } else if !is_dunder(&def.name) {
            ctx.register_method(def.name.as_str());
            ctx.set_method_signature(&def.name, signature(def, true));
        }
        // Functions nested inside methods are ordinary functions.
        declare(&def.body, ctx);
    }

    let info = ClassInfo {
        bases: class.bases.iter().filter_map(Expr::dotted_path).collect(),
        has_init: init_params.is_some(),
    };
    ctx.set_class_info(&class.name, info, init_params);
}

fn collect_files(stmts: &[Stmt], ctx: &mut Context) -> Result<(), CompileError> {
    let mut files = Vec::new();
    let shadowed = ctx.is_our_function("open");
    visit::walk_exprs(stmts, &mut |expr: &Expr, line| {
        let Expr::Call { func, args, .. } = expr else {
            return Ok(());
        };
        if shadowed || func.as_name() != Some("open") {
            return Ok(());
        }
        match args.first().and_then(Expr::as_str_literal) {
            Some(name) => {
                files.push(name.to_string());
                Ok(())
            }
            None => Err(CompileError::unsupported(
                ConstructKind::NonLiteralResource,
                expr.to_string(),
                line,
            )),
        }
    })?;
    for name in &files {
        ctx.add_file(name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepjs_syntax::read_python;

    fn classified(source: &str) -> Context {
        let module = read_python(source).unwrap();
        let mut ctx = Context::new();
        classify(&module, &mut ctx).unwrap();
        ctx
    }

    #[test]
    fn test_records_functions_classes_and_methods() {
        let ctx = classified(
            "class Browser:\n    def __init__(self):\n        pass\n    def load(self, url):\n        def helper():\n            pass\n\ndef main():\n    pass\n",
        );
        assert_eq!(ctx.classes().collect::<Vec<_>>(), vec!["Browser"]);
        assert_eq!(ctx.methods().collect::<Vec<_>>(), vec!["load"]);
        assert_eq!(ctx.functions().collect::<Vec<_>>(), vec!["helper", "main"]);
        assert_eq!(ctx.class_signature("Browser"), Some(&[][..]));
        assert_eq!(ctx.method_signature("load"), Some(&["url".to_string()][..]));
    }

    #[test]
    fn test_definition_order_does_not_matter() {
        let ctx = classified("x = later()\ndef later():\n    return 1\n");
        assert!(ctx.is_our_function("later"));
    }

    #[test]
    fn test_import_bindings() {
        let ctx = classified("import socket\nimport tkinter.font\nfrom urllib.parse import quote\nimport ssl as tls\n");
        assert_eq!(ctx.import_path("socket"), Some("socket"));
        assert_eq!(ctx.import_path("tkinter"), Some("tkinter"));
        assert_eq!(ctx.import_path("quote"), Some("urllib.parse.quote"));
        assert_eq!(ctx.import_path("tls"), Some("ssl"));
    }

    #[test]
    fn test_collects_literal_files() {
        let ctx = classified(
            "def f():\n    with open(\"browser.css\") as f:\n        pass\nopen(\"a.html\")\nopen(\"browser.css\")\n",
        );
        assert_eq!(ctx.files(), ["browser.css", "a.html"]);
    }

    #[test]
    fn test_non_literal_open_fails() {
        let module = read_python("x = 1\nopen(name)\n").unwrap();
        let err = classify(&module, &mut Context::new()).unwrap_err();
        let unsupported = err.as_unsupported().unwrap();
        assert_eq!(unsupported.kind, ConstructKind::NonLiteralResource);
        assert_eq!(unsupported.line, 2);
        assert_eq!(unsupported.construct, "open(name)");
    }
}
