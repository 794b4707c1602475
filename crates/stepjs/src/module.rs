//! Whole-unit compilation.

use crate::classify;
use crate::context::Context;
use crate::emit;
use crate::error::CompileError;
use crate::scope;
use crate::stmt::Translator;
use stepjs_syntax::{Module, StmtKind, read_python};

/// Output shape of a compiled unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// When set, helpers and library bindings are imported from this module.
    pub runtime_module: Option<String>,
    /// Append an `export { ... }` list of top-level declarations.
    pub exports: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            runtime_module: None,
            exports: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    pub code: String,
    /// Literal resource names passed to `open`, in first-seen order.
    pub files: Vec<String>,
}

/// Compile a parsed unit.
///
/// `ctx` may carry pre-registered declarations; it is extended with
/// everything the unit declares.
#[tracing::instrument(skip_all, fields(statements = module.body.len()))]
pub fn compile_module(
    module: &Module,
    ctx: &mut Context,
    options: &CompileOptions,
) -> Result<CompiledModule, CompileError> {
    classify::classify(module, ctx)?;

    let locals = scope::local_bindings(&module.body, &[], ctx, true);
    let mut translator = Translator::new(ctx);
    translator.stmts(&module.body)?;
    let body = translator.finish();

    let mut code = String::new();
    if let Some(runtime) = &options.runtime_module {
        let mut names: Vec<&str> = ctx.helpers().collect();
        names.extend(ctx.imports());
        names.sort_unstable();
        names.dedup();
        if !names.is_empty() {
            code.push_str(&emit::runtime_import(&names, runtime));
            code.push('\n');
        }
    }
    if !locals.is_empty() {
        let names: Vec<String> = locals.iter().map(|n| emit::identifier(n)).collect();
        code.push_str(&emit::let_decl(&names));
        code.push('\n');
    }
    code.push_str(&body);
    if options.exports {
        let exported = top_level_declarations(module);
        if !exported.is_empty() {
            code.push_str(&emit::export_list(&exported));
            code.push('\n');
        }
    }

    tracing::info!(
        bytes = code.len(),
        files = ctx.files().len(),
        helpers = ctx.helpers().count(),
        "compiled unit"
    );
    Ok(CompiledModule {
        code,
        files: ctx.files().to_vec(),
    })
}

/// Read and compile dialect source.
pub fn compile_source(
    source: &str,
    ctx: &mut Context,
    options: &CompileOptions,
) -> Result<CompiledModule, CompileError> {
    let module = read_python(source)?;
    compile_module(&module, ctx, options)
}

fn top_level_declarations(module: &Module) -> Vec<String> {
    module
        .body
        .iter()
        .filter_map(|stmt| match &stmt.kind {
            StmtKind::FunctionDef(def) => Some(emit::identifier(&def.name)),
            StmtKind::ClassDef(class) => Some(emit::identifier(&class.name)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str, options: &CompileOptions) -> CompiledModule {
        compile_source(source, &mut Context::new(), options).unwrap()
    }

    #[test]
    fn test_module_locals_are_hoisted() {
        let out = compile("x = 1\nx = x + 1\ny = x\n", &CompileOptions::default());
        assert_eq!(out.code, "let x, y;\nx = 1;\nx = x + 1;\ny = x;\n");
    }

    #[test]
    fn test_runtime_import_lists_helpers_and_bindings() {
        let options = CompileOptions {
            runtime_module: Some("./runtime.js".into()),
            exports: false,
        };
        let out = compile("import socket\nif s:\n    s = socket.socket()\n", &options);
        assert_eq!(
            out.code,
            "import { socket, truthy } from \"./runtime.js\";\nlet s;\nif (truthy(s)) s = new socket.socket();\n"
        );
    }

    #[test]
    fn test_exports_top_level_declarations() {
        let out = compile(
            "def lex(body):\n    return body\nclass Browser:\n    pass\n",
            &CompileOptions::default(),
        );
        assert!(out.code.ends_with("export { lex, Browser };\n"));
    }

    #[test]
    fn test_files_are_reported() {
        let out = compile(
            "a = open(\"x.html\")\nb = open(\"y.css\")\n",
            &CompileOptions::default(),
        );
        assert_eq!(out.files, vec!["x.html", "y.css"]);
    }
}
