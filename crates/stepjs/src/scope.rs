//! First-binding analysis.
//!
//! Python binds locals per function; JavaScript needs a declaration. Every
//! plain name a body binds is declared once, in first-binding order, by a
//! single `let` at the top of that body. Bindings themselves carry no keyword.

use crate::context::Context;
use stepjs_syntax::{Expr, Stmt, StmtKind};

/// Names to declare at the top of `body`.
///
/// `params` are already declared by the enclosing function. Inside a
/// function only that body's own nested declarations are excluded. With
/// `module_scope`, ours declarations and import bindings are excluded too,
/// and an entry-point guard block is skipped because it is never emitted.
pub(crate) fn local_bindings(
    body: &[Stmt],
    params: &[String],
    ctx: &Context,
    module_scope: bool,
) -> Vec<String> {
    let mut collector = Collector {
        module_scope,
        bound: Vec::new(),
        excluded: params.to_vec(),
    };
    collector.stmts(body);

    collector
        .bound
        .into_iter()
        .filter(|name| {
            if collector.excluded.contains(name) {
                return false;
            }
            !module_scope
                || !(ctx.is_our_function(name)
                    || ctx.is_our_class(name)
                    || ctx.import_path(name).is_some())
        })
        .collect()
}

/// `if __name__ == "__main__":`
pub(crate) fn is_main_guard(test: &Expr) -> bool {
    let Expr::Compare {
        left,
        ops,
        comparators,
    } = test
    else {
        return false;
    };
    left.as_name() == Some("__name__")
        && ops.len() == 1
        && comparators.first().and_then(Expr::as_str_literal) == Some("__main__")
}

struct Collector {
    module_scope: bool,
    bound: Vec<String>,
    excluded: Vec<String>,
}

impl Collector {
    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    self.target(target);
                }
            }
            StmtKind::AugAssign { target, .. } => self.target(target),
            StmtKind::For {
                target,
                body,
                orelse,
                ..
            } => {
                self.target(target);
                self.stmts(body);
                self.stmts(orelse);
            }
            StmtKind::With { items, body } => {
                for item in items {
                    if let Some(target) = &item.target {
                        self.target(target);
                    }
                }
                self.stmts(body);
            }
            StmtKind::If { test, .. } if self.module_scope && is_main_guard(test) => {}
            StmtKind::While { body, orelse, .. } | StmtKind::If { body, orelse, .. } => {
                self.stmts(body);
                self.stmts(orelse);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.stmts(body);
                for handler in handlers {
                    self.stmts(&handler.body);
                }
                self.stmts(orelse);
                self.stmts(finalbody);
            }
            StmtKind::FunctionDef(def) => self.excluded.push(def.name.clone()),
            StmtKind::ClassDef(class) => self.excluded.push(class.name.clone()),
            StmtKind::Global(names) | StmtKind::Nonlocal(names) => {
                self.excluded.extend(names.iter().cloned());
            }
            _ => {}
        }
    }

    fn target(&mut self, target: &Expr) {
        match target {
            Expr::Name(name) => {
                if !self.bound.contains(name) {
                    self.bound.push(name.clone());
                }
            }
            Expr::Tuple(items) | Expr::List(items) => {
                for item in items {
                    self.target(item);
                }
            }
            Expr::Starred(inner) => self.target(inner),
            _ => {}
        }
    }
}
