//! Pre-order walks over statements and expressions.

use stepjs_syntax::{Expr, FStringPart, Stmt, StmtKind};

/// Call `f` on every expression in `stmts`, nested blocks included, with the
/// line of the statement that contains it.
pub(crate) fn walk_exprs<E>(
    stmts: &[Stmt],
    f: &mut impl FnMut(&Expr, usize) -> Result<(), E>,
) -> Result<(), E> {
    for stmt in stmts {
        walk_stmt(stmt, f)?;
    }
    Ok(())
}

fn walk_stmt<E>(stmt: &Stmt, f: &mut impl FnMut(&Expr, usize) -> Result<(), E>) -> Result<(), E> {
    let line = stmt.line;
    let visit = |e: &Expr, f: &mut dyn FnMut(&Expr, usize) -> Result<(), E>| walk_expr(e, line, f);
    match &stmt.kind {
        StmtKind::FunctionDef(def) => {
            for expr in &def.decorators {
                visit(expr, f)?;
            }
            for param in &def.params {
                if let Some(default) = &param.default {
                    visit(default, f)?;
                }
            }
            walk_exprs(&def.body, f)
        }
        StmtKind::ClassDef(class) => {
            for expr in class.decorators.iter().chain(&class.bases) {
                visit(expr, f)?;
            }
            walk_exprs(&class.body, f)
        }
        StmtKind::Return(value) | StmtKind::Raise(value) => match value {
            Some(value) => visit(value, f),
            None => Ok(()),
        },
        StmtKind::Assign { targets, value } => {
            for target in targets {
                visit(target, f)?;
            }
            visit(value, f)
        }
        StmtKind::AugAssign { target, value, .. } => {
            visit(target, f)?;
            visit(value, f)
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => {
            visit(target, f)?;
            visit(iter, f)?;
            walk_exprs(body, f)?;
            walk_exprs(orelse, f)
        }
        StmtKind::While { test, body, orelse } | StmtKind::If { test, body, orelse } => {
            visit(test, f)?;
            walk_exprs(body, f)?;
            walk_exprs(orelse, f)
        }
        StmtKind::With { items, body } => {
            for item in items {
                visit(&item.context, f)?;
                if let Some(target) = &item.target {
                    visit(target, f)?;
                }
            }
            walk_exprs(body, f)
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            walk_exprs(body, f)?;
            for handler in handlers {
                if let Some(typ) = &handler.typ {
                    walk_expr(typ, handler.line, f)?;
                }
                walk_exprs(&handler.body, f)?;
            }
            walk_exprs(orelse, f)?;
            walk_exprs(finalbody, f)
        }
        StmtKind::Assert { test, msg } => {
            visit(test, f)?;
            match msg {
                Some(msg) => visit(msg, f),
                None => Ok(()),
            }
        }
        StmtKind::Delete(targets) => {
            for target in targets {
                visit(target, f)?;
            }
            Ok(())
        }
        StmtKind::Expr(expr) => visit(expr, f),
        StmtKind::Import(_)
        | StmtKind::ImportFrom { .. }
        | StmtKind::Global(_)
        | StmtKind::Nonlocal(_)
        | StmtKind::Pass
        | StmtKind::Break
        | StmtKind::Continue => Ok(()),
    }
}

pub(crate) fn walk_expr<E>(
    expr: &Expr,
    line: usize,
    f: &mut dyn FnMut(&Expr, usize) -> Result<(), E>,
) -> Result<(), E> {
    f(expr, line)?;
    let mut children: Vec<&Expr> = Vec::new();
    match expr {
        Expr::Name(_) | Expr::Constant(_) => {}
        Expr::FString(parts) => {
            for part in parts {
                if let FStringPart::Expr(e) = part {
                    children.push(e);
                }
            }
        }
        Expr::Attribute { value, .. } => children.push(value),
        Expr::Call {
            func,
            args,
            keywords,
        } => {
            children.push(func);
            children.extend(args);
            children.extend(keywords.iter().map(|k| &k.value));
        }
        Expr::Subscript { value, index } => {
            children.push(value);
            children.push(index);
        }
        Expr::Slice { lower, upper, step } => {
            children.extend([lower, upper, step].into_iter().flatten().map(|b| &**b));
        }
        Expr::BinOp { left, right, .. } => {
            children.push(left);
            children.push(right);
        }
        Expr::UnaryOp { operand, .. } => children.push(operand),
        Expr::BoolOp { values, .. } => children.extend(values),
        Expr::Compare {
            left, comparators, ..
        } => {
            children.push(left);
            children.extend(comparators);
        }
        Expr::List(items) | Expr::Tuple(items) | Expr::Set(items) => children.extend(items),
        Expr::Dict(pairs) => {
            for (key, value) in pairs {
                children.push(key);
                children.push(value);
            }
        }
        Expr::Comprehension {
            elt,
            value,
            generators,
            ..
        } => {
            children.push(elt);
            if let Some(value) = value {
                children.push(value);
            }
            for generator in generators {
                children.push(&generator.target);
                children.push(&generator.iter);
                children.extend(&generator.ifs);
            }
        }
        Expr::IfExp { test, body, orelse } => {
            children.push(test);
            children.push(body);
            children.push(orelse);
        }
        Expr::Lambda { params, body } => {
            children.extend(params.iter().filter_map(|p| p.default.as_ref()));
            children.push(body);
        }
        Expr::Starred(value) => children.push(value),
    }
    for child in children {
        walk_expr(child, line, f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepjs_syntax::read_python;

    #[test]
    fn test_visits_nested_calls_with_lines() {
        let module = read_python("def f():\n    if x:\n        g(h(1))\n").unwrap();
        let mut calls = Vec::new();
        walk_exprs(&module.body, &mut |e: &Expr, line| {
            if let Expr::Call { func, .. } = e {
                calls.push((func.as_name().unwrap_or("?").to_string(), line));
            }
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(calls, vec![("g".to_string(), 3), ("h".to_string(), 3)]);
    }

    #[test]
    fn test_stops_at_first_error() {
        let module = read_python("a(1)\nb(2)\n").unwrap();
        let mut seen = 0;
        let result = walk_exprs(&module.body, &mut |e: &Expr, line| {
            if matches!(e, Expr::Call { .. }) {
                seen += 1;
                return Err(line);
            }
            Ok(())
        });
        assert_eq!(result, Err(1));
        assert_eq!(seen, 1);
    }
}
