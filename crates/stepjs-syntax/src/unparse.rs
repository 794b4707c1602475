//! Render expressions back as dialect source, for diagnostics.
//!
//! Output is valid source for the expression but not byte-identical to what
//! was read: nested compound operands are always parenthesized and strings
//! use double quotes.

use crate::ast::{BinOp, BoolOp, CmpOp, ComprehensionKind, Constant, Expr, FStringPart, Param, ParamKind, UnaryOp};
use std::fmt;

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
        }
    }
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => f.write_str("None"),
            Constant::Bool(true) => f.write_str("True"),
            Constant::Bool(false) => f.write_str("False"),
            Constant::Int(n) => write!(f, "{n}"),
            Constant::Float(x) => write!(f, "{x:?}"),
            Constant::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(name) => f.write_str(name),
            Expr::Constant(c) => write!(f, "{c}"),
            Expr::FString(parts) => {
                f.write_str("f\"")?;
                for part in parts {
                    match part {
                        FStringPart::Literal(text) => {
                            f.write_str(&text.replace('{', "{{").replace('}', "}}"))?
                        }
                        FStringPart::Expr(e) => write!(f, "{{{e}}}")?,
                    }
                }
                f.write_str("\"")
            }
            Expr::Attribute { value, attr } => write!(f, "{}.{attr}", Operand(value)),
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                write!(f, "{}(", Operand(func))?;
                let mut first = true;
                for arg in args {
                    separator(f, &mut first)?;
                    write!(f, "{arg}")?;
                }
                for kw in keywords {
                    separator(f, &mut first)?;
                    match &kw.name {
                        Some(name) => write!(f, "{name}={}", kw.value)?,
                        None => write!(f, "**{}", kw.value)?,
                    }
                }
                f.write_str(")")
            }
            Expr::Subscript { value, index } => write!(f, "{}[{index}]", Operand(value)),
            Expr::Slice { lower, upper, step } => {
                if let Some(lower) = lower {
                    write!(f, "{lower}")?;
                }
                f.write_str(":")?;
                if let Some(upper) = upper {
                    write!(f, "{upper}")?;
                }
                if let Some(step) = step {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
            Expr::BinOp { left, op, right } => {
                write!(f, "{} {} {}", Operand(left), op.symbol(), Operand(right))
            }
            Expr::UnaryOp { op, operand } => match op {
                UnaryOp::Not => write!(f, "not {}", Operand(operand)),
                UnaryOp::Neg => write!(f, "-{}", Operand(operand)),
                UnaryOp::Pos => write!(f, "+{}", Operand(operand)),
                UnaryOp::Invert => write!(f, "~{}", Operand(operand)),
            },
            Expr::BoolOp { op, values } => {
                let word = match op {
                    BoolOp::And => " and ",
                    BoolOp::Or => " or ",
                };
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(word)?;
                    }
                    write!(f, "{}", Operand(value))?;
                }
                Ok(())
            }
            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                write!(f, "{}", Operand(left))?;
                for (op, right) in ops.iter().zip(comparators) {
                    write!(f, " {} {}", op.symbol(), Operand(right))?;
                }
                Ok(())
            }
            Expr::List(items) => sequence(f, "[", items, "]"),
            Expr::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            Expr::Tuple(items) => sequence(f, "(", items, ")"),
            Expr::Set(items) => sequence(f, "{", items, "}"),
            Expr::Dict(pairs) => {
                f.write_str("{")?;
                let mut first = true;
                for (key, value) in pairs {
                    separator(f, &mut first)?;
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Expr::Comprehension {
                kind,
                elt,
                value,
                generators,
            } => {
                let (open, close) = match kind {
                    ComprehensionKind::List => ("[", "]"),
                    ComprehensionKind::Set | ComprehensionKind::Dict => ("{", "}"),
                    ComprehensionKind::Generator => ("(", ")"),
                };
                f.write_str(open)?;
                write!(f, "{elt}")?;
                if let Some(value) = value {
                    write!(f, ": {value}")?;
                }
                for generator in generators {
                    write!(f, " for {} in {}", generator.target, Operand(&generator.iter))?;
                    for cond in &generator.ifs {
                        write!(f, " if {}", Operand(cond))?;
                    }
                }
                f.write_str(close)
            }
            Expr::IfExp { test, body, orelse } => write!(
                f,
                "{} if {} else {}",
                Operand(body),
                Operand(test),
                Operand(orelse)
            ),
            Expr::Lambda { params, body } => {
                f.write_str("lambda")?;
                let mut first = true;
                for param in params {
                    if first {
                        f.write_str(" ")?;
                    }
                    separator(f, &mut first)?;
                    write!(f, "{}", ParamDisplay(param))?;
                }
                write!(f, ": {body}")
            }
            Expr::Starred(value) => write!(f, "*{}", Operand(value)),
        }
    }
}

/// An operand position: compound expressions get parentheses.
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expr::BinOp { .. }
            | Expr::BoolOp { .. }
            | Expr::Compare { .. }
            | Expr::IfExp { .. }
            | Expr::Lambda { .. }
            | Expr::UnaryOp {
                op: UnaryOp::Not, ..
            } => write!(f, "({})", self.0),
            other => write!(f, "{other}"),
        }
    }
}

struct ParamDisplay<'a>(&'a Param);

impl fmt::Display for ParamDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.0.kind {
            ParamKind::Positional => "",
            ParamKind::VarArgs => "*",
            ParamKind::KwArgs => "**",
        };
        write!(f, "{prefix}{}", self.0.name)?;
        if let Some(default) = &self.0.default {
            write!(f, "={default}")?;
        }
        Ok(())
    }
}

fn separator(f: &mut fmt::Formatter<'_>, first: &mut bool) -> fmt::Result {
    if !*first {
        f.write_str(", ")?;
    }
    *first = false;
    Ok(())
}

fn sequence(f: &mut fmt::Formatter<'_>, open: &str, items: &[Expr], close: &str) -> fmt::Result {
    f.write_str(open)?;
    let mut first = true;
    for item in items {
        separator(f, &mut first)?;
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

#[cfg(test)]
mod tests {
    use crate::python::read_python;
    use crate::ast::StmtKind;

    fn roundtrip(source: &str) -> String {
        let module = read_python(source).unwrap();
        match &module.body[0].kind {
            StmtKind::Expr(e) => e.to_string(),
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_chained_comparison() {
        assert_eq!(roundtrip("a < b < c"), "a < b < c");
    }

    #[test]
    fn test_nested_operands_are_parenthesized() {
        assert_eq!(roundtrip("(a + b) * c"), "(a + b) * c");
        assert_eq!(roundtrip("not x in y"), "not (x in y)");
    }

    #[test]
    fn test_calls_and_collections() {
        assert_eq!(
            roundtrip("sorted(xs, key=len, reverse=True)"),
            "sorted(xs, key=len, reverse=True)"
        );
        assert_eq!(roundtrip("[x for x in xs if x]"), "[x for x in xs if x]");
        assert_eq!(roundtrip("{'a': 1}"), "{\"a\": 1}");
    }
}
