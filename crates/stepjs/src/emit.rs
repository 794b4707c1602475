//! JavaScript syntax fragments.
//!
//! Every piece of target syntax the translators produce is built here, so the
//! translators and the declaration tables never spell out JavaScript by hand.
//! Compound expressions come back parenthesized; [`unwrap_parens`] strips the
//! outer pair where the surrounding syntax already delimits the expression.

use std::fmt::Write;

pub const TRUTHY: &str = "truthy";
pub const COMPARATOR: &str = "comparator";
pub const PYSPLIT: &str = "pysplit";
pub const PYRSPLIT: &str = "pyrsplit";
pub const FILESYSTEM: &str = "filesystem";
pub const BREAKPOINT: &str = "breakpoint";

/// Name of the suspension-capable initializer that replaces `__init__`.
pub const INIT_METHOD: &str = "init";

const RESERVED: &[&str] = &[
    "arguments", "await", "case", "catch", "const", "debugger", "default", "delete", "do",
    "enum", "eval", "export", "extends", "function", "instanceof", "let", "new", "switch",
    "this", "throw", "typeof", "var", "void", "with", "yield",
];

// ---------------------------------------------------------------------------
// Atoms
// ---------------------------------------------------------------------------

/// A Python identifier as a JavaScript identifier.
pub fn identifier(name: &str) -> String {
    if RESERVED.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

pub fn this() -> String {
    "this".to_string()
}

pub fn super_ref() -> String {
    "super".to_string()
}

pub fn null() -> String {
    "null".to_string()
}

pub fn undefined() -> String {
    "undefined".to_string()
}

pub fn boolean(value: bool) -> String {
    value.to_string()
}

pub fn int(value: i64) -> String {
    value.to_string()
}

pub fn float(value: f64) -> String {
    format!("{value:?}")
}

pub fn string(value: &str) -> String {
    // JSON string syntax is valid JavaScript string syntax.
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.escape_default()))
}

pub enum TemplatePiece {
    Text(String),
    Value(String),
}

pub fn template(pieces: &[TemplatePiece]) -> String {
    let mut out = String::from("`");
    for piece in pieces {
        match piece {
            TemplatePiece::Text(text) => {
                for c in text.chars() {
                    match c {
                        '`' => out.push_str("\\`"),
                        '\\' => out.push_str("\\\\"),
                        '$' => out.push_str("\\$"),
                        _ => out.push(c),
                    }
                }
            }
            TemplatePiece::Value(value) => {
                let _ = write!(out, "${{{}}}", unwrap_parens(value));
            }
        }
    }
    out.push('`');
    out
}

// ---------------------------------------------------------------------------
// Calls, members, subscripts
// ---------------------------------------------------------------------------

fn arg_list(args: &[String]) -> String {
    args.iter()
        .map(|a| unwrap_parens(a))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn call(callee: &str, args: &[String]) -> String {
    format!("{callee}({})", arg_list(args))
}

pub fn method_call(receiver: &str, method: &str, args: &[String]) -> String {
    format!("{receiver}.{method}({})", arg_list(args))
}

pub fn new_instance(class: &str, args: &[String]) -> String {
    format!("new {class}({})", arg_list(args))
}

/// Wrap a call in the suspension operator.
pub fn suspend(call: &str) -> String {
    format!("(await {call})")
}

pub fn member(object: &str, attr: &str) -> String {
    format!("{object}.{attr}")
}

pub fn index(object: &str, index: &str) -> String {
    format!("{object}[{}]", unwrap_parens(index))
}

pub fn last_element(object: &str) -> String {
    format!("{object}[{object}.length - 1]")
}

pub fn slice(object: &str, lower: Option<&str>, upper: Option<&str>) -> String {
    match (lower, upper) {
        (None, None) => format!("{object}.slice()"),
        (Some(lower), None) => format!("{object}.slice({})", unwrap_parens(lower)),
        (lower, Some(upper)) => format!(
            "{object}.slice({}, {})",
            lower.map(unwrap_parens).unwrap_or("0"),
            unwrap_parens(upper)
        ),
    }
}

pub fn length(object: &str) -> String {
    format!("{object}.length")
}

pub fn spread(value: &str) -> String {
    format!("...{value}")
}

/// Keyword arguments of a library call, as a trailing options object.
pub fn options_object(pairs: &[(Option<String>, String)]) -> String {
    let fields: Vec<String> = pairs
        .iter()
        .map(|(name, value)| match name {
            Some(name) => format!("{}: {}", object_key(name), unwrap_parens(value)),
            None => spread(value),
        })
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

pub fn binary(left: &str, op: &str, right: &str) -> String {
    format!("({left} {op} {right})")
}

pub fn floor_div(left: &str, right: &str) -> String {
    format!("Math.floor({} / {})", left, right)
}

pub fn repeat(text: &str, count: &str) -> String {
    format!("{text}.repeat({})", unwrap_parens(count))
}

pub fn unary(op: &str, operand: &str) -> String {
    format!("({op}{operand})")
}

pub fn not(operand: &str) -> String {
    format!("(!{operand})")
}

pub fn truthy(value: &str) -> String {
    format!("{TRUTHY}({})", unwrap_parens(value))
}

pub fn logical(op: &str, values: &[String]) -> String {
    format!("({})", values.join(&format!(" {op} ")))
}

pub fn strict_eq(left: &str, right: &str, negate: bool) -> String {
    let op = if negate { "!==" } else { "===" };
    binary(left, op, right)
}

/// Equality on serialized values, for comparisons against sequence literals.
pub fn structural_eq(left: &str, right: &str, negate: bool) -> String {
    let op = if negate { "!==" } else { "===" };
    format!(
        "(JSON.stringify({}) {op} JSON.stringify({}))",
        unwrap_parens(left),
        unwrap_parens(right)
    )
}

/// `needle` equals one of `items`.
pub fn any_equal(needle: &str, items: &[String]) -> String {
    if items.is_empty() {
        return boolean(false);
    }
    let tests: Vec<String> = items
        .iter()
        .map(|item| format!("{needle} === {item}"))
        .collect();
    format!("({})", tests.join(" || "))
}

pub fn includes(haystack: &str, needle: &str) -> String {
    format!("{haystack}.includes({})", unwrap_parens(needle))
}

pub fn instance_of(value: &str, class: &str) -> String {
    format!("({value} instanceof {class})")
}

pub fn type_of(value: &str, type_name: &str) -> String {
    format!("(typeof {value} === {})", string(type_name))
}

pub fn is_array(value: &str) -> String {
    format!("Array.isArray({})", unwrap_parens(value))
}

pub fn conditional(test: &str, body: &str, orelse: &str) -> String {
    format!("({} ? {body} : {orelse})", unwrap_parens(test))
}

// ---------------------------------------------------------------------------
// Collections and callbacks
// ---------------------------------------------------------------------------

pub fn array(items: &[String]) -> String {
    format!("[{}]", arg_list(items))
}

pub fn set(items: &[String]) -> String {
    format!("new Set({})", array(items))
}

fn object_key(key: &str) -> String {
    if is_valid_identifier(key) {
        key.to_string()
    } else {
        string(key)
    }
}

pub enum ObjectKey {
    Literal(String),
    Computed(String),
}

pub fn object(pairs: &[(ObjectKey, String)]) -> String {
    if pairs.is_empty() {
        return "{}".to_string();
    }
    let fields: Vec<String> = pairs
        .iter()
        .map(|(key, value)| {
            let key = match key {
                ObjectKey::Literal(name) => object_key(name),
                ObjectKey::Computed(expr) => format!("[{}]", unwrap_parens(expr)),
            };
            format!("{key}: {}", unwrap_parens(value))
        })
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

/// Arrow function without surrounding parentheses.
pub fn arrow(params: &[String], body: &str) -> String {
    format!("({}) => {}", params.join(", "), unwrap_parens(body))
}

pub fn lambda(params: &[String], body: &str) -> String {
    format!("({})", arrow(params, body))
}

pub fn filter(iterable: &str, param: &str, condition: &str) -> String {
    format!("{iterable}.filter({})", arrow(&[param.to_string()], condition))
}

pub fn map(iterable: &str, param: &str, body: &str) -> String {
    format!("{iterable}.map({})", arrow(&[param.to_string()], body))
}

pub fn from_entries(entries: &str) -> String {
    format!("Object.fromEntries({})", unwrap_parens(entries))
}

pub fn new_set(values: &str) -> String {
    format!("new Set({})", unwrap_parens(values))
}

pub fn sorted(iterable: &str, comparator: Option<&str>, reverse: bool) -> String {
    let mut out = format!("[...{iterable}].sort(");
    if let Some(comparator) = comparator {
        out.push_str(comparator);
    }
    out.push(')');
    if reverse {
        out.push_str(".reverse()");
    }
    out
}

pub fn sum(iterable: &str, start: &str) -> String {
    format!("{iterable}.reduce((a, b) => a + b, {})", unwrap_parens(start))
}

/// Integers `start..stop` as an array, empty when `stop <= start`.
pub fn range(start: Option<&str>, stop: &str) -> String {
    match start {
        None => format!("[...Array(Math.max(0, {})).keys()]", unwrap_parens(stop)),
        Some(start) => format!(
            "[...Array(Math.max(0, {stop} - {start})).keys()].map((i) => i + {start})"
        ),
    }
}

pub fn math(function: &str, args: &[String]) -> String {
    call(&format!("Math.{function}"), args)
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

pub fn let_decl(names: &[String]) -> String {
    format!("let {};", names.join(", "))
}

pub fn assign(targets: &[String], value: &str) -> String {
    let mut out = String::new();
    for target in targets {
        let _ = write!(out, "{target} = ");
    }
    let _ = write!(out, "{};", unwrap_parens(value));
    out
}

pub fn aug_assign(target: &str, op: &str, value: &str) -> String {
    format!("{target} {op}= {};", unwrap_parens(value))
}

pub fn expr_stmt(expr: &str) -> String {
    format!("{};", unwrap_parens(expr))
}

pub fn return_stmt(value: Option<&str>) -> String {
    match value {
        Some(value) => format!("return {};", unwrap_parens(value)),
        None => "return;".to_string(),
    }
}

pub fn return_this() -> String {
    "return this;".to_string()
}

pub fn break_stmt() -> String {
    "break;".to_string()
}

pub fn continue_stmt() -> String {
    "continue;".to_string()
}

pub fn throw(value: &str) -> String {
    format!("throw {};", unwrap_parens(value))
}

pub fn new_error(message: Option<&str>) -> String {
    format!("new Error({})", message.map(unwrap_parens).unwrap_or(""))
}

/// `if (!cond) throw new Error(msg);`
pub fn assertion(negated: &str, message: Option<&str>) -> String {
    format!(
        "if ({}) {}",
        unwrap_parens(negated),
        throw(&new_error(message))
    )
}

pub fn delete(target: &str) -> String {
    format!("delete {target};")
}

pub fn release(resource: &str) -> String {
    format!("{resource}.close();")
}

pub fn comment(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    lines[start..end]
        .iter()
        .map(|line| {
            if line.is_empty() {
                "//".to_string()
            } else {
                format!("// {line}")
            }
        })
        .collect()
}

pub fn configure_module(module: &str) -> String {
    format!("// Please configure the '{module}' module")
}

pub fn harness_required() -> String {
    "// Test harness required: entry-point block omitted".to_string()
}

pub fn if_head(condition: &str) -> String {
    format!("if ({}) {{", unwrap_parens(condition))
}

/// `if (c) stmt;` for a body of one simple statement.
pub fn if_inline(condition: &str, statement: &str) -> String {
    format!("if ({}) {statement}", unwrap_parens(condition))
}

pub fn else_if_head(condition: &str) -> String {
    format!("}} else if ({}) {{", unwrap_parens(condition))
}

pub fn else_head() -> String {
    "} else {".to_string()
}

pub fn try_head() -> String {
    "try {".to_string()
}

pub fn finally_head() -> String {
    "} finally {".to_string()
}

pub fn block_open() -> String {
    "{".to_string()
}

pub fn block_close() -> String {
    "}".to_string()
}

pub fn while_head(condition: &str) -> String {
    format!("while ({}) {{", unwrap_parens(condition))
}

pub fn for_of_head(target: &str, iterable: &str) -> String {
    format!("for ({target} of {}) {{", unwrap_parens(iterable))
}

pub fn catch_head(binding: Option<&str>) -> String {
    match binding {
        Some(name) => format!("}} catch ({name}) {{"),
        None => "} catch {".to_string(),
    }
}

pub fn function_head(name: &str, params: &[String]) -> String {
    format!("async function {name}({}) {{", params.join(", "))
}

pub fn method_head(name: &str, params: &[String], suspends: bool) -> String {
    let prefix = if suspends { "async " } else { "" };
    format!("{prefix}{name}({}) {{", params.join(", "))
}

pub fn class_head(name: &str, base: Option<&str>) -> String {
    match base {
        Some(base) => format!("class {name} extends {base} {{"),
        None => format!("class {name} {{"),
    }
}

/// Constructor that hands off to the suspension-capable initializer.
pub fn constructor_shell(call_super: bool) -> Vec<String> {
    let mut lines = vec!["constructor(...args) {".to_string()];
    if call_super {
        lines.push("  super();".to_string());
    }
    lines.push(format!("  return this.{INIT_METHOD}(...args);"));
    lines.push("}".to_string());
    lines
}

/// Class attribute, read through the class.
pub fn static_field(name: &str, value: &str) -> String {
    format!("static {name} = {};", unwrap_parens(value))
}

pub fn param(name: &str, default: Option<&str>) -> String {
    match default {
        Some(default) => format!("{name} = {}", unwrap_parens(default)),
        None => name.to_string(),
    }
}

pub fn rest_param(name: &str) -> String {
    format!("...{name}")
}

pub fn runtime_import(names: &[&str], module: &str) -> String {
    format!("import {{ {} }} from {};", names.join(", "), string(module))
}

pub fn export_list(names: &[String]) -> String {
    format!("export {{ {} }};", names.join(", "))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip one pair of parentheses that encloses the whole expression.
pub fn unwrap_parens(expr: &str) -> &str {
    let bytes = expr.as_bytes();
    if bytes.first() != Some(&b'(') || bytes.last() != Some(&b')') {
        return expr;
    }
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != bytes.len() - 1 {
                    return expr;
                }
            }
            _ => {}
        }
    }
    &expr[1..expr.len() - 1]
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
