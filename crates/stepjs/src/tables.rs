//! Declaration tables for library names.
//!
//! Three immutable tables map library callables to JavaScript: global
//! functions (`print`), module-qualified callables looked up by their full
//! import path (`tkinter.font.Font`) and value methods looked up by method
//! name (`s.startswith(x)`). Nothing here depends on the program being
//! compiled.

use crate::emit;

/// How a library call is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Same callee, same arguments.
    Direct,
    /// Library class construction: `new callee(args)`.
    New,
    /// Different callee, same arguments. For methods the receiver is kept.
    Rename(&'static str),
    /// Text with `{self}`, `{0}`, `{1}`, ... and `{args}` placeholders.
    Template(&'static str),
    /// Runtime helper called as `helper(receiver, args...)`.
    Helper(&'static str),
    /// Needs a dedicated emitter in the expression translator.
    Emit(Special),
}

/// Calls whose translation depends on the shape of their arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    Len,
    IsInstance,
    Sum,
    Min,
    Max,
    Sorted,
    Open,
    Breakpoint,
    Range,
    List,
    Pop,
    Get,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decl {
    pub name: &'static str,
    pub rule: Rule,
    /// The call may suspend and is always awaited.
    pub suspends: bool,
}

impl Decl {
    /// Whether the emitted text names the receiver more than once.
    pub fn repeats_receiver(&self) -> bool {
        match self.rule {
            Rule::Template(template) => template.matches("{self}").count() > 1,
            Rule::Emit(Special::Get) => true,
            _ => false,
        }
    }
}

const fn decl(name: &'static str, rule: Rule) -> Decl {
    Decl {
        name,
        rule,
        suspends: false,
    }
}

const fn suspending(name: &'static str, rule: Rule) -> Decl {
    Decl {
        name,
        rule,
        suspends: true,
    }
}

pub static FUNCTIONS: &[Decl] = &[
    decl("print", Rule::Rename("console.log")),
    decl("int", Rule::Rename("parseInt")),
    decl("float", Rule::Rename("parseFloat")),
    decl("abs", Rule::Rename("Math.abs")),
    decl("round", Rule::Rename("Math.round")),
    decl("str", Rule::Template("String({0})")),
    decl("ord", Rule::Template("{0}.charCodeAt(0)")),
    decl("chr", Rule::Template("String.fromCharCode({0})")),
    decl("enumerate", Rule::Template("{0}.entries()")),
    decl("reversed", Rule::Template("[...{0}].reverse()")),
    decl("set", Rule::Template("new Set({args})")),
    decl("Exception", Rule::Template("new Error({args})")),
    decl("ValueError", Rule::Template("new Error({args})")),
    decl("RuntimeError", Rule::Template("new Error({args})")),
    decl("AssertionError", Rule::Template("new Error({args})")),
    decl("KeyError", Rule::Template("new Error({args})")),
    decl("IndexError", Rule::Template("new Error({args})")),
    decl("len", Rule::Emit(Special::Len)),
    decl("isinstance", Rule::Emit(Special::IsInstance)),
    decl("sum", Rule::Emit(Special::Sum)),
    decl("min", Rule::Emit(Special::Min)),
    decl("max", Rule::Emit(Special::Max)),
    decl("sorted", Rule::Emit(Special::Sorted)),
    decl("open", Rule::Emit(Special::Open)),
    decl("range", Rule::Emit(Special::Range)),
    decl("list", Rule::Emit(Special::List)),
    suspending("breakpoint", Rule::Emit(Special::Breakpoint)),
];

pub static MODULE_FUNCTIONS: &[Decl] = &[
    decl("socket.socket", Rule::New),
    decl("ssl.create_default_context", Rule::Direct),
    decl("tkinter.Tk", Rule::New),
    decl("tkinter.Canvas", Rule::New),
    decl("tkinter.Label", Rule::New),
    decl("tkinter.mainloop", Rule::Direct),
    decl("tkinter.font.Font", Rule::New),
    decl("dukpy.JSInterpreter", Rule::New),
    decl("threading.Thread", Rule::New),
    decl("threading.Lock", Rule::New),
    decl("time.time", Rule::Template("(Date.now() / 1000)")),
    decl("math.sqrt", Rule::Rename("Math.sqrt")),
    decl("math.floor", Rule::Rename("Math.floor")),
    decl("math.ceil", Rule::Rename("Math.ceil")),
    decl("random.random", Rule::Rename("Math.random")),
    decl("urllib.parse.quote", Rule::Rename("encodeURIComponent")),
    decl(
        "urllib.parse.unquote_plus",
        Rule::Template("decodeURIComponent({0}.replaceAll(\"+\", \" \"))"),
    ),
];

pub static METHODS: &[Decl] = &[
    decl("append", Rule::Rename("push")),
    decl("extend", Rule::Template("{self}.push(...{0})")),
    decl("insert", Rule::Template("{self}.splice({0}, 0, {1})")),
    decl("remove", Rule::Template("{self}.splice({self}.indexOf({0}), 1)")),
    decl("index", Rule::Rename("indexOf")),
    decl("find", Rule::Rename("indexOf")),
    decl("startswith", Rule::Rename("startsWith")),
    decl("endswith", Rule::Rename("endsWith")),
    decl("lower", Rule::Rename("toLowerCase")),
    decl("upper", Rule::Rename("toUpperCase")),
    decl("replace", Rule::Rename("replaceAll")),
    decl("strip", Rule::Template("{self}.trim()")),
    decl("lstrip", Rule::Template("{self}.trimStart()")),
    decl("rstrip", Rule::Template("{self}.trimEnd()")),
    decl("isspace", Rule::Template("/^\\s+$/.test({self})")),
    decl("isalnum", Rule::Template("/^[a-zA-Z0-9]+$/.test({self})")),
    decl("isdigit", Rule::Template("/^[0-9]+$/.test({self})")),
    decl("isalpha", Rule::Template("/^[a-zA-Z]+$/.test({self})")),
    decl("join", Rule::Template("{0}.join({self})")),
    decl("items", Rule::Template("Object.entries({self})")),
    decl("keys", Rule::Template("Object.keys({self})")),
    decl("values", Rule::Template("Object.values({self})")),
    decl("split", Rule::Helper(emit::PYSPLIT)),
    decl("rsplit", Rule::Helper(emit::PYRSPLIT)),
    decl("pop", Rule::Emit(Special::Pop)),
    decl("get", Rule::Emit(Special::Get)),
    suspending("makefile", Rule::Direct),
    decl("send", Rule::Direct),
    decl("recv", Rule::Direct),
    decl("read", Rule::Direct),
    decl("readline", Rule::Direct),
    decl("write", Rule::Direct),
    decl("close", Rule::Direct),
    decl("connect", Rule::Direct),
    decl("wrap_socket", Rule::Direct),
    decl("encode", Rule::Direct),
    decl("decode", Rule::Direct),
];

/// Modules the runtime ships shims for; importing them needs no configuration.
static KNOWN_MODULES: &[&str] = &[
    "socket",
    "ssl",
    "tkinter",
    "tkinter.font",
    "time",
    "math",
    "urllib.parse",
    "dukpy",
    "threading",
    "sys",
    "os",
    "ctypes",
    "sdl2",
    "skia",
    "OpenGL.GL",
    "gtts",
    "playsound",
    "wbetools",
    "html",
    "random",
    "io",
];

pub fn function(name: &str) -> Option<&'static Decl> {
    FUNCTIONS.iter().find(|d| d.name == name)
}

pub fn module_function(qualified: &str) -> Option<&'static Decl> {
    MODULE_FUNCTIONS.iter().find(|d| d.name == qualified)
}

pub fn method(name: &str) -> Option<&'static Decl> {
    METHODS.iter().find(|d| d.name == name)
}

pub fn is_known_module(module: &str) -> bool {
    KNOWN_MODULES.contains(&module)
}

/// Error from [`render_template`]: the template wants `expected` arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArityMismatch {
    pub expected: usize,
}

/// Number of positional arguments a template consumes, or `None` for `{args}`.
pub fn template_arity(template: &str) -> Option<usize> {
    if template.contains("{args}") {
        return None;
    }
    let mut arity = 0;
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else { break };
        if let Ok(index) = after[..end].parse::<usize>() {
            arity = arity.max(index + 1);
        }
        rest = &after[end + 1..];
    }
    Some(arity)
}

/// Fill a template's placeholders.
///
/// An argument in call position (right after `(` or `, `) loses its outer
/// parentheses; anywhere else it is inserted as is.
pub fn render_template(
    template: &str,
    receiver: Option<&str>,
    args: &[String],
) -> Result<String, ArityMismatch> {
    match template_arity(template) {
        Some(expected) if expected != args.len() => return Err(ArityMismatch { expected }),
        _ => {}
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let (before, after) = rest.split_at(start);
        out.push_str(before);
        let Some(end) = after.find('}') else {
            out.push_str(after);
            return Ok(out);
        };
        let key = &after[1..end];
        let in_call_position = out.ends_with('(') || out.ends_with(", ");
        let value = match key {
            "self" => receiver.map(str::to_string),
            "args" => Some(
                args.iter()
                    .map(|a| emit::unwrap_parens(a))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => key.parse::<usize>().ok().and_then(|i| args.get(i)).map(|a| {
                if in_call_position {
                    emit::unwrap_parens(a).to_string()
                } else {
                    a.clone()
                }
            }),
        };
        match value {
            Some(value) => out.push_str(&value),
            None => out.push_str(&after[..=end]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(function("print").map(|d| d.rule), Some(Rule::Rename("console.log")));
        assert!(method("makefile").is_some_and(|d| d.suspends));
        assert!(!method("append").is_some_and(|d| d.suspends));
        assert_eq!(module_function("tkinter.font.Font").map(|d| d.rule), Some(Rule::New));
        assert!(function("frobnicate").is_none());
    }

    #[test]
    fn test_repeats_receiver() {
        assert!(method("remove").is_some_and(Decl::repeats_receiver));
        assert!(method("get").is_some_and(Decl::repeats_receiver));
        assert!(!method("strip").is_some_and(Decl::repeats_receiver));
    }

    #[test]
    fn test_known_modules() {
        assert!(is_known_module("tkinter.font"));
        assert!(!is_known_module("numpy"));
    }

    #[test]
    fn test_template_arity() {
        assert_eq!(template_arity("{self}.splice({0}, 0, {1})"), Some(2));
        assert_eq!(template_arity("{self}.trim()"), Some(0));
        assert_eq!(template_arity("new Error({args})"), None);
    }

    #[test]
    fn test_render_template() {
        let args = vec!["(a + b)".to_string()];
        assert_eq!(
            render_template("String.fromCharCode({0})", None, &args).unwrap(),
            "String.fromCharCode(a + b)"
        );
        assert_eq!(
            render_template("{0}.join({self})", Some("parts"), &["sep".into()]).unwrap(),
            "sep.join(parts)"
        );
        assert_eq!(
            render_template("{0}.entries()", None, &args).unwrap(),
            "(a + b).entries()"
        );
    }

    #[test]
    fn test_render_template_arity_mismatch() {
        assert_eq!(
            render_template("{self}.trim()", Some("s"), &["\" \"".into()]),
            Err(ArityMismatch { expected: 0 })
        );
    }

    #[test]
    fn test_every_template_is_well_formed() {
        for decl in FUNCTIONS.iter().chain(MODULE_FUNCTIONS).chain(METHODS) {
            if let Rule::Template(text) = decl.rule {
                assert_eq!(
                    text.matches('{').count(),
                    text.matches('}').count(),
                    "unbalanced template for {}",
                    decl.name
                );
            }
        }
    }
}
