//! Library mappings, one dialect statement at a time.

use stepjs::{CompileOptions, Context, compile_source};

const CASES: &[(&str, &str)] = &[
    // builtins
    ("print(a, b)", "console.log(a, b);"),
    ("int(s)", "parseInt(s);"),
    ("abs(x)", "Math.abs(x);"),
    ("str(n)", "String(n);"),
    ("ord(c)", "c.charCodeAt(0);"),
    ("chr(n + 1)", "String.fromCharCode(n + 1);"),
    ("enumerate(xs)", "xs.entries();"),
    ("reversed(xs)", "[...xs].reverse();"),
    ("set(xs)", "new Set(xs);"),
    ("ValueError(\"bad\")", "new Error(\"bad\");"),
    ("len(xs)", "xs.length;"),
    ("list(xs)", "[...xs];"),
    ("list()", "[];"),
    ("range(n)", "[...Array(Math.max(0, n)).keys()];"),
    ("range(1, n)", "[...Array(Math.max(0, n - 1)).keys()].map((i) => i + 1);"),
    ("range(len(xs) - 1)", "[...Array(Math.max(0, xs.length - 1)).keys()];"),
    // methods
    ("xs.extend(ys)", "xs.push(...ys);"),
    ("xs.insert(0, y)", "xs.splice(0, 0, y);"),
    ("xs.remove(y)", "xs.splice(xs.indexOf(y), 1);"),
    ("s.lower()", "s.toLowerCase();"),
    ("s.replace(\"a\", \"b\")", "s.replaceAll(\"a\", \"b\");"),
    ("s.strip()", "s.trim();"),
    ("s.isdigit()", "/^[0-9]+$/.test(s);"),
    ("d.items()", "Object.entries(d);"),
    ("xs.pop()", "xs.pop();"),
    ("xs.pop(0)", "xs.shift();"),
    ("xs.pop(i)", "xs.splice(i, 1)[0];"),
    ("d.get(k)", "k in d ? d[k] : null;"),
    ("d.get(k, 0)", "k in d ? d[k] : 0;"),
    ("s.rsplit(\" \", 1)", "pyrsplit(s, \" \", 1);"),
    ("sock.send(data)", "sock.send(data);"),
    // modules
    ("import math\nmath.sqrt(x)", "Math.sqrt(x);"),
    ("import time\ntime.time()", "Date.now() / 1000;"),
    ("from urllib.parse import quote\nquote(s)", "encodeURIComponent(s);"),
    (
        "import tkinter\ntkinter.Canvas(window, width=800)",
        "new tkinter.Canvas(window, { width: 800 });",
    ),
];

fn statement(source: &str) -> String {
    let options = CompileOptions {
        runtime_module: None,
        exports: false,
    };
    let out = compile_source(&format!("{source}\n"), &mut Context::new(), &options)
        .unwrap_or_else(|err| panic!("{source}: {err}"));
    out.code.trim_end().to_string()
}

#[test]
fn test_library_mappings() {
    let mut failures = Vec::new();
    for (source, expected) in CASES {
        let actual = statement(source);
        if actual != *expected {
            failures.push(format!("{source}\n  expected: {expected}\n  actual:   {actual}"));
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn test_unknown_library_call_is_verbatim() {
    assert_eq!(statement("frobnicate(a, key=b)"), "frobnicate(a, { key: b });");
}

#[test]
fn test_library_arity_is_checked() {
    let err = compile_source("ord(a, b)\n", &mut Context::new(), &CompileOptions::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "line 1: unsupported library call arity: ord(a, b) (expects 1 arguments)");
}
