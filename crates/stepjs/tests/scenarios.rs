//! End-to-end compiles of small teaching programs.

use insta::assert_snapshot;
use stepjs::{CompileOptions, ConstructKind, Context, compile_source};

fn compile(source: &str, options: &CompileOptions) -> String {
    compile_source(source, &mut Context::new(), options)
        .unwrap()
        .code
}

#[test]
fn test_classes_get_constructor_shell_and_awaited_calls() {
    let source = r#"
class Browser:
    def __init__(self, width):
        self.width = width
        self.tabs = []

    def load(self, url):
        tab = Tab(self.width)
        self.tabs.append(tab)
        breakpoint("load", url)
        return tab.load(url)

class Tab:
    def __init__(self, width):
        self.width = width

    def load(self, url):
        self.url = url
"#;
    assert_snapshot!(compile(source, &CompileOptions::default()), @r#"
class Browser {
  constructor(...args) {
    return this.init(...args);
  }
  async init(width) {
    this.width = width;
    this.tabs = [];
    return this;
  }
  async load(url) {
    let tab;
    tab = await new Tab(this.width);
    this.tabs.push(tab);
    await breakpoint.event("load", url);
    return await tab.load(url);
  }
}
class Tab {
  constructor(...args) {
    return this.init(...args);
  }
  async init(width) {
    this.width = width;
    return this;
  }
  async load(url) {
    this.url = url;
  }
}
export { Browser, Tab };
"#);
}

#[test]
fn test_library_calls_stay_synchronous() {
    let source = r#"
import socket
import ssl

def request(url, host):
    scheme, url = url.split("://", 1)
    s = socket.socket(family=socket.AF_INET)
    if scheme == "https":
        ctx = ssl.create_default_context()
        s = ctx.wrap_socket(s, server_hostname=host)
    response = s.makefile("r", encoding="utf8")
    return response
"#;
    let options = CompileOptions {
        runtime_module: Some("./runtime.js".into()),
        exports: false,
    };
    assert_snapshot!(compile(source, &options), @r#"
import { pysplit, socket, ssl } from "./runtime.js";
async function request(url, host) {
  let scheme, s, ctx, response;
  [scheme, url] = pysplit(url, "://", 1);
  s = new socket.socket({ family: socket.AF_INET });
  if (scheme === "https") {
    ctx = ssl.create_default_context();
    s = ctx.wrap_socket(s, { server_hostname: host });
  }
  response = await s.makefile("r", { encoding: "utf8" });
  return response;
}
"#);
}

#[test]
fn test_resource_files_are_listed_in_order() {
    let mut ctx = Context::new();
    let out = compile_source(
        "def main():\n    with open(\"index.html\") as f:\n        body = f.read()\n    css = open(\"browser.css\")\n    again = open(\"index.html\")\n",
        &mut ctx,
        &CompileOptions::default(),
    )
    .unwrap();
    assert_eq!(out.files, vec!["index.html", "browser.css"]);
}

#[test]
fn test_non_literal_resource_is_rejected() {
    let err = compile_source(
        "def load(path):\n    return open(path)\n",
        &mut Context::new(),
        &CompileOptions::default(),
    )
    .unwrap_err();
    let unsupported = err.as_unsupported().unwrap();
    assert_eq!(unsupported.kind, ConstructKind::NonLiteralResource);
    assert_eq!(unsupported.line, 2);
}

#[test]
fn test_compilation_is_deterministic() {
    let source = "import tkinter\nclass Chrome:\n    def paint(self, canvas):\n        x = canvas.width // 2\n        if x in (1, 2):\n            print(x)\n";
    let options = CompileOptions {
        runtime_module: Some("./runtime.js".into()),
        exports: true,
    };
    assert_eq!(compile(source, &options), compile(source, &options));
}

#[test]
fn test_chained_comparison_error_message() {
    let err = compile_source(
        "def f(a, b, c):\n    x = 1\n    return a < b < c\n",
        &mut Context::new(),
        &CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "line 3: unsupported chained comparison: a < b < c"
    );
}

#[test]
fn test_preregistered_declarations_are_awaited() {
    let mut ctx = Context::new();
    ctx.register_function("lex");
    let out = compile_source(
        "def show(body):\n    print(lex(body))\n",
        &mut ctx,
        &CompileOptions {
            runtime_module: None,
            exports: false,
        },
    )
    .unwrap();
    assert_eq!(
        out.code,
        "async function show(body) {\n  console.log(await lex(body));\n}\n"
    );
}

#[test]
fn test_main_guard_is_replaced() {
    let out = compile(
        "def main():\n    pass\nif __name__ == \"__main__\":\n    main()\n",
        &CompileOptions {
            runtime_module: None,
            exports: false,
        },
    );
    assert_eq!(
        out,
        "async function main() {\n}\n// Test harness required: entry-point block omitted\n"
    );
}
