//! Reading whole teaching programs.

use stepjs_syntax::{Expr, StmtKind, read_python};

const LEX: &str = r#"
import socket

class Text:
    def __init__(self, text):
        self.text = text

    def __repr__(self):
        return "Text('{}')".format(self.text)

def lex(body):
    out = []
    buffer = ""
    in_tag = False
    for c in body:
        if c == "<":
            in_tag = True
            if buffer: out.append(Text(buffer))
            buffer = ""
        elif c == ">":
            in_tag = False
        else:
            buffer += c
    if not in_tag and buffer:
        out.append(Text(buffer))
    return out

if __name__ == "__main__":
    import sys
    lex(sys.argv[1])
"#;

#[test]
fn reads_lexer_program() {
    let module = read_python(LEX).expect("parse failed");
    let kinds: Vec<&str> = module
        .body
        .iter()
        .map(|s| match &s.kind {
            StmtKind::Import(_) => "import",
            StmtKind::ClassDef(_) => "class",
            StmtKind::FunctionDef(_) => "def",
            StmtKind::If { .. } => "if",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["import", "class", "def", "if"]);
}

#[test]
fn tree_serializes_to_json() {
    let module = read_python("x = len(items)").expect("parse failed");
    let json = serde_json::to_value(&module).expect("serialize");
    let assign = &json["body"][0]["kind"]["assign"];
    assert_eq!(assign["targets"][0]["name"], "x");

    let back: stepjs_syntax::Module = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, module);
}

#[test]
fn method_call_keeps_receiver() {
    let module = read_python("s.makefile(\"r\", encoding=\"utf8\")").expect("parse failed");
    match &module.body[0].kind {
        StmtKind::Expr(Expr::Call { func, args, keywords }) => {
            assert_eq!(func.dotted_path().as_deref(), Some("s.makefile"));
            assert_eq!(args, &vec![Expr::string("r")]);
            assert_eq!(keywords.len(), 1);
        }
        other => panic!("expected call, got {other:?}"),
    }
}
