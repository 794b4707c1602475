//! Tree-sitter based reader for the Python teaching dialect.

use crate::ast::*;
use crate::error::ReadError;
use tree_sitter::{Node, Parser, Tree};

/// Parse dialect source into a [`Module`].
pub fn read_python(source: &str) -> Result<Module, ReadError> {
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_python::language().into())
        .map_err(|err| ReadError::Parse(err.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ReadError::Parse("failed to parse".into()))?;

    let ctx = ReadContext::new(source);
    ctx.read_module(&tree)
}

struct ReadContext<'a> {
    source: &'a str,
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

fn unsupported(node: Node, what: impl Into<String>) -> ReadError {
    ReadError::Unsupported {
        line: line_of(node),
        what: what.into(),
    }
}

/// Named children, without comments.
fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn field<'t>(node: Node<'t>, name: &'static str, kind: &'static str) -> Result<Node<'t>, ReadError> {
    node.child_by_field_name(name)
        .ok_or(ReadError::MissingField {
            line: line_of(node),
            node: kind,
            field: name,
        })
}

impl<'a> ReadContext<'a> {
    fn new(source: &'a str) -> Self {
        Self { source }
    }

    fn node_text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn read_module(&self, tree: &Tree) -> Result<Module, ReadError> {
        let root = tree.root_node();

        if root.has_error() {
            return Err(ReadError::Syntax {
                line: first_error_line(root),
            });
        }

        Ok(Module::new(self.read_stmts(root)?))
    }

    fn read_stmts(&self, node: Node) -> Result<Vec<Stmt>, ReadError> {
        let mut stmts = Vec::new();
        for child in named_children(node) {
            if let Some(stmt) = self.read_stmt(child)? {
                stmts.push(stmt);
            }
        }
        Ok(stmts)
    }

    fn read_stmt(&self, node: Node) -> Result<Option<Stmt>, ReadError> {
        let line = line_of(node);
        let kind = match node.kind() {
            "expression_statement" => return self.read_expression_statement(node),

            // Newer grammars place these directly under `module`/`block`.
            "assignment" => match self.read_assignment(node)? {
                Some(kind) => kind,
                None => return Ok(None),
            },
            "augmented_assignment" => self.read_augmented_assignment(node)?,

            "return_statement" => StmtKind::Return(self.read_optional_child(node)?),
            "pass_statement" => StmtKind::Pass,
            "break_statement" => StmtKind::Break,
            "continue_statement" => StmtKind::Continue,

            "raise_statement" => {
                if node.child_by_field_name("cause").is_some() {
                    return Err(unsupported(node, "raise ... from"));
                }
                StmtKind::Raise(self.read_optional_child(node)?)
            }

            "assert_statement" => {
                let parts = named_children(node);
                let test = parts
                    .first()
                    .ok_or(ReadError::MissingField {
                        line,
                        node: "assert_statement",
                        field: "test",
                    })?;
                StmtKind::Assert {
                    test: self.read_expr(*test)?,
                    msg: parts.get(1).map(|m| self.read_expr(*m)).transpose()?,
                }
            }

            "delete_statement" => {
                let target = self.read_optional_child(node)?.ok_or(ReadError::MissingField {
                    line,
                    node: "delete_statement",
                    field: "target",
                })?;
                match target {
                    Expr::Tuple(items) => StmtKind::Delete(items),
                    other => StmtKind::Delete(vec![other]),
                }
            }

            "global_statement" => StmtKind::Global(self.read_identifiers(node)),
            "nonlocal_statement" => StmtKind::Nonlocal(self.read_identifiers(node)),

            "import_statement" => StmtKind::Import(self.read_import_names(node)?),
            "import_from_statement" => self.read_import_from(node)?,
            "future_import_statement" => return Ok(None),

            "if_statement" => self.read_if(node)?,
            "while_statement" => StmtKind::While {
                test: self.read_expr(field(node, "condition", "while_statement")?)?,
                body: self.read_stmts(field(node, "body", "while_statement")?)?,
                orelse: self.read_else(node)?,
            },
            "for_statement" => {
                if self.node_text(node).starts_with("async") {
                    return Err(unsupported(node, "async for"));
                }
                StmtKind::For {
                    target: self.read_expr(field(node, "left", "for_statement")?)?,
                    iter: self.read_expr_list(node, "right")?,
                    body: self.read_stmts(field(node, "body", "for_statement")?)?,
                    orelse: self.read_else(node)?,
                }
            }
            "try_statement" => self.read_try(node)?,
            "with_statement" => self.read_with(node)?,

            "function_definition" => StmtKind::FunctionDef(self.read_function(node, Vec::new())?),
            "class_definition" => StmtKind::ClassDef(self.read_class(node, Vec::new())?),
            "decorated_definition" => {
                let mut decorators = Vec::new();
                for child in named_children(node) {
                    if child.kind() == "decorator" {
                        let inner = named_children(child);
                        let expr = inner
                            .first()
                            .ok_or_else(|| unsupported(child, "empty decorator"))?;
                        decorators.push(self.read_expr(*expr)?);
                    }
                }
                let def = field(node, "definition", "decorated_definition")?;
                match def.kind() {
                    "function_definition" => {
                        StmtKind::FunctionDef(self.read_function(def, decorators)?)
                    }
                    "class_definition" => StmtKind::ClassDef(self.read_class(def, decorators)?),
                    other => return Err(unsupported(def, format!("decorated {other}"))),
                }
            }

            other if other.ends_with("_statement") || other.ends_with("_definition") => {
                return Err(unsupported(node, other.replace('_', " ")));
            }
            _ => StmtKind::Expr(self.read_expr(node)?),
        };
        Ok(Some(Stmt::new(line, kind)))
    }

    fn read_expression_statement(&self, node: Node) -> Result<Option<Stmt>, ReadError> {
        let line = line_of(node);
        let children = named_children(node);
        let kind = match children.as_slice() {
            [] => return Ok(None),
            [single] if single.kind() == "assignment" => match self.read_assignment(*single)? {
                Some(kind) => kind,
                None => return Ok(None),
            },
            [single] if single.kind() == "augmented_assignment" => {
                self.read_augmented_assignment(*single)?
            }
            [single] => StmtKind::Expr(self.read_expr(*single)?),
            many => StmtKind::Expr(Expr::Tuple(
                many.iter()
                    .map(|c| self.read_expr(*c))
                    .collect::<Result<_, _>>()?,
            )),
        };
        Ok(Some(Stmt::new(line, kind)))
    }

    /// `a = b = value`; a bare annotation (`x: int`) reads as nothing.
    fn read_assignment(&self, node: Node) -> Result<Option<StmtKind>, ReadError> {
        let mut targets = Vec::new();
        let mut current = node;
        loop {
            targets.push(self.read_expr(field(current, "left", "assignment")?)?);
            let Some(right) = current.child_by_field_name("right") else {
                return Ok(None);
            };
            match right.kind() {
                "assignment" => current = right,
                "augmented_assignment" => {
                    return Err(unsupported(right, "augmented assignment as a value"));
                }
                _ => {
                    let value = self.read_expr(right)?;
                    return Ok(Some(StmtKind::Assign { targets, value }));
                }
            }
        }
    }

    fn read_augmented_assignment(&self, node: Node) -> Result<StmtKind, ReadError> {
        let op_node = field(node, "operator", "augmented_assignment")?;
        let symbol = op_node.kind().trim_end_matches('=');
        let op = BinOp::from_symbol(symbol)
            .ok_or_else(|| unsupported(op_node, format!("operator {}", op_node.kind())))?;
        Ok(StmtKind::AugAssign {
            target: self.read_expr(field(node, "left", "augmented_assignment")?)?,
            op,
            value: self.read_expr(field(node, "right", "augmented_assignment")?)?,
        })
    }

    fn read_if(&self, node: Node) -> Result<StmtKind, ReadError> {
        let test = self.read_expr(field(node, "condition", "if_statement")?)?;
        let body = self.read_stmts(field(node, "consequence", "if_statement")?)?;

        let mut cursor = node.walk();
        let alternatives: Vec<Node> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();

        // Fold `elif` clauses from the back so each one nests in the previous else.
        let mut orelse = Vec::new();
        for alt in alternatives.into_iter().rev() {
            match alt.kind() {
                "else_clause" => {
                    orelse = self.read_stmts(field(alt, "body", "else_clause")?)?;
                }
                "elif_clause" => {
                    let nested = StmtKind::If {
                        test: self.read_expr(field(alt, "condition", "elif_clause")?)?,
                        body: self.read_stmts(field(alt, "consequence", "elif_clause")?)?,
                        orelse,
                    };
                    orelse = vec![Stmt::new(line_of(alt), nested)];
                }
                other => return Err(unsupported(alt, other.to_string())),
            }
        }

        Ok(StmtKind::If { test, body, orelse })
    }

    fn read_else(&self, node: Node) -> Result<Vec<Stmt>, ReadError> {
        match node.child_by_field_name("alternative") {
            Some(alt) => self.read_stmts(field(alt, "body", "else_clause")?),
            None => Ok(Vec::new()),
        }
    }

    fn read_try(&self, node: Node) -> Result<StmtKind, ReadError> {
        let body = self.read_stmts(field(node, "body", "try_statement")?)?;
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();

        for child in named_children(node) {
            match child.kind() {
                "except_clause" => handlers.push(self.read_except_clause(child)?),
                "except_group_clause" => return Err(unsupported(child, "except*")),
                "else_clause" => orelse = self.read_stmts(field(child, "body", "else_clause")?)?,
                "finally_clause" => {
                    let block = named_children(child)
                        .into_iter()
                        .find(|c| c.kind() == "block")
                        .ok_or(ReadError::MissingField {
                            line: line_of(child),
                            node: "finally_clause",
                            field: "block",
                        })?;
                    finalbody = self.read_stmts(block)?;
                }
                _ => {}
            }
        }

        Ok(StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        })
    }

    fn read_except_clause(&self, node: Node) -> Result<ExceptHandler, ReadError> {
        let children = named_children(node);
        let (header, blocks): (Vec<Node>, Vec<Node>) =
            children.into_iter().partition(|c| c.kind() != "block");
        let block = blocks.first().ok_or(ReadError::MissingField {
            line: line_of(node),
            node: "except_clause",
            field: "block",
        })?;

        let (typ, name) = match header.as_slice() {
            [] => (None, None),
            [pattern] if pattern.kind() == "as_pattern" => {
                let parts = named_children(*pattern);
                let typ = parts.first().map(|t| self.read_expr(*t)).transpose()?;
                let alias = pattern
                    .child_by_field_name("alias")
                    .map(|a| self.target_name(a));
                (typ, alias)
            }
            [typ] => (Some(self.read_expr(*typ)?), None),
            [typ, alias, ..] => (Some(self.read_expr(*typ)?), Some(self.target_name(*alias))),
        };

        Ok(ExceptHandler {
            line: line_of(node),
            typ,
            name,
            body: self.read_stmts(*block)?,
        })
    }

    /// Name bound by an `as` clause, unwrapping `as_pattern_target`.
    fn target_name(&self, node: Node) -> String {
        match node.kind() {
            "as_pattern_target" => named_children(node)
                .first()
                .map(|inner| self.node_text(*inner).to_string())
                .unwrap_or_else(|| self.node_text(node).to_string()),
            _ => self.node_text(node).to_string(),
        }
    }

    fn read_with(&self, node: Node) -> Result<StmtKind, ReadError> {
        let clause = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "with_clause")
            .ok_or(ReadError::MissingField {
                line: line_of(node),
                node: "with_statement",
                field: "with_clause",
            })?;

        let mut items = Vec::new();
        for item in named_children(clause) {
            if item.kind() != "with_item" {
                continue;
            }
            let value = field(item, "value", "with_item")?;
            if value.kind() == "as_pattern" {
                let context = named_children(value)
                    .into_iter()
                    .next()
                    .ok_or_else(|| unsupported(value, "empty with item"))?;
                let target = value
                    .child_by_field_name("alias")
                    .map(|alias| match alias.kind() {
                        "as_pattern_target" => named_children(alias)
                            .first()
                            .map(|inner| self.read_expr(*inner))
                            .unwrap_or_else(|| Ok(Expr::name(self.node_text(alias)))),
                        _ => self.read_expr(alias),
                    })
                    .transpose()?;
                items.push(WithItem {
                    context: self.read_expr(context)?,
                    target,
                });
            } else {
                items.push(WithItem {
                    context: self.read_expr(value)?,
                    target: None,
                });
            }
        }

        Ok(StmtKind::With {
            items,
            body: self.read_stmts(field(node, "body", "with_statement")?)?,
        })
    }

    fn read_function(&self, node: Node, decorators: Vec<Expr>) -> Result<FunctionDef, ReadError> {
        if self.node_text(node).starts_with("async") {
            return Err(unsupported(node, "async def"));
        }
        let name = self.node_text(field(node, "name", "function_definition")?).to_string();
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.read_parameters(p))
            .transpose()?
            .unwrap_or_default();
        let body = self.read_stmts(field(node, "body", "function_definition")?)?;
        Ok(FunctionDef {
            name,
            params,
            body,
            decorators,
        })
    }

    fn read_class(&self, node: Node, decorators: Vec<Expr>) -> Result<ClassDef, ReadError> {
        let name = self.node_text(field(node, "name", "class_definition")?).to_string();
        let mut bases = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            for base in named_children(superclasses) {
                if base.kind() == "keyword_argument" {
                    return Err(unsupported(base, "class keyword argument"));
                }
                bases.push(self.read_expr(base)?);
            }
        }
        let body = self.read_stmts(field(node, "body", "class_definition")?)?;
        Ok(ClassDef {
            name,
            bases,
            body,
            decorators,
        })
    }

    fn read_parameters(&self, node: Node) -> Result<Vec<Param>, ReadError> {
        let mut params = Vec::new();
        for child in named_children(node) {
            let param = match child.kind() {
                "identifier" => Param::positional(self.node_text(child)),
                "default_parameter" | "typed_default_parameter" => Param {
                    name: self
                        .node_text(field(child, "name", "default_parameter")?)
                        .to_string(),
                    default: Some(self.read_expr(field(child, "value", "default_parameter")?)?),
                    kind: ParamKind::Positional,
                },
                // Annotation is dropped; the first named child is the name or splat.
                "typed_parameter" => {
                    let inner = named_children(child)
                        .into_iter()
                        .next()
                        .ok_or_else(|| unsupported(child, "empty typed parameter"))?;
                    self.read_splat_param(inner)?
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => self.read_splat_param(child)?,
                "keyword_separator" | "positional_separator" => continue,
                other => return Err(unsupported(child, format!("parameter {other}"))),
            };
            params.push(param);
        }
        Ok(params)
    }

    fn read_splat_param(&self, node: Node) -> Result<Param, ReadError> {
        let kind = match node.kind() {
            "identifier" => return Ok(Param::positional(self.node_text(node))),
            "list_splat_pattern" => ParamKind::VarArgs,
            "dictionary_splat_pattern" => ParamKind::KwArgs,
            other => return Err(unsupported(node, format!("parameter {other}"))),
        };
        let name = named_children(node)
            .first()
            .map(|n| self.node_text(*n).to_string())
            .ok_or_else(|| unsupported(node, "anonymous splat parameter"))?;
        Ok(Param {
            name,
            default: None,
            kind,
        })
    }

    fn read_identifiers(&self, node: Node) -> Vec<String> {
        named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "identifier")
            .map(|c| self.node_text(c).to_string())
            .collect()
    }

    fn read_import_names(&self, node: Node) -> Result<Vec<Alias>, ReadError> {
        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        names.into_iter().map(|n| self.read_alias(n)).collect()
    }

    fn read_alias(&self, node: Node) -> Result<Alias, ReadError> {
        match node.kind() {
            "aliased_import" => Ok(Alias {
                name: self.node_text(field(node, "name", "aliased_import")?).to_string(),
                asname: Some(self.node_text(field(node, "alias", "aliased_import")?).to_string()),
            }),
            _ => Ok(Alias {
                name: self.node_text(node).to_string(),
                asname: None,
            }),
        }
    }

    fn read_import_from(&self, node: Node) -> Result<StmtKind, ReadError> {
        let module_node = field(node, "module_name", "import_from_statement")?;
        if module_node.kind() == "relative_import" {
            return Err(unsupported(module_node, "relative import"));
        }
        if named_children(node).iter().any(|c| c.kind() == "wildcard_import") {
            return Err(unsupported(node, "wildcard import"));
        }
        Ok(StmtKind::ImportFrom {
            module: self.node_text(module_node).to_string(),
            names: self.read_import_names(node)?,
        })
    }

    fn read_optional_child(&self, node: Node) -> Result<Option<Expr>, ReadError> {
        named_children(node)
            .first()
            .map(|child| self.read_expr(*child))
            .transpose()
    }

    /// A field that may repeat (`for x in a, b`), read as a tuple when it does.
    fn read_expr_list(&self, node: Node, name: &'static str) -> Result<Expr, ReadError> {
        let mut cursor = node.walk();
        let nodes: Vec<Node> = node.children_by_field_name(name, &mut cursor).collect();
        match nodes.as_slice() {
            [] => Err(ReadError::MissingField {
                line: line_of(node),
                node: "expression list",
                field: name,
            }),
            [single] => self.read_expr(*single),
            many => Ok(Expr::Tuple(
                many.iter()
                    .map(|n| self.read_expr(*n))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }

    fn read_expr(&self, node: Node) -> Result<Expr, ReadError> {
        match node.kind() {
            "identifier" | "keyword_identifier" => Ok(Expr::name(self.node_text(node))),
            "true" => Ok(Expr::Constant(Constant::Bool(true))),
            "false" => Ok(Expr::Constant(Constant::Bool(false))),
            "none" => Ok(Expr::Constant(Constant::None)),
            "integer" => self.read_integer(node),
            "float" => self.read_float(node),
            "string" => self.read_string(node),
            "concatenated_string" => self.read_concatenated_string(node),

            "binary_operator" => {
                let op_node = field(node, "operator", "binary_operator")?;
                let op = BinOp::from_symbol(op_node.kind())
                    .ok_or_else(|| unsupported(op_node, format!("operator {}", op_node.kind())))?;
                Ok(Expr::BinOp {
                    left: Box::new(self.read_expr(field(node, "left", "binary_operator")?)?),
                    op,
                    right: Box::new(self.read_expr(field(node, "right", "binary_operator")?)?),
                })
            }
            "unary_operator" => {
                let op_node = field(node, "operator", "unary_operator")?;
                let op = match op_node.kind() {
                    "-" => UnaryOp::Neg,
                    "+" => UnaryOp::Pos,
                    "~" => UnaryOp::Invert,
                    other => return Err(unsupported(op_node, format!("operator {other}"))),
                };
                let operand = self.read_expr(field(node, "argument", "unary_operator")?)?;
                // Fold `-1` into a literal so index rewriting can see it.
                match (op, operand) {
                    (UnaryOp::Neg, Expr::Constant(Constant::Int(n))) => Ok(Expr::int(-n)),
                    (UnaryOp::Neg, Expr::Constant(Constant::Float(f))) => {
                        Ok(Expr::Constant(Constant::Float(-f)))
                    }
                    (op, operand) => Ok(Expr::UnaryOp {
                        op,
                        operand: Box::new(operand),
                    }),
                }
            }
            "not_operator" => Ok(Expr::UnaryOp {
                op: UnaryOp::Not,
                operand: Box::new(self.read_expr(field(node, "argument", "not_operator")?)?),
            }),
            "boolean_operator" => self.read_boolean_operator(node),
            "comparison_operator" => self.read_comparison(node),

            "call" => self.read_call(node),
            "attribute" => Ok(Expr::Attribute {
                value: Box::new(self.read_expr(field(node, "object", "attribute")?)?),
                attr: self
                    .node_text(field(node, "attribute", "attribute")?)
                    .to_string(),
            }),
            "subscript" => Ok(Expr::Subscript {
                value: Box::new(self.read_expr(field(node, "value", "subscript")?)?),
                index: Box::new(self.read_expr_list(node, "subscript")?),
            }),
            "slice" => self.read_slice(node),

            "list" | "list_pattern" => Ok(Expr::List(self.read_items(node)?)),
            "tuple" | "tuple_pattern" | "expression_list" | "pattern_list" => {
                Ok(Expr::Tuple(self.read_items(node)?))
            }
            "set" => Ok(Expr::Set(self.read_items(node)?)),
            "dictionary" => self.read_dictionary(node),
            "list_comprehension" => self.read_comprehension(node, ComprehensionKind::List),
            "set_comprehension" => self.read_comprehension(node, ComprehensionKind::Set),
            "dictionary_comprehension" => self.read_comprehension(node, ComprehensionKind::Dict),
            "generator_expression" => self.read_comprehension(node, ComprehensionKind::Generator),

            "parenthesized_expression" => {
                let inner = named_children(node)
                    .into_iter()
                    .next()
                    .ok_or_else(|| unsupported(node, "empty parentheses"))?;
                self.read_expr(inner)
            }
            "conditional_expression" => {
                let parts = named_children(node);
                match parts.as_slice() {
                    [body, test, orelse] => Ok(Expr::IfExp {
                        test: Box::new(self.read_expr(*test)?),
                        body: Box::new(self.read_expr(*body)?),
                        orelse: Box::new(self.read_expr(*orelse)?),
                    }),
                    _ => Err(unsupported(node, "malformed conditional expression")),
                }
            }
            "lambda" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| self.read_parameters(p))
                    .transpose()?
                    .unwrap_or_default();
                Ok(Expr::Lambda {
                    params,
                    body: Box::new(self.read_expr(field(node, "body", "lambda")?)?),
                })
            }
            "list_splat" | "list_splat_pattern" => {
                let inner = named_children(node)
                    .into_iter()
                    .next()
                    .ok_or_else(|| unsupported(node, "empty splat"))?;
                Ok(Expr::Starred(Box::new(self.read_expr(inner)?)))
            }

            other => Err(unsupported(node, other.replace('_', " "))),
        }
    }

    fn read_items(&self, node: Node) -> Result<Vec<Expr>, ReadError> {
        named_children(node)
            .into_iter()
            .map(|c| self.read_expr(c))
            .collect()
    }

    fn read_integer(&self, node: Node) -> Result<Expr, ReadError> {
        let text = self.node_text(node).replace('_', "");
        let lower = text.to_ascii_lowercase();
        let parsed = if let Some(hex) = lower.strip_prefix("0x") {
            i64::from_str_radix(hex, 16).ok()
        } else if let Some(oct) = lower.strip_prefix("0o") {
            i64::from_str_radix(oct, 8).ok()
        } else if let Some(bin) = lower.strip_prefix("0b") {
            i64::from_str_radix(bin, 2).ok()
        } else {
            lower.parse::<i64>().ok()
        };
        match parsed {
            Some(value) => Ok(Expr::int(value)),
            None => lower
                .parse::<f64>()
                .map(|f| Expr::Constant(Constant::Float(f)))
                .map_err(|_| unsupported(node, format!("integer literal {text}"))),
        }
    }

    fn read_float(&self, node: Node) -> Result<Expr, ReadError> {
        let text = self.node_text(node).replace('_', "");
        text.parse::<f64>()
            .map(|f| Expr::Constant(Constant::Float(f)))
            .map_err(|_| unsupported(node, format!("float literal {text}")))
    }

    fn read_concatenated_string(&self, node: Node) -> Result<Expr, ReadError> {
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut formatted = false;
        for child in named_children(node) {
            match self.read_string(child)? {
                Expr::Constant(Constant::Str(s)) => parts.push(FStringPart::Literal(s)),
                Expr::FString(inner) => {
                    formatted = true;
                    parts.extend(inner);
                }
                _ => return Err(unsupported(child, "string part")),
            }
        }
        if formatted {
            return Ok(Expr::FString(parts));
        }
        let joined: String = parts
            .into_iter()
            .map(|p| match p {
                FStringPart::Literal(s) => s,
                FStringPart::Expr(_) => String::new(),
            })
            .collect();
        Ok(Expr::string(joined))
    }

    fn read_string(&self, node: Node) -> Result<Expr, ReadError> {
        let text = self.node_text(node);
        let prefix_len = text.find(['"', '\'']).unwrap_or(0);
        let prefix = text[..prefix_len].to_ascii_lowercase();
        if prefix.contains('b') {
            return Err(unsupported(node, "bytes literal"));
        }
        let raw = prefix.contains('r');
        let rest = &text[prefix_len..];
        let quote_len = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
            3
        } else {
            1
        };
        if rest.len() < quote_len * 2 {
            return Err(unsupported(node, "malformed string literal"));
        }
        let content_start = node.start_byte() + prefix_len + quote_len;
        let content_end = node.end_byte() - quote_len;

        if !prefix.contains('f') {
            let body = &self.source[content_start..content_end];
            return Ok(Expr::string(decode_literal(body, raw, false)));
        }

        let mut parts = Vec::new();
        let mut pos = content_start;
        for child in named_children(node) {
            if child.kind() != "interpolation" {
                continue;
            }
            let literal = &self.source[pos..child.start_byte()];
            if !literal.is_empty() {
                parts.push(FStringPart::Literal(decode_literal(literal, raw, true)));
            }
            if child.child_by_field_name("format_specifier").is_some()
                || named_children(child)
                    .iter()
                    .any(|c| c.kind() == "format_specifier")
            {
                return Err(unsupported(child, "f-string format specifier"));
            }
            let expr_node = match child.child_by_field_name("expression") {
                Some(expr) => expr,
                None => named_children(child)
                    .into_iter()
                    .next()
                    .ok_or_else(|| unsupported(child, "empty interpolation"))?,
            };
            parts.push(FStringPart::Expr(self.read_expr(expr_node)?));
            pos = child.end_byte();
        }
        let tail = &self.source[pos..content_end];
        if !tail.is_empty() {
            parts.push(FStringPart::Literal(decode_literal(tail, raw, true)));
        }
        Ok(Expr::FString(parts))
    }

    fn read_boolean_operator(&self, node: Node) -> Result<Expr, ReadError> {
        let op_node = field(node, "operator", "boolean_operator")?;
        let op = match op_node.kind() {
            "and" => BoolOp::And,
            "or" => BoolOp::Or,
            other => return Err(unsupported(op_node, format!("operator {other}"))),
        };
        let left = self.read_expr(field(node, "left", "boolean_operator")?)?;
        let right = self.read_expr(field(node, "right", "boolean_operator")?)?;

        let mut values = match left {
            Expr::BoolOp {
                op: inner,
                values,
            } if inner == op => values,
            other => vec![other],
        };
        values.push(right);
        Ok(Expr::BoolOp { op, values })
    }

    fn read_comparison(&self, node: Node) -> Result<Expr, ReadError> {
        let mut operands = Vec::new();
        let mut ops = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "comment" {
                continue;
            }
            if child.is_named() {
                operands.push(self.read_expr(child)?);
            } else {
                let op = CmpOp::from_symbol(child.kind())
                    .ok_or_else(|| unsupported(child, format!("comparison {}", child.kind())))?;
                ops.push(op);
            }
        }
        if operands.len() != ops.len() + 1 || ops.is_empty() {
            return Err(unsupported(node, "malformed comparison"));
        }
        let mut operands = operands.into_iter();
        let left = operands.next().map(Box::new).ok_or_else(|| unsupported(node, "comparison"))?;
        Ok(Expr::Compare {
            left,
            ops,
            comparators: operands.collect(),
        })
    }

    fn read_call(&self, node: Node) -> Result<Expr, ReadError> {
        let func = self.read_expr(field(node, "function", "call")?)?;
        let arguments = field(node, "arguments", "call")?;

        if arguments.kind() == "generator_expression" {
            return Ok(Expr::call(func, vec![self.read_expr(arguments)?]));
        }

        let mut args = Vec::new();
        let mut keywords = Vec::new();
        for child in named_children(arguments) {
            match child.kind() {
                "keyword_argument" => keywords.push(Keyword {
                    name: Some(
                        self.node_text(field(child, "name", "keyword_argument")?)
                            .to_string(),
                    ),
                    value: self.read_expr(field(child, "value", "keyword_argument")?)?,
                }),
                "dictionary_splat" => {
                    let inner = named_children(child)
                        .into_iter()
                        .next()
                        .ok_or_else(|| unsupported(child, "empty splat"))?;
                    keywords.push(Keyword {
                        name: None,
                        value: self.read_expr(inner)?,
                    });
                }
                _ => args.push(self.read_expr(child)?),
            }
        }

        Ok(Expr::Call {
            func: Box::new(func),
            args,
            keywords,
        })
    }

    fn read_slice(&self, node: Node) -> Result<Expr, ReadError> {
        let mut slots: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut slot = 0;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == ":" {
                slot += 1;
            } else if child.is_named() && child.kind() != "comment" {
                if slot > 2 {
                    return Err(unsupported(node, "malformed slice"));
                }
                slots[slot] = Some(Box::new(self.read_expr(child)?));
            }
        }
        let [lower, upper, step] = slots;
        Ok(Expr::Slice { lower, upper, step })
    }

    fn read_dictionary(&self, node: Node) -> Result<Expr, ReadError> {
        let mut pairs = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "pair" => pairs.push((
                    self.read_expr(field(child, "key", "pair")?)?,
                    self.read_expr(field(child, "value", "pair")?)?,
                )),
                other => return Err(unsupported(child, format!("dictionary {other}"))),
            }
        }
        Ok(Expr::Dict(pairs))
    }

    fn read_comprehension(&self, node: Node, kind: ComprehensionKind) -> Result<Expr, ReadError> {
        let body = field(node, "body", "comprehension")?;
        let (elt, value) = if kind == ComprehensionKind::Dict {
            (
                self.read_expr(field(body, "key", "pair")?)?,
                Some(Box::new(self.read_expr(field(body, "value", "pair")?)?)),
            )
        } else {
            (self.read_expr(body)?, None)
        };

        let mut generators: Vec<Generator> = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "for_in_clause" => {
                    if self.node_text(child).starts_with("async") {
                        return Err(unsupported(child, "async comprehension"));
                    }
                    generators.push(Generator {
                        target: self.read_expr(field(child, "left", "for_in_clause")?)?,
                        iter: self.read_expr_list(child, "right")?,
                        ifs: Vec::new(),
                    });
                }
                "if_clause" => {
                    let cond = named_children(child)
                        .into_iter()
                        .next()
                        .ok_or_else(|| unsupported(child, "empty if clause"))?;
                    let cond = self.read_expr(cond)?;
                    generators
                        .last_mut()
                        .ok_or_else(|| unsupported(child, "if clause before for clause"))?
                        .ifs
                        .push(cond);
                }
                _ => {}
            }
        }

        Ok(Expr::Comprehension {
            kind,
            elt: Box::new(elt),
            value,
            generators,
        })
    }
}

fn first_error_line(node: Node) -> usize {
    if node.is_error() || node.is_missing() {
        return line_of(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            return first_error_line(child);
        }
    }
    line_of(node)
}

/// Decode Python escape sequences. In f-strings doubled braces are literal braces.
fn decode_literal(body: &str, raw: bool, formatted: bool) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' | '}' if formatted && chars.peek() == Some(&c) => {
                chars.next();
                out.push(c);
            }
            '\\' if !raw => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                Some('a') => out.push('\u{7}'),
                Some('b') => out.push('\u{8}'),
                Some('f') => out.push('\u{c}'),
                Some('v') => out.push('\u{b}'),
                Some('\n') => {}
                Some('x') => push_code_point(&mut out, &mut chars, 2, "\\x"),
                Some('u') => push_code_point(&mut out, &mut chars, 4, "\\u"),
                Some('U') => push_code_point(&mut out, &mut chars, 8, "\\U"),
                Some(d @ '0'..='7') => {
                    let mut value = d.to_digit(8).unwrap_or(0);
                    for _ in 0..2 {
                        match chars.peek().and_then(|n| n.to_digit(8)) {
                            Some(digit) => {
                                value = value * 8 + digit;
                                chars.next();
                            }
                            None => break,
                        }
                    }
                    out.extend(char::from_u32(value));
                }
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

fn push_code_point(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars>,
    digits: usize,
    escape: &str,
) {
    let hex: String = chars.by_ref().take(digits).collect();
    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
        Some(c) if hex.len() == digits => out.push(c),
        _ => {
            out.push_str(escape);
            out.push_str(&hex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_kind(source: &str) -> StmtKind {
        read_python(source).unwrap().body.remove(0).kind
    }

    fn expr(source: &str) -> Expr {
        match first_kind(source) {
            StmtKind::Expr(e) => e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_assignment() {
        match first_kind("x = 42") {
            StmtKind::Assign { targets, value } => {
                assert_eq!(targets, vec![Expr::name("x")]);
                assert_eq!(value, Expr::int(42));
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn test_chained_assignment() {
        match first_kind("a = b = 1") {
            StmtKind::Assign { targets, .. } => {
                assert_eq!(targets, vec![Expr::name("a"), Expr::name("b")]);
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn test_destructuring_assignment() {
        match first_kind("a, b = pair") {
            StmtKind::Assign { targets, .. } => {
                assert_eq!(
                    targets,
                    vec![Expr::Tuple(vec![Expr::name("a"), Expr::name("b")])]
                );
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn test_augmented_assignment() {
        match first_kind("x += 1") {
            StmtKind::AugAssign { op, .. } => assert_eq!(op, BinOp::Add),
            other => panic!("expected AugAssign, got {other:?}"),
        }
        match first_kind("x //= 2") {
            StmtKind::AugAssign { op, .. } => assert_eq!(op, BinOp::FloorDiv),
            other => panic!("expected AugAssign, got {other:?}"),
        }
    }

    #[test]
    fn test_function_call_with_keywords() {
        match expr("canvas.create_text(x, y, text=c, anchor='nw')") {
            Expr::Call { args, keywords, .. } => {
                assert_eq!(args.len(), 2);
                let names: Vec<_> = keywords.iter().filter_map(|k| k.name.clone()).collect();
                assert_eq!(names, vec!["text", "anchor"]);
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_literal_folds() {
        match expr("x[-1]") {
            Expr::Subscript { index, .. } => assert_eq!(*index, Expr::int(-1)),
            other => panic!("expected Subscript, got {other:?}"),
        }
    }

    #[test]
    fn test_slice_bounds() {
        match expr("x[1:]") {
            Expr::Subscript { index, .. } => match *index {
                Expr::Slice { lower, upper, step } => {
                    assert_eq!(lower.as_deref(), Some(&Expr::int(1)));
                    assert!(upper.is_none());
                    assert!(step.is_none());
                }
                other => panic!("expected Slice, got {other:?}"),
            },
            other => panic!("expected Subscript, got {other:?}"),
        }
    }

    #[test]
    fn test_chained_comparison_kept_whole() {
        match expr("a < b < c") {
            Expr::Compare { ops, comparators, .. } => {
                assert_eq!(ops, vec![CmpOp::Lt, CmpOp::Lt]);
                assert_eq!(comparators.len(), 2);
            }
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn test_not_in_operator() {
        match expr("c not in \"abc\"") {
            Expr::Compare { ops, .. } => assert_eq!(ops, vec![CmpOp::NotIn]),
            other => panic!("expected Compare, got {other:?}"),
        }
    }

    #[test]
    fn test_boolean_chain_flattens() {
        match expr("a or b or c") {
            Expr::BoolOp { op, values } => {
                assert_eq!(op, BoolOp::Or);
                assert_eq!(values.len(), 3);
            }
            other => panic!("expected BoolOp, got {other:?}"),
        }
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(expr(r#""a\nb\"c""#), Expr::string("a\nb\"c"));
        assert_eq!(expr(r#"r"a\nb""#), Expr::string("a\\nb"));
        assert_eq!(expr("'''x'''"), Expr::string("x"));
    }

    #[test]
    fn test_fstring_parts() {
        match expr("f\"<{tag}>\"") {
            Expr::FString(parts) => assert_eq!(
                parts,
                vec![
                    FStringPart::Literal("<".into()),
                    FStringPart::Expr(Expr::name("tag")),
                    FStringPart::Literal(">".into()),
                ]
            ),
            other => panic!("expected FString, got {other:?}"),
        }
    }

    #[test]
    fn test_elif_nests() {
        let source = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
        match first_kind(source) {
            StmtKind::If { orelse, .. } => {
                assert_eq!(orelse.len(), 1);
                match &orelse[0].kind {
                    StmtKind::If { orelse, .. } => assert_eq!(orelse.len(), 1),
                    other => panic!("expected nested If, got {other:?}"),
                }
            }
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn test_class_with_methods() {
        let source = "class A(B):\n    def __init__(self, x):\n        self.x = x\n";
        match first_kind(source) {
            StmtKind::ClassDef(class) => {
                assert_eq!(class.name, "A");
                assert_eq!(class.bases, vec![Expr::name("B")]);
                match &class.body[0].kind {
                    StmtKind::FunctionDef(f) => {
                        assert_eq!(f.name, "__init__");
                        assert_eq!(f.params.len(), 2);
                    }
                    other => panic!("expected FunctionDef, got {other:?}"),
                }
            }
            other => panic!("expected ClassDef, got {other:?}"),
        }
    }

    #[test]
    fn test_with_statement() {
        let source = "with open(\"a.txt\") as f:\n    data = f.read()\n";
        match first_kind(source) {
            StmtKind::With { items, body } => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].target, Some(Expr::name("f")));
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected With, got {other:?}"),
        }
    }

    #[test]
    fn test_try_except() {
        let source = "try:\n    x()\nexcept ValueError as e:\n    y()\n";
        match first_kind(source) {
            StmtKind::Try { handlers, .. } => {
                assert_eq!(handlers.len(), 1);
                assert_eq!(handlers[0].typ, Some(Expr::name("ValueError")));
                assert_eq!(handlers[0].name.as_deref(), Some("e"));
            }
            other => panic!("expected Try, got {other:?}"),
        }
    }

    #[test]
    fn test_list_comprehension() {
        match expr("[x * 2 for x in xs if x]") {
            Expr::Comprehension {
                kind, generators, ..
            } => {
                assert_eq!(kind, ComprehensionKind::List);
                assert_eq!(generators.len(), 1);
                assert_eq!(generators[0].ifs.len(), 1);
            }
            other => panic!("expected Comprehension, got {other:?}"),
        }
    }

    #[test]
    fn test_statement_lines() {
        let module = read_python("import socket\n\nx = 1\n").unwrap();
        assert_eq!(module.body[0].line, 1);
        assert_eq!(module.body[1].line, 3);
    }

    #[test]
    fn test_bare_statements_in_blocks() {
        let module = read_python(
            "def f(self):\n    \"\"\"Doc.\"\"\"\n    self.width = 1\n    n += 1\n    print(n)\n    not n\n    [x for x in n]\n    lambda: 1\n",
        )
        .unwrap();
        let StmtKind::FunctionDef(def) = &module.body[0].kind else {
            panic!("expected a function");
        };
        let kinds: Vec<&str> = def
            .body
            .iter()
            .map(|stmt| match &stmt.kind {
                StmtKind::Expr(Expr::Constant(Constant::Str(_))) => "doc",
                StmtKind::Assign { .. } => "assign",
                StmtKind::AugAssign { .. } => "aug",
                StmtKind::Expr(_) => "expr",
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(kinds, ["doc", "assign", "aug", "expr", "expr", "expr", "expr"]);
        assert_eq!(def.body[1].line, 3);
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            read_python("def (:\n"),
            Err(ReadError::Syntax { .. })
        ));
    }

    #[test]
    fn test_unsupported_statement() {
        let err = read_python("async def f():\n    pass\n").unwrap_err();
        assert!(matches!(err, ReadError::Unsupported { .. }));
    }
}
