//! Statement translator.
//!
//! [`Translator`] writes one JavaScript line per call to `write_line`, two
//! spaces per indent level, no blank lines. Expression translation lives in
//! [`crate::expr`] as a second `impl` block on the same type.

use crate::context::Context;
use crate::emit;
use crate::error::{CompileError, ConstructKind};
use crate::scope;
use stepjs_syntax::{
    BinOp, ClassDef, Constant, ExceptHandler, Expr, FunctionDef, Param, ParamKind, Stmt,
    StmtKind, WithItem,
};

pub(crate) type Result<T> = std::result::Result<T, CompileError>;

/// What the code currently being emitted may do.
#[derive(Debug, Clone, Default)]
pub(crate) struct Frame {
    /// Receiver parameter of the enclosing method, emitted as `this`.
    pub self_name: Option<String>,
    /// Inside the initializer that replaces `__init__`.
    pub in_init: bool,
    /// Emitted code may contain `await`.
    pub can_suspend: bool,
    pub module_scope: bool,
}

/// The class whose body is being emitted.
#[derive(Debug, Clone)]
struct ClassScope {
    name: String,
    has_base: bool,
}

pub(crate) struct Translator<'a> {
    pub(crate) ctx: &'a mut Context,
    output: String,
    indent: usize,
    /// Source line of the statement being translated.
    pub(crate) line: usize,
    pub(crate) frame: Frame,
    class: Option<ClassScope>,
}

impl<'a> Translator<'a> {
    pub(crate) fn new(ctx: &'a mut Context) -> Self {
        Self {
            ctx,
            output: String::new(),
            indent: 0,
            line: 0,
            frame: Frame {
                can_suspend: true,
                module_scope: true,
                ..Frame::default()
            },
            class: None,
        }
    }

    pub(crate) fn finish(self) -> String {
        self.output
    }

    pub(crate) fn unsupported(&self, kind: ConstructKind, construct: impl Into<String>) -> CompileError {
        CompileError::unsupported(kind, construct, self.line)
    }

    fn write_line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn write_lines(&mut self, lines: Vec<String>) {
        for line in lines {
            self.write_line(&line);
        }
    }

    /// Re-emit captured output one level deeper.
    fn write_nested(&mut self, captured: &str) {
        self.indent += 1;
        for line in captured.lines() {
            self.write_line(line);
        }
        self.indent -= 1;
    }

    /// Run `f` against an empty buffer at indent 0 and return what it wrote.
    fn capture(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<String> {
        let saved_output = std::mem::take(&mut self.output);
        let saved_indent = std::mem::replace(&mut self.indent, 0);
        let result = f(self);
        let captured = std::mem::replace(&mut self.output, saved_output);
        self.indent = saved_indent;
        result.map(|()| captured)
    }

    fn block(&mut self, stmts: &[Stmt]) -> Result<()> {
        self.indent += 1;
        let result = self.stmts(stmts);
        self.indent -= 1;
        result
    }

    pub(crate) fn stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    pub(crate) fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        self.line = stmt.line;
        if self.ctx.in_class_body {
            return self.class_member(stmt);
        }

        match &stmt.kind {
            StmtKind::FunctionDef(def) => self.function(def),
            StmtKind::ClassDef(class) => self.class_def(class),
            StmtKind::Return(value) => {
                let text = if self.frame.in_init {
                    emit::return_this()
                } else {
                    let value = value.as_ref().map(|v| self.expr(v)).transpose()?;
                    emit::return_stmt(value.as_deref())
                };
                self.write_line(&text);
                Ok(())
            }
            StmtKind::Assign { targets, value } => {
                let targets = targets
                    .iter()
                    .map(|t| self.target(t))
                    .collect::<Result<Vec<_>>>()?;
                let value = self.expr(value)?;
                self.write_line(&emit::assign(&targets, &value));
                Ok(())
            }
            StmtKind::AugAssign { target, op, value } => {
                let target = self.target(target)?;
                let value = self.expr(value)?;
                let text = match op {
                    BinOp::FloorDiv => emit::assign(
                        std::slice::from_ref(&target),
                        &emit::floor_div(&target, &value),
                    ),
                    op => emit::aug_assign(&target, op.symbol(), &value),
                };
                self.write_line(&text);
                Ok(())
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                if !orelse.is_empty() {
                    return Err(self.unsupported(
                        ConstructKind::LoopElse,
                        format!("for {target} in {iter}: ... else"),
                    ));
                }
                let target = self.target(target)?;
                let iter = self.expr(iter)?;
                self.write_line(&emit::for_of_head(&target, &iter));
                self.block(body)?;
                self.write_line(&emit::block_close());
                Ok(())
            }
            StmtKind::While { test, body, orelse } => {
                if !orelse.is_empty() {
                    return Err(self.unsupported(
                        ConstructKind::LoopElse,
                        format!("while {test}: ... else"),
                    ));
                }
                let condition = self.condition(test)?;
                self.write_line(&emit::while_head(&condition));
                self.block(body)?;
                self.write_line(&emit::block_close());
                Ok(())
            }
            StmtKind::If { test, body, orelse } => self.if_stmt(test, body, orelse),
            StmtKind::With { items, body } => self.with_stmt(items, body),
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => self.try_stmt(body, handlers, orelse, finalbody),
            StmtKind::Raise(Some(value)) => {
                let value = self.expr(value)?;
                self.write_line(&emit::throw(&value));
                Ok(())
            }
            StmtKind::Raise(None) => Err(self.unsupported(ConstructKind::Statement, "raise")),
            StmtKind::Assert { test, msg } => {
                let negated = emit::not(&self.condition(test)?);
                let msg = msg.as_ref().map(|m| self.expr(m)).transpose()?;
                self.write_line(&emit::assertion(&negated, msg.as_deref()));
                Ok(())
            }
            StmtKind::Delete(targets) => {
                for target in targets {
                    let target = self.expr(target)?;
                    self.write_line(&emit::delete(&target));
                }
                Ok(())
            }
            StmtKind::Import(names) => {
                for alias in names {
                    self.import(&alias.name);
                }
                Ok(())
            }
            StmtKind::ImportFrom { module, .. } => {
                self.import(module);
                Ok(())
            }
            StmtKind::Expr(Expr::Constant(Constant::Str(text))) => {
                self.write_lines(emit::comment(text));
                Ok(())
            }
            StmtKind::Expr(expr) => {
                let expr = self.expr(expr)?;
                self.write_line(&emit::expr_stmt(&expr));
                Ok(())
            }
            StmtKind::Break => {
                self.write_line(&emit::break_stmt());
                Ok(())
            }
            StmtKind::Continue => {
                self.write_line(&emit::continue_stmt());
                Ok(())
            }
            StmtKind::Global(_) | StmtKind::Nonlocal(_) | StmtKind::Pass => Ok(()),
        }
    }

    /// Module bindings are registered by the classifier; only unknown modules leave a trace.
    fn import(&mut self, module: &str) {
        if !self.ctx.is_known_module(module) {
            tracing::debug!(line = self.line, module, "import of unconfigured module");
            self.write_line(&emit::configure_module(module));
        }
    }

    /// An assignment target: names, attributes, subscripts and destructuring.
    pub(crate) fn target(&mut self, target: &Expr) -> Result<String> {
        match target {
            Expr::Name(name) => Ok(self.name_ref(name)),
            Expr::Tuple(items) | Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.target(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(emit::array(&items))
            }
            Expr::Starred(inner) => Ok(emit::spread(&self.target(inner)?)),
            Expr::Attribute { .. } | Expr::Subscript { .. } => self.expr(target),
            other => Err(self.unsupported(
                ConstructKind::Statement,
                format!("assignment to {other}"),
            )),
        }
    }

    pub(crate) fn params(&mut self, params: &[Param]) -> Result<Vec<String>> {
        params
            .iter()
            .map(|param| -> Result<String> {
                let name = emit::identifier(&param.name);
                Ok(match param.kind {
                    ParamKind::Positional => {
                        let default = param.default.as_ref().map(|d| self.expr(d)).transpose()?;
                        emit::param(&name, default.as_deref())
                    }
                    ParamKind::VarArgs => emit::rest_param(&name),
                    // Receives the options object library-style callers pass.
                    ParamKind::KwArgs => emit::param(&name, None),
                })
            })
            .collect()
    }

    fn reject_decorators(&self, decorators: &[Expr]) -> Result<()> {
        match decorators.first() {
            Some(decorator) => Err(self.unsupported(
                ConstructKind::Decorator,
                format!("@{decorator}"),
            )),
            None => Ok(()),
        }
    }

    fn function(&mut self, def: &FunctionDef) -> Result<()> {
        self.reject_decorators(&def.decorators)?;
        let params = self.params(&def.params)?;
        self.write_line(&emit::function_head(&emit::identifier(&def.name), &params));
        let frame = Frame {
            can_suspend: true,
            ..Frame::default()
        };
        self.function_body(&def.body, &def.params, frame)?;
        self.write_line(&emit::block_close());
        Ok(())
    }

    /// Body of a function or method: hoisted locals, statements, and the
    /// trailing `return this;` of an initializer.
    fn function_body(&mut self, body: &[Stmt], params: &[Param], frame: Frame) -> Result<()> {
        let param_names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
        let locals = scope::local_bindings(body, &param_names, self.ctx, false);
        let in_init = frame.in_init;

        let saved_frame = std::mem::replace(&mut self.frame, frame);
        let saved_class_body = std::mem::replace(&mut self.ctx.in_class_body, false);
        let saved_class = self.class.take();
        self.indent += 1;

        if !locals.is_empty() {
            let names: Vec<String> = locals.iter().map(|n| emit::identifier(n)).collect();
            self.write_line(&emit::let_decl(&names));
        }
        let result = self.stmts(body);
        let ends_in_return = matches!(body.last().map(|s| &s.kind), Some(StmtKind::Return(_)));
        if result.is_ok() && in_init && !ends_in_return {
            self.write_line(&emit::return_this());
        }

        self.indent -= 1;
        self.class = saved_class;
        self.ctx.in_class_body = saved_class_body;
        self.frame = saved_frame;
        result
    }

    fn class_def(&mut self, class: &ClassDef) -> Result<()> {
        self.reject_decorators(&class.decorators)?;
        if class.bases.len() > 1 {
            let bases: Vec<String> = class.bases.iter().map(Expr::to_string).collect();
            return Err(self.unsupported(
                ConstructKind::Statement,
                format!("class {}({})", class.name, bases.join(", ")),
            ));
        }
        let base = class.bases.first().map(|b| self.expr(b)).transpose()?;
        self.write_line(&emit::class_head(&emit::identifier(&class.name), base.as_deref()));

        let saved_class = self.class.replace(ClassScope {
            name: class.name.clone(),
            has_base: base.is_some(),
        });
        let saved_class_body = std::mem::replace(&mut self.ctx.in_class_body, true);
        let result = self.block(&class.body);
        self.ctx.in_class_body = saved_class_body;
        self.class = saved_class;
        result?;

        self.write_line(&emit::block_close());
        Ok(())
    }

    /// A statement directly inside a class body.
    fn class_member(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::FunctionDef(def) => self.method(def),
            StmtKind::Assign { targets, value } => match targets.as_slice() {
                [Expr::Name(name)] => {
                    let value = self.in_sync(|t| t.expr(value))?;
                    self.write_line(&emit::static_field(&emit::identifier(name), &value));
                    Ok(())
                }
                _ => Err(self.unsupported(
                    ConstructKind::Statement,
                    "class attribute with a non-name target",
                )),
            },
            StmtKind::Expr(Expr::Constant(Constant::Str(text))) => {
                self.write_lines(emit::comment(text));
                Ok(())
            }
            StmtKind::Pass => Ok(()),
            _ => Err(self.unsupported(ConstructKind::Statement, "statement in class body")),
        }
    }

    fn method(&mut self, def: &FunctionDef) -> Result<()> {
        self.reject_decorators(&def.decorators)?;
        let Some(class) = self.class.clone() else {
            return self.function(def);
        };

        let (receiver, rest) = match def.params.split_first() {
            Some((first, rest)) if first.kind == ParamKind::Positional => {
                (Some(first.name.clone()), rest)
            }
            _ => (None, def.params.as_slice()),
        };
        let params = self.params(rest)?;
        let mut frame = Frame {
            self_name: receiver,
            can_suspend: true,
            ..Frame::default()
        };

        let head = match def.name.as_str() {
            "__init__" => {
                if !self.ctx.inherits_initializer(&class.name) {
                    self.write_lines(emit::constructor_shell(class.has_base));
                }
                frame.in_init = true;
                emit::method_head(emit::INIT_METHOD, &params, true)
            }
            "__repr__" | "__str__" => {
                frame.can_suspend = false;
                emit::method_head("toString", &params, false)
            }
            name => emit::method_head(name, &params, true),
        };
        self.write_line(&head);
        self.function_body(&def.body, &def.params, frame)?;
        self.write_line(&emit::block_close());
        Ok(())
    }

    fn if_stmt(&mut self, test: &Expr, body: &[Stmt], orelse: &[Stmt]) -> Result<()> {
        if self.frame.module_scope && scope::is_main_guard(test) {
            self.write_line(&emit::harness_required());
            return Ok(());
        }

        let condition = self.condition(test)?;
        let captured = self.capture(|t| t.stmts(body))?;

        if orelse.is_empty() && body.len() == 1 && !body[0].is_compound() {
            if let Some(single) = single_line(&captured) {
                self.write_line(&emit::if_inline(&condition, single));
                return Ok(());
            }
        }

        self.write_line(&emit::if_head(&condition));
        self.write_nested(&captured);

        let mut rest = orelse;
        loop {
            match rest {
                [] => break,
                [
                    Stmt {
                        line,
                        kind:
                            StmtKind::If {
                                test,
                                body,
                                orelse,
                            },
                    },
                ] => {
                    self.line = *line;
                    let condition = self.condition(test)?;
                    self.write_line(&emit::else_if_head(&condition));
                    let captured = self.capture(|t| t.stmts(body))?;
                    self.write_nested(&captured);
                    rest = orelse;
                }
                other => {
                    self.write_line(&emit::else_head());
                    self.block(other)?;
                    break;
                }
            }
        }

        self.write_line(&emit::block_close());
        Ok(())
    }

    fn with_stmt(&mut self, items: &[WithItem], body: &[Stmt]) -> Result<()> {
        let [item] = items else {
            return Err(self.unsupported(
                ConstructKind::ResourceBlock,
                format!("with statement with {} items", items.len()),
            ));
        };
        let Some(Expr::Name(name)) = &item.target else {
            return Err(self.unsupported(
                ConstructKind::ResourceBlock,
                format!("with {} without an as-name", item.context),
            ));
        };

        let resource = self.name_ref(name);
        let value = self.expr(&item.context)?;
        self.write_line(&emit::assign(std::slice::from_ref(&resource), &value));
        self.write_line(&emit::block_open());
        self.block(body)?;
        self.write_line(&emit::block_close());
        self.write_line(&emit::release(&resource));
        Ok(())
    }

    fn try_stmt(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        orelse: &[Stmt],
        finalbody: &[Stmt],
    ) -> Result<()> {
        if handlers.len() > 1 {
            return Err(self.unsupported(
                ConstructKind::ExceptionHandlers,
                format!("try with {} except clauses", handlers.len()),
            ));
        }
        if !orelse.is_empty() {
            return Err(self.unsupported(
                ConstructKind::ExceptionHandlers,
                "try with an else clause",
            ));
        }

        self.write_line(&emit::try_head());
        self.block(body)?;

        if let Some(handler) = handlers.first() {
            self.line = handler.line;
            if let Some(typ) = &handler.typ {
                tracing::debug!(line = handler.line, exception = %typ, "exception type discarded");
            }
            let binding = handler.name.as_deref().map(emit::identifier);
            self.write_line(&emit::catch_head(binding.as_deref()));
            self.block(&handler.body)?;
        }

        if !finalbody.is_empty() {
            self.write_line(&emit::finally_head());
            self.block(finalbody)?;
        }

        self.write_line(&emit::block_close());
        Ok(())
    }
}

/// The only line of `text`, unless it is a comment.
fn single_line(text: &str) -> Option<&str> {
    let mut lines = text.lines();
    match (lines.next(), lines.next()) {
        (Some(line), None) if !line.starts_with("//") => Some(line),
        _ => None,
    }
}
