//! Expression translator and call dispatch.
//!
//! Calls are resolved in a fixed order: ours declarations (always awaited),
//! then library declarations from [`crate::tables`] (awaited only when the
//! entry suspends), then anything else verbatim.

use crate::context::Context;
use crate::emit::{self, ObjectKey, TemplatePiece};
use crate::error::{CompileError, ConstructKind};
use crate::stmt::{Result, Translator};
use crate::tables::{self, Decl, Rule, Special};
use stepjs_syntax::{
    BinOp, BoolOp, CmpOp, ComprehensionKind, Constant, Expr, FStringPart, Generator, Keyword,
    UnaryOp,
};

impl Translator<'_> {
    pub(crate) fn expr(&mut self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Name(name) => Ok(self.name_ref(name)),
            Expr::Constant(constant) => Ok(constant_js(constant)),
            Expr::FString(parts) => {
                let pieces = parts
                    .iter()
                    .map(|part| -> Result<TemplatePiece> {
                        Ok(match part {
                            FStringPart::Literal(text) => TemplatePiece::Text(text.clone()),
                            FStringPart::Expr(e) => TemplatePiece::Value(self.expr(e)?),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(emit::template(&pieces))
            }
            Expr::Attribute { value, attr } => Ok(emit::member(&self.expr(value)?, attr)),
            Expr::Call {
                func,
                args,
                keywords,
            } => self.call(expr, func, args, keywords),
            Expr::Subscript { value, index } => self.subscript(value, index),
            Expr::Slice { .. } => Err(self.unsupported(
                ConstructKind::Expression,
                format!("slice {expr} outside a subscript"),
            )),
            Expr::BinOp { left, op, right } => {
                let lhs = self.expr(left)?;
                let rhs = self.expr(right)?;
                Ok(match op {
                    BinOp::FloorDiv => emit::floor_div(&lhs, &rhs),
                    BinOp::Mul if left.as_str_literal().is_some() => emit::repeat(&lhs, &rhs),
                    BinOp::Mul if right.as_str_literal().is_some() => emit::repeat(&rhs, &lhs),
                    op => emit::binary(&lhs, op.symbol(), &rhs),
                })
            }
            Expr::UnaryOp { op, operand } => Ok(match op {
                UnaryOp::Not => emit::not(&self.condition(operand)?),
                UnaryOp::Neg => emit::unary("-", &self.expr(operand)?),
                UnaryOp::Pos => emit::unary("+", &self.expr(operand)?),
                UnaryOp::Invert => emit::unary("~", &self.expr(operand)?),
            }),
            Expr::BoolOp { op, values } => {
                let values = values
                    .iter()
                    .map(|v| self.condition(v))
                    .collect::<Result<Vec<_>>>()?;
                let op = match op {
                    BoolOp::And => "&&",
                    BoolOp::Or => "||",
                };
                Ok(emit::logical(op, &values))
            }
            Expr::Compare {
                left,
                ops,
                comparators,
            } => match (ops.as_slice(), comparators.as_slice()) {
                ([op], [right]) => self.compare(expr, left, *op, right),
                _ => Err(self.unsupported(ConstructKind::ChainedComparison, expr.to_string())),
            },
            Expr::List(items) | Expr::Tuple(items) => Ok(emit::array(&self.exprs(items)?)),
            Expr::Set(items) => Ok(emit::set(&self.exprs(items)?)),
            Expr::Dict(pairs) => {
                let pairs = pairs
                    .iter()
                    .map(|(key, value)| -> Result<(ObjectKey, String)> {
                        let key = match key.as_str_literal() {
                            Some(name) => ObjectKey::Literal(name.to_string()),
                            None => ObjectKey::Computed(self.expr(key)?),
                        };
                        Ok((key, self.expr(value)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(emit::object(&pairs))
            }
            Expr::Comprehension {
                kind,
                elt,
                value,
                generators,
            } => self.comprehension(expr, *kind, elt, value.as_deref(), generators),
            Expr::IfExp { test, body, orelse } => {
                let test = self.condition(test)?;
                let body = self.expr(body)?;
                let orelse = self.expr(orelse)?;
                Ok(emit::conditional(&test, &body, &orelse))
            }
            Expr::Lambda { params, body } => {
                let params = self.params(params)?;
                let body = self.in_sync(|t| t.expr(body))?;
                Ok(emit::lambda(&params, &body))
            }
            Expr::Starred(value) => Ok(emit::spread(&self.expr(value)?)),
        }
    }

    fn exprs(&mut self, exprs: &[Expr]) -> Result<Vec<String>> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    pub(crate) fn name_ref(&self, name: &str) -> String {
        if self.frame.self_name.as_deref() == Some(name) {
            emit::this()
        } else {
            emit::identifier(name)
        }
    }

    /// An expression in test position: wrapped in `truthy(...)` unless it is
    /// already boolean-valued.
    pub(crate) fn condition(&mut self, test: &Expr) -> Result<String> {
        let js = self.expr(test)?;
        if is_boolean_valued(test, self.ctx) {
            Ok(js)
        } else {
            self.ctx.use_helper(emit::TRUTHY);
            Ok(emit::truthy(&js))
        }
    }

    /// Run `f` where emitted code cannot suspend (callbacks, `toString`).
    pub(crate) fn in_sync<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = std::mem::replace(&mut self.frame.can_suspend, false);
        let result = f(self);
        self.frame.can_suspend = saved;
        result
    }

    fn suspend(&self, call_js: &str, call: &Expr) -> Result<String> {
        if !self.frame.can_suspend {
            return Err(self.unsupported(ConstructKind::SuspendInSyncContext, call.to_string()));
        }
        Ok(emit::suspend(call_js))
    }

    fn subscript(&mut self, value: &Expr, index: &Expr) -> Result<String> {
        let object = self.expr(value)?;
        match index {
            Expr::Slice {
                step: Some(step), ..
            } => Err(self.unsupported(
                ConstructKind::Subscript,
                format!("{value}[{index}] (slice step {step})"),
            )),
            Expr::Slice { lower, upper, .. } => {
                let lower = lower.as_deref().map(|l| self.expr(l)).transpose()?;
                let upper = upper.as_deref().map(|u| self.expr(u)).transpose()?;
                Ok(emit::slice(&object, lower.as_deref(), upper.as_deref()))
            }
            Expr::Constant(Constant::Int(-1)) if is_pure(value) => Ok(emit::last_element(&object)),
            Expr::Constant(Constant::Int(-1)) => Err(self.unsupported(
                ConstructKind::Subscript,
                format!("{value}[-1] (receiver would be evaluated twice)"),
            )),
            Expr::Constant(Constant::Int(n)) if *n < 0 => {
                tracing::warn!(line = self.line, index = n, "negative index emitted verbatim");
                Ok(emit::index(&object, &emit::int(*n)))
            }
            other => {
                let index = self.expr(other)?;
                Ok(emit::index(&object, &index))
            }
        }
    }

    fn compare(&mut self, expr: &Expr, left: &Expr, op: CmpOp, right: &Expr) -> Result<String> {
        match op {
            CmpOp::In | CmpOp::NotIn => {
                let test = self.membership(expr, left, right)?;
                Ok(if op == CmpOp::NotIn {
                    emit::not(&test)
                } else {
                    test
                })
            }
            CmpOp::Eq | CmpOp::NotEq => {
                let negate = op == CmpOp::NotEq;
                let lhs = self.expr(left)?;
                let rhs = self.expr(right)?;
                Ok(if is_sequence_literal(left) || is_sequence_literal(right) {
                    emit::structural_eq(&lhs, &rhs, negate)
                } else {
                    emit::strict_eq(&lhs, &rhs, negate)
                })
            }
            CmpOp::Is | CmpOp::IsNot => {
                let lhs = self.expr(left)?;
                let rhs = self.expr(right)?;
                Ok(emit::strict_eq(&lhs, &rhs, op == CmpOp::IsNot))
            }
            CmpOp::Lt | CmpOp::LtE | CmpOp::Gt | CmpOp::GtE => {
                let lhs = self.expr(left)?;
                let rhs = self.expr(right)?;
                Ok(emit::binary(&lhs, op.symbol(), &rhs))
            }
        }
    }

    fn membership(&mut self, expr: &Expr, needle: &Expr, haystack: &Expr) -> Result<String> {
        match haystack {
            Expr::List(items) | Expr::Tuple(items) | Expr::Set(items) => {
                if items.len() > 1 && !is_pure(needle) {
                    return Err(self.unsupported(
                        ConstructKind::Membership,
                        format!("{expr} (left side would be evaluated more than once)"),
                    ));
                }
                let needle = self.expr(needle)?;
                let items = self.exprs(items)?;
                Ok(emit::any_equal(&needle, &items))
            }
            Expr::Constant(Constant::Str(_)) => {
                let haystack = self.expr(haystack)?;
                let needle = self.expr(needle)?;
                Ok(emit::includes(&haystack, &needle))
            }
            _ => Err(self.unsupported(ConstructKind::Membership, expr.to_string())),
        }
    }

    fn comprehension(
        &mut self,
        expr: &Expr,
        kind: ComprehensionKind,
        elt: &Expr,
        value: Option<&Expr>,
        generators: &[Generator],
    ) -> Result<String> {
        let generator = match generators {
            [generator] if generator.ifs.len() <= 1 => generator,
            _ => return Err(self.unsupported(ConstructKind::Comprehension, expr.to_string())),
        };

        // The iterable is evaluated once, before any callback runs.
        let mut out = self.expr(&generator.iter)?;
        self.in_sync(|t| {
            let param = t.target(&generator.target)?;
            if let Some(test) = generator.ifs.first() {
                let test = t.condition(test)?;
                out = emit::filter(&out, &param, &test);
            }
            match (kind, value) {
                (ComprehensionKind::Dict, Some(value)) => {
                    let entry = emit::array(&[t.expr(elt)?, t.expr(value)?]);
                    Ok(emit::from_entries(&emit::map(&out, &param, &entry)))
                }
                (ComprehensionKind::Dict, None) => {
                    Err(t.unsupported(ConstructKind::Comprehension, expr.to_string()))
                }
                (kind, _) => {
                    if *elt != generator.target {
                        out = emit::map(&out, &param, &t.expr(elt)?);
                    }
                    Ok(if kind == ComprehensionKind::Set {
                        emit::new_set(&out)
                    } else {
                        out
                    })
                }
            }
        })
    }

    fn call(&mut self, call: &Expr, func: &Expr, args: &[Expr], keywords: &[Keyword]) -> Result<String> {
        match func {
            Expr::Name(name) => self.call_name(call, name, args, keywords),
            Expr::Attribute { value, attr } => self.call_attribute(call, value, attr, args, keywords),
            _ => {
                let callee = self.expr(func)?;
                self.verbatim(call, &callee, args, keywords)
            }
        }
    }

    fn call_name(&mut self, call: &Expr, name: &str, args: &[Expr], keywords: &[Keyword]) -> Result<String> {
        let callee = self.name_ref(name);

        if self.ctx.is_our_class(name) {
            let signature = self.ctx.class_signature(name).map(<[String]>::to_vec);
            let args = self.ours_args(call, signature, args, keywords)?;
            return self.suspend(&emit::new_instance(&callee, &args), call);
        }
        if self.ctx.is_our_function(name) {
            let signature = self.ctx.function_signature(name).map(<[String]>::to_vec);
            let args = self.ours_args(call, signature, args, keywords)?;
            return self.suspend(&emit::call(&callee, &args), call);
        }

        let decl = match self.ctx.import_path(name) {
            Some(path) => tables::module_function(path),
            None => tables::function(name),
        };
        match decl {
            Some(decl) => self.apply(decl, call, &callee, None, args, keywords),
            None => self.verbatim(call, &callee, args, keywords),
        }
    }

    fn call_attribute(
        &mut self,
        call: &Expr,
        value: &Expr,
        attr: &str,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Result<String> {
        if is_super_call(value) {
            let method = if attr == "__init__" {
                emit::INIT_METHOD
            } else {
                attr
            };
            let args = self.ours_args(call, None, args, keywords)?;
            return self.suspend(&emit::method_call(&emit::super_ref(), method, &args), call);
        }

        if let Some(qualified) = self.module_path(value, attr) {
            let callee = emit::member(&self.expr(value)?, attr);
            return match tables::module_function(&qualified) {
                Some(decl) => self.apply(decl, call, &callee, None, args, keywords),
                None => self.verbatim(call, &callee, args, keywords),
            };
        }

        let receiver = self.expr(value)?;
        if self.ctx.is_our_method(attr) {
            let signature = self.ctx.method_signature(attr).map(<[String]>::to_vec);
            let args = self.ours_args(call, signature, args, keywords)?;
            return self.suspend(&emit::method_call(&receiver, attr, &args), call);
        }
        match tables::method(attr) {
            Some(decl) if decl.repeats_receiver() && !is_pure(value) => {
                Err(self.repeated(call, "receiver"))
            }
            Some(decl) => self.apply(decl, call, attr, Some(receiver), args, keywords),
            None => self.verbatim(call, &emit::member(&receiver, attr), args, keywords),
        }
    }

    /// Full module path of `value.attr` when `value` is rooted at an import binding.
    fn module_path(&self, value: &Expr, attr: &str) -> Option<String> {
        let path = value.dotted_path()?;
        let (root, rest) = match path.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (path.as_str(), None),
        };
        if self.frame.self_name.as_deref() == Some(root) {
            return None;
        }
        let module = self.ctx.import_path(root)?;
        Some(match rest {
            Some(rest) => format!("{module}.{rest}.{attr}"),
            None => format!("{module}.{attr}"),
        })
    }

    /// Arguments of an ours call. Keywords are placed by the recorded
    /// signature; gaps are filled with `undefined`.
    fn ours_args(
        &mut self,
        call: &Expr,
        signature: Option<Vec<String>>,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Result<Vec<String>> {
        let positional = self.exprs(args)?;
        if keywords.is_empty() {
            return Ok(positional);
        }
        let Some(signature) = signature else {
            return Err(self.unsupported(ConstructKind::KeywordArguments, call.to_string()));
        };

        let mut slots: Vec<Option<String>> = positional.into_iter().map(Some).collect();
        for keyword in keywords {
            let position = keyword
                .name
                .as_deref()
                .and_then(|name| signature.iter().position(|p| p == name));
            let Some(position) = position else {
                return Err(self.unsupported(ConstructKind::KeywordArguments, call.to_string()));
            };
            if slots.len() <= position {
                slots.resize(position + 1, None);
            }
            if slots[position].is_some() {
                return Err(self.unsupported(ConstructKind::KeywordArguments, call.to_string()));
            }
            slots[position] = Some(self.expr(&keyword.value)?);
        }
        Ok(slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(emit::undefined))
            .collect())
    }

    /// Arguments of a library call. Keywords become a trailing options object.
    fn library_args(&mut self, args: &[Expr], keywords: &[Keyword]) -> Result<Vec<String>> {
        let mut out = self.exprs(args)?;
        if !keywords.is_empty() {
            let pairs = keywords
                .iter()
                .map(|k| -> Result<(Option<String>, String)> {
                    Ok((k.name.clone(), self.expr(&k.value)?))
                })
                .collect::<Result<Vec<_>>>()?;
            out.push(emit::options_object(&pairs));
        }
        Ok(out)
    }

    fn verbatim(&mut self, call: &Expr, callee: &str, args: &[Expr], keywords: &[Keyword]) -> Result<String> {
        tracing::debug!(line = self.line, call = %call, "no declaration, emitting call verbatim");
        let args = self.library_args(args, keywords)?;
        Ok(emit::call(callee, &args))
    }

    /// Apply a declaration table entry. `callee` is the JavaScript callee for
    /// functions and the method name when `receiver` is set.
    fn apply(
        &mut self,
        decl: &Decl,
        call: &Expr,
        callee: &str,
        receiver: Option<String>,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Result<String> {
        let text = match decl.rule {
            Rule::Emit(special) => self.special(special, call, receiver, args, keywords)?,
            Rule::Direct => {
                let args = self.library_args(args, keywords)?;
                match &receiver {
                    Some(receiver) => emit::method_call(receiver, callee, &args),
                    None => emit::call(callee, &args),
                }
            }
            Rule::New => {
                let args = self.library_args(args, keywords)?;
                emit::new_instance(callee, &args)
            }
            Rule::Rename(to) => {
                let args = self.library_args(args, keywords)?;
                match &receiver {
                    Some(receiver) => emit::method_call(receiver, to, &args),
                    None => emit::call(to, &args),
                }
            }
            Rule::Template(template) => {
                let args = self.library_args(args, keywords)?;
                tables::render_template(template, receiver.as_deref(), &args)
                    .map_err(|m| self.arity(call, m.expected))?
            }
            Rule::Helper(helper) => {
                let helper = self.ctx.use_helper(helper);
                let mut all: Vec<String> = receiver.into_iter().collect();
                all.extend(self.library_args(args, keywords)?);
                emit::call(helper, &all)
            }
        };
        if decl.suspends {
            self.suspend(&text, call)
        } else {
            Ok(text)
        }
    }

    fn arity(&self, call: &Expr, expected: usize) -> CompileError {
        self.unsupported(
            ConstructKind::LibraryArity,
            format!("{call} (expects {expected} arguments)"),
        )
    }

    /// A rewrite that would evaluate `what` more than once.
    fn repeated(&self, call: &Expr, what: &str) -> CompileError {
        self.unsupported(
            ConstructKind::Expression,
            format!("{call} ({what} would be evaluated more than once)"),
        )
    }

    fn special(
        &mut self,
        special: Special,
        call: &Expr,
        receiver: Option<String>,
        args: &[Expr],
        keywords: &[Keyword],
    ) -> Result<String> {
        if special != Special::Sorted && !keywords.is_empty() {
            return Err(self.unsupported(ConstructKind::KeywordArguments, call.to_string()));
        }

        match (special, args) {
            (Special::Len, [value]) => Ok(emit::length(&self.expr(value)?)),
            (Special::Len, _) => Err(self.arity(call, 1)),

            (Special::IsInstance, [value, class]) => {
                let value = self.expr(value)?;
                self.instance_test(&value, class)
            }
            (Special::IsInstance, _) => Err(self.arity(call, 2)),

            (Special::Sum, [values]) => Ok(emit::sum(&self.expr(values)?, &emit::int(0))),
            (Special::Sum, [values, start]) => {
                let values = self.expr(values)?;
                Ok(emit::sum(&values, &self.expr(start)?))
            }
            (Special::Sum, _) => Err(self.arity(call, 1)),

            (Special::Min | Special::Max, []) => Err(self.arity(call, 1)),
            (Special::Min | Special::Max, args) => {
                let function = if special == Special::Min { "min" } else { "max" };
                let args = match args {
                    [single] if !matches!(single, Expr::Starred(_)) => {
                        vec![emit::spread(&self.expr(single)?)]
                    }
                    args => self.exprs(args)?,
                };
                Ok(emit::math(function, &args))
            }

            (Special::Sorted, [values]) => {
                let values = self.expr(values)?;
                let mut comparator = None;
                let mut reverse = false;
                for keyword in keywords {
                    match (keyword.name.as_deref(), &keyword.value) {
                        (Some("key"), key) => {
                            let key = self.expr(key)?;
                            let helper = self.ctx.use_helper(emit::COMPARATOR);
                            comparator = Some(emit::call(helper, &[key]));
                        }
                        (Some("reverse"), Expr::Constant(Constant::Bool(flag))) => reverse = *flag,
                        _ => {
                            return Err(self.unsupported(
                                ConstructKind::KeywordArguments,
                                call.to_string(),
                            ));
                        }
                    }
                }
                Ok(emit::sorted(&values, comparator.as_deref(), reverse))
            }
            (Special::Sorted, _) => Err(self.arity(call, 1)),

            (Special::Open, args) => {
                let Some(name) = args.first().and_then(Expr::as_str_literal) else {
                    return Err(self.unsupported(ConstructKind::NonLiteralResource, call.to_string()));
                };
                self.ctx.add_file(name);
                let filesystem = self.ctx.use_helper(emit::FILESYSTEM);
                let args = self.exprs(args)?;
                Ok(emit::method_call(filesystem, "open", &args))
            }

            (Special::Breakpoint, args) => {
                let dispatcher = self.ctx.use_helper(emit::BREAKPOINT);
                let args = self.exprs(args)?;
                Ok(emit::method_call(dispatcher, "event", &args))
            }

            (Special::Range, [stop]) => Ok(emit::range(None, &self.expr(stop)?)),
            (Special::Range, [start, stop]) => {
                if !is_pure(start) {
                    return Err(self.repeated(call, "start"));
                }
                let start = self.expr(start)?;
                Ok(emit::range(Some(&start), &self.expr(stop)?))
            }
            (Special::Range, _) => Err(self.arity(call, 2)),

            (Special::List, []) => Ok(emit::array(&[])),
            (Special::List, [values]) => Ok(emit::array(&[emit::spread(&self.expr(values)?)])),
            (Special::List, _) => Err(self.arity(call, 1)),

            (Special::Pop | Special::Get, _) if receiver.is_none() => {
                Err(self.unsupported(ConstructKind::Expression, call.to_string()))
            }
            (Special::Pop, args) => {
                let receiver = receiver.unwrap_or_default();
                match args {
                    [] | [Expr::Constant(Constant::Int(-1))] => {
                        Ok(emit::method_call(&receiver, "pop", &[]))
                    }
                    [Expr::Constant(Constant::Int(0))] => {
                        Ok(emit::method_call(&receiver, "shift", &[]))
                    }
                    [position] => {
                        let position = self.expr(position)?;
                        let removed =
                            emit::method_call(&receiver, "splice", &[position, emit::int(1)]);
                        Ok(emit::index(&removed, &emit::int(0)))
                    }
                    _ => Err(self.arity(call, 1)),
                }
            }
            (Special::Get, args) => {
                let receiver = receiver.unwrap_or_default();
                let (key, default) = match args {
                    [key] => (key, emit::null()),
                    [key, default] => (key, self.expr(default)?),
                    _ => return Err(self.arity(call, 2)),
                };
                if !is_pure(key) {
                    return Err(self.repeated(call, "key"));
                }
                let key = self.expr(key)?;
                Ok(emit::conditional(
                    &emit::binary(&key, "in", &receiver),
                    &emit::index(&receiver, &key),
                    &default,
                ))
            }
        }
    }

    fn instance_test(&mut self, value: &str, class: &Expr) -> Result<String> {
        match class {
            Expr::Tuple(classes) if classes.is_empty() => Ok(emit::boolean(false)),
            Expr::Tuple(classes) => {
                let tests = classes
                    .iter()
                    .map(|c| self.instance_test(value, c))
                    .collect::<Result<Vec<_>>>()?;
                Ok(emit::logical("||", &tests))
            }
            Expr::Name(name) if !self.ctx.is_our_class(name) => Ok(match name.as_str() {
                "str" => emit::type_of(value, "string"),
                "int" | "float" => emit::type_of(value, "number"),
                "bool" => emit::type_of(value, "boolean"),
                "dict" => emit::type_of(value, "object"),
                "list" | "tuple" => emit::is_array(value),
                other => emit::instance_of(value, &emit::identifier(other)),
            }),
            other => {
                let class = self.expr(other)?;
                Ok(emit::instance_of(value, &class))
            }
        }
    }
}

fn constant_js(constant: &Constant) -> String {
    match constant {
        Constant::None => emit::null(),
        Constant::Bool(value) => emit::boolean(*value),
        Constant::Int(value) => emit::int(*value),
        Constant::Float(value) => emit::float(*value),
        Constant::Str(value) => emit::string(value),
    }
}

/// Whether `expr` already evaluates to a JavaScript boolean.
pub(crate) fn is_boolean_valued(expr: &Expr, ctx: &Context) -> bool {
    match expr {
        Expr::Compare { .. }
        | Expr::BoolOp { .. }
        | Expr::UnaryOp {
            op: UnaryOp::Not, ..
        }
        | Expr::Constant(Constant::Bool(_)) => true,
        Expr::Call { func, .. } => {
            func.as_name() == Some("isinstance") && !ctx.is_our_function("isinstance")
        }
        _ => false,
    }
}

/// Whether evaluating `expr` more than once is indistinguishable from
/// evaluating it once.
fn is_pure(expr: &Expr) -> bool {
    match expr {
        Expr::Name(_) | Expr::Constant(_) => true,
        Expr::Attribute { value, .. } => is_pure(value),
        Expr::Subscript { value, index } => is_pure(value) && is_pure(index),
        Expr::UnaryOp { operand, .. } => is_pure(operand),
        Expr::BinOp { left, right, .. } => is_pure(left) && is_pure(right),
        _ => false,
    }
}

fn is_sequence_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::List(_) | Expr::Tuple(_) | Expr::Dict(_))
}

/// `super()` with no arguments.
fn is_super_call(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Call { func, args, keywords }
            if func.as_name() == Some("super") && args.is_empty() && keywords.is_empty()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepjs_syntax::{StmtKind, read_python};

    fn expr_with(ctx: &mut Context, source: &str) -> std::result::Result<String, CompileError> {
        let module = read_python(source).unwrap();
        let StmtKind::Expr(expr) = &module.body[0].kind else {
            panic!("expected an expression statement");
        };
        Translator::new(ctx).expr(expr)
    }

    fn js(source: &str) -> String {
        expr_with(&mut Context::new(), source).unwrap()
    }

    fn failure(source: &str) -> ConstructKind {
        expr_with(&mut Context::new(), source)
            .unwrap_err()
            .as_unsupported()
            .map(|e| e.kind)
            .unwrap()
    }

    #[test]
    fn test_last_element_and_slices() {
        assert_eq!(js("x[-1]"), "x[x.length - 1]");
        assert_eq!(js("x[a:b]"), "x.slice(a, b)");
        assert_eq!(js("x[:b]"), "x.slice(0, b)");
        assert_eq!(js("x[1:]"), "x.slice(1)");
        assert_eq!(failure("x[::2]"), ConstructKind::Subscript);
    }

    #[test]
    fn test_repeated_operands_must_be_side_effect_free() {
        let mut ctx = Context::new();
        ctx.register_function("f");
        let kind = |ctx: &mut Context, source: &str| {
            expr_with(ctx, source)
                .unwrap_err()
                .as_unsupported()
                .map(|e| e.kind)
        };
        assert_eq!(kind(&mut ctx, "f()[-1]"), Some(ConstructKind::Subscript));
        assert_eq!(kind(&mut ctx, "f() in [1, 2]"), Some(ConstructKind::Membership));
        assert_eq!(kind(&mut ctx, "f().remove(x)"), Some(ConstructKind::Expression));
        assert_eq!(kind(&mut ctx, "d.get(f())"), Some(ConstructKind::Expression));
        assert_eq!(kind(&mut ctx, "range(f(), 3)"), Some(ConstructKind::Expression));

        assert_eq!(expr_with(&mut ctx, "f() in [1]").unwrap(), "((await f()) === 1)");
        assert_eq!(js("self.items[-1]"), "self.items[self.items.length - 1]");
        assert_eq!(js("node.tag in [\"b\", \"i\"]"), "(node.tag === \"b\" || node.tag === \"i\")");
    }

    #[test]
    fn test_missing_key_reads_as_none() {
        assert_eq!(js("d.get(k) is None"), "((k in d ? d[k] : null) === null)");
    }

    #[test]
    fn test_negative_index_other_than_last() {
        assert_eq!(js("x[-2]"), "x[-2]");
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(js("not x"), "(!truthy(x))");
        assert_eq!(js("a and b"), "(truthy(a) && truthy(b))");
        assert_eq!(js("a or b == c"), "(truthy(a) || (b === c))");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(js("a == b"), "(a === b)");
        assert_eq!(js("a != None"), "(a !== null)");
        assert_eq!(js("a is not None"), "(a !== null)");
        assert_eq!(js("a == [1, 2]"), "(JSON.stringify(a) === JSON.stringify([1, 2]))");
        assert_eq!(js("a <= b"), "(a <= b)");
        assert_eq!(failure("a < b < c"), ConstructKind::ChainedComparison);
    }

    #[test]
    fn test_membership() {
        assert_eq!(js("x in [1, 2]"), "(x === 1 || x === 2)");
        assert_eq!(js("x in ()"), "false");
        assert_eq!(js("c in \"abc\""), "\"abc\".includes(c)");
        assert_eq!(js("c not in \"abc\""), "(!\"abc\".includes(c))");
        assert_eq!(failure("x in items"), ConstructKind::Membership);
    }

    #[test]
    fn test_comprehensions() {
        assert_eq!(js("[x for x in xs if x > 0]"), "xs.filter((x) => x > 0)");
        assert_eq!(js("[x * 2 for x in xs]"), "xs.map((x) => x * 2)");
        assert_eq!(
            js("{k: v for k, v in pairs}"),
            "Object.fromEntries(pairs.map(([k, v]) => [k, v]))"
        );
        assert_eq!(js("{x for x in xs}"), "new Set(xs)");
        assert_eq!(failure("[x for x in xs for y in ys]"), ConstructKind::Comprehension);
        assert_eq!(failure("[x for x in xs if a if b]"), ConstructKind::Comprehension);
    }

    #[test]
    fn test_builtins() {
        assert_eq!(js("len(x)"), "x.length");
        assert_eq!(js("isinstance(node, Text)"), "(node instanceof Text)");
        assert_eq!(
            js("isinstance(x, (int, float))"),
            "((typeof x === \"number\") || (typeof x === \"number\"))"
        );
        assert_eq!(js("sum(xs)"), "xs.reduce((a, b) => a + b, 0)");
        assert_eq!(js("max(xs)"), "Math.max(...xs)");
        assert_eq!(js("min(a, b)"), "Math.min(a, b)");
        assert_eq!(js("str(x)"), "String(x)");
        assert_eq!(js("sorted(xs)"), "[...xs].sort()");
        assert_eq!(
            js("sorted(xs, key=f, reverse=True)"),
            "[...xs].sort(comparator(f)).reverse()"
        );
    }

    #[test]
    fn test_open_records_file() {
        let mut ctx = Context::new();
        assert_eq!(
            expr_with(&mut ctx, "open(\"index.html\")").unwrap(),
            "filesystem.open(\"index.html\")"
        );
        assert_eq!(ctx.files(), ["index.html"]);
        assert_eq!(ctx.helpers().collect::<Vec<_>>(), vec!["filesystem"]);
    }

    #[test]
    fn test_breakpoint_is_awaited() {
        assert_eq!(
            js("breakpoint(\"layout\", node)"),
            "(await breakpoint.event(\"layout\", node))"
        );
    }

    #[test]
    fn test_ours_calls_are_awaited() {
        let mut ctx = Context::new();
        ctx.register_function("lex");
        ctx.register_class("Browser");
        ctx.register_method("load");
        assert_eq!(expr_with(&mut ctx, "lex(body)").unwrap(), "(await lex(body))");
        assert_eq!(expr_with(&mut ctx, "Browser()").unwrap(), "(await new Browser())");
        assert_eq!(expr_with(&mut ctx, "b.load(url)").unwrap(), "(await b.load(url))");
    }

    #[test]
    fn test_ours_keyword_arguments_follow_signature() {
        let mut ctx = Context::new();
        ctx.register_function("layout");
        ctx.set_function_signature("layout", vec!["node".into(), "width".into(), "zoom".into()]);
        assert_eq!(
            expr_with(&mut ctx, "layout(n, zoom=2)").unwrap(),
            "(await layout(n, undefined, 2))"
        );

        ctx.register_function("paint");
        let err = expr_with(&mut ctx, "paint(canvas=c)").unwrap_err();
        assert_eq!(
            err.as_unsupported().map(|e| e.kind),
            Some(ConstructKind::KeywordArguments)
        );
    }

    #[test]
    fn test_library_calls_are_not_awaited() {
        assert_eq!(js("s.startswith(\"<\")"), "s.startsWith(\"<\")");
        assert_eq!(js("words.append(w)"), "words.push(w)");
        assert_eq!(js("\" \".join(words)"), "words.join(\" \")");
        assert_eq!(js("s.split(\":\", 1)"), "pysplit(s, \":\", 1)");
        assert_eq!(js("frobnicate(a, b)"), "frobnicate(a, b)");
    }

    #[test]
    fn test_makefile_suspends() {
        assert_eq!(
            js("s.makefile(\"r\", encoding=\"utf8\")"),
            "(await s.makefile(\"r\", { encoding: \"utf8\" }))"
        );
    }

    #[test]
    fn test_module_functions_follow_imports() {
        let mut ctx = Context::new();
        ctx.register_import("tkinter", "tkinter");
        ctx.register_import("quote", "urllib.parse.quote");
        assert_eq!(
            expr_with(&mut ctx, "tkinter.font.Font(size=16)").unwrap(),
            "new tkinter.font.Font({ size: 16 })"
        );
        assert_eq!(expr_with(&mut ctx, "quote(s)").unwrap(), "encodeURIComponent(s)");
    }

    #[test]
    fn test_suspension_in_callback_fails() {
        let mut ctx = Context::new();
        ctx.register_function("fetch");
        let err = expr_with(&mut ctx, "[fetch(u) for u in urls]").unwrap_err();
        assert_eq!(
            err.as_unsupported().map(|e| e.kind),
            Some(ConstructKind::SuspendInSyncContext)
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(js("None"), "null");
        assert_eq!(js("[True, 1.5, \"a\"]"), "[true, 1.5, \"a\"]");
        assert_eq!(js("{\"color\": \"red\", k: 1}"), "{ color: \"red\", [k]: 1 }");
        assert_eq!(js("f\"{x + 1}px\""), "`${x + 1}px`");
        assert_eq!(js("\"-\" * n"), "\"-\".repeat(n)");
        assert_eq!(js("a // b"), "Math.floor(a / b)");
        assert_eq!(js("a if c else b"), "(truthy(c) ? a : b)");
        assert_eq!(js("lambda x: x + 1"), "((x) => x + 1)");
    }

    #[test]
    fn test_reserved_names_are_renamed() {
        assert_eq!(js("default + 1"), "(default_ + 1)");
    }
}
