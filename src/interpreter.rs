use crate::errors::JsError;
use crate::errors::JsException;
use crate::promise::PromiseState;
use crate::runtime::Runtime;
use crate::scope::BindingKind;
use crate::scope::Scope;
use crate::scope::ScopeRef;
use crate::trace::Step;
use crate::trace::TaskSource;
use crate::value::format_number;
use crate::value::FunctionBody;
use crate::value::JsFunction;
use crate::value::PromiseRef;
use crate::value::Value;
use indexmap::IndexMap;
use std::rc::Rc;
use swc_common::Span;
use swc_common::Spanned;
use swc_ecma_ast::ArrowExpr;
use swc_ecma_ast::AssignExpr;
use swc_ecma_ast::AssignOp;
use swc_ecma_ast::AssignTarget;
use swc_ecma_ast::BinaryOp;
use swc_ecma_ast::BlockStmt;
use swc_ecma_ast::BlockStmtOrExpr;
use swc_ecma_ast::Callee;
use swc_ecma_ast::CallExpr;
use swc_ecma_ast::Decl;
use swc_ecma_ast::DoWhileStmt;
use swc_ecma_ast::Expr;
use swc_ecma_ast::ExprOrSpread;
use swc_ecma_ast::ForStmt;
use swc_ecma_ast::Function;
use swc_ecma_ast::Lit;
use swc_ecma_ast::MemberExpr;
use swc_ecma_ast::MemberProp;
use swc_ecma_ast::NewExpr;
use swc_ecma_ast::Pat;
use swc_ecma_ast::Prop;
use swc_ecma_ast::PropName;
use swc_ecma_ast::PropOrSpread;
use swc_ecma_ast::Script;
use swc_ecma_ast::SimpleAssignTarget;
use swc_ecma_ast::Stmt;
use swc_ecma_ast::SwitchStmt;
use swc_ecma_ast::TryStmt;
use swc_ecma_ast::UnaryOp;
use swc_ecma_ast::UpdateOp;
use swc_ecma_ast::VarDecl;
use swc_ecma_ast::VarDeclKind;
use swc_ecma_ast::VarDeclOrExpr;
use swc_ecma_ast::WhileStmt;

/// How a statement finished.
///
/// `Suspended` is the async machinery's signal that an `await` parked the
/// rest of the current block on a pending promise; the frames above must
/// unwind without settling anything.
#[derive(Debug, Clone)]
pub enum Completion {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
    Suspended,
}

/// The promise an executing async function will eventually settle.
#[derive(Clone)]
pub struct AsyncContext {
    pub promise: PromiseRef,
}

/// The three statement shapes that can suspend an async function.
enum AwaitForm<'a> {
    Bind {
        name: String,
        kind: BindingKind,
        argument: &'a Expr,
    },
    Drop {
        argument: &'a Expr,
    },
    Return {
        argument: &'a Expr,
    },
}

impl<'a> AwaitForm<'a> {
    fn argument(&self) -> &'a Expr {
        match self {
            AwaitForm::Bind { argument, .. }
            | AwaitForm::Drop { argument }
            | AwaitForm::Return { argument } => argument,
        }
    }
}

//---------------------------------------------------------
//  STATEMENT EVALUATION.
//---------------------------------------------------------

impl Runtime {
    /// Walks the whole program in the global scope.
    pub fn exec_program(&mut self, script: &Script) -> Result<(), JsException> {
        let scope = self.global_scope.clone();
        self.exec_statements(&script.body, &scope, None)?;
        Ok(())
    }

    /// Runs a statement list: function declarations hoist first, then each
    /// statement executes in order until a non-normal completion appears.
    pub fn exec_statements(
        &mut self,
        stmts: &[Stmt],
        scope: &ScopeRef,
        context: Option<&AsyncContext>,
    ) -> Result<Completion, JsException> {
        self.hoist_functions(stmts, scope)?;

        let mut index = 0;
        while index < stmts.len() {
            let stmt = &stmts[index];

            if let Some(context) = context {
                if let Some(form) = await_form(stmt) {
                    let value = self.eval_expr(form.argument(), scope)?;
                    match value {
                        Value::Promise(promise) => {
                            // An already-rejected promise throws right here,
                            // where an enclosing try/catch can still see it.
                            let state = promise.borrow().state;
                            if state == PromiseState::Rejected {
                                let reason = promise.borrow().value.clone();
                                return Err(JsException::from_value(
                                    reason,
                                    self.line_of(stmt.span()),
                                ));
                            }
                            // Park the rest of this block on the promise.
                            return self.suspend_on(
                                promise,
                                form,
                                &stmts[index + 1..],
                                scope,
                                context,
                            );
                        }
                        // Awaiting a plain value wraps it pre-fulfilled and
                        // continues inline, without an extra tick.
                        immediate => match form {
                            AwaitForm::Bind { name, kind, .. } => {
                                Scope::define(scope, &name, immediate, kind);
                            }
                            AwaitForm::Drop { .. } => {}
                            AwaitForm::Return { .. } => {
                                return Ok(Completion::Return(immediate));
                            }
                        },
                    }
                    index += 1;
                    continue;
                }
            }

            match self.exec_stmt(stmt, scope, context)? {
                Completion::Normal => {}
                completion => return Ok(completion),
            }
            index += 1;
        }
        Ok(Completion::Normal)
    }

    /// First pass over a block: register every function declaration before
    /// anything runs.
    fn hoist_functions(&mut self, stmts: &[Stmt], scope: &ScopeRef) -> Result<(), JsException> {
        for stmt in stmts {
            if let Stmt::Decl(Decl::Fn(declaration)) = stmt {
                let name = declaration.ident.sym.to_string();
                let function = self.make_function(Some(name.clone()), &declaration.function, scope)?;
                Scope::define(scope, &name, function, BindingKind::Let);
            }
        }
        Ok(())
    }

    fn exec_stmt(
        &mut self,
        stmt: &Stmt,
        scope: &ScopeRef,
        context: Option<&AsyncContext>,
    ) -> Result<Completion, JsException> {
        match stmt {
            Stmt::Decl(Decl::Var(var)) => {
                self.exec_var_decl(var, scope)?;
                Ok(Completion::Normal)
            }
            // Handled by the hoisting pass.
            Stmt::Decl(Decl::Fn(_)) => Ok(Completion::Normal),
            Stmt::Decl(_) => Err(unsupported("this declaration kind")),
            Stmt::Expr(stmt) => {
                self.eval_expr(&stmt.expr, scope)?;
                Ok(Completion::Normal)
            }
            Stmt::Block(block) => self.exec_block(block, scope, context),
            Stmt::Empty(_) => Ok(Completion::Normal),
            Stmt::If(stmt) => {
                if self.eval_expr(&stmt.test, scope)?.is_truthy() {
                    self.exec_stmt(&stmt.cons, scope, context)
                } else if let Some(alternate) = &stmt.alt {
                    self.exec_stmt(alternate, scope, context)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Stmt::While(stmt) => self.exec_while(stmt, scope, context),
            Stmt::DoWhile(stmt) => self.exec_do_while(stmt, scope, context),
            Stmt::For(stmt) => self.exec_for(stmt, scope, context),
            Stmt::Return(stmt) => {
                let value = match &stmt.arg {
                    Some(argument) => self.eval_expr(argument, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Stmt::Break(stmt) => Ok(Completion::Break(
                stmt.label.as_ref().map(|label| label.sym.to_string()),
            )),
            Stmt::Continue(stmt) => Ok(Completion::Continue(
                stmt.label.as_ref().map(|label| label.sym.to_string()),
            )),
            Stmt::Throw(stmt) => {
                let value = self.eval_expr(&stmt.arg, scope)?;
                Err(JsException::from_value(value, self.line_of(stmt.span)))
            }
            Stmt::Try(stmt) => self.exec_try(stmt, scope, context),
            Stmt::Switch(stmt) => self.exec_switch(stmt, scope, context),
            // Labels run their body but are not tracked for targeted
            // break/continue.
            Stmt::Labeled(stmt) => self.exec_stmt(&stmt.body, scope, context),
            _ => Err(unsupported("this statement kind")),
        }
    }

    fn exec_block(
        &mut self,
        block: &BlockStmt,
        scope: &ScopeRef,
        context: Option<&AsyncContext>,
    ) -> Result<Completion, JsException> {
        let block_scope = Scope::child(scope, false);
        self.exec_statements(&block.stmts, &block_scope, context)
    }

    fn exec_var_decl(&mut self, var: &VarDecl, scope: &ScopeRef) -> Result<(), JsException> {
        let kind = binding_kind(var.kind);
        for declarator in &var.decls {
            let Pat::Ident(ident) = &declarator.name else {
                return Err(unsupported("destructuring declarations"));
            };
            let name = ident.id.sym.to_string();
            let value = match &declarator.init {
                Some(init) => self.eval_named_expr(init, scope, &name)?,
                None => Value::Undefined,
            };
            Scope::define(scope, &name, value, kind);
        }
        Ok(())
    }

    fn exec_while(
        &mut self,
        stmt: &WhileStmt,
        scope: &ScopeRef,
        context: Option<&AsyncContext>,
    ) -> Result<Completion, JsException> {
        let mut iterations = 0u32;
        loop {
            if !self.eval_expr(&stmt.test, scope)?.is_truthy() {
                break;
            }
            self.guard_loop(&mut iterations, stmt.span)?;
            match self.exec_stmt(&stmt.body, scope, context)? {
                Completion::Normal | Completion::Continue(_) => {}
                Completion::Break(_) => break,
                completion => return Ok(completion),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_do_while(
        &mut self,
        stmt: &DoWhileStmt,
        scope: &ScopeRef,
        context: Option<&AsyncContext>,
    ) -> Result<Completion, JsException> {
        let mut iterations = 0u32;
        loop {
            self.guard_loop(&mut iterations, stmt.span)?;
            match self.exec_stmt(&stmt.body, scope, context)? {
                Completion::Normal | Completion::Continue(_) => {}
                Completion::Break(_) => break,
                completion => return Ok(completion),
            }
            if !self.eval_expr(&stmt.test, scope)?.is_truthy() {
                break;
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_for(
        &mut self,
        stmt: &ForStmt,
        scope: &ScopeRef,
        context: Option<&AsyncContext>,
    ) -> Result<Completion, JsException> {
        let for_scope = Scope::child(scope, false);
        match &stmt.init {
            Some(VarDeclOrExpr::VarDecl(var)) => self.exec_var_decl(var, &for_scope)?,
            Some(VarDeclOrExpr::Expr(expr)) => {
                self.eval_expr(expr, &for_scope)?;
            }
            None => {}
        }

        let mut iterations = 0u32;
        loop {
            if let Some(test) = &stmt.test {
                if !self.eval_expr(test, &for_scope)?.is_truthy() {
                    break;
                }
            }
            self.guard_loop(&mut iterations, stmt.span)?;
            match self.exec_stmt(&stmt.body, &for_scope, context)? {
                Completion::Normal | Completion::Continue(_) => {}
                Completion::Break(_) => break,
                completion => return Ok(completion),
            }
            if let Some(update) = &stmt.update {
                self.eval_expr(update, &for_scope)?;
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_try(
        &mut self,
        stmt: &TryStmt,
        scope: &ScopeRef,
        context: Option<&AsyncContext>,
    ) -> Result<Completion, JsException> {
        let result = match self.exec_block(&stmt.block, scope, context) {
            Err(exception) if stmt.handler.is_some() => {
                let handler = stmt.handler.as_ref().unwrap();
                let catch_scope = Scope::child(scope, false);
                if let Some(Pat::Ident(param)) = &handler.param {
                    Scope::define(
                        &catch_scope,
                        param.id.sym.as_ref(),
                        exception.value,
                        BindingKind::Let,
                    );
                }
                self.exec_statements(&handler.body.stmts, &catch_scope, context)
            }
            other => other,
        };

        // The finalizer always runs; its own throw or non-normal completion
        // supersedes whatever try/catch produced.
        if let Some(finalizer) = &stmt.finalizer {
            let finally_scope = Scope::child(scope, false);
            match self.exec_statements(&finalizer.stmts, &finally_scope, context)? {
                Completion::Normal => {}
                completion => return Ok(completion),
            }
        }

        result
    }

    fn exec_switch(
        &mut self,
        stmt: &SwitchStmt,
        scope: &ScopeRef,
        context: Option<&AsyncContext>,
    ) -> Result<Completion, JsException> {
        let discriminant = self.eval_expr(&stmt.discriminant, scope)?;
        let switch_scope = Scope::child(scope, false);

        let mut start = None;
        for (index, case) in stmt.cases.iter().enumerate() {
            if let Some(test) = &case.test {
                if self.eval_expr(test, &switch_scope)?.strict_eq(&discriminant) {
                    start = Some(index);
                    break;
                }
            }
        }
        // No case matched: execution starts at `default` if there is one.
        let start = start.or_else(|| stmt.cases.iter().position(|case| case.test.is_none()));

        if let Some(start) = start {
            // Fall through case bodies until a break shows up.
            for case in &stmt.cases[start..] {
                match self.exec_statements(&case.cons, &switch_scope, context)? {
                    Completion::Normal => {}
                    Completion::Break(_) => return Ok(Completion::Normal),
                    completion => return Ok(completion),
                }
            }
        }
        Ok(Completion::Normal)
    }

    fn guard_loop(&mut self, iterations: &mut u32, span: Span) -> Result<(), JsException> {
        *iterations += 1;
        if *iterations > self.options.max_loop_guard {
            let error = JsError::range(format!(
                "loop exceeded {} iterations",
                self.options.max_loop_guard
            ));
            return Err(self.exception_at(error, span));
        }
        Ok(())
    }
}

//---------------------------------------------------------
//  ASYNC SUSPENSION.
//---------------------------------------------------------

impl Runtime {
    /// Captures the tail of the current block and parks it on `promise`.
    /// The schedule step is emitted here, at suspension time; settlement
    /// enqueues the continuation under the same task id.
    fn suspend_on(
        &mut self,
        promise: PromiseRef,
        form: AwaitForm<'_>,
        tail: &[Stmt],
        scope: &ScopeRef,
        context: &AsyncContext,
    ) -> Result<Completion, JsException> {
        let (label, binding, is_return) = match &form {
            AwaitForm::Bind { name, kind, .. } => {
                (format!("await → {name}"), Some((name.clone(), *kind)), false)
            }
            AwaitForm::Drop { .. } => ("await".to_string(), None, false),
            AwaitForm::Return { .. } => ("return await".to_string(), None, true),
        };

        let task_id = self.next_task_id();
        self.emit(Step::ScheduleMicrotask {
            id: task_id,
            label: label.clone(),
            source: TaskSource::Microtask,
        });

        let tail: Vec<Stmt> = tail.to_vec();
        let scope = scope.clone();
        let context = context.clone();
        let reject_context = context.clone();

        let on_fulfilled = move |runtime: &mut Runtime, value: Value| {
            if let Some((name, kind)) = binding {
                Scope::define(&scope, &name, value.clone(), kind);
            }
            let completion = if is_return {
                Ok(Completion::Return(value))
            } else {
                runtime.exec_statements(&tail, &scope, Some(&context))
            };
            match completion {
                // A later await re-armed the continuation; nothing to do.
                Ok(Completion::Suspended) => {}
                Ok(Completion::Return(value)) => runtime.resolve_promise(&context.promise, value),
                Ok(_) => runtime.resolve_promise(&context.promise, Value::Undefined),
                Err(exception) => runtime.reject_promise(&context.promise, exception.value),
            }
            Ok(())
        };
        let on_rejected = move |runtime: &mut Runtime, reason: Value| {
            runtime.reject_promise(&reject_context.promise, reason);
            Ok(())
        };

        self.add_continuation_handler(&promise, &label, Some(task_id), on_fulfilled, on_rejected);
        Ok(Completion::Suspended)
    }
}

//---------------------------------------------------------
//  EXPRESSION EVALUATION.
//---------------------------------------------------------

impl Runtime {
    pub fn eval_expr(&mut self, expr: &Expr, scope: &ScopeRef) -> Result<Value, JsException> {
        match expr {
            Expr::Lit(literal) => self.eval_literal(literal),
            Expr::Ident(ident) => {
                let name = ident.sym.as_ref();
                Scope::get(scope, name).ok_or_else(|| {
                    self.exception_at(JsError::reference(format!("{name} is not defined")), ident.span)
                })
            }
            Expr::This(_) => Ok(Scope::get(scope, "this").unwrap_or(Value::Undefined)),
            Expr::Paren(paren) => self.eval_expr(&paren.expr, scope),
            Expr::Array(array) => {
                let mut items = Vec::new();
                for element in &array.elems {
                    match element {
                        // Holes read back as undefined.
                        None => items.push(Value::Undefined),
                        Some(element) => {
                            let value = self.eval_expr(&element.expr, scope)?;
                            match element.spread {
                                Some(_) => self.spread_into(&mut items, value, element.expr.span())?,
                                None => items.push(value),
                            }
                        }
                    }
                }
                Ok(Value::array(items))
            }
            Expr::Object(object) => self.eval_object_literal(object, scope),
            Expr::Fn(function) => {
                let name = function.ident.as_ref().map(|ident| ident.sym.to_string());
                self.make_function(name, &function.function, scope)
            }
            Expr::Arrow(arrow) => self.make_arrow(None, arrow, scope),
            Expr::Unary(unary) => self.eval_unary(unary, scope),
            Expr::Update(update) => self.eval_update(update, scope),
            Expr::Bin(binary) => match binary.op {
                BinaryOp::LogicalAnd => {
                    let left = self.eval_expr(&binary.left, scope)?;
                    if !left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval_expr(&binary.right, scope)
                }
                BinaryOp::LogicalOr => {
                    let left = self.eval_expr(&binary.left, scope)?;
                    if left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval_expr(&binary.right, scope)
                }
                BinaryOp::NullishCoalescing => {
                    let left = self.eval_expr(&binary.left, scope)?;
                    if matches!(left, Value::Undefined | Value::Null) {
                        return self.eval_expr(&binary.right, scope);
                    }
                    Ok(left)
                }
                op => {
                    let left = self.eval_expr(&binary.left, scope)?;
                    let right = self.eval_expr(&binary.right, scope)?;
                    self.apply_binary(op, left, right, binary.span)
                }
            },
            Expr::Assign(assign) => self.eval_assign(assign, scope),
            Expr::Cond(conditional) => {
                if self.eval_expr(&conditional.test, scope)?.is_truthy() {
                    self.eval_expr(&conditional.cons, scope)
                } else {
                    self.eval_expr(&conditional.alt, scope)
                }
            }
            Expr::Call(call) => self.eval_call(call, scope),
            Expr::New(new_expr) => self.eval_new(new_expr, scope),
            Expr::Member(member) => {
                let object = self.eval_expr(&member.obj, scope)?;
                let key = self.member_key(member, scope)?;
                self.property_get(&object, &key, member.span)
            }
            Expr::Seq(sequence) => {
                let mut last = Value::Undefined;
                for expr in &sequence.exprs {
                    last = self.eval_expr(expr, scope)?;
                }
                Ok(last)
            }
            Expr::Tpl(template) => {
                let mut text = String::new();
                for (index, quasi) in template.quasis.iter().enumerate() {
                    match &quasi.cooked {
                        Some(cooked) => text.push_str(&cooked.to_string_lossy()),
                        None => text.push_str(&quasi.raw),
                    }
                    if index < template.exprs.len() {
                        let value = self.eval_expr(&template.exprs[index], scope)?;
                        text.push_str(&value.stringify());
                    }
                }
                Ok(Value::String(text))
            }
            // `await` outside its three statement forms: best-effort
            // synchronous inspection of the promise.
            Expr::Await(await_expr) => {
                let value = self.eval_expr(&await_expr.arg, scope)?;
                match value {
                    Value::Promise(promise) => {
                        let state = promise.borrow().state;
                        match state {
                            PromiseState::Fulfilled => Ok(promise.borrow().value.clone()),
                            PromiseState::Rejected => {
                                let reason = promise.borrow().value.clone();
                                Err(JsException::from_value(reason, self.line_of(await_expr.span)))
                            }
                            PromiseState::Pending => Ok(Value::Undefined),
                        }
                    }
                    other => Ok(other),
                }
            }
            _ => Err(unsupported("this expression kind")),
        }
    }

    fn eval_literal(&mut self, literal: &Lit) -> Result<Value, JsException> {
        match literal {
            Lit::Num(number) => Ok(Value::Number(number.value)),
            Lit::Str(text) => Ok(Value::String(text.value.to_string_lossy().into_owned())),
            Lit::Bool(boolean) => Ok(Value::Bool(boolean.value)),
            Lit::Null(_) => Ok(Value::Null),
            _ => Err(unsupported("this literal kind")),
        }
    }

    fn eval_object_literal(
        &mut self,
        object: &swc_ecma_ast::ObjectLit,
        scope: &ScopeRef,
    ) -> Result<Value, JsException> {
        let mut properties = IndexMap::new();
        for prop in &object.props {
            match prop {
                PropOrSpread::Spread(spread) => {
                    let value = self.eval_expr(&spread.expr, scope)?;
                    // Spreading copies own properties; primitives contribute
                    // nothing, same as in JS.
                    if let Value::Object(source) = value {
                        for (key, value) in source.borrow().iter() {
                            properties.insert(key.clone(), value.clone());
                        }
                    }
                }
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::Shorthand(ident) => {
                        let name = ident.sym.to_string();
                        let value = Scope::get(scope, &name).ok_or_else(|| {
                            self.exception_at(
                                JsError::reference(format!("{name} is not defined")),
                                ident.span,
                            )
                        })?;
                        properties.insert(name, value);
                    }
                    Prop::KeyValue(pair) => {
                        let key = self.prop_name(&pair.key, scope)?;
                        let value = self.eval_named_expr(&pair.value, scope, &key)?;
                        properties.insert(key, value);
                    }
                    Prop::Method(method) => {
                        let key = self.prop_name(&method.key, scope)?;
                        let value = self.make_function(Some(key.clone()), &method.function, scope)?;
                        properties.insert(key, value);
                    }
                    _ => return Err(unsupported("this object property kind")),
                },
            }
        }
        Ok(Value::object(properties))
    }

    fn prop_name(&mut self, name: &PropName, scope: &ScopeRef) -> Result<String, JsException> {
        match name {
            PropName::Ident(ident) => Ok(ident.sym.to_string()),
            PropName::Str(text) => Ok(text.value.to_string_lossy().into_owned()),
            PropName::Num(number) => Ok(format_number(number.value)),
            PropName::Computed(computed) => {
                Ok(self.eval_expr(&computed.expr, scope)?.stringify())
            }
            PropName::BigInt(_) => Err(unsupported("bigint property names")),
        }
    }

    fn eval_unary(
        &mut self,
        unary: &swc_ecma_ast::UnaryExpr,
        scope: &ScopeRef,
    ) -> Result<Value, JsException> {
        match unary.op {
            UnaryOp::TypeOf => {
                // `typeof missing` reads as "undefined" instead of throwing.
                if let Expr::Ident(ident) = &*unary.arg {
                    return Ok(Value::String(
                        Scope::get(scope, ident.sym.as_ref())
                            .map_or("undefined", |value| value.type_of())
                            .to_string(),
                    ));
                }
                let value = self.eval_expr(&unary.arg, scope)?;
                Ok(Value::String(value.type_of().to_string()))
            }
            UnaryOp::Minus => {
                let value = self.eval_expr(&unary.arg, scope)?;
                Ok(Value::Number(-value.to_number()))
            }
            UnaryOp::Plus => {
                let value = self.eval_expr(&unary.arg, scope)?;
                Ok(Value::Number(value.to_number()))
            }
            UnaryOp::Bang => {
                let value = self.eval_expr(&unary.arg, scope)?;
                Ok(Value::Bool(!value.is_truthy()))
            }
            UnaryOp::Tilde => {
                let value = self.eval_expr(&unary.arg, scope)?;
                Ok(Value::Number(f64::from(!value.to_int32())))
            }
            UnaryOp::Void => {
                self.eval_expr(&unary.arg, scope)?;
                Ok(Value::Undefined)
            }
            // Intentional simplification: `delete` reports success without
            // evaluating or removing anything.
            UnaryOp::Delete => Ok(Value::Bool(true)),
        }
    }

    fn eval_update(
        &mut self,
        update: &swc_ecma_ast::UpdateExpr,
        scope: &ScopeRef,
    ) -> Result<Value, JsException> {
        let old = self.read_update_target(&update.arg, scope)?.to_number();
        let new = match update.op {
            UpdateOp::PlusPlus => old + 1.0,
            UpdateOp::MinusMinus => old - 1.0,
        };
        self.write_update_target(&update.arg, Value::Number(new), scope)?;
        Ok(Value::Number(if update.prefix { new } else { old }))
    }

    fn read_update_target(&mut self, target: &Expr, scope: &ScopeRef) -> Result<Value, JsException> {
        match target {
            Expr::Ident(ident) => {
                let name = ident.sym.as_ref();
                Scope::get(scope, name).ok_or_else(|| {
                    self.exception_at(JsError::reference(format!("{name} is not defined")), ident.span)
                })
            }
            Expr::Member(member) => {
                let object = self.eval_expr(&member.obj, scope)?;
                let key = self.member_key(member, scope)?;
                self.property_get(&object, &key, member.span)
            }
            _ => Err(unsupported("this update target")),
        }
    }

    fn write_update_target(
        &mut self,
        target: &Expr,
        value: Value,
        scope: &ScopeRef,
    ) -> Result<(), JsException> {
        match target {
            Expr::Ident(ident) => Scope::set(scope, ident.sym.as_ref(), value)
                .map_err(|error| self.exception_at(error, ident.span)),
            Expr::Member(member) => {
                let object = self.eval_expr(&member.obj, scope)?;
                let key = self.member_key(member, scope)?;
                self.property_set(&object, &key, value, member.span)
            }
            _ => Err(unsupported("this update target")),
        }
    }

    fn eval_assign(&mut self, assign: &AssignExpr, scope: &ScopeRef) -> Result<Value, JsException> {
        match assign.op {
            AssignOp::Assign => {
                let value = self.eval_assign_value(assign, scope)?;
                self.assign_target(&assign.left, value.clone(), scope)?;
                Ok(value)
            }
            AssignOp::AndAssign | AssignOp::OrAssign | AssignOp::NullishAssign => {
                let current = self.read_target(&assign.left, scope)?;
                let wanted = match assign.op {
                    AssignOp::AndAssign => current.is_truthy(),
                    AssignOp::OrAssign => !current.is_truthy(),
                    _ => matches!(current, Value::Undefined | Value::Null),
                };
                if !wanted {
                    return Ok(current);
                }
                let value = self.eval_expr(&assign.right, scope)?;
                self.assign_target(&assign.left, value.clone(), scope)?;
                Ok(value)
            }
            op => {
                let current = self.read_target(&assign.left, scope)?;
                let rhs = self.eval_expr(&assign.right, scope)?;
                let value = self.apply_binary(compound_op(op), current, rhs, assign.span)?;
                self.assign_target(&assign.left, value.clone(), scope)?;
                Ok(value)
            }
        }
    }

    /// Plain assignments to an identifier name the anonymous function being
    /// assigned, matching JS name inference.
    fn eval_assign_value(
        &mut self,
        assign: &AssignExpr,
        scope: &ScopeRef,
    ) -> Result<Value, JsException> {
        if let AssignTarget::Simple(SimpleAssignTarget::Ident(ident)) = &assign.left {
            let name = ident.id.sym.to_string();
            return self.eval_named_expr(&assign.right, scope, &name);
        }
        self.eval_expr(&assign.right, scope)
    }

    fn read_target(&mut self, target: &AssignTarget, scope: &ScopeRef) -> Result<Value, JsException> {
        match target {
            AssignTarget::Simple(SimpleAssignTarget::Ident(ident)) => {
                let name = ident.id.sym.as_ref();
                Scope::get(scope, name).ok_or_else(|| {
                    self.exception_at(
                        JsError::reference(format!("{name} is not defined")),
                        ident.id.span,
                    )
                })
            }
            AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                let object = self.eval_expr(&member.obj, scope)?;
                let key = self.member_key(member, scope)?;
                self.property_get(&object, &key, member.span)
            }
            _ => Err(unsupported("this assignment target")),
        }
    }

    fn assign_target(
        &mut self,
        target: &AssignTarget,
        value: Value,
        scope: &ScopeRef,
    ) -> Result<(), JsException> {
        match target {
            AssignTarget::Simple(SimpleAssignTarget::Ident(ident)) => {
                Scope::set(scope, ident.id.sym.as_ref(), value)
                    .map_err(|error| self.exception_at(error, ident.id.span))
            }
            AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                let object = self.eval_expr(&member.obj, scope)?;
                let key = self.member_key(member, scope)?;
                self.property_set(&object, &key, value, member.span)
            }
            _ => Err(unsupported("this assignment target")),
        }
    }

    fn apply_binary(
        &mut self,
        op: BinaryOp,
        left: Value,
        right: Value,
        span: Span,
    ) -> Result<Value, JsException> {
        let value = match op {
            BinaryOp::Add => match (&left, &right) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Value::String(format!("{}{}", left.stringify(), right.stringify()))
                }
                _ => Value::Number(left.to_number() + right.to_number()),
            },
            BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
            BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
            BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
            BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
            BinaryOp::Exp => Value::Number(left.to_number().powf(right.to_number())),
            BinaryOp::Lt => Value::Bool(compare(&left, &right, |o| o.is_lt())),
            BinaryOp::LtEq => Value::Bool(compare(&left, &right, |o| o.is_le())),
            BinaryOp::Gt => Value::Bool(compare(&left, &right, |o| o.is_gt())),
            BinaryOp::GtEq => Value::Bool(compare(&left, &right, |o| o.is_ge())),
            BinaryOp::EqEq => Value::Bool(left.loose_eq(&right)),
            BinaryOp::NotEq => Value::Bool(!left.loose_eq(&right)),
            BinaryOp::EqEqEq => Value::Bool(left.strict_eq(&right)),
            BinaryOp::NotEqEq => Value::Bool(!left.strict_eq(&right)),
            BinaryOp::BitAnd => Value::Number(f64::from(left.to_int32() & right.to_int32())),
            BinaryOp::BitOr => Value::Number(f64::from(left.to_int32() | right.to_int32())),
            BinaryOp::BitXor => Value::Number(f64::from(left.to_int32() ^ right.to_int32())),
            BinaryOp::LShift => {
                Value::Number(f64::from(left.to_int32() << (right.to_uint32() & 31)))
            }
            BinaryOp::RShift => {
                Value::Number(f64::from(left.to_int32() >> (right.to_uint32() & 31)))
            }
            BinaryOp::ZeroFillRShift => {
                Value::Number(f64::from(left.to_uint32() >> (right.to_uint32() & 31)))
            }
            BinaryOp::In => match &right {
                Value::Object(properties) => {
                    Value::Bool(properties.borrow().contains_key(&left.stringify()))
                }
                Value::Array(items) => {
                    let index = left.stringify().parse::<usize>();
                    Value::Bool(index.is_ok_and(|index| index < items.borrow().len()))
                }
                _ => {
                    let error =
                        JsError::type_error("Cannot use 'in' operator on a non-object value");
                    return Err(self.exception_at(error, span));
                }
            },
            // Intentional simplification: prototype chains are not modeled.
            BinaryOp::InstanceOf => Value::Bool(false),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::NullishCoalescing => {
                unreachable!("short-circuit operators are handled before evaluation")
            }
        };
        Ok(value)
    }
}

//---------------------------------------------------------
//  CALLS, CONSTRUCTION, AND PROPERTY ACCESS.
//---------------------------------------------------------

impl Runtime {
    fn eval_call(&mut self, call: &CallExpr, scope: &ScopeRef) -> Result<Value, JsException> {
        let Callee::Expr(callee_expr) = &call.callee else {
            return Err(unsupported("super and import calls"));
        };

        // Method calls keep their receiver and may dispatch to builtin
        // method tables (promises, arrays, strings).
        if let Expr::Member(member) = unparen(callee_expr) {
            let object = self.eval_expr(&member.obj, scope)?;
            let key = self.member_key(member, scope)?;
            let args = self.eval_args(&call.args, scope)?;
            return self.call_method(object, &key, args, call.span);
        }

        let callee = self.eval_expr(callee_expr, scope)?;
        let args = self.eval_args(&call.args, scope)?;
        let hint = callee_name(callee_expr);
        self.invoke(&callee, None, &args, &hint, call.span)
    }

    fn eval_new(&mut self, new_expr: &NewExpr, scope: &ScopeRef) -> Result<Value, JsException> {
        let callee = self.eval_expr(&new_expr.callee, scope)?;
        let args = match &new_expr.args {
            Some(args) => self.eval_args(args, scope)?,
            None => Vec::new(),
        };
        let hint = callee_name(&new_expr.callee);

        match callee {
            // Natives construct their own result (`new Promise(...)`).
            Value::Native(_) => self.invoke(&callee, None, &args, &hint, new_expr.span),
            Value::Function(function) => {
                if function.is_arrow {
                    let error = JsError::type_error(format!("{hint} is not a constructor"));
                    return Err(self.exception_at(error, new_expr.span));
                }
                let object = Value::object(IndexMap::new());
                // An explicit return value from the constructor body is
                // ignored; the fresh object always wins.
                self.call_user_function(&function, &args, Some(object.clone()))?;
                Ok(object)
            }
            _ => {
                let error = JsError::type_error(format!("{hint} is not a constructor"));
                Err(self.exception_at(error, new_expr.span))
            }
        }
    }

    fn eval_args(
        &mut self,
        args: &[ExprOrSpread],
        scope: &ScopeRef,
    ) -> Result<Vec<Value>, JsException> {
        let mut values = Vec::new();
        for arg in args {
            let value = self.eval_expr(&arg.expr, scope)?;
            match arg.spread {
                Some(_) => self.spread_into(&mut values, value, arg.expr.span())?,
                None => values.push(value),
            }
        }
        Ok(values)
    }

    fn spread_into(
        &mut self,
        out: &mut Vec<Value>,
        value: Value,
        span: Span,
    ) -> Result<(), JsException> {
        match value {
            Value::Array(items) => {
                out.extend(items.borrow().iter().cloned());
                Ok(())
            }
            Value::String(text) => {
                out.extend(text.chars().map(|c| Value::String(c.to_string())));
                Ok(())
            }
            other => {
                let error = JsError::type_error(format!("{} is not iterable", other.stringify()));
                Err(self.exception_at(error, span))
            }
        }
    }

    /// Dispatches `receiver.method(args)`.
    fn call_method(
        &mut self,
        object: Value,
        key: &str,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, JsException> {
        match &object {
            Value::Undefined | Value::Null => {
                let error = JsError::type_error(format!(
                    "Cannot read properties of {} (reading '{key}')",
                    object.stringify()
                ));
                Err(self.exception_at(error, span))
            }
            Value::Promise(promise) => {
                let promise = promise.clone();
                self.call_promise_method(&promise, key, args, span)
            }
            Value::Array(items) => {
                let items = items.clone();
                self.call_array_method(&items, key, args, span)
            }
            Value::String(text) => {
                let text = text.clone();
                self.call_string_method(&text, key, args, span)
            }
            _ => {
                let callee = self.property_get(&object, key, span)?;
                if callee.is_callable() {
                    return self.invoke(&callee, Some(object), &args, key, span);
                }
                let error = JsError::type_error(format!("{key} is not a function"));
                Err(self.exception_at(error, span))
            }
        }
    }

    fn call_promise_method(
        &mut self,
        promise: &PromiseRef,
        key: &str,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, JsException> {
        let callable = |value: Option<&Value>| {
            value.filter(|candidate| candidate.is_callable()).cloned()
        };
        match key {
            "then" => {
                let child = self.promise_then(
                    promise,
                    "Promise.then",
                    callable(args.first()),
                    callable(args.get(1)),
                );
                Ok(Value::Promise(child))
            }
            "catch" => {
                let child =
                    self.promise_then(promise, "Promise.catch", None, callable(args.first()));
                Ok(Value::Promise(child))
            }
            "finally" => match callable(args.first()) {
                Some(callback) => Ok(Value::Promise(self.promise_finally(promise, callback))),
                None => {
                    let child = self.promise_then(promise, "Promise.finally", None, None);
                    Ok(Value::Promise(child))
                }
            },
            _ => {
                let error = JsError::type_error(format!("{key} is not a function"));
                Err(self.exception_at(error, span))
            }
        }
    }

    /// The §4.4 call protocol, minus receiver resolution.
    pub fn invoke(
        &mut self,
        callee: &Value,
        this: Option<Value>,
        args: &[Value],
        hint: &str,
        span: Span,
    ) -> Result<Value, JsException> {
        match callee {
            Value::Native(native) => {
                let line = self.line_of(span);
                let frame = self.push_frame(native.name, line);
                if let Some(line) = line {
                    self.highlight_line(line);
                }
                let native = native.clone();
                let result = (native.func)(self, args);
                self.pop_frame(frame);
                result
            }
            Value::Function(function) => {
                let function = function.clone();
                self.call_user_function(&function, args, this)
            }
            _ => {
                let error = JsError::type_error(format!("{hint} is not a function"));
                Err(self.exception_at(error, span))
            }
        }
    }

    /// Entry point for callbacks invoked from the scheduler (timers, queued
    /// tasks, promise reactions).
    pub fn call_function(
        &mut self,
        callee: &Value,
        args: &[Value],
        this: Option<Value>,
    ) -> Result<Value, JsException> {
        let hint = match callee {
            Value::Function(function) => {
                function.name.clone().unwrap_or_else(|| "anonymous".into())
            }
            Value::Native(native) => native.name.to_string(),
            other => other.stringify(),
        };
        self.invoke(callee, this, args, &hint, Span::default())
    }

    fn call_user_function(
        &mut self,
        function: &Rc<JsFunction>,
        args: &[Value],
        this: Option<Value>,
    ) -> Result<Value, JsException> {
        let scope = Scope::child(&function.scope, true);
        for (index, param) in function.params.iter().enumerate() {
            let value = args.get(index).cloned().unwrap_or(Value::Undefined);
            Scope::define(&scope, param, value, BindingKind::Let);
        }
        Scope::define(&scope, "arguments", Value::array(args.to_vec()), BindingKind::Let);
        if !function.is_arrow {
            Scope::define(&scope, "this", this.unwrap_or(Value::Undefined), BindingKind::Let);
        }

        let name = function.name.as_deref().unwrap_or("anonymous");
        let frame = self.push_frame(name, Some(function.line));
        self.highlight_line(function.line);

        let result = if function.is_async {
            self.run_async_body(function, &scope)
        } else {
            self.run_sync_body(function, &scope)
        };

        self.pop_frame(frame);
        result
    }

    fn run_sync_body(
        &mut self,
        function: &Rc<JsFunction>,
        scope: &ScopeRef,
    ) -> Result<Value, JsException> {
        match &function.body {
            FunctionBody::Block(block) => {
                match self.exec_statements(&block.stmts, scope, None)? {
                    Completion::Return(value) => Ok(value),
                    _ => Ok(Value::Undefined),
                }
            }
            // Expression-bodied arrows wrap their value as a return.
            FunctionBody::Expr(expr) => self.eval_expr(expr, scope),
        }
    }

    /// Calling an async function returns its promise immediately; the body
    /// either settles it here or suspends and settles it from a microtask.
    fn run_async_body(
        &mut self,
        function: &Rc<JsFunction>,
        scope: &ScopeRef,
    ) -> Result<Value, JsException> {
        let promise = self.new_promise();
        let context = AsyncContext {
            promise: promise.clone(),
        };

        let completion = match &function.body {
            FunctionBody::Block(block) => {
                self.exec_statements(&block.stmts, scope, Some(&context))
            }
            FunctionBody::Expr(expr) => self.eval_expr(expr, scope).map(Completion::Return),
        };

        match completion {
            // The stored continuation now owns settling the promise.
            Ok(Completion::Suspended) => {}
            Ok(Completion::Return(value)) => self.resolve_promise(&promise, value),
            Ok(_) => self.resolve_promise(&promise, Value::Undefined),
            Err(exception) => self.reject_promise(&promise, exception.value),
        }

        Ok(Value::Promise(promise))
    }

    fn member_key(&mut self, member: &MemberExpr, scope: &ScopeRef) -> Result<String, JsException> {
        match &member.prop {
            MemberProp::Ident(ident) => Ok(ident.sym.to_string()),
            MemberProp::Computed(computed) => {
                Ok(self.eval_expr(&computed.expr, scope)?.stringify())
            }
            MemberProp::PrivateName(_) => Err(unsupported("private names")),
        }
    }

    pub fn property_get(
        &mut self,
        object: &Value,
        key: &str,
        span: Span,
    ) -> Result<Value, JsException> {
        match object {
            Value::Undefined | Value::Null => {
                let error = JsError::type_error(format!(
                    "Cannot read properties of {} (reading '{key}')",
                    object.stringify()
                ));
                Err(self.exception_at(error, span))
            }
            Value::Object(properties) => {
                Ok(properties.borrow().get(key).cloned().unwrap_or(Value::Undefined))
            }
            Value::Array(items) => {
                if key == "length" {
                    return Ok(Value::Number(items.borrow().len() as f64));
                }
                match key.parse::<usize>() {
                    Ok(index) => Ok(items
                        .borrow()
                        .get(index)
                        .cloned()
                        .unwrap_or(Value::Undefined)),
                    Err(_) => Ok(Value::Undefined),
                }
            }
            Value::String(text) => {
                if key == "length" {
                    return Ok(Value::Number(text.chars().count() as f64));
                }
                match key.parse::<usize>() {
                    Ok(index) => Ok(text
                        .chars()
                        .nth(index)
                        .map_or(Value::Undefined, |c| Value::String(c.to_string()))),
                    Err(_) => Ok(Value::Undefined),
                }
            }
            Value::Native(native) => Ok(native
                .properties
                .borrow()
                .get(key)
                .cloned()
                .unwrap_or(Value::Undefined)),
            Value::Function(function) if key == "name" => Ok(Value::String(
                function.name.clone().unwrap_or_default(),
            )),
            _ => Ok(Value::Undefined),
        }
    }

    pub fn property_set(
        &mut self,
        object: &Value,
        key: &str,
        value: Value,
        span: Span,
    ) -> Result<(), JsException> {
        match object {
            Value::Undefined | Value::Null => {
                let error = JsError::type_error(format!(
                    "Cannot set properties of {} (setting '{key}')",
                    object.stringify()
                ));
                Err(self.exception_at(error, span))
            }
            Value::Object(properties) => {
                properties.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
            Value::Array(items) => {
                if key == "length" {
                    let length = value.to_number();
                    if length.is_finite() && length >= 0.0 {
                        items.borrow_mut().resize(length as usize, Value::Undefined);
                    }
                    return Ok(());
                }
                if let Ok(index) = key.parse::<usize>() {
                    let mut items = items.borrow_mut();
                    if index >= items.len() {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                }
                Ok(())
            }
            Value::Native(native) => {
                native.properties.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
            // Properties of primitives silently evaporate, as in sloppy mode.
            _ => Ok(()),
        }
    }

    fn make_function(
        &mut self,
        name: Option<String>,
        function: &Function,
        scope: &ScopeRef,
    ) -> Result<Value, JsException> {
        if function.is_generator {
            return Err(unsupported("generator functions"));
        }
        let mut params = Vec::new();
        for param in &function.params {
            let Pat::Ident(ident) = &param.pat else {
                return Err(unsupported("non-identifier parameters"));
            };
            params.push(ident.id.sym.to_string());
        }
        let Some(body) = &function.body else {
            return Err(unsupported("bodyless functions"));
        };
        let line = self.line_of(function.span).unwrap_or(1);
        Ok(Value::Function(Rc::new(JsFunction {
            name,
            params,
            body: FunctionBody::Block(Rc::new(body.clone())),
            scope: scope.clone(),
            is_async: function.is_async,
            is_arrow: false,
            line,
        })))
    }

    fn make_arrow(
        &mut self,
        name: Option<String>,
        arrow: &ArrowExpr,
        scope: &ScopeRef,
    ) -> Result<Value, JsException> {
        let mut params = Vec::new();
        for param in &arrow.params {
            let Pat::Ident(ident) = param else {
                return Err(unsupported("non-identifier parameters"));
            };
            params.push(ident.id.sym.to_string());
        }
        let body = match &*arrow.body {
            BlockStmtOrExpr::BlockStmt(block) => FunctionBody::Block(Rc::new(block.clone())),
            BlockStmtOrExpr::Expr(expr) => FunctionBody::Expr(Rc::new((**expr).clone())),
        };
        let line = self.line_of(arrow.span).unwrap_or(1);
        Ok(Value::Function(Rc::new(JsFunction {
            name,
            params,
            body,
            scope: scope.clone(),
            is_async: arrow.is_async,
            is_arrow: true,
            line,
        })))
    }

    /// Evaluates an initializer, naming anonymous functions after the
    /// binding they land in.
    fn eval_named_expr(
        &mut self,
        expr: &Expr,
        scope: &ScopeRef,
        name: &str,
    ) -> Result<Value, JsException> {
        match unparen(expr) {
            Expr::Arrow(arrow) => self.make_arrow(Some(name.to_string()), arrow, scope),
            Expr::Fn(function) if function.ident.is_none() => {
                self.make_function(Some(name.to_string()), &function.function, scope)
            }
            _ => self.eval_expr(expr, scope),
        }
    }

    /// Wraps an engine error as a throwable, stamped with the source line.
    pub(crate) fn exception_at(&self, error: JsError, span: Span) -> JsException {
        JsException {
            value: Value::String(error.text()),
            line: self.line_of(span),
        }
    }
}

//---------------------------------------------------------
//  SMALL AST HELPERS.
//---------------------------------------------------------

fn unparen(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(paren) => unparen(&paren.expr),
        other => other,
    }
}

fn callee_name(expr: &Expr) -> String {
    match unparen(expr) {
        Expr::Ident(ident) => ident.sym.to_string(),
        Expr::Member(member) => match &member.prop {
            MemberProp::Ident(ident) => ident.sym.to_string(),
            _ => "expression".to_string(),
        },
        _ => "expression".to_string(),
    }
}

fn binding_kind(kind: VarDeclKind) -> BindingKind {
    match kind {
        VarDeclKind::Var => BindingKind::Var,
        VarDeclKind::Let => BindingKind::Let,
        VarDeclKind::Const => BindingKind::Const,
    }
}

fn compound_op(op: AssignOp) -> BinaryOp {
    match op {
        AssignOp::AddAssign => BinaryOp::Add,
        AssignOp::SubAssign => BinaryOp::Sub,
        AssignOp::MulAssign => BinaryOp::Mul,
        AssignOp::DivAssign => BinaryOp::Div,
        AssignOp::ModAssign => BinaryOp::Mod,
        AssignOp::LShiftAssign => BinaryOp::LShift,
        AssignOp::RShiftAssign => BinaryOp::RShift,
        AssignOp::ZeroFillRShiftAssign => BinaryOp::ZeroFillRShift,
        AssignOp::BitOrAssign => BinaryOp::BitOr,
        AssignOp::BitXorAssign => BinaryOp::BitXor,
        AssignOp::BitAndAssign => BinaryOp::BitAnd,
        AssignOp::ExpAssign => BinaryOp::Exp,
        _ => BinaryOp::Add,
    }
}

fn compare(left: &Value, right: &Value, check: fn(std::cmp::Ordering) -> bool) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return check(a.cmp(b));
    }
    let a = left.to_number();
    let b = right.to_number();
    a.partial_cmp(&b).is_some_and(check)
}

/// Recognizes the three statement positions where `await` can suspend.
fn await_form(stmt: &Stmt) -> Option<AwaitForm<'_>> {
    match stmt {
        Stmt::Decl(Decl::Var(var)) if var.decls.len() == 1 => {
            let declarator = &var.decls[0];
            let Pat::Ident(name) = &declarator.name else {
                return None;
            };
            let init = declarator.init.as_deref()?;
            let Expr::Await(await_expr) = unparen(init) else {
                return None;
            };
            Some(AwaitForm::Bind {
                name: name.id.sym.to_string(),
                kind: binding_kind(var.kind),
                argument: &await_expr.arg,
            })
        }
        Stmt::Expr(stmt) => {
            let Expr::Await(await_expr) = unparen(&stmt.expr) else {
                return None;
            };
            Some(AwaitForm::Drop {
                argument: &await_expr.arg,
            })
        }
        Stmt::Return(stmt) => {
            let argument = stmt.arg.as_deref()?;
            let Expr::Await(await_expr) = unparen(argument) else {
                return None;
            };
            Some(AwaitForm::Return {
                argument: &await_expr.arg,
            })
        }
        _ => None,
    }
}

fn unsupported(what: &str) -> JsException {
    JsError::generic(format!("{what} is not supported")).into()
}
