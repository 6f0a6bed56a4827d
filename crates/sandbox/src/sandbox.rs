//! Runtime enforcement boundary: interprets a validated script behind a
//! capability-dispatch gate.
//!
//! Defense in depth against validator gaps or direct invocation bypassing
//! validation: `eval` re-runs the static validator before anything executes.
//! A static failure therefore has zero side effects; a dynamic denial may
//! follow earlier, permitted calls in the same script.

use std::collections::HashMap;

use tracing::debug;

use scriptwarden_core::{SafetyError, ScriptSource, Value};
use scriptwarden_lang::{BinaryOp, Expr, Program, Stmt, UnaryOp};

use crate::capability::{CallRecord, CapabilityContext};
use crate::denylist;
use crate::shellwords;
use crate::validator::StaticValidator;

/// Sandbox for one execution context at a time. Holds the in-memory call
/// trail of the most recent execution; the capability context is only
/// borrowed for the duration of one `eval`.
#[derive(Debug, Default)]
pub struct ExecutionSandbox {
    trail: Vec<CallRecord>,
}

impl ExecutionSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every intercepted call from the most recent `eval`, recorded before
    /// its authorization decision, denied attempts included.
    pub fn call_trail(&self) -> &[CallRecord] {
        &self.trail
    }

    /// Validate and execute a script against the supplied capability
    /// context. Returns the script's result (the value of its last
    /// expression statement, or an explicit `return`).
    pub fn eval(
        &mut self,
        source: &str,
        label: &str,
        ctx: &dyn CapabilityContext,
    ) -> Result<Value, SafetyError> {
        // Clear before validating so a rejected script never leaves the
        // previous execution's calls behind in the trail.
        self.trail.clear();
        StaticValidator::validate(source, label)?;
        let program = scriptwarden_lang::parse(source).map_err(|err| {
            // Unreachable after validation, but never unwrap on it.
            SafetyError::ExecutionFailed(format!("script `{label}` failed to parse: {err}"))
        })?;
        let mut interp = Interp {
            ctx,
            trail: &mut self.trail,
            scopes: vec![HashMap::new()],
        };
        interp.run(&program)
    }

    /// [`eval`](Self::eval) for a pre-labeled script.
    pub fn eval_source(
        &mut self,
        script: &ScriptSource,
        ctx: &dyn CapabilityContext,
    ) -> Result<Value, SafetyError> {
        self.eval(script.source(), script.label(), ctx)
    }
}

enum Exec {
    Value(Value),
    Return(Value),
}

struct Interp<'a> {
    ctx: &'a dyn CapabilityContext,
    trail: &'a mut Vec<CallRecord>,
    scopes: Vec<HashMap<String, Value>>,
}

impl Interp<'_> {
    fn run(&mut self, program: &Program) -> Result<Value, SafetyError> {
        let mut last = Value::Null;
        for stmt in &program.stmts {
            match self.exec_stmt(stmt)? {
                Exec::Value(v) => last = v,
                Exec::Return(v) => return Ok(v),
            }
        }
        Ok(last)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Exec, SafetyError> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = self.eval_expr(value)?;
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), value);
                }
                Ok(Exec::Value(Value::Null))
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                let taken = if self.eval_expr(cond)?.truthy() {
                    Some(then_body)
                } else {
                    else_body.as_ref()
                };
                if let Some(body) = taken {
                    if let Some(returned) = self.exec_block(body)? {
                        return Ok(Exec::Return(returned));
                    }
                }
                Ok(Exec::Value(Value::Null))
            }
            Stmt::For {
                var,
                iterable,
                body,
                line,
            } => {
                let items = match self.eval_expr(iterable)? {
                    Value::List(items) => items,
                    other => {
                        return Err(SafetyError::ExecutionFailed(format!(
                            "cannot iterate over {} on line {line}",
                            other.type_name()
                        )));
                    }
                };
                for item in items {
                    self.scopes.push(HashMap::from([(var.clone(), item)]));
                    let result = self.exec_stmts(body);
                    self.scopes.pop();
                    if let Some(returned) = result? {
                        return Ok(Exec::Return(returned));
                    }
                }
                Ok(Exec::Value(Value::Null))
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                Ok(Exec::Return(value))
            }
            Stmt::Expr(expr) => Ok(Exec::Value(self.eval_expr(expr)?)),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Option<Value>, SafetyError> {
        self.scopes.push(HashMap::new());
        let result = self.exec_stmts(stmts);
        self.scopes.pop();
        result
    }

    /// Execute statements in the current scope; `Some` means an early return.
    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Option<Value>, SafetyError> {
        for stmt in stmts {
            if let Exec::Return(v) = self.exec_stmt(stmt)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, SafetyError> {
        match expr {
            Expr::Null { .. } => Ok(Value::Null),
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::Number { value, .. } => Ok(Value::Number(*value)),
            Expr::Str { value, .. } => Ok(Value::Str(value.clone())),
            Expr::Backtick { .. } => {
                // Statically unreachable; kept as a second gate.
                Err(SafetyError::CapabilityDenied(
                    "inline shell execution is not permitted".to_string(),
                ))
            }
            Expr::Ident { name, line } => self.lookup(name).ok_or_else(|| {
                SafetyError::ExecutionFailed(format!("unknown variable `{name}` on line {line}"))
            }),
            Expr::Const { name, .. } => resolve_const(name),
            Expr::Global { name, .. } => Err(SafetyError::CapabilityDenied(format!(
                "global `{name}` is not accessible in the sandbox"
            ))),
            Expr::Unary { op, operand, line } => {
                let value = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(SafetyError::ExecutionFailed(format!(
                            "cannot negate {} on line {line}",
                            other.type_name()
                        ))),
                    },
                }
            }
            Expr::Binary { op, lhs, rhs, line } => self.eval_binary(*op, lhs, rhs, *line),
            Expr::Call { callee, args, line } => self.eval_call(callee, args, *line),
            Expr::Member { object, name, line } => match &**object {
                Expr::Const { name: const_name, .. } => Err(SafetyError::ExecutionFailed(format!(
                    "`{const_name}.{name}` must be invoked on line {line}"
                ))),
                _ => {
                    let object = self.eval_expr(object)?;
                    match object {
                        Value::Map(entries) => {
                            Ok(entries.get(name).cloned().unwrap_or(Value::Null))
                        }
                        other => Err(SafetyError::ExecutionFailed(format!(
                            "{} has no member `{name}` on line {line}",
                            other.type_name()
                        ))),
                    }
                }
            },
            Expr::Index { object, index, line } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                match (object, index) {
                    (Value::List(items), Value::Number(n)) => {
                        if n.fract() == 0.0 && n >= 0.0 {
                            Ok(items.get(n as usize).cloned().unwrap_or(Value::Null))
                        } else {
                            Ok(Value::Null)
                        }
                    }
                    (Value::Map(entries), Value::Str(key)) => {
                        Ok(entries.get(&key).cloned().unwrap_or(Value::Null))
                    }
                    (object, index) => Err(SafetyError::ExecutionFailed(format!(
                        "cannot index {} with {} on line {line}",
                        object.type_name(),
                        index.type_name()
                    ))),
                }
            }
            Expr::List { items, .. } => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval_expr(item)?);
                }
                Ok(Value::List(out))
            }
            Expr::Map { entries, .. } => {
                let mut out = std::collections::BTreeMap::new();
                for (key, value) in entries {
                    out.insert(key.clone(), self.eval_expr(value)?);
                }
                Ok(Value::Map(out))
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        line: u32,
    ) -> Result<Value, SafetyError> {
        // Short-circuit forms evaluate the right side only when needed.
        match op {
            BinaryOp::And => {
                if !self.eval_expr(lhs)?.truthy() {
                    return Ok(Value::Bool(false));
                }
                return Ok(Value::Bool(self.eval_expr(rhs)?.truthy()));
            }
            BinaryOp::Or => {
                if self.eval_expr(lhs)?.truthy() {
                    return Ok(Value::Bool(true));
                }
                return Ok(Value::Bool(self.eval_expr(rhs)?.truthy()));
            }
            _ => {}
        }

        let lhs = self.eval_expr(lhs)?;
        let rhs = self.eval_expr(rhs)?;
        let type_error = |sym: &str, l: &Value, r: &Value| {
            SafetyError::ExecutionFailed(format!(
                "cannot apply `{sym}` to {} and {} on line {line}",
                l.type_name(),
                r.type_name()
            ))
        };

        match op {
            BinaryOp::Add => match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
                (Value::List(a), Value::List(b)) => {
                    let mut out = a.clone();
                    out.extend(b.iter().cloned());
                    Ok(Value::List(out))
                }
                _ => Err(type_error("+", &lhs, &rhs)),
            },
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                match (&lhs, &rhs) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(match op {
                        BinaryOp::Sub => a - b,
                        BinaryOp::Mul => a * b,
                        BinaryOp::Div => a / b,
                        _ => a % b,
                    })),
                    _ => Err(type_error(op.symbol(), &lhs, &rhs)),
                }
            }
            BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
            BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let ordering = match (&lhs, &rhs) {
                    (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                    (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                    _ => None,
                };
                let Some(ordering) = ordering else {
                    return Err(type_error(op.symbol(), &lhs, &rhs));
                };
                let result = match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Gt => ordering.is_gt(),
                    BinaryOp::Le => ordering.is_le(),
                    _ => ordering.is_ge(),
                };
                Ok(Value::Bool(result))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        arg_exprs: &[Expr],
        line: u32,
    ) -> Result<Value, SafetyError> {
        let mut args = Vec::with_capacity(arg_exprs.len());
        for arg in arg_exprs {
            args.push(self.eval_expr(arg)?);
        }

        match callee {
            Expr::Ident { name, .. } => self.dispatch_unqualified(name, &args, line),
            Expr::Member { object, name, .. } => match &**object {
                Expr::Const { name: const_name, .. } => {
                    self.dispatch_namespace(const_name, name, &args, line)
                }
                _ => {
                    let object = self.eval_expr(object)?;
                    Err(SafetyError::ExecutionFailed(format!(
                        "{} has no callable member `{name}` on line {line}",
                        object.type_name()
                    )))
                }
            },
            // Attribute to the callee expression itself, which may sit on an
            // earlier line than the opening parenthesis.
            other => Err(SafetyError::ExecutionFailed(format!(
                "expression is not callable on line {}",
                other.line()
            ))),
        }
    }

    /// Every unqualified call a script makes lands here. The always-safe
    /// whitelist is exposed unconditionally; every other call is recorded to
    /// the trail before any authorization decision.
    fn dispatch_unqualified(
        &mut self,
        name: &str,
        args: &[Value],
        line: u32,
    ) -> Result<Value, SafetyError> {
        if denylist::is_always_safe_call(name) {
            return builtin(name, args, line);
        }

        self.trail.push(CallRecord::new("sandbox", name, args));

        if denylist::is_import_call(name) {
            return match args {
                [Value::Str(module)] if module == denylist::RUNTIME_IMPORT => {
                    Ok(Value::Bool(true))
                }
                [Value::Str(module)] => Err(SafetyError::CapabilityDenied(format!(
                    "import of `{module}` is not permitted at run time"
                ))),
                _ => Err(SafetyError::CapabilityDenied(
                    "import requires a single literal module name".to_string(),
                )),
            };
        }

        if self.ctx.exposes(name) {
            debug!(operation = name, "forwarding call to capability context");
            return self.ctx.invoke(name, args);
        }
        debug!(operation = name, "denied: operation not exposed");
        Err(SafetyError::CapabilityDenied(format!(
            "operation `{name}` is not exposed by the capability context"
        )))
    }

    /// Member calls on constants. Resolution is default-deny: only the two
    /// capability namespaces dispatch anywhere.
    fn dispatch_namespace(
        &mut self,
        const_name: &str,
        method: &str,
        args: &[Value],
        line: u32,
    ) -> Result<Value, SafetyError> {
        self.trail.push(CallRecord::new(const_name, method, args));

        if const_name == denylist::SHELLWORDS_NAMESPACE {
            return shellwords_call(method, args, line);
        }
        if const_name == denylist::HTTP_NAMESPACE {
            let operation = format!("http.{method}");
            if self.ctx.exposes(&operation) {
                debug!(operation = %operation, "forwarding namespace call to capability context");
                return self.ctx.invoke(&operation, args);
            }
            return Err(SafetyError::CapabilityDenied(format!(
                "operation `{operation}` is not exposed by the capability context"
            )));
        }
        if denylist::is_type_constant(const_name) {
            return Err(SafetyError::ExecutionFailed(format!(
                "type tag `{const_name}` has no operations (line {line})"
            )));
        }
        Err(SafetyError::CapabilityDenied(format!(
            "constant `{const_name}` is not permitted in the sandbox"
        )))
    }
}

/// Bare constant resolution: an explicit allowlist of inert value types plus
/// the two capability namespaces. Every other name is denied by name.
fn resolve_const(name: &str) -> Result<Value, SafetyError> {
    if let Some(tag) = intern_type(name) {
        return Ok(Value::Type(tag));
    }
    if name == denylist::HTTP_NAMESPACE {
        return Ok(Value::Type(denylist::HTTP_NAMESPACE));
    }
    if name == denylist::SHELLWORDS_NAMESPACE {
        return Ok(Value::Type(denylist::SHELLWORDS_NAMESPACE));
    }
    Err(SafetyError::CapabilityDenied(format!(
        "constant `{name}` is not permitted in the sandbox"
    )))
}

fn intern_type(name: &str) -> Option<&'static str> {
    match name {
        "String" => Some("String"),
        "Number" => Some("Number"),
        "Boolean" => Some("Boolean"),
        "List" => Some("List"),
        "Map" => Some("Map"),
        "Null" => Some("Null"),
        _ => None,
    }
}

/// Inert, side-effect-free primitives exposed unconditionally.
fn builtin(name: &str, args: &[Value], line: u32) -> Result<Value, SafetyError> {
    let arity = |expected: usize| -> Result<(), SafetyError> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(SafetyError::ExecutionFailed(format!(
                "`{name}` expects {expected} argument(s), got {} on line {line}",
                args.len()
            )))
        }
    };
    match name {
        "type_of" => {
            arity(1)?;
            Ok(Value::Type(
                intern_type(args[0].type_name()).unwrap_or("Type"),
            ))
        }
        "to_string" => {
            arity(1)?;
            Ok(Value::Str(args[0].to_display_string()))
        }
        "to_number" => {
            arity(1)?;
            Ok(match &args[0] {
                Value::Number(n) => Value::Number(*n),
                Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
                Value::Str(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            })
        }
        "len" => {
            arity(1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
                Value::List(items) => Ok(Value::Number(items.len() as f64)),
                Value::Map(entries) => Ok(Value::Number(entries.len() as f64)),
                other => Err(SafetyError::ExecutionFailed(format!(
                    "`len` expects a String, List, or Map, got {} on line {line}",
                    other.type_name()
                ))),
            }
        }
        "eq" => {
            arity(2)?;
            Ok(Value::Bool(args[0] == args[1]))
        }
        _ => Err(SafetyError::ExecutionFailed(format!(
            "unknown builtin `{name}` on line {line}"
        ))),
    }
}

fn shellwords_call(method: &str, args: &[Value], line: u32) -> Result<Value, SafetyError> {
    match (method, args) {
        ("quote", [Value::Str(word)]) => Ok(Value::Str(shellwords::quote(word))),
        ("split", [Value::Str(text)]) => match shellwords::split(text) {
            Some(words) => Ok(Value::List(words.into_iter().map(Value::Str).collect())),
            None => Err(SafetyError::ExecutionFailed(format!(
                "unbalanced quoting in `Shellwords.split` argument on line {line}"
            ))),
        },
        ("join", [Value::List(items)]) => {
            let mut words = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(s) => words.push(s.clone()),
                    other => {
                        return Err(SafetyError::ExecutionFailed(format!(
                            "`Shellwords.join` expects a List of Strings, found {} on line {line}",
                            other.type_name()
                        )));
                    }
                }
            }
            Ok(Value::Str(shellwords::join(&words)))
        }
        _ => Err(SafetyError::ExecutionFailed(format!(
            "`Shellwords.{method}` is not a known operation or has wrong arguments (line {line})"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Capability context that records every forwarded call.
    struct TestContext {
        ops: Vec<&'static str>,
        calls: RefCell<Vec<(String, Vec<Value>)>>,
    }

    impl TestContext {
        fn new(ops: &[&'static str]) -> Self {
            Self {
                ops: ops.to_vec(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Vec<Value>)> {
            self.calls.borrow().clone()
        }
    }

    impl CapabilityContext for TestContext {
        fn operations(&self) -> Vec<String> {
            self.ops.iter().map(|s| s.to_string()).collect()
        }

        fn invoke(&self, operation: &str, args: &[Value]) -> Result<Value, SafetyError> {
            self.calls
                .borrow_mut()
                .push((operation.to_string(), args.to_vec()));
            match operation {
                "echo" => Ok(Value::List(args.to_vec())),
                "http.get" => match args {
                    [Value::Str(url)] => Ok(Value::Str(format!("fetched:{url}"))),
                    _ => Err(SafetyError::ExecutionFailed("bad http.get args".into())),
                },
                _ => Ok(Value::Null),
            }
        }
    }

    #[test]
    fn exposed_operation_forwards_arguments_unchanged() {
        let ctx = TestContext::new(&["echo"]);
        let mut sandbox = ExecutionSandbox::new();
        let result = sandbox.eval(r#"echo("a", 1, true);"#, "t.ws", &ctx).unwrap();
        assert_eq!(
            result,
            Value::List(vec![
                Value::Str("a".into()),
                Value::Number(1.0),
                Value::Bool(true)
            ])
        );
        let calls = ctx.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "echo");
    }

    #[test]
    fn unexposed_operation_is_denied_and_still_recorded() {
        let ctx = TestContext::new(&["echo"]);
        let mut sandbox = ExecutionSandbox::new();
        let err = sandbox.eval(r#"steal("x");"#, "t.ws", &ctx).unwrap_err();
        assert!(matches!(err, SafetyError::CapabilityDenied(_)));
        assert!(err.to_string().contains("steal"));
        // Denied attempt is in the trail, with type shapes only.
        assert_eq!(sandbox.call_trail().len(), 1);
        assert_eq!(sandbox.call_trail()[0].method, "steal");
        assert_eq!(sandbox.call_trail()[0].arg_types, vec!["String"]);
        assert!(ctx.calls().is_empty());
    }

    #[test]
    fn static_failure_has_zero_side_effects() {
        let ctx = TestContext::new(&["echo"]);
        let mut sandbox = ExecutionSandbox::new();
        let err = sandbox
            .eval("echo(\"first\");\nexec(\"rm\");", "t.ws", &ctx)
            .unwrap_err();
        assert!(matches!(err, SafetyError::ScriptRejected { .. }));
        assert!(ctx.calls().is_empty());
        assert!(sandbox.call_trail().is_empty());
    }

    #[test]
    fn rejected_script_does_not_retain_the_previous_trail() {
        let ctx = TestContext::new(&["echo"]);
        let mut sandbox = ExecutionSandbox::new();
        sandbox.eval("echo(1); echo(2);", "t.ws", &ctx).unwrap();
        assert_eq!(sandbox.call_trail().len(), 2);

        let err = sandbox.eval("exec(\"rm\");", "t.ws", &ctx).unwrap_err();
        assert!(matches!(err, SafetyError::ScriptRejected { .. }));
        assert!(sandbox.call_trail().is_empty());
    }

    #[test]
    fn dynamic_denial_can_follow_partial_execution() {
        let ctx = TestContext::new(&["echo"]);
        let mut sandbox = ExecutionSandbox::new();
        let err = sandbox
            .eval("echo(\"first\");\nmissing();", "t.ws", &ctx)
            .unwrap_err();
        assert!(matches!(err, SafetyError::CapabilityDenied(_)));
        // The permitted call already ran.
        assert_eq!(ctx.calls().len(), 1);
        assert_eq!(sandbox.call_trail().len(), 2);
    }

    #[test]
    fn always_safe_builtins_need_no_capability() {
        let ctx = TestContext::new(&[]);
        let mut sandbox = ExecutionSandbox::new();
        assert_eq!(
            sandbox.eval("type_of(\"x\") == String;", "t.ws", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            sandbox.eval("to_string(42);", "t.ws", &ctx).unwrap(),
            Value::Str("42".into())
        );
        assert_eq!(
            sandbox.eval("len([1, 2, 3]);", "t.ws", &ctx).unwrap(),
            Value::Number(3.0)
        );
        assert_eq!(
            sandbox.eval("eq(1 + 1, 2);", "t.ws", &ctx).unwrap(),
            Value::Bool(true)
        );
        // Builtins bypass the trail.
        assert!(sandbox.call_trail().is_empty());
    }

    #[test]
    fn runtime_import_allows_only_the_support_library() {
        let ctx = TestContext::new(&[]);
        let mut sandbox = ExecutionSandbox::new();
        assert_eq!(
            sandbox.eval("use(\"warden\");", "t.ws", &ctx).unwrap(),
            Value::Bool(true)
        );
        // Statically trusted, dynamically denied: the narrower boundary wins.
        let err = sandbox
            .eval("use(\"warden/assert\");", "t.ws", &ctx)
            .unwrap_err();
        assert!(matches!(err, SafetyError::CapabilityDenied(_)));
    }

    #[test]
    fn unknown_constant_is_denied_by_name() {
        let ctx = TestContext::new(&[]);
        let mut sandbox = ExecutionSandbox::new();
        let err = sandbox.eval("let j = Json;", "t.ws", &ctx).unwrap_err();
        assert!(matches!(err, SafetyError::CapabilityDenied(_)));
        assert!(err.to_string().contains("Json"));
    }

    #[test]
    fn http_namespace_forwards_to_dotted_operation() {
        let ctx = TestContext::new(&["http.get"]);
        let mut sandbox = ExecutionSandbox::new();
        let result = sandbox
            .eval(r#"Http.get("https://example.com");"#, "t.ws", &ctx)
            .unwrap();
        assert_eq!(result, Value::Str("fetched:https://example.com".into()));
        assert_eq!(sandbox.call_trail()[0].receiver, "Http");

        let err = sandbox.eval(r#"Http.post("u");"#, "t.ws", &ctx).unwrap_err();
        assert!(err.to_string().contains("http.post"));
    }

    #[test]
    fn shellwords_namespace_is_builtin_and_subprocess_free() {
        let ctx = TestContext::new(&[]);
        let mut sandbox = ExecutionSandbox::new();
        assert_eq!(
            sandbox
                .eval(r#"Shellwords.quote("a b");"#, "t.ws", &ctx)
                .unwrap(),
            Value::Str("'a b'".into())
        );
        assert_eq!(
            sandbox
                .eval(r#"Shellwords.split("echo 'a b'");"#, "t.ws", &ctx)
                .unwrap(),
            Value::List(vec![Value::Str("echo".into()), Value::Str("a b".into())])
        );
    }

    #[test]
    fn control_flow_and_scoping() {
        let ctx = TestContext::new(&[]);
        let mut sandbox = ExecutionSandbox::new();
        let source = r#"
            let total = 0;
            for n in [1, 2, 3, 4] {
                if n % 2 == 0 {
                    let total = total; # shadows; outer stays untouched
                }
            }
            if total == 0 { return "even-sum-untracked"; }
            return "unexpected";
        "#;
        assert_eq!(
            sandbox.eval(source, "t.ws", &ctx).unwrap(),
            Value::Str("even-sum-untracked".into())
        );
    }

    #[test]
    fn result_is_last_expression_value() {
        let ctx = TestContext::new(&[]);
        let mut sandbox = ExecutionSandbox::new();
        assert_eq!(
            sandbox.eval("1 + 1;\n\"done\";", "t.ws", &ctx).unwrap(),
            Value::Str("done".into())
        );
        assert_eq!(sandbox.eval("", "t.ws", &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn map_and_index_access() {
        let ctx = TestContext::new(&[]);
        let mut sandbox = ExecutionSandbox::new();
        let source = r##"
            let m = { url: "https://example.com", retries: 2 };
            let items = [10, 20, 30];
            m.url + "#" + to_string(items[1] + m["retries"]);
        "##;
        assert_eq!(
            sandbox.eval(source, "t.ws", &ctx).unwrap(),
            Value::Str("https://example.com#22".into())
        );
    }

    #[test]
    fn eval_source_runs_a_labeled_script() {
        let ctx = TestContext::new(&["echo"]);
        let mut sandbox = ExecutionSandbox::new();
        let script = ScriptSource::new("echo(1);", "tasks/ping.ws");
        assert!(sandbox.eval_source(&script, &ctx).is_ok());

        let bad = ScriptSource::new("exec(\"x\");", "tasks/bad.ws");
        let err = sandbox.eval_source(&bad, &ctx).unwrap_err();
        assert!(err.to_string().contains("tasks/bad.ws"));
    }

    #[test]
    fn trail_covers_only_the_most_recent_eval() {
        let ctx = TestContext::new(&["echo"]);
        let mut sandbox = ExecutionSandbox::new();
        sandbox.eval("echo(1);", "t.ws", &ctx).unwrap();
        sandbox.eval("echo(1); echo(2);", "t.ws", &ctx).unwrap();
        assert_eq!(sandbox.call_trail().len(), 2);
    }

    #[test]
    fn non_callable_expression_reports_the_callee_line() {
        let ctx = TestContext::new(&[]);
        let mut sandbox = ExecutionSandbox::new();
        // Callee literal on line 2, opening parenthesis on line 3.
        let err = sandbox.eval("\n\"x\"\n(1);", "t.ws", &ctx).unwrap_err();
        assert!(matches!(err, SafetyError::ExecutionFailed(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn unknown_variable_is_an_execution_failure() {
        let ctx = TestContext::new(&[]);
        let mut sandbox = ExecutionSandbox::new();
        let err = sandbox.eval("nope + 1;", "t.ws", &ctx).unwrap_err();
        assert!(matches!(err, SafetyError::ExecutionFailed(_)));
        assert!(err.to_string().contains("nope"));
    }
}
