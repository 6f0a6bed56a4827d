//! Static source validator: decides, without executing anything, whether a
//! script may run.
//!
//! The walk is exhaustive: it never short-circuits on the first match, so
//! every independent violation across the whole script is collected.
//! Violation order follows pre-order traversal, which is not guaranteed to
//! be strict source-line order for deeply nested siblings.

use scriptwarden_core::{SafetyError, ScriptSource, Violation, ViolationKind};
use scriptwarden_lang::{Expr, Program, Stmt};

use crate::denylist;

pub struct StaticValidator;

impl StaticValidator {
    /// Validate a script, failing with an aggregated error listing every
    /// violation found. Empty input passes.
    pub fn validate(source: &str, label: &str) -> Result<(), SafetyError> {
        let violations = Self::collect_violations(source);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SafetyError::ScriptRejected {
                label: label.to_string(),
                violations,
            })
        }
    }

    pub fn validate_source(script: &ScriptSource) -> Result<(), SafetyError> {
        Self::validate(script.source(), script.label())
    }

    /// Non-raising form: returns the full violation list. Unrecoverable
    /// parse failure becomes a single `syntax_error` violation; unparseable
    /// input is treated as unsafe, never as an error to the caller.
    pub fn collect_violations(source: &str) -> Vec<Violation> {
        match scriptwarden_lang::parse(source) {
            Ok(program) => {
                let mut violations = Vec::new();
                visit_program(&program, &mut violations);
                violations
            }
            Err(err) => vec![Violation::new(
                ViolationKind::SyntaxError,
                Some(err.line),
                format!("unparseable script: {}", err.message),
            )],
        }
    }
}

fn visit_program(program: &Program, out: &mut Vec<Violation>) {
    for stmt in &program.stmts {
        visit_stmt(stmt, out);
    }
}

fn visit_stmt(stmt: &Stmt, out: &mut Vec<Violation>) {
    match stmt {
        Stmt::Let { value, .. } => visit_expr(value, out),
        Stmt::If {
            cond,
            then_body,
            else_body,
            ..
        } => {
            visit_expr(cond, out);
            for stmt in then_body {
                visit_stmt(stmt, out);
            }
            if let Some(else_body) = else_body {
                for stmt in else_body {
                    visit_stmt(stmt, out);
                }
            }
        }
        Stmt::For { iterable, body, .. } => {
            visit_expr(iterable, out);
            for stmt in body {
                visit_stmt(stmt, out);
            }
        }
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                visit_expr(value, out);
            }
        }
        Stmt::Expr(expr) => visit_expr(expr, out),
    }
}

/// Pre-order walk. Recursion always continues into children regardless of
/// whether the current node violated.
fn visit_expr(expr: &Expr, out: &mut Vec<Violation>) {
    match expr {
        Expr::Backtick { command, line } => {
            out.push(Violation::new(
                ViolationKind::BacktickExecution,
                Some(*line),
                format!("inline shell execution `{command}` is not permitted"),
            ));
        }
        Expr::Global { name, line } => {
            if denylist::is_dangerous_global(name) {
                out.push(Violation::new(
                    ViolationKind::DangerousGlobal,
                    Some(*line),
                    format!("reference to interpreter global `{name}`"),
                ));
            }
        }
        Expr::Const { name, line } => {
            // Bare reference; receiver-position constants are handled by the
            // Member arm so each occurrence yields exactly one violation.
            if denylist::is_dangerous_constant(name) {
                out.push(Violation::new(
                    ViolationKind::DangerousConstantAccess,
                    Some(*line),
                    format!("access to system constant `{name}`"),
                ));
            }
        }
        Expr::Member { object, name, line } => {
            if let Expr::Const { name: const_name, .. } = &**object {
                if denylist::is_dangerous_constant(const_name) {
                    out.push(Violation::new(
                        ViolationKind::DangerousConstant,
                        Some(*line),
                        format!("use of system namespace `{const_name}` (member `{name}`)"),
                    ));
                    return;
                }
            }
            visit_expr(object, out);
        }
        Expr::Call { callee, args, line } => {
            if let Expr::Ident { name, .. } = &**callee {
                if denylist::is_dangerous_call(name) {
                    out.push(Violation::new(
                        ViolationKind::DangerousMethod,
                        Some(*line),
                        format!("call to denylisted method `{name}`"),
                    ));
                } else if denylist::is_import_call(name) {
                    check_import(name, args, *line, out);
                }
            } else {
                visit_expr(callee, out);
            }
            for arg in args {
                visit_expr(arg, out);
            }
        }
        Expr::Unary { operand, .. } => visit_expr(operand, out),
        Expr::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, out);
            visit_expr(rhs, out);
        }
        Expr::Index { object, index, .. } => {
            visit_expr(object, out);
            visit_expr(index, out);
        }
        Expr::List { items, .. } => {
            for item in items {
                visit_expr(item, out);
            }
        }
        Expr::Map { entries, .. } => {
            for (_, value) in entries {
                visit_expr(value, out);
            }
        }
        Expr::Null { .. }
        | Expr::Bool { .. }
        | Expr::Number { .. }
        | Expr::Str { .. }
        | Expr::Ident { .. } => {}
    }
}

/// Imports are permitted only with a single literal string naming a trusted
/// module. Computed arguments are ambiguous, and ambiguity defaults to
/// rejection.
fn check_import(call: &str, args: &[Expr], line: u32, out: &mut Vec<Violation>) {
    match args {
        [Expr::Str { value, .. }] => {
            if !denylist::is_trusted_import(value) {
                out.push(Violation::new(
                    ViolationKind::DangerousMethod,
                    Some(line),
                    format!("`{call}` of untrusted module \"{value}\""),
                ));
            }
        }
        _ => {
            out.push(Violation::new(
                ViolationKind::DangerousMethod,
                Some(line),
                format!("`{call}` requires a single literal trusted module name"),
            ));
        }
    }
}
