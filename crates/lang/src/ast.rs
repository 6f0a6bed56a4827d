//! Line-tagged AST. Every node carries the line of its introducing token so
//! the validator can attribute findings to source lines.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null { line: u32 },
    Bool { value: bool, line: u32 },
    Number { value: f64, line: u32 },
    Str { value: String, line: u32 },
    /// Inline shell-execution literal; always rejected by the validator.
    Backtick { command: String, line: u32 },
    Ident { name: String, line: u32 },
    Const { name: String, line: u32 },
    Global { name: String, line: u32 },
    Unary { op: UnaryOp, operand: Box<Expr>, line: u32 },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>, line: u32 },
    Call { callee: Box<Expr>, args: Vec<Expr>, line: u32 },
    Member { object: Box<Expr>, name: String, line: u32 },
    Index { object: Box<Expr>, index: Box<Expr>, line: u32 },
    List { items: Vec<Expr>, line: u32 },
    Map { entries: Vec<(String, Expr)>, line: u32 },
}

impl Expr {
    pub fn line(&self) -> u32 {
        match self {
            Expr::Null { line }
            | Expr::Bool { line, .. }
            | Expr::Number { line, .. }
            | Expr::Str { line, .. }
            | Expr::Backtick { line, .. }
            | Expr::Ident { line, .. }
            | Expr::Const { line, .. }
            | Expr::Global { line, .. }
            | Expr::Unary { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Call { line, .. }
            | Expr::Member { line, .. }
            | Expr::Index { line, .. }
            | Expr::List { line, .. }
            | Expr::Map { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        value: Expr,
        line: u32,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        line: u32,
    },
    For {
        var: String,
        iterable: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
    Return {
        value: Option<Expr>,
        line: u32,
    },
    Expr(Expr),
}

/// A parsed script: a flat statement list. The script's result is the value
/// of its last expression statement, or an explicit `return`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}
