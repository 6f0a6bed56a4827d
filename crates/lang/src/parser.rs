//! Recursive-descent parser with precedence climbing.

use crate::ast::{BinaryOp, Expr, Program, Stmt, UnaryOp};
use crate::token::{Token, TokenKind};
use crate::ParseError;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Program { stmts })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Let => self.parse_let(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semi, "after expression statement")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_let(&mut self) -> Result<Stmt, ParseError> {
        let line = self.advance().line; // `let`
        let name = self.expect_ident("after `let`")?;
        self.expect(TokenKind::Assign, "after `let` binding name")?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semi, "after `let` statement")?;
        Ok(Stmt::Let { name, value, line })
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let line = self.advance().line; // `if`
        let cond = self.parse_expr()?;
        let then_body = self.parse_block()?;
        let else_body = if self.check(&TokenKind::Else) {
            self.advance();
            if self.check(&TokenKind::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
            line,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let line = self.advance().line; // `for`
        let var = self.expect_ident("after `for`")?;
        self.expect(TokenKind::In, "after `for` loop variable")?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::For {
            var,
            iterable,
            body,
            line,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let line = self.advance().line; // `return`
        let value = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semi, "after `return` statement")?;
        Ok(Stmt::Return { value, line })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LBrace, "to open a block")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error_here("unexpected end of input inside a block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.advance(); // `}`
        Ok(stmts)
    }

    // ------------------------------------------------------------------
    // Expressions, loosest binding first
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.check(&TokenKind::OrOr) {
            let line = self.advance().line;
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.check(&TokenKind::AndAnd) {
            let line = self.advance().line;
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::BangEq => BinaryOp::Ne,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = self.parse_factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            let line = self.advance().line;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let line = self.advance().line;
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                line,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    let line = self.advance().line;
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        line,
                    };
                }
                TokenKind::Dot => {
                    let line = self.advance().line;
                    let name = self.expect_member_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        name,
                        line,
                    };
                }
                TokenKind::LBracket => {
                    let line = self.advance().line;
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "to close an index expression")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        line,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            self.expect(TokenKind::RParen, "to close an argument list")?;
            return Ok(args);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let line = token.line;
        match token.kind {
            TokenKind::Null => Ok(Expr::Null { line }),
            TokenKind::True => Ok(Expr::Bool { value: true, line }),
            TokenKind::False => Ok(Expr::Bool { value: false, line }),
            TokenKind::Number(value) => Ok(Expr::Number { value, line }),
            TokenKind::Str(value) => Ok(Expr::Str { value, line }),
            TokenKind::Backtick(command) => Ok(Expr::Backtick { command, line }),
            TokenKind::Ident(name) => Ok(Expr::Ident { name, line }),
            TokenKind::Const(name) => Ok(Expr::Const { name, line }),
            TokenKind::Global(name) => Ok(Expr::Global { name, line }),
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "to close a grouped expression")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_list(line),
            TokenKind::LBrace => self.parse_map(line),
            other => Err(ParseError::new(
                line,
                format!("expected an expression, found {}", other.describe()),
            )),
        }
    }

    fn parse_list(&mut self, line: u32) -> Result<Expr, ParseError> {
        let mut items = Vec::new();
        if self.check(&TokenKind::RBracket) {
            self.advance();
            return Ok(Expr::List { items, line });
        }
        loop {
            items.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                if self.check(&TokenKind::RBracket) {
                    break; // trailing comma
                }
                continue;
            }
            break;
        }
        self.expect(TokenKind::RBracket, "to close a list literal")?;
        Ok(Expr::List { items, line })
    }

    fn parse_map(&mut self, line: u32) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        if self.check(&TokenKind::RBrace) {
            self.advance();
            return Ok(Expr::Map { entries, line });
        }
        loop {
            let key = match self.advance().kind {
                TokenKind::Ident(name) => name,
                TokenKind::Str(value) => value,
                other => {
                    return Err(ParseError::new(
                        self.previous_line(),
                        format!("expected a map key, found {}", other.describe()),
                    ));
                }
            };
            self.expect(TokenKind::Colon, "after a map key")?;
            entries.push((key, self.parse_expr()?));
            if self.check(&TokenKind::Comma) {
                self.advance();
                if self.check(&TokenKind::RBrace) {
                    break; // trailing comma
                }
                continue;
            }
            break;
        }
        self.expect(TokenKind::RBrace, "to close a map literal")?;
        Ok(Expr::Map { entries, line })
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn peek_kind(&self) -> &TokenKind {
        // The token vector always ends with Eof; pos never passes it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn previous_line(&self) -> u32 {
        self.tokens[self.pos.saturating_sub(1)].line
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!(
                "expected {} {context}, found {}",
                kind.describe(),
                self.peek_kind().describe()
            )))
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<String, ParseError> {
        match self.peek_kind() {
            TokenKind::Ident(_) => {
                let token = self.advance();
                match token.kind {
                    TokenKind::Ident(name) => Ok(name),
                    _ => unreachable!("checked above"),
                }
            }
            other => Err(self.error_here(format!(
                "expected an identifier {context}, found {}",
                other.describe()
            ))),
        }
    }

    /// Member names are plain identifiers; keywords are not valid members.
    fn expect_member_name(&mut self) -> Result<String, ParseError> {
        self.expect_ident("after `.`")
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.tokens[self.pos.min(self.tokens.len() - 1)].line, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn parses_let_and_expression_statement() {
        let program = parse("let x = 1 + 2 * 3;\nnotify(x);").unwrap();
        assert_eq!(program.stmts.len(), 2);
        let Stmt::Let { name, value, .. } = &program.stmts[0] else {
            panic!("expected let");
        };
        assert_eq!(name, "x");
        // 1 + (2 * 3): multiplication binds tighter
        let Expr::Binary { op: BinaryOp::Add, rhs, .. } = value else {
            panic!("expected addition at the top");
        };
        assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parses_if_else_chain() {
        let program = parse("if a > 1 { x(); } else if b { y(); } else { z(); }").unwrap();
        let Stmt::If { else_body: Some(else_body), .. } = &program.stmts[0] else {
            panic!("expected if with else");
        };
        assert!(matches!(else_body[0], Stmt::If { .. }));
    }

    #[test]
    fn parses_for_over_list_literal() {
        let program = parse("for item in [1, 2, 3] { emit(item); }").unwrap();
        let Stmt::For { var, iterable, body, .. } = &program.stmts[0] else {
            panic!("expected for");
        };
        assert_eq!(var, "item");
        assert!(matches!(iterable, Expr::List { items, .. } if items.len() == 3));
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn parses_namespace_member_call() {
        let program = parse(r#"Http.get("https://example.com");"#).unwrap();
        let Stmt::Expr(Expr::Call { callee, args, .. }) = &program.stmts[0] else {
            panic!("expected call");
        };
        let Expr::Member { object, name, .. } = &**callee else {
            panic!("expected member callee");
        };
        assert!(matches!(**object, Expr::Const { ref name, .. } if name == "Http"));
        assert_eq!(name, "get");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn parses_map_literal_and_index() {
        let program = parse(r#"let m = { url: "x", retries: 2 }; m["url"];"#).unwrap();
        assert_eq!(program.stmts.len(), 2);
        let Stmt::Let { value: Expr::Map { entries, .. }, .. } = &program.stmts[0] else {
            panic!("expected map literal");
        };
        assert_eq!(entries[0].0, "url");
        assert!(matches!(program.stmts[1], Stmt::Expr(Expr::Index { .. })));
    }

    #[test]
    fn missing_semicolon_reports_line() {
        let err = parse("let x = 1;\nlet y = 2").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("`;`"));
    }

    #[test]
    fn empty_source_parses_to_empty_program() {
        assert!(parse("").unwrap().stmts.is_empty());
        assert!(parse("  # comment only\n").unwrap().stmts.is_empty());
    }

    #[test]
    fn return_without_value() {
        let program = parse("return;").unwrap();
        assert!(matches!(program.stmts[0], Stmt::Return { value: None, .. }));
    }
}
