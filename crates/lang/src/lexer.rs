//! Line-tracking lexer for the agent-script DSL.

use crate::token::{Token, TokenKind};
use crate::ParseError;

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let line = self.line;
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, line));
                return Ok(tokens);
            };
            let kind = match c {
                '"' => self.lex_string()?,
                '`' => self.lex_backtick()?,
                '$' => self.lex_global()?,
                c if c.is_ascii_digit() => self.lex_number()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(),
                _ => self.lex_operator()?,
            };
            tokens.push(Token::new(kind, line));
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Skip whitespace and `#` line comments.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind, ParseError> {
        let start_line = self.line;
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(ParseError::new(start_line, "unterminated string literal"));
                }
                Some('"') => return Ok(TokenKind::Str(out)),
                Some('\\') => match self.advance() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(other) => {
                        return Err(ParseError::new(
                            self.line,
                            format!("unknown escape `\\{other}` in string literal"),
                        ));
                    }
                    None => {
                        return Err(ParseError::new(start_line, "unterminated string literal"));
                    }
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn lex_backtick(&mut self) -> Result<TokenKind, ParseError> {
        let start_line = self.line;
        self.advance(); // opening backtick
        let mut out = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(ParseError::new(start_line, "unterminated backtick literal"));
                }
                Some('`') => return Ok(TokenKind::Backtick(out)),
                Some(c) => out.push(c),
            }
        }
    }

    fn lex_global(&mut self) -> Result<TokenKind, ParseError> {
        let line = self.line;
        self.advance(); // `$`
        let mut name = String::from("$");
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if name.len() == 1 {
            return Err(ParseError::new(line, "`$` must be followed by a global name"));
        }
        Ok(TokenKind::Global(name))
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let line = self.line;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| ParseError::new(line, format!("invalid number literal `{text}`")))
    }

    fn lex_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match word.as_str() {
            "let" => TokenKind::Let,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => {
                if word.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                    TokenKind::Const(word)
                } else {
                    TokenKind::Ident(word)
                }
            }
        }
    }

    fn lex_operator(&mut self) -> Result<TokenKind, ParseError> {
        let line = self.line;
        let c = self.advance().ok_or_else(|| ParseError::new(line, "unexpected end of input"))?;
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::AndAnd
                } else {
                    return Err(ParseError::new(line, "single `&` is not an operator"));
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    TokenKind::OrOr
                } else {
                    return Err(ParseError::new(line, "single `|` is not an operator"));
                }
            }
            other => {
                return Err(ParseError::new(line, format!("unexpected character `{other}`")));
            }
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_statement_tokens() {
        let toks = kinds("let x = 1.5;");
        assert_eq!(
            toks,
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".into()),
                TokenKind::Assign,
                TokenKind::Number(1.5),
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_idents_consts_and_globals() {
        let toks = kinds("fetch File $LOAD_PATH");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("fetch".into()),
                TokenKind::Const("File".into()),
                TokenKind::Global("$LOAD_PATH".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_lines_across_comments_and_newlines() {
        let tokens = Lexer::new("# header\nlet x = 1;\nlet y = 2;").tokenize().unwrap();
        assert_eq!(tokens[0].line, 2); // first `let`
        let second_let = tokens.iter().filter(|t| t.kind == TokenKind::Let).nth(1).unwrap();
        assert_eq!(second_let.line, 3);
    }

    #[test]
    fn lexes_string_escapes() {
        let toks = kinds(r#""a\nb\"c""#);
        assert_eq!(toks[0], TokenKind::Str("a\nb\"c".into()));
    }

    #[test]
    fn lexes_backtick_literal() {
        let toks = kinds("`rm -rf /`");
        assert_eq!(toks[0], TokenKind::Backtick("rm -rf /".into()));
    }

    #[test]
    fn unterminated_string_reports_start_line() {
        let err = Lexer::new("\n\"abc").tokenize().unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = Lexer::new("let x = 1 @").tokenize().unwrap_err();
        assert!(err.message.contains('@'));
    }
}
