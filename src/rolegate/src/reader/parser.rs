//! Recursive-descent parser producing declaration calls
//!
//! ```text
//! program   = { statement sep }
//! statement = NAME [ args ] [ block ]
//! args      = "(" [ arglist ] ")" | arglist
//! arglist   = value { "," value } [ "," pairs ] | pairs
//! pairs     = pair { "," pair }
//! pair      = LABEL value | value "=>" value
//! block     = "do" program "end" | "{" program "}"
//! value     = SYMBOL | STRING | INT | "nil" | "true" | "false"
//!           | "[" [ value { "," value } ] "]" | "{" [ pairs ] "}"
//!           | "(" value ")" | NAME
//! ```

use super::error::{DslError, DslResult};
use super::lexer::{Tok, Token};

/// Literal value in argument position
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Symbol(String),
    Str(String),
    Int(i64),
    Bool(bool),
    Nil,
    Array(Vec<Expr>),
    Hash(Vec<(Expr, Expr)>),
    /// Bare identifier used as a value
    Ident(String),
}

impl Expr {
    /// Symbol or string contents
    pub(crate) fn as_name(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) | Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Symbol(s) => format!(":{s}"),
            Self::Str(s) => format!("{s:?}"),
            Self::Int(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Nil => "nil".into(),
            Self::Array(_) => "a list".into(),
            Self::Hash(_) => "a mapping".into(),
            Self::Ident(s) => s.clone(),
        }
    }
}

/// One declaration: `name args, key => value do ... end`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    /// Trailing `key => value` pairs
    pub options: Vec<(Expr, Expr)>,
    pub block: Option<Vec<Call>>,
    pub line: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum Closer {
    Eof,
    End,
    Brace,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always appends Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_tok(&self) -> &Tok {
        &self.peek().tok
    }

    fn peek_second(&self) -> &Tok {
        let idx = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[idx].tok
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error_here(&self, message: impl Into<String>) -> DslError {
        let token = self.peek();
        DslError::Syntax {
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    fn unexpected(&self, expected: &str) -> DslError {
        let found = self.peek_tok().describe();
        self.error_here(format!("expected {expected}, found {found}"))
    }

    fn expect(&mut self, tok: Tok, expected: &str) -> DslResult<()> {
        if *self.peek_tok() == tok {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn skip_newlines(&mut self) {
        while *self.peek_tok() == Tok::Newline {
            self.advance();
        }
    }

    fn at_keyword(&self, word: &str) -> bool {
        matches!(self.peek_tok(), Tok::Ident(w) if w == word)
    }

    fn at_closer(&self, closer: Closer) -> bool {
        match closer {
            Closer::Eof => *self.peek_tok() == Tok::Eof,
            Closer::End => self.at_keyword("end"),
            Closer::Brace => *self.peek_tok() == Tok::RBrace,
        }
    }

    fn program(&mut self, closer: Closer) -> DslResult<Vec<Call>> {
        let mut calls = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_closer(closer) {
                return Ok(calls);
            }
            if *self.peek_tok() == Tok::Eof {
                return Err(self.unexpected(match closer {
                    Closer::End => "`end`",
                    _ => "`}`",
                }));
            }
            calls.push(self.statement()?);

            // A statement ends at a separator or the enclosing closer.
            if *self.peek_tok() != Tok::Newline && !self.at_closer(closer) {
                return Err(self.unexpected("end of statement"));
            }
        }
    }

    fn statement(&mut self) -> DslResult<Call> {
        let head = self.advance();
        let name = match head.tok {
            Tok::Ident(name) if name != "end" && name != "do" => name,
            other => {
                return Err(DslError::Syntax {
                    line: head.line,
                    column: head.column,
                    message: format!("expected a declaration, found {}", other.describe()),
                })
            }
        };

        let mut call = Call {
            name,
            args: Vec::new(),
            options: Vec::new(),
            block: None,
            line: head.line,
        };

        let next = self.peek();
        if next.tok == Tok::LParen && !next.spaced {
            self.advance();
            self.skip_newlines();
            if *self.peek_tok() != Tok::RParen {
                self.arglist(&mut call, true)?;
            }
            self.skip_newlines();
            self.expect(Tok::RParen, "`)`")?;
        } else if self.starts_value() && *self.peek_tok() != Tok::LBrace {
            self.arglist(&mut call, false)?;
        }

        if self.at_keyword("do") {
            self.advance();
            let body = self.program(Closer::End)?;
            self.advance();
            call.block = Some(body);
        } else if *self.peek_tok() == Tok::LBrace {
            self.advance();
            let body = self.program(Closer::Brace)?;
            self.advance();
            call.block = Some(body);
        }

        Ok(call)
    }

    fn starts_value(&self) -> bool {
        match self.peek_tok() {
            Tok::Symbol(_)
            | Tok::Str(_)
            | Tok::Int(_)
            | Tok::Label(_)
            | Tok::LBracket
            | Tok::LBrace
            | Tok::LParen => true,
            Tok::Ident(w) => w != "do" && w != "end",
            _ => false,
        }
    }

    fn at_pair(&self) -> bool {
        matches!(self.peek_tok(), Tok::Label(_)) || *self.peek_second() == Tok::FatArrow
    }

    fn arglist(&mut self, call: &mut Call, parenthesized: bool) -> DslResult<()> {
        loop {
            if parenthesized {
                self.skip_newlines();
            }
            if self.at_pair() {
                let pair = self.pair()?;
                call.options.push(pair);
            } else if call.options.is_empty() {
                let value = self.value()?;
                call.args.push(value);
            } else {
                return Err(self.unexpected("`key => value` after options"));
            }

            if *self.peek_tok() != Tok::Comma {
                return Ok(());
            }
            self.advance();
            self.skip_newlines();
        }
    }

    fn pair(&mut self) -> DslResult<(Expr, Expr)> {
        let key = match self.peek_tok().clone() {
            Tok::Label(name) => {
                self.advance();
                Expr::Symbol(name)
            }
            _ => {
                let key = self.value()?;
                self.expect(Tok::FatArrow, "`=>`")?;
                key
            }
        };
        self.skip_newlines();
        let value = self.value()?;
        Ok((key, value))
    }

    fn value(&mut self) -> DslResult<Expr> {
        let token = self.peek().clone();
        match token.tok {
            Tok::Symbol(s) => {
                self.advance();
                Ok(Expr::Symbol(s))
            }
            Tok::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Tok::Int(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            Tok::Ident(word) => {
                self.advance();
                Ok(match word.as_str() {
                    "nil" => Expr::Nil,
                    "true" => Expr::Bool(true),
                    "false" => Expr::Bool(false),
                    _ => Expr::Ident(word),
                })
            }
            Tok::LBracket => {
                self.advance();
                let mut items = Vec::new();
                loop {
                    self.skip_newlines();
                    if *self.peek_tok() == Tok::RBracket {
                        break;
                    }
                    items.push(self.value()?);
                    self.skip_newlines();
                    if *self.peek_tok() != Tok::Comma {
                        break;
                    }
                    self.advance();
                }
                self.skip_newlines();
                self.expect(Tok::RBracket, "`]`")?;
                Ok(Expr::Array(items))
            }
            Tok::LBrace => {
                self.advance();
                let mut pairs = Vec::new();
                loop {
                    self.skip_newlines();
                    if *self.peek_tok() == Tok::RBrace {
                        break;
                    }
                    pairs.push(self.pair()?);
                    self.skip_newlines();
                    if *self.peek_tok() != Tok::Comma {
                        break;
                    }
                    self.advance();
                }
                self.skip_newlines();
                self.expect(Tok::RBrace, "`}`")?;
                Ok(Expr::Hash(pairs))
            }
            Tok::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.value()?;
                self.skip_newlines();
                self.expect(Tok::RParen, "`)`")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("a value")),
        }
    }
}

/// Parse a token stream into top-level declaration calls
pub(crate) fn parse(tokens: Vec<Token>) -> DslResult<Vec<Call>> {
    let mut parser = Parser { tokens, pos: 0 };
    parser.program(Closer::Eof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::lexer::tokenize;

    fn parse_str(input: &str) -> DslResult<Vec<Call>> {
        parse(tokenize(input)?)
    }

    fn sym(s: &str) -> Expr {
        Expr::Symbol(s.to_string())
    }

    #[test]
    fn test_call_with_args_and_options() {
        let calls = parse_str("updatable_by :@manager, :of_associated => {:server_item => :owner}").unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "updatable_by");
        assert_eq!(calls[0].args, vec![sym("@manager")]);
        assert_eq!(
            calls[0].options,
            vec![(
                sym("of_associated"),
                Expr::Hash(vec![(sym("server_item"), sym("owner"))])
            )]
        );
    }

    #[test]
    fn test_parenthesized_call_spanning_lines() {
        let calls = parse_str("creatable_by(\n  [:@@manager,\n   :$root],\n  only: [:name]\n)").unwrap();
        assert_eq!(calls[0].args, vec![Expr::Array(vec![sym("@@manager"), sym("$root")])]);
        assert_eq!(calls[0].options.len(), 1);
    }

    #[test]
    fn test_nested_blocks() {
        let src = "authorization do\n  secure :servers do\n    creatable_by :all\n  end\nend\n";
        let calls = parse_str(src).unwrap();
        let outer = calls[0].block.as_ref().unwrap();
        assert_eq!(outer[0].name, "secure");
        let inner = outer[0].block.as_ref().unwrap();
        assert_eq!(inner[0].name, "creatable_by");
        assert_eq!(inner[0].line, 3);
    }

    #[test]
    fn test_brace_block() {
        let calls = parse_str("secure :servers { creatable_by :all }").unwrap();
        assert_eq!(calls[0].block.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_literals() {
        let calls = parse_str("foo nil, true, 3, 'x', bar").unwrap();
        assert_eq!(
            calls[0].args,
            vec![
                Expr::Nil,
                Expr::Bool(true),
                Expr::Int(3),
                Expr::Str("x".into()),
                Expr::Ident("bar".into())
            ]
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse_str("secure :servers do"), Err(DslError::Syntax { .. })));
        assert!(matches!(parse_str("foo [:a, :b"), Err(DslError::Syntax { .. })));
        assert!(matches!(parse_str("foo :a :b"), Err(DslError::Syntax { .. })));
        assert!(matches!(parse_str("end"), Err(DslError::Syntax { .. })));
        assert!(matches!(parse_str("foo a: :b, :c"), Err(DslError::Syntax { .. })));
    }
}
