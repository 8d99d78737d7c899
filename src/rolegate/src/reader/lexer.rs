//! Tokenizer for policy text

use super::error::{DslError, DslResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    /// `:name`, `:$root`, `:@@manager`, `:"quoted"`
    Symbol(String),
    /// `name` (also keywords: `do`, `end`, `nil`, `true`, `false`)
    Ident(String),
    /// `name:` hash key shorthand
    Label(String),
    Str(String),
    Int(i64),
    FatArrow,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    /// Statement separator (newline or `;`)
    Newline,
    Eof,
}

impl Tok {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Symbol(s) => format!("symbol `:{s}`"),
            Self::Ident(s) => format!("`{s}`"),
            Self::Label(s) => format!("`{s}:`"),
            Self::Str(s) => format!("string {s:?}"),
            Self::Int(n) => format!("integer {n}"),
            Self::FatArrow => "`=>`".into(),
            Self::Comma => "`,`".into(),
            Self::LParen => "`(`".into(),
            Self::RParen => "`)`".into(),
            Self::LBracket => "`[`".into(),
            Self::RBracket => "`]`".into(),
            Self::LBrace => "`{`".into(),
            Self::RBrace => "`}`".into(),
            Self::Newline => "end of line".into(),
            Self::Eof => "end of input".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub tok: Tok,
    pub line: usize,
    pub column: usize,
    /// Whitespace separates this token from the previous one
    pub spaced: bool,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_symbol_char(c: char) -> bool {
    is_ident_char(c) || c == '$' || c == '@'
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> DslError {
        DslError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek_at(0) {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn string(&mut self, quote: char, line: usize, column: usize) -> DslResult<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(line, column, "unterminated string literal")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(self.error(line, column, "unterminated string literal")),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

/// Split policy text into tokens. Consecutive separators collapse into one
/// `Newline`; the stream always ends with `Eof`.
pub(crate) fn tokenize(input: &str) -> DslResult<Vec<Token>> {
    let mut lx = Lexer {
        chars: input.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();
    let mut spaced = true;

    while let Some(c) = lx.peek_at(0) {
        let (line, column) = (lx.line, lx.column);

        let tok = match c {
            ' ' | '\t' | '\r' => {
                lx.bump();
                spaced = true;
                continue;
            }
            '\\' if lx.peek_at(1) == Some('\n') => {
                lx.bump();
                lx.bump();
                spaced = true;
                continue;
            }
            '#' => {
                lx.take_while(|c| c != '\n');
                continue;
            }
            '\n' | ';' => {
                lx.bump();
                spaced = true;
                if matches!(tokens.last(), Some(t) if t.tok == Tok::Newline) || tokens.is_empty() {
                    continue;
                }
                Tok::Newline
            }
            '=' if lx.peek_at(1) == Some('>') => {
                lx.bump();
                lx.bump();
                Tok::FatArrow
            }
            ',' => {
                lx.bump();
                Tok::Comma
            }
            '(' => {
                lx.bump();
                Tok::LParen
            }
            ')' => {
                lx.bump();
                Tok::RParen
            }
            '[' => {
                lx.bump();
                Tok::LBracket
            }
            ']' => {
                lx.bump();
                Tok::RBracket
            }
            '{' => {
                lx.bump();
                Tok::LBrace
            }
            '}' => {
                lx.bump();
                Tok::RBrace
            }
            '"' | '\'' => {
                lx.bump();
                Tok::Str(lx.string(c, line, column)?)
            }
            ':' => match lx.peek_at(1) {
                Some(q @ ('"' | '\'')) => {
                    lx.bump();
                    lx.bump();
                    Tok::Symbol(lx.string(q, line, column)?)
                }
                Some(n) if is_ident_start(n) || n == '$' || n == '@' => {
                    lx.bump();
                    Tok::Symbol(lx.take_while(is_symbol_char))
                }
                _ => return Err(lx.error(line, column, "unexpected `:`")),
            },
            c if c.is_ascii_digit() || (c == '-' && lx.peek_at(1).is_some_and(|n| n.is_ascii_digit())) => {
                let mut digits = String::new();
                if c == '-' {
                    lx.bump();
                    digits.push('-');
                }
                digits.push_str(&lx.take_while(|c| c.is_ascii_digit() || c == '_'));
                let digits = digits.replace('_', "");
                let n = digits
                    .parse::<i64>()
                    .map_err(|_| lx.error(line, column, format!("invalid integer `{digits}`")))?;
                Tok::Int(n)
            }
            c if is_ident_start(c) => {
                let mut word = lx.take_while(is_ident_char);
                if let Some(suffix @ ('?' | '!')) = lx.peek_at(0) {
                    lx.bump();
                    word.push(suffix);
                }
                // `key: value` but not `Type::Const`
                if lx.peek_at(0) == Some(':') && lx.peek_at(1) != Some(':') {
                    lx.bump();
                    Tok::Label(word)
                } else {
                    Tok::Ident(word)
                }
            }
            other => {
                return Err(lx.error(line, column, format!("unexpected character `{other}`")));
            }
        };

        tokens.push(Token {
            tok,
            line,
            column,
            spaced,
        });
        spaced = false;
    }

    tokens.push(Token {
        tok: Tok::Eof,
        line: lx.line,
        column: lx.column,
        spaced: true,
    });
    Ok(tokens)
}
