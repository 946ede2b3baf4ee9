//! Hand-written lexer for one line of BASIC.
//!
//! At this stage we *only* break the raw line into `Token`s tagged with the
//! lexical state that produced them. Keywords are not recognised here –
//! `PRINT`, `MOD` and `X1` all come out as `Literal`; the elaborator
//! reclassifies them afterwards.
//
//  Lexical items (informal):
//
//      Literal  ::= anything that is not one of the classes below
//      Number   ::= [0-9_]+ ( [.xXbB] [0-9A-Fa-f_]+ )?
//      Quoted   ::= '"' .*? '"'          (no escapes)
//      Operator ::= one of  ! ~ # < = > * + - / ^ : $ . @ \ % | `
//      Paren    ::= ( ) [ ] { }
//      Sep      ::= , ;
//
//  Every operator character is its own token; `<=`, `>>=` and friends are
//  fused later.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{ErrorKind, Result, syntax};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Literal,
    Number,
    Quoted,
    Operator,
    Paren,
    Separator,
    Boolean,
    /// `:` between statements; produced by the elaborator.
    StatementSep,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub state: TokenState,
}

impl Token {
    pub fn new(text: impl Into<String>, state: TokenState) -> Self {
        Self { text: text.into(), state }
    }

    pub fn is(&self, text: &str) -> bool {
        self.state != TokenState::Quoted && self.text.eq_ignore_ascii_case(text)
    }

    pub fn is_open(&self) -> bool {
        self.state == TokenState::Paren && matches!(self.text.as_str(), "(" | "[" | "{")
    }

    pub fn is_close(&self) -> bool {
        self.state == TokenState::Paren && matches!(self.text.as_str(), ")" | "]" | "}")
    }
}

/// Internal scanner mode; finer grained than the public `TokenState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Lit,
    Num,
    NumSep,
    Num2,
    Op,
    Quote,
    QuoteEnd,
    Paren,
    Sep,
    Limbo,
}

impl Mode {
    fn state(self) -> TokenState {
        match self {
            Mode::Num | Mode::NumSep | Mode::Num2 => TokenState::Number,
            Mode::Op => TokenState::Operator,
            Mode::Quote | Mode::QuoteEnd => TokenState::Quoted,
            Mode::Paren => TokenState::Paren,
            Mode::Sep => TokenState::Separator,
            Mode::Lit | Mode::Limbo => TokenState::Literal,
        }
    }
}

fn is_num(c: char) -> bool {
    c.is_ascii_digit() || c == '_'
}

fn is_num2(c: char) -> bool {
    c.is_ascii_hexdigit() || c == '_'
}

fn is_num_sep(c: char) -> bool {
    matches!(c, '.' | 'x' | 'X' | 'b' | 'B')
}

pub fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '!' | '~' | '#' | '<' | '=' | '>' | '*' | '+' | '-' | '/' | '^' | ':' | '$' | '.' | '@' | '\\' | '%' | '|' | '`'
    )
}

fn is_paren(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}')
}

fn is_sep(c: char) -> bool {
    matches!(c, ',' | ';')
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    mode: Mode,
    buf: String,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, line: usize) -> Self {
        Self {
            chars: src.chars().peekable(),
            line,
            mode: Mode::Limbo,
            buf: String::new(),
            tokens: Vec::new(),
        }
    }

    fn flush(&mut self) {
        let text = std::mem::take(&mut self.buf);
        self.tokens.push(Token::new(text, self.mode.state()));
    }

    /// Starts a new token with `c`, choosing the mode from its class.
    /// Whatever was pending must already be flushed or discarded.
    fn begin(&mut self, c: char) {
        self.buf.clear();
        self.mode = if c == '"' {
            Mode::Quote
        } else if is_space(c) {
            Mode::Limbo
        } else if is_paren(c) {
            Mode::Paren
        } else if is_sep(c) {
            Mode::Sep
        } else if is_num(c) {
            Mode::Num
        } else if is_operator_char(c) {
            Mode::Op
        } else {
            Mode::Lit
        };
        if !matches!(self.mode, Mode::Quote | Mode::Limbo) {
            self.buf.push(c);
        }
    }

    fn step(&mut self, c: char) -> Result<()> {
        match self.mode {
            Mode::Lit => {
                if c == '"' || is_space(c) || is_paren(c) || is_sep(c) || is_operator_char(c) {
                    self.flush();
                    self.begin(c);
                } else {
                    self.buf.push(c);
                }
            }
            Mode::Num => {
                if is_num(c) {
                    self.buf.push(c);
                } else if is_num_sep(c) {
                    self.buf.push(c);
                    self.mode = Mode::NumSep;
                } else {
                    self.flush();
                    self.begin(c);
                }
            }
            Mode::NumSep => {
                if is_num2(c) {
                    self.buf.push(c);
                    self.mode = Mode::Num2;
                } else {
                    return Err(crate::error::Error::at(
                        ErrorKind::NumberFormat(format!("{}{c}", self.buf)),
                        self.line,
                    ));
                }
            }
            Mode::Num2 => {
                if is_num2(c) {
                    self.buf.push(c);
                } else {
                    self.flush();
                    self.begin(c);
                }
            }
            Mode::Op => {
                self.flush();
                self.begin(c);
            }
            Mode::Quote => {
                if c == '"' {
                    self.flush();
                    self.mode = Mode::QuoteEnd;
                } else {
                    self.buf.push(c);
                }
            }
            Mode::QuoteEnd | Mode::Limbo => {
                if !is_space(c) || self.mode == Mode::QuoteEnd {
                    self.begin(c);
                }
            }
            Mode::Paren | Mode::Sep => {
                self.flush();
                self.begin(c);
            }
        }
        Ok(())
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        while let Some(c) = self.chars.next() {
            self.step(c)?;
        }

        match self.mode {
            Mode::Quote => {
                return Err(syntax("unterminated string").or_line(self.line));
            }
            Mode::QuoteEnd | Mode::Limbo => {}
            _ if !self.buf.is_empty() => self.flush(),
            _ => {}
        }
        Ok(self.tokens)
    }
}

/// Tokenizes a single source line.
pub fn tokenize(src: &str, line: usize) -> Result<Vec<Token>> {
    Lexer::new(src, line).tokenize()
}

#[cfg(test)]
mod tests {
    use super::TokenState::*;
    use super::*;

    fn lex(src: &str) -> Vec<(String, TokenState)> {
        tokenize(src, 10)
            .unwrap()
            .into_iter()
            .map(|t| (t.text, t.state))
            .collect()
    }

    fn toks(expected: &[(&str, TokenState)]) -> Vec<(String, TokenState)> {
        expected.iter().map(|&(t, s)| (t.to_string(), s)).collect()
    }

    #[test]
    fn test_lexer_lines() {
        let test_cases = vec![
            ("PRINT 1", toks(&[("PRINT", Literal), ("1", Number)])),
            ("7 MOD 2", toks(&[("7", Number), ("MOD", Literal), ("2", Number)])),
            ("(1)", toks(&[("(", Paren), ("1", Number), (")", Paren)])),
            (
                "A1=A1+0.5",
                toks(&[("A1", Literal), ("=", Operator), ("A1", Literal), ("+", Operator), ("0.5", Number)]),
            ),
            (
                "PRINT \"Hello, World\";X",
                toks(&[("PRINT", Literal), ("Hello, World", Quoted), (";", Separator), ("X", Literal)]),
            ),
            (
                "IF A<=B THEN 10",
                toks(&[
                    ("IF", Literal),
                    ("A", Literal),
                    ("<", Operator),
                    ("=", Operator),
                    ("B", Literal),
                    ("THEN", Literal),
                    ("10", Number),
                ]),
            ),
            (
                "  F(X, 0x1F)",
                toks(&[
                    ("F", Literal),
                    ("(", Paren),
                    ("X", Literal),
                    (",", Separator),
                    ("0x1F", Number),
                    (")", Paren),
                ]),
            ),
            (
                "{1,2}",
                toks(&[("{", Paren), ("1", Number), (",", Separator), ("2", Number), ("}", Paren)]),
            ),
            ("PRINT \"\"", toks(&[("PRINT", Literal), ("", Quoted)])),
            ("-3", toks(&[("-", Operator), ("3", Number)])),
        ];

        for (src, expected) in test_cases {
            println!("Testing: {src}");
            assert_eq!(lex(src), expected);
        }
    }

    #[test]
    fn quoted_text_keeps_case_and_spaces() {
        assert_eq!(lex("\"a  b\""), toks(&[("a  b", Quoted)]));
    }

    #[test]
    fn bad_number_separator() {
        let err = tokenize("PRINT 1.Z", 40).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NumberFormat(_)));
        assert_eq!(err.line, Some(40));
    }

    #[test]
    fn unterminated_string() {
        let err = tokenize("PRINT \"oops", 5).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Syntax(_)));
    }

    #[test]
    fn relexing_joined_tokens_is_stable() {
        let lines = [
            "FOR I = 1 TO 10 STEP 2",
            "PRINT \"X=\";X, Y",
            "F = [A, B] ~> A * B + 1",
            "IF A <> 0 THEN GOSUB 100 ELSE PRINT {1,2,3}",
        ];

        for line in lines {
            let first = tokenize(line, 1).unwrap();
            let unlexed: Vec<String> = first
                .iter()
                .map(|t| match t.state {
                    Quoted => format!("\"{}\"", t.text),
                    _ => t.text.clone(),
                })
                .collect();
            let second = tokenize(&unlexed.join(" "), 1).unwrap();
            assert_eq!(first, second, "{line}");
        }
    }
}
