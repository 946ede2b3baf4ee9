//! Post-pass over the raw token stream.
//!
//! Two passes:
//!   1. reclassify – numbers that are not numbers become literals, operator
//!      keywords (`MOD`, `AND`, …) become operators, `TRUE`/`FALSE` become
//!      booleans and `0b…` literals are rewritten in decimal;
//!   2. fuse – adjacent operator tokens that spell a known 3- or 2-character
//!      operator are merged, leftmost first; a lone `:` becomes a statement
//!      separator.

use super::ast::is_operator;
use super::lexer::{Token, TokenState};

/// Parses the numeric literal grammar: decimal with `_` separators and an
/// optional fraction, `0x` hex or `0b` binary.
pub fn parse_number(text: &str) -> Option<f64> {
    let digits: String = text.chars().filter(|&c| c != '_').collect();
    if digits.is_empty() || !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        return u64::from_str_radix(bin, 2).ok().map(|n| n as f64);
    }

    // only digits, one dot and an exponent may reach the float parser
    let mut seen_dot = false;
    for c in lower.chars() {
        match c {
            '0'..='9' | 'e' | '+' | '-' => {}
            '.' if !seen_dot => seen_dot = true,
            _ => return None,
        }
    }
    lower.parse().ok()
}

fn reclassify(token: &mut Token) {
    match token.state {
        TokenState::Number => match parse_number(&token.text) {
            None => token.state = TokenState::Literal,
            Some(n) if token.text.len() > 1 && token.text[1..].starts_with(['b', 'B']) => {
                token.text = format!("{n}");
            }
            Some(_) => {}
        },
        TokenState::Literal => {
            let upper = token.text.to_ascii_uppercase();
            if upper == "TRUE" || upper == "FALSE" {
                token.state = TokenState::Boolean;
                token.text = upper;
            } else if is_operator(&upper) {
                token.state = TokenState::Operator;
                token.text = upper;
            }
        }
        _ => {}
    }
}

fn fused(tokens: &[Token], k: usize, width: usize) -> Option<String> {
    let run = tokens.get(k..k + width)?;
    if !run.iter().all(|t| t.state == TokenState::Operator) {
        return None;
    }
    let text: String = run.iter().map(|t| t.text.as_str()).collect();
    // keyword operators are whole tokens already; only symbols fuse
    (text.chars().all(|c| !c.is_ascii_alphabetic()) && is_operator(&text)).then_some(text)
}

pub fn elaborate(mut tokens: Vec<Token>) -> Vec<Token> {
    tokens.iter_mut().for_each(reclassify);

    let mut out = Vec::with_capacity(tokens.len());
    let mut k = 0;
    while k < tokens.len() {
        if let Some(text) = fused(&tokens, k, 3) {
            out.push(Token::new(text, TokenState::Operator));
            k += 3;
        } else if let Some(text) = fused(&tokens, k, 2) {
            out.push(Token::new(text, TokenState::Operator));
            k += 2;
        } else {
            let mut token = tokens[k].clone();
            if token.state == TokenState::Operator && token.text == ":" {
                token.state = TokenState::StatementSep;
            }
            out.push(token);
            k += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::TokenState::*;
    use super::*;
    use crate::processor::lexer::tokenize;

    fn run(src: &str) -> Vec<(String, TokenState)> {
        elaborate(tokenize(src, 1).unwrap())
            .into_iter()
            .map(|t| (t.text, t.state))
            .collect()
    }

    #[test]
    fn test_number_grammar() {
        let test_cases = vec![
            ("10", Some(10.0)),
            ("1_000", Some(1000.0)),
            ("0.5", Some(0.5)),
            ("1.", Some(1.0)),
            ("1.5e3", Some(1500.0)),
            ("0x1F", Some(31.0)),
            ("0b101", Some(5.0)),
            ("_", None),
            ("1.F", None),
        ];

        for (text, expected) in test_cases {
            assert_eq!(parse_number(text), expected, "{text}");
        }
    }

    #[test]
    fn test_fusion_and_reclassify() {
        let test_cases = vec![
            ("A<=B", vec![("A", Literal), ("<=", Operator), ("B", Literal)]),
            ("M >>= F", vec![("M", Literal), (">>=", Operator), ("F", Literal)]),
            ("X=-1", vec![("X", Literal), ("=", Operator), ("-", Operator), ("1", Number)]),
            ("A==-1", vec![("A", Literal), ("==", Operator), ("-", Operator), ("1", Number)]),
            ("7 mod 2", vec![("7", Number), ("MOD", Operator), ("2", Number)]),
            ("true", vec![("TRUE", Boolean)]),
            ("0b11", vec![("3", Number)]),
            ("PRINT 1:PRINT 2", vec![
                ("PRINT", Literal),
                ("1", Number),
                (":", StatementSep),
                ("PRINT", Literal),
                ("2", Number),
            ]),
            ("F ~> X", vec![("F", Literal), ("~>", Operator), ("X", Literal)]),
        ];

        for (src, expected) in test_cases {
            println!("Testing: {src}");
            let expected: Vec<(String, TokenState)> =
                expected.into_iter().map(|(t, s)| (t.to_string(), s)).collect();
            assert_eq!(run(src), expected);
        }
    }
}
