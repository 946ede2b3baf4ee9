//! The language core.
//!
//! Source text flows lexer → elaborator → parser → pruning once per line,
//! yielding one tree per statement; `vm` walks those trees.
pub mod ast;
pub mod builtins;
pub mod elaborate;
pub mod lexer;
pub mod prune;
pub mod script_parser;
pub mod value;
pub mod vm;

pub use ast::Node;
pub use value::Value;
pub use vm::{Interpreter, Pc};

use crate::error::Result;

fn is_comment(src: &str) -> bool {
    src.trim_start()
        .get(..3)
        .is_some_and(|head| head.eq_ignore_ascii_case("REM"))
}

/// Runs every front-end pass over one source line.
pub fn parse_statements(line: usize, src: &str) -> Result<Vec<Node>> {
    // comment text is free-form and never reaches the lexer
    if is_comment(src) {
        return Ok(Vec::new());
    }
    let tokens = elaborate::elaborate(lexer::tokenize(src, line)?);
    script_parser::parse_line(line, &tokens)?
        .into_iter()
        .map(|stmt| prune::prune(line, stmt))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_skip_the_lexer() {
        let test_cases = vec!["REM version 1.x", "  rem 0x", "REMARK"];

        for src in test_cases {
            assert_eq!(parse_statements(1, src).unwrap(), Vec::<Node>::new(), "{src}");
        }
    }

    #[test]
    fn one_tree_per_statement() {
        let stmts = parse_statements(1, "A = 1 : B = 2 : PRINT A + B").unwrap();
        assert_eq!(stmts.len(), 3);
    }
}
