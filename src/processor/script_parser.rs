//! Parser that turns the elaborated token stream of one line into one AST
//! per `:`-separated statement.
//!
//! Statements try, in order: `IF … THEN … [ELSE …]`, `DEFUN NAME(…) = …`,
//! `ON test GOTO|GOSUB a, b, …`, a fully parenthesized statement, and then
//! the expression parser.
//!
//! Expressions are split at the loosest operator found at bracket depth 0
//! (see `ast::precedence`). On a tie the *last* occurrence wins, except for
//! right-associative operators where the *first* one is kept.

use super::ast::{JumpKind, Node, is_right_assoc, precedence, unary_builtin};
use super::builtins;
use super::elaborate::parse_number;
use super::lexer::{Token, TokenState};
use crate::error::{Error, ErrorKind, Result};

/// Words that never stand alone as a value.
const STRUCTURAL: &[&str] = &["IF", "THEN", "ELSE", "DEFUN", "ON"];

struct Parser {
    line: usize,
}

/// Parses the tokens of one line into its statements.
pub fn parse_line(line: usize, tokens: &[Token]) -> Result<Vec<Node>> {
    Parser { line }.line_statements(tokens)
}

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| match t.state {
            TokenState::Quoted => format!("\"{}\"", t.text),
            _ => t.text.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_literal(token: &Token, word: &str) -> bool {
    token.state == TokenState::Literal && token.is(word)
}

/// True when `token` can end an operand, so an operator after it is binary.
fn ends_value(token: &Token) -> bool {
    token.is_close()
        || matches!(
            token.state,
            TokenState::Quoted | TokenState::Number | TokenState::Boolean | TokenState::Literal
        )
}

fn pairs(open: &str, close: &str) -> bool {
    matches!((open, close), ("(", ")") | ("[", "]") | ("{", "}"))
}

impl Parser {
    fn err(&self, reason: impl Into<String>) -> Error {
        Error::at(ErrorKind::Syntax(reason.into()), self.line)
    }

    /// Bracket depth in front of every token; both brackets of an outermost
    /// pair sit at depth 0.
    fn depths(&self, tokens: &[Token]) -> Result<Vec<usize>> {
        let mut open: Vec<&str> = Vec::new();
        let mut out = Vec::with_capacity(tokens.len());
        for t in tokens {
            if t.is_close() {
                let opener = open.pop().ok_or_else(|| self.err("Unmatched brackets"))?;
                if !pairs(opener, &t.text) {
                    return Err(self.err(format!(
                        "Unmatched brackets: opening {opener}, closing {}",
                        t.text
                    )));
                }
                out.push(open.len());
            } else {
                out.push(open.len());
                if t.is_open() {
                    open.push(&t.text);
                }
            }
        }
        if open.is_empty() {
            Ok(out)
        } else {
            Err(self.err("Unmatched brackets"))
        }
    }

    /// Index of the bracket closing the one at `at`.
    fn close_of(&self, tokens: &[Token], at: usize) -> Result<usize> {
        let mut depth = 0usize;
        for (k, t) in tokens.iter().enumerate().skip(at) {
            if t.is_open() {
                depth += 1;
            } else if t.is_close() {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(k);
                }
            }
        }
        Err(self.err("Unmatched brackets"))
    }

    /// True when `tokens` is exactly `open … close`.
    fn wrapped_in(&self, tokens: &[Token], open: &str) -> Result<bool> {
        match tokens.first() {
            Some(first) if first.state == TokenState::Paren && first.text == open => {
                Ok(self.close_of(tokens, 0)? == tokens.len() - 1)
            }
            _ => Ok(false),
        }
    }

    /// Splits at separators on depth 0, keeping the separator characters.
    fn split_top<'t>(&self, tokens: &'t [Token]) -> Result<(Vec<&'t [Token]>, Vec<char>)> {
        let depths = self.depths(tokens)?;
        let mut parts = Vec::new();
        let mut seps = Vec::new();
        let mut start = 0;
        for (k, t) in tokens.iter().enumerate() {
            if t.state == TokenState::Separator && depths[k] == 0 {
                parts.push(&tokens[start..k]);
                seps.push(t.text.chars().next().unwrap_or(','));
                start = k + 1;
            }
        }
        parts.push(&tokens[start..]);
        Ok((parts, seps))
    }

    // ── Statements ───────────────────────────────────────────────────

    fn line_statements(&self, tokens: &[Token]) -> Result<Vec<Node>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let depths = self.depths(tokens)?;
        let mut stmts = Vec::new();
        let mut start = 0;
        for k in 0..=tokens.len() {
            let boundary = k == tokens.len()
                || (tokens[k].state == TokenState::StatementSep && depths[k] == 0);
            if !boundary {
                continue;
            }
            let stmt = &tokens[start..k];
            if stmt.is_empty() {
                return Err(self.err("Malformed line"));
            }
            if is_literal(&stmt[0], "REM") {
                break;
            }
            stmts.push(self.statement(stmt)?);
            start = k + 1;
        }
        Ok(stmts)
    }

    fn statement(&self, tokens: &[Token]) -> Result<Node> {
        match tokens {
            [] => return Err(self.err("empty statement")),
            [single] => return self.literal(single, true),
            _ => {}
        }
        if let Some(node) = self.if_form(tokens, true)? {
            return Ok(node);
        }
        if let Some(node) = self.defun(tokens)? {
            return Ok(node);
        }
        if let Some(node) = self.on_jump(tokens)? {
            return Ok(node);
        }
        if self.wrapped_in(tokens, "(")? {
            return self.statement(&tokens[1..tokens.len() - 1]);
        }
        if self.opens_with_builtin_group(tokens)? {
            return self.call(tokens);
        }
        self.expr(tokens, false)
    }

    /// `PRINT (A + 1) * 2; B`: a statement-leading builtin whose first group
    /// is followed by more than further groups takes the whole rest as its
    /// arguments.
    fn opens_with_builtin_group(&self, tokens: &[Token]) -> Result<bool> {
        let head = &tokens[0];
        let opens_group = tokens
            .get(1)
            .is_some_and(|t| t.state == TokenState::Paren && t.text == "(");
        if head.state != TokenState::Literal
            || !opens_group
            || !builtins::is_builtin(&head.text.to_ascii_uppercase())
        {
            return Ok(false);
        }
        Ok(self.group_chain(&tokens[1..])?.is_none())
    }

    /// `IF cond THEN a [ELSE b]`. In statement position a bare line number
    /// in a branch means `GOTO` that line.
    fn if_form(&self, tokens: &[Token], statement: bool) -> Result<Option<Node>> {
        if !tokens.first().is_some_and(|t| is_literal(t, "IF")) {
            return Ok(None);
        }
        let depths = self.depths(tokens)?;
        let at_top = |word: &str, from: usize| {
            (from..tokens.len()).find(|&k| depths[k] == 0 && is_literal(&tokens[k], word))
        };
        let then_at = at_top("THEN", 1).ok_or_else(|| self.err("IF without THEN"))?;
        let else_at = at_top("ELSE", then_at + 1);

        let cond_tokens = &tokens[1..then_at];
        if cond_tokens.is_empty() {
            return Err(self.err("IF without condition"));
        }
        if cond_tokens.iter().any(|t| t.state == TokenState::StatementSep) {
            return Err(self.err("':' used on IF"));
        }
        let cond = self.expr(cond_tokens, true)?;

        let then_end = else_at.unwrap_or(tokens.len());
        let then = self.branch(&tokens[then_at + 1..then_end], statement)?;
        let otherwise = match else_at {
            Some(at) => Some(Box::new(self.branch(&tokens[at + 1..], statement)?)),
            None => None,
        };

        Ok(Some(Node::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise,
        }))
    }

    fn branch(&self, tokens: &[Token], statement: bool) -> Result<Node> {
        match tokens {
            [] => Err(self.err("IF branch is empty")),
            [num] if statement && num.state == TokenState::Number => Ok(Node::Call {
                callee: Box::new(Node::ident("GOTO")),
                args: vec![self.literal(num, false)?],
                seps: Vec::new(),
            }),
            _ => self.statement(tokens),
        }
    }

    /// `DEFUN NAME(X, Y) = body`
    fn defun(&self, tokens: &[Token]) -> Result<Option<Node>> {
        if !is_literal(&tokens[0], "DEFUN") {
            return Ok(None);
        }
        let malformed = || self.err(format!("malformed DEFUN: {}", render(tokens)));
        let name = tokens.get(1).filter(|t| t.state == TokenState::Literal).ok_or_else(malformed)?;
        if !tokens.get(2).is_some_and(|t| t.state == TokenState::Paren && t.text == "(") {
            return Err(malformed());
        }
        let close = self.close_of(tokens, 2)?;
        if !tokens.get(close + 1).is_some_and(|t| t.state == TokenState::Operator && t.text == "=") {
            return Err(malformed());
        }
        let body_tokens = &tokens[close + 2..];
        if body_tokens.is_empty() {
            return Err(self.err("DEFUN without body"));
        }

        Ok(Some(Node::Defun {
            name: name.text.to_ascii_uppercase(),
            params: self.param_list(&tokens[3..close])?,
            body: Box::new(self.expr(body_tokens, false)?),
        }))
    }

    /// `ON test GOTO|GOSUB a, b, …`
    fn on_jump(&self, tokens: &[Token]) -> Result<Option<Node>> {
        if !is_literal(&tokens[0], "ON") {
            return Ok(None);
        }
        let depths = self.depths(tokens)?;
        let (at, jump) = (1..tokens.len())
            .filter(|&k| depths[k] == 0)
            .find_map(|k| {
                if is_literal(&tokens[k], "GOTO") {
                    Some((k, JumpKind::Goto))
                } else if is_literal(&tokens[k], "GOSUB") {
                    Some((k, JumpKind::Gosub))
                } else {
                    None
                }
            })
            .ok_or_else(|| self.err("ON without GOTO or GOSUB"))?;

        if at == 1 {
            return Err(self.err("ON without test expression"));
        }
        let test = self.expr(&tokens[1..at], true)?;

        let (parts, _) = self.split_top(&tokens[at + 1..])?;
        let mut targets = Vec::with_capacity(parts.len());
        for part in parts {
            if part.is_empty() {
                return Err(self.err("ON target list has an empty entry"));
            }
            targets.push(self.expr(part, false)?);
        }

        Ok(Some(Node::On {
            test: Box::new(test),
            jump,
            targets,
        }))
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn expr(&self, tokens: &[Token], if_mode: bool) -> Result<Node> {
        if tokens.is_empty() {
            return Ok(Node::Null);
        }
        if let [single] = tokens {
            if !STRUCTURAL.iter().any(|w| is_literal(single, w)) {
                return self.literal(single, false);
            }
        }

        let depths = self.depths(tokens)?;
        let last = tokens.len() - 1;

        if self.wrapped_in(tokens, "[")? {
            return Ok(Node::Tuple(self.param_list(&tokens[1..last])?));
        }
        if self.wrapped_in(tokens, "{")? {
            return self.array(&tokens[1..last]);
        }
        if self.wrapped_in(tokens, "(")? {
            return self.expr(&tokens[1..last], if_mode);
        }
        if let Some(node) = self.if_form(tokens, false)? {
            return Ok(node);
        }

        let head = &tokens[0];
        if head.state == TokenState::Literal
            && builtins::is_builtin(&head.text.to_ascii_uppercase())
            && !tokens
                .get(1)
                .is_some_and(|t| t.state == TokenState::Paren && t.text == "(")
        {
            return self.call(tokens);
        }

        let mut top: Option<(usize, u32)> = None;
        for (k, t) in tokens.iter().enumerate() {
            if depths[k] != 0 || t.state != TokenState::Operator {
                continue;
            }
            let Some(rank) = precedence(&t.text) else {
                continue;
            };
            if k > 0 && !ends_value(&tokens[k - 1]) {
                continue;
            }
            match top {
                Some((_, best)) if rank < best || (rank == best && is_right_assoc(&t.text)) => {}
                _ => top = Some((k, rank)),
            }
        }

        let Some((k, _)) = top else {
            return self.call(tokens);
        };

        let op = tokens[k].text.to_ascii_uppercase();
        if if_mode && op == "=" {
            return Err(self.err("'=' used on IF, did you mean '=='?"));
        }
        let right = &tokens[k + 1..];
        if right.is_empty() {
            return Err(self.err(format!("Missing operand after {op}")));
        }

        if k == 0 {
            let name = unary_builtin(&op)
                .ok_or_else(|| self.err(format!("{op} cannot be used as a prefix")))?;
            return Ok(Node::op(name, vec![self.expr(right, if_mode)?]));
        }

        let left = &tokens[..k];
        if op == "~>" {
            let params = self.lambda_params(left)?;
            return Ok(Node::op("~>", vec![Node::Tuple(params), self.expr(right, false)?]));
        }
        Ok(Node::op(&op, vec![self.expr(left, if_mode)?, self.expr(right, if_mode)?]))
    }

    /// `NAME(a, b)`, `NAME a; b`, `(callee-expr)(a, b)` or a chain such as
    /// `ADDER(3)(4)`, where each group calls the result of the previous one.
    fn call(&self, tokens: &[Token]) -> Result<Node> {
        let head = &tokens[0];
        let (callee, rest, bare_name) = match head.state {
            TokenState::Literal => (Node::ident(&head.text), &tokens[1..], true),
            TokenState::Paren if head.text == "(" => {
                let close = self.close_of(tokens, 0)?;
                (self.expr(&tokens[1..close], false)?, &tokens[close + 1..], false)
            }
            _ => return Err(self.err(format!("\"{}\" cannot be parsed", render(tokens)))),
        };

        if let Some(groups) = self.group_chain(rest)? {
            let mut node = callee;
            for inner in groups {
                let (args, seps) = self.arguments(inner)?;
                node = Node::Call {
                    callee: Box::new(node),
                    args,
                    seps,
                };
            }
            return Ok(node);
        }
        if !bare_name {
            return Err(self.err(format!("\"{}\" cannot be parsed", render(tokens))));
        }

        let (args, seps) = self.arguments(rest)?;
        Ok(Node::Call {
            callee: Box::new(callee),
            args,
            seps,
        })
    }

    /// Insides of `(a)(b)…`; `None` unless the groups cover all of `tokens`.
    fn group_chain<'t>(&self, tokens: &'t [Token]) -> Result<Option<Vec<&'t [Token]>>> {
        let mut groups = Vec::new();
        let mut at = 0;
        while at < tokens.len() {
            let t = &tokens[at];
            if t.state != TokenState::Paren || t.text != "(" {
                return Ok(None);
            }
            let close = self.close_of(tokens, at)?;
            groups.push(&tokens[at + 1..close]);
            at = close + 1;
        }
        Ok((!groups.is_empty()).then_some(groups))
    }

    fn arguments(&self, tokens: &[Token]) -> Result<(Vec<Node>, Vec<char>)> {
        if tokens.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        let (parts, seps) = self.split_top(tokens)?;
        let args = parts
            .into_iter()
            .map(|part| self.expr(part, false))
            .collect::<Result<Vec<_>>>()?;
        Ok((args, seps))
    }

    fn array(&self, inner: &[Token]) -> Result<Node> {
        if inner.is_empty() {
            return Ok(Node::Array(Vec::new()));
        }
        let (parts, _) = self.split_top(inner)?;
        let mut items = Vec::with_capacity(parts.len());
        for part in parts {
            if part.is_empty() {
                return Err(self.err("Missing operand in array literal"));
            }
            items.push(self.expr(part, false)?);
        }
        Ok(Node::Array(items))
    }

    /// Left side of `~>`: `[X, Y]`, `(X, Y)`, `()` or a bare name.
    fn lambda_params(&self, tokens: &[Token]) -> Result<Vec<String>> {
        match tokens {
            [name] if name.state == TokenState::Literal => Ok(vec![name.text.to_ascii_uppercase()]),
            _ if self.wrapped_in(tokens, "[")? || self.wrapped_in(tokens, "(")? => {
                self.param_list(&tokens[1..tokens.len() - 1])
            }
            _ => Err(self.err(format!("invalid parameter list \"{}\"", render(tokens)))),
        }
    }

    fn param_list(&self, tokens: &[Token]) -> Result<Vec<String>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let (parts, _) = self.split_top(tokens)?;
        parts
            .into_iter()
            .map(|part| match part {
                [name] if name.state == TokenState::Literal => Ok(name.text.to_ascii_uppercase()),
                _ => Err(self.err(format!("\"{}\" is not a parameter name", render(part)))),
            })
            .collect()
    }

    fn literal(&self, token: &Token, statement: bool) -> Result<Node> {
        match token.state {
            TokenState::Quoted => Ok(Node::Str(token.text.clone())),
            TokenState::Number => parse_number(&token.text)
                .map(Node::Num)
                .ok_or_else(|| Error::at(ErrorKind::NumberFormat(token.text.clone()), self.line)),
            TokenState::Boolean => Ok(Node::Bool(token.text.eq_ignore_ascii_case("TRUE"))),
            TokenState::Literal if statement => Ok(Node::Call {
                callee: Box::new(Node::ident(&token.text)),
                args: Vec::new(),
                seps: Vec::new(),
            }),
            TokenState::Literal | TokenState::Operator => Ok(Node::ident(&token.text)),
            _ => Err(self.err(format!("unexpected \"{}\"", token.text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{elaborate::elaborate, lexer::tokenize};

    fn parse(src: &str) -> Result<Vec<Node>> {
        let tokens = elaborate(tokenize(src, 10)?);
        parse_line(10, &tokens)
    }

    fn render_ok(src: &str) -> String {
        parse(src)
            .unwrap()
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    #[test]
    fn test_expression_shapes() {
        let test_cases = vec![
            ("2 + 3 * 4", "(+ 2, (* 3, 4))"),
            ("(2 + 3) * 4", "(* (+ 2, 3), 4)"),
            ("2 ^ 3 ^ 2", "(^ 2, (^ 3, 2))"),
            ("A - B - C", "(- (- A, B), C)"),
            ("X = -1", "(= X, (UNARYMINUS 1))"),
            ("NOT A AND B", "(AND (UNARYLOGICNOT A), B)"),
            ("A <> B OR C < D", "(OR (<> A, B), (< C, D))"),
            ("M >>= F", "(>>= M, F)"),
            ("A = {1, 2, {3}}", "(= A, {1, 2, {3}})"),
            ("F = [X, Y] ~> X + Y", "(= F, (~> [X, Y], (+ X, Y)))"),
            ("F = (X) ~> X + 1", "(= F, (~> [X], (+ X, 1)))"),
            ("((X) ~> X * 2)(21)", "(~> [X], (* X, 2))(21)"),
            ("ADDER(3)(4)", "ADDER(3)(4)"),
            ("X = SQR(16) + 1", "(= X, (+ SQR(16), 1))"),
        ];

        for (src, expected) in test_cases {
            println!("Testing: {src}");
            assert_eq!(render_ok(src), expected);
        }
    }

    #[test]
    fn test_statement_shapes() {
        let test_cases = vec![
            ("PRINT \"A\";B", "PRINT(\"A\", B)"),
            ("PRINT \"A\";", "PRINT(\"A\", null)"),
            ("PRINT -1", "PRINT((UNARYMINUS 1))"),
            ("FOR I = 1 TO 10 STEP 2", "FOR((= I, (STEP (TO 1, 10), 2)))"),
            ("PRINT 1 : NEXT", "PRINT(1) | NEXT()"),
            (
                "IF A == 1 THEN 100 ELSE PRINT 2",
                "IF (== A, 1) THEN GOTO(100) ELSE PRINT(2)",
            ),
            ("DEFUN SQ(N) = N * N", "DEFUN SQ(N) = (* N, N)"),
            ("ON K GOSUB 100, 200", "ON K GOSUB 100, 200"),
            ("DIM A(3)", "DIM(A(3))"),
            ("PRINT (2 + 3) * 4", "PRINT((* (+ 2, 3), 4))"),
            ("PRINT (1) + 1; 7", "PRINT((+ 1, 1), 7)"),
            ("PRINT(1)", "PRINT(1)"),
            ("PRINT ADDER(3)(4)", "PRINT(ADDER(3)(4))"),
            ("X = IF A THEN 1 ELSE 2", "(= X, IF A THEN 1 ELSE 2)"),
            ("REM nothing to see", ""),
            ("PRINT 1 : REM trailing", "PRINT(1)"),
        ];

        for (src, expected) in test_cases {
            println!("Testing: {src}");
            assert_eq!(render_ok(src), expected);
        }
    }

    #[test]
    fn test_syntax_errors() {
        let test_cases = vec![
            "IF A = 1 THEN 10",
            "PRINT (1",
            "PRINT {1, 2)",
            "IF A PRINT 1",
            "PRINT 1 :",
            "X =",
            "DEFUN F = 1",
            "ON X PRINT 1",
        ];

        for src in test_cases {
            println!("Testing: {src}");
            let err = parse(src).unwrap_err();
            assert!(matches!(err.kind, ErrorKind::Syntax(_)), "{src}: {err}");
            assert_eq!(err.line, Some(10));
        }
    }
}
