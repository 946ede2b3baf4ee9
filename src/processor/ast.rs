//! Syntax tree for one BASIC statement, plus the operator vocabulary the
//! parser splits on.
//!
//! Trees are immutable once built. Lambda bodies sit behind an `Rc` so that
//! closures, capture and currying share untouched subtrees instead of
//! copying them.

use std::fmt;
use std::rc::Rc;

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Goto,
    Gosub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Empty argument or expression, e.g. the tail of `PRINT "A";`.
    Null,
    Num(f64),
    Str(String),
    Bool(bool),

    /// Upper-cased name of a variable, constant or builtin.
    Ident(String),

    /// Operator application; one child for unary, two for binary.
    Op { op: String, args: Vec<Node> },

    /// `NAME(a, b)` or `NAME a; b`. `seps` holds the separator that
    /// followed each argument but the last.
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
        seps: Vec<char>,
    },

    /// `{a, b, c}`
    Array(Vec<Node>),

    /// `[X, Y]` before it is consumed by `~>`.
    Tuple(Vec<String>),

    /// Converted lambda; parameter references in `body` are `ArgRef`s.
    Lambda { params: Vec<String>, body: Rc<Node> },

    /// `DEFUN NAME(X, Y) = body`, rewritten into an assignment by pruning.
    Defun {
        name: String,
        params: Vec<String>,
        body: Box<Node>,
    },

    /// Parameter `index` of the binder `depth` lambdas out from the use site.
    ArgRef { depth: usize, index: usize },

    If {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },

    /// `ON test GOTO a, b, c`
    On {
        test: Box<Node>,
        jump: JumpKind,
        targets: Vec<Node>,
    },

    /// Runtime value spliced into a tree by capture or currying.
    Const(Value),
}

impl Node {
    pub fn ident(name: &str) -> Self {
        Node::Ident(name.to_ascii_uppercase())
    }

    pub fn op(op: &str, args: Vec<Node>) -> Self {
        Node::Op { op: op.to_string(), args }
    }

    /// Name of the callee when it is a plain identifier.
    pub fn callee_name(&self) -> Option<&str> {
        match self {
            Node::Call { callee, .. } => match callee.as_ref() {
                Node::Ident(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────────────
// Operator table
// ───────────────────────────────────────────────────────────────────────

/// Split rank of every binary/prefix operator. Larger ranks split first,
/// so they bind looser.
const PRECEDENCE: &[(&str, u32)] = &[
    ("`", 600),
    ("^", 20),
    ("*", 30),
    ("/", 30),
    ("\\", 20),
    ("MOD", 40),
    ("+", 50),
    ("-", 50),
    ("NOT", 60),
    ("BNOT", 60),
    ("<<", 70),
    (">>", 70),
    ("<", 80),
    (">", 80),
    ("<=", 80),
    ("=<", 80),
    (">=", 80),
    ("=>", 80),
    ("==", 90),
    ("<>", 90),
    ("><", 90),
    ("MIN", 100),
    ("MAX", 100),
    ("BAND", 200),
    ("BXOR", 201),
    ("BOR", 202),
    ("AND", 300),
    ("OR", 301),
    ("TO", 400),
    ("STEP", 401),
    ("!", 500),
    ("~", 501),
    ("#", 502),
    (".", 600),
    ("$", 600),
    ("~<", 601),
    ("@", 700),
    ("~>", 1000),
    (">>~", 1000),
    (">>=", 1000),
    ("=", 9999),
    ("IN", 9999),
];

const RIGHT_ASSOC: &[&str] = &["^", "=", "!", "IN", "~>", "$", ".", ">>=", ">>~", "@", "`"];

pub fn precedence(op: &str) -> Option<u32> {
    PRECEDENCE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(op))
        .map(|&(_, rank)| rank)
}

pub fn is_operator(word: &str) -> bool {
    precedence(word).is_some()
}

pub fn is_right_assoc(op: &str) -> bool {
    RIGHT_ASSOC.contains(&op)
}

/// Builtin that implements `op` when it appears with no left operand.
pub fn unary_builtin(op: &str) -> Option<&'static str> {
    Some(match op {
        "-" => "UNARYMINUS",
        "+" => "UNARYPLUS",
        "NOT" => "UNARYLOGICNOT",
        "BNOT" => "UNARYBNOT",
        "@" => "MRET",
        "`" => "MJOIN",
        _ => return None,
    })
}

// ───────────────────────────────────────────────────────────────────────
// Display – a compact prefix rendering used by RESOLVE and debug traces
// ───────────────────────────────────────────────────────────────────────

fn join(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{node}")?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => write!(f, "null"),
            Node::Num(n) => write!(f, "{}", Value::Num(*n)),
            Node::Str(s) => write!(f, "\"{s}\""),
            Node::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Node::Ident(name) => write!(f, "{name}"),
            Node::Op { op, args } => {
                write!(f, "({op} ")?;
                join(f, args)?;
                write!(f, ")")
            }
            Node::Call { callee, args, .. } => {
                write!(f, "{callee}(")?;
                join(f, args)?;
                write!(f, ")")
            }
            Node::Array(items) => {
                write!(f, "{{")?;
                join(f, items)?;
                write!(f, "}}")
            }
            Node::Tuple(names) => write!(f, "[{}]", names.join(", ")),
            Node::Lambda { params, body } => write!(f, "[{}] ~> {body}", params.join(", ")),
            Node::Defun { name, params, body } => {
                write!(f, "DEFUN {name}({}) = {body}", params.join(", "))
            }
            Node::ArgRef { depth, index } => write!(f, "#{depth}.{index}"),
            Node::If { cond, then, otherwise } => {
                write!(f, "IF {cond} THEN {then}")?;
                if let Some(otherwise) = otherwise {
                    write!(f, " ELSE {otherwise}")?;
                }
                Ok(())
            }
            Node::On { test, jump, targets } => {
                let verb = match jump {
                    JumpKind::Goto => "GOTO",
                    JumpKind::Gosub => "GOSUB",
                };
                write!(f, "ON {test} {verb} ")?;
                join(f, targets)
            }
            Node::Const(value) => write!(f, "'{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_ranks() {
        let test_cases = vec![
            ("^", Some(20)),
            ("mod", Some(40)),
            (">>=", Some(1000)),
            ("=", Some(9999)),
            ("%", None),
            ("PRINT", None),
        ];

        for (op, expected) in test_cases {
            assert_eq!(precedence(op), expected, "{op}");
        }
    }

    #[test]
    fn renders_prefix_form() {
        let tree = Node::op("+", vec![Node::Num(1.0), Node::op("*", vec![Node::ident("x"), Node::Num(2.5)])]);
        assert_eq!(tree.to_string(), "(+ 1, (* X, 2.5))");
    }
}
