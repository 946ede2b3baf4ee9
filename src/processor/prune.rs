//! Closure conversion ("pruning") and the tree rewrites built on it.
//!
//! `prune` runs once per parsed statement: lambda parameters become
//! `ArgRef { depth, index }` pairs, `DEFUN` turns into an assignment and
//! unary `+`/`-` on a number literal is folded. `capture` and `curry` build
//! new trees from closure bodies; a published tree is never mutated.

use std::rc::Rc;

use super::ast::Node;
use super::value::{Closure, Value};
use crate::error::{Error, ErrorKind, Result};

struct Pruner {
    line: usize,
    /// Parameter names of the enclosing lambdas, innermost last.
    binders: Vec<Vec<String>>,
}

pub fn prune(line: usize, node: Node) -> Result<Node> {
    Pruner {
        line,
        binders: Vec::new(),
    }
    .convert(node)
}

impl Pruner {
    fn lookup(&self, name: &str) -> Option<(usize, usize)> {
        self.binders
            .iter()
            .rev()
            .enumerate()
            .find_map(|(depth, frame)| frame.iter().position(|p| p == name).map(|index| (depth, index)))
    }

    fn convert_all(&mut self, nodes: Vec<Node>) -> Result<Vec<Node>> {
        nodes.into_iter().map(|n| self.convert(n)).collect()
    }

    fn lambda(&mut self, params: Vec<String>, body: Node) -> Result<Node> {
        self.binders.push(params.clone());
        let body = self.convert(body);
        self.binders.pop();
        Ok(Node::Lambda {
            params,
            body: Rc::new(body?),
        })
    }

    fn convert(&mut self, node: Node) -> Result<Node> {
        Ok(match node {
            Node::Ident(name) => match self.lookup(&name) {
                Some((depth, index)) => Node::ArgRef { depth, index },
                None => Node::Ident(name),
            },

            Node::Op { op, args } => {
                if let ("UNARYMINUS" | "UNARYPLUS", [Node::Num(n)]) = (op.as_str(), args.as_slice()) {
                    return Ok(Node::Num(if op == "UNARYMINUS" { -n } else { *n }));
                }
                if op == "~>" {
                    let mut parts = args.into_iter();
                    return match (parts.next(), parts.next()) {
                        (Some(Node::Tuple(params)), Some(body)) => self.lambda(params, body),
                        _ => Err(Error::at(
                            ErrorKind::Syntax("lambda needs a parameter list".into()),
                            self.line,
                        )),
                    };
                }
                Node::Op {
                    op,
                    args: self.convert_all(args)?,
                }
            }

            Node::Defun { name, params, body } => {
                let lambda = self.lambda(params, *body)?;
                Node::op("=", vec![Node::Ident(name), lambda])
            }

            Node::Call { callee, args, seps } => Node::Call {
                callee: Box::new(self.convert(*callee)?),
                args: self.convert_all(args)?,
                seps,
            },

            Node::Array(items) => Node::Array(self.convert_all(items)?),

            Node::If { cond, then, otherwise } => Node::If {
                cond: Box::new(self.convert(*cond)?),
                then: Box::new(self.convert(*then)?),
                otherwise: match otherwise {
                    Some(o) => Some(Box::new(self.convert(*o)?)),
                    None => None,
                },
            },

            Node::On { test, jump, targets } => Node::On {
                test: Box::new(self.convert(*test)?),
                jump,
                targets: self.convert_all(targets)?,
            },

            other => other,
        })
    }
}

// ───────────────────────────────────────────────────────────────────────
// Rewrites over converted trees
// ───────────────────────────────────────────────────────────────────────

type RefRewrite<'a> = dyn FnMut(usize, usize, usize) -> Option<Node> + 'a;

/// Copies `node`, offering every `ArgRef` to `f` as `(nesting, depth, index)`
/// where `nesting` counts the lambdas entered below the starting point.
fn rewrite_refs(node: &Node, nesting: usize, f: &mut RefRewrite<'_>) -> Node {
    match node {
        Node::ArgRef { depth, index } => f(nesting, *depth, *index).unwrap_or_else(|| node.clone()),
        Node::Lambda { params, body } => Node::Lambda {
            params: params.clone(),
            body: Rc::new(rewrite_refs(body, nesting + 1, f)),
        },
        Node::Op { op, args } => Node::Op {
            op: op.clone(),
            args: args.iter().map(|a| rewrite_refs(a, nesting, f)).collect(),
        },
        Node::Call { callee, args, seps } => Node::Call {
            callee: Box::new(rewrite_refs(callee, nesting, f)),
            args: args.iter().map(|a| rewrite_refs(a, nesting, f)).collect(),
            seps: seps.clone(),
        },
        Node::Array(items) => Node::Array(items.iter().map(|a| rewrite_refs(a, nesting, f)).collect()),
        Node::If { cond, then, otherwise } => Node::If {
            cond: Box::new(rewrite_refs(cond, nesting, f)),
            then: Box::new(rewrite_refs(then, nesting, f)),
            otherwise: otherwise.as_ref().map(|o| Box::new(rewrite_refs(o, nesting, f))),
        },
        Node::On { test, jump, targets } => Node::On {
            test: Box::new(rewrite_refs(test, nesting, f)),
            jump: *jump,
            targets: targets.iter().map(|a| rewrite_refs(a, nesting, f)).collect(),
        },
        other => other.clone(),
    }
}

fn highest_of<'a>(nodes: impl IntoIterator<Item = &'a Node>, nesting: usize) -> Option<usize> {
    nodes
        .into_iter()
        .filter_map(|n| highest_binder(n, nesting))
        .max()
}

/// Outermost binder referenced from `node`, counted from `nesting`.
fn highest_binder(node: &Node, nesting: usize) -> Option<usize> {
    match node {
        Node::ArgRef { depth, .. } => depth.checked_sub(nesting),
        Node::Lambda { body, .. } => highest_binder(body, nesting + 1),
        Node::Op { args, .. } | Node::Array(args) => highest_of(args, nesting),
        Node::Call { callee, args, .. } => {
            highest_of(std::iter::once(callee.as_ref()).chain(args), nesting)
        }
        Node::If { cond, then, otherwise } => highest_of(
            [cond.as_ref(), then.as_ref()]
                .into_iter()
                .chain(otherwise.as_deref()),
            nesting,
        ),
        Node::On { test, targets, .. } => {
            highest_of(std::iter::once(test.as_ref()).chain(targets), nesting)
        }
        _ => None,
    }
}

/// Substitutes the parameters a lambda body borrows from enclosing calls
/// with their current values. `frames` is the live binder stack, innermost
/// last.
pub fn capture(body: &Rc<Node>, frames: &[Box<[Value]>]) -> Rc<Node> {
    if frames.is_empty() || !highest_binder(body, 0).is_some_and(|d| d > 0) {
        return Rc::clone(body);
    }
    Rc::new(rewrite_refs(body, 0, &mut |nesting, depth, index| {
        let up = depth.checked_sub(nesting + 1)?;
        let frame = frames.len().checked_sub(up + 1).map(|at| &frames[at])?;
        frame.get(index).cloned().map(Node::Const)
    }))
}

/// Partial application: binds the first parameter of the outermost binder
/// used in `closure` to `value`. The input closure is left untouched.
pub fn curry(closure: &Closure, value: &Value) -> Closure {
    let rest = || closure.params.iter().skip(1).cloned().collect();
    let Some(target) = highest_binder(&closure.body, 0) else {
        return Closure {
            params: rest(),
            body: Rc::clone(&closure.body),
        };
    };

    let body = rewrite_refs(&closure.body, 0, &mut |nesting, depth, index| {
        if depth != nesting + target {
            return None;
        }
        Some(match index {
            0 => Node::Const(value.clone()),
            _ => Node::ArgRef { depth, index: index - 1 },
        })
    });

    Closure {
        params: if target == 0 { rest() } else { closure.params.clone() },
        body: Rc::new(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::parse_statements;

    fn pruned(src: &str) -> String {
        parse_statements(10, src)
            .unwrap()
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn closure_of(src: &str) -> Closure {
        match parse_statements(10, src).unwrap().remove(0) {
            Node::Op { mut args, .. } => match args.remove(1) {
                Node::Lambda { params, body } => Closure { params, body },
                other => panic!("not a lambda: {other}"),
            },
            other => panic!("not an assignment: {other}"),
        }
    }

    #[test]
    fn test_conversion() {
        let test_cases = vec![
            ("F = [X] ~> X + 1", "(= F, [X] ~> (+ #0.0, 1))"),
            ("F = [X] ~> [Y] ~> X + Y", "(= F, [X] ~> [Y] ~> (+ #1.0, #0.0))"),
            ("DEFUN SQ(N) = N * N", "(= SQ, [N] ~> (* #0.0, #0.0))"),
            ("F = [X] ~> Y + X", "(= F, [X] ~> (+ Y, #0.0))"),
            ("G = [F, X] ~> F(X)", "(= G, [F, X] ~> #0.0(#0.1))"),
            ("X = -5", "(= X, -5)"),
            ("PRINT X", "PRINT(X)"),
        ];

        for (src, expected) in test_cases {
            println!("Testing: {src}");
            assert_eq!(pruned(src), expected);
        }
    }

    #[test]
    fn curry_binds_first_parameter_on_a_copy() {
        let add = closure_of("ADD = [X, Y] ~> X + Y");
        let add3 = curry(&add, &Value::Num(3.0));

        assert_eq!(add3.params, vec!["Y".to_string()]);
        assert_eq!(add3.body.to_string(), "(+ '3, #0.0)");
        assert_eq!(add.params.len(), 2);
        assert_eq!(add.body.to_string(), "(+ #0.0, #0.1)");
    }

    #[test]
    fn capture_substitutes_escaping_references() {
        let outer = closure_of("F = [X] ~> [Y] ~> X + Y");
        let Node::Lambda { body, .. } = outer.body.as_ref() else {
            panic!("inner lambda expected");
        };
        let frames: Vec<Box<[Value]>> = vec![vec![Value::Num(3.0)].into_boxed_slice()];

        let captured = capture(body, &frames);
        assert_eq!(captured.to_string(), "(+ '3, #0.0)");

        let untouched = capture(&outer.body, &[]);
        assert!(Rc::ptr_eq(&untouched, &outer.body));
    }
}
