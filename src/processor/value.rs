//! Runtime values.
//!
//! Every value carries its own tag, so the evaluator dispatches with a
//! `match` instead of probing for marker fields.

use std::fmt;
use std::rc::Rc;

use super::ast::Node;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Num(f64),
    Str(String),
    Bool(bool),
    /// Possibly nested, i.e. multi-dimensional.
    Array(Vec<Value>),
    Generator(Generator),
    Closure(Closure),
    Monad(Monad),
}

/// Lazy numeric range made by `TO` / `STEP`.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub start: f64,
    pub end: f64,
    pub step: f64,
    pub current: f64,
}

/// A converted lambda. `body` refers to its own parameters as
/// `ArgRef { depth: 0, .. }`; outer parameters were substituted when the
/// closure was created.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub params: Vec<String>,
    pub body: Rc<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Monad {
    List(Vec<Value>),
    /// The value monad produced by `MRET`.
    Memo(Box<Value>),
    /// Composition chain; the first closure runs first.
    FunSeq(Vec<Closure>),
}

impl Generator {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self {
            start,
            end,
            step: if step == 0.0 { 1.0 } else { step },
            current: start,
        }
    }

    fn sign(&self) -> f64 {
        if self.step < 0.0 { -1.0 } else { 1.0 }
    }

    fn in_range(&self, n: f64) -> bool {
        n * self.sign() <= self.end * self.sign()
    }

    /// Steps on from `from` (the loop variable, which the body may have
    /// changed). Returns the new value while it is still inside the range.
    pub fn advance(&mut self, from: f64) -> Option<f64> {
        self.current = from + self.step;
        self.in_range(self.current).then_some(self.current)
    }

    /// Number of values the range produces from `start`.
    pub fn len(&self) -> usize {
        if !self.in_range(self.start) {
            return 0;
        }
        ((self.end - self.start) / self.step).floor() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materializes exactly `len()` values, even where adding the step no
    /// longer changes a large start value.
    pub fn to_values(&self) -> Vec<Value> {
        (0..self.len())
            .map(|k| Value::Num(self.start + k as f64 * self.step))
            .collect()
    }
}

impl Monad {
    pub fn kind(&self) -> &'static str {
        match self {
            Monad::List(_) => "list",
            Monad::Memo(_) => "value",
            Monad::FunSeq(_) => "funseq",
        }
    }
}

/// Formats a number the way BASIC prints it: integers without a fraction,
/// everything else in shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        format!("{n:e}")
    } else {
        format!("{n}")
    }
}

fn numeric_text(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
        return None;
    }
    s.parse().ok()
}

impl Value {
    /// Tag reported by `TYPEOF`.
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Num(_) => "num".into(),
            Value::Str(_) => "string".into(),
            Value::Bool(_) => "bool".into(),
            Value::Array(_) => "array".into(),
            Value::Generator(_) => "generator".into(),
            Value::Closure(_) => "usrdefun".into(),
            Value::Monad(m) => format!("{}-monad", m.kind()),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    /// Numeric reading of the value; numeric strings and booleans count.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) => numeric_text(s),
            _ => None,
        }
    }

    /// Number when the text of an input line reads as one, text otherwise.
    pub fn from_input(text: &str) -> Self {
        let text = text.trim();
        numeric_text(text).map_or_else(|| Value::Str(text.to_string()), Value::Num)
    }

    /// Bytes charged against scratch memory.
    pub fn footprint(&self) -> usize {
        match self {
            Value::Num(_) => 8,
            Value::Str(s) => s.len(),
            Value::Array(items) => items.len() * 8,
            _ => 1,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Num(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Generator(g) => {
                write!(f, "Generator: {} to {}", format_number(g.start), format_number(g.end))?;
                if g.step != 1.0 {
                    write!(f, " step {}", format_number(g.step))?;
                }
                Ok(())
            }
            Value::Closure(c) => write!(f, "[{}] ~> {}", c.params.join(", "), c.body),
            Value::Monad(Monad::List(items)) => {
                write!(f, "list-monad({})", Value::Array(items.clone()))
            }
            Value::Monad(Monad::Memo(v)) => write!(f, "value-monad({v})"),
            Value::Monad(Monad::FunSeq(fs)) => write!(f, "funseq-monad({})", fs.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        let test_cases = vec![
            (1.0, "1"),
            (-3.0, "-3"),
            (0.5, "0.5"),
            (0.1 + 0.2, "0.30000000000000004"),
            (-0.0, "0"),
            (f64::INFINITY, "Infinity"),
        ];

        for (n, expected) in test_cases {
            assert_eq!(format_number(n), expected);
        }
    }

    #[test]
    fn test_display() {
        let test_cases = vec![
            (Value::Array(vec![Value::Num(1.0), Value::Str("a".into())]), "1,a"),
            (Value::Generator(Generator::new(1.0, 10.0, 1.0)), "Generator: 1 to 10"),
            (Value::Generator(Generator::new(10.0, 1.0, -3.0)), "Generator: 10 to 1 step -3"),
            (Value::Bool(true), "true"),
            (Value::Null, ""),
        ];

        for (value, expected) in test_cases {
            assert_eq!(value.to_string(), expected);
        }
    }

    #[test]
    fn generator_ranges() {
        let test_cases = vec![
            (Generator::new(1.0, 5.0, 2.0), vec![1.0, 3.0, 5.0]),
            (Generator::new(3.0, 1.0, -1.0), vec![3.0, 2.0, 1.0]),
            (Generator::new(1.0, 0.0, 1.0), vec![]),
            (Generator::new(1.0, 2.0, 0.0), vec![1.0, 2.0]),
        ];

        for (g, expected) in test_cases {
            let expected: Vec<Value> = expected.into_iter().map(Value::Num).collect();
            assert_eq!(g.len(), expected.len());
            assert_eq!(g.to_values(), expected);
        }
    }

    #[test]
    fn huge_ranges_materialize_a_bounded_count() {
        let g = Generator::new(1e16, 1e16 + 10.0, 1.0);
        assert_eq!(g.len(), 11);
        assert_eq!(g.to_values().len(), 11);
    }

    #[test]
    fn generator_advance_stops_past_end() {
        let mut g = Generator::new(1.0, 3.0, 1.0);
        assert_eq!(g.advance(1.0), Some(2.0));
        assert_eq!(g.advance(2.0), Some(3.0));
        assert_eq!(g.advance(3.0), None);
        assert_eq!(g.current, 4.0);
    }

    #[test]
    fn type_names_and_truth() {
        assert_eq!(Value::Monad(Monad::Memo(Box::new(Value::Null))).type_name(), "value-monad");
        assert_eq!(Value::Monad(Monad::List(vec![])).type_name(), "list-monad");
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
        assert_eq!(Value::from_input(" 42 "), Value::Num(42.0));
        assert_eq!(Value::from_input("hi"), Value::Str("hi".into()));
    }
}
