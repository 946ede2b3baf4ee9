//! Builtin functions and statements, looked up by upper-case name.
//!
//! Most builtins are *eager*: the evaluator resolves their arguments first.
//! Statements that assign, declare or move the program counter are *forms*
//! and get the raw argument trees instead.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::LazyLock;

use rand::Rng;

use super::ast::Node;
use super::prune::curry;
use super::value::{Closure, Generator, Monad, Value};
use super::vm::{ForFrame, ForIter, Interpreter, Outcome, Pc, Place};
use crate::error::{ErrorKind, Result, bad_call, mismatch, syntax};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    Variadic,
}

/// Where a builtin is being applied.
pub(crate) struct Site<'a> {
    pub pc: Pc,
    pub name: &'static str,
    /// Argument separators as written; `,` matters to PRINT.
    pub seps: &'a [char],
}

pub(crate) type EagerFn = fn(&mut Interpreter, &Site<'_>, Vec<Value>) -> Result<Value>;
pub(crate) type FormFn = fn(&mut Interpreter, &Site<'_>, &[Node]) -> Result<Outcome>;

#[derive(Clone, Copy)]
pub(crate) enum Imp {
    Eager(EagerFn),
    Form(FormFn),
}

pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub(crate) imp: Imp,
    pub debug_only: bool,
    pub not_production: bool,
}

impl Builtin {
    fn debug(mut self) -> Self {
        self.debug_only = true;
        self
    }

    fn noprod(mut self) -> Self {
        self.not_production = true;
        self
    }

    pub fn accepts(&self, count: usize) -> bool {
        match self.arity {
            Arity::Exact(n) => count == n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
            Arity::Variadic => true,
        }
    }

    pub(crate) fn check_arity(&self, count: usize) -> Result<()> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(syntax(format!("{}: {count} arguments were given", self.name)))
        }
    }
}

fn eager(name: &'static str, arity: Arity, imp: EagerFn) -> Builtin {
    Builtin {
        name,
        arity,
        imp: Imp::Eager(imp),
        debug_only: false,
        not_production: false,
    }
}

fn form(name: &'static str, arity: Arity, imp: FormFn) -> Builtin {
    Builtin {
        name,
        arity,
        imp: Imp::Form(imp),
        debug_only: false,
        not_production: false,
    }
}

static BUILTINS: LazyLock<HashMap<&'static str, Builtin>> =
    LazyLock::new(|| table().into_iter().map(|b| (b.name, b)).collect());

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.get(name)
}

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains_key(name)
}

/// Read-only names; assigning to one raises `AssignmentToConstant`.
pub fn constant(name: &str) -> Option<Value> {
    Some(match name {
        "NIL" => Value::Array(Vec::new()),
        "PI" => Value::Num(std::f64::consts::PI),
        "TAU" => Value::Num(std::f64::consts::TAU),
        "EULER" => Value::Num(std::f64::consts::E),
        "ID" => Value::Closure(Closure {
            params: vec!["X".into()],
            body: Rc::new(Node::ArgRef { depth: 0, index: 0 }),
        }),
        "UNDEFINED" => Value::Null,
        "TRUE" => Value::Bool(true),
        "FALSE" => Value::Bool(false),
        _ => return None,
    })
}

/// Closure that forwards its parameters to `builtin`, so the builtin can be
/// passed around like a user function. Only fixed-arity eager builtins
/// qualify.
pub fn wrap(builtin: &Builtin) -> Option<Closure> {
    let (Imp::Eager(_), Arity::Exact(n)) = (builtin.imp, builtin.arity) else {
        return None;
    };
    Some(Closure {
        params: (0..n).map(|k| format!("#{k}")).collect(),
        body: Rc::new(Node::Call {
            callee: Box::new(Node::Ident(builtin.name.to_string())),
            args: (0..n).map(|index| Node::ArgRef { depth: 0, index }).collect(),
            seps: Vec::new(),
        }),
    })
}

// ───────────────────────────────────────────────────────────────────────
// Argument helpers
// ───────────────────────────────────────────────────────────────────────

fn num(site: &Site<'_>, value: &Value) -> Result<f64> {
    value
        .as_num()
        .ok_or_else(|| mismatch(format!("{} expects a number, got {}", site.name, value.type_name())))
}

fn nums2(site: &Site<'_>, args: &[Value]) -> Result<(f64, f64)> {
    Ok((num(site, &args[0])?, num(site, &args[1])?))
}

fn count(site: &Site<'_>, value: &Value) -> Result<usize> {
    Ok(num(site, value)?.max(0.0) as usize)
}

fn text<'v>(site: &Site<'_>, value: &'v Value) -> Result<&'v str> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(mismatch(format!("{} expects a string, got {}", site.name, other.type_name()))),
    }
}

/// 32-bit integer view used by the bitwise operators.
fn int(n: f64) -> i32 {
    n as i64 as i32
}

fn pair(args: Vec<Value>) -> Result<(Value, Value)> {
    let [a, b]: [Value; 2] = args
        .try_into()
        .map_err(|_| syntax("two operands expected"))?;
    Ok((a, b))
}

macro_rules! math {
    ($name:literal, $f:expr) => {
        eager($name, Arity::Exact(1), |_, site, args| {
            Ok(Value::Num(($f)(num(site, &args[0])?)))
        })
    };
}

macro_rules! arith {
    ($name:literal, $f:expr) => {
        eager($name, Arity::Exact(2), |_, site, args| {
            let (a, b) = nums2(site, &args)?;
            Ok(Value::Num(($f)(a, b)))
        })
    };
}

macro_rules! compare {
    ($name:literal, $f:expr) => {
        eager($name, Arity::Exact(2), |_, site, args| {
            let (a, b) = nums2(site, &args)?;
            Ok(Value::Bool(($f)(a, b)))
        })
    };
}

macro_rules! bits {
    ($name:literal, $f:expr) => {
        eager($name, Arity::Exact(2), |_, site, args| {
            let (a, b) = nums2(site, &args)?;
            Ok(Value::Num(($f)(int(a), int(b)) as f64))
        })
    };
}

// ───────────────────────────────────────────────────────────────────────
// Table
// ───────────────────────────────────────────────────────────────────────

fn table() -> Vec<Builtin> {
    use Arity::{Between, Exact, Variadic};

    vec![
        // assignment, control flow, declarations
        form("=", Exact(2), assign),
        form("IN", Exact(2), |_, _, _| Err(syntax("IN outside FOREACH"))),
        form("FOR", Exact(1), for_loop),
        form("FOREACH", Exact(1), for_each),
        form("NEXT", Between(0, 1), next),
        form("GOTO", Exact(1), goto),
        form("GOSUB", Exact(1), gosub),
        form("RETURN", Exact(0), gosub_return),
        form("END", Exact(0), |_, _, _| Ok(Outcome::jump(Pc::END))),
        form("DATA", Variadic, data),
        form("LABEL", Exact(1), label),
        form("READ", Exact(1), read),
        form("INPUT", Between(1, 2), input),
        form("DIM", Variadic, dim),
        // comparison
        eager("==", Exact(2), |_, _, args| Ok(Value::Bool(args[0] == args[1]))),
        eager("<>", Exact(2), |_, _, args| Ok(Value::Bool(args[0] != args[1]))),
        eager("><", Exact(2), |_, _, args| Ok(Value::Bool(args[0] != args[1]))),
        compare!("<", |a: f64, b: f64| a < b),
        compare!(">", |a: f64, b: f64| a > b),
        compare!("<=", |a: f64, b: f64| a <= b),
        compare!("=<", |a: f64, b: f64| a <= b),
        compare!(">=", |a: f64, b: f64| a >= b),
        compare!("=>", |a: f64, b: f64| a >= b),
        // bitwise
        bits!("<<", |a: i32, b: i32| a.wrapping_shl(b as u32)),
        bits!("BAND", |a: i32, b: i32| a & b),
        bits!("BOR", |a: i32, b: i32| a | b),
        bits!("BXOR", |a: i32, b: i32| a ^ b),
        eager(">>", Exact(2), |_, site, args| {
            let (a, b) = nums2(site, &args)?;
            Ok(Value::Num((int(a) as u32).wrapping_shr(int(b) as u32) as f64))
        }),
        math!("UNARYBNOT", |x: f64| !int(x) as f64),
        // arithmetic
        math!("UNARYMINUS", |x: f64| -x),
        math!("UNARYPLUS", |x: f64| x),
        eager("UNARYLOGICNOT", Exact(1), logic_not),
        eager("+", Exact(2), add),
        arith!("-", |a: f64, b: f64| a - b),
        arith!("*", |a: f64, b: f64| a * b),
        eager("/", Exact(2), divide),
        eager("\\", Exact(2), divide),
        eager("MOD", Exact(2), divide),
        eager("^", Exact(2), power),
        arith!("MIN", |a: f64, b: f64| if a > b { b } else { a }),
        arith!("MAX", |a: f64, b: f64| if a < b { b } else { a }),
        eager("AND", Exact(2), logic),
        eager("OR", Exact(2), logic),
        // ranges
        eager("TO", Exact(2), |_, site, args| {
            let (start, end) = nums2(site, &args)?;
            Ok(Value::Generator(Generator::new(start, end, 1.0)))
        }),
        eager("STEP", Exact(2), step),
        // lists
        eager("!", Exact(2), cons),
        eager("~", Exact(2), snoc),
        eager("#", Exact(2), concat),
        eager("LEN", Exact(1), len),
        eager("HEAD", Exact(1), list_part),
        eager("TAIL", Exact(1), list_part),
        eager("INIT", Exact(1), list_part),
        eager("LAST", Exact(1), list_part),
        // functional
        eager("~<", Exact(2), curry_op),
        eager("$", Exact(2), |interp, site, args| {
            let (f, arg) = pair(args)?;
            interp.apply(site.pc, &f, vec![arg])
        }),
        eager(".", Exact(2), compose),
        eager(">>=", Exact(2), bind),
        eager(">>~", Exact(2), then),
        eager("MAP", Exact(2), map),
        eager("FOLD", Exact(3), fold),
        eager("FILTER", Exact(2), filter),
        eager("DO", Variadic, |_, _, mut args| Ok(args.pop().unwrap_or(Value::Null))),
        // monads
        eager("MRET", Exact(1), |_, _, mut args| {
            let value = args.pop().unwrap_or(Value::Null);
            Ok(Value::Monad(Monad::Memo(Box::new(value))))
        }),
        eager("MJOIN", Exact(1), join),
        eager("MLIST", Exact(1), |_, _, args| Ok(Value::Monad(Monad::List(args)))).noprod(),
        // math
        math!("ABS", f64::abs),
        math!("SGN", |x: f64| if x > 0.0 { 1.0 } else if x < 0.0 { -1.0 } else { x }),
        math!("SIN", f64::sin),
        math!("COS", f64::cos),
        math!("TAN", f64::tan),
        math!("EXP", f64::exp),
        math!("ASN", f64::asin),
        math!("ACO", f64::acos),
        math!("ATN", f64::atan),
        math!("SQR", f64::sqrt),
        math!("CBR", f64::cbrt),
        math!("SINH", f64::sinh),
        math!("COSH", f64::cosh),
        math!("TANH", f64::tanh),
        math!("LOG", f64::ln),
        math!("ROUND", |x: f64| (x + 0.5).floor()),
        math!("FLOOR", f64::floor),
        math!("INT", f64::floor),
        math!("CEIL", f64::ceil),
        math!("FIX", f64::trunc),
        eager("RND", Exact(1), rnd),
        // strings
        eager("CHR", Exact(1), chr),
        eager("SPC", Exact(1), |interp, site, args| {
            let n = count(site, &args[0])?;
            reserve(interp, n)?;
            Ok(Value::Str(" ".repeat(n)))
        }),
        eager("LEFT", Exact(2), left),
        eager("MID", Exact(3), mid),
        eager("RIGHT", Exact(2), right),
        // DATA and options
        eager("DGET", Exact(0), |interp, _, _| next_data(interp)),
        eager("RESTORE", Exact(0), |interp, _, _| {
            interp.data_cursor = 0;
            Ok(Value::Null)
        }),
        eager("CLEAR", Exact(0), |interp, _, _| {
            interp.vars.clear();
            Ok(Value::Null)
        }),
        eager("OPTIONBASE", Exact(1), option),
        eager("OPTIONDEBUG", Exact(1), option),
        eager("OPTIONTRACE", Exact(1), option),
        // console
        eager("PRINT", Variadic, print),
        eager("EMIT", Variadic, print),
        eager("CIN", Exact(0), |interp, _, _| {
            Ok(interp.console.read_line().map_or(Value::Null, Value::Str))
        }),
        eager("CLS", Exact(0), |interp, _, _| {
            interp.console.clear();
            Ok(Value::Null)
        }),
        eager("GOTOYX", Exact(2), |interp, site, args| {
            let (y, x) = nums2(site, &args)?;
            let shift = 1 - interp.index_base as i64;
            interp.console.move_cursor(y as i64 + shift, x as i64 + shift);
            Ok(Value::Null)
        }),
        eager("TEXTFORE", Exact(1), text_color),
        eager("TEXTBACK", Exact(1), text_color),
        // memory bus
        eager("PEEK", Exact(1), |interp, site, args| {
            let addr = num(site, &args[0])? as i64;
            interp.bus.peek(addr).map(|b| Value::Num(b.into())).map_err(bad_call)
        }),
        eager("POKE", Exact(2), |interp, site, args| {
            let (addr, byte) = nums2(site, &args)?;
            interp.bus.poke(addr as i64, int(byte) as u8).map_err(bad_call)?;
            Ok(Value::Null)
        }),
        eager("PLOT", Exact(3), |interp, site, args| {
            let (x, y) = nums2(site, &args)?;
            let color = num(site, &args[2])?;
            interp.bus.plot(x as i64, y as i64, int(color) as u8).map_err(bad_call)?;
            Ok(Value::Null)
        }),
        eager("GETKEYSDOWN", Exact(0), keys_down),
        // introspection
        eager("TYPEOF", Exact(1), |_, _, args| Ok(Value::Str(args[0].type_name()))),
        eager("RESOLVE", Exact(1), |interp, _, args| {
            let value = args.into_iter().next().unwrap_or(Value::Null);
            let shown = match &value {
                Value::Closure(c) => format!("{}\n", c.body),
                other => format!("{other}\n"),
            };
            interp.console.print(&shown);
            Ok(value)
        })
        .debug(),
        form("RESOLVEVAR", Exact(1), resolve_var).debug(),
        eager("PRINTMONAD", Exact(1), |interp, site, args| match &args[0] {
            monad @ Value::Monad(_) => {
                interp.console.print(&format!("{monad}\n"));
                Ok(Value::Null)
            }
            other => Err(mismatch(format!("{} expects a monad, got {}", site.name, other.type_name()))),
        })
        .debug(),
    ]
}

// ───────────────────────────────────────────────────────────────────────
// Forms
// ───────────────────────────────────────────────────────────────────────

fn assign(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    let value = interp.eval(site.pc, &args[1])?;
    let place = interp.place(site.pc, &args[0])?;
    interp.store(place, value.clone())?;
    Ok(Outcome::value(value))
}

/// Splits `VAR <op> source` of a FOR or FOREACH header.
fn loop_header<'n>(node: &'n Node, keyword: &str, op: &str) -> Result<(&'n str, &'n Node, &'n Node)> {
    if let Node::Op { op: found, args } = node {
        if found == op {
            if let [target @ Node::Ident(var), source] = args.as_slice() {
                return Ok((var, target, source));
            }
        }
    }
    Err(syntax(format!("{keyword} expects VAR {op} ...")))
}

fn for_loop(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    let (var, target, source) = loop_header(&args[0], "FOR", "=")?;
    let place = interp.place(site.pc, target)?;
    let range = match interp.eval(site.pc, source)? {
        Value::Generator(g) => g,
        other => return Err(mismatch(format!("FOR expects a range made with TO, got {}", other.type_name()))),
    };
    interp.store(place, Value::Num(range.start))?;
    interp.fors.push(ForFrame {
        var: var.to_string(),
        iter: ForIter::Range(range),
        origin: site.pc,
    });
    Ok(Outcome::value(Value::Null))
}

fn for_each(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    let (var, target, source) = loop_header(&args[0], "FOREACH", "IN")?;
    let place = interp.place(site.pc, target)?;
    let source = interp.eval(site.pc, source)?;
    let mut items: VecDeque<Value> = sequence(interp, site, source)?.into();
    interp.store(place, items.pop_front().unwrap_or(Value::Null))?;
    interp.fors.push(ForFrame {
        var: var.to_string(),
        iter: ForIter::Items(items),
        origin: site.pc,
    });
    Ok(Outcome::value(Value::Null))
}

fn next(interp: &mut Interpreter, _site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    let wanted = match args.first() {
        None => None,
        Some(Node::Ident(name)) => Some(name.clone()),
        Some(other) => return Err(syntax(format!("NEXT expects a variable name, got {other}"))),
    };
    let at = match &wanted {
        Some(name) => interp.fors.iter().rposition(|f| &f.var == name),
        None => interp.fors.len().checked_sub(1),
    };
    let Some(at) = at else {
        return Err(ErrorKind::NextWithoutFor(wanted).into());
    };
    // frames above the matching one belong to loops that were left early
    interp.fors.truncate(at + 1);
    let Some(mut frame) = interp.fors.pop() else {
        return Err(ErrorKind::NextWithoutFor(wanted).into());
    };

    let upcoming = match &mut frame.iter {
        ForIter::Range(range) => {
            let from = interp.vars.get(&frame.var).and_then(Value::as_num).unwrap_or(range.current);
            match range.advance(from) {
                Some(n) => Some(Value::Num(n)),
                None => {
                    interp.store(Place::Var(frame.var.clone()), Value::Num(range.current))?;
                    None
                }
            }
        }
        ForIter::Items(items) => items.pop_front(),
    };

    match upcoming {
        Some(value) => {
            interp.store(Place::Var(frame.var.clone()), value)?;
            let resume = frame.origin.next();
            interp.fors.push(frame);
            Ok(Outcome::jump(resume))
        }
        None => Ok(Outcome::value(Value::Null)),
    }
}

fn goto(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    let line = interp.jump_target(site.pc, &args[0])?;
    Ok(Outcome::jump(Pc::new(line, 0)))
}

fn gosub(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    let line = interp.jump_target(site.pc, &args[0])?;
    interp.gosub.push(site.pc.next());
    Ok(Outcome::jump(Pc::new(line, 0)))
}

fn gosub_return(interp: &mut Interpreter, _site: &Site<'_>, _args: &[Node]) -> Result<Outcome> {
    let back = interp.gosub.pop().ok_or(ErrorKind::NoGosubToReturn)?;
    Ok(Outcome::jump(back))
}

fn data(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    if interp.prescan {
        for arg in args {
            let value = interp.eval(site.pc, arg)?;
            interp.data.push(value);
        }
    }
    Ok(Outcome::value(Value::Null))
}

fn label(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    if !interp.prescan {
        return Ok(Outcome::value(Value::Null));
    }
    let Node::Ident(name) = &args[0] else {
        return Err(syntax(format!("LABEL expects a name, got {}", args[0])));
    };
    if interp.labels.contains_key(name) {
        return Err(ErrorKind::DuplicateDefinition(name.clone()).into());
    }
    interp.labels.insert(name.clone(), site.pc.line);
    Ok(Outcome::value(Value::Null))
}

fn next_data(interp: &mut Interpreter) -> Result<Value> {
    let value = interp.data.get(interp.data_cursor).cloned().ok_or(ErrorKind::OutOfData)?;
    interp.data_cursor += 1;
    Ok(value)
}

fn read(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    let place = interp.place(site.pc, &args[0])?;
    let value = next_data(interp)?;
    interp.store(place, value)?;
    Ok(Outcome::value(Value::Null))
}

fn input(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    let Some((target, prompt)) = args.split_last() else {
        return Err(syntax("INPUT expects a variable"));
    };
    let place = interp.place(site.pc, target)?;
    let mut shown = String::new();
    for part in prompt {
        shown.push_str(&interp.eval(site.pc, part)?.to_string());
    }
    shown.push_str("? ");
    interp.console.print(&shown);

    let line = interp
        .console
        .read_line()
        .ok_or_else(|| ErrorKind::Io("end of input".into()))?;
    interp.store(place, Value::from_input(&line))?;
    Ok(Outcome::value(Value::Null))
}

/// `DIM A(3), B(2, 2)` declares; `DIM(3)` just builds an array.
fn dim(interp: &mut Interpreter, site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    if args.is_empty() {
        return Err(syntax("DIM expects at least one size"));
    }
    let declarations: Option<Vec<(&Node, &[Node])>> = args
        .iter()
        .map(|arg| match arg {
            Node::Call { callee, args, .. } if !args.is_empty() => match callee.as_ref() {
                name @ Node::Ident(n) if !is_builtin(n) => Some((name, args.as_slice())),
                _ => None,
            },
            _ => None,
        })
        .collect();

    let Some(declarations) = declarations else {
        let sizes = interp.eval_all(site.pc, args)?;
        return new_array(interp, site, &sizes).map(Outcome::value);
    };
    for (name, sizes) in declarations {
        let place = interp.place(site.pc, name)?;
        let sizes = interp.eval_all(site.pc, sizes)?;
        let array = new_array(interp, site, &sizes)?;
        interp.store(place, array)?;
    }
    Ok(Outcome::value(Value::Null))
}

fn new_array(interp: &Interpreter, site: &Site<'_>, sizes: &[Value]) -> Result<Value> {
    let sizes = sizes
        .iter()
        .map(|s| {
            let n = num(site, s)?;
            if n < 0.0 || n.fract() != 0.0 {
                return Err(bad_call(format!("array size {n} is not a whole number")));
            }
            Ok(n as usize)
        })
        .collect::<Result<Vec<_>>>()?;
    let cells = sizes.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n));
    if cells.is_none_or(|c| c.saturating_mul(8) > interp.free_memory()) {
        return Err(ErrorKind::OutOfMemory.into());
    }

    fn build(sizes: &[usize]) -> Value {
        match sizes {
            [] => Value::Num(0.0),
            [n, rest @ ..] => Value::Array((0..*n).map(|_| build(rest)).collect()),
        }
    }
    Ok(build(&sizes))
}

fn resolve_var(interp: &mut Interpreter, _site: &Site<'_>, args: &[Node]) -> Result<Outcome> {
    let shown = match &args[0] {
        Node::Ident(name) => match interp.vars.get(name) {
            Some(value) => format!("type: {}, value: {value}\n", value.type_name()),
            None => format!("Undefined variable: {name}\n"),
        },
        other => return Err(syntax(format!("RESOLVEVAR expects a variable name, got {other}"))),
    };
    interp.console.print(&shown);
    Ok(Outcome::value(Value::Null))
}

// ───────────────────────────────────────────────────────────────────────
// Eager builtins
// ───────────────────────────────────────────────────────────────────────

/// Fails with `OutOfMemory` unless `bytes` more fit in scratch memory.
fn reserve(interp: &Interpreter, bytes: usize) -> Result<()> {
    if bytes > interp.free_memory() {
        return Err(ErrorKind::OutOfMemory.into());
    }
    Ok(())
}

fn add(interp: &mut Interpreter, _: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    Ok(match (&args[0], &args[1]) {
        (a @ (Value::Num(_) | Value::Bool(_)), b @ (Value::Num(_) | Value::Bool(_))) => {
            Value::Num(a.as_num().unwrap_or_default() + b.as_num().unwrap_or_default())
        }
        (a, b) => {
            let (a, b) = (a.to_string(), b.to_string());
            reserve(interp, a.len() + b.len())?;
            Value::Str(a + &b)
        }
    })
}

/// `/`, `\` and `MOD`, which share the zero check.
fn divide(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let (a, b) = nums2(site, &args)?;
    if b == 0.0 {
        return Err(ErrorKind::DivisionByZero.into());
    }
    Ok(Value::Num(match site.name {
        "\\" => (a / b).trunc(),
        "MOD" => a % b,
        _ => a / b,
    }))
}

fn power(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let (a, b) = nums2(site, &args)?;
    let r = a.powf(b);
    if r.is_nan() {
        return Err(bad_call(format!("{a} ^ {b}")));
    }
    if r.is_infinite() {
        return Err(ErrorKind::DivisionByZero.into());
    }
    Ok(Value::Num(r))
}

fn logic(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match site.name {
            "AND" => *a && *b,
            _ => *a || *b,
        })),
        (a, b) => Err(mismatch(format!(
            "{} expects booleans, got {} and {}",
            site.name,
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn logic_not(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Ok(Value::Bool(num(site, other)? == 0.0)),
    }
}

fn step(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::Generator(g) => Ok(Value::Generator(Generator::new(g.start, g.end, num(site, &args[1])?))),
        other => Err(mismatch(format!("STEP expects a range, got {}", other.type_name()))),
    }
}

fn cons(_: &mut Interpreter, _: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    match pair(args)? {
        (head, Value::Array(mut items)) => {
            items.insert(0, head);
            Ok(Value::Array(items))
        }
        (head, Value::Monad(Monad::List(mut items))) => {
            items.insert(0, head);
            Ok(Value::Monad(Monad::List(items)))
        }
        (_, other) => Err(mismatch(format!("! expects a list on the right, got {}", other.type_name()))),
    }
}

fn snoc(_: &mut Interpreter, _: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    match pair(args)? {
        (Value::Array(mut items), last) => {
            items.push(last);
            Ok(Value::Array(items))
        }
        (Value::Monad(Monad::List(mut items)), last) => {
            items.push(last);
            Ok(Value::Monad(Monad::List(items)))
        }
        (other, _) => Err(mismatch(format!("~ expects a list on the left, got {}", other.type_name()))),
    }
}

fn concat(_: &mut Interpreter, _: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    match pair(args)? {
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (Value::Monad(Monad::List(mut a)), Value::Monad(Monad::List(b))) => {
            a.extend(b);
            Ok(Value::Monad(Monad::List(a)))
        }
        (a, b) => Err(mismatch(format!("# expects two lists, got {} and {}", a.type_name(), b.type_name()))),
    }
}

fn len(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let n = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::Array(items) | Value::Monad(Monad::List(items)) => items.len(),
        Value::Generator(g) => g.len(),
        other => return Err(mismatch(format!("{} of {}", site.name, other.type_name()))),
    };
    Ok(Value::Num(n as f64))
}

/// HEAD, TAIL, INIT and LAST over arrays and strings.
fn list_part(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let empty = |kind: &str| mismatch(format!("{} of an empty {kind}", site.name));
    match &args[0] {
        Value::Array(items) => {
            let (Some(first), Some(last)) = (items.first(), items.last()) else {
                return Err(empty("array"));
            };
            Ok(match site.name {
                "HEAD" => first.clone(),
                "LAST" => last.clone(),
                "TAIL" => Value::Array(items[1..].to_vec()),
                _ => Value::Array(items[..items.len() - 1].to_vec()),
            })
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            if chars.is_empty() {
                return Err(empty("string"));
            }
            let end = chars.len() - 1;
            let picked = match site.name {
                "HEAD" => &chars[..1],
                "LAST" => &chars[end..],
                "TAIL" => &chars[1..],
                _ => &chars[..end],
            };
            Ok(Value::Str(picked.iter().collect()))
        }
        other => Err(mismatch(format!(
            "{} expects an array or a string, got {}",
            site.name,
            other.type_name()
        ))),
    }
}

fn curry_op(_: &mut Interpreter, _: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    match pair(args)? {
        (Value::Closure(f), value) => Ok(Value::Closure(curry(&f, &value))),
        (other, _) => Err(bad_call(format!("left-hand of ~< is not a function: got {}", other.type_name()))),
    }
}

fn chain(value: Value) -> Result<Vec<Closure>> {
    match value {
        Value::Closure(f) => Ok(vec![f]),
        Value::Monad(Monad::FunSeq(fs)) => Ok(fs),
        other => Err(bad_call(format!("{} cannot be composed", other.type_name()))),
    }
}

/// `F . G` runs G first.
fn compose(_: &mut Interpreter, _: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let (f, g) = pair(args)?;
    let mut seq = chain(g)?;
    seq.extend(chain(f)?);
    Ok(Value::Monad(Monad::FunSeq(seq)))
}

fn bind(interp: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let (m, f) = pair(args)?;
    let inner = match m {
        Value::Monad(Monad::Memo(v)) => *v,
        Value::Monad(Monad::List(items)) => Value::Array(items),
        other => return Err(bad_call(format!("left-hand of >>= is not a monad: got {}", other.type_name()))),
    };
    match interp.apply(site.pc, &f, vec![inner])? {
        result @ Value::Monad(_) => Ok(result),
        other => Err(bad_call(format!("function bound by >>= returned {}, not a monad", other.type_name()))),
    }
}

fn then(_: &mut Interpreter, _: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    match pair(args)? {
        (Value::Monad(_), next @ Value::Monad(_)) => Ok(next),
        (a, b) => Err(bad_call(format!(">>~ expects two monads, got {} and {}", a.type_name(), b.type_name()))),
    }
}

fn join(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    match args.into_iter().next() {
        Some(Value::Monad(Monad::Memo(v))) => Ok(*v),
        Some(Value::Monad(Monad::List(items))) => Ok(Value::Array(items)),
        Some(other) => Err(mismatch(format!("{} expects a monad, got {}", site.name, other.type_name()))),
        None => Err(mismatch(format!("{} expects a monad", site.name))),
    }
}

/// Items of anything MAP, FILTER, FOLD and FOREACH can walk.
fn sequence(interp: &Interpreter, site: &Site<'_>, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) | Value::Monad(Monad::List(items)) => Ok(items),
        Value::Generator(g) => {
            if g.len().saturating_mul(8) > interp.free_memory() {
                return Err(ErrorKind::OutOfMemory.into());
            }
            Ok(g.to_values())
        }
        other => Err(syntax(format!("{}: not a mappable type: {}", site.name, other.type_name()))),
    }
}

fn callable(site: &Site<'_>, f: &Value) -> Result<()> {
    match f {
        Value::Closure(_) | Value::Monad(Monad::FunSeq(_)) => Ok(()),
        other => Err(bad_call(format!("{}: first argument is not a function: got {}", site.name, other.type_name()))),
    }
}

fn map(interp: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let (f, source) = pair(args)?;
    callable(site, &f)?;
    let items = sequence(interp, site, source)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(interp.apply(site.pc, &f, vec![item])?);
    }
    Ok(Value::Array(out))
}

fn filter(interp: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let (f, source) = pair(args)?;
    callable(site, &f)?;
    let mut out = Vec::new();
    for item in sequence(interp, site, source)? {
        if interp.apply(site.pc, &f, vec![item.clone()])?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

fn fold(interp: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let [f, init, source]: [Value; 3] = args
        .try_into()
        .map_err(|_| syntax("FOLD expects three arguments"))?;
    callable(site, &f)?;
    let mut acc = init;
    for item in sequence(interp, site, source)? {
        acc = interp.apply(site.pc, &f, vec![acc, item])?;
    }
    Ok(acc)
}

fn rnd(interp: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    if num(site, &args[0])? != 0.0 {
        interp.last_rnd = interp.rng.gen_range(0.0..1.0);
    }
    Ok(Value::Num(interp.last_rnd))
}

fn chr(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let code = num(site, &args[0])?;
    u32::try_from(code as i64)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::Str(c.to_string()))
        .ok_or_else(|| bad_call(format!("CHR({code})")))
}

fn left(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let s = text(site, &args[0])?;
    let n = count(site, &args[1])?;
    Ok(Value::Str(s.chars().take(n).collect()))
}

fn right(_: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let s = text(site, &args[0])?;
    let n = count(site, &args[1])?;
    let skip = s.chars().count().saturating_sub(n);
    Ok(Value::Str(s.chars().skip(skip).collect()))
}

fn mid(interp: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let s = text(site, &args[0])?;
    let start = (num(site, &args[1])? - interp.index_base as f64).max(0.0) as usize;
    let n = count(site, &args[2])?;
    Ok(Value::Str(s.chars().skip(start).take(n).collect()))
}

fn option(interp: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let n = num(site, &args[0])?;
    if n != 0.0 && n != 1.0 {
        return Err(syntax(format!("{} only accepts 0 or 1", site.name)));
    }
    let on = n == 1.0;
    match site.name {
        "OPTIONBASE" => interp.index_base = usize::from(on),
        "OPTIONDEBUG" => interp.debug = on,
        _ => interp.trace = on,
    }
    Ok(Value::Null)
}

/// PRINT and EMIT. EMIT shows numbers as the character with that code.
fn print(interp: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let mut out = String::new();
    for (k, value) in args.iter().enumerate() {
        match value {
            Value::Num(n) if site.name == "EMIT" => {
                out.extend(u32::try_from(*n as i64).ok().and_then(char::from_u32));
            }
            other => out.push_str(&other.to_string()),
        }
        if site.seps.get(k) == Some(&',') {
            out.push('\t');
        }
    }
    if !matches!(args.last(), Some(Value::Null)) {
        out.push('\n');
    }
    interp.console.print(&out);
    Ok(Value::Null)
}

fn text_color(interp: &mut Interpreter, site: &Site<'_>, args: Vec<Value>) -> Result<Value> {
    let color = int(num(site, &args[0])?);
    let layer = if site.name == "TEXTFORE" { 38 } else { 48 };
    interp.console.print(&format!("\x1b[{layer};5;{color}m"));
    Ok(Value::Null)
}

fn keys_down(interp: &mut Interpreter, _: &Site<'_>, _: Vec<Value>) -> Result<Value> {
    interp.bus.poke(-40, 255).map_err(bad_call)?;
    let mut keys = Vec::with_capacity(8);
    for addr in (-48..=-41).rev() {
        keys.push(Value::Num(interp.bus.peek(addr).map_err(bad_call)?.into()));
    }
    Ok(Value::Array(keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemStore, NoBus, ScriptedConsole};
    use crate::model::Config;

    fn interpreter() -> (Interpreter, ScriptedConsole) {
        let console = ScriptedConsole::new();
        let config = Config {
            seed: Some(7),
            debug: true,
            ..Config::default()
        };
        let interp = Interpreter::new(
            config,
            Box::new(console.clone()),
            Box::new(MemStore::new()),
            Box::new(NoBus),
        );
        (interp, console)
    }

    fn value_of(src: &str) -> Value {
        let (mut interp, _) = interpreter();
        interp.immediate(&format!("RESULT = {src}")).unwrap();
        interp.var("RESULT").cloned().unwrap()
    }

    fn num_list(items: &[f64]) -> Value {
        Value::Array(items.iter().copied().map(Value::Num).collect())
    }

    #[test]
    fn test_expression_values() {
        let test_cases = vec![
            ("ABS(-3)", Value::Num(3.0)),
            ("SGN(-0.5)", Value::Num(-1.0)),
            ("ROUND(2.5)", Value::Num(3.0)),
            ("FIX(-2.7)", Value::Num(-2.0)),
            ("INT(-2.7)", Value::Num(-3.0)),
            ("5 BAND 3", Value::Num(1.0)),
            ("1 << 4", Value::Num(16.0)),
            ("-1 >> 28", Value::Num(15.0)),
            ("3 MIN 7", Value::Num(3.0)),
            ("LEFT(\"HELLO\", 2)", Value::Str("HE".into())),
            ("RIGHT(\"HELLO\", 3)", Value::Str("LLO".into())),
            ("MID(\"HELLO\", 1, 3)", Value::Str("ELL".into())),
            ("CHR(65)", Value::Str("A".into())),
            ("\"N=\" + 5", Value::Str("N=5".into())),
            ("HEAD({4, 5, 6})", Value::Num(4.0)),
            ("TAIL({4, 5, 6})", num_list(&[5.0, 6.0])),
            ("INIT(\"ABC\")", Value::Str("AB".into())),
            ("0 ! {1, 2}", num_list(&[0.0, 1.0, 2.0])),
            ("{1} ~ 2", num_list(&[1.0, 2.0])),
            ("{1} # {2, 3}", num_list(&[1.0, 2.0, 3.0])),
            ("LEN(1 TO 10 STEP 3)", Value::Num(4.0)),
            ("MAP([X] ~> X * X, 1 TO 4)", num_list(&[1.0, 4.0, 9.0, 16.0])),
            ("FILTER([X] ~> X MOD 2 == 0, 1 TO 6)", num_list(&[2.0, 4.0, 6.0])),
            ("FOLD([A, X] ~> A + X, 0, {1, 2, 3})", Value::Num(6.0)),
            ("DO(1, 2, 3)", Value::Num(3.0)),
            ("TYPEOF(@1)", Value::Str("value-monad".into())),
            ("TYPEOF(SIN)", Value::Str("usrdefun".into())),
            ("(SQR) $ 16", Value::Num(4.0)),
            ("{1, 2} == {1, 2}", Value::Bool(true)),
        ];

        for (src, expected) in test_cases {
            println!("Testing: {src}");
            assert_eq!(value_of(src), expected);
        }
    }

    #[test]
    fn test_builtin_errors() {
        let test_cases = vec![
            ("5 MOD 0", ErrorKind::DivisionByZero),
            ("0 ^ -1", ErrorKind::DivisionByZero),
            ("\"A\" < 1", ErrorKind::TypeMismatch("< expects a number, got string".into())),
            ("1 AND TRUE", ErrorKind::TypeMismatch("AND expects booleans, got num and bool".into())),
            ("HEAD(NIL)", ErrorKind::TypeMismatch("HEAD of an empty array".into())),
            ("5 ~< 1", ErrorKind::BadFunctionCall("left-hand of ~< is not a function: got num".into())),
            ("@1 >>= [X] ~> X", ErrorKind::BadFunctionCall("function bound by >>= returned num, not a monad".into())),
            ("SIN(1, 2)", ErrorKind::Syntax("SIN: 2 arguments were given".into())),
            ("SPC(10 ^ 15)", ErrorKind::OutOfMemory),
            ("FOLD([A, X] ~> A + A, \"X\", 1 TO 60)", ErrorKind::OutOfMemory),
        ];

        for (src, expected) in test_cases {
            println!("Testing: {src}");
            let (mut interp, _) = interpreter();
            let err = interp.immediate(&format!("R = {src}")).unwrap_err();
            assert_eq!(err.kind, expected);
        }
    }

    #[test]
    fn print_separators() {
        let test_cases = vec![
            ("PRINT 1, 2", "1\t2\n"),
            ("PRINT \"A\"; \"B\"", "AB\n"),
            ("PRINT \"A\";", "A"),
            ("PRINT", "\n"),
            ("EMIT 72; 105", "Hi\n"),
        ];

        for (src, expected) in test_cases {
            println!("Testing: {src}");
            let (mut interp, console) = interpreter();
            interp.immediate(src).unwrap();
            assert_eq!(console.output(), expected);
        }
    }

    #[test]
    fn rnd_zero_repeats() {
        let (mut interp, _) = interpreter();
        interp.immediate("A = RND(1) : B = RND(0) : C = RND(1)").unwrap();
        let a = interp.var("A").cloned().unwrap();
        assert_eq!(interp.var("B"), Some(&a));
        assert!(matches!(a, Value::Num(n) if (0.0..1.0).contains(&n)));
    }

    #[test]
    fn disabled_builtins_are_undefined() {
        let (mut interp, _) = interpreter();
        let err = interp.immediate("X = MLIST(1)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax("MLIST is undefined".into()));

        interp.immediate("OPTIONDEBUG 0").unwrap();
        assert!(interp.immediate("RESOLVE 1").is_err());
    }

    #[test]
    fn wrapped_builtins_take_fixed_arity() {
        assert!(wrap(lookup("SIN").unwrap()).is_some());
        assert!(wrap(lookup("PRINT").unwrap()).is_none());
        assert!(wrap(lookup("GOTO").unwrap()).is_none());
        assert!(is_builtin("FOREACH"));
        assert!(!is_builtin("FOO"));
    }
}
