//! Tree-walking evaluator and the line-numbered program runner.
//!
//! A statement either yields a value or moves the program counter. Jumps
//! are only legal at statement level; `eval` refuses them so that an
//! expression can never leave its line half done.

use std::collections::{BTreeMap, HashMap, VecDeque};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, trace, warn};

use super::ast::{JumpKind, Node};
use super::builtins::{self, Builtin, Imp, Site};
use super::prune::capture;
use super::value::{Closure, Generator, Monad, Value};
use super::parse_statements;
use crate::error::{ErrorKind, Result, bad_call, mismatch, syntax};
use crate::host::{Console, FileStore, MemoryBus};
use crate::model::Config;
use crate::program::Program;

/// Line number immediate-mode input runs under.
pub const IMMEDIATE_LINE: usize = 0;

/// Closure calls grow the native stack by `STACK_GROW_SIZE` once less than
/// `STACK_RED_ZONE` is left, so `recursion_limit` is reached before the
/// thread's stack runs out.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Program counter: line number and statement index within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pc {
    pub line: usize,
    pub stmt: usize,
}

impl Pc {
    /// Past every line; jumping here ends the run.
    pub const END: Pc = Pc {
        line: usize::MAX,
        stmt: 0,
    };

    pub fn new(line: usize, stmt: usize) -> Self {
        Self { line, stmt }
    }

    pub fn next(self) -> Self {
        Self::new(self.line, self.stmt + 1)
    }
}

/// What executing a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: Value,
    pub jump: Option<Pc>,
}

impl Outcome {
    pub fn value(value: Value) -> Self {
        Self { value, jump: None }
    }

    pub fn jump(to: Pc) -> Self {
        Self {
            value: Value::Null,
            jump: Some(to),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ForIter {
    Range(Generator),
    Items(VecDeque<Value>),
}

#[derive(Debug, Clone)]
pub(crate) struct ForFrame {
    pub var: String,
    pub iter: ForIter,
    /// The FOR statement itself; NEXT resumes right after it.
    pub origin: Pc,
}

/// Assignable location.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Place {
    Var(String),
    Element { name: String, path: Vec<usize> },
}

pub struct Interpreter {
    pub config: Config,
    pub(crate) console: Box<dyn Console>,
    pub(crate) files: Box<dyn FileStore>,
    pub(crate) bus: Box<dyn MemoryBus>,

    pub(crate) vars: HashMap<String, Value>,
    pub(crate) labels: HashMap<String, usize>,
    /// Argument frames of the closures being evaluated, innermost last.
    pub(crate) binders: Vec<Box<[Value]>>,
    pub(crate) gosub: Vec<Pc>,
    pub(crate) fors: Vec<ForFrame>,
    pub(crate) data: Vec<Value>,
    pub(crate) data_cursor: usize,

    pub(crate) index_base: usize,
    pub(crate) rng: StdRng,
    pub(crate) last_rnd: f64,
    pub(crate) trace: bool,
    pub(crate) debug: bool,
    /// Set while DATA and LABEL statements are collected before a run.
    pub(crate) prescan: bool,
    call_depth: usize,
    program_footprint: usize,
}

impl Interpreter {
    pub fn new(
        config: Config,
        console: Box<dyn Console>,
        files: Box<dyn FileStore>,
        bus: Box<dyn MemoryBus>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            trace: config.trace,
            debug: config.debug,
            config,
            console,
            files,
            bus,
            vars: HashMap::new(),
            labels: HashMap::new(),
            binders: Vec::new(),
            gosub: Vec::new(),
            fors: Vec::new(),
            data: Vec::new(),
            data_cursor: 0,
            index_base: 0,
            rng,
            last_rnd: 0.0,
            prescan: false,
            call_depth: 0,
            program_footprint: 0,
        }
    }

    // ── Session state ────────────────────────────────────────────────

    /// Forgets variables, labels, DATA and every stack.
    pub fn reset(&mut self) {
        self.vars.clear();
        self.labels.clear();
        self.data.clear();
        self.data_cursor = 0;
        self.index_base = 0;
        self.unwind();
    }

    /// Drops the control stacks after an error or a break.
    pub fn unwind(&mut self) {
        self.binders.clear();
        self.gosub.clear();
        self.fors.clear();
        self.call_depth = 0;
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(&name.to_ascii_uppercase())
    }

    pub fn console(&mut self) -> &mut dyn Console {
        self.console.as_mut()
    }

    pub fn files(&mut self) -> &mut dyn FileStore {
        self.files.as_mut()
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace
    }

    pub fn set_trace(&mut self, on: bool) {
        self.trace = on;
    }

    pub fn set_program_footprint(&mut self, bytes: usize) {
        self.program_footprint = bytes;
    }

    pub fn used_memory(&self) -> usize {
        self.program_footprint + self.vars.values().map(Value::footprint).sum::<usize>()
    }

    pub fn free_memory(&self) -> usize {
        self.config.scratch_memory.saturating_sub(self.used_memory())
    }

    // ── Running ──────────────────────────────────────────────────────

    /// RUN: parses every line, collects DATA and labels, then executes from
    /// the lowest line. Parse errors abort before anything runs.
    pub fn run(&mut self, program: &Program) -> Result<()> {
        self.reset();
        self.program_footprint = program.footprint();

        let mut parsed = BTreeMap::new();
        for (line, text) in program.lines() {
            let stmts = parse_statements(line, text)?;
            if self.debug {
                trace!(line, ?stmts, "parsed");
            }
            parsed.insert(line, stmts);
        }
        debug!(lines = parsed.len(), "program parsed");

        self.prescan = true;
        let scanned = self.collect_data_and_labels(&parsed);
        self.prescan = false;
        scanned?;
        debug!(data = self.data.len(), labels = self.labels.len(), "prescan done");

        let result = self.run_from(&parsed, Pc::new(1, 0));
        if result.is_err() {
            self.unwind();
        }
        debug!(ok = result.is_ok(), "program finished");
        result
    }

    fn collect_data_and_labels(&mut self, parsed: &BTreeMap<usize, Vec<Node>>) -> Result<()> {
        for (&line, stmts) in parsed {
            for (k, stmt) in stmts.iter().enumerate() {
                if matches!(stmt.callee_name(), Some("DATA" | "LABEL")) {
                    self.execute(Pc::new(line, k), stmt)?;
                }
            }
        }
        Ok(())
    }

    fn run_from(&mut self, parsed: &BTreeMap<usize, Vec<Node>>, start: Pc) -> Result<()> {
        let mut pc = start;
        while pc.line < Pc::END.line {
            let Some((&line, stmts)) = parsed.range(pc.line..Pc::END.line).next() else {
                break;
            };
            if line != pc.line {
                pc = Pc::new(line, 0);
            }
            let Some(stmt) = stmts.get(pc.stmt) else {
                pc = Pc::new(line + 1, 0);
                continue;
            };

            if self.trace {
                info!(line = pc.line, stmt = pc.stmt, "TRON");
            }
            let (_, next) = self.execute(pc, stmt)?;
            pc = next;

            if self.console.terminate_requested() {
                warn!(line, "program interrupted");
                self.console.print(&format!("Break in {line}\n"));
                self.unwind();
                break;
            }
        }
        Ok(())
    }

    /// Runs one line typed without a line number. Errors carry no line.
    pub fn immediate(&mut self, src: &str) -> Result<()> {
        let result = self.immediate_line(src);
        if result.is_err() {
            self.unwind();
        }
        result.map_err(|e| e.without_line())
    }

    fn immediate_line(&mut self, src: &str) -> Result<()> {
        let stmts = parse_statements(IMMEDIATE_LINE, src)?;
        let mut pc = Pc::new(IMMEDIATE_LINE, 0);
        while let Some(stmt) = stmts.get(pc.stmt) {
            let (_, next) = self.execute(pc, stmt)?;
            if next.line != IMMEDIATE_LINE {
                break;
            }
            pc = next;
        }
        Ok(())
    }

    /// Executes one statement and reports where control goes next.
    pub fn execute(&mut self, pc: Pc, node: &Node) -> Result<(Value, Pc)> {
        let outcome = self.exec(pc, node).map_err(|e| e.or_line(pc.line))?;
        Ok((outcome.value, outcome.jump.unwrap_or(pc.next())))
    }

    // ── Evaluation ───────────────────────────────────────────────────

    pub(crate) fn exec(&mut self, pc: Pc, node: &Node) -> Result<Outcome> {
        match node {
            Node::If { cond, then, otherwise } => {
                if self.eval(pc, cond)?.is_truthy() {
                    self.exec(pc, then)
                } else if let Some(otherwise) = otherwise {
                    self.exec(pc, otherwise)
                } else {
                    Ok(Outcome::value(Value::Null))
                }
            }
            Node::On { test, jump, targets } => self.on_jump(pc, test, *jump, targets),
            Node::Op { op, args } => self.apply_builtin(pc, op, args, &[]),
            Node::Call { callee, args, seps } => self.call(pc, callee, args, seps),
            other => self.eval(pc, other).map(Outcome::value),
        }
    }

    pub(crate) fn eval(&mut self, pc: Pc, node: &Node) -> Result<Value> {
        match node {
            Node::Null => Ok(Value::Null),
            Node::Num(n) => Ok(Value::Num(*n)),
            Node::Str(s) => Ok(Value::Str(s.clone())),
            Node::Bool(b) => Ok(Value::Bool(*b)),
            Node::Const(v) => Ok(v.clone()),
            Node::Ident(name) => self.resolve(name),
            Node::ArgRef { depth, index } => self.arg(*depth, *index),
            Node::Array(items) => self.eval_all(pc, items).map(Value::Array),
            Node::Lambda { params, body } => Ok(Value::Closure(Closure {
                params: params.clone(),
                body: capture(body, &self.binders),
            })),
            Node::Tuple(names) => Err(syntax(format!("[{}] is not followed by ~>", names.join(", ")))),
            Node::Defun { name, .. } => Err(syntax(format!("DEFUN {name} inside an expression"))),
            Node::If { .. } | Node::On { .. } | Node::Op { .. } | Node::Call { .. } => {
                let outcome = self.exec(pc, node)?;
                if outcome.jump.is_some() {
                    return Err(syntax("jump inside an expression"));
                }
                Ok(outcome.value)
            }
        }
    }

    pub(crate) fn eval_all(&mut self, pc: Pc, nodes: &[Node]) -> Result<Vec<Value>> {
        nodes.iter().map(|n| self.eval(pc, n)).collect()
    }

    fn arg(&self, depth: usize, index: usize) -> Result<Value> {
        self.binders
            .len()
            .checked_sub(depth + 1)
            .and_then(|at| self.binders[at].get(index))
            .cloned()
            .ok_or_else(|| ErrorKind::UnresolvedReference(format!("#{depth}.{index}")).into())
    }

    fn enabled(&self, builtin: &Builtin) -> bool {
        !(builtin.debug_only && !self.debug) && !(builtin.not_production && self.config.production)
    }

    /// Identifier as a value: constant, builtin wrapped as a closure, then
    /// variable.
    fn resolve(&self, name: &str) -> Result<Value> {
        if let Some(value) = builtins::constant(name) {
            return Ok(value);
        }
        let builtin = builtins::lookup(name).filter(|b| self.enabled(b));
        if let Some(closure) = builtin.and_then(builtins::wrap) {
            return Ok(Value::Closure(closure));
        }
        if let Some(value) = self.vars.get(name) {
            return Ok(value.clone());
        }
        match builtin {
            Some(_) => Err(bad_call(format!("{name} cannot be used as a value"))),
            None => Err(ErrorKind::UnresolvedReference(name.to_string()).into()),
        }
    }

    fn apply_builtin(&mut self, pc: Pc, name: &str, args: &[Node], seps: &[char]) -> Result<Outcome> {
        let builtin = builtins::lookup(name)
            .filter(|b| self.enabled(b))
            .ok_or_else(|| syntax(format!("{name} is undefined")))?;
        let site = Site {
            pc,
            name: builtin.name,
            seps,
        };
        match builtin.imp {
            Imp::Form(form) => {
                builtin.check_arity(args.len())?;
                form(self, &site, args)
            }
            Imp::Eager(eager) => {
                let values = self.eval_all(pc, args)?;
                builtin.check_arity(values.len())?;
                eager(self, &site, values).map(Outcome::value)
            }
        }
    }

    fn call(&mut self, pc: Pc, callee: &Node, args: &[Node], seps: &[char]) -> Result<Outcome> {
        let Node::Ident(name) = callee else {
            let target = self.eval(pc, callee)?;
            let values = self.eval_all(pc, args)?;
            return self.call_value(pc, &callee.to_string(), target, values).map(Outcome::value);
        };
        if builtins::lookup(name).is_some() {
            return self.apply_builtin(pc, name, args, seps);
        }

        let values = self.eval_all(pc, args)?;
        // index in place rather than cloning the whole array
        if let Some(Value::Array(items)) = self.vars.get(name) {
            return index_array(name, items, &values, self.index_base).map(Outcome::value);
        }
        let target = builtins::constant(name)
            .or_else(|| self.vars.get(name).cloned())
            .ok_or_else(|| syntax(format!("{name} is undefined")))?;
        self.call_value(pc, name, target, values).map(Outcome::value)
    }

    fn call_value(&mut self, pc: Pc, label: &str, target: Value, values: Vec<Value>) -> Result<Value> {
        match target {
            Value::Array(items) => index_array(label, &items, &values, self.index_base),
            Value::Closure(closure) => self.call_closure(pc, &closure, values),
            Value::Monad(Monad::FunSeq(chain)) => self.run_chain(pc, &chain, values),
            Value::Monad(Monad::Memo(v)) => Ok(*v),
            Value::Monad(Monad::List(items)) => Ok(Value::Array(items)),
            other if values.is_empty() => Ok(other),
            _ => Err(syntax(format!("{label} is not a function or an array"))),
        }
    }

    pub(crate) fn call_closure(&mut self, pc: Pc, closure: &Closure, args: Vec<Value>) -> Result<Value> {
        let limit = self.config.recursion_limit;
        if self.call_depth >= limit {
            return Err(ErrorKind::RecursionLimit(limit).into());
        }
        if self.debug {
            trace!(params = ?closure.params, args = args.len(), depth = self.call_depth, "closure call");
        }
        self.call_depth += 1;
        self.binders.push(args.into_boxed_slice());
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval(pc, &closure.body));
        self.binders.pop();
        self.call_depth -= 1;
        result
    }

    fn run_chain(&mut self, pc: Pc, chain: &[Closure], args: Vec<Value>) -> Result<Value> {
        let mut value = args.into_iter().next().unwrap_or(Value::Null);
        for f in chain {
            value = self.call_closure(pc, f, vec![value])?;
        }
        Ok(value)
    }

    /// Applies anything callable to already evaluated arguments.
    pub(crate) fn apply(&mut self, pc: Pc, f: &Value, args: Vec<Value>) -> Result<Value> {
        match f {
            Value::Closure(closure) => self.call_closure(pc, closure, args),
            Value::Monad(Monad::FunSeq(chain)) => self.run_chain(pc, chain, args),
            other => Err(bad_call(format!("{} is not a function", other.type_name()))),
        }
    }

    // ── Jumps ────────────────────────────────────────────────────────

    /// Line number a GOTO/GOSUB operand names, either a label or a number.
    pub(crate) fn jump_target(&mut self, pc: Pc, target: &Node) -> Result<usize> {
        if let Node::Ident(name) = target {
            if let Some(&line) = self.labels.get(name) {
                return Ok(line);
            }
        }
        let value = self.eval(pc, target)?;
        let n = value
            .as_num()
            .ok_or_else(|| mismatch(format!("line number expected, got {}", value.type_name())))?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(syntax(format!("{n} is not a line number")));
        }
        Ok(n as usize)
    }

    fn on_jump(&mut self, pc: Pc, test: &Node, jump: JumpKind, targets: &[Node]) -> Result<Outcome> {
        let value = self.eval(pc, test)?;
        let n = value
            .as_num()
            .ok_or_else(|| mismatch(format!("ON needs a number, got {}", value.type_name())))?;
        let slot = n - self.index_base as f64;
        if slot < 0.0 || slot.fract() != 0.0 || slot as usize >= targets.len() {
            return Ok(Outcome::value(Value::Null));
        }
        let line = self.jump_target(pc, &targets[slot as usize])?;
        if jump == JumpKind::Gosub {
            self.gosub.push(pc.next());
        }
        Ok(Outcome::jump(Pc::new(line, 0)))
    }

    // ── Places ───────────────────────────────────────────────────────

    pub(crate) fn place(&mut self, pc: Pc, target: &Node) -> Result<Place> {
        let (name, indices) = match target {
            Node::Ident(name) => (name, &[][..]),
            Node::Call { callee, args, .. } => match callee.as_ref() {
                Node::Ident(name) => (name, args.as_slice()),
                _ => return Err(syntax(format!("cannot assign to {target}"))),
            },
            Node::ArgRef { .. } => return Err(syntax("cannot assign to a function parameter")),
            Node::Bool(b) => {
                let name = if *b { "TRUE" } else { "FALSE" };
                return Err(ErrorKind::AssignmentToConstant(name.into()).into());
            }
            _ => return Err(syntax(format!("cannot assign to {target}"))),
        };
        if builtins::constant(name).is_some() {
            return Err(ErrorKind::AssignmentToConstant(name.clone()).into());
        }
        if builtins::is_builtin(name) {
            return Err(syntax(format!("{name} is a builtin")));
        }
        if indices.is_empty() {
            return Ok(Place::Var(name.clone()));
        }

        let indices = self.eval_all(pc, indices)?;
        let Some(Value::Array(items)) = self.vars.get(name) else {
            return Err(mismatch(format!("{name} is not an array")));
        };
        let path = element_path(name, items, &indices, self.index_base)?;
        Ok(Place::Element {
            name: name.clone(),
            path,
        })
    }

    pub(crate) fn store(&mut self, place: Place, value: Value) -> Result<()> {
        match place {
            Place::Var(name) => {
                let old = self.vars.get(&name).map_or(0, Value::footprint);
                if self.used_memory() - old + value.footprint() > self.config.scratch_memory {
                    return Err(ErrorKind::OutOfMemory.into());
                }
                self.vars.insert(name, value);
            }
            Place::Element { name, path } => {
                let Some(Value::Array(items)) = self.vars.get_mut(&name) else {
                    return Err(mismatch(format!("{name} is not an array")));
                };
                if !write_element(items, &path, value) {
                    return Err(mismatch(format!("{name} has fewer dimensions than subscripts")));
                }
            }
        }
        Ok(())
    }
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Validates `indices` against the nested array and returns the zero-based
/// path to the element.
fn element_path(name: &str, items: &[Value], indices: &[Value], base: usize) -> Result<Vec<usize>> {
    let mut level = items;
    let mut path = Vec::with_capacity(indices.len());
    for (dim, index) in indices.iter().enumerate() {
        let n = index
            .as_num()
            .ok_or_else(|| mismatch(format!("subscript of {name} must be a number")))?;
        let at = n - base as f64;
        if at < 0.0 || at.fract() != 0.0 || at as usize >= level.len() {
            return Err(ErrorKind::SubscriptOutOfRange {
                array: format!("{name} ({} dim)", ordinal(dim + 1)),
                index: at as i64,
                len: level.len(),
            }
            .into());
        }
        let at = at as usize;
        path.push(at);
        if dim + 1 < indices.len() {
            match &level[at] {
                Value::Array(inner) => level = inner,
                _ => return Err(mismatch(format!("too many subscripts for {name}"))),
            }
        }
    }
    Ok(path)
}

fn index_array(name: &str, items: &[Value], indices: &[Value], base: usize) -> Result<Value> {
    let path = element_path(name, items, indices, base)?;
    let Some((&last, outer)) = path.split_last() else {
        return Ok(Value::Array(items.to_vec()));
    };
    let mut level = items;
    for &at in outer {
        if let Value::Array(inner) = &level[at] {
            level = inner;
        }
    }
    Ok(level[last].clone())
}

fn write_element(items: &mut [Value], path: &[usize], value: Value) -> bool {
    match path {
        [] => false,
        [last] => {
            items[*last] = value;
            true
        }
        [first, rest @ ..] => match &mut items[*first] {
            Value::Array(inner) => write_element(inner, rest, value),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemStore, NoBus, ScriptedConsole};

    fn interpreter() -> (Interpreter, ScriptedConsole) {
        let console = ScriptedConsole::new();
        let config = Config {
            seed: Some(1),
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

    #[test]
    fn test_immediate_expressions() {
        let test_cases = vec![
            ("A = 2 + 3 * 4", "A", Value::Num(14.0)),
            ("A = (2 + 3) * 4", "A", Value::Num(20.0)),
            ("A = 2 ^ 3 ^ 2", "A", Value::Num(512.0)),
            ("A = 10 - 4 - 3", "A", Value::Num(3.0)),
            ("S = \"AB\" + \"CD\"", "S", Value::Str("ABCD".into())),
            ("B = 1 < 2 AND 3 > 2", "B", Value::Bool(true)),
            ("B = NOT 0", "B", Value::Bool(true)),
            ("L = LEN({1, 2, 3})", "L", Value::Num(3.0)),
            ("X = 7 \\ 2", "X", Value::Num(3.0)),
            ("X = -7 MOD 3", "X", Value::Num(-1.0)),
            ("X = IF 1 > 2 THEN 10 ELSE 20", "X", Value::Num(20.0)),
        ];

        for (src, var, expected) in test_cases {
            println!("Testing: {src}");
            let (mut interp, _) = interpreter();
            interp.immediate(src).unwrap();
            assert_eq!(interp.var(var), Some(&expected));
        }
    }

    #[test]
    fn test_element_paths() {
        let (mut interp, _) = interpreter();
        interp.immediate("DIM A(2, 3) : A(1, 2) = 9").unwrap();
        interp.immediate("X = A(1, 2)").unwrap();
        assert_eq!(interp.var("X"), Some(&Value::Num(9.0)));

        let err = interp.immediate("X = A(2, 0)").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::SubscriptOutOfRange {
                array: "A (1st dim)".into(),
                index: 2,
                len: 2
            }
        );
        assert_eq!(err.line, None);
    }

    #[test]
    fn test_assignment_guards() {
        let test_cases = vec![
            ("PI = 3", ErrorKind::AssignmentToConstant("PI".into())),
            ("TRUE = 1", ErrorKind::AssignmentToConstant("TRUE".into())),
            ("false = 0", ErrorKind::AssignmentToConstant("FALSE".into())),
            ("Y = UNKNOWN + 1", ErrorKind::UnresolvedReference("UNKNOWN".into())),
            ("Y = 1 / 0", ErrorKind::DivisionByZero),
        ];

        for (src, expected) in test_cases {
            println!("Testing: {src}");
            let (mut interp, _) = interpreter();
            assert_eq!(interp.immediate(src).unwrap_err().kind, expected);
        }
    }

    #[test]
    fn jumps_are_rejected_inside_expressions() {
        let (mut interp, _) = interpreter();
        let err = interp.immediate("X = 1 + GOTO(10)").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Syntax(_)), "{err}");
    }

    #[test]
    fn ordinals() {
        let test_cases = vec![(1, "1st"), (2, "2nd"), (3, "3rd"), (4, "4th"), (11, "11th"), (22, "22nd")];
        for (n, expected) in test_cases {
            assert_eq!(ordinal(n), expected);
        }
    }
}
