//! The interactive surface: numbered lines edit the program, a leading
//! command word runs a command, anything else runs at once.

use tracing::{debug, warn};

use crate::error::{Error, ErrorKind, Result, syntax};
use crate::model::VERSION;
use crate::processor::Interpreter;
use crate::program::{Program, split_numbered};

const LOAD_WARNING: &str = "Unsaved program will be lost, are you sure? (type 'yes' to confirm)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    List,
    New,
    Renum,
    Delete,
    Save,
    Load,
    Fre,
    Tron,
    Troff,
    Cls,
    System,
    Catalog,
    Yes,
}

impl Command {
    fn parse(word: &str) -> Option<Self> {
        Some(match word.to_ascii_uppercase().as_str() {
            "RUN" => Command::Run,
            "LIST" => Command::List,
            "NEW" => Command::New,
            "RENUM" => Command::Renum,
            "DELETE" => Command::Delete,
            "SAVE" => Command::Save,
            "LOAD" => Command::Load,
            "FRE" => Command::Fre,
            "TRON" => Command::Tron,
            "TROFF" => Command::Troff,
            "CLS" => Command::Cls,
            "SYSTEM" => Command::System,
            "CATALOG" => Command::Catalog,
            "YES" => Command::Yes,
            _ => return None,
        })
    }
}

/// LIST and DELETE arguments: `[start] [end]`, space or comma separated.
/// `.` stands for `last`, the highest stored line.
fn line_range(arg: &str, last: usize) -> Result<(usize, usize)> {
    let number = |s: &str| match s {
        "." => Ok(last),
        s => s.parse::<usize>().map_err(|_| syntax(format!("bad line number \"{s}\""))),
    };
    let parts: Vec<&str> = arg
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect();
    match parts.as_slice() {
        [] => Ok((0, usize::MAX)),
        [only] => {
            let n = number(only)?;
            Ok((n, n))
        }
        [from, to] => Ok((number(from)?, number(to)?)),
        _ => Err(syntax(format!("bad line range \"{arg}\""))),
    }
}

fn save_name(path: &str) -> String {
    if path.to_ascii_lowercase().ends_with(".bas") {
        path.to_string()
    } else {
        format!("{path}.bas")
    }
}

pub struct Repl {
    interp: Interpreter,
    program: Program,
    /// Command waiting for YES.
    pending: Option<String>,
    done: bool,
}

impl Repl {
    pub fn new(interp: Interpreter) -> Self {
        Self {
            interp,
            program: Program::new(),
            pending: None,
            done: false,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn set_program(&mut self, program: Program) {
        self.interp.set_program_footprint(program.footprint());
        self.program = program;
    }

    pub fn run_program(&mut self) -> Result<()> {
        self.interp.run(&self.program)
    }

    fn say(&mut self, text: &str) {
        self.interp.console().print(text);
    }

    pub fn banner(&mut self) {
        let free = self.interp.free_memory();
        self.say(&format!("Terran BASIC {VERSION}\n{free} bytes free\nOk\n"));
    }

    /// Reads and handles lines until SYSTEM or end of input.
    pub fn run_loop(&mut self) {
        while !self.done {
            let Some(line) = self.interp.console().read_line() else {
                break;
            };
            self.handle_line(&line);
        }
        debug!("leaving the REPL");
    }

    /// Handles one input line, printing errors and the `Ok` prompt.
    pub fn handle_line(&mut self, input: &str) {
        match self.execute(input) {
            Ok(true) => {}
            Ok(false) => self.say("Ok\n"),
            Err(err) => {
                warn!(%err, "input failed");
                self.report(&err);
            }
        }
    }

    /// Prints an error the way the prompt shows it.
    pub fn report(&mut self, err: &Error) {
        self.say(&format!("{err}\nOk\n"));
    }

    /// Returns whether the input edited the program rather than ran.
    pub fn execute(&mut self, input: &str) -> Result<bool> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(true);
        }
        if let Some((number, text)) = split_numbered(input) {
            self.edit_line(number, text)?;
            return Ok(true);
        }

        let (word, arg) = input.split_once(char::is_whitespace).unwrap_or((input, ""));
        match Command::parse(word) {
            Some(command) => self.command(command, arg.trim(), input, false)?,
            None => self.interp.immediate(input)?,
        }
        Ok(false)
    }

    fn edit_line(&mut self, number: usize, text: &str) -> Result<()> {
        if text.is_empty() {
            self.program.remove_line(number);
        } else {
            let previous = self.program.get(number).map(str::to_string);
            self.program.set_line(number, text);
            self.interp.set_program_footprint(self.program.footprint());
            if self.interp.used_memory() > self.interp.config.scratch_memory {
                match previous {
                    Some(old) => self.program.set_line(number, &old),
                    None => {
                        self.program.remove_line(number);
                    }
                }
                self.interp.set_program_footprint(self.program.footprint());
                return Err(ErrorKind::OutOfMemory.into());
            }
        }
        self.interp.set_program_footprint(self.program.footprint());
        Ok(())
    }

    fn command(&mut self, command: Command, arg: &str, input: &str, confirmed: bool) -> Result<()> {
        debug!(?command, arg, "command");
        match command {
            Command::Run => self.run_program()?,
            Command::List => {
                let (from, to) = line_range(arg, self.program.last_line())?;
                let listing = self.program.listing(from, to);
                self.say(&listing);
            }
            Command::New => {
                self.program.clear();
                self.interp.reset();
                self.interp.set_program_footprint(0);
            }
            Command::Renum => self.program.renumber(),
            Command::Delete => {
                if arg.is_empty() {
                    return Err(syntax("DELETE expects a line range"));
                }
                let (from, to) = line_range(arg, self.program.last_line())?;
                self.program.delete_range(from, to);
                self.interp.set_program_footprint(self.program.footprint());
            }
            Command::Save => {
                if arg.is_empty() {
                    return Err(syntax("SAVE expects a file name"));
                }
                let text = self.program.to_text();
                self.interp.files().write(&save_name(arg), &text)?;
                self.program.mark_saved();
            }
            Command::Load => {
                if arg.is_empty() {
                    return Err(syntax("LOAD expects a file name"));
                }
                if self.program.is_dirty() && !confirmed {
                    self.pending = Some(input.to_string());
                    self.say(&format!("{LOAD_WARNING}\n"));
                    return Ok(());
                }
                self.load(arg)?;
            }
            Command::Fre => {
                let free = self.interp.free_memory();
                self.say(&format!("{free} bytes free\n"));
            }
            Command::Tron => self.interp.set_trace(true),
            Command::Troff => self.interp.set_trace(false),
            Command::Cls => self.interp.console().clear(),
            Command::System => self.done = true,
            Command::Catalog => {
                let names = self
                    .interp
                    .files()
                    .list(arg)?
                    .ok_or_else(|| ErrorKind::NoSuchFile(arg.to_string()))?;
                let mut out = String::new();
                for name in names {
                    out.push_str(&name);
                    out.push('\n');
                }
                self.say(&out);
            }
            Command::Yes => {
                let pending = self.pending.take().ok_or_else(|| syntax("nothing to confirm!"))?;
                let (word, arg) = pending.split_once(char::is_whitespace).unwrap_or((pending.as_str(), ""));
                if let Some(command) = Command::parse(word) {
                    self.command(command, arg.trim(), &pending, true)?;
                }
            }
        }
        Ok(())
    }

    fn load(&mut self, path: &str) -> Result<()> {
        for candidate in [path.to_string(), format!("{path}.BAS"), format!("{path}.bas")] {
            if let Some(text) = self.interp.files().read(&candidate)? {
                let program = Program::from_text(&text)?;
                debug!(file = %candidate, lines = program.len(), "program loaded");
                self.interp.reset();
                self.set_program(program);
                return Ok(());
            }
        }
        Err(ErrorKind::NoSuchFile(path.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_ranges() {
        let test_cases = vec![
            ("", Some((0, usize::MAX))),
            ("20", Some((20, 20))),
            ("10 30", Some((10, 30))),
            ("10,30", Some((10, 30))),
            ("20 .", Some((20, 90))),
            (".", Some((90, 90))),
            ("X", None),
            ("10-30", None),
            ("1 2 3", None),
        ];

        for (arg, expected) in test_cases {
            println!("Testing: {arg}");
            assert_eq!(line_range(arg, 90).ok(), expected);
        }
    }

    #[test]
    fn save_names_get_an_extension() {
        let test_cases = vec![("GAME", "GAME.bas"), ("game.BAS", "game.BAS"), ("x.bas", "x.bas")];
        for (path, expected) in test_cases {
            assert_eq!(save_name(path), expected);
        }
    }

    #[test]
    fn command_words_ignore_case() {
        assert_eq!(Command::parse("list"), Some(Command::List));
        assert_eq!(Command::parse("Renum"), Some(Command::Renum));
        assert_eq!(Command::parse("PRINT"), None);
    }
}
