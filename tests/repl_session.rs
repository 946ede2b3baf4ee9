use tbas::host::{MemStore, NoBus, ScriptedConsole};
use tbas::model::Config;
use tbas::processor::Interpreter;
use tbas::repl::Repl;

struct Session {
    repl: Repl,
    console: ScriptedConsole,
    files: MemStore,
}

impl Session {
    fn new() -> Self {
        let console = ScriptedConsole::new();
        let files = MemStore::new();
        let config = Config {
            seed: Some(7),
            ..Config::default()
        };
        let interp = Interpreter::new(config, Box::new(console.clone()), Box::new(files.clone()), Box::new(NoBus));
        Self {
            repl: Repl::new(interp),
            console,
            files,
        }
    }

    /// Feeds each line and returns everything printed in response.
    fn feed(&mut self, lines: &[&str]) -> String {
        for line in lines {
            self.repl.handle_line(line);
        }
        self.console.take_output()
    }
}

#[test]
fn session_transcripts() {
    let test_cases = vec![
        (vec!["20 PRINT 2", "10 PRINT 1", "LIST"], " 10 PRINT 1\n 20 PRINT 2\nOk\n"),
        (vec!["20 PRINT 2", "10 PRINT 1", "RUN"], "1\n2\nOk\n"),
        (vec!["10 PRINT 1", "20 PRINT 2", "10", "LIST"], " 20 PRINT 2\nOk\n"),
        (vec!["10 PRINT 1", "20 PRINT 2", "30 END", "LIST 20 ."], " 20 PRINT 2\n 30 END\nOk\n"),
        (vec!["10 PRINT 1", "20 PRINT 2", "30 END", "LIST 10 20"], " 10 PRINT 1\n 20 PRINT 2\nOk\n"),
        (vec!["10 PRINT 1", "20 PRINT 2", "30 END", "LIST 20"], " 20 PRINT 2\nOk\n"),
        (vec!["10 PRINT 1", "20 PRINT 2", "LIST 20 10"], "Ok\n"),
        (
            vec!["10 A = 1", "20 B = 2", "30 C = 3", "DELETE 10 20", "LIST"],
            "Ok\n 30 C = 3\nOk\n",
        ),
        (
            vec!["10 A = 1", "20 B = 2", "30 C = 3", "DELETE 20,.", "LIST"],
            "Ok\n 10 A = 1\nOk\n",
        ),
        (vec!["5 GOTO 7", "7 END", "RENUM", "LIST"], "Ok\n 10 GOTO 20\n 20 END\nOk\n"),
        (vec!["A = 6 * 7", "PRINT A"], "Ok\n42\nOk\n"),
        (vec!["FOR I = 1 TO 3 : PRINT I : NEXT"], "1\n2\n3\nOk\n"),
        (vec!["PRINT 1/0"], "Division by zero\nOk\n"),
        (vec!["10 PRINT 1/0", "RUN"], "Division by zero in 10\nOk\n"),
        (vec!["10 PRINT 1", "NEW", "LIST"], "Ok\nOk\n"),
        (vec!["LOAD nope"], "No such file: nope\nOk\n"),
        (vec!["YES"], "Syntax error: nothing to confirm!\nOk\n"),
        (vec!["DELETE"], "Syntax error: DELETE expects a line range\nOk\n"),
        (vec!["", "   "], ""),
    ];

    for (lines, expected) in test_cases {
        println!("Testing: {lines:?}");
        let mut session = Session::new();
        assert_eq!(session.feed(&lines), expected);
    }
}

#[test]
fn save_then_load_round_trip() {
    let mut session = Session::new();
    session.feed(&["10 PRINT \"HELLO\"", "20 END", "SAVE prog"]);
    assert_eq!(session.files.get("prog.bas").as_deref(), Some("10 PRINT \"HELLO\"\n20 END\n"));
    assert!(!session.repl.program().is_dirty());

    session.feed(&["NEW"]);
    assert!(session.repl.program().is_empty());

    let output = session.feed(&["LOAD prog", "RUN"]);
    assert_eq!(output, "Ok\nHELLO\nOk\n");
    assert_eq!(session.repl.program().len(), 2);
}

#[test]
fn load_over_unsaved_edits_needs_confirmation() {
    let mut session = Session::new();
    session.files.insert("other.bas", "10 PRINT \"OTHER\"\n");

    let output = session.feed(&["10 PRINT \"MINE\"", "LOAD other"]);
    assert!(output.starts_with("Unsaved program will be lost"), "{output}");
    assert_eq!(session.repl.program().get(10), Some("PRINT \"MINE\""));

    let output = session.feed(&["YES", "RUN"]);
    assert_eq!(output, "Ok\nOTHER\nOk\n");

    // the confirmation is used up
    let output = session.feed(&["yes"]);
    assert_eq!(output, "Syntax error: nothing to confirm!\nOk\n");
}

#[test]
fn immediate_parse_errors_keep_state() {
    let mut session = Session::new();
    session.feed(&["10 PRINT A", "A = 5"]);

    let output = session.feed(&["PRINT 1 +"]);
    assert!(output.starts_with("Syntax error"), "{output}");
    assert!(output.ends_with("\nOk\n"), "{output}");

    assert_eq!(session.feed(&["PRINT A"]), "5\nOk\n");
    assert_eq!(session.repl.program().get(10), Some("PRINT A"));
}

#[test]
fn catalog_lists_saved_files() {
    let mut session = Session::new();
    session.files.insert("a.bas", "10 END\n");
    session.files.insert("b.bas", "10 END\n");
    assert_eq!(session.feed(&["CATALOG"]), "a.bas\nb.bas\nOk\n");
}

#[test]
fn fre_reports_shrinking_memory() {
    let mut session = Session::new();
    let before = session.repl.interpreter().free_memory();
    session.feed(&["10 PRINT \"SOME TEXT\"", "A = \"A LONGER STRING VALUE\""]);
    let after = session.repl.interpreter().free_memory();
    assert!(after < before, "{after} >= {before}");

    let output = session.feed(&["FRE"]);
    assert_eq!(output, format!("{after} bytes free\nOk\n"));
}

#[test]
fn system_ends_the_loop() {
    let console = ScriptedConsole::with_input(["10 PRINT 5", "RUN", "SYSTEM", "PRINT 99"]);
    let interp = Interpreter::new(
        Config::default(),
        Box::new(console.clone()),
        Box::new(MemStore::new()),
        Box::new(NoBus),
    );
    let mut repl = Repl::new(interp);
    repl.run_loop();

    assert!(repl.is_done());
    assert_eq!(console.output(), "5\nOk\nOk\n");
}

#[test]
fn banner_shows_free_memory() {
    let mut session = Session::new();
    session.repl.banner();
    let free = session.repl.interpreter().free_memory();
    let output = session.console.take_output();
    assert!(output.starts_with("Terran BASIC "), "{output}");
    assert!(output.ends_with(&format!("\n{free} bytes free\nOk\n")), "{output}");
}
