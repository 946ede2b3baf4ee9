//! The line-numbered program buffer behind LIST, RENUM, SAVE and LOAD.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::error::{Result, syntax};

/// Keywords whose numeric operands are line numbers.
const JUMP_WORDS: &[&str] = &["GOTO", "GOSUB", "BREAKTO", "THEN", "ELSE"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    lines: BTreeMap<usize, String>,
    /// Edited since the last SAVE, LOAD or NEW.
    dirty: bool,
}

/// Splits `"<digits> <text>"` into the line number and the text. The text is
/// empty for a bare number.
pub fn split_numbered(input: &str) -> Option<(usize, &str)> {
    let input = input.trim();
    let digits = input.find(|c: char| !c.is_ascii_digit()).unwrap_or(input.len());
    if digits == 0 {
        return None;
    }
    let (number, rest) = input.split_at(digits);
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let number: usize = number.parse().ok()?;
    // usize::MAX is where a finished run points
    (number < usize::MAX).then_some((number, rest.trim_start()))
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_line(&mut self, number: usize, text: &str) {
        self.lines.insert(number, text.to_string());
        self.dirty = true;
    }

    pub fn remove_line(&mut self, number: usize) -> bool {
        let removed = self.lines.remove(&number).is_some();
        self.dirty |= removed;
        removed
    }

    /// Removes every line in `from..=to`; returns how many went.
    pub fn delete_range(&mut self, from: usize, to: usize) -> usize {
        if from > to {
            return 0;
        }
        let doomed: Vec<usize> = self.lines.range(from..=to).map(|(&n, _)| n).collect();
        for n in &doomed {
            self.lines.remove(n);
        }
        self.dirty |= !doomed.is_empty();
        doomed.len()
    }

    pub fn get(&self, number: usize) -> Option<&str> {
        self.lines.get(&number).map(String::as_str)
    }

    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().map(|(&n, text)| (n, text.as_str()))
    }

    /// Highest stored line number, 0 for an empty program.
    pub fn last_line(&self) -> usize {
        self.lines.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Bytes the program text takes out of scratch memory.
    pub fn footprint(&self) -> usize {
        self.lines
            .iter()
            .map(|(n, text)| n.to_string().len() + text.len() + 2)
            .sum()
    }

    /// LIST output for the lines in `from..=to`.
    pub fn listing(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        if from > to {
            return out;
        }
        for (n, text) in self.lines.range(from..=to) {
            let _ = writeln!(out, "{n:>3} {text}");
        }
        out
    }

    /// RENUM: renumbers from 10 in steps of 10 and rewrites jump targets to
    /// match. Targets that name no existing line are left alone.
    pub fn renumber(&mut self) {
        let mapping: BTreeMap<usize, usize> = self
            .lines
            .keys()
            .enumerate()
            .map(|(k, &old)| (old, (k + 1) * 10))
            .collect();
        let lines = std::mem::take(&mut self.lines);
        self.lines = lines
            .into_iter()
            .map(|(old, text)| (mapping[&old], rewrite_targets(&text, &mapping)))
            .collect();
        self.dirty = true;
    }

    /// SAVE format: one `"<number> <text>"` per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (n, text) in &self.lines {
            let _ = writeln!(out, "{n} {text}");
        }
        out
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let mut program = Program::new();
        for raw in text.lines().filter(|l| !l.trim().is_empty()) {
            let (n, body) = split_numbered(raw).ok_or_else(|| syntax(format!("line without a number: {raw}")))?;
            if !body.is_empty() {
                program.lines.insert(n, body.to_string());
            }
        }
        Ok(program)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rewrites numeric operands of the jump keywords outside string literals,
/// including comma-separated `ON ... GOTO` lists.
fn rewrite_targets(text: &str, mapping: &BTreeMap<usize, usize>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let spaces_from = |mut j: usize| {
        while chars.get(j) == Some(&' ') {
            j += 1;
        }
        j
    };
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut k = 0;

    while k < chars.len() {
        let c = chars[k];
        if c == '"' {
            in_string = !in_string;
        }
        let starts_word = !in_string && c.is_ascii_alphabetic() && (k == 0 || !is_word_char(chars[k - 1]));
        if !starts_word {
            out.push(c);
            k += 1;
            continue;
        }

        let end = (k..chars.len()).find(|&j| !is_word_char(chars[j])).unwrap_or(chars.len());
        let word: String = chars[k..end].iter().collect();
        out.push_str(&word);
        k = end;
        if !JUMP_WORDS.iter().any(|w| w.eq_ignore_ascii_case(&word)) {
            continue;
        }

        loop {
            let start = spaces_from(k);
            let stop = (start..chars.len()).find(|&j| !chars[j].is_ascii_digit()).unwrap_or(chars.len());
            if stop == start || chars.get(stop).is_some_and(|&c| is_word_char(c)) {
                break;
            }
            out.extend(&chars[k..start]);
            let number: String = chars[start..stop].iter().collect();
            match number.parse().ok().and_then(|n: usize| mapping.get(&n)) {
                Some(new) => out.push_str(&new.to_string()),
                None => out.push_str(&number),
            }
            k = stop;

            let comma = spaces_from(k);
            if chars.get(comma) != Some(&',') {
                break;
            }
            out.extend(&chars[k..=comma]);
            k = comma + 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(lines: &[(usize, &str)]) -> Program {
        let mut p = Program::new();
        for (n, text) in lines {
            p.set_line(*n, text);
        }
        p
    }

    #[test]
    fn test_split_numbered() {
        let test_cases = vec![
            ("10 PRINT 1", Some((10, "PRINT 1"))),
            ("  20   GOTO 10 ", Some((20, "GOTO 10"))),
            ("30", Some((30, ""))),
            ("PRINT 1", None),
            ("10PRINT", None),
            ("18446744073709551615 END", None),
            ("18446744073709551614 END", Some((18446744073709551614, "END"))),
            ("", None),
        ];

        for (input, expected) in test_cases {
            println!("Testing: {input}");
            assert_eq!(split_numbered(input), expected);
        }
    }

    #[test]
    fn test_rewrite_targets() {
        let mapping: BTreeMap<usize, usize> = [(5, 10), (7, 20), (100, 30)].into_iter().collect();
        let test_cases = vec![
            ("GOTO 7", "GOTO 20"),
            ("IF A THEN 100 ELSE 5", "IF A THEN 30 ELSE 10"),
            ("ON K GOSUB 5, 7,100", "ON K GOSUB 10, 20,30"),
            ("PRINT \"GOTO 7\" : goto 7", "PRINT \"GOTO 7\" : goto 20"),
            ("GOTO 8", "GOTO 8"),
            ("X = 7 : GOTOX 7", "X = 7 : GOTOX 7"),
            ("BREAKTO 100", "BREAKTO 30"),
        ];

        for (text, expected) in test_cases {
            println!("Testing: {text}");
            assert_eq!(rewrite_targets(text, &mapping), expected);
        }
    }

    #[test]
    fn renumber_keeps_order() {
        let mut p = program(&[(5, "PRINT 1"), (7, "GOTO 5"), (100, "END")]);
        p.renumber();
        assert_eq!(p.to_text(), "10 PRINT 1\n20 GOTO 10\n30 END\n");
    }

    #[test]
    fn listing_aligns_numbers() {
        let p = program(&[(5, "PRINT 1"), (1000, "END")]);
        assert_eq!(p.listing(0, usize::MAX), "  5 PRINT 1\n1000 END\n");
        assert_eq!(p.listing(6, usize::MAX), "1000 END\n");
        assert_eq!(p.listing(900, 10), "");
        assert_eq!(p.last_line(), 1000);
    }

    #[test]
    fn text_round_trip_and_dirty_flag() {
        let mut p = program(&[(10, "PRINT \"HI\""), (20, "END")]);
        assert!(p.is_dirty());
        p.mark_saved();

        let loaded = Program::from_text(&p.to_text()).unwrap();
        assert_eq!(loaded.get(10), Some("PRINT \"HI\""));
        assert!(!loaded.is_dirty());

        assert_eq!(p.delete_range(15, 30), 1);
        assert!(p.is_dirty());
        assert!(Program::from_text("PRINT 1\n").is_err());
    }
}
