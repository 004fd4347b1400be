//! The engine's I/O collaborator
//!
//! The interpreter never owns a terminal or picks file paths itself; it
//! talks to a `ZMachineIo` implementation injected at construction. The
//! console implementation here is a dumb stdio front end; tests use the
//! scripted one in `test_util`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use log::trace;

/// What a chosen file will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePurpose {
    Load,
    Save,
}

/// What the two status-line numbers mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// score / moves
    Score,
    /// hours / minutes
    Time,
}

pub trait ZMachineIo {
    /// Print text to the main window, no newline.
    fn output_string(&mut self, text: &str);

    /// Print a newline-terminated line.
    fn output_line(&mut self, line: &str);

    /// Diagnostic/meta channel, distinct from game text.
    fn output_comment(&mut self, comment: &str);

    /// Blocking line read. `None` means no input is available at all
    /// (end of input); the engine skips the read in that case.
    fn read_line(&mut self) -> Option<String>;

    /// Ask the player for a file path. `None` cancels the operation.
    fn choose_file(&mut self, prompt: &str, purpose: FilePurpose) -> Option<PathBuf>;

    /// Yes/no question.
    fn confirm(&mut self, question: &str) -> bool;

    /// Status line: current location plus two numbers (score/moves or
    /// hours/minutes).
    fn set_status(&mut self, location: &str, a: i16, b: i16, kind: StatusKind);

    /// Window-split request, passed through from the game.
    fn split_window(&mut self, lines: u16);

    /// Window-select request, passed through from the game.
    fn set_window(&mut self, window: u16);

    /// The game restarted; drop any presentation state.
    fn reset(&mut self);
}

/// Plain stdin/stdout implementation. Window and status requests are
/// accepted and ignored, as on any dumb terminal.
pub struct ConsoleIo;

impl ConsoleIo {
    pub fn new() -> ConsoleIo {
        ConsoleIo
    }

    fn read_raw_line(&self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
            Err(_) => Some(String::new()),
        }
    }
}

impl Default for ConsoleIo {
    fn default() -> Self {
        ConsoleIo::new()
    }
}

impl ZMachineIo for ConsoleIo {
    fn output_string(&mut self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
    }

    fn output_line(&mut self, line: &str) {
        println!("{line}");
    }

    fn output_comment(&mut self, comment: &str) {
        println!("{comment}");
    }

    fn read_line(&mut self) -> Option<String> {
        self.read_raw_line()
    }

    fn choose_file(&mut self, prompt: &str, _purpose: FilePurpose) -> Option<PathBuf> {
        print!("{prompt}: ");
        let _ = io::stdout().flush();
        match self.read_raw_line() {
            Some(path) if !path.trim().is_empty() => Some(PathBuf::from(path.trim())),
            _ => None,
        }
    }

    fn confirm(&mut self, question: &str) -> bool {
        print!("\n{question} ('yes' or 'no') ");
        let _ = io::stdout().flush();
        self.read_raw_line()
            .map(|r| r.trim().eq_ignore_ascii_case("yes"))
            .unwrap_or(false)
    }

    fn set_status(&mut self, location: &str, a: i16, b: i16, kind: StatusKind) {
        trace!("status: {location} {a} {b} ({kind:?})");
    }

    fn split_window(&mut self, lines: u16) {
        trace!("split_window {lines} ignored on console");
    }

    fn set_window(&mut self, window: u16) {
        trace!("set_window {window} ignored on console");
    }

    fn reset(&mut self) {}
}
