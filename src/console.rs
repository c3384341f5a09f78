//! Operator console abstraction. Grounded in `em68k/src/devices.rs`'s
//! `Device` trait (one small interface, swapped per run mode) and in
//! `original_source/ComputerSimulator.py`'s `processInterrupts`/
//! `inputCompletionInterrupt`/`outputCompletionInterrupt`, which prompt the
//! operator for an interrupt id, then a PID, then (for input) a character.
//! `ScriptedConsole` replaces the terminal for tests the way the teacher's
//! tests replace `Device` with an in-memory double.

use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::Word;

/// What the operator chose at the numeric prompt (spec.md §6), with the PID
/// already collected for the two interrupts that need one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptRequest {
    None,
    ReadChar(Word),
    WriteChar(Word),
    RunProgram,
    Shutdown,
}

pub trait OperatorConsole {
    /// Polls for the next operator action. Implementations decide their own
    /// blocking policy; a non-interactive console may always return `None`.
    fn poll_interrupt(&mut self) -> InterruptRequest;

    /// The program-chooser dialog for `RunProgram`. The original's Tk file
    /// picker has no headless equivalent; here it is just a path.
    fn choose_program(&mut self) -> Option<PathBuf>;

    /// Reads the character the operator typed for `pid`.
    fn read_char(&mut self, pid: Word) -> Option<u8>;

    /// Reports a character `pid` produced to the operator.
    fn write_char(&mut self, pid: Word, ch: u8);
}

/// Talks to the real terminal, mirroring `processInterrupts`'s menu.
pub struct StdioConsole;

impl StdioConsole {
    pub fn new() -> Self {
        StdioConsole
    }

    fn prompt(&self, label: &str) -> String {
        print!("{label}");
        io::stdout().flush().ok();
        let mut line = String::new();
        io::stdin().read_line(&mut line).unwrap_or(0);
        line.trim().to_string()
    }
}

impl Default for StdioConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorConsole for StdioConsole {
    fn poll_interrupt(&mut self) -> InterruptRequest {
        println!("0: No interrupt  1: Read Character  2: Output Character  3: Run Program  4: Shutdown");
        match self.prompt("Interrupt ID: ").parse::<i64>() {
            Ok(1) => {
                let pid = self.prompt("Enter PID of Process needing Input: ").parse().unwrap_or(-1);
                InterruptRequest::ReadChar(pid)
            }
            Ok(2) => {
                let pid = self.prompt("Enter PID of Process needing Output: ").parse().unwrap_or(-1);
                InterruptRequest::WriteChar(pid)
            }
            Ok(3) => InterruptRequest::RunProgram,
            Ok(4) => InterruptRequest::Shutdown,
            _ => InterruptRequest::None,
        }
    }

    fn choose_program(&mut self) -> Option<PathBuf> {
        let path = self.prompt("Program to load: ");
        if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }

    fn read_char(&mut self, pid: Word) -> Option<u8> {
        self.prompt(&format!("Type a character for PID {pid}: ")).bytes().next()
    }

    fn write_char(&mut self, pid: Word, ch: u8) {
        println!("Output from PID {pid}: {}", ch as char);
    }
}

/// A scripted double for tests: replays fixed sequences of interrupts and
/// characters, then idles. Grounded in `em68k/tests/tests.rs`'s pattern of
/// feeding a fixed instruction stream through the real CPU rather than
/// mocking it away.
#[derive(Default)]
pub struct ScriptedConsole {
    interrupts: std::collections::VecDeque<InterruptRequest>,
    chars: std::collections::VecDeque<u8>,
    program: Option<PathBuf>,
    pub outputs: Vec<(Word, u8)>,
}

impl ScriptedConsole {
    pub fn new(interrupts: Vec<InterruptRequest>) -> Self {
        ScriptedConsole { interrupts: interrupts.into(), chars: Default::default(), program: None, outputs: Vec::new() }
    }

    pub fn with_chars(mut self, chars: Vec<u8>) -> Self {
        self.chars = chars.into();
        self
    }

    pub fn with_program(mut self, path: PathBuf) -> Self {
        self.program = Some(path);
        self
    }
}

impl OperatorConsole for ScriptedConsole {
    fn poll_interrupt(&mut self) -> InterruptRequest {
        self.interrupts.pop_front().unwrap_or(InterruptRequest::None)
    }

    fn choose_program(&mut self) -> Option<PathBuf> {
        self.program.take()
    }

    fn read_char(&mut self, _pid: Word) -> Option<u8> {
        self.chars.pop_front()
    }

    fn write_char(&mut self, pid: Word, ch: u8) {
        self.outputs.push((pid, ch));
    }
}
