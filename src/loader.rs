//! Absolute loader: the assembly-text program format is one of the two
//! external collaborators spec.md's Non-goals keep as "interfaces only" for
//! everything *but* itself — "cheap and required to run anything." Grounded
//! in `em68k/src/parser.rs`'s role (external text -> structured in-memory
//! state, failure reported rather than panicked on) and
//! `original_source/ComputerSimulator.py::absoluteLoader` for the exact
//! record format and termination rule.

use std::fs;
use std::path::Path;

use crate::config::RAM_SIZE;
use crate::conversions::parse_auto_base;
use crate::error::{SimError, Word};
use crate::memory::Ram;

const END_OF_PROGRAM: Word = -1;

/// Loads `addr value` records from `path` into `ram`, stopping at the
/// terminator record `-1 entry_pc` and returning `entry_pc`. Each `addr` must
/// be a valid RAM index; base auto-detect applies to `value` only, matching
/// the source's `int(value, 0)`.
pub fn load_absolute(ram: &mut Ram, path: &Path) -> Result<Word, SimError> {
    let text = fs::read_to_string(path).map_err(|_| SimError::FileOpen)?;
    load_absolute_text(ram, &text)
}

fn load_absolute_text(ram: &mut Ram, text: &str) -> Result<Word, SimError> {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let addr = fields.next().and_then(parse_auto_base).ok_or(SimError::InvalidAddr)?;
        let value = fields.next().and_then(parse_auto_base).ok_or(SimError::InvalidAddr)?;

        if addr == END_OF_PROGRAM {
            return Ok(value);
        }
        if (0..RAM_SIZE as Word).contains(&addr) {
            ram.set(addr as usize, value);
        } else {
            return Err(SimError::InvalidAddr);
        }
    }
    Err(SimError::NoEndOfProg)
}

/// Loads a program already held in memory as `(addr, value)` pairs rather
/// than read from a file — same record semantics as [`load_absolute`],
/// used for the boot sequence's idle/null process (`original_source`'s
/// `OSLoop` loads it from a tiny `null.txt` file on disk; embedding its
/// handful of words here avoids requiring that file to exist for a boot).
pub fn load_words(ram: &mut Ram, words: &[Word]) -> Result<Word, SimError> {
    for pair in words.chunks(2) {
        let [addr, value] = pair else { return Err(SimError::NoEndOfProg) };
        if *addr == END_OF_PROGRAM {
            return Ok(*value);
        }
        if (0..RAM_SIZE as Word).contains(addr) {
            ram.set(*addr as usize, *value);
        } else {
            return Err(SimError::InvalidAddr);
        }
    }
    Err(SimError::NoEndOfProg)
}
