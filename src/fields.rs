//! Addressing-mode decode and operand fetch. Grounded in `em68k/src/fields.rs`'s
//! `EAMode` (a rich type at the decode boundary instead of a bare mode
//! integer) and in `original_source/.../SimulatedCPU.py::_fetchOperand` for
//! the exact side-effect ordering spec.md §9(c) calls out.

use crate::error::{SimError, Word};
use crate::processor::Cpu;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressingMode {
    Direct,
    Register,
    RegDeferred,
    AutoInc,
    AutoDec,
    Immediate,
}

impl AddressingMode {
    pub fn decode(raw: Word) -> Result<Self, SimError> {
        match raw {
            0 => Ok(AddressingMode::Direct),
            1 => Ok(AddressingMode::Register),
            2 => Ok(AddressingMode::RegDeferred),
            3 => Ok(AddressingMode::AutoInc),
            4 => Ok(AddressingMode::AutoDec),
            5 => Ok(AddressingMode::Immediate),
            _ => Err(SimError::InvalidMode),
        }
    }
}

/// The address an operand came from; `None` means "register, not memory"
/// (spec.md §4.1's `address = -1` convention, recast as an `Option`).
pub type OperandAddr = Option<usize>;

/// Fetch one operand for the given mode/register, returning its address (if
/// any) and its value. Mutates `cpu.pc` for Direct/Immediate (both consume
/// one more instruction word) and `cpu.gpr[reg]` for AutoInc/AutoDec.
pub fn fetch_operand(
    cpu: &mut Cpu,
    mode: AddressingMode,
    reg: usize,
) -> Result<(OperandAddr, Word), SimError> {
    match mode {
        AddressingMode::Direct => {
            let addr = cpu.fetch_pc_word()?;
            let addr = checked_index(addr)?;
            let value = cpu.ram.read(addr)?;
            Ok((Some(addr), value))
        }
        AddressingMode::Register => Ok((None, cpu.gpr[reg])),
        AddressingMode::RegDeferred => {
            let addr = checked_index(cpu.gpr[reg])?;
            let value = cpu.ram.read(addr)?;
            Ok((Some(addr), value))
        }
        AddressingMode::AutoInc => {
            // Sample before the post-increment side effect (spec.md §9(c)).
            let addr = checked_index(cpu.gpr[reg])?;
            let value = cpu.ram.read(addr)?;
            cpu.gpr[reg] += 1;
            Ok((Some(addr), value))
        }
        AddressingMode::AutoDec => {
            // Pre-decrement, then sample — asymmetric with AutoInc on
            // purpose, see tests::auto_inc_and_auto_dec_are_asymmetric.
            cpu.gpr[reg] -= 1;
            let addr = checked_index(cpu.gpr[reg])?;
            let value = cpu.ram.read(addr)?;
            Ok((Some(addr), value))
        }
        AddressingMode::Immediate => {
            let addr = checked_index(cpu.pc)?;
            let value = cpu.ram.read(addr)?;
            cpu.pc += 1;
            Ok((Some(addr), value))
        }
    }
}

fn checked_index(addr: Word) -> Result<usize, SimError> {
    if (0..10_000).contains(&addr) {
        Ok(addr as usize)
    } else {
        Err(SimError::InvalidAddr)
    }
}
