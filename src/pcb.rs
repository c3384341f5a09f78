//! Process control block field accessors. The PCB is not a Rust struct that
//! gets serialized — it is a 25-cell window directly into [`Ram`], the way
//! `original_source/ComputerSimulator.py` addresses it as `ram[pcbptr+N]`
//! everywhere. Named accessors replace the bare `+N` arithmetic at call
//! sites while keeping the same wire layout (spec.md §3).

use crate::error::Word;
use crate::memory::Ram;

pub const NEXT: usize = 0;
pub const STATE: usize = 1;
pub const PRIORITY: usize = 2;
pub const PID: usize = 3;
pub const WAIT_REASON: usize = 4;
pub const GPR_BASE: usize = 5; // GPR0..GPR7 occupy 5..=12
pub const SP: usize = 13;
pub const PC: usize = 14;
pub const STACK_BASE: usize = 15;
pub const STACK_SIZE: usize = 16;
pub const MSGQ_ADDR: usize = 17;
pub const MSGQ_CAPACITY: usize = 18;
pub const MSGQ_COUNT: usize = 19;

pub const STATE_READY: Word = 1;
pub const STATE_WAITING: Word = 2;

pub const WAIT_NONE: Word = 0;
pub const WAIT_MSG: Word = 2;
pub const WAIT_GET: Word = 3;
pub const WAIT_PUT: Word = 4;

/// A PCB base address plus the field accessors over it. Every method reads
/// or writes `ram[self.base + OFFSET]` — there is no separate in-memory copy.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pcb {
    pub base: usize,
}

impl Pcb {
    pub fn at(base: usize) -> Self {
        Pcb { base }
    }

    pub fn next(self, ram: &Ram) -> Word {
        ram.get(self.base + NEXT)
    }
    pub fn set_next(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + NEXT, value);
    }

    pub fn state(self, ram: &Ram) -> Word {
        ram.get(self.base + STATE)
    }
    pub fn set_state(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + STATE, value);
    }

    pub fn priority(self, ram: &Ram) -> Word {
        ram.get(self.base + PRIORITY)
    }
    pub fn set_priority(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + PRIORITY, value);
    }

    pub fn pid(self, ram: &Ram) -> Word {
        ram.get(self.base + PID)
    }
    pub fn set_pid(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + PID, value);
    }

    pub fn wait_reason(self, ram: &Ram) -> Word {
        ram.get(self.base + WAIT_REASON)
    }
    pub fn set_wait_reason(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + WAIT_REASON, value);
    }

    pub fn gpr(self, ram: &Ram, index: usize) -> Word {
        ram.get(self.base + GPR_BASE + index)
    }
    pub fn set_gpr(self, ram: &mut Ram, index: usize, value: Word) {
        ram.set(self.base + GPR_BASE + index, value);
    }

    pub fn sp(self, ram: &Ram) -> Word {
        ram.get(self.base + SP)
    }
    pub fn set_sp(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + SP, value);
    }

    pub fn pc(self, ram: &Ram) -> Word {
        ram.get(self.base + PC)
    }
    pub fn set_pc(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + PC, value);
    }

    pub fn stack_base(self, ram: &Ram) -> Word {
        ram.get(self.base + STACK_BASE)
    }
    pub fn set_stack_base(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + STACK_BASE, value);
    }

    pub fn stack_size(self, ram: &Ram) -> Word {
        ram.get(self.base + STACK_SIZE)
    }
    pub fn set_stack_size(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + STACK_SIZE, value);
    }

    pub fn msgq_addr(self, ram: &Ram) -> Word {
        ram.get(self.base + MSGQ_ADDR)
    }
    pub fn set_msgq_addr(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + MSGQ_ADDR, value);
    }

    pub fn msgq_capacity(self, ram: &Ram) -> Word {
        ram.get(self.base + MSGQ_CAPACITY)
    }
    pub fn set_msgq_capacity(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + MSGQ_CAPACITY, value);
    }

    pub fn msgq_count(self, ram: &Ram) -> Word {
        ram.get(self.base + MSGQ_COUNT)
    }
    pub fn set_msgq_count(self, ram: &mut Ram, value: Word) {
        ram.set(self.base + MSGQ_COUNT, value);
    }

    /// Saves the live CPU context (spec.md §4.4, `saveCPUContext`).
    pub fn save_context(self, ram: &mut Ram, cpu: &crate::processor::Cpu) {
        for i in 0..8 {
            self.set_gpr(ram, i, cpu.gpr[i]);
        }
        self.set_sp(ram, cpu.sp);
        self.set_pc(ram, cpu.pc);
    }

    /// Restores a CPU context from this PCB (spec.md §4.4, `dispatcher`).
    pub fn restore_context(self, ram: &Ram, cpu: &mut crate::processor::Cpu) {
        for i in 0..8 {
            cpu.gpr[i] = self.gpr(ram, i);
        }
        cpu.sp = self.sp(ram);
        cpu.pc = self.pc(ram);
    }
}
