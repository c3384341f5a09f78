//! Boot sequence: format-or-verify the disk, zero machine state, stand up
//! both free lists, and create the PID-0 idle process. Grounded in
//! `original_source/ComputerSimulator.py::initializeSystem` and `OSLoop`'s
//! prologue (`nullProgram = Path("programs/machinecode/null.txt"); status =
//! self.createProcess(nullProgram, 0)`).

use crate::allocator::FreeList;
use crate::config::{Config, IDLE_PRIORITY, KERNEL_POOL_END, KERNEL_POOL_START, PCB_SIZE, USER_POOL_END, USER_POOL_START};
use crate::disk::Disk;
use crate::error::{SimError, Word};
use crate::loader;
use crate::pcb::{Pcb, STATE_READY, WAIT_NONE};
use crate::processor::Cpu;
use crate::queue::Queue;

/// A single HALT instruction, encoded the way `processor::Cpu::step` decodes
/// it (opcode 0 in the top 16 bits, every mode/register field zero). There is
/// no separate `null.txt` on disk here; the idle process's one instruction is
/// embedded directly.
const IDLE_PROGRAM: [Word; 4] = [0, 0, -1, 0];

pub struct Booted {
    pub cpu: Cpu,
    pub disk: Disk,
    pub user_pool: FreeList,
    pub kernel_pool: FreeList,
    pub rq: Queue,
    pub wq: Queue,
    /// Next PID to hand out; the idle process is always PID 0.
    pub next_pid: Word,
}

/// Formats or verifies the disk image at `config.disk_path`, then brings up
/// a fresh machine: zeroed CPU/RAM, both free lists freshly carved, and the
/// idle process at priority 0 sitting in RQ.
pub fn boot(config: &Config) -> Result<Booted, SimError> {
    let disk = Disk::open_or_format(&config.disk_path)?;

    let mut cpu = Cpu::new(config.clone());
    cpu.ram.zero();

    let user_pool = FreeList::new(&mut cpu.ram, USER_POOL_START as Word, (USER_POOL_END - USER_POOL_START) as Word);
    let mut kernel_pool = FreeList::new(&mut cpu.ram, KERNEL_POOL_START as Word, (KERNEL_POOL_END - KERNEL_POOL_START) as Word);

    let mut rq = Queue::new();
    let wq = Queue::new();

    let entry = loader::load_words(&mut cpu.ram, &IDLE_PROGRAM)?;
    let pcbptr = kernel_pool.alloc(&mut cpu.ram, PCB_SIZE)?;
    let idle = Pcb::at(pcbptr as usize);
    idle.set_pc(&mut cpu.ram, entry);
    idle.set_sp(&mut cpu.ram, 0);
    for i in 0..8 {
        idle.set_gpr(&mut cpu.ram, i, 0);
    }
    idle.set_state(&mut cpu.ram, STATE_READY);
    idle.set_priority(&mut cpu.ram, IDLE_PRIORITY);
    idle.set_pid(&mut cpu.ram, 0);
    idle.set_wait_reason(&mut cpu.ram, WAIT_NONE);
    idle.set_stack_base(&mut cpu.ram, 0);
    idle.set_stack_size(&mut cpu.ram, 0);
    idle.set_msgq_addr(&mut cpu.ram, 0);
    idle.set_msgq_capacity(&mut cpu.ram, 0);
    idle.set_msgq_count(&mut cpu.ram, 0);
    rq.insert(&mut cpu.ram, pcbptr);

    log::info!("booted: idle process at pcb {}, disk verified", pcbptr);

    Ok(Booted { cpu, disk, user_pool, kernel_pool, rq, wq, next_pid: 1 })
}
