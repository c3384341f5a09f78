//! The steady-state scheduling loop: poll the operator, dispatch the ready
//! process at RQs head, run it for one timeslice, and act on the verdict.
//! Grounded in `original_source/ComputerSimulator.py::OSLoop` (`while True:
//! processInterrupts(); ...; pcbptr = selectProcess(); dispatcher(pcbptr);
//! status = executeProgram(systemCall)`), with `processInterrupts`'s operator
//! menu split out to `console::OperatorConsole`.

use crate::allocator::FreeList;
use crate::boot::Booted;
use crate::config::Config;
use crate::console::{InterruptRequest, OperatorConsole};
use crate::disk::Disk;
use crate::error::Word;
use crate::loader;
use crate::pcb::{Pcb, STATE_READY, WAIT_NONE};
use crate::processor::{Cpu, Verdict};
use crate::queue::Queue;
use crate::syscall::{self, Resources, SyscallOutcome};

/// Owns the whole running machine: CPU/RAM, disk, both free lists, both
/// queues, and the PID counter. There is exactly one of these per run — no
/// aliasing, no shared ownership, unlike the source's module-level globals.
pub struct Kernel<C> {
    pub cpu: Cpu,
    pub disk: Disk,
    pub user_pool: FreeList,
    pub kernel_pool: FreeList,
    pub rq: Queue,
    pub wq: Queue,
    pub next_pid: Word,
    pub console: C,
    pub timeslice: Word,
    pub shutdown: bool,
}

impl<C: OperatorConsole> Kernel<C> {
    pub fn new(booted: Booted, console: C, config: &Config) -> Self {
        Kernel {
            cpu: booted.cpu,
            disk: booted.disk,
            user_pool: booted.user_pool,
            kernel_pool: booted.kernel_pool,
            rq: booted.rq,
            wq: booted.wq,
            next_pid: booted.next_pid,
            console,
            timeslice: config.timeslice,
            shutdown: false,
        }
    }

    /// Runs until the operator sends `Shutdown`.
    pub fn run(&mut self) {
        while !self.shutdown {
            self.step();
        }
    }

    /// One iteration: service a pending operator interrupt, then dispatch
    /// and run the head of RQ for up to one timeslice.
    pub fn step(&mut self) {
        self.service_operator();
        if self.shutdown {
            return;
        }

        let Some(running) = self.rq.remove_head(&mut self.cpu.ram) else {
            log::debug!("RQ empty, nothing to dispatch this tick");
            return;
        };
        running.restore_context(&self.cpu.ram, &mut self.cpu);

        match self.cpu.run(self.timeslice) {
            Verdict::Timeslice => {
                running.save_context(&mut self.cpu.ram, &self.cpu);
                self.rq.insert(&mut self.cpu.ram, running.base as Word);
            }
            Verdict::Halted => self.terminate(running),
            Verdict::Syscall(call_id) => {
                running.save_context(&mut self.cpu.ram, &self.cpu);
                let mut res = Resources {
                    pid: &mut self.next_pid,
                    user_pool: &mut self.user_pool,
                    kernel_pool: &mut self.kernel_pool,
                    rq: &mut self.rq,
                    wq: &mut self.wq,
                };
                match syscall::dispatch(call_id, &mut self.cpu, running, &mut res) {
                    SyscallOutcome::Continue => {
                        running.save_context(&mut self.cpu.ram, &self.cpu);
                        self.rq.insert(&mut self.cpu.ram, running.base as Word);
                    }
                    SyscallOutcome::Waiting => {
                        running.save_context(&mut self.cpu.ram, &self.cpu);
                        self.wq.insert(&mut self.cpu.ram, running.base as Word);
                    }
                    SyscallOutcome::Halt => self.terminate(running),
                }
            }
            Verdict::Error(e) => {
                log::warn!("pid {} terminated on error: {e}", running.pid(&self.cpu.ram));
                self.terminate(running);
            }
        }
    }

    /// The idle process (spec.md §4.4's boot-created PID 0) owns no user
    /// stack or message queue — it never goes through
    /// `task_create`/`run_program`, so `stack_size`/`msgq_capacity` are both
    /// 0 and there is nothing to return to `user_pool`/`kernel_pool` for them.
    fn terminate(&mut self, pcb: Pcb) {
        let ram = &mut self.cpu.ram;
        let stack_size = pcb.stack_size(ram);
        if stack_size > 0 {
            self.user_pool.free(ram, pcb.stack_base(ram), stack_size);
        }
        if pcb.msgq_capacity(ram) > 0 {
            self.kernel_pool.free(ram, pcb.msgq_addr(ram), pcb.msgq_capacity(ram));
        }
        self.kernel_pool.free(ram, pcb.base as Word, crate::config::PCB_SIZE);
    }

    /// Services at most one operator action per tick, mirroring
    /// `processInterrupts`'s single poll-and-branch.
    fn service_operator(&mut self) {
        match self.console.poll_interrupt() {
            InterruptRequest::None => {}
            InterruptRequest::ReadChar(pid) => self.complete_input(pid),
            InterruptRequest::WriteChar(pid) => self.complete_output(pid),
            InterruptRequest::RunProgram => self.run_program(),
            InterruptRequest::Shutdown => self.shutdown(),
        }
    }

    /// Input completion: the operator typed a character for a WAITING
    /// process. Writes it into GPR1 (not GPR2 — scenario 4's worked example
    /// pins PCB+6, the GPR1 slot, as the character destination; §4.3's
    /// summary line calling it "GPR2" is the imprecise one here), OK into
    /// GPR0, marks READY, reinserts at the tail of its priority band.
    fn complete_input(&mut self, pid: Word) {
        let Some(pcb) = self.wq.remove_pid(&mut self.cpu.ram, pid) else {
            log::warn!("input completion for pid {pid} not found in WQ");
            return;
        };
        let Some(ch) = self.console.read_char(pid) else {
            self.wq.insert(&mut self.cpu.ram, pcb.base as Word);
            return;
        };
        pcb.set_gpr(&mut self.cpu.ram, 1, ch as Word);
        pcb.set_gpr(&mut self.cpu.ram, 0, 0);
        pcb.set_wait_reason(&mut self.cpu.ram, WAIT_NONE);
        pcb.set_state(&mut self.cpu.ram, STATE_READY);
        self.rq.insert(&mut self.cpu.ram, pcb.base as Word);
    }

    /// Output completion: reads the character out of GPR2 — the source's
    /// `outputCompletionInterrupt` reads GPR1, but spec.md's own IO_PUTC row
    /// explicitly documents GPR2 as the character slot, which this follows.
    fn complete_output(&mut self, pid: Word) {
        let Some(pcb) = self.wq.remove_pid(&mut self.cpu.ram, pid) else {
            log::warn!("output completion for pid {pid} not found in WQ");
            return;
        };
        let ch = pcb.gpr(&self.cpu.ram, 2) as u8;
        self.console.write_char(pid, ch);
        pcb.set_gpr(&mut self.cpu.ram, 0, 0);
        pcb.set_wait_reason(&mut self.cpu.ram, WAIT_NONE);
        pcb.set_state(&mut self.cpu.ram, STATE_READY);
        self.rq.insert(&mut self.cpu.ram, pcb.base as Word);
    }

    /// Loads and creates a user program at the default priority (spec.md
    /// §4.4's interrupt 3, `createProcess` with no caller-chosen priority).
    fn run_program(&mut self) {
        let Some(path) = self.console.choose_program() else { return };
        if let Err(e) = self.create_process(&path) {
            log::warn!("run_program: failed to create process from {}: {e}", path.display());
        }
    }

    /// Loads `path` via the absolute loader and creates a process for it at
    /// the default priority, same as the operator's `RunProgram` interrupt
    /// (spec.md §4.4, `createProcess`). Public so a startup `--program` can
    /// use the identical path.
    pub fn create_process(&mut self, path: &std::path::Path) -> Result<Word, crate::error::SimError> {
        let pcbptr = self.kernel_pool.alloc(&mut self.cpu.ram, crate::config::PCB_SIZE)?;
        let pcb = Pcb::at(pcbptr as usize);

        let entry = match loader::load_absolute(&mut self.cpu.ram, path) {
            Ok(entry) => entry,
            Err(e) => {
                self.kernel_pool.free(&mut self.cpu.ram, pcbptr, crate::config::PCB_SIZE);
                return Err(e);
            }
        };
        let stack_ptr = match self.user_pool.alloc(&mut self.cpu.ram, crate::config::USER_STACK_SIZE) {
            Ok(p) => p,
            Err(e) => {
                self.kernel_pool.free(&mut self.cpu.ram, pcbptr, crate::config::PCB_SIZE);
                return Err(e);
            }
        };
        let msgqid = match self.kernel_pool.alloc(&mut self.cpu.ram, crate::config::MSG_QUEUE_CAPACITY) {
            Ok(p) => p,
            Err(e) => {
                self.user_pool.free(&mut self.cpu.ram, stack_ptr, crate::config::USER_STACK_SIZE);
                self.kernel_pool.free(&mut self.cpu.ram, pcbptr, crate::config::PCB_SIZE);
                return Err(e);
            }
        };

        pcb.set_pc(&mut self.cpu.ram, entry);
        pcb.set_stack_base(&mut self.cpu.ram, stack_ptr);
        pcb.set_stack_size(&mut self.cpu.ram, crate::config::USER_STACK_SIZE);
        pcb.set_sp(&mut self.cpu.ram, stack_ptr - 1);
        for i in 0..8 {
            pcb.set_gpr(&mut self.cpu.ram, i, 0);
        }
        pcb.set_state(&mut self.cpu.ram, STATE_READY);
        pcb.set_priority(&mut self.cpu.ram, crate::config::DEFAULT_USER_PRIORITY);
        let pid = self.next_pid;
        self.next_pid += 1;
        pcb.set_pid(&mut self.cpu.ram, pid);
        pcb.set_wait_reason(&mut self.cpu.ram, WAIT_NONE);
        pcb.set_msgq_addr(&mut self.cpu.ram, msgqid);
        pcb.set_msgq_capacity(&mut self.cpu.ram, crate::config::MSG_QUEUE_CAPACITY);
        pcb.set_msgq_count(&mut self.cpu.ram, 0);
        self.rq.insert(&mut self.cpu.ram, pcbptr);
        log::info!("created pid {pid} from {}", path.display());
        Ok(pid)
    }

    /// Terminates every queued process and stops the run (spec.md §4.4's
    /// interrupt 4).
    fn shutdown(&mut self) {
        while let Some(pcb) = self.rq.remove_head(&mut self.cpu.ram) {
            self.terminate(pcb);
        }
        while let Some(pcb) = self.wq.remove_head(&mut self.cpu.ram) {
            self.terminate(pcb);
        }
        self.shutdown = true;
    }
}
