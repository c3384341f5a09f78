//! System-call dispatcher: the 11 named call ids plus the unknown-id
//! fallback (spec.md §4.3), grounded in
//! `original_source/ComputerSimulator.py::systemCall` and its callees
//! (`taskCreate`, `taskDelete`, `mem_alloc`/`mem_free`, `msgQsend`/
//! `msgQRecieve`, `taskInquiry`). The CPU has already fetched the call id by
//! the time `dispatch` runs (see `processor::Verdict::Syscall`); this module
//! only ever touches GPRs, the running PCB, the two free lists, and the two
//! queues — never the program counter or clock.

use crate::allocator::FreeList;
use crate::config::{DEFAULT_USER_PRIORITY, MSG_QUEUE_CAPACITY, PCB_SIZE, USER_STACK_SIZE};
use crate::error::Word;
use crate::pcb::{Pcb, STATE_READY, STATE_WAITING, WAIT_GET, WAIT_MSG, WAIT_NONE, WAIT_PUT};
use crate::processor::Cpu;
use crate::queue::Queue;

const TASK_CREATE: Word = 0;
const TASK_DELETE: Word = 1;
const TASK_INQUIRY: Word = 5;
const MEM_ALLOC: Word = 8;
const MEM_FREE: Word = 9;
const MSG_QSEND: Word = 12;
const MSG_QRECEIVE: Word = 13;
const IO_GETC: Word = 14;
const IO_PUTC: Word = 15;
const TIME_GET: Word = 16;
const TIME_SET: Word = 17;

const OK: Word = 0;
const ER_TID: Word = -1;
const ER_ISC: Word = -5;

/// What the scheduler should do with the running process after this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    /// Keep running the current process (status, if any, is already in GPR0).
    Continue,
    /// Move the running process to WQ.
    Waiting,
    /// Terminate the running process (self-delete or PID-0 task_delete).
    Halt,
}

/// Everything a syscall handler can touch besides the CPU's own GPRs.
pub struct Resources<'a> {
    pub pid: &'a mut Word,
    pub user_pool: &'a mut FreeList,
    pub kernel_pool: &'a mut FreeList,
    pub rq: &'a mut Queue,
    pub wq: &'a mut Queue,
}

/// Dispatches `call_id` for the process at `running`. PSR flip to/from
/// OSMODE around the call is the scheduler's job (spec.md §4.3's entry/exit
/// convention), not this function's.
pub fn dispatch(call_id: Word, cpu: &mut Cpu, running: Pcb, res: &mut Resources) -> SyscallOutcome {
    log::debug!("syscall {} from pid {}", call_id, running.pid(&cpu.ram));
    match call_id {
        TASK_CREATE => task_create(cpu, res),
        TASK_DELETE => task_delete(cpu, running, res),
        TASK_INQUIRY => task_inquiry(cpu, running),
        MEM_ALLOC => mem_alloc(cpu, res.user_pool),
        MEM_FREE => mem_free(cpu, res.user_pool),
        MSG_QSEND => msg_qsend(cpu, res),
        MSG_QRECEIVE => msg_qreceive(cpu, running),
        IO_GETC => io_getc(cpu, running),
        IO_PUTC => io_putc(cpu, running),
        TIME_GET => time_get(cpu),
        TIME_SET => time_set(cpu),
        _ => {
            cpu.gpr[0] = ER_ISC;
            SyscallOutcome::Continue
        }
    }
}

fn task_create(cpu: &mut Cpu, res: &mut Resources) -> SyscallOutcome {
    let ram = &mut cpu.ram;
    let pcbptr = match res.kernel_pool.alloc(ram, PCB_SIZE) {
        Ok(p) => p,
        Err(e) => return fail(cpu, e.code()),
    };
    let pcb = Pcb::at(pcbptr as usize);
    pcb.set_pc(ram, cpu.gpr[3]);

    let msgqid = match res.kernel_pool.alloc(ram, MSG_QUEUE_CAPACITY) {
        Ok(p) => p,
        Err(e) => return fail(cpu, e.code()),
    };
    let stack_ptr = match res.user_pool.alloc(ram, USER_STACK_SIZE) {
        Ok(p) => p,
        Err(e) => return fail(cpu, e.code()),
    };

    pcb.set_stack_base(ram, stack_ptr);
    pcb.set_stack_size(ram, USER_STACK_SIZE);
    pcb.set_sp(ram, stack_ptr - 1);
    for i in 0..8 {
        pcb.set_gpr(ram, i, 0);
    }
    pcb.set_state(ram, STATE_READY);
    pcb.set_priority(ram, DEFAULT_USER_PRIORITY);
    let new_pid = *res.pid;
    *res.pid += 1;
    pcb.set_pid(ram, new_pid);
    pcb.set_wait_reason(ram, WAIT_NONE);
    pcb.set_msgq_addr(ram, msgqid);
    pcb.set_msgq_capacity(ram, MSG_QUEUE_CAPACITY);
    pcb.set_msgq_count(ram, 0);

    res.rq.insert(ram, pcbptr);
    cpu.gpr[2] = new_pid;
    cpu.gpr[0] = OK;
    SyscallOutcome::Continue
}

fn fail(cpu: &mut Cpu, code: Word) -> SyscallOutcome {
    cpu.gpr[0] = code;
    SyscallOutcome::Continue
}

fn terminate(cpu: &mut Cpu, res: &mut Resources, pcb: Pcb) {
    let ram = &mut cpu.ram;
    res.user_pool.free(ram, pcb.stack_base(ram), pcb.stack_size(ram));
    res.kernel_pool.free(ram, pcb.msgq_addr(ram), MSG_QUEUE_CAPACITY);
    res.kernel_pool.free(ram, pcb.base as Word, PCB_SIZE);
}

fn task_delete(cpu: &mut Cpu, running: Pcb, res: &mut Resources) -> SyscallOutcome {
    let target = cpu.gpr[1];
    if target == 0 {
        return SyscallOutcome::Halt;
    }
    if target < 0 {
        cpu.gpr[0] = ER_TID;
        return SyscallOutcome::Continue;
    }
    if let Some(pcb) = res.wq.remove_pid(&mut cpu.ram, target) {
        terminate(cpu, res, pcb);
        cpu.gpr[0] = OK;
        return SyscallOutcome::Continue;
    }
    if let Some(pcb) = res.rq.remove_pid(&mut cpu.ram, target) {
        terminate(cpu, res, pcb);
        cpu.gpr[0] = OK;
        return SyscallOutcome::Continue;
    }
    if running.pid(&cpu.ram) == target {
        return SyscallOutcome::Halt;
    }
    cpu.gpr[0] = ER_TID;
    SyscallOutcome::Continue
}

fn task_inquiry(cpu: &mut Cpu, running: Pcb) -> SyscallOutcome {
    cpu.gpr[1] = running.pid(&cpu.ram);
    cpu.gpr[2] = running.priority(&cpu.ram);
    cpu.gpr[3] = running.state(&cpu.ram);
    cpu.gpr[0] = OK;
    SyscallOutcome::Continue
}

fn mem_alloc(cpu: &mut Cpu, pool: &mut FreeList) -> SyscallOutcome {
    match pool.alloc(&mut cpu.ram, cpu.gpr[2]) {
        Ok(ptr) => {
            cpu.gpr[1] = ptr;
            cpu.gpr[0] = OK;
        }
        Err(e) => cpu.gpr[0] = e.code(),
    }
    SyscallOutcome::Continue
}

fn mem_free(cpu: &mut Cpu, pool: &mut FreeList) -> SyscallOutcome {
    pool.free(&mut cpu.ram, cpu.gpr[1], cpu.gpr[2]);
    cpu.gpr[0] = OK;
    SyscallOutcome::Continue
}

/// Open question (a): delivering a message does not wake a WAITING target;
/// it re-enters RQ only through its own matching interrupt path (never,
/// since nothing else wakes a WAITINGMSG process here) — kept exactly as
/// `original_source` leaves it, not redesigned (spec.md §9(a)).
fn msg_qsend(cpu: &mut Cpu, res: &mut Resources) -> SyscallOutcome {
    let dest_pid = cpu.gpr[1];
    let msg = cpu.gpr[2];
    let ram = &mut cpu.ram;
    let target = res.wq.find_pid(ram, dest_pid).or_else(|| res.rq.find_pid(ram, dest_pid));
    let Some(target) = target else {
        cpu.gpr[0] = ER_TID;
        return SyscallOutcome::Continue;
    };
    let msgaddr = target.msgq_addr(ram);
    let count = target.msgq_count(ram);
    ram.set((msgaddr + count) as usize, msg);
    target.set_msgq_count(ram, count + 1);
    cpu.gpr[0] = OK;
    SyscallOutcome::Continue
}

/// Peeks (does not dequeue) the first queued word, exactly as spec.md §4.3
/// describes it — the message count only ever grows via `msg_qsend`.
fn msg_qreceive(cpu: &mut Cpu, running: Pcb) -> SyscallOutcome {
    let ram = &mut cpu.ram;
    if running.msgq_count(ram) == 0 {
        running.set_wait_reason(ram, WAIT_MSG);
        running.set_state(ram, STATE_WAITING);
        return SyscallOutcome::Waiting;
    }
    let msgqaddr = running.msgq_addr(ram);
    cpu.gpr[2] = ram.get(msgqaddr as usize);
    cpu.gpr[0] = OK;
    SyscallOutcome::Continue
}

fn io_getc(cpu: &mut Cpu, running: Pcb) -> SyscallOutcome {
    running.set_wait_reason(&mut cpu.ram, WAIT_GET);
    running.set_state(&mut cpu.ram, STATE_WAITING);
    SyscallOutcome::Waiting
}

/// Open question (b): the source sets `WAITINGGET` for both IO_GETC and
/// IO_PUTC, a latent bug spec.md §9(b) directs implementers to fix. Fixed
/// here to `WAIT_PUT`.
fn io_putc(cpu: &mut Cpu, running: Pcb) -> SyscallOutcome {
    running.set_wait_reason(&mut cpu.ram, WAIT_PUT);
    running.set_state(&mut cpu.ram, STATE_WAITING);
    SyscallOutcome::Waiting
}

fn time_get(cpu: &mut Cpu) -> SyscallOutcome {
    cpu.gpr[1] = cpu.clock;
    cpu.gpr[0] = OK;
    SyscallOutcome::Continue
}

fn time_set(cpu: &mut Cpu) -> SyscallOutcome {
    cpu.clock = cpu.gpr[1];
    cpu.gpr[0] = OK;
    SyscallOutcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn new_resources() -> (Cpu, Word, FreeList, FreeList, Queue, Queue) {
        let mut cpu = Cpu::new(Config::default());
        let user_pool = FreeList::new(&mut cpu.ram, 3_000, 4_000);
        let kernel_pool = FreeList::new(&mut cpu.ram, 7_000, 2_975);
        (cpu, 1, user_pool, kernel_pool, Queue::new(), Queue::new())
    }

    #[test]
    fn task_create_then_delete_restores_pool_state() {
        let (mut cpu, mut pid, mut user_pool, mut kernel_pool, mut rq, mut wq) = new_resources();
        let kernel_head_before = kernel_pool.head();
        let user_head_before = user_pool.head();

        cpu.gpr[3] = 42; // entry pc
        let mut res = Resources { pid: &mut pid, user_pool: &mut user_pool, kernel_pool: &mut kernel_pool, rq: &mut rq, wq: &mut wq };
        let outcome = task_create(&mut cpu, &mut res);
        assert_eq!(outcome, SyscallOutcome::Continue);
        assert_eq!(cpu.gpr[0], OK);
        let child_pid = cpu.gpr[2];

        cpu.gpr[1] = child_pid;
        let mut res = Resources { pid: &mut pid, user_pool: &mut user_pool, kernel_pool: &mut kernel_pool, rq: &mut rq, wq: &mut wq };
        let running = Pcb::at(9_000); // arbitrary, not the target
        let outcome = task_delete(&mut cpu, running, &mut res);
        assert_eq!(outcome, SyscallOutcome::Continue);
        assert_eq!(cpu.gpr[0], OK);

        assert_eq!(kernel_pool.head(), kernel_head_before);
        assert_eq!(user_pool.head(), user_head_before);
    }

    #[test]
    fn task_delete_of_running_process_halts() {
        let (mut cpu, mut pid, mut user_pool, mut kernel_pool, mut rq, mut wq) = new_resources();
        let running = Pcb::at(7_000);
        running.set_pid(&mut cpu.ram, 9);
        cpu.gpr[1] = 9;
        let mut res = Resources { pid: &mut pid, user_pool: &mut user_pool, kernel_pool: &mut kernel_pool, rq: &mut rq, wq: &mut wq };
        assert_eq!(task_delete(&mut cpu, running, &mut res), SyscallOutcome::Halt);
    }

    #[test]
    fn task_delete_of_pid_zero_halts() {
        let (mut cpu, mut pid, mut user_pool, mut kernel_pool, mut rq, mut wq) = new_resources();
        cpu.gpr[1] = 0;
        let running = Pcb::at(7_000);
        let mut res = Resources { pid: &mut pid, user_pool: &mut user_pool, kernel_pool: &mut kernel_pool, rq: &mut rq, wq: &mut wq };
        assert_eq!(task_delete(&mut cpu, running, &mut res), SyscallOutcome::Halt);
    }

    #[test]
    fn unknown_pid_delete_is_er_tid() {
        let (mut cpu, mut pid, mut user_pool, mut kernel_pool, mut rq, mut wq) = new_resources();
        cpu.gpr[1] = 999;
        let running = Pcb::at(7_000);
        running.set_pid(&mut cpu.ram, 1);
        let mut res = Resources { pid: &mut pid, user_pool: &mut user_pool, kernel_pool: &mut kernel_pool, rq: &mut rq, wq: &mut wq };
        assert_eq!(task_delete(&mut cpu, running, &mut res), SyscallOutcome::Continue);
        assert_eq!(cpu.gpr[0], ER_TID);
    }

    #[test]
    fn io_putc_sets_waiting_put_not_waiting_get() {
        let (mut cpu, ..) = new_resources();
        let running = Pcb::at(7_000);
        io_putc(&mut cpu, running);
        assert_eq!(running.wait_reason(&cpu.ram), WAIT_PUT);
        assert_eq!(running.state(&cpu.ram), STATE_WAITING);
    }

    #[test]
    fn msg_send_does_not_wake_receiver() {
        let (mut cpu, mut pid, mut user_pool, mut kernel_pool, mut rq, mut wq) = new_resources();
        let receiver = Pcb::at(7_000);
        receiver.set_pid(&mut cpu.ram, 5);
        receiver.set_priority(&mut cpu.ram, 10);
        receiver.set_state(&mut cpu.ram, STATE_WAITING);
        receiver.set_msgq_addr(&mut cpu.ram, 8_000);
        receiver.set_msgq_count(&mut cpu.ram, 0);
        wq.insert(&mut cpu.ram, 7_000);

        cpu.gpr[1] = 5;
        cpu.gpr[2] = 77;
        let mut res = Resources { pid: &mut pid, user_pool: &mut user_pool, kernel_pool: &mut kernel_pool, rq: &mut rq, wq: &mut wq };
        let outcome = msg_qsend(&mut cpu, &mut res);
        assert_eq!(outcome, SyscallOutcome::Continue);
        assert_eq!(cpu.gpr[0], OK);

        assert_eq!(receiver.msgq_count(&cpu.ram), 1);
        assert_eq!(cpu.ram.get(8_000), 77);
        // Still in WQ: msg_qsend never re-inserts into RQ.
        assert!(!wq.is_empty());
        assert!(rq.is_empty());
    }

    #[test]
    fn msg_receive_peeks_without_dequeueing() {
        let (mut cpu, ..) = new_resources();
        let running = Pcb::at(7_000);
        running.set_msgq_addr(&mut cpu.ram, 8_000);
        running.set_msgq_count(&mut cpu.ram, 1);
        cpu.ram.set(8_000, 123);

        assert_eq!(msg_qreceive(&mut cpu, running), SyscallOutcome::Continue);
        assert_eq!(cpu.gpr[2], 123);
        assert_eq!(running.msgq_count(&cpu.ram), 1); // unchanged
    }

    #[test]
    fn mem_alloc_then_free_round_trips() {
        let (mut cpu, ..) = new_resources();
        let mut pool = FreeList::new(&mut cpu.ram, 3_000, 100);
        cpu.gpr[2] = 10;
        mem_alloc(&mut cpu, &mut pool);
        assert_eq!(cpu.gpr[0], OK);
        let ptr = cpu.gpr[1];

        cpu.gpr[1] = ptr;
        cpu.gpr[2] = 10;
        mem_free(&mut cpu, &mut pool);
        assert_eq!(cpu.gpr[0], OK);
        assert_eq!(pool.head(), 3_000);
    }

    #[test]
    fn unknown_call_id_is_er_isc() {
        let (mut cpu, mut pid, mut user_pool, mut kernel_pool, mut rq, mut wq) = new_resources();
        let running = Pcb::at(7_000);
        let mut res = Resources { pid: &mut pid, user_pool: &mut user_pool, kernel_pool: &mut kernel_pool, rq: &mut rq, wq: &mut wq };
        assert_eq!(dispatch(999, &mut cpu, running, &mut res), SyscallOutcome::Continue);
        assert_eq!(cpu.gpr[0], ER_ISC);
    }
}
