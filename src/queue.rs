//! Ready/wait queues. Both are singly linked lists threaded through PCB cell
//! 0 (spec.md §4.5), grounded in `original_source/ComputerSimulator.py`'s
//! `insertRQ`/`insertWQ`/`searchRemoveRQ`/`searchRemoveWQ`/`removeFromRQ`.
//! The two original functions are identical but for which head pointer they
//! touch, so here they are one generic `Queue` instantiated twice.

use crate::config::{EOL, MAX_PCB_PTR};
use crate::error::Word;
use crate::memory::Ram;
use crate::pcb::Pcb;

#[derive(Debug, Default)]
pub struct Queue {
    head: Word,
}

impl Queue {
    pub fn new() -> Self {
        Queue { head: EOL }
    }

    pub fn is_empty(&self) -> bool {
        self.head == EOL
    }

    pub fn head(&self) -> Option<Pcb> {
        if self.head == EOL {
            None
        } else {
            Some(Pcb::at(self.head as usize))
        }
    }

    /// Inserts `pcbptr` in priority order (lower priority value first),
    /// appended after any existing entries of equal priority (spec.md §4.5).
    /// Silently ignored if the pointer falls outside the kernel pool, same
    /// as the original's bounds guard.
    pub fn insert(&mut self, ram: &mut Ram, pcbptr: Word) {
        if !(crate::config::KERNEL_POOL_START as Word..=MAX_PCB_PTR as Word).contains(&pcbptr) {
            return;
        }
        let incoming = Pcb::at(pcbptr as usize);

        if self.head == EOL {
            self.head = pcbptr;
            return;
        }

        let mut ptr = self.head;
        let mut previous = EOL;
        while ptr != EOL {
            let node = Pcb::at(ptr as usize);
            if incoming.priority(ram) >= node.priority(ram) {
                previous = ptr;
                ptr = node.next(ram);
            } else {
                if ptr == self.head {
                    incoming.set_next(ram, self.head);
                    self.head = pcbptr;
                } else {
                    incoming.set_next(ram, ptr);
                    Pcb::at(previous as usize).set_next(ram, pcbptr);
                }
                return;
            }
        }
        // Reached the end without finding a strictly-lower-priority entry.
        Pcb::at(previous as usize).set_next(ram, pcbptr);
    }

    /// Removes and returns the head entry, if any.
    pub fn remove_head(&mut self, ram: &mut Ram) -> Option<Pcb> {
        if self.head == EOL {
            return None;
        }
        let pcbptr = self.head;
        let pcb = Pcb::at(pcbptr as usize);
        self.head = pcb.next(ram);
        pcb.set_next(ram, EOL);
        Some(pcb)
    }

    /// Finds and unlinks the entry for `pid`, if present.
    pub fn remove_pid(&mut self, ram: &mut Ram, pid: Word) -> Option<Pcb> {
        let mut ptr = self.head;
        let mut previous = EOL;
        while ptr != EOL {
            let pcb = Pcb::at(ptr as usize);
            if pcb.pid(ram) == pid {
                if previous == EOL {
                    self.head = pcb.next(ram);
                } else {
                    Pcb::at(previous as usize).set_next(ram, pcb.next(ram));
                }
                pcb.set_next(ram, EOL);
                return Some(pcb);
            }
            previous = ptr;
            ptr = pcb.next(ram);
        }
        None
    }

    /// Finds an entry by pid without removing it.
    pub fn find_pid(&self, ram: &Ram, pid: Word) -> Option<Pcb> {
        let mut ptr = self.head;
        while ptr != EOL {
            let pcb = Pcb::at(ptr as usize);
            if pcb.pid(ram) == pid {
                return Some(pcb);
            }
            ptr = pcb.next(ram);
        }
        None
    }
}
