//! Named constants for the machine's fixed layout and defaults, gathered in
//! one place instead of scattered as literals through the kernel — the same
//! role `em68k/src/atari.rs` plays for its board's memory map.

use std::path::PathBuf;

/// Address regions, PCB shape, and scheduling defaults. These are not
/// user-tunable in the sense of a config file; spec.md fixes every one of
/// them. `Config` exists so call sites name `cfg.timeslice` instead of a bare
/// `200`, and so tests can shrink the timeslice without touching the kernel.
#[derive(Debug, Clone)]
pub struct Config {
    pub timeslice: i64,
    pub disk_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeslice: DEFAULT_TIMESLICE,
            disk_path: PathBuf::from("simos.dsk"),
        }
    }
}

pub const RAM_SIZE: usize = 10_000;

pub const PROGRAM_AREA_START: usize = 0;
pub const PROGRAM_AREA_END: usize = 3_000;

pub const USER_POOL_START: usize = 3_000;
pub const USER_POOL_END: usize = 7_000;

pub const KERNEL_POOL_START: usize = 7_000;
/// Free-list initialization bound (spec.md §4.2): the kernel pool's sole
/// initial block has this many cells total starting at `KERNEL_POOL_START`.
pub const KERNEL_POOL_END: usize = 9_975;
/// Queue-insert validity bound (spec.md §4.5/§9(e)): one cell short of
/// `KERNEL_POOL_END` because a valid PCB base must leave room for its own
/// 25-cell body without running into the unused tail. Kept as its own named
/// constant rather than derived, because spec.md insists on both exact
/// values independently.
pub const MAX_PCB_PTR: usize = 9_974;

pub const DEFAULT_TIMESLICE: i64 = 200;
pub const DEFAULT_USER_PRIORITY: i64 = 127;
pub const IDLE_PRIORITY: i64 = 0;
pub const USER_STACK_SIZE: i64 = 10;
pub const PCB_SIZE: i64 = 25;
pub const MSG_QUEUE_CAPACITY: i64 = 10;

pub const EOL: i64 = -1;

pub const DISK_SECTORS: usize = 1_000;
pub const DISK_SECTOR_SIZE: usize = 128;
pub const PARTITION_TYPE: i64 = 42;
pub const FAT_SIZE: i64 = 20;
