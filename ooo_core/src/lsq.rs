//! Load/Store Queue: an in-order ring buffer of memory operations. Loads may
//! resolve their operands out of order, but all memory operations — loads and
//! stores alike — execute against the data cache strictly from `head`, and
//! stores additionally wait for the ROB head to reach them (§4.3).

use crate::types::{DecodedSignals, Forward, OperandSlot, RobIndex, LSQ_SIZE};

#[derive(Debug, Clone, Copy, Default)]
struct LsqEntry {
    allocated: bool,
    rob_index: RobIndex,
    is_load: bool,
    is_store: bool,
    rs1: u8,
    rs2: u8,
    rs1_op: OperandSlot,
    rs2_op: OperandSlot,
    imm: u32,
    addr: u32,
    ready: bool,
}

/// Allocation request for the tail of the queue.
#[derive(Debug, Clone, Copy)]
pub struct LsqAlloc {
    pub rob_index: RobIndex,
    pub signals: DecodedSignals,
    pub rs1_op: OperandSlot,
    pub rs2_op: OperandSlot,
    pub pc: u32,
}

/// The data-cache port driven by the head entry this tick (§6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheRequest {
    pub we: bool,
    pub re: bool,
    pub addr: u32,
    pub wdata: u32,
    /// Byte offset within the addressed word (`addr[0:1]`), for sub-word loads.
    pub byte_offset: u8,
}

/// Published each tick so the ROB can retire the head memory op once it executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retirement {
    pub rob_index: RobIndex,
    pub pc_next: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LsqTick {
    pub cache: CacheRequest,
    pub retire: Option<Retirement>,
    /// Whether the allocation request (if any) was accepted this tick, so the
    /// caller can observe a dropped allocation without probing `is_full` first.
    pub allocated: bool,
}

pub struct Lsq {
    entries: [LsqEntry; LSQ_SIZE],
    head: u8,
    tail: u8,
    size: u8,
    depth_log: u32,
}

impl Lsq {
    /// `depth_log`: word-addressable depth of the data cache, in bits
    /// (the cache holds `2^depth_log` words).
    pub fn new(depth_log: u32) -> Result<Self, crate::Error> {
        if depth_log == 0 || depth_log > 30 {
            return Err(crate::Error::InvalidDepthLog(depth_log));
        }
        Ok(Lsq {
            entries: [LsqEntry::default(); LSQ_SIZE],
            head: 0,
            tail: 0,
            size: 0,
            depth_log,
        })
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn head(&self) -> u8 {
        self.head
    }

    pub fn tail(&self) -> u8 {
        self.tail
    }

    /// `full := (size + 1 == LSQ_SIZE)`, the gating formula specified verbatim
    /// in §4.3: a new entry is refused once 7 of the 8 slots are occupied.
    pub fn is_full(&self) -> bool {
        self.size as usize + 1 == LSQ_SIZE
    }

    /// Advance the Load/Store Queue by one tick. See the synchronous read rule
    /// in §3: `cache`/`retire` reflect the head entry as committed at the end
    /// of the previous tick, before this tick's allocation or wake-up lands.
    pub fn tick(&mut self, alloc: Option<LsqAlloc>, fwd: Forward, rob_head_index: RobIndex, clear: bool) -> LsqTick {
        let head_idx = self.head as usize % LSQ_SIZE;
        let head = self.entries[head_idx];

        let addr = head.rs1_op.value.wrapping_add(head.imm);
        let word_mask = (1u32 << self.depth_log).wrapping_sub(1);
        let cache_addr = (addr >> 2) & word_mask;
        let byte_offset = (addr & 0b11) as u8;

        let can_execute_store = head.rob_index == rob_head_index;
        let condition_met = !head.is_store || can_execute_store;
        let execute_valid = head.allocated && head.ready && !clear && condition_met;

        let cache = CacheRequest {
            we: head.is_store && execute_valid,
            re: head.is_load && execute_valid,
            addr: cache_addr,
            wdata: head.rs2_op.value,
            byte_offset,
        };
        let retire = execute_valid.then(|| Retirement {
            rob_index: head.rob_index,
            pc_next: head.addr.wrapping_add(4),
        });

        let write_valid = alloc.is_some() && !self.is_full() && !clear;
        if alloc.is_some() && !write_valid && !clear {
            warn!("lsq: dropped allocation, queue full (size={})", self.size);
        }
        let tail_idx = self.tail as usize % LSQ_SIZE;

        // Wake-up: every allocated entry except the one about to be freshly
        // written at `tail_idx` this same tick (whose own ready bit is set
        // from its allocation-time, wake-up-applied operands instead).
        for (i, e) in self.entries.iter_mut().enumerate() {
            if !(write_valid && i == tail_idx) {
                e.rs1_op.wake(fwd);
                e.rs2_op.wake(fwd);
                if e.allocated {
                    e.ready = e.rs1_op.ready() && e.rs2_op.ready();
                }
            }
        }

        if execute_valid {
            self.entries[head_idx].allocated = false;
            self.head = (self.head + 1) % LSQ_SIZE as u8;
        }

        if write_valid {
            let req = alloc.unwrap();
            let mut rs1_op = req.rs1_op;
            let mut rs2_op = req.rs2_op;
            rs1_op.wake(fwd);
            rs2_op.wake(fwd);
            let ready = rs1_op.ready() && rs2_op.ready();
            self.entries[tail_idx] = LsqEntry {
                allocated: true,
                rob_index: req.rob_index,
                is_load: req.signals.is_load,
                is_store: req.signals.is_store,
                rs1: req.signals.rs1,
                rs2: req.signals.rs2,
                rs1_op,
                rs2_op,
                imm: req.signals.imm,
                addr: req.pc,
                ready,
            };
            self.tail = (self.tail + 1) % LSQ_SIZE as u8;
        }

        if !clear {
            self.size = self.size + write_valid as u8 - execute_valid as u8;
        }

        if clear {
            trace!("lsq: clear, resetting head/tail/size and dropping all entries");
            self.head = 0;
            self.tail = 0;
            self.size = 0;
            for e in self.entries.iter_mut() {
                e.allocated = false;
            }
        }

        debug_assert_eq!(
            self.size as usize,
            self.entries.iter().filter(|e| e.allocated).count()
        );

        LsqTick { cache, retire, allocated: write_valid }
    }
}
