//! Reservation Station: holds decoded ALU/MUL instructions until their operands
//! are ready, then issues one ALU-bound and one MUL-bound instruction per tick.
//!
//! Entries are indexed by the producing ROB tag rather than a free list
//! (invariant I1), which is why `allocate` takes the destination index rather
//! than picking one itself.

use ooo_util::Bit;

use crate::types::{AluOp, DecodedSignals, Forward, OperandSlot, RobIndex, RS_SIZE};

#[derive(Debug, Clone, Copy, Default)]
struct RsEntry {
    allocated: bool,
    rob_index: RobIndex,
    rs1: u8,
    rs2: u8,
    rs1_op: OperandSlot,
    rs2_op: OperandSlot,
    imm: u32,
    has_imm: bool,
    link_pc: bool,
    is_jalr: bool,
    alu_type: AluOp,
    cond: AluOp,
    flip: bool,
    is_branch: bool,
    addr: u32,
    get_high_bit: bool,
    rs1_sign: bool,
    rs2_sign: bool,
}

/// Allocation request for one RS slot. `rob_index` both names the destination
/// slot and is stored in it (invariant I1).
#[derive(Debug, Clone, Copy)]
pub struct RsAlloc {
    pub rob_index: RobIndex,
    pub signals: DecodedSignals,
    pub rs1_op: OperandSlot,
    pub rs2_op: OperandSlot,
    pub pc: u32,
}

/// Issue bundle handed to the scalar ALU collaborator.
#[derive(Debug, Clone, Copy)]
pub struct AluIssue {
    pub rob_index: RobIndex,
    pub pc: u32,
    pub a: u32,
    pub b: u32,
    pub alu_a: u32,
    pub alu_b: u32,
    pub cond: AluOp,
    pub flip: bool,
    pub is_branch: bool,
    pub link_pc: bool,
    pub is_jalr: bool,
    pub alu_type: AluOp,
}

/// Issue bundle handed to the multiplier collaborator.
#[derive(Debug, Clone, Copy)]
pub struct MulIssue {
    pub rob_index: RobIndex,
    pub pc: u32,
    pub alu_a: u32,
    pub alu_b: u32,
    pub get_high_bit: bool,
    pub rs1_sign: bool,
    pub rs2_sign: bool,
    pub alu_type: AluOp,
}

/// What this tick's `tick()` call produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsIssue {
    pub alu: Option<AluIssue>,
    pub mul: Option<MulIssue>,
}

pub struct Rs {
    entries: [RsEntry; RS_SIZE],
}

impl Default for Rs {
    fn default() -> Self {
        Self::new()
    }
}

impl Rs {
    pub fn new() -> Self {
        Rs { entries: [RsEntry::default(); RS_SIZE] }
    }

    /// Whether slot `rob_index` is currently occupied.
    pub fn is_allocated(&self, rob_index: RobIndex) -> bool {
        self.entries[rob_index as usize].allocated
    }

    /// Advance the Reservation Station by one tick.
    ///
    /// Selection and the `AluIssue`/`MulIssue` bundles are computed from the
    /// state as committed at the end of the *previous* tick (§3, synchronous
    /// read rule); `alloc` and `fwd` are then applied to produce the state for
    /// the next tick. An entry allocated this tick is therefore never chosen
    /// by this same call, even if it would be immediately ready.
    pub fn tick(&mut self, alloc: Option<RsAlloc>, fwd: Forward, clear: bool) -> RsIssue {
        let already_allocated: [bool; RS_SIZE] =
            std::array::from_fn(|i| self.entries[i].allocated);

        let mut alu_idx = None;
        let mut mul_idx = None;
        if !clear {
            for (i, e) in self.entries.iter().enumerate() {
                if e.allocated && e.rs1_op.ready() && e.rs2_op.ready() {
                    if e.alu_type.is_mul() {
                        mul_idx = Some(i);
                    } else {
                        alu_idx = Some(i);
                    }
                }
            }
        }

        let issue = RsIssue {
            alu: alu_idx.map(|i| self.alu_bundle(i)),
            mul: mul_idx.map(|i| self.mul_bundle(i)),
        };

        for e in self.entries.iter_mut() {
            if e.allocated {
                e.rs1_op.wake(fwd);
                e.rs2_op.wake(fwd);
            }
        }

        if let Some(i) = alu_idx {
            self.entries[i].allocated = false;
        }
        if let Some(i) = mul_idx {
            self.entries[i].allocated = false;
        }

        if let Some(req) = alloc {
            let idx = req.rob_index as usize;
            if already_allocated[idx] {
                warn!("rs: dropped allocation into occupied slot {idx}");
            } else {
                let mut rs1_op = req.rs1_op;
                let mut rs2_op = req.rs2_op;
                rs1_op.wake(fwd);
                rs2_op.wake(fwd);
                self.entries[idx] = RsEntry {
                    allocated: true,
                    rob_index: req.rob_index,
                    rs1: req.signals.rs1,
                    rs2: req.signals.rs2,
                    rs1_op,
                    rs2_op,
                    imm: req.signals.imm,
                    has_imm: req.signals.imm_valid,
                    link_pc: req.signals.link_pc,
                    is_jalr: req.signals.is_jalr,
                    alu_type: req.signals.alu,
                    cond: req.signals.cond,
                    flip: req.signals.flip,
                    is_branch: req.signals.is_branch,
                    addr: req.pc,
                    get_high_bit: req.signals.get_high_bit,
                    rs1_sign: req.signals.rs1_sign,
                    rs2_sign: req.signals.rs2_sign,
                };
            }
        }

        if clear {
            trace!("rs: clear, dropping all allocated entries");
            for e in self.entries.iter_mut() {
                e.allocated = false;
            }
        }

        debug_assert!(self.entries.iter().enumerate().all(|(i, e)| !e.allocated || e.rob_index as usize == i));

        issue
    }

    fn operand_values(&self, i: usize) -> (u32, u32) {
        let e = &self.entries[i];
        let a = if e.rs1 == 0 { 0 } else { e.rs1_op.value };
        let b = if e.rs2 == 0 { 0 } else { e.rs2_op.value };
        (a, b)
    }

    fn alu_bundle(&self, i: usize) -> AluIssue {
        let e = &self.entries[i];
        let (a, b) = self.operand_values(i);
        let alu_a = if e.is_branch { e.addr } else { a };
        let alu_b = if e.has_imm { e.imm } else { b };
        AluIssue {
            rob_index: e.rob_index,
            pc: e.addr,
            a,
            b,
            alu_a,
            alu_b,
            cond: e.cond,
            flip: e.flip,
            is_branch: e.is_branch,
            link_pc: e.link_pc,
            is_jalr: e.is_jalr,
            alu_type: e.alu_type,
        }
    }

    fn mul_bundle(&self, i: usize) -> MulIssue {
        let e = &self.entries[i];
        let (a, b) = self.operand_values(i);
        MulIssue {
            rob_index: e.rob_index,
            pc: e.addr,
            alu_a: a,
            alu_b: b,
            get_high_bit: e.get_high_bit,
            rs1_sign: e.rs1_sign,
            rs2_sign: e.rs2_sign,
            alu_type: e.alu_type,
        }
    }
}

/// Decode a 3-bit ROB tag out of a wider index, matching the `bit_range`
/// convention used throughout the HDL source this crate is modeled on.
pub fn rob_tag(index: u32) -> RobIndex {
    index.bit_range(0, 2) as RobIndex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(rob_index: RobIndex, alu_type: AluOp, rs1_op: OperandSlot, rs2_op: OperandSlot) -> RsAlloc {
        RsAlloc {
            rob_index,
            signals: DecodedSignals {
                rs1: 1,
                rs1_valid: true,
                rs2: 2,
                rs2_valid: true,
                alu: alu_type,
                ..Default::default()
            },
            rs1_op,
            rs2_op,
            pc: 0x1000,
        }
    }

    #[test]
    fn s1_wake_up_on_allocation() {
        let mut rs = Rs::new();
        let fwd = Forward::new(3, 0xDEADBEEF);
        let req = alloc(5, AluOp::Add, OperandSlot::pending(3), OperandSlot::resolved(0));
        let issue = rs.tick(Some(req), fwd, false);
        assert!(issue.alu.is_none());
        assert!(issue.mul.is_none());

        // Next tick: entry 5's rs1 should already be resolved, with no further broadcast.
        let issue = rs.tick(None, Forward::NONE, false);
        let bundle = issue.alu.expect("entry 5 should be ready to issue");
        assert_eq!(bundle.rob_index, 5);
        assert_eq!(bundle.a, 0xDEADBEEF);
    }

    #[test]
    fn s6_mul_vs_alu_same_tick() {
        let mut rs = Rs::new();
        rs.tick(Some(alloc(2, AluOp::Mul, OperandSlot::resolved(10), OperandSlot::resolved(20))), Forward::NONE, false);
        rs.tick(Some(alloc(5, AluOp::Add, OperandSlot::resolved(1), OperandSlot::resolved(2))), Forward::NONE, false);

        let issue = rs.tick(None, Forward::NONE, false);
        assert_eq!(issue.alu.unwrap().rob_index, 5);
        assert_eq!(issue.mul.unwrap().rob_index, 2);
        assert!(!rs.is_allocated(5));
        assert!(!rs.is_allocated(2));
    }

    #[test]
    fn selection_tie_break_picks_last_index() {
        // Construct a tick where entries 1 and 4 become ready *simultaneously*:
        // entry 1 is allocated pending on tag 7, and resolves on the same tick
        // entry 4 is allocated already-ready, so both are only visible to
        // selection starting the tick after.
        let mut rs = Rs::new();
        rs.tick(Some(alloc(1, AluOp::Add, OperandSlot::pending(7), OperandSlot::resolved(1))), Forward::NONE, false);
        let issue = rs.tick(
            Some(alloc(4, AluOp::Sub, OperandSlot::resolved(1), OperandSlot::resolved(1))),
            Forward::new(7, 0xAAAA),
            false,
        );
        assert!(issue.alu.is_none(), "neither entry is visible to selection on its own allocating tick");

        let issue = rs.tick(None, Forward::NONE, false);
        assert_eq!(issue.alu.unwrap().rob_index, 4);
    }

    #[test]
    fn allocation_into_occupied_slot_is_a_no_op() {
        let mut rs = Rs::new();
        rs.tick(Some(alloc(3, AluOp::Add, OperandSlot::pending(0), OperandSlot::resolved(1))), Forward::NONE, false);
        // Second allocate into the same still-occupied slot must be dropped.
        rs.tick(Some(alloc(3, AluOp::Sub, OperandSlot::resolved(9), OperandSlot::resolved(9))), Forward::new(0, 1), false);

        let issue = rs.tick(None, Forward::NONE, false);
        // If the second allocate had won, alu_type would be Sub and rs1 resolved to 9.
        let bundle = issue.alu.unwrap();
        assert_eq!(bundle.alu_type, AluOp::Add);
    }

    #[test]
    fn clear_drops_pending_issue_and_wipes_all_entries() {
        let mut rs = Rs::new();
        rs.tick(Some(alloc(1, AluOp::Add, OperandSlot::resolved(1), OperandSlot::resolved(1))), Forward::NONE, false);
        let issue = rs.tick(None, Forward::NONE, true);
        assert!(issue.alu.is_none());
        assert!(!rs.is_allocated(1));
    }

    #[test]
    fn register_zero_is_hardwired() {
        let mut rs = Rs::new();
        let mut req = alloc(0, AluOp::Add, OperandSlot::resolved(0xFFFF_FFFF), OperandSlot::resolved(1));
        req.signals.rs1 = 0;
        rs.tick(Some(req), Forward::NONE, false);
        let issue = rs.tick(None, Forward::NONE, false);
        assert_eq!(issue.alu.unwrap().a, 0);
    }
}
