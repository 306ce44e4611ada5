//! Shared wire-level types consumed by [`crate::rs`], [`crate::lsq`] and [`crate::div`].
//!
//! # Register file indexing
//!
//! The source HDL carries `alu`/`cond` as a one-hot vector whose width is a
//! compile-time constant (`RV32I_ALU.CNT`) with `ALU_MUL` and `ALU_NONE` as
//! distinguished positions. A one-hot vector is an artifact of the register-file
//! substrate it was built on top of (see the design notes in `DESIGN.md`): in
//! plain Rust it collapses to a closed enum, which is what [`AluOp`] is.

use serde::{Deserialize, Serialize};

/// Number of entries in the Reservation Station.
pub const RS_SIZE: usize = 8;
/// Number of entries in the Load/Store Queue.
pub const LSQ_SIZE: usize = 8;

/// A Reorder Buffer tag. Only the low 3 bits are meaningful; RS entries are
/// indexed directly by this value (see [`crate::rs`]).
pub type RobIndex = u8;

/// The integer/mul opcode space. `Mul` and `None` play the role of the source's
/// `ALU_MUL`/`ALU_NONE` one-hot positions; every other RV32I integer op is a
/// plain variant rather than a bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AluOp {
    #[default]
    None,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sra,
    Slt,
    Sltu,
    Eq,
    Ne,
    Mul,
    MulH,
    MulHsu,
    MulHu,
}

impl AluOp {
    /// Whether this opcode is routed to the multiplier port rather than the ALU port.
    pub fn is_mul(self) -> bool {
        matches!(self, AluOp::Mul | AluOp::MulH | AluOp::MulHsu | AluOp::MulHu)
    }
}

/// The decoder output bundle consumed by RS and LSQ at allocation time. Decode
/// itself is out of scope for this crate; this is the contract decode is
/// expected to produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodedSignals {
    pub rs1: u8,
    pub rs1_valid: bool,
    pub rs2: u8,
    pub rs2_valid: bool,
    pub imm: u32,
    pub imm_valid: bool,
    pub is_load: bool,
    pub is_store: bool,
    pub alu: AluOp,
    pub cond: AluOp,
    pub flip: bool,
    pub is_branch: bool,
    pub link_pc: bool,
    pub is_jalr: bool,
    pub get_high_bit: bool,
    pub rs1_sign: bool,
    pub rs2_sign: bool,
}

/// The single-writer, multi-reader broadcast bus described in §5: one
/// `(tag, value)` pair per tick, consumed by both RS and LSQ. Arbitrating
/// between multiple functional units that complete on the same tick is the
/// caller's responsibility, not this crate's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Forward {
    pub valid: bool,
    pub tag: RobIndex,
    pub value: u32,
}

impl Forward {
    pub const NONE: Forward = Forward { valid: false, tag: 0, value: 0 };

    pub fn new(tag: RobIndex, value: u32) -> Self {
        Forward { valid: true, tag, value }
    }
}

/// A single waiting operand: either a resolved `value`, or a pending `recorder`
/// tag to wake up on. `used` records whether the instruction actually reads
/// this operand at all (invariant I3: `waiting ⇒ used`).
///
/// This is the wake-up contract of §4.1, factored out once rather than
/// duplicated between RS and LSQ entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandSlot {
    pub value: u32,
    pub used: bool,
    pub recorder: RobIndex,
    pub waiting: bool,
}

impl OperandSlot {
    /// A resolved operand that needs no further forwarding.
    pub fn resolved(value: u32) -> Self {
        OperandSlot { value, used: true, recorder: 0, waiting: false }
    }

    /// An operand still waiting on `recorder` to broadcast.
    pub fn pending(recorder: RobIndex) -> Self {
        OperandSlot { value: 0, used: true, recorder, waiting: true }
    }

    /// An operand the instruction does not use at all.
    pub fn unused() -> Self {
        OperandSlot { value: 0, used: false, recorder: 0, waiting: false }
    }

    /// Apply the wake-up rule of §4.1 against this tick's broadcast. A no-op if
    /// this slot is not waiting, or is waiting on a different tag.
    pub fn wake(&mut self, fwd: Forward) {
        if self.waiting && fwd.valid && self.recorder == fwd.tag {
            self.waiting = false;
            self.value = fwd.value;
        }
    }

    /// Invariant I4: an operand slot is "ready" either because the instruction
    /// doesn't use it, or because it is no longer waiting on a recorder.
    pub fn ready(&self) -> bool {
        !self.used || !self.waiting
    }
}
