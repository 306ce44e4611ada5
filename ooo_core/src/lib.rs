//! Out-of-order execution core: Reservation Station, Load/Store Queue and
//! pipelined divider, wired together through a single per-tick broadcast bus.
//!
//! Each collaborator exposes its own `tick()` and is otherwise independent;
//! [`Core`] only owns the three and threads one [`Forward`] between them, the
//! way the source's top-level module threads its single result bus between
//! the RS, LSQ and DIV submodules.

#[macro_use]
extern crate log;

pub mod div;
pub mod error;
pub mod lsq;
pub mod rs;
pub mod types;

pub use error::Error;
pub use types::{AluOp, DecodedSignals, Forward, OperandSlot, RobIndex, LSQ_SIZE, RS_SIZE};

use div::{Div, DivIssue, DivResult};
use lsq::{Lsq, LsqAlloc, LsqTick};
use rs::{Rs, RsAlloc, RsIssue};

/// What to allocate into the core this tick, keyed by destination (RS entries
/// are keyed by ROB tag, per invariant I1; LSQ entries always land at tail).
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreAlloc {
    pub rs: Option<RsAlloc>,
    pub lsq: Option<LsqAlloc>,
    pub div: Option<DivIssue>,
}

/// Everything the core's collaborators produced this tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreTick {
    pub rs: RsIssue,
    pub lsq: LsqTick,
    pub div: Option<DivResult>,
}

/// Glues the three execution-side collaborators together behind one
/// [`Forward`] bus. The bus itself — arbitrating which functional unit's
/// result wins a given tick, and turning that into the next tick's `fwd` — is
/// the caller's responsibility (it belongs to the ROB/writeback stage, out of
/// scope for this crate per the source's own component boundary).
pub struct Core {
    rs: Rs,
    lsq: Lsq,
    div: Div,
}

impl Core {
    /// `depth_log`: word-addressable depth of the data cache backing the LSQ,
    /// in bits. See [`Lsq::new`].
    pub fn new(depth_log: u32) -> Result<Self, Error> {
        Ok(Core { rs: Rs::new(), lsq: Lsq::new(depth_log)?, div: Div::new() })
    }

    /// Advance every collaborator by one tick, broadcasting `fwd` to all of
    /// them. `rob_head_index` gates the LSQ's in-order store execution
    /// (§4.3); `clear` is the shared pipeline-flush signal (§4.5).
    pub fn tick(&mut self, alloc: CoreAlloc, fwd: Forward, rob_head_index: RobIndex, clear: bool) -> CoreTick {
        let rs = self.rs.tick(alloc.rs, fwd, clear);
        let lsq = self.lsq.tick(alloc.lsq, fwd, rob_head_index, clear);
        let div = self.div.tick(alloc.div, clear);
        CoreTick { rs, lsq, div }
    }

    pub fn is_allocated(&self, rob_index: RobIndex) -> bool {
        self.rs.is_allocated(rob_index)
    }

    pub fn lsq_size(&self) -> u8 {
        self.lsq.size()
    }

    pub fn lsq_is_full(&self) -> bool {
        self.lsq.is_full()
    }

    /// Derive the RS/ROB tag a wider instruction index would occupy, e.g. when
    /// a caller tracks a larger in-flight window than the RS itself holds.
    pub fn rob_tag(index: u32) -> RobIndex {
        rs::rob_tag(index)
    }
}
