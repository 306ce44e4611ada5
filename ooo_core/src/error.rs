//! Construction-time errors for the out-of-order core.
//!
//! The per-tick hot path ([`crate::rs::Rs::tick`], [`crate::lsq::Lsq::tick`],
//! [`crate::div::Div::tick`]) never returns a `Result`: every tick is total,
//! per the synchronous hardware model this crate emulates. `Error` only ever
//! surfaces from fallible *construction*, such as building an [`crate::lsq::Lsq`]
//! with a cache geometry that doesn't fit in a word-aligned address.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("depth_log must be in 1..=30, got {0}")]
    InvalidDepthLog(u32),
}
