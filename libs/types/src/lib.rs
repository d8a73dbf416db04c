//! # Tickflow Wire Types
//!
//! ## Purpose
//!
//! Defines the fixed-size binary records carried on the three pipeline
//! lanes (ticks → DC signals → orders) plus the shared enums and the
//! 16-byte symbol type. Records are transmitted by byte copy: every
//! layout is `#[repr(C)]` with zerocopy derives and no interior
//! padding, so producer and consumer agree on the bytes without a
//! serialization step.
//!
//! ## Architecture Role
//!
//! ```text
//! simulator ──TickMessage──► MDP ──DcSignalMessage──► SE ──OrderMessage──► EE
//! ```
//!
//! Field order within each record is arranged widest-first (i64/f64,
//! then i32, then byte arrays, then explicit `_padding`) to eliminate
//! compiler-inserted padding; the logical field set matches the lane
//! contract exactly.

mod error;
mod records;
mod symbol;

pub use error::ProtocolError;
pub use records::{
    decode_record, DcEventKind, DcSignalMessage, ExecutionStatus, OrderMessage, SignalType,
    TickMessage,
};
pub use symbol::Symbol;
