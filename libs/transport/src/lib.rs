//! # Tickflow Lane Transport
//!
//! ## Purpose
//!
//! The publish/subscribe fabric between pipeline stages: three
//! unidirectional single-producer/single-consumer lanes carrying
//! fixed-size binary records. This crate defines the lane contract
//! (non-blocking `offer` with explicit back-pressure outcomes, batched
//! `poll` with a synchronous fragment handler) and the canonical
//! implementation over Unix domain sockets with 4-byte length-prefix
//! framing.
//!
//! ## Architecture Role
//!
//! ```text
//! publisher ──offer──► [lane socket] ──poll──► subscriber
//!     │                                            │
//! Ok/BackPressured/                     handler(&[u8], &FragmentHeader)
//! NotConnected/Closed                   per fragment, in order
//! ```
//!
//! Stages are written against the [`LanePublisher`]/[`LaneSubscriber`]
//! traits, so the socket lanes can be swapped for a shared-memory
//! media driver without touching stage code. Within one lane,
//! fragments are delivered in publication order; there is no ordering
//! across lanes.
//!
//! ## Back-pressure
//!
//! `offer` never blocks. A frame the kernel would not accept in full
//! is retained and flushed on the next call; while unflushed bytes
//! remain the lane reports `BackPressured` and the caller applies its
//! drop policy. Stale signals are worse than missing ones.

mod driver;
mod error;
mod idle;
mod lane;
mod socket;
pub mod time;

pub use driver::LaneDriver;
pub use error::TransportError;
pub use idle::IdleStrategy;
pub use lane::{FragmentHeader, LaneAddress, LanePublisher, LaneSubscriber, OfferOutcome};
pub use socket::{SocketPublisher, SocketSubscriber};
