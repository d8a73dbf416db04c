//! Lane record layouts.
//!
//! All three records are fixed-size `#[repr(C)]` structs moved across
//! lanes as raw bytes. Fields are ordered to eliminate padding
//! (8-byte fields, then 4-byte, then byte arrays); where the natural
//! size is not a multiple of 8, an explicit `_padding` tail keeps the
//! layout identical on every conforming producer and consumer.

use num_enum::TryFromPrimitive;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::{ProtocolError, Symbol};

/// Directional-change event kind as carried on the wire.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum DcEventKind {
    None = 0,
    Upturn = 1,
    Downturn = 2,
}

/// Trading signal as carried on the wire.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum SignalType {
    None = 0,
    Buy = 1,
    Sell = 2,
    Hold = 3,
}

/// Lifecycle of a (simulated or live) execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Pending,
    Filled,
    PartiallyFilled,
    Rejected,
    Cancelled,
}

/// One market data tick. 40 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, AsBytes, FromBytes, FromZeroes)]
pub struct TickMessage {
    /// Monotonic nanoseconds.
    pub timestamp: i64,
    pub price: f64,
    pub volume: f64,
    pub symbol: Symbol,
}

impl TickMessage {
    pub const WIRE_SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(timestamp: i64, price: f64, volume: f64, symbol: Symbol) -> Self {
        Self {
            timestamp,
            price,
            volume,
            symbol,
        }
    }
}

/// A confirmed directional-change event with derived analytics. 64 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, AsBytes, FromBytes, FromZeroes)]
pub struct DcSignalMessage {
    /// Timestamp of the tick that confirmed the turn.
    pub timestamp: i64,
    /// Price of the confirming tick.
    pub price: f64,
    /// Extent of the closed trend in threshold units.
    pub tmv_ext: f64,
    /// Closed-trend duration in nanoseconds.
    pub duration: i64,
    /// Extent per second, scaled by the threshold.
    pub time_adjusted_return: f64,
    /// `DcEventKind` as i32; use [`DcSignalMessage::kind`].
    pub event_kind: i32,
    pub symbol: Symbol,
    pub _padding: [u8; 4],
}

impl DcSignalMessage {
    pub const WIRE_SIZE: usize = std::mem::size_of::<Self>();

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: i64,
        kind: DcEventKind,
        price: f64,
        tmv_ext: f64,
        duration: i64,
        time_adjusted_return: f64,
        symbol: Symbol,
    ) -> Self {
        Self {
            timestamp,
            price,
            tmv_ext,
            duration,
            time_adjusted_return,
            event_kind: kind as i32,
            symbol,
            _padding: [0; 4],
        }
    }

    /// Decode the wire kind, rejecting values outside the enum.
    pub fn kind(&self) -> Result<DcEventKind, ProtocolError> {
        DcEventKind::try_from(self.event_kind)
            .map_err(|_| ProtocolError::InvalidEventKind(self.event_kind))
    }
}

/// A trading order emitted by the strategy engine. 56 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, AsBytes, FromBytes, FromZeroes)]
pub struct OrderMessage {
    /// Order creation time (monotonic nanoseconds).
    pub timestamp: i64,
    pub price: f64,
    pub quantity: f64,
    /// Gap from the originating DC event to order publication.
    pub strategy_latency_ns: i64,
    /// `SignalType` as i32; use [`OrderMessage::signal`].
    pub signal: i32,
    pub symbol: Symbol,
    pub _padding: [u8; 4],
}

impl OrderMessage {
    pub const WIRE_SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(
        timestamp: i64,
        signal: SignalType,
        price: f64,
        quantity: f64,
        symbol: Symbol,
        strategy_latency_ns: i64,
    ) -> Self {
        Self {
            timestamp,
            price,
            quantity,
            strategy_latency_ns,
            signal: signal as i32,
            symbol,
            _padding: [0; 4],
        }
    }

    /// Decode the wire signal, rejecting values outside the enum.
    pub fn signal(&self) -> Result<SignalType, ProtocolError> {
        SignalType::try_from(self.signal).map_err(|_| ProtocolError::InvalidSignalType(self.signal))
    }
}

/// Length-checked byte-copy decode of a fixed-size lane record.
///
/// Oversized fragments are accepted (trailing bytes ignored) so lane
/// implementations may round frames up; undersized fragments are the
/// error consumers log and drop.
pub fn decode_record<T: FromBytes>(fragment: &[u8]) -> Result<T, ProtocolError> {
    // Reading through a prefix lets trailing bytes pass; only a short
    // fragment fails.
    T::read_from_prefix(fragment).ok_or(ProtocolError::MessageTooSmall {
        need: std::mem::size_of::<T>(),
        got: fragment.len(),
    })
}
