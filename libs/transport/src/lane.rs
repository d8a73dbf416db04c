//! The lane contract: addressing, offer outcomes, and the
//! publisher/subscriber traits stages are written against.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::TransportError;

/// Result of a non-blocking publication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// The record was accepted for delivery; carries the payload size.
    Ok(usize),
    /// The consumer has not drained enough; the record was not
    /// accepted. Policy at every stage: drop, never retry.
    BackPressured,
    /// No peer on the lane; the record was dropped.
    NotConnected,
    /// The lane was closed locally.
    Closed,
}

impl OfferOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, OfferOutcome::Ok(_))
    }
}

/// Per-fragment metadata passed to the poll handler.
#[derive(Debug, Clone, Copy)]
pub struct FragmentHeader {
    pub stream_id: i32,
    /// Publication sequence number within the lane, starting at 0.
    pub position: u64,
}

/// Producer endpoint of a lane. Single producer: one live publisher
/// per lane.
pub trait LanePublisher {
    /// Offer one record for publication. Never blocks.
    fn offer(&mut self, payload: &[u8]) -> OfferOutcome;

    fn is_connected(&self) -> bool;

    fn close(&mut self);
}

/// Consumer endpoint of a lane. Single consumer: one live subscriber
/// per lane.
pub trait LaneSubscriber {
    /// Deliver up to `max_fragments` pending fragments to `handler`,
    /// invoked synchronously in publication order. Returns the number
    /// delivered; zero means the caller should apply its idle
    /// strategy.
    fn poll(
        &mut self,
        handler: &mut dyn FnMut(&[u8], &FragmentHeader),
        max_fragments: usize,
    ) -> usize;

    fn is_connected(&self) -> bool;

    fn close(&mut self);
}

/// Fully resolved lane binding: channel, stream id, socket directory,
/// and the connect timeout used at initialization.
#[derive(Debug, Clone)]
pub struct LaneAddress {
    pub channel: String,
    pub stream_id: i32,
    pub directory: PathBuf,
    pub timeout: Duration,
}

impl LaneAddress {
    pub fn new(
        channel: impl Into<String>,
        stream_id: i32,
        directory: impl Into<PathBuf>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            channel: channel.into(),
            stream_id,
            directory: directory.into(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Resolve the socket path for this lane.
    ///
    /// Channels are URI-like strings; this deployment serves the `ipc`
    /// scheme (optionally `ipc://<dir>`, overriding the configured
    /// directory). One socket per stream id.
    pub fn socket_path(&self) -> Result<PathBuf, TransportError> {
        let dir: &Path = match self.channel.as_str() {
            "ipc" | "aeron:ipc" => self.directory.as_path(),
            other => match other.strip_prefix("ipc://") {
                Some(dir) if !dir.is_empty() => Path::new(dir),
                _ => return Err(TransportError::UnsupportedChannel(other.to_string())),
            },
        };
        Ok(dir.join(format!("{}.sock", self.stream_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_channel_resolves_under_directory() {
        let address = LaneAddress::new("ipc", 1001, "/tmp/tickflow", 5000);
        assert_eq!(
            address.socket_path().unwrap(),
            PathBuf::from("/tmp/tickflow/1001.sock")
        );
    }

    #[test]
    fn explicit_ipc_directory_overrides() {
        let address = LaneAddress::new("ipc:///run/lanes", 7, "/tmp/ignored", 5000);
        assert_eq!(
            address.socket_path().unwrap(),
            PathBuf::from("/run/lanes/7.sock")
        );
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let address = LaneAddress::new("udp?endpoint=localhost:40123", 1, "/tmp", 5000);
        assert!(matches!(
            address.socket_path(),
            Err(TransportError::UnsupportedChannel(_))
        ));
    }
}
