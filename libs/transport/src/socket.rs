//! Unix-domain-socket lane endpoints.
//!
//! Framing is a 4-byte little-endian length prefix followed by the
//! record bytes. The subscriber binds and accepts exactly one
//! publisher; the publisher connects with a bounded retry at
//! initialization and throttled reconnects afterwards. All I/O is
//! non-blocking: `offer` stashes an unaccepted frame tail and reports
//! back-pressure until it drains, `poll` performs one bounded read and
//! delivers whole frames from its reassembly buffer.

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use tracing::{debug, trace, warn};

use crate::{
    FragmentHeader, LaneAddress, LanePublisher, LaneSubscriber, OfferOutcome, TransportError,
};

const LEN_PREFIX: usize = 4;
const READ_CHUNK: usize = 64 * 1024;
const CONNECT_RETRY: Duration = Duration::from_millis(1);
const RECONNECT_INTERVAL: Duration = Duration::from_millis(100);

/// Consumer endpoint: owns the lane socket file.
pub struct SocketSubscriber {
    stream_id: i32,
    path: PathBuf,
    listener: Option<UnixListener>,
    stream: Option<UnixStream>,
    rx: BytesMut,
    scratch: Vec<u8>,
    position: u64,
    closed: bool,
}

impl SocketSubscriber {
    /// Bind the lane socket. A stale socket file from a previous run
    /// is replaced.
    pub fn bind(address: &LaneAddress) -> Result<Self, TransportError> {
        let path = address.socket_path()?;
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
        let listener = UnixListener::bind(&path).map_err(|source| TransportError::Bind {
            path: path.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        debug!(stream_id = address.stream_id, ?path, "lane subscriber bound");

        Ok(Self {
            stream_id: address.stream_id,
            path,
            listener: Some(listener),
            stream: None,
            rx: BytesMut::with_capacity(READ_CHUNK),
            scratch: vec![0u8; READ_CHUNK],
            position: 0,
            closed: false,
        })
    }

    fn try_accept(&mut self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };
        match listener.accept() {
            Ok((stream, _)) => {
                if stream.set_nonblocking(true).is_ok() {
                    debug!(stream_id = self.stream_id, "lane publisher connected");
                    self.stream = Some(stream);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => warn!(stream_id = self.stream_id, error = %e, "lane accept failed"),
        }
    }

    /// One bounded read into the reassembly buffer. Returns false if
    /// the peer went away.
    fn fill(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match stream.read(&mut self.scratch) {
            Ok(0) => {
                debug!(stream_id = self.stream_id, "lane publisher disconnected");
                self.stream = None;
                false
            }
            Ok(n) => {
                self.rx.extend_from_slice(&self.scratch[..n]);
                true
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => true,
            Err(e) => {
                warn!(stream_id = self.stream_id, error = %e, "lane read failed");
                self.stream = None;
                false
            }
        }
    }
}

impl LaneSubscriber for SocketSubscriber {
    fn poll(
        &mut self,
        handler: &mut dyn FnMut(&[u8], &FragmentHeader),
        max_fragments: usize,
    ) -> usize {
        if self.closed {
            return 0;
        }
        if self.stream.is_none() {
            self.try_accept();
        }
        self.fill();

        let mut delivered = 0;
        while delivered < max_fragments {
            if self.rx.len() < LEN_PREFIX {
                break;
            }
            let mut len_bytes = [0u8; LEN_PREFIX];
            len_bytes.copy_from_slice(&self.rx[..LEN_PREFIX]);
            let frame_len = u32::from_le_bytes(len_bytes) as usize;
            if self.rx.len() < LEN_PREFIX + frame_len {
                break;
            }
            self.rx.advance(LEN_PREFIX);
            let frame = self.rx.split_to(frame_len);
            let header = FragmentHeader {
                stream_id: self.stream_id,
                position: self.position,
            };
            self.position += 1;
            handler(frame.as_ref(), &header);
            delivered += 1;
        }
        trace!(
            stream_id = self.stream_id,
            delivered,
            buffered = self.rx.len(),
            "lane poll"
        );
        delivered
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.stream = None;
        self.listener = None;
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Drop for SocketSubscriber {
    fn drop(&mut self) {
        self.close();
    }
}

/// Producer endpoint: connects to a bound subscriber.
pub struct SocketPublisher {
    stream_id: i32,
    path: PathBuf,
    stream: Option<UnixStream>,
    /// Unsent tail of a frame the kernel refused to take in full. The
    /// frame is already committed, so it must be flushed before any
    /// new record to preserve framing.
    pending: Vec<u8>,
    frame: Vec<u8>,
    last_reconnect: Instant,
    position: u64,
    closed: bool,
}

impl SocketPublisher {
    /// Connect to the lane, retrying until the subscriber binds or the
    /// address timeout elapses.
    pub fn connect(address: &LaneAddress) -> Result<Self, TransportError> {
        let path = address.socket_path()?;
        let deadline = Instant::now() + address.timeout;
        let stream = loop {
            match UnixStream::connect(&path) {
                Ok(stream) => break stream,
                Err(_) if Instant::now() < deadline => std::thread::sleep(CONNECT_RETRY),
                Err(_) => {
                    return Err(TransportError::ConnectTimeout {
                        path,
                        timeout: address.timeout,
                    })
                }
            }
        };
        stream.set_nonblocking(true)?;
        debug!(stream_id = address.stream_id, ?path, "lane publisher connected");

        Ok(Self {
            stream_id: address.stream_id,
            path,
            stream: Some(stream),
            pending: Vec::new(),
            frame: Vec::with_capacity(256),
            last_reconnect: Instant::now(),
            position: 0,
            closed: false,
        })
    }

    fn try_reconnect(&mut self) {
        if self.last_reconnect.elapsed() < RECONNECT_INTERVAL {
            return;
        }
        self.last_reconnect = Instant::now();
        match UnixStream::connect(&self.path) {
            Ok(stream) => {
                if stream.set_nonblocking(true).is_ok() {
                    debug!(stream_id = self.stream_id, "lane publisher reconnected");
                    self.stream = Some(stream);
                }
            }
            Err(e) => trace!(stream_id = self.stream_id, error = %e, "lane reconnect failed"),
        }
    }

    fn drop_connection(&mut self) {
        self.stream = None;
        // A partially sent frame is unrecoverable once the peer is
        // gone; the subscriber will resynchronize on a fresh stream.
        self.pending.clear();
        self.last_reconnect = Instant::now();
    }

    /// Write as much of the selected buffer as the kernel accepts.
    /// Returns the number of bytes taken, or None if the connection
    /// died.
    fn write_some(&mut self, from_pending: bool) -> Option<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return None;
        };
        let buf: &[u8] = if from_pending {
            &self.pending
        } else {
            &self.frame
        };
        let mut written = 0;
        while written < buf.len() {
            match stream.write(&buf[written..]) {
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(stream_id = self.stream_id, error = %e, "lane write failed");
                    return None;
                }
            }
        }
        Some(written)
    }

    /// Flush the retained frame tail. Returns false if the connection
    /// was lost in the attempt.
    fn flush_pending(&mut self) -> bool {
        if self.pending.is_empty() {
            return true;
        }
        match self.write_some(true) {
            Some(n) => {
                self.pending.drain(..n);
                true
            }
            None => {
                self.drop_connection();
                false
            }
        }
    }
}

impl LanePublisher for SocketPublisher {
    fn offer(&mut self, payload: &[u8]) -> OfferOutcome {
        if self.closed {
            return OfferOutcome::Closed;
        }
        if self.stream.is_none() {
            self.try_reconnect();
            if self.stream.is_none() {
                return OfferOutcome::NotConnected;
            }
        }
        if !self.flush_pending() {
            return OfferOutcome::NotConnected;
        }
        if !self.pending.is_empty() {
            return OfferOutcome::BackPressured;
        }

        self.frame.clear();
        self.frame
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.frame.extend_from_slice(payload);

        match self.write_some(false) {
            Some(n) if n == self.frame.len() => {
                self.position += 1;
                OfferOutcome::Ok(payload.len())
            }
            Some(n) => {
                // Frame committed but not fully accepted; retain the
                // tail so the next offer flushes it first.
                let tail = self.frame[n..].to_vec();
                self.pending = tail;
                self.position += 1;
                OfferOutcome::Ok(payload.len())
            }
            None => {
                self.drop_connection();
                OfferOutcome::NotConnected
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.pending.clear();
    }
}

impl Drop for SocketPublisher {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LaneAddress;

    fn lane(dir: &tempfile::TempDir, stream_id: i32, timeout_ms: u64) -> LaneAddress {
        LaneAddress::new("ipc", stream_id, dir.path(), timeout_ms)
    }

    fn collect(subscriber: &mut SocketSubscriber, max: usize) -> Vec<(Vec<u8>, u64)> {
        let mut out = Vec::new();
        subscriber.poll(
            &mut |frame, header| out.push((frame.to_vec(), header.position)),
            max,
        );
        out
    }

    #[test]
    fn publish_subscribe_round_trip_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let address = lane(&dir, 1001, 1000);

        let mut subscriber = SocketSubscriber::bind(&address).unwrap();
        let mut publisher = SocketPublisher::connect(&address).unwrap();

        assert!(publisher.offer(b"alpha").is_ok());
        assert!(publisher.offer(b"bravo").is_ok());
        assert!(publisher.offer(b"charlie").is_ok());

        let mut frames = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(1);
        while frames.len() < 3 && Instant::now() < deadline {
            frames.extend(collect(&mut subscriber, 10));
        }

        let payloads: Vec<&[u8]> = frames.iter().map(|(f, _)| f.as_slice()).collect();
        assert_eq!(payloads, vec![&b"alpha"[..], b"bravo", b"charlie"]);
        let positions: Vec<u64> = frames.iter().map(|&(_, p)| p).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn poll_respects_max_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let address = lane(&dir, 1002, 1000);

        let mut subscriber = SocketSubscriber::bind(&address).unwrap();
        let mut publisher = SocketPublisher::connect(&address).unwrap();
        for i in 0..5u8 {
            assert!(publisher.offer(&[i]).is_ok());
        }

        // Wait until the bytes are readable, then deliver in batches.
        let deadline = Instant::now() + Duration::from_secs(1);
        let mut first = Vec::new();
        while first.len() < 2 && Instant::now() < deadline {
            first.extend(collect(&mut subscriber, 2 - first.len()));
        }
        assert_eq!(first.len(), 2);

        let mut rest = Vec::new();
        while rest.len() < 3 && Instant::now() < deadline {
            rest.extend(collect(&mut subscriber, 10));
        }
        assert_eq!(rest.len(), 3);
        assert_eq!(rest.last().unwrap().1, 4);
    }

    #[test]
    fn connect_without_subscriber_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let address = lane(&dir, 1003, 50);
        let started = Instant::now();
        let result = SocketPublisher::connect(&address);
        assert!(matches!(result, Err(TransportError::ConnectTimeout { .. })));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn closed_publisher_reports_closed() {
        let dir = tempfile::tempdir().unwrap();
        let address = lane(&dir, 1004, 1000);
        let _subscriber = SocketSubscriber::bind(&address).unwrap();
        let mut publisher = SocketPublisher::connect(&address).unwrap();

        publisher.close();
        assert_eq!(publisher.offer(b"late"), OfferOutcome::Closed);
    }

    #[test]
    fn undrained_consumer_back_pressures_the_publisher() {
        let dir = tempfile::tempdir().unwrap();
        let address = lane(&dir, 1005, 1000);
        let _subscriber = SocketSubscriber::bind(&address).unwrap();
        let mut publisher = SocketPublisher::connect(&address).unwrap();

        // Never poll: the kernel buffer fills and offers start being
        // refused.
        let payload = vec![0u8; 64 * 1024];
        let mut back_pressured = false;
        for _ in 0..10_000 {
            match publisher.offer(&payload) {
                OfferOutcome::BackPressured => {
                    back_pressured = true;
                    break;
                }
                OfferOutcome::Ok(_) => {}
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
        assert!(back_pressured, "publisher never reported back-pressure");
    }

    #[test]
    fn subscriber_close_removes_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let address = lane(&dir, 1006, 1000);
        let path = address.socket_path().unwrap();

        let mut subscriber = SocketSubscriber::bind(&address).unwrap();
        assert!(path.exists());
        subscriber.close();
        assert!(!path.exists());
    }

    #[test]
    fn large_frames_reassemble_across_polls() {
        let dir = tempfile::tempdir().unwrap();
        let address = lane(&dir, 1007, 1000);

        let mut subscriber = SocketSubscriber::bind(&address).unwrap();
        let mut publisher = SocketPublisher::connect(&address).unwrap();

        let payload: Vec<u8> = (0..200_000usize).map(|i| (i % 251) as u8).collect();
        assert!(publisher.offer(&payload).is_ok());

        let mut frames = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while frames.is_empty() && Instant::now() < deadline {
            // Keep flushing the retained tail while the subscriber
            // drains.
            let _ = publisher.offer(b"");
            frames.extend(collect(&mut subscriber, 1));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, payload);
    }
}
