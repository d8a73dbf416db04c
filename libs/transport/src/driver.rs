//! Process-scoped lane endpoint factory.

use tracing::info;

use crate::{LaneAddress, SocketPublisher, SocketSubscriber, TransportError};

/// Creates lane endpoints for a process.
///
/// Built once at startup and passed by reference to each stage; there
/// are no hidden globals between the driver and the endpoints it
/// hands out. Subscribers own their lane socket, so for any lane the
/// subscribing stage must be constructed before the publishing one.
#[derive(Debug, Default)]
pub struct LaneDriver;

impl LaneDriver {
    pub fn new() -> Self {
        Self
    }

    /// Bind the consumer endpoint of a lane, creating the lane
    /// directory if needed.
    pub fn subscriber(&self, address: &LaneAddress) -> Result<SocketSubscriber, TransportError> {
        let path = address.socket_path()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| TransportError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let subscriber = SocketSubscriber::bind(address)?;
        info!(
            channel = %address.channel,
            stream_id = address.stream_id,
            "lane subscription ready"
        );
        Ok(subscriber)
    }

    /// Connect the producer endpoint of a lane, waiting up to the
    /// address timeout for the subscriber to bind.
    pub fn publisher(&self, address: &LaneAddress) -> Result<SocketPublisher, TransportError> {
        let publisher = SocketPublisher::connect(address)?;
        info!(
            channel = %address.channel,
            stream_id = address.stream_id,
            "lane publication ready"
        );
        Ok(publisher)
    }
}
