//! Transport setup and runtime errors.
//!
//! Runtime publish/poll outcomes are carried by
//! [`OfferOutcome`](crate::OfferOutcome) rather than errors; this enum
//! covers initialization and addressing failures, which are fatal per
//! the pipeline's error taxonomy.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The lane channel string uses a scheme this build cannot serve.
    #[error("unsupported lane channel '{0}': expected an 'ipc' channel")]
    UnsupportedChannel(String),

    /// Binding the subscriber endpoint failed.
    #[error("failed to bind lane socket {path:?}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The publisher could not reach a bound subscriber within the
    /// configured timeout.
    #[error("no subscriber on lane socket {path:?} after {timeout:?}")]
    ConnectTimeout { path: PathBuf, timeout: Duration },

    /// Lane directory could not be created.
    #[error("failed to create lane directory {path:?}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lane I/O error")]
    Io(#[from] std::io::Error),
}
