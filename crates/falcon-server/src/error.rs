//! Server error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while starting or running a listener.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A certificate or key file could not be read.
    #[error("failed to read {path}: {source}")]
    Pem {
        /// The PEM file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The certificate file contains no certificates.
    #[error("no certificates found in {path}")]
    NoCertificates {
        /// The PEM file.
        path: PathBuf,
    },

    /// The key file contains no private key.
    #[error("no private key found in {path}")]
    NoPrivateKey {
        /// The PEM file.
        path: PathBuf,
    },

    /// rustls rejected the certificate chain or key.
    #[error("invalid TLS configuration: {0}")]
    Tls(#[from] rustls::Error),

    /// Other I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ServerError {
    pub(crate) fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }
}
