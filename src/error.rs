use thiserror::Error;

use crate::types::MacAddr;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid MAC address '{input}': expected aa:bb:cc:dd:ee:ff")]
    InvalidMac { input: String },

    #[error("network not tracked: {0}")]
    UnknownNetwork(MacAddr),

    #[error(transparent)]
    Interface(#[from] InterfaceError),
}

/// Failure reported by an interface-control backend.
///
/// Always carries the device it was issued against and a human readable
/// message; callers treat it as non-fatal.
#[derive(Debug, Clone, Error)]
#[error("{device}: {message}")]
pub struct InterfaceError {
    pub device: String,
    pub message: String,
}

impl InterfaceError {
    pub fn new(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by an external vendor lookup service.
#[derive(Debug, Clone, Error)]
pub enum VendorLookupError {
    #[error("vendor lookup unavailable: {0}")]
    Unavailable(String),

    #[error("vendor lookup failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
