//! Error types for the fallible seams of the stack
//!
//! Malformed input received from the wire is never an error, it is silently
//! dropped by the layer that detects it. Errors are reserved for invalid
//! configuration, misuse of a [`crate::Packet`] window, and failures of the
//! underlying [`crate::link::Link`].

pub use crate::{link::LinkError, packet::PacketError};

/// Any error the stack can surface to its caller
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration was rejected by [`crate::config::StackCfgBuilder::build`]
    #[error("configuration error: {0}")]
    Cfg(#[from] ConfigError),
    /// A packet window operation was out of bounds
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),
    /// The link primitive failed
    #[error("link error: {0}")]
    Link(#[from] LinkError),
}

/// A configuration value that failed validation
#[derive(Debug, thiserror::Error)]
#[error("{name} is invalid: {kind}")]
pub struct ConfigError {
    /// The name of the offending field
    pub name: &'static str,
    /// Why it was rejected
    pub kind: ConfigErrorKind,
}

/// The reason a [`ConfigError`] was raised
#[derive(Debug, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Timeouts, hop limits and the like cannot be zero
    #[error("cannot be zero")]
    Zero,
    /// The value was outside of the accepted range
    #[error("value '{size}' was out of range '{range:?}'")]
    OutOfRange {
        /// The rejected value
        size: usize,
        /// The accepted range
        range: std::ops::Range<usize>,
    },
    /// The value must be a multiple of `align`
    ///
    /// Fragment offsets are carried in 8-byte units, so the fragment payload
    /// threshold derived from the MTU must be a multiple of 8
    #[error("value '{size}' is not a multiple of {align}")]
    Unaligned {
        /// The rejected value
        size: usize,
        /// The required alignment
        align: usize,
    },
}
