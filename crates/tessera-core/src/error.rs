//! Error types shared across the Tessera workspace.
//!
//! Subsystem errors (geometry, tree, halo, transport, registry) live in
//! their own crates; this module holds the two that every layer needs:
//! payload decoding and configuration validation.

use thiserror::Error;

/// Errors raised while decoding a [`Wire`](crate::Wire) payload.
///
/// Encoding into a `Vec<u8>` cannot fail, so every variant describes a
/// malformed or truncated input.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WireError {
    /// The input ended before the value was complete.
    #[error("truncated payload: needed {needed} more bytes, {available} available")]
    Truncated {
        /// Bytes the decoder tried to read.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },
    /// Bytes remained after the value was fully decoded.
    #[error("{remaining} trailing bytes after payload")]
    TrailingBytes {
        /// Number of unread bytes.
        remaining: usize,
    },
    /// A length-prefixed frame disagrees with the slice carrying it.
    #[error("frame length mismatch: header says {declared}, slice holds {actual}")]
    FrameLength {
        /// Length written in the frame header.
        declared: usize,
        /// Length of the payload slice.
        actual: usize,
    },
    /// A tag or flag byte had a value the decoder does not recognise.
    #[error("invalid tag {tag} for {what}")]
    InvalidTag {
        /// The unrecognised byte.
        tag: u8,
        /// What was being decoded.
        what: &'static str,
    },
    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 string: {detail}")]
    InvalidUtf8 {
        /// Decoder diagnostic.
        detail: String,
    },
    /// A decoded value violates the invariants of its type.
    #[error("invalid value: {reason}")]
    InvalidValue {
        /// What was wrong.
        reason: String,
    },
}

/// Errors detected when validating a configuration struct.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A rank is outside the group it refers to.
    #[error("rank {rank} out of range for group of {size}")]
    RankOutOfRange {
        /// The configured rank.
        rank: u32,
        /// Size of the group.
        size: usize,
    },
    /// A numeric setting is zero or otherwise out of range.
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting {
        /// Name of the setting.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
