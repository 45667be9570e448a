//! Error types for the engine's fallible surface.
//!
//! Parsing is infallible by design (malformed markup recovers locally); the
//! only hard errors here are offset-translation arguments outside the text.

use thiserror::Error;

/// Failure translating between byte and UTF-16 offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OffsetError {
    /// The requested offset lies beyond the end of the text. This is a
    /// caller bug, not malformed content, so it surfaces hard instead of
    /// clamping.
    #[error("offset {offset} out of range for text of length {len}")]
    OutOfRange { offset: usize, len: usize },
}
