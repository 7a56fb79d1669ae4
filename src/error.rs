//! Error taxonomy for the annotation core.
//!
//! Store and propagation operations are deterministic and only fail on
//! out-of-range indices; everything fallible is concentrated in project
//! persistence and the frame-source boundary.

/// Errors surfaced by the annotation core.
#[derive(Debug, thiserror::Error)]
pub enum IvtcError {
    /// Index outside `[0, count)` on a store accessor. Callers are expected
    /// to clamp before calling; in display-only paths treat as a no-op.
    #[error("index {index} out of range (count {count})")]
    OutOfRange { index: usize, count: usize },

    /// Decompression or parse failure on project load. Aborts the open
    /// operation and leaves any previously open project untouched.
    #[error("corrupt project: {0}")]
    CorruptProject(String),

    /// External pipeline returned an error for a requested frame.
    /// Recoverable: skip the frame's visual update and retry next tick.
    #[error("frame source failure: {0}")]
    FrameSource(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IvtcError>;
