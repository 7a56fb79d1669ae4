//! IVTCDN - IVTC cadence annotation core library
//!
//! Per-field cadence annotation for inverse telecine: action/note labels,
//! scene-change markers, per-frame overrides, scene-wide pattern
//! propagation and compressed project persistence. Rendering and video
//! decoding stay behind the [`frame_source::FrameSource`] boundary.

pub mod action;
pub mod annotations;
pub mod cli;
pub mod cycle;
pub mod error;
pub mod frame_source;
pub mod project;
pub mod scene;
pub mod session;

// Re-export the types most embedders touch
pub use action::{Action, FIELDS_PER_CYCLE, FRAMES_PER_CYCLE};
pub use annotations::Annotations;
pub use error::{IvtcError, Result};
pub use frame_source::{ClipInfo, FrameSource, SourceFrame};
pub use project::Project;
pub use session::Session;
