//! Boundary trait for the external video pipeline.
//!
//! The core never decodes video. A [`FrameSource`] implementation is
//! configured with the serialized annotation document (the pipeline
//! re-reads cadence decisions from it) and then serves individual fields
//! and reconstructed frames as packed RGBA. Source failures are
//! recoverable: the session skips the visual update and retries on the
//! next request, annotations are never lost to a pipeline hiccup.

use log::warn;

use crate::cycle;
use crate::error::Result;

/// Static clip geometry reported by the pipeline after configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipInfo {
    pub field_count: usize,
    pub frame_count: usize,
    pub width: usize,
    pub height: usize,
}

impl ClipInfo {
    /// Geometry for a clip where only the field count is known; the frame
    /// count is derived from it.
    pub fn from_field_count(field_count: usize, width: usize, height: usize) -> Self {
        Self {
            field_count,
            frame_count: cycle::frame_count_for_fields(field_count),
            width,
            height,
        }
    }
}

/// One rendered field or reconstructed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFrame {
    /// Packed RGBA, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// How many fields the pipeline matched into this frame.
    pub matched_fields: i64,
    /// Freeze-frame annotation from the pipeline, if any.
    pub freeze_frame: Option<String>,
    /// Combing metric, present only when comb detection was requested.
    pub comb_metric: Option<i64>,
}

/// The external pipeline as seen by the session.
///
/// `configure` hands over the current annotation document as raw bytes;
/// `raw` signals an in-memory (uncompressed) encoding as opposed to a
/// saved project file. Implementations re-run their graph and report the
/// resulting clip geometry.
pub trait FrameSource {
    fn configure(&mut self, document: &[u8], raw: bool) -> Result<ClipInfo>;

    /// Render a single separated field.
    fn field(&mut self, index: usize) -> Result<SourceFrame>;

    /// Render a reconstructed output frame.
    fn frame(&mut self, index: usize) -> Result<SourceFrame>;
}

/// Fetch the output frames of a cycle, skipping any the source fails to
/// produce. Returns `(index, frame)` pairs for the frames that rendered.
pub fn fetch_cycle_frames(
    source: &mut dyn FrameSource,
    cycle_index: usize,
    frame_count: usize,
) -> Vec<(usize, SourceFrame)> {
    let mut frames = Vec::new();
    for index in cycle::frame_range(cycle_index, frame_count) {
        match source.frame(index) {
            Ok(frame) => frames.push((index, frame)),
            Err(e) => warn!("frame {} unavailable: {}", index, e),
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IvtcError;

    /// Source that renders flat-colored frames and fails on request.
    struct StubSource {
        info: ClipInfo,
        failing: Vec<usize>,
    }

    impl StubSource {
        fn new(field_count: usize) -> Self {
            Self {
                info: ClipInfo::from_field_count(field_count, 4, 2),
                failing: Vec::new(),
            }
        }

        fn render(&self, index: usize) -> SourceFrame {
            SourceFrame {
                rgba: vec![index as u8; self.info.width * self.info.height * 4],
                width: self.info.width,
                height: self.info.height,
                matched_fields: 2,
                freeze_frame: None,
                comb_metric: None,
            }
        }
    }

    impl FrameSource for StubSource {
        fn configure(&mut self, _document: &[u8], _raw: bool) -> Result<ClipInfo> {
            Ok(self.info)
        }

        fn field(&mut self, index: usize) -> Result<SourceFrame> {
            Ok(self.render(index))
        }

        fn frame(&mut self, index: usize) -> Result<SourceFrame> {
            if self.failing.contains(&index) {
                return Err(IvtcError::FrameSource(format!("frame {} failed", index)));
            }
            Ok(self.render(index))
        }
    }

    #[test]
    fn test_clip_info_frame_count() {
        let info = ClipInfo::from_field_count(35, 720, 480);
        assert_eq!(info.frame_count, 14);
        assert_eq!(info.width, 720);
    }

    #[test]
    fn test_fetch_cycle_frames() {
        let mut source = StubSource::new(40);
        let frames = fetch_cycle_frames(&mut source, 1, 16);
        let indices: Vec<usize> = frames.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_fetch_skips_failed_frames() {
        let mut source = StubSource::new(40);
        source.failing = vec![5, 6];
        let frames = fetch_cycle_frames(&mut source, 1, 16);
        let indices: Vec<usize> = frames.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![4, 7]);
    }

    #[test]
    fn test_fetch_partial_last_cycle() {
        let mut source = StubSource::new(35);
        let frames = fetch_cycle_frames(&mut source, 3, 14);
        let indices: Vec<usize> = frames.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![12, 13]);
    }
}
