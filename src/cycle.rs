//! Cycle addressing: maps global field/frame indices to the fixed 10-field
//! / 4-frame telecine cycle window.
//!
//! Stateless arithmetic; navigation is bounds-clamped and never wraps.

use std::ops::Range;

use crate::action::{FIELDS_PER_CYCLE, FRAMES_PER_CYCLE};

/// Cycle index containing the given field.
pub fn cycle_of(field_index: usize) -> usize {
    field_index / FIELDS_PER_CYCLE
}

/// Field range `[start, end)` of a cycle, clamped to the clip end.
/// The last cycle may be partial.
pub fn field_range(cycle: usize, field_count: usize) -> Range<usize> {
    let start = (cycle * FIELDS_PER_CYCLE).min(field_count);
    let end = (start + FIELDS_PER_CYCLE).min(field_count);
    start..end
}

/// Output-frame range `[start, end)` of a cycle, clamped to the clip end.
pub fn frame_range(cycle: usize, frame_count: usize) -> Range<usize> {
    let start = (cycle * FRAMES_PER_CYCLE).min(frame_count);
    let end = (start + FRAMES_PER_CYCLE).min(frame_count);
    start..end
}

/// Highest reachable cycle index; clamped navigation never exceeds this.
pub fn max_cycle(field_count: usize) -> usize {
    if field_count == 0 {
        0
    } else {
        (field_count - 1) / FIELDS_PER_CYCLE
    }
}

/// Step the active cycle by `delta`, clamped to `[0, max_cycle]`.
pub fn advance(current: usize, delta: i64, field_count: usize) -> usize {
    let max = max_cycle(field_count) as i64;
    (current as i64 + delta).clamp(0, max) as usize
}

/// Output-frame count for a clip of `field_count` fields: 4 frames per
/// full cycle plus the partial tail (`fields * 4 / 10`, floored).
pub fn frame_count_for_fields(field_count: usize) -> usize {
    let full = field_count / FIELDS_PER_CYCLE;
    let tail = field_count % FIELDS_PER_CYCLE;
    full * FRAMES_PER_CYCLE + tail * FRAMES_PER_CYCLE / FIELDS_PER_CYCLE
}
