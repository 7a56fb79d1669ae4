//! Scene propagation: copy the active cycle's repeating 10-field
//! (action, note) pattern across the whole enclosing scene.
//!
//! Cadence patterns repeat with period 10 inside a scene, so once one
//! cycle has been hand-corrected the same pattern almost always holds for
//! the rest of the scene; one command rewrites it all. Alignment is by
//! absolute field index modulo 10, assuming the cadence phase is periodic
//! from field 0 (a scene whose cadence is phase-shifted relative to the
//! global origin gets the wrong sub-pattern; known limitation).

use log::debug;

use crate::action::{Action, FIELDS_PER_CYCLE};
use crate::annotations::Annotations;

/// Scene enclosing the active cycle. `start` is the first field rewritten,
/// `end` is the exclusive write bound: the terminal marker field itself is
/// left untouched, it belongs to the next scene's pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneBounds {
    pub start: usize,
    pub end: usize,
}

/// Enclosing scene of a cycle: bounded by the nearest scene-change markers
/// strictly below and above the cycle's start, defaulting to the clip
/// boundaries when no marker exists on a side.
pub fn scene_bounds(store: &Annotations, active_cycle: usize) -> SceneBounds {
    let start_of_cycle = active_cycle * FIELDS_PER_CYCLE;
    let field_count = store.field_count();

    let start = store
        .scene_changes()
        .range(..start_of_cycle)
        .next_back()
        .copied()
        .unwrap_or(0);
    let end = store
        .scene_changes()
        .range(start_of_cycle + 1..)
        .next()
        .copied()
        .unwrap_or_else(|| field_count.saturating_sub(1));

    SceneBounds { start, end }
}

/// Replicate the active cycle's 10 (action, note) pairs across its
/// enclosing scene, wrapping the pattern modulo the cycle length.
///
/// The pattern is captured by position within the cycle; on the last,
/// partial cycle the missing tail positions are absent and fields that
/// would take them are left untouched. A degenerate scene
/// (`start >= end`) performs zero writes. Idempotent: running it twice
/// with no edits in between equals running it once.
pub fn apply_cycle_to_scene(store: &mut Annotations, active_cycle: usize) -> SceneBounds {
    let start_of_cycle = active_cycle * FIELDS_PER_CYCLE;
    let bounds = scene_bounds(store, active_cycle);
    debug!(
        "propagate: cycle [{}, {}] scene [{}, {})",
        start_of_cycle,
        start_of_cycle + FIELDS_PER_CYCLE - 1,
        bounds.start,
        bounds.end
    );

    // Capture the cycle's pattern; the tail of a partial cycle stays None.
    let mut pattern: [Option<(Action, String)>; FIELDS_PER_CYCLE] = Default::default();
    for (pos, slot) in pattern.iter_mut().enumerate() {
        let field = start_of_cycle + pos;
        if field < store.field_count() {
            let action = store.actions()[field];
            let note = store.notes()[field].clone();
            *slot = Some((action, note));
        }
    }

    let mut pos = bounds.start % FIELDS_PER_CYCLE;
    for field in bounds.start..bounds.end {
        if let Some((action, note)) = &pattern[pos] {
            store.write_pair(field, *action, note);
        }
        pos = (pos + 1) % FIELDS_PER_CYCLE;
    }

    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::DEFAULT_ACTIONS;

    fn edited_cycle_pattern() -> [Action; FIELDS_PER_CYCLE] {
        [
            Action::Drop,
            Action::Drop,
            Action::TopFrame1,
            Action::BottomFrame1,
            Action::TopFrame2,
            Action::BottomFrame2,
            Action::Drop,
            Action::Drop,
            Action::TopFrame3,
            Action::BottomFrame3,
        ]
    }

    /// Overwrite cycle 1 (fields 10..20) with the edited pattern.
    fn store_with_edited_cycle_1(field_count: usize) -> Annotations {
        let mut store = Annotations::from_template(field_count);
        for (pos, action) in edited_cycle_pattern().iter().enumerate() {
            store.set_action(10 + pos, *action).unwrap();
            store.set_note(10 + pos, "X").unwrap();
        }
        store
    }

    #[test]
    fn test_scene_bounds_no_markers() {
        let store = Annotations::from_template(40);
        assert_eq!(scene_bounds(&store, 1), SceneBounds { start: 0, end: 39 });
    }

    #[test]
    fn test_scene_bounds_markers_around_cycle() {
        let mut store = Annotations::from_template(60);
        store.toggle_scene_change(7).unwrap();
        store.toggle_scene_change(20).unwrap();
        store.toggle_scene_change(44).unwrap();
        // Cycle 1 starts at 10: nearest marker below is 7, above is 20
        assert_eq!(scene_bounds(&store, 1), SceneBounds { start: 7, end: 20 });
        // Cycle 3 starts at 30: bounded by 20 and 44
        assert_eq!(scene_bounds(&store, 3), SceneBounds { start: 20, end: 44 });
    }

    #[test]
    fn test_scene_bounds_marker_at_cycle_start() {
        let mut store = Annotations::from_template(60);
        store.toggle_scene_change(10).unwrap();
        // Marker exactly at the cycle start bounds neither side
        // (strictly-less / strictly-greater comparisons)
        assert_eq!(scene_bounds(&store, 1), SceneBounds { start: 0, end: 59 });
    }

    #[test]
    fn test_propagate_whole_clip() {
        // Scenario: 40 fields, no scene changes, cycle 1 edited; propagate
        // rewrites [0, 39) aligned by index mod 10.
        let mut store = store_with_edited_cycle_1(40);
        let bounds = apply_cycle_to_scene(&mut store, 1);
        assert_eq!(bounds, SceneBounds { start: 0, end: 39 });

        let pattern = edited_cycle_pattern();
        for field in 0..39 {
            assert_eq!(store.action(field).unwrap(), pattern[field % 10], "field {}", field);
            assert_eq!(store.note(field).unwrap(), "X", "field {}", field);
        }
        // Exclusive upper bound: the terminal field keeps its old values
        assert_eq!(store.action(39).unwrap(), DEFAULT_ACTIONS[9]);
        assert_eq!(store.note(39).unwrap(), "D");
    }

    #[test]
    fn test_propagate_respects_scene_marker() {
        // Scenario: marker at field 15, propagate from the cycle containing
        // field 10 -> only [0, 15) rewritten, 15 itself untouched.
        let mut store = store_with_edited_cycle_1(40);
        store.toggle_scene_change(15).unwrap();
        let bounds = apply_cycle_to_scene(&mut store, 1);
        assert_eq!(bounds, SceneBounds { start: 0, end: 15 });

        let pattern = edited_cycle_pattern();
        for field in 0..15 {
            assert_eq!(store.action(field).unwrap(), pattern[field % 10], "field {}", field);
        }
        assert_eq!(store.action(15).unwrap(), Action::BottomFrame2);
        // The fixture's hand-edited fields past the marker are untouched
        for field in 16..20 {
            assert_eq!(store.action(field).unwrap(), pattern[field % 10], "field {}", field);
        }
        // Fields past the edited cycle keep the template
        for field in 20..40 {
            assert_eq!(store.action(field).unwrap(), DEFAULT_ACTIONS[field % 10]);
        }
    }

    #[test]
    fn test_propagate_mid_scene_phase_alignment() {
        // Scene starting at a non-multiple of 10: the pattern position
        // starts at start % 10, so the written value at field i still
        // depends only on i mod 10.
        let mut store = store_with_edited_cycle_1(60);
        store.toggle_scene_change(23).unwrap();
        store.toggle_scene_change(7).unwrap();
        let bounds = apply_cycle_to_scene(&mut store, 1);
        assert_eq!(bounds, SceneBounds { start: 7, end: 23 });

        let pattern = edited_cycle_pattern();
        for field in 7..23 {
            assert_eq!(store.action(field).unwrap(), pattern[field % 10], "field {}", field);
        }
        assert_eq!(store.action(6).unwrap(), DEFAULT_ACTIONS[6]);
        assert_eq!(store.action(23).unwrap(), DEFAULT_ACTIONS[3]);
    }

    #[test]
    fn test_propagate_idempotent() {
        // Applying twice equals applying once
        let mut store = store_with_edited_cycle_1(40);
        apply_cycle_to_scene(&mut store, 1);
        let once = store.clone();
        apply_cycle_to_scene(&mut store, 1);
        assert_eq!(store, once);
    }

    #[test]
    fn test_propagate_tight_scene() {
        let mut store = Annotations::from_template(40);
        // Markers at 9 and 11 around cycle 1's start: only fields 9 and 10
        // are in the write range, both aligned by index mod 10
        store.toggle_scene_change(9).unwrap();
        store.toggle_scene_change(11).unwrap();
        let before = store.clone();
        let bounds = apply_cycle_to_scene(&mut store, 1);
        assert_eq!(bounds, SceneBounds { start: 9, end: 11 });
        // Cycle 1 still holds the template, so the rewrite is a no-op
        assert_eq!(store.actions(), before.actions());
    }

    #[test]
    fn test_propagate_degenerate_scene_zero_writes() {
        // One-field clip: start == end, nothing to write
        let mut store = Annotations::from_template(1);
        let bounds = apply_cycle_to_scene(&mut store, 0);
        assert_eq!(bounds, SceneBounds { start: 0, end: 0 });
        assert_eq!(store.action(0).unwrap(), DEFAULT_ACTIONS[0]);
    }

    #[test]
    fn test_propagate_partial_last_cycle() {
        // 35 fields: cycle 3 has only 5 fields. Pattern tail is absent, so
        // fields needing positions 5..10 are left untouched.
        let mut store = Annotations::from_template(35);
        for pos in 0..5 {
            store.set_action(30 + pos, Action::Drop).unwrap();
            store.set_note(30 + pos, "Z").unwrap();
        }
        let bounds = apply_cycle_to_scene(&mut store, 3);
        assert_eq!(bounds, SceneBounds { start: 0, end: 34 });

        for field in 0..34 {
            if field % 10 < 5 {
                assert_eq!(store.action(field).unwrap(), Action::Drop, "field {}", field);
                assert_eq!(store.note(field).unwrap(), "Z");
            } else {
                assert_eq!(store.action(field).unwrap(), DEFAULT_ACTIONS[field % 10]);
            }
        }
    }
}
