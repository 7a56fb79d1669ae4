//! Annotation store: per-field action/note labels, scene-change markers and
//! per-frame overrides for one opened clip.
//!
//! `actions` and `notes` are always exactly field-count long, never sparse.
//! Scene changes are a set, so duplicate markers are impossible by
//! construction. The per-frame maps are sparse; an empty value is
//! equivalent to absence and is removed, not stored.
//!
//! Every mutation marks the store dirty. Consuming the dirty flag (and
//! triggering a preview reload) is the session's job, not the store's.

use std::collections::{BTreeMap, BTreeSet};

use crate::action::{Action, DEFAULT_ACTIONS, DEFAULT_NOTES, FIELDS_PER_CYCLE};
use crate::cycle;
use crate::error::{IvtcError, Result};

/// Override value for ambiguous pulldown matches: take the next field.
pub const NO_MATCH_NEXT: &str = "Next";

/// Labeled annotation state for every field and output frame of a clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotations {
    actions: Vec<Action>,
    notes: Vec<String>,
    scene_changes: BTreeSet<usize>,
    no_match_handling: BTreeMap<usize, String>,
    extra_attributes: BTreeMap<usize, String>,
    dirty: bool,
}

impl Annotations {
    /// Fresh store: the default 10-field template tiled across the clip,
    /// truncated at the clip boundary.
    pub fn from_template(field_count: usize) -> Self {
        let mut actions = Vec::with_capacity(field_count);
        let mut notes = Vec::with_capacity(field_count);
        for i in 0..field_count {
            actions.push(DEFAULT_ACTIONS[i % FIELDS_PER_CYCLE]);
            notes.push(DEFAULT_NOTES[i % FIELDS_PER_CYCLE].to_string());
        }
        Self {
            actions,
            notes,
            scene_changes: BTreeSet::new(),
            no_match_handling: BTreeMap::new(),
            extra_attributes: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Rebuild a store from deserialized parts. Invalid scene-change
    /// indices and empty attribute values are dropped by the caller
    /// (persistence is permissive, the store is strict).
    pub fn from_parts(
        actions: Vec<Action>,
        notes: Vec<String>,
        scene_changes: BTreeSet<usize>,
        no_match_handling: BTreeMap<usize, String>,
        extra_attributes: BTreeMap<usize, String>,
    ) -> Self {
        debug_assert_eq!(actions.len(), notes.len());
        Self {
            actions,
            notes,
            scene_changes,
            no_match_handling,
            extra_attributes,
            dirty: false,
        }
    }

    pub fn field_count(&self) -> usize {
        self.actions.len()
    }

    /// Output-frame count derived from the field count.
    pub fn frame_count(&self) -> usize {
        cycle::frame_count_for_fields(self.field_count())
    }

    fn check_field(&self, index: usize) -> Result<()> {
        if index < self.actions.len() {
            Ok(())
        } else {
            Err(IvtcError::OutOfRange {
                index,
                count: self.actions.len(),
            })
        }
    }

    fn check_frame(&self, index: usize) -> Result<()> {
        let count = self.frame_count();
        if index < count {
            Ok(())
        } else {
            Err(IvtcError::OutOfRange { index, count })
        }
    }

    pub fn action(&self, field: usize) -> Result<Action> {
        self.check_field(field)?;
        Ok(self.actions[field])
    }

    pub fn set_action(&mut self, field: usize, action: Action) -> Result<()> {
        self.check_field(field)?;
        self.actions[field] = action;
        self.dirty = true;
        Ok(())
    }

    /// The sole mutation primitive behind the four cadence hotkeys:
    /// pressing the key of the current action drops the field instead.
    /// Returns the resulting action.
    pub fn toggle_action(&mut self, field: usize, candidate: Action) -> Result<Action> {
        self.check_field(field)?;
        let next = self.actions[field].toggled(candidate);
        self.actions[field] = next;
        self.dirty = true;
        Ok(next)
    }

    pub fn note(&self, field: usize) -> Result<&str> {
        self.check_field(field)?;
        Ok(&self.notes[field])
    }

    /// Notes are unconstrained: any label is accepted, including outside
    /// the canonical A..D set.
    pub fn set_note(&mut self, field: usize, label: impl Into<String>) -> Result<()> {
        self.check_field(field)?;
        self.notes[field] = label.into();
        self.dirty = true;
        Ok(())
    }

    /// Insert the marker if absent, remove it if present. Returns whether
    /// the field is a scene change afterwards.
    pub fn toggle_scene_change(&mut self, field: usize) -> Result<bool> {
        self.check_field(field)?;
        let inserted = self.scene_changes.insert(field);
        if !inserted {
            self.scene_changes.remove(&field);
        }
        self.dirty = true;
        Ok(inserted)
    }

    pub fn is_scene_change(&self, field: usize) -> bool {
        self.scene_changes.contains(&field)
    }

    pub fn scene_changes(&self) -> &BTreeSet<usize> {
        &self.scene_changes
    }

    pub fn has_no_match_override(&self, frame: usize) -> bool {
        self.no_match_handling.contains_key(&frame)
    }

    pub fn set_no_match_override(&mut self, frame: usize) -> Result<()> {
        self.check_frame(frame)?;
        self.no_match_handling.insert(frame, NO_MATCH_NEXT.to_string());
        self.dirty = true;
        Ok(())
    }

    pub fn clear_no_match_override(&mut self, frame: usize) -> Result<()> {
        self.check_frame(frame)?;
        self.no_match_handling.remove(&frame);
        self.dirty = true;
        Ok(())
    }

    pub fn no_match_handling(&self) -> &BTreeMap<usize, String> {
        &self.no_match_handling
    }

    /// Extra attribute text for a frame, if any.
    pub fn extra_attribute(&self, frame: usize) -> Option<&str> {
        self.extra_attributes.get(&frame).map(String::as_str)
    }

    /// Set free-form text for an output frame. Empty or all-whitespace
    /// text removes the entry: absent and empty are indistinguishable.
    pub fn set_extra_attribute(&mut self, frame: usize, text: impl Into<String>) -> Result<()> {
        self.check_frame(frame)?;
        let text = text.into();
        if text.trim().is_empty() {
            self.extra_attributes.remove(&frame);
        } else {
            self.extra_attributes.insert(frame, text);
        }
        self.dirty = true;
        Ok(())
    }

    pub fn extra_attributes(&self) -> &BTreeMap<usize, String> {
        &self.extra_attributes
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Unchecked write used by scene propagation: indices are produced by
    /// the propagation loop and are in range by construction.
    pub(crate) fn write_pair(&mut self, field: usize, action: Action, note: &str) {
        debug_assert!(field < self.actions.len());
        if field < self.actions.len() {
            self.actions[field] = action;
            self.notes[field].clear();
            self.notes[field].push_str(note);
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_tiling() {
        let store = Annotations::from_template(23);
        assert_eq!(store.field_count(), 23);
        assert_eq!(store.frame_count(), 9);
        assert_eq!(store.action(0).unwrap(), Action::TopFrame0);
        assert_eq!(store.action(4).unwrap(), Action::Drop);
        assert_eq!(store.action(14).unwrap(), Action::Drop);
        // Truncated tail keeps the template phase
        assert_eq!(store.action(22).unwrap(), Action::TopFrame1);
        assert_eq!(store.note(22).unwrap(), "B");
    }

    #[test]
    fn test_out_of_range() {
        let mut store = Annotations::from_template(10);
        assert!(matches!(
            store.action(10),
            Err(IvtcError::OutOfRange { index: 10, count: 10 })
        ));
        assert!(store.set_action(10, Action::Drop).is_err());
        assert!(store.set_note(99, "A").is_err());
        assert!(store.set_extra_attribute(4, "x").is_err()); // only 4 frames
    }

    #[test]
    fn test_toggle_action_double_press() {
        let mut store = Annotations::from_template(10);
        // First press sets the candidate, second drops
        assert_eq!(
            store.toggle_action(0, Action::TopFrame1).unwrap(),
            Action::TopFrame1
        );
        assert_eq!(
            store.toggle_action(0, Action::TopFrame1).unwrap(),
            Action::Drop
        );
        // Third press sets it again
        assert_eq!(
            store.toggle_action(0, Action::TopFrame1).unwrap(),
            Action::TopFrame1
        );
    }

    #[test]
    fn test_scene_change_set_semantics() {
        let mut store = Annotations::from_template(20);
        assert!(store.toggle_scene_change(15).unwrap());
        assert!(store.is_scene_change(15));
        // Toggling twice removes; no duplicates possible
        assert!(!store.toggle_scene_change(15).unwrap());
        assert!(!store.is_scene_change(15));
        assert!(store.toggle_scene_change(25).is_err());
    }

    #[test]
    fn test_no_match_pair() {
        let mut store = Annotations::from_template(20);
        assert!(!store.has_no_match_override(3));
        store.set_no_match_override(3).unwrap();
        assert!(store.has_no_match_override(3));
        assert_eq!(store.no_match_handling().get(&3).unwrap(), NO_MATCH_NEXT);
        store.clear_no_match_override(3).unwrap();
        assert!(!store.has_no_match_override(3));
    }

    #[test]
    fn test_extra_attribute_empty_normalization() {
        let mut store = Annotations::from_template(20);
        store.set_extra_attribute(2, "caption check").unwrap();
        assert_eq!(store.extra_attribute(2), Some("caption check"));

        // Empty and whitespace-only are absence
        store.set_extra_attribute(2, "").unwrap();
        assert_eq!(store.extra_attribute(2), None);
        store.set_extra_attribute(2, "  \n\t ").unwrap();
        assert_eq!(store.extra_attribute(2), None);
        assert!(store.extra_attributes().is_empty());
    }

    #[test]
    fn test_dirty_tracking() {
        let mut store = Annotations::from_template(10);
        assert!(!store.is_dirty());
        store.set_note(0, "B").unwrap();
        assert!(store.is_dirty());
        store.clear_dirty();
        assert!(!store.is_dirty());
        store.toggle_scene_change(1).unwrap();
        assert!(store.is_dirty());
    }
}
