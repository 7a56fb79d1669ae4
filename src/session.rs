//! Editing session: one open project plus the command surface the UI
//! hotkeys drive.
//!
//! The session owns the active-cycle navigation, the reload request
//! flags, and the dispatch from cycle-relative positions (what the field
//! strip shows) to absolute store indices. All mutable editor state lives
//! here; nothing is process-global.
//!
//! Reload signalling is two consume-once flags: `need_new_fields` (the
//! field strip must re-render) and `want_new_frames` (the reconstructed
//! frame previews must re-render). Commands raise them; the embedding
//! render loop consumes them via `take_*` once per tick.

use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::action::{Action, FIELDS_PER_CYCLE, FRAMES_PER_CYCLE};
use crate::annotations::NO_MATCH_NEXT;
use crate::cycle;
use crate::error::Result;
use crate::project::{PROJECT_EXT, Project, SCRIPT_EXT};
use crate::scene::{self, SceneBounds};

/// Number of fields the field strip shows: one cycle plus the lookahead
/// field from the next cycle.
pub const WINDOW_FIELDS: usize = FIELDS_PER_CYCLE + 1;

/// An open editor session. Commands with no open project are no-ops.
#[derive(Debug, Default)]
pub struct Session {
    project: Option<Project>,
    need_new_fields: bool,
    want_new_frames: bool,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn project_mut(&mut self) -> Option<&mut Project> {
        self.project.as_mut()
    }

    pub fn has_project(&self) -> bool {
        self.project.is_some()
    }

    /// Replace the session's project outright (new-project flow).
    pub fn new_project(&mut self, script_file: impl Into<PathBuf>, field_count: usize) {
        let script_file = script_file.into();
        info!(
            "New project for {} ({} fields)",
            script_file.display(),
            field_count
        );
        self.project = Some(Project::create_new(script_file, field_count));
        self.reload();
    }

    /// Open a saved project. On failure the error is recorded and the
    /// currently open project (if any) is left untouched.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        match Project::load(path.as_ref()) {
            Ok(project) => {
                self.project = Some(project);
                self.clamp_active_cycle();
                self.reload();
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Dispatch a dropped/passed path by extension: a source script starts
    /// a new project, a project file opens. Anything else is ignored.
    /// Returns whether the path was handled.
    pub fn open_path(&mut self, path: impl AsRef<Path>, field_count: usize) -> Result<bool> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            SCRIPT_EXT => {
                self.new_project(path, field_count);
                Ok(true)
            }
            PROJECT_EXT => {
                self.open(path)?;
                Ok(true)
            }
            other => {
                debug!("ignoring path with extension {:?}: {}", other, path.display());
                Ok(false)
            }
        }
    }

    /// Quick-save to the project's path; `false` when there is no project
    /// or it has no path yet (caller must go through [`Session::save_as`]).
    pub fn save(&mut self) -> Result<bool> {
        match self.project.as_mut() {
            Some(project) => project.save(),
            None => Ok(false),
        }
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<bool> {
        match self.project.as_mut() {
            Some(project) => {
                project.save_as(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Most recent open failure, consumed on read.
    pub fn take_last_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    pub fn active_cycle(&self) -> usize {
        self.project
            .as_ref()
            .map(|p| p.settings.active_cycle)
            .unwrap_or(0)
    }

    pub fn max_cycle(&self) -> usize {
        self.project
            .as_ref()
            .map(|p| cycle::max_cycle(p.annotations.field_count()))
            .unwrap_or(0)
    }

    /// Step the active cycle by `delta`, clamped to the clip. A move
    /// raises both reload flags.
    pub fn advance_cycle(&mut self, delta: i64) {
        let Some(project) = self.project.as_mut() else {
            return;
        };
        let current = project.settings.active_cycle;
        let next = cycle::advance(current, delta, project.annotations.field_count());
        if next != current {
            project.settings.active_cycle = next;
            self.reload();
        }
    }

    pub fn next_cycle(&mut self) {
        self.advance_cycle(1);
    }

    pub fn prev_cycle(&mut self) {
        self.advance_cycle(-1);
    }

    /// Jump straight to a cycle (clamped).
    pub fn jump_to_cycle(&mut self, target: usize) {
        let Some(project) = self.project.as_mut() else {
            return;
        };
        let clamped = target.min(cycle::max_cycle(project.annotations.field_count()));
        if clamped != project.settings.active_cycle {
            project.settings.active_cycle = clamped;
            self.reload();
        }
    }

    /// Absolute field indices shown by the field strip: the active cycle
    /// plus the lookahead field, clamped at the clip end.
    pub fn visible_fields(&self) -> Range<usize> {
        let Some(project) = self.project.as_ref() else {
            return 0..0;
        };
        let field_count = project.annotations.field_count();
        let start = (self.active_cycle() * FIELDS_PER_CYCLE).min(field_count);
        start..(start + WINDOW_FIELDS).min(field_count)
    }

    /// Absolute output-frame indices of the active cycle.
    pub fn visible_frames(&self) -> Range<usize> {
        let Some(project) = self.project.as_ref() else {
            return 0..0;
        };
        cycle::frame_range(self.active_cycle(), project.annotations.frame_count())
    }

    /// Cadence hotkey at a window position (0..=10, 10 = lookahead field).
    /// Returns the resulting action, or `None` when the key/position pair
    /// does not resolve (off the end of the clip, bad key).
    pub fn press_cadence_key(&mut self, position: usize, key: u8) -> Result<Option<Action>> {
        let Some(candidate) = Action::candidate(key, position) else {
            return Ok(None);
        };
        let Some(project) = self.project.as_mut() else {
            return Ok(None);
        };
        let Some(field) = field_at(project, position) else {
            return Ok(None);
        };
        let result = project.annotations.toggle_action(field, candidate)?;
        debug!("field {} -> {}", field, result);
        self.request_frame_reload();
        Ok(Some(result))
    }

    /// Set the note label at a window position.
    pub fn set_note(&mut self, position: usize, label: impl Into<String>) -> Result<bool> {
        let Some(project) = self.project.as_mut() else {
            return Ok(false);
        };
        let Some(field) = field_at(project, position) else {
            return Ok(false);
        };
        project.annotations.set_note(field, label)?;
        Ok(true)
    }

    /// Toggle the scene-change marker at a window position.
    pub fn toggle_scene_change(&mut self, position: usize) -> Result<Option<bool>> {
        let Some(project) = self.project.as_mut() else {
            return Ok(None);
        };
        let Some(field) = field_at(project, position) else {
            return Ok(None);
        };
        let marked = project.annotations.toggle_scene_change(field)?;
        Ok(Some(marked))
    }

    /// Toggle the no-match override on an output frame of the active
    /// cycle (slot 0..=3): set when absent, clear when present.
    pub fn toggle_no_match(&mut self, slot: usize) -> Result<Option<bool>> {
        let Some(project) = self.project.as_mut() else {
            return Ok(None);
        };
        let Some(frame) = frame_at(project, slot) else {
            return Ok(None);
        };
        let set = if project.annotations.has_no_match_override(frame) {
            project.annotations.clear_no_match_override(frame)?;
            false
        } else {
            project.annotations.set_no_match_override(frame)?;
            true
        };
        debug!("frame {} no-match {}", frame, if set { NO_MATCH_NEXT } else { "off" });
        self.request_frame_reload();
        Ok(Some(set))
    }

    /// Set (or with empty text, clear) the extra attribute on an output
    /// frame of the active cycle. QC notes only; reconstruction output is
    /// unaffected, so no reload is requested.
    pub fn set_extra_attribute(&mut self, slot: usize, text: impl Into<String>) -> Result<bool> {
        let Some(project) = self.project.as_mut() else {
            return Ok(false);
        };
        let Some(frame) = frame_at(project, slot) else {
            return Ok(false);
        };
        project.annotations.set_extra_attribute(frame, text)?;
        Ok(true)
    }

    /// Propagate the active cycle's pattern across its enclosing scene.
    pub fn propagate(&mut self) -> Option<SceneBounds> {
        let active = self.active_cycle();
        let project = self.project.as_mut()?;
        let bounds = scene::apply_cycle_to_scene(&mut project.annotations, active);
        self.request_frame_reload();
        Some(bounds)
    }

    /// Request a full re-render of fields and frames.
    pub fn reload(&mut self) {
        self.need_new_fields = true;
        self.want_new_frames = true;
    }

    /// Raise the frame-reload flag, honoring the auto-reload setting.
    fn request_frame_reload(&mut self) {
        let auto = self
            .project
            .as_ref()
            .map(|p| p.settings.auto_reload)
            .unwrap_or(true);
        if auto {
            self.want_new_frames = true;
        }
    }

    /// Consume the field-strip reload request.
    pub fn take_need_new_fields(&mut self) -> bool {
        std::mem::take(&mut self.need_new_fields)
    }

    /// Consume the frame-preview reload request.
    pub fn take_want_new_frames(&mut self) -> bool {
        std::mem::take(&mut self.want_new_frames)
    }

    pub fn set_auto_reload(&mut self, on: bool) {
        if let Some(project) = self.project.as_mut() {
            project.settings.auto_reload = on;
        }
    }

    /// Comb detection changes what the pipeline computes, so flipping it
    /// re-renders immediately.
    pub fn set_combed_detection(&mut self, on: bool) {
        if let Some(project) = self.project.as_mut() {
            if project.settings.combed_detection != on {
                project.settings.combed_detection = on;
                self.reload();
            }
        }
    }

    pub fn set_combed_threshold(&mut self, threshold: i64) {
        if let Some(project) = self.project.as_mut() {
            project.settings.combed_threshold = threshold;
        }
    }

    fn clamp_active_cycle(&mut self) {
        if let Some(project) = self.project.as_mut() {
            let max = cycle::max_cycle(project.annotations.field_count());
            if project.settings.active_cycle > max {
                project.settings.active_cycle = max;
            }
        }
    }
}

/// Absolute field index for a window position of the project's active
/// cycle, `None` when the position falls past the clip end.
fn field_at(project: &Project, position: usize) -> Option<usize> {
    let field = project.settings.active_cycle * FIELDS_PER_CYCLE + position;
    (position < WINDOW_FIELDS && field < project.annotations.field_count()).then_some(field)
}

/// Absolute output-frame index for a frame slot of the active cycle.
fn frame_at(project: &Project, slot: usize) -> Option<usize> {
    let frame = project.settings.active_cycle * FRAMES_PER_CYCLE + slot;
    (slot < FRAMES_PER_CYCLE && frame < project.annotations.frame_count()).then_some(frame)
}
