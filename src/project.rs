//! Project persistence: the versioned, gzip-compressed JSON container an
//! annotation session is saved to (`.ivtc` files).
//!
//! The on-disk document has top-level keys `ivtc_actions`,
//! `no_match_handling`, `extra_attributes` and a `project_garbage` group
//! carrying notes, scene changes and session settings. Legacy projects
//! kept `notes`/`scene_changes` at the top level with no version key;
//! loading migrates them in place to the nested layout (version 1) and
//! back-fills defaults without overwriting existing values.
//!
//! Loading is permissive (missing fields default, both action encodings
//! accepted); saving always writes the canonical layout and integer
//! action codes. Saves are atomic: temp file in the target directory,
//! then rename, so readers never observe a partial file.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{info, warn};
use serde_json::{Value, json};

use crate::action::Action;
use crate::annotations::Annotations;
use crate::error::{IvtcError, Result};

/// Current project schema version. Monotonically non-decreasing across
/// saves; the loader accepts everything up to and including it.
pub const SCHEMA_VERSION: u64 = 1;

/// Project file extension.
pub const PROJECT_EXT: &str = "ivtc";

/// Source-script extension used for new-project creation.
pub const SCRIPT_EXT: &str = "vpy";

/// Session settings persisted inside `project_garbage`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub active_cycle: usize,
    pub auto_reload: bool,
    pub combed_detection: bool,
    pub combed_threshold: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            active_cycle: 0,
            auto_reload: true,
            combed_detection: false,
            combed_threshold: 45,
        }
    }
}

/// The top-level persisted aggregate: annotation store plus navigation and
/// session settings, and the path it was last saved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub annotations: Annotations,
    pub settings: SessionSettings,
    pub script_file: PathBuf,
    version: u64,
    path: Option<PathBuf>,
}

impl Project {
    /// Fresh project for a source script: annotations tiled from the
    /// default 10-field template, default settings, no save path yet.
    pub fn create_new(script_file: impl Into<PathBuf>, field_count: usize) -> Self {
        Self {
            annotations: Annotations::from_template(field_count),
            settings: SessionSettings::default(),
            script_file: script_file.into(),
            version: SCHEMA_VERSION,
            path: None,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Path this project was loaded from / last saved to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    /// Load a project container: decompress, parse, migrate, extract.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let compressed = fs::read(path)?;

        let mut text = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut text)
            .map_err(|e| IvtcError::CorruptProject(format!("decompress failed: {}", e)))?;

        let mut doc: Value = serde_json::from_str(&text)
            .map_err(|e| IvtcError::CorruptProject(format!("parse failed: {}", e)))?;

        migrate(&mut doc)?;
        let mut project = Self::from_document(&doc)?;
        project.path = Some(path.to_path_buf());
        info!(
            "Loaded project {} ({} fields, schema v{})",
            path.display(),
            project.annotations.field_count(),
            project.version
        );
        Ok(project)
    }

    /// Save to the associated path. No-op (returns `false`) when the
    /// project has no path yet; the caller must prompt for one first.
    pub fn save(&mut self) -> Result<bool> {
        let Some(path) = self.path.clone() else {
            return Ok(false);
        };
        self.write_to(&path)?;
        Ok(true)
    }

    /// Associate a new path and save to it.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.write_to(&path)?;
        self.path = Some(path);
        Ok(())
    }

    fn write_to(&mut self, path: &Path) -> Result<()> {
        let text = serde_json::to_string(&self.to_document())
            .map_err(|e| IvtcError::CorruptProject(format!("serialize failed: {}", e)))?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes())?;
        let compressed = encoder.finish()?;

        // Write to a temp file in the target directory, then rename over
        // the destination: no partial-file visibility on any exit path.
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new_in(".")?,
        };
        tmp.write_all(&compressed)?;
        tmp.persist(path).map_err(|e| IvtcError::Io(e.error))?;

        self.annotations.clear_dirty();
        info!("Saved project to {}", path.display());
        Ok(())
    }

    /// Uncompressed document bytes, as handed to the frame source with the
    /// raw-encoding flag set.
    pub fn raw_document(&self) -> Vec<u8> {
        serde_json::to_vec(&self.to_document()).unwrap_or_default()
    }

    /// Build the canonical on-disk document.
    pub fn to_document(&self) -> Value {
        let actions: Vec<u64> = self
            .annotations
            .actions()
            .iter()
            .map(|a| a.code() as u64)
            .collect();
        let scene_changes: Vec<u64> = self
            .annotations
            .scene_changes()
            .iter()
            .map(|&i| i as u64)
            .collect();
        let no_match: serde_json::Map<String, Value> = self
            .annotations
            .no_match_handling()
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();
        let extra: serde_json::Map<String, Value> = self
            .annotations
            .extra_attributes()
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();

        let mut garbage = match serde_json::to_value(&self.settings) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        garbage.insert("version".to_string(), json!(self.version));
        garbage.insert(
            "script_file".to_string(),
            json!(self.script_file.to_string_lossy()),
        );
        garbage.insert("notes".to_string(), json!(self.annotations.notes()));
        garbage.insert("scene_changes".to_string(), json!(scene_changes));

        json!({
            "ivtc_actions": actions,
            "no_match_handling": no_match,
            "extra_attributes": extra,
            "project_garbage": garbage,
        })
    }

    /// Extract a typed project from a migrated document.
    pub fn from_document(doc: &Value) -> Result<Self> {
        let actions = decode_actions(doc.get("ivtc_actions"))?;
        let field_count = actions.len();

        let garbage = doc
            .get("project_garbage")
            .and_then(Value::as_object)
            .ok_or_else(|| IvtcError::CorruptProject("missing project_garbage".into()))?;

        let version = garbage.get("version").and_then(Value::as_u64).unwrap_or(1);
        if version > SCHEMA_VERSION {
            return Err(IvtcError::CorruptProject(format!(
                "unsupported schema version {} (newest supported: {})",
                version, SCHEMA_VERSION
            )));
        }

        // Notes must stay exactly field-count long; a short legacy array
        // is padded, an overlong one truncated.
        let mut notes: Vec<String> = garbage
            .get("notes")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .map(|v| v.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();
        if notes.len() != field_count {
            warn!(
                "notes length {} != field count {}, adjusting",
                notes.len(),
                field_count
            );
            notes.resize(field_count, String::new());
        }

        let mut scene_changes = std::collections::BTreeSet::new();
        if let Some(arr) = garbage.get("scene_changes").and_then(Value::as_array) {
            for v in arr {
                match v.as_u64().map(|i| i as usize) {
                    Some(i) if i < field_count => {
                        scene_changes.insert(i);
                    }
                    other => warn!("dropping invalid scene change marker: {:?}", other),
                }
            }
        }

        let frame_count = crate::cycle::frame_count_for_fields(field_count);
        let no_match_handling = decode_frame_map(doc.get("no_match_handling"), frame_count);
        let extra_attributes = decode_frame_map(doc.get("extra_attributes"), frame_count);

        // Unknown keys in project_garbage are ignored; a wrong-typed value
        // falls back to full defaults rather than failing the load.
        let settings: SessionSettings =
            serde_json::from_value(Value::Object(garbage.clone())).unwrap_or_else(|e| {
                warn!("malformed session settings ({}), using defaults", e);
                SessionSettings::default()
            });

        let script_file = garbage
            .get("script_file")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_default();

        Ok(Self {
            annotations: Annotations::from_parts(
                actions,
                notes,
                scene_changes,
                no_match_handling,
                extra_attributes,
            ),
            settings,
            script_file,
            version,
            path: None,
        })
    }
}

/// Insert `default` only when `key` is absent (the permissive back-fill
/// used throughout migration).
fn set_default(object: &mut serde_json::Map<String, Value>, key: &str, default: Value) {
    if !object.contains_key(key) {
        object.insert(key.to_string(), default);
    }
}

/// In-place schema migration of a parsed document.
///
/// A document whose `project_garbage` lacks a `version` key is a legacy
/// flat layout: top-level `notes` and `scene_changes` move into
/// `project_garbage` and the version becomes 1. Defaults are back-filled
/// for every newer field without overwriting existing values. Idempotent:
/// migrating an already-versioned document changes nothing.
pub fn migrate(doc: &mut Value) -> Result<()> {
    let root = doc
        .as_object_mut()
        .ok_or_else(|| IvtcError::CorruptProject("document root is not an object".into()))?;

    set_default(root, "ivtc_actions", json!([]));
    set_default(root, "no_match_handling", json!({}));
    set_default(root, "extra_attributes", json!({}));
    set_default(root, "project_garbage", json!({}));

    // Legacy top-level arrays move into the nested group
    let legacy_notes = root.get("notes").cloned();
    let legacy_scenes = root.get("scene_changes").cloned();

    let garbage = root
        .get_mut("project_garbage")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| IvtcError::CorruptProject("project_garbage is not an object".into()))?;

    if !garbage.contains_key("version") {
        info!("Legacy project detected, migrating to schema v1");
        if let Some(notes) = legacy_notes {
            set_default(garbage, "notes", notes);
        }
        if let Some(scenes) = legacy_scenes {
            set_default(garbage, "scene_changes", scenes);
        }
        garbage.insert("version".to_string(), json!(1));
    }

    set_default(garbage, "notes", json!([]));
    set_default(garbage, "scene_changes", json!([]));
    set_default(garbage, "active_cycle", json!(0));
    set_default(garbage, "auto_reload", json!(true));
    set_default(garbage, "combed_detection", json!(false));
    set_default(garbage, "combed_threshold", json!(45));

    // The moved arrays are now owned by project_garbage
    root.remove("notes");
    root.remove("scene_changes");
    Ok(())
}

/// Decode the actions array, accepting both project generations: small
/// integer codes and string codes/names.
fn decode_actions(value: Option<&Value>) -> Result<Vec<Action>> {
    let arr = value
        .and_then(Value::as_array)
        .ok_or_else(|| IvtcError::CorruptProject("ivtc_actions is not an array".into()))?;

    let mut actions = Vec::with_capacity(arr.len());
    for (i, v) in arr.iter().enumerate() {
        let action = match v {
            Value::Number(n) => n
                .as_u64()
                .filter(|&c| c <= u8::MAX as u64)
                .and_then(|c| Action::from_code(c as u8)),
            Value::String(s) => s.parse::<Action>().ok(),
            _ => None,
        };
        match action {
            Some(a) => actions.push(a),
            None => {
                return Err(IvtcError::CorruptProject(format!(
                    "invalid action at index {}: {}",
                    i, v
                )));
            }
        }
    }
    Ok(actions)
}

/// Decode a `{ "frame index": "text" }` object; unparsable or
/// out-of-range keys and empty values are dropped with a warning, not
/// errors.
fn decode_frame_map(
    value: Option<&Value>,
    frame_count: usize,
) -> std::collections::BTreeMap<usize, String> {
    let mut map = std::collections::BTreeMap::new();
    let Some(obj) = value.and_then(Value::as_object) else {
        return map;
    };
    for (key, v) in obj {
        let Ok(frame) = key.parse::<usize>() else {
            warn!("dropping frame-keyed entry with bad key: {:?}", key);
            continue;
        };
        if frame >= frame_count {
            warn!(
                "dropping frame-keyed entry {} past frame count {}",
                frame, frame_count
            );
            continue;
        }
        let Some(text) = v.as_str() else {
            warn!("dropping non-string frame entry at {}", frame);
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        map.insert(frame, text.to_string());
    }
    map
}
