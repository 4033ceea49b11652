//! Window rectangle persistence
//!
//! The rectangle is stored as the `window` record of the preferences
//! document. Loading clamps it back onto the available screen area; saving
//! is best-effort and never reports failure to the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::constants::geometry::{MIN_VISIBLE_X, MIN_VISIBLE_Y};
use crate::types::Rect;

/// Stored rectangle. Fields that are missing or not integers read as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeometryRecord {
    #[serde(default, deserialize_with = "lenient_i32")]
    pub x: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub y: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub w: Option<i32>,
    #[serde(default, deserialize_with = "lenient_i32")]
    pub h: Option<i32>,
}

impl From<Rect> for GeometryRecord {
    fn from(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            w: Some(rect.width),
            h: Some(rect.height),
        }
    }
}

/// Accept any JSON value, keeping only integers that fit in i32
fn lenient_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_i64())
        .and_then(|n| i32::try_from(n).ok()))
}

/// Deserialize a whole record, falling back to an empty one if the value
/// isn't an object
pub(crate) fn lenient_record<'de, D>(deserializer: D) -> Result<GeometryRecord, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(GeometryRecord::deserialize(value).unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring malformed window geometry record");
        GeometryRecord::default()
    }))
}

/// Restore a stored rectangle against `screen` (available bounds).
///
/// Returns `None` when the record is incomplete or has a non-positive size.
/// A rect whose origin is off-screen or that is larger than the screen is
/// clamped so at least `MIN_VISIBLE_X` x `MIN_VISIBLE_Y` pixels stay visible.
pub fn load(stored: &GeometryRecord, screen: Rect) -> Option<Rect> {
    let (Some(x), Some(y), Some(w), Some(h)) = (stored.x, stored.y, stored.w, stored.h) else {
        debug!(?stored, "No complete stored geometry");
        return None;
    };
    if w <= 0 || h <= 0 {
        warn!(width = w, height = h, "Stored geometry has non-positive size, ignoring");
        return None;
    }

    let candidate = Rect::new(x, y, w, h);
    let origin_outside = x < screen.left()
        || x >= screen.right()
        || y < screen.top()
        || y >= screen.bottom();
    let too_large = w > screen.width || h > screen.height;
    if !origin_outside && !too_large {
        return Some(candidate);
    }

    // min/max instead of clamp(): screens narrower than the visible margin must not panic
    let clamped = Rect::new(
        x.min(screen.right().saturating_sub(MIN_VISIBLE_X)).max(screen.left()),
        y.min(screen.bottom().saturating_sub(MIN_VISIBLE_Y)).max(screen.top()),
        w.min(screen.width),
        h.min(screen.height),
    );
    info!(stored = ?candidate, restored = ?clamped, "Clamped stored geometry to screen");
    Some(clamped)
}

/// Writes the `window` record into the preferences document on disk
#[derive(Debug, Clone)]
pub struct GeometryStore {
    path: PathBuf,
}

impl GeometryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort save; failures are logged and swallowed
    pub fn save(&self, rect: Rect) {
        match self.try_save(rect) {
            Ok(()) => debug!(?rect, path = %self.path.display(), "Saved window geometry"),
            Err(e) => error!(error = ?e, "Failed to save window geometry"),
        }
    }

    /// Replace the whole `window` record, keeping every other key of the document
    fn try_save(&self, rect: Rect) -> Result<()> {
        let mut document = fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| serde_json::from_str::<serde_json::Value>(&contents).ok())
            .filter(|value| value.is_object())
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

        let record = serde_json::to_value(GeometryRecord::from(rect))
            .context("Failed to serialize geometry record")?;
        if let Some(object) = document.as_object_mut() {
            object.insert("window".to_string(), record);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(&document)
            .context("Failed to serialize preferences document")?;
        fs::write(&self.path, contents)
            .context(format!("Failed to write preferences to {}", self.path.display()))?;
        Ok(())
    }
}
