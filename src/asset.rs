use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque asset identifier: a v4 UUID rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One playable unit of the device playlist, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: AssetId,
    pub name: String,
    pub uri: String,
    pub mimetype: String,
    pub md5: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Seconds on screen. Zero means the content times itself (video).
    pub duration: u32,
    pub is_enabled: bool,
    pub is_processing: bool,
    pub nocache: bool,
    pub skip_asset_check: bool,
    /// Position in the active sequence. Stale while the asset is inactive.
    pub play_order: u32,
}

impl Asset {
    /// Whether the asset is eligible to play at `now`.
    ///
    /// The validity window is half-open: the asset turns active exactly at `start_date`
    /// and inactive exactly at `end_date`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.is_enabled && !self.is_processing && self.start_date <= now && now < self.end_date
    }

    pub fn is_video(&self) -> bool {
        is_video_mimetype(&self.mimetype)
    }
}

pub(crate) fn is_video_mimetype(mimetype: &str) -> bool {
    mimetype.contains("video")
}
