//! Request bodies for the lifecycle operations.
//!
//! Every recognized field is listed here; anything else in a body is rejected when it is
//! deserialized.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::asset::{is_video_mimetype, Asset, AssetId};
use crate::error::{Error, Result};

/// Seconds on screen when a non-video asset does not say.
pub const DEFAULT_DURATION: u32 = 10;

/// Body of a create (POST) or full update (PUT).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAsset {
    pub name: String,
    pub uri: String,
    pub mimetype: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_enabled: bool,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default)]
    pub nocache: bool,
    /// Requested position in the active sequence. Clamped, never rejected.
    #[serde(default)]
    pub play_order: Option<i64>,
    #[serde(default)]
    pub skip_asset_check: bool,
}

impl CreateAsset {
    /// Build the stored form. `play_order` is provisional until the active sequence is
    /// persisted.
    pub fn into_asset(self, asset_id: AssetId) -> Result<Asset> {
        let duration = match self.duration {
            Some(duration) => duration,
            None if is_video_mimetype(&self.mimetype) => 0,
            None => DEFAULT_DURATION,
        };

        let asset = Asset {
            asset_id,
            name: self.name.trim().to_string(),
            uri: self.uri.trim().to_string(),
            mimetype: self.mimetype.trim().to_string(),
            md5: self.md5,
            start_date: self.start_date,
            end_date: self.end_date,
            duration,
            is_enabled: self.is_enabled,
            is_processing: self.is_processing,
            nocache: self.nocache,
            skip_asset_check: self.skip_asset_check,
            play_order: self.play_order.unwrap_or(0).max(0).try_into().unwrap_or(u32::MAX),
        };
        validate(&asset)?;

        Ok(asset)
    }
}

/// Body of a partial update (PATCH). Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchAsset {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub mimetype: Option<String>,
    pub md5: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub duration: Option<u32>,
    pub is_enabled: Option<bool>,
    pub is_processing: Option<bool>,
    pub nocache: Option<bool>,
    pub play_order: Option<i64>,
    pub skip_asset_check: Option<bool>,
}

impl PatchAsset {
    /// Merge into `asset` and validate the result. The requested position is left in
    /// `play_order` of the returned asset, clamped at zero.
    pub fn apply(self, mut asset: Asset) -> Result<Asset> {
        if let Some(name) = self.name {
            asset.name = name.trim().to_string();
        }
        if let Some(uri) = self.uri {
            asset.uri = uri.trim().to_string();
        }
        if let Some(mimetype) = self.mimetype {
            asset.mimetype = mimetype.trim().to_string();
        }
        if self.md5.is_some() {
            asset.md5 = self.md5;
        }
        if let Some(start_date) = self.start_date {
            asset.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            asset.end_date = end_date;
        }
        if let Some(duration) = self.duration {
            asset.duration = duration;
        }
        if let Some(is_enabled) = self.is_enabled {
            asset.is_enabled = is_enabled;
        }
        if let Some(is_processing) = self.is_processing {
            asset.is_processing = is_processing;
        }
        if let Some(nocache) = self.nocache {
            asset.nocache = nocache;
        }
        if let Some(play_order) = self.play_order {
            asset.play_order = play_order.max(0).try_into().unwrap_or(u32::MAX);
        }
        if let Some(skip_asset_check) = self.skip_asset_check {
            asset.skip_asset_check = skip_asset_check;
        }

        validate(&asset)?;
        Ok(asset)
    }
}

fn validate(asset: &Asset) -> Result<()> {
    if asset.name.is_empty() {
        return Err(Error::validation("name must not be empty"));
    }
    if asset.mimetype.is_empty() {
        return Err(Error::validation("mimetype must not be empty"));
    }
    validate_uri(&asset.uri)?;

    if asset.start_date > asset.end_date {
        return Err(Error::validation("start_date must not be after end_date"));
    }
    if asset.duration == 0 && !asset.is_video() {
        return Err(Error::validation("duration must be positive for non-video assets"));
    }

    Ok(())
}

/// A uri is either an absolute local path or a URL with a scheme.
fn validate_uri(uri: &str) -> Result<()> {
    if uri.is_empty() {
        return Err(Error::validation("uri must not be empty"));
    }
    if uri.starts_with('/') {
        return Ok(());
    }

    let url = Url::parse(uri).map_err(|e| Error::validation(format!("invalid uri {uri}: {e}")))?;
    if matches!(url.scheme(), "http" | "https") && url.host_str().is_none() {
        return Err(Error::validation(format!("invalid uri {uri}: missing host")));
    }

    Ok(())
}
