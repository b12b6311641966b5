// What the player consumes: the active assets in play order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use warp::reply::Response;
use warp::Reply;

use crate::asset::Asset;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Playlist {
    pub generated_at: DateTime<Utc>,
    /// The next instant at which the playlist changes through time alone, if any.
    pub deadline: Option<DateTime<Utc>>,
    pub assets: Vec<Asset>,
}

impl Playlist {
    pub fn build(assets: &[Asset], now: DateTime<Utc>) -> Self {
        let mut active: Vec<&Asset> = assets.iter().filter(|a| a.is_active(now)).collect();
        active.sort_by_key(|a| a.play_order);

        // Only enabled, ready assets can move in or out of the sequence on their own.
        let deadline = assets
            .iter()
            .filter(|a| a.is_enabled && !a.is_processing)
            .flat_map(|a| [a.start_date, a.end_date])
            .filter(|t| *t > now)
            .min();

        Self {
            generated_at: now,
            deadline,
            assets: active.into_iter().cloned().collect(),
        }
    }
}

impl Reply for Playlist {
    fn into_response(self) -> Response {
        warp::reply::json(&self).into_response()
    }
}
