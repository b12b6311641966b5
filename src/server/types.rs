use serde::{Deserialize, Serialize};

use crate::asset::AssetId;

/// Body of `POST /api/v1/assets/order`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReorderRequest {
    pub ids: Vec<AssetId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
