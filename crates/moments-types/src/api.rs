use serde::{Deserialize, Serialize};

use crate::models::MomentId;

// -- Identity --

/// JWT claims issued by the identity service. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Moments --

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationBody {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub dir: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct LeaveMomentRequest {
    pub location: Option<LocationBody>,
    pub public: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub media: Vec<MediaBody>,
    /// User ids that receive an unfound Find row.
    #[serde(default)]
    pub recipients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaveMomentResponse {
    pub id: MomentId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaDeleteRequest {
    pub types: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipientsRequest {
    pub recipients: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareRequest {
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub recipients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

// -- Search --

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NearQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct SharedQuery {
    /// The finder whose shares are listed.
    pub from: String,
}
