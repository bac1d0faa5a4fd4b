//! Location record types.

use serde::{Deserialize, Serialize};

/// Position of a location on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

/// A single map location as stored in the backend.
///
/// Documents carry their identifier under `_id`; responses expose it as `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLocation {
    #[serde(alias = "_id")]
    pub id: String,
    pub location: String,
    pub xy: Coordinates,
}

impl MapLocation {
    pub fn new(id: impl Into<String>, location: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            xy: Coordinates { x, y },
        }
    }
}
