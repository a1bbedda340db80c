//! Map geometry record as stored on disk and sent in the `map` message.
//!
//! ```json
//! {
//!   "total": 2,
//!   "1": {"p1_x": 0.0, "p1_y": 0.0, "p2_x": 1.0, "p2_y": 0.0},
//!   "2": {"p1_x": 1.0, "p1_y": 0.0, "p2_x": 1.0, "p2_y": 1.0},
//!   "target": [0.8, 0.5],
//!   "spawn_pos": [0.2, 0.5],
//!   "ellipses": [{"x": 0.4, "y": 0.4, "width": 0.1, "height": 0.2}]
//! }
//! ```
//!
//! Coordinates are normalized to [0, 1] on both axes. `ellipses` is optional.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentWire {
    pub p1_x: f64,
    pub p1_y: f64,
    pub p2_x: f64,
    pub p2_y: f64,
}

/// Axis-aligned ellipse given by its bounding box; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseWire {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapFormatError {
    #[error("missing key `{0}`")]
    Missing(String),
    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct MapData {
    pub segments: Vec<SegmentWire>,
    pub ellipses: Vec<EllipseWire>,
    pub target: [f64; 2],
    pub spawn_pos: [f64; 2],
}

fn take_field<T: serde::de::DeserializeOwned>(
    obj: &mut Map<String, Value>,
    key: &str,
) -> Result<T, MapFormatError> {
    let value = obj
        .remove(key)
        .ok_or_else(|| MapFormatError::Missing(key.to_string()))?;
    serde_json::from_value(value).map_err(|e| MapFormatError::Invalid {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn check_finite(key: &str, values: &[f64]) -> Result<(), MapFormatError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(MapFormatError::Invalid {
            key: key.to_string(),
            reason: "non-finite coordinate".to_string(),
        })
    }
}

impl TryFrom<Map<String, Value>> for MapData {
    type Error = MapFormatError;

    fn try_from(mut obj: Map<String, Value>) -> Result<Self, Self::Error> {
        let total: usize = take_field(&mut obj, "total")?;
        // Every segment needs its own key
        if total > obj.len() {
            return Err(MapFormatError::Invalid {
                key: "total".to_string(),
                reason: format!("{} segments declared but only {} keys present", total, obj.len()),
            });
        }

        let mut segments = Vec::new();
        for i in 1..=total {
            let key = i.to_string();
            let seg: SegmentWire = take_field(&mut obj, &key)?;
            check_finite(&key, &[seg.p1_x, seg.p1_y, seg.p2_x, seg.p2_y])?;
            segments.push(seg);
        }

        let target: [f64; 2] = take_field(&mut obj, "target")?;
        check_finite("target", &target)?;
        let spawn_pos: [f64; 2] = take_field(&mut obj, "spawn_pos")?;
        check_finite("spawn_pos", &spawn_pos)?;

        let ellipses: Vec<EllipseWire> = if obj.contains_key("ellipses") {
            take_field(&mut obj, "ellipses")?
        } else {
            Vec::new()
        };
        for e in &ellipses {
            check_finite("ellipses", &[e.x, e.y, e.width, e.height])?;
        }

        Ok(Self {
            segments,
            ellipses,
            target,
            spawn_pos,
        })
    }
}

impl From<MapData> for Map<String, Value> {
    fn from(map: MapData) -> Self {
        let mut obj = Map::new();
        obj.insert("total".to_string(), Value::from(map.segments.len()));
        for (i, seg) in map.segments.iter().enumerate() {
            obj.insert(
                (i + 1).to_string(),
                serde_json::json!({
                    "p1_x": seg.p1_x,
                    "p1_y": seg.p1_y,
                    "p2_x": seg.p2_x,
                    "p2_y": seg.p2_y,
                }),
            );
        }
        obj.insert("target".to_string(), serde_json::json!(map.target));
        obj.insert("spawn_pos".to_string(), serde_json::json!(map.spawn_pos));
        if !map.ellipses.is_empty() {
            let ellipses: Vec<Value> = map
                .ellipses
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "x": e.x,
                        "y": e.y,
                        "width": e.width,
                        "height": e.height,
                    })
                })
                .collect();
            obj.insert("ellipses".to_string(), Value::Array(ellipses));
        }
        obj
    }
}

impl MapData {
    pub fn from_json(text: &str) -> Result<Self, MapFormatError> {
        let value: Value = serde_json::from_str(text).map_err(|e| MapFormatError::Invalid {
            key: "<root>".to_string(),
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(obj) => Self::try_from(obj),
            _ => Err(MapFormatError::Invalid {
                key: "<root>".to_string(),
                reason: "expected an object".to_string(),
            }),
        }
    }

    /// Bordered course with one interior baffle, used when no map file is configured.
    pub fn default_course() -> Self {
        let seg = |p1_x, p1_y, p2_x, p2_y| SegmentWire {
            p1_x,
            p1_y,
            p2_x,
            p2_y,
        };
        Self {
            segments: vec![
                seg(0.05, 0.1, 0.95, 0.1),
                seg(0.95, 0.1, 0.95, 0.9),
                seg(0.95, 0.9, 0.05, 0.9),
                seg(0.05, 0.9, 0.05, 0.1),
                seg(0.5, 0.1, 0.5, 0.6),
            ],
            ellipses: Vec::new(),
            target: [0.8, 0.3],
            spawn_pos: [0.2, 0.5],
        }
    }
}
