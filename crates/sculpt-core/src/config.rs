//! Editor tunables.

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Manhattan radius (in canvas units) within which a point snaps.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 5.0;

/// Number of points a quadtree leaf holds before it subdivides.
pub const DEFAULT_SPLIT_LIMIT: usize = 20;

/// Hard cap on quadtree depth.
pub const MAX_TREE_DEPTH: usize = 10;

/// Default gesture move throttle window in milliseconds.
pub const DEFAULT_THROTTLE_MS: u64 = 16;

/// Default debounce window for snap detection in milliseconds.
pub const DEFAULT_SNAP_DEBOUNCE_MS: u64 = 100;

/// Configuration shared by the snapping index, the gesture layer and the
/// root canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub snap_threshold: f64,
    pub split_limit: usize,
    pub max_depth: usize,
    /// Root canvas rectangle; also the bounds of the snapping index.
    pub canvas: Rect,
    #[serde(with = "millis")]
    pub throttle_interval: Duration,
    #[serde(with = "millis")]
    pub snap_debounce: Duration,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            split_limit: DEFAULT_SPLIT_LIMIT,
            max_depth: MAX_TREE_DEPTH,
            canvas: Rect::new(0.0, 0.0, 800.0, 600.0),
            throttle_interval: Duration::from_millis(DEFAULT_THROTTLE_MS),
            snap_debounce: Duration::from_millis(DEFAULT_SNAP_DEBOUNCE_MS),
        }
    }
}

impl EditorConfig {
    /// Config for a canvas of the given size at the origin.
    pub fn with_canvas_size(width: f64, height: f64) -> Self {
        Self {
            canvas: Rect::new(0.0, 0.0, width, height),
            ..Self::default()
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
