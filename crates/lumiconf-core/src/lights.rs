//! Light model rules and spacing along a profile.
//!
//! Light positions are arc-length fractions in `[0, 1]` of the profile's line
//! junction. Two lights on the same profile must be at least the larger of
//! their two minimum spacings apart.

use crate::catalog::CatalogEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Slack when comparing spacings, so interval edges count as valid.
pub const SPACING_EPSILON: f64 = 1e-9;

/// Per-model placement rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightModel {
    /// Minimum distance to neighbouring lights, as a fraction of the profile.
    pub min_spacing: f64,
    /// Extra yaw applied after aligning with the profile tangent, in degrees.
    #[serde(default)]
    pub yaw_offset_deg: f64,
}

impl LightModel {
    pub const fn new(min_spacing: f64, yaw_offset_deg: f64) -> Self {
        Self { min_spacing, yaw_offset_deg }
    }
}

/// Light models by model key, with a fallback for unknown models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightTable {
    pub default: LightModel,
    pub models: HashMap<String, LightModel>,
}

impl Default for LightTable {
    fn default() -> Self {
        let default = LightModel::new(0.15, 0.0);
        let models = [
            ("XNRS01", LightModel::new(0.12, 0.0)),
            ("XNRS14", LightModel::new(0.15, 90.0)),
            ("XNRS15", LightModel::new(default.min_spacing, -45.0)),
            ("XNRS31", LightModel::new(0.18, 0.0)),
            ("XNRS32", LightModel::new(default.min_spacing, 90.0)),
            ("SP", LightModel::new(0.16, 0.0)),
        ]
        .into_iter()
        .map(|(key, model)| (key.to_string(), model))
        .collect();
        Self { default, models }
    }
}

impl LightTable {
    /// Rules for an entry, falling back to the default model.
    pub fn model(&self, entry: &CatalogEntry) -> LightModel {
        entry
            .model
            .as_deref()
            .and_then(|key| self.models.get(key))
            .copied()
            .unwrap_or(self.default)
    }

    pub fn min_spacing(&self, entry: &CatalogEntry) -> f64 {
        self.model(entry).min_spacing
    }

    pub fn yaw_offset_deg(&self, entry: &CatalogEntry) -> f64 {
        self.model(entry).yaw_offset_deg
    }
}

/// A light already on the profile: `(position, min_spacing)`.
pub type PlacedLight = (f64, f64);

/// Whether a light with `min_spacing` may sit at `position` among `others`.
pub fn is_valid_position(position: f64, min_spacing: f64, others: &[PlacedLight]) -> bool {
    others.iter().all(|&(other, other_spacing)| {
        let required = min_spacing.max(other_spacing);
        (position - other).abs() + SPACING_EPSILON >= required
    })
}

/// Closest valid position to `desired` inside `[margin_min, margin_max]`.
///
/// Free intervals are the gaps between neighbours, shrunk on both sides by
/// the spacing each neighbour requires. Returns `None` when no gap is left.
pub fn nearest_valid_position(
    desired: f64,
    min_spacing: f64,
    others: &[PlacedLight],
    margin_min: f64,
    margin_max: f64,
) -> Option<f64> {
    let clamped = desired.clamp(margin_min, margin_max);
    if is_valid_position(clamped, min_spacing, others) {
        return Some(clamped);
    }

    let mut sorted: Vec<PlacedLight> = others.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut best: Option<(f64, f64)> = None;
    for i in 0..=sorted.len() {
        let start = match i {
            0 => margin_min,
            _ => {
                let (pos, spacing) = sorted[i - 1];
                (pos + min_spacing.max(spacing)).max(margin_min)
            }
        };
        let end = match sorted.get(i) {
            None => margin_max,
            Some(&(pos, spacing)) => (pos - min_spacing.max(spacing)).min(margin_max),
        };
        if end < start {
            continue;
        }
        let candidate = desired.clamp(start, end);
        let distance = (candidate - desired).abs();
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ObjectCategory;

    fn light(model: Option<&str>) -> CatalogEntry {
        CatalogEntry {
            category: ObjectCategory::LightFixture,
            model: model.map(str::to_string),
            ..CatalogEntry::empty()
        }
    }

    #[test]
    fn test_table_lookup() {
        let table = LightTable::default();
        assert_eq!(table.min_spacing(&light(Some("XNRS31"))), 0.18);
        assert_eq!(table.yaw_offset_deg(&light(Some("XNRS15"))), -45.0);
        assert_eq!(table.min_spacing(&light(Some("XNRS15"))), 0.15);
        assert_eq!(table.model(&light(Some("UNKNOWN"))), table.default);
        assert_eq!(table.model(&light(None)), table.default);
    }

    #[test]
    fn test_spacing_uses_larger_minimum() {
        let others = [(0.5, 0.18)];
        assert!(!is_valid_position(0.65, 0.12, &others));
        assert!(is_valid_position(0.68, 0.12, &others));
        assert!(is_valid_position(0.3, 0.12, &[]));
    }

    #[test]
    fn test_nearest_returns_desired_when_free() {
        assert_eq!(nearest_valid_position(0.4, 0.15, &[], 0.05, 0.95), Some(0.4));
        assert_eq!(nearest_valid_position(0.99, 0.15, &[], 0.05, 0.95), Some(0.95));
    }

    #[test]
    fn test_nearest_moves_out_of_conflict() {
        let others = [(0.5, 0.15)];
        let position = nearest_valid_position(0.55, 0.15, &others, 0.05, 0.95).unwrap();
        assert!((position - 0.65).abs() < 1e-12);
        assert!(is_valid_position(position, 0.15, &others));

        let position = nearest_valid_position(0.45, 0.15, &others, 0.05, 0.95).unwrap();
        assert!((position - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_none_when_full() {
        let others = [(0.2, 0.2), (0.5, 0.2), (0.8, 0.2)];
        assert_eq!(nearest_valid_position(0.5, 0.15, &others, 0.05, 0.95), None);
    }
}
