//! Catalog model: product codes, junction points and line junctions.

use crate::curve::QuadBezier3;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown catalog code: {0}")]
    UnknownCode(String),
    #[error("Catalog entry {0} has no junctions to extrude from")]
    MissingJunctions(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Product category, used instead of parsing product codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Profile,
    LightFixture,
    Joiner,
    #[default]
    Generic,
}

/// Local-space point as stored in catalog JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<CatalogPoint> for DVec3 {
    fn from(p: CatalogPoint) -> Self {
        DVec3::new(p.x, p.y, p.z)
    }
}

impl From<DVec3> for CatalogPoint {
    fn from(v: DVec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

/// A point connector. Two junctions mate only when their groups match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub group: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Facing direction in degrees around the vertical axis.
    pub angle: f64,
}

impl Junction {
    pub fn position(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }
}

/// A curved connector along which objects can slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineJunction {
    pub group: String,
    pub point1: CatalogPoint,
    pub point2: CatalogPoint,
    #[serde(rename = "pointC")]
    pub point_c: CatalogPoint,
}

impl LineJunction {
    /// The curve with each control point mapped through `to_world`.
    pub fn curve_with(&self, to_world: impl Fn(DVec3) -> DVec3) -> QuadBezier3 {
        QuadBezier3::new(
            to_world(self.point1.into()),
            to_world(self.point_c.into()),
            to_world(self.point2.into()),
        )
    }

    /// Midpoint of the two end points, in local space.
    pub fn midpoint(&self) -> DVec3 {
        (DVec3::from(self.point1) + DVec3::from(self.point2)) * 0.5
    }
}

/// Position of a piece inside a composite profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRole {
    Only,
    First,
    Interior,
    Last,
}

impl SegmentRole {
    pub fn for_index(index: usize, count: usize) -> Self {
        match (index, count) {
            (_, 0 | 1) => Self::Only,
            (0, _) => Self::First,
            (i, n) if i + 1 == n => Self::Last,
            _ => Self::Interior,
        }
    }
}

/// Immutable description of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub juncts: Vec<Junction>,
    #[serde(default)]
    pub line_juncts: Vec<LineJunction>,
    /// Watts, per metre for extruded profiles.
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub category: ObjectCategory,
    /// Light model key used for spacing and orientation rules.
    #[serde(default)]
    pub model: Option<String>,
}

impl CatalogEntry {
    /// An entry with no connectors, used for temporary objects.
    pub fn empty() -> Self {
        Self {
            code: String::new(),
            juncts: Vec::new(),
            line_juncts: Vec::new(),
            power: 0.0,
            price_cents: 0,
            system: String::new(),
            category: ObjectCategory::Generic,
            model: None,
        }
    }

    pub fn is_light(&self) -> bool {
        self.category == ObjectCategory::LightFixture
    }

    pub fn is_profile(&self) -> bool {
        self.category == ObjectCategory::Profile
    }

    /// Objects lights can be placed on: non-lights carrying line junctions.
    pub fn accepts_lights(&self) -> bool {
        !self.is_light() && !self.line_juncts.is_empty()
    }

    /// The entry as seen by one piece of a composite profile.
    ///
    /// Inner ends of joined pieces lose their point junctions so nothing else
    /// can be attached there. Line junctions are always kept.
    pub fn presentation(&self, role: SegmentRole) -> Self {
        let mut entry = self.clone();
        if self.juncts.len() > 1 {
            entry.juncts = match role {
                SegmentRole::Only => self.juncts.clone(),
                SegmentRole::First => self.juncts.last().cloned().into_iter().collect(),
                SegmentRole::Last => self.juncts.first().cloned().into_iter().collect(),
                SegmentRole::Interior => Vec::new(),
            };
        }
        entry
    }

    /// A straight profile of `length` scene units along X, derived from this entry.
    pub fn extruded(&self, length: f64) -> Result<Self, CatalogError> {
        let junct = self
            .juncts
            .first()
            .ok_or_else(|| CatalogError::MissingJunctions(self.code.clone()))?;
        let line = self
            .line_juncts
            .first()
            .ok_or_else(|| CatalogError::MissingJunctions(self.code.clone()))?;

        let v1 = DVec3::ZERO;
        let v2 = DVec3::new(length, 0.0, 0.0);
        let mut entry = self.clone();
        entry.juncts = vec![
            Junction { group: junct.group.clone(), x: v1.x, y: v1.y, z: v1.z, angle: 270.0 },
            Junction { group: junct.group.clone(), x: v2.x, y: v2.y, z: v2.z, angle: 90.0 },
        ];
        entry.line_juncts = vec![LineJunction {
            group: line.group.clone(),
            point1: v1.into(),
            point2: v2.into(),
            point_c: v2.into(),
        }];
        entry.category = ObjectCategory::Profile;
        Ok(entry)
    }
}

/// Product catalog keyed by code.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, Arc<CatalogEntry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from a JSON object of `code -> entry`.
    ///
    /// Entries without a `code` field take the key as their code.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: HashMap<String, CatalogEntry> =
            serde_json::from_str(json).map_err(|e| CatalogError::Serialization(e.to_string()))?;
        let entries = raw
            .into_iter()
            .map(|(key, mut entry)| {
                if entry.code.is_empty() {
                    entry.code = key.clone();
                }
                (key, Arc::new(entry))
            })
            .collect();
        Ok(Self { entries })
    }

    /// Serialize with codes in sorted order.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let sorted: BTreeMap<&str, &CatalogEntry> = self
            .entries
            .iter()
            .map(|(code, entry)| (code.as_str(), entry.as_ref()))
            .collect();
        serde_json::to_string_pretty(&sorted).map_err(|e| CatalogError::Serialization(e.to_string()))
    }

    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.code.clone(), Arc::new(entry));
    }

    pub fn get(&self, code: &str) -> Option<Arc<CatalogEntry>> {
        self.entries.get(code).cloned()
    }

    /// Like [`Catalog::get`] but reports unknown codes.
    pub fn entry(&self, code: &str) -> Result<Arc<CatalogEntry>, CatalogError> {
        self.get(code).ok_or_else(|| CatalogError::UnknownCode(code.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All codes, sorted.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}
