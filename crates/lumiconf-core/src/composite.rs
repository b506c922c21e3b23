//! Composite profiles built from standard-length pieces.
//!
//! A custom length is covered greedily with 2500, 500 and 100 mm pieces.
//! Every piece reuses the base code's junctions; only its mesh is scaled.

use serde::{Deserialize, Serialize};

/// Length of a standard profile piece in millimetres.
pub const STANDARD_PIECE_MM: u32 = 2500;
/// Available piece lengths, longest first.
pub const PIECE_LENGTHS_MM: [u32; 3] = [STANDARD_PIECE_MM, 500, 100];
/// Scene units per millimetre of profile.
pub const SCENE_UNITS_PER_MM: f64 = 62.5 / STANDARD_PIECE_MM as f64;

/// `count` pieces of the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSegment {
    pub code: String,
    pub length: u32,
    pub count: u32,
}

impl ProfileSegment {
    /// Mesh scale along X relative to a standard piece.
    pub fn scale_factor(&self) -> f64 {
        self.length as f64 / STANDARD_PIECE_MM as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeProfileConfig {
    pub segments: Vec<ProfileSegment>,
    pub total_length: u32,
    pub base_code: String,
    /// Millimetres no piece could cover.
    pub uncovered: u32,
}

impl CompositeProfileConfig {
    pub fn piece_count(&self) -> usize {
        self.segments.iter().map(|s| s.count as usize).sum()
    }

    /// Piece lengths in layout order.
    pub fn pieces(&self) -> impl Iterator<Item = &ProfileSegment> {
        self.segments
            .iter()
            .flat_map(|segment| std::iter::repeat_n(segment, segment.count as usize))
    }
}

/// Cover `target_length` mm with the fewest pieces, longest first.
pub fn calculate_profile_composition(base_code: &str, target_length: u32) -> CompositeProfileConfig {
    let mut remaining = target_length;
    let mut segments = Vec::new();

    for length in PIECE_LENGTHS_MM {
        let count = remaining / length;
        if count == 0 {
            continue;
        }
        let code = if length == STANDARD_PIECE_MM {
            base_code.to_string()
        } else {
            format!("{}_{}", base_code, length)
        };
        segments.push(ProfileSegment { code, length, count });
        remaining -= count * length;
    }

    if remaining > 0 {
        log::warn!("{}mm of {} left uncovered by profile pieces", remaining, base_code);
    }

    CompositeProfileConfig {
        segments,
        total_length: target_length,
        base_code: base_code.to_string(),
        uncovered: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_composition() {
        let config = calculate_profile_composition("XNR01L", 5600);
        assert_eq!(
            config.segments,
            vec![
                ProfileSegment { code: "XNR01L".into(), length: 2500, count: 2 },
                ProfileSegment { code: "XNR01L_500".into(), length: 500, count: 1 },
                ProfileSegment { code: "XNR01L_100".into(), length: 100, count: 1 },
            ]
        );
        assert_eq!(config.uncovered, 0);
        assert_eq!(config.piece_count(), 4);
        assert_eq!(config.pieces().map(|p| p.length).collect::<Vec<_>>(), vec![2500, 2500, 500, 100]);
    }

    #[test]
    fn test_remainder_reported() {
        let config = calculate_profile_composition("XNS01L", 650);
        assert_eq!(config.piece_count(), 2);
        assert_eq!(config.uncovered, 50);
    }

    #[test]
    fn test_too_short() {
        let config = calculate_profile_composition("XNS01L", 80);
        assert!(config.segments.is_empty());
        assert_eq!(config.uncovered, 80);
    }

    #[test]
    fn test_scale_factor() {
        let segment = ProfileSegment { code: "X".into(), length: 500, count: 1 };
        assert!((segment.scale_factor() - 0.2).abs() < 1e-12);
        assert!((SCENE_UNITS_PER_MM * 2500.0 - 62.5).abs() < 1e-12);
    }
}
