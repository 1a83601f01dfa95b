//! Ordered paint rules and their JSON rule sets.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::AutoPaintError;

/// Largest material id representable in a tile code nibble.
pub const MAX_MATERIAL: u8 = 15;

/// Highest height in the 16-bit raster domain.
pub const MAX_HEIGHT: f32 = 65535.0;

/// Highest slope in degrees.
pub const MAX_SLOPE: f32 = 90.0;

/// Optional extra constraint on where a rule applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MaskSource {
    /// Greyscale image; pixels brighter than mid-grey allow the rule.
    Raster { path: PathBuf },
    /// Named polyline from the mission descriptor.
    Polyline { name: String },
}

impl fmt::Display for MaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskSource::Raster { path } => write!(f, "raster {}", path.display()),
            MaskSource::Polyline { name } => write!(f, "polyline '{}'", name),
        }
    }
}

/// Assigns `material` where height and slope fall inside the inclusive ranges.
///
/// Heights are in the 16-bit raster domain, slopes in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintRule {
    pub material: u8,
    #[serde(default)]
    pub min_height: f32,
    #[serde(default = "default_max_height")]
    pub max_height: f32,
    #[serde(default)]
    pub min_slope: f32,
    #[serde(default = "default_max_slope")]
    pub max_slope: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskSource>,
}

fn default_max_height() -> f32 {
    MAX_HEIGHT
}

fn default_max_slope() -> f32 {
    MAX_SLOPE
}

impl PaintRule {
    /// A rule that matches every vertex.
    pub fn new(material: u8) -> Self {
        Self {
            material,
            min_height: 0.0,
            max_height: MAX_HEIGHT,
            min_slope: 0.0,
            max_slope: MAX_SLOPE,
            mask: None,
        }
    }

    pub fn with_height(mut self, min: f32, max: f32) -> Self {
        self.min_height = min;
        self.max_height = max;
        self
    }

    pub fn with_slope(mut self, min: f32, max: f32) -> Self {
        self.min_slope = min;
        self.max_slope = max;
        self
    }

    pub fn with_mask(mut self, mask: MaskSource) -> Self {
        self.mask = Some(mask);
        self
    }

    #[inline]
    pub fn matches(&self, height: f32, slope: f32) -> bool {
        height >= self.min_height && height <= self.max_height && slope >= self.min_slope && slope <= self.max_slope
    }

    /// Checks the structural invariants of the rule at list position `index`.
    pub fn validate(&self, index: usize) -> Result<(), AutoPaintError> {
        let fail = |reason: String| Err(AutoPaintError::Validation { rule: index, reason });
        if self.material > MAX_MATERIAL {
            return fail(format!("material {} exceeds {}", self.material, MAX_MATERIAL));
        }
        let slope_ok = |s: f32| (0.0..=MAX_SLOPE).contains(&s);
        if !slope_ok(self.min_slope) || !slope_ok(self.max_slope) {
            return fail(format!(
                "slope range [{}, {}] outside [0, {}]",
                self.min_slope, self.max_slope, MAX_SLOPE
            ));
        }
        if self.min_slope > self.max_slope {
            return fail(format!("inverted slope range [{}, {}]", self.min_slope, self.max_slope));
        }
        if self.min_height.is_nan() || self.max_height.is_nan() || self.min_height > self.max_height {
            return fail(format!("inverted height range [{}, {}]", self.min_height, self.max_height));
        }
        Ok(())
    }

    fn overlaps(&self, other: &PaintRule) -> bool {
        self.min_height <= other.max_height
            && other.min_height <= self.max_height
            && self.min_slope <= other.max_slope
            && other.min_slope <= self.max_slope
    }
}

/// Advisory: a later rule may overwrite an earlier one on some vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOverlap {
    pub earlier: usize,
    pub later: usize,
}

impl fmt::Display for RuleOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule {} overlaps rule {}; rule {} wins where both match",
            self.later, self.earlier, self.later
        )
    }
}

/// Rules in priority order: later rules overwrite earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<PaintRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<PaintRule>) -> Self {
        Self { rules }
    }

    pub fn from_json(json: &str) -> Result<Self, AutoPaintError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, AutoPaintError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, AutoPaintError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), AutoPaintError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Validates every rule, failing on the first invalid one.
    ///
    /// On success returns the overlap advisories, which are also logged.
    pub fn validate(&self) -> Result<Vec<RuleOverlap>, AutoPaintError> {
        for (i, rule) in self.rules.iter().enumerate() {
            rule.validate(i)?;
        }
        let overlaps = self.overlaps();
        for overlap in &overlaps {
            log::warn!("{}", overlap);
        }
        Ok(overlaps)
    }

    /// Pairs of rules whose height and slope ranges intersect.
    ///
    /// Masks are ignored: two masked rules may still never touch.
    pub fn overlaps(&self) -> Vec<RuleOverlap> {
        let mut out = Vec::new();
        for (later, rule) in self.rules.iter().enumerate() {
            for (earlier, prior) in self.rules[..later].iter().enumerate() {
                if prior.overlaps(rule) {
                    out.push(RuleOverlap { earlier, later });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_inclusive() {
        let rule = PaintRule::new(2).with_height(100.0, 200.0).with_slope(10.0, 20.0);
        assert!(rule.matches(100.0, 10.0));
        assert!(rule.matches(200.0, 20.0));
        assert!(!rule.matches(99.9, 15.0));
        assert!(!rule.matches(150.0, 20.1));
    }

    #[test]
    fn test_validation() {
        assert!(PaintRule::new(15).validate(0).is_ok());
        assert!(matches!(
            PaintRule::new(16).validate(3),
            Err(AutoPaintError::Validation { rule: 3, .. })
        ));
        assert!(PaintRule::new(1).with_slope(0.0, 91.0).validate(0).is_err());
        assert!(PaintRule::new(1).with_slope(-1.0, 10.0).validate(0).is_err());
        assert!(PaintRule::new(1).with_slope(40.0, 10.0).validate(0).is_err());
        assert!(PaintRule::new(1).with_height(500.0, 100.0).validate(0).is_err());
    }

    #[test]
    fn test_overlaps_are_advisory() {
        let set = RuleSet::new(vec![
            PaintRule::new(1).with_height(0.0, 1000.0),
            PaintRule::new(2).with_height(500.0, 2000.0),
            PaintRule::new(3).with_height(3000.0, 4000.0),
        ]);
        let overlaps = set.validate().unwrap();
        assert_eq!(overlaps, vec![RuleOverlap { earlier: 0, later: 1 }]);
        assert!(overlaps[0].to_string().contains("rule 1 wins"));
    }

    #[test]
    fn test_json_defaults_and_masks() {
        let json = r#"{
            "rules": [
                { "material": 1 },
                { "material": 4, "min_slope": 35.0, "mask": { "kind": "polyline", "name": "ridge" } },
                { "material": 7, "max_height": 9000, "mask": { "kind": "raster", "path": "snow.png" } }
            ]
        }"#;
        let set = RuleSet::from_json(json).unwrap();
        assert_eq!(set.rules.len(), 3);
        assert_eq!(set.rules[0], PaintRule::new(1));
        assert_eq!(set.rules[1].max_slope, MAX_SLOPE);
        assert_eq!(set.rules[1].mask, Some(MaskSource::Polyline { name: "ridge".into() }));
        assert_eq!(set.rules[2].mask, Some(MaskSource::Raster { path: "snow.png".into() }));

        let back = RuleSet::from_json(&set.to_json().unwrap()).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_bad_json_is_rules_error() {
        assert!(matches!(RuleSet::from_json("{ nope"), Err(AutoPaintError::Rules(_))));
    }
}
