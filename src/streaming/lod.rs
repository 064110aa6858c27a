//! Level of Detail (LOD) table for distance-based mesh resolution
//!
//! Each entry pairs a mesh LOD level with the viewer distance up to which it
//! is used. Entries are ascending by distance; the last entry's threshold is
//! the maximum view distance of the whole system.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::mesh::validate_lod;

/// One LOD band
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodInfo {
    /// Mesh LOD level passed to the mesh builder
    pub lod: u32,
    /// Distance from the viewer up to which this band applies
    pub visible_distance_threshold: f32,
}

impl LodInfo {
    pub fn new(lod: u32, visible_distance_threshold: f32) -> Self {
        Self { lod, visible_distance_threshold }
    }
}

/// Ascending table of LOD bands
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LodInfo>", into = "Vec<LodInfo>")]
pub struct LodTable {
    levels: Vec<LodInfo>,
}

impl LodTable {
    /// Create a table, rejecting empty or non-ascending input
    pub fn new(levels: Vec<LodInfo>) -> Result<Self> {
        if levels.is_empty() {
            return Err(Error::Config("LOD table must have at least one entry".into()));
        }
        for (i, level) in levels.iter().enumerate() {
            let t = level.visible_distance_threshold;
            if !t.is_finite() || t < 0.0 {
                return Err(Error::Config(format!(
                    "LOD entry {} has invalid distance threshold {}",
                    i, t
                )));
            }
            if i > 0 && t < levels[i - 1].visible_distance_threshold {
                return Err(Error::Config(format!(
                    "LOD thresholds must be ascending: entry {} ({}) < entry {} ({})",
                    i,
                    t,
                    i - 1,
                    levels[i - 1].visible_distance_threshold
                )));
            }
        }
        Ok(Self { levels })
    }

    /// Check every LOD level against a chunk side length
    pub fn validate_for_chunk_size(&self, chunk_size: usize) -> Result<()> {
        for level in &self.levels {
            validate_lod(chunk_size, level.lod)?;
        }
        Ok(())
    }

    pub fn levels(&self) -> &[LodInfo] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Farthest distance at which anything is visible
    pub fn max_view_distance(&self) -> f32 {
        self.levels.last().map_or(0.0, |l| l.visible_distance_threshold)
    }

    /// Select the LOD index for a squared viewer distance.
    ///
    /// Returns `None` beyond the maximum view distance. Otherwise returns
    /// the number of leading thresholds (excluding the last entry) that the
    /// distance strictly exceeds.
    ///
    /// # Examples
    /// ```
    /// use terrastream::streaming::lod::{LodInfo, LodTable};
    ///
    /// let table = LodTable::new(vec![
    ///     LodInfo::new(0, 100.0),
    ///     LodInfo::new(1, 200.0),
    ///     LodInfo::new(2, 400.0),
    /// ]).unwrap();
    /// assert_eq!(table.select(0.0), Some(0));
    /// assert_eq!(table.select(150.0 * 150.0), Some(1));
    /// assert_eq!(table.select(500.0 * 500.0), None);
    /// ```
    pub fn select(&self, sqr_distance: f32) -> Option<usize> {
        let max = self.max_view_distance();
        if sqr_distance > max * max {
            return None;
        }

        let mut index = 0;
        for level in &self.levels[..self.levels.len() - 1] {
            let t = level.visible_distance_threshold;
            if sqr_distance > t * t {
                index += 1;
            } else {
                break;
            }
        }
        Some(index)
    }
}

impl Default for LodTable {
    fn default() -> Self {
        Self {
            levels: vec![
                LodInfo::new(0, 200.0),
                LodInfo::new(1, 400.0),
                LodInfo::new(4, 600.0),
            ],
        }
    }
}

impl TryFrom<Vec<LodInfo>> for LodTable {
    type Error = Error;

    fn try_from(levels: Vec<LodInfo>) -> Result<Self> {
        Self::new(levels)
    }
}

impl From<LodTable> for Vec<LodInfo> {
    fn from(table: LodTable) -> Self {
        table.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_table() -> LodTable {
        LodTable::new(vec![
            LodInfo::new(0, 100.0),
            LodInfo::new(1, 200.0),
            LodInfo::new(2, 400.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_scenario_150_selects_lod_1() {
        assert_eq!(scenario_table().select(150.0 * 150.0), Some(1));
    }

    #[test]
    fn test_select_boundaries() {
        let table = scenario_table();
        assert_eq!(table.select(0.0), Some(0));
        assert_eq!(table.select(100.0 * 100.0), Some(0));
        assert_eq!(table.select(100.5 * 100.5), Some(1));
        assert_eq!(table.select(200.0 * 200.0), Some(1));
        assert_eq!(table.select(300.0 * 300.0), Some(2));
        assert_eq!(table.select(400.0 * 400.0), Some(2));
        assert_eq!(table.select(400.5 * 400.5), None);
    }

    #[test]
    fn test_select_monotonic() {
        let table = scenario_table();
        let mut prev = 0;
        for d in 0..=400 {
            let d = d as f32;
            let idx = table.select(d * d).unwrap();
            assert!(idx >= prev, "LOD index decreased at distance {}", d);
            prev = idx;
        }
        assert_eq!(prev, table.len() - 1);
    }

    #[test]
    fn test_max_view_distance() {
        assert_eq!(scenario_table().max_view_distance(), 400.0);
        assert_eq!(LodTable::default().max_view_distance(), 600.0);
    }

    #[test]
    fn test_single_entry() {
        let table = LodTable::new(vec![LodInfo::new(3, 50.0)]).unwrap();
        assert_eq!(table.select(49.0 * 49.0), Some(0));
        assert_eq!(table.select(51.0 * 51.0), None);
    }

    #[test]
    fn test_rejects_invalid_tables() {
        assert!(LodTable::new(Vec::new()).is_err());
        assert!(LodTable::new(vec![LodInfo::new(0, 200.0), LodInfo::new(1, 100.0)]).is_err());
        assert!(LodTable::new(vec![LodInfo::new(0, f32::NAN)]).is_err());
    }

    #[test]
    fn test_validate_for_chunk_size() {
        let table = LodTable::new(vec![LodInfo::new(0, 10.0), LodInfo::new(6, 20.0)]).unwrap();
        assert!(table.validate_for_chunk_size(241).is_ok());
        assert!(table.validate_for_chunk_size(101).is_err());
    }

    #[test]
    fn test_serde_rejects_descending() {
        let ok: std::result::Result<LodTable, _> = serde_json::from_str(
            r#"[{"lod":0,"visible_distance_threshold":10},{"lod":1,"visible_distance_threshold":20}]"#,
        );
        assert!(ok.is_ok());
        let bad: std::result::Result<LodTable, _> = serde_json::from_str(
            r#"[{"lod":0,"visible_distance_threshold":20},{"lod":1,"visible_distance_threshold":10}]"#,
        );
        assert!(bad.is_err());
    }
}
