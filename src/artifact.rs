//! Versioned JSON artifacts with atomic writes.
//!
//! Feature values travel as `Option<f64>` because serde_json writes NaN
//! as null and cannot read null back into a bare f64; the sentinel is
//! restored on load.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::features::{FeatureConfig, FeatureFrame, FeatureRow};

pub const FEATURE_ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRow {
    pub game_id: String,
    pub play_id: i64,
    pub season: i32,
    pub week: i32,
    pub posteam: String,
    pub is_pass: bool,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryState {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureArtifact {
    pub version: u32,
    pub generated_at: String,
    pub categories: Vec<CategoryState>,
    pub feature_names: Vec<String>,
    pub rows: Vec<ArtifactRow>,
}

impl FeatureArtifact {
    pub fn from_frame(frame: &FeatureFrame, config: &FeatureConfig) -> Self {
        let categories = config
            .category_summary()
            .into_iter()
            .map(|(name, enabled, note)| CategoryState {
                name,
                enabled,
                note: note.map(str::to_string),
            })
            .collect();
        let rows = frame
            .rows
            .iter()
            .map(|row| ArtifactRow {
                game_id: row.game_id.clone(),
                play_id: row.play_id,
                season: row.season,
                week: row.week,
                posteam: row.posteam.clone(),
                is_pass: row.is_pass,
                values: row
                    .values
                    .iter()
                    .map(|v| if v.is_finite() { Some(*v) } else { None })
                    .collect(),
            })
            .collect();
        Self {
            version: FEATURE_ARTIFACT_VERSION,
            generated_at: Utc::now().to_rfc3339(),
            categories,
            feature_names: frame.feature_names.clone(),
            rows,
        }
    }

    pub fn into_frame(self) -> Result<FeatureFrame> {
        if self.version != FEATURE_ARTIFACT_VERSION {
            return Err(anyhow!(
                "feature artifact version {} unsupported (expected {})",
                self.version,
                FEATURE_ARTIFACT_VERSION
            ));
        }
        let width = self.feature_names.len();
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in self.rows {
            if row.values.len() != width {
                return Err(anyhow!(
                    "artifact row {}:{} has {} values, expected {}",
                    row.game_id,
                    row.play_id,
                    row.values.len(),
                    width
                ));
            }
            rows.push(FeatureRow {
                game_id: row.game_id,
                play_id: row.play_id,
                season: row.season,
                week: row.week,
                posteam: row.posteam,
                is_pass: row.is_pass,
                values: row
                    .values
                    .into_iter()
                    .map(|v| v.unwrap_or(f64::NAN))
                    .collect(),
            });
        }
        Ok(FeatureFrame {
            feature_names: self.feature_names,
            rows,
        })
    }
}

/// Write through a sibling tmp file and rename, so readers never see a
/// half-written artifact.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value).context("serialize artifact")?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

pub fn write_text_atomic(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, text).with_context(|| format!("write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FeatureFrame {
        FeatureFrame {
            feature_names: vec!["a".to_string(), "b".to_string()],
            rows: vec![FeatureRow {
                game_id: "g".to_string(),
                play_id: 10,
                season: 2023,
                week: 2,
                posteam: "KC".to_string(),
                is_pass: true,
                values: vec![0.5, f64::NAN],
            }],
        }
    }

    #[test]
    fn nan_round_trips_through_json() {
        let artifact = FeatureArtifact::from_frame(&frame(), &FeatureConfig::default());
        let json = serde_json::to_string(&artifact).unwrap();
        let parsed: FeatureArtifact = serde_json::from_str(&json).unwrap();
        let restored = parsed.into_frame().unwrap();
        assert_eq!(restored.rows[0].values[0], 0.5);
        assert!(restored.rows[0].values[1].is_nan());
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut artifact = FeatureArtifact::from_frame(&frame(), &FeatureConfig::default());
        artifact.version = 99;
        assert!(artifact.into_frame().is_err());
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let mut artifact = FeatureArtifact::from_frame(&frame(), &FeatureConfig::default());
        artifact.rows[0].values.pop();
        assert!(artifact.into_frame().is_err());
    }

    #[test]
    fn atomic_write_round_trip() {
        let dir = std::env::temp_dir().join("gridiron_dc_artifact_test");
        let path = dir.join("features.json");
        let artifact = FeatureArtifact::from_frame(&frame(), &FeatureConfig::default());
        write_json_atomic(&path, &artifact).unwrap();
        let loaded: FeatureArtifact = read_json(&path).unwrap();
        assert_eq!(loaded.feature_names, artifact.feature_names);
        std::fs::remove_dir_all(&dir).ok();
    }
}
