use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};

/// Raw upstream tables the pipeline depends on. Play-by-play, participation
/// and weekly player stats are published per season; schedules as one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    PlayByPlay,
    Participation,
    Schedules,
    PlayerStats,
}

impl Dataset {
    pub fn as_str(self) -> &'static str {
        match self {
            Dataset::PlayByPlay => "pbp",
            Dataset::Participation => "participation",
            Dataset::Schedules => "schedules",
            Dataset::PlayerStats => "player_stats",
        }
    }

    pub fn season_keyed(self) -> bool {
        !matches!(self, Dataset::Schedules)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn open_parquet(path: &Path) -> Result<SerializedFileReader<fs::File>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    SerializedFileReader::new(file).with_context(|| format!("parquet reader {}", path.display()))
}

/// Fail fast when an upstream schema change removed a column we depend on,
/// naming the column rather than letting nulls leak into derivation.
pub fn require_columns(
    reader: &SerializedFileReader<fs::File>,
    dataset: Dataset,
    required: &[&str],
) -> Result<()> {
    let present: HashSet<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    for name in required {
        if !present.contains(*name) {
            return Err(anyhow!(
                "dataset {dataset} is missing expected column '{name}' (upstream schema change?)"
            ));
        }
    }
    Ok(())
}

/// By-name view over one parquet row. Upstream tables are wide (play-by-play
/// has ~370 columns) and column order is not stable across releases, so
/// positional access is off the table.
pub struct RowFields<'a> {
    map: HashMap<&'a str, &'a Field>,
}

impl<'a> RowFields<'a> {
    pub fn new(row: &'a Row) -> Self {
        let mut map = HashMap::new();
        for (name, field) in row.get_column_iter() {
            map.insert(name.as_str(), field);
        }
        Self { map }
    }

    pub fn str(&self, name: &str) -> Option<&'a str> {
        match self.map.get(name)? {
            Field::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        as_f64_any(self.map.get(name)?)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        as_i64_any(self.map.get(name)?)
    }

    pub fn i32(&self, name: &str) -> Option<i32> {
        i32::try_from(self.i64(name)?).ok()
    }

    /// Numeric flag columns come through as 0/1 in several widths.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.map.get(name)? {
            Field::Bool(b) => Some(*b),
            other => as_i64_any(other).map(|v| v != 0),
        }
    }
}

fn as_f64_any(field: &Field) -> Option<f64> {
    match field {
        Field::Double(v) => Some(*v),
        Field::Float(v) => Some(*v as f64),
        Field::Int(v) => Some(*v as f64),
        Field::Long(v) => Some(*v as f64),
        Field::Short(v) => Some(*v as f64),
        Field::Byte(v) => Some(*v as f64),
        Field::UInt(v) => Some(*v as f64),
        Field::ULong(v) => Some(*v as f64),
        Field::UShort(v) => Some(*v as f64),
        Field::UByte(v) => Some(*v as f64),
        Field::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn as_i64_any(field: &Field) -> Option<i64> {
    match field {
        Field::Long(v) => Some(*v),
        Field::Int(v) => Some(*v as i64),
        Field::Short(v) => Some(*v as i64),
        Field::Byte(v) => Some(*v as i64),
        Field::UInt(v) => Some(*v as i64),
        Field::ULong(v) => i64::try_from(*v).ok(),
        Field::UShort(v) => Some(*v as i64),
        Field::UByte(v) => Some(*v as i64),
        // play_id and friends arrive as doubles in the nflfastR parquet
        Field::Double(v) if v.is_finite() => Some(*v as i64),
        Field::Float(v) if v.is_finite() => Some(*v as i64),
        Field::Bool(v) => Some(if *v { 1 } else { 0 }),
        _ => None,
    }
}
