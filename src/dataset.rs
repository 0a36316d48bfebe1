use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::positions::PositionGroup;

static NULL: Value = Value::Null;
const FOOT_COLUMN: &str = "Foot";

/// One cell of a player row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Null,
}

impl Value {
    /// Non-finite numbers are stored as missing.
    pub fn number(v: f64) -> Self {
        if v.is_finite() { Value::Number(v) } else { Value::Null }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::number(v)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map(Value::number).unwrap_or(Value::Null)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Composite identity of a player row. `team`/`season` narrow the match
/// when the same name appears more than once in a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerKey {
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
}

impl PlayerKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team: None,
            season: None,
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn matches(&self, record: &PlayerRecord) -> bool {
        if record.name != self.name {
            return false;
        }
        if let Some(team) = self.team.as_deref() {
            if record.team.as_deref() != Some(team) {
                return false;
            }
        }
        if let Some(season) = self.season.as_deref() {
            if record.season.as_deref() != Some(season) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        match (self.team.as_deref(), self.season.as_deref()) {
            (Some(team), Some(season)) => write!(f, " ({team}, {season})"),
            (Some(team), None) => write!(f, " ({team})"),
            (None, Some(season)) => write!(f, " ({season})"),
            (None, None) => Ok(()),
        }
    }
}

/// A player-season-team row. Metric columns vary between source files,
/// so values are keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            team: None,
            season: None,
            position: None,
            values: BTreeMap::new(),
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Absent columns read as `Value::Null`.
    pub fn value(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }

    pub fn key(&self) -> PlayerKey {
        PlayerKey {
            name: self.name.clone(),
            team: self.team.clone(),
            season: self.season.clone(),
        }
    }
}

/// Sidebar-style narrowing of a dataset. Empty lists keep everything.
#[derive(Debug, Clone, Default)]
pub struct DatasetFilter {
    pub seasons: Vec<String>,
    pub teams: Vec<String>,
    pub positions: Vec<PositionGroup>,
    /// Inclusive `(column, min, max)` bounds; a null or absent value fails.
    pub ranges: Vec<(String, f64, f64)>,
    /// Compared case-insensitively with the `Foot` column.
    pub foot: Option<String>,
}

impl DatasetFilter {
    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
            && self.teams.is_empty()
            && self.positions.is_empty()
            && self.ranges.is_empty()
            && self.foot.is_none()
    }

    fn keeps(&self, record: &PlayerRecord) -> bool {
        if !self.seasons.is_empty()
            && !record
                .season
                .as_ref()
                .is_some_and(|s| self.seasons.iter().any(|want| want == s))
        {
            return false;
        }
        if !self.teams.is_empty()
            && !record
                .team
                .as_ref()
                .is_some_and(|t| self.teams.iter().any(|want| want == t))
        {
            return false;
        }
        if !self.positions.is_empty() {
            let Some(position) = record.position.as_deref() else {
                return false;
            };
            if !self.positions.iter().any(|g| g.matches(position)) {
                return false;
            }
        }
        for (column, min, max) in &self.ranges {
            let in_range = record
                .value(column)
                .as_f64()
                .is_some_and(|v| v.is_finite() && *min <= v && v <= *max);
            if !in_range {
                return false;
            }
        }
        if let Some(foot) = self.foot.as_deref() {
            let matches = record
                .value(FOOT_COLUMN)
                .as_text()
                .is_some_and(|f| f.trim().eq_ignore_ascii_case(foot.trim()));
            if !matches {
                return false;
            }
        }
        true
    }
}

/// Read-only snapshot of player rows with a shared column list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<PlayerRecord>,
}

impl Dataset {
    /// Columns are collected from the records in first-seen order.
    pub fn from_records(records: Vec<PlayerRecord>) -> Self {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut columns = Vec::new();
        for record in &records {
            for column in record.values.keys() {
                if seen.insert(column.as_str()) {
                    columns.push(column.clone());
                }
            }
        }
        Self { columns, records }
    }

    /// Keeps the caller's column order (e.g. a file header). Columns only
    /// present on records are appended.
    pub fn with_columns(columns: Vec<String>, records: Vec<PlayerRecord>) -> Self {
        let mut seen: HashSet<String> = HashSet::with_capacity(columns.len());
        let mut deduped = Vec::with_capacity(columns.len());
        for column in columns {
            if seen.insert(column.clone()) {
                deduped.push(column);
            } else {
                warn!(column = %column, "duplicate column; keeping the last cell");
            }
        }
        let mut columns = deduped;
        for record in &records {
            for column in record.values.keys() {
                if seen.insert(column.clone()) {
                    columns.push(column.clone());
                }
            }
        }
        Self { columns, records }
    }

    /// Appends every part in order; the column list is the ordered union.
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Dataset>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();
        for part in parts {
            for column in part.columns {
                if seen.insert(column.clone()) {
                    columns.push(column);
                }
            }
            records.extend(part.records);
        }
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[PlayerRecord] {
        &self.records
    }

    pub fn record(&self, idx: usize) -> Option<&PlayerRecord> {
        self.records.get(idx)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Resolves a key to exactly one record index.
    pub fn resolve(&self, key: &PlayerKey) -> EngineResult<usize> {
        let mut found: Option<usize> = None;
        let mut matches = 0usize;
        for (idx, record) in self.records.iter().enumerate() {
            if key.matches(record) {
                matches += 1;
                found.get_or_insert(idx);
            }
        }
        match (found, matches) {
            (Some(idx), 1) => Ok(idx),
            (None, _) => Err(EngineError::ReferenceNotFound {
                player: key.to_string(),
            }),
            (Some(_), n) => Err(EngineError::AmbiguousPlayer {
                player: key.to_string(),
                matches: n,
            }),
        }
    }

    /// Schema-checked access to a metric: one entry per record, `None`
    /// where the record has no value.
    pub fn numeric_column(&self, column: &str) -> EngineResult<Vec<Option<f64>>> {
        if !self.has_column(column) {
            return Err(EngineError::UnknownColumn {
                column: column.to_string(),
            });
        }
        let mut out = Vec::with_capacity(self.records.len());
        for record in &self.records {
            match record.value(column) {
                Value::Number(v) if v.is_finite() => out.push(Some(*v)),
                Value::Number(_) | Value::Null => out.push(None),
                Value::Text(_) => {
                    return Err(EngineError::NonNumericColumn {
                        column: column.to_string(),
                    });
                }
            }
        }
        Ok(out)
    }

    /// Columns with at least one number and no text values.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| {
                let mut any_number = false;
                for record in &self.records {
                    match record.value(column) {
                        Value::Number(v) if v.is_finite() => any_number = true,
                        Value::Text(_) => return false,
                        Value::Number(_) | Value::Null => {}
                    }
                }
                any_number
            })
            .cloned()
            .collect()
    }

    pub fn filter(&self, filter: &DatasetFilter) -> Dataset {
        if filter.is_empty() {
            return self.clone();
        }
        let records = self
            .records
            .iter()
            .filter(|r| filter.keeps(r))
            .cloned()
            .collect();
        Dataset {
            columns: self.columns.clone(),
            records,
        }
    }

    pub fn distinct_teams(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.records.iter().filter_map(|r| r.team.as_deref()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    pub fn distinct_seasons(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .records
            .iter()
            .filter_map(|r| r.season.as_deref())
            .collect();
        set.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            PlayerRecord::new("Ana")
                .with_team("Lima")
                .with_season("2024")
                .with_position("CF, LWF")
                .with_value("Goals", 10.0),
            PlayerRecord::new("Ana")
                .with_team("Cusco")
                .with_season("2023")
                .with_position("AMF")
                .with_value("Goals", 4.0),
            PlayerRecord::new("Bea")
                .with_team("Lima")
                .with_season("2024")
                .with_position("GK")
                .with_value("Goals", Value::Null)
                .with_value("Foot", "left"),
        ])
    }

    #[test]
    fn resolve_requires_a_single_match() {
        let ds = sample();
        assert!(matches!(
            ds.resolve(&PlayerKey::new("Ana")),
            Err(EngineError::AmbiguousPlayer { matches: 2, .. })
        ));
        assert_eq!(ds.resolve(&PlayerKey::new("Ana").with_season("2023")), Ok(1));
        assert!(matches!(
            ds.resolve(&PlayerKey::new("Zoe")),
            Err(EngineError::ReferenceNotFound { .. })
        ));
    }

    #[test]
    fn numeric_column_distinguishes_missing_and_text() {
        let ds = sample();
        assert_eq!(ds.numeric_column("Goals"), Ok(vec![Some(10.0), Some(4.0), None]));
        assert!(matches!(
            ds.numeric_column("Foot"),
            Err(EngineError::NonNumericColumn { .. })
        ));
        assert!(matches!(
            ds.numeric_column("Assists"),
            Err(EngineError::UnknownColumn { .. })
        ));
        assert_eq!(ds.numeric_columns(), vec!["Goals".to_string()]);
    }

    #[test]
    fn filter_by_position_and_team() {
        let ds = sample();
        let only_strikers = ds.filter(&DatasetFilter {
            positions: vec![PositionGroup::Striker],
            ..Default::default()
        });
        assert_eq!(only_strikers.len(), 1);
        let lima = ds.filter(&DatasetFilter {
            teams: vec!["Lima".to_string()],
            seasons: vec!["2024".to_string()],
            ..Default::default()
        });
        assert_eq!(lima.len(), 2);
        assert_eq!(ds.distinct_teams(), vec!["Cusco".to_string(), "Lima".to_string()]);
    }

    #[test]
    fn filter_by_numeric_range_and_foot() {
        let ds = Dataset::from_records(vec![
            PlayerRecord::new("Ana")
                .with_value("Age", 22.0)
                .with_value("Minutes played", 1800.0)
                .with_value("Foot", "right"),
            PlayerRecord::new("Bea")
                .with_value("Age", 31.0)
                .with_value("Minutes played", 2400.0)
                .with_value("Foot", "left"),
            PlayerRecord::new("Cris")
                .with_value("Age", Value::Null)
                .with_value("Minutes played", 900.0)
                .with_value("Foot", "Right"),
        ]);

        let young = ds.filter(&DatasetFilter {
            ranges: vec![("Age".to_string(), 20.0, 30.0)],
            ..Default::default()
        });
        assert_eq!(young.len(), 1);
        assert_eq!(young.records()[0].name, "Ana");

        // Bounds are inclusive.
        let minutes = ds.filter(&DatasetFilter {
            ranges: vec![("Minutes played".to_string(), 900.0, 1800.0)],
            ..Default::default()
        });
        assert_eq!(minutes.len(), 2);

        let missing_column = ds.filter(&DatasetFilter {
            ranges: vec![("Matches played".to_string(), 0.0, 100.0)],
            ..Default::default()
        });
        assert!(missing_column.is_empty());

        let right = ds.filter(&DatasetFilter {
            foot: Some("right".to_string()),
            ..Default::default()
        });
        let names: Vec<&str> = right.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Cris"]);

        let both = ds.filter(&DatasetFilter {
            ranges: vec![("Minutes played".to_string(), 0.0, 5000.0)],
            foot: Some("left".to_string()),
            ..Default::default()
        });
        assert_eq!(both.len(), 1);
        assert_eq!(both.records()[0].name, "Bea");
    }

    #[test]
    fn non_finite_numbers_read_as_missing() {
        let ds = Dataset::from_records(vec![
            PlayerRecord::new("A").with_value("G", 10.0),
            PlayerRecord {
                values: [("G".to_string(), Value::Number(f64::NAN))].into_iter().collect(),
                ..PlayerRecord::new("B")
            },
            PlayerRecord {
                values: [("G".to_string(), Value::Number(f64::INFINITY))].into_iter().collect(),
                ..PlayerRecord::new("C")
            },
        ]);
        assert_eq!(ds.numeric_column("G"), Ok(vec![Some(10.0), None, None]));
        assert_eq!(ds.numeric_columns(), vec!["G".to_string()]);
    }

    #[test]
    fn repeated_header_columns_are_collapsed() {
        let ds = Dataset::with_columns(
            vec!["Goals".into(), "Assists".into(), "Goals".into()],
            vec![PlayerRecord::new("A").with_value("Goals", 2.0).with_value("Assists", 1.0)],
        );
        assert_eq!(ds.columns(), &["Goals".to_string(), "Assists".to_string()]);
        assert_eq!(ds.numeric_columns(), vec!["Goals".to_string(), "Assists".to_string()]);
    }

    #[test]
    fn concat_unions_columns_in_order() {
        let a = Dataset::with_columns(
            vec!["Goals".into()],
            vec![PlayerRecord::new("A").with_value("Goals", 1.0)],
        );
        let b = Dataset::with_columns(
            vec!["Assists".into(), "Goals".into()],
            vec![PlayerRecord::new("B").with_value("Assists", 2.0)],
        );
        let ds = Dataset::concat([a, b]);
        assert_eq!(ds.columns(), &["Goals".to_string(), "Assists".to_string()]);
        assert_eq!(ds.numeric_column("Assists"), Ok(vec![None, Some(2.0)]));
    }
}
