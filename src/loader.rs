use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dataset::{Dataset, PlayerRecord, Value};
use crate::http_cache;
use crate::http_client::http_client;

const DOWNLOAD_ATTEMPTS: u32 = 3;
const PROBE_TIMEOUT_SECS: u64 = 3;

const KNOWN_LEAGUES: &[&str] = &[
    "Argentina Copa de la Liga",
    "Argentina Primera Nacional",
    "Argentina LPF",
    "Bolivian LFPB",
    "Brasileirao",
    "Brazil Serie B",
    "Brazil Serie C",
    "Canadian Premier League",
    "Chilean Primera B",
    "Chilean Primera Division",
    "Colombian Primera A",
    "Colombian Torneo BetPlay",
    "Ecuador Liga Pro",
    "J1",
    "K League 1",
    "MLS",
    "MLS Next Pro",
    "Panama LPF",
    "Paraguay Division Profesional",
    "Peruvian Liga 1",
    "USL Championship",
    "USL League 1",
    "Uruguay Primera Division",
    "Premier League",
    "La Liga",
    "Bundesliga",
    "Serie A",
    "Ligue 1",
];

// Only published for split (e.g. "23-24") seasons.
const SPLIT_SEASON_LEAGUES: &[&str] = &[
    "Belgian Pro League",
    "Championship",
    "Costa Rican Primera Division",
    "El Salvador Primera Division",
    "English National League",
    "Eredivisie",
    "French National 1",
    "Greek Super League",
    "Guatemalan Liga Nacional",
    "Honduran Liga Nacional",
    "La Liga 2",
    "League One",
    "League Two",
    "Liga MX",
    "Liga de Expansion MX",
    "Ligue 2",
    "Nicaragua Primera Division",
    "Portuguese Segunda Liga",
    "Primavera 1",
    "Primeira Liga",
    "Russian First League",
    "Russian Premier League",
    "Saudi Pro League",
    "Scottish Championship",
    "Serie B",
    "Serie C",
    "Super Lig",
    "Superliga",
    "Swiss Challenge League",
    "Swiss Super League",
    "UAE Pro League",
];

/// Which source columns carry the record identity. Every other column
/// becomes a metric value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub name: String,
    pub team: String,
    pub season: String,
    pub position: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            team: "Team".to_string(),
            season: "Season".to_string(),
            position: "Position".to_string(),
        }
    }
}

impl ColumnRoles {
    fn is_identity(&self, column: &str) -> bool {
        column == self.name || column == self.team || column == self.season || column == self.position
    }
}

#[derive(Debug, Clone)]
pub struct SeasonLoad {
    pub season: String,
    pub dataset: Dataset,
    pub loaded: Vec<String>,
    pub errors: Vec<String>,
}

/// Empty, `-` and NaN cells are missing; anything that parses as a float
/// is a number; the rest is text.
pub fn parse_cell(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() || s == "-" || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    match s.parse::<f64>() {
        Ok(v) => Value::number(v),
        Err(_) => Value::Text(s.to_string()),
    }
}

struct RowBuilder<'a> {
    roles: &'a ColumnRoles,
    season_hint: Option<&'a str>,
    name: Option<String>,
    team: Option<String>,
    season: Option<String>,
    position: Option<String>,
    values: BTreeMap<String, Value>,
}

impl<'a> RowBuilder<'a> {
    fn new(roles: &'a ColumnRoles, season_hint: Option<&'a str>) -> Self {
        Self {
            roles,
            season_hint,
            name: None,
            team: None,
            season: None,
            position: None,
            values: BTreeMap::new(),
        }
    }

    fn push_text(&mut self, column: &str, text: Option<String>) {
        let text = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        if column == self.roles.name {
            self.name = text;
        } else if column == self.roles.team {
            self.team = text;
        } else if column == self.roles.season {
            self.season = text;
        } else if column == self.roles.position {
            self.position = text;
        }
    }

    fn push_value(&mut self, column: &str, value: Value) {
        self.values.insert(column.to_string(), value);
    }

    fn finish(self) -> Option<PlayerRecord> {
        let name = self.name?;
        Some(PlayerRecord {
            name,
            team: self.team,
            season: self.season.or_else(|| self.season_hint.map(str::to_string)),
            position: self.position,
            values: self.values,
        })
    }
}

pub fn parse_csv<R: Read>(reader: R, roles: &ColumnRoles, season_hint: Option<&str>) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("read csv header")?.clone();
    if !headers.iter().any(|h| h.trim() == roles.name) {
        return Err(anyhow!("missing player name column `{}`", roles.name));
    }
    let header_names: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
    let columns: Vec<String> = header_names
        .iter()
        .filter(|h| !roles.is_identity(h))
        .cloned()
        .collect();

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (line, row) in rdr.records().enumerate() {
        let row = row.with_context(|| format!("read csv row {}", line + 2))?;
        let mut builder = RowBuilder::new(roles, season_hint);
        for (column, cell) in header_names.iter().zip(row.iter()) {
            if roles.is_identity(column) {
                builder.push_text(column, Some(cell.to_string()));
            } else {
                builder.push_value(column, parse_cell(cell));
            }
        }
        match builder.finish() {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "csv rows without player name");
    }
    Ok(Dataset::with_columns(columns, records))
}

pub fn read_csv(path: &Path, roles: &ColumnRoles, season_hint: Option<&str>) -> Result<Dataset> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    parse_csv(file, roles, season_hint).with_context(|| format!("parse {}", path.display()))
}

pub fn read_parquet(path: &Path, roles: &ColumnRoles, season_hint: Option<&str>) -> Result<Dataset> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file).context("open parquet reader")?;
    let columns: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .filter(|name| !roles.is_identity(name))
        .collect();

    let iter = reader.get_row_iter(None).context("iterate parquet rows")?;
    let mut records = Vec::new();
    let mut bad_rows = 0usize;
    for row in iter {
        let Ok(row) = row else {
            bad_rows += 1;
            continue;
        };
        let mut builder = RowBuilder::new(roles, season_hint);
        for (column, field) in row.get_column_iter() {
            if roles.is_identity(column) {
                builder.push_text(column, field_text(field));
            } else {
                builder.push_value(column, field_value(field));
            }
        }
        if let Some(record) = builder.finish() {
            records.push(record);
        }
    }
    if bad_rows > 0 {
        warn!(bad_rows, path = %path.display(), "unreadable parquet rows");
    }
    Ok(Dataset::with_columns(columns, records))
}

fn field_value(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Byte(v) => Value::number(*v as f64),
        Field::Short(v) => Value::number(*v as f64),
        Field::Int(v) => Value::number(*v as f64),
        Field::Long(v) => Value::number(*v as f64),
        Field::UByte(v) => Value::number(*v as f64),
        Field::UShort(v) => Value::number(*v as f64),
        Field::UInt(v) => Value::number(*v as f64),
        Field::ULong(v) => Value::number(*v as f64),
        Field::Float(v) => Value::number(*v as f64),
        Field::Double(v) => Value::number(*v),
        Field::Str(s) => {
            let s = s.trim();
            if s.is_empty() { Value::Null } else { Value::Text(s.to_string()) }
        }
        other => Value::Text(other.to_string()),
    }
}

fn field_text(field: &Field) -> Option<String> {
    match field {
        Field::Null => None,
        Field::Str(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// First `dddd` or `dd-dd` token in a file name, e.g. `"MLS 2024.parquet"`
/// gives `"2024"` and `"Serie A 23-24.csv"` gives `"23-24"`.
pub fn season_from_file_name(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let digit_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);
    for start in 0..bytes.len() {
        if !digit_at(start) || (start > 0 && digit_at(start - 1)) {
            continue;
        }
        if digit_at(start + 1)
            && bytes.get(start + 2) == Some(&b'-')
            && digit_at(start + 3)
            && digit_at(start + 4)
            && !digit_at(start + 5)
        {
            return Some(name[start..start + 5].to_string());
        }
        if (start..start + 4).all(digit_at) && !digit_at(start + 4) {
            return Some(name[start..start + 4].to_string());
        }
    }
    None
}

enum FileFormat {
    Csv,
    Parquet,
}

fn detect_format(path: &Path) -> Result<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => Ok(FileFormat::Csv),
        "parquet" | "pq" => Ok(FileFormat::Parquet),
        other => Err(anyhow!("unsupported data file extension `{other}` ({})", path.display())),
    }
}

fn read_any(path: &Path, roles: &ColumnRoles, season_hint: Option<&str>) -> Result<Dataset> {
    match detect_format(path)? {
        FileFormat::Csv => read_csv(path, roles, season_hint),
        FileFormat::Parquet => read_parquet(path, roles, season_hint),
    }
}

/// Reads each local CSV/Parquet file and concatenates them in order.
pub fn load_files(paths: &[PathBuf], roles: &ColumnRoles) -> Result<Dataset> {
    if paths.is_empty() {
        return Err(anyhow!("no data files given"));
    }
    let mut parts = Vec::with_capacity(paths.len());
    for path in paths {
        let hint = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(season_from_file_name);
        let part = read_any(path, roles, hint.as_deref())?;
        info!(path = %path.display(), rows = part.len(), "loaded data file");
        parts.push(part);
    }
    Ok(Dataset::concat(parts))
}

pub fn candidate_leagues(season: &str) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = KNOWN_LEAGUES.to_vec();
    if season.contains('-') {
        out.extend_from_slice(SPLIT_SEASON_LEAGUES);
    }
    out
}

pub fn league_file_name(league: &str, season: &str) -> String {
    format!("{league} {season}.parquet")
}

pub fn league_file_url(base_url: &str, season: &str, file_name: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        season,
        file_name.replace(' ', "%20")
    )
}

/// Probes every known league file for `season` with HEAD requests and
/// returns the file names that exist, sorted. Falls back to an
/// `index.txt` listing in the season folder.
pub fn discover_leagues(config: &EngineConfig, season: &str) -> Result<Vec<String>> {
    let client = http_client()?;
    let candidates = candidate_leagues(season);
    let mut found: Vec<String> = with_fetch_pool(config.fetch_threads, || {
        candidates
            .par_iter()
            .filter_map(|league| {
                let file = league_file_name(league, season);
                let url = league_file_url(&config.data_base_url, season, &file);
                let resp = client
                    .head(&url)
                    .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
                    .send()
                    .ok()?;
                (resp.status() == reqwest::StatusCode::OK).then_some(file)
            })
            .collect()
    });

    if found.is_empty() {
        let url = format!("{}/{}/index.txt", config.data_base_url.trim_end_matches('/'), season);
        match client
            .get(&url)
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
        {
            Ok(body) => found = parquet_names_in_listing(&body),
            Err(err) => debug!(%err, url = %url, "no season index"),
        }
    }

    found.sort();
    found.dedup();
    info!(season, files = found.len(), "league discovery");
    Ok(found)
}

fn parquet_names_in_listing(body: &str) -> Vec<String> {
    body.split(|c: char| c == '/' || c == '\n' || c == '\r' || c == '"' || c == '\'')
        .map(str::trim)
        .filter(|s| s.ends_with(".parquet") && s.len() > ".parquet".len())
        .map(str::to_string)
        .collect()
}

/// Downloads (or reuses from cache) one league file and parses it.
pub fn fetch_league(config: &EngineConfig, season: &str, file_name: &str) -> Result<Dataset> {
    let url = league_file_url(&config.data_base_url, season, file_name);
    let dir = cache_dir(config);
    let cached = download_with_retry(&dir, &url, config.cache_ttl)?;
    let hint = season_from_file_name(file_name).unwrap_or_else(|| season.to_string());
    read_any(&cached, &config.columns, Some(&hint))
        .with_context(|| format!("parse league file {file_name}"))
}

/// Loads and concatenates every league file of a season. When `files` is
/// empty the files are discovered first. Per-file failures are collected.
pub fn load_season(config: &EngineConfig, season: &str, files: &[String]) -> Result<SeasonLoad> {
    let files: Vec<String> = if files.is_empty() {
        discover_leagues(config, season)?
    } else {
        files.to_vec()
    };
    if files.is_empty() {
        return Err(anyhow!("no league files found for season {season}"));
    }

    let fetched: Vec<(String, Result<Dataset>)> = with_fetch_pool(config.fetch_threads, || {
        files
            .par_iter()
            .map(|file| (file.clone(), fetch_league(config, season, file)))
            .collect()
    });

    let mut parts = Vec::new();
    let mut loaded = Vec::new();
    let mut errors = Vec::new();
    for (file, result) in fetched {
        match result {
            Ok(part) => {
                loaded.push(file);
                parts.push(part);
            }
            Err(err) => {
                warn!(file = %file, error = %format!("{err:#}"), "league file failed");
                errors.push(format!("{file}: {err:#}"));
            }
        }
    }

    Ok(SeasonLoad {
        season: season.to_string(),
        dataset: Dataset::concat(parts),
        loaded,
        errors,
    })
}

fn cache_dir(config: &EngineConfig) -> PathBuf {
    config
        .cache_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("scout_engine"))
}

fn download_with_retry(dir: &Path, url: &str, ttl: Duration) -> Result<PathBuf> {
    let client = http_client()?;
    let mut last_err: Option<anyhow::Error> = None;
    for attempt in 1..=DOWNLOAD_ATTEMPTS {
        match http_cache::fetch_cached(client, dir, url, ttl) {
            Ok(cached) => return Ok(cached.path),
            Err(err) => {
                debug!(url, attempt, error = %err, "download attempt failed");
                last_err = Some(err);
                if attempt < DOWNLOAD_ATTEMPTS {
                    let sleep_ms = 500_u64.saturating_mul(attempt as u64);
                    std::thread::sleep(Duration::from_millis(sleep_ms));
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("download failed for {url}")))
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads.max(1)).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_tokens() {
        assert_eq!(season_from_file_name("MLS 2024.parquet").as_deref(), Some("2024"));
        assert_eq!(season_from_file_name("Serie A 23-24.csv").as_deref(), Some("23-24"));
        assert_eq!(season_from_file_name("J1.parquet"), None);
        assert_eq!(season_from_file_name("id 123456.csv"), None);
    }

    #[test]
    fn cells_parse_to_typed_values() {
        assert_eq!(parse_cell(" 3.5 "), Value::Number(3.5));
        assert_eq!(parse_cell(""), Value::Null);
        assert_eq!(parse_cell("NaN"), Value::Null);
        assert_eq!(parse_cell("right"), Value::Text("right".into()));
    }

    #[test]
    fn urls_encode_spaces() {
        assert_eq!(
            league_file_url("https://x.org/data/", "2024", "Peruvian Liga 1 2024.parquet"),
            "https://x.org/data/2024/Peruvian%20Liga%201%202024.parquet"
        );
        assert_eq!(candidate_leagues("2024").len(), KNOWN_LEAGUES.len());
        assert!(candidate_leagues("23-24").contains(&"Eredivisie"));
    }

    #[test]
    fn listing_extracts_parquet_names() {
        let names = parquet_names_in_listing("MLS 2024.parquet\nJ1 2024.parquet\nREADME.md\n");
        assert_eq!(names, vec!["MLS 2024.parquet".to_string(), "J1 2024.parquet".to_string()]);
    }
}
