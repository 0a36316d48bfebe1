use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scout_engine::compare::{compare_players, comparison_matrix, radar_profile};
use scout_engine::config::EngineConfig;
use scout_engine::loader;
use scout_engine::percentile::percentile_table;
use scout_engine::positions::{MetricPreset, PositionGroup};
use scout_engine::profile::classify;
use scout_engine::report::PlayerReport;
use scout_engine::similarity::{SimilarityMetric, SimilarityOptions, rank_similar_with};
use scout_engine::{Dataset, DatasetFilter, PlayerKey};

const USAGE: &str = "usage: scout_engine <columns|percentiles|profile|similar|compare|report> \
(--data PATH.. | --remote-season S [--league FILE..]) [--player NAME [--team T] [--season S]] \
[--metrics a,b,c | --preset NAME] [--top N] [--rank-by cosine|euclidean] [--vs NAME..] \
[--filter-season S] [--filter-team T] [--position P] [--range COL=MIN..MAX] [--foot F] \
[--out FILE.xlsx|FILE.json]
--vs takes NAME, NAME@TEAM, NAME@SEASON or NAME@TEAM@SEASON";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Columns,
    Percentiles,
    Profile,
    Similar,
    Compare,
    Report,
}

#[derive(Debug, Default)]
struct Args {
    command: Option<Command>,
    data: Vec<PathBuf>,
    remote_season: Option<String>,
    leagues: Vec<String>,
    player: Option<String>,
    team: Option<String>,
    season: Option<String>,
    vs: Vec<PlayerKey>,
    metrics: Vec<String>,
    preset: Option<MetricPreset>,
    top: Option<usize>,
    rank_by: Option<SimilarityMetric>,
    filter: DatasetFilter,
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let args = parse_args(std::env::args().skip(1).collect())?;
    let Some(command) = args.command else {
        println!("{USAGE}");
        return Ok(());
    };
    let config = EngineConfig::from_env();

    let dataset = load_dataset(&config, &args)?.filter(&args.filter);
    info!(rows = dataset.len(), columns = dataset.columns().len(), "dataset ready");

    match command {
        Command::Columns => print_columns(&dataset),
        Command::Percentiles => {
            let player = player_key(&args)?;
            let metrics = resolve_metrics(&args, &dataset)?;
            let rows = percentile_table(&dataset, &player, &metrics)?;
            println!("Percentiles for {player}");
            for row in rows {
                println!(
                    "  {:<40} {:>10.2}  p{:>6.1}  {:?}",
                    row.metric, row.value, row.percentile, row.band
                );
            }
        }
        Command::Profile => {
            let player = player_key(&args)?;
            let metrics = resolve_metrics(&args, &dataset)?;
            let profile = classify(&dataset, &player, &metrics)?;
            println!(
                "{player}: mean percentile {:.1} ({})",
                profile.mean_percentile,
                profile.tier.label()
            );
            println!("Strengths:");
            for m in &profile.strengths {
                println!("  - {m}");
            }
            println!("Weaknesses:");
            for m in &profile.weaknesses {
                println!("  - {m}");
            }
            for s in &profile.skipped {
                println!("Skipped {}: {}", s.metric, s.reason);
            }
        }
        Command::Similar => {
            let player = player_key(&args)?;
            let metrics = resolve_metrics(&args, &dataset)?;
            let options = similarity_options(&config, &args);
            let rows = rank_similar_with(&dataset, &player, &metrics, &options)?;
            println!("Most similar to {player} ({:?})", options.metric);
            for (rank, row) in rows.iter().enumerate() {
                println!(
                    "  {:>2}. {:<40} score {:>7.3}  euclid {:>6.1}%",
                    rank + 1,
                    row.player.to_string(),
                    row.score,
                    row.euclidean_similarity
                );
            }
        }
        Command::Compare => {
            let player = player_key(&args)?;
            let metrics = resolve_metrics(&args, &dataset)?;
            if args.vs.is_empty() {
                bail!("compare needs at least one --vs player");
            }
            if let [other] = args.vs.as_slice() {
                let other = other.clone();
                let rows = compare_players(&dataset, &player, &other, &metrics)?;
                println!("{player} vs {other}");
                for row in &rows {
                    let pct = row
                        .difference_pct
                        .map(|p| format!("{p:+.1}%"))
                        .unwrap_or_else(|| "n/a".to_string());
                    println!(
                        "  {:<40} {:>10.2} {:>10.2} {:>+10.2} {:>9}",
                        row.metric, row.a, row.b, row.difference, pct
                    );
                }
                println!("Radar (scaled to pair maximum):");
                for point in radar_profile(&rows) {
                    println!("  {:<40} {:>5.2} {:>5.2}", point.metric, point.a, point.b);
                }
            } else {
                let mut players = vec![player];
                players.extend(args.vs.iter().cloned());
                let matrix = comparison_matrix(&dataset, &players, &metrics)?;
                let header: Vec<String> = matrix.players.iter().map(|p| p.name.clone()).collect();
                println!("{:<40} {}", "Metric", header.join(" | "));
                for row in &matrix.rows {
                    let cells: Vec<String> = row
                        .values
                        .iter()
                        .enumerate()
                        .map(|(col, v)| {
                            let cell = v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());
                            if row.best == Some(col) { format!("*{cell}") } else { cell }
                        })
                        .collect();
                    println!("{:<40} {}", row.metric, cells.join(" | "));
                }
            }
        }
        Command::Report => {
            let player = player_key(&args)?;
            let metrics = resolve_metrics(&args, &dataset)?;
            let options = similarity_options(&config, &args);
            let report = PlayerReport::build(&dataset, &player, &metrics, &metrics, &options)?;
            match args.out.as_ref() {
                Some(path) if has_extension(path, "xlsx") => {
                    report.write_xlsx(path)?;
                    println!("Report written to {}", path.display());
                }
                Some(path) => {
                    report.write_json(path)?;
                    println!("Report written to {}", path.display());
                }
                None => {
                    let json = serde_json::to_string_pretty(&report).context("serialize report")?;
                    println!("{json}");
                }
            }
        }
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_dataset(config: &EngineConfig, args: &Args) -> Result<Dataset> {
    if !args.data.is_empty() {
        return loader::load_files(&args.data, &config.columns);
    }
    let Some(season) = args.remote_season.as_deref() else {
        bail!("no data source: pass --data PATH or --remote-season S\n{USAGE}");
    };
    let load = loader::load_season(config, season, &args.leagues)?;
    for err in load.errors.iter().take(8) {
        eprintln!(" - {err}");
    }
    if load.dataset.is_empty() {
        bail!("season {season} produced no rows ({} files failed)", load.errors.len());
    }
    Ok(load.dataset)
}

fn print_columns(dataset: &Dataset) {
    println!("Rows: {}", dataset.len());
    println!("Seasons: {}", dataset.distinct_seasons().join(", "));
    println!("Teams: {}", dataset.distinct_teams().len());
    println!("Numeric columns:");
    for column in dataset.numeric_columns() {
        println!("  {column}");
    }
}

fn player_key(args: &Args) -> Result<PlayerKey> {
    let name = args.player.clone().context("missing --player")?;
    let mut key = PlayerKey::new(name);
    if let Some(team) = args.team.clone() {
        key = key.with_team(team);
    }
    if let Some(season) = args.season.clone() {
        key = key.with_season(season);
    }
    Ok(key)
}

fn resolve_metrics(args: &Args, dataset: &Dataset) -> Result<Vec<String>> {
    if !args.metrics.is_empty() {
        return Ok(args.metrics.clone());
    }
    if let Some(preset) = args.preset {
        let metrics = preset.available(dataset);
        if metrics.is_empty() {
            bail!("none of the {preset:?} preset metrics are in the dataset");
        }
        return Ok(metrics);
    }
    Err(anyhow!("pass --metrics a,b,c or --preset NAME"))
}

fn similarity_options(config: &EngineConfig, args: &Args) -> SimilarityOptions {
    SimilarityOptions {
        top_n: args.top.unwrap_or(config.default_top_n),
        metric: args.rank_by.unwrap_or_default(),
    }
}

fn has_extension(path: &std::path::Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn parse_command(raw: &str) -> Option<Command> {
    let command = match raw {
        "columns" => Command::Columns,
        "percentiles" => Command::Percentiles,
        "profile" => Command::Profile,
        "similar" => Command::Similar,
        "compare" => Command::Compare,
        "report" => Command::Report,
        _ => return None,
    };
    Some(command)
}

/// `NAME@X` reads `X` as a season when it looks like one (`2024`, `23-24`),
/// otherwise as a team. `NAME@TEAM@SEASON` sets both.
fn parse_vs(raw: &str) -> Result<PlayerKey> {
    let mut parts = raw.split('@').map(str::trim);
    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        bail!("--vs needs a player name");
    }
    let mut key = PlayerKey::new(name);
    match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => {}
        (Some(one), None, _) if !one.is_empty() => {
            if loader::season_from_file_name(one).as_deref() == Some(one) {
                key = key.with_season(one);
            } else {
                key = key.with_team(one);
            }
        }
        (Some(team), Some(season), None) if !team.is_empty() && !season.is_empty() => {
            key = key.with_team(team).with_season(season);
        }
        _ => bail!("invalid --vs `{raw}` (expected NAME[@TEAM][@SEASON])"),
    }
    Ok(key)
}

/// `COL=MIN..MAX`, both bounds inclusive.
fn parse_range(raw: &str) -> Result<(String, f64, f64)> {
    let (column, bounds) = raw
        .rsplit_once('=')
        .with_context(|| format!("invalid --range `{raw}` (expected COL=MIN..MAX)"))?;
    let (min, max) = bounds
        .split_once("..")
        .with_context(|| format!("invalid --range `{raw}` (expected COL=MIN..MAX)"))?;
    let column = column.trim();
    if column.is_empty() {
        bail!("--range needs a column name");
    }
    let min: f64 = min
        .trim()
        .parse()
        .with_context(|| format!("invalid --range minimum `{min}`"))?;
    let max: f64 = max
        .trim()
        .parse()
        .with_context(|| format!("invalid --range maximum `{max}`"))?;
    if min > max {
        bail!("--range minimum {min} is above maximum {max}");
    }
    Ok((column.to_string(), min, max))
}

fn parse_args(raw: Vec<String>) -> Result<Args> {
    let mut args = Args::default();
    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        if !arg.starts_with("--") {
            if args.command.is_some() {
                bail!("unexpected argument `{arg}`");
            }
            args.command = Some(parse_command(&arg).with_context(|| format!("unknown command `{arg}`\n{USAGE}"))?);
            continue;
        }
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg.clone(), None),
        };
        let mut value = || -> Result<String> {
            let v = match inline.clone() {
                Some(v) => v,
                None => iter.next().with_context(|| format!("{flag} needs a value"))?,
            };
            let v = v.trim().to_string();
            if v.is_empty() {
                bail!("{flag} needs a value");
            }
            Ok(v)
        };
        match flag.as_str() {
            "--data" => args.data.push(PathBuf::from(value()?)),
            "--remote-season" => args.remote_season = Some(value()?),
            "--league" => args.leagues.push(value()?),
            "--player" => args.player = Some(value()?),
            "--team" => args.team = Some(value()?),
            "--season" => args.season = Some(value()?),
            "--vs" => args.vs.push(parse_vs(&value()?)?),
            "--metrics" => args.metrics.extend(
                value()?
                    .split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty()),
            ),
            "--preset" => {
                let v = value()?;
                args.preset = Some(MetricPreset::parse(&v).with_context(|| format!("unknown preset `{v}`"))?);
            }
            "--top" => {
                let v = value()?;
                args.top = Some(v.parse().with_context(|| format!("invalid --top `{v}`"))?);
            }
            "--rank-by" => {
                let v = value()?;
                args.rank_by =
                    Some(SimilarityMetric::parse(&v).with_context(|| format!("unknown --rank-by `{v}`"))?);
            }
            "--filter-season" => args.filter.seasons.push(value()?),
            "--filter-team" => args.filter.teams.push(value()?),
            "--range" => args.filter.ranges.push(parse_range(&value()?)?),
            "--foot" => args.filter.foot = Some(value()?),
            "--position" => {
                let v = value()?;
                args.filter
                    .positions
                    .push(PositionGroup::parse(&v).with_context(|| format!("unknown position `{v}`"))?);
            }
            "--out" => args.out = Some(PathBuf::from(value()?)),
            "--help" => {
                args.command = None;
                return Ok(args);
            }
            other => bail!("unknown flag `{other}`\n{USAGE}"),
        }
    }
    Ok(args)
}
