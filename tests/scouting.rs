use std::path::PathBuf;

use scout_engine::compare::{compare_players, comparison_matrix, radar_profile};
use scout_engine::loader::{ColumnRoles, read_csv};
use scout_engine::profile::{Tier, classify};
use scout_engine::report::PlayerReport;
use scout_engine::similarity::SimilarityOptions;
use scout_engine::{Dataset, EngineError, PlayerKey};

fn fixture() -> Dataset {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/players_2024.csv");
    read_csv(&path, &ColumnRoles::default(), None).expect("fixture should parse")
}

const ATTACK: [&str; 3] = ["Goals per 90", "xG per 90", "Assists per 90"];

#[test]
fn profile_skips_missing_metrics() {
    let ds = fixture();
    let profile = classify(&ds, &PlayerKey::new("Fiona Luz"), &ATTACK).unwrap();
    assert_eq!(profile.strengths, vec!["Goals per 90", "xG per 90"]);
    assert!(profile.weaknesses.is_empty());
    assert_eq!(profile.skipped.len(), 1);
    assert_eq!(profile.skipped[0].metric, "Assists per 90");
    assert!(matches!(profile.skipped[0].reason, EngineError::MissingValue { .. }));
    assert_eq!(profile.mean_percentile, 100.0);
    assert_eq!(profile.tier, Tier::Elite);
    assert_eq!(profile.player.team.as_deref(), Some("Arequipa"));
}

#[test]
fn profile_weaknesses_and_tier() {
    let ds = fixture();
    let profile = classify(&ds, &PlayerKey::new("Eva Rios"), &ATTACK).unwrap();
    assert!(profile.strengths.is_empty());
    assert_eq!(profile.weaknesses.len(), 3);
    assert!(profile.percentiles.iter().all(|p| p.percentile <= 20.0));
    assert_eq!(profile.tier, Tier::Developing);
}

#[test]
fn profile_without_any_metric_fails() {
    let ds = fixture();
    assert_eq!(
        classify(&ds, &PlayerKey::new("Fiona Luz"), &["Assists per 90"]),
        Err(EngineError::NoComputableMetrics)
    );
}

#[test]
fn head_to_head_differences() {
    let ds = fixture();
    let ana = PlayerKey::new("Ana Ruiz").with_season("2024");
    let bea = PlayerKey::new("Bea Soto");
    let rows = compare_players(&ds, &ana, &bea, &["Goals per 90", "Duels won, %"]).unwrap();

    assert!((rows[0].difference - 0.2).abs() < 1e-9);
    assert!((rows[0].difference_pct.unwrap() - 50.0).abs() < 1e-9);
    assert_eq!(rows[1].difference, -5.0);
    assert!((rows[1].difference_pct.unwrap() + 10.0).abs() < 1e-9);

    let radar = radar_profile(&rows);
    assert_eq!(radar[0].a, 1.0);
    assert!((radar[1].a - 0.9).abs() < 1e-9);
    assert_eq!(radar[1].b, 1.0);

    let eva = PlayerKey::new("Eva Rios");
    let rows = compare_players(&ds, &ana, &eva, &["Goals per 90"]).unwrap();
    assert_eq!(rows[0].difference_pct, None);
    assert!(matches!(
        compare_players(&ds, &ana, &eva, &["Duels won, %"]),
        Err(EngineError::MissingValue { .. })
    ));
}

#[test]
fn matrix_marks_best_present_value() {
    let ds = fixture();
    let players = vec![
        PlayerKey::new("Ana Ruiz").with_season("2024"),
        PlayerKey::new("Dana Vega"),
        PlayerKey::new("Eva Rios"),
    ];
    let matrix = comparison_matrix(&ds, &players, &["Duels won, %", "Goals per 90"]).unwrap();
    assert_eq!(matrix.players.len(), 3);
    assert_eq!(matrix.rows[0].values, vec![Some(45.0), Some(70.0), None]);
    assert_eq!(matrix.rows[0].best, Some(1));
    assert_eq!(matrix.rows[1].best, Some(0));
}

#[test]
fn report_is_written_as_json_and_xlsx() {
    let ds = fixture();
    let carla = PlayerKey::new("Carla Diaz");
    let report = PlayerReport::build(
        &ds,
        &carla,
        &ATTACK,
        &["Goals per 90", "xG per 90"],
        &SimilarityOptions::default(),
    )
    .unwrap();
    assert_eq!(report.summaries.len(), 3);
    assert_eq!(report.similar.len(), 5);
    assert!(report.similarity_error.is_none());

    let dir = std::env::temp_dir().join(format!("scout_engine_report_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let json_path = dir.join("carla.json");
    report.write_json(&json_path).unwrap();
    let raw = std::fs::read_to_string(&json_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["player"]["name"], "Carla Diaz");
    assert_eq!(parsed["profile"]["percentiles"].as_array().map(Vec::len), Some(3));

    let xlsx_path = dir.join("carla.xlsx");
    report.write_xlsx(&xlsx_path).unwrap();
    assert!(std::fs::metadata(&xlsx_path).unwrap().len() > 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn report_keeps_profile_when_similarity_fails() {
    let ds = fixture();
    let report = PlayerReport::build(
        &ds,
        &PlayerKey::new("Fiona Luz"),
        &ATTACK,
        &["Assists per 90"],
        &SimilarityOptions::default(),
    )
    .unwrap();
    assert_eq!(report.profile.tier, Tier::Elite);
    assert!(report.similar.is_empty());
    assert!(report.similarity_error.is_some());
}
