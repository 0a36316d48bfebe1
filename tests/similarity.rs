use std::path::PathBuf;

use scout_engine::loader::{ColumnRoles, read_csv};
use scout_engine::similarity::{
    SimilarityMetric, SimilarityOptions, rank_similar, rank_similar_with, standardize,
};
use scout_engine::{Dataset, EngineError, PlayerKey, PlayerRecord};

fn abc() -> Dataset {
    Dataset::from_records(vec![
        PlayerRecord::new("A").with_value("Goals", 10.0).with_value("Assists", 5.0),
        PlayerRecord::new("B").with_value("Goals", 5.0).with_value("Assists", 5.0),
        PlayerRecord::new("C").with_value("Goals", 0.0).with_value("Assists", 5.0),
    ])
}

fn line() -> Dataset {
    Dataset::from_records(
        [("R", 3.0), ("A", 5.0), ("B", -1.0), ("C", 1.0)]
            .iter()
            .map(|(name, x)| PlayerRecord::new(*name).with_value("X", *x))
            .collect(),
    )
}

fn fixture() -> Dataset {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/players_2024.csv");
    read_csv(&path, &ColumnRoles::default(), None).expect("fixture should parse")
}

fn euclidean(top_n: usize) -> SimilarityOptions {
    SimilarityOptions {
        top_n,
        metric: SimilarityMetric::Euclidean,
    }
}

fn names(rows: &[scout_engine::similarity::SimilarityResult]) -> Vec<&str> {
    rows.iter().map(|r| r.player.name.as_str()).collect()
}

#[test]
fn zero_reference_vector_only_blocks_cosine() {
    let ds = abc();
    let b = PlayerKey::new("B");
    let features = ["Goals", "Assists"];

    let stats = standardize(&ds, &features).unwrap();
    assert!((stats.stats()[0].std_dev - 4.0825).abs() < 1e-3);
    assert_eq!(stats.z(1, 0), Some(0.0));
    assert_eq!(stats.z(0, 1), Some(0.0));

    assert_eq!(
        rank_similar(&ds, &b, &features, 2),
        Err(EngineError::ZeroReferenceVector { player: "B".into() })
    );

    let rows = rank_similar_with(&ds, &b, &features, &euclidean(2)).unwrap();
    assert_eq!(names(&rows), vec!["A", "C"]);
    assert!(rows.iter().all(|r| r.euclidean_similarity == 0.0));
    assert!(rows.iter().all(|r| r.cosine.is_none()));
    assert!((rows[0].distance - rows[1].distance).abs() < 1e-12);
}

#[test]
fn zero_candidate_vector_is_dropped_under_cosine() {
    let ds = abc();
    let rows = rank_similar(&ds, &PlayerKey::new("A"), &["Goals", "Assists"], 5).unwrap();
    assert_eq!(names(&rows), vec!["C"]);
    assert!((rows[0].score + 1.0).abs() < 1e-12);
}

#[test]
fn cosine_and_euclidean_orders_differ() {
    let ds = line();
    let r = PlayerKey::new("R");

    let cosine = rank_similar(&ds, &r, &["X"], 3).unwrap();
    // One dimension: cosine only sees the sign.
    assert_eq!(cosine[0].player.name, "A");
    assert!((cosine[0].score - 1.0).abs() < 1e-12);
    assert!(cosine[1..].iter().all(|row| (row.score + 1.0).abs() < 1e-12));

    let euclid = rank_similar_with(&ds, &r, &["X"], &euclidean(3)).unwrap();
    let mut nearest = names(&euclid[..2]);
    nearest.sort();
    assert_eq!(nearest, vec!["A", "C"]);
    assert!(euclid[..2].iter().all(|row| (row.score - 50.0).abs() < 1e-9));
    assert_eq!(euclid[2].player.name, "B");
    assert!(euclid[2].score.abs() < 1e-9);
}

#[test]
fn ranking_is_repeatable_and_bounded() {
    let ds = fixture();
    let ana = PlayerKey::new("Ana Ruiz").with_season("2024");
    let features = ["Goals per 90", "xG per 90", "Assists per 90"];
    let first = rank_similar(&ds, &ana, &features, 3).unwrap();
    let second = rank_similar(&ds, &ana, &features, 3).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    for w in first.windows(2) {
        assert!(w[0].score >= w[1].score);
    }
    for row in &first {
        assert!((-1.0..=1.0).contains(&row.score));
        assert_ne!(row.index, 0);
    }
}

#[test]
fn same_player_other_season_is_a_candidate() {
    let ds = fixture();
    let ana = PlayerKey::new("Ana Ruiz").with_season("2024");
    let rows = rank_similar(&ds, &ana, &["Goals per 90", "xG per 90"], 10).unwrap();
    assert!(
        rows.iter()
            .any(|r| r.player.name == "Ana Ruiz" && r.player.season.as_deref() == Some("2023"))
    );
    assert!(
        !rows.iter()
            .any(|r| r.player.name == "Ana Ruiz" && r.player.season.as_deref() == Some("2024"))
    );
}

#[test]
fn incomplete_rows_are_skipped() {
    let ds = fixture();
    let features = ["Goals per 90", "Assists per 90"];

    let fiona = PlayerKey::new("Fiona Luz");
    assert!(matches!(
        rank_similar(&ds, &fiona, &features, 3),
        Err(EngineError::MissingReferenceFeature { .. })
    ));

    let bea = PlayerKey::new("Bea Soto");
    let rows = rank_similar_with(&ds, &bea, &features, &euclidean(10)).unwrap();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.player.name != "Fiona Luz"));
    assert!(rows.iter().any(|r| r.euclidean_similarity == 0.0));
}

#[test]
fn argument_errors() {
    let ds = abc();
    let a = PlayerKey::new("A");
    assert_eq!(rank_similar(&ds, &a, &["Goals"], 0), Err(EngineError::InvalidTopN(0)));
    let none: [&str; 0] = [];
    assert_eq!(rank_similar(&ds, &a, &none, 3), Err(EngineError::EmptyFeatureSet));
    assert_eq!(
        rank_similar(&Dataset::default(), &a, &["Goals"], 3),
        Err(EngineError::EmptyDataset)
    );
    assert!(matches!(
        rank_similar(&ds, &PlayerKey::new("Z"), &["Goals"], 3),
        Err(EngineError::ReferenceNotFound { .. })
    ));
    assert!(matches!(
        rank_similar(&ds, &a, &["Shots"], 3),
        Err(EngineError::UnknownColumn { .. })
    ));
}

#[test]
fn duplicate_features_do_not_change_the_ranking() {
    let ds = line();
    let r = PlayerKey::new("R");
    let once = rank_similar_with(&ds, &r, &["X"], &euclidean(3)).unwrap();
    let twice = rank_similar_with(&ds, &r, &["X", "X"], &euclidean(3)).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn identical_profiles_score_full_euclidean_similarity() {
    let ds = Dataset::from_records(
        ["R", "A", "B"]
            .iter()
            .map(|name| {
                PlayerRecord::new(*name)
                    .with_value("Goals", 1.0)
                    .with_value("Assists", 4.0)
            })
            .collect(),
    );
    let rows = rank_similar_with(&ds, &PlayerKey::new("R"), &["Goals", "Assists"], &euclidean(5)).unwrap();
    assert_eq!(names(&rows), vec!["A", "B"]);
    for row in &rows {
        assert_eq!(row.distance, 0.0);
        assert_eq!(row.score, 100.0);
        assert_eq!(row.euclidean_similarity, 100.0);
    }
}
