use std::path::PathBuf;

use scout_engine::loader::{ColumnRoles, load_files, parse_csv, read_csv};
use scout_engine::{EngineError, PlayerKey, Value};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

#[test]
fn csv_rows_become_typed_records() {
    let ds = read_csv(&fixture_path("players_2024.csv"), &ColumnRoles::default(), None)
        .expect("fixture should parse");
    // The nameless row is dropped.
    assert_eq!(ds.len(), 8);
    assert_eq!(
        ds.columns(),
        &[
            "Foot".to_string(),
            "Minutes played".to_string(),
            "Goals per 90".to_string(),
            "xG per 90".to_string(),
            "Assists per 90".to_string(),
            "Duels won, %".to_string(),
        ]
    );

    let numeric = ds.numeric_columns();
    assert!(numeric.contains(&"Duels won, %".to_string()));
    assert!(!numeric.contains(&"Foot".to_string()));

    let bea = &ds.records()[1];
    assert_eq!(bea.team.as_deref(), Some("Lima"));
    assert_eq!(bea.season.as_deref(), Some("2024"));
    assert_eq!(bea.position.as_deref(), Some("LWF, CF"));
    assert_eq!(bea.value("Foot"), &Value::Text("left".into()));

    let fiona = &ds.records()[5];
    assert!(fiona.value("Assists per 90").is_null());
    let eva = &ds.records()[4];
    assert!(eva.value("Duels won, %").is_null());
}

#[test]
fn same_name_needs_season_to_resolve() {
    let ds = read_csv(&fixture_path("players_2024.csv"), &ColumnRoles::default(), None).unwrap();
    assert!(matches!(
        ds.resolve(&PlayerKey::new("Ana Ruiz")),
        Err(EngineError::AmbiguousPlayer { matches: 2, .. })
    ));
    assert_eq!(ds.resolve(&PlayerKey::new("Ana Ruiz").with_season("2023")), Ok(6));
    assert_eq!(ds.resolve(&PlayerKey::new("Ana Ruiz").with_team("Lima")), Ok(0));
}

#[test]
fn season_hint_comes_from_file_name() {
    let files = vec![fixture_path("players_no_season.csv")];
    let ds = load_files(&files, &ColumnRoles::default()).unwrap();
    assert_eq!(ds.len(), 2);
    // No season column and no season token in the file name.
    assert!(ds.records().iter().all(|r| r.season.is_none()));

    let raw = "Player,Goals per 90\nHana Cruz,0.45\n";
    let ds = parse_csv(raw.as_bytes(), &ColumnRoles::default(), Some("23-24")).unwrap();
    assert_eq!(ds.records()[0].season.as_deref(), Some("23-24"));
}

#[test]
fn load_files_concatenates_heterogeneous_columns() {
    let files = vec![fixture_path("players_2024.csv"), fixture_path("players_no_season.csv")];
    let ds = load_files(&files, &ColumnRoles::default()).unwrap();
    assert_eq!(ds.len(), 10);
    let assists = ds.numeric_column("Assists per 90").unwrap();
    assert_eq!(assists.len(), 10);
    assert_eq!(assists[8], None);
    assert_eq!(assists[9], None);
}

#[test]
fn custom_name_column_and_missing_header() {
    let raw = "Full name,Team,Goals\nLuz Paredes,Cusco,3\n";
    let roles = ColumnRoles {
        name: "Full name".to_string(),
        ..ColumnRoles::default()
    };
    let ds = parse_csv(raw.as_bytes(), &roles, None).unwrap();
    assert_eq!(ds.records()[0].name, "Luz Paredes");
    assert_eq!(ds.columns(), &["Goals".to_string()]);

    assert!(parse_csv(raw.as_bytes(), &ColumnRoles::default(), None).is_err());
}

#[test]
fn unsupported_extension_is_rejected() {
    let err = load_files(&[PathBuf::from("players.xlsx")], &ColumnRoles::default()).unwrap_err();
    assert!(err.to_string().contains("unsupported"));
}
