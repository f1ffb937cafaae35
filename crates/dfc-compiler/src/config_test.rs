use super::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_parse_empty_uses_defaults() {
    let options = CompilerOptions::from_yaml_str("").unwrap();
    assert_eq!(options, CompilerOptions::default());
    assert_eq!(options.passes, vec!["dead_code", "constant_fold", "dedup"]);
    assert!(options.verify);
    assert!(!options.log_statistics);
}

#[test]
fn test_parse_full_options() {
    let yaml = r#"
passes:
  - constant_fold
  - dedup
verify: false
log_statistics: true
"#;
    let options = CompilerOptions::from_yaml_str(yaml).unwrap();
    assert_eq!(options.passes, vec!["constant_fold", "dedup"]);
    assert!(!options.verify);
    assert!(options.log_statistics);
}

#[test]
fn test_partial_options_fill_defaults() {
    let options = CompilerOptions::from_yaml_str("verify: false").unwrap();
    assert_eq!(options.passes.len(), 3);
    assert!(!options.verify);
}

#[test]
fn test_empty_pass_list_is_allowed() {
    let options = CompilerOptions::from_yaml_str("passes: []").unwrap();
    assert!(options.passes.is_empty());
}

#[test]
fn test_unknown_field_rejected() {
    let err = CompilerOptions::from_yaml_str("optimize: true").unwrap_err();
    assert!(matches!(err, CompilerError::ConfigParse(_)));
    assert!(err.to_string().starts_with("[DC003]"));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "passes: [dedup]\nlog_statistics: true").unwrap();
    let options = CompilerOptions::load(file.path()).unwrap();
    assert_eq!(options.passes, vec!["dedup"]);
    assert!(options.log_statistics);
    assert!(options.verify);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dfc.yml");
    let err = CompilerOptions::load(&path).unwrap_err();
    match err {
        CompilerError::ConfigNotFound { path: reported } => {
            assert!(reported.ends_with("dfc.yml"));
        }
        other => panic!("expected ConfigNotFound, got {other:?}"),
    }
}

#[test]
fn test_round_trip_through_yaml() {
    let options = CompilerOptions {
        passes: vec!["dead_code".to_string()],
        verify: false,
        log_statistics: true,
    };
    let yaml = serde_yaml::to_string(&options).unwrap();
    assert_eq!(CompilerOptions::from_yaml_str(&yaml).unwrap(), options);
}
