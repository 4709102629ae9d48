//! Layer precedence, idempotence and source-level errors
//!
//! Every test resolves through the public pipeline against a temporary
//! working tree.

mod fixtures;

use fixtures::Project;
use prover_conf::{ConfError, ErrorKind, LayerOrigin, RunRecord};
use serde_json::json;

// =============================================================================
// Precedence
// =============================================================================

#[test]
fn test_base_value_survives() {
    let project = Project::new();
    project
        .write_conf("base.conf", json!({"solc": "solc5.11"}))
        .write_conf(
            "run.conf",
            json!({"override_base_config": "base.conf", "files": ["A.sol"], "verify": "A:a.spec"}),
        );

    let config = project.resolve(&["run.conf"]).unwrap();
    assert_eq!(config.get_str("solc"), Some("solc5.11"));
    assert_eq!(config.origin("solc"), Some(LayerOrigin::BaseConf));
}

#[test]
fn test_cli_overrides_base() {
    let project = Project::new();
    project
        .write_conf("base.conf", json!({"solc": "solc5.11"}))
        .write_conf(
            "run.conf",
            json!({"override_base_config": "base.conf", "files": ["A.sol"], "verify": "A:a.spec"}),
        );

    let config = project.resolve(&["run.conf", "--solc", "solc6.10"]).unwrap();
    assert_eq!(config.get_str("solc"), Some("solc6.10"));
    assert_eq!(config.origin("solc"), Some(LayerOrigin::Cli));
}

#[test]
fn test_child_overrides_base() {
    let project = Project::new();
    project
        .write_conf("base.conf", json!({"msg": "base", "loop_iter": 2}))
        .write_conf(
            "run.conf",
            json!({
                "override_base_config": "base.conf",
                "files": ["A.sol"],
                "verify": "A:a.spec",
                "msg": "child",
            }),
        );

    let config = project.resolve(&["run.conf"]).unwrap();
    assert_eq!(config.get_str("msg"), Some("child"));
    assert_eq!(config.origin("msg"), Some(LayerOrigin::ChildConf));
    assert_eq!(config.number("loop_iter"), Some(2));
}

#[test]
fn test_unset_attribute_takes_default() {
    let project = Project::new();
    let config = project.resolve(&["A.sol", "--verify", "A:a.spec"]).unwrap();

    assert_eq!(config.get_str("server"), Some("production"));
    assert_eq!(config.origin("server"), Some(LayerOrigin::Default));
    assert!(!config.flag("optimistic_loop"));
}

#[test]
fn test_toml_config_file() {
    let project = Project::new();
    project.write(
        "run.toml",
        "files = [\"A.sol\"]\nverify = \"A:a.spec\"\nsmt_timeout = 600\n",
    );

    let config = project.resolve(&["run.toml"]).unwrap();
    assert_eq!(config.number("smt_timeout"), Some(600));
}

// =============================================================================
// Idempotence and provenance
// =============================================================================

#[test]
fn test_resolution_is_idempotent() {
    let project = Project::new();
    project
        .write_conf("base.conf", json!({"solc": "solc5.11", "rule": ["r1", "r2"]}))
        .write_conf(
            "run.conf",
            json!({"override_base_config": "base.conf", "files": ["A.sol"], "verify": "A:a.spec"}),
        );

    let first = project.resolve(&["run.conf", "--msg", "again"]).unwrap();
    let second = project.resolve(&["run.conf", "--msg", "again"]).unwrap();

    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.config_digest().unwrap(), second.config_digest().unwrap());
}

#[test]
fn test_record_omits_meta_key() {
    let project = Project::new();
    project
        .write_conf("base.conf", json!({"solc": "solc5.11"}))
        .write_conf(
            "run.conf",
            json!({"override_base_config": "base.conf", "files": ["A.sol"], "verify": "A:a.spec"}),
        );

    let config = project.resolve(&["run.conf"]).unwrap();
    let record = RunRecord::from_config(&config).unwrap();
    let json = record.to_json().unwrap();

    assert!(!json.contains("override_base_config"));
    assert_eq!(record.provenance["solc"], LayerOrigin::BaseConf);
    assert_eq!(record.provenance["verify"], LayerOrigin::ChildConf);
    assert_eq!(record.sources.len(), 4);
    assert!(record.sources[1].digest.is_some());
}

// =============================================================================
// Source errors
// =============================================================================

#[test]
fn test_duplicate_key_in_file() {
    let project = Project::new();
    project.write(
        "run.conf",
        r#"{"files": ["A.sol"], "solc_map": {"A": "v1"}, "solc_map": {"B": "v2"}}"#,
    );

    let err = project.resolve(&["run.conf"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigParse);
    assert!(err.to_string().contains("Duplicate key"));
}

#[test]
fn test_unknown_attribute_names_its_file() {
    let project = Project::new();
    project
        .write_conf("base.conf", json!({"no_such_key": true}))
        .write_conf(
            "run.conf",
            json!({"override_base_config": "base.conf", "files": ["A.sol"]}),
        );

    let err = project.resolve(&["run.conf"]).unwrap_err();
    match err {
        ConfError::UnknownAttribute { key, location } => {
            assert_eq!(key, "no_such_key");
            assert!(location.ends_with("base.conf"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_flag() {
    let project = Project::new();
    let err = project.resolve(&["A.sol", "--no_such_flag"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownAttribute);
}

#[test]
fn test_base_with_own_base() {
    let project = Project::new();
    project
        .write_conf("root.conf", json!({}))
        .write_conf("base.conf", json!({"override_base_config": "root.conf"}))
        .write_conf("run.conf", json!({"override_base_config": "base.conf"}));

    let err = project.resolve(&["run.conf"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigNesting);
}

#[test]
fn test_unparseable_base() {
    let project = Project::new();
    project
        .write("base.conf", "{ not json")
        .write_conf("run.conf", json!({"override_base_config": "base.conf"}));

    let err = project.resolve(&["run.conf"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigNesting);
    assert!(err.to_string().contains("Cannot load base config"));
}

#[test]
fn test_config_file_must_be_sole_input() {
    let project = Project::new();
    project.write_conf("run.conf", json!({"verify": "A:a.spec"}));

    let err = project.resolve(&["run.conf", "A.sol", "B.sol"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigNesting);
}

#[test]
fn test_list_given_for_string() {
    let project = Project::new();
    project.write_conf("run.conf", json!({"files": ["A.sol"], "msg": ["hello"]}));

    let err = project.resolve(&["run.conf"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigParse);
    assert_eq!(err.key(), Some("msg"));
}

// =============================================================================
// Mutual exclusion
// =============================================================================

#[test]
fn test_compiler_flags_exclusive_in_either_order() {
    let project = Project::new();
    let orders: [&[&str]; 2] = [
        &["A.sol", "--verify", "A:a.spec", "--solc", "solc8.1", "--compiler_map", "A.sol=solc8.2"],
        &["A.sol", "--verify", "A:a.spec", "--compiler_map", "A.sol=solc8.2", "--solc", "solc8.1"],
    ];

    for tokens in orders {
        let err = project.resolve(tokens).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MixedCompilerFlags);
    }
}

#[test]
fn test_compiler_flags_exclusive_across_layers() {
    let project = Project::new();
    project.write_conf(
        "run.conf",
        json!({"files": ["A.sol"], "verify": "A:a.spec", "solc_map": {"A": "solc5.11"}}),
    );

    let err = project.resolve(&["run.conf", "--solc", "solc6.10"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MixedCompilerFlags);
}

#[test]
fn test_optimize_flags_exclusive() {
    let project = Project::new();
    let err = project
        .resolve(&[
            "A.sol",
            "--verify",
            "A:a.spec",
            "--solc_optimize",
            "--solc_optimize_map",
            "A.sol=200",
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AttributeValidation);
    assert!(err
        .to_string()
        .contains("You cannot use both 'solc_optimize' and 'solc_optimize_map' arguments"));
}
