//! Tests for loading plan files and running custom plans.
//!
//! This module tests:
//! - Reading plans from disk and reporting bad files with their path
//! - Step validation errors naming the offending step
//! - A hand-written plan driving the engine, including the skip policy

use std::fs;

use sqldump_fixup::errors::{MappingError, PlanError, StepError};
use sqldump_fixup::{Engine, Error, Plan, StepStatus};

const DUMP: &str = "\
INSERT INTO \"public\".\"players\" (\"id\", \"name\", \"rating\", \"legacy_flag\") VALUES
\t('p1', 'Ana', 610, true),
\t('p2', 'Bo', 'unrated', false),
\t('p3', 'Cy', 540, false);

INSERT INTO \"public\".\"teams\" (\"id\", \"captain_id\") VALUES
\t('t1', 'p1');
";

const PLAN: &str = r#"
input = "players.sql"
output = "players-fixed.sql"

[[steps]]
kind = "reshape"
table = "players"
old_columns = ["id", "name", { name = "rating", type = "integer" }, "legacy_flag"]
new_columns = ["id", { name = "display_name", from = "name" }, "rating", { name = "active", value = "true" }]
drop = ["legacy_flag"]
on_row_error = "skip"
snippet = "restore_players.sql"

[[steps]]
kind = "rename"
from = "captain_id"
to = "captain_player_id"
notes = ["backfill captains for teams created after the dump"]
"#;

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.toml");
    fs::write(&path, PLAN).unwrap();

    let plan = Plan::load(&path).unwrap();
    assert_eq!(plan, Plan::from_toml_str(PLAN).unwrap());
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[0].name(), "reshape players");
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = Plan::load(&path).unwrap_err();
    assert!(matches!(err, Error::Read { path: ref p, .. } if *p == path));
}

#[test]
fn test_load_malformed_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.toml");
    fs::write(&path, "[[steps]]\nkind = \"explode\"\n").unwrap();
    let err = Plan::load(&path).unwrap_err();
    assert!(matches!(err, Error::Plan { source: PlanError::Toml(_), .. }));
    assert!(err.to_string().contains("plan.toml"));
}

#[test]
fn test_invalid_step_is_named() {
    let plan = Plan::from_toml_str(
        r#"
        [[steps]]
        kind = "rename"
        from = "a"
        to = "b"

        [[steps]]
        kind = "reshape"
        name = "bad players"
        table = "players"
        old_columns = ["id", "name"]
        new_columns = ["id"]
        "#,
    )
    .unwrap();
    let err = plan.resolve().unwrap_err();
    match err {
        PlanError::Step {
            index,
            name,
            source,
        } => {
            assert_eq!(index, 2);
            assert_eq!(name, "bad players");
            assert_eq!(
                source,
                StepError::Mapping(MappingError::Unconsumed("name".into()))
            );
        }
        PlanError::Toml(error) => panic!("unexpected TOML error: {error}"),
    }
}

#[test]
fn test_custom_plan_skips_bad_rows() {
    let steps = Plan::from_toml_str(PLAN).unwrap().resolve().unwrap();
    let run = Engine::new(steps).run(DUMP.to_owned());

    let players = &run.reports[0];
    assert_eq!(players.status, StepStatus::Partial);
    assert_eq!((players.rows_in, players.rows_out), (3, 2));
    assert_eq!(players.failures.len(), 1);
    assert_eq!(players.failures[0].line, 3);
    assert_eq!(players.failures[0].text, "('p2', 'Bo', 'unrated', false)");

    assert_eq!(run.reports[1].status, StepStatus::Applied);
    assert_eq!(run.reports[1].replacements, 1);
    assert!(run.needs_attention());

    assert_eq!(
        run.document,
        "\
INSERT INTO \"public\".\"players\" (\"id\", \"display_name\", \"rating\", \"active\") VALUES
\t('p1', 'Ana', 610, true),
\t('p3', 'Cy', 540, true);

INSERT INTO \"public\".\"teams\" (\"id\", \"captain_player_id\") VALUES
\t('t1', 'p1');
"
    );
    assert_eq!(run.snippets.len(), 1);
    assert_eq!(
        run.snippets[0].contents,
        "\
-- Fixed players data

INSERT INTO \"public\".\"players\" (\"id\", \"display_name\", \"rating\", \"active\") VALUES
\t('p1', 'Ana', 610, true),
\t('p3', 'Cy', 540, true);
"
    );
}
