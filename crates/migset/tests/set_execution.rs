//! Integration tests for ordered execution through the public API.
//!
//! Every migration appends to a shared journal so tests can assert exactly
//! which versions ran, in which order.

use std::sync::{Arc, Mutex};

use migset::{
    from_fns, BoxError, Direction, Error, Migration, MigrationConfig, MigrationError,
    MigrationErrorKind, MigrationSet, Version, VersionError,
};

// ── Helpers ─────────────────────────────────────────────────────────

type Journal = Arc<Mutex<Vec<String>>>;

/// A migration that records its label on success, or fails with "test".
fn step(journal: &Journal, label: &'static str, ok: bool) -> impl Migration {
    let (up, down) = (journal.clone(), journal.clone());
    from_fns(
        move || {
            if !ok {
                return Err::<(), BoxError>("test".into());
            }
            up.lock().unwrap().push(label.to_string());
            Ok(())
        },
        move || {
            if !ok {
                return Err::<(), BoxError>("test".into());
            }
            down.lock().unwrap().push(label.to_string());
            Ok(())
        },
    )
}

fn module(journal: &Journal, outcomes: [bool; 3]) -> MigrationSet {
    MigrationSet::new()
        .with("1.0.0", step(journal, "1.0.0", outcomes[0]))
        .with("2.0.0", step(journal, "2.0.0", outcomes[1]))
        .with("3.0.0", step(journal, "3.0.0", outcomes[2]))
}

fn ran(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

fn migration_error(result: migset::Result<()>) -> MigrationError {
    match result {
        Err(Error::Migration(e)) => e,
        other => panic!("expected a migration error, got {other:?}"),
    }
}

fn label(version: Option<&Version>) -> Option<&str> {
    version.map(Version::as_str)
}

// ── Ordering ────────────────────────────────────────────────────────

#[test]
fn upgrade_full_range_ascending() {
    let journal = Journal::default();
    module(&journal, [true; 3]).upgrade("0", "3").unwrap();
    assert_eq!(ran(&journal), ["1.0.0", "2.0.0", "3.0.0"]);
}

#[test]
fn downgrade_full_range_descending() {
    let journal = Journal::default();
    module(&journal, [true; 3]).downgrade("3", "0").unwrap();
    assert_eq!(ran(&journal), ["3.0.0", "2.0.0", "1.0.0"]);
}

#[test]
fn insertion_order_is_irrelevant() {
    let journal = Journal::default();
    let set = MigrationSet::new()
        .with("3.0.0", step(&journal, "3.0.0", true))
        .with("10.0.0", step(&journal, "10.0.0", true))
        .with("1.0.0", step(&journal, "1.0.0", true));

    set.upgrade("0", "10").unwrap();
    assert_eq!(ran(&journal), ["1.0.0", "3.0.0", "10.0.0"]);
}

// ── Boundaries ──────────────────────────────────────────────────────

#[test]
fn upgrade_excludes_from_and_includes_to() {
    let journal = Journal::default();
    module(&journal, [true; 3]).upgrade("1", "3").unwrap();
    assert_eq!(ran(&journal), ["2.0.0", "3.0.0"]);
}

#[test]
fn downgrade_excludes_to_and_includes_from() {
    let journal = Journal::default();
    module(&journal, [true; 3]).downgrade("3", "2").unwrap();
    assert_eq!(ran(&journal), ["3.0.0"]);
}

#[test]
fn same_endpoints_run_nothing() {
    let journal = Journal::default();
    let set = module(&journal, [true; 3]);
    for label in ["0", "1", "2.0.0", "3", "4"] {
        set.upgrade(label, label).unwrap();
        set.downgrade(label, label).unwrap();
    }
    assert!(ran(&journal).is_empty());
}

#[test]
fn range_between_registered_versions_is_a_no_op() {
    let journal = Journal::default();
    let set = module(&journal, [true; 3]);
    set.upgrade("1.1", "1.9").unwrap();
    set.downgrade("3.5", "3.1").unwrap();
    assert!(ran(&journal).is_empty());
}

#[test]
fn empty_set_always_succeeds() {
    let set = MigrationSet::new();
    set.upgrade("0", "100").unwrap();
    set.downgrade("100", "0").unwrap();
    assert!(set.versions().unwrap().is_empty());
}

#[test]
fn inverted_range_is_a_no_op_by_default() {
    let journal = Journal::default();
    let set = module(&journal, [true; 3]);
    set.upgrade("3", "0").unwrap();
    set.downgrade("0", "3").unwrap();
    assert!(ran(&journal).is_empty());
}

#[test]
fn strict_range_rejects_inverted_range() {
    let journal = Journal::default();
    let mut set = MigrationSet::with_config(MigrationConfig { strict_range: true });
    set.insert("1.0.0", step(&journal, "1.0.0", true));

    match set.upgrade("3", "0") {
        Err(Error::InvertedRange {
            direction,
            from,
            to,
        }) => {
            assert_eq!(direction, Direction::Upgrade);
            assert_eq!(from.as_str(), "3");
            assert_eq!(to.as_str(), "0");
        }
        other => panic!("expected inverted range, got {other:?}"),
    }
    assert!(ran(&journal).is_empty());
}

// ── Failure reporting ───────────────────────────────────────────────

#[test]
fn upgrade_failure_stops_and_reports_context() {
    let journal = Journal::default();
    let set = module(&journal, [true, false, true]);

    let err = migration_error(set.upgrade("0", "3"));
    assert_eq!(err.version().as_str(), "2.0.0");
    assert_eq!(label(err.last_version()), Some("1.0.0"));
    assert_eq!(err.direction(), Direction::Upgrade);
    assert_eq!(err.cause().to_string(), "test");
    assert_eq!(ran(&journal), ["1.0.0"]);
}

#[test]
fn downgrade_failure_reports_previous_step() {
    let journal = Journal::default();
    let set = module(&journal, [true, false, true]);

    let err = migration_error(set.downgrade("4", "1"));
    assert_eq!(err.version().as_str(), "2.0.0");
    assert_eq!(label(err.last_version()), Some("3.0.0"));
    assert_eq!(ran(&journal), ["3.0.0"]);
}

#[test]
fn failure_on_first_step_has_no_last_version() {
    let journal = Journal::default();
    let set = module(&journal, [true, true, false]);

    let err = migration_error(set.downgrade("4", "1"));
    assert_eq!(err.version().as_str(), "3.0.0");
    assert_eq!(err.last_version(), None);
    assert!(ran(&journal).is_empty());
}

#[test]
fn resume_from_last_version_after_fix() {
    let journal = Journal::default();
    let healthy = Arc::new(Mutex::new(false));

    let flaky = {
        let (healthy, journal) = (healthy.clone(), journal.clone());
        from_fns(
            move || {
                if !*healthy.lock().unwrap() {
                    return Err::<(), BoxError>("connection reset".into());
                }
                journal.lock().unwrap().push("2.0.0".into());
                Ok(())
            },
            || Ok::<(), BoxError>(()),
        )
    };

    let set = MigrationSet::new()
        .with("1.0.0", step(&journal, "1.0.0", true))
        .with("2.0.0", flaky)
        .with("3.0.0", step(&journal, "3.0.0", true));

    let err = migration_error(set.upgrade("0", "3"));
    assert_eq!(err.resume_from(), err.last_version());
    let resume_from = err.resume_from().expect("1.0.0 completed").to_string();

    *healthy.lock().unwrap() = true;
    set.upgrade(&resume_from, "3").unwrap();
    assert_eq!(ran(&journal), ["1.0.0", "2.0.0", "3.0.0"]);
}

/// A migration that refuses to apply twice or revert what is not applied.
fn tracked(applied: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> impl Migration {
    let (up, down) = (applied.clone(), applied.clone());
    from_fns(
        move || {
            let mut applied = up.lock().unwrap();
            if applied.contains(&label) {
                return Err::<(), BoxError>(format!("{label} already applied").into());
            }
            applied.push(label);
            Ok(())
        },
        move || {
            let mut applied = down.lock().unwrap();
            let Some(at) = applied.iter().position(|l| *l == label) else {
                return Err::<(), BoxError>(format!("{label} not applied").into());
            };
            applied.remove(at);
            Ok(())
        },
    )
}

#[test]
fn resume_downgrade_from_failing_version() {
    let applied = Arc::new(Mutex::new(Vec::new()));
    let healthy = Arc::new(Mutex::new(false));

    let flaky = {
        let inner = tracked(&applied, "2.0.0");
        let healthy = healthy.clone();
        from_fns(
            || Ok::<(), BoxError>(()),
            move || {
                if !*healthy.lock().unwrap() {
                    return Err::<(), BoxError>("connection reset".into());
                }
                inner.downgrade()
            },
        )
    };

    let set = MigrationSet::new()
        .with("1.0.0", tracked(&applied, "1.0.0"))
        .with("2.0.0", flaky)
        .with("3.0.0", tracked(&applied, "3.0.0"));
    *applied.lock().unwrap() = vec!["1.0.0", "2.0.0", "3.0.0"];

    let err = migration_error(set.downgrade("3", "0"));
    assert_eq!(err.direction(), Direction::Downgrade);
    assert_eq!(label(err.last_version()), Some("3.0.0"));
    assert_eq!(label(err.resume_from()), Some("2.0.0"));
    assert_eq!(*applied.lock().unwrap(), ["1.0.0", "2.0.0"]);

    *healthy.lock().unwrap() = true;

    // 3.0.0 is already reverted; starting there would revert it again.
    let again = migration_error(set.downgrade("3.0.0", "0"));
    assert_eq!(again.version().as_str(), "3.0.0");
    assert_eq!(again.cause().to_string(), "3.0.0 not applied");

    let resume_from = err.resume_from().expect("downgrade always has a resume point");
    set.downgrade(resume_from.as_str(), "0").unwrap();
    assert!(applied.lock().unwrap().is_empty());
}

#[test]
fn error_message_names_version_and_cause() {
    let journal = Journal::default();
    let err = module(&journal, [true, false, true])
        .upgrade("0", "3")
        .unwrap_err();
    assert_eq!(err.to_string(), "migration failed at version \"2.0.0\": test");
}

// ── Error identity ──────────────────────────────────────────────────

#[test]
fn migration_errors_compare_by_kind() {
    let journal = Journal::default();
    let up = migration_error(module(&journal, [true, false, true]).upgrade("0", "3"));
    let down = migration_error(module(&journal, [true, true, false]).downgrade("4", "1"));

    assert_ne!(up.version(), down.version());
    assert_eq!(up, down);
    assert_eq!(up.kind(), MigrationErrorKind::Failed);
    assert_eq!(down, MigrationErrorKind::Failed);
}

#[test]
fn unrelated_errors_are_not_migration_failures() {
    let set = MigrationSet::new();
    let err = set.upgrade("zero", "1").unwrap_err();
    assert!(!err.is_migration_failure());
    assert!(err.as_migration().is_none());

    let journal = Journal::default();
    let err = module(&journal, [false, true, true])
        .upgrade("0", "1")
        .unwrap_err();
    assert!(err.is_migration_failure());
}

// ── Malformed input ─────────────────────────────────────────────────

#[test]
fn malformed_arguments_abort_before_running() {
    let journal = Journal::default();
    let set = module(&journal, [true; 3]);

    for direction in [Direction::Upgrade, Direction::Downgrade] {
        for (from, to) in [("x", "3"), ("0", "three"), ("", "3"), ("0", "1.2.3.4")] {
            let err = set.run(direction, from, to).unwrap_err();
            assert!(
                matches!(err, Error::Version(_)),
                "{direction} {from:?} -> {to:?}: {err:?}"
            );
        }
    }
    assert!(ran(&journal).is_empty());
}

#[test]
fn malformed_key_aborts_before_running() {
    let journal = Journal::default();
    let mut set = module(&journal, [true; 3]);
    set.insert("latest", step(&journal, "latest", true));

    let err = set.upgrade("0", "3").unwrap_err();
    assert!(matches!(
        err.as_version(),
        Some(VersionError::Invalid { label, .. }) if label == "latest"
    ));
    assert!(set.downgrade("3", "0").is_err());
    assert!(ran(&journal).is_empty());

    set.remove("latest");
    set.upgrade("0", "3").unwrap();
    assert_eq!(ran(&journal), ["1.0.0", "2.0.0", "3.0.0"]);
}

// ── Introspection ───────────────────────────────────────────────────

#[test]
fn versions_is_idempotent() {
    let journal = Journal::default();
    let set = module(&journal, [true; 3]);

    let first = set.versions().unwrap();
    set.upgrade("0", "3").unwrap();
    let second = set.versions().unwrap();
    set.downgrade("3", "0").unwrap();
    let third = set.versions().unwrap();

    assert_eq!(first, second);
    assert_eq!(second, third);
    let labels: Vec<&str> = first.iter().map(Version::as_str).collect();
    assert_eq!(labels, ["1.0.0", "2.0.0", "3.0.0"]);
}

#[test]
fn plan_is_a_dry_run() {
    let journal = Journal::default();
    let set = module(&journal, [true; 3]);

    let plan = set.plan(Direction::Downgrade, "3", "1").unwrap();
    let labels: Vec<&str> = plan.iter().map(Version::as_str).collect();
    assert_eq!(labels, ["3.0.0", "2.0.0"]);
    assert_eq!(label(plan.last()), Some("2.0.0"));
    assert!(ran(&journal).is_empty());

    set.execute(&plan).unwrap();
    assert_eq!(ran(&journal), ["3.0.0", "2.0.0"]);
}

#[test]
fn latest_is_highest_version() {
    let journal = Journal::default();
    let set = module(&journal, [true; 3]).with("2.10.0", step(&journal, "2.10.0", true));
    assert_eq!(set.latest().unwrap().map(|v| v.to_string()), Some("3.0.0".into()));
}

#[test]
fn set_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MigrationSet>();

    let journal = Journal::default();
    let set = Arc::new(module(&journal, [true; 3]));
    let worker = {
        let set = set.clone();
        std::thread::spawn(move || set.upgrade("0", "3"))
    };
    worker.join().unwrap().unwrap();
    assert_eq!(ran(&journal), ["1.0.0", "2.0.0", "3.0.0"]);
}
