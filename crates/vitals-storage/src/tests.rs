use crate::file::FileStorage;
use crate::memory::MemoryStorage;
use crate::sqlite::SqliteStorage;
use crate::{Storage, StorageError, ValueEntry};
use tempfile::TempDir;
use vitals_common::metric::{Metric, MetricKind};

fn backends() -> (TempDir, Vec<(&'static str, Box<dyn Storage>)>) {
    let dir = TempDir::new().unwrap();
    let backends: Vec<(&'static str, Box<dyn Storage>)> = vec![
        ("memory", Box::new(MemoryStorage::new())),
        ("file", Box::new(FileStorage::new(dir.path().join("db.json")))),
        (
            "sqlite",
            Box::new(SqliteStorage::new(&dir.path().join("db.sqlite")).unwrap()),
        ),
    ];
    (dir, backends)
}

#[test]
fn counter_accumulates() {
    let (_dir, backends) = backends();
    for (name, storage) in &backends {
        storage.set_counter("x", 1).unwrap();
        storage.set_counter("x", 1).unwrap();
        assert_eq!(storage.get_counter("x").unwrap(), 2, "backend {name}");
    }
}

#[test]
fn counter_accepts_negative_delta() {
    let (_dir, backends) = backends();
    for (name, storage) in &backends {
        storage.set_counter("swings", 10).unwrap();
        storage.set_counter("swings", -4).unwrap();
        assert_eq!(storage.get_counter("swings").unwrap(), 6, "backend {name}");
    }
}

#[test]
fn gauge_overwrites() {
    let (_dir, backends) = backends();
    for (name, storage) in &backends {
        storage.set_gauge("g", 1.0).unwrap();
        storage.set_gauge("g", 2.0).unwrap();
        assert_eq!(storage.get_gauge("g").unwrap(), 2.0, "backend {name}");
    }
}

#[test]
fn missing_reads_are_not_found_on_every_backend() {
    let (_dir, backends) = backends();
    for (name, storage) in &backends {
        assert!(
            matches!(
                storage.get_counter("missing"),
                Err(StorageError::NotFound { .. })
            ),
            "backend {name}"
        );
        assert!(
            matches!(
                storage.get_gauge("missing"),
                Err(StorageError::NotFound { .. })
            ),
            "backend {name}"
        );
    }
}

#[test]
fn kinds_do_not_alias() {
    let (_dir, backends) = backends();
    for (name, storage) in &backends {
        storage.set_gauge("shared", 3.5).unwrap();
        assert!(
            storage.get_counter("shared").is_err(),
            "backend {name}: gauge write must not satisfy counter read"
        );
    }
}

#[test]
fn batch_applies_both_kinds() {
    let (_dir, backends) = backends();
    let batch = vec![Metric::counter("a", 5), Metric::gauge("b", 0.5)];
    for (name, storage) in &backends {
        storage.set_batch(&batch).unwrap();
        let all = storage.get_all().unwrap();
        assert_eq!(
            all,
            vec![ValueEntry::counter("a", 5), ValueEntry::gauge("b", 0.5)],
            "backend {name}"
        );
    }
}

#[test]
fn batch_duplicates_accumulate_in_order() {
    let (_dir, backends) = backends();
    let batch = vec![
        Metric::counter("hits", 2),
        Metric::gauge("temp", 1.0),
        Metric::counter("hits", 3),
        Metric::gauge("temp", 2.5),
    ];
    for (name, storage) in &backends {
        storage.set_batch(&batch).unwrap();
        assert_eq!(storage.get_counter("hits").unwrap(), 5, "backend {name}");
        assert_eq!(storage.get_gauge("temp").unwrap(), 2.5, "backend {name}");
    }
}

#[test]
fn malformed_batch_leaves_no_partial_writes() {
    let (_dir, backends) = backends();
    // Counter without a delta: invalid, and placed after a valid metric so a
    // non-atomic backend would leak the first write.
    let batch = vec![
        Metric::gauge("ok", 1.0),
        Metric {
            id: "broken".to_string(),
            kind: MetricKind::Counter,
            delta: None,
            value: None,
        },
    ];
    for (name, storage) in &backends {
        assert!(
            matches!(
                storage.set_batch(&batch),
                Err(StorageError::MissingPayload { .. })
            ),
            "backend {name}"
        );
        assert!(
            storage.get_all().unwrap().is_empty(),
            "backend {name}: partial batch visible"
        );
    }
}

#[test]
fn get_all_formats_uniformly() {
    let (_dir, backends) = backends();
    for (name, storage) in &backends {
        storage.set_gauge("ratio", 2.0).unwrap();
        storage.set_counter("polls", 42).unwrap();
        let all = storage.get_all().unwrap();
        let ratio = all.iter().find(|e| e.name == "ratio").unwrap();
        assert_eq!(ratio.value, "2.0", "backend {name}");
        let polls = all.iter().find(|e| e.name == "polls").unwrap();
        assert_eq!(polls.value, "42", "backend {name}");
    }
}

#[test]
fn ping_succeeds_everywhere() {
    let (_dir, backends) = backends();
    for (_, storage) in &backends {
        storage.ping().unwrap();
    }
}

#[test]
fn file_save_restore_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics-db.json");

    let storage = FileStorage::new(&path);
    storage.set_gauge("HeapFree", 123.4).unwrap();
    storage.set_counter("PollCount", 7).unwrap();
    storage.set_counter("PollCount", 3).unwrap();
    let before = storage.get_all().unwrap();
    storage.save().unwrap();

    let restored = FileStorage::new(&path);
    restored.restore().unwrap();
    assert_eq!(restored.get_all().unwrap(), before);
    // The restored counter is a total, not a fresh delta.
    assert_eq!(restored.get_counter("PollCount").unwrap(), 10);
}

#[test]
fn file_restore_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path().join("nope.json"));
    assert!(matches!(storage.restore(), Err(StorageError::Io(_))));
}

#[test]
fn sqlite_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.sqlite");
    {
        let storage = SqliteStorage::new(&path).unwrap();
        storage.set_counter("polls", 9).unwrap();
        storage.set_gauge("load", 0.7).unwrap();
    }
    let reopened = SqliteStorage::new(&path).unwrap();
    assert_eq!(reopened.get_counter("polls").unwrap(), 9);
    assert_eq!(reopened.get_gauge("load").unwrap(), 0.7);
}

#[test]
fn sqlite_in_memory_batch() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage
        .set_batch(&[Metric::counter("c", 1), Metric::counter("c", 2)])
        .unwrap();
    assert_eq!(storage.get_counter("c").unwrap(), 3);
}
