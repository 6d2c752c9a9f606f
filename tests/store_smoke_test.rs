//! # Store Smoke Test
//!
//! End-to-end coverage of the storage contract over both store variants,
//! plus the store/index wiring. These tests pin the externally observable
//! guarantees: record numbering, deletion semantics, scan order, error
//! classification, and prefix lookup through an attached index.

use rowdb::{
    store_error, FieldSpec, FieldValue, FlaggedStore, ModelSpec, RecordStore, StoreError,
    TombstoneStore,
};
use tempfile::tempdir;

fn pets_model() -> ModelSpec {
    ModelSpec::new(
        "pets",
        vec![FieldSpec::text("name", 12), FieldSpec::int("age")],
    )
    .unwrap()
}

fn assert_not_found(report: &eyre::Report) {
    assert!(
        matches!(store_error(report), Some(StoreError::NotFound { .. })),
        "expected NotFound, got: {report:#}"
    );
}

/// Shared-contract properties, checked identically for both variants.
fn check_store_contract<S: RecordStore>(store: &mut S) {
    // Monotonic pks: insert always returns the prior total count.
    for expected in 0..4 {
        assert_eq!(store.total_count().unwrap(), expected);
        let pk = store.insert(format!("rec{expected}").as_bytes()).unwrap();
        assert_eq!(pk, expected);
    }

    // Round-trip with zero padding.
    let record = store.get(2).unwrap();
    assert_eq!(&record[..4], b"rec2");
    assert!(record[4..].iter().all(|&b| b == 0));

    // Tombstone exclusion: get fails, scan omits, count drops,
    // total_count holds.
    store.delete(1).unwrap();
    assert_not_found(&store.get(1).unwrap_err());
    let pks: Vec<u64> = store.scan().unwrap().map(|e| e.unwrap().0).collect();
    assert_eq!(pks, vec![0, 2, 3]);
    assert_eq!(store.count().unwrap(), 3);
    assert_eq!(store.total_count().unwrap(), 4);

    // Undelete via update.
    store.update(1, b"revived").unwrap();
    assert_eq!(&store.get(1).unwrap()[..7], b"revived");
    assert_eq!(store.count().unwrap(), 4);

    // Out-of-range access is NotFound, never another class.
    let end = store.total_count().unwrap();
    assert_not_found(&store.get(end).unwrap_err());
    assert_not_found(&store.delete(end).unwrap_err());

    // Oversized rows are integrity errors and leave the file untouched.
    let oversized = vec![b'x'; 1024];
    let report = store.insert(&oversized).unwrap_err();
    assert!(matches!(
        store_error(&report),
        Some(StoreError::Integrity { .. })
    ));
    assert_eq!(store.total_count().unwrap(), end);

    // Scan determinism on an unmodified store.
    let first: Vec<_> = store.scan().unwrap().map(Result::unwrap).collect();
    let second: Vec<_> = store.scan().unwrap().map(Result::unwrap).collect();
    assert_eq!(first, second);
}

#[test]
fn tombstone_store_honors_the_contract() {
    let dir = tempdir().unwrap();
    let mut store = TombstoneStore::open(dir.path(), pets_model()).unwrap();

    check_store_contract(&mut store);
}

#[test]
fn flagged_store_honors_the_contract() {
    let dir = tempdir().unwrap();
    let mut store = FlaggedStore::open(dir.path(), pets_model()).unwrap();

    check_store_contract(&mut store);
}

#[test]
fn rows_survive_reopening_the_store() {
    let dir = tempdir().unwrap();

    let pk = {
        let mut store = FlaggedStore::open(dir.path(), pets_model()).unwrap();
        let pk = store.insert(b"persisted").unwrap();
        store.sync().unwrap();
        pk
    };

    let store = FlaggedStore::open(dir.path(), pets_model()).unwrap();
    assert_eq!(&store.get(pk).unwrap()[..9], b"persisted");
    assert_eq!(store.total_count().unwrap(), 1);
}

#[test]
fn deletions_survive_reopening_the_store() {
    let dir = tempdir().unwrap();

    {
        let mut store = TombstoneStore::open(dir.path(), pets_model()).unwrap();
        store.insert(b"keep").unwrap();
        let doomed = store.insert(b"drop").unwrap();
        store.delete(doomed).unwrap();
        store.sync().unwrap();
    }

    let store = TombstoneStore::open(dir.path(), pets_model()).unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.total_count().unwrap(), 2);
}

#[test]
fn codec_round_trips_through_the_flagged_store() {
    let dir = tempdir().unwrap();
    let mut store = FlaggedStore::open(dir.path(), pets_model()).unwrap();
    let model = store.model().clone();

    let values = vec![FieldValue::from("whiskers"), FieldValue::Int(-3)];
    let row = model.encode_packed_row(&values).unwrap();
    let pk = store.insert(&row).unwrap();

    let decoded = model.decode_packed_row(&store.get(pk).unwrap()).unwrap();
    assert_eq!(decoded, values);
}

#[test]
fn codec_round_trips_through_the_tombstone_store() {
    let dir = tempdir().unwrap();
    let mut store = TombstoneStore::open(dir.path(), pets_model()).unwrap();
    let model = store.model().clone();

    let values = vec![FieldValue::from("whiskers"), FieldValue::Int(19)];
    let row = model.encode_text_row(&values).unwrap();
    let pk = store.insert(&row).unwrap();

    let decoded = model.decode_text_row(&store.get(pk).unwrap()).unwrap();
    assert_eq!(decoded, values);
}

mod indexing {
    use super::*;

    fn store_with_index(dir: &tempfile::TempDir) -> FlaggedStore {
        let mut store = FlaggedStore::open(dir.path(), pets_model()).unwrap();
        store.create_index("name").unwrap();
        store
    }

    fn named_row(store: &FlaggedStore, name: &str) -> Vec<u8> {
        store
            .model()
            .encode_packed_row(&[FieldValue::from(name), FieldValue::Int(1)])
            .unwrap()
    }

    #[test]
    fn prefix_lookup_resolves_live_records() {
        let dir = tempdir().unwrap();
        let mut store = store_with_index(&dir);

        let cat = store.insert(&named_row(&store, "cat")).unwrap();
        let car = store.insert(&named_row(&store, "car")).unwrap();
        let dog = store.insert(&named_row(&store, "dog")).unwrap();

        let ca: Vec<u64> = store
            .filter("name", "ca")
            .unwrap()
            .into_iter()
            .map(|(pk, _)| pk)
            .collect();
        assert_eq!(ca, vec![cat, car]);

        let do_: Vec<u64> = store
            .filter("name", "do")
            .unwrap()
            .into_iter()
            .map(|(pk, _)| pk)
            .collect();
        assert_eq!(do_, vec![dog]);

        assert!(store.filter("name", "z").unwrap().is_empty());
    }

    #[test]
    fn filter_returns_decodable_records() {
        let dir = tempdir().unwrap();
        let mut store = store_with_index(&dir);
        store.insert(&named_row(&store, "cat")).unwrap();

        let matches = store.filter("name", "cat").unwrap();

        assert_eq!(matches.len(), 1);
        let values = store.model().decode_packed_row(&matches[0].1).unwrap();
        assert_eq!(values[0], FieldValue::from("cat"));
    }

    #[test]
    fn stale_index_entries_are_dropped_at_resolution() {
        let dir = tempdir().unwrap();
        let mut store = store_with_index(&dir);

        let cat = store.insert(&named_row(&store, "cat")).unwrap();
        let car = store.insert(&named_row(&store, "car")).unwrap();
        store.delete(cat).unwrap();

        let pks: Vec<u64> = store
            .filter("name", "ca")
            .unwrap()
            .into_iter()
            .map(|(pk, _)| pk)
            .collect();
        assert_eq!(pks, vec![car]);

        // Reviving the record makes it resolvable again.
        store.update(cat, &named_row(&store, "cat")).unwrap();
        let pks: Vec<u64> = store
            .filter("name", "ca")
            .unwrap()
            .into_iter()
            .map(|(pk, _)| pk)
            .collect();
        assert_eq!(pks, vec![cat, car]);
    }

    #[test]
    fn index_survives_reopening() {
        let dir = tempdir().unwrap();

        let cat = {
            let mut store = store_with_index(&dir);
            let cat = store.insert(&named_row(&store, "cat")).unwrap();
            store.sync().unwrap();
            cat
        };

        let mut store = FlaggedStore::open(dir.path(), pets_model()).unwrap();
        store.attach_index("name").unwrap();

        let pks: Vec<u64> = store
            .filter("name", "ca")
            .unwrap()
            .into_iter()
            .map(|(pk, _)| pk)
            .collect();
        assert_eq!(pks, vec![cat]);
    }

    #[test]
    fn updates_keep_the_index_current() {
        let dir = tempdir().unwrap();
        let mut store = store_with_index(&dir);

        let pk = store.insert(&named_row(&store, "cat")).unwrap();
        store.update(pk, &named_row(&store, "dog")).unwrap();

        // The new value is findable; the old entry lingers but still
        // resolves to a live record, which is the documented staleness
        // trade-off of an index without removal.
        let dogs: Vec<u64> = store
            .filter("name", "do")
            .unwrap()
            .into_iter()
            .map(|(pk, _)| pk)
            .collect();
        assert_eq!(dogs, vec![pk]);
    }

    #[test]
    fn tombstone_store_indexes_the_text_layout() {
        let dir = tempdir().unwrap();
        let mut store = TombstoneStore::open(dir.path(), pets_model()).unwrap();
        store.create_index("name").unwrap();

        let row = store
            .model()
            .encode_text_row(&[FieldValue::from("cat"), FieldValue::Int(1)])
            .unwrap();
        let pk = store.insert(&row).unwrap();

        let pks: Vec<u64> = store
            .filter("name", "ca")
            .unwrap()
            .into_iter()
            .map(|(pk, _)| pk)
            .collect();
        assert_eq!(pks, vec![pk]);
    }
}
