use std::fs;
use zettel_core::{
    open_store, BackendConfig, FileStorage, KeyValueStorage, MemoryStorage, NoteStore,
    SqliteStorage, StoreConfig, WriteBatch,
};

fn exercise_store(storage: Box<dyn KeyValueStorage>) -> Box<dyn KeyValueStorage> {
    let mut store = NoteStore::new(storage);
    store.initialize().unwrap();
    let reply = store.reply_to_note("2", "branching off", vec![]).unwrap();
    store.delete_note("9").unwrap();

    assert_eq!(store.list_notes().len(), 9);
    assert_eq!(store.list_threads().len(), 2);
    assert_eq!(store.get_thread("thread1").unwrap().note_count, 3);
    assert_eq!(store.list_replies("2")[0].id, reply.id);
    assert!(store.is_storage_available());
    store.into_storage()
}

#[test]
fn every_backend_supports_the_same_store_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let backends: Vec<Box<dyn KeyValueStorage>> = vec![
        Box::new(MemoryStorage::new()),
        Box::new(FileStorage::open(dir.path().join("files")).unwrap()),
        Box::new(SqliteStorage::open(dir.path().join("notes.sqlite3")).unwrap()),
    ];

    for storage in backends {
        let name = storage.backend_name();
        let storage = exercise_store(storage);
        assert_eq!(
            storage.keys().unwrap(),
            vec![
                "zetteltweet-last-sync".to_string(),
                "zetteltweet-notes".to_string(),
                "zetteltweet-threads".to_string(),
            ],
            "backend {name}"
        );
    }
}

#[test]
fn file_backend_writes_one_json_file_per_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = NoteStore::new(FileStorage::open(dir.path()).unwrap());
    store.create_note("on disk", vec!["fs".to_string()]).unwrap();

    let raw = fs::read_to_string(dir.path().join("zetteltweet-notes.json")).unwrap();
    let notes: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(notes[0]["content"], "on disk");
    assert!(dir.path().join("zetteltweet-threads.json").exists());
    assert!(!dir.path().join("zetteltweet-notes.json.tmp").exists());
}

#[test]
fn sqlite_rejected_batch_keeps_previous_records() {
    let mut storage = SqliteStorage::open_in_memory().unwrap();
    storage.set("zetteltweet-notes", "[]".to_string()).unwrap();

    let result = storage.apply(
        WriteBatch::new()
            .put("zetteltweet-notes", "[1]")
            .put("not a valid key", "x"),
    );

    assert!(result.is_err());
    assert_eq!(storage.get("zetteltweet-notes").unwrap().as_deref(), Some("[]"));
}

#[test]
fn configured_file_store_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        backend: BackendConfig::File(dir.path().join("data")),
        seed_defaults: true,
        log_level: None,
        log_dir: None,
    };

    let mut store = open_store(&config).unwrap();
    let note = store.start_thread("persisted thread", vec![]).unwrap();
    drop(store);

    let reopened = open_store(&config).unwrap();
    assert_eq!(reopened.list_notes().len(), 10);
    assert!(reopened.is_part_of_thread(&note.id));
    assert!(reopened.storage_usage().used_kb > 0.0);
}
