use std::fs;
use std::sync::Arc;
use std::thread;

use yamlfs_core_store::{path, Path, Value};
use yamlfs_doc_store::{lookup, resolve_mut, DocumentOptions, DocumentStore, WriteSessions};
use yamlfs_serde_store::infer_value;

fn open_doc(content: &str) -> (tempfile::TempDir, Arc<DocumentStore>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.yaml");
    fs::write(&path, content).unwrap();
    let store = DocumentStore::open(&path, DocumentOptions::default());
    (dir, Arc::new(store))
}

#[test]
fn test_concurrent_mutations_all_land_on_disk() {
    let (dir, store) = open_doc("items: {}\n");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let target = Path::parse(&format!("items/item{}", i)).unwrap();
                store
                    .mutate(|root| resolve_mut(root, &target, true)?.set(Value::Integer(i)))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(!store.is_dirty());

    let reopened = DocumentStore::open(dir.path().join("doc.yaml"), DocumentOptions::default());
    let root = reopened.snapshot();
    for i in 0..8 {
        let target = Path::parse(&format!("items/item{}", i)).unwrap();
        assert_eq!(lookup(&root, &target).unwrap(), &Value::Integer(i));
    }
}

#[test]
fn test_readers_see_whole_trees() {
    let (_dir, store) = open_doc("pair:\n  left: 0\n  right: 0\n");

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let left = path!("pair/left");
            let right = path!("pair/right");
            for n in 1..50i64 {
                store
                    .mutate(|root| {
                        resolve_mut(root, &left, true)?.set(Value::Integer(n))?;
                        resolve_mut(root, &right, true)?.set(Value::Integer(n))
                    })
                    .unwrap();
            }
        })
    };

    for _ in 0..200 {
        let root = store.snapshot();
        assert_eq!(
            lookup(&root, &path!("pair/left")).unwrap(),
            lookup(&root, &path!("pair/right")).unwrap()
        );
    }
    writer.join().unwrap();
}

#[test]
fn test_session_commit_promotes_file_to_directory() {
    let (dir, store) = open_doc("service: placeholder\n");
    let sessions = WriteSessions::new();
    let target = path!("service");

    sessions.open(&target);
    sessions.write(&target, 0, b"name: api\n");
    sessions.write(&target, 10, b"port: 8080\n");
    let buffer = sessions.release(&target).unwrap();

    store
        .mutate(|root| resolve_mut(root, &target, true)?.set(infer_value(&buffer)))
        .unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("doc.yaml")).unwrap(),
        "service:\n  name: api\n  port: 8080\n"
    );
}
