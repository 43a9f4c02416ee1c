use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use yamlfs_core_store::{path, Error, Format, Path, Value};
use yamlfs_fuse::{DirEntry, EntryKind, Projection, ProjectionConfig};

const DOC: &str = "\
name: demo
db:
  host: localhost
  port: 5432
tags:
  - a
  - b
motd: |
  Welcome
  to the box
";

fn setup(content: &str) -> (tempfile::TempDir, PathBuf, Projection) {
    setup_with(content, ProjectionConfig::default())
}

fn setup_with(content: &str, config: ProjectionConfig) -> (tempfile::TempDir, PathBuf, Projection) {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("doc.yaml");
    fs::write(&doc, content).unwrap();
    let projection = Projection::new(&doc, config);
    (dir, doc, projection)
}

fn read_all(projection: &Projection, path: &Path) -> String {
    String::from_utf8(projection.read(path, 0, 1 << 20).unwrap()).unwrap()
}

/// Open, write everything at offset zero, release.
fn write_file(projection: &Projection, path: &Path, content: &str) {
    let file = projection.open(path, true).unwrap();
    projection.write(&file, 0, content.as_bytes()).unwrap();
    projection.release(file).unwrap();
}

/// Create a new file, write `content`, release.
fn create_file(projection: &Projection, path: &Path, content: &str) {
    let (_, file) = projection.create(path).unwrap();
    projection.write(&file, 0, content.as_bytes()).unwrap();
    projection.release(file).unwrap();
}

/// Rewrite the document behind the projection's back, one step in the future.
fn edit_on_disk(doc: &std::path::Path, content: &str) {
    fs::write(doc, content).unwrap();
    let later = SystemTime::now() + Duration::from_secs(5);
    fs::File::options()
        .write(true)
        .open(doc)
        .unwrap()
        .set_modified(later)
        .unwrap();
}

fn names(entries: &[DirEntry]) -> Vec<&str> {
    entries.iter().map(|entry| entry.name.as_str()).collect()
}

fn on_disk(doc: &std::path::Path) -> String {
    fs::read_to_string(doc).unwrap()
}

#[test]
fn test_root_listing_follows_document_order() {
    let (_dir, _doc, projection) = setup(DOC);

    let entries = projection.list(&Path::root()).unwrap();
    assert_eq!(names(&entries), vec!["name", "db", "tags", "motd"]);
    assert_eq!(entries[1].kind, EntryKind::Directory);
    assert_eq!(entries[2].kind, EntryKind::File);
}

#[test]
fn test_listing_a_scalar_is_not_directory() {
    let (_dir, _doc, projection) = setup(DOC);

    let err = projection.list(&path!("name")).unwrap_err();
    assert_eq!(err.errno(), libc::ENOTDIR);
    assert_eq!(
        projection.list(&path!("missing")).unwrap_err().errno(),
        libc::ENOENT
    );
}

#[test]
fn test_sequence_items_readable_but_not_listed() {
    let (_dir, _doc, projection) = setup(DOC);

    assert!(!projection.getattr(&path!("tags")).unwrap().is_dir());
    assert_eq!(read_all(&projection, &path!("tags")), "- a\n- b\n");
    assert_eq!(read_all(&projection, &path!("tags/1")), "b");
}

#[test]
fn test_getattr_modes_and_sizes() {
    let (_dir, _doc, projection) = setup(DOC);

    let root = projection.getattr(&Path::root()).unwrap();
    assert!(root.is_dir());
    assert_eq!(root.perm(), 0o755);

    let db = projection.getattr(&path!("db")).unwrap();
    assert!(db.is_dir());
    assert_eq!(db.nlink(), 2);

    let name = projection.getattr(&path!("name")).unwrap();
    assert!(!name.is_dir());
    assert_eq!(name.perm(), 0o644);
    assert_eq!(name.size, 4);

    // "5432\n"
    assert_eq!(projection.getattr(&path!("db/port")).unwrap().size, 5);
    assert_eq!(
        projection.getattr(&path!("db/user")).unwrap_err().errno(),
        libc::ENOENT
    );
}

#[test]
fn test_size_matches_read_for_every_presentation() {
    let (_dir, _doc, projection) = setup(DOC);

    for p in [
        path!("db"),
        path!("db.json"),
        path!("db.yml"),
        path!("tags.json"),
        path!("motd"),
        path!("db/port.json"),
    ] {
        let size = projection.getattr(&p).unwrap().size;
        assert_eq!(size as usize, read_all(&projection, &p).len(), "{}", p);
    }
}

#[test]
fn test_read_presentations() {
    let (_dir, _doc, projection) = setup(DOC);

    assert_eq!(read_all(&projection, &path!("name")), "demo");
    assert_eq!(read_all(&projection, &path!("name.json")), "demo");
    assert_eq!(read_all(&projection, &path!("motd")), "Welcome\nto the box\n");
    assert_eq!(read_all(&projection, &path!("db/port")), "5432\n");
    assert_eq!(
        read_all(&projection, &path!("db.yaml")),
        "host: localhost\nport: 5432\n"
    );
    assert_eq!(
        read_all(&projection, &path!("db.json")),
        "{\n  \"host\": \"localhost\",\n  \"port\": 5432\n}\n"
    );
    assert_eq!(read_all(&projection, &path!("tags.json")), "[\n  \"a\",\n  \"b\"\n]\n");
}

#[test]
fn test_json_default_presentation() {
    let config = ProjectionConfig {
        default_format: Format::JSON,
        ..ProjectionConfig::default()
    };
    let (_dir, _doc, projection) = setup_with(DOC, config);

    assert_eq!(read_all(&projection, &path!("tags")), "[\n  \"a\",\n  \"b\"\n]\n");
    assert_eq!(read_all(&projection, &path!("tags.yaml")), "- a\n- b\n");
}

#[test]
fn test_read_window() {
    let (_dir, _doc, projection) = setup(DOC);

    assert_eq!(projection.read(&path!("motd"), 8, 2).unwrap(), b"to");
    assert!(projection.read(&path!("motd"), 500, 10).unwrap().is_empty());
}

#[test]
fn test_read_directory_is_eisdir() {
    let (_dir, _doc, projection) = setup(DOC);

    assert_eq!(
        projection.read(&path!("db"), 0, 10).unwrap_err().errno(),
        libc::EISDIR
    );
    assert_eq!(
        projection.open(&path!("db"), false).unwrap_err().errno(),
        libc::EISDIR
    );
}

#[test]
fn test_write_commits_on_release() {
    let (_dir, doc, projection) = setup(DOC);
    let p = path!("db/port");

    let file = projection.open(&p, true).unwrap();
    projection.write(&file, 0, b"6543\n").unwrap();
    // Nothing reaches the tree before release
    assert_eq!(read_all(&projection, &p), "5432\n");

    projection.release(file).unwrap();
    assert_eq!(read_all(&projection, &p), "6543\n");
    assert!(on_disk(&doc).contains("port: 6543\n"));
}

#[test]
fn test_write_infers_structure() {
    let (_dir, doc, projection) = setup(DOC);

    create_file(&projection, &path!("service"), "name: api\nport: 8080\n");
    assert!(projection.getattr(&path!("service")).unwrap().is_dir());
    assert_eq!(read_all(&projection, &path!("service/port")), "8080\n");
    assert!(on_disk(&doc).contains("service:\n  name: api\n  port: 8080\n"));

    create_file(&projection, &path!("list"), "- x\n- y\n");
    let root = projection.document().snapshot();
    assert_eq!(root.get(&path!("list")), Some(&Value::from(vec!["x", "y"])));
}

#[test]
fn test_write_keeps_text_literal() {
    let (_dir, _doc, projection) = setup(DOC);

    create_file(&projection, &path!("note"), "a\n- b");
    assert_eq!(read_all(&projection, &path!("note")), "a\n- b");

    create_file(&projection, &path!("greeting"), "hello world\n");
    assert_eq!(read_all(&projection, &path!("greeting")), "hello world");

    create_file(&projection, &path!("poem"), "roses\nare red\n");
    assert_eq!(read_all(&projection, &path!("poem")), "roses\nare red\n");
}

#[test]
fn test_write_through_suffix_lands_on_stem() {
    let (_dir, _doc, projection) = setup(DOC);

    write_file(&projection, &path!("db/port.json"), "7000\n");
    let root = projection.document().snapshot();
    assert_eq!(root.get(&path!("db/port")), Some(&Value::Integer(7000)));
    assert!(root.get(&path!("db/port.json")).is_none());
}

#[test]
fn test_open_missing_file_is_enoent() {
    let (_dir, _doc, projection) = setup(DOC);
    assert_eq!(
        projection.open(&path!("db/user"), true).unwrap_err().errno(),
        libc::ENOENT
    );
}

#[test]
fn test_session_commits_after_last_handle() {
    let (_dir, _doc, projection) = setup(DOC);
    let p = path!("name");

    let first = projection.open(&p, true).unwrap();
    let second = projection.open(&p, true).unwrap();
    projection.write(&first, 0, b"first").unwrap();
    projection.write(&second, 5, b"-second").unwrap();

    projection.release(first).unwrap();
    assert_eq!(read_all(&projection, &p), "demo");

    projection.release(second).unwrap();
    assert_eq!(read_all(&projection, &p), "first-second");
}

#[test]
fn test_read_only_open_does_not_commit() {
    let (_dir, _doc, projection) = setup(DOC);
    let p = path!("name");

    let file = projection.open(&p, false).unwrap();
    assert_eq!(
        projection.write(&file, 0, b"nope").unwrap_err().errno(),
        libc::EPERM
    );
    projection.release(file).unwrap();
    assert_eq!(read_all(&projection, &p), "demo");
}

#[test]
fn test_truncate_to_zero_stores_empty_string() {
    let (_dir, _doc, projection) = setup(DOC);

    projection.truncate(&path!("db/port"), 0).unwrap();
    let root = projection.document().snapshot();
    assert_eq!(root.get(&path!("db/port")), Some(&Value::from("")));
    assert_eq!(projection.getattr(&path!("db/port")).unwrap().size, 0);
}

#[test]
fn test_truncate_keeps_prefix() {
    let (_dir, _doc, projection) = setup(DOC);

    projection.truncate(&path!("motd"), 7).unwrap();
    assert_eq!(read_all(&projection, &path!("motd")), "Welcome");

    // "5432\n" cut to "54" re-infers an integer
    projection.truncate(&path!("db/port"), 2).unwrap();
    let root = projection.document().snapshot();
    assert_eq!(root.get(&path!("db/port")), Some(&Value::Integer(54)));
}

#[test]
fn test_truncate_then_write_replaces_content() {
    let (_dir, _doc, projection) = setup(DOC);
    let p = path!("name");

    let file = projection.open(&p, true).unwrap();
    projection.truncate(&p, 0).unwrap();
    projection.write(&file, 0, b"renamed\n").unwrap();
    projection.release(file).unwrap();

    assert_eq!(read_all(&projection, &p), "renamed");
}

#[test]
fn test_truncate_directory_is_eisdir() {
    let (_dir, _doc, projection) = setup(DOC);
    assert_eq!(
        projection.truncate(&path!("db"), 0).unwrap_err().errno(),
        libc::EISDIR
    );
}

#[test]
fn test_create_makes_empty_file_and_parents() {
    let (_dir, doc, projection) = setup(DOC);
    let p = path!("cache/redis/url");

    let (attr, file) = projection.create(&p).unwrap();
    assert!(!attr.is_dir());
    assert_eq!(attr.size, 0);
    assert!(projection.getattr(&path!("cache/redis")).unwrap().is_dir());

    projection.write(&file, 0, b"redis://localhost\n").unwrap();
    projection.release(file).unwrap();
    assert_eq!(read_all(&projection, &p), "redis://localhost");
    assert!(on_disk(&doc).contains("redis://localhost"));
}

#[test]
fn test_create_over_directory_is_eisdir() {
    let (_dir, _doc, projection) = setup(DOC);
    assert_eq!(
        projection.create(&path!("db")).unwrap_err().errno(),
        libc::EISDIR
    );
}

#[test]
fn test_create_under_scalar_is_enotdir() {
    let (_dir, _doc, projection) = setup(DOC);
    assert_eq!(
        projection.create(&path!("name/child")).unwrap_err().errno(),
        libc::ENOTDIR
    );
}

#[test]
fn test_unlink_and_rmdir() {
    let (_dir, doc, projection) = setup(DOC);

    projection.unlink(&path!("name")).unwrap();
    projection.rmdir(&path!("db")).unwrap();

    let entries = projection.list(&Path::root()).unwrap();
    assert_eq!(names(&entries), vec!["tags", "motd"]);
    assert!(!on_disk(&doc).contains("localhost"));

    assert_eq!(
        projection.unlink(&path!("name")).unwrap_err().errno(),
        libc::ENOENT
    );
}

#[test]
fn test_mkdir() {
    let (_dir, _doc, projection) = setup(DOC);

    projection.mkdir(&path!("a/b/c")).unwrap();
    assert!(projection.getattr(&path!("a/b/c")).unwrap().is_dir());
    assert!(projection.list(&path!("a/b/c")).unwrap().is_empty());

    assert_eq!(
        projection.mkdir(&path!("db")).unwrap_err().errno(),
        libc::ENOTDIR
    );
    assert_eq!(
        projection.mkdir(&path!(".git")).unwrap_err().errno(),
        libc::EPERM
    );
}

#[test]
fn test_mkdir_replaces_scalar() {
    let (_dir, _doc, projection) = setup(DOC);

    projection.mkdir(&path!("name")).unwrap();
    assert!(projection.getattr(&path!("name")).unwrap().is_dir());
}

#[test]
fn test_hidden_files_stay_in_memory() {
    let (_dir, doc, projection) = setup(DOC);
    let swap = path!("db/.port.swp");

    let (_, file) = projection.create(&swap).unwrap();
    projection.write(&file, 0, b"swap data").unwrap();
    projection.release(file).unwrap();

    assert_eq!(read_all(&projection, &swap), "swap data");
    assert_eq!(projection.getattr(&swap).unwrap().size, 9);
    assert!(names(&projection.list(&path!("db")).unwrap()).contains(&".port.swp"));
    assert!(!on_disk(&doc).contains("swp"));

    projection.truncate(&swap, 4).unwrap();
    assert_eq!(read_all(&projection, &swap), "swap");

    projection.unlink(&swap).unwrap();
    assert_eq!(projection.getattr(&swap).unwrap_err().errno(), libc::ENOENT);
    assert_eq!(
        projection.open(&swap, false).unwrap_err().errno(),
        libc::ENOENT
    );
}

#[test]
fn test_ephemeral_files_listed_after_keys() {
    let (_dir, _doc, projection) = setup("visible: 1\n");
    projection.create(&path!(".lock")).unwrap();

    let entries = projection.list(&Path::root()).unwrap();
    assert_eq!(names(&entries), vec!["visible", ".lock"]);
}

#[test]
fn test_literal_key_wins_over_suffix() {
    let (_dir, _doc, projection) = setup("notes.yaml: literal\nnotes:\n  a: 1\n");

    assert_eq!(read_all(&projection, &path!("notes.yaml")), "literal");
    assert_eq!(read_all(&projection, &path!("notes.json")), "{\n  \"a\": 1\n}\n");
}

#[test]
fn test_suffixed_mapping_is_a_file() {
    let (_dir, doc, projection) = setup(DOC);

    let attr = projection.getattr(&path!("db.json")).unwrap();
    assert!(!attr.is_dir());
    assert!(projection.getattr(&path!("db")).unwrap().is_dir());
    assert_eq!(
        projection.list(&path!("db.json")).unwrap_err().errno(),
        libc::ENOTDIR
    );

    write_file(&projection, &path!("db.json"), "{\"host\": \"db.internal\"}\n");
    assert_eq!(read_all(&projection, &path!("db/host")), "db.internal");
    assert!(projection.getattr(&path!("db/port")).is_err());
    assert!(on_disk(&doc).contains("db:\n  host: db.internal\n"));

    projection.truncate(&path!("db.yaml"), 0).unwrap();
    assert!(!projection.getattr(&path!("db")).unwrap().is_dir());
}

#[test]
fn test_release_after_out_of_band_edit_keeps_external_keys() {
    let (_dir, doc, projection) = setup("a: 1\n");
    let p = path!("a");

    let file = projection.open(&p, true).unwrap();
    projection.write(&file, 0, b"2\n").unwrap();
    edit_on_disk(&doc, "a: 1\nb: external\n");
    projection.release(file).unwrap();

    assert_eq!(read_all(&projection, &p), "2\n");
    assert_eq!(read_all(&projection, &path!("b")), "external");
    assert_eq!(on_disk(&doc), "a: 2\nb: external\n");
}

#[test]
fn test_mutations_after_out_of_band_edit_keep_external_keys() {
    let (_dir, doc, projection) = setup("a: 1\n");

    edit_on_disk(&doc, "a: 1\nb: external\n");
    projection.mkdir(&path!("dir")).unwrap();
    assert_eq!(read_all(&projection, &path!("b")), "external");

    edit_on_disk(&doc, "a: 1\nb: external\nc: again\ndir: {}\n");
    create_file(&projection, &path!("d"), "4\n");
    assert_eq!(read_all(&projection, &path!("c")), "again");

    edit_on_disk(&doc, "a: 1\nb: external\nc: again\ndir: {}\nd: 4\ne: more\n");
    projection.unlink(&path!("a")).unwrap();

    let on_disk = on_disk(&doc);
    for key in ["b: external", "c: again", "dir: {}", "d: 4", "e: more"] {
        assert!(on_disk.contains(key), "{} missing from {:?}", key, on_disk);
    }
    assert!(!on_disk.contains("a: 1"));
}

#[test]
fn test_huge_sequence_index_is_efbig() {
    let (_dir, doc, projection) = setup(DOC);
    let far = path!("tags/99999999999");

    assert_eq!(projection.create(&far).unwrap_err().errno(), libc::EFBIG);
    assert_eq!(
        projection.truncate(&far, 0).unwrap_err().errno(),
        libc::EFBIG
    );

    let root = projection.document().snapshot();
    assert_eq!(root.get(&path!("tags")), Some(&Value::from(vec!["a", "b"])));
    assert!(!projection.document().is_dirty());
    assert_eq!(on_disk(&doc), DOC);
}

#[test]
fn test_huge_hidden_offset_is_efbig() {
    let (_dir, _doc, projection) = setup(DOC);
    let swap = path!(".swap");

    let (_, file) = projection.create(&swap).unwrap();
    assert_eq!(
        projection.write(&file, 1 << 40, b"x").unwrap_err().errno(),
        libc::EFBIG
    );
    assert_eq!(
        projection.write(&file, u64::MAX, b"x").unwrap_err().errno(),
        libc::EFBIG
    );
    assert_eq!(
        projection.truncate(&swap, 1 << 40).unwrap_err().errno(),
        libc::EFBIG
    );
    assert_eq!(projection.getattr(&swap).unwrap().size, 0);
    projection.release(file).unwrap();
}

#[test]
fn test_out_of_band_edit_is_picked_up() {
    let (_dir, doc, projection) = setup(DOC);
    assert_eq!(read_all(&projection, &path!("name")), "demo");

    edit_on_disk(&doc, "name: edited\n");

    assert_eq!(read_all(&projection, &path!("name")), "edited");
    assert_eq!(names(&projection.list(&Path::root()).unwrap()), vec!["name"]);
}

#[test]
fn test_missing_document_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("new.yaml");
    let projection = Projection::new(&doc, ProjectionConfig::default());

    assert!(projection.list(&Path::root()).unwrap().is_empty());

    create_file(&projection, &path!("first"), "1\n");
    assert_eq!(on_disk(&doc), "first: 1\n");
}

#[test]
fn test_scalar_root_lists_nothing() {
    let (_dir, _doc, projection) = setup("just a string\n");

    assert!(projection.list(&Path::root()).unwrap().is_empty());
    assert!(projection.getattr(&Path::root()).unwrap().is_dir());
}

#[test]
fn test_escaped_newline_repair() {
    let content = "text: \"line one\\\\nline two\"\n";
    let config = ProjectionConfig {
        repair_escaped_newlines: true,
        ..ProjectionConfig::default()
    };

    let (_dir, _doc, repaired) = setup_with(content, config);
    assert_eq!(read_all(&repaired, &path!("text")), "line one\nline two");

    let (_dir, _doc, untouched) = setup(content);
    assert_eq!(read_all(&untouched, &path!("text")), "line one\\nline two");
}

#[test]
fn test_flush_and_fsync_are_clean() {
    let (_dir, _doc, projection) = setup(DOC);

    projection.flush(&path!("name")).unwrap();
    projection.fsync(&path!("name")).unwrap();
    assert!(!projection.document().is_dirty());
}

#[test]
fn test_access_and_utimens() {
    let (_dir, _doc, projection) = setup(DOC);

    projection.access(&path!("db/host")).unwrap();
    projection.utimens(&path!("name")).unwrap();
    assert!(matches!(
        projection.access(&path!("nope")),
        Err(Error::NotFound { .. })
    ));
}
