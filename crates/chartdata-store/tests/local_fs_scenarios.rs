use chartdata_model::RelativePath;
use chartdata_store::{ContentStore, LocalFs, StoreConfig};
use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn rel(s: &str) -> RelativePath {
    RelativePath::parse(s).expect("relative path")
}

fn store_for(root: &Path) -> Arc<ContentStore> {
    let cfg = StoreConfig {
        base_dir_candidates: vec![root.to_path_buf()],
        ..StoreConfig::default()
    };
    ContentStore::new(cfg, Arc::new(LocalFs))
}

fn seed(root: &Path) {
    fs::create_dir_all(root.join("AAPL")).expect("create AAPL");
    fs::create_dir_all(root.join("EMPTY")).expect("create EMPTY");
    fs::create_dir_all(root.join("MSFT")).expect("create MSFT");
    fs::write(root.join("AAPL/D.json"), r#"{"candles": [1, 2, 3]}"#).expect("write AAPL/D");
    fs::write(root.join("MSFT/D.json"), r#"{"candles": [4]}"#).expect("write MSFT/D");
    fs::write(root.join("MSFT/H.json"), r#"{"candles": [5, 6]}"#).expect("write MSFT/H");
    fs::write(root.join("MSFT/notes.txt"), "not a data file").expect("write notes");
}

#[tokio::test]
async fn scans_dataset_folders_on_disk() {
    let tmp = tempdir().expect("tempdir");
    seed(tmp.path());
    let store = store_for(tmp.path());

    let folders = store.folder_index().await.expect("folder index");
    let names: Vec<&str> = folders.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["AAPL", "MSFT"]);
    let paths: Vec<&str> = folders
        .iter()
        .flat_map(|f| f.files.iter())
        .map(|d| d.relative_path.as_str())
        .collect();
    assert_eq!(paths, ["AAPL/D.json", "MSFT/D.json", "MSFT/H.json"]);
}

#[tokio::test]
async fn repeated_reads_hit_the_cache() {
    let tmp = tempdir().expect("tempdir");
    seed(tmp.path());
    let store = store_for(tmp.path());

    let first = store.file_data(&rel("AAPL/D.json")).await.expect("first read");
    let second = store.file_data(&rel("AAPL/D.json")).await.expect("second read");
    assert_eq!(first, second);
    assert_eq!(store.metrics.file_reads.load(Ordering::Relaxed), 1);
    assert_eq!(store.metrics.file_hits.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn modified_file_is_served_fresh() {
    let tmp = tempdir().expect("tempdir");
    seed(tmp.path());
    let store = store_for(tmp.path());

    store.file_data(&rel("AAPL/D.json")).await.expect("first read");

    let path = tmp.path().join("AAPL/D.json");
    fs::write(&path, r#"{"candles": [7, 8]}"#).expect("rewrite file");
    // bump the timestamp explicitly to sidestep coarse filesystem clocks
    let file = File::options().write(true).open(&path).expect("open for touch");
    file.set_modified(SystemTime::now() + Duration::from_secs(5))
        .expect("set mtime");

    let updated = store.file_data(&rel("AAPL/D.json")).await.expect("fresh read");
    assert_eq!(updated["candles"][0], 7);
    assert_eq!(store.metrics.file_reads.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn missing_base_dir_reports_candidates() {
    let tmp = tempdir().expect("tempdir");
    let gone = tmp.path().join("never-created");
    let store = store_for(&gone);

    let err = store.folder_index().await.expect_err("unresolved base dir");
    assert!(err.message.contains("never-created"));
    assert!(err.message.contains("cwd"));
}
