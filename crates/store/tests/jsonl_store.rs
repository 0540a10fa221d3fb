use domain_records::DomainKey;
use domain_store::{JsonlStore, RecordStore};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::tempdir;

#[tokio::test]
async fn loads_mutates_and_persists_atomically() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("domains.jsonl");
    tokio::fs::write(
        &path,
        concat!(
            "{\"domain\":\"example\",\"tld\":\"com\",\"sub\":\"www\"}\n",
            "\n",
            "{\"domain\":\"example\",\"tld\":\"com\",\"sub\":\"www\"}\n",
            "{\"domain\":\"other\",\"tld\":\"org\",\"sub\":\"\"}\n",
        ),
    )
    .await
    .expect("write store");

    let store = JsonlStore::open(&path).await.expect("open");
    assert_eq!(store.count_all().await.unwrap(), 3);
    assert!(!store.is_dirty());

    let www = DomainKey::new("example", "com", "www");
    assert_eq!(store.delete_matching(&www).await.unwrap(), 2);
    store
        .insert_canonical("www.example.com")
        .await
        .expect("insert");
    assert!(store.is_dirty());

    store.persist().await.expect("persist");
    assert!(!store.is_dirty());
    assert!(!path.with_extension("jsonl.tmp").exists());

    let reopened = JsonlStore::open(&path).await.expect("reopen");
    assert_eq!(reopened.count_matching(&www).await.unwrap(), 1);
    assert_eq!(reopened.count_all().await.unwrap(), 2);
}

#[tokio::test]
async fn keeps_unparseable_lines_for_the_scan_to_report() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("domains.jsonl");
    tokio::fs::write(&path, "{\"domain\":\"a\",\"tld\":\"com\"}\nnot json at all\n")
        .await
        .expect("write store");

    let store = JsonlStore::open(&path).await.expect("open");
    let docs = store.documents();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1], Value::String("not json at all".to_string()));

    store.persist().await.expect("persist");
    let written = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(written.lines().nth(1), Some("not json at all"));
    assert_eq!(
        serde_json::from_str::<Value>(written.lines().next().unwrap()).unwrap(),
        json!({"domain": "a", "tld": "com"})
    );
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let temp = tempdir().expect("tempdir");
    let result = JsonlStore::open(temp.path().join("absent.jsonl")).await;
    assert!(matches!(result, Err(domain_store::StoreError::IoError(_))));
}

#[tokio::test]
async fn repair_leaves_unrelated_lines_byte_identical() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("domains.jsonl");
    let keep = r#"{"tld":"com","domain":"keep","sub":"","seen":1.50,"big":18446744073709551616}"#;
    let spaced = r#"{ "domain": "spaced", "tld": "org" }"#;
    tokio::fs::write(
        &path,
        format!(
            "{keep}\n\n{dup}\n{spaced}\n{dup}\n\n",
            dup = r#"{"domain":"dup","tld":"com","sub":""}"#
        ),
    )
    .await
    .expect("write store");

    let store = JsonlStore::open(&path).await.expect("open");
    let dup = DomainKey::new("dup", "com", "");
    assert_eq!(store.delete_matching(&dup).await.unwrap(), 2);
    store.insert_canonical("dup.com").await.expect("insert");
    store.persist().await.expect("persist");

    let written = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(
        written,
        format!("{keep}\n{spaced}\n{}\n\n", r#"{"domain":"dup","sub":"","tld":"com"}"#)
    );
}

#[tokio::test]
async fn persist_without_changes_reproduces_the_file() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("domains.jsonl");
    let original = "\n{\"tld\":\"net\",\"domain\":\"a\"}\n\n  \n{\"domain\":\"b\",\"tld\":\"io\",\"n\":1e3}\n\n";
    tokio::fs::write(&path, original).await.expect("write store");

    let store = JsonlStore::open(&path).await.expect("open");
    assert_eq!(store.count_all().await.unwrap(), 2);
    store.persist().await.expect("persist");

    assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), original);
}
