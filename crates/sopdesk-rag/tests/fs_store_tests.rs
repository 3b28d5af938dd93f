use std::fs;

use sopdesk_core::traits::{DocumentStore, EmailThreadStore, FaqStore, SentimentStore, VerdictStore};
use sopdesk_core::types::{CoverageType, CoverageVerdict, Sentiment, SentimentRecord};
use sopdesk_core::Error;
use sopdesk_rag::store::FsStore;
use tempfile::TempDir;

fn seeded() -> (TempDir, FsStore) {
    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("documents");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("returns.txt"), "Returns must be filed within 30 days.").unwrap();
    fs::write(docs.join("shipping.md"), "# Shipping").unwrap();
    fs::write(
        dir.path().join("faqs.json"),
        r#"[{"id": "f1", "question": "How long do refunds take?"}]"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("threads.json"),
        r#"[{"id": "t1", "topic": "Refund", "messages": [
            {"sender_name": "Ann", "sender_email": "ann@example.com", "content": "Hello"}
        ]}]"#,
    )
    .unwrap();
    let store = FsStore::new(dir.path());
    (dir, store)
}

fn verdict(faq: &str, coverage_type: CoverageType, reason: &str) -> CoverageVerdict {
    CoverageVerdict { faq_id: faq.into(), document_id: "returns".into(), coverage_type, reason: reason.into() }
}

#[tokio::test]
async fn documents_are_addressed_by_file_stem() {
    let (_dir, store) = seeded();
    assert_eq!(store.list_documents().await.unwrap(), ["returns", "shipping"]);
    assert_eq!(store.get_content("returns").await.unwrap(), b"Returns must be filed within 30 days.");
    assert!(matches!(store.get_content("missing").await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn reference_data_is_read_from_json() {
    let (_dir, store) = seeded();
    assert_eq!(store.list().await.unwrap()[0].question, "How long do refunds take?");
    let thread = store.get_thread("t1").await.unwrap();
    assert_eq!(thread.messages[0].sender_email, "ann@example.com");
    assert!(!thread.messages[0].from_support);
    assert!(matches!(store.get_thread("t2").await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn verdicts_are_upserted_atomically() {
    let (dir, store) = seeded();
    store.save(&verdict("f1", CoverageType::NotCovered, "first")).await.unwrap();
    store.save(&verdict("f2", CoverageType::PartiallyCovered, "other")).await.unwrap();
    store.save(&verdict("f1", CoverageType::FullyCovered, "second")).await.unwrap();

    let saved = store.verdicts().await.unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].reason, "second");

    let raw = fs::read_to_string(dir.path().join("verdicts.json")).unwrap();
    assert!(raw.contains("\"Fully Covered\""));
    let stray: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
        .collect();
    assert!(stray.is_empty());
}

#[tokio::test]
async fn missing_files_read_as_empty() {
    let dir = TempDir::new().unwrap();
    let store = FsStore::new(dir.path());
    assert!(store.list().await.unwrap().is_empty());
    assert!(store.list_threads().await.unwrap().is_empty());
    assert!(store.latest("t1").await.unwrap().is_none());
}

#[tokio::test]
async fn corrupt_json_is_a_storage_error() {
    let (dir, store) = seeded();
    fs::write(dir.path().join("faqs.json"), "[{").unwrap();
    assert!(matches!(store.list().await, Err(Error::Storage(_))));
}

#[tokio::test]
async fn sentiment_records_replace_per_thread() {
    let (_dir, store) = seeded();
    let at = chrono::Utc::now();
    for sentiment in [Sentiment::Neutral, Sentiment::Critical] {
        store
            .record(&SentimentRecord { thread_id: "t1".into(), sentiment, updated_at: at })
            .await
            .unwrap();
    }
    assert_eq!(store.latest("t1").await.unwrap().unwrap().sentiment, Sentiment::Critical);
}
