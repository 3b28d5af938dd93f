#![cfg(feature = "lance-cache")]

use tempfile::TempDir;

use sopdesk_vector::{CacheEntry, EmbeddingCache, LanceEmbeddingCache};

fn entry(hash: &str, embedder_id: &str, vector: Vec<f32>) -> CacheEntry {
    CacheEntry { content_hash: hash.to_string(), embedder_id: embedder_id.to_string(), vector }
}

async fn open(dir: &TempDir) -> LanceEmbeddingCache {
    let uri = dir.path().join("cache.lance");
    LanceEmbeddingCache::open(uri.to_str().unwrap(), "embeddings", 3).await.unwrap()
}

#[tokio::test]
async fn vectors_survive_reopening_the_cache() {
    let tmp = TempDir::new().unwrap();
    open(&tmp)
        .await
        .put_many(&[entry("h1", "hash:3", vec![1.0, 2.0, 3.0]), entry("h2", "hash:3", vec![4.0, 5.0, 6.0])])
        .await
        .unwrap();

    let cache = open(&tmp).await;
    let found = cache.get_many("hash:3", &["h1".into(), "h2".into(), "h3".into()]).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found["h1"], vec![1.0, 2.0, 3.0]);
    assert_eq!(found["h2"], vec![4.0, 5.0, 6.0]);
}

#[tokio::test]
async fn lookup_before_first_write_is_empty() {
    let tmp = TempDir::new().unwrap();
    let cache = open(&tmp).await;
    assert!(cache.get_many("hash:3", &["h1".into()]).await.unwrap().is_empty());
    assert_eq!(cache.row_count().await.unwrap(), 0);
}

#[tokio::test]
async fn entries_are_scoped_by_embedder() {
    let tmp = TempDir::new().unwrap();
    let cache = open(&tmp).await;
    cache
        .put_many(&[entry("h1", "openai:ada", vec![1.0, 1.0, 1.0]), entry("h1", "hash:3", vec![2.0, 2.0, 2.0])])
        .await
        .unwrap();

    let ada = cache.get_many("openai:ada", &["h1".into()]).await.unwrap();
    assert_eq!(ada["h1"], vec![1.0, 1.0, 1.0]);
    let local = cache.get_many("hash:3", &["h1".into()]).await.unwrap();
    assert_eq!(local["h1"], vec![2.0, 2.0, 2.0]);
    assert!(cache.get_many("other", &["h1".into()]).await.unwrap().is_empty());
}

#[tokio::test]
async fn quotes_in_keys_are_escaped() {
    let tmp = TempDir::new().unwrap();
    let cache = open(&tmp).await;
    cache.put_many(&[entry("it's", "o'brien", vec![0.5, 0.5, 0.5])]).await.unwrap();

    let found = cache.get_many("o'brien", &["it's".into()]).await.unwrap();
    assert_eq!(found["it's"], vec![0.5, 0.5, 0.5]);
}

#[tokio::test]
async fn wrong_dimension_vectors_are_not_written() {
    let tmp = TempDir::new().unwrap();
    let cache = open(&tmp).await;
    cache.put_many(&[entry("short", "hash:3", vec![1.0, 2.0])]).await.unwrap();
    assert_eq!(cache.row_count().await.unwrap(), 0);

    cache
        .put_many(&[entry("short", "hash:3", vec![1.0]), entry("ok", "hash:3", vec![1.0, 2.0, 3.0])])
        .await
        .unwrap();
    let found = cache.get_many("hash:3", &["short".into(), "ok".into()]).await.unwrap();
    assert_eq!(found.keys().collect::<Vec<_>>(), vec!["ok"]);
}

#[tokio::test]
async fn repeated_writes_keep_one_row_per_key() {
    let tmp = TempDir::new().unwrap();
    let cache = open(&tmp).await;
    cache.put_many(&[entry("h1", "hash:3", vec![1.0, 2.0, 3.0])]).await.unwrap();
    cache
        .put_many(&[entry("h1", "hash:3", vec![7.0, 8.0, 9.0]), entry("h1", "hash:3", vec![9.0, 9.0, 9.0])])
        .await
        .unwrap();

    assert_eq!(cache.row_count().await.unwrap(), 1);
    let found = cache.get_many("hash:3", &["h1".into()]).await.unwrap();
    assert_eq!(found["h1"], vec![9.0, 9.0, 9.0]);
}
