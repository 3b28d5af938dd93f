//! Lance-backed `EmbeddingCache`, persisted across runs.
//!
//! One table with columns `content_hash`, `embedder_id`, `created_at` and a
//! fixed-size `vector`. The table is created on first write, and writes
//! upsert on `(content_hash, embedder_id)`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::{
    FixedSizeListArray, RecordBatch, RecordBatchIterator, RecordBatchReader, StringArray, TimestampMillisecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};

use sopdesk_core::{Error, Result};

use crate::cache::{CacheEntry, EmbeddingCache};

pub fn build_cache_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("content_hash", DataType::Utf8, false),
        Field::new("embedder_id", DataType::Utf8, false),
        Field::new("created_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            true,
        ),
    ]))
}

pub struct LanceEmbeddingCache {
    conn: Connection,
    table: String,
    dim: i32,
}

impl LanceEmbeddingCache {
    pub async fn open(uri: &str, table: &str, dim: usize) -> Result<Self> {
        let conn = connect(uri).execute().await.map_err(Error::storage)?;
        let dim = i32::try_from(dim).map_err(|_| Error::InvalidConfig(format!("dimension {dim} too large")))?;
        Ok(Self { conn, table: table.to_string(), dim })
    }

    async fn table_exists(&self) -> Result<bool> {
        let names = self.conn.table_names().execute().await.map_err(Error::storage)?;
        Ok(names.contains(&self.table))
    }

    /// Rows currently stored; zero before the first write.
    pub async fn row_count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }
        let t = self.conn.open_table(&self.table).execute().await.map_err(Error::storage)?;
        t.count_rows(None).await.map_err(Error::storage)
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[async_trait]
impl EmbeddingCache for LanceEmbeddingCache {
    async fn get_many(&self, embedder_id: &str, hashes: &[String]) -> Result<HashMap<String, Vec<f32>>> {
        if hashes.is_empty() || !self.table_exists().await? {
            return Ok(HashMap::new());
        }
        let t = self.conn.open_table(&self.table).execute().await.map_err(Error::storage)?;
        let in_list = hashes.iter().map(|h| quote(h)).collect::<Vec<_>>().join(",");
        let filter = format!("embedder_id = {} AND content_hash IN ({})", quote(embedder_id), in_list);
        let mut stream = t.query().only_if(filter).execute().await.map_err(Error::storage)?;

        let mut out = HashMap::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::storage)? {
            let hash_col = batch
                .column_by_name("content_hash")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| Error::Storage("cache table missing content_hash".into()))?;
            let vec_col = batch
                .column_by_name("vector")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
                .ok_or_else(|| Error::Storage("cache table missing vector".into()))?;
            for i in 0..batch.num_rows() {
                let values = vec_col
                    .value(i)
                    .as_primitive::<arrow_array::types::Float32Type>()
                    .values()
                    .iter()
                    .copied()
                    .collect::<Vec<f32>>();
                if values.len() == self.dim as usize {
                    out.insert(hash_col.value(i).to_string(), values);
                }
            }
        }
        Ok(out)
    }

    async fn put_many(&self, entries: &[CacheEntry]) -> Result<()> {
        // one row per key; a later entry wins
        let entries: Vec<&CacheEntry> = entries
            .iter()
            .filter(|e| e.vector.len() == self.dim as usize)
            .map(|e| ((e.content_hash.as_str(), e.embedder_id.as_str()), e))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect();
        if entries.is_empty() {
            return Ok(());
        }
        let schema = build_cache_schema(self.dim);
        if !self.table_exists().await? {
            self.conn
                .create_empty_table(&self.table, schema.clone())
                .execute()
                .await
                .map_err(Error::storage)?;
        }
        let t = self.conn.open_table(&self.table).execute().await.map_err(Error::storage)?;

        let now = Utc::now().timestamp_millis();
        let hashes: Vec<String> = entries.iter().map(|e| e.content_hash.clone()).collect();
        let eids: Vec<String> = entries.iter().map(|e| e.embedder_id.clone()).collect();
        let created: Vec<i64> = entries.iter().map(|_| now).collect();
        let vectors: Vec<Option<Vec<Option<f32>>>> =
            entries.iter().map(|e| Some(e.vector.iter().map(|&x| Some(x)).collect())).collect();

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(hashes)),
                Arc::new(StringArray::from(eids)),
                Arc::new(TimestampMillisecondArray::from(created)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                    vectors, self.dim,
                )),
            ],
        )
        .map_err(Error::storage)?;
        let reader: Box<dyn RecordBatchReader + Send> =
            Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let mut mi = t.merge_insert(&["content_hash", "embedder_id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(Error::storage)?;
        tracing::debug!(entries = entries.len(), table = %self.table, "embedding cache updated");
        Ok(())
    }
}
