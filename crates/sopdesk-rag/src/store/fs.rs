//! JSON-on-disk store rooted at `storage.data_dir`.
//!
//! ```text
//! <root>/documents/<id>.<ext>   raw document bytes, id = file stem
//! <root>/faqs.json              [{ "id", "question" }]
//! <root>/threads.json           [EmailThread]
//! <root>/verdicts.json          [CoverageVerdict], one per (faq_id, document_id)
//! <root>/sentiments.json        [SentimentRecord], one per thread
//! ```
//!
//! Writes go to a temp file in `<root>` which is then renamed over the
//! target, so readers never see a half-written file.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use walkdir::WalkDir;

use sopdesk_core::traits::{DocumentStore, EmailThreadStore, FaqStore, SentimentStore, VerdictStore};
use sopdesk_core::types::{CoverageVerdict, EmailThread, Faq, SentimentRecord};
use sopdesk_core::{Error, Result};

use super::memory::upsert_verdict;

const FAQS: &str = "faqs.json";
const THREADS: &str = "threads.json";
const VERDICTS: &str = "verdicts.json";
const SENTIMENTS: &str = "sentiments.json";

pub struct FsStore {
    root: PathBuf,
    // serialises read-modify-write of the JSON files
    write_lock: Mutex<()>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), write_lock: Mutex::new(()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.root.join("documents")
    }

    /// Ids of every stored document, sorted.
    pub async fn list_documents(&self) -> Result<Vec<String>> {
        let dir = self.documents_dir();
        blocking(move || {
            let mut ids: Vec<String> = document_files(&dir).into_iter().map(|(id, _)| id).collect();
            ids.sort();
            ids.dedup();
            Ok(ids)
        })
        .await
    }

    /// All verdicts currently on disk.
    pub async fn verdicts(&self) -> Result<Vec<CoverageVerdict>> {
        self.read_list(VERDICTS).await
    }

    async fn read_list<T>(&self, name: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let path = self.root.join(name);
        blocking(move || read_json_list(&path)).await
    }

    async fn write_list<T>(&self, name: &str, items: Vec<T>) -> Result<()>
    where
        T: Serialize + Send + 'static,
    {
        let root = self.root.clone();
        let name = name.to_string();
        blocking(move || write_json_atomic(&root, &name, &items)).await
    }
}

fn document_files(dir: &Path) -> Vec<(String, PathBuf)> {
    WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let stem = e.path().file_stem()?.to_str()?.to_string();
            Some((stem, e.into_path()))
        })
        .collect()
}

/// A missing file is an empty list.
fn read_json_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Storage(format!("{}: {e}", path.display()))),
    };
    serde_json::from_slice(&bytes).map_err(|e| Error::Storage(format!("{}: {e}", path.display())))
}

fn write_json_atomic<T: Serialize>(root: &Path, name: &str, value: &T) -> Result<()> {
    std::fs::create_dir_all(root).map_err(Error::storage)?;
    let mut tmp = tempfile::NamedTempFile::new_in(root).map_err(Error::storage)?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(Error::storage)?;
    tmp.write_all(b"\n").map_err(Error::storage)?;
    tmp.as_file().sync_all().map_err(Error::storage)?;
    tmp.persist(root.join(name)).map_err(|e| Error::storage(e.error))?;
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(Error::storage)?
}

#[async_trait]
impl DocumentStore for FsStore {
    async fn get_content(&self, document_id: &str) -> Result<Vec<u8>> {
        let dir = self.documents_dir();
        let id = document_id.to_string();
        blocking(move || {
            let mut matches: Vec<PathBuf> =
                document_files(&dir).into_iter().filter(|(stem, _)| *stem == id).map(|(_, p)| p).collect();
            matches.sort();
            let path = matches.into_iter().next().ok_or_else(|| Error::NotFound(format!("document {id}")))?;
            tracing::debug!(document_id = %id, path = %path.display(), "reading document");
            std::fs::read(&path).map_err(|e| Error::Storage(format!("{}: {e}", path.display())))
        })
        .await
    }
}

#[async_trait]
impl FaqStore for FsStore {
    async fn list(&self) -> Result<Vec<Faq>> {
        self.read_list(FAQS).await
    }
}

#[async_trait]
impl VerdictStore for FsStore {
    async fn save(&self, verdict: &CoverageVerdict) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut verdicts: Vec<CoverageVerdict> = self.read_list(VERDICTS).await?;
        upsert_verdict(&mut verdicts, verdict.clone());
        self.write_list(VERDICTS, verdicts).await
    }
}

#[async_trait]
impl EmailThreadStore for FsStore {
    async fn get_thread(&self, thread_id: &str) -> Result<EmailThread> {
        self.list_threads()
            .await?
            .into_iter()
            .find(|t| t.id == thread_id)
            .ok_or_else(|| Error::NotFound(format!("thread {thread_id}")))
    }

    async fn list_threads(&self) -> Result<Vec<EmailThread>> {
        self.read_list(THREADS).await
    }
}

#[async_trait]
impl SentimentStore for FsStore {
    async fn latest(&self, thread_id: &str) -> Result<Option<SentimentRecord>> {
        let records: Vec<SentimentRecord> = self.read_list(SENTIMENTS).await?;
        Ok(records.into_iter().find(|r| r.thread_id == thread_id))
    }

    async fn record(&self, record: &SentimentRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records: Vec<SentimentRecord> = self.read_list(SENTIMENTS).await?;
        match records.iter_mut().find(|r| r.thread_id == record.thread_id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.write_list(SENTIMENTS, records).await
    }
}
