//! In-memory poem corpus.
//!
//! The corpus is a JSON array of embedded records produced by the corpus
//! builder. It is loaded once at startup, validated as a whole and then only
//! read. Any record that breaks an invariant fails the load; nothing is
//! skipped silently.

use crate::error::{RetrievalError, RetrievalResult};
use crate::types::{CorpusManifest, CorpusStats, Document, UNKNOWN};
use harmony_core::{AppError, AppResult};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A corpus record as it appears on disk, before defaulting and validation.
#[derive(Debug, Deserialize)]
struct CorpusRecord {
    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    author: Option<String>,

    #[serde(default, alias = "category")]
    dynasty: Option<String>,

    #[serde(default)]
    content: Option<String>,

    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

impl From<Document> for CorpusRecord {
    fn from(doc: Document) -> Self {
        Self {
            title: Some(doc.title),
            author: Some(doc.author),
            dynasty: Some(doc.dynasty),
            content: Some(doc.content),
            embedding: Some(doc.embedding),
        }
    }
}

/// Read-only collection of embedded documents sharing one dimensionality.
#[derive(Debug, Clone, Default)]
pub struct CorpusStore {
    documents: Vec<Document>,
    dimensions: Option<usize>,
    manifest: Option<CorpusManifest>,
}

impl CorpusStore {
    /// Load and validate a corpus file.
    ///
    /// If a manifest sidecar exists next to the file it is checked against
    /// the loaded documents (count, dimensionality and checksum).
    pub fn load(path: &Path) -> RetrievalResult<Self> {
        let bytes = fs::read(path).map_err(|source| RetrievalError::CorpusUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let records: Vec<CorpusRecord> = serde_json::from_slice(&bytes).map_err(|e| {
            RetrievalError::integrity(format!("malformed corpus JSON in {:?}: {}", path, e))
        })?;

        let mut store = Self::from_records(records)?;

        let manifest_file = manifest_path(path);
        if manifest_file.exists() {
            let manifest = read_manifest(&manifest_file)?;
            let checksum = sha256_hex(&bytes);
            if manifest.sha256 != checksum {
                return Err(RetrievalError::integrity(format!(
                    "checksum mismatch for {:?}: manifest records {}, file hashes to {}",
                    path, manifest.sha256, checksum
                )));
            }
            store = store.with_manifest(manifest)?;
        } else {
            tracing::debug!("No manifest found at {:?}", manifest_file);
        }

        tracing::info!(
            "Loaded corpus {:?}: {} documents, {} dimensions",
            path,
            store.len(),
            store
                .dimensions
                .map(|d| d.to_string())
                .unwrap_or_else(|| "n/a".to_string())
        );

        Ok(store)
    }

    /// Build a corpus from documents already in memory, applying the same
    /// defaulting and validation as [`CorpusStore::load`].
    pub fn from_documents(documents: Vec<Document>) -> RetrievalResult<Self> {
        Self::from_records(documents.into_iter().map(CorpusRecord::from).collect())
    }

    fn from_records(records: Vec<CorpusRecord>) -> RetrievalResult<Self> {
        let mut documents = Vec::with_capacity(records.len());
        let mut dimensions: Option<usize> = None;

        for (index, record) in records.into_iter().enumerate() {
            let title = or_unknown(record.title);

            let content = match record.content {
                Some(content) if !content.trim().is_empty() => content,
                _ => {
                    return Err(RetrievalError::integrity(format!(
                        "record {} ('{}') has empty content",
                        index, title
                    )))
                }
            };

            let embedding = match record.embedding {
                Some(embedding) if !embedding.is_empty() => embedding,
                Some(_) => {
                    return Err(RetrievalError::integrity(format!(
                        "record {} ('{}') has an empty embedding",
                        index, title
                    )))
                }
                None => {
                    return Err(RetrievalError::integrity(format!(
                        "record {} ('{}') is missing its embedding",
                        index, title
                    )))
                }
            };

            if embedding.iter().any(|x| !x.is_finite()) {
                return Err(RetrievalError::integrity(format!(
                    "record {} ('{}') has a non-finite embedding component",
                    index, title
                )));
            }

            match dimensions {
                None => dimensions = Some(embedding.len()),
                Some(expected) if expected != embedding.len() => {
                    return Err(RetrievalError::integrity(format!(
                        "record {} ('{}') has {} dimensions, expected {}",
                        index,
                        title,
                        embedding.len(),
                        expected
                    )))
                }
                Some(_) => {}
            }

            documents.push(Document {
                title,
                author: or_unknown(record.author),
                dynasty: or_unknown(record.dynasty),
                content,
                embedding,
            });
        }

        Ok(Self {
            documents,
            dimensions,
            manifest: None,
        })
    }

    /// Attach a manifest after checking it describes these documents.
    pub fn with_manifest(mut self, manifest: CorpusManifest) -> RetrievalResult<Self> {
        if manifest.documents != self.documents.len() {
            return Err(RetrievalError::integrity(format!(
                "manifest records {} documents, corpus has {}",
                manifest.documents,
                self.documents.len()
            )));
        }

        if let Some(dimensions) = self.dimensions {
            if manifest.dimensions != dimensions {
                return Err(RetrievalError::integrity(format!(
                    "manifest records {} dimensions, corpus has {}",
                    manifest.dimensions, dimensions
                )));
            }
        }

        self.manifest = Some(manifest);
        Ok(self)
    }

    /// All documents in their original order.
    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Shared embedding dimensionality; `None` for an empty corpus.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn manifest(&self) -> Option<&CorpusManifest> {
        self.manifest.as_ref()
    }

    /// Summarise the corpus.
    pub fn stats(&self) -> CorpusStats {
        let mut dynasties = BTreeMap::new();
        for doc in &self.documents {
            *dynasties.entry(doc.dynasty.clone()).or_insert(0) += 1;
        }

        CorpusStats {
            documents: self.documents.len(),
            dimensions: self.dimensions,
            model: self.manifest.as_ref().map(|m| m.model.clone()),
            dynasties,
        }
    }

    /// Write the corpus and its manifest sidecar.
    ///
    /// Returns the manifest that was written.
    pub fn save(&self, path: &Path, provider: &str, model: &str) -> AppResult<CorpusManifest> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = serde_json::to_vec(&self.documents)?;
        fs::write(path, &bytes).map_err(|e| {
            AppError::Corpus(format!("Failed to write corpus to {:?}: {}", path, e))
        })?;

        let manifest = CorpusManifest {
            provider: provider.to_string(),
            model: model.to_string(),
            dimensions: self.dimensions.unwrap_or(0),
            documents: self.documents.len(),
            built_at: chrono::Utc::now(),
            sha256: sha256_hex(&bytes),
        };

        let manifest_file = manifest_path(path);
        let yaml = serde_yaml::to_string(&manifest)?;
        fs::write(&manifest_file, yaml).map_err(|e| {
            AppError::Corpus(format!(
                "Failed to write manifest to {:?}: {}",
                manifest_file, e
            ))
        })?;

        tracing::info!(
            "Saved corpus {:?} ({} documents) with manifest {:?}",
            path,
            manifest.documents,
            manifest_file
        );

        Ok(manifest)
    }
}

/// Path of the manifest sidecar for a corpus file (`poems.json` -> `poems.manifest.yaml`).
pub fn manifest_path(corpus: &Path) -> PathBuf {
    let stem = corpus
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "corpus".to_string());
    corpus.with_file_name(format!("{}.manifest.yaml", stem))
}

fn read_manifest(path: &Path) -> RetrievalResult<CorpusManifest> {
    let content = fs::read_to_string(path).map_err(|source| RetrievalError::CorpusUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    serde_yaml::from_str(&content).map_err(|e| {
        RetrievalError::integrity(format!("malformed manifest {:?}: {}", path, e))
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn or_unknown(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNKNOWN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_corpus(dir: &TempDir, value: serde_json::Value) -> PathBuf {
        let path = dir.path().join("poems-db.json");
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
        path
    }

    fn doc(title: &str, embedding: Vec<f32>) -> Document {
        Document {
            title: title.to_string(),
            author: "李白".to_string(),
            dynasty: "Tang".to_string(),
            content: "床前明月光，疑是地上霜。".to_string(),
            embedding,
        }
    }

    #[test]
    fn test_load_valid_corpus() {
        let dir = TempDir::new().unwrap();
        let path = write_corpus(
            &dir,
            json!([
                {"title": "静夜思", "author": "李白", "dynasty": "Tang", "content": "床前明月光", "embedding": [0.1, 0.2, 0.3]},
                {"title": "春晓", "author": "孟浩然", "dynasty": "Tang", "content": "春眠不觉晓", "embedding": [0.3, 0.2, 0.1]}
            ]),
        );

        let store = CorpusStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimensions(), Some(3));
        assert_eq!(store.all()[0].title, "静夜思");
        assert_eq!(store.all()[1].title, "春晓");
        assert!(store.manifest().is_none());
    }

    #[test]
    fn test_defaults_applied_once_at_load() {
        let dir = TempDir::new().unwrap();
        let path = write_corpus(
            &dir,
            json!([
                {"content": "关关雎鸠，在河之洲。", "author": "  ", "embedding": [1.0, 0.0]},
                {"title": "蒹葭", "category": "Classic", "content": "蒹葭苍苍，白露为霜。", "embedding": [0.0, 1.0], "tags": ["water"]}
            ]),
        );

        let store = CorpusStore::load(&path).unwrap();
        let first = &store.all()[0];
        assert_eq!(first.title, UNKNOWN);
        assert_eq!(first.author, UNKNOWN);
        assert_eq!(first.dynasty, UNKNOWN);

        let second = &store.all()[1];
        assert_eq!(second.dynasty, "Classic");
        assert_eq!(second.author, UNKNOWN);
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_corpus(
            &dir,
            json!([
                {"title": "a", "content": "一", "embedding": [0.1, 0.2, 0.3]},
                {"title": "b", "content": "二", "embedding": [0.1, 0.2]},
                {"title": "c", "content": "三", "embedding": [0.1, 0.2, 0.3]}
            ]),
        );

        let err = CorpusStore::load(&path).unwrap_err();
        assert!(matches!(err, RetrievalError::CorpusIntegrity { .. }));
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn test_missing_embedding_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_corpus(&dir, json!([{"title": "a", "content": "一"}]));

        let err = CorpusStore::load(&path).unwrap_err();
        assert!(matches!(err, RetrievalError::CorpusIntegrity { .. }));
        assert!(err.to_string().contains("missing its embedding"));
    }

    #[test]
    fn test_empty_embedding_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_corpus(&dir, json!([{"title": "a", "content": "一", "embedding": []}]));

        let err = CorpusStore::load(&path).unwrap_err();
        assert!(matches!(err, RetrievalError::CorpusIntegrity { .. }));
    }

    #[test]
    fn test_empty_content_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_corpus(&dir, json!([{"title": "a", "content": "   ", "embedding": [1.0]}]));

        let err = CorpusStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("empty content"));
    }

    #[test]
    fn test_overflowing_component_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("poems-db.json");
        fs::write(
            &path,
            r#"[{"title": "a", "content": "一", "embedding": [1e39, 0.0]}]"#,
        )
        .unwrap();

        let err = CorpusStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("poems-db.json");
        fs::write(&path, "[{\"title\": ").unwrap();

        let err = CorpusStore::load(&path).unwrap_err();
        assert!(matches!(err, RetrievalError::CorpusIntegrity { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = CorpusStore::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RetrievalError::CorpusUnreadable { .. }));
    }

    #[test]
    fn test_empty_corpus() {
        let dir = TempDir::new().unwrap();
        let path = write_corpus(&dir, json!([]));

        let store = CorpusStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dimensions(), None);
    }

    #[test]
    fn test_save_and_reload_with_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("poems.json");

        let store =
            CorpusStore::from_documents(vec![doc("a", vec![1.0, 0.0]), doc("b", vec![0.0, 1.0])])
                .unwrap();
        let manifest = store.save(&path, "trigram", "trigram-v1").unwrap();

        assert_eq!(manifest.documents, 2);
        assert_eq!(manifest.dimensions, 2);
        assert!(manifest_path(&path).exists());

        let reloaded = CorpusStore::load(&path).unwrap();
        assert_eq!(reloaded.all(), store.all());
        assert_eq!(reloaded.manifest(), Some(&manifest));
        assert_eq!(reloaded.stats().model.as_deref(), Some("trigram-v1"));
    }

    #[test]
    fn test_tampered_corpus_fails_checksum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("poems.json");

        let store = CorpusStore::from_documents(vec![doc("a", vec![1.0, 0.0])]).unwrap();
        store.save(&path, "trigram", "trigram-v1").unwrap();

        let tampered = serde_json::to_vec(&vec![doc("b", vec![0.0, 1.0])]).unwrap();
        fs::write(&path, tampered).unwrap();

        let err = CorpusStore::load(&path).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_manifest_count_mismatch() {
        let store = CorpusStore::from_documents(vec![doc("a", vec![1.0, 0.0])]).unwrap();
        let manifest = CorpusManifest {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 2,
            documents: 5,
            built_at: chrono::Utc::now(),
            sha256: String::new(),
        };

        let err = store.with_manifest(manifest).unwrap_err();
        assert!(matches!(err, RetrievalError::CorpusIntegrity { .. }));
    }

    #[test]
    fn test_manifest_path() {
        assert_eq!(
            manifest_path(Path::new("/data/poems-db.json")),
            PathBuf::from("/data/poems-db.manifest.yaml")
        );
    }

    #[test]
    fn test_stats_counts_dynasties() {
        let mut song = doc("水调歌头", vec![0.0, 1.0]);
        song.dynasty = "Song".to_string();
        let store = CorpusStore::from_documents(vec![
            doc("a", vec![1.0, 0.0]),
            doc("b", vec![0.5, 0.5]),
            song,
        ])
        .unwrap();

        let stats = store.stats();
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.dimensions, Some(2));
        assert_eq!(stats.dynasties.get("Tang"), Some(&2));
        assert_eq!(stats.dynasties.get("Song"), Some(&1));
        assert!(stats.model.is_none());
    }
}
