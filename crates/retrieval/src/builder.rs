//! Offline corpus builder.
//!
//! Turns raw classical-poetry JSON (the chinese-poetry collection layout:
//! `title`/`rhythmic`, `author`, `paragraphs`) into an embedded corpus file
//! that [`crate::CorpusStore::load`] accepts.

use crate::corpus::CorpusStore;
use crate::embeddings::EmbeddingProvider;
use crate::types::{Document, UNKNOWN};
use futures::stream::{self, StreamExt, TryStreamExt};
use harmony_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Poems whose joined content has this many characters or fewer are dropped.
pub const DEFAULT_MIN_CHARS: usize = 10;

/// Separator used when joining a poem's lines into one content string.
const LINE_SEPARATOR: &str = "，";

/// A raw source file or directory, optionally tagged with a dynasty label.
///
/// Parsed from `PATH` or `TAG=PATH`, e.g. `Tang=data/tang.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub dynasty: Option<String>,
}

impl FromStr for SourceSpec {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AppError::Config("Empty source specification".to_string()));
        }

        if let Some((tag, path)) = s.split_once('=') {
            let tag = tag.trim();
            if !tag.is_empty() && !tag.contains(['/', '\\']) {
                if path.trim().is_empty() {
                    return Err(AppError::Config(format!(
                        "Source '{}' has a tag but no path",
                        s
                    )));
                }
                return Ok(Self {
                    path: PathBuf::from(path.trim()),
                    dynasty: Some(tag.to_string()),
                });
            }
        }

        Ok(Self {
            path: PathBuf::from(s),
            dynasty: None,
        })
    }
}

/// Options for [`build_corpus`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub sources: Vec<SourceSpec>,

    /// Keep at most this many raw records per source (before filtering)
    pub limit: Option<usize>,

    pub min_chars: usize,

    /// Texts per embedding request
    pub batch_size: usize,

    /// Embedding requests in flight at once
    pub concurrency: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            limit: None,
            min_chars: DEFAULT_MIN_CHARS,
            batch_size: 64,
            concurrency: 4,
        }
    }
}

/// Statistics from a corpus build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    /// Source files read
    pub files: usize,
    /// Raw records considered (after the per-source limit)
    pub records: usize,
    /// Records dropped for being too short
    pub skipped: usize,
    /// Documents embedded and kept
    pub documents: usize,
    pub dimensions: Option<usize>,
    pub duration_secs: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextBody {
    Lines(Vec<String>),
    Text(String),
}

impl TextBody {
    fn join(self) -> String {
        match self {
            TextBody::Lines(lines) => lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(LINE_SEPARATOR),
            TextBody::Text(text) => text.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPoem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    rhythmic: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    dynasty: Option<String>,
    #[serde(default)]
    paragraphs: Option<TextBody>,
    #[serde(default)]
    content: Option<TextBody>,
    #[serde(default)]
    tags: Vec<String>,
}

/// A cleaned poem waiting for its embedding.
#[derive(Debug, Clone, PartialEq)]
struct PendingPoem {
    title: String,
    author: String,
    dynasty: String,
    content: String,
    tags: Vec<String>,
}

impl PendingPoem {
    fn into_document(self, embedding: Vec<f32>) -> Document {
        Document {
            title: self.title,
            author: self.author,
            dynasty: self.dynasty,
            content: self.content,
            embedding,
        }
    }
}

/// Text that gets embedded for a poem.
///
/// `"{title} {dynasty} {author}: {content}"`, with `" Keywords: a, b"`
/// appended when the poem has tags.
pub fn canonical_text(
    title: &str,
    dynasty: &str,
    author: &str,
    content: &str,
    tags: &[String],
) -> String {
    let mut text = format!("{} {} {}: {}", title, dynasty, author, content);
    if !tags.is_empty() {
        text.push_str(" Keywords: ");
        text.push_str(&tags.join(", "));
    }
    text
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// JSON files under a source path, in a stable order.
fn source_files(path: &Path) -> AppResult<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        return Err(AppError::Config(format!("Source not found: {:?}", path)));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    files.sort();

    Ok(files)
}

fn read_raw(path: &Path) -> AppResult<Vec<RawPoem>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::Corpus(format!("Failed to parse source {:?}: {}", path, e)))
}

/// Read and clean every poem from one source.
fn read_source(
    source: &SourceSpec,
    options: &BuildOptions,
    stats: &mut BuildStats,
) -> AppResult<Vec<PendingPoem>> {
    let mut raw = Vec::new();
    for file in source_files(&source.path)? {
        debug!("Reading source file {:?}", file);
        raw.extend(read_raw(&file)?);
        stats.files += 1;
    }

    if let Some(limit) = options.limit {
        raw.truncate(limit);
    }
    stats.records += raw.len();

    let mut poems = Vec::with_capacity(raw.len());
    for record in raw {
        let content = record
            .paragraphs
            .or(record.content)
            .map(TextBody::join)
            .unwrap_or_default();

        if content.chars().count() <= options.min_chars {
            stats.skipped += 1;
            continue;
        }

        poems.push(PendingPoem {
            title: non_blank(record.title)
                .or_else(|| non_blank(record.rhythmic))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            author: non_blank(record.author).unwrap_or_else(|| UNKNOWN.to_string()),
            dynasty: source
                .dynasty
                .clone()
                .or_else(|| non_blank(record.dynasty))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            content,
            tags: record.tags,
        });
    }

    info!(
        "Source {:?}: {} poems kept",
        source.path,
        poems.len()
    );

    Ok(poems)
}

/// Read, clean and embed every source into an in-memory corpus.
///
/// Embedding requests run in batches with at most `options.concurrency` in
/// flight; document order follows source order. Any embedding failure
/// aborts the build.
#[instrument(skip(provider, options), fields(provider = provider.provider_name(), sources = options.sources.len()))]
pub async fn build_corpus(
    provider: &dyn EmbeddingProvider,
    model: &str,
    options: &BuildOptions,
) -> AppResult<(CorpusStore, BuildStats)> {
    let start = std::time::Instant::now();
    let mut stats = BuildStats::default();

    if options.sources.is_empty() {
        return Err(AppError::Config(
            "At least one source is required to build a corpus".to_string(),
        ));
    }

    let mut poems = Vec::new();
    for source in &options.sources {
        poems.extend(read_source(source, options, &mut stats)?);
    }

    if poems.is_empty() {
        return Err(AppError::Corpus(
            "No poems left to embed after cleaning".to_string(),
        ));
    }

    let batch_size = options.batch_size.max(1);
    let batches: Vec<Vec<String>> = poems
        .chunks(batch_size)
        .map(|chunk| {
            chunk
                .iter()
                .map(|p| canonical_text(&p.title, &p.dynasty, &p.author, &p.content, &p.tags))
                .collect()
        })
        .collect();
    let total_batches = batches.len();

    info!(
        "Embedding {} poems in {} batches with model '{}'",
        poems.len(),
        total_batches,
        model
    );

    let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches.iter().enumerate())
        .map(|(index, texts)| async move {
            let vectors = provider.embed_batch(texts, model).await?;
            if vectors.len() != texts.len() {
                return Err(AppError::Embedding(format!(
                    "{} returned {} embeddings for {} texts",
                    provider.provider_name(),
                    vectors.len(),
                    texts.len()
                )));
            }
            debug!("Embedded batch {}/{}", index + 1, total_batches);
            Ok::<_, AppError>(vectors)
        })
        .buffered(options.concurrency.max(1))
        .try_collect()
        .await?;

    let documents: Vec<Document> = poems
        .into_iter()
        .zip(embedded.into_iter().flatten())
        .map(|(poem, embedding)| poem.into_document(embedding))
        .collect();

    let store = CorpusStore::from_documents(documents)?;

    stats.documents = store.len();
    stats.dimensions = store.dimensions();
    stats.duration_secs = start.elapsed().as_secs_f64();

    info!(
        "Built corpus: {} documents, {} skipped, {:.2}s",
        stats.documents, stats.skipped, stats.duration_secs
    );

    Ok((store, stats))
}
