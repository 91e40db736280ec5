//! On-disk and in-memory document sources.
//!
//! A document directory holds two JSON files:
//!
//! - `document.json`: the document manifest (id, name, pages)
//! - `annotations.json`: the annotation sidecar
//!
//! Both are wrapped in a versioned envelope and written atomically.

mod memory;

pub use memory::InMemorySource;

use directories::ProjectDirs;
use pagenote_core::DocumentSource;
use pagenote_doc_model::{Annotation, Document, DocumentWithAnnotations, Page};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SCHEMA_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "document.json";
const ANNOTATIONS_FILE: &str = "annotations.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("no document manifest at {}", .0.display())]
    MissingManifest(PathBuf),
    #[error("document {0} not found")]
    UnknownDocument(String),
    #[error("unsupported schema version {found} in {}", path.display())]
    UnsupportedVersion { path: PathBuf, found: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEnvelope {
    version: u32,
    id: String,
    document: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnnotationsEnvelope {
    version: u32,
    annotations: Vec<Annotation>,
}

trait Versioned {
    fn version(&self) -> u32;
}

impl Versioned for ManifestEnvelope {
    fn version(&self) -> u32 {
        self.version
    }
}

impl Versioned for AnnotationsEnvelope {
    fn version(&self) -> u32 {
        self.version
    }
}

/// A document directory on disk
#[derive(Debug, Clone)]
pub struct JsonDocumentSource {
    root: PathBuf,
}

impl JsonDocumentSource {
    /// The per-user data directory, used when no directory is given.
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Pagenote", "Pagenote").ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.manifest_path().exists()
    }

    /// Write a fresh document with an empty annotation set.
    ///
    /// Existing annotations in the directory are discarded.
    pub fn create(&self, id: &str, document: &Document) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        self.write_manifest(id, document)?;
        self.write_annotations(&[])?;
        tracing::info!(root = %self.root.display(), id, name = %document.name, "document created");
        Ok(())
    }

    /// The id stored in the manifest
    pub fn document_id(&self) -> Result<String, StorageError> {
        Ok(self.read_manifest()?.id)
    }

    /// Path of a page image. Relative image URLs resolve against the root.
    pub fn page_image_path(&self, page: &Page) -> PathBuf {
        let url = Path::new(&page.image_url);
        if url.is_relative() {
            self.root.join(url)
        } else {
            url.to_path_buf()
        }
    }

    pub fn load_document(&self, id: &str) -> Result<Document, StorageError> {
        let manifest = self.read_manifest()?;
        if manifest.id != id {
            return Err(StorageError::UnknownDocument(id.to_string()));
        }
        Ok(manifest.document)
    }

    /// Annotations from the sidecar. A missing sidecar is an empty set.
    pub fn load_annotations(&self) -> Result<Vec<Annotation>, StorageError> {
        let path = self.annotations_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let envelope: AnnotationsEnvelope = read_envelope(&path)?;
        Ok(envelope.annotations)
    }

    /// Persist a bundle. The sidecar is written before the manifest, so a
    /// failed sidecar write leaves both files as they were.
    pub fn save(&self, bundle: &DocumentWithAnnotations) -> Result<(), StorageError> {
        let id = self.read_manifest()?.id;
        self.write_annotations(&bundle.annotations)?;
        self.write_manifest(&id, &bundle.document)?;
        tracing::info!(root = %self.root.display(), annotations = bundle.annotations.len(), "document persisted");
        Ok(())
    }

    fn read_manifest(&self) -> Result<ManifestEnvelope, StorageError> {
        let path = self.manifest_path();
        if !path.exists() {
            return Err(StorageError::MissingManifest(path));
        }
        read_envelope(&path)
    }

    fn write_manifest(&self, id: &str, document: &Document) -> Result<(), StorageError> {
        let envelope =
            ManifestEnvelope { version: SCHEMA_VERSION, id: id.to_string(), document: document.clone() };
        write_atomic(&self.manifest_path(), &serde_json::to_vec_pretty(&envelope)?)
    }

    fn write_annotations(&self, annotations: &[Annotation]) -> Result<(), StorageError> {
        let envelope = AnnotationsEnvelope { version: SCHEMA_VERSION, annotations: annotations.to_vec() };
        write_atomic(&self.annotations_path(), &serde_json::to_vec_pretty(&envelope)?)
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn annotations_path(&self) -> PathBuf {
        self.root.join(ANNOTATIONS_FILE)
    }
}

impl DocumentSource for JsonDocumentSource {
    type Error = StorageError;

    async fn fetch_document(&self, id: &str) -> Result<Document, StorageError> {
        self.load_document(id)
    }

    async fn fetch_annotations(&self) -> Result<Vec<Annotation>, StorageError> {
        self.load_annotations()
    }

    async fn persist_document(&self, bundle: &DocumentWithAnnotations) -> Result<(), StorageError> {
        self.save(bundle)
    }
}

fn read_envelope<T: DeserializeOwned + Versioned>(path: &Path) -> Result<T, StorageError> {
    let bytes = fs::read(path)?;
    let envelope: T = serde_json::from_slice(&bytes)?;
    if envelope.version() > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion { path: path.to_path_buf(), found: envelope.version() });
    }
    Ok(envelope)
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
