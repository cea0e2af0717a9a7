//! File-backed and in-memory document repositories.
//!
//! # Responsibility
//! - Persist one schema document as an XML file.
//! - Provide an in-memory repository for tests and scratch sessions.
//!
//! # Invariants
//! - `save` writes the full document to a sibling temp file and renames it
//!   over the target, so the target never holds a partial document.
//! - Every load/save emits a `doc_load` / `doc_save` event with duration.

use super::xml_codec::{parse_document, render_document};
use super::{DocumentRepository, RepoError, RepoResult};
use crate::model::document::Document;
use log::{error, info};
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Repository backed by a single XML file on disk.
#[derive(Debug, Clone)]
pub struct XmlFileRepository {
    path: PathBuf,
}

impl XmlFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replace_file(&self, content: &str) -> RepoResult<()> {
        let dir = match self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
                parent
            }
            None => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(|err| self.io_error(err))?;
        staged
            .write_all(content.as_bytes())
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|err| self.io_error(err))?;
        staged
            .persist(&self.path)
            .map(|_| ())
            .map_err(|err| self.io_error(err.error))
    }

    fn io_error(&self, source: std::io::Error) -> RepoError {
        RepoError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl DocumentRepository for XmlFileRepository {
    fn load(&self) -> RepoResult<Document> {
        let started_at = Instant::now();
        info!("event=doc_load module=repo status=start mode=file");

        let result = std::fs::read_to_string(&self.path)
            .map_err(|err| self.io_error(err))
            .and_then(|content| parse_document(&content));

        match &result {
            Ok(document) => info!(
                "event=doc_load module=repo status=ok mode=file duration_ms={} units={}",
                started_at.elapsed().as_millis(),
                document.unit_count()
            ),
            Err(err) => error!(
                "event=doc_load module=repo status=error mode=file duration_ms={} path={} error={}",
                started_at.elapsed().as_millis(),
                self.path.display(),
                err
            ),
        }
        result
    }

    fn save(&self, document: &Document) -> RepoResult<()> {
        let started_at = Instant::now();
        info!("event=doc_save module=repo status=start mode=file");

        let result = render_document(document).and_then(|content| self.replace_file(&content));

        match &result {
            Ok(()) => info!(
                "event=doc_save module=repo status=ok mode=file duration_ms={} units={}",
                started_at.elapsed().as_millis(),
                document.unit_count()
            ),
            Err(err) => error!(
                "event=doc_save module=repo status=error mode=file duration_ms={} path={} error={}",
                started_at.elapsed().as_millis(),
                self.path.display(),
                err
            ),
        }
        result
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Repository holding the encoded document in memory.
///
/// Content goes through the same codec as [`XmlFileRepository`], so load
/// failures surface identically.
#[derive(Debug, Default)]
pub struct MemoryDocumentRepository {
    content: RefCell<Option<String>>,
}

impl MemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the repository with already-encoded markup.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: RefCell::new(Some(content.into())),
        }
    }

    /// Last saved markup, if any.
    pub fn content(&self) -> Option<String> {
        self.content.borrow().clone()
    }
}

impl DocumentRepository for MemoryDocumentRepository {
    fn load(&self) -> RepoResult<Document> {
        let content = self.content.borrow();
        let content = content.as_deref().ok_or(RepoError::Empty)?;
        parse_document(content)
    }

    fn save(&self, document: &Document) -> RepoResult<()> {
        let rendered = render_document(document)?;
        *self.content.borrow_mut() = Some(rendered);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
