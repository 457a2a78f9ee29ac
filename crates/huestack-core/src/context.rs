//! Application context: the open documents and which one is active.
//!
//! Nothing in the processing core reads this; it is passed explicitly to
//! the host components that need to find the current document.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::image::PixelBuffer;
use crate::layers::LayerStack;
use crate::lut3d::Lut3D;
use crate::raw::{RawDecoder, RawDevelopment};

/// One open image with its layer stack.
#[derive(Debug)]
pub struct Document {
    pub name: String,
    pub stack: LayerStack,
    /// Development state when the document was opened from a raw file.
    pub raw: Option<RawDevelopment>,
}

impl Document {
    pub fn new(name: impl Into<String>, base: PixelBuffer) -> Self {
        Self {
            name: name.into(),
            stack: LayerStack::new(base),
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: RawDevelopment) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// A document shared between the host's components.
///
/// All mutations of the stack go through the write lock, so there is at
/// most one writer at a time; readers of a clean stack may run concurrently.
pub type SharedDocument = Arc<RwLock<Document>>;

#[derive(Debug, Default)]
pub struct AppContext {
    pub config: EngineConfig,
    documents: Vec<SharedDocument>,
    active: Option<usize>,
}

impl AppContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            documents: Vec::new(),
            active: None,
        }
    }

    pub fn documents(&self) -> &[SharedDocument] {
        &self.documents
    }

    /// Adds a document and makes it active.
    pub fn open(&mut self, document: Document) -> SharedDocument {
        tracing::info!("Opened document '{}'", document.name);
        let shared = Arc::new(RwLock::new(document));
        self.documents.push(Arc::clone(&shared));
        self.active = Some(self.documents.len() - 1);
        shared
    }

    /// Removes a document. The active document moves to the previous one.
    pub fn close(&mut self, index: usize) -> Result<SharedDocument> {
        if index >= self.documents.len() {
            return Err(Error::state(format!("no document at index {index}")));
        }
        let closed = self.documents.remove(index);
        self.active = match self.active {
            _ if self.documents.is_empty() => None,
            Some(a) if a > index => Some(a - 1),
            Some(a) if a == index => Some(a.saturating_sub(1)),
            other => other,
        };
        tracing::info!("Closed document '{}'", closed.read().name);
        Ok(closed)
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        if index >= self.documents.len() {
            return Err(Error::state(format!("no document at index {index}")));
        }
        self.active = Some(index);
        Ok(())
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// The active document, or a `State` error when none is open.
    pub fn active_document(&self) -> Result<SharedDocument> {
        self.active
            .and_then(|i| self.documents.get(i))
            .cloned()
            .ok_or_else(|| Error::state("no active document"))
    }

    /// Bakes the active document's color layers into a LUT of the
    /// configured lattice size.
    pub fn bake_active_lut(&self) -> Result<Lut3D> {
        let shared = self.active_document()?;
        let doc = shared.read();
        doc.stack.bake_lut(self.config.lut3d_size)
    }

    /// Redevelops the active raw document and installs the result as the
    /// stack's base image. Every layer is recomputed on the next render.
    pub fn develop_active<D: RawDecoder + ?Sized>(&self, decoder: &mut D) -> Result<()> {
        let shared = self.active_document()?;
        let mut doc = shared.write();
        let raw = doc.raw.as_ref().ok_or_else(|| {
            Error::state(format!("document '{}' was not opened from a raw file", doc.name))
        })?;
        let developed = raw.develop(decoder, &self.config.auto_curve)?;
        doc.stack.set_base(developed)?;
        tracing::info!("Redeveloped '{}'", doc.name);
        Ok(())
    }
}
