use std::collections::HashMap;
use std::sync::Arc;

use biomatch_template::TemplateList;
use parking_lot::RwLock;

use crate::gallery::Gallery;
use crate::matrix::Simmat;
use crate::GalleryError;

/// Process-scoped in-memory backing for `.mem` galleries and outputs.
///
/// Cloning is cheap and clones share the same data, so every handle
/// opened through one [`crate::Storage`] sees the same galleries.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    galleries: HashMap<String, TemplateList>,
    matrices: HashMap<String, Simmat>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of templates stored under `name` (0 if absent).
    pub fn gallery_len(&self, name: &str) -> usize {
        self.inner.read().galleries.get(name).map_or(0, |g| g.len())
    }

    /// Returns a copy of the gallery stored under `name`.
    pub fn gallery(&self, name: &str) -> Option<TemplateList> {
        self.inner.read().galleries.get(name).cloned()
    }

    /// Replaces the gallery stored under `name`.
    pub fn insert_gallery(&self, name: impl Into<String>, templates: TemplateList) {
        self.inner.write().galleries.insert(name.into(), templates);
    }

    pub fn matrix(&self, name: &str) -> Option<Simmat> {
        self.inner.read().matrices.get(name).cloned()
    }

    pub fn contains_matrix(&self, name: &str) -> bool {
        self.inner.read().matrices.contains_key(name)
    }

    pub fn insert_matrix(&self, name: impl Into<String>, simmat: Simmat) {
        self.inner.write().matrices.insert(name.into(), simmat);
    }

    /// Drops every stored gallery and matrix.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.galleries.clear();
        inner.matrices.clear();
    }

    fn read_range(&self, name: &str, start: usize, len: usize) -> (TemplateList, usize) {
        let inner = self.inner.read();
        match inner.galleries.get(name) {
            Some(g) => {
                let start = start.min(g.len());
                let end = (start + len).min(g.len());
                (g.slice(start..end), g.len())
            }
            None => (TemplateList::new(), 0),
        }
    }

    fn append(&self, name: &str, templates: &TemplateList) {
        let mut inner = self.inner.write();
        inner
            .galleries
            .entry(name.to_string())
            .or_default()
            .extend(templates.iter().cloned());
    }
}

/// A `.mem` gallery. Writes append to the shared store entry.
pub struct MemoryGallery {
    store: MemoryStore,
    name: String,
    block_size: usize,
    cursor: usize,
}

impl MemoryGallery {
    pub fn new(store: MemoryStore, name: impl Into<String>, block_size: usize) -> Self {
        Self {
            store,
            name: name.into(),
            block_size: block_size.max(1),
            cursor: 0,
        }
    }
}

impl Gallery for MemoryGallery {
    fn read_block(&mut self) -> Result<(TemplateList, bool), GalleryError> {
        let (block, total) = self
            .store
            .read_range(&self.name, self.cursor, self.block_size);
        self.cursor += block.len();
        let done = self.cursor >= total;
        if done {
            self.cursor = 0;
        }
        Ok((block, done))
    }

    fn write_block(&mut self, templates: &TemplateList) -> Result<(), GalleryError> {
        self.store.append(&self.name, templates);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biomatch_template::{File, Template};

    fn list(n: usize) -> TemplateList {
        (0..n)
            .map(|i| Template::new(File::new(format!("t{i}")), vec![i as f32]))
            .collect()
    }

    #[test]
    fn blocks_then_restart() {
        let store = MemoryStore::new();
        store.insert_gallery("g.mem", list(5));
        let mut g = MemoryGallery::new(store, "g.mem", 2);

        let (b, done) = g.read_block().unwrap();
        assert_eq!((b.len(), done), (2, false));
        let (b, done) = g.read_block().unwrap();
        assert_eq!((b.len(), done), (2, false));
        let (b, done) = g.read_block().unwrap();
        assert_eq!((b.len(), done), (1, true));

        // Starts over after done.
        let (b, _) = g.read_block().unwrap();
        assert_eq!(b[0].file.name, "t0");
    }

    #[test]
    fn missing_gallery_is_empty() {
        let mut g = MemoryGallery::new(MemoryStore::new(), "none.mem", 4);
        let (b, done) = g.read_block().unwrap();
        assert!(b.is_empty());
        assert!(done);
        assert!(g.files().unwrap().is_empty());
    }

    #[test]
    fn writes_are_shared_between_handles() {
        let store = MemoryStore::new();
        let mut w = MemoryGallery::new(store.clone(), "shared.mem", 10);
        w.write_block(&list(3)).unwrap();
        w.write_block(&list(1)).unwrap();

        let mut r = MemoryGallery::new(store.clone(), "shared.mem", 10);
        assert_eq!(r.files().unwrap().names(), vec!["t0", "t1", "t2", "t0"]);
        assert_eq!(store.gallery_len("shared.mem"), 4);
    }
}
