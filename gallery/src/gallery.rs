use biomatch_template::{FileList, TemplateList};

use crate::GalleryError;

/// A block-streamed collection of templates.
///
/// Reads proceed in blocks of the storage block size. The block that
/// exhausts the gallery is returned with `done = true`; the next
/// [`Gallery::read_block`] call starts over from the first template, so
/// one handle can be swept repeatedly (the comparison pipeline re-reads
/// its target gallery once per query block).
///
/// Writes append. Whether a fresh handle appends to or replaces existing
/// content is up to the implementation; see each gallery type.
pub trait Gallery: Send {
    /// Returns the next block and whether it was the last one.
    fn read_block(&mut self) -> Result<(TemplateList, bool), GalleryError>;

    /// Appends a block of templates.
    fn write_block(&mut self, templates: &TemplateList) -> Result<(), GalleryError>;

    /// Lists the descriptors of every stored template by sweeping the
    /// gallery once.
    fn files(&mut self) -> Result<FileList, GalleryError> {
        let mut files = FileList::new();
        loop {
            let (block, done) = self.read_block()?;
            files.extend(block.files());
            if done {
                return Ok(files);
            }
        }
    }

    /// Reads every stored template.
    fn read_all(&mut self) -> Result<TemplateList, GalleryError> {
        let mut all = TemplateList::new();
        loop {
            let (block, done) = self.read_block()?;
            all.extend(block);
            if done {
                return Ok(all);
            }
        }
    }

    /// Makes pending writes durable.
    fn flush(&mut self) -> Result<(), GalleryError> {
        Ok(())
    }
}
