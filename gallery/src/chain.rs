use biomatch_template::TemplateList;

use crate::gallery::Gallery;
use crate::GalleryError;

/// Reads several galleries back to back as one (`a.gal;b.gal`).
///
/// A part's last block is passed through with `done = false` unless it
/// is the last part, so a block may be short or empty at part
/// boundaries. Chains are read-only.
pub struct ChainGallery {
    parts: Vec<Box<dyn Gallery>>,
    current: usize,
}

impl ChainGallery {
    pub fn new(parts: Vec<Box<dyn Gallery>>) -> Self {
        Self { parts, current: 0 }
    }
}

impl Gallery for ChainGallery {
    fn read_block(&mut self) -> Result<(TemplateList, bool), GalleryError> {
        let Some(part) = self.parts.get_mut(self.current) else {
            self.current = 0;
            return Ok((TemplateList::new(), true));
        };
        let (block, part_done) = part.read_block()?;
        if !part_done {
            return Ok((block, false));
        }
        self.current += 1;
        if self.current == self.parts.len() {
            self.current = 0;
            return Ok((block, true));
        }
        Ok((block, false))
    }

    fn write_block(&mut self, _templates: &TemplateList) -> Result<(), GalleryError> {
        Err(GalleryError::ReadOnly("gallery list".into()))
    }
}
