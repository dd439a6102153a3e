use biomatch_template::{File, Template, TemplateList};

use crate::gallery::Gallery;
use crate::GalleryError;

/// Fallback gallery for descriptors with no recognized gallery suffix:
/// the descriptor itself is the only template, with no feature data yet.
/// Raw inputs (images, recordings) enter the pipeline this way.
pub struct RawGallery {
    file: File,
}

impl RawGallery {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl Gallery for RawGallery {
    fn read_block(&mut self) -> Result<(TemplateList, bool), GalleryError> {
        Ok((vec![Template::from_file(self.file.clone())].into(), true))
    }

    fn write_block(&mut self, _templates: &TemplateList) -> Result<(), GalleryError> {
        Err(GalleryError::ReadOnly(self.file.name.clone()))
    }
}
