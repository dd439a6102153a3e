use std::fs;
use std::path::PathBuf;

use biomatch_template::{Template, TemplateList};

use crate::gallery::Gallery;
use crate::GalleryError;

/// A gallery stored as one JSON array of templates.
///
/// Convenient for hand-written inputs. Writes are buffered after the
/// file's existing templates and the whole array is rewritten on
/// [`Gallery::flush`].
pub struct JsonGallery {
    path: PathBuf,
    block_size: usize,
    loaded: Option<Vec<Template>>,
    cursor: usize,
    /// Existing content followed by this handle's writes; `None` until
    /// the first write.
    written: Option<Vec<Template>>,
}

impl JsonGallery {
    pub fn new(path: impl Into<PathBuf>, block_size: usize) -> Self {
        Self {
            path: path.into(),
            block_size: block_size.max(1),
            loaded: None,
            cursor: 0,
            written: None,
        }
    }

    fn load(&self) -> Result<Vec<Template>, GalleryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            GalleryError::InvalidFormat(format!("{}: {e}", self.path.display()))
        })
    }
}

impl Gallery for JsonGallery {
    fn read_block(&mut self) -> Result<(TemplateList, bool), GalleryError> {
        let all = match self.loaded.take() {
            Some(all) => all,
            None => self.load()?,
        };

        let start = self.cursor.min(all.len());
        let end = (start + self.block_size).min(all.len());
        let block: TemplateList = all[start..end].to_vec().into();
        let done = end >= all.len();
        if done {
            self.cursor = 0;
        } else {
            self.cursor = end;
            self.loaded = Some(all);
        }
        Ok((block, done))
    }

    fn write_block(&mut self, templates: &TemplateList) -> Result<(), GalleryError> {
        let written = match self.written.take() {
            Some(w) => w,
            None => self.load()?,
        };
        let written = self.written.insert(written);
        written.extend(templates.iter().cloned());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), GalleryError> {
        let Some(written) = &self.written else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(written)
            .map_err(|e| GalleryError::InvalidFormat(e.to_string()))?;
        fs::write(&self.path, json)?;
        self.loaded = None;
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biomatch_template::File;

    #[test]
    fn reads_hand_written_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.json");
        fs::write(
            &path,
            r#"[{"file":{"name":"a.jpg"},"data":[1.0]},{"file":{"name":"b.jpg","options":{"subject":"bob"}}}]"#,
        )
        .unwrap();

        let mut g = JsonGallery::new(&path, 1);
        let (b, done) = g.read_block().unwrap();
        assert_eq!((b[0].file.name.as_str(), done), ("a.jpg", false));
        let (b, done) = g.read_block().unwrap();
        assert_eq!(b[0].file.get_string("subject").as_deref(), Some("bob"));
        assert!(done);
    }

    #[test]
    fn flush_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut g = JsonGallery::new(&path, 10);
        let tl: TemplateList = vec![Template::new(File::new("x"), vec![2.0])].into();
        g.write_block(&tl).unwrap();
        g.flush().unwrap();

        let mut r = JsonGallery::new(&path, 10);
        assert_eq!(r.read_all().unwrap(), tl);
    }

    #[test]
    fn writes_keep_existing_templates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grow.json");
        fs::write(&path, r#"[{"file":{"name":"old"},"data":[1.0]}]"#).unwrap();

        let mut g = JsonGallery::new(&path, 10);
        g.write_block(&vec![Template::new(File::new("new"), vec![2.0])].into())
            .unwrap();
        g.flush().unwrap();

        let names = JsonGallery::new(&path, 10).files().unwrap().names();
        assert_eq!(names, vec!["old", "new"]);
    }

    #[test]
    fn flush_without_writes_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.json");
        fs::write(&path, "[]").unwrap();
        let mut g = JsonGallery::new(&path, 10);
        g.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }
}
