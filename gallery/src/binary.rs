//! Framed MessagePack galleries (`.gal`) and single-template files (`.tpl`).

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use biomatch_template::{Template, TemplateList};
use tracing::trace;

use crate::gallery::Gallery;
use crate::GalleryError;

const GAL_MAGIC: [u8; 4] = [b'B', b'R', b'G', b'L'];
const GAL_VERSION: u32 = 1;

/// A durable gallery file.
///
/// ```text
/// [4B magic "BRGL"] [4B version=1]
/// For each template:
///   [4B len] [len bytes MessagePack-encoded template]
/// ```
///
/// Writes append: an existing gallery keeps its records and new frames
/// follow them. A missing or empty file is created with a fresh header.
pub struct BinaryGallery {
    path: PathBuf,
    block_size: usize,
    reader: Option<BufReader<fs::File>>,
    writer: Option<BufWriter<fs::File>>,
}

impl BinaryGallery {
    pub fn new(path: impl Into<PathBuf>, block_size: usize) -> Self {
        Self {
            path: path.into(),
            block_size: block_size.max(1),
            reader: None,
            writer: None,
        }
    }

    fn open_reader(&self) -> Result<BufReader<fs::File>, GalleryError> {
        let mut r = BufReader::new(fs::File::open(&self.path)?);
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != GAL_MAGIC {
            return Err(GalleryError::InvalidFormat(format!(
                "{}: invalid gallery magic {magic:?}",
                self.path.display()
            )));
        }
        let mut buf = [0u8; 4];
        r.read_exact(&mut buf)?;
        let version = u32::from_le_bytes(buf);
        if version != GAL_VERSION {
            return Err(GalleryError::InvalidFormat(format!(
                "unsupported gallery version {version} (want {GAL_VERSION})"
            )));
        }
        Ok(r)
    }

    fn open_writer(&self) -> Result<BufWriter<fs::File>, GalleryError> {
        let existing = fs::metadata(&self.path).map(|m| m.len() > 0).unwrap_or(false);
        if existing {
            // Refuses to append to a file that is not a gallery.
            self.open_reader()?;
            let f = fs::OpenOptions::new().append(true).open(&self.path)?;
            trace!(path = %self.path.display(), "appending to gallery");
            return Ok(BufWriter::new(f));
        }
        let mut w = BufWriter::new(fs::File::create(&self.path)?);
        w.write_all(&GAL_MAGIC)?;
        w.write_all(&GAL_VERSION.to_le_bytes())?;
        Ok(w)
    }
}

impl Gallery for BinaryGallery {
    fn read_block(&mut self) -> Result<(TemplateList, bool), GalleryError> {
        if let Some(w) = self.writer.as_mut() {
            w.flush()?;
        }

        let mut reader = match self.reader.take() {
            Some(r) => r,
            None if !self.path.exists() => return Ok((TemplateList::new(), true)),
            None => self.open_reader()?,
        };

        let mut block = TemplateList::with_capacity(self.block_size);
        while block.len() < self.block_size {
            match read_frame(&mut reader)? {
                Some(t) => block.push(t),
                None => break,
            }
        }

        let done = reader.fill_buf()?.is_empty();
        if !done {
            self.reader = Some(reader);
        }
        trace!(path = %self.path.display(), n = block.len(), done, "read gallery block");
        Ok((block, done))
    }

    fn write_block(&mut self, templates: &TemplateList) -> Result<(), GalleryError> {
        if self.writer.is_none() {
            self.writer = Some(self.open_writer()?);
        }
        if let Some(w) = self.writer.as_mut() {
            for t in templates {
                write_frame(w, t)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), GalleryError> {
        if let Some(w) = self.writer.as_mut() {
            w.flush()?;
        }
        Ok(())
    }
}

fn write_frame(w: &mut impl Write, t: &Template) -> Result<(), GalleryError> {
    let bytes = encode(t)?;
    w.write_all(&(bytes.len() as u32).to_le_bytes())?;
    w.write_all(&bytes)?;
    Ok(())
}

fn read_frame(r: &mut impl BufRead) -> Result<Option<Template>, GalleryError> {
    if r.fill_buf()?.is_empty() {
        return Ok(None);
    }
    let mut len = [0u8; 4];
    r.read_exact(&mut len)?;
    let mut bytes = vec![0u8; u32::from_le_bytes(len) as usize];
    r.read_exact(&mut bytes)?;
    decode(&bytes).map(Some)
}

fn encode(t: &Template) -> Result<Vec<u8>, GalleryError> {
    rmp_serde::to_vec_named(t).map_err(|e| GalleryError::InvalidFormat(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Template, GalleryError> {
    rmp_serde::from_slice(bytes).map_err(|e| GalleryError::InvalidFormat(e.to_string()))
}

/// Reads a single MessagePack-encoded template.
pub fn read_tpl(path: &Path) -> Result<Template, GalleryError> {
    decode(&fs::read(path)?)
}

/// Writes a single MessagePack-encoded template.
pub fn write_tpl(path: &Path, t: &Template) -> Result<(), GalleryError> {
    fs::write(path, encode(t)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use biomatch_template::File;

    fn list(n: usize) -> TemplateList {
        (0..n)
            .map(|i| Template::new(File::new(format!("t{i}")).with("label", i as i64), vec![i as f32, 1.0]))
            .collect()
    }

    #[test]
    fn write_then_read_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.gal");

        let mut g = BinaryGallery::new(&path, 3);
        g.write_block(&list(4)).unwrap();
        g.write_block(&list(3)).unwrap();
        g.flush().unwrap();

        let mut r = BinaryGallery::new(&path, 3);
        let mut sizes = Vec::new();
        loop {
            let (b, done) = r.read_block().unwrap();
            sizes.push(b.len());
            if done {
                break;
            }
        }
        assert_eq!(sizes, vec![3, 3, 1]);

        let all = r.read_all().unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(all[5].file.get_string("label").as_deref(), Some("1"));
        assert_eq!(all[5].data, vec![1.0, 1.0]);
    }

    #[test]
    fn exact_multiple_ends_on_full_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("even.gal");
        let mut g = BinaryGallery::new(&path, 2);
        g.write_block(&list(4)).unwrap();

        // Reading through the writing handle flushes first.
        let (b, done) = g.read_block().unwrap();
        assert_eq!((b.len(), done), (2, false));
        let (b, done) = g.read_block().unwrap();
        assert_eq!((b.len(), done), (2, true));
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = BinaryGallery::new(dir.path().join("absent.gal"), 8);
        assert!(g.files().unwrap().is_empty());
    }

    #[test]
    fn rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.gal");
        fs::write(&path, b"garbage!").unwrap();
        let mut g = BinaryGallery::new(&path, 8);
        assert!(matches!(g.read_block(), Err(GalleryError::InvalidFormat(_))));
    }

    #[test]
    fn new_handle_appends_to_existing_gallery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grow.gal");

        let mut first = BinaryGallery::new(&path, 4);
        first.write_block(&list(2)).unwrap();
        first.flush().unwrap();
        drop(first);

        let mut second = BinaryGallery::new(&path, 4);
        second.write_block(&list(3)).unwrap();
        second.flush().unwrap();

        let names = BinaryGallery::new(&path, 4).files().unwrap().names();
        assert_eq!(names, vec!["t0", "t1", "t0", "t1", "t2"]);
    }

    #[test]
    fn refuses_to_append_to_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.gal");
        fs::write(&path, b"not a gallery").unwrap();
        let mut g = BinaryGallery::new(&path, 4);
        assert!(matches!(g.write_block(&list(1)), Err(GalleryError::InvalidFormat(_))));
        assert_eq!(fs::read(&path).unwrap(), b"not a gallery");
    }

    #[test]
    fn tpl_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.tpl");
        let t = Template::new(File::parse("alice.jpg[subject=alice]"), vec![0.5, -0.5]);
        write_tpl(&path, &t).unwrap();
        assert_eq!(read_tpl(&path).unwrap(), t);
    }
}
