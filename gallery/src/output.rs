use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use biomatch_template::{File, FileList};
use tracing::debug;

use crate::matrix::{write_mtx, Matrix, Simmat};
use crate::memory::MemoryStore;
use crate::GalleryError;

/// Position of the current block pair inside an output.
///
/// `row` and `col` are the global offsets of the pair's first query and
/// first target within this output; cells written with
/// [`Output::set_relative`] are relative to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockOffset {
    pub query_block: usize,
    pub target_block: usize,
    pub row: usize,
    pub col: usize,
}

/// A similarity matrix sink addressed by (query row, target column).
pub trait Output: Send {
    /// Sizes the output for the given targets (columns) and queries (rows).
    fn initialize(&mut self, targets: &FileList, queries: &FileList) -> Result<(), GalleryError>;

    /// Announces the block pair whose scores follow.
    fn set_block(&mut self, offset: BlockOffset);

    /// Records a score relative to the current block.
    fn set_relative(&mut self, score: f32, row: usize, col: usize) -> Result<(), GalleryError>;

    /// Writes the buffered matrix out. Dropping an output without
    /// finalizing discards it.
    fn finalize(self: Box<Self>) -> Result<(), GalleryError>;
}

enum Sink {
    Memory { store: MemoryStore, name: String },
    Mtx(PathBuf),
    Csv(PathBuf),
}

/// Buffers the whole matrix in memory and writes it at finalize time, so
/// a failed comparison never leaves a partial file behind.
pub struct MatrixOutput {
    sink: Sink,
    target_gallery: File,
    query_gallery: File,
    targets: FileList,
    queries: FileList,
    matrix: Option<Matrix>,
    offset: BlockOffset,
}

impl MatrixOutput {
    /// Output kept in `store` under the descriptor name (`.mem`).
    pub fn memory(store: MemoryStore, file: &File) -> Self {
        Self::new(
            Sink::Memory {
                store,
                name: file.name.clone(),
            },
            file,
        )
    }

    /// Output written as a `.mtx` binary matrix.
    pub fn mtx(file: &File) -> Self {
        Self::new(Sink::Mtx(PathBuf::from(&file.name)), file)
    }

    /// Output written as CSV with a header row of target names and one
    /// line per query.
    pub fn csv(file: &File) -> Self {
        Self::new(Sink::Csv(PathBuf::from(&file.name)), file)
    }

    fn new(sink: Sink, file: &File) -> Self {
        let gallery = |key: &str| file.get_string(key).map(|s| File::parse(&s)).unwrap_or_default();
        Self {
            sink,
            target_gallery: gallery("targetGallery"),
            query_gallery: gallery("queryGallery"),
            targets: FileList::new(),
            queries: FileList::new(),
            matrix: None,
            offset: BlockOffset::default(),
        }
    }
}

impl Output for MatrixOutput {
    fn initialize(&mut self, targets: &FileList, queries: &FileList) -> Result<(), GalleryError> {
        self.targets = targets.clone();
        self.queries = queries.clone();
        self.matrix = Some(Matrix::new(queries.len(), targets.len()));
        Ok(())
    }

    fn set_block(&mut self, offset: BlockOffset) {
        self.offset = offset;
    }

    fn set_relative(&mut self, score: f32, row: usize, col: usize) -> Result<(), GalleryError> {
        let m = self.matrix.as_mut().ok_or(GalleryError::Uninitialized)?;
        m.set(self.offset.row + row, self.offset.col + col, score)
    }

    fn finalize(self: Box<Self>) -> Result<(), GalleryError> {
        let this = *self;
        let matrix = this.matrix.ok_or(GalleryError::Uninitialized)?;
        let simmat = Simmat {
            matrix,
            target_gallery: this.target_gallery,
            query_gallery: this.query_gallery,
        };

        match this.sink {
            Sink::Memory { store, name } => {
                debug!(%name, "storing matrix in memory");
                store.insert_matrix(name, simmat);
            }
            Sink::Mtx(path) => {
                debug!(path = %path.display(), "writing matrix");
                write_mtx(&path, &simmat)?;
            }
            Sink::Csv(path) => {
                debug!(path = %path.display(), "writing csv");
                write_csv(&path, &simmat.matrix, &this.targets, &this.queries)?;
            }
        }
        Ok(())
    }
}

fn write_csv(
    path: &Path,
    m: &Matrix,
    targets: &FileList,
    queries: &FileList,
) -> Result<(), GalleryError> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    let header: Vec<String> = targets.iter().map(|f| csv_field(&f.name)).collect();
    writeln!(w, "File,{}", header.join(","))?;
    for (r, q) in queries.iter().enumerate() {
        let scores: Vec<String> = m.row(r).iter().map(|s| s.to_string()).collect();
        writeln!(w, "{},{}", csv_field(&q.name), scores.join(","))?;
    }
    w.flush()?;
    Ok(())
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(prefix: &str, n: usize) -> FileList {
        (0..n).map(|i| File::new(format!("{prefix}{i}"))).collect()
    }

    #[test]
    fn cells_are_offset_by_block() {
        let store = MemoryStore::new();
        let file = File::parse("s.mem[targetGallery=t.gal,queryGallery=q.gal]");
        let mut out: Box<dyn Output> = Box::new(MatrixOutput::memory(store.clone(), &file));
        out.initialize(&files("t", 4), &files("q", 3)).unwrap();

        out.set_block(BlockOffset { query_block: 1, target_block: 1, row: 2, col: 2 });
        out.set_relative(7.0, 0, 1).unwrap();
        out.set_block(BlockOffset::default());
        out.set_relative(1.0, 0, 0).unwrap();
        out.finalize().unwrap();

        let s = store.matrix("s.mem").unwrap();
        assert_eq!(s.matrix.at(2, 3), 7.0);
        assert_eq!(s.matrix.at(0, 0), 1.0);
        assert_eq!(s.target_gallery.name, "t.gal");
        assert_eq!(s.query_gallery.name, "q.gal");
    }

    #[test]
    fn uninitialized_output_errors() {
        let mut out = MatrixOutput::memory(MemoryStore::new(), &File::new("x.mem"));
        assert!(matches!(
            out.set_relative(0.0, 0, 0),
            Err(GalleryError::Uninitialized)
        ));
    }

    #[test]
    fn out_of_range_cell_errors() {
        let mut out = MatrixOutput::memory(MemoryStore::new(), &File::new("x.mem"));
        out.initialize(&files("t", 1), &files("q", 1)).unwrap();
        assert!(out.set_relative(0.0, 0, 1).is_err());
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.csv");
        let mut out: Box<dyn Output> =
            Box::new(MatrixOutput::csv(&File::new(path.to_string_lossy())));
        out.initialize(&files("t", 2), &files("q,", 1)).unwrap();
        out.set_relative(0.5, 0, 1).unwrap();
        out.finalize().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "File,t0,t1\n\"q,0\",0,0.5\n");
    }

    #[test]
    fn dropped_output_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.mtx");
        let mut out = MatrixOutput::mtx(&File::new(path.to_string_lossy()));
        out.initialize(&files("t", 1), &files("q", 1)).unwrap();
        drop(out);
        assert!(!path.exists());
    }
}
