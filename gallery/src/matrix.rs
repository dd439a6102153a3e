use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::ops::Range;
use std::path::Path;

use biomatch_template::File;

use crate::GalleryError;

/// Binary format magic and version for `.mtx` similarity matrices.
const MTX_MAGIC: [u8; 4] = [b'B', b'R', b'M', b'X'];
const MTX_VERSION: u32 = 1;

/// A dense row-major score matrix. Rows are queries, columns are targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Creates a zero-filled matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Builds a matrix from row vectors. All rows must have equal length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, GalleryError> {
        let cols = rows.first().map_or(0, Vec::len);
        let n = rows.len();
        let mut data = Vec::with_capacity(n * cols);
        for row in rows {
            if row.len() != cols {
                return Err(GalleryError::ShapeMismatch {
                    op: "stack",
                    left_rows: 1,
                    left_cols: cols,
                    right_rows: 1,
                    right_cols: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            rows: n,
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<(), GalleryError> {
        if row >= self.rows || col >= self.cols {
            return Err(GalleryError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        self.data[row * self.cols + col] = value;
        Ok(())
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copies a range of columns.
    pub fn columns(&self, range: Range<usize>) -> Self {
        let cols = range.len();
        let mut data = Vec::with_capacity(self.rows * cols);
        for r in 0..self.rows {
            data.extend_from_slice(&self.row(r)[range.clone()]);
        }
        Self {
            rows: self.rows,
            cols,
            data,
        }
    }

    /// Copies a range of rows.
    pub fn row_range(&self, range: Range<usize>) -> Self {
        let rows = range.len();
        Self {
            rows,
            cols: self.cols,
            data: self.data[range.start * self.cols..range.end * self.cols].to_vec(),
        }
    }

    /// Appends the columns of `other`. Row counts must match.
    pub fn hconcat(&self, other: &Matrix) -> Result<Self, GalleryError> {
        if self.rows != other.rows {
            return Err(self.shape_err("hconcat", other));
        }
        let cols = self.cols + other.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for r in 0..self.rows {
            data.extend_from_slice(self.row(r));
            data.extend_from_slice(other.row(r));
        }
        Ok(Self {
            rows: self.rows,
            cols,
            data,
        })
    }

    /// Appends the rows of `other`. Column counts must match.
    pub fn vconcat(&self, other: &Matrix) -> Result<Self, GalleryError> {
        if self.cols != other.cols {
            return Err(self.shape_err("vconcat", other));
        }
        let mut data = Vec::with_capacity(self.data.len() + other.data.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&other.data);
        Ok(Self {
            rows: self.rows + other.rows,
            cols: self.cols,
            data,
        })
    }

    fn shape_err(&self, op: &'static str, other: &Matrix) -> GalleryError {
        GalleryError::ShapeMismatch {
            op,
            left_rows: self.rows,
            left_cols: self.cols,
            right_rows: other.rows,
            right_cols: other.cols,
        }
    }
}

/// A stored similarity matrix together with the galleries it compares.
#[derive(Debug, Clone, PartialEq)]
pub struct Simmat {
    pub matrix: Matrix,
    pub target_gallery: File,
    pub query_gallery: File,
}

/// Writes a similarity matrix in the `.mtx` binary format:
///
/// ```text
/// [4B magic "BRMX"] [4B version=1]
/// [4B len] [len bytes target gallery descriptor]
/// [4B len] [len bytes query gallery descriptor]
/// [4B rows] [4B cols]
/// [rows x cols x 4B float32, row-major]
/// ```
///
/// All multi-byte values are little-endian.
pub fn write_mtx(path: &Path, simmat: &Simmat) -> Result<(), GalleryError> {
    let mut w = BufWriter::new(fs::File::create(path)?);

    w.write_all(&MTX_MAGIC)?;
    w.write_all(&MTX_VERSION.to_le_bytes())?;
    write_str(&mut w, &simmat.target_gallery.flat())?;
    write_str(&mut w, &simmat.query_gallery.flat())?;

    let m = &simmat.matrix;
    w.write_all(&(m.rows as u32).to_le_bytes())?;
    w.write_all(&(m.cols as u32).to_le_bytes())?;
    for v in &m.data {
        w.write_all(&v.to_le_bytes())?;
    }
    w.flush()?;
    Ok(())
}

/// Reads a matrix written by [`write_mtx`].
pub fn read_mtx(path: &Path) -> Result<Simmat, GalleryError> {
    let mut r = BufReader::new(fs::File::open(path)?);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MTX_MAGIC {
        return Err(GalleryError::InvalidFormat(format!(
            "invalid matrix magic {magic:?}"
        )));
    }
    let version = read_u32(&mut r)?;
    if version != MTX_VERSION {
        return Err(GalleryError::InvalidFormat(format!(
            "unsupported matrix version {version} (want {MTX_VERSION})"
        )));
    }

    let target_gallery = File::parse(&read_str(&mut r)?);
    let query_gallery = File::parse(&read_str(&mut r)?);
    let rows = read_u32(&mut r)? as usize;
    let cols = read_u32(&mut r)? as usize;

    let mut data = vec![0.0f32; rows * cols];
    let mut buf = [0u8; 4];
    for v in &mut data {
        r.read_exact(&mut buf)?;
        *v = f32::from_le_bytes(buf);
    }

    Ok(Simmat {
        matrix: Matrix { rows, cols, data },
        target_gallery,
        query_gallery,
    })
}

fn write_str(w: &mut impl Write, s: &str) -> Result<(), GalleryError> {
    w.write_all(&(s.len() as u32).to_le_bytes())?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_u32(r: &mut impl Read) -> Result<u32, GalleryError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_str(r: &mut impl Read) -> Result<String, GalleryError> {
    let len = read_u32(r)? as usize;
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| GalleryError::InvalidFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix {
        Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap()
    }

    #[test]
    fn hconcat_appends_columns() {
        let a = sample();
        let b = Matrix::from_rows(vec![vec![7.0], vec![8.0]]).unwrap();
        let c = a.hconcat(&b).unwrap();
        assert_eq!((c.rows(), c.cols()), (2, 4));
        assert_eq!(c.row(0), &[1.0, 2.0, 3.0, 7.0]);
        assert_eq!(c.row(1), &[4.0, 5.0, 6.0, 8.0]);
        assert_eq!(c.columns(0..3), a);
        assert_eq!(c.columns(3..4), b);
    }

    #[test]
    fn vconcat_appends_rows() {
        let a = sample();
        let c = a.vconcat(&a).unwrap();
        assert_eq!((c.rows(), c.cols()), (4, 3));
        assert_eq!(c.row_range(2..4), a);
    }

    #[test]
    fn concat_rejects_shape_mismatch() {
        let a = sample();
        let b = Matrix::new(3, 1);
        assert!(matches!(
            a.hconcat(&b),
            Err(GalleryError::ShapeMismatch { op: "hconcat", .. })
        ));
        assert!(a.vconcat(&b).is_err());
    }

    #[test]
    fn set_checks_bounds() {
        let mut m = Matrix::new(2, 2);
        m.set(1, 1, 9.0).unwrap();
        assert_eq!(m.at(1, 1), 9.0);
        assert!(matches!(
            m.set(2, 0, 1.0),
            Err(GalleryError::OutOfBounds { row: 2, .. })
        ));
    }

    #[test]
    fn mtx_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.mtx");
        let simmat = Simmat {
            matrix: sample(),
            target_gallery: File::parse("targets.gal"),
            query_gallery: File::parse("queries.gal[enroll]"),
        };
        write_mtx(&path, &simmat).unwrap();
        assert_eq!(read_mtx(&path).unwrap(), simmat);
    }

    #[test]
    fn mtx_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mtx");
        fs::write(&path, b"NOPE\x01\x00\x00\x00").unwrap();
        assert!(matches!(
            read_mtx(&path),
            Err(GalleryError::InvalidFormat(_))
        ));
    }
}
