use std::path::Path;

use biomatch_template::{split_top_level, File, Template, TemplateList};
use tracing::debug;

use crate::binary::{read_tpl, write_tpl, BinaryGallery};
use crate::chain::ChainGallery;
use crate::gallery::Gallery;
use crate::json::JsonGallery;
use crate::matrix::{read_mtx, Simmat};
use crate::memory::{MemoryGallery, MemoryStore};
use crate::output::{MatrixOutput, Output};
use crate::raw::RawGallery;
use crate::GalleryError;

/// Gallery suffixes that hold already-enrolled templates.
pub const PRE_ENROLLED: &[&str] = &["gal", "mem"];

/// Opens galleries, outputs and template files by descriptor suffix.
///
/// | suffix | gallery        | output         | template |
/// |--------|----------------|----------------|----------|
/// | `mem`  | [`MemoryGallery`] | in memory   |          |
/// | `gal`  | [`BinaryGallery`] |             |          |
/// | `json` | [`JsonGallery`]   |             | JSON     |
/// | `mtx`  |                   | binary matrix |        |
/// | `csv`  |                   | CSV         |          |
/// | `tpl`  |                   |             | MessagePack |
///
/// Any other gallery descriptor is read as a single raw template, and
/// `;` joins several galleries into one read-only list.
#[derive(Clone)]
pub struct Storage {
    memory: MemoryStore,
    block_size: usize,
}

impl Storage {
    pub fn new(block_size: usize) -> Self {
        Self {
            memory: MemoryStore::new(),
            block_size: block_size.max(1),
        }
    }

    /// The store backing every `.mem` gallery and output.
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// True when `file` names a gallery, or a `;`-separated list of
    /// galleries, of already-enrolled templates.
    pub fn is_pre_enrolled(file: &File) -> bool {
        split_top_level(&file.name, ';')
            .iter()
            .filter(|n| !n.is_empty())
            .all(|n| PRE_ENROLLED.contains(&File::new(n.as_str()).suffix().as_str()))
            && !file.is_null()
    }

    /// Opens a gallery for block-wise reading and writing. A `;`-separated
    /// list opens as one read-only [`ChainGallery`]; each part inherits
    /// the descriptor's options.
    pub fn open(&self, file: &File) -> Result<Box<dyn Gallery>, GalleryError> {
        if file.is_null() {
            return Err(GalleryError::Unsupported {
                kind: "gallery",
                name: String::new(),
            });
        }
        let names: Vec<String> = split_top_level(&file.name, ';')
            .into_iter()
            .filter(|n| !n.is_empty())
            .collect();
        if names.len() > 1 {
            let parts = names
                .into_iter()
                .map(|name| {
                    self.open(&File {
                        name,
                        options: file.options.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Box::new(ChainGallery::new(parts)));
        }
        debug!(gallery = %file, "opening gallery");
        let g: Box<dyn Gallery> = match file.suffix().as_str() {
            "mem" => Box::new(MemoryGallery::new(
                self.memory.clone(),
                file.name.clone(),
                self.block_size,
            )),
            "gal" => Box::new(BinaryGallery::new(&file.name, self.block_size)),
            "json" => Box::new(JsonGallery::new(&file.name, self.block_size)),
            _ => Box::new(RawGallery::new(file.clone())),
        };
        Ok(g)
    }

    /// Reads a whole collection.
    pub fn read_all(&self, file: &File) -> Result<TemplateList, GalleryError> {
        self.open(file)?.read_all()
    }

    /// Creates an output. It must be initialized before cells are set.
    pub fn make_output(&self, file: &File) -> Result<Box<dyn Output>, GalleryError> {
        let o: Box<dyn Output> = match file.suffix().as_str() {
            "mem" => Box::new(MatrixOutput::memory(self.memory.clone(), file)),
            "mtx" => Box::new(MatrixOutput::mtx(file)),
            "csv" => Box::new(MatrixOutput::csv(file)),
            _ => {
                return Err(GalleryError::Unsupported {
                    kind: "output",
                    name: file.name.clone(),
                });
            }
        };
        Ok(o)
    }

    /// True when a previously finalized output exists for `file`.
    pub fn output_exists(&self, file: &File) -> bool {
        match file.suffix().as_str() {
            "mem" => self.memory.contains_matrix(&file.name),
            _ => file.exists(),
        }
    }

    /// Reads a stored similarity matrix.
    pub fn read_simmat(&self, file: &File) -> Result<Simmat, GalleryError> {
        match file.suffix().as_str() {
            "mem" => self
                .memory
                .matrix(&file.name)
                .ok_or_else(|| GalleryError::NotFound(file.name.clone())),
            "mtx" => read_mtx(Path::new(&file.name)),
            _ => Err(GalleryError::Unsupported {
                kind: "matrix",
                name: file.name.clone(),
            }),
        }
    }

    /// Reads one encoded template.
    pub fn read_template(&self, file: &File) -> Result<Template, GalleryError> {
        let path = Path::new(&file.name);
        match file.suffix().as_str() {
            "tpl" => read_tpl(path),
            "json" => {
                let bytes = std::fs::read(path)?;
                serde_json::from_slice(&bytes)
                    .map_err(|e| GalleryError::InvalidFormat(e.to_string()))
            }
            _ => Err(GalleryError::Unsupported {
                kind: "format",
                name: file.name.clone(),
            }),
        }
    }

    /// Writes one encoded template.
    pub fn write_template(&self, file: &File, t: &Template) -> Result<(), GalleryError> {
        let path = Path::new(&file.name);
        match file.suffix().as_str() {
            "tpl" => write_tpl(path, t),
            "json" => {
                let json = serde_json::to_vec_pretty(t)
                    .map_err(|e| GalleryError::InvalidFormat(e.to_string()))?;
                std::fs::write(path, json)?;
                Ok(())
            }
            _ => Err(GalleryError::Unsupported {
                kind: "format",
                name: file.name.clone(),
            }),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new(1024)
    }
}
