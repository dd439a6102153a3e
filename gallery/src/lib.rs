//! Block-streamed galleries, similarity outputs and template formats.
//!
//! These are the storage collaborators of the biomatch pipeline. The
//! orchestration core only talks to them through the [`Gallery`] and
//! [`Output`] traits, opened by descriptor through a [`Storage`]:
//!
//! ```
//! use biomatch_gallery::Storage;
//! use biomatch_template::{File, Template};
//!
//! let storage = Storage::new(2);
//! let mut g = storage.open(&File::new("faces.mem")).unwrap();
//! g.write_block(&vec![Template::new(File::new("a"), vec![1.0])].into()).unwrap();
//! assert_eq!(g.files().unwrap().names(), vec!["a"]);
//! ```

mod binary;
mod chain;
mod error;
mod gallery;
mod json;
mod matrix;
mod memory;
mod output;
mod raw;
mod storage;

pub use binary::{read_tpl, write_tpl, BinaryGallery};
pub use chain::ChainGallery;
pub use error::GalleryError;
pub use gallery::Gallery;
pub use json::JsonGallery;
pub use matrix::{read_mtx, write_mtx, Matrix, Simmat};
pub use memory::{MemoryGallery, MemoryStore};
pub use output::{BlockOffset, MatrixOutput, Output};
pub use raw::RawGallery;
pub use storage::{Storage, PRE_ENROLLED};
