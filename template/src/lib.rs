//! Descriptors, templates and file lists shared by the biomatch pipeline.
//!
//! A [`File`] names anything the engine touches: an input image, a
//! gallery, a similarity matrix or an algorithm. Options ride along in a
//! trailing bracket block:
//!
//! ```
//! use biomatch_template::File;
//!
//! let out = File::parse("scores_%1.mtx[split=[4,6],algorithm=Center:L2]");
//! assert_eq!(out.name, "scores_%1.mtx");
//! assert_eq!(out.get_usize_list("split"), Some(vec![4, 6]));
//! assert_eq!(out.arg(0).name, "scores_0.mtx");
//! ```
//!
//! A [`Template`] pairs a descriptor with its feature data; galleries and
//! stages exchange [`TemplateList`]s.

mod file;
pub mod parse;
mod template;

pub use file::{File, FileList, SPLIT_PLACEHOLDER};
pub use parse::split_top_level;
pub use template::{Template, TemplateList};
