//! Orchestration core of the biomatch recognition engine.
//!
//! An algorithm descriptor such as `Center+Normalize:L2` names a feature
//! stage and an optional scoring stage. The [`Engine`] resolves
//! descriptors into shared [`AlgorithmCore`]s and drives them:
//!
//! - [`Engine::train`] fits the stages on a gallery and stores a model;
//! - [`Engine::enroll`] streams inputs through the feature stage into a
//!   gallery;
//! - [`Engine::compare`] scores two galleries into one or more outputs;
//! - [`Engine::convert`] and [`Engine::cat`] reshape stored results.
//!
//! ```
//! use biomatch_algorithm::{Config, Engine, File};
//!
//! let engine = Engine::new(Config::default().with_algorithm("Identity:L2"));
//! assert!(!engine.is_classifier("").unwrap());
//! assert!(engine.is_classifier("Normalize").unwrap());
//! assert!(engine.enroll(&File::default(), &File::default()).unwrap().is_empty());
//! ```

mod blocks;
mod compare;
mod config;
mod convert;
mod core;
mod engine;
mod enroll;
mod error;
mod factory;
mod manager;
pub mod model;
mod plugin;
pub mod plugins;
mod progress;
mod resolver;


pub use blocks::sub_blocks;
pub use config::Config;
pub use convert::Kind;
pub use crate::core::{AlgorithmCore, Stages};
pub use engine::{CancelToken, Engine};
pub use error::{AlgorithmError, Result};
pub use factory::{DistanceCtor, Expr, Factory, TransformCtor};
pub use manager::AlgorithmManager;
pub use plugin::{Distance, Transform};
pub use progress::Progress;

pub use biomatch_gallery::{BlockOffset, Gallery, GalleryError, Output, Storage};
pub use biomatch_template::{File, FileList, Template, TemplateList};
