//! Engine configuration.
//!
//! Every field has a default, so a YAML file only needs the keys it
//! changes:
//!
//! ```yaml
//! algorithm: "Center+Normalize:Cosine"
//! parallelism: 8
//! abbreviations:
//!   FaceRecognition: "Center+Normalize:L2"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AlgorithmError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Algorithm used when a descriptor carries no `algorithm` option.
    pub algorithm: String,

    /// Worker threads for parallel projection.
    pub parallelism: usize,

    /// Templates per enrollment/comparison block. 0 means
    /// `parallelism * 1024`.
    pub block_size: usize,

    /// Templates per enrollment sub-block. 0 means
    /// `4 * max(1, parallelism)`.
    pub sub_block_size: usize,

    /// Root searched for prebuilt models under
    /// `share/biomatch/models/algorithms/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_path: Option<PathBuf>,

    /// Suppresses enrollment and training summaries.
    pub quiet: bool,

    /// Short names expanded to full algorithm descriptors.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub abbreviations: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: String::new(),
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            block_size: 0,
            sub_block_size: 0,
            sdk_path: None,
            quiet: false,
            abbreviations: HashMap::new(),
        }
    }
}

impl Config {
    /// Loads a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AlgorithmError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| AlgorithmError::Config(e.to_string()))
    }

    pub fn with_algorithm(mut self, algorithm: &str) -> Self {
        self.algorithm = algorithm.to_string();
        self
    }

    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.parallelism = n;
        self
    }

    pub fn with_block_size(mut self, n: usize) -> Self {
        self.block_size = n;
        self
    }

    pub fn with_sub_block_size(mut self, n: usize) -> Self {
        self.sub_block_size = n;
        self
    }

    pub fn with_sdk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sdk_path = Some(path.into());
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_abbreviation(mut self, short: &str, expansion: &str) -> Self {
        self.abbreviations
            .insert(short.to_string(), expansion.to_string());
        self
    }

    pub fn effective_block_size(&self) -> usize {
        match self.block_size {
            0 => self.parallelism.max(1) * 1024,
            n => n,
        }
    }

    pub fn effective_sub_block_size(&self) -> usize {
        match self.sub_block_size {
            0 => 4 * self.parallelism.max(1),
            n => n,
        }
    }

    /// Location of a prebuilt model for `descriptor`, if an SDK path is set.
    pub fn prebuilt_model(&self, descriptor: &str) -> Option<PathBuf> {
        self.sdk_path.as_ref().map(|root| {
            root.join("share/biomatch/models/algorithms")
                .join(descriptor)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_defaults() {
        let cfg = Config::from_yaml(
            "algorithm: Identity:L2\nblock_size: 3\nabbreviations:\n  Face: Normalize:Cosine\n",
        )
        .unwrap();
        assert_eq!(cfg.algorithm, "Identity:L2");
        assert_eq!(cfg.effective_block_size(), 3);
        assert_eq!(cfg.abbreviations["Face"], "Normalize:Cosine");
        assert!(cfg.parallelism >= 1);
        assert!(!cfg.quiet);
    }

    #[test]
    fn zero_sizes_derive_from_parallelism() {
        let cfg = Config::default().with_parallelism(2);
        assert_eq!(cfg.effective_block_size(), 2048);
        assert_eq!(cfg.effective_sub_block_size(), 8);

        let cfg = cfg.with_parallelism(0);
        assert_eq!(cfg.effective_sub_block_size(), 4);
    }

    #[test]
    fn bad_yaml_is_config_error() {
        assert!(matches!(
            Config::from_yaml("parallelism: [oops"),
            Err(AlgorithmError::Config(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("br.yaml");
        std::fs::write(&path, "quiet: true\n").unwrap();
        assert!(Config::load(&path).unwrap().quiet);
        assert!(Config::load(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn prebuilt_model_path() {
        let cfg = Config::default().with_sdk_path("/opt/sdk");
        assert_eq!(
            cfg.prebuilt_model("Face").unwrap(),
            PathBuf::from("/opt/sdk/share/biomatch/models/algorithms/Face")
        );
        assert!(Config::default().prebuilt_model("Face").is_none());
    }
}
