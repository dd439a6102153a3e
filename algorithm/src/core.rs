use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use biomatch_template::File;
use tracing::info;

use crate::engine::Engine;
use crate::error::{AlgorithmError, Result};
use crate::model;
use crate::plugin::{Distance, Transform};

/// The stages an algorithm descriptor resolves to.
pub struct Stages {
    pub transform: Arc<dyn Transform>,
    pub distance: Option<Arc<dyn Distance>>,
}

/// One resolved algorithm: a feature stage and an optional scoring stage.
///
/// Instances are shared through the engine's registry. The pipelines
/// (`enroll`, `compare`) live in their own modules.
pub struct AlgorithmCore {
    name: String,
    transform: Arc<dyn Transform>,
    distance: Option<Arc<dyn Distance>>,
}

impl AlgorithmCore {
    pub fn new(name: impl Into<String>, stages: Stages) -> Self {
        Self {
            name: name.into(),
            transform: stages.transform,
            distance: stages.distance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> &Arc<dyn Transform> {
        &self.transform
    }

    pub fn distance(&self) -> Option<&Arc<dyn Distance>> {
        self.distance.as_ref()
    }

    /// A classifier has no scoring stage.
    pub fn is_classifier(&self) -> bool {
        self.distance.is_none()
    }

    pub(crate) fn require_distance(&self) -> Result<&Arc<dyn Distance>> {
        self.distance
            .as_ref()
            .ok_or_else(|| AlgorithmError::MissingStage {
                algorithm: self.name.clone(),
                stage: "distance",
            })
    }

    /// Name of the in-memory gallery caching this algorithm's enrollment
    /// of `input`. Descriptor separators are replaced so the name always
    /// opens as a single `.mem` gallery.
    pub fn memory_gallery(&self, input: &File) -> File {
        let stem: String = format!("{}{}", self.name, input.base_name())
            .chars()
            .map(|c| match c {
                ';' | '[' | ']' | ',' => '_',
                c => c,
            })
            .collect();
        File::new(format!("{stem}{}.mem", input.hash()))
    }

    /// Trains both stages on the whole of `input` and, if `model` is
    /// named, stores the result there.
    ///
    /// Not safe while other callers use this algorithm.
    pub fn train(&self, engine: &Engine, input: &File, model: &File) -> Result<()> {
        info!(input = %input, model = %model, algorithm = %self.name, "training");
        let started = Instant::now();

        let mut data = engine.storage().read_all(input)?;
        for t in data.iter_mut() {
            t.file.set("Train", true);
        }
        info!(count = data.len(), "training files");

        self.transform.train(&data)?;
        if let Some(distance) = &self.distance {
            let projected = self.transform.project_list(data)?;
            distance.train(&projected)?;
        }

        if !model.is_null() {
            self.store(Path::new(&model.name))?;
        }

        if !engine.config().quiet {
            info!(elapsed = ?started.elapsed(), "training done");
        }
        Ok(())
    }

    /// Writes a model file for this algorithm.
    pub fn store(&self, path: &Path) -> Result<()> {
        model::store(self, path)
    }
}
