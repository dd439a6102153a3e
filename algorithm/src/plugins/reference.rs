//! Stages borrowed from another registered algorithm.
//!
//! `Algorithm(name)` resolves `name` through the engine's registry, which
//! is how one algorithm is built out of another. The referenced
//! algorithm owns the state; models written through these wrappers carry
//! it, and loading one restores it into the registered instance.

use std::io::{Read, Write};
use std::sync::Arc;

use biomatch_gallery::Output;
use biomatch_template::{Template, TemplateList};

use crate::core::AlgorithmCore;
use crate::error::{AlgorithmError, Result};
use crate::plugin::{Distance, Transform};

/// The feature stage of another algorithm.
pub struct AlgorithmTransform {
    core: Arc<AlgorithmCore>,
}

impl AlgorithmTransform {
    pub fn new(core: Arc<AlgorithmCore>) -> Self {
        Self { core }
    }
}

impl Transform for AlgorithmTransform {
    fn train(&self, data: &TemplateList) -> Result<()> {
        self.core.transform().train(data)
    }

    fn project(&self, src: &Template) -> Result<Template> {
        self.core.transform().project(src)
    }

    fn project_list(&self, src: TemplateList) -> Result<TemplateList> {
        self.core.transform().project_list(src)
    }

    fn store(&self, w: &mut dyn Write) -> Result<()> {
        self.core.transform().store(w)
    }

    fn load(&self, r: &mut dyn Read) -> Result<()> {
        self.core.transform().load(r)
    }
}

/// The scoring stage of another algorithm.
pub struct AlgorithmDistance {
    distance: Arc<dyn Distance>,
}

impl AlgorithmDistance {
    /// Fails with `MissingStage` if `core` is a classifier.
    pub fn new(core: &AlgorithmCore) -> Result<Self> {
        let distance = core.distance().cloned().ok_or_else(|| AlgorithmError::MissingStage {
            algorithm: core.name().to_string(),
            stage: "distance",
        })?;
        Ok(Self { distance })
    }
}

impl Distance for AlgorithmDistance {
    fn train(&self, data: &TemplateList) -> Result<()> {
        self.distance.train(data)
    }

    fn score(&self, target: &Template, query: &Template) -> f32 {
        self.distance.score(target, query)
    }

    fn compare(
        &self,
        targets: &TemplateList,
        queries: &TemplateList,
        output: &mut dyn Output,
    ) -> Result<()> {
        self.distance.compare(targets, queries, output)
    }

    fn store(&self, w: &mut dyn Write) -> Result<()> {
        self.distance.store(w)
    }

    fn load(&self, r: &mut dyn Read) -> Result<()> {
        self.distance.load(r)
    }
}
