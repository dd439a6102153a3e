//! Stage contracts implemented by feature-extraction and scoring plugins.
//!
//! Stages are shared between threads once their algorithm is published,
//! so every method takes `&self`. Trainable stages keep their learned
//! state behind interior mutability.

use std::io::{Read, Write};

use biomatch_gallery::Output;
use biomatch_template::{Template, TemplateList};

use crate::error::Result;

/// A feature-extraction stage.
pub trait Transform: Send + Sync {
    /// Learns stage parameters. Stateless stages keep the default.
    fn train(&self, _data: &TemplateList) -> Result<()> {
        Ok(())
    }

    fn project(&self, src: &Template) -> Result<Template>;

    /// Projects a whole collection, preserving order.
    fn project_list(&self, src: TemplateList) -> Result<TemplateList> {
        src.iter().map(|t| self.project(t)).collect()
    }

    /// Serializes learned state into a model.
    fn store(&self, _w: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    /// Restores state written by [`Transform::store`].
    fn load(&self, _r: &mut dyn Read) -> Result<()> {
        Ok(())
    }
}

/// A scoring stage. Higher scores mean more similar.
pub trait Distance: Send + Sync {
    fn train(&self, _data: &TemplateList) -> Result<()> {
        Ok(())
    }

    fn score(&self, target: &Template, query: &Template) -> f32;

    /// Scores every (query, target) pair into `output`, rows indexed by
    /// query and columns by target, relative to the output's current block.
    fn compare(
        &self,
        targets: &TemplateList,
        queries: &TemplateList,
        output: &mut dyn Output,
    ) -> Result<()> {
        for (i, q) in queries.iter().enumerate() {
            for (j, t) in targets.iter().enumerate() {
                output.set_relative(self.score(t, q), i, j)?;
            }
        }
        Ok(())
    }

    fn store(&self, _w: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    fn load(&self, _r: &mut dyn Read) -> Result<()> {
        Ok(())
    }
}
