//! Descriptor resolution.
//!
//! A descriptor resolves, first match wins, to:
//!
//! 1. the prebuilt model `<sdk_path>/share/biomatch/models/algorithms/<descriptor>`;
//! 2. the model file the descriptor names;
//! 3. the expansion of a configured abbreviation, resolved again;
//! 4. a parsed `feature[:distance]` expression.
//!
//! Loading a model re-resolves the stored name with steps 3 and 4 only.

use std::path::Path;
use std::sync::Arc;

use biomatch_template::{split_top_level, File};
use tracing::debug;

use crate::core::Stages;
use crate::engine::Engine;
use crate::error::{AlgorithmError, Result};
use crate::model;

/// Resolves `descriptor`, returning the algorithm's name and stages. The
/// name differs from the descriptor only when a model file was loaded.
pub(crate) fn resolve(descriptor: &str, engine: &Engine) -> Result<(String, Stages)> {
    let mut seen = Vec::new();
    resolve_inner(descriptor, engine, true, &mut seen)
}

/// Resolves abbreviations and expressions, never touching the disk.
pub(crate) fn resolve_expression(descriptor: &str, engine: &Engine) -> Result<Stages> {
    let mut seen = Vec::new();
    resolve_inner(descriptor, engine, false, &mut seen).map(|(_, s)| s)
}

fn resolve_inner(
    descriptor: &str,
    engine: &Engine,
    files: bool,
    seen: &mut Vec<String>,
) -> Result<(String, Stages)> {
    if files {
        if let Some(path) = engine.config().prebuilt_model(descriptor) {
            if path.is_file() {
                debug!(path = %path.display(), "using prebuilt model");
                return model::load(&path, engine);
            }
        }
        let file = File::parse(descriptor);
        if !file.is_null() && Path::new(&file.name).is_file() {
            return model::load(Path::new(&file.name), engine);
        }
    }

    if let Some(expansion) = engine.config().abbreviations.get(descriptor) {
        if seen.iter().any(|s| s == descriptor) {
            return Err(AlgorithmError::RecursiveDescriptor(descriptor.to_string()));
        }
        seen.push(descriptor.to_string());
        debug!(%descriptor, %expansion, "expanding abbreviation");
        let expansion = expansion.clone();
        let (_, stages) = resolve_inner(&expansion, engine, files, seen)?;
        return Ok((descriptor.to_string(), stages));
    }

    parse(descriptor, engine).map(|s| (descriptor.to_string(), s))
}

fn parse(descriptor: &str, engine: &Engine) -> Result<Stages> {
    let file = File::parse(descriptor);
    let words = split_top_level(&file.name, ':');
    if words.len() > 2 || words.iter().any(|w| w.is_empty()) {
        return Err(AlgorithmError::InvalidDescriptorFormat(descriptor.to_string()));
    }

    let feature = if file.get_bool_or("distribute", true) {
        format!("DistributeTemplate({})", words[0])
    } else {
        words[0].clone()
    };

    let transform = engine
        .factory()
        .make_transform(&feature, engine)?
        .ok_or_else(|| AlgorithmError::UnresolvedStage {
            kind: "transform",
            expr: words[0].clone(),
        })?;

    let distance = match words.get(1) {
        Some(expr) => Some(Arc::from(
            engine.factory().make_distance(expr, engine)?.ok_or_else(|| {
                AlgorithmError::UnresolvedStage {
                    kind: "distance",
                    expr: expr.clone(),
                }
            })?,
        )),
        None => None,
    };

    Ok(Stages {
        transform: Arc::from(transform),
        distance,
    })
}
