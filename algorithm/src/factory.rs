//! Plugin factory: builds stages from expressions.
//!
//! Expression grammar:
//!
//! ```text
//! transform := stage ('+' stage)*     // '+' chains stages into a pipe
//! stage     := Name | Name '(' arg (',' arg)* ')'
//! ```
//!
//! Arguments are kept as raw strings, so an argument may itself be a
//! nested expression (`DistributeTemplate(Center+Normalize)`).

use std::collections::HashMap;
use std::sync::Arc;

use biomatch_template::split_top_level;
use parking_lot::RwLock;
use tracing::trace;

use crate::engine::Engine;
use crate::error::{AlgorithmError, Result};
use crate::plugin::{Distance, Transform};
use crate::plugins;

/// Constructor for a transform, given its arguments.
pub type TransformCtor =
    dyn Fn(&[String], &Engine) -> Result<Box<dyn Transform>> + Send + Sync;

/// Constructor for a distance, given its arguments.
pub type DistanceCtor = dyn Fn(&[String], &Engine) -> Result<Box<dyn Distance>> + Send + Sync;

/// A parsed `Name(arg, ...)` stage expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub name: String,
    pub args: Vec<String>,
}

impl Expr {
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        let Some(open) = expr.find('(') else {
            return Ok(Self {
                name: expr.to_string(),
                args: Vec::new(),
            });
        };
        if !expr.ends_with(')') || open == 0 {
            return Err(AlgorithmError::InvalidDescriptorFormat(expr.to_string()));
        }
        let args = split_top_level(&expr[open + 1..expr.len() - 1], ',')
            .into_iter()
            .filter(|a| !a.is_empty())
            .collect();
        Ok(Self {
            name: expr[..open].trim().to_string(),
            args,
        })
    }
}

/// Registry of named stage constructors.
///
/// Unknown names yield `Ok(None)`; the caller decides whether that is
/// an error.
pub struct Factory {
    transforms: RwLock<HashMap<String, Arc<TransformCtor>>>,
    distances: RwLock<HashMap<String, Arc<DistanceCtor>>>,
}

impl Factory {
    /// A factory with no constructors.
    pub fn empty() -> Self {
        Self {
            transforms: RwLock::new(HashMap::new()),
            distances: RwLock::new(HashMap::new()),
        }
    }

    /// A factory with the built-in stages registered.
    pub fn new() -> Self {
        let f = Self::empty();
        plugins::register_builtins(&f);
        f
    }

    /// Registers (or replaces) a transform constructor.
    pub fn register_transform<F>(&self, name: &str, ctor: F)
    where
        F: Fn(&[String], &Engine) -> Result<Box<dyn Transform>> + Send + Sync + 'static,
    {
        self.transforms
            .write()
            .insert(name.to_string(), Arc::new(ctor));
    }

    /// Registers (or replaces) a distance constructor.
    pub fn register_distance<F>(&self, name: &str, ctor: F)
    where
        F: Fn(&[String], &Engine) -> Result<Box<dyn Distance>> + Send + Sync + 'static,
    {
        self.distances
            .write()
            .insert(name.to_string(), Arc::new(ctor));
    }

    /// Builds a transform from an expression. A `+` chain becomes a pipe
    /// and resolves to `None` if any of its stages is unknown.
    pub fn make_transform(&self, expr: &str, engine: &Engine) -> Result<Option<Box<dyn Transform>>> {
        let parts = split_top_level(expr, '+');
        if parts.len() > 1 {
            let mut stages = Vec::with_capacity(parts.len());
            for part in &parts {
                match self.make_transform(part, engine)? {
                    Some(t) => stages.push(t),
                    None => return Ok(None),
                }
            }
            return Ok(Some(Box::new(plugins::Pipe::new(stages))));
        }

        let e = Expr::parse(expr)?;
        // Constructors may recurse into the factory, so the lock is
        // released before calling them.
        let ctor = self.transforms.read().get(&e.name).cloned();
        match ctor {
            Some(ctor) => {
                trace!(name = %e.name, args = ?e.args, "making transform");
                ctor(&e.args, engine).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Builds a distance from an expression.
    pub fn make_distance(&self, expr: &str, engine: &Engine) -> Result<Option<Box<dyn Distance>>> {
        let e = Expr::parse(expr)?;
        let ctor = self.distances.read().get(&e.name).cloned();
        match ctor {
            Some(ctor) => {
                trace!(name = %e.name, args = ?e.args, "making distance");
                ctor(&e.args, engine).map(Some)
            }
            None => Ok(None),
        }
    }
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn expr_parses_nested_args() {
        let e = Expr::parse("DistributeTemplate(Center+Normalize)").unwrap();
        assert_eq!(e.name, "DistributeTemplate");
        assert_eq!(e.args, vec!["Center+Normalize"]);

        let e = Expr::parse("Algorithm(Face:L2)").unwrap();
        assert_eq!(e.args, vec!["Face:L2"]);

        assert_eq!(Expr::parse("L2").unwrap().args.len(), 0);
        assert!(Expr::parse("Broken(").is_err());
    }

    #[test]
    fn unknown_names_are_none() {
        let engine = Engine::new(Config::default());
        let f = engine.factory();
        assert!(f.make_transform("NoSuchThing", &engine).unwrap().is_none());
        assert!(f.make_transform("Identity+NoSuchThing", &engine).unwrap().is_none());
        assert!(f.make_distance("NoSuchThing", &engine).unwrap().is_none());
        assert!(f.make_transform("Identity+Normalize", &engine).unwrap().is_some());
        assert!(f.make_distance("Cosine", &engine).unwrap().is_some());
    }

    struct Constant(f32);

    impl Distance for Constant {
        fn score(&self, _: &biomatch_template::Template, _: &biomatch_template::Template) -> f32 {
            self.0
        }
    }

    #[test]
    fn registered_ctor_receives_args() {
        let engine = Engine::new(Config::default());
        engine.factory().register_distance("Constant", |args, _| {
            let k: f32 = args
                .first()
                .and_then(|a| a.parse().ok())
                .ok_or_else(|| AlgorithmError::Stage("Constant needs a value".into()))?;
            Ok(Box::new(Constant(k)))
        });
        assert!(engine.factory().make_distance("Constant(2)", &engine).unwrap().is_some());
        assert!(engine.factory().make_distance("Constant", &engine).is_err());
    }
}
