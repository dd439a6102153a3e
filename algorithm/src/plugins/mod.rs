//! Built-in stages.

mod basic;
mod distance;
mod distribute;
mod pipe;
mod reference;

pub use basic::{Center, Identity, Normalize};
pub use distance::{Cosine, L2};
pub use distribute::DistributeTemplate;
pub use pipe::Pipe;
pub use reference::{AlgorithmDistance, AlgorithmTransform};

use crate::error::{AlgorithmError, Result};
use crate::factory::Factory;

fn single_arg<'a>(name: &str, args: &'a [String]) -> Result<&'a str> {
    match args {
        [arg] => Ok(arg.as_str()),
        _ => Err(AlgorithmError::Stage(format!(
            "{name} takes one argument, got {}",
            args.len()
        ))),
    }
}

pub(crate) fn register_builtins(f: &Factory) {
    f.register_transform("Identity", |_, _| Ok(Box::new(Identity)));
    f.register_transform("Normalize", |_, _| Ok(Box::new(Normalize)));
    f.register_transform("Center", |_, _| Ok(Box::new(Center::default())));
    f.register_transform("DistributeTemplate", |args, engine| {
        let expr = single_arg("DistributeTemplate", args)?;
        let inner = engine.factory().make_transform(expr, engine)?.ok_or_else(|| {
            AlgorithmError::UnresolvedStage {
                kind: "transform",
                expr: expr.to_string(),
            }
        })?;
        Ok(Box::new(DistributeTemplate::new(
            inner,
            engine.config().parallelism,
        )?))
    });
    f.register_transform("Algorithm", |args, engine| {
        let name = single_arg("Algorithm", args)?;
        Ok(Box::new(AlgorithmTransform::new(engine.algorithm(name)?)))
    });

    f.register_distance("L2", |_, _| Ok(Box::new(L2)));
    f.register_distance("Cosine", |_, _| Ok(Box::new(Cosine)));
    f.register_distance("Algorithm", |args, engine| {
        let name = single_arg("Algorithm", args)?;
        let core = engine.algorithm(name)?;
        Ok(Box::new(AlgorithmDistance::new(&core)?))
    });
}
