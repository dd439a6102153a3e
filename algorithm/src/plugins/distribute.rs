use std::io::{Read, Write};

use biomatch_template::{Template, TemplateList};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{AlgorithmError, Result};
use crate::plugin::Transform;

/// Projects collections on a dedicated rayon pool.
///
/// Output order matches input order. Training and single-template
/// projection run on the caller's thread.
pub struct DistributeTemplate {
    inner: Box<dyn Transform>,
    pool: ThreadPool,
}

impl DistributeTemplate {
    pub fn new(inner: Box<dyn Transform>, threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("biomatch-project-{i}"))
            .build()
            .map_err(|e| AlgorithmError::Stage(format!("thread pool: {e}")))?;
        Ok(Self { inner, pool })
    }
}

impl Transform for DistributeTemplate {
    fn train(&self, data: &TemplateList) -> Result<()> {
        self.inner.train(data)
    }

    fn project(&self, src: &Template) -> Result<Template> {
        self.inner.project(src)
    }

    fn project_list(&self, src: TemplateList) -> Result<TemplateList> {
        if src.len() < 2 {
            return self.inner.project_list(src);
        }
        let inner = &self.inner;
        let out: Vec<Template> = self
            .pool
            .install(|| src.par_iter().map(|t| inner.project(t)).collect::<Result<_>>())?;
        Ok(out.into())
    }

    fn store(&self, w: &mut dyn Write) -> Result<()> {
        self.inner.store(w)
    }

    fn load(&self, r: &mut dyn Read) -> Result<()> {
        self.inner.load(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::Normalize;
    use biomatch_template::File;

    #[test]
    fn preserves_order() {
        let d = DistributeTemplate::new(Box::new(Normalize), 4).unwrap();
        let src: TemplateList = (1..=100)
            .map(|i| Template::new(File::new(format!("t{i}")), vec![i as f32]))
            .collect();
        let out = d.project_list(src.clone()).unwrap();
        assert_eq!(out.files(), src.files());
        assert!(out.iter().all(|t| t.data == vec![1.0]));
    }
}
