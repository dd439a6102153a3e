use std::io::{Read, Write};

use biomatch_template::{Template, TemplateList};

use crate::error::Result;
use crate::plugin::Transform;

/// Chains transforms; built by the factory from `a+b+c`.
///
/// Training is sequential: each stage trains on the output of the
/// already-trained stages before it.
pub struct Pipe {
    stages: Vec<Box<dyn Transform>>,
}

impl Pipe {
    pub fn new(stages: Vec<Box<dyn Transform>>) -> Self {
        Self { stages }
    }
}

impl Transform for Pipe {
    fn train(&self, data: &TemplateList) -> Result<()> {
        let mut current = data.clone();
        for (i, stage) in self.stages.iter().enumerate() {
            stage.train(&current)?;
            if i + 1 < self.stages.len() {
                current = stage.project_list(current)?;
            }
        }
        Ok(())
    }

    fn project(&self, src: &Template) -> Result<Template> {
        let mut t = src.clone();
        for stage in &self.stages {
            t = stage.project(&t)?;
        }
        Ok(t)
    }

    fn project_list(&self, src: TemplateList) -> Result<TemplateList> {
        self.stages
            .iter()
            .try_fold(src, |acc, stage| stage.project_list(acc))
    }

    fn store(&self, w: &mut dyn Write) -> Result<()> {
        for stage in &self.stages {
            stage.store(w)?;
        }
        Ok(())
    }

    fn load(&self, r: &mut dyn Read) -> Result<()> {
        for stage in &self.stages {
            stage.load(r)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{Center, Normalize};
    use biomatch_template::File;

    #[test]
    fn stages_apply_in_order() {
        let pipe = Pipe::new(vec![Box::new(Center::default()), Box::new(Normalize)]);
        let data: TemplateList = vec![
            Template::new(File::new("a"), vec![0.0, 0.0]),
            Template::new(File::new("b"), vec![2.0, 2.0]),
        ]
        .into();
        pipe.train(&data).unwrap();

        let out = pipe.project_list(data).unwrap();
        let s = 1.0 / 2f32.sqrt();
        assert_eq!(out[0].data, vec![-s, -s]);
        assert_eq!(out[1].data, vec![s, s]);
        assert_eq!(out.files().names(), vec!["a", "b"]);
    }
}
