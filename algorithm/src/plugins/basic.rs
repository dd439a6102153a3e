use std::io::{Read, Write};

use biomatch_template::{Template, TemplateList};
use parking_lot::RwLock;

use crate::error::Result;
use crate::model::{read_f32s, write_f32s};
use crate::plugin::Transform;

/// Passes templates through unchanged.
pub struct Identity;

impl Transform for Identity {
    fn project(&self, src: &Template) -> Result<Template> {
        Ok(src.clone())
    }
}

/// Scales each feature vector to unit L2 norm. Zero vectors are kept.
pub struct Normalize;

impl Transform for Normalize {
    fn project(&self, src: &Template) -> Result<Template> {
        let norm = src.data.iter().map(|x| x * x).sum::<f32>().sqrt();
        let data = if norm > 0.0 {
            src.data.iter().map(|x| x / norm).collect()
        } else {
            src.data.clone()
        };
        Ok(Template::new(src.file.clone(), data))
    }
}

/// Subtracts the mean feature vector learned during training.
///
/// Untrained, or given a vector of another length, it passes data through.
#[derive(Default)]
pub struct Center {
    mean: RwLock<Vec<f32>>,
}

impl Center {
    pub fn mean(&self) -> Vec<f32> {
        self.mean.read().clone()
    }
}

impl Transform for Center {
    fn train(&self, data: &TemplateList) -> Result<()> {
        let samples: Vec<&Template> = data
            .iter()
            .filter(|t| !t.data.is_empty() && !t.file.failed())
            .collect();
        let Some(first) = samples.first() else {
            self.mean.write().clear();
            return Ok(());
        };

        let dim = first.data.len();
        let mut sum = vec![0f64; dim];
        let mut n = 0usize;
        for t in samples.iter().filter(|t| t.data.len() == dim) {
            for (s, x) in sum.iter_mut().zip(&t.data) {
                *s += *x as f64;
            }
            n += 1;
        }
        *self.mean.write() = sum.into_iter().map(|s| (s / n as f64) as f32).collect();
        Ok(())
    }

    fn project(&self, src: &Template) -> Result<Template> {
        let mean = self.mean.read();
        if mean.is_empty() || mean.len() != src.data.len() {
            return Ok(src.clone());
        }
        let data = src.data.iter().zip(mean.iter()).map(|(x, m)| x - m).collect();
        Ok(Template::new(src.file.clone(), data))
    }

    fn store(&self, w: &mut dyn Write) -> Result<()> {
        write_f32s(w, &self.mean.read())
    }

    fn load(&self, r: &mut dyn Read) -> Result<()> {
        *self.mean.write() = read_f32s(r)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biomatch_template::File;

    fn t(data: Vec<f32>) -> Template {
        Template::new(File::new("x"), data)
    }

    #[test]
    fn normalize_unit_length() {
        let out = Normalize.project(&t(vec![3.0, 4.0])).unwrap();
        assert_eq!(out.data, vec![0.6, 0.8]);
        assert_eq!(Normalize.project(&t(vec![0.0, 0.0])).unwrap().data, vec![0.0, 0.0]);
    }

    #[test]
    fn center_learns_mean() {
        let c = Center::default();
        assert_eq!(c.project(&t(vec![1.0])).unwrap().data, vec![1.0]);

        let data: TemplateList = vec![t(vec![1.0, 2.0]), t(vec![3.0, 4.0]), t(vec![])].into();
        c.train(&data).unwrap();
        assert_eq!(c.mean(), vec![2.0, 3.0]);
        assert_eq!(c.project(&t(vec![2.0, 5.0])).unwrap().data, vec![0.0, 2.0]);
    }

    #[test]
    fn center_state_round_trips() {
        let c = Center::default();
        c.train(&vec![t(vec![4.0])].into()).unwrap();
        let mut buf = Vec::new();
        c.store(&mut buf).unwrap();

        let restored = Center::default();
        restored.load(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.mean(), vec![4.0]);
    }
}
