use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::file::{File, FileList};

/// Feature data plus the descriptor it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub file: File,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<f32>,
}

impl Template {
    pub fn new(file: File, data: Vec<f32>) -> Self {
        Self { file, data }
    }

    /// A template that only names its source; the data is filled in
    /// later by a feature stage.
    pub fn from_file(file: File) -> Self {
        Self {
            file,
            data: Vec::new(),
        }
    }

    /// Size of the feature data in bytes.
    pub fn bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// An ordered collection of templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateList(Vec<Template>);

impl TemplateList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(n: usize) -> Self {
        Self(Vec::with_capacity(n))
    }

    /// The descriptors of every template, in order.
    pub fn files(&self) -> FileList {
        self.0.iter().map(|t| t.file.clone()).collect()
    }

    /// Total feature data size in bytes.
    pub fn bytes(&self) -> usize {
        self.0.iter().map(Template::bytes).sum()
    }

    /// Clones the templates in `range` into a new list.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        Self(self.0[range].to_vec())
    }

    pub fn into_inner(self) -> Vec<Template> {
        self.0
    }
}

impl Deref for TemplateList {
    type Target = Vec<Template>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for TemplateList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<Template>> for TemplateList {
    fn from(v: Vec<Template>) -> Self {
        Self(v)
    }
}

impl FromIterator<Template> for TemplateList {
    fn from_iter<I: IntoIterator<Item = Template>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for TemplateList {
    type Item = Template;
    type IntoIter = std::vec::IntoIter<Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TemplateList {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Extend<Template> for TemplateList {
    fn extend<I: IntoIterator<Item = Template>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(n: usize) -> TemplateList {
        (0..n)
            .map(|i| Template::new(File::new(format!("t{i}")), vec![i as f32; 3]))
            .collect()
    }

    #[test]
    fn files_preserve_order() {
        let tl = list(4);
        assert_eq!(tl.files().names(), vec!["t0", "t1", "t2", "t3"]);
    }

    #[test]
    fn bytes_sum_feature_sizes() {
        let tl = list(2);
        assert_eq!(tl.bytes(), 2 * 3 * 4);
        assert_eq!(Template::from_file(File::new("x")).bytes(), 0);
    }

    #[test]
    fn slice_clones_range() {
        let tl = list(5);
        let s = tl.slice(1..3);
        assert_eq!(s.files().names(), vec!["t1", "t2"]);
        assert_eq!(tl.len(), 5);
    }

    #[test]
    fn serde_round_trip_skips_empty_fields() {
        let t = Template::from_file(File::new("raw.jpg"));
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"file":{"name":"raw.jpg"}}"#);
        let back: Template = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
