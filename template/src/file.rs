use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::parse::{format_value, options_start, parse_value, split_top_level};

/// Placeholder substituted with the partition index in split outputs.
pub const SPLIT_PLACEHOLDER: &str = "%1";

/// A descriptor: a name (usually a path or an algorithm expression) plus
/// free-form options.
///
/// The textual form is `name[key=value,flag,...]`. A bare flag means
/// `true`. Values may be nested lists (`split=[4,6]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, Value>,
}

impl File {
    /// Creates a descriptor with no options. The name is taken verbatim.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: BTreeMap::new(),
        }
    }

    /// Parses the textual form `name[key=value,...]`.
    pub fn parse(descriptor: &str) -> Self {
        let descriptor = descriptor.trim();
        let Some(start) = options_start(descriptor) else {
            return Self::new(descriptor);
        };

        let mut file = Self::new(descriptor[..start].trim());
        let body = &descriptor[start + 1..descriptor.len() - 1];
        for entry in split_top_level(body, ',') {
            if entry.is_empty() {
                continue;
            }
            match entry.split_once('=') {
                Some((key, value)) => {
                    file.options
                        .insert(key.trim().to_string(), parse_value(value));
                }
                None => {
                    file.options.insert(entry, Value::Bool(true));
                }
            }
        }
        file
    }

    /// Returns the textual form. Parsing the result yields an equal descriptor.
    pub fn flat(&self) -> String {
        if self.options.is_empty() {
            return self.name.clone();
        }
        let opts: Vec<String> = self
            .options
            .iter()
            .map(|(k, v)| match v {
                Value::Bool(true) => k.clone(),
                _ => format!("{k}={}", format_value(v)),
            })
            .collect();
        format!("{}[{}]", self.name, opts.join(","))
    }

    /// True when the descriptor has no name.
    pub fn is_null(&self) -> bool {
        self.name.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Returns a string option. Non-string values are rendered in
    /// descriptor syntax; a missing key yields `None`.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.options.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            v => Some(format_value(v)),
        }
    }

    /// Interprets an option as a flag. Missing keys are `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get_bool_or(key, false)
    }

    /// Interprets an option as a flag with an explicit default for
    /// missing keys.
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        match self.options.get(key) {
            None | Some(Value::Null) => default,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !matches!(s.as_str(), "" | "0" | "false"),
            Some(_) => true,
        }
    }

    /// Returns a list of non-negative integers. A single number is a
    /// one-element list. Any other shape yields `None`.
    pub fn get_usize_list(&self, key: &str) -> Option<Vec<usize>> {
        match self.options.get(key)? {
            Value::Number(n) => n.as_u64().map(|n| vec![n as usize]),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_u64().map(|n| n as usize))
                .collect(),
            _ => None,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.options.remove(key)
    }

    /// Builder form of [`File::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// File name without directories and without the last extension.
    pub fn base_name(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without directories.
    pub fn file_name(&self) -> String {
        Path::new(&self.name)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Last extension, without the dot. Empty when there is none.
    pub fn suffix(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn exists(&self) -> bool {
        !self.name.is_empty() && Path::new(&self.name).exists()
    }

    /// Failure-to-enroll flag set by feature stages that could not
    /// process the template.
    pub fn failed(&self) -> bool {
        self.get_bool("FTE")
    }

    /// Content fingerprint: 16 hex chars of a SHA-256 over the textual
    /// descriptor and, when the name is a readable regular file, its bytes.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.flat().as_bytes());
        let path = Path::new(&self.name);
        if path.is_file() {
            if let Ok(bytes) = std::fs::read(path) {
                hasher.update(&bytes);
            }
        }
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }

    /// Substitutes [`SPLIT_PLACEHOLDER`] with `index`, dropping the split
    /// options so the result describes one partition.
    pub fn arg(&self, index: usize) -> Self {
        let mut file = self.clone();
        file.name = self.name.replace(SPLIT_PLACEHOLDER, &index.to_string());
        file.options.remove("split");
        file.options.remove("splitBy");
        file
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flat())
    }
}

impl From<&str> for File {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for File {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// An ordered list of descriptors, typically the files of a gallery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileList(Vec<File>);

impl FileList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|f| f.name.clone()).collect()
    }

    /// Number of files flagged as failure-to-enroll.
    pub fn failures(&self) -> usize {
        self.0.iter().filter(|f| f.failed()).count()
    }

    pub fn into_inner(self) -> Vec<File> {
        self.0
    }
}

impl Deref for FileList {
    type Target = Vec<File>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for FileList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<File>> for FileList {
    fn from(v: Vec<File>) -> Self {
        Self(v)
    }
}

impl FromIterator<File> for FileList {
    fn from_iter<I: IntoIterator<Item = File>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for FileList {
    type Item = File;
    type IntoIter = std::vec::IntoIter<File>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a File;
    type IntoIter = std::slice::Iter<'a, File>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_plain_name() {
        let f = File::parse("faces/alice.jpg");
        assert_eq!(f.name, "faces/alice.jpg");
        assert!(f.options.is_empty());
        assert_eq!(f.base_name(), "alice");
        assert_eq!(f.suffix(), "jpg");
        assert_eq!(f.file_name(), "alice.jpg");
    }

    #[test]
    fn parse_options() {
        let f = File::parse("scores_%1.mtx[split=[4,6],cache,algorithm=Center+Normalize:L2]");
        assert_eq!(f.name, "scores_%1.mtx");
        assert!(f.get_bool("cache"));
        assert_eq!(f.get_usize_list("split"), Some(vec![4, 6]));
        assert_eq!(
            f.get_string("algorithm").as_deref(),
            Some("Center+Normalize:L2")
        );
    }

    #[test]
    fn flat_round_trips() {
        let text = "gallery.gal[cache,noDuplicates,split=[1,2]]";
        let f = File::parse(text);
        assert_eq!(File::parse(&f.flat()), f);
        assert_eq!(f.to_string(), f.flat());
    }

    #[test]
    fn bool_defaults() {
        let f = File::parse("x[distribute=false,n=0,s=yes]");
        assert!(!f.get_bool_or("distribute", true));
        assert!(f.get_bool_or("missing", true));
        assert!(!f.get_bool("n"));
        assert!(f.get_bool("s"));
        assert!(!f.get_bool("missing"));
    }

    #[test]
    fn arg_substitutes_placeholder() {
        let f = File::parse("out_%1.mtx[split=[2,2],cache]");
        let part = f.arg(1);
        assert_eq!(part.name, "out_1.mtx");
        assert!(!part.contains("split"));
        assert!(part.get_bool("cache"));
    }

    #[test]
    fn hash_is_deterministic_and_content_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.bin");
        std::fs::write(&path, b"first").unwrap();

        let f = File::new(path.to_string_lossy());
        let h1 = f.hash();
        assert_eq!(h1, f.hash());
        assert_eq!(h1.len(), 16);

        let mut fh = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        fh.write_all(b"second").unwrap();
        drop(fh);
        assert_ne!(h1, f.hash());

        assert_ne!(File::new("a").hash(), File::new("b").hash());
    }

    #[test]
    fn file_list_helpers() {
        let files: FileList = vec![
            File::new("a"),
            File::new("b").with("FTE", true),
            File::new("c"),
        ]
        .into();
        assert_eq!(files.names(), vec!["a", "b", "c"]);
        assert_eq!(files.failures(), 1);
    }
}
