//! Format conversion and concatenation of galleries and outputs.

use biomatch_gallery::{Matrix, Simmat};
use biomatch_template::{File, FileList};
use tracing::info;

use crate::engine::Engine;
use crate::error::{AlgorithmError, Result};

/// What `convert` and `cat` operate on. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A single encoded template.
    Format,
    Gallery,
    /// A similarity matrix.
    Output,
}

impl std::str::FromStr for Kind {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "format" => Ok(Kind::Format),
            "gallery" => Ok(Kind::Gallery),
            "output" => Ok(Kind::Output),
            _ => Err(AlgorithmError::UnrecognizedKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    ColWise,
    RowWise,
}

/// A stored matrix with the file lists of its galleries.
struct Scores {
    matrix: Matrix,
    targets: FileList,
    queries: FileList,
    target_gallery: File,
    query_gallery: File,
}

impl Engine {
    /// Converts `input` to `output`. `kind` is `format`, `gallery` or
    /// `output`.
    pub fn convert(&self, kind: &str, input: &File, output: &File) -> Result<()> {
        info!(%kind, input = %input, output = %output, "converting");
        match kind.parse::<Kind>()? {
            Kind::Format => {
                let t = self.storage().read_template(input)?;
                self.storage().write_template(output, &t)?;
            }
            Kind::Gallery => {
                let mut src = self.storage().open(input)?;
                let mut dst = self.storage().open(output)?;
                loop {
                    let (block, done) = src.read_block()?;
                    dst.write_block(&block)?;
                    if done {
                        break;
                    }
                }
                dst.flush()?;
            }
            Kind::Output => {
                let scores = self.read_scores(input)?;
                self.write_scores(output, &scores)?;
            }
        }
        Ok(())
    }

    /// Concatenates `inputs` into `output`.
    ///
    /// Galleries are appended in order. Outputs are merged by the
    /// output's `catType`: `colWise` appends targets of matrices sharing
    /// the same queries, `rowWise` appends queries of matrices sharing the
    /// same targets.
    pub fn cat(&self, kind: &str, inputs: &[File], output: &File) -> Result<()> {
        info!(%kind, inputs = inputs.len(), output = %output, "concatenating");
        let kind: Kind = kind.parse()?;
        if inputs.is_empty() {
            return Err(AlgorithmError::NoInputs);
        }
        match kind {
            Kind::Gallery => self.cat_galleries(inputs, output),
            Kind::Output => self.cat_outputs(inputs, output),
            Kind::Format => Err(AlgorithmError::UnrecognizedKind("format".into())),
        }
    }

    fn cat_galleries(&self, inputs: &[File], output: &File) -> Result<()> {
        if let Some(dup) = inputs.iter().find(|f| f.name == output.name) {
            return Err(AlgorithmError::DuplicateInputOutput(dup.name.clone()));
        }
        let mut dst = self.storage().open(output)?;
        for input in inputs {
            let mut src = self.storage().open(input)?;
            loop {
                let (block, done) = src.read_block()?;
                dst.write_block(&block)?;
                if done {
                    break;
                }
            }
        }
        dst.flush()?;
        Ok(())
    }

    fn cat_outputs(&self, inputs: &[File], output: &File) -> Result<()> {
        let merge = match output.get_string("catType").as_deref() {
            Some("colWise") => Merge::ColWise,
            Some("rowWise") => Merge::RowWise,
            // A single input is copied as is.
            _ if inputs.len() == 1 => Merge::ColWise,
            other => {
                return Err(AlgorithmError::UnsupportedMergeType(
                    other.unwrap_or_default().to_string(),
                ));
            }
        };

        let mut acc = self.read_scores(&inputs[0])?;
        let mut target_galleries = vec![acc.target_gallery.name.clone()];
        let mut query_galleries = vec![acc.query_gallery.name.clone()];

        for input in &inputs[1..] {
            let next = self.read_scores(input)?;
            match merge {
                Merge::ColWise => {
                    if next.queries != acc.queries {
                        return Err(AlgorithmError::IncompatibleMerge(input.name.clone()));
                    }
                    acc.matrix = acc.matrix.hconcat(&next.matrix)?;
                    acc.targets.extend(next.targets);
                    target_galleries.push(next.target_gallery.name);
                }
                Merge::RowWise => {
                    if next.targets != acc.targets {
                        return Err(AlgorithmError::IncompatibleMerge(input.name.clone()));
                    }
                    acc.matrix = acc.matrix.vconcat(&next.matrix)?;
                    acc.queries.extend(next.queries);
                    query_galleries.push(next.query_gallery.name);
                }
            }
        }

        acc.target_gallery = File::new(target_galleries.join(";"));
        acc.query_gallery = File::new(query_galleries.join(";"));
        self.write_scores(output, &acc)
    }

    /// Reads a stored matrix and reloads the file lists of the galleries
    /// it names, checking they agree with its shape.
    fn read_scores(&self, file: &File) -> Result<Scores> {
        let Simmat {
            matrix,
            target_gallery,
            query_gallery,
        } = self.storage().read_simmat(file)?;
        let targets = self.storage().read_all(&target_gallery)?.files();
        let queries = self.storage().read_all(&query_gallery)?.files();
        if matrix.rows() != queries.len() || matrix.cols() != targets.len() {
            return Err(AlgorithmError::DimensionMismatch {
                rows: matrix.rows(),
                cols: matrix.cols(),
                queries: queries.len(),
                targets: targets.len(),
            });
        }
        Ok(Scores {
            matrix,
            targets,
            queries,
            target_gallery,
            query_gallery,
        })
    }

    fn write_scores(&self, output: &File, scores: &Scores) -> Result<()> {
        let mut file = output.clone();
        file.set("targetGallery", scores.target_gallery.flat());
        file.set("queryGallery", scores.query_gallery.flat());

        let mut out = self
            .storage()
            .make_output(&file)
            .map_err(|_| AlgorithmError::NullOutput(file.name.clone()))?;
        out.initialize(&scores.targets, &scores.queries)?;
        for i in 0..scores.queries.len() {
            for j in 0..scores.targets.len() {
                out.set_relative(scores.matrix.at(i, j), i, j)?;
            }
        }
        out.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_case_insensitive() {
        assert_eq!("Gallery".parse::<Kind>().unwrap(), Kind::Gallery);
        assert_eq!("OUTPUT".parse::<Kind>().unwrap(), Kind::Output);
        assert_eq!("format".parse::<Kind>().unwrap(), Kind::Format);
        assert!(matches!(
            "Video".parse::<Kind>(),
            Err(AlgorithmError::UnrecognizedKind(_))
        ));
    }
}
