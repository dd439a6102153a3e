//! Comparison: scores a query collection against a target collection.

use std::borrow::Cow;
use std::ops::Range;
use std::time::Instant;

use biomatch_gallery::{BlockOffset, Output};
use biomatch_template::{File, FileList, TemplateList, SPLIT_PLACEHOLDER};
use tracing::{debug, info, warn};

use crate::core::AlgorithmCore;
use crate::engine::Engine;
use crate::error::{AlgorithmError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Target,
    Query,
}

/// How the virtual similarity matrix is divided between outputs.
#[derive(Debug)]
struct Split {
    axis: Axis,
    parts: Vec<Range<usize>>,
    split: bool,
}

impl Split {
    /// Reads `split=[n1,n2,...]` and `splitBy=query` from the output.
    fn plan(output: &File, targets: usize, queries: usize) -> Result<Self> {
        if !output.contains("split") {
            return Ok(Self {
                axis: Axis::Target,
                parts: vec![0..targets],
                split: false,
            });
        }
        if !output.name.contains(SPLIT_PLACEHOLDER) {
            return Err(AlgorithmError::MissingSplitPlaceholder(output.name.clone()));
        }

        let axis = match output.get_string("splitBy").as_deref() {
            Some("query") => Axis::Query,
            _ => Axis::Target,
        };
        let total = match axis {
            Axis::Target => targets,
            Axis::Query => queries,
        };
        let sizes = output.get_usize_list("split").unwrap_or_default();
        if sizes.is_empty() || sizes.iter().sum::<usize>() != total {
            return Err(AlgorithmError::InvalidSplit { sizes, total });
        }

        let mut start = 0;
        let parts = sizes
            .iter()
            .map(|n| {
                let r = start..start + n;
                start += n;
                r
            })
            .collect();
        Ok(Self {
            axis,
            parts,
            split: true,
        })
    }
}

fn files_in(files: &FileList, r: Range<usize>) -> FileList {
    files[r].to_vec().into()
}

fn part(list: &TemplateList, r: Range<usize>) -> Cow<'_, TemplateList> {
    if r.start == 0 && r.end == list.len() {
        Cow::Borrowed(list)
    } else {
        Cow::Owned(list.slice(r))
    }
}

impl AlgorithmCore {
    /// Scores every query against every target into `output`.
    ///
    /// Output options: `cache` skips the work if the output already
    /// exists; `split=[n1,...]` writes one output per contiguous range of
    /// targets (or of queries with `splitBy=query`), the output name
    /// carrying `%1` for the partition index.
    ///
    /// The cache check looks up the output name as given, so a split
    /// output (whose name still holds `%1`) is always recomputed.
    pub fn compare(&self, engine: &Engine, target: &File, query: &File, output: &File) -> Result<()> {
        info!(target = %target, query = %query, output = %output, "comparing");

        if engine.storage().output_exists(output) && output.get_bool_or("cache", false) {
            debug!(output = %output, "output cached");
            return Ok(());
        }
        let query = if query.name == "." { target } else { query };

        let (mut targets_gallery, target_files) = self.retrieve_or_enroll(engine, target)?;
        let (mut queries_gallery, query_files) = self.retrieve_or_enroll(engine, query)?;
        let distance = self.require_distance()?;

        let split = Split::plan(output, target_files.len(), query_files.len())?;
        let mut outputs: Vec<Box<dyn Output>> = Vec::with_capacity(split.parts.len());
        for (i, range) in split.parts.iter().enumerate() {
            let mut file = if split.split { output.arg(i) } else { output.clone() };
            file.set("targetGallery", target.flat());
            file.set("queryGallery", query.flat());

            let mut o = engine.storage().make_output(&file).map_err(|e| {
                warn!(output = %file, error = %e, "cannot create output");
                AlgorithmError::NullOutput(file.name.clone())
            })?;
            match split.axis {
                Axis::Target => o.initialize(&files_in(&target_files, range.clone()), &query_files)?,
                Axis::Query => o.initialize(&target_files, &files_in(&query_files, range.clone()))?,
            }
            outputs.push(o);
        }

        engine
            .progress()
            .reset(target_files.len() * query_files.len());
        let started = Instant::now();

        let mut query_block = 0;
        let mut query_offset = 0;
        loop {
            let (queries, queries_done) = queries_gallery.read_block()?;

            let mut target_block = 0;
            let mut target_offset = 0;
            loop {
                if engine.cancel_token().is_cancelled() {
                    debug!(query_block, target_block, "comparison cancelled");
                    return Err(AlgorithmError::Cancelled);
                }
                let (targets, targets_done) = targets_gallery.read_block()?;

                for (range, out) in split.parts.iter().zip(outputs.iter_mut()) {
                    let (offset, len) = match split.axis {
                        Axis::Target => (target_offset, targets.len()),
                        Axis::Query => (query_offset, queries.len()),
                    };
                    let lo = range.start.max(offset);
                    let hi = range.end.min(offset + len);
                    if lo >= hi {
                        continue;
                    }
                    let local = lo - offset..hi - offset;

                    let (t, q, row, col) = match split.axis {
                        Axis::Target => (
                            part(&targets, local),
                            Cow::Borrowed(&queries),
                            query_offset,
                            lo - range.start,
                        ),
                        Axis::Query => (
                            Cow::Borrowed(&targets),
                            part(&queries, local),
                            lo - range.start,
                            target_offset,
                        ),
                    };
                    out.set_block(BlockOffset {
                        query_block,
                        target_block,
                        row,
                        col,
                    });
                    distance.compare(&t, &q, out.as_mut())?;
                }

                engine.progress().advance(targets.len() * queries.len());
                target_offset += targets.len();
                target_block += 1;
                if targets_done {
                    break;
                }
            }

            query_offset += queries.len();
            query_block += 1;
            if queries_done {
                break;
            }
        }

        for out in outputs {
            out.finalize()?;
        }

        if !engine.config().quiet && engine.progress().total() > 1 {
            info!(
                elapsed = ?started.elapsed(),
                comparisons = engine.progress().total(),
                "comparison done"
            );
        }
        Ok(())
    }
}
