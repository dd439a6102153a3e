//! Enrollment: streams inputs through the feature stage into a gallery.

use std::collections::HashSet;
use std::time::Instant;

use biomatch_gallery::{Gallery, Storage};
use biomatch_template::{File, FileList};
use tracing::{debug, info, warn};

use crate::blocks::sub_blocks;
use crate::core::AlgorithmCore;
use crate::engine::Engine;
use crate::error::{AlgorithmError, Result};

enum Pass {
    /// Nothing to do: cache hit or empty input.
    Skipped(FileList),
    Complete(FileList),
    Cancelled(FileList),
}

impl AlgorithmCore {
    /// Enrolls `input` into `gallery` and returns the enrolled records.
    ///
    /// With no gallery, the input is enrolled into this algorithm's memory
    /// gallery for it. Gallery options: `read` and `cache` start from the
    /// gallery's existing records, `cache` returns them if there are any,
    /// `noDuplicates` skips names already enrolled. With the input option
    /// `infinite` enrollment repeats until the engine is cancelled.
    pub fn enroll(&self, engine: &Engine, input: &File, gallery: &File) -> Result<FileList> {
        info!(input = %input, gallery = %gallery, algorithm = %self.name(), "enrolling");

        let gallery = if gallery.is_null() {
            if input.is_null() {
                return Ok(FileList::new());
            }
            self.memory_gallery(input)
        } else {
            gallery.clone()
        };

        let mut out = engine.storage().open(&gallery).map_err(|e| {
            warn!(gallery = %gallery, error = %e, "cannot open gallery");
            AlgorithmError::NullGallery(gallery.name.clone())
        })?;

        let infinite = input.get_bool("infinite");
        loop {
            match self.enroll_pass(engine, input, &gallery, out.as_mut())? {
                Pass::Skipped(files) => return Ok(files),
                Pass::Complete(files) => {
                    out.flush()?;
                    if !infinite || engine.cancel_token().is_cancelled() {
                        return Ok(files);
                    }
                    debug!(input = %input, "restarting infinite enrollment");
                }
                Pass::Cancelled(files) => {
                    if !infinite {
                        return Err(AlgorithmError::Cancelled);
                    }
                    out.flush()?;
                    return Ok(files);
                }
            }
        }
    }

    fn enroll_pass(
        &self,
        engine: &Engine,
        input: &File,
        gallery: &File,
        out: &mut dyn Gallery,
    ) -> Result<Pass> {
        let mut files = FileList::new();
        if gallery.contains("read") || gallery.contains("cache") {
            files = out.files()?;
            if gallery.contains("cache") && !files.is_empty() {
                debug!(gallery = %gallery, count = files.len(), "enrollment cache hit");
                return Ok(Pass::Skipped(files));
            }
        }

        let data = engine.storage().read_all(input)?;
        if data.is_empty() {
            debug!(input = %input, "nothing to enroll");
            return Ok(Pass::Skipped(files));
        }

        let config = engine.config();
        let no_duplicates = gallery.contains("noDuplicates");
        let mut seen: HashSet<String> = if no_duplicates {
            files.iter().map(|f| f.name.clone()).collect()
        } else {
            HashSet::new()
        };

        engine.progress().reset(data.len());
        let started = Instant::now();
        let (mut total, mut failures, mut bytes) = (0usize, 0usize, 0usize);

        for range in sub_blocks(
            data.len(),
            config.effective_block_size(),
            config.effective_sub_block_size(),
        ) {
            if engine.cancel_token().is_cancelled() {
                debug!(input = %input, enrolled = files.len(), "enrollment cancelled");
                return Ok(Pass::Cancelled(files));
            }

            let steps = range.len();
            let mut chunk = data.slice(range);
            if no_duplicates {
                chunk.retain(|t| seen.insert(t.file.name.clone()));
            }

            let projected = self.transform().project_list(chunk)?;
            out.write_block(&projected)?;

            let enrolled = projected.files();
            total += enrolled.len();
            failures += enrolled.failures();
            bytes += projected.bytes();
            files.extend(enrolled);
            engine.progress().advance(steps);
        }

        if !config.quiet && data.len() > 1 {
            info!(
                elapsed = ?started.elapsed(),
                size = bytes as f64 / total.max(1) as f64,
                failures,
                total,
                "enrollment done"
            );
        }
        Ok(Pass::Complete(files))
    }

    /// Opens `file` as an enrolled gallery, enrolling it into memory first
    /// unless it already is one. Returns the gallery and its records.
    pub(crate) fn retrieve_or_enroll(
        &self,
        engine: &Engine,
        file: &File,
    ) -> Result<(Box<dyn Gallery>, FileList)> {
        let storage = engine.storage();
        if !file.get_bool("enroll") && Storage::is_pre_enrolled(file) {
            let mut g = storage.open(file).map_err(|e| {
                warn!(gallery = %file, error = %e, "cannot open gallery");
                AlgorithmError::NullGallery(file.name.clone())
            })?;
            let files = g.files()?;
            return Ok((g, files));
        }

        let cache = self.memory_gallery(file);
        let mut g = storage.open(&cache)?;
        let files = g.files()?;
        if !files.is_empty() {
            debug!(input = %file, gallery = %cache, "already enrolled");
            return Ok((g, files));
        }

        self.enroll(engine, file, &cache)?;
        let mut g = storage.open(&cache)?;
        let files = g.files()?;
        Ok((g, files))
    }
}
