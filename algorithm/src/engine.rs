use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use biomatch_gallery::Storage;
use biomatch_template::{File, FileList, TemplateList};
use tracing::info;

use crate::config::Config;
use crate::core::AlgorithmCore;
use crate::error::Result;
use crate::factory::Factory;
use crate::manager::AlgorithmManager;
use crate::progress::Progress;
use crate::resolver;

/// Cooperative stop signal checked between enrollment sub-blocks and
/// comparison block pairs. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a previous cancellation so the next operation can run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Entry point for every operation.
///
/// An engine owns its configuration, plugin factory, storage and
/// algorithm registry; independent engines share nothing. It is `Sync`,
/// so one engine can serve several threads.
pub struct Engine {
    config: Config,
    factory: Factory,
    storage: Storage,
    algorithms: AlgorithmManager,
    progress: Progress,
    cancel: CancelToken,
}

impl Engine {
    /// Creates an engine with the built-in plugins registered.
    pub fn new(config: Config) -> Self {
        Self::with_factory(config, Factory::new())
    }

    pub fn with_factory(config: Config, factory: Factory) -> Self {
        let storage = Storage::new(config.effective_block_size());
        Self {
            config,
            factory,
            storage,
            algorithms: AlgorithmManager::new(),
            progress: Progress::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The plugin factory; register custom stages here before use.
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn registry(&self) -> &AlgorithmManager {
        &self.algorithms
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns the algorithm for `descriptor`, constructing and
    /// registering it on first use.
    pub fn algorithm(&self, descriptor: &str) -> Result<Arc<AlgorithmCore>> {
        self.algorithms.get_or_create(descriptor, || {
            let (name, stages) = resolver::resolve(descriptor, self)?;
            Ok(AlgorithmCore::new(name, stages))
        })
    }

    /// The algorithm named by `file`'s `algorithm` option, or the
    /// configured default.
    fn algorithm_for(&self, file: &File) -> Result<Arc<AlgorithmCore>> {
        let descriptor = file
            .get_string("algorithm")
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.config.algorithm.clone());
        self.algorithm(&descriptor)
    }

    /// True when `descriptor` (or the default algorithm, if empty) has no
    /// distance stage.
    pub fn is_classifier(&self, descriptor: &str) -> Result<bool> {
        info!(%descriptor, "checking classifier");
        let descriptor = match descriptor {
            "" => self.config.algorithm.as_str(),
            d => d,
        };
        Ok(self.algorithm(descriptor)?.is_classifier())
    }

    /// Trains the algorithm named by `model` on `input`, storing it at
    /// `model` if it has a name.
    pub fn train(&self, input: &File, model: &File) -> Result<()> {
        self.algorithm_for(model)?.train(self, input, model)
    }

    /// Enrolls `input` into `gallery` with the gallery's algorithm.
    pub fn enroll(&self, input: &File, gallery: &File) -> Result<FileList> {
        self.algorithm_for(gallery)?.enroll(self, input, gallery)
    }

    /// Projects `data` in place with the algorithm named by its first
    /// template. An empty list is left alone.
    pub fn enroll_templates(&self, data: &mut TemplateList) -> Result<()> {
        let Some(first) = data.first() else {
            return Ok(());
        };
        let algorithm = self.algorithm_for(&first.file)?;
        *data = algorithm.transform().project_list(data.clone())?;
        Ok(())
    }

    /// Scores `query` against `target` into `output` with the output's
    /// algorithm. A query named `.` is the target itself.
    pub fn compare(&self, target: &File, query: &File, output: &File) -> Result<()> {
        self.algorithm_for(output)?.compare(self, target, query, output)
    }

    /// Drops every registered algorithm.
    pub fn finalize(&self) {
        info!(count = self.algorithms.len(), "releasing algorithms");
        self.algorithms.clear();
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
