//! Registry of constructed algorithms, one per descriptor.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::core::AlgorithmCore;
use crate::error::{AlgorithmError, Result};

/// Caches [`AlgorithmCore`]s by descriptor.
///
/// Construction runs outside the lock because algorithms may be built out
/// of other algorithms. When two threads race on the same descriptor the
/// first to publish wins and the other's instance is dropped; both callers
/// get the published one.
#[derive(Default)]
pub struct AlgorithmManager {
    algorithms: RwLock<HashMap<String, Arc<AlgorithmCore>>>,
    building: Mutex<HashMap<ThreadId, Vec<String>>>,
}

struct BuildGuard<'a> {
    manager: &'a AlgorithmManager,
    thread: ThreadId,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        let mut building = self.manager.building.lock();
        if let Some(stack) = building.get_mut(&self.thread) {
            stack.pop();
            if stack.is_empty() {
                building.remove(&self.thread);
            }
        }
    }
}

impl AlgorithmManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, descriptor: &str) -> Option<Arc<AlgorithmCore>> {
        self.algorithms.read().get(descriptor).cloned()
    }

    /// Returns the registered algorithm for `descriptor`, building it with
    /// `build` if absent.
    pub fn get_or_create<F>(&self, descriptor: &str, build: F) -> Result<Arc<AlgorithmCore>>
    where
        F: FnOnce() -> Result<AlgorithmCore>,
    {
        if descriptor.is_empty() {
            return Err(AlgorithmError::MissingDescriptor);
        }
        if let Some(existing) = self.get(descriptor) {
            return Ok(existing);
        }

        let candidate = {
            let _guard = self.enter(descriptor)?;
            Arc::new(build()?)
        };

        let mut algorithms = self.algorithms.write();
        let published = algorithms
            .entry(descriptor.to_string())
            .or_insert_with(|| {
                debug!(%descriptor, "registered algorithm");
                candidate
            })
            .clone();
        Ok(published)
    }

    pub fn len(&self) -> usize {
        self.algorithms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.read().is_empty()
    }

    /// Drops every registered algorithm.
    pub fn clear(&self) {
        self.algorithms.write().clear();
    }

    fn enter(&self, descriptor: &str) -> Result<BuildGuard<'_>> {
        let thread = thread::current().id();
        let mut building = self.building.lock();
        let stack = building.entry(thread).or_default();
        if stack.iter().any(|d| d == descriptor) {
            return Err(AlgorithmError::RecursiveDescriptor(descriptor.to_string()));
        }
        stack.push(descriptor.to_string());
        Ok(BuildGuard {
            manager: self,
            thread,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stages;
    use crate::plugins::Identity;

    fn core(name: &str) -> AlgorithmCore {
        AlgorithmCore::new(
            name,
            Stages {
                transform: Arc::new(Identity),
                distance: None,
            },
        )
    }

    #[test]
    fn empty_descriptor_is_missing() {
        let m = AlgorithmManager::new();
        assert!(matches!(
            m.get_or_create("", || Ok(core(""))),
            Err(AlgorithmError::MissingDescriptor)
        ));
    }

    #[test]
    fn builds_once_then_caches() {
        let m = AlgorithmManager::new();
        let a = m.get_or_create("x", || Ok(core("x"))).unwrap();
        let b = m
            .get_or_create("x", || panic!("already registered"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(m.len(), 1);
        m.clear();
        assert!(m.is_empty());
    }

    #[test]
    fn failed_build_is_not_registered() {
        let m = AlgorithmManager::new();
        assert!(m
            .get_or_create("x", || Err(AlgorithmError::Stage("boom".into())))
            .is_err());
        assert!(m.get("x").is_none());
        assert!(m.get_or_create("x", || Ok(core("x"))).is_ok());
    }

    #[test]
    fn self_reference_is_recursive() {
        let m = AlgorithmManager::new();
        let r = m.get_or_create("x", || {
            m.get_or_create("y", || {
                m.get_or_create("x", || Ok(core("x")))?;
                Ok(core("y"))
            })?;
            Ok(core("x"))
        });
        assert!(matches!(r, Err(AlgorithmError::RecursiveDescriptor(d)) if d == "x"));
        assert!(m.building.lock().is_empty());
    }
}
