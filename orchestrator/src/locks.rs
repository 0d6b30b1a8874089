//! The per-`abbr` mutex map (§3 "Mutation under the per-`abbr` mutex",
//! §4.4 "Concurrency"). Grounded in `appstate::state::AppState`'s
//! `DashMap`-keyed per-id guard pattern (`onnx_models`, `gguf_contexts`).

use common::error::{OrchestratorError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct AbbrLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AbbrLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, abbr: &str) -> Arc<Mutex<()>> {
        self.locks.entry(abbr.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Non-blocking: a second in-flight operation on the same `abbr`
    /// returns `Conflict` immediately rather than queueing behind it.
    pub fn try_acquire(&self, abbr: &str) -> Result<OwnedMutexGuard<()>> {
        self.handle(abbr)
            .try_lock_owned()
            .map_err(|_| OrchestratorError::Conflict(format!("operation already in flight for {abbr}")))
    }

    /// True while a lock for `abbr` is currently held by someone. Used by
    /// the Reconciler to avoid deleting records mid-deploy (§4.7).
    pub fn is_locked(&self, abbr: &str) -> bool {
        match self.locks.get(abbr) {
            Some(lock) => lock.try_lock().is_err(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_concurrent_acquire_conflicts() {
        let locks = AbbrLocks::new();
        let _first = locks.try_acquire("qwen1.5b").unwrap();
        let second = locks.try_acquire("qwen1.5b");
        assert!(second.is_err());
    }

    #[test]
    fn different_abbrs_do_not_conflict() {
        let locks = AbbrLocks::new();
        let _a = locks.try_acquire("a").unwrap();
        let _b = locks.try_acquire("b").unwrap();
    }

    #[test]
    fn lock_releases_on_drop() {
        let locks = AbbrLocks::new();
        {
            let _guard = locks.try_acquire("qwen1.5b").unwrap();
        }
        let second = locks.try_acquire("qwen1.5b");
        assert!(second.is_ok());
    }
}
