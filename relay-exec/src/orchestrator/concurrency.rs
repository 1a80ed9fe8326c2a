use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::backend::BackendRegistry;

/// Global and per-backend in-flight limits, shared by every logical request.
pub struct ConcurrencyLimits {
    global: Arc<Semaphore>,
    per_backend: HashMap<String, Arc<Semaphore>>,
}

impl ConcurrencyLimits {
    pub fn new(global_limit: usize, registry: &BackendRegistry) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_limit.max(1))),
            per_backend: registry
                .iter()
                .filter_map(|b| {
                    b.channel()
                        .max_concurrency
                        .map(|n| (b.name().to_string(), Arc::new(Semaphore::new(n.max(1)))))
                })
                .collect(),
        }
    }

    pub async fn acquire(&self, backend: &str) -> ConcurrencyPermit {
        // The semaphores are never closed, so acquisition only waits.
        let global = self.global.clone().acquire_owned().await.ok();
        let backend = match self.per_backend.get(backend) {
            Some(sem) => sem.clone().acquire_owned().await.ok(),
            None => None,
        };
        ConcurrencyPermit {
            _global: global,
            _backend: backend,
        }
    }
}

pub struct ConcurrencyPermit {
    _global: Option<OwnedSemaphorePermit>,
    _backend: Option<OwnedSemaphorePermit>,
}
