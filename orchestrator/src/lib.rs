//! The Orchestrator: the stateful core that owns the model lifecycle,
//! the context mediator, auth, and reconciliation. Talks to the outside
//! world only through `common::traits`' capability traits, so it can be
//! exercised with in-memory fakes (see `test_support`).

pub mod auth;
pub mod context;
pub mod deploy;
pub mod locks;
pub mod reconcile;
mod test_support;

pub use auth::AuthService;
pub use deploy::DeploymentEngine;
pub use locks::AbbrLocks;
pub use reconcile::{Reconciler, ReconcilerHandle};

use common::model::Catalog;
use common::traits::{ContainerRuntime, GpuSource, RouterSink, StateStore};
use std::sync::Arc;

/// Everything the `server` binary needs to hand off to `api`: the
/// deployment state machine, the auth service, and a running reconciler
/// loop, all sharing the same set of adapter trait objects.
pub struct Orchestrator {
    pub deploy: Arc<DeploymentEngine>,
    pub auth: Arc<AuthService>,
    reconciler_handle: ReconcilerHandle,
}

pub struct OrchestratorConfig {
    pub auth_username: String,
    pub auth_password_hash: String,
    pub jwt_secret: String,
    pub session_timeout_hours: i64,
    pub gpu_count: usize,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn StateStore>,
        runtime: Arc<dyn ContainerRuntime>,
        gpu: Arc<dyn GpuSource>,
        router: Arc<dyn RouterSink>,
        catalog: Catalog,
        config: OrchestratorConfig,
    ) -> Self {
        let locks = Arc::new(AbbrLocks::new());
        let deploy = Arc::new(DeploymentEngine::with_locks(
            store.clone(),
            runtime.clone(),
            gpu,
            router.clone(),
            catalog.clone(),
            config.gpu_count,
            locks.clone(),
        ));
        let auth = Arc::new(AuthService::new(
            store.clone(),
            config.auth_username,
            config.auth_password_hash,
            config.jwt_secret,
            config.session_timeout_hours,
        ));
        let reconciler = Arc::new(Reconciler::new(store, runtime, router, catalog, locks));
        let reconciler_handle = ReconcilerHandle::spawn(reconciler);

        Orchestrator { deploy, auth, reconciler_handle }
    }

    pub fn shutdown(&self) {
        self.reconciler_handle.shutdown();
    }
}
