use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use equivalence::workflows::cases::memory::{
    InMemoryCaseStore, InMemoryNotificationDispatcher,
};
use equivalence::workflows::cases::{Role, UserId};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Build the in-memory backend used until a durable store is wired in. A
/// default administrator account is registered so the any-administrator
/// notification fallback has a recipient.
pub(crate) fn in_memory_backend() -> (Arc<InMemoryCaseStore>, Arc<InMemoryNotificationDispatcher>)
{
    let store = Arc::new(InMemoryCaseStore::new());
    let default_admin = std::env::var("APP_DEFAULT_ADMIN").unwrap_or_else(|_| "admin".to_string());
    store.register_user(UserId(default_admin.clone()), Role::Administrator);
    info!(administrator = %default_admin, "registered default administrator account");
    (store, Arc::new(InMemoryNotificationDispatcher::new()))
}
