use std::sync::Arc;

use crate::auth::{
    FileStorage, KeyValueStorage, MemoryStorage, RefreshCoordinator, SessionBackend,
    SessionLifecycle, SessionTeardown, TokenStore,
};
use crate::client::{ApiClient, AuthenticatedClient, Notifier};
use crate::configuration::{NotificationSettings, Settings, StorageSettings};
use crate::guard::RouteGuard;
use crate::navigation::Navigator;

/// Every long-lived component, constructed once and shared
pub struct Application {
    pub store: Arc<TokenStore>,
    pub session: Arc<SessionLifecycle>,
    pub client: Arc<AuthenticatedClient>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub guard: RouteGuard,
    notifier: Arc<dyn Notifier>,
    notifications: NotificationSettings,
}

impl Application {
    /// Wire the components around one token store and one refresh coordinator
    pub fn build(
        settings: &Settings,
        storage: Arc<dyn KeyValueStorage>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let http_client = reqwest::Client::new();
        let base_url = settings.backend.base_url.clone();

        let store = Arc::new(TokenStore::load(storage));
        let backend = Arc::new(SessionBackend::new(base_url.clone(), http_client.clone()));
        let teardown = Arc::new(SessionTeardown::new(
            store.clone(),
            navigator,
            settings.session.sign_in_path.clone(),
        ));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            backend.clone(),
            teardown.clone(),
        ));
        let client = Arc::new(AuthenticatedClient::new(
            base_url,
            http_client,
            store.clone(),
            coordinator.clone(),
            teardown.clone(),
        ));
        let session = Arc::new(SessionLifecycle::new(
            store.clone(),
            backend,
            coordinator.clone(),
            teardown,
        ));
        let guard = RouteGuard::new(session.clone());

        tracing::info!(base_url = %settings.backend.base_url, "Session client ready");

        Self {
            store,
            session,
            client,
            coordinator,
            guard,
            notifier,
            notifications: settings.notifications.clone(),
        }
    }

    /// A fresh request handle with its own `loading`/`error` state
    pub fn api(&self) -> ApiClient {
        ApiClient::new(
            self.client.clone(),
            self.notifier.clone(),
            self.notifications.clone(),
        )
    }
}

/// File-backed storage when a path is configured, memory otherwise
pub fn storage_from_settings(settings: &StorageSettings) -> Arc<dyn KeyValueStorage> {
    match &settings.path {
        Some(path) => {
            tracing::info!(path = %path, "Persisting session to file");
            Arc::new(FileStorage::new(path))
        }
        None => Arc::new(MemoryStorage::new()),
    }
}
