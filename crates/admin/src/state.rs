//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::AdminStore;
use crate::services::SyncAdminService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    sync_admin: SyncAdminService,
}

impl AppState {
    #[must_use]
    pub fn new(sync_admin: SyncAdminService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { sync_admin }),
        }
    }

    #[must_use]
    pub fn sync_admin(&self) -> &SyncAdminService {
        &self.inner.sync_admin
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn AdminStore> {
        self.inner.sync_admin.store()
    }
}
