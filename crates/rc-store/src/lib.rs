//! # rc-store
//!
//! The active store handle: exactly one `ContentStore` backend, chosen from
//! configuration at startup and shared by every caller after that.
//!
//! Which backends can be chosen is decided at compile time through the
//! `db-memory` and `db-sqlite` features.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use rc_config::{BackendKind, StoreSettings};
use rc_core::error::StoreError;
use rc_core::traits::ContentStore;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum OpenError {
    #[error("backend `{}` was not compiled into this binary", .0.as_str())]
    NotCompiled(BackendKind),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Cheap to clone; every clone talks to the same backend instance.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<dyn ContentStore>,
}

impl StoreHandle {
    /// Builds the backend named in `settings`.
    pub async fn open(settings: &StoreSettings) -> Result<Self, OpenError> {
        let handle = match settings.backend {
            BackendKind::Memory => open_memory(settings)?,
            BackendKind::Sqlite => open_sqlite(settings).await?,
        };
        info!(
            backend = handle.backend_name(),
            page_size = handle.page_size(),
            "content store selected"
        );
        Ok(handle)
    }

    /// Wraps a backend that was constructed by hand.
    pub fn from_store<S>(store: S) -> Self
    where
        S: ContentStore + 'static,
    {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl Deref for StoreHandle {
    type Target = dyn ContentStore;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("backend", &self.inner.backend_name())
            .finish()
    }
}

#[cfg(feature = "db-memory")]
fn open_memory(settings: &StoreSettings) -> Result<StoreHandle, OpenError> {
    Ok(StoreHandle::from_store(
        rc_db_memory::MemoryContentStore::with_page_size(settings.page_size),
    ))
}

#[cfg(not(feature = "db-memory"))]
fn open_memory(_settings: &StoreSettings) -> Result<StoreHandle, OpenError> {
    Err(OpenError::NotCompiled(BackendKind::Memory))
}

#[cfg(feature = "db-sqlite")]
async fn open_sqlite(settings: &StoreSettings) -> Result<StoreHandle, OpenError> {
    use rc_db_sqlite::{SqliteContentStore, SqliteOptions};
    use secrecy::ExposeSecret;
    use std::time::Duration;

    let sqlite = &settings.sqlite;
    let options = SqliteOptions {
        url: sqlite.url.expose_secret().to_string(),
        max_connections: sqlite.max_connections,
        acquire_timeout: Duration::from_secs(sqlite.acquire_timeout_secs),
        page_size: settings.page_size,
        bootstrap_schema: sqlite.bootstrap_schema,
    };
    let store = SqliteContentStore::connect(&options).await?;
    Ok(StoreHandle::from_store(store))
}

#[cfg(not(feature = "db-sqlite"))]
async fn open_sqlite(_settings: &StoreSettings) -> Result<StoreHandle, OpenError> {
    Err(OpenError::NotCompiled(BackendKind::Sqlite))
}
