use std::sync::Arc;

use log::Logger;

use crate::catalog::DEFAULT_PAGE_SIZE;
use crate::db::{CatalogSource, SavedRecords, SubmissionStore};
use crate::saved::{LocalSavedStore, SavedTutorialsStore, UserSavedStore};
use crate::urls::Urls;

#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub catalog: Arc<dyn CatalogSource>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub saved_records: Arc<dyn SavedRecords>,
    pub local_saved: Arc<LocalSavedStore>,
    pub urls: Arc<Urls>,
    pub config: Config,
}

impl Environment {
    /// Creates an environment whose catalog, submissions and saved records
    /// all live in the same database.
    pub fn new<D>(
        logger: Arc<Logger>,
        db: Arc<D>,
        local_saved: Arc<LocalSavedStore>,
        urls: Arc<Urls>,
        config: Config,
    ) -> Self
    where
        D: CatalogSource + SubmissionStore + SavedRecords + 'static,
    {
        Self {
            logger,
            catalog: db.clone(),
            submissions: db.clone(),
            saved_records: db,
            local_saved,
            urls,
            config,
        }
    }

    /// The saved-tutorial store for a request: the user’s own rows when
    /// the request carries an identity, the local store otherwise.
    pub fn saved_store(&self, user: Option<String>) -> Arc<dyn SavedTutorialsStore> {
        match user.filter(|u| !u.is_empty()) {
            Some(user) => Arc::new(UserSavedStore::new(self.saved_records.clone(), user)),
            None => self.local_saved.clone(),
        }
    }

    pub fn is_admin(&self, user: Option<&str>) -> bool {
        match (&self.config.admin_uid, user) {
            (Some(admin), Some(user)) => admin == user,
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) page_size: usize,
    pub(crate) admin_uid: Option<String>,
}

impl Config {
    pub fn new(page_size: usize, admin_uid: Option<String>) -> Self {
        Self {
            page_size,
            admin_uid,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, None)
    }
}
