use std::sync::Arc;

use reqwest::Client;

use crate::{
    config::AppConfig,
    fetcher::MediaFetcher,
    jobs::{JobRegistry, JobRunner},
    management::LoginManager,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<JobRegistry>,
    pub runner: Arc<JobRunner>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub logins: Arc<LoginManager>,
    pub http: Client,
}

impl AppState {
    pub fn new(config: AppConfig, fetcher: Arc<dyn MediaFetcher>) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let runner = Arc::new(JobRunner::new(Arc::clone(&registry), Arc::clone(&fetcher)));
        Self {
            config: Arc::new(config),
            registry,
            runner,
            fetcher,
            logins: Arc::new(LoginManager::default()),
            http: Client::new(),
        }
    }
}
