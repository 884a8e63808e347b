use super::auth::AuthChecker;
use super::client::BackendClient;
use super::clock::{Clock, SystemClock};
use super::cookies::CookieStore;
use super::extractor::PageSnapshot;
use super::page::{PageContext, PageHandle};
use super::panel::{Debouncer, PanelController, RetryPolicy};
use super::relay::{MessageRelay, RelayHandle};
use crate::config::ExtensionConfig;
use crate::error::RelayError;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;

const CHANNEL_CAPACITY: usize = 32;

/// The three extension contexts wired together and running.
pub struct ExtensionRuntime {
    pub page: PageHandle,
    pub relay: RelayHandle,
    pub panel: Arc<PanelController>,
    pub backend: Arc<BackendClient>,
    auto_refresh: JoinHandle<()>,
}

impl ExtensionRuntime {
    pub fn start(config: &ExtensionConfig, cookies: Arc<dyn CookieStore>) -> Result<Self> {
        Self::start_with_clock(config, cookies, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        config: &ExtensionConfig,
        cookies: Arc<dyn CookieStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let base = Url::parse(&config.backend_url)
            .with_context(|| format!("invalid backend_url: {}", config.backend_url))?;
        let backend = Arc::new(BackendClient::new(base, Arc::clone(&cookies)));

        let auth = AuthChecker::new(
            backend.clone(),
            Arc::clone(&cookies),
            clock,
            backend.host(),
            config.freshness_window(),
        );
        let page = PageContext::spawn(CHANNEL_CAPACITY);
        let relay = MessageRelay::spawn(auth, page.clone(), cookies.subscribe(), CHANNEL_CAPACITY);
        let panel = Arc::new(PanelController::new(
            1,
            relay.clone(),
            Arc::clone(&backend),
            RetryPolicy::from_config(config),
            config.reply_timeout(),
        ));
        let auto_refresh = tokio::spawn(Arc::clone(&panel).run_auto_refresh(
            page.subscribe_mutations(),
            Debouncer::new(config.debounce_window()),
        ));

        tracing::info!(backend = %backend.base_url(), "extension runtime started");
        Ok(Self {
            page,
            relay,
            panel,
            backend,
            auto_refresh,
        })
    }

    /// Navigate the page context to a new problem page.
    pub async fn open_page(&self, page: PageSnapshot) -> Result<(), RelayError> {
        self.page.load(page).await
    }

    pub fn shutdown(self) {
        self.auto_refresh.abort();
        tracing::debug!("extension runtime stopped");
    }
}
