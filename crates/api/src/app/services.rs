//! Service wiring: the shared store, the activity bus and the optional remote sync.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use receiptdesk_events::InMemoryEventBus;
use receiptdesk_infra::config::AppConfig;
use receiptdesk_infra::seed::demo_store;
use receiptdesk_infra::sync::{CloudSync, RemoteTables, RestRemoteTables};
use receiptdesk_infra::{ActivityBus, ReceiptStore};

pub type SharedSync = CloudSync<Arc<dyn RemoteTables>>;

/// Everything the handlers share. Store access is serialised by one mutex.
pub struct AppServices {
    pub store: Mutex<ReceiptStore>,
    pub bus: Arc<ActivityBus>,
    pub sync: Option<SharedSync>,
}

impl AppServices {
    /// Wrap `store`, attaching a fresh activity bus.
    pub fn new(store: ReceiptStore, remote: Option<Arc<dyn RemoteTables>>) -> Self {
        let bus: Arc<ActivityBus> = Arc::new(InMemoryEventBus::new());
        Self {
            store: Mutex::new(store.with_bus(bus.clone())),
            bus,
            sync: remote.map(CloudSync::new),
        }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store = if config.seed_demo_data {
            info!("loading demo dataset");
            demo_store()?
        } else {
            ReceiptStore::new()
        }
        .with_journal_capacity(config.journal_capacity);

        let remote: Option<Arc<dyn RemoteTables>> = match (&config.sync.url, config.sync.is_enabled()) {
            (Some(url), true) => {
                let api_key = config.sync.api_key.clone().unwrap_or_default();
                let rest = RestRemoteTables::new(url.clone(), api_key, config.sync.timeout())?;
                info!(url = %url, "remote sync enabled");
                Some(Arc::new(rest))
            }
            _ => {
                info!("remote sync disabled");
                None
            }
        };

        Ok(Self::new(store, remote))
    }
}
