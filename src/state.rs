//! Application state: settings, the read-only catalog, the user store and
//! the model client. Built once at startup and shared behind an `Arc`.

use tracing::{info, instrument};

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::oracle::OracleClient;
use crate::store::Store;

pub struct AppState {
    pub settings: Settings,
    pub catalog: Catalog,
    pub store: Store,
    pub oracle: OracleClient,
}

impl AppState {
    /// Load catalog and store from the configured paths and build the oracle client.
    #[instrument(level = "info", skip_all)]
    pub fn new(settings: Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let catalog = Catalog::load(&settings.catalog)?;
        let store = Store::open(&settings.store)?;
        let state = Self::with_parts(settings, catalog, store)?;
        info!(
            target: "vocab_trainer",
            distractor_url = %state.settings.oracles.distractor_url,
            transcription_url = %state.settings.oracles.transcription_url,
            timeout_secs = state.settings.oracles.timeout_secs,
            "Oracles configured"
        );
        Ok(state)
    }

    pub fn with_parts(settings: Settings, catalog: Catalog, store: Store) -> Result<Self, String> {
        let oracle = OracleClient::new(&settings.oracles)?;
        Ok(Self { settings, catalog, store, oracle })
    }
}
