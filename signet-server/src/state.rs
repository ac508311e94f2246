use crate::config::SignetConfig;
use crate::grants::GrantLifecycle;
use crate::store::{memory::MemoryStore, RecordStore};
use crate::strategies::StrategyRegistry;
use crate::tokens::TokenIssuer;
use std::sync::Arc;

/// Shared application state, cheap to clone into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SignetConfig>,
    pub store: Arc<dyn RecordStore>,
    pub issuer: Arc<TokenIssuer>,
    pub strategies: Arc<StrategyRegistry>,
    pub grants: GrantLifecycle,
}

impl AppState {
    pub fn new(config: SignetConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: SignetConfig, store: Arc<dyn RecordStore>) -> Self {
        let issuer = Arc::new(TokenIssuer::new(
            config.signing_secret.as_bytes(),
            &config.realm,
            config.tokens.access_ttl_secs,
            config.sessions.ttl_secs,
        ));
        let strategies = Arc::new(StrategyRegistry::new(&config));
        let grants = GrantLifecycle::new(store.clone(), issuer.clone());
        Self {
            config: Arc::new(config),
            store,
            issuer,
            strategies,
            grants,
        }
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self::new(SignetConfig::for_testing())
    }
}
