use std::sync::Arc;

use crate::config::Config;
use crate::gateway::PaymentGateway;
use crate::store::MarketStore;

/// Explicitly constructed dependencies, passed down to every handler.
/// Nothing in the crate reaches for globals; swapping the store or gateway
/// for an in-memory double is a constructor argument away.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MarketStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: Config,
    ) -> Self {
        Self {
            store,
            gateway,
            config: Arc::new(config),
        }
    }
}
