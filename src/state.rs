use std::sync::Arc;

use crate::allowlist::AllowlistStore;
use crate::forward::Forwarder;
use crate::geo::GeoClient;
use crate::ledger::AttemptLedger;

// app's shared state, built once and handed to both routers

pub struct AppState {
    pub store: Arc<AllowlistStore>,
    pub ledger: Arc<AttemptLedger>,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(geo: GeoClient, forwarder: Forwarder) -> Self {
        let ledger = Arc::new(AttemptLedger::new(Arc::new(geo)));
        let store = Arc::new(AllowlistStore::new(ledger.clone()));
        Self {
            store,
            ledger,
            forwarder,
        }
    }
}
