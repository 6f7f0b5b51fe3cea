use std::sync::Arc;

use crate::config::ServerConfig;
use crate::lease::LeaseCoordinator;
use crate::queue::QueueSender;
use crate::store::Stores;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub leases: Arc<dyn LeaseCoordinator>,
    pub queue: QueueSender,
    pub config: Arc<ServerConfig>,
}
