use std::sync::Arc;

use worksync_core::persistence::UserStateStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStateStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn UserStateStore>) -> Self {
        Self { store }
    }
}
