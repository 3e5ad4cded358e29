//! Shared state for the REST routes.

use crate::dispatcher::Dispatcher;
use crate::sql::Storage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub storage: Arc<dyn Storage>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let storage = dispatcher.object_manager().storage();
        AppState { dispatcher, storage }
    }
}
