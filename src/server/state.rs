use crate::auth::SessionAuthenticator;
use crate::content::ContentStore;
use crate::places::PlaceResolver;
use crate::storage::Storage;
use std::sync::Mutex;

pub struct AppState {
    pub storage: Mutex<Storage>,
    pub content: ContentStore,
    pub resolver: Mutex<PlaceResolver>,
    pub auth: SessionAuthenticator,
}

impl AppState {
    pub fn new(storage: Storage, content: ContentStore, resolver: PlaceResolver) -> Self {
        Self {
            storage: Mutex::new(storage),
            content,
            resolver: Mutex::new(resolver),
            auth: SessionAuthenticator::new(),
        }
    }
}
