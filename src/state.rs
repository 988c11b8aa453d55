use std::sync::Arc;

use crate::aggregate::PageLimits;
use crate::config::AppConfig;
use crate::store::Datastore;

/// Authentication settings carried in request state so handlers and
/// middleware never read the config singleton.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub auth: AuthSettings,
    pub pages: PageLimits,
}

impl AppState {
    pub fn new(store: Arc<dyn Datastore>, config: &AppConfig) -> Self {
        Self {
            store,
            auth: AuthSettings {
                jwt_secret: config.security.jwt_secret.clone(),
                jwt_expiry_hours: config.security.jwt_expiry_hours,
            },
            pages: PageLimits {
                default_limit: config.api.default_page_size,
                max_limit: config.api.max_page_size,
            },
        }
    }
}
