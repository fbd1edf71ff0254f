use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{config::AppConfig, media::MediaStore};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub media: MediaStore,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, config: AppConfig) -> Self {
        let media = MediaStore::new(config.media_root.clone(), config.media_url.clone());
        Self {
            orm,
            config: Arc::new(config),
            media,
        }
    }
}
