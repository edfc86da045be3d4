use shelf_catalog::{CatalogHandle, SettingsHandle};
use shelf_config::BackupConfig;
use shelf_record::models::SourceApp;
use shelf_storage::StoreHandle;

/// Everything an import or export works against.
#[derive(Clone)]
pub struct Context {
    pub catalog: CatalogHandle,
    pub settings: SettingsHandle,
    pub covers: StoreHandle,
    /// Identity written into archive headers.
    pub app: SourceApp,
    pub config: BackupConfig,
}

impl Context {
    pub fn new(catalog: CatalogHandle, settings: SettingsHandle, covers: StoreHandle) -> Self {
        Self { catalog, settings, covers, app: SourceApp::default(), config: BackupConfig::default() }
    }

    pub fn with_app(mut self, app: SourceApp) -> Self {
        self.app = app;
        self
    }

    pub fn with_config(mut self, config: BackupConfig) -> Self {
        self.config = config;
        self
    }
}
