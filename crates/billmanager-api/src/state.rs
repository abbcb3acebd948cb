use billmanager_core::{BillService, ImportOptions};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub bills: BillService,
    pub import: ImportOptions,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(bills: BillService) -> Self {
        Self {
            bills,
            import: ImportOptions::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_import_options(mut self, import: ImportOptions) -> Self {
        self.import = import;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
