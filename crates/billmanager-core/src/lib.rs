pub mod bills;
pub mod error;
pub mod import;
pub mod users;
pub mod views;

use std::sync::Arc;

use billmanager_repository::{BillRepository, UserRepository};

pub use bills::{BillRequest, BillSearch, BillService, BillUpdate, PeriodTotal, UserReference};
pub use error::{BillError, Result};
pub use import::{
    import_csv, CreationFailurePolicy, ImportOptions, ImportOutcome, ImportSummary,
    UnknownFailurePolicy,
};
pub use users::{RegisterUserRequest, UserService};
pub use views::{BillView, PaginatedResponse, UserView};

/// Builds both services over one store.
pub fn services<R>(repository: Arc<R>) -> BillService
where
    R: UserRepository + BillRepository + 'static,
{
    let users = UserService::new(repository.clone());
    BillService::new(repository, users)
}
