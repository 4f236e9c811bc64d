mod coordinator;
mod fetch_error;
mod models;
mod store;

pub use coordinator::{FetchCoordinator, FetchHandle, FetchOutcome, ListingUpdates};
pub use fetch_error::FetchError;
pub use models::ListingRecord;
pub use store::ListingStore;
