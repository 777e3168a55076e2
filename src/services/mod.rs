pub mod expiry;
pub mod reservation;
pub mod search_index;

// Re-export all services for convenient access
pub use expiry::ExpiryWorker;
pub use reservation::{HoldDetails, ReservationService};
pub use search_index::SearchIndexClient;
