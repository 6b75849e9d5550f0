pub mod discovery;
pub mod enrichment;
pub mod providers;
pub mod users;

pub use discovery::{CallContext, DiscoveryOutcome, DiscoveryService, RESULT_WINDOW};
pub use enrichment::{Enricher, Suggestion};
pub use users::{validate_phone_number, ProfileView, UserService};
