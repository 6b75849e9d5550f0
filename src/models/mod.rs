pub mod audit;
pub mod listing;
pub mod user;

pub use audit::{AuditEntry, CallLogRecord};
pub use listing::{Event, Listing, TravelPackage};
pub use user::{
    PreferencesUpdate, PriceRange, SearchHistoryEntry, SearchRecord, UserPreferences, UserProfile,
};
