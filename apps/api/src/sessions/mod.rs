// Session Authority: owns the canonical interview session record.
// Planning, cursor advancement and terminal transitions live here; both
// storage backends share the aggregate rules in `models::session`.

pub mod authority;
pub mod export;
pub mod handlers;
pub mod memory;
pub mod planning;
pub mod postgres;
pub mod summary;
pub mod templates;
pub mod validation;
