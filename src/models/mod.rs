//! Small helpers shared by API model types.

mod abbreviation;
mod syncable;

pub use abbreviation::abbreviate;
pub use syncable::{weak_hash, SyncableModel};
