pub mod backup;
pub mod codec;
pub mod consolidate;
pub mod recall;
pub mod store;
pub mod types;

pub use backup::{BackupHandle, BackupService};
pub use store::{MemoryStore, RecoveryMarker};
pub use types::{CharacterKey, CharacterProfile, Tier};
