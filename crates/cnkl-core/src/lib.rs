pub mod config;
pub mod logging;

pub mod checksum;
pub mod chunklist;
pub mod control;
pub mod fetch;
pub mod policy;
pub mod progress;
pub mod verify;

pub use chunklist::{ChunkMethod, ChunkRecord, ChunklistManifest, ManifestError};
pub use control::CancelToken;
pub use policy::{verify_download, Launch, Outcome, SkipReason, VerifyPolicy};
pub use progress::{ProgressHandle, ProgressSnapshot, ValidationStatus};
pub use verify::{ChunklistVerification, ValidationTask, VerifyError};
