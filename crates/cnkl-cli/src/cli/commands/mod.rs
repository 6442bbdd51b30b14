//! CLI command handlers. Each command is in its own file.

mod checksum;
mod completions;
mod inspect;
mod verify;

pub use checksum::run_checksum;
pub use completions::run_completions;
pub use inspect::run_inspect;
pub use verify::run_verify;

#[cfg(test)]
pub(crate) use verify::load_chunklist;
