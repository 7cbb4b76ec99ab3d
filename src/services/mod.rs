//! Simulated infrastructure behind the HTTP surface.
//!
//! The cache and message broker never leave the process. They exist so the
//! endpoints have realistic work to trace.

pub mod cache;
pub mod host;
pub mod messaging;

pub use cache::{CacheHealth, CacheService};
pub use host::HostInfo;
pub use messaging::{MessageService, MessagingHealth, Published};
