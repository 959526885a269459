//! Session cache and its TTL key/value backend

pub mod cleanup;
pub mod entry;
pub mod error;
pub mod session;
pub mod store;

pub use cleanup::spawn_cleanup_task;
pub use entry::{CacheEntry, SessionEntry};
pub use error::CacheError;
pub use session::{SessionCache, REMEMBER_ME_KEY};
pub use store::{CacheStore, MemoryCache};

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
