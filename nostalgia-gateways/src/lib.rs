//! Concrete collaborators of `nostalgia-core`.

pub mod device;
pub mod http;
pub mod query_cache;
pub mod storage;
