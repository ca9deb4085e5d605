pub mod api;
pub mod device;
pub mod query_cache;
