mod error;
mod invalidate_cache;
mod onboarding;
mod submit_memory;

pub use self::{error::Error, invalidate_cache::*, onboarding::*, submit_memory::*};

mod prelude {
    pub use super::error::Error;
    pub type Result<T> = std::result::Result<T, Error>;
    pub use crate::{
        entities::*,
        gateways::{
            api::PinsApi,
            query_cache::{QueryCache, QueryFilter, QueryKey, QueryKind},
        },
        repositories::*,
    };
}
