//! # nostalgia-core
//!
//! Viewport query caching and geolocation consent for the Nostalgia map client.
//!
//! Everything in here is synchronous and free of I/O. Asynchronous work
//! (fetching pins, asking the device for a position) is expressed as
//! explicit requests that the host performs and later reports back
//! together with the originating [`RequestId`].

use std::fmt;

pub mod bbox;
pub mod gateways;
pub mod geolocation;
pub mod limiter;
pub mod location_detail;
pub mod pins;
pub mod repositories;
pub mod usecases;
pub mod viewport;

pub mod entities {
    pub use nostalgia_entities::{
        geo::*, geolocation::*, location::*, memory::*, pin::*, time::*,
    };
}


/// Identifies an asynchronous request issued by one of the state machines.
///
/// Ids are only unique per issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) const fn first() -> Self {
        Self(1)
    }

    /// Returns the current id and advances `self`.
    pub(crate) fn next(&mut self) -> Self {
        let id = *self;
        self.0 += 1;
        id
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
