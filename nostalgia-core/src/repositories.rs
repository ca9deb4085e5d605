// Durable key-value storage of the client.
// Everything stored here survives a restart of the process.

use crate::entities::*;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The stored value is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

type Result<T> = std::result::Result<T, Error>;

pub trait ConsentRepo {
    /// Missing values are reported as [`ConsentState::Unset`].
    fn consent(&self) -> Result<ConsentState>;
    fn set_consent(&self, consent: ConsentState) -> Result<()>;

    fn last_position(&self) -> Result<Option<Position>>;
    fn set_last_position(&self, position: &Position) -> Result<()>;
}

pub trait OnboardingRepo {
    fn is_onboarding_dismissed(&self) -> Result<bool>;
    fn set_onboarding_dismissed(&self, dismissed: bool) -> Result<()>;
}

impl<T> ConsentRepo for &T
where
    T: ConsentRepo + ?Sized,
{
    fn consent(&self) -> Result<ConsentState> {
        (**self).consent()
    }
    fn set_consent(&self, consent: ConsentState) -> Result<()> {
        (**self).set_consent(consent)
    }
    fn last_position(&self) -> Result<Option<Position>> {
        (**self).last_position()
    }
    fn set_last_position(&self, position: &Position) -> Result<()> {
        (**self).set_last_position(position)
    }
}
