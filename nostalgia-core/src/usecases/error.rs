use crate::{gateways::api, repositories};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The business name is missing")]
    BusinessName,
    #[error("The business name is too long")]
    BusinessNameLength,
    #[error("The year is out of range")]
    Year,
    #[error("The end year is before the start year")]
    YearRange,
    #[error("The note is too long")]
    Note,
    #[error("Invalid proof URL")]
    ProofUrl,
    #[error(transparent)]
    Api(#[from] api::Error),
    #[error(transparent)]
    Repo(#[from] repositories::Error),
}
