use const_format::concatcp;
use ride_share_lib::{matching::SeatsInsufficient, ValidationError};
use thiserror::Error;

pub mod database;
mod data_manager;

pub use data_manager::*;

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "ride_share.db");

#[derive(Error, Debug)]
pub enum DataManagerError {
    #[error("{0}")]
    Database(String),

    #[error("{0} {1} not found")]
    NotFound(&'static str, i64),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    SeatsInsufficient(#[from] SeatsInsufficient),

    #[error("request {0} does not belong to trip {1}")]
    NotAttached(i64, i64),

    #[error("request {0} is already matched")]
    AlreadyMatched(i64),

    #[error("trip {0} was modified concurrently, try again")]
    Conflict(i64),
}
