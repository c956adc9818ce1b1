pub mod auth;
pub mod error;

pub use auth::{ActorContext, ClinicRole};
pub use error::AppError;
