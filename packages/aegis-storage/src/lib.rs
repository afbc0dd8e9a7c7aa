pub mod bulk;
pub mod classify;
pub mod index;
pub mod store;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
