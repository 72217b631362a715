pub mod coordinator;
pub mod error;
pub mod model;
pub mod term;
pub mod worker;

pub use error::Error;
