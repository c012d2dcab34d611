pub mod error;
pub mod time;

pub use error::{Prom2mkrError, Result};
