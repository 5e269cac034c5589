pub mod catalog;
pub mod error;
pub mod matching;
pub mod record;
pub mod usage;

pub use catalog::*;
pub use error::{Error, Result};
pub use matching::IdMatching;
pub use record::*;
pub use usage::*;
