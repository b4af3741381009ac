pub mod logger;

pub use logger::{Outcome, RunLog, RunLogger};
