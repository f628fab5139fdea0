pub mod sqlite;

pub use sqlite::{execute_batch, run};
