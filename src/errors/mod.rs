pub mod types;

pub use types::TestbenchError;
