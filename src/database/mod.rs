pub mod manager;

pub use manager::{PoolError, PoolManager};
