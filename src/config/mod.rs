pub mod loader;
pub mod schema;

pub use loader::{ConfigLoader, ConfigOverrides};
pub use schema::{Offset, OutputConfig, ShelfConfig};
