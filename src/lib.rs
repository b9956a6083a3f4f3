pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod locator;
pub mod output;
pub mod progress;
pub mod session;
pub mod shelf;
pub mod urls;

pub use config::{ConfigLoader, ShelfConfig};
pub use error::{Error, Result};
pub use extract::{BookRecord, FieldExtractor, UserRating};
pub use load::{LoadController, LoadOutcome};
pub use locator::Locator;
pub use progress::{parse_progress, ProgressStatus};
pub use session::{BrowserSession, Key, SnapshotSession, WebDriverSession};
pub use shelf::ShelfScraper;
