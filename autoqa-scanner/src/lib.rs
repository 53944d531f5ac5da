pub mod crawler;
pub mod driver;
pub mod error;
pub mod extract;
pub mod result;

pub use crawler::{CrawlSession, Crawler, LoadPolicy, ProgressCallback, load_with_retry, normalize_url};
pub use driver::{Element, HttpDriver, PageDriver, StaticDriver};
pub use error::{DriverError, ScanError};
pub use extract::extract_structure;
pub use result::StructuralFacts;
