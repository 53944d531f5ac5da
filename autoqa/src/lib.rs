pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    CliOverrides, credentials_from, parse_log_level, parse_url_line, resolve_config, target_url,
};

pub use autoqa_core::crawl::{CrawlOptions, execute_crawl, extract_url_path};
