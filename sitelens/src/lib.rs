// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export input loaders for convenience
pub use handlers::{
    derive_target_url, load_entry_page, load_records, load_robots, parse_records,
    parse_robots_txt, parse_url_line,
};
