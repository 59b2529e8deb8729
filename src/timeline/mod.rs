pub mod entry;
pub mod matcher;
pub mod parser;

pub use entry::SubtitleRecord;
pub use matcher::match_to_text;
pub use parser::parse;
