pub mod candidates;
pub mod contacts;

pub use candidates::{extract_anchor_candidates, strip_html_assets};
pub use contacts::HeuristicExtractor;
