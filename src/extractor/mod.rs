pub mod fetch;
pub mod heuristics;
pub mod pipeline;

pub use fetch::{HttpPageSource, PageSource};
pub use heuristics::PriceBand;
pub use pipeline::Extractor;
