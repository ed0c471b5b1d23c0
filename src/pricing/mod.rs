pub mod catalog;
pub mod engine;
pub mod premiums;

pub use catalog::PRODUCT_CATALOG;
pub use engine::compute_prices;
pub use premiums::{PremiumTable, PremiumsUpdate};
