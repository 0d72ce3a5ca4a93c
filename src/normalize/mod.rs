//! Pure normalization contracts shared by the scrape, import and convert paths.

pub mod brand;
pub mod catalog;
pub mod columns;
pub mod price;
pub mod slug;
pub mod specs;

pub use brand::infer_brand;
pub use catalog::{generate_sku, to_product_record};
pub use columns::normalize_column;
pub use price::{format_price, parse_price};
pub use slug::{slugify, title_from_slug};
pub use specs::normalize_spec_key;
