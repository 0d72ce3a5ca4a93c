//! Fallback-chain extraction of categories, product cards and detail pages.

pub mod html;
pub mod regex_chain;
pub mod selector_chain;

pub use html::{merge_detail, name_from_url, ExtractedPage, Extractor, ProductDetail};
pub use regex_chain::RegexChain;
pub use selector_chain::SelectorChain;
