pub mod profiles;
pub mod registry;

pub use profiles::{ExtractionStrategy, SiteProfile};
pub use registry::ProfileRegistry;
