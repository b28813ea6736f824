//! Platform detection and URL normalization.

pub mod detect;
pub mod redirector;
pub mod resolve;

pub use detect::{detect_platform, fetch_url, Detection, PlatformError};
pub use redirector::unwrap_redirector;
pub use resolve::UrlResolver;
