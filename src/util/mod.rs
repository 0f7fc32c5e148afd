//! Utility functions for common operations.
//!
//! - **URL validation**: scheme checks plus SSRF protection for feed and list URLs
//! - **Text cleaning**: removes characters that cannot appear in XML output
//!
//! # Examples
//!
//! ```
//! use rssmerge::util::{clean_text, validate_url, HostPolicy};
//!
//! let url = validate_url("https://example.com/feed.xml", HostPolicy::PublicOnly).unwrap();
//! assert_eq!(clean_text(" Hello\x07 ").as_deref(), Some("Hello"));
//! ```

mod text;
mod url_validator;

pub use text::{clean_text, strip_control_chars};
pub use url_validator::{check_url, validate_url, HostPolicy, UrlValidationError};
