//! Mirror configuration.
//!
//! A mirror is an alternate origin serving the same backend API. This module
//! keeps the user-editable, persisted list of mirrors and the index of the
//! one currently in use, and provides the cycling primitive the request
//! layer uses to fall back from one mirror to the next.

mod manager;
mod store;
mod types;
mod url_parser;

pub use manager::MirrorManager;
pub use store::{MirrorStore, STORE_FORMAT_VERSION};
pub use types::*;
pub use url_parser::parse_search_url;
