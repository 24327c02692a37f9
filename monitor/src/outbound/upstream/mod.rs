//! Availability source adapters.
//!
//! `stored` replays the cached payload, `directory` reads capture files, and
//! `refreshing` wraps a live `PayloadCapture` (such as `http`) with a
//! freshness window.

mod directory;
mod http;
mod refreshing;
mod stored;

pub use directory::DirectoryPayloadSource;
pub use http::HttpPayloadCapture;
pub use refreshing::{PayloadCapture, RefreshingPayloadSource};
pub use stored::StoredPayloadSource;
