//! Chrome DevTools Protocol transport.
//!
//! The message-bus adapter toward the browser: a WebSocket client that
//! correlates requests to responses by id, splits protocol events from
//! command replies, and exposes per-page sessions for script evaluation.

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::{BrowserVersion, CdpEvent, CdpRequest, CdpResponse, PageInfo};
pub use session::PageSession;
