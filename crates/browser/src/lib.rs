//! Browser access for structure comparison
//!
//! Talks to an already running Chrome over the DevTools Protocol and returns
//! the inner markup of a selected element once the page's network is quiet.
//!
//! # Architecture
//!
//! 1. **One socket**: a single CDP WebSocket, multiplexed over flat sessions
//! 2. **One target per fetch**: concurrent fetches never share a page
//! 3. **Distinct failures**: a missing selector is not a navigation error

pub mod cdp;
pub mod renderer;
pub mod session;

pub use cdp::{CDPClient, CDPError, CDPSession};
pub use renderer::{fetch_pair, RenderError, Renderer};
pub use session::{BrowserSession, SessionConfig};
