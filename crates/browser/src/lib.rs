//! CDP-based browser collaborator.
//!
//! - Daemon model: a Chromium process persists between action dispatches,
//!   one per conversation, managed by [`SessionManager`].
//! - CDP protocol: Chrome DevTools Protocol over WebSocket.
//! - Accessibility tree: role-based enumeration of interactive elements.

pub mod ax;
pub mod cdp;
pub mod session;

pub use ax::{collect_semantic, AxElement, SEMANTIC_ROLES};
pub use cdp::CdpClient;
pub use session::{BrowserSession, SessionManager};
