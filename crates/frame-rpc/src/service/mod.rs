//! Service layer - the session orchestrator and its caller-facing handles.

pub mod reply;
pub mod session;
pub mod stats;

pub use reply::{PendingReply, ReplyStream};
pub use session::{Disposition, DropReason, Session, INITIALIZE, THEME_CHANGE};
pub use stats::{SessionStats, StatsSnapshot};
