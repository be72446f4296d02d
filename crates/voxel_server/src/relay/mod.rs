//! The relay core: shared world state, the session protocol and event
//! fan-out.

pub mod dispatcher;
pub mod protocol;
pub mod stats;

pub use dispatcher::{broadcast, send_to};
pub use protocol::{Disposition, IgnoreReason, Relay};
pub use stats::{RelayStats, StatsSnapshot};
