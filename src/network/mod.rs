//! Network layer: listener and per-connection session loop.

mod gateway;
mod session;

pub use gateway::Gateway;
pub use session::Session;
