//! relayd - a small IRC daemon.
//!
//! A multi-threaded IRC server covering registration, channels and
//! message routing over plain TCP.

pub mod config;
pub mod handlers;
pub mod network;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::handlers::Registry;
use crate::network::Gateway;
use crate::state::Hub;

/// A bound but not yet running server.
///
/// `bind` reserves the listen socket immediately so callers can read
/// `local_addr()` before serving (ephemeral ports in tests). `run`
/// consumes the server and serves until a [`ServerHandle::stop`] is
/// signalled.
pub struct Server {
    gateway: Gateway,
    hub: Arc<Hub>,
}

/// Cloneable handle used to stop a running [`Server`].
#[derive(Clone)]
pub struct ServerHandle {
    hub: Arc<Hub>,
}

impl ServerHandle {
    /// Signal the server to stop accepting and tear down all sessions.
    pub fn stop(&self) {
        let notice = relay_proto::Message::notice("*", "Server shutting down").with_prefix(
            relay_proto::Prefix::ServerName(self.hub.server_info.name.clone()),
        );
        self.hub.broadcast(notice);
        self.hub.begin_shutdown();
    }
}

impl Server {
    /// Bind the listen socket from `config` and prepare the shared state.
    pub async fn bind(config: Config) -> std::io::Result<Server> {
        let hub = Arc::new(Hub::new(&config));
        let registry = Arc::new(Registry::new());
        let gateway = Gateway::bind(config.listen.address, Arc::clone(&hub), registry).await?;
        Ok(Server { gateway, hub })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.gateway.local_addr()
    }

    /// A handle that can stop this server from another task.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            hub: Arc::clone(&self.hub),
        }
    }

    /// Serve until [`ServerHandle::stop`] is called.
    ///
    /// Returns once the accept loop has exited; sessions observe the
    /// same shutdown signal and disconnect themselves.
    pub async fn run(self) {
        let hub = Arc::clone(&self.hub);
        self.gateway.run().await;
        info!(users = hub.user_count(), "Accept loop stopped, draining sessions");
    }
}
