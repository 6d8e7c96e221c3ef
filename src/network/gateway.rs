//! Gateway - TCP listener that accepts incoming connections.
//!
//! The Gateway binds a socket and spawns a Session task for each incoming
//! client.

use crate::handlers::Registry;
use crate::network::Session;
use crate::state::Hub;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Accepts incoming TCP connections and spawns session tasks.
pub struct Gateway {
    listener: TcpListener,
    hub: Arc<Hub>,
    registry: Arc<Registry>,
}

impl Gateway {
    /// Bind the gateway to the given address.
    pub async fn bind(
        addr: SocketAddr,
        hub: Arc<Hub>,
        registry: Arc<Registry>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listener bound");
        Ok(Self {
            listener,
            hub,
            registry,
        })
    }

    /// The bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown is signalled.
    pub async fn run(self) {
        loop {
            if self.hub.is_stopping() {
                break;
            }
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let uid = self.hub.next_uid();
                        debug!(%addr, uid, "connection accepted");
                        let session =
                            Session::new(uid, addr, Arc::clone(&self.hub), Arc::clone(&self.registry));
                        tokio::spawn(async move {
                            if let Err(e) = session.run(stream).await {
                                warn!(uid, error = %e, "session ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                },
                _ = self.hub.shutdown.notified() => {
                    info!("gateway shutting down");
                    break;
                }
            }
        }
    }
}
