//! Per-connection session loop.
//!
//! A session runs in two phases. During the handshake the transport is
//! driven synchronously: replies queued by handlers are drained and written
//! after each dispatch. Once registered, the session registers its outbound
//! queue with the Hub and enters a unified select! loop over incoming lines
//! and queued deliveries.

use crate::handlers::{Context, HandlerError, HandshakeState, Registry};
use crate::state::{Hub, OUTBOUND_QUEUE, Uid};
use futures_util::{SinkExt, StreamExt};
use relay_proto::{LineCodec, Message};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::debug;

/// One client connection, from accept to close.
pub struct Session {
    uid: Uid,
    addr: SocketAddr,
    hub: Arc<Hub>,
    registry: Arc<Registry>,
}

impl Session {
    /// Create a session for an accepted connection.
    pub fn new(uid: Uid, addr: SocketAddr, hub: Arc<Hub>, registry: Arc<Registry>) -> Self {
        Self {
            uid,
            addr,
            hub,
            registry,
        }
    }

    /// Drive the connection until it closes, then tear down all state.
    pub async fn run(self, stream: TcpStream) -> anyhow::Result<()> {
        let mut transport = Framed::new(stream, LineCodec::new());
        let mut handshake = HandshakeState::default();

        if !self
            .handshake_phase(&mut transport, &mut handshake)
            .await?
        {
            // Connection ended before registering: free any tentative nick.
            if let Some(nick) = &handshake.nick {
                self.hub.release_nick(nick, self.uid);
            }
            return Ok(());
        }

        self.registered_phase(&mut transport, &mut handshake).await;
        Ok(())
    }

    /// Phase 1: read lines until registration completes.
    ///
    /// Returns false if the connection ended first.
    async fn handshake_phase(
        &self,
        transport: &mut Framed<TcpStream, LineCodec>,
        handshake: &mut HandshakeState,
    ) -> anyhow::Result<bool> {
        // Replies queued during the handshake are drained synchronously;
        // nothing is routed through the Hub until a sender is registered.
        let (handshake_tx, mut handshake_rx) = mpsc::channel::<Message>(64);

        while !handshake.registered {
            // notify_waiters stores no permit, so a notification that fires
            // while a dispatch is in flight would be lost; the flag check at
            // the top of each iteration catches it.
            if self.hub.is_stopping() {
                let _ = transport
                    .send(Message::error("Closing Link: server shutting down".to_owned()))
                    .await;
                return Ok(false);
            }
            let msg = tokio::select! {
                incoming = transport.next() => match incoming {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        debug!(uid = self.uid, error = %e, "handshake read error");
                        return Ok(false);
                    }
                    None => return Ok(false),
                },
                _ = self.hub.shutdown.notified() => {
                    let _ = transport
                        .send(Message::error("Closing Link: server shutting down".to_owned()))
                        .await;
                    return Ok(false);
                }
            };

            let result = {
                let mut ctx = Context {
                    uid: self.uid,
                    hub: &self.hub,
                    sender: &handshake_tx,
                    handshake: &mut *handshake,
                    remote_addr: self.addr,
                };
                self.registry.dispatch(&mut ctx, &msg).await
            };

            while let Ok(reply) = handshake_rx.try_recv() {
                transport.send(reply).await?;
            }

            match result {
                Ok(()) => {}
                Err(HandlerError::Quit(reason)) => {
                    let _ = transport.send(Message::error(self.closing_link(reason))).await;
                    return Ok(false);
                }
                Err(err) => {
                    if let Some(reply) = err.to_irc_reply(
                        &self.hub.server_info.name,
                        handshake.nick.as_deref().unwrap_or("*"),
                        msg.command.verb(),
                    ) {
                        transport.send(reply).await?;
                    }
                }
            }
        }

        Ok(true)
    }

    /// Phase 2: unified loop over incoming lines and queued deliveries.
    async fn registered_phase(
        &self,
        transport: &mut Framed<TcpStream, LineCodec>,
        handshake: &mut HandshakeState,
    ) {
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);
        self.hub.register_sender(self.uid, outgoing_tx.clone());

        let mut quit_reason = String::from("Connection closed");

        loop {
            // Same missed-notification guard as the handshake loop.
            if self.hub.is_stopping() {
                quit_reason = "Server shutting down".to_owned();
                let _ = transport
                    .send(Message::error("Closing Link: server shutting down".to_owned()))
                    .await;
                break;
            }
            tokio::select! {
                incoming = transport.next() => {
                    let msg = match incoming {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => {
                            debug!(uid = self.uid, error = %e, "read error");
                            break;
                        }
                        None => break,
                    };

                    let result = {
                        let mut ctx = Context {
                            uid: self.uid,
                            hub: &self.hub,
                            sender: &outgoing_tx,
                            handshake: &mut *handshake,
                            remote_addr: self.addr,
                        };
                        self.registry.dispatch(&mut ctx, &msg).await
                    };

                    match result {
                        Ok(()) => {}
                        Err(HandlerError::Quit(reason)) => {
                            quit_reason =
                                reason.clone().unwrap_or_else(|| "Client Quit".to_owned());
                            let _ = transport
                                .send(Message::error(self.closing_link(reason)))
                                .await;
                            break;
                        }
                        Err(err) => {
                            let nick = handshake.nick.as_deref().unwrap_or("*");
                            let reply = err.to_irc_reply(
                                &self.hub.server_info.name,
                                nick,
                                msg.command.verb(),
                            );
                            if let Some(reply) = reply {
                                if transport.send(reply).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
                delivery = outgoing_rx.recv() => {
                    match delivery {
                        Some(msg) => {
                            if transport.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = self.hub.shutdown.notified() => {
                    quit_reason = "Server shutting down".to_owned();
                    let _ = transport
                        .send(Message::error("Closing Link: server shutting down".to_owned()))
                        .await;
                    break;
                }
            }
        }

        debug!(uid = self.uid, reason = %quit_reason, "session closed");
        self.hub.disconnect_user(self.uid, &quit_reason).await;
    }

    fn closing_link(&self, reason: Option<String>) -> String {
        match reason {
            Some(reason) => format!("Closing Link: {} (Quit: {})", self.addr.ip(), reason),
            None => format!("Closing Link: {} (Client Quit)", self.addr.ip()),
        }
    }
}
