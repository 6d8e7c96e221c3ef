//! Test server management.
//!
//! Runs an in-process relayd instance on an ephemeral port for
//! integration testing.

use relayd::config::Config;
use relayd::{Server, ServerHandle};
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// A test server instance.
pub struct TestServer {
    addr: SocketAddr,
    handle: ServerHandle,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Bind a server on an ephemeral loopback port and start serving.
    pub async fn spawn() -> anyhow::Result<Self> {
        let config_content = r#"
[server]
name = "test.server"
network = "TestNet"
description = "Test IRC Server"

[listen]
address = "127.0.0.1:0"
"#;
        let config: Config = toml::from_str(config_content)?;

        let server = Server::bind(config).await?;
        let addr = server.local_addr()?;
        let handle = server.handle();
        let task = tokio::spawn(server.run());

        Ok(Self {
            addr,
            handle,
            task: Some(task),
        })
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self, nick: &str) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address(), nick).await
    }

    /// Stop the server and wait for the accept loop to exit.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        self.handle.stop();
        if let Some(task) = self.task.take() {
            task.await?;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.stop();
    }
}
