//! Test IRC client.
//!
//! Provides an IRC client for integration testing that can send commands
//! and assert on received responses.

use relay_proto::{Command, Message};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test IRC client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    nick: String,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str, nick: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            nick: nick.to_string(),
        })
    }

    /// Send a raw IRC line.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Send an IRC command.
    pub async fn send(&mut self, cmd: Command) -> anyhow::Result<()> {
        let msg = Message::from(cmd);
        self.send_raw(&msg.to_string()).await
    }

    /// Receive a single message from the server.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a message with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("Connection closed by server");
        }

        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("Parse error: {}", e))
    }

    /// Receive messages until the given predicate returns true.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<Message>>
    where
        F: FnMut(&Message) -> bool,
    {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = predicate(&msg);
            messages.push(msg);
            if done {
                break;
            }
        }
        Ok(messages)
    }

    /// Receive messages until one carries the given numeric code.
    pub async fn recv_until_code(&mut self, code: u16) -> anyhow::Result<Vec<Message>> {
        self.recv_until(|msg| msg.response_code() == Some(code))
            .await
    }

    /// Register with the server (NICK + USER) and wait for RPL_WELCOME.
    pub async fn register(&mut self) -> anyhow::Result<Message> {
        self.send(Command::NICK(self.nick.clone())).await?;
        self.send(Command::USER(
            self.nick.clone(),
            "0".to_string(),
            format!("Test User {}", self.nick),
        ))
        .await?;

        let mut messages = self.recv_until_code(1).await?;
        let welcome = messages.pop().ok_or_else(|| {
            anyhow::anyhow!("Registration failed: no RPL_WELCOME received")
        })?;
        Ok(welcome)
    }

    /// Register and drain the rest of the welcome burst (through 376).
    pub async fn register_and_drain(&mut self) -> anyhow::Result<Message> {
        let welcome = self.register().await?;
        self.recv_until_code(376).await?;
        Ok(welcome)
    }

    /// Join a channel and wait for the end of the NAMES list.
    #[allow(dead_code)]
    pub async fn join(&mut self, channel: &str) -> anyhow::Result<Vec<Message>> {
        self.send(Command::JOIN(channel.to_string())).await?;
        self.recv_until_code(366).await
    }

    /// Send a PRIVMSG.
    #[allow(dead_code)]
    pub async fn privmsg(&mut self, target: &str, text: &str) -> anyhow::Result<()> {
        self.send(Command::PRIVMSG(target.to_string(), text.to_string()))
            .await
    }

    /// Send QUIT.
    #[allow(dead_code)]
    pub async fn quit(&mut self, reason: Option<String>) -> anyhow::Result<()> {
        self.send(Command::QUIT(reason)).await
    }

    /// The nick this client registered with.
    #[allow(dead_code)]
    pub fn nick(&self) -> &str {
        &self.nick
    }
}
