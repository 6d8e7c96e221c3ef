//! Line-oriented codec for framed IRC transports.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::message::Message;
use crate::MAX_LINE_LEN;

/// Splits a byte stream into IRC lines and frames outgoing [`Message`]s.
///
/// Decoding is lossy: invalid UTF-8 is replaced rather than failing, and
/// blank lines yield `None` so the read loop can skip them. Lines longer
/// than the protocol maximum abort the connection.
#[derive(Debug, Default)]
pub struct LineCodec {
    scan_from: usize,
}

impl LineCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        loop {
            let newline = src[self.scan_from..].iter().position(|&b| b == b'\n');
            match newline {
                Some(offset) => {
                    let line = src.split_to(self.scan_from + offset + 1);
                    self.scan_from = 0;

                    let text = String::from_utf8_lossy(&line);
                    let trimmed = text.trim_end_matches(['\r', '\n']);
                    if trimmed.is_empty() {
                        continue;
                    }
                    match trimmed.parse::<Message>() {
                        Ok(msg) => return Ok(Some(msg)),
                        // Unparseable garbage is skipped, not fatal.
                        Err(_) => continue,
                    }
                }
                None if src.len() > MAX_LINE_LEN => {
                    return Err(ProtocolError::LineTooLong(MAX_LINE_LEN));
                }
                None => {
                    self.scan_from = src.len();
                    return Ok(None);
                }
            }
        }
    }
}

impl Encoder<Message> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let line = msg.to_string();
        dst.reserve(line.len());
        dst.put_slice(line.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn decodes_complete_lines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("NICK test\r\nJOIN #test\r\n");

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.command, Command::NICK("test".into()));

        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.command, Command::JOIN("#test".into()));

        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn buffers_partial_lines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PRIVMSG #test :Hel");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"lo\r\n");
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(
            msg.command,
            Command::PRIVMSG("#test".into(), "Hello".into())
        );
    }

    #[test]
    fn skips_blank_lines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("\r\n\r\nPING x\r\n");
        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.command, Command::PING("x".into()));
    }

    #[test]
    fn rejects_oversized_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[b'a'; MAX_LINE_LEN + 1]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn encodes_with_crlf() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(Message::privmsg("#test", "Hello World!"), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"PRIVMSG #test :Hello World!\r\n");
    }
}
