//! Tokio codec for newline-delimited JSON messages

use bytes::{BufMut, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::ProtocolError;
use crate::message::{DaemonRequest, DaemonResponse};

/// Maximum length of a single encoded message, excluding the newline
pub const MAX_LINE_LENGTH: usize = 4 * 1024 * 1024;

/// Codec that writes `Enc` values and reads `Dec` values, one JSON object per line
#[derive(Debug)]
pub struct JsonLinesCodec<Enc, Dec> {
    /// Bytes of the buffer already scanned for a newline
    next_index: usize,
    _marker: PhantomData<fn(Enc) -> Dec>,
}

/// Codec used by clients: sends requests, reads responses
pub type ClientCodec = JsonLinesCodec<DaemonRequest, DaemonResponse>;

/// Codec used by daemons: sends responses, reads requests
pub type ServerCodec = JsonLinesCodec<DaemonResponse, DaemonRequest>;

impl<Enc, Dec> JsonLinesCodec<Enc, Dec> {
    /// Create a new codec
    pub fn new() -> Self {
        Self {
            next_index: 0,
            _marker: PhantomData,
        }
    }
}

impl<Enc, Dec> Default for JsonLinesCodec<Enc, Dec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Enc, Dec: DeserializeOwned> Decoder for JsonLinesCodec<Enc, Dec> {
    type Item = Dec;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            let Some(end) = newline else {
                if src.len() > MAX_LINE_LENGTH {
                    return Err(ProtocolError::LineTooLong {
                        size: src.len(),
                        max: MAX_LINE_LENGTH,
                    });
                }
                // Need more data
                self.next_index = src.len();
                return Ok(None);
            };

            self.next_index = 0;
            if end > MAX_LINE_LENGTH {
                return Err(ProtocolError::LineTooLong {
                    size: end,
                    max: MAX_LINE_LENGTH,
                });
            }

            let line = src.split_to(end + 1);
            let line = &line[..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            // Blank lines are keep-alives
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Ok(Some(serde_json::from_slice(line)?));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None if src.iter().all(u8::is_ascii_whitespace) => {
                src.clear();
                self.next_index = 0;
                Ok(None)
            }
            None => {
                // Final message without a trailing newline
                let line = src.split();
                self.next_index = 0;
                Ok(Some(serde_json::from_slice(&line)?))
            }
        }
    }
}

impl<Enc: Serialize, Dec> Encoder<Enc> for JsonLinesCodec<Enc, Dec> {
    type Error = ProtocolError;

    fn encode(&mut self, item: Enc, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = serde_json::to_vec(&item)?;
        if payload.len() > MAX_LINE_LENGTH {
            return Err(ProtocolError::LineTooLong {
                size: payload.len(),
                max: MAX_LINE_LENGTH,
            });
        }

        trace!(bytes = payload.len(), "Encoding message");
        dst.reserve(payload.len() + 1);
        dst.put_slice(&payload);
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{LabelSelector, Selection};

    #[test]
    fn test_client_to_server() {
        let mut client = ClientCodec::new();
        let mut server = ServerCodec::new();

        let request = DaemonRequest::ListSynchronization {
            selection: Selection::Labels(LabelSelector::new("sidecar-session-owner", "abc")),
        };

        let mut buf = BytesMut::new();
        client.encode(request.clone(), &mut buf).unwrap();
        assert_eq!(buf.last(), Some(&b'\n'));

        let decoded = server.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, request);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_read() {
        let mut server = ServerCodec::new();

        let mut full = BytesMut::new();
        server.encode(DaemonResponse::Ok, &mut full).unwrap();
        server
            .encode(
                DaemonResponse::Error {
                    message: "boom".to_string(),
                },
                &mut full,
            )
            .unwrap();

        let mut client = ClientCodec::new();
        let mut partial = full.split_to(5);
        assert!(client.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&full);
        assert_eq!(client.decode(&mut partial).unwrap(), Some(DaemonResponse::Ok));
        assert_eq!(
            client.decode(&mut partial).unwrap(),
            Some(DaemonResponse::Error {
                message: "boom".to_string()
            })
        );
        assert!(client.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn test_line_too_long() {
        let mut client = ClientCodec::new();
        let mut buf = BytesMut::new();
        buf.resize(MAX_LINE_LENGTH + 1, b' ');
        buf[0] = b'{';

        match client.decode(&mut buf) {
            Err(ProtocolError::LineTooLong { max, .. }) => assert_eq!(max, MAX_LINE_LENGTH),
            other => panic!("Expected LineTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut client = ClientCodec::new();
        let mut buf = BytesMut::from("\n\r\n{\"type\":\"ok\"}\n");
        assert_eq!(client.decode(&mut buf).unwrap(), Some(DaemonResponse::Ok));
    }

    #[test]
    fn test_eof_without_newline() {
        let mut client = ClientCodec::new();
        let mut buf = BytesMut::from("{\"type\":\"ok\"}");
        assert!(client.decode(&mut buf).unwrap().is_none());
        assert_eq!(client.decode_eof(&mut buf).unwrap(), Some(DaemonResponse::Ok));
    }
}
