//! The NUL-framed pipe transport (§4.1 "Transport"): Chrome's
//! `--remote-debugging-pipe` protocol writes one JSON message per frame,
//! terminated by a single `0x00` byte, on fd 3 (browser -> us) and fd 4
//! (us -> browser). Multiple frames may arrive in one read, and a frame may
//! be split across several reads; [`Connection::recv`] buffers across both.

#[cfg(not(unix))]
compile_error!("pipe-mode CDP transport is only implemented for unix targets");

use std::io;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;

/// One end of the NUL-framed pipe conversation with the browser.
#[derive(Debug)]
pub struct Connection {
    reader: pipe::Receiver,
    writer: pipe::Sender,
    read_buf: Vec<u8>,
}

impl Connection {
    pub fn new(reader: pipe::Receiver, writer: pipe::Sender) -> Self {
        Connection {
            reader,
            writer,
            read_buf: Vec::new(),
        }
    }

    /// Serialize `value` and write it out followed by a NUL terminator.
    pub async fn send(&mut self, value: &Value) -> io::Result<()> {
        let mut frame = serde_json::to_vec(value).map_err(decode_err)?;
        frame.push(0);
        self.writer.write_all(&frame).await
    }

    /// Read the next complete NUL-terminated frame, decoding it as JSON.
    /// Returns `Ok(None)` once the browser has closed its end of the pipe.
    pub async fn recv(&mut self) -> io::Result<Option<Value>> {
        loop {
            if let Some(pos) = self.read_buf.iter().position(|&b| b == 0) {
                let frame: Vec<u8> = self.read_buf.drain(..=pos).collect();
                let value = serde_json::from_slice(&frame[..frame.len() - 1]).map_err(decode_err)?;
                return Ok(Some(value));
            }

            let mut chunk = [0u8; 8192];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return if self.read_buf.is_empty() {
                    Ok(None)
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "pipe closed mid-frame",
                    ))
                };
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }
}

fn decode_err(e: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exercises the framing logic directly against an in-memory buffer
    /// rather than a real pipe pair, since the split/reassembly logic is
    /// independent of the transport it runs over.
    fn split_frames(buf: &mut Vec<u8>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(pos) = buf.iter().position(|&b| b == 0) {
            let frame: Vec<u8> = buf.drain(..=pos).collect();
            out.push(serde_json::from_slice(&frame[..frame.len() - 1]).unwrap());
        }
        out
    }

    #[test]
    fn reassembles_two_frames_delivered_in_one_chunk() {
        let mut buf = Vec::new();
        buf.extend_from_slice(br#"{"id":1}"#);
        buf.push(0);
        buf.extend_from_slice(br#"{"id":2}"#);
        buf.push(0);
        let values = split_frames(&mut buf);
        assert_eq!(values, vec![serde_json::json!({"id": 1}), serde_json::json!({"id": 2})]);
        assert!(buf.is_empty());
    }

    #[test]
    fn leaves_partial_frame_buffered() {
        let mut buf = Vec::new();
        buf.extend_from_slice(br#"{"id":1}"#);
        buf.push(0);
        buf.extend_from_slice(br#"{"id":2"#);
        let values = split_frames(&mut buf);
        assert_eq!(values, vec![serde_json::json!({"id": 1})]);
        assert_eq!(buf, br#"{"id":2"#.to_vec());
    }

    proptest::proptest! {
        /// However a producer chunks its writes, the framing buffer must
        /// recover exactly the ids that went in, in order, regardless of
        /// where the chunk boundaries fall relative to the NUL terminators.
        #[test]
        fn recovers_ids_regardless_of_chunk_boundaries(
            ids in proptest::collection::vec(0u64..10_000, 1..20),
            chunk_size in 1usize..32,
        ) {
            let mut framed = Vec::new();
            for id in &ids {
                framed.extend_from_slice(serde_json::to_vec(&serde_json::json!({"id": id})).unwrap().as_slice());
                framed.push(0);
            }

            let mut buf = Vec::new();
            let mut recovered = Vec::new();
            for chunk in framed.chunks(chunk_size) {
                buf.extend_from_slice(chunk);
                recovered.extend(split_frames(&mut buf));
            }

            let recovered_ids: Vec<u64> = recovered
                .iter()
                .map(|v| v.get("id").and_then(|i| i.as_u64()).unwrap())
                .collect();
            prop_assert_eq!(recovered_ids, ids);
            prop_assert!(buf.is_empty());
        }
    }
}
