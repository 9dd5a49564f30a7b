//! TCP transport fallback.
//!
//! DNS messages over TCP are framed with a 2-byte length prefix
//! ([RFC 1035 section 4.2.2](https://www.rfc-editor.org/rfc/rfc1035.html#section-4.2.2)).
//! The endpoint carries one in-flight framed message and reassembles the
//! inbound byte stream into messages.

use crate::{constants::TCP_MESSAGE_MAX_SIZE, Error, Result};
use arrayvec::ArrayVec;

const FRAMED_MAX: usize = TCP_MESSAGE_MAX_SIZE + 2;

/// TCP endpoint states.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) enum TcpState {
    #[default]
    Uninitialized,
    Connecting,
    ConnectedIdle,
    ConnectedSending,
}

/// TCP endpoint bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct TcpEndpoint {
    pub state: TcpState,
    send_buf: ArrayVec<u8, FRAMED_MAX>,
    recv_buf: ArrayVec<u8, FRAMED_MAX>,
}

impl TcpEndpoint {
    /// Frames `msg` for transmission. Only one message can be staged at
    /// a time; the next one is accepted after `clear_staged`.
    pub fn stage(&mut self, msg: &[u8]) -> Result<()> {
        if !self.send_buf.is_empty() || msg.len() > TCP_MESSAGE_MAX_SIZE {
            return Err(Error::NoBufs);
        }
        self.send_buf
            .try_extend_from_slice(&(msg.len() as u16).to_be_bytes())
            .ok();
        self.send_buf.try_extend_from_slice(msg).ok();
        Ok(())
    }

    pub fn staged(&self) -> &[u8] {
        &self.send_buf
    }

    pub fn clear_staged(&mut self) {
        self.send_buf.clear();
    }

    /// Appends received stream bytes to the reassembly buffer.
    pub fn push_received(&mut self, data: &[u8]) -> Result<()> {
        self.recv_buf
            .try_extend_from_slice(data)
            .map_err(|_| Error::NoBufs)
    }

    /// Pops one complete framed message, `Ok(None)` when more bytes are
    /// needed. A frame longer than the receive buffer can never
    /// complete; this fails the connection.
    pub fn pop_message(&mut self) -> Result<Option<ArrayVec<u8, TCP_MESSAGE_MAX_SIZE>>> {
        if self.recv_buf.len() < 2 {
            return Ok(None);
        }
        let length = u16::from_be_bytes([self.recv_buf[0], self.recv_buf[1]]) as usize;
        if length > TCP_MESSAGE_MAX_SIZE {
            return Err(Error::NoBufs);
        }
        if self.recv_buf.len() < 2 + length {
            return Ok(None);
        }

        let msg: ArrayVec<u8, TCP_MESSAGE_MAX_SIZE> =
            self.recv_buf[2..2 + length].iter().copied().collect();
        self.recv_buf.drain(..2 + length);
        Ok(Some(msg))
    }

    /// Drops all connection state.
    pub fn reset(&mut self) {
        *self = TcpEndpoint::default();
    }
}
