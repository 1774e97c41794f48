//! The async frontend, for use with the [`tokio_serial`] crate.
//!
//! Generalized from the teacher's `pub mod tokio` (`CanSocket` wrapping a
//! `SerialStream`) to use `SerialStream::{readable, writable, try_read,
//! try_write}` rather than a blocking `AsyncRead`/`AsyncWrite` loop: "bytes
//! available" and "transport writable" become the real non-blocking events
//! spec §5 describes, instead of the teacher's own blocking-read tokio
//! frontend. Both methods take `&self` on `SerialStream` (mirroring
//! `tokio::net::TcpStream`), so the port can be shared behind a plain
//! `Arc` between the write-side [`Transport`] impl and the read loop below
//! with no additional locking.

use std::io;
use std::sync::Arc;

use tokio_serial::SerialStream;

use crate::config::ControlMode;
use crate::frame::CanFrame;
use crate::host::{Host, OpenError, Stats, SubmitError};
use crate::shared::ChannelClosed;
use crate::transport::Transport;
use crate::InboundEvent;

struct AsyncPortTransport(Arc<SerialStream>);

impl Transport for AsyncPortTransport {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.try_write(buf)
    }
}

/// An asynchronous interface into a CAN network through an ELM327 gateway
/// reachable over a [`SerialStream`].
pub struct CanSocket {
    host: Host<AsyncPortTransport>,
    port: Arc<SerialStream>,
}

impl CanSocket {
    /// Constructs a new `CanSocket` from an async `SerialStream`.
    pub fn new(port: SerialStream) -> Self {
        let port = Arc::new(port);
        CanSocket {
            host: Host::new(AsyncPortTransport(Arc::clone(&port))),
            port,
        }
    }

    /// Configures the adapter at the given bitrate and control mode and
    /// begins the init handshake (spec §3 Lifecycle). Synchronous: every
    /// write this triggers goes through the non-blocking [`Transport`]
    /// path and never suspends.
    pub fn open(&mut self, bitrate_bps: u32, control_mode: ControlMode) -> Result<(), OpenError> {
        self.host.open(bitrate_bps, control_mode)
    }

    /// Requests the adapter stop streaming frames.
    pub fn close(&mut self) -> Result<(), ChannelClosed> {
        self.host.close()
    }

    pub fn stats(&self) -> Stats {
        self.host.stats()
    }

    /// Sends a CAN frame to the gateway to be broadcast on the bus.
    pub fn send(&mut self, frame: impl Into<CanFrame>) -> Result<(), SubmitError> {
        self.host.submit_frame(frame.into())
    }

    /// Waits for and returns the next decoded frame or error condition.
    ///
    /// # Cancel Safety
    ///
    /// This method is cancel safe: if some other branch of a
    /// [`tokio::select`] completes first, any bytes already read have been
    /// fed into the protocol engine and are not lost; the next call to
    /// `recv` picks up from there.
    pub async fn recv(&mut self) -> io::Result<InboundEvent> {
        loop {
            if let Ok(Some(event)) = self.host.poll() {
                return Ok(event);
            }

            tokio::select! {
                readable = self.port.readable() => {
                    readable?;
                    let mut buf = [0u8; 64];
                    match self.port.try_read(&mut buf) {
                        Ok(n) => {
                            let _ = self.host.bytes_available(&buf[..n], None);
                        }
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                        Err(e) => return Err(e),
                    }
                }
                writable = self.port.writable() => {
                    writable?;
                    let _ = self.host.transport_writable();
                }
            }
        }
    }
}
