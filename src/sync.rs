//! The synchronous frontend, for use with the [`serialport`] crate.
//!
//! Grounded on the teacher's `pub mod sync` (`CanSocket<P: SerialPort>`
//! wrapping a generic port, `read_line`'s byte-at-a-time pump, one
//! `write_all` per command) re-purposed to drive [`Host`] instead of
//! parsing SLCAN lines directly: every byte the port yields is handed to
//! [`Host::bytes_available`], and [`Host::poll`] drains whatever the
//! protocol engine decoded as a result. The port is kept behind a mutex
//! shared with the write-side [`Transport`] impl, since the engine writes
//! commands (via the channel lock) independently of the read pump below.

use std::io;
use std::sync::{Arc, Mutex};

use serialport::SerialPort;

use crate::config::ControlMode;
use crate::frame::CanFrame;
use crate::host::{Host, OpenError, Stats, SubmitError};
use crate::shared::ChannelClosed;
use crate::transport::Transport;
use crate::InboundEvent;

/// Adapts a blocking [`SerialPort`] to [`Transport`]: a write that can't
/// complete immediately (timeout expiry) is reported as
/// [`io::ErrorKind::WouldBlock`], matching what the engine expects from a
/// non-blocking sink.
struct PortTransport<P: SerialPort>(Arc<Mutex<P>>);

impl<P: SerialPort> Transport for PortTransport<P> {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut port = self.0.lock().expect("serial port mutex poisoned");
        match port.write(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                Err(io::ErrorKind::WouldBlock.into())
            }
            Err(e) => Err(e),
        }
    }
}

/// A synchronous interface into a CAN network through an ELM327 gateway
/// reachable over a [`SerialPort`].
pub struct CanSocket<P: SerialPort> {
    host: Host<PortTransport<P>>,
    port: Arc<Mutex<P>>,
    read_buf: [u8; 64],
}

impl<P: SerialPort> CanSocket<P> {
    /// Constructs a new `CanSocket` from a generic serial port.
    pub fn new(port: P) -> Self {
        let port = Arc::new(Mutex::new(port));
        CanSocket {
            host: Host::new(PortTransport(Arc::clone(&port))),
            port,
            read_buf: [0; 64],
        }
    }

    /// Configures the adapter at the given bitrate and control mode and
    /// begins the init handshake (spec §3 Lifecycle).
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

    /// Pumps whatever bytes the port has ready into the protocol engine
    /// and returns the next decoded frame or error, if any.
    ///
    /// An error is returned only for I/O errors besides `WouldBlock`/
    /// `TimedOut`; those are safe to retry, matching the teacher's
    /// `read_line` contract.
    pub fn poll(&mut self) -> io::Result<Option<InboundEvent>> {
        let _ = self.host.transport_writable();

        loop {
            if let Ok(Some(event)) = self.host.poll() {
                return Ok(Some(event));
            }

            match self.read_port() {
                Ok(0) => return Ok(None),
                Ok(_) => continue,
                Err(e)
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
                {
                    return Ok(None)
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn read_port(&mut self) -> io::Result<usize> {
        let n = {
            let mut port = self.port.lock().expect("serial port mutex poisoned");
            port.read(&mut self.read_buf)?
        };
        if n > 0 {
            let _ = self.host.bytes_available(&self.read_buf[..n], None);
        }
        Ok(n)
    }
}
