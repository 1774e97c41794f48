//! The host-side CAN network device collaborator surface (spec §6): fixed
//! MTU, packet statistics, bitrate validation at interface-up, and the
//! listen-only gate on outbound frames.
//!
//! Grounded on `can327.c`'s netdev glue (`can327_netdev_open/close/
//! start_xmit`, `dev->stats.*`) for the shape of what a host wraps around
//! the protocol engine, and `ohowland-socketcan-rs`'s `CanSocket` for the
//! general idiom of a host-facing handle type in Rust rather than a kernel
//! `net_device`.

use crate::channel::{ChannelError, InboundEvent};
use crate::config::{Bitrate, BitrateOutOfRange, ControlMode};
use crate::frame::{CanErrorFrame, CanFrame};
use crate::shared::{ChannelClosed, SharedChannel};
use crate::transport::Transport;

/// Classic CAN 2.0B frame size; this engine never negotiates CAN FD.
pub const MTU: usize = 16;

/// Packet statistics, mirroring the counters a CAN network device exposes
/// (spec §6: "tx/rx counts, byte counts, fifo errors").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    /// Frames rejected before submission (listen-only mode, closed queue).
    pub tx_dropped: u64,
    /// Adapter-reported or locally-detected bus errors, per received
    /// [`CanErrorFrame`].
    pub rx_errors: u64,
    /// Specifically the receive-buffer-overflow subset of `rx_errors`.
    pub rx_fifo_errors: u64,
}

/// Why a frame was refused at the host layer without ever reaching the
/// protocol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("the interface is in listen-only mode")]
    ListenOnly,
    #[error("the transmit queue is not ready for another frame")]
    QueueStopped,
    #[error("the channel has been closed")]
    Closed,
}

impl From<ChannelClosed> for SubmitError {
    fn from(_: ChannelClosed) -> Self {
        SubmitError::Closed
    }
}

/// A host-facing CAN interface built on top of a [`SharedChannel`].
///
/// Mirrors a kernel netdev's queue-stop/queue-wake discipline: at most one
/// frame is ever staged at a time (spec §3 invariant I6), enforced here by
/// refusing `submit_frame` until the channel reports `tx_queue_ready`
/// (i.e. the work mask has drained and the adapter is back in monitor
/// mode).
pub struct Host<T: Transport> {
    channel: SharedChannel<T>,
    control_mode: ControlMode,
    stats: Stats,
}

impl<T: Transport> Host<T> {
    pub fn new(transport: T) -> Self {
        Host {
            channel: SharedChannel::new(transport),
            control_mode: ControlMode::Normal,
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn mtu(&self) -> usize {
        MTU
    }

    /// Link up (spec §6): validates the requested bitrate against the
    /// adapter's 64-entry discrete set and runs the channel's init
    /// sequence.
    pub fn open(&mut self, bitrate_bps: u32, control_mode: ControlMode) -> Result<(), OpenError> {
        let bitrate = Bitrate::from_bps(bitrate_bps)?;
        self.control_mode = control_mode;
        self.stats = Stats::default();
        self.channel.interface_up(bitrate, control_mode)?;
        Ok(())
    }

    /// Link down (spec §6).
    pub fn close(&mut self) -> Result<(), ChannelClosed> {
        self.channel.interface_down()
    }

    /// Tears the channel down permanently (spec §5's "Channel close").
    pub fn teardown(&self) {
        self.channel.close();
    }

    pub fn is_listen_only(&self) -> bool {
        self.control_mode.is_listen_only()
    }

    /// Outbound packet path (spec §6's `start_xmit`). Drops the frame at
    /// the host layer — counted in `tx_dropped`, never reaching the wire —
    /// when listen-only mode is active or the previous frame's command
    /// sequence hasn't finished draining yet.
    pub fn submit_frame(&mut self, frame: CanFrame) -> Result<(), SubmitError> {
        if self.control_mode.is_listen_only() {
            self.stats.tx_dropped += 1;
            return Err(SubmitError::ListenOnly);
        }

        if !self.channel.tx_queue_ready()? {
            self.stats.tx_dropped += 1;
            return Err(SubmitError::QueueStopped);
        }

        let dlc = frame.dlc() as u64;
        match self.channel.submit_frame(frame)? {
            Ok(()) => {
                self.stats.tx_packets += 1;
                self.stats.tx_bytes += dlc;
                Ok(())
            }
            Err(ChannelError::Latched) => {
                self.stats.tx_dropped += 1;
                Err(SubmitError::Closed)
            }
        }
    }

    /// Drains one pending inbound frame or error, updating stats as it
    /// goes. Returns `None` once nothing is pending.
    pub fn poll(&mut self) -> Result<Option<InboundEvent>, ChannelClosed> {
        let event = self.channel.pop_event()?;

        if let Some(event) = &event {
            match event {
                InboundEvent::Frame(frame) => {
                    self.stats.rx_packets += 1;
                    self.stats.rx_bytes += frame.dlc() as u64;
                }
                InboundEvent::Error(err) => {
                    self.stats.rx_errors += 1;
                    if matches!(err, CanErrorFrame::RxOverflow) {
                        self.stats.rx_fifo_errors += 1;
                    }
                }
            }
        }

        Ok(event)
    }

    /// Forwards a batch of received bytes into the protocol engine (spec
    /// §4.1's ingest, invoked from the transport's receive callback).
    pub fn bytes_available(
        &self,
        bytes: &[u8],
        error_flags: Option<&[u8]>,
    ) -> Result<(), ChannelClosed> {
        self.channel.bytes_available(bytes, error_flags)
    }

    /// Forwards a transport "writable" notification.
    pub fn transport_writable(&self) -> Result<(), ChannelClosed> {
        self.channel.transport_writable()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Bitrate(#[from] BitrateOutOfRange),
    #[error(transparent)]
    Closed(#[from] ChannelClosed),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::StandardId;
    use crate::transport::test_support::FakeTransport;

    fn opened_host() -> Host<FakeTransport> {
        let mut host = Host::new(FakeTransport::default());
        host.open(500_000, ControlMode::Normal).unwrap();
        host
    }

    #[test]
    fn open_rejects_non_divisor_bitrate() {
        let mut host = Host::new(FakeTransport::default());
        assert!(matches!(
            host.open(123_456, ControlMode::Normal),
            Err(OpenError::Bitrate(_))
        ));
    }

    #[test]
    fn listen_only_drops_outbound_frames_before_the_channel_sees_them() {
        let mut host = Host::new(FakeTransport::default());
        host.open(500_000, ControlMode::ListenOnly).unwrap();

        let frame = CanFrame::new_data(StandardId::new(0x123).unwrap(), &[]).unwrap();
        assert_eq!(host.submit_frame(frame), Err(SubmitError::ListenOnly));
        assert_eq!(host.stats().tx_dropped, 1);
    }

    #[test]
    fn queue_stopped_until_channel_finishes_init() {
        let mut host = opened_host();
        let frame = CanFrame::new_data(StandardId::new(0x123).unwrap(), &[0xAB]).unwrap();
        assert_eq!(host.submit_frame(frame), Err(SubmitError::QueueStopped));
        assert_eq!(host.stats().tx_dropped, 1);
    }

    #[test]
    fn mtu_is_fixed() {
        let host = Host::new(FakeTransport::default());
        assert_eq!(host.mtu(), MTU);
    }

    #[test]
    fn submit_frame_succeeds_again_after_the_first_frame_drains() {
        use crate::config::INIT_SCRIPT;

        let mut host = opened_host();

        host.bytes_available(b"y", None).unwrap();
        host.bytes_available(b"ELM327 v1.5\r\r>", None).unwrap();
        for _ in INIT_SCRIPT.iter().skip(1) {
            host.bytes_available(b">", None).unwrap();
        }
        // SILENT_MONITOR, RESPONSES, the two-step CAN_CONFIG, then monitor
        // mode: five more prompts before the queue opens.
        for _ in 0..5 {
            host.bytes_available(b">", None).unwrap();
        }
        assert!(host
            .submit_frame(CanFrame::new_data(StandardId::new(0x123).unwrap(), &[0xAB]).unwrap())
            .is_ok());

        // Drive the CAN_ID_11BIT/CAN_DATA sequence through to completion.
        host.bytes_available(b"y", None).unwrap();
        host.bytes_available(b">", None).unwrap();
        host.bytes_available(b">", None).unwrap();

        // The queue must have reopened rather than staying permanently
        // stopped after the first frame.
        assert!(host
            .submit_frame(CanFrame::new_data(StandardId::new(0x456).unwrap(), &[0xEF]).unwrap())
            .is_ok());
    }
}
