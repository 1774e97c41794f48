//! The protocol engine itself: byte ingest, receive parser, line
//! interpreter dispatch, command scheduler, transmit path, and fault
//! quarantine (spec §3, §4). This is the core the rest of the crate wraps.
//!
//! Grounded end-to-end on `can327.c`: `can327_ldisc_rx` (ingest),
//! `elm327_parse_rxbuf` (receive parser), `elm327_parse_line` (line
//! interpreter dispatch), `elm327_handle_prompt` (scheduler),
//! `elm327_send`/`elm327_kick_into_cmd_mode` (transmit path + probe),
//! `elm327_uart_side_failure` (fault quarantine). The buffered
//! byte-array-plus-fill-count bookkeeping follows the teacher's own
//! `rx_buff`/`rx_count` pattern in `sync`/`tokio::CanSocket::read_line`.

use std::collections::VecDeque;
use std::io;

use log::{debug, warn};

use crate::config::{Bitrate, ConfigWord, ControlMode, INIT_SCRIPT};
use crate::frame::{CanErrorFrame, CanFrame};
use crate::parser::{parse_error_string, parse_frame, FrameOutcome};
use crate::transport::Transport;
use crate::work::{Command, WorkItem, WorkMask};

/// Longest adapter line of interest (an EFF hexdump with spaces) plus
/// margin; spec §3 requires `R >= 256`, and per the canonical choice in
/// DESIGN.md this crate uses the larger of the two historical sizes.
const RX_BUF_CAPACITY: usize = 256;

/// Longest command this engine ever sends is a CAN_DATA hexdump line with
/// an 8-byte payload: `16 hex chars + CR = 17`; spec §3 requires `T >= 32`.
const TX_BUF_CAPACITY: usize = 32;

const PROBE_BYTE: u8 = b'y';
const PROMPT_BYTE: u8 = b'>';

/// Channel state (spec §3's `State`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninit,
    AwaitProbeEcho,
    AwaitPrompt,
    Receiving,
}

/// Something the channel wants to hand to the host side: a decoded frame
/// or an error condition (spec §6's CAN frame ABI covers both the same
/// way — an error frame is just a frame with the error bit set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Frame(CanFrame),
    Error(CanErrorFrame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("the channel has latched after an unrecoverable fault")]
    Latched,
}

/// The central entity of spec §3: one per bridged serial link.
pub struct Channel<T: Transport> {
    transport: T,

    rx_buf: [u8; RX_BUF_CAPACITY],
    rx_fill: usize,

    tx_buf: [u8; TX_BUF_CAPACITY],
    tx_cursor: usize,
    tx_remaining: usize,
    write_wakeup: bool,

    state: State,

    work_mask: WorkMask,
    init_active: bool,
    init_cursor: usize,

    control_mode: ControlMode,
    bitrate: Bitrate,

    staged_frame: Option<CanFrame>,
    staged_id: u32,
    staged_is_extended: bool,
    config_word: ConfigWord,

    drop_next_line: bool,
    latched: bool,
    tx_queue_ready: bool,

    events: VecDeque<InboundEvent>,
}

fn is_valid_char(c: u8) -> bool {
    c.is_ascii_digit()
        || c.is_ascii_uppercase()
        || matches!(c, b'<' | b'a' | b'b' | b'v' | b'.' | b'?' | PROBE_BYTE | PROMPT_BYTE | b' ' | b'\r')
}

/// Masked prompt-character match (spec §4.2/§9): the adapter intermittently
/// ORs garbage into the top two bits of `>`.
fn is_prompt_byte(c: u8) -> bool {
    (c & 0x3F) == (PROMPT_BYTE & 0x3F)
}

impl<T: Transport> Channel<T> {
    pub fn new(transport: T) -> Self {
        Channel {
            transport,
            rx_buf: [0; RX_BUF_CAPACITY],
            rx_fill: 0,
            tx_buf: [0; TX_BUF_CAPACITY],
            tx_cursor: 0,
            tx_remaining: 0,
            write_wakeup: false,
            state: State::Uninit,
            work_mask: WorkMask::empty(),
            init_active: false,
            init_cursor: 0,
            control_mode: ControlMode::default(),
            bitrate: Bitrate::default(),
            staged_frame: None,
            staged_id: crate::config::DEFAULT_STAGED_ID,
            staged_is_extended: false,
            config_word: ConfigWord::for_outgoing(false, Bitrate::default()),
            drop_next_line: false,
            latched: false,
            tx_queue_ready: false,
            events: VecDeque::new(),
        }
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Whether the scheduler has entered monitor mode and the host may
    /// submit another frame (spec §4.4 item 1's "signal the host that the
    /// transmit queue may accept another frame").
    pub fn tx_queue_ready(&self) -> bool {
        self.tx_queue_ready
    }

    /// Pops the next decoded frame or error condition, if any.
    pub fn pop_event(&mut self) -> Option<InboundEvent> {
        self.events.pop_front()
    }

    /// "Interface up" (spec §3 Lifecycle): resets buffers, validates and
    /// stores the bitrate/control mode, seeds the work mask with
    /// `{INIT, SILENT_MONITOR, RESPONSES, CAN_CONFIG}`, and sends the probe
    /// byte.
    pub fn interface_up(&mut self, bitrate: Bitrate, control_mode: ControlMode) {
        self.rx_fill = 0;
        self.tx_cursor = 0;
        self.tx_remaining = 0;
        self.write_wakeup = false;
        self.drop_next_line = false;
        self.latched = false;
        self.tx_queue_ready = false;
        self.events.clear();

        self.staged_frame = None;
        self.staged_id = crate::config::DEFAULT_STAGED_ID;
        self.staged_is_extended = false;

        self.bitrate = bitrate;
        self.control_mode = control_mode;
        self.config_word = ConfigWord::for_outgoing(false, bitrate);

        self.work_mask = WorkMask::empty();
        self.work_mask.set(WorkItem::SilentMonitor);
        self.work_mask.set(WorkItem::Responses);
        self.work_mask.set(WorkItem::CanConfig);
        self.init_active = true;
        self.init_cursor = 0;

        self.state = State::Uninit;
        self.kick_into_cmd_mode();
    }

    /// "Interface down" (spec §5 Cancellation): probes the adapter, clears
    /// the write-wakeup bit, and stops scheduling new outbound work. The
    /// host is responsible for reflecting the resulting CAN-stopped state.
    pub fn interface_down(&mut self) {
        self.kick_into_cmd_mode();
        self.write_wakeup = false;
        self.tx_queue_ready = false;
    }

    /// Byte ingest (spec §4.1). `error_flags`, if given, is a parallel
    /// array where a non-zero entry marks a framing/parity/break error the
    /// transport observed on that byte.
    pub fn bytes_available(&mut self, bytes: &[u8], error_flags: Option<&[u8]>) {
        if self.latched {
            return;
        }

        for (i, &b) in bytes.iter().enumerate() {
            if let Some(flags) = error_flags {
                if flags.get(i).copied().unwrap_or(0) != 0 {
                    self.trip_latch();
                    return;
                }
            }

            // A documented adapter-microcontroller defect injects stray
            // NUL bytes; drop them silently rather than treating them as
            // wiring faults.
            if b == 0 {
                continue;
            }

            if !is_valid_char(b) {
                self.trip_latch();
                return;
            }

            if self.rx_fill >= RX_BUF_CAPACITY {
                self.trip_latch();
                return;
            }

            self.rx_buf[self.rx_fill] = b;
            self.rx_fill += 1;
        }

        self.run_parser();
    }

    /// Transport writable notification (spec §4.5): resumes a partial
    /// write.
    pub fn transport_writable(&mut self) {
        self.drain_transmit();
    }

    /// Frame submission path (spec §4.4, "called from the network side").
    pub fn submit_frame(&mut self, frame: CanFrame) -> Result<(), ChannelError> {
        if self.latched {
            return Err(ChannelError::Latched);
        }

        let new_id = frame.raw_id();
        let new_is_extended = frame.is_extended();

        if (new_id, new_is_extended) != (self.staged_id, self.staged_is_extended) {
            if new_is_extended != self.staged_is_extended {
                self.config_word = ConfigWord::for_outgoing(new_is_extended, self.bitrate);
                self.work_mask.set(WorkItem::CanConfig);
            }

            if new_is_extended {
                self.work_mask.clear(WorkItem::CanId11Bit);
                self.work_mask.set(WorkItem::CanId29BitLow);
                self.work_mask.set(WorkItem::CanId29BitHigh);
            } else {
                self.work_mask.set(WorkItem::CanId11Bit);
                self.work_mask.clear(WorkItem::CanId29BitLow);
                self.work_mask.clear(WorkItem::CanId29BitHigh);
            }
        }

        self.staged_id = new_id;
        self.staged_is_extended = new_is_extended;
        self.staged_frame = Some(frame);
        self.work_mask.set(WorkItem::CanData);
        self.tx_queue_ready = false;

        self.kick_into_cmd_mode();
        Ok(())
    }

    /// Takes the ELM327 out of almost any state and back into command
    /// mode: send the probe byte, which either aborts a running operation
    /// or is echoed back in case we're already in command mode.
    fn kick_into_cmd_mode(&mut self) {
        if self.latched {
            return;
        }

        if !matches!(self.state, State::AwaitProbeEcho | State::AwaitPrompt) {
            self.send(&[PROBE_BYTE]);
            self.state = State::AwaitProbeEcho;
        }
    }

    /// Receive parser (spec §4.2). Iterates rather than recurses so a
    /// pathological stream of many short lines can't grow the stack (spec
    /// §9's "recursive parser re-entry" note).
    fn run_parser(&mut self) {
        loop {
            if self.latched {
                return;
            }

            match self.state {
                State::Uninit => {
                    self.rx_fill = 0;
                    return;
                }

                State::AwaitProbeEcho => {
                    let mut consumed = 0;
                    for i in 0..self.rx_fill {
                        let c = self.rx_buf[i];
                        if c == PROBE_BYTE {
                            self.send(b"\r");
                            self.state = State::AwaitPrompt;
                            consumed = i + 1;
                            break;
                        } else if is_prompt_byte(c) {
                            self.send(&[PROBE_BYTE]);
                            consumed = i + 1;
                            break;
                        }
                    }
                    self.drop_prefix(consumed);
                    return;
                }

                State::AwaitPrompt => {
                    if self.rx_fill > 0 && is_prompt_byte(self.rx_buf[self.rx_fill - 1]) {
                        self.rx_fill = 0;
                        self.run_scheduler();
                    } else {
                        self.rx_fill = 0;
                    }
                    return;
                }

                State::Receiving => {
                    let cr_pos = self.rx_buf[..self.rx_fill].iter().position(|&b| b == b'\r');
                    match cr_pos {
                        None if self.rx_fill == RX_BUF_CAPACITY => {
                            self.trip_latch();
                            return;
                        }
                        None => {
                            if self.rx_fill > 0 && is_prompt_byte(self.rx_buf[self.rx_fill - 1]) {
                                self.rx_fill = 0;
                                self.run_scheduler();
                            }
                            return;
                        }
                        Some(len) => {
                            let line: Vec<u8> = self.rx_buf[..len].to_vec();
                            self.drop_prefix(len + 1);
                            self.interpret_line(&line);
                            if self.rx_fill == 0 {
                                return;
                            }
                            // More bytes remain: re-dispatch on the
                            // (possibly new, if the line kicked us back
                            // into command mode) current state.
                        }
                    }
                }
            }
        }
    }

    /// Line interpreter (spec §4.3).
    fn interpret_line(&mut self, line: &[u8]) {
        if line.is_empty() {
            return;
        }

        if self.drop_next_line {
            self.drop_next_line = false;
            return;
        }

        if line.len() >= 2 && &line[..2] == b"AT" {
            return;
        }

        if !matches!(self.state, State::Receiving) {
            return;
        }

        match parse_frame(line) {
            FrameOutcome::Frame(frame) => {
                self.events.push_back(InboundEvent::Frame(frame));
            }
            FrameOutcome::Truncated => {
                self.events.push_back(InboundEvent::Error(CanErrorFrame::RxOverflow));
                if let Some(err) = parse_error_string(line) {
                    self.events.push_back(InboundEvent::Error(err));
                }
                self.kick_into_cmd_mode();
            }
            FrameOutcome::NotAFrame => {
                match parse_error_string(line) {
                    Some(err) => self.events.push_back(InboundEvent::Error(err)),
                    None => debug!("unable to connect to adapter"),
                }
                self.kick_into_cmd_mode();
            }
        }
    }

    /// Command scheduler / prompt handler (spec §4.4). Only invoked when a
    /// prompt has just been observed.
    fn run_scheduler(&mut self) {
        if self.work_mask.is_empty() && !self.init_active {
            self.send(&Command::EnterMonitorMode.to_bytes());
            self.state = State::Receiving;
            self.tx_queue_ready = true;
            return;
        }

        if self.init_active {
            let line = INIT_SCRIPT[self.init_cursor];
            self.init_cursor += 1;
            if self.init_cursor >= INIT_SCRIPT.len() {
                self.init_active = false;
            }
            self.send(&Command::InitLine(line).to_bytes());
            return;
        }

        let item = self
            .work_mask
            .take_highest_priority()
            .expect("scheduler invoked with an empty, non-init work mask");
        let command = self.command_for(item);
        let echoes = command.echoes_next_line();

        self.send(&command.to_bytes());

        if echoes {
            self.drop_next_line = true;
            self.state = State::Receiving;
            self.tx_queue_ready = true;
        }
    }

    fn command_for(&mut self, item: WorkItem) -> Command {
        let transmit_enabled = !self.control_mode.is_listen_only();

        match item {
            WorkItem::SilentMonitor => Command::SilentMonitor { transmit_enabled },
            WorkItem::Responses => Command::Responses { transmit_enabled },
            WorkItem::CanConfig => {
                self.work_mask.set(WorkItem::CanConfigPart2);
                Command::ConfigPrepare
            }
            WorkItem::CanConfigPart2 => Command::ConfigWord(self.config_word),
            WorkItem::CanId29BitHigh => Command::Extended29High(((self.staged_id >> 24) & 0xFF) as u8),
            WorkItem::CanId29BitLow => Command::Extended29Low(self.staged_id & 0x00FF_FFFF),
            WorkItem::CanId11Bit => Command::Standard11((self.staged_id & 0x7FF) as u16),
            WorkItem::CanData => {
                let frame = self
                    .staged_frame
                    .as_ref()
                    .expect("CAN_DATA scheduled without a staged frame");
                if frame.is_remote() {
                    Command::Rtr
                } else {
                    Command::Data(frame.data().to_vec())
                }
            }
        }
    }

    /// Transmit path (spec §4.5).
    fn send(&mut self, bytes: &[u8]) {
        if self.latched {
            return;
        }

        let len = bytes.len().min(TX_BUF_CAPACITY);
        self.tx_buf[..len].copy_from_slice(&bytes[..len]);
        self.tx_cursor = 0;
        self.tx_remaining = len;
        self.write_wakeup = true;

        self.drain_transmit();
    }

    fn drain_transmit(&mut self) {
        if self.latched || self.tx_remaining == 0 {
            return;
        }

        let slice = &self.tx_buf[self.tx_cursor..self.tx_cursor + self.tx_remaining];
        match self.transport.try_write(slice) {
            Ok(n) => {
                self.tx_cursor += n;
                self.tx_remaining -= n;
                if self.tx_remaining == 0 {
                    self.write_wakeup = false;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                // Nothing written for now; transport_writable() will retry.
            }
            Err(_) => self.trip_latch(),
        }
    }

    /// Fault quarantine (spec §4.6).
    fn trip_latch(&mut self) {
        if self.latched {
            return;
        }
        warn!("channel latched after an unrecoverable fault");
        self.latched = true;
        self.write_wakeup = false;
        self.tx_remaining = 0;
        self.tx_queue_ready = false;
        self.events.push_back(InboundEvent::Error(CanErrorFrame::BusOff));
    }

    fn drop_prefix(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.rx_buf.copy_within(n..self.rx_fill, 0);
        self.rx_fill -= n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ExtendedId, StandardId};
    use crate::transport::test_support::FakeTransport;

    fn new_channel() -> Channel<FakeTransport> {
        Channel::new(FakeTransport::default())
    }

    /// Drains the bytes the fake transport has recorded so far.
    fn take_written(channel: &mut Channel<FakeTransport>) -> Vec<u8> {
        std::mem::take(&mut channel.transport.written)
    }

    /// Drives a freshly-up channel through the handshake and init script,
    /// ending right after `ATMA\r` has been sent (monitor mode).
    ///
    /// With the default bitrate (divisor 1) and a standard-ID config, the
    /// `ATPB` word is `SEND_SFF | VARIABLE_DLC | RECV_BOTH_SFF_EFF | 1`
    /// = `0x8000 | 0x4000 | 0x2000 | 1` = `0xE001`.
    fn bring_up(channel: &mut Channel<FakeTransport>) {
        channel.interface_up(Bitrate::DEFAULT, ControlMode::Normal);
        assert_eq!(take_written(channel), b"y");

        // Adapter echoes our probe byte.
        channel.bytes_available(b"y", None);
        assert_eq!(take_written(channel), b"\r");

        // Adapter responds with its banner and a prompt.
        channel.bytes_available(b"ELM327 v1.5\r\r>", None);
        assert_eq!(take_written(channel), INIT_SCRIPT[0].as_bytes());

        for line in INIT_SCRIPT.iter().skip(1) {
            channel.bytes_available(b">", None);
            assert_eq!(take_written(channel), line.as_bytes());
        }

        // Last init line's prompt triggers SILENT_MONITOR, then RESPONSES,
        // then the two-step CAN_CONFIG, then monitor mode.
        channel.bytes_available(b">", None);
        assert_eq!(take_written(channel), b"ATCSM1\r");

        channel.bytes_available(b">", None);
        assert_eq!(take_written(channel), b"ATR1\r");

        channel.bytes_available(b">", None);
        assert_eq!(take_written(channel), b"ATPC\r");

        channel.bytes_available(b">", None);
        assert_eq!(take_written(channel), b"ATPBE001\r");

        channel.bytes_available(b">", None);
        assert_eq!(take_written(channel), b"ATMA\r");
        assert!(channel.tx_queue_ready());
        assert_eq!(channel.state, State::Receiving);
    }

    #[test]
    fn init_handshake_walks_script_then_enters_monitor_mode() {
        let mut channel = new_channel();
        bring_up(&mut channel);
    }

    #[test]
    fn transmit_standard_frame_without_reconfiguring() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        let frame =
            CanFrame::new_data(StandardId::new(0x123).unwrap(), &[0xAB, 0xCD]).unwrap();
        channel.submit_frame(frame).unwrap();
        assert_eq!(take_written(&mut channel), b"y");

        channel.bytes_available(b"y", None);
        assert_eq!(take_written(&mut channel), b"\r");
        channel.bytes_available(b">", None);

        assert_eq!(take_written(&mut channel), b"ATSH123\r");
        channel.bytes_available(b">", None);
        assert_eq!(take_written(&mut channel), b"ABCD\r");
    }

    #[test]
    fn transmit_extended_frame_reprograms_config_and_id() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        // With the default bitrate, an extended-ID config word drops
        // SEND_SFF: 0x4000 | 0x2000 | 1 = 0x6001.
        let frame = CanFrame::new_data(ExtendedId::new(0x18DB33F1).unwrap(), &[0x02]).unwrap();
        channel.submit_frame(frame).unwrap();
        channel.bytes_available(b"y", None);
        channel.bytes_available(b">", None);

        assert_eq!(take_written(&mut channel), b"ATPC\r");
        channel.bytes_available(b">", None);
        assert_eq!(take_written(&mut channel), b"ATPB6001\r");
        channel.bytes_available(b">", None);
        assert_eq!(take_written(&mut channel), b"ATCP18\r");
        channel.bytes_available(b">", None);
        assert_eq!(take_written(&mut channel), b"ATSHDB33F1\r");
        channel.bytes_available(b">", None);
        assert_eq!(take_written(&mut channel), b"02\r");
    }

    #[test]
    fn tx_queue_ready_reopens_after_can_data_completes() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        let frame = CanFrame::new_data(StandardId::new(0x123).unwrap(), &[0xAB]).unwrap();
        channel.submit_frame(frame).unwrap();
        assert!(!channel.tx_queue_ready());
        assert_eq!(take_written(&mut channel), b"y");

        channel.bytes_available(b"y", None);
        assert_eq!(take_written(&mut channel), b"\r");

        channel.bytes_available(b">", None);
        assert_eq!(take_written(&mut channel), b"ATSH123\r");
        assert!(!channel.tx_queue_ready());

        channel.bytes_available(b">", None);
        assert_eq!(take_written(&mut channel), b"AB\r");
        assert!(channel.tx_queue_ready());

        // The queue must have reopened: a second frame is accepted rather
        // than permanently refused.
        let second = CanFrame::new_data(StandardId::new(0x456).unwrap(), &[0xEF]).unwrap();
        assert!(channel.submit_frame(second).is_ok());
    }

    #[test]
    fn extended_ness_change_reprograms_even_when_raw_id_matches_staged() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        // Right after bring-up, staged_id is DEFAULT_STAGED_ID (0x7DF) and
        // staged_is_extended is false. An extended frame sharing that same
        // raw numeric id must still reprogram the adapter for 29-bit
        // addressing rather than being treated as a no-op.
        let frame = CanFrame::new_data(ExtendedId::new(0x7DF).unwrap(), &[0x01]).unwrap();
        channel.submit_frame(frame).unwrap();
        channel.bytes_available(b"y", None);
        channel.bytes_available(b">", None);

        assert_eq!(take_written(&mut channel), b"ATPC\r");
    }

    #[test]
    fn receives_extended_frame() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        channel.bytes_available(b"18 DB 33 F1 2 AB CD\r", None);
        match channel.pop_event() {
            Some(InboundEvent::Frame(frame)) => {
                assert!(frame.is_extended());
                assert_eq!(frame.raw_id(), 0x18DB33F1);
                assert_eq!(frame.dlc(), 2);
                assert_eq!(frame.data(), &[0xAB, 0xCD]);
            }
            other => panic!("expected a frame event, got {other:?}"),
        }
    }

    #[test]
    fn receives_rtr_frame() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        channel.bytes_available(b"123 2 RTR\r", None);
        match channel.pop_event() {
            Some(InboundEvent::Frame(frame)) => {
                assert!(frame.is_remote());
                assert_eq!(frame.dlc(), 2);
            }
            other => panic!("expected a frame event, got {other:?}"),
        }
    }

    #[test]
    fn illegal_byte_trips_the_failure_latch() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        channel.bytes_available(b"q", None);
        assert!(channel.is_latched());
        assert_eq!(
            channel.pop_event(),
            Some(InboundEvent::Error(CanErrorFrame::BusOff))
        );
    }

    #[test]
    fn transport_error_flag_trips_the_failure_latch() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        channel.bytes_available(b"1", Some(&[1]));
        assert!(channel.is_latched());
    }

    #[test]
    fn receive_buffer_overflow_without_cr_trips_the_latch() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        let garbage = vec![b'0'; RX_BUF_CAPACITY];
        channel.bytes_available(&garbage, None);
        assert!(channel.is_latched());
    }

    #[test]
    fn latch_is_one_way_and_suppresses_transmit() {
        let mut channel = new_channel();
        bring_up(&mut channel);
        channel.bytes_available(b"q", None);
        assert!(channel.is_latched());

        let frame = CanFrame::new_data(StandardId::new(0x42).unwrap(), &[]).unwrap();
        assert!(matches!(
            channel.submit_frame(frame),
            Err(ChannelError::Latched)
        ));
        assert!(take_written(&mut channel).is_empty());
    }

    #[test]
    fn nul_bytes_are_silently_dropped() {
        let mut channel = new_channel();
        bring_up(&mut channel);

        channel.bytes_available(b"123\0 2 AB CD\r", None);
        assert!(!channel.is_latched());
        assert!(matches!(channel.pop_event(), Some(InboundEvent::Frame(_))));
    }

    #[test]
    fn prompt_with_corrupted_high_bits_is_still_recognized() {
        assert!(is_prompt_byte(PROMPT_BYTE));
        assert!(is_prompt_byte(PROMPT_BYTE | 0xC0));
    }
}
