//! The work mask (spec §3's "pending work mask") and the `ATxx` command
//! formatter it drives (spec §4.4's table).
//!
//! The mask is a plain bitset, exactly the shape `can327.c`'s `cmds_todo`
//! `unsigned long` takes, per spec §9's "ordered enum + bit-set
//! abstraction with atomic test-and-clear" option. `INIT` is deliberately
//! not one of these bits: per spec §4.4/I4 it is peeked and walked by a
//! separate cursor, one init-script line per prompt, and is only cleared
//! once that cursor runs off the end.

use crate::config::ConfigWord;

/// Work-mask flags, in the priority order the scheduler walks them (spec §3
/// item list, items 2-9; item 1/INIT is the separate cursor above).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum WorkItem {
    SilentMonitor = 1 << 0,
    Responses = 1 << 1,
    CanConfig = 1 << 2,
    CanConfigPart2 = 1 << 3,
    CanId29BitHigh = 1 << 4,
    CanId29BitLow = 1 << 5,
    CanId11Bit = 1 << 6,
    CanData = 1 << 7,
}

/// Priority order, highest first, matching spec §3/§4.4.
const PRIORITY: [WorkItem; 8] = [
    WorkItem::SilentMonitor,
    WorkItem::Responses,
    WorkItem::CanConfig,
    WorkItem::CanConfigPart2,
    WorkItem::CanId29BitHigh,
    WorkItem::CanId29BitLow,
    WorkItem::CanId11Bit,
    WorkItem::CanData,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkMask(u16);

impl WorkMask {
    pub fn empty() -> Self {
        WorkMask(0)
    }

    pub fn set(&mut self, item: WorkItem) {
        self.0 |= item as u16;
    }

    pub fn clear(&mut self, item: WorkItem) {
        self.0 &= !(item as u16);
    }

    pub fn test(&self, item: WorkItem) -> bool {
        self.0 & (item as u16) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Finds the highest-priority set flag and clears it atomically (i.e.
    /// the clear is part of the same call, so a caller can never observe
    /// the flag set after selecting it). Returns `None` if the mask is
    /// empty.
    pub fn take_highest_priority(&mut self) -> Option<WorkItem> {
        for item in PRIORITY {
            if self.test(item) {
                self.clear(item);
                return Some(item);
            }
        }
        None
    }
}

/// A single `ATxx\r` (or init-script) line to hand to the transmit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// One line of the fixed init script, already CR-terminated.
    InitLine(&'static str),
    /// `ATCSM{0|1}` — enable/disable silent (listen-only) monitoring.
    SilentMonitor { transmit_enabled: bool },
    /// `ATR{0|1}` — enable/disable adapter responses.
    Responses { transmit_enabled: bool },
    /// `ATPC` — enter CAN config write mode; always followed by
    /// [`Command::ConfigWord`].
    ConfigPrepare,
    /// `ATPB{XXXX}` — the config word itself.
    ConfigWord(ConfigWord),
    /// `ATCP{hh}` — high byte of a 29-bit outgoing ID.
    Extended29High(u8),
    /// `ATSH{llllll}` — low 24 bits of a 29-bit outgoing ID.
    Extended29Low(u32),
    /// `ATSH{hhh}` — an 11-bit outgoing ID.
    Standard11(u16),
    /// `ATRTR` — transmit the staged frame as a remote request.
    Rtr,
    /// The hex-encoded payload of the staged data frame.
    Data(Vec<u8>),
    /// `ATMA` — enter monitor mode (no pending work, spec §4.4 item 1).
    EnterMonitorMode,
}

impl Command {
    /// Renders the command to its wire bytes, CR-terminated, matching the
    /// exact formats in spec §4.4's table.
    pub fn to_bytes(&self) -> Vec<u8> {
        use std::fmt::Write as _;

        match self {
            Command::InitLine(line) => line.as_bytes().to_vec(),
            Command::SilentMonitor { transmit_enabled } => {
                format!("ATCSM{}\r", *transmit_enabled as u8).into_bytes()
            }
            Command::Responses { transmit_enabled } => {
                format!("ATR{}\r", *transmit_enabled as u8).into_bytes()
            }
            Command::ConfigPrepare => b"ATPC\r".to_vec(),
            Command::ConfigWord(word) => format!("ATPB{:04X}\r", word.bits()).into_bytes(),
            Command::Extended29High(hi) => format!("ATCP{:02X}\r", hi).into_bytes(),
            Command::Extended29Low(low) => format!("ATSH{:06X}\r", low).into_bytes(),
            Command::Standard11(id) => format!("ATSH{:03X}\r", id).into_bytes(),
            Command::Rtr => b"ATRTR\r".to_vec(),
            Command::Data(bytes) => {
                let mut s = String::with_capacity(bytes.len() * 2 + 1);
                for b in bytes {
                    write!(s, "{:02X}", b).expect("writing to a String cannot fail");
                }
                s.push('\r');
                s.into_bytes()
            }
            Command::EnterMonitorMode => b"ATMA\r".to_vec(),
        }
    }

    /// Whether sending this command puts the adapter back into a mode where
    /// it will echo the next line back to us (spec §4.4: "When CAN_DATA is
    /// sent, set the drop-next-line flag").
    pub fn echoes_next_line(&self) -> bool {
        matches!(self, Command::Rtr | Command::Data(_))
    }
}
