//! The CAN frame ABI consumed and produced by the protocol engine (spec §6).
//!
//! A frame is either a normal data/remote frame with an 11- or 29-bit
//! identifier, or an error frame: an out-of-band notification encoded as a
//! frame whose identifier carries the error flag plus an error-class
//! subflag, and whose payload carries further detail bytes. This mirrors how
//! Linux SocketCAN itself represents bus errors (see `linux/can/error.h`,
//! also the shape `socketcan`'s own `CanError` follows) as ordinary
//! `can_frame`s rather than a separate wire type.

pub use embedded_can::{ExtendedId, Id, StandardId};

/// Every CAN 2.0B frame carries at most 8 payload bytes.
pub const MAX_DLC: u8 = 8;

/// A decoded or to-be-encoded CAN data/remote frame (11- or 29-bit ID).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    dlc: u8,
    data: [u8; MAX_DLC as usize],
    rtr: bool,
}

impl CanFrame {
    /// Creates a new data frame. `data` must have a length in the range
    /// `0..=8` or else `None` is returned instead.
    pub fn new_data(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_DLC as usize {
            return None;
        }

        let mut buf = [0u8; MAX_DLC as usize];
        buf[..data.len()].copy_from_slice(data);

        Some(Self {
            id: id.into(),
            dlc: data.len() as u8,
            data: buf,
            rtr: false,
        })
    }

    /// Creates a new remote (RTR) frame carrying no payload but an
    /// advertised DLC. `dlc` must be in the range `0..=8`.
    pub fn new_remote(id: impl Into<Id>, dlc: u8) -> Option<Self> {
        if dlc > MAX_DLC {
            return None;
        }

        Some(Self {
            id: id.into(),
            dlc,
            data: [0u8; MAX_DLC as usize],
            rtr: true,
        })
    }

    /// Gets the message ID of the frame.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Gets the DLC (Data Length Code) of the frame.
    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// Gets the payload. Empty for RTR frames, regardless of `dlc()`.
    pub fn data(&self) -> &[u8] {
        if self.rtr {
            &[]
        } else {
            &self.data[..self.dlc as usize]
        }
    }

    pub fn is_remote(&self) -> bool {
        self.rtr
    }

    pub fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    /// The identifier as a plain 32-bit number, ignoring standard/extended
    /// framing — used to compare an incoming frame's ID against the staged
    /// outgoing ID regardless of which form either one takes.
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        }
    }
}

/// Bit within a 32-bit CAN identifier that marks a frame as an error frame.
pub const CAN_ERR_FLAG: u32 = 1 << 29;
/// Bit within a 32-bit CAN identifier that marks a frame as RTR.
pub const CAN_RTR_FLAG: u32 = 1 << 30;
/// Bit within a 32-bit CAN identifier that marks a frame as extended (29-bit).
pub const CAN_EFF_FLAG: u32 = 1 << 31;

const CAN_ERR_CRTL: u32 = 0x0004;
const CAN_ERR_PROT: u32 = 0x0008;
const CAN_ERR_BUSOFF_CLASS: u32 = 0x0040;
const CAN_ERR_BUSERROR: u32 = 0x0080;

const CAN_ERR_CRTL_RX_OVERFLOW: u8 = 0x01;
const CAN_ERR_PROT_OVERLOAD: u8 = 0x20;
const CAN_ERR_PROT_TX: u8 = 0x80;

/// The error conditions the engine can report upward, per spec §6/§7.
///
/// These correspond to Linux SocketCAN's `CAN_ERR_*` id bits and
/// `data[1..3]` subcodes (see `linux/can/error.h`); the bit assignments
/// below are this crate's own encoding of the same categories, chosen to be
/// internally consistent and distinguishable upward rather than to match a
/// particular kernel header byte-for-byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanErrorFrame {
    /// Fatal: the channel has latched off after an unrecoverable fault.
    BusOff,
    /// The adapter's (or our) receive path overflowed.
    RxOverflow,
    /// `BUS ERROR` reported by the adapter.
    BusError,
    /// `CAN ERROR` / `<RX ERROR` reported by the adapter.
    Protocol,
    /// `BUS BUSY` reported by the adapter: protocol overload.
    ProtocolOverload,
    /// `FB ERROR` reported by the adapter: protocol TX error.
    ProtocolTx,
    /// A controller error (`ERRxx`), carrying the two reported digit bytes.
    Controller(u8, u8),
    /// A line parsed as neither a frame nor a recognized error string.
    Generic,
}

impl CanErrorFrame {
    /// Encodes this error as a 32-bit `can_id` (error flag plus error class)
    /// and an 8-byte data payload, following the bullet list in spec §6.
    pub fn encode(self) -> (u32, [u8; MAX_DLC as usize]) {
        let mut data = [0u8; MAX_DLC as usize];

        let class = match self {
            CanErrorFrame::BusOff => CAN_ERR_BUSOFF_CLASS,
            CanErrorFrame::RxOverflow => {
                data[1] = CAN_ERR_CRTL_RX_OVERFLOW;
                CAN_ERR_CRTL
            }
            CanErrorFrame::BusError => CAN_ERR_BUSERROR,
            CanErrorFrame::Protocol => CAN_ERR_PROT,
            CanErrorFrame::ProtocolOverload => {
                data[2] = CAN_ERR_PROT_OVERLOAD;
                CAN_ERR_PROT
            }
            CanErrorFrame::ProtocolTx => {
                data[2] = CAN_ERR_PROT_TX;
                CAN_ERR_PROT
            }
            CanErrorFrame::Controller(hi, lo) => {
                data[0] = hi;
                data[1] = lo;
                CAN_ERR_CRTL
            }
            CanErrorFrame::Generic => 0,
        };

        (CAN_ERR_FLAG | class, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_frame_rejects_overlong_payload() {
        assert!(CanFrame::new_data(StandardId::new(0x123).unwrap(), &[0u8; 9]).is_none());
    }

    #[test]
    fn remote_frame_has_no_data_bytes() {
        let frame = CanFrame::new_remote(StandardId::new(0x123).unwrap(), 4).unwrap();
        assert_eq!(frame.dlc(), 4);
        assert!(frame.data().is_empty());
        assert!(frame.is_remote());
    }

    #[test]
    fn extended_id_is_reported() {
        let frame = CanFrame::new_data(ExtendedId::new(0x18DB33F1).unwrap(), &[0x02]).unwrap();
        assert!(frame.is_extended());
    }

    #[test]
    fn bus_off_sets_only_the_error_and_class_flag() {
        let (id, data) = CanErrorFrame::BusOff.encode();
        assert_eq!(id, CAN_ERR_FLAG | CAN_ERR_BUSOFF_CLASS);
        assert_eq!(data, [0u8; 8]);
    }

    #[test]
    fn rx_overflow_sets_the_subcode_byte() {
        let (id, data) = CanErrorFrame::RxOverflow.encode();
        assert_eq!(id, CAN_ERR_FLAG | CAN_ERR_CRTL);
        assert_eq!(data[1], CAN_ERR_CRTL_RX_OVERFLOW);
    }

    #[test]
    fn controller_error_carries_both_digits() {
        let (id, data) = CanErrorFrame::Controller(b'4', b'2').encode();
        assert_eq!(id, CAN_ERR_FLAG | CAN_ERR_CRTL);
        assert_eq!((data[0], data[1]), (b'4', b'2'));
    }
}
