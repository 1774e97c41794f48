//! Adapter configuration: bitrate, control mode, the `ATPB` config word, and
//! the fixed initialization script (spec §6).

use thiserror::Error;

/// A CAN bitrate the ELM327 can be driven at.
///
/// The adapter only accepts the 64-entry discrete set spec §6 describes:
/// `500000 / n` for `n` in `1..=64`, using truncating integer division, not
/// bitrates that evenly divide 500 kbit/s. Kept as a newtype around the
/// divisor rather than a lookup table of absolute bitrates so it round-trips
/// exactly into the `ATPBxxxx` config word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitrate {
    divisor: u8,
}

/// The adapter only ever divides its 500 kHz base clock.
const BASE_BITRATE: u32 = 500_000;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("bitrate {0} is not one of the adapter's 64 supported bitrates")]
pub struct BitrateOutOfRange(pub u32);

impl Bitrate {
    /// The adapter's power-on default: full 500 kbit/s (divisor 1).
    pub const DEFAULT: Bitrate = Bitrate { divisor: 1 };

    /// Accepts only bitrates equal to `500000 / n` (truncating integer
    /// division, matching `can327_bitrate_const`) for some `n` in `1..=64`.
    /// Most of these 64 values are not exact divisors of 500000 — e.g.
    /// `n = 3` gives 166666, `n = 7` gives 71428 — so membership is checked
    /// against the precomputed table rather than by dividing back out.
    pub fn from_bps(bitrate: u32) -> Result<Self, BitrateOutOfRange> {
        (1u8..=64)
            .find(|&n| BASE_BITRATE / n as u32 == bitrate)
            .map(|divisor| Bitrate { divisor })
            .ok_or(BitrateOutOfRange(bitrate))
    }

    /// Builds directly from a divisor in `1..=64`.
    pub fn from_divisor(divisor: u8) -> Option<Self> {
        (1..=64).contains(&divisor).then_some(Bitrate { divisor })
    }

    pub fn bps(&self) -> u32 {
        BASE_BITRATE / self.divisor as u32
    }

    pub fn divisor(&self) -> u8 {
        self.divisor
    }
}

impl Default for Bitrate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Whether the channel may transmit, or only observe the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    Normal,
    /// "Listen only": `ATCSM1` / `ATR0` are issued instead.
    ListenOnly,
}

impl ControlMode {
    pub fn is_listen_only(&self) -> bool {
        matches!(self, ControlMode::ListenOnly)
    }
}

/// The 16-bit payload of `ATPBxxxx` (spec §6): three named flag bits plus a
/// low 12-bit numeric field (the bitrate divisor). Kept as a plain newtype
/// rather than pulling in the `bitflags` crate for one small fixed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigWord(pub u16);

impl ConfigWord {
    pub const SEND_SFF: ConfigWord = ConfigWord(0x8000);
    pub const VARIABLE_DLC: ConfigWord = ConfigWord(0x4000);
    pub const RECV_BOTH_SFF_EFF: ConfigWord = ConfigWord(0x2000);
    #[allow(dead_code)] // not used: spec.md §1 excludes the 7/8 bitrate multiplier
    pub const BAUDRATE_MULT_8_7: ConfigWord = ConfigWord(0x1000);

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn contains(&self, other: ConfigWord) -> bool {
        (self.0 & other.0) == other.0
    }

    /// The config word for an outgoing frame of the given extended-ness and
    /// bitrate divisor: `SEND_SFF` is cleared for extended IDs, and
    /// `VARIABLE_DLC`/`RECV_BOTH_SFF_EFF` are always set, matching
    /// `elm327_send_frame`'s `can_config` assembly in the original driver.
    pub fn for_outgoing(is_extended: bool, bitrate: Bitrate) -> ConfigWord {
        let mut word = ConfigWord::VARIABLE_DLC | ConfigWord::RECV_BOTH_SFF_EFF;
        if !is_extended {
            word |= ConfigWord::SEND_SFF;
        }
        ConfigWord(word.0 | bitrate.divisor() as u16)
    }
}

impl std::ops::BitOr for ConfigWord {
    type Output = ConfigWord;
    fn bitor(self, rhs: ConfigWord) -> ConfigWord {
        ConfigWord(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ConfigWord {
    fn bitor_assign(&mut self, rhs: ConfigWord) {
        self.0 |= rhs.0;
    }
}

/// The fixed initialization script, issued one line per prompt (spec §6).
/// Bit-exact with the original driver's `elm327_init_script`.
pub const INIT_SCRIPT: &[&str] = &[
    "AT WS\r",
    "AT PP FF OFF\r",
    "AT M0\r",
    "AT AL\r",
    "AT BI\r",
    "AT CAF0\r",
    "AT CFC0\r",
    "AT CF 000\r",
    "AT CM 000\r",
    "AT E1\r",
    "AT H1\r",
    "AT L0\r",
    "AT SH 7DF\r",
    "AT ST FF\r",
    "AT AT0\r",
    "AT D1\r",
    "AT S1\r",
    "AT TP B\r",
];

/// The ELM327 hardware default outgoing ID, in effect immediately after
/// `elm327_init` / before any `ATSH` has been issued.
pub const DEFAULT_STAGED_ID: u32 = 0x7DF;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_entry_in_the_64_value_table() {
        for n in 1u32..=64 {
            let bps = 500_000 / n;
            assert_eq!(Bitrate::from_bps(bps).unwrap().divisor(), n as u8);
        }
    }

    #[test]
    fn truncated_entries_are_accepted_even_though_not_exact_divisors() {
        // n = 3 -> 166666, n = 7 -> 71428: neither evenly divides 500000.
        assert_eq!(Bitrate::from_bps(166_666).unwrap().divisor(), 3);
        assert_eq!(Bitrate::from_bps(71_428).unwrap().divisor(), 7);
    }

    #[test]
    fn rejects_bitrates_outside_the_table() {
        assert!(Bitrate::from_bps(123_456).is_err());
        assert!(Bitrate::from_bps(0).is_err());
    }

    #[test]
    fn config_word_clears_send_sff_for_extended_ids() {
        let word = ConfigWord::for_outgoing(true, Bitrate::from_divisor(1).unwrap());
        assert!(!word.contains(ConfigWord::SEND_SFF));
        assert!(word.contains(ConfigWord::VARIABLE_DLC));
        assert!(word.contains(ConfigWord::RECV_BOTH_SFF_EFF));
    }

    #[test]
    fn config_word_sets_send_sff_for_standard_ids() {
        let word = ConfigWord::for_outgoing(false, Bitrate::from_divisor(1).unwrap());
        assert!(word.contains(ConfigWord::SEND_SFF));
    }

    #[test]
    fn init_script_is_bit_exact() {
        assert_eq!(INIT_SCRIPT.len(), 18);
        assert_eq!(INIT_SCRIPT[0], "AT WS\r");
        assert_eq!(INIT_SCRIPT[INIT_SCRIPT.len() - 1], "AT TP B\r");
    }
}
