//! A CAN bus bridge driven through an ELM327-family ASCII adapter.
//!
//! Rather than an OBD-II scan tool speaking ELM327's PID query language,
//! this crate drives the adapter as a raw two-way CAN gateway: every byte it
//! echoes is fed into a protocol engine ([`Channel`]) that walks the
//! adapter's fixed initialization script, programs its `AT` config commands,
//! and decodes whatever frame or bus-error lines come back. A [`Host`] wraps
//! the engine with the host-facing surface (statistics, listen-only mode,
//! MTU) a CAN network device exposes.
//!
//! By default this crate is async and uses the
//! [`tokio-serial`](https://github.com/berkowski/tokio-serial) crate, but it
//! can also be used in a sync context (see [Feature Flags](#feature-flags)).
//!
//! ## Usage
//!
//! ```no_run
//! use elm327_can::tokio::CanSocket;
//! use elm327_can::ControlMode;
//! use tokio_serial::SerialPortBuilderExt;
//!
//! # async fn run() -> std::io::Result<()> {
//! let port = tokio_serial::new("/dev/ttyUSB0", 115_200).open_native_async()?;
//!
//! let mut can = CanSocket::new(port);
//! can.open(500_000, ControlMode::Normal)?;
//!
//! loop {
//!     let event = can.recv().await?;
//!     println!("{:?}", event);
//! }
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! The `tokio` feature is enabled by default.
//!
//! - `tokio` - Implements the async API with the [`tokio-serial`](https://github.com/berkowski/tokio-serial) crate.
//! - `sync` - Implements the synchronous API with the [`serialport`](https://github.com/serialport/serialport-rs) crate.

pub use embedded_can::{ExtendedId, Id, StandardId};

mod channel;
mod config;
mod frame;
mod host;
mod parser;
mod shared;
mod transport;
mod work;

pub use channel::{Channel, ChannelError, InboundEvent, State};
pub use config::{Bitrate, BitrateOutOfRange, ConfigWord, ControlMode};
pub use frame::{CanErrorFrame, CanFrame};
pub use host::{Host, OpenError, Stats, SubmitError, MTU};
pub use shared::{ChannelClosed, SharedChannel};
pub use transport::Transport;

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;
