//! The serial transport interface the engine drives (spec §6's "Serial
//! transport interface").
//!
//! Grounded on the teacher's generic `P: SerialPort` bound in
//! `sync::CanSocket` and on `can327.c`'s `tty_operations.write` callback:
//! both boil down to "give me a byte slice, tell me how much of it you
//! actually took." This trait is that one operation, kept generic so
//! [`crate::channel::Channel`] can be driven by a real serial port or, in
//! tests, by an in-memory fake with no hardware involved.

use std::io;

/// A non-blocking, possibly-partial byte sink.
///
/// `try_write` must never block. Returning `Ok(n)` with `n < buf.len()`
/// means the transport's own buffer is full for now; the engine remembers
/// the unwritten tail and retries it from [`crate::channel::Channel::transport_writable`].
/// Returning `Err` with [`io::ErrorKind::WouldBlock`] means nothing was
/// written at all, which the engine treats the same way. Any other `Err`
/// is a fatal transport fault and trips the failure latch (spec §4.6/§7).
pub trait Transport {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;

    /// An in-memory transport for exercising [`crate::channel::Channel`]
    /// without a real serial port: every byte written is recorded in order,
    /// and the amount accepted per call can be scripted to simulate partial
    /// writes or transport failures.
    #[derive(Default)]
    pub struct FakeTransport {
        pub written: Vec<u8>,
        /// If set, the next `try_write` accepts at most this many bytes.
        pub write_limit: Option<usize>,
        /// If set, the next `try_write` fails with this error instead of
        /// writing anything.
        pub fail_next: VecDeque<io::ErrorKind>,
    }

    impl Transport for FakeTransport {
        fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Some(kind) = self.fail_next.pop_front() {
                return Err(kind.into());
            }

            let n = self.write_limit.take().unwrap_or(buf.len()).min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }
    }
}
