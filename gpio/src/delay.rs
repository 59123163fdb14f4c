//! Blocking microsecond delays.
//!
//! The HD44780 has no handshake on most commands; correct operation depends
//! entirely on waiting out the execution times from the datasheet. The delay
//! source is injected so drivers can be exercised without wall-clock time.

use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

/// A blocking microsecond delay source.
pub trait Delay: Debug {
    /// Blocks the calling thread for at least `us` microseconds.
    ///
    /// Overshooting is fine; the controller's timing constraints are minimums.
    fn delay_us(&self, us: u32);
}

/// [Delay] backed by [std::thread::sleep].
#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay_us(&self, us: u32) {
        sleep(Duration::from_micros(us as u64));
    }
}
