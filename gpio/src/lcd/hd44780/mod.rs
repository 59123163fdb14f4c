//! HD44780 character LCD module.
//!
//! Split in two layers: [driver] carries the register-level transfer protocol
//! (how bytes get onto the data lines and strobed into the controller), and
//! [Hd44780Display] carries the controller state, the power-on initialization
//! sequence, and the text operations built on top of it.

pub mod driver;

mod display;

pub use display::*;
