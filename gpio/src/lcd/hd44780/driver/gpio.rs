use crate::delay::Delay;
use crate::lcd::hd44780::driver::Hd44780Bus;
use crate::{GpioBusOutput, GpioOutput, GpioResult};
use log::trace;

/// The data lines of the bus: either all 8, or the upper 4 for nibble mode.
#[derive(Debug, Copy, Clone)]
pub enum LcdDataBus<'a> {
    Bus8Bit(&'a dyn GpioBusOutput<8>),
    Bus4Bit(&'a dyn GpioBusOutput<4>),
}

/// [Hd44780Bus] over plain GPIO lines.
///
/// Holds one output handle per control line (register select, optional
/// read/write, strobe) plus the data bus, and a delay source for the strobe
/// timing. `pin_rw` is `None` when the display's R/W pin is tied to ground
/// to save a line; the controller is then permanently in write mode, which
/// is all this driver needs.
#[derive(Debug)]
pub struct GpioHd44780Bus<'a> {
    pin_rs: &'a dyn GpioOutput,
    pin_rw: Option<&'a dyn GpioOutput>,
    pin_e: &'a dyn GpioOutput,
    data_bus: LcdDataBus<'a>,
    delay: &'a dyn Delay,
}

impl<'a> GpioHd44780Bus<'a> {
    pub fn new_4bit(
        pin_rs: &'a dyn GpioOutput,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_e: &'a dyn GpioOutput,
        data_bus: &'a dyn GpioBusOutput<4>,
        delay: &'a dyn Delay,
    ) -> Self {
        GpioHd44780Bus {
            pin_rs,
            pin_rw,
            pin_e,
            data_bus: LcdDataBus::Bus4Bit(data_bus),
            delay,
        }
    }

    pub fn new_8bit(
        pin_rs: &'a dyn GpioOutput,
        pin_rw: Option<&'a dyn GpioOutput>,
        pin_e: &'a dyn GpioOutput,
        data_bus: &'a dyn GpioBusOutput<8>,
        delay: &'a dyn Delay,
    ) -> Self {
        GpioHd44780Bus {
            pin_rs,
            pin_rw,
            pin_e,
            data_bus: LcdDataBus::Bus8Bit(data_bus),
            delay,
        }
    }

    /// Commits the held data-line state into the controller's input latch.
    ///
    /// The controller wants >450ns of pulse width and >37us of settle time
    /// after the falling edge; both rounded up generously.
    fn pulse_enable(&self) -> GpioResult<()> {
        self.pin_e.write(false)?;
        self.delay.delay_us(1);
        self.pin_e.write(true)?;
        self.delay.delay_us(1);
        self.pin_e.write(false)?;
        self.delay.delay_us(100);
        Ok(())
    }

    fn send(&mut self, value: u8, rs: bool) -> GpioResult<()> {
        trace!("Sending {:08b}, RS: {}", value, rs);

        self.pin_rs.write(rs)?;

        // Write-only driver: keep R/W (if wired) pinned to write
        if let Some(rw) = self.pin_rw {
            rw.write(false)?;
        }

        match self.data_bus {
            LcdDataBus::Bus8Bit(bus) => {
                bus.write_byte(value)?;
                self.pulse_enable()?;
            }
            LcdDataBus::Bus4Bit(bus) => {
                bus.write_nibble(value >> 4)?;
                self.pulse_enable()?;
                bus.write_nibble(value & 0x0F)?;
                self.pulse_enable()?;
            }
        }

        Ok(())
    }
}

impl Hd44780Bus for GpioHd44780Bus<'_> {
    fn is_eight_bit(&self) -> bool {
        matches!(self.data_bus, LcdDataBus::Bus8Bit(_))
    }

    fn set_idle(&mut self) -> GpioResult<()> {
        self.pin_rs.write(false)?;
        self.pin_e.write(false)?;
        if let Some(rw) = self.pin_rw {
            rw.write(false)?;
        }
        Ok(())
    }

    fn write_raw(&mut self, value: u8) -> GpioResult<()> {
        trace!("Raw transfer: {:04b}", value & 0x0F);

        match self.data_bus {
            LcdDataBus::Bus8Bit(bus) => bus.write_byte(value)?,
            LcdDataBus::Bus4Bit(bus) => bus.write_nibble(value & 0x0F)?,
        }
        self.pulse_enable()
    }

    fn write_command(&mut self, value: u8) -> GpioResult<()> {
        self.send(value, false)
    }

    fn write_data(&mut self, value: u8) -> GpioResult<()> {
        self.send(value, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Pin(&'static str, bool),
        Bus(u8),
        DelayUs(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    #[derive(Debug)]
    struct LogPin {
        name: &'static str,
        log: Log,
    }

    impl GpioOutput for LogPin {
        fn write(&self, value: bool) -> GpioResult<()> {
            self.log.borrow_mut().push(Event::Pin(self.name, value));
            Ok(())
        }
    }

    #[derive(Debug)]
    struct LogBus<const N: usize> {
        log: Log,
    }

    impl<const N: usize> GpioBusOutput<N> for LogBus<N> {
        fn write(&self, values: &[bool; N]) -> GpioResult<()> {
            let mut value = 0u8;
            for (i, &bit) in values.iter().enumerate() {
                if bit {
                    value |= 1 << i;
                }
            }
            self.log.borrow_mut().push(Event::Bus(value));
            Ok(())
        }
    }

    #[derive(Debug)]
    struct LogDelay {
        log: Log,
    }

    impl Delay for LogDelay {
        fn delay_us(&self, us: u32) {
            self.log.borrow_mut().push(Event::DelayUs(us));
        }
    }

    fn pulse() -> Vec<Event> {
        vec![
            Event::Pin("e", false),
            Event::DelayUs(1),
            Event::Pin("e", true),
            Event::DelayUs(1),
            Event::Pin("e", false),
            Event::DelayUs(100),
        ]
    }

    #[test]
    fn four_bit_byte_is_two_nibble_transfers() {
        let log: Log = Default::default();
        let rs = LogPin { name: "rs", log: log.clone() };
        let e = LogPin { name: "e", log: log.clone() };
        let bus = LogBus::<4> { log: log.clone() };
        let delay = LogDelay { log: log.clone() };

        let mut lcd_bus = GpioHd44780Bus::new_4bit(&rs, None, &e, &bus, &delay);
        lcd_bus.write_data(0xA5).unwrap();

        let mut expected = vec![Event::Pin("rs", true), Event::Bus(0x0A)];
        expected.extend(pulse());
        expected.push(Event::Bus(0x05));
        expected.extend(pulse());
        assert_eq!(*log.borrow(), expected);
    }

    #[test]
    fn eight_bit_byte_is_one_transfer() {
        let log: Log = Default::default();
        let rs = LogPin { name: "rs", log: log.clone() };
        let e = LogPin { name: "e", log: log.clone() };
        let bus = LogBus::<8> { log: log.clone() };
        let delay = LogDelay { log: log.clone() };

        let mut lcd_bus = GpioHd44780Bus::new_8bit(&rs, None, &e, &bus, &delay);
        lcd_bus.write_command(0xA5).unwrap();

        let mut expected = vec![Event::Pin("rs", false), Event::Bus(0xA5)];
        expected.extend(pulse());
        assert_eq!(*log.borrow(), expected);
    }

    #[test]
    fn rw_line_is_forced_low_when_wired() {
        let log: Log = Default::default();
        let rs = LogPin { name: "rs", log: log.clone() };
        let rw = LogPin { name: "rw", log: log.clone() };
        let e = LogPin { name: "e", log: log.clone() };
        let bus = LogBus::<8> { log: log.clone() };
        let delay = LogDelay { log: log.clone() };

        let mut lcd_bus = GpioHd44780Bus::new_8bit(&rs, Some(&rw), &e, &bus, &delay);
        lcd_bus.write_command(0x01).unwrap();

        assert_eq!(log.borrow()[1], Event::Pin("rw", false));
    }

    #[test]
    fn raw_transfer_bypasses_register_select() {
        let log: Log = Default::default();
        let rs = LogPin { name: "rs", log: log.clone() };
        let e = LogPin { name: "e", log: log.clone() };
        let bus = LogBus::<4> { log: log.clone() };
        let delay = LogDelay { log: log.clone() };

        let mut lcd_bus = GpioHd44780Bus::new_4bit(&rs, None, &e, &bus, &delay);
        lcd_bus.write_raw(0x03).unwrap();

        let mut expected = vec![Event::Bus(0x03)];
        expected.extend(pulse());
        assert_eq!(*log.borrow(), expected);
        assert!(
            !log.borrow()
                .iter()
                .any(|event| matches!(event, Event::Pin("rs", _)))
        );
    }

    #[test]
    fn idle_state_holds_control_lines_low() {
        let log: Log = Default::default();
        let rs = LogPin { name: "rs", log: log.clone() };
        let rw = LogPin { name: "rw", log: log.clone() };
        let e = LogPin { name: "e", log: log.clone() };
        let bus = LogBus::<4> { log: log.clone() };
        let delay = LogDelay { log: log.clone() };

        let mut lcd_bus = GpioHd44780Bus::new_4bit(&rs, Some(&rw), &e, &bus, &delay);
        lcd_bus.set_idle().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                Event::Pin("rs", false),
                Event::Pin("e", false),
                Event::Pin("rw", false),
            ]
        );
    }
}
