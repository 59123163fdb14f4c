use crate::GpioResult;
use crate::delay::Delay;
use crate::lcd::hd44780::driver::Hd44780Bus;
use log::{debug, warn};

/// Character font of the controller.
///
/// The 5x10 font only exists on single-line displays; requesting it on a
/// multi-line display falls back to 5x8.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Font {
    #[default]
    Dots5x8,
    Dots5x10,
}

/// Stateful driver for one HD44780 controller over any [Hd44780Bus].
///
/// Holds the negotiated function, display-control and entry-mode registers
/// plus the DDRAM row-address table. Construct it with the display geometry,
/// call [init](Self::init) once, then use the text operations. One instance
/// per physical display; the instance borrows its bus and delay source for
/// its whole lifetime, and nothing else may touch those lines meanwhile.
#[derive(Debug)]
pub struct Hd44780Display<'a> {
    bus: &'a mut dyn Hd44780Bus,
    delay: &'a dyn Delay,
    columns: u8,
    lines: u8,
    font: Font,
    /// FUNCTIONSET payload: bus width, line count, font.
    function: u8,
    /// DISPLAYCONTROL payload: display, cursor and blink bits.
    control: u8,
    /// ENTRYMODESET payload: text direction and autoscroll bits.
    entry_mode: u8,
    num_lines: u8,
    row_offsets: [u8; 4],
}

impl<'a> Hd44780Display<'a> {
    /// Creates a driver for a `columns` x `lines` display with the default
    /// 5x8 font. The bus decides the transfer width.
    pub fn new(
        bus: &'a mut dyn Hd44780Bus,
        delay: &'a dyn Delay,
        columns: u8,
        lines: u8,
    ) -> Self {
        Self::with_font(bus, delay, columns, lines, Font::Dots5x8)
    }

    /// Creates a driver with an explicit font selection.
    pub fn with_font(
        bus: &'a mut dyn Hd44780Bus,
        delay: &'a dyn Delay,
        columns: u8,
        lines: u8,
        font: Font,
    ) -> Self {
        let lines = lines.max(1);
        Hd44780Display {
            bus,
            delay,
            columns,
            lines,
            font,
            function: 0,
            control: 0,
            entry_mode: 0,
            num_lines: lines,
            row_offsets: [0; 4],
        }
    }

    /// Brings the controller from its unknown power-on state to a known,
    /// configured one: display on, cursor and blink off, cleared, cursor
    /// home, left-to-right entry.
    ///
    /// Runs the mode-negotiation handshake from the HD44780 datasheet
    /// (figure 23 for 8-bit buses, figure 24 for 4-bit). Call exactly once,
    /// before any other operation.
    pub fn init(&mut self) -> GpioResult<()> {
        // Function set: bus width, on top of single-line 5x8 defaults.
        self.function = if self.bus.is_eight_bit() {
            0b00010000
        } else {
            0b00000000
        };
        if self.lines > 1 {
            self.function |= 0b00001000;
        }
        self.num_lines = self.lines;

        // Fixed DDRAM layout: rows 2 and 3 continue rows 0 and 1 inside the
        // controller's two 40-byte banks.
        self.row_offsets = [0x00, 0x40, self.columns, 0x40 + self.columns];

        if self.font == Font::Dots5x10 && self.lines == 1 {
            self.function |= 0b00000100;
        }

        debug!(
            "Initializing HD44780: {}x{}, 8-bit bus: {}",
            self.columns,
            self.lines,
            self.bus.is_eight_bit()
        );

        // The datasheet wants at least 40ms after Vcc rises above 2.7V. The
        // supply usually comes up long before this code runs, but assume the
        // worst case.
        self.delay.delay_us(50_000);

        self.bus.set_idle()?;

        if !self.bus.is_eight_bit() {
            // Datasheet figure 24: the controller may be in either width
            // right now. Three raw `0011` nibbles force it back to 8-bit
            // whatever its state, then `0010` commits 4-bit framing.
            self.bus.write_raw(0x03)?;
            self.delay.delay_us(4500); // wait min 4.1ms
            self.bus.write_raw(0x03)?;
            self.delay.delay_us(4500);
            self.bus.write_raw(0x03)?;
            self.delay.delay_us(150);
            self.bus.write_raw(0x02)?;
        } else {
            // Datasheet figure 23: 8-bit framing is the power-on default,
            // so the repeats can go through the normal command path.
            self.bus.write_command(0b00100000 | self.function)?;
            self.delay.delay_us(4500); // wait min 4.1ms
            self.bus.write_command(0b00100000 | self.function)?;
            self.delay.delay_us(150);
            self.bus.write_command(0b00100000 | self.function)?;
        }

        // The authoritative function set: width, line count, font.
        self.bus.write_command(0b00100000 | self.function)?;

        // Display on, no cursor, no blinking.
        self.control = 0b00000100;
        self.bus.write_command(0b00001000 | self.control)?;

        self.clear()?;

        // Left-to-right text, no autoscroll.
        self.entry_mode = 0b00000010;
        self.bus.write_command(0b00000100 | self.entry_mode)?;

        debug!("HD44780 initialized.");

        Ok(())
    }

    /// Clears the display and homes the cursor.
    ///
    /// Command: `00000001`. Takes far longer to execute than ordinary
    /// commands, hence the extra wait.
    pub fn clear(&mut self) -> GpioResult<()> {
        self.bus.write_command(0b00000001)?;
        self.delay.delay_us(2000);
        Ok(())
    }

    /// Homes the cursor and undoes any display scroll.
    ///
    /// Command: `0000001?`. Takes far longer to execute than ordinary
    /// commands, hence the extra wait.
    pub fn home(&mut self) -> GpioResult<()> {
        self.bus.write_command(0b00000010)?;
        self.delay.delay_us(2000);
        Ok(())
    }

    /// Moves the cursor to `col` on `row`.
    ///
    /// Command: `1AAAAAAA` with `A` the DDRAM address. A row past the end of
    /// the display degrades to the last valid row instead of failing.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> GpioResult<()> {
        let mut row = row as usize;
        if row >= self.row_offsets.len() {
            row = self.row_offsets.len() - 1;
        }
        if row >= self.num_lines as usize {
            row = self.num_lines as usize - 1;
        }

        self.bus
            .write_command(0b10000000 | (col + self.row_offsets[row]))
    }

    /// Turns the display on.
    ///
    /// Command: `00001DCB` with `D` set.
    pub fn display(&mut self) -> GpioResult<()> {
        self.control |= 0b00000100;
        self.update_display_control()
    }

    /// Turns the display off. DDRAM contents survive.
    pub fn no_display(&mut self) -> GpioResult<()> {
        self.control &= !0b00000100;
        self.update_display_control()
    }

    /// Shows the underline cursor.
    ///
    /// Command: `00001DCB` with `C` set.
    pub fn cursor(&mut self) -> GpioResult<()> {
        self.control |= 0b00000010;
        self.update_display_control()
    }

    /// Hides the underline cursor.
    pub fn no_cursor(&mut self) -> GpioResult<()> {
        self.control &= !0b00000010;
        self.update_display_control()
    }

    /// Blinks the character cell at the cursor.
    ///
    /// Command: `00001DCB` with `B` set.
    pub fn blink(&mut self) -> GpioResult<()> {
        self.control |= 0b00000001;
        self.update_display_control()
    }

    /// Stops blinking the cursor cell.
    pub fn no_blink(&mut self) -> GpioResult<()> {
        self.control &= !0b00000001;
        self.update_display_control()
    }

    fn update_display_control(&mut self) -> GpioResult<()> {
        self.bus.write_command(0b00001000 | self.control)
    }

    /// Shifts the whole display one cell to the left without touching DDRAM.
    ///
    /// Command: `0001DR??` with `D` (display, not cursor) set.
    pub fn scroll_display_left(&mut self) -> GpioResult<()> {
        self.bus.write_command(0b00010000 | 0b00001000)
    }

    /// Shifts the whole display one cell to the right.
    pub fn scroll_display_right(&mut self) -> GpioResult<()> {
        self.bus.write_command(0b00010000 | 0b00001000 | 0b00000100)
    }

    /// Makes text flow left to right.
    ///
    /// Command: `000001IS` with `I` set.
    pub fn left_to_right(&mut self) -> GpioResult<()> {
        self.entry_mode |= 0b00000010;
        self.update_entry_mode()
    }

    /// Makes text flow right to left.
    pub fn right_to_left(&mut self) -> GpioResult<()> {
        self.entry_mode &= !0b00000010;
        self.update_entry_mode()
    }

    /// Shifts the display instead of the cursor on each write, right-justifying
    /// text from the cursor position.
    ///
    /// Command: `000001IS` with `S` set.
    pub fn autoscroll(&mut self) -> GpioResult<()> {
        self.entry_mode |= 0b00000001;
        self.update_entry_mode()
    }

    /// Moves the cursor on each write, the power-on behavior.
    pub fn no_autoscroll(&mut self) -> GpioResult<()> {
        self.entry_mode &= !0b00000001;
        self.update_entry_mode()
    }

    fn update_entry_mode(&mut self) -> GpioResult<()> {
        self.bus.write_command(0b00000100 | self.entry_mode)
    }

    /// Uploads a 5x8 glyph into one of the controller's 8 CGRAM slots.
    ///
    /// Command: `01AAAAAA`, followed by one data byte per glyph row. The slot
    /// index is masked to 0-7. The glyph shows up by writing its slot index
    /// as a data byte, e.g. through [write_byte](Self::write_byte); move the
    /// cursor afterwards to get back to DDRAM addressing.
    pub fn create_char(&mut self, slot: u8, glyph: [u8; 8]) -> GpioResult<()> {
        let slot = slot & 0x07;
        self.bus.write_command(0b01000000 | (slot << 3))?;
        for row in glyph {
            self.bus.write_data(row)?;
        }
        Ok(())
    }

    /// Writes one raw byte to the data register at the cursor position.
    pub fn write_byte(&mut self, value: u8) -> GpioResult<()> {
        self.bus.write_data(value)
    }

    /// Prints a string at the cursor position, one data write per character.
    ///
    /// The controller's character ROM is ASCII-compatible; anything outside
    /// ASCII is replaced with `?`.
    pub fn print(&mut self, s: &str) -> GpioResult<()> {
        for c in s.chars() {
            if c.is_ascii() {
                self.bus.write_data(c as u8)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                self.bus.write_data(b'?')?;
            }
        }
        Ok(())
    }
}
