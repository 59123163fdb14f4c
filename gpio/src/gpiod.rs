//! GPIO backend using the kernel character device through the gpiod library.

use crate::{GpioBusOutput, GpioError, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU8;

/// Hands out exclusive output handles for the lines of one GPIO chip.
///
/// A line stays claimed until the handle that owns it is dropped; requesting
/// a claimed line fails with [GpioError::AlreadyInUse].
pub struct GpiodDriver {
    chip: gpiod::Chip,
    used_lines: BitVec<AtomicU8>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        let n = chip.num_lines() as usize;
        Self {
            chip,
            used_lines: BitVec::repeat(false, n),
        }
    }

    pub fn open(path: &str) -> GpioResult<Self> {
        Ok(Self::new(gpiod::Chip::new(path)?))
    }

    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        if indices.iter().any(|&index| index >= self.used_lines.len()) {
            return Err(GpioError::InvalidArgument);
        }

        if indices.iter().any(|&index| self.used_lines[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in indices {
            self.used_lines.set_aliased(index, true);
        }
        Ok(())
    }

    fn release(&self, indices: &[usize]) {
        for &index in indices {
            self.used_lines.set_aliased(index, false);
        }
    }

    /// Claims a single line for output.
    pub fn request_output(&self, index: usize) -> GpioResult<GpiodOutput<'_>> {
        self.claim(&[index])?;

        let line = self
            .chip
            .request_lines(
                gpiod::Options::output([index as u32]).consumer(env!("CARGO_PKG_NAME")),
            )
            .map_err(|err| {
                self.release(&[index]);
                GpioError::from(err)
            })?;

        Ok(GpiodOutput {
            driver: self,
            index,
            line,
        })
    }

    /// Claims N lines as one output bus, in the order given.
    pub fn request_output_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<GpiodBusOutput<'_, N>> {
        self.claim(&indices)?;

        let line = self
            .chip
            .request_lines(
                gpiod::Options::output(
                    indices
                        .iter()
                        .map(|&index| index as u32)
                        .collect::<Vec<_>>(),
                )
                .consumer(env!("CARGO_PKG_NAME")),
            )
            .map_err(|err| {
                self.release(&indices);
                GpioError::from(err)
            })?;

        Ok(GpiodBusOutput {
            driver: self,
            indices,
            line,
        })
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

pub struct GpiodOutput<'a> {
    driver: &'a GpiodDriver,
    index: usize,
    line: gpiod::Lines<gpiod::Output>,
}

impl Debug for GpiodOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.index)
    }
}

impl GpioOutput for GpiodOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.line.set_values([value])?;
        Ok(())
    }
}

impl Drop for GpiodOutput<'_> {
    fn drop(&mut self) {
        self.driver.release(&[self.index]);
    }
}

pub struct GpiodBusOutput<'a, const N: usize> {
    driver: &'a GpiodDriver,
    indices: [usize; N],
    line: gpiod::Lines<gpiod::Output>,
}

impl<const N: usize> Debug for GpiodBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.indices)
    }
}

impl<const N: usize> GpioBusOutput<N> for GpiodBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        self.line.set_values(*values)?;
        Ok(())
    }
}

impl<const N: usize> Drop for GpiodBusOutput<'_, N> {
    fn drop(&mut self) {
        self.driver.release(&self.indices);
    }
}
