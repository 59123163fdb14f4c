//! Memory-mapped GPIO backend for BCM283x-class SoCs.
//!
//! Maps the GPIO register window and drives lines through the GPSETn/GPCLRn
//! registers directly. `/dev/gpiomem` exposes the window at offset 0 without
//! requiring root; `/dev/mem` needs the physical base address.

use crate::{GpioBusOutput, GpioError, GpioOutput, GpioResult};
use bitvec::vec::BitVec;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_lines: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    const GPIO_BASE: u64 = 0x3F200000;

    const PIN_COUNT: usize = 58;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mmap = MmapOptions::new()
            .offset(offset)
            .len(4096)
            .map_raw(&file)?;

        Ok(RawGpioDriver {
            mmap,
            used_lines: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem", Self::GPIO_BASE)
    }

    fn set_pin_function_output(&self, index: usize) {
        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPFSELn register, 3 bits per pin
        let register_ptr = unsafe { mmap.add(index / 10) };
        let shift = (index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift);
        register_value |= 0b001 << shift;
        unsafe { register_ptr.write_volatile(register_value) };
    }

    fn set_pin_output(&self, index: usize, high: bool) {
        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPSETn/GPCLRn register
        let register_ptr =
            unsafe { mmap.add(if high { 0x1c / 4 } else { 0x28 / 4 } + index / 32) };
        let shift = index % 32;

        unsafe { register_ptr.write_volatile(1 << shift) };
    }

    fn claim(&self, indices: &[usize]) -> GpioResult<()> {
        if indices.iter().any(|&index| index >= Self::PIN_COUNT) {
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

    /// Claims a single line, switches it to output, and hands out its handle.
    pub fn request_output(&self, index: usize) -> GpioResult<RawOutput<'_>> {
        self.claim(&[index])?;
        self.set_pin_function_output(index);
        Ok(RawOutput {
            driver: self,
            index,
        })
    }

    /// Claims N lines as one output bus, in the order given.
    pub fn request_output_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<RawBusOutput<'_, N>> {
        self.claim(&indices)?;
        for &index in &indices {
            self.set_pin_function_output(index);
        }
        Ok(RawBusOutput {
            driver: self,
            indices,
        })
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver")
    }
}

pub struct RawOutput<'a> {
    driver: &'a RawGpioDriver,
    index: usize,
}

impl Debug for RawOutput<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.driver, self.index)
    }
}

impl GpioOutput for RawOutput<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.driver.set_pin_output(self.index, value);
        Ok(())
    }
}

impl Drop for RawOutput<'_> {
    fn drop(&mut self) {
        self.driver.release(&[self.index]);
    }
}

pub struct RawBusOutput<'a, const N: usize> {
    driver: &'a RawGpioDriver,
    indices: [usize; N],
}

impl<const N: usize> Debug for RawBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.indices)
    }
}

impl<const N: usize> GpioBusOutput<N> for RawBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (&index, &value) in self.indices.iter().zip(values) {
            self.driver.set_pin_output(index, value);
        }
        Ok(())
    }
}

impl<const N: usize> Drop for RawBusOutput<'_, N> {
    fn drop(&mut self) {
        self.driver.release(&self.indices);
    }
}
