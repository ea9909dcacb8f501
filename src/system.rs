//! Top-level wiring: a `System` owns the CPU and the bus, and is the
//! type host applications drive one instruction or one frame at a time.

use crate::{
    bus::Bus,
    cartridge::Cartridge,
    color::FRAME_BUFFER_SIZE,
    cpu::Cpu,
    error::Error,
    serial::SerialDevice,
};

pub struct System {
    cpu: Cpu,
    bus: Bus,
}

impl System {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::new(),
        }
    }

    /// Loads a cartridge image, validating its header, and leaves the
    /// CPU in its post-boot-ROM state (no boot ROM is installed).
    pub fn load_rom(&mut self, data: Vec<u8>) -> Result<(), Error> {
        let cartridge = Cartridge::from_data(data)?;
        self.bus.set_cartridge(cartridge);
        self.cpu.boot();
        Ok(())
    }

    /// Installs a boot ROM image to run before the cartridge's own entry
    /// point; the CPU starts at `$0000` instead of the post-boot state.
    pub fn set_boot_rom(&mut self, data: Vec<u8>) {
        self.bus.set_boot_rom(data);
        self.cpu.reset();
    }

    pub fn set_serial_device(&mut self, device: Box<dyn SerialDevice>) {
        self.bus.set_serial_device(device);
    }

    /// Resets both the bus and the CPU. With a boot ROM installed the CPU
    /// re-enters at `$0000` in its all-zero reset state, as
    /// `set_boot_rom` does; otherwise there is no boot ROM to run it
    /// through, so it's brought straight back to the post-boot state
    /// `load_rom` leaves it in, entry point `$0100` included.
    pub fn reset(&mut self) {
        self.bus.reset();
        if self.bus.has_boot_rom() {
            self.cpu.reset();
        } else {
            self.cpu.boot();
        }
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.bus.cartridge()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn frame_buffer(&self) -> &[u8] {
        debug_assert_eq!(self.bus.ppu().frame_buffer().len(), FRAME_BUFFER_SIZE);
        self.bus.ppu().frame_buffer()
    }

    /// Runs exactly one CPU step (one instruction, one interrupt
    /// dispatch, or one halted no-op), returning the T-cycles spent.
    pub fn step(&mut self) -> u8 {
        self.cpu.step(&mut self.bus)
    }

    /// Steps until the PPU completes a frame (its frame counter
    /// advances), returning the total T-cycles spent producing it.
    pub fn run_frame(&mut self) -> u64 {
        let start_frame = self.bus.ppu().frame_index();
        let mut cycles = 0u64;
        while self.bus.ppu().frame_index() == start_frame {
            cycles += self.step() as u64;
        }
        cycles
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}
