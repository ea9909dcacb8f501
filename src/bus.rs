//! The system bus: address decoding, device ownership, and the one place
//! the m-cycle clock actually advances.
//!
//! Every read or write ticks the bus by one m-cycle *before* the access is
//! resolved, so that a multi-byte instruction's intermediate memory
//! accesses advance the timer and PPU as real hardware would, rather than
//! only at instruction boundaries.

use crate::{
    cartridge::Cartridge,
    consts::{interrupt_bit, BOOT_DISABLE_ADDR, IE_ADDR, IF_ADDR},
    ppu::Ppu,
    serial::{Serial, SerialDevice, StdoutDevice},
    timer::Timer,
    warnln,
};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7f;
const OAM_SIZE: usize = 0xa0;
const BOOT_ROM_SIZE: usize = 0x100;

pub struct Bus {
    cartridge: Option<Cartridge>,
    boot_rom: Option<Vec<u8>>,
    boot_active: bool,

    wram: Vec<u8>,
    hram: Vec<u8>,
    oam: Vec<u8>,

    timer: Timer,
    ppu: Ppu,
    serial: Serial,

    ie: u8,
    int_flags: u8,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            cartridge: None,
            boot_rom: None,
            boot_active: false,
            wram: vec![0; WRAM_SIZE],
            hram: vec![0; HRAM_SIZE],
            oam: vec![0; OAM_SIZE],
            timer: Timer::new(),
            ppu: Ppu::new(),
            serial: Serial::new(Box::new(StdoutDevice)),
            ie: 0x00,
            int_flags: 0x00,
        }
    }

    pub fn reset(&mut self) {
        self.wram.iter_mut().for_each(|b| *b = 0);
        self.hram.iter_mut().for_each(|b| *b = 0);
        self.oam.iter_mut().for_each(|b| *b = 0);
        self.timer.reset();
        self.ppu.reset();
        self.serial.reset();
        self.ie = 0x00;
        self.int_flags = 0x00;
        self.boot_active = self.boot_rom.is_some();
    }

    pub fn set_cartridge(&mut self, cartridge: Cartridge) {
        self.cartridge = Some(cartridge);
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    pub fn has_boot_rom(&self) -> bool {
        self.boot_rom.is_some()
    }

    pub fn set_boot_rom(&mut self, data: Vec<u8>) {
        self.boot_active = true;
        self.boot_rom = Some(data);
    }

    pub fn set_serial_device(&mut self, device: Box<dyn SerialDevice>) {
        self.serial.set_device(device);
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    /// Advances every clocked device by one m-cycle and folds any newly
    /// raised interrupt source into `IF`. Called once per bus access by
    /// `read`/`write`, and once more per m-cycle the CPU spends not
    /// touching memory (internal delay cycles).
    pub fn step(&mut self) {
        self.timer.step();
        self.ppu.step();

        if self.timer.int_tima() {
            self.int_flags |= interrupt_bit::TIMER;
            self.timer.ack_tima();
        }
        if self.ppu.int_vblank() {
            self.int_flags |= interrupt_bit::VBLANK;
            self.ppu.ack_vblank();
        }
    }

    #[inline(always)]
    pub fn ie(&self) -> u8 {
        self.ie
    }

    #[inline(always)]
    pub fn int_flags(&self) -> u8 {
        self.int_flags
    }

    #[inline(always)]
    pub fn clear_int_flag(&mut self, bit: u8) {
        self.int_flags &= !bit;
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        self.step();
        self.read_raw(addr)
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.step();
        self.write_raw(addr, value);
    }

    fn read_raw(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x00ff if self.boot_active => self.boot_rom.as_ref().unwrap()[addr as usize],
            0x0000..=0x7fff => self
                .cartridge
                .as_ref()
                .map(|c| c.read(addr))
                .unwrap_or(0xff),
            0x8000..=0x9fff => self.ppu.read(addr),
            0xa000..=0xbfff => self
                .cartridge
                .as_ref()
                .map(|c| c.read(addr))
                .unwrap_or(0xff),
            0xc000..=0xdfff => self.wram[(addr - 0xc000) as usize],
            0xe000..=0xfdff => self.wram[(addr - 0xe000) as usize],
            0xfe00..=0xfe9f => self.oam[(addr - 0xfe00) as usize],
            0xfea0..=0xfeff => 0xff,
            0xff00 => 0xff, // joypad: no buttons ever pressed
            0xff01..=0xff02 => self.serial.read(addr),
            0xff04..=0xff07 => self.timer.read(addr),
            IF_ADDR => self.int_flags | 0xe0,
            0xff10..=0xff3f => 0xff, // APU registers, not modeled
            0xff40..=0xff4b => self.ppu.read(addr),
            BOOT_DISABLE_ADDR => 0xff,
            0xff80..=0xfffe => self.hram[(addr - 0xff80) as usize],
            IE_ADDR => self.ie,
            _ => {
                warnln!("Reading from unmapped bus location 0x{:04x}", addr);
                0xff
            }
        }
    }

    fn write_raw(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x00ff if self.boot_active => {}
            0x0000..=0x7fff => {
                if let Some(cartridge) = self.cartridge.as_mut() {
                    cartridge.write(addr, value);
                }
            }
            0x8000..=0x9fff => self.ppu.write(addr, value),
            0xa000..=0xbfff => {
                if let Some(cartridge) = self.cartridge.as_mut() {
                    cartridge.write(addr, value);
                }
            }
            0xc000..=0xdfff => self.wram[(addr - 0xc000) as usize] = value,
            0xe000..=0xfdff => self.wram[(addr - 0xe000) as usize] = value,
            0xfe00..=0xfe9f => self.oam[(addr - 0xfe00) as usize] = value,
            0xfea0..=0xfeff => {}
            0xff00 => {} // joypad writes have no effect on a core with no input
            0xff01..=0xff02 => self.serial.write(addr, value),
            0xff04..=0xff07 => self.timer.write(addr, value),
            IF_ADDR => self.int_flags = value & 0x1f,
            0xff10..=0xff3f => {} // APU registers, not modeled
            0xff40..=0xff4b => self.ppu.write(addr, value),
            BOOT_DISABLE_ADDR => {
                if value != 0 {
                    self.boot_active = false;
                }
            }
            0xff80..=0xfffe => self.hram[(addr - 0xff80) as usize] = value,
            IE_ADDR => self.ie = value,
            _ => warnln!("Writing to unmapped bus location 0x{:04x}", addr),
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
