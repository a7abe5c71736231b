//! MMU (Memory Management Unit) functions and structures.

use crate::{
    boot::BOOT_SIZE,
    consts::{
        BOOT_ADDR, DIV_ADDR, DMA_ADDR, IE_ADDR, IF_ADDR, JOYP_ADDR, KEY1_ADDR, TAC_ADDR, WX_ADDR,
    },
    debugln,
    dma::{Dma, DMA_CYCLES, DMA_SIZE},
    pad::Pad,
    ppu::{Ppu, PpuMode},
    rom::Cartridge,
    timer::Timer,
    warnln,
};

/// The size of the work RAM, mapped in range 0xC000-0xDFFF.
pub const RAM_SIZE: usize = 8192;

pub trait BusComponent {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
    fn read_many(&self, addr: u16, count: usize) -> Vec<u8> {
        (0..count)
            .map(|offset| self.read(addr + offset as u16))
            .collect()
    }
    fn write_many(&mut self, addr: u16, values: &[u8]) {
        for (offset, &value) in values.iter().enumerate() {
            self.write(addr + offset as u16, value);
        }
    }
}

/// The result of a bus write operation, carries the number of
/// bytes that were effectively stored and the extra cycles the
/// operation charges to the instruction that performed it
/// (eg: the OAM DMA stall).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WriteResult {
    pub bytes_written: u16,
    pub extra_cycles: u16,
}

impl WriteResult {
    /// A plain single byte store with no stall attached.
    pub const fn simple() -> Self {
        Self {
            bytes_written: 1,
            extra_cycles: 0,
        }
    }

    /// A write that was silently discarded by the bus.
    pub const fn dropped() -> Self {
        Self {
            bytes_written: 0,
            extra_cycles: 0,
        }
    }
}

/// Aggregation structure allowing the bundling of all the
/// memory mapped components of the system into a single
/// element for easy MMU construction.
pub struct Components {
    pub ppu: Ppu,
    pub dma: Dma,
    pub pad: Pad,
    pub timer: Timer,
}

pub struct Mmu {
    /// The IE register, the enable mask the interrupt dispatch
    /// checks pending requests against.
    pub ie: u8,

    /// The PPU, owns VRAM, OAM and HRAM together with the
    /// display related registers.
    ppu: Ppu,

    /// Reference to the DMA controller, holding the register latch
    /// for the OAM transfers that are orchestrated here.
    dma: Dma,

    /// The joypad, owns the key matrix and its register.
    pad: Pad,

    /// The timer, owns the divider and counter registers.
    timer: Timer,

    /// The inserted cartridge, serves the banked ROM windows
    /// and the external RAM range.
    rom: Cartridge,

    /// Whether the boot image still shadows the bottom of the
    /// cartridge space, cleared (forever) by a non zero write
    /// to 0xFF50.
    boot_active: bool,

    /// The boot ROM image, overlapped over the first 256 bytes
    /// of the cartridge while `boot_active` holds.
    boot: Vec<u8>,

    /// Buffer that is used to store the work RAM of the system,
    /// mapped in range 0xC000-0xDFFF and echoed at 0xE000-0xFDFF.
    ram: Vec<u8>,

    /// Serial interrupt request latch, kept at the MMU level as
    /// no serial controller is modelled, only ever set by guest
    /// writes to the IF register.
    int_serial: bool,
}

impl Mmu {
    pub fn new(components: Components) -> Self {
        Self {
            ppu: components.ppu,
            dma: components.dma,
            pad: components.pad,
            timer: components.timer,
            rom: Cartridge::new(),
            boot_active: true,
            boot: vec![],
            ram: vec![],
            ie: 0x0,
            int_serial: false,
        }
    }

    pub fn reset(&mut self) {
        self.rom = Cartridge::new();
        self.boot_active = true;
        self.boot = vec![];
        self.ram = vec![];
        self.ie = 0x0;
        self.int_serial = false;
    }

    pub fn allocate(&mut self) {
        self.boot = vec![0x00; BOOT_SIZE];
        self.ram = vec![0x00; RAM_SIZE];
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            // 0x0000-0x00FF - BOOT (256 B), falls through to the
            // cartridge once the boot flag has been lifted
            0x0000..=0x00ff if self.boot_active => self.boot[addr as usize],

            // 0x0000-0x3FFF - ROM 0 (16 KB)
            // 0x4000-0x7FFF - ROM 1 (Banked) (16 KB)
            0x0000..=0x7fff => self.rom.read(addr),

            // 0x8000-0x9FFF - Graphics: VRAM (8 KB), locked to the
            // PPU while pixel transfer (mode 3) is in progress
            0x8000..=0x9fff => {
                if self.ppu.mode() == PpuMode::VramRead {
                    0xff
                } else {
                    self.ppu.read(addr)
                }
            }

            // 0xA000-0xBFFF - External RAM (8 KB)
            0xa000..=0xbfff => self.rom.read(addr),

            // 0xC000-0xDFFF - Working RAM (8 KB)
            0xc000..=0xdfff => self.ram[(addr & 0x1fff) as usize],

            // 0xE000-0xFDFF - Working RAM Shadow
            0xe000..=0xfdff => self.ram[(addr & 0x1fff) as usize],

            // 0xFE00-0xFE9F - Object attribute memory (OAM), locked
            // to the PPU during both OAM scan and pixel transfer
            0xfe00..=0xfe9f => {
                if matches!(self.ppu.mode(), PpuMode::OamRead | PpuMode::VramRead) {
                    0xff
                } else {
                    self.ppu.read(addr)
                }
            }

            // 0xFEA0-0xFEFF - Not Usable
            0xfea0..=0xfeff => 0xff,

            // 0xFF00 - Joypad input
            JOYP_ADDR => self.pad.read(addr),

            // 0xFF01-0xFF02 - Serial data transfer (not modelled)
            0xff01..=0xff02 => 0xff,

            // 0xFF04-0xFF07 - Timer and divider
            DIV_ADDR..=TAC_ADDR => self.timer.read(addr),

            // 0xFF0F — IF: Interrupt flag
            IF_ADDR =>
            {
                #[allow(clippy::bool_to_int_with_if)]
                (if self.ppu.int_vblank() { 0x01 } else { 0x00 }
                    | if self.ppu.int_stat() { 0x02 } else { 0x00 }
                    | if self.timer.int_tima() { 0x04 } else { 0x00 }
                    | if self.int_serial { 0x08 } else { 0x00 }
                    | if self.pad.int_pad() { 0x10 } else { 0x00 }
                    | 0xe0)
            }

            // 0xFF10-0xFF26 — Audio
            // 0xFF30-0xFF3F — Wave pattern
            // no audio unit is attached, reads float high
            0xff10..=0xff26 | 0xff30..=0xff3f => 0xff,

            // 0xFF40-0xFF45 - PPU registers
            0xff40..=0xff45 => self.ppu.read(addr),

            // 0xFF46 — DMA: OAM DMA source address & start
            DMA_ADDR => self.dma.read(addr),

            // 0xFF47-0xFF4B - PPU registers
            0xff47..=WX_ADDR => self.ppu.read(addr),

            // 0xFF4D - KEY1: Speed switching, not supported by
            // the DMG so the open bus value is returned
            KEY1_ADDR => 0xff,

            // 0xFF50 - Boot active flag
            BOOT_ADDR => u8::from(!self.boot_active),

            // 0xFF80-0xFFFE - High RAM (HRAM)
            0xff80..=0xfffe => self.ppu.read(addr),

            // 0xFFFF — IE: Interrupt enable
            IE_ADDR => self.ie,

            addr => {
                warnln!("Reading from unknown location 0x{:04x}", addr);
                0xff
            }
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) -> WriteResult {
        match addr {
            // 0x0000-0x7FFF - MBC latch registers
            0x0000..=0x7fff => self.rom.write(addr, value),

            // 0x8000-0x9FFF - Graphics: VRAM (8 KB), writes are
            // dropped while pixel transfer (mode 3) is in progress
            0x8000..=0x9fff => {
                if self.ppu.mode() == PpuMode::VramRead {
                    return WriteResult::dropped();
                }
                self.ppu.write(addr, value)
            }

            // 0xA000-0xBFFF - External RAM (8 KB)
            0xa000..=0xbfff => self.rom.write(addr, value),

            // 0xC000-0xDFFF - Working RAM (8 KB)
            0xc000..=0xdfff => self.ram[(addr & 0x1fff) as usize] = value,

            // 0xE000-0xFDFF - Working RAM Shadow, the store is
            // made to the mirrored work RAM location
            0xe000..=0xfdff => self.ram[(addr & 0x1fff) as usize] = value,

            // 0xFE00-0xFE9F - Object attribute memory (OAM), writes
            // are dropped during both OAM scan and pixel transfer
            0xfe00..=0xfe9f => {
                if matches!(self.ppu.mode(), PpuMode::OamRead | PpuMode::VramRead) {
                    return WriteResult::dropped();
                }
                self.ppu.write(addr, value)
            }

            // 0xFEA0-0xFEFF - Not Usable
            0xfea0..=0xfeff => return WriteResult::dropped(),

            // 0xFF00 - Joypad input
            JOYP_ADDR => self.pad.write(addr, value),

            // 0xFF01-0xFF02 - Serial data transfer (not modelled)
            0xff01..=0xff02 => {
                debugln!("Ignoring write to serial location 0x{:04x}", addr)
            }

            // 0xFF04-0xFF07 - Timer and divider
            DIV_ADDR..=TAC_ADDR => self.timer.write(addr, value),

            // 0xFF0F — IF: Interrupt flag
            IF_ADDR => {
                self.ppu.set_int_vblank(value & 0x01 == 0x01);
                self.ppu.set_int_stat(value & 0x02 == 0x02);
                self.timer.set_int_tima(value & 0x04 == 0x04);
                self.int_serial = value & 0x08 == 0x08;
                self.pad.set_int_pad(value & 0x10 == 0x10);
            }

            // 0xFF10-0xFF26 — Audio
            // 0xFF30-0xFF3F — Wave pattern
            // no audio unit is attached, stores are discarded
            0xff10..=0xff26 | 0xff30..=0xff3f => {
                debugln!("Ignoring write to audio location 0x{:04x}", addr)
            }

            // 0xFF40-0xFF45 - PPU registers
            0xff40..=0xff45 => self.ppu.write(addr, value),

            // 0xFF46 — DMA: OAM DMA source address & start, the
            // transfer runs to completion right away and stalls
            // the CPU for the complete transfer period
            DMA_ADDR => {
                self.dma.write(addr, value);
                return self.run_dma();
            }

            // 0xFF47-0xFF4B - PPU registers
            0xff47..=WX_ADDR => self.ppu.write(addr, value),

            // 0xFF4D - KEY1: Speed switching, ignored on the DMG
            KEY1_ADDR => (),

            // 0xFF50 - Boot active flag, once lifted the boot
            // overlap can never be re-activated
            BOOT_ADDR => {
                if value != 0x00 {
                    self.boot_active = false;
                }
            }

            // 0xFF80-0xFFFE - High RAM (HRAM)
            0xff80..=0xfffe => self.ppu.write(addr, value),

            // 0xFFFF — IE: Interrupt enable
            IE_ADDR => self.ie = value,

            addr => warnln!("Writing to unknown location 0x{:04x}", addr),
        }
        WriteResult::simple()
    }

    /// Reads a byte as part of the instruction stream, bypassing
    /// the PPU access locks, instruction fetch is always serviced
    /// no matter the current PPU mode.
    pub fn fetch_opcode(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0x9fff | 0xfe00..=0xfe9f => self.ppu.read(addr),
            _ => self.read(addr),
        }
    }

    /// Runs the OAM DMA transfer for the value latched in the DMA
    /// register, moving 160 bytes into OAM and reporting back the
    /// cycles the operation steals from the CPU.
    fn run_dma(&mut self) -> WriteResult {
        let source = self.dma.source();
        for index in 0..DMA_SIZE {
            // the transfer engine has its own bus access, meaning
            // that the PPU mode locks do not apply to it
            let byte = self.fetch_opcode(source + index);
            self.ppu.write(0xfe00 + index, byte);
        }
        WriteResult {
            bytes_written: 1 + DMA_SIZE,
            extra_cycles: DMA_CYCLES,
        }
    }

    pub fn read_many(&self, addr: u16, count: u16) -> Vec<u8> {
        let mut data: Vec<u8> = vec![];

        for index in 0..count {
            let byte = self.read(addr + index);
            data.push(byte);
        }

        data
    }

    pub fn write_many(&mut self, addr: u16, data: &[u8]) {
        for (index, byte) in data.iter().enumerate() {
            self.write(addr + index as u16, *byte);
        }
    }

    pub fn write_boot(&mut self, addr: u16, buffer: &[u8]) {
        self.boot[addr as usize..addr as usize + buffer.len()].clone_from_slice(buffer);
    }

    pub fn write_ram(&mut self, addr: u16, buffer: &[u8]) {
        self.ram[addr as usize..addr as usize + buffer.len()].clone_from_slice(buffer);
    }

    pub fn boot_active(&self) -> bool {
        self.boot_active
    }

    pub fn set_boot_active(&mut self, value: bool) {
        self.boot_active = value;
    }

    pub fn int_serial(&self) -> bool {
        self.int_serial
    }

    pub fn set_int_serial(&mut self, value: bool) {
        self.int_serial = value;
    }

    pub fn ppu(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn ppu_i(&self) -> &Ppu {
        &self.ppu
    }

    pub fn dma(&mut self) -> &mut Dma {
        &mut self.dma
    }

    pub fn dma_i(&self) -> &Dma {
        &self.dma
    }

    pub fn pad(&mut self) -> &mut Pad {
        &mut self.pad
    }

    pub fn pad_i(&self) -> &Pad {
        &self.pad
    }

    pub fn timer(&mut self) -> &mut Timer {
        &mut self.timer
    }

    pub fn timer_i(&self) -> &Timer {
        &self.timer
    }

    pub fn ram(&mut self) -> &mut Vec<u8> {
        &mut self.ram
    }

    pub fn ram_i(&self) -> &Vec<u8> {
        &self.ram
    }

    pub fn rom(&mut self) -> &mut Cartridge {
        &mut self.rom
    }

    pub fn rom_i(&self) -> &Cartridge {
        &self.rom
    }

    pub fn set_rom(&mut self, rom: Cartridge) {
        self.rom = rom;
    }
}

impl Default for Mmu {
    fn default() -> Self {
        let components = Components {
            ppu: Ppu::default(),
            dma: Dma::default(),
            pad: Pad::default(),
            timer: Timer::default(),
        };
        Mmu::new(components)
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::{BOOT_ADDR, DMA_ADDR, IF_ADDR, LCDC_ADDR};

    use super::{Mmu, WriteResult};

    fn build_mmu() -> Mmu {
        let mut mmu = Mmu::default();
        mmu.allocate();
        mmu
    }

    #[test]
    fn test_ram_read_write() {
        let mut mmu = build_mmu();
        mmu.write(0xc000, 0x12);
        assert_eq!(mmu.read(0xc000), 0x12);
        mmu.write(0xdfff, 0x34);
        assert_eq!(mmu.read(0xdfff), 0x34);
    }

    #[test]
    fn test_echo_ram() {
        let mut mmu = build_mmu();

        mmu.write(0xc000, 0x56);
        assert_eq!(mmu.read(0xe000), 0x56);

        mmu.write(0xfdff, 0x78);
        assert_eq!(mmu.read(0xddff), 0x78);
    }

    #[test]
    fn test_unusable_region() {
        let mut mmu = build_mmu();
        let result = mmu.write(0xfea0, 0x99);
        assert_eq!(result, WriteResult::dropped());
        assert_eq!(mmu.read(0xfea0), 0xff);
    }

    #[test]
    fn test_boot_shadow() {
        let mut mmu = build_mmu();
        mmu.write_boot(0x0000, &[0x31, 0xfe, 0xff]);
        assert!(mmu.boot_active());
        assert_eq!(mmu.read(0x0000), 0x31);
        assert_eq!(mmu.read(BOOT_ADDR), 0x00);

        // writing zero does not lift the boot overlap
        mmu.write(BOOT_ADDR, 0x00);
        assert!(mmu.boot_active());

        mmu.write(BOOT_ADDR, 0x01);
        assert!(!mmu.boot_active());
        assert_eq!(mmu.read(BOOT_ADDR), 0x01);

        // once lifted the overlap is gone for good
        mmu.write(BOOT_ADDR, 0x00);
        assert!(!mmu.boot_active());
    }

    #[test]
    fn test_interrupt_flag() {
        let mut mmu = build_mmu();
        assert_eq!(mmu.read(IF_ADDR), 0xe0);

        mmu.write(IF_ADDR, 0x15);
        assert!(mmu.ppu_i().int_vblank());
        assert!(mmu.timer_i().int_tima());
        assert!(mmu.pad_i().int_pad());
        assert_eq!(mmu.read(IF_ADDR), 0xf5);

        mmu.write(IF_ADDR, 0x00);
        assert_eq!(mmu.read(IF_ADDR), 0xe0);
    }

    #[test]
    fn test_vram_locked_in_mode_3() {
        let mut mmu = build_mmu();

        mmu.write(0x8000, 0xab);
        assert_eq!(mmu.read(0x8000), 0xab);

        // LCD on, runs the OAM scan period so the PPU enters
        // pixel transfer (mode 3)
        mmu.write(LCDC_ADDR, 0x80);
        mmu.ppu().clock(80);

        assert_eq!(mmu.read(0x8000), 0xff);
        let result = mmu.write(0x8000, 0xcd);
        assert_eq!(result, WriteResult::dropped());

        // instruction fetch is not subject to the lock
        assert_eq!(mmu.fetch_opcode(0x8000), 0xab);
    }

    #[test]
    fn test_oam_locked_in_mode_2() {
        let mut mmu = build_mmu();

        mmu.write(0xfe00, 0x10);
        assert_eq!(mmu.read(0xfe00), 0x10);

        mmu.write(LCDC_ADDR, 0x80);

        assert_eq!(mmu.read(0xfe00), 0xff);
        let result = mmu.write(0xfe00, 0x20);
        assert_eq!(result, WriteResult::dropped());
    }

    #[test]
    fn test_dma_transfer() {
        let mut mmu = build_mmu();
        for index in 0..160u16 {
            mmu.write(0xc100 + index, index as u8);
        }

        let result = mmu.write(DMA_ADDR, 0xc1);
        assert_eq!(result.bytes_written, 161);
        assert_eq!(result.extra_cycles, 160);

        assert_eq!(mmu.read(DMA_ADDR), 0xc1);
        assert_eq!(mmu.read(0xfe00), 0x00);
        assert_eq!(mmu.read(0xfe9f), 0x9f);
    }
}
