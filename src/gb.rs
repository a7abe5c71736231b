//! Emulation entrypoint and associated functions and structures.
//!
//! The [`GameBoy`] aggregate owns every component of the system and
//! is the surface both frontends and tests are expected to use.
//!
//! # Examples
//!
//! Runs the embedded boot ROM over a blank cartridge by clocking
//! the system until PC reaches 0x0100 (the cartridge entry point).
//!
//! ```rust
//! use dotmatrix::gb::GameBoy;
//! let mut game_boy = GameBoy::new();
//! game_boy.load(true).unwrap();
//! game_boy.load_rom_empty().unwrap();
//! let cycles = game_boy.step_to(0x0100).unwrap();
//! println!("Ran {} cycles", cycles);
//! ```

use std::{
    fmt::{self, Display, Formatter},
    sync::{Arc, Mutex},
    time::Duration,
};

use dotmatrix_common::{
    error::Error,
    util::{read_file, SharedThread},
};

use crate::{
    boot::{BootRom, BOOT_LOGO_OFFSET, BOOT_LOGO_SIZE, BOOT_SIZE, DMG_BOOT},
    cpu::Cpu,
    dma::Dma,
    host::{Host, InputState},
    info::Info,
    infoln,
    mmu::{Components, Mmu},
    pad::{Pad, PadKey},
    ppu::{
        Ppu, PpuMode, Tile, DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAME_BUFFER_SIZE, SHADE_BUFFER_SIZE,
    },
    rom::Cartridge,
    timer::Timer,
};

/// Configuration of the emulator, can be used to
/// control the behaviour of the emulation at runtime.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GameBoyConfig {
    /// If the PPU is enabled, it will be clocked.
    ppu_enabled: bool,

    /// If the timer is enabled, it will be clocked.
    timer_enabled: bool,

    /// The current frequency at which the emulator
    /// is being handled. This is a "hint" that may
    /// help components to adjust their internal
    /// logic to match the current frequency.
    clock_freq: u32,
}

impl GameBoyConfig {
    pub fn ppu_enabled(&self) -> bool {
        self.ppu_enabled
    }

    pub fn set_ppu_enabled(&mut self, value: bool) {
        self.ppu_enabled = value;
    }

    pub fn timer_enabled(&self) -> bool {
        self.timer_enabled
    }

    pub fn set_timer_enabled(&mut self, value: bool) {
        self.timer_enabled = value;
    }

    pub fn clock_freq(&self) -> u32 {
        self.clock_freq
    }

    pub fn set_clock_freq(&mut self, value: u32) {
        self.clock_freq = value;
    }
}

impl Default for GameBoyConfig {
    fn default() -> Self {
        Self {
            ppu_enabled: true,
            timer_enabled: true,
            clock_freq: GameBoy::CPU_FREQ,
        }
    }
}

/// Snapshot of the CPU and PPU registers, to be used in
/// debugging and diagnostics.
pub struct Registers {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub scy: u8,
    pub scx: u8,
    pub wy: u8,
    pub wx: u8,
    pub ly: u8,
    pub lyc: u8,
}

/// Top level structure that abstracts the usage of the
/// emulated system.
///
/// Should serve as the main entry-point API.
pub struct GameBoy {
    /// Local copy of the PPU enable flag, avoids taking the
    /// configuration lock on the hot clock path.
    ppu_enabled: bool,

    /// Local copy of the timer enable flag, avoids taking the
    /// configuration lock on the hot clock path.
    timer_enabled: bool,

    /// Local copy of the clock frequency hint.
    clock_freq: u32,

    /// The boot ROM selection used by the load operation.
    boot_rom: BootRom,

    /// The CPU, owns the MMU (and through it every other
    /// component), its cycle count drives the lockstep.
    cpu: Cpu,

    /// The last input snapshot that was applied to the
    /// joypad, used for key transition (edge) detection.
    input_state: InputState,

    /// The reference counted and mutable reference to the
    /// configuration structure that can be used by the
    /// components to access global configuration values.
    ///
    /// If performance is required the values should be
    /// cloned and stored locally.
    gbc: SharedThread<GameBoyConfig>,
}

impl GameBoy {
    /// The logic frequency of the CPU in hz.
    pub const CPU_FREQ: u32 = 4194304;

    /// The visual frequency (refresh rate) of the display,
    /// close to 60 hz.
    pub const VISUAL_FREQ: f32 = 59.7275;

    /// The cycles taken to run a complete frame
    /// loop in the PPU (in CPU cycles).
    pub const LCD_CYCLES: u32 = 70224;

    /// The amount of CPU cycles the frame loop consumes per
    /// iteration (the CPU frequency divided by 60), over many
    /// frames the amount of cycles per PPU frame converges
    /// to [`GameBoy::LCD_CYCLES`].
    pub const FRAME_CYCLES: u32 = 69905;

    pub fn new() -> Self {
        let gbc = Arc::new(Mutex::new(GameBoyConfig::default()));

        let components = Components {
            ppu: Ppu::default(),
            dma: Dma::default(),
            pad: Pad::default(),
            timer: Timer::default(),
        };
        let mmu = Mmu::new(components);
        let cpu = Cpu::new(mmu);

        Self {
            ppu_enabled: true,
            timer_enabled: true,
            clock_freq: GameBoy::CPU_FREQ,
            boot_rom: BootRom::Dmg,
            cpu,
            input_state: InputState::new(),
            gbc,
        }
    }

    /// Verifies if the provided data is a loadable cartridge
    /// ROM image.
    pub fn verify_rom(data: &[u8]) -> bool {
        Cartridge::from_data(data).is_ok()
    }

    pub fn reset(&mut self) {
        self.ppu().reset();
        self.timer().reset();
        self.pad().reset();
        self.mmu().dma().reset();
        self.mmu().reset();
        self.cpu.reset();
        self.input_state = InputState::new();
    }

    /// Advances the system by one instruction (or interrupt
    /// dispatch), keeping the PPU and the timer in lockstep
    /// with the cycles the CPU reports.
    ///
    /// Returns the cycles consumed, a decode trap on an
    /// undefined opcode surfaces here as a fatal error.
    pub fn clock(&mut self) -> Result<u16, Error> {
        let cycles = self.cpu_clock()?;
        self.clock_devices(cycles);
        Ok(cycles)
    }

    /// Variant of `clock()` that leaves the devices untouched
    /// when the provided address has been reached, so that a
    /// stepped-to breakpoint observes a consistent state.
    pub fn clock_step(&mut self, addr: u16) -> Result<u16, Error> {
        let cycles = self.cpu_clock()?;
        if self.cpu_i().pc() == addr {
            return Ok(cycles);
        }
        self.clock_devices(cycles);
        Ok(cycles)
    }

    /// Keeps clocking until at least the provided amount of
    /// cycles has been consumed.
    pub fn clocks_cycles(&mut self, limit: usize) -> Result<u64, Error> {
        let mut cycles = 0_u64;
        while cycles < limit as u64 {
            cycles += self.clock()? as u64;
        }
        Ok(cycles)
    }

    /// Clocks the emulator until the next frame is available in
    /// the PPU, the amount of cycles consumed is returned.
    pub fn next_frame(&mut self) -> Result<u32, Error> {
        let mut cycles = 0u32;
        let current_frame = self.ppu_frame();
        while self.ppu_frame() == current_frame {
            cycles += self.clock()? as u32;
        }
        Ok(cycles)
    }

    /// Clocks the emulator until the PC (Program Counter) reaches
    /// the provided address, returning the cycle total.
    pub fn step_to(&mut self, addr: u16) -> Result<u32, Error> {
        let mut cycles = 0u32;
        while self.cpu_i().pc() != addr {
            cycles += self.clock_step(addr)? as u32;
        }
        Ok(cycles)
    }

    /// Runs one complete iteration of the frame loop: executes
    /// instructions with devices kept in lockstep and the input
    /// polled per step, until the frame cycle allowance has been
    /// consumed, then hands the finished frame over to the host.
    pub fn run_frame<H: Host>(&mut self, host: &mut H) -> Result<u32, Error> {
        let mut cycles = 0u32;
        while cycles < Self::FRAME_CYCLES {
            cycles += self.clock()? as u32;
            let input = host.poll_input();
            self.apply_input(input);
        }
        host.present_frame(self.ppu_i().shade_buffer())?;
        Ok(cycles)
    }

    /// Runs the frame loop forever (or until the optional frame
    /// limit is reached), sleeping at the end of every iteration
    /// to re-align with the display cadence.
    ///
    /// Fatal errors (decode traps and host failures) terminate
    /// the loop.
    pub fn run<H: Host>(&mut self, host: &mut H, frame_limit: Option<u64>) -> Result<u64, Error> {
        let frame_duration = Duration::from_secs_f32(1.0 / Self::VISUAL_FREQ);
        let mut frames = 0_u64;
        loop {
            let start = host.now();
            self.run_frame(host)?;
            frames += 1;

            if let Some(frame_limit) = frame_limit {
                if frames >= frame_limit {
                    return Ok(frames);
                }
            }

            let elapsed = host.now().duration_since(start);
            if elapsed < frame_duration {
                host.sleep(frame_duration - elapsed);
            }
        }
    }

    /// Applies an input snapshot to the joypad, key transitions
    /// are resolved against the previously applied snapshot so
    /// that press edges raise the joypad interrupt exactly once.
    pub fn apply_input(&mut self, state: InputState) {
        if state == self.input_state {
            return;
        }
        for key in InputState::KEYS {
            let pressed = state.is_pressed(key);
            if pressed == self.input_state.is_pressed(key) {
                continue;
            }
            if pressed {
                self.key_press(key);
            } else {
                self.key_lift(key);
            }
        }
        self.input_state = state;
    }

    pub fn key_press(&mut self, key: PadKey) {
        self.pad().key_press(key);
    }

    pub fn key_lift(&mut self, key: PadKey) {
        self.pad().key_lift(key);
    }

    fn cpu_clock(&mut self) -> Result<u16, Error> {
        self.cpu.clock()
    }

    #[inline(always)]
    fn clock_devices(&mut self, cycles: u16) {
        if self.ppu_enabled {
            self.ppu().clock(cycles);
        }
        if self.timer_enabled {
            self.timer().clock(cycles);
        }
    }

    pub fn ppu_ly(&mut self) -> u8 {
        self.ppu().ly()
    }

    pub fn ppu_mode(&mut self) -> PpuMode {
        self.ppu().mode()
    }

    pub fn ppu_frame(&mut self) -> u16 {
        self.ppu().frame_index()
    }

    /// Places the machine directly in the post boot state,
    /// skipping the boot sequence entirely.
    pub fn boot(&mut self) {
        self.cpu.boot();
    }

    pub fn registers(&mut self) -> Registers {
        let ppu_registers = self.ppu().registers();
        Registers {
            pc: self.cpu.pc,
            sp: self.cpu.sp,
            a: self.cpu.a,
            b: self.cpu.b,
            c: self.cpu.c,
            d: self.cpu.d,
            e: self.cpu.e,
            h: self.cpu.h,
            l: self.cpu.l,
            scy: ppu_registers.scy,
            scx: ppu_registers.scx,
            wy: ppu_registers.wy,
            wx: ppu_registers.wx,
            ly: ppu_registers.ly,
            lyc: ppu_registers.lyc,
        }
    }

    /// Copy of the decoded tile at the given index, pixels
    /// are raw color indexes (no palette applied).
    pub fn get_tile(&mut self, index: usize) -> Tile {
        self.ppu().tiles()[index]
    }

    pub fn ppu_enabled(&self) -> bool {
        self.ppu_enabled
    }

    pub fn set_ppu_enabled(&mut self, value: bool) {
        self.ppu_enabled = value;
        (*self.gbc).lock().unwrap().set_ppu_enabled(value);
    }

    pub fn timer_enabled(&self) -> bool {
        self.timer_enabled
    }

    pub fn set_timer_enabled(&mut self, value: bool) {
        self.timer_enabled = value;
        (*self.gbc).lock().unwrap().set_timer_enabled(value);
    }

    pub fn clock_freq(&self) -> u32 {
        self.clock_freq
    }

    pub fn set_clock_freq(&mut self, value: u32) {
        self.clock_freq = value;
        (*self.gbc).lock().unwrap().set_clock_freq(value);
    }

    pub fn clock_freq_s(&self) -> String {
        format!("{:.02} Mhz", self.clock_freq() as f32 / 1000.0 / 1000.0)
    }

    pub fn boot_rom(&self) -> BootRom {
        self.boot_rom
    }

    pub fn set_boot_rom(&mut self, value: BootRom) {
        self.boot_rom = value;
    }

    pub fn display_width(&self) -> usize {
        DISPLAY_WIDTH
    }

    pub fn display_height(&self) -> usize {
        DISPLAY_HEIGHT
    }

    pub fn description(&self, column_length: usize) -> String {
        let version_l = format!("{:width$}", "Version", width = column_length);
        let boot_rom_l = format!("{:width$}", "Boot ROM", width = column_length);
        let clock_l = format!("{:width$}", "Clock", width = column_length);
        let display_l = format!("{:width$}", "Display", width = column_length);
        format!(
            "{}  {}\n{}  {}\n{}  {}\n{}  {}x{}",
            version_l,
            Info::version(),
            boot_rom_l,
            self.boot_rom(),
            clock_l,
            self.clock_freq_s(),
            display_l,
            DISPLAY_WIDTH,
            DISPLAY_HEIGHT
        )
    }

    pub fn description_debug(&self) -> String {
        format!(
            "{}\nCPU:\n{}",
            self.description(12),
            self.cpu_i().description_default()
        )
    }
}

impl GameBoy {
    pub fn cpu(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn cpu_i(&self) -> &Cpu {
        &self.cpu
    }

    pub fn mmu(&mut self) -> &mut Mmu {
        self.cpu.mmu()
    }

    pub fn mmu_i(&self) -> &Mmu {
        self.cpu.mmu_i()
    }

    pub fn ppu(&mut self) -> &mut Ppu {
        self.cpu.mmu().ppu()
    }

    pub fn ppu_i(&self) -> &Ppu {
        self.cpu.mmu_i().ppu_i()
    }

    pub fn pad(&mut self) -> &mut Pad {
        self.cpu.mmu().pad()
    }

    pub fn pad_i(&self) -> &Pad {
        self.cpu.mmu_i().pad_i()
    }

    pub fn timer(&mut self) -> &mut Timer {
        self.cpu.mmu().timer()
    }

    pub fn timer_i(&self) -> &Timer {
        self.cpu.mmu_i().timer_i()
    }

    pub fn rom(&mut self) -> &mut Cartridge {
        self.mmu().rom()
    }

    pub fn rom_i(&self) -> &Cartridge {
        self.mmu_i().rom_i()
    }

    /// Obtains the canonical PPU output, one shade index
    /// (0 to 3) per screen pixel.
    pub fn shade_buffer(&self) -> &[u8; SHADE_BUFFER_SIZE] {
        self.ppu_i().shade_buffer()
    }

    /// Obtains the RGB (grayscale mapped) view of the PPU
    /// output, lazily computed.
    pub fn frame_buffer(&mut self) -> &[u8; FRAME_BUFFER_SIZE] {
        self.ppu().frame_buffer()
    }

    /// Allocates the internal memory of the system and (optionally)
    /// loads the configured boot ROM into place.
    pub fn load(&mut self, boot: bool) -> Result<(), Error> {
        self.mmu().allocate();
        if boot {
            self.load_boot_default()?;
        } else {
            self.mmu().set_boot_active(false);
        }
        Ok(())
    }

    /// Loads the currently configured boot ROM image into the
    /// boot memory overlap.
    pub fn load_boot_default(&mut self) -> Result<(), Error> {
        let boot_rom = self.boot_rom;
        let data = boot_rom.data().ok_or(Error::IncompatibleBootRom)?;
        self.mmu().write_boot(0x0000, data);
        Ok(())
    }

    /// Loads a custom boot ROM from the provided file path, the
    /// image must be exactly the boot ROM size (256 bytes).
    pub fn load_boot_file(&mut self, path: &str) -> Result<(), Error> {
        let data = read_file(path)?;
        if data.len() != BOOT_SIZE {
            return Err(Error::IncompatibleBootRom);
        }
        self.mmu().write_boot(0x0000, &data);
        Ok(())
    }

    pub fn load_rom(&mut self, data: &[u8]) -> Result<&mut Cartridge, Error> {
        let rom = Cartridge::from_data(data)?;
        self.mmu().set_rom(rom);
        Ok(self.rom())
    }

    pub fn load_rom_file(&mut self, path: &str) -> Result<&mut Cartridge, Error> {
        let data = read_file(path)?;
        let rom = self.load_rom(&data)?;
        infoln!("Loaded {} ({})", rom.title(), rom.rom_type());
        Ok(rom)
    }

    /// Creates and loads a blank 32 KiB cartridge, with the logo
    /// bitmap in place and a valid header checksum so that the
    /// boot sequence is able to run to completion with no real
    /// game inserted.
    pub fn load_rom_empty(&mut self) -> Result<&mut Cartridge, Error> {
        let mut data = vec![0x00; 0x8000];
        data[0x0104..0x0104 + BOOT_LOGO_SIZE]
            .copy_from_slice(&DMG_BOOT[BOOT_LOGO_OFFSET..BOOT_LOGO_OFFSET + BOOT_LOGO_SIZE]);

        let mut checksum: u8 = 0;
        for byte in &data[0x0134..=0x014c] {
            checksum = checksum.wrapping_sub(*byte).wrapping_sub(1);
        }
        data[0x014d] = checksum;

        self.load_rom(&data)
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for GameBoy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description(9))
    }
}

#[cfg(test)]
mod tests {
    use crate::{host::InputState, pad::PadKey};

    use super::GameBoy;

    #[test]
    fn test_load_rom_empty() {
        let mut game_boy = GameBoy::new();
        game_boy.load(false).unwrap();
        let rom = game_boy.load_rom_empty().unwrap();
        assert!(rom.valid_checksum());
    }

    #[test]
    fn test_apply_input_edges() {
        let mut game_boy = GameBoy::new();
        game_boy.load(false).unwrap();

        let mut state = InputState::new();
        state.press(PadKey::B);
        game_boy.apply_input(state);
        assert!(game_boy.pad_i().int_pad());

        // re-applying the same snapshot is not an edge
        game_boy.pad().ack_pad();
        game_boy.apply_input(state);
        assert!(!game_boy.pad_i().int_pad());

        // lifting and pressing again is
        game_boy.apply_input(InputState::new());
        state = InputState::new();
        state.press(PadKey::B);
        game_boy.apply_input(state);
        assert!(game_boy.pad_i().int_pad());
    }
}
