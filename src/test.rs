//! Reusable test harness, allows the construction of pre-configured
//! emulator instances for both tests and benchmarks.

use dotmatrix_common::error::Error;

use crate::{boot::BootRom, gb::GameBoy};

#[derive(Default)]
pub struct TestOptions {
    pub ppu_enabled: Option<bool>,
    pub timer_enabled: Option<bool>,
    pub boot_rom: Option<BootRom>,
}

/// Builds an emulator instance according to the provided options,
/// when no boot ROM is selected the system is placed directly in
/// the post boot state.
pub fn build_test(options: TestOptions) -> Result<Box<GameBoy>, Error> {
    let mut game_boy = Box::new(GameBoy::new());
    game_boy.set_ppu_enabled(options.ppu_enabled.unwrap_or(true));
    game_boy.set_timer_enabled(options.timer_enabled.unwrap_or(true));
    match options.boot_rom {
        Some(boot_rom) => {
            game_boy.set_boot_rom(boot_rom);
            game_boy.load(boot_rom != BootRom::None)?;
        }
        None => {
            game_boy.load(false)?;
            game_boy.boot();
        }
    }
    Ok(game_boy)
}

/// Runs the complete boot sequence over a blank cartridge, the
/// returned system has its PC at the cartridge entry point.
pub fn run_boot_test(options: TestOptions) -> Result<Box<GameBoy>, Error> {
    let mut game_boy = build_test(options)?;
    game_boy.load_rom_empty()?;
    game_boy.step_to(0x0100)?;
    Ok(game_boy)
}

#[cfg(test)]
mod tests {
    use dotmatrix_common::error::Error;

    use crate::{
        boot::BootRom,
        consts::{BGP_ADDR, BOOT_ADDR, IF_ADDR, LCDC_ADDR, TAC_ADDR, TIMA_ADDR, TMA_ADDR},
        host::NullHost,
    };

    use super::{build_test, run_boot_test, TestOptions};

    #[test]
    fn test_boot_state() {
        let mut result = run_boot_test(TestOptions {
            boot_rom: Some(BootRom::Dmg),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(result.cpu_i().pc(), 0x0100);
        assert_eq!(result.cpu_i().sp(), 0xfffe);
        assert_eq!(result.cpu_i().af(), 0x01b0);
        assert_eq!(result.cpu_i().bc(), 0x0013);
        assert_eq!(result.cpu_i().de(), 0x00d8);
        assert_eq!(result.cpu_i().hl(), 0x014d);
        assert!(!result.cpu_i().ime());

        assert_eq!(result.mmu().read(TIMA_ADDR), 0x00);
        assert_eq!(result.mmu().read(TMA_ADDR), 0x00);
        assert_eq!(result.mmu().read(TAC_ADDR), 0xf8);
        assert_eq!(result.mmu().read(IF_ADDR), 0xe1);

        assert_eq!(result.mmu().read(LCDC_ADDR), 0x91);
        assert_eq!(result.mmu().read(BGP_ADDR), 0xfc);

        // the boot overlap has been lifted by the write to 0xFF50
        assert_eq!(result.mmu().read(BOOT_ADDR), 0x01);
        assert!(!result.mmu().boot_active());
    }

    #[test]
    fn test_white_frames() {
        let mut game_boy = build_test(TestOptions::default()).unwrap();
        game_boy.load_rom_empty().unwrap();

        let mut host = NullHost::new();
        let frames = game_boy.run(&mut host, Some(3)).unwrap();
        assert_eq!(frames, 3);
        assert_eq!(host.frames(), 3);

        // with a blank cartridge and an untouched palette the
        // output is fully white (shade index zero)
        assert!(game_boy.shade_buffer().iter().all(|&shade| shade == 0));
    }

    #[test]
    fn test_decode_error_is_fatal() {
        let mut game_boy = build_test(TestOptions::default()).unwrap();

        let mut data = vec![0x00; 0x8000];
        data[0x0100] = 0xd3;
        game_boy.load_rom(&data).unwrap();

        let result = game_boy.next_frame();
        assert_eq!(result, Err(Error::InvalidOpcode(0xd3, 0x0100)));
    }

    #[test]
    fn test_timer_interrupt_program() {
        let mut game_boy = build_test(TestOptions::default()).unwrap();

        // sets the timer to the fastest rate with a modulo that
        // overflows quickly, enables the timer interrupt and spins,
        // the handler at 0x50 stores a marker in work RAM
        let mut data = vec![0x00; 0x8000];
        let program: &[u8] = &[
            0x3e, 0xf0, // LD A, 0xf0
            0xe0, 0x06, // LD [FF00+06], A  (TMA)
            0xe0, 0x05, // LD [FF00+05], A  (TIMA)
            0x3e, 0x05, // LD A, 0x05
            0xe0, 0x07, // LD [FF00+07], A  (TAC)
            0x3e, 0x04, // LD A, 0x04
            0xe0, 0xff, // LD [FF00+ff], A  (IE)
            0xfb, // EI
            0x18, 0xfe, // JR -2
        ];
        data[0x0100..0x0100 + program.len()].copy_from_slice(program);
        data[0x0050] = 0x3e; // LD A, 0x42
        data[0x0051] = 0x42;
        data[0x0052] = 0xea; // LD [0xc000], A
        data[0x0053] = 0x00;
        data[0x0054] = 0xc0;
        data[0x0055] = 0x76; // HALT
        game_boy.load_rom(&data).unwrap();

        game_boy.clocks_cycles(4096).unwrap();
        assert_eq!(game_boy.mmu().read(0xc000), 0x42);
    }
}
