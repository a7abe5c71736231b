use std::{
    process::exit,
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use dotmatrix::{
    gb::GameBoy,
    host::{Host, InputState},
    info::Info,
    ppu::{DISPLAY_HEIGHT, DISPLAY_WIDTH, SHADE_BUFFER_SIZE},
};
use dotmatrix_common::{error::Error, util::save_bmp};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the cartridge ROM file that is going to be loaded
    rom_path: String,

    /// Path to a custom (256 byte) boot ROM image
    #[arg(long)]
    boot_rom: Option<String>,

    /// Skips the boot sequence, starting directly at the
    /// cartridge entry point
    #[arg(long)]
    no_boot: bool,

    /// Number of frames to run before exiting, runs forever
    /// when not set
    #[arg(long)]
    frames: Option<u64>,

    /// Disables frame pacing, running the emulation as fast
    /// as the host allows
    #[arg(long)]
    unlimited: bool,

    /// Address at which per-instruction tracing starts (hex
    /// values accepted with the 0x prefix)
    #[arg(long)]
    debug_from: Option<String>,

    /// Path of the BMP file where the final frame is saved
    #[arg(long)]
    screenshot: Option<String>,
}

/// Headless host, frames are counted (and kept for the final
/// screenshot) and no input device is attached.
struct ConsoleHost {
    unlimited: bool,
    frames: u64,
}

impl ConsoleHost {
    fn new(unlimited: bool) -> Self {
        Self {
            unlimited,
            frames: 0,
        }
    }
}

impl Host for ConsoleHost {
    fn present_frame(&mut self, _frame: &[u8; SHADE_BUFFER_SIZE]) -> Result<(), Error> {
        self.frames += 1;
        Ok(())
    }

    fn poll_input(&mut self) -> InputState {
        InputState::new()
    }

    fn now(&mut self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        if !self.unlimited {
            thread::sleep(duration);
        }
    }
}

fn parse_addr(value: &str) -> Result<u16, Error> {
    let result = if let Some(hex) = value.strip_prefix("0x") {
        u16::from_str_radix(hex, 16)
    } else {
        value.parse::<u16>()
    };
    result.map_err(|_| Error::InvalidParameter(format!("address: {}", value)))
}

fn run(args: Args) -> Result<(), Error> {
    let mut game_boy = GameBoy::new();
    game_boy.load(!args.no_boot)?;
    if args.no_boot {
        game_boy.boot();
    }
    if let Some(path) = &args.boot_rom {
        game_boy.load_boot_file(path)?;
    }

    game_boy.load_rom_file(&args.rom_path)?;

    println!("{} v{}", Info::name(), Info::version());
    println!("{}", game_boy.description(9));
    println!("{}", game_boy.rom());

    let mut host = ConsoleHost::new(args.unlimited);
    let start = Instant::now();

    match &args.debug_from {
        Some(value) => {
            // runs up to the requested address and then switches
            // to per-instruction tracing, frame pacing makes no
            // sense while tracing so it is skipped
            let addr = parse_addr(value)?;
            game_boy.step_to(addr)?;
            let mut frames = 0_u64;
            while args.frames.map_or(true, |limit| frames < limit) {
                println!("{}", game_boy.cpu_i().description_default());
                let last_frame = game_boy.ppu_frame();
                game_boy.clock()?;
                if game_boy.ppu_frame() != last_frame {
                    frames += 1;
                }
            }
            host.frames = frames;
        }
        None => {
            game_boy.run(&mut host, args.frames)?;
        }
    }

    let elapsed = start.elapsed();
    println!(
        "Ran {} frames in {:.2} seconds",
        host.frames,
        elapsed.as_secs_f32()
    );

    if let Some(path) = &args.screenshot {
        let frame_buffer = game_boy.frame_buffer();
        save_bmp(
            path,
            frame_buffer,
            DISPLAY_WIDTH as u32,
            DISPLAY_HEIGHT as u32,
        )?;
        println!("Saved screenshot to {}", path);
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(error) = run(args) {
        eprintln!("Error: {}", error);
        exit(1);
    }
}
