//! Boot ROM (bootstrap) data and selection.

use std::fmt::{self, Display, Formatter};

/// The size in bytes of the DMG boot ROM, mapped over the
/// 0x0000-0x00FF memory range until disabled.
pub const BOOT_SIZE: usize = 256;

/// Offset of the logo bitmap inside the bootstrap image, the
/// cartridge header must carry the same bitmap at 0x0104 for
/// the boot sequence to unlock.
pub const BOOT_LOGO_OFFSET: usize = 0x00a8;

/// The size in bytes of the logo bitmap.
pub const BOOT_LOGO_SIZE: usize = 48;

/// The standard 256 byte DMG bootstrap, scrolls the logo down
/// the screen, plays the chime, verifies the cartridge header
/// and then hands control to the cartridge at 0x0100.
pub const DMG_BOOT: [u8; BOOT_SIZE] = [
    0x31, 0xfe, 0xff, 0xaf, 0x21, 0xff, 0x9f, 0x32, 0xcb, 0x7c, 0x20, 0xfb, 0x21, 0x26, 0xff, 0x0e,
    0x11, 0x3e, 0x80, 0x32, 0xe2, 0x0c, 0x3e, 0xf3, 0xe2, 0x32, 0x3e, 0x77, 0x77, 0x3e, 0xfc, 0xe0,
    0x47, 0x11, 0x04, 0x01, 0x21, 0x10, 0x80, 0x1a, 0xcd, 0x95, 0x00, 0xcd, 0x96, 0x00, 0x13, 0x7b,
    0xfe, 0x34, 0x20, 0xf3, 0x11, 0xd8, 0x00, 0x06, 0x08, 0x1a, 0x13, 0x22, 0x23, 0x05, 0x20, 0xf9,
    0x3e, 0x19, 0xea, 0x10, 0x99, 0x21, 0x2f, 0x99, 0x0e, 0x0c, 0x3d, 0x28, 0x08, 0x32, 0x0d, 0x20,
    0xf9, 0x2e, 0x0f, 0x18, 0xf3, 0x67, 0x3e, 0x64, 0x57, 0xe0, 0x42, 0x3e, 0x91, 0xe0, 0x40, 0x04,
    0x1e, 0x02, 0x0e, 0x0c, 0xf0, 0x44, 0xfe, 0x90, 0x20, 0xfa, 0x0d, 0x20, 0xf7, 0x1d, 0x20, 0xf2,
    0x0e, 0x13, 0x24, 0x7c, 0x1e, 0x83, 0xfe, 0x62, 0x28, 0x06, 0x1e, 0xc1, 0xfe, 0x64, 0x20, 0x06,
    0x7b, 0xe2, 0x0c, 0x3e, 0x87, 0xe2, 0xf0, 0x42, 0x90, 0xe0, 0x42, 0x15, 0x20, 0xd2, 0x05, 0x20,
    0x4f, 0x16, 0x20, 0x18, 0xcb, 0x4f, 0x06, 0x04, 0xc5, 0xcb, 0x11, 0x17, 0xc1, 0xcb, 0x11, 0x17,
    0x05, 0x20, 0xf5, 0x22, 0x23, 0x22, 0x23, 0xc9, 0xce, 0xed, 0x66, 0x66, 0xcc, 0x0d, 0x00, 0x0b,
    0x03, 0x73, 0x00, 0x83, 0x00, 0x0c, 0x00, 0x0d, 0x00, 0x08, 0x11, 0x1f, 0x88, 0x89, 0x00, 0x0e,
    0xdc, 0xcc, 0x6e, 0xe6, 0xdd, 0xdd, 0xd9, 0x99, 0xbb, 0xbb, 0x67, 0x63, 0x6e, 0x0e, 0xec, 0xcc,
    0xdd, 0xdc, 0x99, 0x9f, 0xbb, 0xb9, 0x33, 0x3e, 0x3c, 0x42, 0xb9, 0xa5, 0xb9, 0xa5, 0x42, 0x3c,
    0x21, 0x04, 0x01, 0x11, 0xa8, 0x00, 0x1a, 0x13, 0xbe, 0x20, 0xfe, 0x23, 0x7d, 0xfe, 0x34, 0x20,
    0xf5, 0x06, 0x19, 0x78, 0x86, 0x23, 0x05, 0x20, 0xfb, 0x86, 0x20, 0xfe, 0x3e, 0x01, 0xe0, 0x50,
];

/// Enumeration describing the boot ROM that is going to be
/// loaded into the system at the start of execution.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BootRom {
    None,
    Dmg,
}

impl BootRom {
    pub fn description(&self) -> &'static str {
        match self {
            BootRom::None => "None",
            BootRom::Dmg => "DMG",
        }
    }

    /// Obtains the boot ROM image associated with the current
    /// selection, `None` in case no boot process is meant to run.
    pub fn data(&self) -> Option<&'static [u8]> {
        match self {
            BootRom::None => None,
            BootRom::Dmg => Some(&DMG_BOOT),
        }
    }
}

impl Display for BootRom {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::{BootRom, BOOT_LOGO_OFFSET, BOOT_LOGO_SIZE, DMG_BOOT};

    #[test]
    fn test_boot_data() {
        assert_eq!(BootRom::None.data(), None);
        assert_eq!(BootRom::Dmg.data().unwrap().len(), 256);
    }

    #[test]
    fn test_boot_logo() {
        // the logo bitmap starts with the well known 0xce 0xed
        // sequence and is 48 bytes long
        let logo = &DMG_BOOT[BOOT_LOGO_OFFSET..BOOT_LOGO_OFFSET + BOOT_LOGO_SIZE];
        assert_eq!(logo[0], 0xce);
        assert_eq!(logo[1], 0xed);
        assert_eq!(logo[47], 0x3e);
    }
}
