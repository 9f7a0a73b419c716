//! DragonDOS.
//!
//! A3 splits the I/O window: WD2797 registers below, the drive latch above.
//! INTRQ reaches the CPU's NMI only while the latch enables it; DRQ drives
//! the cartridge FIRQ line directly.
//!
//! | Bit | Function |
//! |-----|----------|
//! | 0-1 | Drive select |
//! | 2   | Motor on |
//! | 3   | Single density (DDEN = !D3) |
//! | 4   | Write precompensation |
//! | 5   | NMI enable |

use crate::{Latch, Region};

pub(crate) fn decode(address: u16) -> Region {
    if address & 8 == 0 {
        Region::Fdc((address & 3) as u8)
    } else {
        Region::Latch
    }
}

pub(crate) fn latch(value: u8) -> Latch {
    Latch {
        drive: value & 3,
        side: None,
        dden: value & 0x08 == 0,
        motor: Some(value & 0x04 != 0),
        precomp: value & 0x10 != 0,
        nmi_enable: value & 0x20 != 0,
        halt_enable: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a3_selects_latch() {
        assert_eq!(decode(0xff40), Region::Fdc(0));
        assert_eq!(decode(0xff46), Region::Fdc(2));
        assert_eq!(decode(0xff48), Region::Latch);
        assert_eq!(decode(0xff4f), Region::Latch);
    }

    #[test]
    fn latch_bits() {
        let l = latch(0x25);
        assert_eq!(l.drive, 1);
        assert_eq!(l.motor, Some(true));
        assert!(l.nmi_enable);
        assert!(l.dden);
        assert!(!l.precomp);
        assert_eq!(l.side, None);

        let l = latch(0x18);
        assert!(!l.dden);
        assert!(l.precomp);
        assert!(!l.nmi_enable);
        assert_eq!(l.motor, Some(false));
    }
}
