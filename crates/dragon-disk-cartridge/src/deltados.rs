//! Premier DeltaDOS.
//!
//! No interrupt wiring. A2 splits the I/O window between the WD2791 (A0-A1
//! select its register) and a write-only drive latch:
//!
//! | Bit | Function |
//! |-----|----------|
//! | 0-1 | Drive select |
//! | 2   | Side select |
//! | 3   | Single density (DDEN = !D3) |

use crate::{Latch, Region};

pub(crate) fn decode(address: u16) -> Region {
    if address & 4 == 0 {
        Region::Fdc((address & 3) as u8)
    } else {
        Region::Latch
    }
}

pub(crate) fn latch(value: u8) -> Latch {
    Latch {
        drive: value & 3,
        side: Some((value >> 2) & 1),
        dden: value & 0x08 == 0,
        motor: None,
        precomp: false,
        nmi_enable: false,
        halt_enable: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a2_selects_latch() {
        assert_eq!(decode(0xff40), Region::Fdc(0));
        assert_eq!(decode(0xff43), Region::Fdc(3));
        assert_eq!(decode(0xff44), Region::Latch);
        // Incomplete decode: the window repeats every 8 bytes.
        assert_eq!(decode(0xff4b), Region::Fdc(3));
        assert_eq!(decode(0xff5c), Region::Latch);
    }

    #[test]
    fn latch_bits() {
        let l = latch(0x06);
        assert_eq!(l.drive, 2);
        assert_eq!(l.side, Some(1));
        assert!(l.dden);
        assert!(!latch(0x08).dden);
        assert_eq!(latch(0x08).side, Some(0));
    }
}
