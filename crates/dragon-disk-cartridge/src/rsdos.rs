//! Tandy RS-DOS (FD-500 controller).
//!
//! The latch sits below A3 and the WD1793 above it, the reverse of
//! DragonDOS. INTRQ drives NMI and clears the halt enable. While halt is
//! enabled, the CPU is halted until the controller raises DRQ.
//!
//! | Bit | Function |
//! |-----|----------|
//! | 0-2 | Drive select 0-2 (lowest set bit wins) |
//! | 3   | Motor on |
//! | 4   | Write precompensation |
//! | 5   | Single density (DDEN = !D5) |
//! | 6   | Side select (drive select 3) |
//! | 7   | Halt enable |

use crate::{Latch, Region};

pub(crate) fn decode(address: u16) -> Region {
    if address & 8 == 0 {
        Region::Latch
    } else {
        Region::Fdc((address & 3) as u8)
    }
}

pub(crate) fn latch(value: u8) -> Latch {
    let drive = match value & 7 {
        0 => 0,
        selected => selected.trailing_zeros() as u8,
    };
    Latch {
        drive,
        side: Some((value >> 6) & 1),
        dden: value & 0x20 == 0,
        motor: Some(value & 0x08 != 0),
        precomp: value & 0x10 != 0,
        nmi_enable: true,
        halt_enable: value & 0x80 != 0,
    }
}
