//! Line and field timing.
//!
//! All values are in master ticks (14.31818 MHz) or scanlines. A line is
//! 912 ticks from one horizontal sync fall to the next:
//!
//! ```text
//! 0        64          136                                888   912
//! | hsync  | back porch | left border | active | right border | fp |
//! ```
//!
//! The pixel buffer starts at the left border and holds one pixel per tick.
//! Left border, active area and right border always add up to
//! [`LINE_PIXELS`]; only the split changes with mode and revision.

use crate::config::GimeVariant;

pub const TICKS_PER_LINE: u64 = 912;
/// Horizontal sync pulse width.
pub const HSYNC_TICKS: u64 = 64;
/// Offset of the first buffered pixel from hsync fall.
pub const LEFT_BORDER_START: u64 = 136;
/// Buffered pixels per line: left border to end of right border.
pub const LINE_PIXELS: usize = 752;
/// Front porch after the right border.
pub const FRONT_PORCH: u64 = TICKS_PER_LINE - LEFT_BORDER_START - LINE_PIXELS as u64;

/// Vertical sync pulse.
pub const SYNC_PULSE_LINES: u16 = 3;
/// Blanked lines after vertical sync.
pub const SYNC_BLANK_LINES: u16 = 13;
pub const NTSC_FIELD_LINES: u16 = 262;
pub const PAL_FIELD_LINES: u16 = 312;

/// Active lines selected by LPF in native modes.
pub const ACTIVE_LINES: [u16; 4] = [192, 200, 210, 225];
/// Top border lines for each LPF setting, 60 Hz.
pub const TOP_BORDER_NTSC: [u16; 4] = [25, 21, 16, 8];
/// Top border lines for each LPF setting, 50 Hz.
pub const TOP_BORDER_PAL: [u16; 4] = [63, 59, 54, 46];

/// Fields between blink phase changes.
pub const BLINK_FIELDS: u32 = 16;

/// Horizontal layout of one line, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizontalProfile {
    pub left_border: u16,
    pub active: u16,
    pub right_border: u16,
    /// Offset of the vertical border event from hsync fall. Never later
    /// than [`LEFT_BORDER_START`].
    pub vborder: u16,
}

const fn profile(left_border: u16, active: u16, right_border: u16, vborder: u16) -> HorizontalProfile {
    HorizontalProfile {
        left_border,
        active,
        right_border,
        vborder,
    }
}

/// 1987 part, indexed by `[wide][graphics]`.
const PROFILES_1987: [[HorizontalProfile; 2]; 2] = [
    [profile(120, 512, 120, 128), profile(120, 512, 120, 128)],
    [profile(56, 640, 56, 120), profile(56, 640, 56, 120)],
];

/// 1986 part: text modes start four pixels later.
const PROFILES_1986: [[HorizontalProfile; 2]; 2] = [
    [profile(124, 512, 116, 132), profile(120, 512, 120, 128)],
    [profile(60, 640, 52, 124), profile(56, 640, 56, 120)],
];

/// Horizontal layout for a mode.
#[must_use]
pub const fn horizontal_profile(variant: GimeVariant, wide: bool, graphics: bool) -> HorizontalProfile {
    let table = match variant {
        GimeVariant::Gime1986 => &PROFILES_1986,
        GimeVariant::Gime1987 => &PROFILES_1987,
    };
    table[wide as usize][graphics as usize]
}
