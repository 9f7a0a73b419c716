//! GIME configuration.

/// Silicon revision.
///
/// The two parts differ in horizontal timing for text modes and in which
/// timer register writes restart the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GimeVariant {
    /// 1986 GIME. Text modes sit four pixels further right; writing either
    /// timer register restarts the timer.
    Gime1986,
    /// 1987 GIME. Only writing $FF94 restarts the timer.
    #[default]
    Gime1987,
}

/// Construction-time options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GimeConfig {
    pub variant: GimeVariant,
    /// Internal character generator: 128 glyphs of 12 rows, one byte per
    /// row, MSB leftmost. Missing bytes render as blank rows.
    pub font: Vec<u8>,
}

/// Bytes in a complete font image.
pub const FONT_SIZE: usize = 128 * 12;
