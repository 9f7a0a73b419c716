//! Master crystal.

use crate::Ticks;

/// The crystal every tick counts.
///
/// Chips are written in ticks; the clock only matters where emulated time
/// meets real time (frame pacing, drive rotation, audio rates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    pub frequency_hz: u64,
}

impl MasterClock {
    /// 4 × NTSC colour subcarrier: CoCo 3, NTSC Dragon and CoCo 1/2.
    pub const NTSC: Self = Self::new(14_318_180);
    /// 4 × PAL colour subcarrier, as fitted to PAL Dragons.
    pub const PAL: Self = Self::new(17_734_475);

    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Whole ticks in `microseconds`, rounded down.
    #[must_use]
    pub const fn ticks_in_us(&self, microseconds: u64) -> Ticks {
        Ticks::new(self.frequency_hz * microseconds / 1_000_000)
    }

    /// Microseconds spanned by `ticks`, rounded down.
    #[must_use]
    pub const fn us_in_ticks(&self, ticks: Ticks) -> u64 {
        ticks.get() * 1_000_000 / self.frequency_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ntsc_line_is_912_ticks() {
        // 63.695 µs.
        assert_eq!(MasterClock::NTSC.us_in_ticks(Ticks(912)), 63);
        assert_eq!(MasterClock::NTSC.ticks_in_us(64), Ticks(916));
    }

    #[test]
    fn conversions_round_down() {
        let clock = MasterClock::new(3);
        assert_eq!(clock.ticks_in_us(1), Ticks::ZERO);
        assert_eq!(clock.us_in_ticks(Ticks(2)), 666_666);
    }
}
