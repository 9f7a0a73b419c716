//! The fundamental unit of time in the emulator.

/// A count of master clock ticks.
///
/// This is the fundamental unit of time in the emulator. All timing is
/// expressed in ticks of the master crystal oscillator. The machine's tick
/// counter only ever moves forward; chips read it, they never advance it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Signed distance from `base` to `self`.
    ///
    /// Save-states store pending events this way so that they can be
    /// re-anchored to whatever the clock reads at load time.
    #[must_use]
    pub const fn offset_from(self, base: Ticks) -> i64 {
        self.0.wrapping_sub(base.0) as i64
    }

    /// Inverse of [`offset_from`](Self::offset_from).
    #[must_use]
    pub const fn from_offset(base: Ticks, offset: i64) -> Self {
        Self(base.0.wrapping_add_signed(offset))
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::Add<u64> for Ticks {
    type Output = Self;

    fn add(self, rhs: u64) -> Self {
        Self(self.0 + rhs)
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::ops::AddAssign<u64> for Ticks {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_saturates() {
        assert_eq!(Ticks(3) - Ticks(5), Ticks::ZERO);
        assert_eq!(Ticks(5) - Ticks(3), Ticks(2));
    }

    #[test]
    fn offsets_reanchor() {
        let saved_now = Ticks(1_000);
        let pending = Ticks(1_250);
        let offset = pending.offset_from(saved_now);
        assert_eq!(offset, 250);
        assert_eq!(Ticks::from_offset(Ticks(40), offset), Ticks(290));

        let overdue = Ticks(990).offset_from(saved_now);
        assert_eq!(overdue, -10);
        assert_eq!(Ticks::from_offset(Ticks(40), overdue), Ticks(30));
    }
}
