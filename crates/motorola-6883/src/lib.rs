//! Motorola MC6883 SAM (Synchronous Address Multiplexer).
//!
//! The SAM sits between the 6809, the VDG and dynamic RAM in the Dragon and
//! Tandy CoCo 1/2. For every CPU bus cycle it decodes the address into an
//! S (select) code, multiplexes RAM row/column addresses, and decides
//! whether the cycle runs at the slow (0.89 MHz) or fast (1.78 MHz) rate.
//! It also generates video addresses for the VDG from an internal counter.
//!
//! # Standalone IC
//!
//! The SAM does not own RAM or the CPU. [`Sam::mem_cycle`] reports what the
//! cycle selects and how long it lasts by calling a delegate, and the
//! machine performs the actual data transfer.
//!
//! # Mode register
//!
//! Sixteen bits, written one bit at a time through $FFC0-$FFDF: even
//! addresses clear, odd addresses set, bit index `(A >> 1) & 15`. Data is
//! ignored. The register cannot be read by the CPU.
//!
//! | Bits  | Name  | Function |
//! |-------|-------|----------|
//! | 0-2   | V0-V2 | VDG addressing mode |
//! | 3-9   | F0-F6 | Display offset (×512) |
//! | 10    | P1    | Page select (64K) |
//! | 11-12 | R0-R1 | MPU rate |
//! | 13-14 | M0-M1 | Memory size |
//! | 15    | TY    | Map type (1 = all RAM) |
//!
//! # Timing
//!
//! Cycle lengths are in master ticks (14.31818 MHz). A slow cycle is 16
//! ticks and a fast one 8, with transition penalties when the rate changes.
//! See [`Sam::mem_cycle`].

mod counter;

use emu_core::state::{self, Field};
use emu_core::{Observable, StateError, Ticks, Value};

pub use counter::{HsyncClear, Node, Stage, VdgCounter, XDiv, YDiv, NODES};

/// Slow cycle following a slow cycle.
pub const SLOW_TO_SLOW: u32 = 16;
/// Fast cycle following a slow cycle.
pub const SLOW_TO_FAST: u32 = 15;
/// Slow cycle following a fast cycle.
pub const FAST_TO_SLOW: u32 = 17;
/// Slow cycle following a fast cycle that left the interleave out of step.
pub const FAST_TO_SLOW_EXTENDED: u32 = 25;
/// Fast cycle following a fast cycle.
pub const FAST_TO_FAST: u32 = 8;

/// S code for each 32-byte block of $FF00-$FFFF.
const IO_S: [u8; 8] = [4, 5, 6, 7, 7, 7, 7, 2];

/// S code of a RAM read.
pub const S_RAM_READ: u8 = 0;
/// S code of a RAM write.
pub const S_RAM_WRITE: u8 = 7;

/// MPU rate selected by R0-R1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpuRate {
    Slow,
    /// ROM and I/O (except $FF00-$FF1F) fast, RAM slow.
    AddressDependent,
    Fast,
}

/// RAM size selected by M0-M1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySize {
    K4,
    K16,
    K64,
    /// M=3: static RAM. Translated the same as 64K.
    K64Static,
}

impl MemorySize {
    fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => Self::K4,
            1 => Self::K16,
            2 => Self::K64,
            _ => Self::K64Static,
        }
    }
}

/// Row/column multiplexing for one memory size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RamMux {
    row_mask: u16,
    col_shift: u8,
    col_mask: u16,
    /// CPU address bit that selects the second bank (RAS1).
    ras1_bit: u16,
}

impl RamMux {
    const fn for_size(size: MemorySize) -> Self {
        match size {
            MemorySize::K4 => Self {
                row_mask: 0x3f,
                col_shift: 6,
                col_mask: 0x3f,
                ras1_bit: 0x1000,
            },
            MemorySize::K16 => Self {
                row_mask: 0x7f,
                col_shift: 7,
                col_mask: 0x7f,
                ras1_bit: 0x4000,
            },
            MemorySize::K64 | MemorySize::K64Static => Self {
                row_mask: 0xff,
                col_shift: 8,
                col_mask: 0xff,
                ras1_bit: 0,
            },
        }
    }

    fn translate(self, a: u16) -> u16 {
        let mut z = (((a >> self.col_shift) & self.col_mask) << 8) | (a & self.row_mask);
        if a & self.ras1_bit != 0 {
            z |= 0x8080;
        }
        z
    }
}

/// One decoded bus cycle, as passed to the CPU-cycle delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamCycle {
    /// Cycle length in master ticks.
    pub ncycles: u32,
    pub rnw: bool,
    pub address: u16,
    /// Select code driven on S0-S2.
    pub s: u8,
    /// Multiplexed RAM address, for RAM cycles.
    pub ram_address: Option<u16>,
}

/// The SAM.
#[derive(Debug, Clone)]
pub struct Sam {
    register: u16,
    mux: RamMux,
    page_bit: bool,
    map_type_1: bool,
    rate: MpuRate,

    running_fast: bool,
    extend_slow_cycle: bool,

    counter: VdgCounter,
    hsync: bool,
    fsync: bool,
}

impl Default for Sam {
    fn default() -> Self {
        Self::new()
    }
}

impl Sam {
    #[must_use]
    pub fn new() -> Self {
        let mut sam = Self {
            register: 0,
            mux: RamMux::for_size(MemorySize::K4),
            page_bit: false,
            map_type_1: false,
            rate: MpuRate::Slow,
            running_fast: false,
            extend_slow_cycle: false,
            counter: VdgCounter::new(),
            hsync: true,
            fsync: false,
        };
        sam.decode_register();
        sam
    }

    /// Power-on state: register clear, slow rate, counter zeroed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// One CPU bus cycle.
    ///
    /// Decodes `address`, works out the cycle length and calls `cpu_cycle`
    /// with the result, which is also returned. A write into $FFC0-$FFDF
    /// changes the mode register once the delegate has returned, so the
    /// cycle that performs the write is timed under the old mode.
    ///
    /// | Previous | This  | Ticks |
    /// |----------|-------|-------|
    /// | slow     | slow  | 16    |
    /// | slow     | fast  | 15    |
    /// | fast     | slow  | 17, or 25 if the interleave was extended |
    /// | fast     | fast  | 8, toggles the extend flag |
    pub fn mem_cycle(
        &mut self,
        rnw: bool,
        address: u16,
        mut cpu_cycle: impl FnMut(&SamCycle),
    ) -> SamCycle {
        let (s, ram_address, wants_fast) = self.decode(rnw, address);
        let ncycles = self.cycle_length(wants_fast);
        let cycle = SamCycle {
            ncycles,
            rnw,
            address,
            s,
            ram_address,
        };
        cpu_cycle(&cycle);

        if !rnw && (0xffc0..=0xffdf).contains(&address) {
            let bit = 1u16 << ((address >> 1) & 15);
            let value = if address & 1 != 0 {
                self.register | bit
            } else {
                self.register & !bit
            };
            self.set_register(value);
        }
        cycle
    }

    fn decode(&self, rnw: bool, a: u16) -> (u8, Option<u16>, bool) {
        let fast_rom = match self.rate {
            MpuRate::Slow => false,
            MpuRate::AddressDependent | MpuRate::Fast => true,
        };
        if a >= 0xff00 {
            let s = IO_S[usize::from((a >> 5) & 7)];
            let fast = self.rate == MpuRate::Fast || (fast_rom && s != 4);
            return (s, None, fast);
        }
        if a >= 0x8000 && !self.map_type_1 {
            let s = match a {
                0x8000..=0x9fff => 1,
                0xa000..=0xbfff => 2,
                _ => 3,
            };
            return (s, None, fast_rom);
        }
        let s = if rnw { S_RAM_READ } else { S_RAM_WRITE };
        (s, Some(self.ram_address(a)), self.rate == MpuRate::Fast)
    }

    fn cycle_length(&mut self, fast: bool) -> u32 {
        let ncycles = match (self.running_fast, fast) {
            (false, false) => SLOW_TO_SLOW,
            (false, true) => SLOW_TO_FAST,
            (true, false) => {
                let extended = std::mem::take(&mut self.extend_slow_cycle);
                if extended {
                    FAST_TO_SLOW_EXTENDED
                } else {
                    FAST_TO_SLOW
                }
            }
            (true, true) => {
                self.extend_slow_cycle = !self.extend_slow_cycle;
                FAST_TO_FAST
            }
        };
        self.running_fast = fast;
        ncycles
    }

    /// Multiplexed RAM address for a CPU access to `a`.
    #[must_use]
    pub fn ram_address(&self, a: u16) -> u16 {
        let z = self.mux.translate(a);
        if self.page_bit && !self.map_type_1 && a < 0x8000 {
            z | 0x8000
        } else {
            z
        }
    }

    /// Multiplexed RAM address of the current VDG fetch. The page bit only
    /// affects CPU accesses.
    #[must_use]
    pub fn vdg_ram_address(&self) -> u16 {
        self.mux.translate(self.counter.address())
    }

    /// Raw VDG address counter (V0-V15).
    #[must_use]
    pub fn vdg_address(&self) -> u16 {
        self.counter.address()
    }

    /// The VDG fetched `nbytes`. Returns how many it actually advanced,
    /// which stops short at a 16-byte boundary.
    pub fn vdg_bytes(&mut self, nbytes: u16) -> u16 {
        self.counter.advance(nbytes)
    }

    /// VDG horizontal sync line. The falling edge clears low counter bits.
    pub fn vdg_hsync(&mut self, level: bool) {
        let falling = self.hsync && !level;
        self.hsync = level;
        if falling {
            self.counter.hsync_clear(HsyncClear::for_mode(self.vdg_mode()));
        }
    }

    /// VDG field sync line. The rising edge reloads the counter from F.
    pub fn vdg_fsync(&mut self, level: bool) {
        let rising = !self.fsync && level;
        self.fsync = level;
        if rising {
            self.counter.reset(self.display_base());
        }
    }

    #[must_use]
    pub fn register(&self) -> u16 {
        self.register
    }

    /// Replace the whole mode register, re-wiring the VDG counter as a
    /// sequence of bit writes would.
    pub fn set_register(&mut self, value: u16) {
        if value != self.register {
            log::trace!("SAM register {:04x} -> {:04x}", self.register, value);
        }
        self.register = value;
        self.decode_register();
        self.counter.set_mode(self.vdg_mode());
    }

    fn decode_register(&mut self) {
        self.mux = RamMux::for_size(self.memory_size());
        self.page_bit = self.register & 0x0400 != 0;
        self.map_type_1 = self.register & 0x8000 != 0;
        self.rate = match (self.register >> 11) & 3 {
            0 => MpuRate::Slow,
            1 => MpuRate::AddressDependent,
            _ => MpuRate::Fast,
        };
    }

    /// VDG addressing mode (V0-V2).
    #[must_use]
    pub fn vdg_mode(&self) -> u8 {
        (self.register & 7) as u8
    }

    /// Display offset in bytes (F0-F6 × 512).
    #[must_use]
    pub fn display_base(&self) -> u16 {
        ((self.register >> 3) & 0x7f) << 9
    }

    #[must_use]
    pub fn memory_size(&self) -> MemorySize {
        MemorySize::from_bits(self.register >> 13)
    }

    #[must_use]
    pub fn mpu_rate(&self) -> MpuRate {
        self.rate
    }

    #[must_use]
    pub fn map_type_1(&self) -> bool {
        self.map_type_1
    }

    /// Whether the last cycle ran at the fast rate.
    #[must_use]
    pub fn running_fast(&self) -> bool {
        self.running_fast
    }

    #[must_use]
    pub fn extend_slow_cycle(&self) -> bool {
        self.extend_slow_cycle
    }

    #[must_use]
    pub fn counter(&self) -> &VdgCounter {
        &self.counter
    }

    /// Encode the SAM's state. The SAM has no pending events, so `now` only
    /// frames the stream.
    #[must_use]
    pub fn save_state(&self, now: Ticks) -> Vec<u8> {
        state::save_state(self, SAM_FIELDS, now)
    }

    /// Restore state saved by [`save_state`](Self::save_state). On error
    /// the SAM is unchanged.
    pub fn load_state(&mut self, data: &[u8], now: Ticks) -> Result<(), StateError> {
        state::load_state(self, SAM_FIELDS, data, now)?;
        self.decode_register();
        self.counter.force_mode(self.vdg_mode());
        Ok(())
    }
}

const SAM_FIELDS: &[Field<Sam>] = &[
    Field {
        id: 1,
        save: |s, f| f.put_u16(s.register),
        load: |s, f| s.register = f.get_u16(),
    },
    Field {
        id: 2,
        save: |s, f| f.put_bool(s.running_fast),
        load: |s, f| s.running_fast = f.get_bool(),
    },
    Field {
        id: 3,
        save: |s, f| f.put_bool(s.extend_slow_cycle),
        load: |s, f| s.extend_slow_cycle = f.get_bool(),
    },
    Field {
        id: 4,
        save: |s, f| {
            for node in NODES {
                let stage = s.counter.stage(node);
                f.put_u16(stage.value);
                f.put_bool(stage.input);
            }
        },
        load: |s, f| {
            for node in NODES {
                let value = f.get_u16();
                let input = f.get_bool();
                s.counter.load_stage(node, value, input);
            }
        },
    },
    Field {
        id: 5,
        save: |s, f| {
            f.put_bool(s.hsync);
            f.put_bool(s.fsync);
        },
        load: |s, f| {
            s.hsync = f.get_bool();
            s.fsync = f.get_bool();
        },
    },
];

impl Observable for Sam {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "register" => Some(self.register.into()),
            "vdg.mode" => Some(self.vdg_mode().into()),
            "vdg.base" => Some(self.display_base().into()),
            "vdg.address" => Some(self.counter.address().into()),
            "memory_size" => Some(
                match self.memory_size() {
                    MemorySize::K4 => "4K",
                    MemorySize::K16 => "16K",
                    MemorySize::K64 => "64K",
                    MemorySize::K64Static => "64K static",
                }
                .into(),
            ),
            "map_type" => Some(u8::from(self.map_type_1).into()),
            "page" => Some(self.page_bit.into()),
            "mpu_rate" => Some(
                match self.rate {
                    MpuRate::Slow => "slow",
                    MpuRate::AddressDependent => "address-dependent",
                    MpuRate::Fast => "fast",
                }
                .into(),
            ),
            "running_fast" => Some(self.running_fast.into()),
            "extend_slow_cycle" => Some(self.extend_slow_cycle.into()),
            "hsync" => Some(self.hsync.into()),
            "fsync" => Some(self.fsync.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "register",
            "vdg.mode",
            "vdg.base",
            "vdg.address",
            "memory_size",
            "map_type",
            "page",
            "mpu_rate",
            "running_fast",
            "extend_slow_cycle",
            "hsync",
            "fsync",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Set mode register bits the way the CPU does: one write per bit.
    fn poke_bits(sam: &mut Sam, bits: &[(u16, bool)]) {
        for &(bit, set) in bits {
            let addr = 0xffc0 + bit * 2 + u16::from(set);
            sam.mem_cycle(false, addr, |_| {});
        }
    }

    fn cycles(sam: &mut Sam, addr: u16) -> u32 {
        sam.mem_cycle(true, addr, |_| {}).ncycles
    }

    #[test]
    fn register_window_sets_and_clears_bits() {
        let mut sam = Sam::new();
        poke_bits(&mut sam, &[(15, true), (3, true), (0, true)]);
        assert_eq!(sam.register(), 0x8009);
        poke_bits(&mut sam, &[(3, false)]);
        assert_eq!(sam.register(), 0x8001);
        // Reads of the window do nothing.
        sam.mem_cycle(true, 0xffc1 + 4, |_| {});
        assert_eq!(sam.register(), 0x8001);
    }

    #[test]
    fn register_write_applies_after_delegate() {
        let mut sam = Sam::new();
        let mut seen = None;
        // Set R1 (bit 12): the write cycle itself is still slow.
        let cycle = sam.mem_cycle(false, 0xffd9, |c| seen = Some(c.ncycles));
        assert_eq!(seen, Some(SLOW_TO_SLOW));
        assert_eq!(cycle.ncycles, SLOW_TO_SLOW);
        assert_eq!(sam.mpu_rate(), MpuRate::Fast);
        assert_eq!(cycles(&mut sam, 0x1000), SLOW_TO_FAST);
    }

    #[test]
    fn select_codes() {
        let mut sam = Sam::new();
        let s = |sam: &mut Sam, rnw, a| sam.mem_cycle(rnw, a, |_| {}).s;
        assert_eq!(s(&mut sam, true, 0x0400), 0);
        assert_eq!(s(&mut sam, false, 0x0400), 7);
        assert_eq!(s(&mut sam, true, 0x8000), 1);
        assert_eq!(s(&mut sam, true, 0xa000), 2);
        assert_eq!(s(&mut sam, true, 0xc000), 3);
        assert_eq!(s(&mut sam, true, 0xfeff), 3);
        assert_eq!(s(&mut sam, true, 0xff00), 4);
        assert_eq!(s(&mut sam, true, 0xff20), 5);
        assert_eq!(s(&mut sam, true, 0xff40), 6);
        assert_eq!(s(&mut sam, true, 0xff60), 7);
        assert_eq!(s(&mut sam, true, 0xfffe), 2);

        // Map type 1: upper 32K is RAM, I/O unchanged.
        sam.set_register(0x8000);
        assert_eq!(s(&mut sam, true, 0xc000), 0);
        assert_eq!(s(&mut sam, false, 0x9000), 7);
        assert_eq!(s(&mut sam, true, 0xff00), 4);
    }

    #[test]
    fn cycle_transition_table() {
        let mut sam = Sam::new();
        assert_eq!(cycles(&mut sam, 0x0000), SLOW_TO_SLOW);

        // Address-dependent: ROM fast, RAM slow.
        sam.set_register(0x0800);
        assert_eq!(cycles(&mut sam, 0x8000), SLOW_TO_FAST);
        assert!(sam.running_fast());
        assert_eq!(cycles(&mut sam, 0x8000), FAST_TO_FAST);
        assert!(sam.extend_slow_cycle());
        assert_eq!(cycles(&mut sam, 0x8000), FAST_TO_FAST);
        assert!(!sam.extend_slow_cycle());
        assert_eq!(cycles(&mut sam, 0x0000), FAST_TO_SLOW);
        assert!(!sam.running_fast());
    }

    #[test]
    fn odd_fast_run_extends_next_slow_cycle() {
        let mut sam = Sam::new();
        sam.set_register(0x0800);
        assert_eq!(cycles(&mut sam, 0xa000), SLOW_TO_FAST);
        assert_eq!(cycles(&mut sam, 0xa000), FAST_TO_FAST);
        assert!(sam.extend_slow_cycle());
        assert_eq!(cycles(&mut sam, 0x0000), FAST_TO_SLOW_EXTENDED);
        assert!(!sam.extend_slow_cycle());
        // Extend flag only changes on fast→fast.
        assert_eq!(cycles(&mut sam, 0x0000), SLOW_TO_SLOW);
        assert_eq!(cycles(&mut sam, 0xa000), SLOW_TO_FAST);
        assert!(!sam.extend_slow_cycle());
    }

    #[test]
    fn address_dependent_keeps_pia0_slow() {
        let mut sam = Sam::new();
        sam.set_register(0x0800);
        assert_eq!(cycles(&mut sam, 0xff00), SLOW_TO_SLOW);
        assert_eq!(cycles(&mut sam, 0xff20), SLOW_TO_FAST);
        assert_eq!(cycles(&mut sam, 0xfffe), FAST_TO_FAST);
        // RAM stays slow.
        assert_eq!(cycles(&mut sam, 0x0000), FAST_TO_SLOW_EXTENDED);
    }

    #[test]
    fn r1_runs_everything_fast() {
        let mut sam = Sam::new();
        sam.set_register(0x1000);
        assert_eq!(cycles(&mut sam, 0x0000), SLOW_TO_FAST);
        assert_eq!(cycles(&mut sam, 0xff00), FAST_TO_FAST);
        assert_eq!(cycles(&mut sam, 0x4000), FAST_TO_FAST);
    }

    #[test]
    fn hsync_and_fsync_edges() {
        let mut sam = Sam::new();
        // Mode 6, F = 7.
        sam.set_register(0x0006 | (7 << 3));
        sam.vdg_fsync(true);
        assert_eq!(sam.vdg_address(), 0x0e00);
        // Level without an edge does nothing.
        sam.vdg_fsync(true);
        sam.vdg_bytes(0x0a);
        sam.vdg_fsync(true);
        assert_eq!(sam.vdg_address(), 0x0e0a);

        sam.vdg_hsync(false);
        assert_eq!(sam.vdg_address(), 0x0e00);
        sam.vdg_hsync(false);
        sam.vdg_hsync(true);
        assert_eq!(sam.vdg_address(), 0x0e00);
    }

    #[test]
    fn vdg_fetches_ignore_page_bit() {
        let mut sam = Sam::new();
        sam.set_register(0x4000 | 0x0400);
        assert_eq!(sam.ram_address(0x0400), 0x8400);
        sam.vdg_fsync(true);
        sam.set_register(0x4000 | 0x0400 | (2 << 3) | 6);
        sam.vdg_fsync(false);
        sam.vdg_fsync(true);
        assert_eq!(sam.vdg_ram_address(), 0x0400);
    }

    #[test]
    fn save_and_restore_mid_frame() {
        let mut sam = Sam::new();
        sam.set_register(0x2800 | 2);
        sam.vdg_fsync(true);
        sam.vdg_bytes(16);
        sam.vdg_bytes(7);
        cycles(&mut sam, 0x8000);
        cycles(&mut sam, 0x8000);
        let data = sam.save_state(Ticks(5_000));

        let mut restored = Sam::new();
        restored.load_state(&data, Ticks(9)).unwrap();
        assert_eq!(restored.register(), sam.register());
        assert_eq!(restored.vdg_address(), sam.vdg_address());
        assert_eq!(restored.counter(), sam.counter());
        assert_eq!(restored.extend_slow_cycle(), sam.extend_slow_cycle());

        for _ in 0..40 {
            assert_eq!(restored.vdg_bytes(5), sam.vdg_bytes(5));
            assert_eq!(restored.vdg_address(), sam.vdg_address());
        }
        assert_eq!(cycles(&mut restored, 0x0000), cycles(&mut sam, 0x0000));
    }

    #[test]
    fn bad_state_leaves_sam_untouched() {
        let mut sam = Sam::new();
        sam.set_register(0x1234);
        let data = sam.save_state(Ticks::ZERO);
        let mut other = Sam::new();
        assert!(other.load_state(&data[..data.len() - 1], Ticks::ZERO).is_err());
        assert_eq!(other.register(), 0);
    }

    #[test]
    fn queries() {
        let mut sam = Sam::new();
        sam.set_register(0x4800 | 4);
        assert_eq!(sam.query("register"), Some(Value::U16(0x4804)));
        assert_eq!(sam.query("memory_size"), Some(Value::from("64K")));
        assert_eq!(sam.query("mpu_rate"), Some(Value::from("address-dependent")));
        assert_eq!(sam.query("vdg.mode"), Some(Value::U8(4)));
        assert_eq!(sam.query("nonsense"), None);
        for path in sam.query_paths() {
            assert!(sam.query(path).is_some(), "{path}");
        }
    }
}
