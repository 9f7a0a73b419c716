//! Disk system cartridges for the Dragon and Tandy Colour Computer.
//!
//! Each cartridge carries a DOS ROM, a Western Digital floppy controller
//! and a write-only drive latch. The cartridge I/O window ($FF40-$FF5F,
//! the SCS or P2 select) is only partly decoded, so the controller's four
//! registers and the latch repeat throughout it. Which address bit splits
//! them, and what each latch bit does, depends on the DOS:
//!
//! | System    | Controller | Latch   | Interrupts |
//! |-----------|------------|---------|------------|
//! | DeltaDOS  | A2 clear   | A2 set  | none |
//! | DragonDOS | A3 clear   | A3 set  | INTRQ → NMI (gated), DRQ → FIRQ |
//! | RS-DOS    | A3 set     | A3 clear| INTRQ → NMI, DRQ releases HALT |
//!
//! The controller and the drives are supplied by the machine through the
//! [`FloppyController`] and [`DriveInterface`] traits. The controller's
//! INTRQ and DRQ outputs come back in through [`DiskCartridge::intrq`] and
//! [`DiskCartridge::drq`]; the resulting CPU lines are read with
//! [`DiskCartridge::nmi`], [`DiskCartridge::firq`] and
//! [`DiskCartridge::halt`].

mod deltados;
mod dragondos;
mod rsdos;

use emu_core::state::{self, Field};
use emu_core::{Observable, StateError, Ticks, Value};

/// Largest DOS ROM the cartridge decodes.
pub const MAX_ROM_SIZE: usize = 0x4000;

/// Cartridge select line asserted by a bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartSelect {
    /// CTS (R2): the ROM area, $C000-$FEFF.
    Rom,
    /// SCS (P2): the I/O window, $FF40-$FF5F.
    Io,
}

/// Which disk system the cartridge implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiskSystem {
    /// Premier DeltaDOS (Dragon).
    DeltaDos,
    /// DragonDOS (Dragon Data).
    DragonDos,
    /// Tandy RS-DOS (CoCo FD-500).
    RsDos,
}

impl DiskSystem {
    fn name(self) -> &'static str {
        match self {
            Self::DeltaDos => "DeltaDOS",
            Self::DragonDos => "DragonDOS",
            Self::RsDos => "RS-DOS",
        }
    }

    fn decode(self, address: u16) -> Region {
        match self {
            Self::DeltaDos => deltados::decode(address),
            Self::DragonDos => dragondos::decode(address),
            Self::RsDos => rsdos::decode(address),
        }
    }

    fn latch(self, value: u8) -> Latch {
        match self {
            Self::DeltaDos => deltados::latch(value),
            Self::DragonDos => dragondos::latch(value),
            Self::RsDos => rsdos::latch(value),
        }
    }
}

/// The floppy disk controller (a WD279x or WD179x).
pub trait FloppyController {
    /// Read register 0-3.
    fn read(&mut self, register: u8) -> u8;
    /// Write register 0-3.
    fn write(&mut self, register: u8, value: u8);
    /// Double density enable (the inverse of the latch's density bit).
    fn set_dden(&mut self, dden: bool);

    fn reset(&mut self) {}

    /// Drive status lines, passed through from the selected drive.
    fn track0(&mut self, _level: bool) {}
    fn index_pulse(&mut self, _level: bool) {}
    fn write_protect(&mut self, _level: bool) {}
}

/// The drive mechanisms behind the controller.
pub trait DriveInterface {
    fn set_drive(&mut self, drive: u8);
    fn set_side(&mut self, side: u8);
    fn set_density(&mut self, dden: bool);
    fn set_motor(&mut self, _on: bool) {}
}

/// Cartridge assembly errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CartError {
    #[error("disk cartridge has no {0}")]
    MissingComponent(&'static str),
    #[error("DOS ROM is {len} bytes, the cartridge decodes {max}")]
    RomTooLarge { len: usize, max: usize },
}

/// Where a P2 access lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Region {
    /// Controller register 0-3.
    Fdc(u8),
    Latch,
}

/// Signals decoded from a latch value. `None` where the system has no such
/// bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Latch {
    pub drive: u8,
    pub side: Option<u8>,
    pub dden: bool,
    pub motor: Option<bool>,
    pub precomp: bool,
    pub nmi_enable: bool,
    pub halt_enable: bool,
}

/// Everything a save-state captures. Latch-derived signals that don't gate
/// interrupts are recomputed from `latch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CartState {
    latch: u8,
    nmi_enable: bool,
    halt_enable: bool,
    intrq: bool,
    drq: bool,
    nmi: bool,
    firq: bool,
    halt: bool,
}

const CART_FIELDS: &[Field<CartState>] = &[
    Field {
        id: 1,
        save: |s, f| f.put_u8(s.latch),
        load: |s, f| s.latch = f.get_u8(),
    },
    Field {
        id: 2,
        save: |s, f| {
            f.put_bool(s.nmi_enable);
            f.put_bool(s.halt_enable);
        },
        load: |s, f| {
            s.nmi_enable = f.get_bool();
            s.halt_enable = f.get_bool();
        },
    },
    Field {
        id: 3,
        save: |s, f| {
            f.put_bool(s.intrq);
            f.put_bool(s.drq);
        },
        load: |s, f| {
            s.intrq = f.get_bool();
            s.drq = f.get_bool();
        },
    },
    Field {
        id: 4,
        save: |s, f| {
            f.put_bool(s.nmi);
            f.put_bool(s.firq);
            f.put_bool(s.halt);
        },
        load: |s, f| {
            s.nmi = f.get_bool();
            s.firq = f.get_bool();
            s.halt = f.get_bool();
        },
    },
];

/// Assembles a [`DiskCartridge`] from its parts.
pub struct CartBuilder {
    system: DiskSystem,
    rom: Vec<u8>,
    fdc: Option<Box<dyn FloppyController>>,
    drives: Option<Box<dyn DriveInterface>>,
}

impl CartBuilder {
    #[must_use]
    pub fn new(system: DiskSystem) -> Self {
        Self {
            system,
            rom: Vec::new(),
            fdc: None,
            drives: None,
        }
    }

    #[must_use]
    pub fn rom(mut self, rom: Vec<u8>) -> Self {
        self.rom = rom;
        self
    }

    #[must_use]
    pub fn controller(mut self, fdc: impl FloppyController + 'static) -> Self {
        self.fdc = Some(Box::new(fdc));
        self
    }

    #[must_use]
    pub fn drives(mut self, drives: impl DriveInterface + 'static) -> Self {
        self.drives = Some(Box::new(drives));
        self
    }

    /// Check the parts and build the cartridge, with its latch cleared as
    /// after a reset.
    pub fn finish(self) -> Result<DiskCartridge, CartError> {
        let fdc = self
            .fdc
            .ok_or(CartError::MissingComponent("floppy controller"))?;
        let drives = self
            .drives
            .ok_or(CartError::MissingComponent("drive interface"))?;
        if self.rom.len() > MAX_ROM_SIZE {
            return Err(CartError::RomTooLarge {
                len: self.rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let mut cart = DiskCartridge {
            system: self.system,
            rom: self.rom,
            fdc,
            drives,
            state: CartState::default(),
        };
        cart.write_latch(0);
        Ok(cart)
    }
}

/// A disk system cartridge.
pub struct DiskCartridge {
    system: DiskSystem,
    rom: Vec<u8>,
    fdc: Box<dyn FloppyController>,
    drives: Box<dyn DriveInterface>,
    state: CartState,
}

impl DiskCartridge {
    /// Cartridge reset line: clear the latch and reset the controller.
    pub fn reset(&mut self) {
        self.fdc.reset();
        self.state.intrq = false;
        self.state.drq = false;
        self.write_latch(0);
    }

    /// A read cycle with `select` asserted. `None` where the cartridge
    /// doesn't drive the bus.
    pub fn read(&mut self, select: CartSelect, address: u16) -> Option<u8> {
        match select {
            CartSelect::Rom => self.rom.get(usize::from(address) & (MAX_ROM_SIZE - 1)).copied(),
            CartSelect::Io => match self.system.decode(address) {
                Region::Fdc(register) => Some(self.fdc.read(register)),
                Region::Latch => None,
            },
        }
    }

    /// A write cycle with `select` asserted.
    pub fn write(&mut self, select: CartSelect, address: u16, value: u8) {
        if select == CartSelect::Rom {
            return;
        }
        match self.system.decode(address) {
            Region::Fdc(register) => self.fdc.write(register, value),
            Region::Latch => self.write_latch(value),
        }
    }

    fn write_latch(&mut self, value: u8) {
        if value != self.state.latch {
            log::debug!("{} latch {:02x} -> {value:02x}", self.system.name(), self.state.latch);
        }
        self.state.latch = value;
        let latch = self.forward_latch();
        self.state.nmi_enable = latch.nmi_enable;
        self.state.halt_enable = latch.halt_enable;
        self.update_lines();
    }

    /// Send the latch's drive outputs to the drives and controller.
    fn forward_latch(&mut self) -> Latch {
        let latch = self.system.latch(self.state.latch);
        self.drives.set_drive(latch.drive);
        if let Some(side) = latch.side {
            self.drives.set_side(side);
        }
        if let Some(on) = latch.motor {
            self.drives.set_motor(on);
        }
        self.drives.set_density(latch.dden);
        self.fdc.set_dden(latch.dden);
        latch
    }

    /// Controller INTRQ output.
    pub fn intrq(&mut self, level: bool) {
        self.state.intrq = level;
        if level && self.system == DiskSystem::RsDos {
            self.state.halt_enable = false;
        }
        self.update_lines();
    }

    /// Controller DRQ output.
    pub fn drq(&mut self, level: bool) {
        self.state.drq = level;
        self.update_lines();
    }

    fn update_lines(&mut self) {
        let s = &mut self.state;
        (s.nmi, s.firq, s.halt) = match self.system {
            DiskSystem::DeltaDos => (false, false, false),
            DiskSystem::DragonDos => (s.intrq && s.nmi_enable, s.drq, false),
            DiskSystem::RsDos => (s.intrq, false, s.halt_enable && !s.drq),
        };
    }

    pub fn track0(&mut self, level: bool) {
        self.fdc.track0(level);
    }

    pub fn index_pulse(&mut self, level: bool) {
        self.fdc.index_pulse(level);
    }

    pub fn write_protect(&mut self, level: bool) {
        self.fdc.write_protect(level);
    }

    #[must_use]
    pub fn system(&self) -> DiskSystem {
        self.system
    }

    #[must_use]
    pub fn latch(&self) -> u8 {
        self.state.latch
    }

    #[must_use]
    pub fn precomp(&self) -> bool {
        self.system.latch(self.state.latch).precomp
    }

    #[must_use]
    pub fn nmi(&self) -> bool {
        self.state.nmi
    }

    /// Cartridge FIRQ (CART line).
    #[must_use]
    pub fn firq(&self) -> bool {
        self.state.firq
    }

    #[must_use]
    pub fn halt(&self) -> bool {
        self.state.halt
    }

    /// Encode the latch and interrupt gating. The controller and drives
    /// save their own state.
    #[must_use]
    pub fn save_state(&self, now: Ticks) -> Vec<u8> {
        state::save_state(&self.state, CART_FIELDS, now)
    }

    /// Restore state saved by [`save_state`](Self::save_state) and replay
    /// the restored latch to the drives and controller. On error the
    /// cartridge is unchanged and nothing is forwarded.
    pub fn load_state(&mut self, data: &[u8], now: Ticks) -> Result<(), StateError> {
        state::load_state(&mut self.state, CART_FIELDS, data, now)?;
        self.forward_latch();
        Ok(())
    }
}

impl Observable for DiskCartridge {
    fn query(&self, path: &str) -> Option<Value> {
        let latch = self.system.latch(self.state.latch);
        match path {
            "system" => Some(self.system.name().into()),
            "latch" => Some(self.state.latch.into()),
            "drive" => Some(latch.drive.into()),
            "side" => Some(latch.side.unwrap_or(0).into()),
            "dden" => Some(latch.dden.into()),
            "motor" => Some(latch.motor.unwrap_or(true).into()),
            "precomp" => Some(latch.precomp.into()),
            "nmi_enable" => Some(self.state.nmi_enable.into()),
            "halt_enable" => Some(self.state.halt_enable.into()),
            "intrq" => Some(self.state.intrq.into()),
            "drq" => Some(self.state.drq.into()),
            "nmi" => Some(self.state.nmi.into()),
            "firq" => Some(self.state.firq.into()),
            "halt" => Some(self.state.halt.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "system",
            "latch",
            "drive",
            "side",
            "dden",
            "motor",
            "precomp",
            "nmi_enable",
            "halt_enable",
            "intrq",
            "drq",
            "nmi",
            "firq",
            "halt",
        ]
    }
}
