//! Tandy TCC1014 GIME (Graphics Interrupt Memory Enhancer).
//!
//! The GIME is the CoCo 3's custom chip. It replaces the SAM and VDG of
//! earlier machines: it maps 512K of physical memory into the CPU's 64K,
//! generates video in both CoCo-compatible and native modes, and raises
//! interrupts from a programmable timer, the borders and the keyboard and
//! cartridge lines.
//!
//! # Event-driven timing
//!
//! The chip is not ticked. It owns four [`Event`] records (horizontal sync
//! fall and rise, the vertical border point near the start of each line,
//! and the fast timer) which the machine places on its [`EventQueue`] and
//! hands back through [`Gime::handle_event`] as they come due.
//!
//! Video is rendered lazily into a one-line pixel buffer. Anything that can
//! change the picture first renders up to the current tick, so a mid-line
//! register write only affects pixels after that point. At horizontal sync
//! fall the finished line goes to [`GimeHost::render_line`].
//!
//! # Bus cycles
//!
//! [`Gime::mem_cycle`] decodes an address and reports what it selects; it
//! never transfers data. Register traffic goes through [`Gime::read`] and
//! [`Gime::write`], which the machine calls once it has advanced the clock
//! to the cycle and run any events due, so the chip always sees register
//! changes in tick order.
//!
//! # Registers
//!
//! | Address     | Name    | Notes |
//! |-------------|---------|-------|
//! | $FF90       | INIT0   | CoCo mode, MMU enable, IRQ/FIRQ enable, MC3, ROM map |
//! | $FF91       | INIT1   | Timer input select, MMU task |
//! | $FF92/$FF93 | IRQENR/FIRQENR | Source enables; reading acknowledges |
//! | $FF94/$FF95 | Timer   | 12-bit reload value |
//! | $FF98       | VMODE   | Graphics, 50 Hz, lines per row |
//! | $FF99       | VRES    | Lines per field, horizontal resolution, colours |
//! | $FF9A       | BRDR    | Border colour |
//! | $FF9C       | VSC     | Vertical fine scroll (CoCo mode) |
//! | $FF9D/$FF9E | VOFFSET | Display start ×8 |
//! | $FF9F       | HOFFSET | Horizontal offset, 256-byte rows |
//! | $FFA0-$FFAF | MMU     | Bank registers, two tasks of eight |
//! | $FFB0-$FFBF | Palette | 6-bit colours |
//! | $FFC0-$FFDF | SAM     | SAM-compatible set/clear bits |

mod config;
mod mode;
mod render;
mod savestate;
pub mod timing;

pub use config::{FONT_SIZE, GimeConfig, GimeVariant};
pub use mode::{Format, VDG_AG, VDG_CSS, VDG_GM, VideoMode};

use emu_core::{Event, EventQueue, Observable, StateError, Ticks, Value};
use mode::{INIT0_FEN, INIT0_IEN, INIT0_MC, INIT0_MC3, INIT0_MMUEN, INIT1_TINS, INIT1_TR, VMODE_H50};
use timing::{
    ACTIVE_LINES, HSYNC_TICKS, HorizontalProfile, LINE_PIXELS, NTSC_FIELD_LINES,
    PAL_FIELD_LINES, SYNC_BLANK_LINES, SYNC_PULSE_LINES, TICKS_PER_LINE, TOP_BORDER_NTSC,
    TOP_BORDER_PAL, horizontal_profile,
};

/// Timer expired.
pub const INT_TMR: u8 = 0x20;
/// Horizontal border (hsync fall).
pub const INT_HBORD: u8 = 0x10;
/// Vertical border (start of bottom border).
pub const INT_VBORD: u8 = 0x08;
/// Serial data input.
pub const INT_EI2: u8 = 0x04;
/// Keyboard.
pub const INT_EI1: u8 = 0x02;
/// Cartridge.
pub const INT_EI0: u8 = 0x01;

/// Ticks from reset to the first horizontal sync fall. Keeps line timing
/// off the CPU's cycle boundaries.
const RESET_HSYNC_DELAY: u64 = 2;

/// Cycle length with the SAM-compatible R1 bit set.
const FAST_CYCLE: u32 = 8;
const SLOW_CYCLE: u32 = 16;

/// The GIME's timed callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GimeEvent {
    HsFall,
    HsRise,
    VBorder,
    Timer,
}

/// What the GIME needs from the rest of the machine.
pub trait GimeHost {
    /// Read 16 bits of physical memory for video. `address` is even; the
    /// even byte is in the high half.
    fn fetch_video(&mut self, address: u32) -> u16;

    /// A finished line of resolved 6-bit colours.
    fn render_line(&mut self, scanline: u16, pixels: &[u8]);

    fn hsync(&mut self, _level: bool) {}
    fn fsync(&mut self, _level: bool) {}
    fn irq(&mut self, _level: bool) {}
    fn firq(&mut self, _level: bool) {}
}

/// Vertical position within the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalState {
    SyncPulse,
    SyncBlank,
    TopBorder,
    ActiveArea,
    BottomBorder,
}

/// Device selected by a bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Select {
    Ram,
    /// Internal ROM.
    Rom,
    /// Cartridge ROM (CTS).
    CartRom,
    /// $FF00-$FF1F.
    Pia0,
    /// $FF20-$FF3F.
    Pia1,
    /// $FF40-$FF5F (SCS).
    CartIo,
    /// GIME registers.
    Gime,
    Unused,
}

/// One decoded bus cycle, as passed to the CPU-cycle delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GimeCycle {
    /// Cycle length in master ticks.
    pub ncycles: u32,
    pub rnw: bool,
    pub address: u16,
    pub select: Select,
    /// 19-bit physical address for memory cycles, the CPU address for I/O.
    pub z: u32,
}

/// Border source latched at the start of each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Border {
    /// A 6-bit colour.
    Direct(u8),
    /// Resolved through the palette as each pixel is drawn.
    Palette(u8),
}

/// The GIME.
#[derive(Debug, Clone)]
pub struct Gime {
    variant: GimeVariant,
    font: Vec<u8>,

    regs: [u8; 16],
    mmu: [u8; 16],
    palette: [u8; 16],
    sam_register: u16,
    vdg_mode: u8,
    mode: VideoMode,

    irq_state: u8,
    firq_state: u8,
    irq: bool,
    firq: bool,

    timer_counter: u16,
    /// Tick the fast timer was last brought up to date.
    timer_last: Ticks,

    vstate: VerticalState,
    lcount: u16,
    top_border_lines: u16,
    active_lines: u16,
    field_lines: u16,
    scanline: u16,
    row: u16,
    line_base: u32,
    field_count: u32,
    border: Border,

    line_start: Ticks,
    profile: HorizontalProfile,
    npixels: usize,
    pixels: [u8; LINE_PIXELS],
    fetch_cache: Option<(u32, u16)>,

    hsync: bool,
    fsync: bool,

    hs_fall_event: Event<GimeEvent>,
    hs_rise_event: Event<GimeEvent>,
    vborder_event: Event<GimeEvent>,
    timer_event: Event<GimeEvent>,
}

impl Default for Gime {
    fn default() -> Self {
        Self::new(GimeConfig::default())
    }
}

impl Gime {
    /// A powered-off GIME. Call [`reset`](Self::reset) to start it.
    #[must_use]
    pub fn new(config: GimeConfig) -> Self {
        let regs = [0; 16];
        let mode = VideoMode::derive(&regs, 0, 0);
        Self {
            variant: config.variant,
            font: config.font,
            regs,
            mmu: [0; 16],
            palette: [0; 16],
            sam_register: 0,
            vdg_mode: 0,
            mode,
            irq_state: 0,
            firq_state: 0,
            irq: false,
            firq: false,
            timer_counter: 0,
            timer_last: Ticks::ZERO,
            vstate: VerticalState::SyncPulse,
            lcount: 0,
            top_border_lines: TOP_BORDER_NTSC[0],
            active_lines: ACTIVE_LINES[0],
            field_lines: NTSC_FIELD_LINES,
            scanline: 0,
            row: 0,
            line_base: 0,
            field_count: 0,
            border: Border::Direct(0),
            line_start: Ticks::ZERO,
            profile: horizontal_profile(config.variant, false, false),
            npixels: LINE_PIXELS,
            pixels: [0; LINE_PIXELS],
            fetch_cache: None,
            hsync: true,
            fsync: false,
            hs_fall_event: Event::new(GimeEvent::HsFall),
            hs_rise_event: Event::new(GimeEvent::HsRise),
            vborder_event: Event::new(GimeEvent::VBorder),
            timer_event: Event::new(GimeEvent::Timer),
        }
    }

    /// Reset. A soft reset clears $FF90-$FF9F and the SAM-compatible
    /// register; a hard reset also clears the MMU and palette. Line timing
    /// restarts with a horizontal sync fall shortly after `now`.
    pub fn reset<Q, H>(&mut self, hard: bool, now: Ticks, queue: &mut EventQueue<Q>, host: &mut H)
    where
        Q: Copy + PartialEq + From<GimeEvent>,
        H: GimeHost,
    {
        self.regs = [0; 16];
        self.sam_register = 0;
        if hard {
            self.mmu = [0; 16];
            self.palette = [0; 16];
        }
        self.update_mode();

        self.irq_state = 0;
        self.firq_state = 0;
        self.update_interrupt_lines(host);

        self.timer_counter = 0;
        self.timer_last = now;

        self.vstate = VerticalState::SyncPulse;
        self.lcount = 0;
        self.top_border_lines = TOP_BORDER_NTSC[0];
        self.active_lines = ACTIVE_LINES[0];
        self.field_lines = NTSC_FIELD_LINES;
        self.scanline = 0;
        self.row = 0;
        self.line_base = 0;
        self.field_count = 0;
        self.latch_border();
        self.profile = self.current_profile();

        self.line_start = now;
        self.npixels = LINE_PIXELS;
        self.pixels.fill(0);
        self.fetch_cache = None;

        if !self.hsync {
            self.hsync = true;
            host.hsync(true);
        }
        if self.fsync {
            self.fsync = false;
            host.fsync(false);
        }

        self.hs_rise_event.cancel(queue);
        self.vborder_event.cancel(queue);
        self.timer_event.cancel(queue);
        self.hs_fall_event.schedule(queue, now + RESET_HSYNC_DELAY);
    }

    /// One CPU bus cycle: decode `address` and call `cpu_cycle` with the
    /// result, which is also returned. No data moves here.
    pub fn mem_cycle(
        &self,
        rnw: bool,
        address: u16,
        mut cpu_cycle: impl FnMut(&GimeCycle),
    ) -> GimeCycle {
        let (select, z) = self.decode(address);
        let cycle = GimeCycle {
            ncycles: if self.sam_register & 0x1000 != 0 {
                FAST_CYCLE
            } else {
                SLOW_CYCLE
            },
            rnw,
            address,
            select,
            z,
        };
        cpu_cycle(&cycle);
        cycle
    }

    fn decode(&self, a: u16) -> (Select, u32) {
        let io = u32::from(a);
        match a {
            0xff00..=0xff1f => (Select::Pia0, io),
            0xff20..=0xff3f => (Select::Pia1, io),
            0xff40..=0xff5f => (Select::CartIo, io),
            0xff60..=0xff8f => (Select::Unused, io),
            0xff90..=0xffdf => (Select::Gime, io),
            0xffe0..=0xffff => {
                // Vectors come from internal ROM unless the map is all external.
                let (select, z) = self.memory(0x7ff00 | u32::from(a & 0xff));
                if select == Select::CartRom && self.regs[0] & INIT0_MC != 3 {
                    (Select::Rom, z)
                } else {
                    (select, z)
                }
            }
            0xfe00..=0xfeff if self.regs[0] & INIT0_MC3 != 0 => {
                (Select::Ram, 0x7fe00 | u32::from(a & 0xff))
            }
            _ => self.memory(self.translate(a)),
        }
    }

    /// CPU address to 19-bit physical address through the MMU.
    #[must_use]
    pub fn translate(&self, a: u16) -> u32 {
        if self.regs[0] & INIT0_MMUEN == 0 {
            return 0x70000 | u32::from(a);
        }
        let task = usize::from(self.regs[1] & INIT1_TR) * 8;
        let bank = self.mmu[task + usize::from(a >> 13)] & 0x3f;
        (u32::from(bank) << 13) | u32::from(a & 0x1fff)
    }

    /// ROM overlays physical blocks $3C-$3F unless the SAM-compatible TY
    /// bit selects all-RAM.
    fn memory(&self, z: u32) -> (Select, u32) {
        let block = z >> 13;
        if self.sam_register & 0x8000 != 0 || block < 0x3c {
            return (Select::Ram, z);
        }
        let select = match self.regs[0] & INIT0_MC {
            2 => Select::Rom,
            3 => Select::CartRom,
            _ if block < 0x3e => Select::Rom,
            _ => Select::CartRom,
        };
        (select, z)
    }

    /// CPU read of a GIME-decoded address. `None` where the GIME doesn't
    /// drive the data bus.
    pub fn read<Q, H>(
        &mut self,
        address: u16,
        now: Ticks,
        queue: &mut EventQueue<Q>,
        host: &mut H,
    ) -> Option<u8>
    where
        Q: Copy + PartialEq + From<GimeEvent>,
        H: GimeHost,
    {
        match address {
            0xff92 | 0xff93 => {
                self.render_scanline(now, host);
                self.update_timer(now, queue, host);
                let value = if address == 0xff92 {
                    std::mem::take(&mut self.irq_state)
                } else {
                    std::mem::take(&mut self.firq_state)
                };
                if self.timer_counter == 0 {
                    self.set_interrupt(INT_TMR, host);
                } else {
                    self.update_interrupt_lines(host);
                }
                Some(value)
            }
            0xffa0..=0xffaf => Some(self.mmu[usize::from(address & 15)]),
            0xffb0..=0xffbf => Some(self.palette[usize::from(address & 15)]),
            _ => None,
        }
    }

    /// CPU write of a GIME-decoded address.
    pub fn write<Q, H>(
        &mut self,
        address: u16,
        value: u8,
        now: Ticks,
        queue: &mut EventQueue<Q>,
        host: &mut H,
    ) where
        Q: Copy + PartialEq + From<GimeEvent>,
        H: GimeHost,
    {
        if !(0xff90..=0xffdf).contains(&address) {
            return;
        }
        self.render_scanline(now, host);

        match address {
            0xff90..=0xff9f => self.write_register(address, value, now, queue, host),
            0xffa0..=0xffaf => {
                let bank = value & 0x3f;
                log::trace!("GIME MMU[{:x}] = {bank:02x}", address & 15);
                self.mmu[usize::from(address & 15)] = bank;
            }
            0xffb0..=0xffbf => self.palette[usize::from(address & 15)] = value & 0x3f,
            _ => {
                let bit = 1u16 << ((address >> 1) & 15);
                let register = if address & 1 != 0 {
                    self.sam_register | bit
                } else {
                    self.sam_register & !bit
                };
                if register != self.sam_register {
                    log::trace!("GIME SAM register {:04x} -> {register:04x}", self.sam_register);
                }
                self.sam_register = register;
                self.update_mode();
            }
        }
    }

    fn write_register<Q, H>(
        &mut self,
        address: u16,
        value: u8,
        now: Ticks,
        queue: &mut EventQueue<Q>,
        host: &mut H,
    ) where
        Q: Copy + PartialEq + From<GimeEvent>,
        H: GimeHost,
    {
        let reg = usize::from(address & 15);
        log::trace!("GIME ${address:04X} = {value:02x}");
        match reg {
            0 => {
                self.regs[0] = value;
                self.update_mode();
                self.update_interrupt_lines(host);
            }
            1 => {
                let switching = (self.regs[1] ^ value) & INIT1_TINS != 0;
                if switching {
                    // Drain elapsed time under the old source.
                    self.update_timer(now, queue, host);
                }
                self.regs[1] = value;
                if switching {
                    self.timer_last = now;
                    self.schedule_timer(queue);
                }
            }
            2 | 3 => {
                self.regs[reg] = value;
                self.update_interrupt_lines(host);
            }
            4 => {
                self.regs[4] = value;
                self.restart_timer(now, queue, host);
            }
            5 => {
                self.regs[5] = value;
                if self.variant == GimeVariant::Gime1986 {
                    self.restart_timer(now, queue, host);
                }
            }
            8 | 9 | 0xc..=0xf => {
                self.regs[reg] = value;
                self.update_mode();
            }
            _ => self.regs[reg] = value,
        }
    }

    /// VDG mode lines from the PIA (AG, GM2-0, CSS), used in CoCo mode.
    pub fn set_vdg_mode<H: GimeHost>(&mut self, mode: u8, now: Ticks, host: &mut H) {
        self.render_scanline(now, host);
        self.vdg_mode = mode;
        self.update_mode();
    }

    /// Raise external interrupt sources (`INT_EI*`).
    pub fn assert_external_interrupt<H: GimeHost>(&mut self, sources: u8, host: &mut H) {
        self.set_interrupt(sources & (INT_EI2 | INT_EI1 | INT_EI0), host);
    }

    /// Service one of the GIME's events.
    pub fn handle_event<Q, H>(
        &mut self,
        event: GimeEvent,
        tick: Ticks,
        queue: &mut EventQueue<Q>,
        host: &mut H,
    ) where
        Q: Copy + PartialEq + From<GimeEvent>,
        H: GimeHost,
    {
        match event {
            GimeEvent::HsFall => self.do_hs_fall(tick, queue, host),
            GimeEvent::HsRise => {
                self.hs_rise_event.fire();
                self.hsync = true;
                host.hsync(true);
            }
            GimeEvent::VBorder => self.do_vborder(host),
            GimeEvent::Timer => {
                self.timer_event.fire();
                self.update_timer(tick, queue, host);
            }
        }
    }

    fn do_hs_fall<Q, H>(&mut self, tick: Ticks, queue: &mut EventQueue<Q>, host: &mut H)
    where
        Q: Copy + PartialEq + From<GimeEvent>,
        H: GimeHost,
    {
        self.hs_fall_event.fire();
        self.render_scanline(tick, host);
        host.render_line(self.scanline, &self.pixels);

        self.hsync = false;
        host.hsync(false);

        if self.regs[1] & INIT1_TINS == 0 && self.timer_counter > 0 {
            self.timer_counter -= 1;
            if self.timer_counter == 0 {
                self.timer_expired(host);
            }
        }
        self.set_interrupt(INT_HBORD, host);

        self.scanline = self.scanline.wrapping_add(1);
        self.line_start = tick;
        self.npixels = 0;
        self.fetch_cache = None;

        let vborder = u64::from(self.current_profile().vborder);
        self.hs_rise_event.schedule(queue, tick + HSYNC_TICKS);
        self.vborder_event.schedule(queue, tick + vborder);
        self.hs_fall_event.schedule(queue, tick + TICKS_PER_LINE);
    }

    /// Near the start of each line: latch the border and horizontal layout,
    /// count lines, and step the vertical state machine.
    fn do_vborder<H: GimeHost>(&mut self, host: &mut H) {
        self.vborder_event.fire();
        self.latch_border();
        self.profile = self.current_profile();

        match self.vstate {
            VerticalState::SyncPulse => {
                if self.lcount >= SYNC_PULSE_LINES {
                    self.enter(VerticalState::SyncBlank);
                    self.fsync = true;
                    host.fsync(true);
                }
            }
            VerticalState::SyncBlank => {
                if self.lcount >= SYNC_BLANK_LINES {
                    self.latch_frame_lines();
                    self.enter(VerticalState::TopBorder);
                    self.scanline = 0;
                }
            }
            VerticalState::TopBorder => {
                if self.lcount >= self.top_border_lines {
                    self.enter(VerticalState::ActiveArea);
                    self.row = if self.mode.coco {
                        u16::from(self.regs[0xc] & 0x0f)
                    } else {
                        0
                    };
                    self.line_base = self.display_start();
                }
            }
            VerticalState::ActiveArea => {
                if self.lcount >= self.active_lines {
                    self.enter(VerticalState::BottomBorder);
                    self.field_lines = if self.regs[8] & VMODE_H50 != 0 {
                        PAL_FIELD_LINES
                    } else {
                        NTSC_FIELD_LINES
                    };
                    self.fsync = false;
                    host.fsync(false);
                    self.set_interrupt(INT_VBORD, host);
                } else {
                    self.advance_row();
                }
            }
            VerticalState::BottomBorder => {
                let visible = SYNC_PULSE_LINES + SYNC_BLANK_LINES + self.top_border_lines + self.active_lines;
                if self.lcount >= self.field_lines.saturating_sub(visible) {
                    self.enter(VerticalState::SyncPulse);
                    self.field_count = self.field_count.wrapping_add(1);
                }
            }
        }
        self.lcount = self.lcount.saturating_add(1);
    }

    fn enter(&mut self, state: VerticalState) {
        self.vstate = state;
        self.lcount = 0;
    }

    /// Top border and active height, fixed for the rest of the field.
    fn latch_frame_lines(&mut self) {
        let lpf = if self.mode.coco {
            0
        } else {
            usize::from((self.regs[9] >> 5) & 3)
        };
        self.top_border_lines = if self.regs[8] & VMODE_H50 != 0 {
            TOP_BORDER_PAL[lpf]
        } else {
            TOP_BORDER_NTSC[lpf]
        };
        self.active_lines = ACTIVE_LINES[lpf];
    }

    fn advance_row(&mut self) {
        // LPR=7 in native modes holds the row counter. Some software
        // depends on it.
        if self.mode.row_frozen {
            return;
        }
        self.row += 1;
        if self.row >= self.mode.lines_per_row {
            self.row = 0;
            self.line_base = (self.line_base + self.mode.stride) & 0x7ffff;
        }
    }

    /// Physical address of the first displayed byte.
    fn display_start(&self) -> u32 {
        let y = (u32::from(self.regs[0xd]) << 11) | (u32::from(self.regs[0xe]) << 3);
        let y = if self.mode.coco {
            (y & 0x7e01ff) | (u32::from((self.sam_register >> 3) & 0x7f) << 9)
        } else {
            y
        };
        y & 0x7ffff
    }

    fn latch_border(&mut self) {
        self.border = match self.mode.format {
            _ if !self.mode.coco => Border::Direct(self.regs[0xa] & 0x3f),
            Format::CocoGraphics { css, .. } => Border::Palette(if css { 4 } else { 0 }),
            _ => Border::Direct(0),
        };
    }

    fn current_profile(&self) -> HorizontalProfile {
        horizontal_profile(self.variant, self.mode.wide, self.mode.graphics)
    }

    fn update_mode(&mut self) {
        self.mode = VideoMode::derive(&self.regs, (self.sam_register & 7) as u8, self.vdg_mode);
    }

    fn set_interrupt<H: GimeHost>(&mut self, sources: u8, host: &mut H) {
        self.irq_state |= sources & self.regs[2];
        self.firq_state |= sources & self.regs[3];
        self.update_interrupt_lines(host);
    }

    fn update_interrupt_lines<H: GimeHost>(&mut self, host: &mut H) {
        let irq = self.regs[0] & INIT0_IEN != 0 && self.irq_state != 0;
        let firq = self.regs[0] & INIT0_FEN != 0 && self.firq_state != 0;
        if irq != self.irq {
            self.irq = irq;
            host.irq(irq);
        }
        if firq != self.firq {
            self.firq = firq;
            host.firq(firq);
        }
    }

    fn timer_reload(&self) -> u16 {
        (u16::from(self.regs[4] & 0x0f) << 8) | u16::from(self.regs[5])
    }

    fn restart_timer<Q, H>(&mut self, now: Ticks, queue: &mut EventQueue<Q>, host: &mut H)
    where
        Q: Copy + PartialEq + From<GimeEvent>,
        H: GimeHost,
    {
        self.timer_counter = self.timer_reload();
        self.timer_last = now;
        if self.timer_counter == 0 {
            self.set_interrupt(INT_TMR, host);
        }
        self.schedule_timer(queue);
    }

    fn timer_expired<H: GimeHost>(&mut self, host: &mut H) {
        self.set_interrupt(INT_TMR, host);
        self.timer_counter = self.timer_reload();
    }

    /// Bring the fast timer up to `now`. The line-rate timer counts in
    /// `do_hs_fall` and has nothing to drain.
    fn update_timer<Q, H>(&mut self, now: Ticks, queue: &mut EventQueue<Q>, host: &mut H)
    where
        Q: Copy + PartialEq + From<GimeEvent>,
        H: GimeHost,
    {
        if self.regs[1] & INIT1_TINS == 0 {
            return;
        }
        let elapsed = (now - self.timer_last).get() / 4;
        self.timer_last += elapsed * 4;
        if self.timer_counter == 0 {
            return;
        }
        if elapsed >= u64::from(self.timer_counter) {
            self.timer_expired(host);
        } else {
            self.timer_counter -= elapsed as u16;
        }
        self.schedule_timer(queue);
    }

    fn schedule_timer<Q>(&mut self, queue: &mut EventQueue<Q>)
    where
        Q: Copy + PartialEq + From<GimeEvent>,
    {
        if self.regs[1] & INIT1_TINS != 0 && self.timer_counter > 0 {
            let at = self.timer_last + (u64::from(self.timer_counter) << 2);
            self.timer_event.schedule(queue, at);
        } else {
            self.timer_event.cancel(queue);
        }
    }

    /// The line buffer: left border through right border.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    #[must_use]
    pub fn vertical_state(&self) -> VerticalState {
        self.vstate
    }

    /// Line within the current character row.
    #[must_use]
    pub fn row(&self) -> u16 {
        self.row
    }

    /// Physical address of the current row.
    #[must_use]
    pub fn line_base(&self) -> u32 {
        self.line_base
    }

    #[must_use]
    pub fn field_count(&self) -> u32 {
        self.field_count
    }

    #[must_use]
    pub fn irq(&self) -> bool {
        self.irq
    }

    #[must_use]
    pub fn firq(&self) -> bool {
        self.firq
    }

    /// Pending IRQ sources (what a read of $FF92 would return).
    #[must_use]
    pub fn irq_state(&self) -> u8 {
        self.irq_state
    }

    #[must_use]
    pub fn firq_state(&self) -> u8 {
        self.firq_state
    }

    /// Timer count as of its last update.
    #[must_use]
    pub fn timer_counter(&self) -> u16 {
        self.timer_counter
    }

    #[must_use]
    pub fn sam_register(&self) -> u16 {
        self.sam_register
    }

    #[must_use]
    pub fn mode(&self) -> &VideoMode {
        &self.mode
    }

    #[must_use]
    pub fn variant(&self) -> GimeVariant {
        self.variant
    }

    /// Encode the GIME's state. Pending events are stored relative to
    /// `now`.
    #[must_use]
    pub fn save_state(&self, now: Ticks) -> Vec<u8> {
        emu_core::state::save_state(self, savestate::GIME_FIELDS, now)
    }

    /// Restore state saved by [`save_state`](Self::save_state) and re-arm
    /// its events on `queue`. On error the GIME is unchanged.
    pub fn load_state<Q>(
        &mut self,
        data: &[u8],
        now: Ticks,
        queue: &mut EventQueue<Q>,
    ) -> Result<(), StateError>
    where
        Q: Copy + PartialEq + From<GimeEvent>,
    {
        emu_core::state::load_state(self, savestate::GIME_FIELDS, data, now)?;
        self.update_mode();
        self.fetch_cache = None;
        for event in [
            self.hs_fall_event,
            self.hs_rise_event,
            self.vborder_event,
            self.timer_event,
        ] {
            event.rearm(queue);
        }
        Ok(())
    }
}

impl Observable for Gime {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "init0" => Some(self.regs[0].into()),
            "init1" => Some(self.regs[1].into()),
            "vmode" => Some(self.regs[8].into()),
            "vres" => Some(self.regs[9].into()),
            "border" => Some(self.regs[0xa].into()),
            "sam.register" => Some(self.sam_register.into()),
            "video.scanline" => Some(self.scanline.into()),
            "video.state" => Some(
                match self.vstate {
                    VerticalState::SyncPulse => "sync pulse",
                    VerticalState::SyncBlank => "sync blank",
                    VerticalState::TopBorder => "top border",
                    VerticalState::ActiveArea => "active area",
                    VerticalState::BottomBorder => "bottom border",
                }
                .into(),
            ),
            "video.row" => Some(self.row.into()),
            "video.line_base" => Some(self.line_base.into()),
            "video.field" => Some(self.field_count.into()),
            "irq.pending" => Some(self.irq_state.into()),
            "irq.line" => Some(self.irq.into()),
            "firq.pending" => Some(self.firq_state.into()),
            "firq.line" => Some(self.firq.into()),
            "timer.reload" => Some(self.timer_reload().into()),
            "timer.counter" => Some(self.timer_counter.into()),
            "mmu.task" => Some((self.regs[1] & INIT1_TR).into()),
            "mmu.banks" => Some(Value::Array(self.mmu.iter().map(|&b| b.into()).collect())),
            "palette" => Some(Value::Array(self.palette.iter().map(|&c| c.into()).collect())),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "init0",
            "init1",
            "vmode",
            "vres",
            "border",
            "sam.register",
            "video.scanline",
            "video.state",
            "video.row",
            "video.line_base",
            "video.field",
            "irq.pending",
            "irq.line",
            "firq.pending",
            "firq.line",
            "timer.reload",
            "timer.counter",
            "mmu.task",
            "mmu.banks",
            "palette",
        ]
    }
}
