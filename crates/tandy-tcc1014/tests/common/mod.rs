//! Shared test machine: 512K of RAM, recorded lines and interrupt lines.

#![allow(dead_code)]

use emu_core::{EventQueue, Ticks};
use tandy_tcc1014::timing::TICKS_PER_LINE;
use tandy_tcc1014::{FONT_SIZE, Gime, GimeConfig, GimeEvent, GimeHost};

/// Tick of line `n`'s horizontal sync fall after a reset at tick 0.
pub fn line_tick(n: u64) -> u64 {
    2 + n * TICKS_PER_LINE
}

/// A font where `glyph` has `pattern` on every row and everything else is
/// blank.
pub fn font_with(glyph: u8, pattern: u8) -> Vec<u8> {
    let mut font = vec![0; FONT_SIZE];
    let start = usize::from(glyph) * 12;
    font[start..start + 12].fill(pattern);
    font
}

#[derive(Clone)]
pub struct Machine {
    pub ram: Vec<u8>,
    pub lines: Vec<(u16, Vec<u8>)>,
    pub irq: bool,
    pub firq: bool,
    pub fsync_edges: Vec<bool>,
}

impl Machine {
    pub fn new() -> Self {
        Self {
            ram: vec![0; 0x80000],
            lines: Vec::new(),
            irq: false,
            firq: false,
            fsync_edges: Vec::new(),
        }
    }
}

impl GimeHost for Machine {
    fn fetch_video(&mut self, address: u32) -> u16 {
        let a = (address & 0x7fffe) as usize;
        u16::from_be_bytes([self.ram[a], self.ram[a + 1]])
    }

    fn render_line(&mut self, scanline: u16, pixels: &[u8]) {
        self.lines.push((scanline, pixels.to_vec()));
    }

    fn fsync(&mut self, level: bool) {
        self.fsync_edges.push(level);
    }

    fn irq(&mut self, level: bool) {
        self.irq = level;
    }

    fn firq(&mut self, level: bool) {
        self.firq = level;
    }
}

#[derive(Clone)]
pub struct Rig {
    pub gime: Gime,
    pub queue: EventQueue<GimeEvent>,
    pub host: Machine,
    pub now: Ticks,
}

impl Rig {
    /// A hard-reset GIME at tick 0.
    pub fn new(config: GimeConfig) -> Self {
        let mut rig = Self {
            gime: Gime::new(config),
            queue: EventQueue::new(),
            host: Machine::new(),
            now: Ticks::ZERO,
        };
        rig.gime
            .reset(true, Ticks::ZERO, &mut rig.queue, &mut rig.host);
        rig
    }

    pub fn run_to(&mut self, t: u64) {
        self.now = Ticks(t);
        let Self {
            gime, queue, host, ..
        } = self;
        queue.run_queue(Ticks(t), |q, ev, tick| gime.handle_event(ev, tick, q, host));
    }

    pub fn run_to_line(&mut self, line: u64, offset: u64) {
        self.run_to(line_tick(line) + offset);
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.gime
            .write(address, value, self.now, &mut self.queue, &mut self.host);
    }

    pub fn read(&mut self, address: u16) -> Option<u8> {
        self.gime
            .read(address, self.now, &mut self.queue, &mut self.host)
    }

    /// Drive the VDG mode lines, as the PIA would.
    pub fn vdg(&mut self, mode: u8) {
        self.gime.set_vdg_mode(mode, self.now, &mut self.host);
    }

    pub fn render(&mut self, t: u64) {
        self.gime.render_scanline(Ticks(t), &mut self.host);
    }

    /// Most recent finished line with this scanline number.
    pub fn line(&self, scanline: u16) -> Option<&[u8]> {
        self.host
            .lines
            .iter()
            .rev()
            .find(|(s, _)| *s == scanline)
            .map(|(_, p)| p.as_slice())
    }
}
