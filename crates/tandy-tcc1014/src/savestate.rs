//! Save-state field table.
//!
//! Ids are stable: never renumber, only append.

use emu_core::Field;
use emu_core::state::{FieldReader, FieldWriter};

use crate::timing::{HorizontalProfile, LEFT_BORDER_START, LINE_PIXELS};
use crate::{Border, Gime, VerticalState};

fn put_vstate(f: &mut FieldWriter, state: VerticalState) {
    f.put_u8(match state {
        VerticalState::SyncPulse => 0,
        VerticalState::SyncBlank => 1,
        VerticalState::TopBorder => 2,
        VerticalState::ActiveArea => 3,
        VerticalState::BottomBorder => 4,
    });
}

fn get_vstate(f: &mut FieldReader<'_>, fallback: VerticalState) -> VerticalState {
    match f.get_u8() {
        0 => VerticalState::SyncPulse,
        1 => VerticalState::SyncBlank,
        2 => VerticalState::TopBorder,
        3 => VerticalState::ActiveArea,
        4 => VerticalState::BottomBorder,
        other => {
            f.reject(u32::from(other));
            fallback
        }
    }
}

fn put_border(f: &mut FieldWriter, border: Border) {
    match border {
        Border::Direct(colour) => {
            f.put_u8(0);
            f.put_u8(colour);
        }
        Border::Palette(index) => {
            f.put_u8(1);
            f.put_u8(index);
        }
    }
}

fn get_border(f: &mut FieldReader<'_>) -> Border {
    let kind = f.get_u8();
    let value = f.get_u8();
    match kind {
        1 if value < 16 => Border::Palette(value),
        0 => Border::Direct(value & 0x3f),
        _ => {
            f.reject(u32::from(kind));
            Border::Direct(0)
        }
    }
}

/// Largest row counter value: VSC can preload up to 15 and no mode has
/// more lines per row.
const MAX_ROW: u16 = 15;

fn get_profile(f: &mut FieldReader<'_>, fallback: HorizontalProfile) -> HorizontalProfile {
    let profile = HorizontalProfile {
        left_border: f.get_u16(),
        active: f.get_u16(),
        right_border: f.get_u16(),
        vborder: f.get_u16(),
    };
    let width = usize::from(profile.left_border)
        + usize::from(profile.active)
        + usize::from(profile.right_border);
    if width != LINE_PIXELS
        || !matches!(profile.active, 512 | 640)
        || u64::from(profile.vborder) > LEFT_BORDER_START
    {
        f.reject(u32::from(profile.active));
        return fallback;
    }
    profile
}

pub(crate) const GIME_FIELDS: &[Field<Gime>] = &[
    Field {
        id: 1,
        save: |g, f| f.put_bytes(&g.regs),
        load: |g, f| f.get_bytes(&mut g.regs),
    },
    Field {
        id: 2,
        save: |g, f| f.put_bytes(&g.mmu),
        load: |g, f| f.get_bytes(&mut g.mmu),
    },
    Field {
        id: 3,
        save: |g, f| f.put_bytes(&g.palette),
        load: |g, f| f.get_bytes(&mut g.palette),
    },
    Field {
        id: 4,
        save: |g, f| {
            f.put_u16(g.sam_register);
            f.put_u8(g.vdg_mode);
        },
        load: |g, f| {
            g.sam_register = f.get_u16();
            g.vdg_mode = f.get_u8();
        },
    },
    Field {
        id: 5,
        save: |g, f| {
            f.put_u8(g.irq_state);
            f.put_u8(g.firq_state);
            f.put_bool(g.irq);
            f.put_bool(g.firq);
        },
        load: |g, f| {
            g.irq_state = f.get_u8();
            g.firq_state = f.get_u8();
            g.irq = f.get_bool();
            g.firq = f.get_bool();
        },
    },
    Field {
        id: 6,
        save: |g, f| {
            f.put_u16(g.timer_counter);
            f.put_tick(g.timer_last);
        },
        load: |g, f| {
            g.timer_counter = f.get_u16() & 0x0fff;
            g.timer_last = f.get_tick();
        },
    },
    Field {
        id: 7,
        save: |g, f| {
            put_vstate(f, g.vstate);
            f.put_u16(g.lcount);
            f.put_u16(g.top_border_lines);
            f.put_u16(g.active_lines);
            f.put_u16(g.field_lines);
            f.put_u16(g.scanline);
            f.put_u16(g.row);
            f.put_u32(g.line_base);
            f.put_u32(g.field_count);
            put_border(f, g.border);
        },
        load: |g, f| {
            g.vstate = get_vstate(f, g.vstate);
            g.lcount = f.get_u16();
            g.top_border_lines = f.get_u16();
            g.active_lines = f.get_u16();
            g.field_lines = f.get_u16();
            g.scanline = f.get_u16();
            g.row = f.get_u16();
            if g.row > MAX_ROW {
                f.reject(u32::from(g.row));
                g.row = 0;
            }
            g.line_base = f.get_u32() & 0x7ffff;
            g.field_count = f.get_u32();
            g.border = get_border(f);
        },
    },
    Field {
        id: 8,
        save: |g, f| {
            f.put_tick(g.line_start);
            f.put_u16(g.npixels as u16);
            f.put_u16(g.profile.left_border);
            f.put_u16(g.profile.active);
            f.put_u16(g.profile.right_border);
            f.put_u16(g.profile.vborder);
        },
        load: |g, f| {
            g.line_start = f.get_tick();
            let npixels = f.get_u16();
            if usize::from(npixels) > LINE_PIXELS {
                f.reject(u32::from(npixels));
            }
            g.npixels = usize::from(npixels).min(LINE_PIXELS);
            g.profile = get_profile(f, g.profile);
        },
    },
    Field {
        id: 9,
        save: |g, f| f.put_bytes(&g.pixels),
        load: |g, f| f.get_bytes(&mut g.pixels),
    },
    Field {
        id: 10,
        save: |g, f| {
            f.put_bool(g.hsync);
            f.put_bool(g.fsync);
        },
        load: |g, f| {
            g.hsync = f.get_bool();
            g.fsync = f.get_bool();
        },
    },
    Field {
        id: 11,
        save: |g, f| f.put_event(g.hs_fall_event.at()),
        load: |g, f| g.hs_fall_event.restore(f.get_event()),
    },
    Field {
        id: 12,
        save: |g, f| f.put_event(g.hs_rise_event.at()),
        load: |g, f| g.hs_rise_event.restore(f.get_event()),
    },
    Field {
        id: 13,
        save: |g, f| f.put_event(g.vborder_event.at()),
        load: |g, f| g.vborder_event.restore(f.get_event()),
    },
    Field {
        id: 14,
        save: |g, f| f.put_event(g.timer_event.at()),
        load: |g, f| g.timer_event.restore(f.get_event()),
    },
];
