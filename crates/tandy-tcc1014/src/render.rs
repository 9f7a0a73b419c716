//! Incremental line rendering.
//!
//! Each buffered pixel is a pure function of its position and the chip's
//! state when it is drawn, so rendering a line in several pieces gives the
//! same result as rendering it in one go.

use crate::mode::Format;
use crate::timing::{BLINK_FIELDS, LEFT_BORDER_START, LINE_PIXELS};
use crate::{Border, Gime, GimeHost, VerticalState};
use emu_core::Ticks;

/// Glyph rows in the character generator.
const GLYPH_ROWS: u16 = 12;

impl Gime {
    /// Render the current line up to the pixel that `now` corresponds to.
    /// Rendering never goes backwards: an earlier `now` does nothing.
    pub fn render_scanline<H: GimeHost>(&mut self, now: Ticks, host: &mut H) {
        let since = (now - self.line_start).get();
        let target = since
            .saturating_sub(LEFT_BORDER_START)
            .min(LINE_PIXELS as u64) as usize;
        while self.npixels < target {
            let colour = self.pixel(self.npixels, host);
            self.pixels[self.npixels] = colour;
            self.npixels += 1;
        }
    }

    fn pixel<H: GimeHost>(&mut self, p: usize, host: &mut H) -> u8 {
        match self.vstate {
            VerticalState::SyncPulse | VerticalState::SyncBlank => 0,
            VerticalState::TopBorder | VerticalState::BottomBorder => self.border_colour(),
            VerticalState::ActiveArea => {
                let left = usize::from(self.profile.left_border);
                let active = usize::from(self.profile.active);
                if (left..left + active).contains(&p) {
                    self.active_pixel((p - left) as u32, host)
                } else {
                    self.border_colour()
                }
            }
        }
    }

    fn border_colour(&self) -> u8 {
        match self.border {
            Border::Direct(colour) => colour,
            Border::Palette(index) => self.palette[usize::from(index)],
        }
    }

    fn active_pixel<H: GimeHost>(&mut self, x: u32, host: &mut H) -> u8 {
        let width = u32::from(self.profile.active);
        match self.mode.format {
            Format::CocoText { css } => self.coco_text_pixel(x, width, css, host),
            Format::CocoGraphics { bpp, css } => {
                let value = self.graphics_value(x, width, bpp, host);
                let css = usize::from(css);
                let index = if bpp == 2 {
                    css * 4 + value
                } else {
                    8 + css * 2 + value
                };
                self.palette[index]
            }
            Format::NativeText {
                columns,
                attributes,
            } => self.native_text_pixel(x, width, u32::from(columns), attributes, host),
            Format::NativeGraphics { bpp } => {
                let value = self.graphics_value(x, width, bpp, host);
                self.palette[value]
            }
        }
    }

    /// Colour index of a packed-pixel graphics mode.
    fn graphics_value<H: GimeHost>(&mut self, x: u32, width: u32, bpp: u8, host: &mut H) -> usize {
        let bpp = u32::from(bpp);
        let pixels_per_row = u32::from(self.mode.bytes_per_row) * 8 / bpp;
        let bit = (x * pixels_per_row / width) * bpp;
        let byte = self.fetch_byte(bit / 8, host);
        let shift = 8 - bpp - bit % 8;
        usize::from((byte >> shift) & ((1u8 << bpp) - 1))
    }

    fn coco_text_pixel<H: GimeHost>(&mut self, x: u32, width: u32, css: bool, host: &mut H) -> u8 {
        let cell = width / 32;
        let column = x / cell;
        let fx = (x % cell) * 8 / cell;
        let code = self.fetch_byte(column, host);

        if code & 0x80 != 0 {
            // SG4: four quadrants, colour in bits 4-6, black background.
            let quadrant = match (self.row < 6, fx < 4) {
                (true, true) => 3,
                (true, false) => 2,
                (false, true) => 1,
                (false, false) => 0,
            };
            return if (code >> quadrant) & 1 != 0 {
                self.palette[usize::from((code >> 4) & 7)]
            } else {
                0
            };
        }

        let mut glyph = code & 0x3f;
        if glyph < 0x20 {
            glyph |= 0x40;
        }
        let lit = (self.glyph_row(glyph, self.row) << fx) & 0x80 != 0;
        let inverse = code & 0x40 != 0;
        let (background, foreground) = if css { (14, 15) } else { (12, 13) };
        self.palette[if lit != inverse {
            foreground
        } else {
            background
        }]
    }

    fn native_text_pixel<H: GimeHost>(
        &mut self,
        x: u32,
        width: u32,
        columns: u32,
        attributes: bool,
        host: &mut H,
    ) -> u8 {
        let cell = width / columns;
        let column = x / cell;
        let fx = (x % cell) * 8 / cell;

        if !attributes {
            let code = self.fetch_byte(column, host);
            let lit = (self.glyph_row(code & 0x7f, self.row) << fx) & 0x80 != 0;
            return self.palette[if lit { 8 } else { 0 }];
        }

        let code = self.fetch_byte(column * 2, host);
        let attr = self.fetch_byte(column * 2 + 1, host);
        let mut bits = self.glyph_row(code & 0x7f, self.row);
        if attr & 0x40 != 0 && self.row + 1 == self.mode.lines_per_row {
            bits = 0xff;
        }
        if attr & 0x80 != 0 && (self.field_count / BLINK_FIELDS) & 1 != 0 {
            bits = 0;
        }
        let lit = (bits << fx) & 0x80 != 0;
        if lit {
            self.palette[8 + usize::from((attr >> 3) & 7)]
        } else {
            self.palette[usize::from(attr & 7)]
        }
    }

    fn glyph_row(&self, glyph: u8, row: u16) -> u8 {
        if row >= GLYPH_ROWS {
            return 0;
        }
        let index = usize::from(glyph) * usize::from(GLYPH_ROWS) + usize::from(row);
        self.font.get(index).copied().unwrap_or(0)
    }

    /// Byte `offset` of the current row, through the word cache.
    fn fetch_byte<H: GimeHost>(&mut self, offset: u32, host: &mut H) -> u8 {
        let column = if self.mode.hven {
            (self.mode.x_offset + offset) & 0xff
        } else {
            self.mode.x_offset + offset
        };
        let address = (self.line_base + column) & 0x7ffff;
        let word = address & !1;
        let data = match self.fetch_cache {
            Some((cached, data)) if cached == word => data,
            _ => {
                let data = host.fetch_video(word);
                self.fetch_cache = Some((word, data));
                data
            }
        };
        if address & 1 == 0 {
            (data >> 8) as u8
        } else {
            data as u8
        }
    }
}
