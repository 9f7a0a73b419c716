//! Video mode derivation.
//!
//! The GIME's display format is spread across INIT0 (CoCo compatibility),
//! VMODE, VRES, the horizontal offset register, the SAM-compatible V bits
//! and, in CoCo mode, the VDG mode lines driven by the PIA. Whenever any of
//! these change, [`VideoMode::derive`] recomputes everything the renderer
//! and row counter need.

/// VDG mode line: alpha/graphics.
pub const VDG_AG: u8 = 0x80;
/// VDG mode lines GM2-GM0.
pub const VDG_GM: u8 = 0x70;
/// VDG colour set select.
pub const VDG_CSS: u8 = 0x08;

/// INIT0 bits.
pub const INIT0_COCO: u8 = 0x80;
pub const INIT0_MMUEN: u8 = 0x40;
pub const INIT0_IEN: u8 = 0x20;
pub const INIT0_FEN: u8 = 0x10;
pub const INIT0_MC3: u8 = 0x08;
pub const INIT0_MC: u8 = 0x03;

/// INIT1 bits.
pub const INIT1_TINS: u8 = 0x20;
pub const INIT1_TR: u8 = 0x01;

/// VMODE bits.
pub const VMODE_BP: u8 = 0x80;
pub const VMODE_H50: u8 = 0x08;
pub const VMODE_LPR: u8 = 0x07;

/// Horizontal offset register: 256-byte virtual rows.
pub const HOFF_HVEN: u8 = 0x80;

/// Lines per character row in CoCo mode, by SAM V.
const COCO_LINES_PER_ROW: [u16; 8] = [12, 3, 3, 2, 2, 1, 1, 1];
/// Lines per character row in native modes, by LPR.
const NATIVE_LINES_PER_ROW: [u16; 8] = [1, 2, 8, 8, 9, 10, 12, 1];
/// Bytes per row in native graphics modes, by HRES.
const GRAPHICS_BYTES: [u16; 8] = [16, 20, 32, 40, 64, 80, 128, 160];
/// Characters per row in native text modes, by HRES.
const TEXT_COLUMNS: [u16; 8] = [32, 40, 32, 40, 64, 80, 64, 80];
/// Bits per pixel in native graphics modes, by CRES.
const GRAPHICS_BPP: [u8; 4] = [1, 2, 4, 4];

/// How the active area is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// VDG alphanumerics and SG4 semigraphics, 32 columns.
    CocoText { css: bool },
    /// VDG colour (2bpp) or resolution (1bpp) graphics.
    CocoGraphics { bpp: u8, css: bool },
    NativeText { columns: u16, attributes: bool },
    NativeGraphics { bpp: u8 },
}

/// Everything derived from the mode registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    pub coco: bool,
    pub graphics: bool,
    /// 640-pixel active area (40/80 columns, or 20/40/80/160 bytes).
    pub wide: bool,
    pub format: Format,
    /// Bytes fetched for one line.
    pub bytes_per_row: u16,
    /// Address increment from one row to the next.
    pub stride: u32,
    pub lines_per_row: u16,
    /// LPR=7 in a native mode: the row counter never advances.
    pub row_frozen: bool,
    pub hven: bool,
    /// Horizontal offset in bytes (native modes only).
    pub x_offset: u32,
}

impl VideoMode {
    /// `regs` are $FF90-$FF9F, `sam_v` the SAM-compatible V bits and
    /// `vdg_mode` the VDG mode lines.
    #[must_use]
    pub fn derive(regs: &[u8; 16], sam_v: u8, vdg_mode: u8) -> Self {
        let coco = regs[0] & INIT0_COCO != 0;
        let vmode = regs[8];
        let vres = regs[9];
        let hoff = regs[15];
        let hres = usize::from((vres >> 2) & 7);
        let cres = vres & 3;
        let hven = hoff & HOFF_HVEN != 0;

        let (graphics, format, bytes_per_row, lines_per_row) = if coco {
            let css = vdg_mode & VDG_CSS != 0;
            let lines = COCO_LINES_PER_ROW[usize::from(sam_v & 7)];
            if vdg_mode & VDG_AG == 0 {
                (false, Format::CocoText { css }, 32, lines)
            } else {
                let gm = (vdg_mode & VDG_GM) >> 4;
                let bpp = if gm & 1 == 0 { 2 } else { 1 };
                let bytes = if matches!(gm, 0 | 1 | 3 | 5) { 16 } else { 32 };
                (true, Format::CocoGraphics { bpp, css }, bytes, lines)
            }
        } else {
            let lines = NATIVE_LINES_PER_ROW[usize::from(vmode & VMODE_LPR)];
            if vmode & VMODE_BP != 0 {
                let bpp = GRAPHICS_BPP[usize::from(cres)];
                (true, Format::NativeGraphics { bpp }, GRAPHICS_BYTES[hres], lines)
            } else {
                let columns = TEXT_COLUMNS[hres];
                let attributes = cres & 1 != 0;
                let bytes = if attributes { columns * 2 } else { columns };
                (false, Format::NativeText { columns, attributes }, bytes, lines)
            }
        };

        let wide = !coco && hres & 1 != 0;
        let stride = if hven && !coco {
            256
        } else {
            u32::from(bytes_per_row)
        };

        Self {
            coco,
            graphics,
            wide,
            format,
            bytes_per_row,
            stride,
            lines_per_row,
            row_frozen: !coco && vmode & VMODE_LPR == 7,
            hven: hven && !coco,
            x_offset: if coco { 0 } else { u32::from(hoff & 0x7f) * 2 },
        }
    }
}
