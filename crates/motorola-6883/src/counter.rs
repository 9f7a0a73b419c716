//! VDG address counter.
//!
//! The SAM generates video addresses with a 16-bit counter split into
//! cascaded stages. Bits 0-3 count bytes fetched by the VDG. Bit 4 is clocked
//! by bit 3 through an optional X divider (÷1, ÷2 or ÷3), and bits 5-15 are
//! clocked by bit 4 through an optional Y divider (÷1, ÷2, ÷3 or ÷12, the
//! last being ÷4 feeding ÷3).
//!
//! Each stage is a node that counts falling edges on its input. Changing the
//! divider ratio re-wires node inputs, and a re-wire can itself produce an
//! edge. Some transitions pass through an intermediate state where the input
//! is briefly held low; those are listed in [`X_GLITCHES`] and
//! [`Y_GLITCHES`] and must not be "tidied up".

/// Counter stages, in the order they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Node {
    /// Address bits 5-15.
    B15_5 = 0,
    /// Address bit 4.
    B4,
    XDiv2,
    XDiv3,
    /// Address bits 0-3, clocked directly by VDG fetches.
    B3_0,
    YDiv4,
    YDiv3,
    YDiv2,
    /// Permanently low. Used as the intermediate source in glitching
    /// transitions.
    Ground,
}

pub const NODES: [Node; 9] = [
    Node::B15_5,
    Node::B4,
    Node::XDiv2,
    Node::XDiv3,
    Node::B3_0,
    Node::YDiv4,
    Node::YDiv3,
    Node::YDiv2,
    Node::Ground,
];

/// Horizontal divider between bit 3 and bit 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XDiv {
    Div1,
    Div2,
    Div3,
}

/// Vertical divider between bit 4 and bit 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YDiv {
    Div1,
    Div2,
    Div3,
    Div12,
}

/// X divider selected by each VDG mode (SAM V0-V2).
pub const X_DIVIDER: [XDiv; 8] = [
    XDiv::Div1,
    XDiv::Div3,
    XDiv::Div1,
    XDiv::Div2,
    XDiv::Div1,
    XDiv::Div1,
    XDiv::Div1,
    XDiv::Div1,
];

/// Y divider selected by each VDG mode.
pub const Y_DIVIDER: [YDiv; 8] = [
    YDiv::Div12,
    YDiv::Div1,
    YDiv::Div3,
    YDiv::Div1,
    YDiv::Div2,
    YDiv::Div1,
    YDiv::Div1,
    YDiv::Div1,
];

/// X transitions that hold bit 4's input low before connecting the new
/// source.
pub const X_GLITCHES: [(XDiv, XDiv); 2] = [(XDiv::Div3, XDiv::Div1), (XDiv::Div2, XDiv::Div3)];

/// Y transitions that hold bit 5's input low before connecting the new
/// source. Not symmetric: DIV2→DIV12 glitches, DIV12→DIV2 does not.
pub const Y_GLITCHES: [(YDiv, YDiv); 3] = [
    (YDiv::Div12, YDiv::Div3),
    (YDiv::Div2, YDiv::Div12),
    (YDiv::Div3, YDiv::Div2),
];

/// Which low bits a falling horizontal sync clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HsyncClear {
    /// Bits 1-4 (even modes).
    Bits1To4,
    /// Bits 1-3 (odd modes).
    Bits1To3,
    /// Mode 7: the counter is not touched.
    None,
}

impl HsyncClear {
    #[must_use]
    pub fn for_mode(mode: u8) -> Self {
        match mode & 7 {
            7 => Self::None,
            m if m & 1 == 0 => Self::Bits1To4,
            _ => Self::Bits1To3,
        }
    }
}

/// One stage of the counter.
///
/// `output` is always `value & out_mask != 0`, and `input` always mirrors
/// the output of `input_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub value: u16,
    pub input_from: Node,
    pub val_mod: u16,
    pub out_mask: u16,
    pub input: bool,
    pub output: bool,
}

const fn stage(input_from: Node, val_mod: u16, out_mask: u16) -> Stage {
    Stage {
        value: 0,
        input_from,
        val_mod,
        out_mask,
        input: false,
        output: false,
    }
}

/// Power-on wiring: mode 0 (X ÷1, Y ÷12).
const INITIAL: [Stage; 9] = [
    stage(Node::YDiv3, 0x800, 0),
    stage(Node::B3_0, 2, 1),
    stage(Node::B3_0, 2, 1),
    stage(Node::B3_0, 3, 2),
    stage(Node::Ground, 16, 8),
    stage(Node::B4, 4, 2),
    stage(Node::YDiv4, 3, 2),
    stage(Node::B4, 2, 1),
    stage(Node::Ground, 1, 0),
];

/// The cascaded VDG address counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VdgCounter {
    stages: [Stage; 9],
    xdiv: XDiv,
    ydiv: YDiv,
}

impl Default for VdgCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl VdgCounter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: INITIAL,
            xdiv: XDiv::Div1,
            ydiv: YDiv::Div12,
        }
    }

    /// Current 16-bit video address.
    #[must_use]
    pub fn address(&self) -> u16 {
        (self.stage(Node::B15_5).value << 5)
            | (self.stage(Node::B4).value << 4)
            | self.stage(Node::B3_0).value
    }

    #[must_use]
    pub fn stage(&self, node: Node) -> &Stage {
        &self.stages[node as usize]
    }

    #[must_use]
    pub fn dividers(&self) -> (XDiv, YDiv) {
        (self.xdiv, self.ydiv)
    }

    /// Advance bits 0-3 by up to `nbytes`, stopping at the next 16-byte
    /// boundary. Returns the number of bytes actually advanced.
    ///
    /// Reaching the boundary raises bit 3 (if it wasn't already high) and
    /// then drops it, so the upper stages see a complete clock.
    pub fn advance(&mut self, nbytes: u16) -> u16 {
        let low = self.stage(Node::B3_0).value;
        let room = 16 - low;
        if nbytes < room {
            self.set_value(Node::B3_0, low + nbytes);
            return nbytes;
        }
        if low < 8 {
            self.set_value(Node::B3_0, 8);
        }
        self.set_value(Node::B3_0, 0);
        room
    }

    /// Falling edge of horizontal sync.
    pub fn hsync_clear(&mut self, clear: HsyncClear) {
        match clear {
            HsyncClear::None => {}
            HsyncClear::Bits1To3 => {
                let low = self.stage(Node::B3_0).value & !0x0e;
                self.set_value(Node::B3_0, low);
            }
            HsyncClear::Bits1To4 => {
                // Bit 4 is reset at the same moment bit 3 falls, so bit 3's
                // edge is absorbed; only bit 4 itself falling carries upward.
                let b3_0 = &mut self.stages[Node::B3_0 as usize];
                b3_0.value &= !0x0e;
                b3_0.output = false;
                for node in NODES {
                    if node != Node::B3_0 && self.stage(node).input_from == Node::B3_0 {
                        self.stages[node as usize].input = false;
                    }
                }
                self.set_value(Node::B4, 0);
            }
        }
    }

    /// Rising edge of field sync: every stage cleared, bits 5-15 loaded
    /// from `base` (the display offset, already shifted into bit 9 up).
    pub fn reset(&mut self, base: u16) {
        for stage in &mut self.stages {
            stage.value = 0;
            stage.input = false;
            stage.output = false;
        }
        self.stages[Node::B15_5 as usize].value = (base >> 5) & 0x7ff;
    }

    /// Re-wire for a new VDG mode, injecting glitch edges where the
    /// hardware does.
    pub fn set_mode(&mut self, mode: u8) {
        let x = X_DIVIDER[usize::from(mode & 7)];
        let y = Y_DIVIDER[usize::from(mode & 7)];

        if x != self.xdiv {
            if X_GLITCHES.contains(&(self.xdiv, x)) {
                self.connect(Node::B4, Node::Ground);
            }
            self.connect(Node::B4, x_source(x));
            self.xdiv = x;
        }

        if y != self.ydiv {
            if Y_GLITCHES.contains(&(self.ydiv, y)) {
                self.connect(Node::B15_5, Node::Ground);
            }
            match y {
                YDiv::Div12 => self.connect(Node::YDiv3, Node::YDiv4),
                YDiv::Div3 => self.connect(Node::YDiv3, Node::B4),
                YDiv::Div1 | YDiv::Div2 => {}
            }
            self.connect(Node::B15_5, y_source(y));
            self.ydiv = y;
        }
    }

    /// Wire for `mode` without generating any edges. Used after a state
    /// restore, where the stage values are loaded separately.
    pub fn force_mode(&mut self, mode: u8) {
        let x = X_DIVIDER[usize::from(mode & 7)];
        let y = Y_DIVIDER[usize::from(mode & 7)];
        self.stages[Node::B4 as usize].input_from = x_source(x);
        self.stages[Node::YDiv3 as usize].input_from = match y {
            YDiv::Div3 => Node::B4,
            _ => Node::YDiv4,
        };
        self.stages[Node::B15_5 as usize].input_from = y_source(y);
        self.xdiv = x;
        self.ydiv = y;
    }

    /// Overwrite a stage's dynamic state. `output` is re-derived.
    pub fn load_stage(&mut self, node: Node, value: u16, input: bool) {
        let stage = &mut self.stages[node as usize];
        stage.value = value % stage.val_mod.max(1);
        stage.input = input;
        stage.output = stage.value & stage.out_mask != 0;
    }

    fn connect(&mut self, node: Node, source: Node) {
        self.stages[node as usize].input_from = source;
        self.sync_input(node);
    }

    fn set_value(&mut self, node: Node, value: u16) {
        let stage = &mut self.stages[node as usize];
        stage.value = value % stage.val_mod;
        self.update_output(node);
    }

    /// Bring a stage's input in line with its source, counting on a
    /// falling edge.
    fn sync_input(&mut self, node: Node) {
        let source = self.stage(node).input_from;
        let level = self.stage(source).output;
        let stage = &mut self.stages[node as usize];
        if stage.input == level {
            return;
        }
        stage.input = level;
        if !level {
            stage.value = (stage.value + 1) % stage.val_mod;
            self.update_output(node);
        }
    }

    fn update_output(&mut self, node: Node) {
        let stage = &mut self.stages[node as usize];
        let output = stage.value & stage.out_mask != 0;
        if output == stage.output {
            return;
        }
        stage.output = output;
        for dependent in NODES {
            if dependent != node && self.stage(dependent).input_from == node {
                self.sync_input(dependent);
            }
        }
    }
}

fn x_source(x: XDiv) -> Node {
    match x {
        XDiv::Div1 => Node::B3_0,
        XDiv::Div2 => Node::XDiv2,
        XDiv::Div3 => Node::XDiv3,
    }
}

fn y_source(y: YDiv) -> Node {
    match y {
        YDiv::Div1 => Node::B4,
        YDiv::Div2 => Node::YDiv2,
        YDiv::Div3 | YDiv::Div12 => Node::YDiv3,
    }
}
