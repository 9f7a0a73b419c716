//! Side-effect-free chip inspection.
//!
//! Every chip exposes its registers, counters and output lines for
//! debuggers and tests. A query never renders, acknowledges an interrupt or
//! advances a counter.

use std::fmt;

/// A queried value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    /// Signed tick offset.
    I64(i64),
    String(String),
    Array(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            // Register-sized values print as hex, padded to their width.
            Self::U8(v) => write!(f, "{v:#04X}"),
            Self::U16(v) => write!(f, "{v:#06X}"),
            Self::U32(v) => write!(f, "{v:#010X}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i64 => I64,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<crate::Ticks> for Value {
    fn from(v: crate::Ticks) -> Self {
        Self::U64(v.get())
    }
}

/// A chip whose state can be inspected at any tick.
pub trait Observable {
    /// Look up a dotted path such as `register` (SAM), `video.scanline` or
    /// `irq.pending` (GIME). `None` for an unknown path.
    fn query(&self, path: &str) -> Option<Value>;

    /// Every path [`query`](Self::query) answers.
    fn query_paths(&self) -> &'static [&'static str];
}
