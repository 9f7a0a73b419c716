//! Core types for tick-accurate, event-driven emulation.
//!
//! Everything is timed against the master crystal. Chips never advance the
//! clock themselves: the machine's run loop owns the tick counter and the
//! event queues, and chips read `now` and schedule [`Event`]s against it.

mod clock;
mod event;
mod observable;
pub mod state;
mod ticks;

pub use clock::MasterClock;
pub use event::{Event, EventQueue};
pub use observable::{Observable, Value};
pub use state::{Field, FieldReader, FieldWriter, StateError, StateReader, StateWriter};
pub use ticks::Ticks;
