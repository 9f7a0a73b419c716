//! Tagged save-state framing.
//!
//! A component's state is a flat list of fields, each introduced by a stable
//! small-integer id:
//!
//! ```text
//! id (u8, non-zero) | length (LEB128) | payload (length bytes)
//! ...
//! 0                                   (terminator)
//! ```
//!
//! Loaders apply the ids they recognise and skip the rest, and fields that
//! are absent keep whatever value the component already had. Pending events
//! are stored as a signed offset from the clock at save time and re-anchored
//! to the clock at load time.
//!
//! Components describe themselves with a `&[Field<T>]` table of
//! `(id, save, load)` triples instead of raw struct offsets.

use thiserror::Error;

use crate::Ticks;

/// Malformed save-state data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("save-state truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("field {id}: payload shorter than its contents")]
    FieldOverrun { id: u8 },
    #[error("field {id}: {extra} trailing bytes")]
    FieldUnderrun { id: u8, extra: usize },
    #[error("field {id}: value {value} out of range")]
    BadValue { id: u8, value: u32 },
}

/// One serialisable field of `T`.
pub struct Field<T> {
    pub id: u8,
    pub save: fn(&T, &mut FieldWriter),
    pub load: fn(&mut T, &mut FieldReader<'_>),
}

/// Builds a tagged state stream.
#[derive(Debug)]
pub struct StateWriter {
    buf: Vec<u8>,
    now: Ticks,
}

impl StateWriter {
    /// `now` is the clock reading that event offsets are relative to.
    #[must_use]
    pub fn new(now: Ticks) -> Self {
        Self { buf: Vec::new(), now }
    }

    /// Write one field. `id` must be non-zero.
    pub fn field(&mut self, id: u8, write: impl FnOnce(&mut FieldWriter)) {
        debug_assert_ne!(id, 0, "field id 0 is the terminator");
        let mut field = FieldWriter {
            buf: Vec::new(),
            now: self.now,
        };
        write(&mut field);
        self.buf.push(id);
        put_leb128(&mut self.buf, field.buf.len());
        self.buf.extend_from_slice(&field.buf);
    }

    /// Append the terminator and return the encoded stream.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.push(0);
        self.buf
    }
}

/// Payload of a single field under construction.
#[derive(Debug)]
pub struct FieldWriter {
    buf: Vec<u8>,
    now: Ticks,
}

impl FieldWriter {
    pub fn put_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// A tick, stored relative to the clock at save time.
    pub fn put_tick(&mut self, tick: Ticks) {
        self.buf
            .extend_from_slice(&tick.offset_from(self.now).to_le_bytes());
    }

    /// A pending event: queued flag followed by its relative tick.
    pub fn put_event(&mut self, at: Option<Ticks>) {
        self.put_bool(at.is_some());
        self.put_tick(at.unwrap_or(self.now));
    }
}

/// Walks a tagged state stream.
///
/// The first error is sticky: once set, [`next_field`](Self::next_field)
/// yields nothing and [`finish`](Self::finish) reports it.
#[derive(Debug)]
pub struct StateReader<'a> {
    data: &'a [u8],
    pos: usize,
    now: Ticks,
    error: Option<StateError>,
    terminated: bool,
}

impl<'a> StateReader<'a> {
    /// `now` is the clock reading that event offsets are re-anchored to.
    #[must_use]
    pub fn new(data: &'a [u8], now: Ticks) -> Self {
        Self {
            data,
            pos: 0,
            now,
            error: None,
            terminated: false,
        }
    }

    /// Next field, or `None` at the terminator or after an error.
    pub fn next_field(&mut self) -> Option<FieldReader<'a>> {
        if self.error.is_some() || self.terminated {
            return None;
        }
        let Some(&id) = self.data.get(self.pos) else {
            self.fail(StateError::Truncated { offset: self.pos });
            return None;
        };
        self.pos += 1;
        if id == 0 {
            self.terminated = true;
            return None;
        }
        let Some((len, used)) = get_leb128(&self.data[self.pos..]) else {
            self.fail(StateError::Truncated { offset: self.pos });
            return None;
        };
        self.pos += used;
        let Some(payload) = self.data.get(self.pos..self.pos + len) else {
            self.fail(StateError::Truncated { offset: self.pos });
            return None;
        };
        self.pos += len;
        Some(FieldReader {
            id,
            data: payload,
            pos: 0,
            now: self.now,
            error: None,
        })
    }

    /// Record an error. Only the first one is kept.
    pub fn fail(&mut self, error: StateError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Fold a consumed field's outcome into the stream's error state.
    pub fn complete(&mut self, field: FieldReader<'_>) {
        if let Err(e) = field.finish() {
            self.fail(e);
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&StateError> {
        self.error.as_ref()
    }

    pub fn finish(self) -> Result<(), StateError> {
        match self.error {
            Some(e) => Err(e),
            None if !self.terminated => Err(StateError::Truncated { offset: self.pos }),
            None => Ok(()),
        }
    }
}

/// Payload of a single field being decoded.
///
/// Reads past the end of the payload return zero and flag an overrun.
#[derive(Debug)]
pub struct FieldReader<'a> {
    id: u8,
    data: &'a [u8],
    pos: usize,
    now: Ticks,
    error: Option<StateError>,
}

impl FieldReader<'_> {
    #[must_use]
    pub fn id(&self) -> u8 {
        self.id
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if self.error.is_some() {
            return out;
        }
        match self.data.get(self.pos..self.pos + N) {
            Some(bytes) => {
                out.copy_from_slice(bytes);
                self.pos += N;
            }
            None => self.error = Some(StateError::FieldOverrun { id: self.id }),
        }
        out
    }

    pub fn get_bool(&mut self) -> bool {
        self.take::<1>()[0] != 0
    }

    pub fn get_u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    pub fn get_u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    pub fn get_u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    /// Fill `out` from the payload.
    pub fn get_bytes(&mut self, out: &mut [u8]) {
        if self.error.is_some() {
            return;
        }
        match self.data.get(self.pos..self.pos + out.len()) {
            Some(bytes) => {
                out.copy_from_slice(bytes);
                self.pos += out.len();
            }
            None => self.error = Some(StateError::FieldOverrun { id: self.id }),
        }
    }

    pub fn get_tick(&mut self) -> Ticks {
        let offset = i64::from_le_bytes(self.take());
        Ticks::from_offset(self.now, offset)
    }

    pub fn get_event(&mut self) -> Option<Ticks> {
        let queued = self.get_bool();
        let at = self.get_tick();
        queued.then_some(at)
    }

    /// Flag a decoded value that the component cannot represent.
    pub fn reject(&mut self, value: u32) {
        if self.error.is_none() {
            self.error = Some(StateError::BadValue { id: self.id, value });
        }
    }

    fn finish(self) -> Result<(), StateError> {
        match self.error {
            Some(e) => Err(e),
            None if self.pos < self.data.len() => Err(StateError::FieldUnderrun {
                id: self.id,
                extra: self.data.len() - self.pos,
            }),
            None => Ok(()),
        }
    }
}

/// Write every field of `item` described by `fields`.
pub fn save_fields<T>(item: &T, fields: &[Field<T>], writer: &mut StateWriter) {
    for field in fields {
        writer.field(field.id, |w| (field.save)(item, w));
    }
}

/// Apply a whole stream to `item`, skipping unknown ids.
pub fn load_fields<T>(item: &mut T, fields: &[Field<T>], reader: &mut StateReader<'_>) {
    while let Some(mut data) = reader.next_field() {
        match fields.iter().find(|f| f.id == data.id()) {
            Some(field) => {
                (field.load)(item, &mut data);
                reader.complete(data);
            }
            None => log::debug!("save-state: skipping unknown field {}", data.id()),
        }
    }
}

/// Encode `item` as a complete state stream.
#[must_use]
pub fn save_state<T>(item: &T, fields: &[Field<T>], now: Ticks) -> Vec<u8> {
    let mut writer = StateWriter::new(now);
    save_fields(item, fields, &mut writer);
    writer.finish()
}

/// Decode a state stream into `item`.
///
/// Fields are applied to a copy which replaces `item` only if the whole
/// stream decodes cleanly, so a failed load leaves `item` untouched.
pub fn load_state<T: Clone>(
    item: &mut T,
    fields: &[Field<T>],
    data: &[u8],
    now: Ticks,
) -> Result<(), StateError> {
    let mut staged = item.clone();
    let mut reader = StateReader::new(data, now);
    load_fields(&mut staged, fields, &mut reader);
    match reader.finish() {
        Ok(()) => {
            *item = staged;
            Ok(())
        }
        Err(e) => {
            log::warn!("save-state load failed: {e}");
            Err(e)
        }
    }
}

fn put_leb128(buf: &mut Vec<u8>, mut value: usize) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn get_leb128(data: &[u8]) -> Option<(usize, usize)> {
    let mut value = 0usize;
    for (i, &byte) in data.iter().enumerate().take(5) {
        value |= usize::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}
