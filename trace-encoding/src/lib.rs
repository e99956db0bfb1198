//! # Go Execution Trace Encoding
//!
//! A streaming [`Decoder`] and [`Encoder`] for all versions of the Go
//! execution trace wire format (Go 1.5 through Go 1.11).
//!
//! ## Overview
//!
//! The decoder reads every previous version of the trace codec while only
//! surfacing events in the latest version's shape. It does not buffer
//! events: each one is decoded straight into a caller-supplied buffer, so a
//! steady-state decode loop performs no allocation once the buffer is warm.
//! That makes it cheap enough to decode in the same process that is
//! producing the trace, deferring writes to network or disk until something
//! interesting happens.
//!
//! The encoder is the inverse transformation and always emits the latest
//! supported version. Its output is lexically correct — the decoder will
//! read it back — but logical consistency with runtime-produced traces is
//! the caller's responsibility, which makes it suitable for testing systems
//! that consume trace streams, adversarial inputs included.
//!
//! ## Compatibility
//!
//! The trace format keeps evolving as events are added and refined.
//! Representing each event in its native version's shape would push one
//! special case per version onto every consumer, so instead older payloads
//! are normalized during decode: version 1's extra leading sequence deltas
//! are absorbed and its reshaped events are rewritten to the latest layout.
//! See [`trace_event`] for the event model and per-type schemas.

pub mod decoder;
pub mod encoder;
pub mod header;
pub mod leb128;
mod normalize;
mod trace_macro;

use std::io;
use std::sync::Arc;

use thiserror::Error;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use trace_event::{Arg, Event, EventType, Frame, Stack, Trace, Version, Visitor};
pub use trace_event::{EventError, MAX_PAYLOAD, MAX_STACK};

#[derive(Error, Debug, Clone)]
pub enum EncodingError {
    /// The source ended at a clean event boundary after the header was
    /// parsed. This terminates a session successfully; [`Decoder::err`]
    /// reads it back as no error at all.
    #[error("end of stream")]
    EndOfStream,

    /// The source ended mid-header or mid-event.
    #[error("unexpected end of stream")]
    UnexpectedEnd,

    #[error("trace header was malformed")]
    MalformedHeader,

    #[error("unknown trace version {0:?}")]
    UnknownVersion(String),

    #[error("invalid event type 0x{0:02x}")]
    InvalidType(u8),

    #[error("version {version} does not support event {kind}")]
    Unsupported { version: Version, kind: EventType },

    #[error("uleb128 value overflowed")]
    LebOverflow,

    #[error("size {size} exceeds allocation limit {limit}")]
    Oversize { size: u64, limit: u64 },

    #[error("expected at least {want} argument(s) for event {kind}")]
    MissingArgs { kind: EventType, want: usize },

    #[error("possible unsafe usage from multiple threads")]
    ConcurrentUse,

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for EncodingError {
    fn from(err: io::Error) -> EncodingError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            EncodingError::UnexpectedEnd
        } else {
            EncodingError::Io(Arc::new(err))
        }
    }
}

pub type Result<T> = std::result::Result<T, EncodingError>;
