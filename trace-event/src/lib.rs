// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Go Execution Trace Events
//!
//! This crate provides the event model for the binary execution-trace format
//! emitted by the Go runtime: the closed set of event types, the per-type
//! argument schemas, the trace format revisions (Go 1.5 through Go 1.11), and
//! the shared [`Trace`] state that accumulates the string and stack
//! dictionaries referenced by identifier-valued event arguments.
//!
//! ## Events
//!
//! Every event is a tag from a dense, closed enumeration plus an ordered
//! vector of `u64` arguments. The argument layout of each type is described
//! by a static schema in the latest revision's shape; decoders for older
//! revisions normalize their payloads to match before handing events to a
//! [`Trace`]. Arguments are addressed positionally through the schema, so
//! `event.get(Arg::StackID)` works for every event type without per-event
//! allocation.
//!
//! ## Trace state
//!
//! `String` and `Stack` events populate dictionaries as they are visited;
//! later events reference those entries by identifier. A stream that
//! references an identifier before its defining event is malformed by
//! construction. The [`Trace`] validates each visited event against its
//! schema and rejects duplicate or zero identifiers.

pub mod event;
pub mod schema;
pub mod trace;
pub mod version;

use thiserror::Error;

pub use event::{Event, EventType, Frame, Stack};
pub use schema::Arg;
pub use trace::{Trace, Visitor};
pub use version::Version;

/// Guards against a bad trace or decoder bug causing oom.
pub const MAX_PAYLOAD: u64 = 1_000_000;

/// Upper bound on the number of frames in a single stack.
pub const MAX_STACK: u64 = 1_000;

/// The kind of dictionary entry an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    String,
    Stack,
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdKind::String => write!(f, "string"),
            IdKind::Stack => write!(f, "stack"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("invalid event type 0x{0:02x}")]
    InvalidType(u8),

    #[error("unknown trace version {0}")]
    UnknownVersion(u8),

    #[error("event {kind} only had {got} of {want} arguments")]
    SchemaArity {
        kind: EventType,
        got: usize,
        want: usize,
    },

    #[error("{kind} id 0 is invalid")]
    ZeroId { kind: IdKind },

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: IdKind, id: u64 },

    #[error("{kind} id {id} could not be found")]
    NotFound { kind: IdKind, id: u64 },

    #[error("stack size {size} exceeds limit {limit}")]
    Oversize { size: u64, limit: u64 },

    #[error("stack size {declared} does not match arg count {args}")]
    StackFrameMismatch { declared: u64, args: usize },

    #[error("timer frequency must be positive")]
    BadFrequency,
}

pub type Result<T> = std::result::Result<T, EventError>;
