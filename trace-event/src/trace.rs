use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use crate::event::{Event, EventType, Frame, Stack};
use crate::schema::Arg;
use crate::version::Version;
use crate::{EventError, IdKind, Result, MAX_STACK};

/// Implemented by anything that can visit one or more events of a trace.
pub trait Visitor {
    fn visit(&mut self, evt: &Event) -> Result<()>;
}

/// Shared state accumulated across the events of a single decode pass.
///
/// `String` and `Stack` events populate the dictionaries; every visited
/// event is validated against its schema's minimum arity. Stacks returned
/// from lookups are shared read-only references into this state and must not
/// be mutated; copy them if a mutable view is needed.
pub struct Trace {
    version: Version,
    frame_size: usize,
    strings: HashMap<u64, String>,
    stacks: HashMap<u64, Stack>,
    count: u64,
    // Written by Frequency events and validated on the way in, but not part
    // of the caller surface; nothing outside the tests reads it, hence the
    // allow.
    #[allow(dead_code)]
    frequency: Option<u64>,
}

impl Trace {
    pub fn new(version: Version) -> Trace {
        Trace {
            version,
            frame_size: version.frame_size(),
            strings: HashMap::new(),
            stacks: HashMap::new(),
            count: 0,
            frequency: None,
        }
    }

    /// Clears the dictionaries and counters for a fresh session, keeping the
    /// map allocations.
    pub fn reset(&mut self, version: Version) {
        self.version = version;
        self.frame_size = version.frame_size();
        self.strings.clear();
        self.stacks.clear();
        self.count = 0;
        self.frequency = None;
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Number of events successfully visited so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// The string dictionary built from visited `String` events.
    pub fn strings(&self) -> &HashMap<u64, String> {
        &self.strings
    }

    /// The stack dictionary built from visited `Stack` events.
    pub fn stacks(&self) -> &HashMap<u64, Stack> {
        &self.stacks
    }

    /// The stack associated with the given event, if any.
    ///
    /// Events that should carry a stack may still miss one: the defining
    /// `Stack` event may not have been sent yet, or the runtime omitted it
    /// entirely. This resolves the event's `StackID` argument; the new stack
    /// of a `GoCreate` event is reached through `evt.get(Arg::NewStackID)`
    /// and [`Trace::stack`] instead.
    pub fn stack_for(&self, evt: &Event) -> Result<&Stack> {
        self.stack(evt.get(Arg::StackID))
    }

    /// Looks up a stack by dictionary id.
    pub fn stack(&self, id: u64) -> Result<&Stack> {
        self.stacks.get(&id).ok_or(EventError::NotFound {
            kind: IdKind::Stack,
            id,
        })
    }

    /// Looks up a string by dictionary id.
    pub fn string(&self, id: u64) -> Result<&str> {
        self.strings
            .get(&id)
            .map(String::as_str)
            .ok_or(EventError::NotFound {
                kind: IdKind::String,
                id,
            })
    }

    /// Looks up a string by dictionary id, rendering missing entries as an
    /// `ID(<n> missing)` placeholder instead of failing. Intended for
    /// diagnostic output.
    pub fn string_or_missing(&self, id: u64) -> Cow<'_, str> {
        match self.strings.get(&id) {
            Some(s) => Cow::Borrowed(s.as_str()),
            None => Cow::Owned(format!("ID({id} missing)")),
        }
    }

    /// The name of the frame's enclosing function.
    pub fn frame_func(&self, frame: &Frame) -> Cow<'_, str> {
        self.string_or_missing(frame.func_id())
    }

    /// The name of the frame's source file.
    pub fn frame_file(&self, frame: &Frame) -> Cow<'_, str> {
        self.string_or_missing(frame.file_id())
    }

    /// A `Display` adaptor rendering one frame with resolved names.
    pub fn display_frame<'a>(&'a self, frame: &'a Frame) -> FrameDisplay<'a> {
        FrameDisplay { trace: self, frame }
    }

    /// A `Display` adaptor rendering a whole stack with resolved names.
    pub fn display_stack<'a>(&'a self, stack: &'a [Frame]) -> StackDisplay<'a> {
        StackDisplay { trace: self, stack }
    }

    fn validate_arg_count(&self, evt: &Event, min: usize, max: Option<usize>) -> Result<()> {
        let got = evt.args.len();
        if got < min {
            return Err(EventError::SchemaArity {
                kind: evt.kind,
                got,
                want: min,
            });
        }
        if let Some(max) = max {
            if got > max {
                return Err(EventError::SchemaArity {
                    kind: evt.kind,
                    got,
                    want: max,
                });
            }
        }
        Ok(())
    }

    fn visit_frequency(&mut self, evt: &Event) -> Result<()> {
        self.validate_arg_count(evt, 1, Some(1))?;
        let freq = evt.args[0];
        if freq == 0 {
            return Err(EventError::BadFrequency);
        }
        self.frequency = Some(freq);
        Ok(())
    }

    fn visit_string(&mut self, evt: &Event) -> Result<()> {
        self.validate_arg_count(evt, 1, Some(1))?;
        let id = evt.args[0];
        if id == 0 {
            return Err(EventError::ZeroId {
                kind: IdKind::String,
            });
        }
        let value = String::from_utf8_lossy(&evt.data).into_owned();
        match self.strings.entry(id) {
            Entry::Occupied(_) => Err(EventError::DuplicateId {
                kind: IdKind::String,
                id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Builds a stack from a decoded `Stack` event according to this state's
    /// frame size. Frame size 1 accommodates the PC-only frames of V1; every
    /// later revision interleaves PC, function id, file id and line.
    fn visit_stack(&mut self, evt: &Event) -> Result<()> {
        self.validate_arg_count(evt, 2, None)?;

        let (id, size) = (evt.args[0], evt.args[1]);
        if id == 0 {
            return Err(EventError::ZeroId { kind: IdKind::Stack });
        }
        if size > MAX_STACK {
            return Err(EventError::Oversize {
                size,
                limit: MAX_STACK,
            });
        }

        let frames = &evt.args[2..];
        if frames.len() != size as usize * self.frame_size {
            return Err(EventError::StackFrameMismatch {
                declared: size,
                args: frames.len(),
            });
        }

        let stack: Stack = match self.frame_size {
            1 => frames.iter().map(|&pc| Frame::from_pc(pc)).collect(),
            _ => frames
                .chunks_exact(4)
                .map(|f| Frame::new(f[0], f[1], f[2], f[3]))
                .collect(),
        };

        match self.stacks.entry(id) {
            Entry::Occupied(_) => Err(EventError::DuplicateId {
                kind: IdKind::Stack,
                id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(stack);
                Ok(())
            }
        }
    }
}

impl Visitor for Trace {
    /// Validates the event against its schema and applies any side effects
    /// to the dictionaries. Events are expected to have been normalized to
    /// the latest revision's layout before visiting.
    fn visit(&mut self, evt: &Event) -> Result<()> {
        if !evt.kind.valid() {
            return Err(EventError::InvalidType(evt.kind as u8));
        }

        let want = evt.kind.args().len();
        if evt.args.len() < want {
            return Err(EventError::SchemaArity {
                kind: evt.kind,
                got: evt.args.len(),
                want,
            });
        }

        match evt.kind {
            EventType::Frequency => self.visit_frequency(evt)?,
            EventType::String => self.visit_string(evt)?,
            EventType::Stack => self.visit_stack(evt)?,
            _ => {}
        }

        self.count += 1;
        Ok(())
    }
}

pub struct FrameDisplay<'a> {
    trace: &'a Trace,
    frame: &'a Frame,
}

impl fmt::Display for FrameDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [PC {}]\n\t{}:{}",
            self.trace.frame_func(self.frame),
            self.frame.pc(),
            self.trace.frame_file(self.frame),
            self.frame.line(),
        )
    }
}

pub struct StackDisplay<'a> {
    trace: &'a Trace,
    stack: &'a [Frame],
}

impl fmt::Display for StackDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stack[{}]:", self.stack.len())?;
        for frame in self.stack {
            writeln!(f, "{}", self.trace.display_frame(frame))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn trace() -> Trace {
        Trace::new(Version::LATEST)
    }

    fn string_event(id: u64, data: &[u8]) -> Event {
        Event {
            kind: EventType::String,
            args: vec![id],
            data: data.to_vec(),
            ..Event::default()
        }
    }

    fn stack_event(args: &[u64]) -> Event {
        Event {
            kind: EventType::Stack,
            args: args.to_vec(),
            ..Event::default()
        }
    }

    #[rstest]
    fn string_dictionary_builds_up(mut trace: Trace) {
        for id in 1..=4u64 {
            let evt = string_event(id, format!("s{id}").as_bytes());
            trace.visit(&evt).unwrap();
        }
        assert_eq!(trace.strings().len(), 4);
        assert_eq!(trace.count(), 4);
        assert_eq!(trace.string(3).unwrap(), "s3");
        assert_eq!(trace.string_or_missing(2), "s2");
        assert_eq!(trace.string_or_missing(9), "ID(9 missing)");
        assert_eq!(
            trace.string(9),
            Err(EventError::NotFound {
                kind: IdKind::String,
                id: 9
            })
        );
    }

    #[rstest]
    fn duplicate_string_id_fails(mut trace: Trace) {
        trace.visit(&string_event(5, b"foo")).unwrap();
        let err = trace.visit(&string_event(5, b"bar")).unwrap_err();
        assert_eq!(
            err,
            EventError::DuplicateId {
                kind: IdKind::String,
                id: 5
            }
        );
        assert_eq!(trace.string(5).unwrap(), "foo");
        assert_eq!(trace.count(), 1);
    }

    #[rstest]
    fn zero_string_id_fails(mut trace: Trace) {
        let err = trace.visit(&string_event(0, b"foo")).unwrap_err();
        assert_eq!(
            err,
            EventError::ZeroId {
                kind: IdKind::String
            }
        );
    }

    #[rstest]
    fn invalid_utf8_is_replaced(mut trace: Trace) {
        trace.visit(&string_event(1, b"fo\xffo")).unwrap();
        assert_eq!(trace.string(1).unwrap(), "fo\u{fffd}o");
    }

    #[rstest]
    fn stack_frames_latest_width(mut trace: Trace) {
        trace
            .visit(&stack_event(&[1, 1, 0xabc, 10, 20, 42]))
            .unwrap();
        let stack = trace.stack(1).unwrap();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0].pc(), 0xabc);
        assert_eq!(stack[0].func_id(), 10);
        assert_eq!(stack[0].file_id(), 20);
        assert_eq!(stack[0].line(), 42);

        let err = trace
            .visit(&stack_event(&[1, 1, 0xdef, 11, 21, 43]))
            .unwrap_err();
        assert_eq!(
            err,
            EventError::DuplicateId {
                kind: IdKind::Stack,
                id: 1
            }
        );
    }

    #[test]
    fn stack_frames_v1_width() {
        let mut trace = Trace::new(Version::V1);
        trace.visit(&stack_event(&[7, 3, 0x10, 0x20, 0x30])).unwrap();
        let stack = trace.stack(7).unwrap();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack[2].pc(), 0x30);
        assert_eq!(stack[2].func_id(), 0);
    }

    #[rstest]
    fn stack_size_limit(mut trace: Trace) {
        let mut args = vec![1, MAX_STACK + 1];
        args.resize(2 + (MAX_STACK as usize + 1) * 4, 0xab);
        let err = trace.visit(&stack_event(&args)).unwrap_err();
        assert_eq!(
            err,
            EventError::Oversize {
                size: MAX_STACK + 1,
                limit: MAX_STACK
            }
        );
    }

    #[rstest]
    fn stack_frame_mismatch(mut trace: Trace) {
        let err = trace.visit(&stack_event(&[1, 2, 0xabc, 10, 20, 42])).unwrap_err();
        assert_eq!(
            err,
            EventError::StackFrameMismatch {
                declared: 2,
                args: 4
            }
        );
    }

    #[rstest]
    fn zero_stack_id_fails(mut trace: Trace) {
        let err = trace
            .visit(&stack_event(&[0, 1, 0xabc, 10, 20, 42]))
            .unwrap_err();
        assert_eq!(err, EventError::ZeroId { kind: IdKind::Stack });
    }

    #[rstest]
    fn schema_arity_enforced(mut trace: Trace) {
        let evt = Event {
            kind: EventType::GoUnblock,
            args: vec![100, 7],
            ..Event::default()
        };
        let err = trace.visit(&evt).unwrap_err();
        assert_eq!(
            err,
            EventError::SchemaArity {
                kind: EventType::GoUnblock,
                got: 2,
                want: 4
            }
        );
        assert_eq!(trace.count(), 0);
    }

    #[rstest]
    fn invalid_type_rejected(mut trace: Trace) {
        let evt = Event::default();
        assert_eq!(trace.visit(&evt).unwrap_err(), EventError::InvalidType(0));
    }

    #[rstest]
    fn frequency_must_be_positive(mut trace: Trace) {
        let mut evt = Event {
            kind: EventType::Frequency,
            args: vec![0],
            ..Event::default()
        };
        assert_eq!(trace.visit(&evt).unwrap_err(), EventError::BadFrequency);
        assert_eq!(trace.frequency, None);

        evt.args[0] = 1_000_000;
        trace.visit(&evt).unwrap();
        assert_eq!(trace.count(), 1);
        assert_eq!(trace.frequency, Some(1_000_000));
    }

    #[rstest]
    fn stack_for_resolves_by_schema_position(mut trace: Trace) {
        trace
            .visit(&stack_event(&[42, 1, 0xabc, 10, 20, 7]))
            .unwrap();

        let evt = Event {
            kind: EventType::GoBlock,
            args: vec![123, 42],
            ..Event::default()
        };
        trace.visit(&evt).unwrap();
        let stack = trace.stack_for(&evt).unwrap();
        assert_eq!(stack[0].pc(), 0xabc);

        let no_stack = Event {
            kind: EventType::ProcStop,
            args: vec![123],
            ..Event::default()
        };
        assert_eq!(
            trace.stack_for(&no_stack),
            Err(EventError::NotFound {
                kind: IdKind::Stack,
                id: 0
            })
        );
    }

    #[rstest]
    fn frame_rendering_resolves_names(mut trace: Trace) {
        trace.visit(&string_event(10, b"main.main")).unwrap();
        trace.visit(&string_event(20, b"main.go")).unwrap();
        trace
            .visit(&stack_event(&[1, 1, 0xabc, 10, 20, 42]))
            .unwrap();

        let stack = trace.stack(1).unwrap().clone();
        let rendered = trace.display_stack(&stack).to_string();
        assert!(rendered.starts_with("Stack[1]:\n"));
        assert!(rendered.contains("main.main [PC 2748]"));
        assert!(rendered.contains("main.go:42"));
    }

    #[rstest]
    fn missing_frame_names_render_placeholder(mut trace: Trace) {
        trace
            .visit(&stack_event(&[1, 1, 0xabc, 10, 20, 42]))
            .unwrap();
        let stack = trace.stack(1).unwrap().clone();
        let rendered = trace.display_frame(&stack[0]).to_string();
        assert!(rendered.contains("ID(10 missing)"));
        assert!(rendered.contains("ID(20 missing):42"));
    }

    #[rstest]
    fn reset_clears_session(mut trace: Trace) {
        trace.visit(&string_event(1, b"foo")).unwrap();
        trace.reset(Version::V1);
        assert_eq!(trace.count(), 0);
        assert!(trace.strings().is_empty());
        assert_eq!(trace.version(), Version::V1);
        assert_eq!(trace.frame_size, 1);
    }
}
