use crate::schema::{self, Arg};
use crate::version::Version;

/// The type of a trace event.
///
/// The enumeration is dense and closed; tags are carried verbatim in the low
/// six bits of each event's first byte on the wire. The bracketed comments
/// give the normalized (latest revision) argument layout.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventType {
    /// Unused placeholder tag; never valid on the wire.
    #[default]
    None = 0,
    /// Start of a per-P batch of events [processor id, timestamp].
    Batch = 1,
    /// Tracer timer frequency [frequency (ticks per second)].
    Frequency = 2,
    /// Stack dictionary entry [stack id, number of PCs, {PC, func string id, file string id, line}...].
    Stack = 3,
    /// Current value of GOMAXPROCS [timestamp, GOMAXPROCS, stack id].
    Gomaxprocs = 4,
    /// Start of a P [timestamp, thread id].
    ProcStart = 5,
    /// Stop of a P [timestamp].
    ProcStop = 6,
    /// GC start [timestamp, seq, stack id].
    GCStart = 7,
    /// GC done [timestamp].
    GCDone = 8,
    /// GC stop-the-world start [timestamp, kind].
    GCSTWStart = 9,
    /// GC stop-the-world done [timestamp].
    GCSTWDone = 10,
    /// GC sweep start [timestamp, stack id].
    GCSweepStart = 11,
    /// GC sweep done [timestamp].
    GCSweepDone = 12,
    /// Goroutine creation [timestamp, new goroutine id, new stack id, stack id].
    GoCreate = 13,
    /// Goroutine starts running [timestamp, goroutine id, seq].
    GoStart = 14,
    /// Goroutine ends [timestamp].
    GoEnd = 15,
    /// Goroutine stops, as in select{} [timestamp, stack id].
    GoStop = 16,
    /// Goroutine calls Gosched [timestamp, stack id].
    GoSched = 17,
    /// Goroutine is preempted [timestamp, stack id].
    GoPreempt = 18,
    /// Goroutine calls Sleep [timestamp, stack id].
    GoSleep = 19,
    /// Goroutine blocks [timestamp, stack id].
    GoBlock = 20,
    /// Goroutine is unblocked [timestamp, goroutine id, seq, stack id].
    GoUnblock = 21,
    /// Goroutine blocks on chan send [timestamp, stack id].
    GoBlockSend = 22,
    /// Goroutine blocks on chan recv [timestamp, stack id].
    GoBlockRecv = 23,
    /// Goroutine blocks on select [timestamp, stack id].
    GoBlockSelect = 24,
    /// Goroutine blocks on Mutex/RWMutex [timestamp, stack id].
    GoBlockSync = 25,
    /// Goroutine blocks on Cond [timestamp, stack id].
    GoBlockCond = 26,
    /// Goroutine blocks on network [timestamp, stack id].
    GoBlockNet = 27,
    /// Syscall enter [timestamp, stack id].
    GoSysCall = 28,
    /// Syscall exit [timestamp, goroutine id, seq, real timestamp].
    GoSysExit = 29,
    /// Syscall blocks [timestamp].
    GoSysBlock = 30,
    /// Goroutine was blocked when tracing started [timestamp, goroutine id].
    GoWaiting = 31,
    /// Goroutine was in a syscall when tracing started [timestamp, goroutine id].
    GoInSyscall = 32,
    /// memstats.heap_live change [timestamp, heap_alloc].
    HeapAlloc = 33,
    /// memstats.next_gc change [timestamp, next_gc].
    NextGC = 34,
    /// Denotes the timer goroutine [timer goroutine id].
    TimerGoroutine = 35,
    /// The previous wakeup of this goroutine was futile [timestamp].
    FutileWakeup = 36,
    /// String dictionary entry [string id]; the body carries raw UTF-8.
    String = 37,
    /// Goroutine starts running on the same P as the last event [timestamp, goroutine id].
    GoStartLocal = 38,
    /// Goroutine is unblocked on the same P as the last event [timestamp, goroutine id, stack id].
    GoUnblockLocal = 39,
    /// Syscall exit on the same P as the last event [timestamp, goroutine id, real timestamp].
    GoSysExitLocal = 40,
    /// Goroutine starts running with a label [timestamp, goroutine id, seq, label string id].
    GoStartLabel = 41,
    /// Goroutine blocks on GC assist [timestamp, stack id].
    GoBlockGC = 42,
    /// GC mark assist start [timestamp, stack id].
    GCMarkAssistStart = 43,
    /// GC mark assist done [timestamp].
    GCMarkAssistDone = 44,
    /// User task creation [timestamp, task id, parent task id, stack id, name string id].
    UserTaskCreate = 45,
    /// User task end [timestamp, task id, stack id].
    UserTaskEnd = 46,
    /// User region [timestamp, task id, mode (0: start, 1: end), stack id, name string id].
    UserRegion = 47,
    /// User log message [timestamp, task id, key string id, stack id, value string id].
    UserLog = 48,
}

const ALL_TYPES: [EventType; 48] = [
    EventType::Batch,
    EventType::Frequency,
    EventType::Stack,
    EventType::Gomaxprocs,
    EventType::ProcStart,
    EventType::ProcStop,
    EventType::GCStart,
    EventType::GCDone,
    EventType::GCSTWStart,
    EventType::GCSTWDone,
    EventType::GCSweepStart,
    EventType::GCSweepDone,
    EventType::GoCreate,
    EventType::GoStart,
    EventType::GoEnd,
    EventType::GoStop,
    EventType::GoSched,
    EventType::GoPreempt,
    EventType::GoSleep,
    EventType::GoBlock,
    EventType::GoUnblock,
    EventType::GoBlockSend,
    EventType::GoBlockRecv,
    EventType::GoBlockSelect,
    EventType::GoBlockSync,
    EventType::GoBlockCond,
    EventType::GoBlockNet,
    EventType::GoSysCall,
    EventType::GoSysExit,
    EventType::GoSysBlock,
    EventType::GoWaiting,
    EventType::GoInSyscall,
    EventType::HeapAlloc,
    EventType::NextGC,
    EventType::TimerGoroutine,
    EventType::FutileWakeup,
    EventType::String,
    EventType::GoStartLocal,
    EventType::GoUnblockLocal,
    EventType::GoSysExitLocal,
    EventType::GoStartLabel,
    EventType::GoBlockGC,
    EventType::GCMarkAssistStart,
    EventType::GCMarkAssistDone,
    EventType::UserTaskCreate,
    EventType::UserTaskEnd,
    EventType::UserRegion,
    EventType::UserLog,
];

impl EventType {
    /// One past the highest assigned tag.
    pub const COUNT: u8 = 49;

    /// Maps a raw wire tag to its event type, rejecting `None` and
    /// everything at or above [`EventType::COUNT`].
    pub fn from_raw(raw: u8) -> Option<EventType> {
        if raw == 0 || raw >= Self::COUNT {
            return None;
        }
        Some(ALL_TYPES[raw as usize - 1])
    }

    /// All valid event types in tag order.
    pub fn all() -> impl Iterator<Item = EventType> {
        ALL_TYPES.iter().copied()
    }

    /// True for every tag strictly between `None` and [`EventType::COUNT`].
    pub fn valid(self) -> bool {
        self != EventType::None
    }

    /// The display name of this event type.
    pub fn name(self) -> &'static str {
        schema::lookup(self).name
    }

    /// The revision this event type was introduced in.
    pub fn since(self) -> Version {
        schema::lookup(self).since
    }

    /// The ordered argument keys of this type's normalized layout.
    pub fn args(self) -> &'static [Arg] {
        schema::lookup(self).args
    }

    /// The ordinal position of the named argument, if this type carries it.
    pub fn arg(self, name: Arg) -> Option<usize> {
        self.args().iter().position(|&a| a == name)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single decoded trace event.
///
/// The argument and data vectors keep their backing storage across
/// [`Event::reset`] calls, so one event can serve as the reusable buffer for
/// an entire decode session without further allocation once warm.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Event {
    /// The type of this event.
    pub kind: EventType,

    /// All uleb128-decoded arguments, normalized to the latest revision's
    /// layout. Arbitrary-length events like `Stack` append their tail here.
    pub args: Vec<u64>,

    /// Payload bytes for arguments that are not uleb128 encoded. Non-empty
    /// only for `String` events.
    pub data: Vec<u8>,

    /// Offset of this event's tag byte relative to the start of the input
    /// stream.
    pub off: usize,
}

impl Event {
    pub fn new() -> Event {
        Event::default()
    }

    /// Clears the event for reuse, preserving argument and data capacity.
    pub fn reset(&mut self) {
        self.kind = EventType::None;
        self.args.clear();
        self.data.clear();
        self.off = 0;
    }

    /// Returns the named argument, or zero if this event does not carry it.
    pub fn get(&self, name: Arg) -> u64 {
        self.lookup(name).unwrap_or(0)
    }

    /// Returns the named argument, or `None` if the schema does not declare
    /// it for this event type or the argument vector is too short.
    pub fn lookup(&self, name: Arg) -> Option<u64> {
        let idx = self.kind.arg(name)?;
        self.args.get(idx).copied()
    }

    /// Deep-copies another event into this one, reusing the existing
    /// argument and data storage where capacity allows.
    pub fn copy_from(&mut self, other: &Event) {
        self.kind = other.kind;
        self.off = other.off;
        self.args.clear();
        self.args.extend_from_slice(&other.args);
        self.data.clear();
        self.data.extend_from_slice(&other.data);
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            EventType::String => {
                write!(f, "{}({:?})", self.kind, String::from_utf8_lossy(&self.data))
            }
            EventType::Frequency => match self.args.first() {
                Some(freq) => write!(f, "{}({})", self.kind, freq),
                None => write!(f, "{}", self.kind),
            },
            _ => write!(f, "{}", self.kind),
        }
    }
}

/// An ordered sequence of frames, innermost first.
pub type Stack = Vec<Frame>;

/// A single frame within a stack trace.
///
/// The function and file fields are string-dictionary identifiers; resolve
/// them through [`crate::Trace::frame_func`] and [`crate::Trace::frame_file`].
/// V1 streams carry program counters only, leaving the rest zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pc: u64,
    func: u64,
    file: u64,
    line: u64,
}

impl Frame {
    pub(crate) fn from_pc(pc: u64) -> Frame {
        Frame {
            pc,
            ..Frame::default()
        }
    }

    pub(crate) fn new(pc: u64, func: u64, file: u64, line: u64) -> Frame {
        Frame {
            pc,
            func,
            file,
            line,
        }
    }

    /// The program counter of this frame.
    pub fn pc(self) -> u64 {
        self.pc
    }

    /// String-dictionary id of the enclosing function's name.
    pub fn func_id(self) -> u64 {
        self.func
    }

    /// String-dictionary id of the source file name.
    pub fn file_id(self) -> u64 {
        self.file
    }

    /// The source line of this frame.
    pub fn line(self) -> u64 {
        self.line
    }
}
