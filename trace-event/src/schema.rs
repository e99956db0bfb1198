use crate::event::EventType;
use crate::version::Version;

/// The closed vocabulary of argument keys an event schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arg {
    Timestamp,
    RealTimestamp,
    Frequency,
    Sequence,
    SequenceGC,
    StackID,
    StackSize,
    NewStackID,
    StringID,
    LabelStringID,
    ThreadID,
    ProcessorID,
    GoroutineID,
    NewGoroutineID,
    Gomaxprocs,
    HeapAlloc,
    NextGC,
    Kind,
    TaskID,
    TaskParentID,
    TaskMode,
    KeyID,
    ValueID,
    NameID,
}

/// Static description of one event type: display name, introducing
/// revision, and the ordered argument keys of the latest revision's layout.
///
/// `Stack` and `String` events carry additional payload past their declared
/// arguments (frames and raw bytes respectively); the schema arity is a
/// minimum, not an exact count.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub since: Version,
    pub args: &'static [Arg],
}

pub(crate) fn lookup(kind: EventType) -> &'static Schema {
    &SCHEMAS[kind as u8 as usize % EventType::COUNT as usize]
}

use Arg::*;
use Version::*;

const fn schema(name: &'static str, since: Version, args: &'static [Arg]) -> Schema {
    Schema { name, since, args }
}

static SCHEMAS: [Schema; EventType::COUNT as usize] = [
    schema("None", V1, &[]),
    schema("Batch", V1, &[ProcessorID, Timestamp]),
    schema("Frequency", V1, &[Frequency]),
    schema("Stack", V1, &[StackID, StackSize]),
    schema("Gomaxprocs", V1, &[Timestamp, Gomaxprocs, StackID]),
    schema("ProcStart", V1, &[Timestamp, ThreadID]),
    schema("ProcStop", V1, &[Timestamp]),
    schema("GCStart", V1, &[Timestamp, SequenceGC, StackID]),
    schema("GCDone", V1, &[Timestamp]),
    schema("GCSTWStart", V1, &[Timestamp, Kind]),
    schema("GCSTWDone", V1, &[Timestamp]),
    schema("GCSweepStart", V1, &[Timestamp, StackID]),
    schema("GCSweepDone", V1, &[Timestamp]),
    schema(
        "GoCreate",
        V1,
        &[Timestamp, NewGoroutineID, NewStackID, StackID],
    ),
    schema("GoStart", V1, &[Timestamp, GoroutineID, Sequence]),
    schema("GoEnd", V1, &[Timestamp]),
    schema("GoStop", V1, &[Timestamp, StackID]),
    schema("GoSched", V1, &[Timestamp, StackID]),
    schema("GoPreempt", V1, &[Timestamp, StackID]),
    schema("GoSleep", V1, &[Timestamp, StackID]),
    schema("GoBlock", V1, &[Timestamp, StackID]),
    schema(
        "GoUnblock",
        V1,
        &[Timestamp, GoroutineID, Sequence, StackID],
    ),
    schema("GoBlockSend", V1, &[Timestamp, StackID]),
    schema("GoBlockRecv", V1, &[Timestamp, StackID]),
    schema("GoBlockSelect", V1, &[Timestamp, StackID]),
    schema("GoBlockSync", V1, &[Timestamp, StackID]),
    schema("GoBlockCond", V1, &[Timestamp, StackID]),
    schema("GoBlockNet", V1, &[Timestamp, StackID]),
    schema("GoSysCall", V1, &[Timestamp, StackID]),
    schema(
        "GoSysExit",
        V1,
        &[Timestamp, GoroutineID, Sequence, RealTimestamp],
    ),
    schema("GoSysBlock", V1, &[Timestamp]),
    schema("GoWaiting", V1, &[Timestamp, GoroutineID]),
    schema("GoInSyscall", V1, &[Timestamp, GoroutineID]),
    schema("HeapAlloc", V1, &[Timestamp, HeapAlloc]),
    schema("NextGC", V1, &[Timestamp, NextGC]),
    schema("TimerGoroutine", V1, &[GoroutineID]),
    schema("FutileWakeup", V1, &[Timestamp]),
    schema("String", V2, &[StringID]),
    schema("GoStartLocal", V2, &[Timestamp, GoroutineID]),
    schema("GoUnblockLocal", V2, &[Timestamp, GoroutineID, StackID]),
    schema(
        "GoSysExitLocal",
        V2,
        &[Timestamp, GoroutineID, RealTimestamp],
    ),
    schema(
        "GoStartLabel",
        V3,
        &[Timestamp, GoroutineID, Sequence, LabelStringID],
    ),
    schema("GoBlockGC", V3, &[Timestamp, StackID]),
    schema("GCMarkAssistStart", V4, &[Timestamp, StackID]),
    schema("GCMarkAssistDone", V4, &[Timestamp]),
    schema(
        "UserTaskCreate",
        V5,
        &[Timestamp, TaskID, TaskParentID, StackID, NameID],
    ),
    schema("UserTaskEnd", V5, &[Timestamp, TaskID, StackID]),
    schema(
        "UserRegion",
        V5,
        &[Timestamp, TaskID, TaskMode, StackID, NameID],
    ),
    schema(
        "UserLog",
        V5,
        &[Timestamp, TaskID, KeyID, StackID, ValueID],
    ),
];
