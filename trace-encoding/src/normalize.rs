//! Rewrites version 1 argument vectors into the latest revision's layout.
//!
//! Every V1 event except `Batch` opens with a sequence delta that later
//! revisions removed, and a handful of types gained or lost arguments since.
//! Reshaping here keeps the decode loop itself identical across revisions.

use trace_event::{Event, EventType};

/// Reshapes a decoded V1 argument vector to the latest schema.
///
/// Vectors too short for their reshape are left alone; the trace state's
/// schema arity check reports those.
///
/// V1 `GoSysExit` is a known oddity: what the runtime emitted disagrees
/// with the declared schema, so its shape is passed through unchanged and
/// validated for minimum arity only.
pub(crate) fn to_latest(evt: &mut Event) {
    match evt.kind {
        // Stack payloads are version-shaped by frame size, not reshaped here.
        EventType::Stack | EventType::GoSysExit => {}

        // [processor id, seq, timestamp] carries its sequence mid-vector.
        EventType::Batch if evt.args.len() >= 3 => {
            evt.args.remove(1);
        }

        // Both carried a trailing unused argument in V1.
        EventType::Frequency | EventType::TimerGoroutine => {
            evt.args.truncate(1);
        }

        // [seq, ts, stack] -> [ts, SequenceGC = 0, stack]
        EventType::GCStart if evt.args.len() >= 2 => {
            evt.args.remove(0);
            evt.args.insert(1, 0);
        }

        // [seq, ts, goroutine id] -> [ts, goroutine id, Sequence = 0]
        EventType::GoStart if evt.args.len() >= 3 => {
            evt.args.remove(0);
            evt.args.push(0);
        }

        // [seq, ts, goroutine id, stack] -> [ts, goroutine id, Sequence = 0, stack]
        EventType::GoUnblock if evt.args.len() >= 3 => {
            evt.args.remove(0);
            evt.args.insert(2, 0);
        }

        // Everything else just drops the leading sequence delta.
        _ => {
            if !evt.args.is_empty() {
                evt.args.remove(0);
            }
        }
    }
}
