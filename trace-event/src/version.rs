use crate::event::EventType;
use crate::EventError;

/// A revision of the trace wire format, tied to the Go release that
/// introduced it.
///
/// - `V1` — Go 1.5, 2015/08/19: initial release.
/// - `V2` — Go 1.7, 2016/08/15: added the string dictionary and local events.
/// - `V3` — Go 1.8, 2017/02/16: added GoStartLabel and GoBlockGC.
/// - `V4` — Go 1.9, 2017/08/24: added the GC mark assist pair.
/// - `V5` — Go 1.11, 2018/08/24: added the user annotation events.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    V1 = 1,
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,
}

impl Version {
    /// The newest supported revision.
    pub const LATEST: Version = Version::V5;

    pub fn from_raw(raw: u8) -> Option<Version> {
        match raw {
            1 => Some(Version::V1),
            2 => Some(Version::V2),
            3 => Some(Version::V3),
            4 => Some(Version::V4),
            5 => Some(Version::V5),
            _ => None,
        }
    }

    /// The Go release this revision shipped with, e.g. `"1.9"`.
    pub fn go_version(self) -> &'static str {
        match self {
            Version::V1 => "1.5",
            Version::V2 => "1.7",
            Version::V3 => "1.8",
            Version::V4 => "1.9",
            Version::V5 => "1.11",
        }
    }

    /// Number of arguments each stack frame occupies in a `Stack` event.
    ///
    /// V1 frames are a bare program counter; every later revision carries
    /// PC, function string id, file string id and line number.
    pub fn frame_size(self) -> usize {
        match self {
            Version::V1 => 1,
            _ => 4,
        }
    }

    /// Extra leading inline argument carried by every V1 event (a sequence
    /// delta that later revisions removed).
    pub fn arg_offset(self) -> usize {
        match self {
            Version::V1 => 1,
            _ => 0,
        }
    }

    /// Event types that may legally appear in a stream of this revision.
    ///
    /// Argument schemas always describe the latest revision's layout.
    pub fn types(self) -> impl Iterator<Item = EventType> {
        EventType::all().filter(move |t| t.since() <= self)
    }
}

impl TryFrom<u8> for Version {
    type Error = EventError;

    fn try_from(raw: u8) -> Result<Version, EventError> {
        Version::from_raw(raw).ok_or(EventError::UnknownVersion(raw))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Version(#{} [Go {}])", *self as u8, self.go_version())
    }
}
