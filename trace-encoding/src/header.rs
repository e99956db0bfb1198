//! The 16-byte trace header: `go N.M trace` NUL-padded to 16 bytes, where
//! `N.M` is the Go release the emitting runtime shipped with.

use crate::{EncodingError, Result};
use trace_event::Version;

/// Exact size of the header in bytes.
pub const LEN: usize = 16;

const MAGIC: &[u8] = b"go ";
const SUFFIX: &[u8] = b"trace";

/// Parses a header, returning the trace version it declares.
///
/// Deviations in the literal bytes fail with
/// [`EncodingError::MalformedHeader`]; a structurally valid header whose
/// version token is not a known release fails with
/// [`EncodingError::UnknownVersion`].
pub fn decode(buf: &[u8; LEN]) -> Result<Version> {
    // "go 1.8 trace\x00\x00\x00\x00"
    //  +++|------------------------
    if &buf[..3] != MAGIC {
        return Err(EncodingError::MalformedHeader);
    }

    // "go 1.8 trace\x00\x00\x00\x00"
    //  xxx++|-------------------
    if buf[3] != b'1' || buf[4] != b'.' {
        return Err(EncodingError::MalformedHeader);
    }

    // One or two minor-version digits, then a space. Two-digit minors eat
    // one byte of the padding ("go 1.11 trace" carries one fewer NUL).
    let mut end = 5;
    while end < 7 && buf[end].is_ascii_digit() {
        end += 1;
    }
    if end == 5 || buf[end] != b' ' {
        return Err(EncodingError::MalformedHeader);
    }
    let minor = &buf[5..end];

    // "go 1.8 trace\x00\x00\x00\x00"
    //  xxxxxxx+++++++++++++++++++++|
    let (name, padding) = buf[end + 1..].split_at(SUFFIX.len());
    if name != SUFFIX || padding.iter().any(|&b| b != 0) {
        return Err(EncodingError::MalformedHeader);
    }

    match minor {
        b"5" => Ok(Version::V1),
        b"7" => Ok(Version::V2),
        b"8" => Ok(Version::V3),
        b"9" => Ok(Version::V4),
        b"11" => Ok(Version::V5),
        _ => Err(EncodingError::UnknownVersion(format!(
            "1.{}",
            String::from_utf8_lossy(minor)
        ))),
    }
}

/// The canonical header bytes for a trace of the given version.
pub fn encode(version: Version) -> &'static [u8; LEN] {
    match version {
        Version::V1 => b"go 1.5 trace\x00\x00\x00\x00",
        Version::V2 => b"go 1.7 trace\x00\x00\x00\x00",
        Version::V3 => b"go 1.8 trace\x00\x00\x00\x00",
        Version::V4 => b"go 1.9 trace\x00\x00\x00\x00",
        Version::V5 => b"go 1.11 trace\x00\x00\x00",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Version::V1)]
    #[case(Version::V2)]
    #[case(Version::V3)]
    #[case(Version::V4)]
    #[case(Version::V5)]
    fn canonical_headers_round_trip(#[case] version: Version) {
        let buf = encode(version);
        assert_eq!(buf.len(), LEN);
        assert_eq!(decode(buf).unwrap(), version);
    }

    #[test]
    fn revision_four_reference_bytes() {
        let buf: [u8; LEN] = [
            0x67, 0x6f, 0x20, 0x31, 0x2e, 0x39, 0x20, 0x74, 0x72, 0x61, 0x63, 0x65, 0x00, 0x00,
            0x00, 0x00,
        ];
        assert_eq!(decode(&buf).unwrap(), Version::V4);
        assert_eq!(encode(Version::V4), &buf);
    }

    #[rstest]
    #[case(0, b'x')] // magic
    #[case(2, b'_')] // magic separator
    #[case(3, b'2')] // major version
    #[case(4, b',')] // version dot
    #[case(6, b'_')] // version separator
    #[case(8, b'R')] // suffix
    #[case(15, 0x1)] // padding
    fn corrupt_byte_is_malformed(#[case] pos: usize, #[case] byte: u8) {
        let mut buf = *encode(Version::V4);
        buf[pos] = byte;
        assert!(matches!(
            decode(&buf),
            Err(EncodingError::MalformedHeader)
        ));
    }

    #[rstest]
    #[case(b"go 1.6 trace\x00\x00\x00\x00", "1.6")]
    #[case(b"go 1.12 trace\x00\x00\x00", "1.12")]
    fn unknown_release_token(#[case] buf: &[u8; LEN], #[case] token: &str) {
        match decode(buf) {
            Err(EncodingError::UnknownVersion(got)) => assert_eq!(got, token),
            other => panic!("expected UnknownVersion, got {other:?}"),
        }
    }
}
