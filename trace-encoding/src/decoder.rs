//! Streaming decoder for the Go execution trace format.

use std::io::{self, BufRead, Read};

use tracing::debug;

use trace_event::{Event, EventType, Trace, Version, Visitor};

use crate::{codec_trace, header, leb128, normalize, EncodingError, Result, MAX_PAYLOAD};

/// Shift of the argument-count code within the event tag byte.
pub(crate) const ARG_COUNT_SHIFT: u32 = 6;

/// Low six bits of the tag byte carry the event type.
pub(crate) const TYPE_MASK: u8 = 0x3f;

const BUF_SIZE: usize = 8 * 1024;

/// A buffered, offset-tracking byte source with single-byte lookahead.
///
/// The buffer allocation survives [`ByteSource::reset`] so a decoder can be
/// rewound onto a new reader without touching the allocator.
struct ByteSource<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    cap: usize,
    off: usize,
}

impl<R: Read> ByteSource<R> {
    fn new(inner: R) -> ByteSource<R> {
        ByteSource {
            inner,
            buf: vec![0; BUF_SIZE].into_boxed_slice(),
            pos: 0,
            cap: 0,
            off: 0,
        }
    }

    /// Swaps in a new inner reader, keeping the buffer allocation.
    fn reset(&mut self, inner: R) {
        self.inner = inner;
        self.pos = 0;
        self.cap = 0;
        self.off = 0;
    }

    /// Bytes consumed from the stream so far.
    fn offset(&self) -> usize {
        self.off
    }

    /// Returns the next byte without consuming it, or `None` at end of
    /// stream.
    fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.fill()?.first().copied())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.fill()?.first().copied();
        if byte.is_some() {
            self.consume(1);
        }
        Ok(byte)
    }

    fn fill(&mut self) -> io::Result<&[u8]> {
        while self.pos == self.cap {
            match self.inner.read(&mut self.buf) {
                Ok(0) => break,
                Ok(n) => {
                    self.pos = 0;
                    self.cap = n;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(&self.buf[self.pos..self.cap])
    }
}

impl<R: Read> Read for ByteSource<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.cap && out.len() >= self.buf.len() {
            let n = self.inner.read(out)?;
            self.off += n;
            return Ok(n);
        }
        let available = self.fill()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for ByteSource<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.fill()
    }

    fn consume(&mut self, amt: usize) {
        let amt = amt.min(self.cap - self.pos);
        self.pos += amt;
        self.off += amt;
    }
}

/// Reads events encoded in the Go trace format from an input stream.
///
/// The decoder is pull-driven: each [`Decoder::decode`] call reads exactly
/// one event into the caller-supplied buffer, normalized to the latest
/// revision's layout. The first error is latched and every subsequent call
/// returns it until [`Decoder::reset`].
///
/// Reusing one [`Event`] across calls gives zero-allocation decoding once
/// its argument and data vectors are warm; generous starting capacities are
/// `args: 512` (stacks are depth × 4 values) and `data: 4096` (file paths
/// and function names).
pub struct Decoder<R> {
    src: ByteSource<R>,
    trace: Option<Trace>,
    max_version: Version,
    err: Option<EncodingError>,
}

impl<R: Read> Decoder<R> {
    /// Returns a new decoder reading from `r`, accepting every revision up
    /// to [`Version::LATEST`].
    pub fn new(r: R) -> Decoder<R> {
        Decoder::with_max_version(r, Version::LATEST)
    }

    /// Returns a new decoder that rejects headers declaring a revision
    /// newer than `max` as [`EncodingError::UnknownVersion`].
    pub fn with_max_version(r: R, max: Version) -> Decoder<R> {
        Decoder {
            src: ByteSource::new(r),
            trace: None,
            max_version: max,
            err: None,
        }
    }

    /// Resets the decoder to read a fresh trace from `r`, clearing any
    /// latched error. The internal read buffer is reused.
    pub fn reset(&mut self, r: R) {
        debug!("decoder reset");
        self.src.reset(r);
        self.trace = None;
        self.err = None;
    }

    /// The first error that occurred during decoding. A clean end of stream
    /// is a successful session and reads back as `None`.
    pub fn err(&self) -> Option<&EncodingError> {
        match &self.err {
            Some(EncodingError::EndOfStream) => None,
            other => other.as_ref(),
        }
    }

    /// The version declared by the trace header. Reads and parses the
    /// header on first use; no I/O occurs afterwards.
    pub fn version(&mut self) -> Result<Version> {
        if self.trace.is_none() && self.err.is_none() {
            self.init();
        }
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        match &self.trace {
            Some(trace) => Ok(trace.version()),
            None => Err(EncodingError::ConcurrentUse),
        }
    }

    /// True while events may still be retrieved. Once false, stays false
    /// until [`Decoder::reset`].
    pub fn more(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        match self.src.peek() {
            Ok(Some(_)) => true,
            Ok(None) => {
                // Out of bytes at an event boundary: clean only once the
                // header has been consumed.
                let err = if self.trace.is_some() {
                    EncodingError::EndOfStream
                } else {
                    EncodingError::UnexpectedEnd
                };
                self.latch(err);
                false
            }
            Err(err) => {
                self.latch(err);
                false
            }
        }
    }

    /// Decodes the next event from the input stream into `evt`.
    ///
    /// The event's existing argument and data storage is reused when its
    /// capacity suffices and grown otherwise. Returns
    /// [`EncodingError::EndOfStream`] once the stream ends cleanly after
    /// the header, [`EncodingError::UnexpectedEnd`] if it ends mid-event
    /// or before a complete header.
    pub fn decode(&mut self, evt: &mut Event) -> Result<()> {
        if self.trace.is_none() && self.err.is_none() {
            self.init();
        }
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let result = match self.trace.as_mut() {
            Some(trace) => decode_event(&mut self.src, trace, evt),
            None => Err(EncodingError::ConcurrentUse),
        };
        result.map_err(|err| self.latch(err))
    }

    /// The trace state accumulated by this session, once the header has
    /// been parsed. Stacks and strings referenced by decoded events resolve
    /// through it.
    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    fn init(&mut self) {
        if self.trace.is_some() {
            // A parsed header with init reached again means two callers
            // are driving this decoder.
            self.latch(EncodingError::ConcurrentUse);
            return;
        }
        match self.read_header() {
            Ok(version) => {
                debug!(%version, "trace header parsed");
                self.trace = Some(Trace::new(version));
            }
            Err(err) => {
                self.latch(err);
            }
        }
    }

    fn read_header(&mut self) -> Result<Version> {
        let mut buf = [0u8; header::LEN];
        self.src.read_exact(&mut buf)?;
        let version = header::decode(&buf)?;
        if version > self.max_version {
            return Err(EncodingError::UnknownVersion(
                version.go_version().to_string(),
            ));
        }
        Ok(version)
    }

    fn latch(&mut self, err: EncodingError) -> EncodingError {
        if self.err.is_none() {
            debug!(error = %err, "decoder halted");
        }
        self.err.get_or_insert(err).clone()
    }
}

/// Reads and validates one event, leaving `evt` normalized to the latest
/// revision and visited by the trace state.
fn decode_event<R: Read>(
    src: &mut ByteSource<R>,
    trace: &mut Trace,
    evt: &mut Event,
) -> Result<()> {
    evt.reset();

    let off = src.offset();
    let tag = match src.read_byte()? {
        Some(tag) => tag,
        None => return Err(EncodingError::EndOfStream),
    };

    let raw = tag & TYPE_MASK;
    let narg = (tag >> ARG_COUNT_SHIFT) as usize;
    let kind = EventType::from_raw(raw).ok_or(EncodingError::InvalidType(raw))?;

    let version = trace.version();
    if kind.since() > version {
        return Err(EncodingError::Unsupported { version, kind });
    }

    evt.kind = kind;
    evt.off = off;
    codec_trace!(kind = %kind, narg, off, "event tag read");

    // The two tag bits hold the argument count minus one. Events with four
    // or more arguments saturate at 3 and switch to a length-prefixed body;
    // strings are a special case carrying a string id plus raw bytes.
    if kind == EventType::String {
        decode_string(src, evt)?;
    } else if narg < 3 {
        decode_inline(src, narg + 1 + version.arg_offset(), evt)?;
    } else {
        decode_packed(src, evt)?;
    }

    if version == Version::V1 {
        normalize::to_latest(evt);
    }

    trace.visit(evt)?;
    Ok(())
}

/// Reads exactly `n` inline uleb128 arguments.
fn decode_inline<R: Read>(src: &mut ByteSource<R>, n: usize, evt: &mut Event) -> Result<()> {
    for _ in 0..n {
        evt.args.push(leb128::read(src)?);
    }
    Ok(())
}

/// Reads a length-prefixed body: one uleb128 byte length, then arguments
/// until the cursor has advanced past it.
fn decode_packed<R: Read>(src: &mut ByteSource<R>, evt: &mut Event) -> Result<()> {
    let len = leb128::read(src)?;
    if len > MAX_PAYLOAD {
        return Err(EncodingError::Oversize {
            size: len,
            limit: MAX_PAYLOAD,
        });
    }
    let end = src.offset() + len as usize;
    while src.offset() < end {
        evt.args.push(leb128::read(src)?);
    }
    Ok(())
}

/// Reads a string body: the string id, a byte length, then that many raw
/// bytes into the event's data buffer.
fn decode_string<R: Read>(src: &mut ByteSource<R>, evt: &mut Event) -> Result<()> {
    evt.args.push(leb128::read(src)?);

    let len = leb128::read(src)?;
    if len > MAX_PAYLOAD {
        return Err(EncodingError::Oversize {
            size: len,
            limit: MAX_PAYLOAD,
        });
    }
    evt.data.resize(len as usize, 0);
    src.read_exact(&mut evt.data)?;
    Ok(())
}
