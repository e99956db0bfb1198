//! Streaming encoder for the Go execution trace format.

use std::io::{self, Write};

use tracing::debug;

use trace_event::{Event, EventType, Version};

use crate::{codec_trace, header, leb128, EncodingError, Result};

use crate::decoder;

/// An output sink that tracks how many bytes have been written.
struct OffsetWriter<W> {
    inner: W,
    off: usize,
}

impl<W: Write> OffsetWriter<W> {
    fn new(inner: W) -> OffsetWriter<W> {
        OffsetWriter { inner, off: 0 }
    }

    fn reset(&mut self, inner: W) {
        self.inner = inner;
        self.off = 0;
    }

    fn offset(&self) -> usize {
        self.off
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)?;
        self.off += buf.len();
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.write_all(&[byte])
    }

    fn write_uleb(&mut self, v: u64) -> Result<()> {
        let n = leb128::write(&mut self.inner, v)?;
        self.off += n;
        Ok(())
    }
}

/// Writes events encoded in the Go trace format to an output stream.
///
/// Events produced by the encoder are always lexically correct; logical
/// consistency with runtime-produced traces is the caller's responsibility.
/// That makes it suitable for exercising systems that consume or parse
/// trace streams, adversarial inputs included.
///
/// The encoder always emits the latest version of the format, writing the
/// canonical header ahead of the first event. The first error is latched
/// and every subsequent [`Encoder::emit`] returns it until
/// [`Encoder::reset`].
pub struct Encoder<W> {
    w: OffsetWriter<W>,
    err: Option<EncodingError>,
    started: bool,
    scratch: Vec<u8>,
}

impl<W: Write> Encoder<W> {
    /// Returns a new encoder that emits events to `w` in the latest version
    /// of the trace format.
    pub fn new(w: W) -> Encoder<W> {
        Encoder {
            w: OffsetWriter::new(w),
            err: None,
            started: false,
            scratch: Vec::new(),
        }
    }

    /// Resets the encoder for writing a fresh trace to `w`, clearing any
    /// latched error. A new header is emitted ahead of the next event.
    pub fn reset(&mut self, w: W) {
        debug!("encoder reset");
        self.w.reset(w);
        self.err = None;
        self.started = false;
    }

    /// The first error that occurred during encoding.
    pub fn err(&self) -> Option<&EncodingError> {
        self.err.as_ref()
    }

    /// Bytes written to the sink so far.
    pub fn offset(&self) -> usize {
        self.w.offset()
    }

    /// Writes a single event to the output stream, preceded by the header
    /// on the first call. A failure here is permanent until
    /// [`Encoder::reset`].
    pub fn emit(&mut self, evt: &Event) -> Result<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if !self.started {
            if let Err(err) = self.write_header() {
                return Err(self.latch(err));
            }
            self.started = true;
        }
        match self.encode_event(evt) {
            Ok(()) => Ok(()),
            Err(err) => Err(self.latch(err)),
        }
    }

    fn write_header(&mut self) -> Result<()> {
        debug!(version = %Version::LATEST, "emitting trace header");
        self.w.write_all(header::encode(Version::LATEST))?;
        Ok(())
    }

    fn encode_event(&mut self, evt: &Event) -> Result<()> {
        if !evt.kind.valid() {
            return Err(EncodingError::InvalidType(evt.kind as u8));
        }
        codec_trace!(kind = %evt.kind, args = evt.args.len(), off = self.w.offset(), "emitting event");

        // Two tag bits hold the argument count minus one; four or more
        // arguments saturate the code at 3 and switch the body to a
        // length-prefixed form. Strings do not encode a count at all.
        if evt.kind == EventType::String {
            self.encode_string(evt)
        } else if evt.args.len() < 4 {
            self.encode_inline(evt)
        } else {
            self.encode_packed(evt)
        }
    }

    fn encode_inline(&mut self, evt: &Event) -> Result<()> {
        if evt.args.is_empty() {
            return Err(EncodingError::MissingArgs {
                kind: evt.kind,
                want: 1,
            });
        }
        let narg = (evt.args.len() - 1) as u8;
        self.w
            .write_byte(evt.kind as u8 | narg << decoder::ARG_COUNT_SHIFT)?;
        for &arg in &evt.args {
            self.w.write_uleb(arg)?;
        }
        Ok(())
    }

    fn encode_packed(&mut self, evt: &Event) -> Result<()> {
        if evt.args.len() < 4 {
            return Err(EncodingError::MissingArgs {
                kind: evt.kind,
                want: 4,
            });
        }
        self.scratch.clear();
        for &arg in &evt.args {
            leb128::append(&mut self.scratch, arg);
        }

        self.w
            .write_byte(evt.kind as u8 | 3 << decoder::ARG_COUNT_SHIFT)?;
        self.w.write_uleb(self.scratch.len() as u64)?;
        self.w.write_all(&self.scratch)?;
        Ok(())
    }

    fn encode_string(&mut self, evt: &Event) -> Result<()> {
        if evt.args.is_empty() {
            return Err(EncodingError::MissingArgs {
                kind: evt.kind,
                want: 1,
            });
        }

        // Strings carry no argument count in the tag byte.
        self.w.write_byte(evt.kind as u8)?;
        self.w.write_uleb(evt.args[0])?;
        self.w.write_uleb(evt.data.len() as u64)?;
        self.w.write_all(&evt.data)?;
        Ok(())
    }

    fn latch(&mut self, err: EncodingError) -> EncodingError {
        if self.err.is_none() {
            debug!(error = %err, off = self.w.offset(), "encoder halted");
        }
        self.err.get_or_insert(err).clone()
    }
}
