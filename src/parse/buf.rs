use std::{
    cmp::{max, min},
    fmt,
    io::{self, Read},
    str,
};

use crate::error::Error;


/// The initial size of the buffer in bytes.
const START_BUFFER_SIZE: usize = 64 * 1024;

/// The maximum size the internal buffer can grow to.
///
/// This is just a security mechanism: each "piece" of information in a PLY
/// file is usually tiny, and even the largest single entity we ever prepare
/// at once (one row of one element) is small compared to this. A corrupt
/// list length could otherwise make us request a gigantic chunk; instead of
/// dying from OOM we refuse to grow past this cap.
pub(crate) const MAX_BUFFER_SIZE: usize = 4 * 1024 * 1024;

// The correctness of some code depends on this.
static_assertions::const_assert!(MAX_BUFFER_SIZE <= u32::max_value() as usize);

/// ASCII whitespace as far as the PLY body is concerned. Newlines separate
/// values just like spaces do; `\r` is included so `\r\n` files work.
#[inline(always)]
fn is_whitespace(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
}

/// A buffered window over the input stream.
///
/// Works like a `BufReader` that additionally tracks the total number of
/// consumed bytes and lets the parser look at `n` upcoming bytes as one
/// slice (growing the window if necessary, moving unconsumed data to the
/// front on underflow).
#[derive(Clone)]
pub(crate) struct Buffer<R: Read> {
    reader: R,

    buf: Vec<u8>,

    /// Points to the first byte in `buf` that is real data. Invariants:
    /// - `0 <= start < buf.len()`
    /// - `start <= end`
    start: usize,

    /// Points to the byte after the last byte of real data. Invariants:
    /// - `0 <= end <= buf.len()`
    /// - `start <= end`
    end: usize,

    consumed_total: usize,
}

impl<R: Read> fmt::Debug for Buffer<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Buffer {{ consumed_total: {}, .. }}", self.consumed_total)
    }
}

impl<R: Read> Buffer<R> {
    pub(crate) fn new(reader: R) -> Result<Self, Error> {
        let mut out = Self {
            buf: vec![0; START_BUFFER_SIZE],
            reader,
            start: 0,
            end: 0,
            consumed_total: 0,
        };

        // Read once to prefill the buffer.
        out.fill_buf()?;

        Ok(out)
    }

    /// Number of unconsumed bytes currently in the window.
    pub(crate) fn len(&self) -> usize {
        self.end - self.start
    }

    fn cap(&self) -> usize {
        self.buf.len()
    }

    /// Tries to fill the buffer with some new data, starting at `self.end`.
    fn fill_buf(&mut self) -> Result<usize, io::Error> {
        let n = self.reader.read(&mut self.buf[self.end..])?;
        self.end += n;

        Ok(n)
    }

    /// Makes room for at least `additional` more bytes behind `self.end`,
    /// either by moving unconsumed data to the front of the buffer or by
    /// growing it (capped at `MAX_BUFFER_SIZE`).
    #[inline(never)]
    fn grow_buf(&mut self, additional: usize) -> Result<(), Error> {
        let space_after = self.cap() - self.end;
        let space_before = self.start;

        if space_after < additional {
            // Move the data to the front if that makes enough room and the
            // amount to move is small relative to the buffer; otherwise
            // grow. Moving large amounts on every refill would mean copying
            // almost the whole buffer over and over.
            if space_after + space_before >= additional && self.len() < self.cap() / 2 {
                self.buf.copy_within(self.start..self.end, 0);
            } else {
                if self.cap() == MAX_BUFFER_SIZE {
                    // A prepare of this size means a corrupt length field,
                    // not a legitimately huge value.
                    return Err(Error::UnexpectedEof);
                }

                let new_len = min(
                    max(self.len() + additional, self.buf.len() * 2),
                    MAX_BUFFER_SIZE,
                );

                // `Vec::resize` would copy everything anyway, so use the
                // reallocation to also move our data to the front.
                let mut new = Vec::with_capacity(new_len);
                new.extend_from_slice(self.raw_buf());
                new.resize(new_len, 0);
                self.buf = new;
            }

            // In both cases, the data starts at the very beginning now.
            self.end -= self.start;
            self.start = 0;
        }

        Ok(())
    }

    #[inline(never)]
    fn fill_buf_by(&mut self, additional: usize) -> Result<usize, Error> {
        self.grow_buf(additional)?;

        // Read new data until we have `additional` more bytes. `Interrupted`
        // errors are ignored and the read is retried.
        let mut bytes_read = 0;
        while bytes_read < additional {
            match self.reader.read(&mut self.buf[self.end + bytes_read..]) {
                Ok(0) => break,
                Ok(n) => bytes_read += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.end += bytes_read;
        Ok(bytes_read)
    }

    /// Makes sure at least `num_bytes` bytes are in the window, reading
    /// more data if necessary. Fails with `UnexpectedEof` if the input
    /// can't provide that many bytes.
    pub(crate) fn prepare(&mut self, num_bytes: usize) -> Result<(), Error> {
        #[cold]
        #[inline(never)]
        fn fill(buf: &mut Buffer<impl Read>, diff: usize) -> Result<(), Error> {
            let bytes_read = buf.fill_buf_by(diff)?;

            if bytes_read < diff {
                return Err(Error::UnexpectedEof);
            }

            Ok(())
        }

        if self.len() < num_bytes {
            return fill(self, num_bytes - self.len());
        }

        Ok(())
    }

    /// Like `prepare`, but simply stops at EOF instead of failing.
    pub(crate) fn saturating_prepare(&mut self, num_bytes: usize) -> Result<(), Error> {
        if self.len() < num_bytes {
            let diff = num_bytes - self.len();
            self.fill_buf_by(diff)?;
        }

        Ok(())
    }

    /// Marks `num_bytes` bytes of the window as consumed.
    pub(crate) fn consume(&mut self, num_bytes: usize) {
        assert!(self.start + num_bytes <= self.end);

        self.start += num_bytes;
        self.consumed_total += num_bytes;

        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
    }

    /// Discards `num_bytes` upcoming bytes, reading through the window in
    /// chunks. Fails with `UnexpectedEof` if the input ends early.
    pub(crate) fn skip(&mut self, num_bytes: u64) -> Result<(), Error> {
        let mut remaining = num_bytes;
        while remaining > 0 {
            if self.len() == 0 {
                self.grow_buf(1)?;
                if self.fill_buf()? == 0 {
                    return Err(Error::UnexpectedEof);
                }
            }

            let chunk = min(self.len() as u64, remaining) as usize;
            self.consume(chunk);
            remaining -= chunk as u64;
        }

        Ok(())
    }

    /// Checks whether the input is exhausted (refilling the window if it is
    /// currently empty).
    pub(crate) fn is_eof(&mut self) -> Result<bool, Error> {
        if self.len() == 0 {
            self.grow_buf(1)?;
            Ok(self.fill_buf()? == 0)
        } else {
            Ok(false)
        }
    }

    /// Total number of bytes consumed so far (the current file offset).
    pub(crate) fn offset(&self) -> usize {
        self.consumed_total
    }

    /// The unconsumed part of the window.
    pub(crate) fn raw_buf(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    /// Calls `func` with the next `num_bytes` bytes and consumes them.
    pub(crate) fn with_bytes<F, O>(&mut self, num_bytes: usize, func: F) -> Result<O, Error>
    where
        F: FnOnce(&[u8]) -> Result<O, Error>,
    {
        self.prepare(num_bytes)?;
        let out = func(&self.raw_buf()[..num_bytes])?;
        self.consume(num_bytes);

        Ok(out)
    }

    /// Consumes ASCII whitespace (including newlines) until the next
    /// non-whitespace byte or EOF.
    pub(crate) fn skip_whitespace(&mut self) -> Result<(), Error> {
        loop {
            while self.len() > 0 {
                if is_whitespace(self.raw_buf()[0]) {
                    self.consume(1);
                } else {
                    return Ok(());
                }
            }

            if self.is_eof()? {
                return Ok(());
            }
        }
    }

    /// Skips leading whitespace, then calls `func` with the next
    /// whitespace-delimited token and consumes it.
    ///
    /// Fails with `UnexpectedEof` if only whitespace remains. Non-ASCII
    /// bytes inside a token are rejected.
    pub(crate) fn read_token<F, O>(&mut self, func: F) -> Result<O, Error>
    where
        F: FnOnce(&str, usize) -> Result<O, Error>,
    {
        self.skip_whitespace()?;

        // Extend the window until it contains the token's terminating
        // whitespace or the EOF.
        let mut token_len = 0;
        loop {
            let window = self.raw_buf();
            while token_len < window.len() && !is_whitespace(window[token_len]) {
                token_len += 1;
            }

            if token_len < self.len() {
                break;
            }

            let old_len = self.len();
            self.saturating_prepare(old_len + 1024)?;
            if self.len() == old_len {
                // EOF terminates the token.
                break;
            }
        }

        if token_len == 0 {
            return Err(Error::UnexpectedEof);
        }

        let offset = self.offset();
        let token = ascii_str(&self.raw_buf()[..token_len], offset)?;
        let out = func(token, offset)?;
        self.consume(token_len);

        Ok(out)
    }

    /// Calls `func` with the next line (everything up to the next `\n`,
    /// with the `\n` and a trailing `\r` stripped) and consumes the line
    /// including its terminator.
    ///
    /// Used for the header only; fails with `UnexpectedEof` if the input
    /// ends before a `\n` is found.
    pub(crate) fn read_line<F, O>(&mut self, func: F) -> Result<O, Error>
    where
        F: FnOnce(&str, usize) -> Result<O, Error>,
    {
        let mut searched = 0;
        let line_len = loop {
            let window = self.raw_buf();
            if let Some(pos) = window[searched..].iter().position(|&b| b == b'\n') {
                break searched + pos;
            }

            searched = window.len();
            let old_len = self.len();
            self.saturating_prepare(old_len + 1024)?;
            if self.len() == old_len {
                return Err(Error::UnexpectedEof);
            }
        };

        let offset = self.offset();
        let line = &self.raw_buf()[..line_len];
        let line = match line.split_last() {
            Some((&b'\r', rest)) => rest,
            _ => line,
        };

        let out = func(ascii_str(line, offset)?, offset)?;
        self.consume(line_len + 1);

        Ok(out)
    }
}

/// Interprets `bytes` as ASCII, failing with a header error otherwise.
fn ascii_str(bytes: &[u8], offset: usize) -> Result<&str, Error> {
    if bytes.is_ascii() {
        // ASCII is always valid UTF-8.
        Ok(str::from_utf8(bytes).unwrap())
    } else {
        Err(Error::MalformedHeader {
            msg: "non-ASCII bytes in header or ASCII body".into(),
            offset,
        })
    }
}
