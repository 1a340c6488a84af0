//! Bounded line input for the interactive loop.

use std::io::{self, BufRead, Read};

use crate::error::LineError;

/// Default maximum length of one input line, in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Reads newline-terminated lines, refusing any longer than `max_len` bytes.
pub struct LineReader<R> {
    inner: R,
    max_len: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self { inner, max_len }
    }

    /// Returns the next line without its terminator, or `None` at end of input.
    ///
    /// An oversized line is consumed up to its newline and reported as
    /// [`LineError::TooLong`]; the following call starts on the next line.
    pub fn read_line(&mut self) -> Result<Option<String>, LineError> {
        let mut buf = Vec::new();
        let limit = self.max_len as u64 + 1;
        let n = (&mut self.inner).take(limit).read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if buf.len() > self.max_len {
            self.discard_rest_of_line()?;
            return Err(LineError::TooLong { max: self.max_len });
        }

        String::from_utf8(buf)
            .map(Some)
            .map_err(|_| LineError::InvalidUtf8)
    }

    fn discard_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            let available = self.inner.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    self.inner.consume(idx + 1);
                    return Ok(());
                }
                None => {
                    let len = available.len();
                    self.inner.consume(len);
                }
            }
        }
    }
}
