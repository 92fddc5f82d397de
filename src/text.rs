//! Line reading and whitespace trimming for configuration input.

use std::io::{self, BufRead};

/// Bytes added to a line buffer each time it runs out of room.
pub const LINE_CHUNK: usize = 128;

/// Grows `buf` so it can hold [`LINE_CHUNK`] more bytes beyond its content.
///
/// Capacity never shrinks; existing content is kept in place.
pub fn grow(buf: &mut Vec<u8>) {
    buf.reserve_exact(LINE_CHUNK);
}

/// Reads `\n`- or `\0`-terminated lines from a buffered stream.
///
/// The line buffer is reused across calls and grows in [`LINE_CHUNK`]
/// steps as needed.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    /// Wraps a buffered reader.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    /// Reads the next line, terminator included.
    ///
    /// Returns `Ok(None)` when the stream is already exhausted. A final
    /// line without a terminator is returned as it is.
    ///
    /// # Errors
    ///
    /// Propagates read errors other than `Interrupted`.
    pub fn read_line(&mut self) -> io::Result<Option<&[u8]>> {
        self.buf.clear();

        loop {
            let available = match self.inner.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                break;
            }

            let mut used = 0;
            let mut done = false;
            for &byte in available {
                used += 1;
                if self.buf.len() + 1 >= self.buf.capacity() {
                    grow(&mut self.buf);
                }
                self.buf.push(byte);
                if byte == b'\n' || byte == 0 {
                    done = true;
                    break;
                }
            }
            self.inner.consume(used);

            if done {
                break;
            }
        }

        if self.buf.is_empty() {
            Ok(None)
        } else {
            Ok(Some(&self.buf))
        }
    }

    /// Current capacity of the line buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

/// C-locale `isspace`: space, `\t`, `\n`, `\v`, `\f`, `\r`.
#[must_use]
pub const fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

/// Returns a copy of `s` without leading and trailing whitespace.
#[must_use]
pub fn trim(s: &str) -> String {
    s.trim_matches(is_space).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lines(input: &[u8]) -> Vec<Vec<u8>> {
        let mut reader = LineReader::new(Cursor::new(input));
        let mut out = Vec::new();
        while let Some(line) = reader.read_line().unwrap() {
            out.push(line.to_vec());
        }
        out
    }

    #[test]
    fn splits_on_newline_and_nul() {
        assert_eq!(
            lines(b"AXFR=1\nIP=127.0.0.1\0tail"),
            vec![b"AXFR=1\n".to_vec(), b"IP=127.0.0.1\0".to_vec(), b"tail".to_vec()]
        );
    }

    #[test]
    fn empty_stream_has_no_lines() {
        let mut reader = LineReader::new(Cursor::new(b""));
        assert!(reader.read_line().unwrap().is_none());
        assert!(reader.read_line().unwrap().is_none());
    }

    #[test]
    fn blank_lines_are_returned() {
        assert_eq!(lines(b"\n\n"), vec![b"\n".to_vec(), b"\n".to_vec()]);
    }

    #[test]
    fn long_line_grows_buffer_in_chunks() {
        let long = vec![b'x'; LINE_CHUNK * 3 + 7];
        let mut input = long.clone();
        input.push(b'\n');

        let mut reader = LineReader::new(Cursor::new(input));
        let line = reader.read_line().unwrap().unwrap().to_vec();
        assert_eq!(&line[..line.len() - 1], long.as_slice());
        assert!(reader.capacity() >= line.len() + 1);
        assert!(reader.read_line().unwrap().is_none());
    }

    #[test]
    fn grow_never_shrinks() {
        let mut buf = b"hello".to_vec();
        let before = buf.capacity();
        grow(&mut buf);
        assert!(buf.capacity() >= before.max(5 + LINE_CHUNK));
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn trim_strips_both_ends() {
        assert_eq!(trim("  CACHESIZE = 100 \t\r\n"), "CACHESIZE = 100");
        assert_eq!(trim("\x0b\x0cIP\x0b"), "IP");
    }

    #[test]
    fn trim_boundaries() {
        assert_eq!(trim(""), "");
        assert_eq!(trim(" "), "");
        assert_eq!(trim("x"), "x");
        assert_eq!(trim(" \n\t "), "");
    }

    #[test]
    fn trim_is_idempotent() {
        for s in ["", " a ", "a b", "\tkey=value\n", "   ", "x"] {
            let once = trim(s);
            assert_eq!(trim(&once), once);
        }
    }
}
