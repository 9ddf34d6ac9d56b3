//! Buffered line decoder
//!
//! Turns a byte stream into a sequence of newline-terminated text lines.
//! End-of-stream and read errors are signaled as explicit variants rather
//! than woven into control flow; callers treat both as "connection gone".

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// One step of reading from a line-oriented stream
#[derive(Debug)]
pub enum LineEvent {
    /// A decoded line, terminator stripped
    Line(String),
    /// The stream closed cleanly
    Eof,
    /// The stream errored; treated the same as Eof by callers
    Failed(std::io::Error),
}

/// Lazy line reader over any async byte stream
///
/// Lines are split on `\n`; a trailing `\r` is also stripped. There is no
/// maximum line length — a peer that never sends a newline grows the
/// buffer without bound (known limitation).
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: String,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            inner: BufReader::new(stream),
            buf: String::new(),
        }
    }

    /// Read the next line from the stream
    ///
    /// A final line without a terminator (stream closed mid-line) is
    /// still yielded as `Line`; the following call returns `Eof`.
    pub async fn next(&mut self) -> LineEvent {
        self.buf.clear();
        match self.inner.read_line(&mut self.buf).await {
            Ok(0) => LineEvent::Eof,
            Ok(_) => {
                if self.buf.ends_with('\n') {
                    self.buf.pop();
                    if self.buf.ends_with('\r') {
                        self.buf.pop();
                    }
                }
                LineEvent::Line(self.buf.clone())
            }
            Err(e) => LineEvent::Failed(e),
        }
    }
}
