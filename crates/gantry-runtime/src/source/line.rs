//! Newline-delimited JSON events.

use async_trait::async_trait;
use gantry_core::Response;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin,
    Stdout,
};
use tracing::{trace, warn};

use super::EventSource;
use crate::config::DEFAULT_MAX_EVENT_BYTES;
use crate::error::RuntimeResult;

/// A [`LineSource`] over the process's stdin and stdout.
pub type StdioSource = LineSource<BufReader<Stdin>, Stdout>;

/// Reads one event per line and writes one compact JSON response per line.
///
/// Blank lines are skipped and a trailing `\r` is stripped.
///
/// At most `max_event_bytes + 2` bytes of a line are buffered, leaving room
/// for a `\r\n` terminator. A longer line is returned cut to that length and
/// untrimmed, so it still reads as oversized, and the rest of it is discarded.
#[derive(Debug)]
pub struct LineSource<R, W> {
    reader: R,
    writer: W,
    buf: Vec<u8>,
    max_event_bytes: usize,
}

enum ReadLine {
    Eof,
    Whole,
    Truncated,
}

impl<R, W> LineSource<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            buf: Vec::new(),
            max_event_bytes: DEFAULT_MAX_EVENT_BYTES,
        }
    }

    /// Sets the largest line accepted as an event.
    pub fn with_max_event_bytes(mut self, max_event_bytes: usize) -> Self {
        self.max_event_bytes = max_event_bytes;
        self
    }

    /// Reads one line, buffering no more than `max_event_bytes + 2` bytes.
    async fn read_line_capped(&mut self) -> RuntimeResult<ReadLine> {
        self.buf.clear();
        let cap = self.max_event_bytes.saturating_add(2);
        let read = (&mut self.reader)
            .take(cap as u64)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if read == 0 {
            return Ok(ReadLine::Eof);
        }
        if self.buf.len() < cap || self.buf.last() == Some(&b'\n') {
            return Ok(ReadLine::Whole);
        }

        let skipped = self.discard_rest_of_line().await?;
        warn!(
            limit = self.max_event_bytes,
            skipped, "Event line exceeds size limit, discarding the remainder"
        );
        Ok(ReadLine::Truncated)
    }

    /// Consumes input up to and including the next newline.
    async fn discard_rest_of_line(&mut self) -> RuntimeResult<usize> {
        let mut skipped = 0;
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(skipped);
            }
            let (consumed, done) = match available.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (available.len(), false),
            };
            self.reader.consume(consumed);
            skipped += consumed;
            if done {
                return Ok(skipped);
            }
        }
    }

    /// Consumes the source, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

/// Binds a [`LineSource`] to stdin and stdout.
pub fn stdio() -> StdioSource {
    LineSource::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
}

#[async_trait]
impl<R, W> EventSource for LineSource<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_event(&mut self) -> RuntimeResult<Option<Vec<u8>>> {
        loop {
            match self.read_line_capped().await? {
                ReadLine::Eof => return Ok(None),
                ReadLine::Truncated => return Ok(Some(self.buf.clone())),
                ReadLine::Whole => {}
            }

            let line = trim_line_ending(&self.buf);
            if line.iter().all(u8::is_ascii_whitespace) {
                trace!("Skipping blank line");
                continue;
            }
            return Ok(Some(line.to_vec()));
        }
    }

    async fn send_response(&mut self, response: &Response) -> RuntimeResult<()> {
        let mut line = response.to_vec()?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
