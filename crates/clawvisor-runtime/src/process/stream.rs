//! Output line streams (non-UTF8-safe).
//!
//! Service CLIs can emit non-UTF8 bytes (and Windows code-page output) on
//! stdout/stderr. `BufReader::lines()` would end the stream on the first
//! invalid byte, so lines are read as bytes and decoded lossily.

use async_stream::stream;
use clawvisor_core::LineStream;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

/// Stream the trimmed, non-blank lines of `reader` until EOF or a read error.
pub fn read_lines(
    reader: impl AsyncRead + Unpin + Send + 'static,
    stream_type: &'static str,
) -> LineStream {
    stream! {
        let mut reader = BufReader::new(reader);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim();
                    if !line.is_empty() {
                        yield line.to_string();
                    }
                }
                Err(e) => {
                    debug!(%stream_type, error = %e, "output reader exiting due to read error");
                    break;
                }
            }
        }
    }
    .boxed()
}

/// Merge stdout and stderr line streams into one.
///
/// Each source keeps its own order; lines from the two pipes interleave in
/// arrival order.
pub fn merge_output(stdout: Option<LineStream>, stderr: Option<LineStream>) -> LineStream {
    match (stdout, stderr) {
        (Some(out), Some(err)) => stream::select(out, err).boxed(),
        (Some(one), None) | (None, Some(one)) => one,
        (None, None) => stream::empty().boxed(),
    }
}
