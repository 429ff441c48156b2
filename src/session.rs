//! Session loop: owns the input/output streams for the life of the process.
//!
//! 1. Writes the startup announcement before reading anything.
//! 2. Reads one line at a time, dispatches it, and writes any response before
//!    reading the next line. Every write is flushed immediately.
//! 3. Stops at end-of-stream, on cancellation, or on an unrecoverable I/O
//!    error. None of these is treated as a crash.
//!
//! Decode failures and dispatch failures are converted here, and only here,
//! into the `id = null` error response; the loop then continues.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::dispatcher::Dispatcher;
use crate::protocol::codec::{self, Frame, LineCodec};
use crate::protocol::Response;
use crate::registry::ToolRegistry;
use crate::Result;

/// Why a session stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionEnd {
    /// Input reached end-of-stream.
    #[default]
    EndOfStream,
    /// The cancellation token fired.
    Cancelled,
    /// Reading or writing the streams failed.
    IoFailure(String),
}

/// Counters describing a finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Input lines consumed, including rejected ones.
    pub lines_read: u64,
    /// Responses written, including the startup announcement.
    pub responses_written: u64,
    /// Lines that could not be decoded.
    pub decode_failures: u64,
    /// Requests whose dispatch failed.
    pub dispatch_failures: u64,
    /// Why the loop stopped.
    pub end: SessionEnd,
}

/// Run a session over `input` / `output` until end-of-stream or `cancel`.
///
/// The registry is only read. Handler deadlines and the input line limit
/// come from `config`.
pub async fn run_session<R, W>(
    registry: &ToolRegistry,
    config: &SessionConfig,
    input: R,
    output: W,
    cancel: CancellationToken,
) -> SessionSummary
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let dispatcher = Dispatcher::new(registry).with_handler_timeout(config.handler_timeout());
    let mut reader = FramedRead::new(input, LineCodec::with_max_length(config.max_line_bytes));
    let mut writer = FramedWrite::new(output, LineCodec::with_max_length(config.max_line_bytes));
    let mut summary = SessionSummary::default();

    if let Err(err) = send(&mut writer, &Response::announcement()).await {
        warn!(error = %err, "session: failed to write startup announcement");
        summary.end = SessionEnd::IoFailure(err.to_string());
        return summary;
    }
    summary.responses_written += 1;
    debug!(tools = ?registry, "session: announcement sent");

    loop {
        let item = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("session: cancellation received, stopping");
                summary.end = SessionEnd::Cancelled;
                break;
            }

            item = reader.next() => item,
        };

        let response = match item {
            None => {
                debug!("session: end of input");
                summary.end = SessionEnd::EndOfStream;
                break;
            }

            Some(Err(err)) => {
                warn!(error = %err, "session: input stream failed, stopping");
                summary.end = SessionEnd::IoFailure(err.to_string());
                break;
            }

            Some(Ok(Frame::Rejected(err))) => {
                summary.lines_read += 1;
                summary.decode_failures += 1;
                warn!(error = %err, "session: rejected input line");
                Some(Response::transport_error(err.to_string()))
            }

            Some(Ok(Frame::Line(line))) => {
                summary.lines_read += 1;
                handle_line(&dispatcher, &line, &mut summary).await
            }
        };

        if let Some(response) = response {
            if let Err(err) = send(&mut writer, &response).await {
                warn!(error = %err, "session: output stream failed, stopping");
                summary.end = SessionEnd::IoFailure(err.to_string());
                break;
            }
            summary.responses_written += 1;
        }
    }

    summary
}

/// Decode and dispatch one line, converting any failure into the
/// `id = null` error response.
async fn handle_line(
    dispatcher: &Dispatcher<'_>,
    line: &str,
    summary: &mut SessionSummary,
) -> Option<Response> {
    let request = match codec::decode(line) {
        Ok(request) => request,
        Err(err) => {
            summary.decode_failures += 1;
            warn!(error = %err, raw_line = %line, "session: undecodable line");
            return Some(Response::transport_error(err.to_string()));
        }
    };

    let method = request.method();
    match dispatcher.dispatch(request).await {
        Ok(response) => response,
        Err(err) => {
            summary.dispatch_failures += 1;
            warn!(method = method.as_str(), error = %err, "session: dispatch failed");
            Some(Response::transport_error(err.to_string()))
        }
    }
}

/// Encode, write, and flush one response.
async fn send<W>(writer: &mut FramedWrite<W, LineCodec>, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.send(codec::encode(response)).await
}

/// Log the outcome of a finished session.
pub fn log_summary(summary: &SessionSummary) {
    info!(
        lines_read = summary.lines_read,
        responses_written = summary.responses_written,
        decode_failures = summary.decode_failures,
        dispatch_failures = summary.dispatch_failures,
        end = ?summary.end,
        "session finished"
    );
}
