//! Line-oriented terminal driver.
//!
//! Implements the [`Driver`] trait over any async line source and any
//! writer. Commands are read one per line; timer firings arrive from the
//! [`TokioScheduler`](crate::TokioScheduler) channel. Rendering prints the
//! status and the request/response step when they change, and every record
//! emitted since the last render.

use std::io::{self, Write};

use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc::UnboundedReceiver,
};
use wiresim_app::{Driver, Input, SimTask, SimulatorSnapshot};
use wiresim_core::{ConnectionError, ConnectionStatus, EventRecord, PollingMode, RequestStep};

use crate::Firing;

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

const HELP: &str = "commands: connect | disconnect | pause | error | mode <polling|long-polling|realtime> | status | quit";

/// What has already been printed.
#[derive(Debug, Default)]
struct Printed {
    status: Option<ConnectionStatus>,
    packet: Option<u64>,
    feed: Option<u64>,
    mode: Option<PollingMode>,
    request: Option<u64>,
    step: Option<RequestStep>,
}

enum Event {
    Interrupt,
    Timer(Firing<SimTask>),
    Line(io::Result<usize>),
    TimersClosed,
}

/// Terminal driver implementing the [`Driver`] trait.
pub struct TerminalDriver<R, W> {
    input: R,
    /// Bytes of the line being read; kept across cancelled reads
    pending: Vec<u8>,
    output: W,
    timers: UnboundedReceiver<Firing<SimTask>>,
    started: tokio::time::Instant,
    printed: Printed,
    greeted: bool,
    summary_requested: bool,
}

impl<R, W> TerminalDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    /// Create a driver reading commands from `input` and writing to `output`.
    ///
    /// Record timestamps are printed relative to `started`.
    pub fn new(
        input: R,
        output: W,
        timers: UnboundedReceiver<Firing<SimTask>>,
        started: tokio::time::Instant,
    ) -> Self {
        Self {
            input,
            pending: Vec::new(),
            output,
            timers,
            started,
            printed: Printed::default(),
            greeted: false,
            summary_requested: true,
        }
    }

    /// Writer the driver prints to.
    pub fn output(&self) -> &W {
        &self.output
    }

    async fn next_event(&mut self) -> Event {
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => Event::Interrupt,
            firing = self.timers.recv() => match firing {
                Some(firing) => Event::Timer(firing),
                None => Event::TimersClosed,
            },
            read = self.input.read_until(b'\n', &mut self.pending) => Event::Line(read),
        }
    }

    /// Take the buffered line, or `None` at end of input.
    ///
    /// Bytes that are not UTF-8 are replaced rather than rejected, so a
    /// garbled line is reported as an unknown command.
    fn take_line(&mut self, read: usize) -> Option<String> {
        if read == 0 && self.pending.is_empty() {
            return None;
        }

        let line = String::from_utf8_lossy(&self.pending);
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        self.pending.clear();
        Some(line)
    }

    fn write_record(
        &mut self,
        label: &str,
        record: &EventRecord<tokio::time::Instant>,
    ) -> io::Result<()> {
        let at = record.timestamp - self.started;
        write!(
            self.output,
            "[{label} #{} +{}.{:03}s] {} {}",
            record.id,
            at.as_secs(),
            at.subsec_millis(),
            record.kind,
            record.direction
        )?;
        if let Some(user) = &record.origin_user {
            write!(self.output, " {user}:")?;
        }
        writeln!(self.output, " {}", record.payload)
    }

    fn write_summary(&mut self, snapshot: &SimulatorSnapshot<tokio::time::Instant>) -> io::Result<()> {
        let polling = &snapshot.polling;
        writeln!(
            self.output,
            "[summary] {} | packets {} | feed {} | {} {} requests, {} empty",
            snapshot.status,
            snapshot.packets.len(),
            snapshot.feed.len(),
            polling.mode,
            polling.total_requests,
            polling.empty_responses
        )
    }
}

impl<R, W> Driver for TerminalDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    type Error = TerminalError;
    type Instant = tokio::time::Instant;

    async fn poll_input(&mut self) -> Result<Option<Input>, Self::Error> {
        loop {
            let line = match self.next_event().await {
                Event::Interrupt => return Ok(Some(Input::Quit)),
                Event::Timer((id, task)) => return Ok(Some(Input::Timer { id, task })),
                Event::TimersClosed => return Ok(None),
                Event::Line(read) => match self.take_line(read?) {
                    Some(line) => line,
                    None => return Ok(None),
                },
            };

            match Input::parse(&line) {
                Ok(Some(input)) => {
                    if input == Input::Refresh {
                        self.summary_requested = true;
                    }
                    return Ok(Some(input));
                },
                Ok(None) => {},
                Err(err) => {
                    tracing::warn!(%err, "unrecognised input");
                    writeln!(self.output, "{err}")?;
                },
            }
        }
    }

    fn render(&mut self, snapshot: &SimulatorSnapshot<Self::Instant>) -> Result<(), Self::Error> {
        if !self.greeted {
            writeln!(self.output, "{HELP}")?;
            self.greeted = true;
        }

        if self.printed.status != Some(snapshot.status) {
            writeln!(self.output, "[status] {}", snapshot.status)?;
            self.printed.status = Some(snapshot.status);
        }

        for record in &snapshot.packets {
            if self.printed.packet.is_none_or(|last| record.id > last) {
                self.write_record("packet", record)?;
                self.printed.packet = Some(record.id);
            }
        }

        // Feed arrives newest first; print in emission order
        for record in snapshot.feed.iter().rev() {
            if self.printed.feed.is_none_or(|last| record.id > last) {
                self.write_record("feed", record)?;
                self.printed.feed = Some(record.id);
            }
        }

        let polling = &snapshot.polling;
        let restarted = self.printed.request.is_some_and(|last| polling.total_requests <= last);
        if self.printed.mode != Some(polling.mode) || restarted {
            writeln!(self.output, "[polling] mode {}", polling.mode)?;
            self.printed.mode = Some(polling.mode);
            self.printed.request = None;
        }
        for request in &polling.requests {
            if self.printed.request.is_none_or(|last| request.id > last) {
                let outcome = if request.has_data { "data" } else { "empty" };
                writeln!(self.output, "[{} #{}] {outcome}", polling.mode, request.id)?;
                self.printed.request = Some(request.id);
            }
        }

        if self.printed.step != Some(snapshot.request_step) {
            writeln!(self.output, "[request] {}", snapshot.request_step)?;
            self.printed.step = Some(snapshot.request_step);
        }

        if self.summary_requested {
            self.write_summary(snapshot)?;
            self.summary_requested = false;
        }

        self.output.flush()?;
        Ok(())
    }

    fn report(&mut self, error: &ConnectionError) -> Result<(), Self::Error> {
        writeln!(self.output, "rejected: {error}")?;
        Ok(())
    }

    fn stop(&mut self) {
        if let Err(err) = self.output.flush() {
            tracing::warn!(%err, "failed to flush output");
        }
        tracing::info!("terminal driver stopped");
    }
}
