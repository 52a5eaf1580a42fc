use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::compile::diagnostics::{DiagnosticSet, map_diagnostics};
use crate::compile::protocol::{self, Transport, TransportError};
use crate::compile::{CompileRefused, CompileRequest, CompileResponse, is_supported};
use crate::editing::EditSession;
use crate::models::SourceFile;

/// Status text surfaced as soon as a compile starts
pub const COMPILING: &str = "Compiling...";

/// Lifecycle of the current compile job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileState {
    Idle,
    Sending,
    AwaitingResult,
    Applying,
    /// The job failed in transport. Passed through on the way back to
    /// `Idle`; the message stays in [`CompileCoordinator::status`].
    Errored,
}

/// Identifies one compile request. Only the newest ticket's result is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

/// What happened while pumping worker events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileUpdate {
    AwaitingResult {
        ticket: Ticket,
    },
    Succeeded {
        ticket: Ticket,
        output: String,
        lines: DiagnosticSet,
    },
    Failed {
        ticket: Ticket,
        message: String,
    },
    /// A superseded request finished; its result was dropped.
    Stale {
        ticket: Ticket,
    },
}

enum WorkerEvent {
    Sent(Ticket),
    Finished(Ticket, Result<CompileResponse, TransportError>),
}

struct InFlight {
    ticket: Ticket,
    /// Source as it was when the request was built
    source: String,
}

/// Runs compile exchanges off the owner thread and folds their results back
/// into an [`EditSession`].
///
/// The owner calls [`start`](Self::start), then [`pump`](Self::pump) from its
/// event loop (or [`wait`](Self::wait) when it has nothing else to do). Session
/// state is only ever touched from those calls.
pub struct CompileCoordinator<T: Transport> {
    transport: Arc<T>,
    tx: Sender<WorkerEvent>,
    rx: Receiver<WorkerEvent>,
    next_ticket: u64,
    in_flight: Option<InFlight>,
    state: CompileState,
    status: String,
}

impl<T: Transport> CompileCoordinator<T> {
    pub fn new(transport: T) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            transport: Arc::new(transport),
            tx,
            rx,
            next_ticket: 0,
            in_flight: None,
            state: CompileState::Idle,
            status: String::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self) -> CompileState {
        self.state
    }

    /// Latest text for the output pane: the compiling indicator, the
    /// server's output or a formatted transport error.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether a compile could be started for `file` at all
    pub fn can_compile(file: &SourceFile) -> bool {
        is_supported(file.extension())
    }

    /// Snapshot the session's text and send it to the build server on a
    /// worker thread.
    ///
    /// A compile already in flight is superseded: its result will be
    /// reported as [`CompileUpdate::Stale`] and not applied.
    pub fn start(
        &mut self,
        file: &SourceFile,
        session: &EditSession,
    ) -> Result<Ticket, CompileRefused> {
        if !Self::can_compile(file) {
            log::warn!("refusing to compile {}: unsupported extension", file.name());
            return Err(CompileRefused::UnsupportedFileType {
                extension: file.extension().to_string(),
            });
        }

        if let Some(previous) = &self.in_flight {
            log::info!("compile {:?} superseded", previous.ticket);
        }

        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        let source = session.current().text();
        let request = CompileRequest::for_file(file, source.clone());

        self.status = COMPILING.to_string();
        self.transition(CompileState::Sending);
        log::info!("compiling {} as {ticket:?}", request.file_name);

        self.in_flight = Some(InFlight { ticket, source });
        self.spawn_worker(ticket, request);
        Ok(ticket)
    }

    fn spawn_worker(&self, ticket: Ticket, request: CompileRequest) {
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("compile-{}", ticket.0))
            .spawn(move || {
                let sent_tx = tx.clone();
                let result = protocol::exchange(transport.as_ref(), &request, || {
                    let _ = sent_tx.send(WorkerEvent::Sent(ticket));
                });
                // Owner may have been dropped; nothing left to report to
                let _ = tx.send(WorkerEvent::Finished(ticket, result));
            });

        if let Err(e) = spawned {
            log::warn!("failed to spawn compile worker: {e}");
            let _ = self
                .tx
                .send(WorkerEvent::Finished(ticket, Err(TransportError::Io(e))));
        }
    }

    /// Apply whatever the worker has reported so far without blocking.
    pub fn pump(&mut self, session: &mut EditSession) -> Vec<CompileUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            updates.push(self.handle(event, session));
        }
        updates
    }

    /// Block until the current compile finishes or `timeout` passes,
    /// applying events as they arrive.
    pub fn wait(&mut self, session: &mut EditSession, timeout: Duration) -> Vec<CompileUpdate> {
        let deadline = Instant::now() + timeout;
        let mut updates = self.pump(session);

        while self.is_busy() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(event) => updates.push(self.handle(event, session)),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        updates
    }

    fn handle(&mut self, event: WorkerEvent, session: &mut EditSession) -> CompileUpdate {
        let ticket = match &event {
            WorkerEvent::Sent(ticket) | WorkerEvent::Finished(ticket, _) => *ticket,
        };
        let is_current = self
            .in_flight
            .as_ref()
            .is_some_and(|job| job.ticket == ticket);
        if !is_current {
            log::debug!("dropping event for stale compile {ticket:?}");
            return CompileUpdate::Stale { ticket };
        }

        match event {
            WorkerEvent::Sent(_) => {
                self.transition(CompileState::AwaitingResult);
                CompileUpdate::AwaitingResult { ticket }
            }
            WorkerEvent::Finished(_, result) => {
                let Some(job) = self.in_flight.take() else {
                    return CompileUpdate::Stale { ticket };
                };
                match result {
                    Ok(response) => self.apply(job, response, session),
                    Err(e) => {
                        let message = format!("Error: {e} (Check ADB and server)");
                        log::warn!("compile {ticket:?} failed: {e}");
                        self.status = message.clone();
                        self.transition(CompileState::Errored);
                        self.transition(CompileState::Idle);
                        CompileUpdate::Failed { ticket, message }
                    }
                }
            }
        }
    }

    fn apply(
        &mut self,
        job: InFlight,
        response: CompileResponse,
        session: &mut EditSession,
    ) -> CompileUpdate {
        self.transition(CompileState::Applying);
        let lines = map_diagnostics(&response.raw_output, &job.source);
        session.apply_diagnostics(&lines);
        self.status = response.raw_output.clone();
        self.transition(CompileState::Idle);
        log::info!(
            "compile {:?} finished, {} error line(s)",
            job.ticket,
            lines.len()
        );
        CompileUpdate::Succeeded {
            ticket: job.ticket,
            output: response.raw_output,
            lines,
        }
    }

    fn transition(&mut self, next: CompileState) {
        log::debug!("compile state {:?} -> {next:?}", self.state);
        self.state = next;
    }
}
