use crate::console_ipc::{ConsoleRequest, ProtocolError};
use crate::lifecycle::{offered_commands, Command, ControlVocabulary, VocabularyPreference};
use crate::progress::ClusterProgress;
use crate::snapshot::ClusterSnapshot;
use crate::solver::{SolverCatalog, SolverSelector};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info, warn};

/// Which kind of exchange produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Poll,
    Command(Command),
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Poll => f.write_str("poll"),
            Exchange::Command(command) => write!(f, "{command}"),
        }
    }
}

/// Every mutation of [`ConsoleState`] arrives as one of these.
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    ExchangeCompleted {
        exchange: Exchange,
        result: Result<ClusterSnapshot, ProtocolError>,
    },
    CommandDispatched(Command),
    CommandNotOffered(Command),
    CommandNotSent {
        command: Command,
        reason: String,
    },
    SelectSolver(String),
    EditStagedText(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// One-line message for the operator; the latest one replaces the previous.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Everything the console holds: the last good snapshot, the solver selector,
/// and bookkeeping about the link to the controller.
#[derive(Debug, Clone)]
pub struct ConsoleState {
    snapshot: Option<ClusterSnapshot>,
    selector: SolverSelector,
    preference: VocabularyPreference,
    vocabulary: ControlVocabulary,
    notice: Option<Notice>,
    consecutive_failures: u32,
    last_snapshot_at: Option<DateTime<Utc>>,
}

/// Reducer entry point: consumes the state and one event, returns the next
/// state.
pub fn reduce(mut state: ConsoleState, event: ConsoleEvent) -> ConsoleState {
    state.apply(event);
    state
}

impl ConsoleState {
    pub fn new(catalog: SolverCatalog, preference: VocabularyPreference) -> Self {
        Self {
            snapshot: None,
            selector: SolverSelector::new(catalog),
            preference,
            vocabulary: preference.initial(),
            notice: None,
            consecutive_failures: 0,
            last_snapshot_at: None,
        }
    }

    pub fn apply(&mut self, event: ConsoleEvent) {
        match event {
            ConsoleEvent::ExchangeCompleted { exchange, result } => match result {
                Ok(snapshot) => self.accept_snapshot(exchange, snapshot),
                Err(err) => self.record_failure(exchange, err),
            },
            ConsoleEvent::CommandDispatched(command) => {
                info!(event = "command_dispatched", command = %command);
                self.notice = Some(Notice::new(
                    NoticeLevel::Info,
                    format!("{command} requested; waiting for controller"),
                ));
            }
            ConsoleEvent::CommandNotOffered(command) => {
                let status = self
                    .snapshot
                    .as_ref()
                    .map(|snapshot| snapshot.status.to_string())
                    .unwrap_or_else(|| "connecting".to_string());
                debug!(event = "command_not_offered", command = %command, status = %status);
                self.notice = Some(Notice::new(
                    NoticeLevel::Warn,
                    format!("{command} is not available while {status}"),
                ));
            }
            ConsoleEvent::CommandNotSent { command, reason } => {
                warn!(event = "command_not_sent", command = %command, reason = %reason);
                self.notice = Some(Notice::new(
                    NoticeLevel::Error,
                    format!("{command} not sent: {reason}"),
                ));
            }
            ConsoleEvent::SelectSolver(name) => match self.selector.select_by_name(&name) {
                Ok(spec) => {
                    info!(event = "solver_selected", name = %spec.name);
                    self.notice = Some(Notice::new(
                        NoticeLevel::Info,
                        format!("staged solver '{}'", spec.name),
                    ));
                }
                Err(err) => {
                    warn!(event = "solver_not_found", name = %name);
                    self.notice = Some(Notice::new(NoticeLevel::Warn, err.to_string()));
                }
            },
            ConsoleEvent::EditStagedText(text) => {
                self.selector.edit_staged_text(text);
            }
        }
    }

    fn accept_snapshot(&mut self, exchange: Exchange, snapshot: ClusterSnapshot) {
        if let Some(previous) = &self.snapshot {
            if snapshot.programs_run < previous.programs_run {
                info!(
                    event = "controller_reset_detected",
                    previous = previous.programs_run,
                    current = snapshot.programs_run
                );
                self.notice = Some(Notice::new(
                    NoticeLevel::Info,
                    "controller reset detected; counters restarted",
                ));
            }
            for worker in &snapshot.workers {
                if let Some(prior) = previous.worker(&worker.worker_id) {
                    if worker.programs_run < prior.programs_run {
                        debug!(
                            event = "worker_counter_restarted",
                            worker_id = %worker.worker_id,
                            previous = prior.programs_run,
                            current = worker.programs_run
                        );
                    }
                }
            }
        }

        let vocabulary = self.preference.negotiate(self.vocabulary, &snapshot.status);
        if vocabulary != self.vocabulary {
            info!(event = "vocabulary_negotiated", vocabulary = vocabulary.as_str());
            self.vocabulary = vocabulary;
        }

        if let Exchange::Command(command) = exchange {
            self.notice = Some(Notice::new(
                NoticeLevel::Info,
                format!("{command} accepted; controller reports {}", snapshot.status),
            ));
        } else if self.consecutive_failures > 0 {
            info!(
                event = "controller_recovered",
                failures = self.consecutive_failures
            );
            self.notice = Some(Notice::new(NoticeLevel::Info, "controller reachable again"));
        }

        self.consecutive_failures = 0;
        self.last_snapshot_at = Some(Utc::now());
        self.snapshot = Some(snapshot);
    }

    /// Only failed polls count towards staleness; a rejected command says
    /// nothing about whether the controller is reachable.
    fn record_failure(&mut self, exchange: Exchange, err: ProtocolError) {
        if let Exchange::Command(command) = exchange {
            warn!(
                event = "command_failed",
                command = %command,
                error = %err
            );
            self.notice = Some(Notice::new(
                NoticeLevel::Error,
                format!("{command} failed: {err}"),
            ));
            return;
        }

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if let ProtocolError::Invalid(reason) = &err {
            warn!(
                event = "snapshot_rejected",
                failures = self.consecutive_failures,
                reason = %reason
            );
        } else {
            warn!(
                event = "controller_exchange_error",
                failures = self.consecutive_failures,
                error = %err
            );
        }
        let message = if self.snapshot.is_some() {
            format!("refresh failed: {err}; showing last snapshot")
        } else {
            format!("refresh failed: {err}")
        };
        self.notice = Some(Notice::new(NoticeLevel::Error, message));
    }

    pub fn snapshot(&self) -> Option<&ClusterSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot.is_some()
    }

    /// A snapshot is held but the most recent polls failed.
    pub fn is_stale(&self) -> bool {
        self.snapshot.is_some() && self.consecutive_failures > 0
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.last_snapshot_at
    }

    pub fn selector(&self) -> &SolverSelector {
        &self.selector
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn vocabulary(&self) -> ControlVocabulary {
        self.vocabulary
    }

    /// Commands to put in front of the operator; none until connected.
    pub fn offered_commands(&self) -> Vec<Command> {
        match &self.snapshot {
            Some(snapshot) => offered_commands(&snapshot.status, self.vocabulary),
            None => Vec::new(),
        }
    }

    pub fn progress(&self) -> Option<ClusterProgress> {
        self.snapshot.as_ref().map(ClusterProgress::from_snapshot)
    }

    /// Request for `command` if it is currently offered.
    pub fn request_for(&self, command: Command) -> Option<ConsoleRequest> {
        if !self.offered_commands().contains(&command) {
            return None;
        }
        Some(ConsoleRequest::command(
            command,
            self.selector.staged_text(),
        ))
    }
}
