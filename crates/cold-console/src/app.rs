use crate::controller::OutboundRequest;
use cold_core::{Command, ConsoleEvent, ConsoleState, Exchange};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Dashboard,
    Editor,
    Picker,
}

pub struct App {
    pub state: ConsoleState,
    command_tx: mpsc::Sender<OutboundRequest>,
    pub focus: Focus,
    pub help_open: bool,
    pub picker: ListState,
    pub scroll: u16,
}

pub fn command_key(command: Command) -> char {
    match command {
        Command::Run => 'g',
        Command::Stop => 's',
        Command::Pause => 'p',
        Command::Unpause => 'u',
        Command::Disarm => 'd',
        Command::Arm => 'a',
        Command::Reset => 'R',
    }
}

fn command_for_key(ch: char) -> Option<Command> {
    Command::ALL
        .into_iter()
        .find(|command| command_key(*command) == ch)
}

impl App {
    pub fn new(state: ConsoleState, command_tx: mpsc::Sender<OutboundRequest>) -> Self {
        Self {
            state,
            command_tx,
            focus: Focus::Dashboard,
            help_open: false,
            picker: ListState::default(),
            scroll: 0,
        }
    }

    pub fn apply(&mut self, event: ConsoleEvent) {
        self.state.apply(event);
    }

    /// Queues `command` if the current status offers it; otherwise only a
    /// notice is raised.
    pub fn dispatch(&mut self, command: Command) {
        let Some(request) = self.state.request_for(command) else {
            self.apply(ConsoleEvent::CommandNotOffered(command));
            return;
        };
        let outbound = OutboundRequest {
            exchange: Exchange::Command(command),
            request,
        };
        match self.command_tx.try_send(outbound) {
            Ok(()) => self.apply(ConsoleEvent::CommandDispatched(command)),
            Err(err) => self.apply(ConsoleEvent::CommandNotSent {
                command,
                reason: err.to_string(),
            }),
        }
    }

    pub fn request_refresh(&mut self) {
        if let Err(err) = self.command_tx.try_send(OutboundRequest::poll()) {
            warn!(event = "refresh_not_sent", error = %err);
        }
    }

    /// Returns true when the operator asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.focus {
            Focus::Editor => {
                self.handle_editor_key(key);
                false
            }
            Focus::Picker => {
                self.handle_picker_key(key);
                false
            }
            Focus::Dashboard => self.handle_dashboard_key(key),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent) -> bool {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return false;
        }
        if key.code == KeyCode::Esc && self.help_open {
            self.help_open = false;
            return false;
        }
        if self.help_open {
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('.') => self.request_refresh(),
            KeyCode::Char('e') => self.focus = Focus::Editor,
            KeyCode::Char('l') => self.open_picker(),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Char(ch) => {
                if let Some(command) = command_for_key(ch) {
                    self.dispatch(command);
                }
            }
            _ => {}
        }
        false
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let mut text = self.state.selector().staged_text().to_string();
        match key.code {
            KeyCode::Esc => {
                self.focus = Focus::Dashboard;
                return;
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => text.clear(),
            KeyCode::Char(ch) => text.push(ch),
            KeyCode::Enter => text.push('\n'),
            KeyCode::Tab => text.push('\t'),
            KeyCode::Backspace => {
                if text.pop().is_none() {
                    return;
                }
            }
            _ => return,
        }
        self.apply(ConsoleEvent::EditStagedText(text));
    }

    fn open_picker(&mut self) {
        let selector = self.state.selector();
        if selector.catalog().is_empty() {
            return;
        }
        let index = selector
            .selected()
            .and_then(|name| selector.catalog().position(name))
            .unwrap_or(0);
        self.picker.select(Some(index));
        self.focus = Focus::Picker;
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let len = self.state.selector().catalog().len();
        let current = self.picker.selected().unwrap_or(0);
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.focus = Focus::Dashboard,
            KeyCode::Down | KeyCode::Char('j') if len > 0 => {
                self.picker.select(Some((current + 1) % len));
            }
            KeyCode::Up | KeyCode::Char('k') if len > 0 => {
                self.picker.select(Some((current + len - 1) % len));
            }
            KeyCode::Enter => {
                let name = self
                    .state
                    .selector()
                    .catalog()
                    .specs()
                    .get(current)
                    .map(|spec| spec.name.clone());
                if let Some(name) = name {
                    self.apply(ConsoleEvent::SelectSolver(name));
                }
                self.focus = Focus::Dashboard;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cold_core::{
        ClusterSnapshot, ClusterStatus, NoticeLevel, SolverCatalog, SolverSpec,
        VocabularyPreference,
    };

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn snapshot(status: ClusterStatus) -> ClusterSnapshot {
        ClusterSnapshot {
            status,
            workers: Vec::new(),
            programs_run: 0,
            unsolved: Vec::new(),
            solved: Vec::new(),
            solutions: Vec::new(),
            solver: None,
        }
    }

    fn app_with(status: Option<ClusterStatus>) -> (App, mpsc::Receiver<OutboundRequest>) {
        let (tx, rx) = mpsc::channel(4);
        let catalog = SolverCatalog::from_specs([
            SolverSpec::new("add", "depth 1\npattern add\n"),
            SolverSpec::new("gravity", "depth 4\n"),
        ]);
        let mut app = App::new(ConsoleState::new(catalog, VocabularyPreference::Auto), tx);
        if let Some(status) = status {
            app.apply(ConsoleEvent::ExchangeCompleted {
                exchange: Exchange::Poll,
                result: Ok(snapshot(status)),
            });
        }
        (app, rx)
    }

    #[test]
    fn offered_command_is_queued() {
        let (mut app, mut rx) = app_with(Some(ClusterStatus::Running));
        assert!(!app.handle_key(key(KeyCode::Char('s'))));

        let outbound = rx.try_recv().unwrap();
        assert_eq!(outbound.exchange, Exchange::Command(Command::Stop));
        assert_eq!(outbound.request.command, Some(Command::Stop));
        assert_eq!(outbound.request.solver, None);
        assert_eq!(app.state.notice().map(|n| n.level), Some(NoticeLevel::Info));
    }

    #[test]
    fn command_not_offered_sends_nothing() {
        let (mut app, mut rx) = app_with(Some(ClusterStatus::Running));
        app.handle_key(key(KeyCode::Char('g')));

        assert!(rx.try_recv().is_err());
        assert_eq!(app.state.notice().map(|n| n.level), Some(NoticeLevel::Warn));
    }

    #[test]
    fn connecting_console_sends_no_commands() {
        let (mut app, mut rx) = app_with(None);
        app.handle_key(key(KeyCode::Char('R')));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reset_carries_edited_text() {
        let (mut app, mut rx) = app_with(Some(ClusterStatus::Stopped));
        app.handle_key(key(KeyCode::Char('e')));
        assert_eq!(app.focus, Focus::Editor);
        app.handle_key(key(KeyCode::Char('i')));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.focus, Focus::Dashboard);

        app.handle_key(key(KeyCode::Char('R')));
        let outbound = rx.try_recv().unwrap();
        assert_eq!(outbound.request.command, Some(Command::Reset));
        assert_eq!(
            outbound.request.solver.as_deref(),
            Some("depth 1\npattern add\ni")
        );
    }

    #[test]
    fn ctrl_u_clears_staged_text() {
        let (mut app, _rx) = app_with(None);
        app.handle_key(key(KeyCode::Char('e')));
        app.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(app.state.selector().staged_text(), "");
        app.handle_key(key(KeyCode::Char('q')));
        assert_eq!(app.state.selector().staged_text(), "q");
    }

    #[test]
    fn picker_selects_catalog_entry() {
        let (mut app, _rx) = app_with(None);
        app.handle_key(key(KeyCode::Char('l')));
        assert_eq!(app.focus, Focus::Picker);
        assert_eq!(app.picker.selected(), Some(0));

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.focus, Focus::Dashboard);
        assert_eq!(app.state.selector().selected(), Some("gravity"));
        assert_eq!(app.state.selector().staged_text(), "depth 4\n");
    }

    #[test]
    fn picker_wraps_upwards() {
        let (mut app, _rx) = app_with(None);
        app.handle_key(key(KeyCode::Char('l')));
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.picker.selected(), Some(1));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.state.selector().selected(), Some("add"));
    }

    #[test]
    fn help_swallows_keys_and_q_quits() {
        let (mut app, mut rx) = app_with(Some(ClusterStatus::Running));
        app.handle_key(key(KeyCode::Char('?')));
        assert!(app.help_open);
        assert!(!app.handle_key(key(KeyCode::Char('s'))));
        assert!(rx.try_recv().is_err());
        app.handle_key(key(KeyCode::Esc));
        assert!(!app.help_open);
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn manual_refresh_queues_poll() {
        let (mut app, mut rx) = app_with(None);
        app.handle_key(key(KeyCode::Char('.')));
        let outbound = rx.try_recv().unwrap();
        assert_eq!(outbound.exchange, Exchange::Poll);
        assert!(outbound.request.is_refresh());
    }

    #[test]
    fn full_queue_reports_command_not_sent() {
        let (mut app, _rx) = app_with(Some(ClusterStatus::Running));
        for _ in 0..4 {
            app.request_refresh();
        }
        app.dispatch(Command::Stop);
        assert_eq!(app.state.notice().map(|n| n.level), Some(NoticeLevel::Error));
    }
}
