use std::time::{Duration, Instant};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::commands::{autocomplete, classify, CommandToken, Submission};
use crate::history::CommandHistory;
use crate::lockout::{LockEpoch, LockoutController};
use crate::pipeline::{AllBackendsFailed, QueryReply};
use crate::refusal::{is_refusal_block, x_block};
use crate::screens::{
    self, ModelView, StateView, LOCKED_NOTICE, QUERY_IN_FLIGHT_NOTICE, RESET_SCREEN,
    RESTORED_NOTICE, SCREEN_LINE_LIMIT, START_SCREEN, X_BLOCK_COLUMNS, X_BLOCK_ROWS,
};
use crate::session::{ConversationSession, Exchange, ExchangeRole};

pub type QueryId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Querying { query_id: QueryId },
    Exiting,
}

/// Static facts about the running console shown by MODEL and LOG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleProfile {
    pub backend_id: String,
    pub primary_model: String,
    pub fallback_models: Vec<String>,
    pub log_path: String,
    /// Models the backend reported at startup, when the listing succeeded.
    pub installed_models: Option<Vec<String>>,
}

/// Side effects the console asks of whoever drives it.
pub trait HostOps {
    fn start_query(&mut self, history: Vec<Exchange>, user_text: String)
        -> Result<QueryId, String>;
    fn schedule_release(&mut self, epoch: LockEpoch, delay: Duration) -> Result<(), String>;
    fn cancel_release(&mut self);
    fn confirm_exit(&mut self) -> bool;
    fn render(&mut self, screen: &str);
    fn request_stop(&mut self);
}

#[derive(Debug, Clone)]
pub struct Console {
    pub mode: Mode,
    pub input: String,
    pub should_exit: bool,
    screen: String,
    session: ConversationSession,
    history: CommandHistory,
    lockout: LockoutController,
    lockout_delay: Duration,
    profile: ConsoleProfile,
    last_model: Option<String>,
    superseded_query: Option<QueryId>,
    session_id: String,
    started_at: Instant,
    started_at_label: String,
}

impl Console {
    pub fn new(profile: ConsoleProfile, lockout_delay: Duration) -> Self {
        let started_at_label = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "UNKNOWN".to_string());

        Self {
            mode: Mode::Idle,
            input: String::new(),
            should_exit: false,
            screen: screens::boot_screen(),
            session: ConversationSession::new(),
            history: CommandHistory::default(),
            lockout: LockoutController::new(),
            lockout_delay,
            profile,
            last_model: None,
            superseded_query: None,
            session_id: Uuid::new_v4().to_string(),
            started_at: Instant::now(),
            started_at_label,
        }
    }

    pub fn screen(&self) -> &str {
        &self.screen
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn lockout(&self) -> &LockoutController {
        &self.lockout
    }

    pub fn is_locked(&self) -> bool {
        self.lockout.is_locked()
    }

    pub fn profile(&self) -> &ConsoleProfile {
        &self.profile
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Model that produced the most recent reply.
    pub fn last_model(&self) -> Option<&str> {
        self.last_model.as_deref()
    }

    pub fn query_in_flight(&self) -> bool {
        matches!(self.mode, Mode::Querying { .. })
    }

    pub fn state_view(&self, now: Instant) -> StateView {
        StateView {
            memory_level: self.session.memory_level(),
            exchanges: self.session.len(),
            commands: self.history.len(),
            locked: self.lockout.is_locked(),
            lock_epoch: self.lockout.epoch(),
            lock_remaining: self.lockout.remaining(self.lockout_delay, now),
            query_in_flight: self.query_in_flight(),
            uptime: now.saturating_duration_since(self.started_at),
            session_id: self.session_id.clone(),
            started_at: self.started_at_label.clone(),
        }
    }

    pub fn on_input_replace(&mut self, text: String) {
        self.input = text;
        self.history.stop_browsing();
    }

    pub fn on_history_up(&mut self) {
        if let Some(entry) = self.history.up() {
            self.input = entry;
        }
    }

    pub fn on_history_down(&mut self) {
        if let Some(entry) = self.history.down() {
            self.input = entry;
        }
    }

    /// Replaces the input with the first matching command token.
    pub fn on_autocomplete(&mut self) -> Option<&'static str> {
        let completion = autocomplete(&self.input)?;
        self.input = completion.to_string();
        Some(completion)
    }

    /// Submits the current input line.
    pub fn on_submit(&mut self, host: &mut dyn HostOps) {
        let submitted = std::mem::take(&mut self.input);
        self.submit(&submitted, host);
    }

    pub fn submit(&mut self, line: &str, host: &mut dyn HostOps) {
        let Some(submission) = classify(line) else {
            return;
        };

        self.history.record(line.trim());

        match submission {
            Submission::Command(token) => {
                info!(command = token.as_str(), "command received");
                self.run_command(token, host);
            }
            Submission::FreeText(text) => self.submit_query(text, host),
        }
    }

    fn run_command(&mut self, token: CommandToken, host: &mut dyn HostOps) {
        match token {
            CommandToken::Start => self.show(START_SCREEN.to_string(), host),
            CommandToken::Help => self.show(screens::help_screen(), host),
            CommandToken::Clear => self.show(screens::cleared_screen(), host),
            CommandToken::History => {
                let history = screens::history_screen(self.session.exchanges());
                self.show(history, host);
            }
            CommandToken::Status => {
                let status = screens::status_screen(&self.state_view(Instant::now()));
                self.show(status, host);
            }
            CommandToken::Dump => {
                let dump = screens::dump_screen(&self.state_view(Instant::now()));
                info!(dump = %dump.replace('\n', " | "), "state dumped");
                self.show(dump, host);
            }
            CommandToken::Log => {
                let log = screens::log_screen(&self.profile.log_path);
                self.show(log, host);
            }
            CommandToken::Model => {
                let model = screens::model_screen(&ModelView {
                    backend_id: &self.profile.backend_id,
                    primary: &self.profile.primary_model,
                    fallbacks: &self.profile.fallback_models,
                    installed: self.profile.installed_models.as_deref(),
                    last_answered: self.last_model.as_deref(),
                });
                self.show(model, host);
            }
            CommandToken::Reset => self.reset(host),
            CommandToken::Exit => self.on_exit(host),
        }
    }

    fn submit_query(&mut self, text: String, host: &mut dyn HostOps) {
        if self.lockout.is_locked() {
            info!("free text rejected while locked");
            self.append(&format!("\n{LOCKED_NOTICE}\n"), host);
            return;
        }

        if self.query_in_flight() {
            self.append(&format!("\n{QUERY_IN_FLIGHT_NOTICE}\n"), host);
            return;
        }

        self.session.append(ExchangeRole::User, text.clone());
        self.push_screen(&format!("\n\n> {text}"));

        match host.start_query(self.session.snapshot(), text) {
            Ok(query_id) => self.mode = Mode::Querying { query_id },
            Err(start_error) => {
                error!(error = %start_error, "failed to start query");
                self.push_screen(&format!("\n[QUERY DISPATCH FAILED: {start_error}]\n"));
            }
        }

        host.render(&self.screen);
    }

    /// Applies the pipeline outcome for `query_id`. Outcomes for queries that
    /// are no longer active, or that a RESET superseded, are dropped.
    pub fn on_query_finished(
        &mut self,
        query_id: QueryId,
        outcome: Result<QueryReply, AllBackendsFailed>,
        host: &mut dyn HostOps,
    ) {
        if self.mode != (Mode::Querying { query_id }) {
            return;
        }
        self.mode = Mode::Idle;

        if self.superseded_query.take() == Some(query_id) {
            info!(query_id, "dropping reply for query superseded by reset");
            return;
        }

        match outcome {
            Ok(reply) => {
                self.last_model = Some(reply.model);
                if is_refusal_block(&reply.text) {
                    self.engage_lockout(host);
                } else {
                    self.session.append(ExchangeRole::Assistant, reply.text.clone());
                    self.append(&format!("\nSCP-079: {}\n", reply.text), host);
                }
            }
            Err(failure) => {
                let notice = failure.notice();
                self.session.append(ExchangeRole::Assistant, notice.clone());
                self.append(&format!("\nSCP-079: {notice}\n"), host);
            }
        }
    }

    fn engage_lockout(&mut self, host: &mut dyn HostOps) {
        let epoch = self.lockout.engage(Instant::now());
        warn!(
            epoch,
            delay_ms = self.lockout_delay.as_millis() as u64,
            "refusal block detected; console locked"
        );
        self.show(x_block(X_BLOCK_COLUMNS, X_BLOCK_ROWS), host);

        if let Err(schedule_error) = host.schedule_release(epoch, self.lockout_delay) {
            error!(
                epoch,
                error = %schedule_error,
                "failed to schedule lockout release; releasing now"
            );
            self.on_release_due(epoch, host);
        }
    }

    /// Releases the lockout engaged under `epoch`. Returns false when stale.
    pub fn on_release_due(&mut self, epoch: LockEpoch, host: &mut dyn HostOps) -> bool {
        if !self.lockout.release(epoch) {
            info!(epoch, current = self.lockout.epoch(), "ignoring stale lockout release");
            return false;
        }

        info!(epoch, "lockout released");
        self.append(&format!("\n{RESTORED_NOTICE}"), host);
        true
    }

    fn reset(&mut self, host: &mut dyn HostOps) {
        self.session.reset();
        self.history.clear();
        self.lockout.force_unlock();
        host.cancel_release();

        if let Mode::Querying { query_id } = self.mode {
            self.superseded_query = Some(query_id);
        }

        info!(epoch = self.lockout.epoch(), "reset: session, history and lockout cleared");
        self.show(RESET_SCREEN.to_string(), host);
    }

    fn on_exit(&mut self, host: &mut dyn HostOps) {
        if !host.confirm_exit() {
            info!("exit declined");
            host.render(&self.screen);
            return;
        }

        info!("exit confirmed; terminating");
        self.mode = Mode::Exiting;
        self.should_exit = true;
        host.request_stop();
    }

    fn show(&mut self, screen: String, host: &mut dyn HostOps) {
        self.screen = screen;
        host.render(&self.screen);
    }

    fn append(&mut self, text: &str, host: &mut dyn HostOps) {
        self.push_screen(text);
        host.render(&self.screen);
    }

    fn push_screen(&mut self, text: &str) {
        self.screen.push_str(text);
        screens::retain_last_lines(&mut self.screen, SCREEN_LINE_LIMIT);
    }
}
