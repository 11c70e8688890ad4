use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::app::{Console, HostOps, QueryId};
use crate::commands::{classify, CommandToken, Submission};
use crate::lockout::LockEpoch;
use crate::pipeline::{AllBackendsFailed, QueryPipeline};
use crate::session::Exchange;

const EXIT_PROMPT: &str = "TERMINATE CONTAINMENT INTERFACE?";
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Display sink plus the yes/no prompt EXIT needs.
pub trait Surface: Send + Sync + 'static {
    /// Replaces the visible content with `screen`.
    fn render(&self, screen: &str);
    fn confirm(&self, prompt: &str) -> bool;
}

struct ActiveQuery {
    query_id: QueryId,
    join_handle: Option<JoinHandle<()>>,
}

struct PendingRelease {
    epoch: LockEpoch,
    cancel: Sender<()>,
    join_handle: Option<JoinHandle<()>>,
}

/// Owns the console and its background work.
///
/// Query and release workers apply their results by taking the console lock,
/// so every render happens with the console state it describes.
pub struct ConsoleRuntime {
    console: Arc<Mutex<Console>>,
    surface: Arc<dyn Surface>,
    pipeline: Arc<QueryPipeline>,
    next_query_id: AtomicU64,
    active_query: Mutex<Option<ActiveQuery>>,
    pending_release: Mutex<Option<PendingRelease>>,
    exit_answer: Mutex<Option<bool>>,
    stop_requested: AtomicBool,
}

impl ConsoleRuntime {
    pub fn new(
        console: Arc<Mutex<Console>>,
        pipeline: QueryPipeline,
        surface: Arc<dyn Surface>,
    ) -> Arc<Self> {
        Arc::new(Self {
            console,
            surface,
            pipeline: Arc::new(pipeline),
            next_query_id: AtomicU64::new(1),
            active_query: Mutex::new(None),
            pending_release: Mutex::new(None),
            exit_answer: Mutex::new(None),
            stop_requested: AtomicBool::new(false),
        })
    }

    pub fn console(&self) -> &Arc<Mutex<Console>> {
        &self.console
    }

    /// Submits `line` as if typed into the input.
    pub fn submit(self: &Arc<Self>, line: &str) {
        self.ask_exit_before_submit(line);

        let mut host = Arc::clone(self);
        let mut console = lock_unpoisoned(&self.console);
        console.on_input_replace(line.to_string());
        console.on_submit(&mut host);
    }

    /// Submits whatever the input currently holds, such as a recalled entry.
    pub fn submit_pending(self: &Arc<Self>) {
        let pending = lock_unpoisoned(&self.console).input.clone();
        self.ask_exit_before_submit(&pending);

        let mut host = Arc::clone(self);
        let mut console = lock_unpoisoned(&self.console);
        console.on_submit(&mut host);
    }

    /// Recalls an older history entry and returns the resulting input.
    pub fn navigate_up(&self) -> String {
        let mut console = lock_unpoisoned(&self.console);
        console.on_history_up();
        console.input.clone()
    }

    /// Recalls a newer history entry and returns the resulting input.
    pub fn navigate_down(&self) -> String {
        let mut console = lock_unpoisoned(&self.console);
        console.on_history_down();
        console.input.clone()
    }

    /// Completes `partial` to a command token. The input keeps `partial`
    /// when nothing matches.
    pub fn autocomplete(&self, partial: &str) -> Option<String> {
        let mut console = lock_unpoisoned(&self.console);
        console.on_input_replace(partial.to_string());
        console.on_autocomplete().map(str::to_string)
    }

    pub fn render_current(&self) {
        let console = lock_unpoisoned(&self.console);
        self.surface.render(console.screen());
    }

    pub fn should_exit(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst) || lock_unpoisoned(&self.console).should_exit
    }

    pub fn is_query_in_flight(&self) -> bool {
        if self.lock_active_query().is_some() {
            return true;
        }
        lock_unpoisoned(&self.console).query_in_flight()
    }

    pub fn is_release_pending(&self) -> bool {
        self.lock_pending_release().is_some()
    }

    /// Blocks until no query is outstanding or `timeout` elapses.
    pub fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_query_in_flight() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(IDLE_POLL_INTERVAL);
        }
    }

    /// Cancels any pending release and reaps finished workers.
    pub fn shutdown(&self) {
        self.cancel_release_internal();

        if let Some(mut active) = self.lock_active_query().take() {
            debug!(query_id = active.query_id, "abandoning in-flight query on shutdown");
            join_if_finished(active.join_handle.take());
        }
    }

    /// Prompts for EXIT confirmation without holding the console lock, so
    /// workers can still render while the operator decides.
    fn ask_exit_before_submit(&self, line: &str) {
        if classify(line) != Some(Submission::Command(CommandToken::Exit)) {
            return;
        }

        let answer = self.surface.confirm(EXIT_PROMPT);
        *lock_unpoisoned(&self.exit_answer) = Some(answer);
    }

    fn start_query_internal(
        self: &Arc<Self>,
        history: Vec<Exchange>,
        user_text: String,
    ) -> Result<QueryId, String> {
        let mut active_query = self.lock_active_query();
        if active_query.is_some() {
            return Err("Query already in flight".to_string());
        }

        let query_id = self.next_query_id.fetch_add(1, Ordering::SeqCst);
        let runtime = Arc::clone(self);
        let join_handle = thread::Builder::new()
            .name(format!("containment-query-{query_id}"))
            .spawn(move || runtime.run_query(query_id, history, user_text))
            .map_err(|error| format!("Failed to spawn query worker: {error}"))?;

        *active_query = Some(ActiveQuery {
            query_id,
            join_handle: Some(join_handle),
        });
        debug!(query_id, "query worker started");

        Ok(query_id)
    }

    fn run_query(self: Arc<Self>, query_id: QueryId, history: Vec<Exchange>, user_text: String) {
        let pipeline = Arc::clone(&self.pipeline);
        let outcome = match catch_unwind(AssertUnwindSafe(|| pipeline.query(&history, &user_text)))
        {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(query_id, "query worker panicked");
                Err(AllBackendsFailed {
                    attempted: Vec::new(),
                    primary_error: "query worker panicked".to_string(),
                })
            }
        };

        self.clear_active_query_if_matching(query_id);

        let mut host = Arc::clone(&self);
        let mut console = lock_unpoisoned(&self.console);
        console.on_query_finished(query_id, outcome, &mut host);
    }

    fn clear_active_query_if_matching(&self, query_id: QueryId) {
        let mut active_query = self.lock_active_query();
        if active_query.as_ref().map(|active| active.query_id) != Some(query_id) {
            return;
        }

        if let Some(mut completed) = active_query.take() {
            join_if_finished(completed.join_handle.take());
        }
    }

    fn schedule_release_internal(
        self: &Arc<Self>,
        epoch: LockEpoch,
        delay: Duration,
    ) -> Result<(), String> {
        let mut pending = self.lock_pending_release();
        if let Some(previous) = pending.take() {
            cancel_pending(previous);
        }

        let (cancel, cancelled) = mpsc::channel();
        let deadline = Instant::now() + delay;
        let runtime = Arc::clone(self);
        let join_handle = thread::Builder::new()
            .name(format!("containment-release-{epoch}"))
            .spawn(move || runtime.run_release(epoch, deadline, cancelled))
            .map_err(|error| format!("Failed to spawn release timer: {error}"))?;

        *pending = Some(PendingRelease {
            epoch,
            cancel,
            join_handle: Some(join_handle),
        });
        debug!(epoch, delay_ms = delay.as_millis() as u64, "lockout release scheduled");

        Ok(())
    }

    fn run_release(self: Arc<Self>, epoch: LockEpoch, deadline: Instant, cancelled: Receiver<()>) {
        if !wait_until(deadline, &cancelled) {
            debug!(epoch, "lockout release cancelled");
            return;
        }

        self.clear_pending_release_if_matching(epoch);

        let mut host = Arc::clone(&self);
        let mut console = lock_unpoisoned(&self.console);
        console.on_release_due(epoch, &mut host);
    }

    fn clear_pending_release_if_matching(&self, epoch: LockEpoch) {
        let mut pending = self.lock_pending_release();
        if pending.as_ref().map(|release| release.epoch) == Some(epoch) {
            pending.take();
        }
    }

    fn cancel_release_internal(&self) {
        if let Some(pending) = self.lock_pending_release().take() {
            cancel_pending(pending);
        }
    }

    fn lock_active_query(&self) -> MutexGuard<'_, Option<ActiveQuery>> {
        lock_unpoisoned(&self.active_query)
    }

    fn lock_pending_release(&self) -> MutexGuard<'_, Option<PendingRelease>> {
        lock_unpoisoned(&self.pending_release)
    }
}

impl HostOps for Arc<ConsoleRuntime> {
    fn start_query(
        &mut self,
        history: Vec<Exchange>,
        user_text: String,
    ) -> Result<QueryId, String> {
        self.start_query_internal(history, user_text)
    }

    fn schedule_release(&mut self, epoch: LockEpoch, delay: Duration) -> Result<(), String> {
        self.schedule_release_internal(epoch, delay)
    }

    fn cancel_release(&mut self) {
        self.cancel_release_internal();
    }

    fn confirm_exit(&mut self) -> bool {
        let answered = lock_unpoisoned(&self.exit_answer).take();
        answered.unwrap_or_else(|| self.surface.confirm(EXIT_PROMPT))
    }

    fn render(&mut self, screen: &str) {
        self.surface.render(screen);
    }

    fn request_stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }
}

/// Waits for `deadline`. Returns false if cancelled first.
fn wait_until(deadline: Instant, cancelled: &Receiver<()>) -> bool {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return true;
        }

        match cancelled.recv_timeout(deadline - now) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}

fn cancel_pending(mut pending: PendingRelease) {
    let _ = pending.cancel.send(());
    join_if_finished(pending.join_handle.take());
}

fn join_if_finished(join_handle: Option<JoinHandle<()>>) {
    let Some(join_handle) = join_handle else {
        return;
    };

    let is_current_thread = join_handle.thread().id() == thread::current().id();
    if !is_current_thread && join_handle.is_finished() {
        let _ = join_handle.join();
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
