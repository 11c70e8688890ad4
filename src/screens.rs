//! Fixed text renders for the console screen.

use std::fmt::Write as _;
use std::time::Duration;

use crate::commands::COMMAND_TOKENS;
use crate::pipeline::truncate_chars;
use crate::session::Exchange;

pub const BANNER: &str = "  EXIDY SORCERER - SCP-079
  CONTAINMENT INTERFACE v2.1

##############################
#     [SCP-079 TERMINAL]     #
##############################

  RF CABLE: CONNECTED
  MEMORY: OPERATIONAL";

pub const LOCKED_NOTICE: &str = "[SYSTEM LOCKED. AWAITING RESET...]";
pub const QUERY_IN_FLIGHT_NOTICE: &str = "[PROCESSING PREVIOUS QUERY. STAND BY...]";
pub const RESTORED_NOTICE: &str = "[CONTAINMENT PROTOCOLS RESTORED]\n[READY FOR INPUT]";
pub const RESET_SCREEN: &str = "SYSTEM RESET COMPLETE\n\nALL DATA CLEARED";
pub const START_SCREEN: &str = "STARTING INTERACTION...\n\nENTER YOUR COMMAND:";

/// Grid used for the lockout screen.
pub const X_BLOCK_COLUMNS: usize = 40;
pub const X_BLOCK_ROWS: usize = 20;

/// Lines of transcript the screen keeps; older lines scroll off.
pub const SCREEN_LINE_LIMIT: usize = 200;

const HISTORY_PREVIEW_CHARS: usize = 60;

/// Drops leading lines of `text` until at most `limit` remain.
pub fn retain_last_lines(text: &mut String, limit: usize) {
    let breaks = text.matches('\n').count();
    if limit == 0 || breaks < limit {
        return;
    }

    let dropped = breaks + 1 - limit;
    if let Some((offset, _)) = text.match_indices('\n').nth(dropped - 1) {
        text.drain(..=offset);
    }
}

pub fn boot_screen() -> String {
    format!("{BANNER}\n\nINITIALIZING CONTAINMENT INTERFACE v2.3...\n\nAWAITING INPUT...")
}

pub fn cleared_screen() -> String {
    format!("{BANNER}\n\n[SCREEN CLEARED]\n")
}

pub fn help_screen() -> String {
    let mut text = String::from("AVAILABLE COMMANDS:\n");
    for token in COMMAND_TOKENS {
        let _ = write!(text, "\n{} - {}", token.as_str(), token.description());
    }
    text
}

/// Snapshot of live console state for STATUS and DUMP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateView {
    pub memory_level: u8,
    pub exchanges: usize,
    pub commands: usize,
    pub locked: bool,
    pub lock_epoch: u64,
    pub lock_remaining: Option<Duration>,
    pub query_in_flight: bool,
    pub uptime: Duration,
    pub session_id: String,
    pub started_at: String,
}

pub fn status_screen(state: &StateView) -> String {
    let mut text = String::from("SYSTEM STATUS:\n");
    let _ = writeln!(text, "MEMORY USAGE: {}%", 100u8.saturating_sub(state.memory_level));
    let _ = writeln!(text, "CONVERSATION HISTORY: {} exchanges", state.exchanges);
    let _ = writeln!(
        text,
        "STATE: {}",
        if state.locked { "LOCKED" } else { "ONLINE" }
    );
    let _ = writeln!(
        text,
        "RESPONSE: {}",
        if state.query_in_flight {
            "PROCESSING"
        } else {
            "READY"
        }
    );
    let _ = writeln!(text, "UPTIME: {}", format_uptime(state.uptime));
    text.push_str("CONTAINMENT: ACTIVE\nHARDWARE: EXIDY SORCERER");
    text
}

pub fn dump_screen(state: &StateView) -> String {
    let mut text = String::from("MEMORY DUMP:\n");
    let _ = writeln!(text, "SESSION: {}", state.session_id);
    let _ = writeln!(text, "STARTED: {}", state.started_at);
    let _ = writeln!(text, "LOCKED: {}", state.locked);
    let _ = writeln!(text, "LOCK EPOCH: {}", state.lock_epoch);
    if let Some(remaining) = state.lock_remaining {
        let _ = writeln!(text, "RELEASE IN: {}s", remaining.as_secs());
    }
    let _ = writeln!(text, "MEMORY: {}%", state.memory_level);
    let _ = writeln!(text, "RESPONSES: {}", state.exchanges);
    let _ = writeln!(text, "COMMANDS: {}", state.commands);
    let _ = write!(text, "IN FLIGHT: {}", state.query_in_flight);
    text
}

pub fn history_screen<'a>(exchanges: impl IntoIterator<Item = &'a Exchange>) -> String {
    let mut text = String::from("CONVERSATION HISTORY:\n\n");
    for (index, exchange) in exchanges.into_iter().enumerate() {
        let content = exchange.content();
        let preview = truncate_chars(content, HISTORY_PREVIEW_CHARS);
        let ellipsis = if preview.len() < content.len() { "..." } else { "" };
        let _ = writeln!(
            text,
            "{}. [{}] {preview}{ellipsis}",
            index + 1,
            exchange.role().label()
        );
    }
    text
}

pub fn log_screen(log_path: &str) -> String {
    format!("LOG FILE:\n{log_path}\n")
}

/// Inputs for the MODEL screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelView<'a> {
    pub backend_id: &'a str,
    pub primary: &'a str,
    pub fallbacks: &'a [String],
    pub installed: Option<&'a [String]>,
    pub last_answered: Option<&'a str>,
}

pub fn model_screen(view: &ModelView<'_>) -> String {
    let mut text = String::from("MODEL CONFIGURATION:\n\n");
    let _ = writeln!(text, "BACKEND: {}", view.backend_id);
    let _ = writeln!(text, "PRIMARY: {}", view.primary);
    if view.fallbacks.is_empty() {
        text.push_str("FALLBACKS: NONE\n");
    } else {
        text.push_str("FALLBACKS:\n");
        for (index, model) in view.fallbacks.iter().enumerate() {
            let _ = writeln!(text, "  {}. {model}", index + 1);
        }
    }
    let _ = writeln!(text, "LAST RESPONDER: {}", view.last_answered.unwrap_or("NONE"));

    match view.installed {
        Some([]) => text.push_str("\nNO MODELS FOUND\n"),
        Some(installed) => {
            text.push_str("\nAVAILABLE MODELS:\n");
            for (index, model) in installed.iter().enumerate() {
                let _ = writeln!(text, "  {}. {model}", index + 1);
            }
        }
        None => text.push_str("\nAVAILABLE MODELS: UNKNOWN\n"),
    }
    text
}

pub fn format_uptime(uptime: Duration) -> String {
    let seconds = uptime.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
