//! Line-oriented terminal front end.
//!
//! Each stdin line is one input event. Cursor-key sequences on their own line
//! navigate history, a trailing TAB completes a command, and an empty line
//! submits whatever navigation recalled.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::runtime::{ConsoleRuntime, Surface};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const ARROW_UP: &str = "\x1b[A";
const ARROW_DOWN: &str = "\x1b[B";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Submit(String),
    SubmitPending,
    NavigateUp,
    NavigateDown,
    Autocomplete(String),
}

pub fn parse_input_line(line: &str) -> InputEvent {
    let line = line.trim_end_matches(['\n', '\r']);
    match line {
        ARROW_UP => InputEvent::NavigateUp,
        ARROW_DOWN => InputEvent::NavigateDown,
        "" => InputEvent::SubmitPending,
        _ => match line.strip_suffix('\t') {
            Some(partial) => InputEvent::Autocomplete(partial.to_string()),
            None => InputEvent::Submit(line.to_string()),
        },
    }
}

/// Renders by clearing the terminal and writing the whole screen.
pub struct TerminalSurface {
    writer: Mutex<Box<dyn Write + Send>>,
    reader: Mutex<Box<dyn BufRead + Send>>,
}

impl TerminalSurface {
    pub fn new(writer: Box<dyn Write + Send>, reader: Box<dyn BufRead + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        }
    }

    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(BufReader::new(io::stdin())))
    }

    /// Next input line without its terminator, or `None` at end of input.
    pub fn read_line(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let read = lock_unpoisoned(&self.reader).read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Echoes the recalled or completed input so the operator can see it.
    pub fn show_input(&self, input: &str) {
        self.write_all(&format!("> {input}\n"));
    }

    fn write_all(&self, text: &str) {
        let mut writer = lock_unpoisoned(&self.writer);
        if let Err(error) = writer.write_all(text.as_bytes()).and_then(|()| writer.flush()) {
            debug!(%error, "terminal write failed");
        }
    }
}

impl Surface for TerminalSurface {
    fn render(&self, screen: &str) {
        self.write_all(&format!("{CLEAR_SCREEN}{screen}\n"));
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.write_all(&format!("\n{prompt} [y/N] "));
        match self.read_line() {
            Ok(Some(answer)) => {
                let answer = answer.trim();
                answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
            }
            Ok(None) => true,
            Err(error) => {
                debug!(%error, "failed to read confirmation");
                false
            }
        }
    }
}

/// Feeds input lines to `runtime` until EXIT is confirmed or input ends.
pub fn run_line_loop(runtime: &Arc<ConsoleRuntime>, surface: &TerminalSurface) -> io::Result<()> {
    runtime.render_current();

    while !runtime.should_exit() {
        let Some(line) = surface.read_line()? else {
            debug!("input closed");
            break;
        };

        match parse_input_line(&line) {
            InputEvent::Submit(line) => runtime.submit(&line),
            InputEvent::SubmitPending => runtime.submit_pending(),
            InputEvent::NavigateUp => surface.show_input(&runtime.navigate_up()),
            InputEvent::NavigateDown => surface.show_input(&runtime.navigate_down()),
            InputEvent::Autocomplete(partial) => {
                let completed = runtime.autocomplete(&partial).unwrap_or(partial);
                surface.show_input(&completed);
            }
        }
    }

    Ok(())
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
