mod support;

use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_backend::ChatBackend;
use chat_backend_mock::MockBackend;
use containment_console::app::Console;
use containment_console::pipeline::QueryPipeline;
use containment_console::runtime::{ConsoleRuntime, Surface};
use containment_console::screens::START_SCREEN;
use containment_console::terminal::{run_line_loop, TerminalSurface};
use support::{lock_unpoisoned, model_config, profile, PRIMARY};

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&lock_unpoisoned(&self.0)).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_unpoisoned(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Scripted {
    runtime: Arc<ConsoleRuntime>,
    surface: Arc<TerminalSurface>,
    output: SharedBuffer,
}

impl Scripted {
    fn new(backend: MockBackend, input: &str) -> Self {
        let output = SharedBuffer::default();
        let surface = Arc::new(TerminalSurface::new(
            Box::new(output.clone()),
            Box::new(Cursor::new(input.as_bytes().to_vec())),
        ));
        let console = Arc::new(Mutex::new(Console::new(
            profile(&[]),
            Duration::from_secs(30),
        )));
        let pipeline = QueryPipeline::new(
            model_config(&[]),
            Arc::new(backend) as Arc<dyn ChatBackend>,
        );
        let runtime = ConsoleRuntime::new(
            console,
            pipeline,
            Arc::clone(&surface) as Arc<dyn Surface>,
        );

        Self {
            runtime,
            surface,
            output,
        }
    }

    fn run(&self) {
        run_line_loop(&self.runtime, &self.surface).expect("loop ends cleanly");
    }
}

impl Drop for Scripted {
    fn drop(&mut self) {
        self.runtime.shutdown();
    }
}

#[test]
fn scripted_session_recalls_and_exits_on_confirmation() {
    let scripted = Scripted::new(MockBackend::default(), "help\n\x1b[A\n\nexit\ny\nSTATUS\n");
    scripted.run();

    let output = scripted.output.contents();
    assert!(output.contains("INITIALIZING CONTAINMENT INTERFACE"));
    assert!(output.contains("AVAILABLE COMMANDS:"));
    assert!(output.contains("> help\n"));
    assert!(output.contains("TERMINATE CONTAINMENT INTERFACE? [y/N] "));
    assert!(!output.contains("SYSTEM STATUS:"));
    assert!(scripted.runtime.should_exit());

    let console = lock_unpoisoned(scripted.runtime.console());
    let entries: Vec<&str> = console.history().entries().iter().map(String::as_str).collect();
    assert_eq!(entries, vec!["help", "help", "exit"]);
}

#[test]
fn tab_completion_then_blank_line_submits_the_command() {
    let scripted = Scripted::new(MockBackend::default(), "sta\t\n\n");
    scripted.run();

    let output = scripted.output.contents();
    assert!(output.contains("> START\n"));
    assert!(output.contains(START_SCREEN));
    assert!(!scripted.runtime.should_exit());
}

#[test]
fn end_of_input_stops_the_loop_without_exit() {
    let scripted = Scripted::new(MockBackend::new().with_reply(PRIMARY, "hi there"), "hello\n");
    scripted.run();

    assert!(scripted.runtime.wait_for_idle(Duration::from_secs(5)));
    assert!(!lock_unpoisoned(scripted.runtime.console()).should_exit);
    assert!(scripted.output.contents().contains("SCP-079: hi there"));
}
