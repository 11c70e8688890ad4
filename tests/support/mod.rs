#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chat_backend::ChatBackend;
use chat_backend_mock::MockBackend;
use containment_console::app::{Console, ConsoleProfile};
use containment_console::pipeline::{ModelConfig, QueryPipeline};
use containment_console::runtime::{ConsoleRuntime, Surface};

pub const PRIMARY: &str = "primary";
pub const SYSTEM_PROMPT: &str = "You are SCP-079.";

#[derive(Default)]
pub struct RecordingSurface {
    renders: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    confirm_answer: bool,
}

impl RecordingSurface {
    pub fn confirming(answer: bool) -> Self {
        Self {
            confirm_answer: answer,
            ..Self::default()
        }
    }

    pub fn renders(&self) -> Vec<String> {
        lock_unpoisoned(&self.renders).clone()
    }

    pub fn last_render(&self) -> Option<String> {
        lock_unpoisoned(&self.renders).last().cloned()
    }

    pub fn render_count(&self) -> usize {
        lock_unpoisoned(&self.renders).len()
    }

    pub fn prompts(&self) -> Vec<String> {
        lock_unpoisoned(&self.prompts).clone()
    }
}

impl Surface for RecordingSurface {
    fn render(&self, screen: &str) {
        lock_unpoisoned(&self.renders).push(screen.to_string());
    }

    fn confirm(&self, prompt: &str) -> bool {
        lock_unpoisoned(&self.prompts).push(prompt.to_string());
        self.confirm_answer
    }
}

pub fn profile(fallbacks: &[&str]) -> ConsoleProfile {
    ConsoleProfile {
        backend_id: "mock".to_string(),
        primary_model: PRIMARY.to_string(),
        fallback_models: fallbacks.iter().map(|model| model.to_string()).collect(),
        log_path: "scp-079.log".to_string(),
        installed_models: None,
    }
}

pub fn model_config(fallbacks: &[&str]) -> ModelConfig {
    ModelConfig::new(
        PRIMARY,
        fallbacks.iter().map(|model| model.to_string()).collect(),
        SYSTEM_PROMPT,
    )
}

pub struct Harness {
    pub runtime: Arc<ConsoleRuntime>,
    pub surface: Arc<RecordingSurface>,
    pub backend: Arc<MockBackend>,
}

impl Harness {
    pub fn new(backend: MockBackend, lockout_delay: Duration) -> Self {
        Self::with_surface(backend, lockout_delay, RecordingSurface::default())
    }

    pub fn with_surface(
        backend: MockBackend,
        lockout_delay: Duration,
        surface: RecordingSurface,
    ) -> Self {
        let backend = Arc::new(backend);
        let surface = Arc::new(surface);
        let console = Arc::new(Mutex::new(Console::new(profile(&[]), lockout_delay)));
        let pipeline = QueryPipeline::new(
            model_config(&[]),
            Arc::clone(&backend) as Arc<dyn ChatBackend>,
        );
        let runtime = ConsoleRuntime::new(
            console,
            pipeline,
            Arc::clone(&surface) as Arc<dyn Surface>,
        );

        Self {
            runtime,
            surface,
            backend,
        }
    }

    pub fn console(&self) -> MutexGuard<'_, Console> {
        lock_unpoisoned(self.runtime.console())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.runtime.shutdown();
    }
}

pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }

    predicate()
}

pub fn refusal_text() -> String {
    let row = "X".repeat(40);
    vec![row; 4].join("\n")
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
