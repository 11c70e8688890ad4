use std::io;
use std::sync::{Arc, Mutex};

use containment_console::app::{Console, ConsoleProfile};
use containment_console::backends::{backend_for_config, check_model_availability};
use containment_console::config::{resolve_system_prompt, ConsoleConfig};
use containment_console::logging::init_file_logging;
use containment_console::pipeline::{ModelConfig, QueryPipeline};
use containment_console::runtime::{ConsoleRuntime, Surface};
use containment_console::terminal::{run_line_loop, TerminalSurface};
use tracing::info;

fn main() -> io::Result<()> {
    let config = ConsoleConfig::from_env().map_err(io::Error::other)?;
    init_file_logging(&config.log_path)?;

    info!("{}", "=".repeat(60));
    info!("SCP-079 containment interface v2.3 started");
    info!("{}", "=".repeat(60));

    let system_prompt = resolve_system_prompt(&config.prompt_path);
    let backend = backend_for_config(&config).map_err(io::Error::other)?;
    let availability = check_model_availability(backend.as_ref(), &config.primary_model);

    let profile = ConsoleProfile {
        backend_id: backend.backend_id().to_string(),
        primary_model: config.primary_model.clone(),
        fallback_models: config.fallback_models.clone(),
        log_path: config.log_path.display().to_string(),
        installed_models: availability.installed().map(<[String]>::to_vec),
    };
    let pipeline = QueryPipeline::new(
        ModelConfig::new(
            config.primary_model.clone(),
            config.fallback_models.clone(),
            system_prompt,
        ),
        backend,
    );

    let console = Arc::new(Mutex::new(Console::new(profile, config.lockout_delay)));
    let surface = Arc::new(TerminalSurface::stdio());
    let runtime = ConsoleRuntime::new(
        console,
        pipeline,
        Arc::clone(&surface) as Arc<dyn Surface>,
    );

    let outcome = run_line_loop(&runtime, &surface);
    runtime.shutdown();
    info!("containment interface terminated");
    outcome
}
