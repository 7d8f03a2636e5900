//! `teddy` – runs one robot-therapist performance from the terminal.
//!
//! 1. Loads `~/.teddy/config.toml`, running a **First-Run Wizard** when the
//!    file is absent.
//! 2. Wakes the robot and waits for the operator to confirm the start.
//! 3. Runs the escalating conversation until the turn budget is spent, input
//!    ends, or **Ctrl-C** is pressed.
//! 4. Waits for the operator once more, then always rests the robot and
//!    pauses briefly before exiting.

mod config;
mod console;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use teddy_hal::GestureLibrary;
use teddy_runtime::{ConversationSession, HttpOracle, SessionSummary, init_tracing};
use teddy_types::TeddyError;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::console::{ConsoleRobot, LineTranscripts, confirm};

/// Pause between resting the robot and exiting.
const SHUTDOWN_PAUSE: Duration = Duration::from_secs(2);

fn main() -> ExitCode {
    // Diagnostics go through tracing; the banner, gates and robot speech use
    // println! for UX.
    let _guard = init_tracing("teddy");

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping after the current step, then resting …"
                .yellow()
                .bold()
        );
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_wizard(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    print_settings(&cfg);

    // ── Performance ───────────────────────────────────────────────────────
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };
    let outcome = runtime.block_on(perform(&cfg, shutdown));
    // A stdin read abandoned on Ctrl-C still occupies a blocking thread.
    runtime.shutdown_background();

    // ── Shutdown ──────────────────────────────────────────────────────────
    let code = match outcome {
        Ok(summary) => {
            info!(
                turns = summary.turns_completed,
                skipped = summary.turns_skipped,
                empty_inputs = summary.empty_inputs,
                directive_diagnostics = summary.directive_diagnostics,
                intensities = ?summary.intensities,
                "performance finished"
            );
            println!(
                "\n  {} {} turn(s) completed, {} skipped.",
                "✓".green().bold(),
                summary.turns_completed,
                summary.turns_skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("\n  {} {}", "Performance aborted:".red().bold(), e);
            ExitCode::FAILURE
        }
    };

    println!("{}", "  Shutting down …".dimmed());
    std::thread::sleep(SHUTDOWN_PAUSE);
    code
}

async fn perform(cfg: &Config, shutdown: Arc<AtomicBool>) -> Result<SessionSummary, TeddyError> {
    let oracle = HttpOracle::new(cfg.oracle_url.clone(), cfg.request_timeout())
        .map_err(|e| TeddyError::Oracle(e.to_string()))?;
    let mut session = ConversationSession::new(
        cfg.session_config(),
        oracle,
        GestureLibrary::nao_defaults(),
        shutdown.clone(),
    )?;
    if let Some(log) = session.chat_log() {
        println!(
            "  Chat log: {}",
            log.path().display().to_string().bold()
        );
    }

    let mut robot = ConsoleRobot::stdout().with_pacing(true);
    let mut ears = LineTranscripts::stdin().with_shutdown(shutdown);
    session
        .perform(&mut ears, &mut robot, |stage| {
            confirm(stage, &mut std::io::stdin().lock(), &mut std::io::stdout())
        })
        .await
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        Teddy First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up Teddy.\n");

    let mut cfg = Config::default();

    cfg.oracle_url = prompt_line(
        &format!("  Text-generation endpoint [{}]: ", cfg.oracle_url),
        &cfg.oracle_url,
    );

    let turns = prompt_line(
        &format!("  Turns per performance [{}]: ", cfg.max_turns),
        &cfg.max_turns.to_string(),
    );
    if let Ok(n) = turns.trim().parse::<usize>() {
        cfg.max_turns = n;
    }

    println!("  Which directive style should the model use?");
    println!("    1) [GESTURE: name] / [VOICE: pitch, shift, speed]  (default)");
    println!("    2) @@name@@");
    match prompt_line("  Enter choice [1]: ", "1").trim() {
        "2" => cfg.grammar = teddy_runtime::GrammarKind::Delimited,
        _ => cfg.grammar = teddy_runtime::GrammarKind::Bracketed,
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }

    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"  ______       __    __     "#.bold().cyan());
    println!("{}", r#" /_  __/__ ___/ /___/ /_ __ "#.bold().cyan());
    println!("{}", r#"  / / / -_) _  // _  / // / "#.bold().cyan());
    println!("{}", r#" /_/  \__/\_,_/ \_,_/\_, /  "#.bold().cyan());
    println!("{}", r#"                    /___/   "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Teddy".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  The robot therapist who slowly loses it");
    println!();
}

fn print_settings(cfg: &Config) {
    println!("  Oracle    : {}", cfg.oracle_url.dimmed());
    if !cfg.robot_ip.is_empty() {
        println!("  Robot     : {}", cfg.robot_ip.dimmed());
    }
    println!(
        "  Turns     : {}   Grammar: {}",
        cfg.max_turns.to_string().bold(),
        cfg.grammar.to_string().bold()
    );
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
