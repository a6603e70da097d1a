use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use controller::{Catalog, ControlConfig, Editor, SessionContext};
use device_io::{AdbDevice, DeviceControl};
use runner::{FailurePolicy, PlanRunner, RunStatus};
use session::SqliteStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use timeline::{estimate_plan_duration, format_clock, Plan};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "autocut")]
#[command(about = "Drives the InShot timeline on an attached Android device")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// adb serial of the target device (defaults to the only attached one)
    #[arg(long, global = true)]
    serial: Option<String>,

    /// Session database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Session id inside the database
    #[arg(long, global = true, default_value = "default")]
    session: String,

    /// JSON file overriding timings, seek and locator tuning
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding transitions.json, effects.json, animations.json and music.json
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure the scrubber and reset the timeline to default durations
    Calibrate {
        /// Number of clips loaded in the project
        clips: usize,
    },

    /// Move the playhead to a timeline position
    Seek {
        /// Target time in seconds
        time: f64,

        /// Accepted distance from the target, in seconds
        #[arg(long, default_value_t = 0.25)]
        tolerance: f64,
    },

    /// Execute a planner response step by step
    Run {
        /// Plan file ({"plan": [...]})
        plan: PathBuf,

        /// Keep going after a failed step
        #[arg(long)]
        keep_going: bool,
    },

    /// Predict the final video length of a plan without a device
    Estimate {
        /// Plan file ({"plan": [...]})
        plan: PathBuf,

        /// Number of clips the plan is applied to
        #[arg(long)]
        clips: usize,
    },

    /// Write the current UI hierarchy as JSON
    Dump {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the stored timeline model and calibration
    Status,

    /// Forget the stored timeline model and calibration
    Reset,
}

/// Options every subcommand that touches the session shares.
struct Env {
    serial: Option<String>,
    db: PathBuf,
    session: String,
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
}

impl Env {
    fn open_session(&self) -> Result<SessionContext> {
        let store = SqliteStore::open_or_create(&self.db, &self.session)
            .with_context(|| format!("opening session store {:?}", self.db))?;
        Ok(SessionContext::open(Box::new(store))?)
    }

    fn load_config(&self) -> Result<ControlConfig> {
        match &self.config {
            Some(path) => Ok(ControlConfig::from_file(path)?),
            None => Ok(ControlConfig::default()),
        }
    }

    fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog {
            Some(dir) => Ok(Catalog::load_dir(dir)?),
            None => Ok(Catalog::builtin()),
        }
    }

    fn editor(&self) -> Result<Editor<AdbDevice>> {
        let device = AdbDevice::new(self.serial.clone())?;
        Ok(Editor::new(
            device,
            self.open_session()?,
            Arc::new(self.load_catalog()?),
            self.load_config()?,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let env = Env {
        serial: cli.serial,
        db: cli.db.unwrap_or_else(session::default_db_path),
        session: cli.session,
        config: cli.config,
        catalog: cli.catalog,
    };

    match cli.command {
        Commands::Calibrate { clips } => calibrate_command(&env, clips).await,
        Commands::Seek { time, tolerance } => seek_command(&env, time, tolerance).await,
        Commands::Run { plan, keep_going } => run_command(&env, &plan, keep_going).await,
        Commands::Estimate { plan, clips } => estimate_command(&plan, clips),
        Commands::Dump { output } => dump_command(&env, output).await,
        Commands::Status => status_command(&env),
        Commands::Reset => reset_command(&env),
    }
}

fn read_plan(path: &Path) -> Result<Plan> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading plan {:?}", path))?;
    Plan::from_json(&raw).with_context(|| format!("parsing plan {:?}", path))
}

async fn calibrate_command(env: &Env, clips: usize) -> Result<()> {
    info!("Calibrating session '{}' for {} clips", env.session, clips);
    let editor = env.editor()?;
    let constants = editor.calibrate(clips).await?;

    let result = serde_json::json!({
        "session": env.session,
        "constants": constants,
        "raw_durations": editor.raw_durations().await,
        "timeline": editor.timeline().await.map(|t| t.durations().to_vec()),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn seek_command(env: &Env, time: f64, tolerance: f64) -> Result<()> {
    let editor = env.editor()?;
    let outcome = editor.seek(time, tolerance).await?;
    if !outcome.converged {
        warn!(
            "Seek stopped at {} after {} iterations",
            format_clock(outcome.time),
            outcome.iterations
        );
    }

    let result = serde_json::json!({
        "target": time,
        "position": outcome.time,
        "clock": format_clock(outcome.time),
        "converged": outcome.converged,
        "iterations": outcome.iterations,
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_command(env: &Env, plan_path: &Path, keep_going: bool) -> Result<()> {
    let plan = read_plan(plan_path)?;
    if let Some(thought) = &plan.thought_process {
        info!("Plan rationale: {}", thought);
    }
    info!("Running {} steps from {:?}", plan.plan.len(), plan_path);

    let editor = Arc::new(env.editor()?);
    let policy = if keep_going {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };
    let handle = PlanRunner::start(editor.clone(), plan.plan, policy);

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling run");
            canceller.cancel();
        }
    });

    // The channel disconnects once the run task drops its sender.
    let rx = handle.rx_events.clone();
    let printer = tokio::task::spawn_blocking(move || {
        for event in rx.iter() {
            match &event.status {
                RunStatus::Pending => {}
                RunStatus::Running => println!("[{}] {} ...", event.step + 1, event.tool),
                RunStatus::Done(summary) => println!("[{}] done: {}", event.step + 1, summary),
                RunStatus::Failed(error) => println!("[{}] failed: {}", event.step + 1, error),
                RunStatus::Canceled => println!("[{}] canceled", event.step + 1),
            }
        }
    });

    let summary = handle.wait().await?;
    printer.await?;

    let result = serde_json::json!({
        "summary": summary,
        "timeline": editor.timeline().await.map(|t| t.durations().to_vec()),
        "expected_length": editor.timeline().await.map(|t| t.total_duration()),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !summary.succeeded() {
        bail!(
            "run {} finished with {} failed step(s){}",
            summary.run_id,
            summary.failures.len(),
            if summary.canceled { " and was canceled" } else { "" }
        );
    }
    Ok(())
}

fn estimate_command(plan_path: &Path, clips: usize) -> Result<()> {
    let plan = read_plan(plan_path)?;
    let length = estimate_plan_duration(&plan.plan, clips)?;

    let result = serde_json::json!({
        "clips": clips,
        "steps": plan.plan.len(),
        "estimated_length": length,
        "clock": format_clock(length),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn dump_command(env: &Env, output: Option<PathBuf>) -> Result<()> {
    let device = AdbDevice::new(env.serial.clone())?;
    let snapshot = device.snapshot().await?;
    info!("Captured {} elements", snapshot.len());

    let dump = serde_json::json!({
        "elements": snapshot,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    if let Some(output_path) = output {
        std::fs::write(&output_path, serde_json::to_string_pretty(&dump)?)?;
        info!("Snapshot written to: {:?}", output_path);
    } else {
        println!("{}", serde_json::to_string_pretty(&dump)?);
    }
    Ok(())
}

fn status_command(env: &Env) -> Result<()> {
    let ctx = env.open_session()?;
    let timeline = ctx.timeline();

    let status = serde_json::json!({
        "session": env.session,
        "database": env.db,
        "calibrated": ctx.constants().is_some(),
        "constants": ctx.constants(),
        "raw_durations": ctx.raw_durations(),
        "timeline": timeline.map(|t| t.durations().to_vec()),
        "expected_length": timeline.map(|t| t.total_duration()),
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn reset_command(env: &Env) -> Result<()> {
    let mut ctx = env.open_session()?;
    ctx.clear()?;
    info!("Session '{}' cleared", env.session);
    Ok(())
}
