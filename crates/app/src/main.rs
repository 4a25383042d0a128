use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use pinball_mc_core::{util, McConfig, McError, MediaController, SlideOverrides};
use tracing_subscriber::EnvFilter;

fn main() -> pinball_mc_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => run_validate(&config),
        Commands::Run { config, bcp, steps } => run_steps(&config, bcp, &steps),
        Commands::LoadSounds { config, timeout } => run_load_sounds(&config, &timeout),
    }
}

fn run_validate(path: &PathBuf) -> pinball_mc_core::Result<()> {
    let config = McConfig::load(path)?;
    let mc = MediaController::from_config(&config)?;
    tracing::info!(?path, "config is valid");

    // Every mode counts as running so mode entries are compiled too.
    let machine = mc.machine();
    for event in machine.events() {
        for trigger in machine.triggers_for(event, mc.modes().iter()) {
            println!("{event}: {}", trigger.encode()?);
        }
    }
    for event in machine.registered_trigger_events() {
        println!("registered trigger: {event}");
    }
    Ok(())
}

enum Step {
    Event(String, SlideOverrides),
    Wait(Duration),
    Start(String),
    Stop(String),
}

impl Step {
    fn parse(text: &str) -> pinball_mc_core::Result<Self> {
        // `event:{priority: 200}` posts the event with those settings.
        if let Some((event, settings)) = text.split_once(':') {
            let value: serde_yaml::Value = serde_yaml::from_str(settings)?;
            let overrides = SlideOverrides::from_value(&format!("run:{event}"), &value)?;
            return Ok(Step::Event(event.to_string(), overrides));
        }

        Ok(match text.split_once('=') {
            Some(("wait", duration)) => Step::Wait(util::parse_duration_str("run", duration)?),
            Some(("start", mode)) => Step::Start(mode.to_string()),
            Some(("stop", mode)) => Step::Stop(mode.to_string()),
            Some((other, _)) => return Err(McError::msg(format!("unknown step `{other}`"))),
            None => Step::Event(text.to_string(), SlideOverrides::default()),
        })
    }
}

fn run_steps(path: &PathBuf, bcp: bool, steps: &[String]) -> pinball_mc_core::Result<()> {
    let config = McConfig::load(path)?;
    let mut mc = MediaController::from_config(&config)?;
    tracing::info!(?path, steps = steps.len(), bcp, "running steps");

    for text in steps {
        match Step::parse(text)? {
            Step::Event(event, overrides) if bcp => {
                mc.post_event_over_bcp_with(&event, &overrides)?;
            }
            Step::Event(event, overrides) => mc.post_event_with(&event, &overrides)?,
            Step::Wait(duration) => {
                mc.advance_time(duration);
            }
            Step::Start(mode) => {
                mc.start_mode(&mode)?;
            }
            Step::Stop(mode) => {
                mc.stop_mode(&mode)?;
            }
        }

        let active: Vec<String> = mc
            .targets()
            .iter()
            .map(|target| match target.current_slide() {
                Some(slide) => format!("{}={}@{}", target.name(), slide.name, slide.priority),
                None => format!("{}=-", target.name()),
            })
            .collect();
        println!("{:>8.3}s {text}: {}", mc.now().as_secs_f64(), active.join(" "));
    }
    Ok(())
}

fn run_load_sounds(path: &PathBuf, timeout: &str) -> pinball_mc_core::Result<()> {
    let config = McConfig::load(path)?;
    let timeout = util::parse_duration_str("load-sounds", timeout)?;
    let mut mc = MediaController::from_config(&config)?;
    let sounds = mc
        .sounds_mut()
        .ok_or_else(|| McError::msg("the sound system is disabled in this config"))?;

    sounds.load_all()?;
    let report = sounds.wait_for_all(timeout)?;
    for sound in sounds.iter() {
        println!("{sound}");
    }
    for err in &report.failed {
        tracing::error!(error = %err, "sound failed to load");
    }
    tracing::info!(loaded = report.loaded.len(), failed = report.failed.len(), "sounds loaded");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Pinball media controller", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate a machine config, then print the compiled triggers.
    Validate {
        /// Path to the machine config YAML.
        config: PathBuf,
    },
    /// Replay a sequence of steps and print the active slide per display.
    Run {
        /// Path to the machine config YAML.
        config: PathBuf,
        /// Route events through BCP trigger payloads.
        #[arg(long)]
        bcp: bool,
        /// Event names (optionally `event:{<settings>}`), `wait=<duration>`,
        /// `start=<mode>` or `stop=<mode>`.
        steps: Vec<String>,
    },
    /// Load every configured sound on the loader thread.
    LoadSounds {
        /// Path to the machine config YAML.
        config: PathBuf,
        /// How long to wait for loads to finish.
        #[arg(short, long, default_value = "10s")]
        timeout: String,
    },
}
