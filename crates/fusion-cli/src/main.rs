mod logging;
mod session;

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use fusion_contracts::themes::{JsonFileStorage, ThemeChoice, ThemeContext};
use fusion_contracts::{ImageFile, SlotLabel, WorkflowState};
use fusion_engine::{FusionEngine, GeminiClient};

const DEFAULT_OUT_DIR: &str = "fusion-out";
const SETTINGS_FILE_NAME: &str = "settings.json";
const EVENTS_FILE_NAME: &str = "events.jsonl";

#[derive(Debug, Parser)]
#[command(
    name = "fusion-rs",
    version,
    about = "Blend two portraits into one couple photo"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate once from two image files and save the result.
    Generate(GenerateArgs),
    /// Interactive session with slash commands.
    Session(SessionArgs),
    /// Show or change the persisted theme.
    Theme(ThemeArgs),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    person1: PathBuf,
    #[arg(long)]
    person2: PathBuf,
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Parser)]
struct ThemeArgs {
    name: Option<String>,
    #[arg(long, default_value = DEFAULT_OUT_DIR)]
    out: PathBuf,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("fusion-rs error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Session(args) => {
            run_session(args)?;
            Ok(0)
        }
        Command::Theme(args) => run_theme(args),
    }
}

fn open_engine(out: &Path, events: Option<&Path>) -> Result<FusionEngine> {
    let events_path = events
        .map(Path::to_path_buf)
        .unwrap_or_else(|| out.join(EVENTS_FILE_NAME));
    let client = GeminiClient::from_env();
    tracing::info!(
        model = %client.config().model,
        credential = client.config().api_key.is_some(),
        "generation client configured"
    );
    FusionEngine::new(out, events_path, Arc::new(client))
}

fn open_theme(out: &Path) -> ThemeContext<JsonFileStorage> {
    ThemeContext::load(JsonFileStorage::new(out.join(SETTINGS_FILE_NAME)))
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let mut engine = open_engine(&args.out, args.events.as_deref())?;
    generate_once(&mut engine, &args.person1, &args.person2)
}

fn generate_once(engine: &mut FusionEngine, person1: &Path, person2: &Path) -> Result<i32> {
    for (label, path) in [(SlotLabel::Person1, person1), (SlotLabel::Person2, person2)] {
        if !path.is_file() {
            bail!("{label} image not found ({})", path.display());
        }
        engine.select(label, Some(ImageFile::from_path(path)));
    }

    match engine.generate().clone() {
        WorkflowState::Success(_) => {
            let path = engine.download(None)?;
            println!("Saved {}", path.display());
            Ok(0)
        }
        WorkflowState::Failed(message) => {
            eprintln!("{message}");
            Ok(1)
        }
        other => bail!("generation ended while {}", other.name()),
    }
}

fn run_session(args: SessionArgs) -> Result<()> {
    let engine = open_engine(&args.out, args.events.as_deref())?;
    let theme = open_theme(&args.out);
    let mut stdout = io::stdout();
    session::run(
        engine,
        theme,
        BufReader::new(io::stdin()),
        &mut stdout,
        !args.no_color,
    )
}

fn run_theme(args: ThemeArgs) -> Result<i32> {
    let mut theme = open_theme(&args.out);
    let Some(name) = args.name.as_deref() else {
        for entry in theme.themes() {
            let marker = if entry.choice == theme.choice() { "*" } else { " " };
            println!("{marker} {}", entry.colors.gradient_from.paint(entry.name()));
        }
        return Ok(0);
    };
    let Some(choice) = ThemeChoice::from_name(name) else {
        bail!(
            "unknown theme '{name}' (expected one of: {})",
            session::theme_names()
        );
    };
    theme.set_theme(choice);
    println!("Theme set to {choice}");
    Ok(0)
}
