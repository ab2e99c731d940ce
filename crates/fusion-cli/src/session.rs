use std::io::{BufRead, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::{Context, Result};
use fusion_contracts::session::{parse_command, SessionCommand, SESSION_HELP_COMMANDS};
use fusion_contracts::themes::{JsonFileStorage, Rgb, ThemeChoice, ThemeContext, THEMES};
use fusion_contracts::{FusionError, GenerationResult, ImageFile, SlotLabel, WorkflowState};
use fusion_engine::FusionEngine;

/// Everything the session loop reacts to, from stdin or from the worker.
pub(crate) enum SessionInput {
    Line(String),
    Closed,
    Finished {
        ticket_id: u64,
        outcome: GenerationResult,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Plain,
    Title,
    Accent,
    Busy,
    Alert,
}

pub(crate) fn run<R, W>(
    engine: FusionEngine,
    theme: ThemeContext<JsonFileStorage>,
    input: R,
    out: &mut W,
    color: bool,
) -> Result<()>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let (sender, receiver) = mpsc::channel();
    spawn_reader(input, sender.clone())?;

    let mut session = Session::new(engine, theme, out, color, sender);
    session.greet()?;
    loop {
        let Ok(message) = receiver.recv() else {
            break;
        };
        if session.handle(message)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

fn spawn_reader<R>(mut input: R, sender: Sender<SessionInput>) -> Result<()>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("fusion-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            loop {
                line.clear();
                match input.read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        let text = line.trim_end_matches(['\n', '\r']).to_string();
                        if sender.send(SessionInput::Line(text)).is_err() {
                            return;
                        }
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => {
                        tracing::warn!(error = %err, "session input failed");
                        break;
                    }
                }
            }
            let _ = sender.send(SessionInput::Closed);
        })
        .context("failed to start session input reader")?;
    Ok(())
}

pub(crate) struct Session<'a, W: Write> {
    engine: FusionEngine,
    theme: ThemeContext<JsonFileStorage>,
    out: &'a mut W,
    color: bool,
    sender: Sender<SessionInput>,
    closing: bool,
}

impl<'a, W: Write> Session<'a, W> {
    pub(crate) fn new(
        engine: FusionEngine,
        theme: ThemeContext<JsonFileStorage>,
        out: &'a mut W,
        color: bool,
        sender: Sender<SessionInput>,
    ) -> Self {
        Self {
            engine,
            theme,
            out,
            color,
            sender,
            closing: false,
        }
    }

    fn greet(&mut self) -> Result<()> {
        self.say(Tone::Title, "Couple Fusion session. Type /help for commands.")?;
        self.prompt()
    }

    pub(crate) fn handle(&mut self, message: SessionInput) -> Result<Flow> {
        let flow = match message {
            SessionInput::Line(text) => self.handle_line(&text)?,
            SessionInput::Closed => {
                if self.engine.state().is_loading() {
                    // Input ended mid-generation; stay for the outcome.
                    self.closing = true;
                    Flow::Continue
                } else {
                    Flow::Quit
                }
            }
            SessionInput::Finished { ticket_id, outcome } => {
                self.finish(ticket_id, outcome)?;
                // A discarded stale outcome leaves the live run loading.
                if self.closing && !self.engine.state().is_loading() {
                    Flow::Quit
                } else {
                    Flow::Continue
                }
            }
        };
        if flow == Flow::Continue && !self.closing {
            self.prompt()?;
        }
        Ok(flow)
    }

    fn handle_line(&mut self, text: &str) -> Result<Flow> {
        let command = parse_command(text);
        match command.action.as_str() {
            "noop" => {}
            "select" => self.place(&command, false)?,
            "drop" => self.place(&command, true)?,
            "clear" => match command.arg("slot").and_then(SlotLabel::parse) {
                Some(label) => {
                    self.engine.clear(label);
                    self.say_slot(label)?;
                }
                None => self.say(Tone::Alert, "/clear requires a slot (1 or 2)")?,
            },
            "generate" => self.generate()?,
            "status" => self.status()?,
            "abandon" => {
                if self.engine.abandon() {
                    self.say(Tone::Plain, "Stopped waiting for the current fusion.")?;
                } else {
                    self.say(Tone::Plain, "Nothing is being generated.")?;
                }
            }
            "download" => {
                let dir = command.arg("dir").map(PathBuf::from);
                match self.engine.download(dir.as_deref()) {
                    Ok(path) => self.say(Tone::Accent, &format!("Saved {}", path.display()))?,
                    Err(err) => self.say(Tone::Alert, &err.user_message())?,
                }
            }
            "set_theme" => self.set_theme(command.arg("theme"))?,
            "list_themes" => self.list_themes()?,
            "help" => {
                let line = format!("Commands: {}", SESSION_HELP_COMMANDS.join(" "));
                self.say(Tone::Plain, &line)?;
            }
            "quit" => return Ok(Flow::Quit),
            _ => {
                let line = match command.arg("command") {
                    Some(name) => format!("Unknown command: /{name}. Type /help for commands."),
                    None => "Commands start with '/'. Type /help for commands.".to_string(),
                };
                self.say(Tone::Alert, &line)?;
            }
        }
        Ok(Flow::Continue)
    }

    /// `/person1`, `/select` and `/drop`. A missing path behaves like a
    /// dismissed chooser or an empty drop.
    fn place(&mut self, command: &SessionCommand, dropped: bool) -> Result<()> {
        let Some(label) = command.arg("slot").and_then(SlotLabel::parse) else {
            let verb = if dropped { "/drop" } else { "/select" };
            return self.say(Tone::Alert, &format!("{verb} requires a slot (1 or 2)"));
        };
        let file = match command.arg("path") {
            Some(raw) => {
                let path = PathBuf::from(raw);
                if !path.is_file() {
                    return self.say(
                        Tone::Alert,
                        &format!("File not found ({})", path.display()),
                    );
                }
                Some(ImageFile::from_path(path))
            }
            None => None,
        };
        if dropped {
            self.engine.drop_file(label, file);
        } else {
            self.engine.select(label, file);
        }
        self.say_slot(label)
    }

    fn generate(&mut self) -> Result<()> {
        let ticket = match self.engine.begin_generation() {
            Ok(ticket) => ticket,
            Err(FusionError::AlreadyLoading) => {
                return self.say(Tone::Busy, "A fusion is already being generated.");
            }
            Err(err) => return self.say(Tone::Alert, &err.user_message()),
        };

        let ticket_id = ticket.id();
        let client = self.engine.client();
        let sender = self.sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("fusion-generate-{ticket_id}"))
            .spawn(move || {
                let outcome = ticket.execute(client.as_ref());
                let _ = sender.send(SessionInput::Finished { ticket_id, outcome });
            });
        if let Err(err) = spawned {
            self.engine.abandon();
            return Err(err).context("failed to start generation worker");
        }
        tracing::info!(ticket_id, "generation dispatched");
        self.say(
            Tone::Busy,
            "Generating your fusion... (/status to check, /abandon to stop waiting)",
        )
    }

    fn finish(&mut self, ticket_id: u64, outcome: GenerationResult) -> Result<()> {
        if !self.engine.finish_generation(ticket_id, outcome) {
            return Ok(());
        }
        match self.engine.state().clone() {
            WorkflowState::Success(_) => self.say(
                Tone::Accent,
                "Your fusion is ready. Use /download to save couple-fusion.png.",
            ),
            WorkflowState::Failed(message) => self.say(Tone::Alert, &message),
            _ => Ok(()),
        }
    }

    fn status(&mut self) -> Result<()> {
        for label in SlotLabel::ALL {
            self.say_slot(label)?;
        }
        let state = self.engine.state().clone();
        let mut line = format!("Status: {}", state.name());
        if let Some(error) = state.error() {
            line.push_str(&format!(" ({error})"));
        }
        if !state.is_loading() {
            let gate = if self.engine.can_generate() {
                "ready to generate"
            } else {
                "waiting for both images"
            };
            line.push_str(&format!("; {gate}"));
        }
        let tone = match state {
            WorkflowState::Loading => Tone::Busy,
            WorkflowState::Success(_) => Tone::Accent,
            WorkflowState::Failed(_) => Tone::Alert,
            WorkflowState::Idle => Tone::Plain,
        };
        self.say(tone, &line)
    }

    fn set_theme(&mut self, name: Option<&str>) -> Result<()> {
        let Some(name) = name else {
            let line = format!("Theme: {}", self.theme.choice());
            return self.say(Tone::Title, &line);
        };
        match ThemeChoice::from_name(name) {
            Some(choice) => {
                self.theme.set_theme(choice);
                self.say(Tone::Title, &format!("Theme set to {choice}"))
            }
            None => {
                let line = format!("Unknown theme '{name}'. Available: {}", theme_names());
                self.say(Tone::Alert, &line)
            }
        }
    }

    fn list_themes(&mut self) -> Result<()> {
        let current = self.theme.choice();
        for theme in self.theme.themes() {
            let marker = if theme.choice == current { "*" } else { " " };
            let name = self.tint(theme.colors.gradient_from, theme.name());
            writeln!(self.out, "{marker} {name}")?;
        }
        Ok(())
    }

    fn say_slot(&mut self, label: SlotLabel) -> Result<()> {
        let surface = self.engine.surface(label);
        let line = match surface.file() {
            Some(file) => format!(
                "{label}: {} [{}] ({})",
                file.name(),
                file.mime_type(),
                surface.status_hint()
            ),
            None => format!("{label}: empty ({})", surface.status_hint()),
        };
        self.say(Tone::Plain, &line)
    }

    fn say(&mut self, tone: Tone, text: &str) -> Result<()> {
        let colors = self.theme.theme().colors;
        let painted = match tone {
            Tone::Plain => text.to_string(),
            Tone::Title => self.tint(colors.gradient_from, text),
            Tone::Accent => self.tint(colors.button, text),
            Tone::Busy => self.tint(colors.spinner, text),
            Tone::Alert => self.tint(colors.border_hover, text),
        };
        writeln!(self.out, "{painted}")?;
        Ok(())
    }

    fn tint(&self, color: Rgb, text: &str) -> String {
        if self.color {
            color.paint(text)
        } else {
            text.to_string()
        }
    }

    fn prompt(&mut self) -> Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()?;
        Ok(())
    }
}

pub(crate) fn theme_names() -> String {
    THEMES
        .iter()
        .map(|theme| theme.name())
        .collect::<Vec<_>>()
        .join(", ")
}
