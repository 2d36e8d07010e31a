use std::fs;
use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use promptmaster_contracts::chat::{parse_intent, Intent, CHAT_HELP_COMMANDS};
use promptmaster_contracts::dispatch::{Completion, Dispatcher, InputSurface, ModeResult};
use promptmaster_contracts::events::{EventKind, EventPayload};
use promptmaster_contracts::modes::{AspectRatio, OperationMode};
use serde_json::{json, Value};

use crate::app::{readiness_label, ActionInput, App};
use crate::media;
use crate::render::{render_modes, render_result};
use crate::status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive dispatcher view: one selected mode, one current result.
pub struct ChatSession {
    dispatcher: Dispatcher,
    aspect_ratio: AspectRatio,
    image: Option<(PathBuf, String)>,
    out_dir: PathBuf,
}

impl ChatSession {
    pub fn new(mode: OperationMode, out_dir: PathBuf) -> Self {
        Self {
            dispatcher: Dispatcher::new(mode),
            aspect_ratio: AspectRatio::default(),
            image: None,
            out_dir,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn header(&self) -> String {
        let route = self.dispatcher.route();
        format!("[{}] {}: {}", route.mode, route.title, route.subtitle)
    }

    /// Handles one input line. Failures of a single action are reported and
    /// leave the session usable.
    pub fn handle(
        &mut self,
        app: &mut App,
        line: &str,
        confirm: &mut dyn FnMut() -> bool,
        out: &mut dyn Write,
    ) -> Result<Flow> {
        let intent = parse_intent(line);
        match self.dispatch(app, &intent, confirm, out) {
            Ok(flow) => Ok(flow),
            Err(err) => {
                writeln!(out, "Error: {err:#}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch(
        &mut self,
        app: &mut App,
        intent: &Intent,
        confirm: &mut dyn FnMut() -> bool,
        out: &mut dyn Write,
    ) -> Result<Flow> {
        match intent.action.as_str() {
            "noop" => {}
            "quit" => return Ok(Flow::Quit),
            "help" => {
                writeln!(out, "Commands: {}", CHAT_HELP_COMMANDS.join("  "))?;
                writeln!(out, "Anything else is submitted to the selected mode.")?;
            }
            "list_modes" => write!(out, "{}", render_modes())?,
            "select_mode" => {
                let Some(raw) = intent.arg("value") else {
                    bail!("/mode requires a mode id (see /modes)");
                };
                let mode = raw.parse::<OperationMode>().map_err(anyhow::Error::msg)?;
                self.select(app, mode)?;
                writeln!(out, "{}", self.header())?;
            }
            "set_aspect_ratio" => {
                let raw = intent.arg("value").unwrap_or("1:1");
                self.aspect_ratio = raw.parse::<AspectRatio>().map_err(anyhow::Error::msg)?;
                writeln!(out, "Aspect ratio set to {}", self.aspect_ratio)?;
            }
            "set_image" => {
                let Some(path) = intent.arg("path") else {
                    bail!("/image requires a path");
                };
                let path = PathBuf::from(path);
                let data_uri = media::image_data_uri(&path)?;
                writeln!(out, "Image set to {}", path.display())?;
                self.image = Some((path, data_uri));
            }
            "analyze" => {
                self.select(app, OperationMode::ImageToPromptAnalysis)?;
                let input = self.image_input(intent.arg("value"));
                self.submit(app, input, out)?;
            }
            "edit" => {
                self.select(app, OperationMode::ImageEdit)?;
                let input = self.image_input(intent.arg("value"));
                self.submit(app, input, out)?;
            }
            "submit" => {
                let prompt = intent.prompt.clone().unwrap_or_default();
                let input = match self.dispatcher.route().input {
                    InputSurface::FreeText | InputSurface::FreeTextWithAspectRatio => ActionInput {
                        text: Some(prompt),
                        aspect_ratio: self.aspect_ratio,
                        ..ActionInput::default()
                    },
                    InputSurface::ImageOnly | InputSurface::ImageAndInstruction => {
                        self.image_input(Some(&prompt))
                    }
                };
                self.submit(app, input, out)?;
            }
            "show_result" => match self.dispatcher.current() {
                Some(result) => write_result(out, result, &self.dispatcher)?,
                None => writeln!(out, "No result yet.")?,
            },
            "save" => {
                let Some(path) = intent.arg("path") else {
                    bail!("/save requires a path");
                };
                let path = PathBuf::from(path);
                self.save_current(&path)?;
                writeln!(out, "Saved to {}", path.display())?;
            }
            "speak" => {
                let text = match self.dispatcher.current() {
                    Some(ModeResult::Optimized(result))
                        if self.dispatcher.route().output.offers_speech() =>
                    {
                        result.optimized.clone()
                    }
                    _ => bail!("/speak reads the current prompt result aloud; there is none"),
                };
                let path = intent
                    .arg("path")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.out_dir.join(format!("speech-{}.pcm", compact_timestamp())));
                let adapter = app.adapter()?;
                let audio = app.speak(&adapter, &text)?;
                media::save_pcm(&path, &audio)?;
                writeln!(
                    out,
                    "Speech saved to {} ({:.1}s, s16le {} Hz mono)",
                    path.display(),
                    audio.duration_secs(),
                    audio.sample_rate()
                )?;
            }
            "login" | "switch_credential" => {
                let Some(token) = intent.arg("token") else {
                    bail!("/{} requires an API key", intent.action.replace("_credential", ""));
                };
                let endpoint = intent.arg("endpoint");
                let credential = if intent.action == "login" {
                    app.login(token, endpoint)?
                } else {
                    app.switch_credential(token, endpoint)?
                };
                writeln!(
                    out,
                    "Using {} ({}) at {}",
                    credential.masked_token(),
                    credential.flavour().label(),
                    credential.endpoint()
                )?;
            }
            "logout" => {
                writeln!(out, "This removes the stored API key. Type y to confirm.")?;
                if app.logout(|| confirm())? {
                    writeln!(out, "Logged out.")?;
                } else {
                    writeln!(out, "Nothing was cleared.")?;
                }
            }
            "connect_host" => {
                let readiness = app.connect_via_host()?;
                writeln!(out, "Host key: {}", readiness_label(readiness))?;
            }
            "status" => write!(out, "{}", status::render(app)?)?,
            "unknown" => {
                let command = intent
                    .command_args
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                writeln!(out, "Unknown command /{command}. Type /help for commands.")?;
            }
            other => writeln!(out, "Unhandled action {other}.")?,
        }
        Ok(Flow::Continue)
    }

    fn select(&mut self, app: &App, mode: OperationMode) -> Result<()> {
        let had_result = self.dispatcher.current().is_some();
        if self.dispatcher.select(mode) {
            let mut payload = EventPayload::new();
            payload.insert("mode".to_string(), json!(mode));
            payload.insert("cleared_result".to_string(), json!(had_result));
            app.events.emit(EventKind::ModeSelected, payload)?;
        }
        Ok(())
    }

    fn image_input(&self, instruction: Option<&str>) -> ActionInput {
        ActionInput {
            image: self.image.as_ref().map(|(_, data_uri)| data_uri.clone()),
            instruction: instruction
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            ..ActionInput::default()
        }
    }

    fn submit(&mut self, app: &App, input: ActionInput, out: &mut dyn Write) -> Result<()> {
        let adapter = app.adapter()?;
        match app.run_action(&adapter, &mut self.dispatcher, &input)? {
            Completion::Discarded => writeln!(out, "(result discarded: mode changed)")?,
            Completion::Accepted => {
                if let Some(ModeResult::Image(_)) = self.dispatcher.current() {
                    let path = self.out_dir.join(format!(
                        "{}-{}.png",
                        self.dispatcher.mode(),
                        compact_timestamp()
                    ));
                    self.save_current(&path)?;
                    writeln!(out, "Saved to {}", path.display())?;
                }
                if let Some(result) = self.dispatcher.current() {
                    write_result(out, result, &self.dispatcher)?;
                }
            }
        }
        Ok(())
    }

    fn save_current(&self, path: &Path) -> Result<()> {
        match self.dispatcher.current() {
            Some(ModeResult::Image(artifact)) => media::save_image(path, artifact),
            Some(ModeResult::Optimized(result)) => write_text(path, &result.optimized),
            Some(ModeResult::Analysis(text)) => write_text(path, text),
            None => bail!("no result to save"),
        }
    }
}

fn write_result(out: &mut dyn Write, result: &ModeResult, dispatcher: &Dispatcher) -> Result<()> {
    let text = render_result(result, dispatcher.route().output);
    writeln!(out, "{}", text.trim_end())?;
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

fn compact_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

/// Reads stdin until EOF or `/quit`.
pub fn run_chat(app: &mut App, mut session: ChatSession) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    println!("PromptMaster chat started. Type /help for commands.");
    println!("{}", session.header());

    loop {
        print!("> ");
        stdout.flush()?;

        line.clear();
        let read = match stdin.lock().read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']).to_string();
        let mut confirm = || confirm_on_stdin("Confirm? [y/N] ");
        if session.handle(app, &input, &mut confirm, &mut stdout)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

pub fn confirm_on_stdin(prompt: &str) -> bool {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
