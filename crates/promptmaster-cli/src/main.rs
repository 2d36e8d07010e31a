mod app;
mod chat;
mod config;
mod host;
mod media;
mod render;
mod status;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use promptmaster_contracts::dispatch::{Dispatcher, ModeResult};
use promptmaster_contracts::modes::{AspectRatio, OperationMode};
use tracing_subscriber::EnvFilter;

use crate::app::{readiness_label, ActionInput, App};
use crate::chat::{confirm_on_stdin, run_chat, ChatSession};
use crate::config::{AppConfig, AppPaths};
use crate::render::{render_modes, render_result, result_json};

const LOG_ENV: &str = "PROMPTMASTER_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "promptmaster",
    version,
    about = "Prompt rewriting, image generation, editing and analysis on Gemini"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// State directory (defaults to $PROMPTMASTER_HOME or the user config dir).
    #[arg(long, global = true)]
    home: Option<PathBuf>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store an API key (and optional alternate endpoint).
    Login(KeyArgs),
    /// Replace the active API key without logging out.
    Switch(KeyArgs),
    /// Remove the stored API key.
    Logout {
        #[arg(long)]
        yes: bool,
    },
    Status,
    /// Run the host's key selection and re-check readiness.
    Connect,
    Modes,
    /// Rewrite a prompt with one of the four prompt modes.
    Enhance(EnhanceArgs),
    Generate(GenerateArgs),
    Analyze(AnalyzeArgs),
    Edit(EditArgs),
    /// Synthesize speech as raw s16le PCM, 24 kHz mono.
    Speak(SpeakArgs),
    Chat(ChatArgs),
}

#[derive(Debug, Args)]
struct KeyArgs {
    token: String,
    #[arg(long)]
    endpoint: Option<String>,
}

#[derive(Debug, Args)]
struct EnhanceArgs {
    #[arg(long, default_value_t = OperationMode::ImagePromptEnhance)]
    mode: OperationMode,
    text: String,
    #[arg(long)]
    json: bool,
    /// Also read the result aloud into this PCM file.
    #[arg(long)]
    speak: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    prompt: String,
    #[arg(long, default_value_t = AspectRatio::Square)]
    aspect_ratio: AspectRatio,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    instruction: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct EditArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    instruction: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct SpeakArgs {
    text: String,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct ChatArgs {
    #[arg(long, default_value_t = OperationMode::ImagePromptEnhance)]
    mode: OperationMode,
    /// Where generated images and speech land (defaults to <home>/outputs).
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("promptmaster error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let paths = AppPaths::resolve(cli.global.home, cli.global.config, cli.global.events)?;
    let config = AppConfig::load(&paths.config)?;

    if let Command::Modes = cli.command {
        print!("{}", render_modes());
        return Ok(0);
    }

    let mut app = App::open(paths, config)?;
    match cli.command {
        Command::Login(args) => {
            let credential = app.login(&args.token, args.endpoint.as_deref())?;
            println!(
                "Logged in with {} ({}) at {}",
                credential.masked_token(),
                credential.flavour().label(),
                credential.endpoint()
            );
        }
        Command::Switch(args) => {
            let credential = app.switch_credential(&args.token, args.endpoint.as_deref())?;
            println!(
                "Switched to {} ({}) at {}",
                credential.masked_token(),
                credential.flavour().label(),
                credential.endpoint()
            );
        }
        Command::Logout { yes } => {
            if !yes {
                println!("This removes the stored API key and cannot be undone.");
            }
            let cleared = app.logout(|| yes || confirm_on_stdin("Continue? [y/N] "))?;
            println!("{}", if cleared { "Logged out." } else { "Nothing was cleared." });
        }
        Command::Status => print!("{}", status::render(&app)?),
        Command::Connect => {
            let readiness = app.connect_via_host()?;
            println!("Host key: {}", readiness_label(readiness));
            if !readiness.is_usable() {
                return Ok(2);
            }
        }
        Command::Modes => {}
        Command::Enhance(args) => run_enhance(&app, args)?,
        Command::Generate(args) => {
            let input = ActionInput {
                text: Some(args.prompt),
                aspect_ratio: args.aspect_ratio,
                ..ActionInput::default()
            };
            run_once(&app, OperationMode::ImageGenerationTest, input, Some(args.out), args.json)?;
        }
        Command::Analyze(args) => {
            let input = ActionInput {
                image: Some(media::image_data_uri(&args.image)?),
                instruction: args.instruction,
                ..ActionInput::default()
            };
            run_once(&app, OperationMode::ImageToPromptAnalysis, input, None, args.json)?;
        }
        Command::Edit(args) => {
            let input = ActionInput {
                image: Some(media::image_data_uri(&args.image)?),
                instruction: Some(args.instruction),
                ..ActionInput::default()
            };
            run_once(&app, OperationMode::ImageEdit, input, Some(args.out), args.json)?;
        }
        Command::Speak(args) => {
            let adapter = app.adapter()?;
            let audio = app.speak(&adapter, &args.text)?;
            media::save_pcm(&args.out, &audio)?;
            println!(
                "Speech saved to {} ({:.1}s, s16le {} Hz mono)",
                args.out.display(),
                audio.duration_secs(),
                audio.sample_rate()
            );
        }
        Command::Chat(args) => {
            let out_dir = args.out.unwrap_or_else(|| app.paths.home.join("outputs"));
            let session = ChatSession::new(args.mode, out_dir);
            run_chat(&mut app, session)?;
        }
    }
    Ok(0)
}

fn run_enhance(app: &App, args: EnhanceArgs) -> Result<()> {
    if args.mode.prompt_mode().is_none() {
        bail!(
            "{} is not a prompt mode; use one of image-prompt-enhance, video-prompt-enhance, storyboard-breakdown, stylized-prompt",
            args.mode
        );
    }
    let input = ActionInput {
        text: Some(args.text),
        ..ActionInput::default()
    };
    let result = run_once(app, args.mode, input, None, args.json)?;
    if let (Some(path), ModeResult::Optimized(optimized)) = (args.speak, &result) {
        let adapter = app.adapter()?;
        let audio = app.speak(&adapter, &optimized.optimized)?;
        media::save_pcm(&path, &audio)?;
        eprintln!("Speech saved to {}", path.display());
    }
    Ok(())
}

/// One dispatcher round for a single-shot subcommand.
fn run_once(
    app: &App,
    mode: OperationMode,
    input: ActionInput,
    out: Option<PathBuf>,
    json: bool,
) -> Result<ModeResult> {
    let adapter = app.adapter()?;
    let mut dispatcher = Dispatcher::new(mode);
    app.run_action(&adapter, &mut dispatcher, &input)?;
    let Some(result) = dispatcher.current().cloned() else {
        bail!("{mode} produced no result");
    };

    if let (ModeResult::Image(artifact), Some(path)) = (&result, out.as_deref()) {
        media::save_image(path, artifact)?;
    }
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result_json(&result, out.as_deref()))?
        );
    } else {
        println!("{}", render_result(&result, dispatcher.route().output).trim_end());
        if let (ModeResult::Image(_), Some(path)) = (&result, out.as_deref()) {
            println!("Saved to {}", path.display());
        }
    }
    Ok(result)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use promptmaster_contracts::modes::{AspectRatio, OperationMode};

    use super::{Cli, Command};

    #[test]
    fn parse_enhance_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "promptmaster",
            "enhance",
            "--mode",
            "storyboard-breakdown",
            "a heist at night",
            "--home",
            "/tmp/pm",
            "--json",
        ])
        .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(cli.global.home.as_deref(), Some(std::path::Path::new("/tmp/pm")));
        match cli.command {
            Command::Enhance(args) => {
                assert_eq!(args.mode, OperationMode::StoryboardBreakdown);
                assert_eq!(args.text, "a heist at night");
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parse_generate_aspect_ratio() {
        let cli = Cli::try_parse_from([
            "promptmaster",
            "generate",
            "neon koi",
            "--aspect-ratio",
            "16:9",
            "--out",
            "koi.png",
        ])
        .unwrap_or_else(|err| panic!("{err}"));
        match cli.command {
            Command::Generate(args) => assert_eq!(args.aspect_ratio, AspectRatio::Widescreen),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["promptmaster", "generate", "x", "--aspect-ratio", "2:3", "--out", "a.png"]).is_err());
    }

    #[test]
    fn edit_requires_instruction_and_output() {
        assert!(Cli::try_parse_from(["promptmaster", "edit", "--image", "in.png"]).is_err());
    }
}
