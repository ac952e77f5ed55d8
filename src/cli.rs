use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use atty::Stream;
use clap::{Parser, Subcommand};
use serde_json::json;
use spotquiz::{
    Difficulty, Patches, Quiz, QuizSource, build_prompt, fallback_quiz, fallback_rule_name,
    parse_quiz_report,
};
use termimad::{FmtText, MadSkin, terminal_size};

#[derive(Parser, Debug)]
#[command(name = "spotquiz", about = "Generate quizzes about places", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind; overrides HOST.
        #[arg(long)]
        host: Option<String>,
        /// Port to bind; overrides PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Build, parse and inspect single quizzes.
    #[command(subcommand)]
    Quiz(QuizCommand),
}

#[derive(Subcommand, Debug)]
enum QuizCommand {
    /// Show the catalog quiz served when generation is unavailable.
    Fallback {
        spot: String,
        #[arg(short, long, default_value = "middle")]
        difficulty: String,
    },
    /// Parse generated quiz text from a file, or stdin when omitted.
    Parse {
        file: Option<PathBuf>,
        #[arg(short, long, default_value = "middle")]
        difficulty: String,
    },
    /// Print the prompt that would be sent to the provider.
    Prompt {
        spot: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "middle")]
        difficulty: String,
    },
    /// Generate one quiz using the configured provider.
    #[cfg(feature = "web")]
    Generate {
        spot: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "middle")]
        difficulty: String,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        #[cfg(feature = "web")]
        Command::Serve { host, port } => handle_serve(host, port),
        Command::Quiz(QuizCommand::Fallback { spot, difficulty }) => {
            handle_fallback(&spot, &difficulty, cli.json)
        }
        Command::Quiz(QuizCommand::Parse { file, difficulty }) => {
            handle_parse(file, &difficulty, cli.json)
        }
        Command::Quiz(QuizCommand::Prompt {
            spot,
            description,
            difficulty,
        }) => handle_prompt(&spot, &description, &difficulty, cli.json),
        #[cfg(feature = "web")]
        Command::Quiz(QuizCommand::Generate {
            spot,
            description,
            difficulty,
        }) => handle_generate(spot, description, difficulty, cli.json),
    }
}

#[cfg(feature = "web")]
fn handle_serve(host: Option<String>, port: Option<u16>) -> Result<(), Box<dyn Error>> {
    configure_tracing();
    let mut settings = spotquiz::Settings::from_env()?;
    if let Some(host) = host {
        settings.host = host;
    }
    if let Some(port) = port {
        settings.port = port;
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(spotquiz::web::serve(settings))?;
    Ok(())
}

#[cfg(feature = "web")]
fn handle_generate(
    spot: String,
    description: String,
    difficulty: String,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    configure_tracing();
    let settings = spotquiz::Settings::from_env()?;
    let generator = spotquiz::QuizGenerator::from_settings(&settings)?;
    let request = spotquiz::QuizRequest::new(spot, description, difficulty);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let generated = runtime.block_on(generator.generate(&request));

    if as_json {
        let payload = spotquiz::QuizResponse::new(generated.quiz, generated.source);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_quiz(&generated.quiz, Some(generated.source));
    }
    Ok(())
}

fn handle_fallback(spot: &str, difficulty: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let quiz = fallback_quiz(spot, difficulty);
    if as_json {
        let payload = json!({
            "rule": fallback_rule_name(spot),
            "generated_by": QuizSource::Fallback,
            "quiz": quiz,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("Rule: {}", fallback_rule_name(spot));
        print_quiz(&quiz, Some(QuizSource::Fallback));
    }
    Ok(())
}

fn handle_parse(
    file: Option<PathBuf>,
    difficulty: &str,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let raw = match file {
        Some(path) => fs::read_to_string(&path)
            .map_err(|err| format!("Failed to read {}: {err}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let points = Difficulty::from_label(difficulty).points();
    let parsed = parse_quiz_report(&raw, points);

    if as_json {
        let payload = json!({
            "quiz": parsed.quiz,
            "patches": parsed.patches,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_quiz(&parsed.quiz, None);
        print_patches(&parsed.patches);
    }
    Ok(())
}

fn handle_prompt(
    spot: &str,
    description: &str,
    difficulty: &str,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let prompt = build_prompt(spot, difficulty, description);
    if as_json {
        let payload = json!({
            "prompt": prompt,
            "points": Difficulty::from_label(difficulty).points(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{prompt}");
    }
    Ok(())
}

#[cfg(feature = "web")]
fn configure_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();
}

fn print_quiz(quiz: &Quiz, source: Option<QuizSource>) {
    if let Some(source) = source {
        println!("Source: {source}");
    }
    println!("Points: {}", quiz.points);
    println!("\nQ. {}", quiz.question);
    for (index, option) in quiz.options.iter().enumerate() {
        let marker = if index == quiz.correct_answer { '*' } else { ' ' };
        println!(" {marker} {}. {option}", index + 1);
    }
    render_markdown_block("Explanation", &quiz.explanation);
}

fn print_patches(patches: &Patches) {
    if !patches.any() {
        return;
    }
    let mut fixed = Vec::new();
    if patches.question_defaulted {
        fixed.push("question");
    }
    if patches.options_replaced {
        fixed.push("options");
    }
    if patches.answer_clamped {
        fixed.push("answer");
    }
    if patches.explanation_defaulted {
        fixed.push("explanation");
    }
    println!("\nDefaults applied to: {}", fixed.join(", "));
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
