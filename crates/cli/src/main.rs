//! # chatsql: ask your database in plain language
//!
//! This is the main entry point for the `chatsql` command-line interface.

mod app;
mod tui;
mod ui;

use anyhow::Result;
use app::App;
use chatsql::{
    get_config,
    prompts::{DEFAULT_PROMPT_TEMPLATE, DEFAULT_TABLE_METADATA},
    providers::factory::create_gateway,
    Answer, AnswerMode, AppConfig, AskOptions, ChatClientBuilder, ExampleLog, Transcript,
};
use clap::{Parser, Subcommand};
use std::{fs::File, path::Path};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the configuration file (defaults to ./config.json)
    #[arg(long, global = true, env = "CHATSQL_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask(AskArgs),
    /// Inspect or extend the few-shot example log
    Examples(ExamplesArgs),
    /// Write a default prompt template, table metadata and example log
    Init,
}

#[derive(Parser, Debug)]
struct AskArgs {
    /// The question to turn into SQL
    question: String,
    /// Few-shot examples; the last logged examples are used when omitted
    #[arg(long)]
    examples: Option<String>,
    /// Overrides `answer_mode` from the configuration
    #[arg(long, value_parser = parse_mode)]
    mode: Option<AnswerMode>,
}

#[derive(Parser, Debug)]
struct ExamplesArgs {
    #[command(subcommand)]
    command: ExamplesCommands,
}

#[derive(Subcommand, Debug)]
enum ExamplesCommands {
    /// Print the most recent examples
    Last,
    /// Print every logged entry with its timestamp
    History,
    /// Log new examples unless they equal the most recent entry
    Add {
        /// The example block
        text: String,
    },
}

fn parse_mode(value: &str) -> Result<AnswerMode, String> {
    value.parse::<AnswerMode>().map_err(|e| e.to_string())
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Log to a file so the terminal UI stays intact.
    let log_file = File::create("chatsql-cli.log")?;
    let subscriber = fmt::Subscriber::builder()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = get_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => handle_chat(&config).await,
        Commands::Ask(args) => handle_ask(&config, args).await,
        Commands::Examples(args) => handle_examples(&config, args),
        Commands::Init => handle_init(&config),
    }
}

// --- Command Handlers ---

async fn handle_chat(config: &AppConfig) -> Result<()> {
    info!("Starting chat session.");
    let gateway = create_gateway(config)?;
    let client = ChatClientBuilder::from_config(config)
        .gateway(gateway)
        .build()?;
    let log = ExampleLog::new(&config.example_log_path);

    let mut app = App::new(client, log, config.max_new_tokens);
    tui::run(&mut app).await
}

async fn handle_ask(config: &AppConfig, args: AskArgs) -> Result<()> {
    let gateway = create_gateway(config)?;
    let client = ChatClientBuilder::from_config(config)
        .gateway(gateway)
        .build()?;
    let log = ExampleLog::new(&config.example_log_path);
    let examples = log.resolve(args.examples.as_deref().unwrap_or_default())?;

    let mut transcript = Transcript::new();
    let options = AskOptions {
        question: args.question,
        examples,
        max_new_tokens: None,
        answer_mode: args.mode,
    };
    match client.ask_with_options(&mut transcript, options).await? {
        Answer::Code { sql } => println!("{sql}"),
        Answer::Table { sql, result } => {
            println!("{sql}\n");
            println!("{result}");
        }
    }
    Ok(())
}

fn handle_examples(config: &AppConfig, args: ExamplesArgs) -> Result<()> {
    let log = ExampleLog::new(&config.example_log_path);
    match args.command {
        ExamplesCommands::Last => {
            let last = log.read_last();
            if last.is_empty() {
                println!("No examples logged yet.");
            } else {
                println!("{last}");
            }
        }
        ExamplesCommands::History => {
            let entries = log.entries();
            if entries.is_empty() {
                println!("No examples logged yet.");
            }
            for entry in entries {
                println!("[{}]\n{}\n", entry.timestamp, entry.text);
            }
        }
        ExamplesCommands::Add { text } => {
            let last = log.read_last();
            if log.append_if_changed(&text, &last)? {
                println!("Examples logged to {}.", log.path().display());
            } else {
                println!("Examples unchanged, nothing logged.");
            }
        }
    }
    Ok(())
}

fn handle_init(config: &AppConfig) -> Result<()> {
    write_if_absent(&config.prompt_file, DEFAULT_PROMPT_TEMPLATE)?;
    write_if_absent(&config.metadata_file, DEFAULT_TABLE_METADATA)?;
    write_if_absent(&config.example_log_path, "")?;
    Ok(())
}

fn write_if_absent(path: &str, content: &str) -> Result<()> {
    let path = Path::new(path);
    if path.exists() {
        println!("Kept existing {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    info!("Created {}", path.display());
    println!("Created {}", path.display());
    Ok(())
}
