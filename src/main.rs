//! Terminal front end for transparency interviews.
//!
//! Usage:
//!   transparency-lens token set <TOKEN>
//!   transparency-lens interview --name Soap --category cosmetics
//!   transparency-lens token clear

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;
use transparency_lens::config::Config;
use transparency_lens::session::token_store_for;
use transparency_lens::token::AccessToken;
use transparency_lens::{
    Category, InterviewDriver, LensError, ScoreSummary, SessionContext, Step,
};

#[derive(Parser)]
#[command(name = "transparency-lens", version)]
#[command(about = "Guided product transparency interviews", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive transparency interview
    Interview {
        /// Product name (prompted when omitted)
        #[arg(long)]
        name: Option<String>,
        /// Other, Food, Cosmetics, Apparel or Electronics (prompted when omitted)
        #[arg(long)]
        category: Option<Category>,
        /// Where downloaded reports are written
        #[arg(long)]
        report_dir: Option<PathBuf>,
        /// Skip the report download after scoring
        #[arg(long, default_value_t = false)]
        no_report: bool,
    },
    /// Manage the stored bearer token
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Store a token issued by the login service
    Set { token: String },
    /// Forget the stored token
    Clear,
    /// Report whether a token is available
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.runtime.log_level))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Interview {
            name,
            category,
            report_dir,
            no_report,
        } => {
            let report_dir = report_dir.unwrap_or_else(|| config.interview.report_dir.clone());
            run_interview(&config, name, category, report_dir, no_report).await
        }
        Commands::Token { command } => run_token(&config, command),
    }
}

fn run_token(config: &Config, command: TokenCommands) -> Result<()> {
    let store = token_store_for(config)?;
    if config.runtime.api_token.is_some() && !matches!(command, TokenCommands::Status) {
        eprintln!("LENS_TOKEN is set; changes apply to this process only");
    }
    match command {
        TokenCommands::Set { token } => {
            store.set(AccessToken::new(token)?)?;
            println!("Token stored");
        }
        TokenCommands::Clear => {
            store.clear()?;
            println!("Token cleared");
        }
        TokenCommands::Status => match store.get()? {
            Some(_) => println!("Token present"),
            None => println!("No token; run `transparency-lens token set <TOKEN>`"),
        },
    }
    Ok(())
}

async fn run_interview(
    config: &Config,
    mut name: Option<String>,
    mut category: Option<Category>,
    report_dir: PathBuf,
    no_report: bool,
) -> Result<()> {
    let ctx = SessionContext::from_config(config)?;
    let driver = Arc::new(InterviewDriver::new(ctx));

    // Ctrl-C aborts the pending request; when idle it exits.
    let canceller = Arc::clone(&driver);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if canceller.is_busy() {
                eprintln!("\nCancelling the pending request...");
                canceller.cancel();
            } else {
                std::process::exit(130);
            }
        }
    });

    let mut input = Prompt::new();
    loop {
        let Some(summary) = interview_once(&driver, &mut input, name.take(), category.take()).await?
        else {
            return Ok(());
        };

        println!();
        println!("03  Analysis Complete");
        println!("Transparency Score: {}", summary.score);
        println!("{}", summary.tier);

        if !no_report {
            save_report(&driver, &report_dir).await?;
        }

        let again = input.ask("Start a new analysis? [y/N] ").await?;
        if !matches!(again.as_deref().map(str::trim), Some("y" | "Y")) {
            return Ok(());
        }
        driver.reset()?;
    }
}

async fn interview_once(
    driver: &InterviewDriver,
    input: &mut Prompt,
    mut preset_name: Option<String>,
    mut preset_category: Option<Category>,
) -> Result<Option<ScoreSummary>> {
    println!("01  Product Foundation");
    let mut step = loop {
        let name = match preset_name.take() {
            Some(name) => name,
            None => match input.ask("Product name: ").await? {
                Some(name) => name,
                None => return Ok(None),
            },
        };
        let category = match preset_category.take() {
            Some(category) => category,
            None => match ask_category(input).await? {
                Some(category) => category,
                None => return Ok(None),
            },
        };

        driver.set_foundation(&name, category)?;
        match driver.submit_foundation().await {
            Ok(step) => break step,
            Err(LensError::Unauthorized { message }) => {
                eprintln!("{} Run `transparency-lens token set <TOKEN>`.", message);
                return Ok(None);
            }
            Err(e) if e.is_external() => eprintln!("Error creating product: {}", e),
            Err(e) => eprintln!("{}", e),
        }
    };

    println!();
    println!("02  Transparency Interview");
    loop {
        step = match step {
            Step::Question(question) => {
                let snapshot = driver.snapshot()?;
                println!();
                println!(
                    "[{:>3.0}%] {}",
                    snapshot.progress * 100.0,
                    question
                );
                let Some(answer) = input.ask("> ").await? else {
                    return Ok(None);
                };
                match driver.submit_answer(&answer).await {
                    Ok(next) => next,
                    Err(LensError::Validation { message }) => {
                        eprintln!("{}", message);
                        Step::Question(question)
                    }
                    // The answer was not recorded; ask again.
                    Err(e) => {
                        eprintln!("{}", e);
                        Step::Question(question)
                    }
                }
            }
            Step::Stalled { reason } => {
                eprintln!("{}", reason);
                let choice = input
                    .ask("[r]etry question, [f]inalize report, [q]uit: ")
                    .await?;
                match choice.as_deref().map(str::trim) {
                    Some("r") => driver
                        .request_next_question()
                        .await
                        .unwrap_or_else(|e| Step::Stalled {
                            reason: e.to_string(),
                        }),
                    Some("f") => match driver.finalize_report().await {
                        Ok(summary) => Step::Scored(summary),
                        Err(e) => Step::Stalled {
                            reason: format!("Error saving answers: {}", e),
                        },
                    },
                    Some("q") | None => return Ok(None),
                    Some(_) => Step::Stalled { reason },
                }
            }
            Step::Unscored { reason } => {
                eprintln!("Error saving answers: {}", reason);
                let choice = input.ask("[f]inalize report again, [q]uit: ").await?;
                match choice.as_deref().map(str::trim) {
                    Some("f") => match driver.finalize_report().await {
                        Ok(summary) => Step::Scored(summary),
                        Err(e) => Step::Unscored {
                            reason: e.to_string(),
                        },
                    },
                    Some("q") | None => return Ok(None),
                    Some(_) => Step::Unscored { reason },
                }
            }
            Step::Scored(summary) => return Ok(Some(summary)),
        };
    }
}

async fn ask_category(input: &mut Prompt) -> Result<Option<Category>> {
    for (idx, category) in Category::ALL.iter().enumerate() {
        println!("  {}) {}", idx + 1, category.label());
    }
    loop {
        let Some(raw) = input.ask("Category [1]: ").await? else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Some(Category::default()));
        }
        if let Ok(n) = raw.parse::<usize>()
            && let Some(category) = n.checked_sub(1).and_then(|i| Category::ALL.get(i))
        {
            return Ok(Some(*category));
        }
        match raw.parse::<Category>() {
            Ok(category) => return Ok(Some(category)),
            Err(e) => eprintln!("{}", e),
        }
    }
}

async fn save_report(driver: &InterviewDriver, dir: &Path) -> Result<()> {
    match driver.fetch_report().await {
        Ok(artifact) => {
            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(sanitize_file_name(&artifact.file_name));
            tokio::fs::write(&path, &artifact.bytes).await?;
            println!("Report saved to {}", path.display());
        }
        Err(e) => eprintln!("Error downloading report: {}", e),
    }
    Ok(())
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect()
}

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` on end of input.
    async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        print!("{}", label);
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }
}
