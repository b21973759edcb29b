use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radreport::cli::commands::OutputFormat;
use radreport::cli::commands::batch::BatchOptions;
use radreport::cli::commands::report::ReportOptions;
use radreport::cli::ui::Output;
use radreport::cli::{CommandContext, LlmOverrides};

#[derive(Parser)]
#[command(name = "radreport")]
#[command(
    version,
    about = "Turn terse abdominal ultrasound findings into structured radiology reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Explicit config file, merged over global and project config
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(clap::Args, Default)]
struct LlmArgs {
    #[arg(long, help = "LLM provider (gemini, openai, ollama)")]
    provider: Option<String>,
    #[arg(long, help = "Model to use")]
    model: Option<String>,
}

impl From<LlmArgs> for LlmOverrides {
    fn from(args: LlmArgs) -> Self {
        Self {
            provider: args.provider,
            model: args.model,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report for one patient
    Report {
        #[arg(help = "Findings file, or - for stdin")]
        input: Option<PathBuf>,
        #[arg(long, short, help = "Write the report to a file")]
        output: Option<PathBuf>,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Print the structured findings as JSON
    Extract {
        #[arg(help = "Findings file, or - for stdin")]
        input: Option<PathBuf>,
        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Generate reports for every findings file in a folder
    Batch {
        #[arg(help = "Folder of findings files (one per patient)")]
        dir: PathBuf,
        #[arg(long, help = "Date for the output file name (YYYY-MM-DD, default today)")]
        date: Option<String>,
        #[arg(long, help = "Output directory (default from config)")]
        output_dir: Option<PathBuf>,
        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Check that the configured provider is reachable
    Check {
        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mradreport encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "radreport=debug"
    } else if cli.quiet {
        "error"
    } else {
        "radreport=info,warn"
    };

    // Logs go to stderr; stdout carries the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let out = Output::new(cli.quiet);
    let config_path = cli.config.as_deref();
    let context = |llm: LlmArgs| -> anyhow::Result<CommandContext> {
        Ok(CommandContext::load(config_path)?.with_overrides(&llm.into())?)
    };

    match cli.command {
        Commands::Report {
            input,
            output,
            format,
            llm,
        } => {
            let ctx = context(llm)?;
            radreport::cli::commands::report::run(
                &ctx,
                ReportOptions {
                    input,
                    output,
                    format,
                },
                &out,
            )?;
        }
        Commands::Extract { input, llm } => {
            let ctx = context(llm)?;
            radreport::cli::commands::extract::run(&ctx, input, &out)?;
        }
        Commands::Batch {
            dir,
            date,
            output_dir,
            llm,
        } => {
            let ctx = context(llm)?;
            radreport::cli::commands::batch::run(
                &ctx,
                BatchOptions {
                    dir,
                    date,
                    output_dir,
                },
                &out,
            )?;
        }
        Commands::Check { llm } => {
            let ctx = context(llm)?;
            radreport::cli::commands::check::run(&ctx, &out)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                let ctx = context(LlmArgs::default())?;
                radreport::cli::commands::config::show(&ctx, format)?;
            }
            ConfigAction::Path => {
                radreport::cli::commands::config::path(&out)?;
            }
            ConfigAction::Init { global, force } => {
                radreport::cli::commands::config::init(global, force, &out)?;
            }
        },
    }

    Ok(())
}
