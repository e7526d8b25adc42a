use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use immosim::api::{
    AppState, InvestmentArgs, LoanArgs, apply_preferences_update, build_investment_parameters,
    build_investment_response, build_loan_parameters, build_loan_response, run_http_server,
};
use immosim::config::{Preferences, resolve_path};
use immosim::log::init_logging;
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "immosim",
    version,
    about = "Real-estate loan amortization and rental investment calculator"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the preferences file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print the amortization schedule of a loan
    Loan(LoanArgs),
    /// Print the profitability of a rental investment
    Invest(InvestmentArgs),
    /// Show or change the default duration and interest rate
    Preferences {
        #[command(subcommand)]
        action: Option<PreferencesAction>,
    },
}

#[derive(Subcommand)]
enum PreferencesAction {
    /// Print the stored preferences
    Show,
    /// Update the stored preferences
    Set {
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        interest_rate: Option<f64>,
    },
    /// Restore the built-in defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_logging(cli.verbose, default_level);

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let path = resolve_path(cli.config_path.as_deref())?;
    let mut prefs = Preferences::load_from_path(&path)?;

    match cli.command {
        Commands::Serve { port } => {
            let state = AppState::new(prefs, Some(path));
            run_http_server(port, state)
                .await
                .context("HTTP server stopped")?;
        }
        Commands::Loan(args) => {
            let loan = build_loan_parameters(args, &prefs)?;
            print_json(&build_loan_response(&loan))?;
        }
        Commands::Invest(args) => {
            let data = build_investment_parameters(args, &prefs)?;
            print_json(&build_investment_response(&data))?;
        }
        Commands::Preferences { action } => match action.unwrap_or(PreferencesAction::Show) {
            PreferencesAction::Show => print_json(&prefs)?,
            PreferencesAction::Set {
                duration,
                interest_rate,
            } => {
                apply_preferences_update(&mut prefs, duration, interest_rate)?;
                prefs.save_to_path(&path)?;
                print_json(&prefs)?;
            }
            PreferencesAction::Reset => {
                prefs.reset_all();
                prefs.save_to_path(&path)?;
                print_json(&prefs)?;
            }
        },
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
