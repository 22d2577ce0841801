//! ovh-invoice - Download monthly OVH invoices with CSV summaries.
//!
//! Fetches the bills, refunds and deposits of one month from the OVH API,
//! stores their PDF documents under `<dir>/<year>/<month>/`
//! and writes `bills.csv` and `deposits.csv` for bookkeeping.

mod api;
mod config;
mod download;
mod ledger;
mod ovh;
mod period;
mod prompt;
mod records;
mod storage;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;

use crate::config::Config;
use crate::prompt::Action;

/// Download monthly OVH invoices, refunds and deposits.
///
/// Without a subcommand, asks interactively what to do.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Download monthly OVH invoices, refunds and deposits with CSV summaries"
)]
pub struct OvhInvoiceArgs {
    #[command(subcommand)]
    command: Option<OvhInvoiceCommand>,

    /// OVH API endpoint alias or url
    #[arg(short, long, global = true, env = "OVH_ENDPOINT", value_name = "ENDPOINT")]
    endpoint: Option<String>,

    /// OVH API application key
    #[arg(long, global = true, env = "OVH_AK", hide_env_values = true, value_name = "AK")]
    application_key: Option<String>,

    /// OVH API application secret
    #[arg(long, global = true, env = "OVH_AS", hide_env_values = true, value_name = "AS")]
    application_secret: Option<String>,

    /// OVH API consumer key
    #[arg(long, global = true, env = "OVH_CK", hide_env_values = true, value_name = "CK")]
    consumer_key: Option<String>,

    /// Directory where invoices are stored, relative to the current directory
    #[arg(short, long, global = true, env = "INVOICE_DIR", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    dir: Option<PathBuf>,

    /// Year to download (default is the current year)
    #[arg(short, long, global = true, value_name = "YEAR")]
    year: Option<String>,

    /// Month to download (default is the current month)
    #[arg(short, long, global = true, value_name = "MONTH")]
    month: Option<String>,

    /// Generate shell completion
    #[arg(short = 'l', long, value_name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum OvhInvoiceCommand {
    /// Open the browser to create an API consumer key with read-only billing rights
    Init,
    /// Download documents and write CSV summaries for the month
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Environment values from `.env` must be set before clap reads them
    if let Err(error) = config::load_env_file() {
        ovh_invoice::print_warning!("{error:#}");
    }

    let args = OvhInvoiceArgs::parse();

    // Handle shell completion generation
    if let Some(ref shell) = args.completion {
        return ovh_invoice::generate_shell_completion(
            *shell,
            OvhInvoiceArgs::command(),
            true,
            env!("CARGO_BIN_NAME"),
        );
    }

    let mut config = Config::from_args(&args)?;
    let action = match args.command {
        Some(OvhInvoiceCommand::Init) => Action::Init,
        Some(OvhInvoiceCommand::Download) => Action::Download,
        None => {
            let action = prompt::select_action()?;
            if action == Action::Download {
                config.period = prompt::prompt_period(&config.period)?;
            }
            action
        }
    };

    match action {
        Action::Init => create_api_token(&config),
        Action::Download => run_download(&config).await,
        Action::Quit => Ok(()),
    }
}

/// Open the consumer key creation page.
fn create_api_token(config: &Config) -> Result<()> {
    let url = ovh::token_creation_url(&config.endpoint)?;
    println!("{}", "Create an API token with read-only billing rights:".bold());
    println!("{url}");
    if let Err(error) = ovh_invoice::open_in_browser(&url) {
        ovh_invoice::print_warning!("Could not open browser: {error}");
    }
    Ok(())
}

async fn run_download(config: &Config) -> Result<()> {
    if config.verbose {
        println!("{config}");
    }
    let summary = download::download_invoices(config).await?;
    println!("{}", "Done".green().bold());
    println!("{summary}");
    if summary.has_errors() {
        ovh_invoice::print_warning!("Some records failed, the CSV files may be incomplete");
    }
    Ok(())
}
