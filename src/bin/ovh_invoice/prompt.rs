//! Interactive mode used when no subcommand is given.

use std::io::{self, BufRead, Write};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use ovh_invoice::print_error;
use regex::Regex;

use crate::period::BillingPeriod;

static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^2[0-9]{3}$").expect("Failed to create regex pattern for year"));

static RE_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0|1)[0-9]$").expect("Failed to create regex pattern for month"));

/// Actions offered in interactive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Download,
    Init,
    Quit,
}

impl Action {
    const ALL: [Self; 3] = [Self::Download, Self::Init, Self::Quit];

    const fn name(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Init => "init",
            Self::Quit => "quit",
        }
    }

    /// Match a menu number or an action name prefix.
    fn from_input(input: &str) -> Option<Self> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return None;
        }
        if let Ok(number) = input.parse::<usize>() {
            return number.checked_sub(1).and_then(|index| Self::ALL.get(index).copied());
        }
        Self::ALL.into_iter().find(|action| action.name().starts_with(&input))
    }
}

/// Check a four digit year starting with 2.
pub fn validate_year(input: &str) -> Result<()> {
    if !RE_YEAR.is_match(input) {
        bail!("Wrong year");
    }
    Ok(())
}

/// Check a two digit month between 01 and 12.
pub fn validate_month(input: &str) -> Result<()> {
    if !RE_MONTH.is_match(input) {
        bail!("Wrong month");
    }
    match input.parse::<u32>() {
        Ok(1..=12) => Ok(()),
        _ => bail!("Wrong month"),
    }
}

/// Ask which action to run.
pub fn select_action() -> Result<Action> {
    select_action_from(&mut io::stdin().lock())
}

/// Ask for the year and month, using the given period as the default.
pub fn prompt_period(default: &BillingPeriod) -> Result<BillingPeriod> {
    let mut input = io::stdin().lock();
    prompt_period_from(&mut input, default)
}

fn select_action_from<R: BufRead>(reader: &mut R) -> Result<Action> {
    for (index, action) in Action::ALL.iter().enumerate() {
        println!("  {} {}", format!("{}.", index + 1).dimmed(), action.name());
    }
    loop {
        print!("{} ", "Action:".cyan().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(input) = read_input(reader)? else {
            return Ok(Action::Quit);
        };
        if let Some(action) = Action::from_input(&input) {
            return Ok(action);
        }
        print_error!("Unknown action: {input}");
    }
}

fn prompt_period_from<R: BufRead>(reader: &mut R, default: &BillingPeriod) -> Result<BillingPeriod> {
    let year = prompt_value(reader, "Year", &default.year_dir(), validate_year)?;
    let month = prompt_value(reader, "Month", &default.month_dir(), validate_month)?;
    BillingPeriod::parse(&year, &month)
}

/// Prompt until the input passes validation. Empty input selects the default.
fn prompt_value<R: BufRead>(
    reader: &mut R,
    label: &str,
    default: &str,
    validate: fn(&str) -> Result<()>,
) -> Result<String> {
    loop {
        print!("{} {} ", format!("{label}:").cyan().bold(), format!("({default})").dimmed());
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(input) = read_input(reader)? else {
            bail!("No input for {}", label.to_lowercase());
        };
        let value = if input.is_empty() { default.to_string() } else { input };
        match validate(&value) {
            Ok(()) => return Ok(value),
            Err(error) => print_error!("{error}"),
        }
    }
}

/// Read one trimmed line, or `None` at end of input.
fn read_input<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut input = String::new();
    let bytes = reader.read_line(&mut input).context("Failed to read input")?;
    if bytes == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}
