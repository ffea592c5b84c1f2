mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::loan::{
    AffordabilityArgs, BalanceArgs, CompareArgs, PaymentArgs, QuoteArgs, RateArgs, ScheduleArgs,
};

/// Loan offer quotes with decimal precision
#[derive(Parser)]
#[command(
    name = "loanq",
    version,
    about = "Loan offer quotes and amortization schedules",
    long_about = "A CLI for pricing consumer loans with decimal precision. Looks up the \
                  bracket rate, computes the annuity payment, splits it into interest and \
                  principal, extends the term to fit a stated capacity and compares the \
                  result with a desired payment."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Full loan quote: payment, totals, term extension and comparison
    Quote(QuoteArgs),
    /// Look up the bracket rate for a principal
    Rate(RateArgs),
    /// Monthly annuity payment
    Payment(PaymentArgs),
    /// Interest/principal split per month
    Schedule(ScheduleArgs),
    /// Remaining balance after a number of years
    Balance(BalanceArgs),
    /// Extend the term until the payment fits a stated capacity
    Affordability(AffordabilityArgs),
    /// Compare the computed payment with a desired payment
    Compare(CompareArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Quote(args) => commands::loan::run_quote(args),
        Commands::Rate(args) => commands::loan::run_rate(args),
        Commands::Payment(args) => commands::loan::run_payment(args),
        Commands::Schedule(args) => commands::loan::run_schedule(args),
        Commands::Balance(args) => commands::loan::run_balance(args),
        Commands::Affordability(args) => commands::loan::run_affordability(args),
        Commands::Compare(args) => commands::loan::run_compare(args),
        Commands::Version => {
            println!("loanq {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
