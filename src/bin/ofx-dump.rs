use std::path::PathBuf;

use color_eyre::{
    Result,
    eyre::{Context, bail},
};
use console::{Emoji, style};
use ofx::{Ofx, ParserConfig, TransactionKind, read_file};
use tracing_subscriber::EnvFilter;

fn print_statement(ofx: &Ofx) {
    println!(
        "{:16}{}",
        style("Account type").bold(),
        style(ofx.kind.name()).bright().white()
    );
    println!("{:16}{}", style("Bank").bold(), style(&ofx.bank_code).bright().white());
    println!("{:16}{}", style("Branch").bold(), style(&ofx.branch_code).bright().white());
    println!(
        "{:16}{}",
        style("Account").bold(),
        style(&ofx.account_number).bright().white()
    );

    for transaction in &ofx.transactions {
        let date = transaction
            .posted_date
            .as_ref()
            .map(|d| d.instant().date_naive().to_string())
            .unwrap_or_else(|| "-".to_owned());
        let amount = match transaction.kind {
            TransactionKind::Credit => style(transaction.amount.to_string()).green(),
            TransactionKind::Debit => style(transaction.amount.to_string()).red(),
        };

        println!(
            "{:10} | {:40} | {:>12} | {}",
            date,
            style(&transaction.description).bright().white(),
            amount,
            style(&transaction.memo).dim()
        );
    }

    println!(
        "{} transactions, net {}",
        style(ofx.transactions.len()).bright().cyan(),
        style(ofx.balance()).bright().cyan()
    );
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let config = ParserConfig::load_default().wrap_err("Failed to load config")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        bail!("Usage: ofx-dump <FILE>...");
    }

    for (idx, path) in paths.iter().enumerate() {
        println!(
            "{} {}Reading {}...",
            style(format!("[{}/{}]", idx + 1, paths.len())).bold().dim(),
            Emoji("🏦 ", ""),
            path.to_string_lossy()
        );

        let ofx = read_file(path, &config)
            .wrap_err_with(|| format!("Failed to read file: {}", path.to_string_lossy()))?;
        print_statement(&ofx);
    }

    Ok(())
}
