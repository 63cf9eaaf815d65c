use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use tokio::runtime::Runtime;

use currency_widget::app::{DUPLICATE_FAVORITE_NOTICE, EMPTY_FAVORITES_TEXT, HISTORY_ERROR_NOTICE};
use currency_widget::{
    convert, format_amount, parse_amount, AddOutcome, Config, CurrencyCode, CurrencyPair,
    Favorite, FavoritesStore, Services, SqliteStore,
};
use currency_widget::history::MAX_HISTORY_DAYS;

#[derive(Parser)]
#[command(name = "currency-widget", version, about = "Currency converter with favorites and rate history")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal UI (default)
    Ui,
    /// Convert an amount once and exit
    Convert {
        amount: String,
        from: String,
        to: String,
    },
    /// List the currencies the rate source supports
    Codes,
    /// Print a rate history for a pair
    History {
        from: String,
        to: String,
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=MAX_HISTORY_DAYS as i64))]
        days: u32,
    },
    /// Manage saved pairs
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    Add { from: String, to: String },
    Remove { pair: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Ui);

    let config = Config::from_env()?;
    init_logging(&config, matches!(command, Commands::Ui));

    if let Some(warning) = config.warning() {
        log::warn!("{}", warning);
        eprintln!("⚠️  {}", warning);
    }

    let runtime = Runtime::new().context("Failed to start async runtime")?;
    let services = Services::from_config(&config);

    match command {
        Commands::Ui => run_ui_mode(&config, &services, &runtime),
        Commands::Convert { amount, from, to } => {
            run_convert(&services, &runtime, &amount, &pair_from(&from, &to)?)
        }
        Commands::Codes => run_codes(&services, &runtime),
        Commands::History { from, to, days } => {
            run_history(&services, &runtime, &pair_from(&from, &to)?, days)
        }
        Commands::Favorites { action } => run_favorites(
            &config,
            &services,
            &runtime,
            action.unwrap_or(FavoritesAction::List),
        ),
    }
}

/// The UI owns the terminal, so it logs to a file; one-shot commands log to stderr
fn init_logging(config: &Config, to_file: bool) {
    let env = env_logger::Env::default().default_filter_or(if to_file { "info" } else { "warn" });
    let mut builder = env_logger::Builder::from_env(env);

    if to_file {
        if let Some(parent) = config.log_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&config.log_file) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", config.log_file.display(), e),
        }
    }

    builder.init();
}

fn pair_from(from: &str, to: &str) -> Result<CurrencyPair> {
    Ok(CurrencyPair::new(CurrencyCode::new(from)?, CurrencyCode::new(to)?))
}

fn run_convert(services: &Services, runtime: &Runtime, amount: &str, pair: &CurrencyPair) -> Result<()> {
    let Some(value) = parse_amount(amount) else {
        bail!("Invalid amount '{}'", amount);
    };

    match runtime.block_on(services.rates.pair_rate(pair)) {
        Ok(rate) => {
            println!(
                "{} {} = {} {}",
                format_amount(value),
                pair.from,
                format_amount(convert(value, rate)),
                pair.to
            );
            println!("1 {} = {} {}", pair.from, rate, pair.to);
        }
        Err(e) => {
            log::error!("Error getting exchange rate: {}", e);
            println!("1 {} = Error", pair.from);
        }
    }
    Ok(())
}

fn run_codes(services: &Services, runtime: &Runtime) -> Result<()> {
    match runtime.block_on(services.rates.supported_codes()) {
        Ok(currencies) => {
            for currency in currencies {
                println!("{}", currency.label());
            }
        }
        Err(e) => {
            log::error!("Error loading currencies: {}", e);
            eprintln!("Failed to load currencies. Please try again later.");
        }
    }
    Ok(())
}

fn run_history(services: &Services, runtime: &Runtime, pair: &CurrencyPair, days: u32) -> Result<()> {
    match runtime.block_on(services.history.series(pair, days)) {
        Ok(series) => {
            println!("{}", series.title());
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for point in &series.points {
                println!("{:>6}  {:.4}", point.label, point.rate);
            }
        }
        Err(e) => {
            log::error!("Error fetching historical data: {}", e);
            eprintln!("{}", HISTORY_ERROR_NOTICE);
        }
    }
    Ok(())
}

fn run_favorites(
    config: &Config,
    services: &Services,
    runtime: &Runtime,
    action: FavoritesAction,
) -> Result<()> {
    let mut favorites = FavoritesStore::load(SqliteStore::open(&config.favorites_db())?)?;

    match action {
        FavoritesAction::List => {
            if favorites.is_empty() {
                println!("{}", EMPTY_FAVORITES_TEXT);
            }
            for fav in favorites.list() {
                println!("{:<10} {}", fav.currency_pair().label(), fav.rate_label());
            }
        }
        FavoritesAction::Add { from, to } => {
            let pair = pair_from(&from, &to)?;
            // Snapshot is best effort, same as saving with "Error" on screen
            let rate = match runtime.block_on(services.rates.pair_rate(&pair)) {
                Ok(rate) => Some(rate),
                Err(e) => {
                    log::warn!("Saving {} without a rate: {}", pair, e);
                    None
                }
            };
            match favorites.add(Favorite::new(&pair, rate))? {
                AddOutcome::Added => println!("★ Added {} to favorites", pair.label()),
                AddOutcome::AlreadyExists => println!("{}", DUPLICATE_FAVORITE_NOTICE),
            }
        }
        FavoritesAction::Remove { pair } => {
            let pair: CurrencyPair = pair.parse()?;
            let removed = favorites.remove(&pair.id())?;
            println!("Removed {} favorite(s)", removed);
        }
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config, services: &Services, runtime: &Runtime) -> Result<()> {
    use currency_widget::App;

    let favorites = FavoritesStore::load(SqliteStore::open(&config.favorites_db())?)?;
    let mut app = App::new(favorites, config.warning());

    println!("Starting UI... (Press 'q' to quit)");
    currency_widget::ui::run_ui(&mut app, services, runtime.handle())?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config, _services: &Services, _runtime: &Runtime) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use a subcommand: currency-widget --help");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_days_is_bounded() {
        let parse = |days: &str| {
            Cli::try_parse_from(["currency-widget", "history", "USD", "EUR", "--days", days])
        };

        assert!(parse("365").is_ok());
        assert!(parse("3650").is_ok());
        assert!(parse("3651").is_err());
        assert!(parse("200000000").is_err());
        assert!(parse("0").is_err());
    }
}
