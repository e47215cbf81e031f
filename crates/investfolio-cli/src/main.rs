//! InvestFolio CLI - log in to an InvestFolio server and manage holdings
//! from the terminal.
//!
//! Each run restores the stored session, passes the requested view through
//! the route guard and then renders it as plain text.

mod commands;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use investfolio_core::forms::{LoginForm, RegistrationForm, StockForm};
use investfolio_core::guard::{self, GuardDecision};
use investfolio_core::models::UserStock;
use investfolio_core::navigation;
use investfolio_core::utils::{
    format_date, format_datetime, format_money, format_optional, truncate_string,
};
use investfolio_core::{ApiClient, AuthController, Config, Router};

use commands::{Command, USAGE};

/// Log file written next to the stored session
const LOG_FILE: &str = "investfolio.log";

/// Column width for ticker symbols in the holdings table
const TICKER_WIDTH: usize = 10;

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). Output goes to stderr
/// and, when the cache directory is usable, to a log file there.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load()?;
    let _log_guard = init_tracing(config.cache_dir().ok().as_deref());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    info!(api = %config.api_base_url(), "InvestFolio CLI starting");

    let router = Arc::new(Router::new(command.route().unwrap_or(navigation::HOME)));
    let api = ApiClient::new(&config, config.token_store()?)?
        .redirect_on_unauthorized(router.clone());
    let controller = AuthController::new(api, router.clone());

    if command == Command::Health {
        return health(&controller).await;
    }

    controller.initialize().await;
    let follower = tokio::spawn(guard::follow(controller.subscribe(), router.clone()));

    if let Some(route) = command.route() {
        match guard::enforce(route, &controller.state(), router.as_ref()) {
            GuardDecision::Allow => {}
            GuardDecision::Redirect(_) | GuardDecision::Withhold => {
                bail!("Not logged in. Run `investfolio login` first.");
            }
        }
    }

    let result = run(&command, &controller, &mut config).await;
    follower.abort();
    debug!(history = ?router.history(), "Navigation");

    if router.hard_reloads() > 0 {
        eprintln!("Your session has expired. Run `investfolio login` to sign in again.");
    }
    result
}

async fn run(command: &Command, controller: &AuthController, config: &mut Config) -> Result<()> {
    match command {
        Command::Login => login(controller, config).await,
        Command::Register => register(controller, config).await,
        Command::Logout => {
            controller.logout().await;
            println!("Logged out.");
            Ok(())
        }
        Command::WhoAmI => whoami(controller),
        Command::Dashboard => dashboard(controller).await,
        Command::Stocks => {
            let stocks = controller.api().list_user_stocks().await?;
            print_holdings(&stocks);
            Ok(())
        }
        Command::AddStock(args) => {
            let request = StockForm::from(args).validate()?;
            let created = controller.api().create_user_stock(&request).await?;
            println!(
                "Registered {} x {} @ {}",
                created.ticker_symbol,
                created.quantity,
                format_money(created.acquisition_price)
            );
            Ok(())
        }
        Command::Health | Command::Help => Ok(()),
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn prompt(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) => print!("{} [{}]: ", label, value),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    Ok(match default {
        Some(value) if input.is_empty() => value.to_string(),
        _ => input.to_string(),
    })
}

fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("{}: ", label))?;
    Ok(password)
}

/// Remember the email for the next login prompt. Not worth failing over.
fn remember_email(config: &mut Config, email: &str) {
    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

// ============================================================================
// Views
// ============================================================================

async fn login(controller: &AuthController, config: &mut Config) -> Result<()> {
    let form = LoginForm {
        email: prompt("Email", config.last_email.as_deref())?,
        password: prompt_password("Password")?,
    };
    form.validate()?;

    let user = controller.login(form.email.trim(), &form.password).await?;
    remember_email(config, &user.email);
    println!("Welcome, {}!", user.display_name());
    Ok(())
}

async fn register(controller: &AuthController, config: &mut Config) -> Result<()> {
    let form = RegistrationForm {
        name: prompt("Full name", None)?,
        email: prompt("Email", None)?,
        password: prompt_password("Password")?,
        confirm_password: prompt_password("Confirm password")?,
    };
    let request = form.validate()?;

    let user = controller.register(&request).await?;
    remember_email(config, &user.email);
    println!("Account created. Welcome, {}!", user.display_name());
    Ok(())
}

fn whoami(controller: &AuthController) -> Result<()> {
    let session = controller.session();
    let Some(user) = session.user else {
        bail!("Not logged in.");
    };
    println!("[{}] {} <{}>", user.initial(), user.display_name(), user.email);
    println!("  username:  {}", user.username);
    println!("  full name: {}", format_optional(user.full_name.as_deref(), "-"));
    if let Some(created) = user.created_at.as_deref() {
        println!("  joined:    {}", format_date(created));
    }
    Ok(())
}

async fn dashboard(controller: &AuthController) -> Result<()> {
    let api = controller.api();
    let (user, stocks, rate) = futures::join!(
        controller.refresh_user(),
        api.list_user_stocks(),
        api.usd_jpy_rate()
    );
    let user = user?;
    let stocks = stocks?;

    println!("{} ({})", user.display_name(), user.email);
    println!();

    let cost: f64 = stocks
        .iter()
        .map(|s| s.quantity as f64 * s.acquisition_price)
        .sum();
    println!("Holdings:    {}", stocks.len());
    println!("Cost basis:  {}", format_money(cost));

    match rate {
        Ok(rate) => match rate.reference_price() {
            Some(price) => println!("USD/JPY:     {}", format_money(price)),
            None => println!("USD/JPY:     -"),
        },
        Err(e) => {
            warn!(error = %e, "Exchange rate fetch failed");
            println!("USD/JPY:     unavailable");
        }
    }
    Ok(())
}

fn print_holdings(stocks: &[UserStock]) {
    if stocks.is_empty() {
        println!("No holdings yet. Add one with `investfolio stocks add TICKER QTY PRICE`.");
        return;
    }

    println!(
        "{:<width$} {:>10} {:>14} {:>16}  {}",
        "TICKER",
        "QTY",
        "PRICE",
        "COST",
        "ADDED",
        width = TICKER_WIDTH
    );
    for stock in stocks {
        println!(
            "{:<width$} {:>10} {:>14} {:>16}  {}",
            truncate_string(&stock.ticker_symbol, TICKER_WIDTH),
            stock.quantity,
            format_money(stock.acquisition_price),
            format_money(stock.quantity as f64 * stock.acquisition_price),
            stock.created_at.as_deref().map(format_datetime).unwrap_or_default(),
            width = TICKER_WIDTH
        );
    }
}

async fn health(controller: &AuthController) -> Result<()> {
    let status = controller.api().health().await?;
    println!(
        "{} is {} ({})",
        status.service,
        status.status,
        format_datetime(&status.timestamp)
    );
    if !status.is_healthy() {
        bail!("Server reported status {}", status.status);
    }
    Ok(())
}
