//! Command-line parsing.
//!
//! Every command that shows a view maps onto the route that view lives at,
//! so the route guard can decide whether it may run.

use anyhow::{anyhow, bail, Context, Result};

use investfolio_core::forms::StockForm;
use investfolio_core::navigation;

pub const USAGE: &str = "\
Usage: investfolio <command>

Commands:
  login                          Log in and remember the session
  register                       Create an account and log in
  logout                         End the session
  whoami                         Show the signed-in user
  dashboard                      Profile, holdings summary and USD/JPY rate
  stocks                         List your holdings
  stocks add TICKER QTY PRICE    Register a holding
  health                         Check the API server
  help                           Show this message

Environment:
  INVESTFOLIO_API_URL            API base URL (default http://localhost:8000)
  RUST_LOG                       Log filter (default warn)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login,
    Register,
    Logout,
    WhoAmI,
    Dashboard,
    Stocks,
    AddStock(StockArgs),
    Health,
    Help,
}

/// Raw `stocks add` arguments, checked by `StockForm` before sending.
#[derive(Debug, Clone, PartialEq)]
pub struct StockArgs {
    pub ticker: String,
    pub quantity: i64,
    pub price: f64,
}

impl From<&StockArgs> for StockForm {
    fn from(args: &StockArgs) -> Self {
        StockForm {
            ticker_symbol: args.ticker.clone(),
            quantity: args.quantity,
            acquisition_price: args.price,
        }
    }
}

impl Command {
    /// Parse the arguments after the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut args = args.iter().map(String::as_str);
        let command = match args.next() {
            None | Some("help") | Some("--help") | Some("-h") => Command::Help,
            Some("login") => Command::Login,
            Some("register") => Command::Register,
            Some("logout") => Command::Logout,
            Some("whoami") => Command::WhoAmI,
            Some("dashboard") => Command::Dashboard,
            Some("health") => Command::Health,
            Some("stocks") => match args.next() {
                None | Some("list") => Command::Stocks,
                Some("add") => {
                    let rest: Vec<&str> = args.by_ref().collect();
                    let [ticker, quantity, price] = rest.as_slice() else {
                        bail!("Usage: investfolio stocks add TICKER QTY PRICE");
                    };
                    return Ok(Command::AddStock(StockArgs {
                        ticker: ticker.to_string(),
                        quantity: quantity
                            .parse()
                            .with_context(|| format!("Invalid quantity: {}", quantity))?,
                        price: price
                            .parse()
                            .with_context(|| format!("Invalid price: {}", price))?,
                    }));
                }
                Some(other) => bail!("Unknown stocks subcommand: {}", other),
            },
            Some(other) => return Err(anyhow!("Unknown command: {}\n\n{}", other, USAGE)),
        };

        if let Some(extra) = args.next() {
            bail!("Unexpected argument: {}", extra);
        }
        Ok(command)
    }

    /// The view this command renders, if any.
    pub fn route(&self) -> Option<&'static str> {
        match self {
            Command::Login => Some(navigation::LOGIN),
            Command::Register => Some(navigation::REGISTER),
            Command::Logout | Command::WhoAmI | Command::Dashboard => Some(navigation::HOME),
            Command::Stocks => Some(navigation::PORTFOLIO),
            Command::AddStock(_) => Some(navigation::STOCK_REGISTRATION),
            Command::Health | Command::Help => None,
        }
    }
}
