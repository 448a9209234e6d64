//! Simple DCF - discounted-cash-flow valuation from the command line or a
//! local web form.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dcf_common::config::{Config, TerminalBase};
use dcf_common::logging::init_from_config;
use dcf_valuation::dcf::{DcfAnalyzer, DcfAssumptions};
use dcf_valuation::data::YahooFinanceAdapter;
use dcf_valuation::report::{render_text, write_xlsx};
use dcf_valuation::DcfService;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "simple-dcf")]
#[command(version)]
#[command(about = "Simple DCF analysis of a public company's free cash flow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the web form and JSON API
    Serve {
        /// Host to bind to (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (default from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Value a single ticker and print the report
    Analyze {
        /// Ticker symbol, e.g. AAPL
        ticker: String,

        /// Projected growth rate (0.0 - 10.0)
        #[arg(long)]
        growth_rate: Option<f64>,

        /// Required rate of return (0.0 - 1.0)
        #[arg(long)]
        required_rate: Option<f64>,

        /// Perpetual growth rate (0.0 - 1.0)
        #[arg(long)]
        perpetual_rate: Option<f64>,

        /// Terminal value base (projected, historical)
        #[arg(long, value_parser = parse_terminal_base)]
        terminal_base: Option<TerminalBase>,

        /// Write the XLSX workbook
        #[arg(long)]
        export: bool,

        /// Directory for the workbook (default from config)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn parse_terminal_base(s: &str) -> std::result::Result<TerminalBase, String> {
    TerminalBase::parse(s).ok_or_else(|| format!("unknown terminal base '{}' (expected projected or historical)", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_and_validate()?;
    init_from_config(&config.observability);

    tracing::info!("Simple DCF v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            DcfService::new(config).start().await
        }

        Commands::Analyze {
            ticker,
            growth_rate,
            required_rate,
            perpetual_rate,
            terminal_base,
            export,
            output_dir,
        } => {
            let defaults = &config.defaults;
            let assumptions = DcfAssumptions::new(
                growth_rate.unwrap_or(defaults.growth_rate),
                required_rate.unwrap_or(defaults.required_rate),
                perpetual_rate.unwrap_or(defaults.perpetual_rate),
            )
            .with_terminal_base(terminal_base.unwrap_or(defaults.terminal_base));

            let source = Arc::new(YahooFinanceAdapter::from_config(&config.market_data));
            let analyzer = DcfAnalyzer::new(source);

            let report = analyzer
                .analyze(&ticker, assumptions)
                .await
                .with_context(|| format!("Analysis of {} failed", ticker.trim()))?;

            print!("{}", render_text(&report));

            if export {
                let dir = output_dir.unwrap_or_else(|| config.export.output_dir.clone());
                let path = write_xlsx(&report, &dir).context("Failed to write workbook")?;
                println!();
                println!("Workbook written to {}", path.display());
            }

            Ok(())
        }
    }
}
