//! CLI for assembling analytical base tables.
//!
//! `list` and `info` describe the available tables. Every other subcommand
//! assembles one table from parquet or CSV inputs and writes it to the
//! configured output files.

use abt::{
    AbtConfig, AbtRegistry, Assembler, EtfAbt, FinStatementAbt, IncomeStatementAbt, KeyMetricAbt,
    MissingHistoryPolicy, PiotroskiAbt, PriceAbt, TableSource,
};
use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "abt")]
#[command(about = "Analytical base tables for equity and ETF panels", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all available tables
    List,
    /// Show information about a specific table
    Info {
        /// Table name
        table: String,
    },
    /// Monthly price ABT
    Price {
        /// Monthly prices with adj_close and div_amount
        #[arg(long)]
        prices: PathBuf,
        /// Company overview (sector, industry, ipo_date)
        #[arg(long)]
        company: Option<PathBuf>,
        /// ETF info, every column joined by symbol
        #[arg(long)]
        etf_info: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Quarterly key-metric ABT
    KeyMetrics {
        /// Quarterly key metrics
        #[arg(long)]
        key_metrics: PathBuf,
        /// Company overview
        #[arg(long)]
        company: Option<PathBuf>,
        /// Piotroski ABT output
        #[arg(long)]
        piotroski: Option<PathBuf>,
        /// Price ABT output, for the forward one-year return
        #[arg(long)]
        price_abt: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Merged quarterly financial statements
    FinStatement {
        #[command(flatten)]
        statements: StatementArgs,
        /// Company overview
        #[arg(long)]
        company: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Quarterly Piotroski F-Score
    Piotroski {
        #[command(flatten)]
        statements: StatementArgs,
        /// Rules without prior-year history yield null instead of 0
        #[arg(long)]
        propagate_missing: bool,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Quarterly EPS growth
    IncomeStatement {
        /// Quarterly income statements with eps_qtr
        #[arg(long)]
        income: PathBuf,
        /// Company overview
        #[arg(long)]
        company: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// ETF price ABT with the ETF company overview
    Etf {
        /// Price ABT output for ETFs
        #[arg(long)]
        price_abt: PathBuf,
        /// ETF company overview
        #[arg(long)]
        company: Option<PathBuf>,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct StatementArgs {
    /// Quarterly income statements
    #[arg(long)]
    income: PathBuf,
    /// Quarterly balance sheets
    #[arg(long)]
    balance: PathBuf,
    /// Quarterly cash flow statements
    #[arg(long)]
    cashflow: PathBuf,
}

#[derive(Args)]
struct RunArgs {
    /// JSON run configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Symbols to keep, comma separated
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,
    /// Earliest output date (YYYY-MM-DD)
    #[arg(long)]
    min_date: Option<String>,
    /// Latest output date (YYYY-MM-DD)
    #[arg(long)]
    max_date: Option<String>,
    /// Override the table's look-back buffer
    #[arg(long)]
    buffer_years: Option<u32>,
    /// Output directory
    #[arg(long)]
    outpath: Option<PathBuf>,
    /// Parquet file name inside the output directory
    #[arg(long)]
    parquet: Option<String>,
    /// CSV file name inside the output directory
    #[arg(long)]
    csv: Option<String>,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<AbtConfig> {
        let mut config = match &self.config {
            Some(path) => AbtConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AbtConfig::default(),
        };
        if !self.symbols.is_empty() {
            config.symbols = self.symbols;
        }
        if self.min_date.is_some() {
            config.min_date = self.min_date;
        }
        if self.max_date.is_some() {
            config.max_date = self.max_date;
        }
        if self.buffer_years.is_some() {
            config.buffer_years = self.buffer_years;
        }
        if let Some(dir) = self.outpath {
            config.output.dir = dir;
        }
        if self.parquet.is_some() {
            config.output.parquet = self.parquet;
        }
        if self.csv.is_some() {
            config.output.csv = self.csv;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = AbtRegistry::with_defaults();

    match cli.command {
        Commands::List => list_tables(&registry),
        Commands::Info { table } => show_table_info(&registry, &table)?,
        Commands::Price {
            prices,
            company,
            etf_info,
            run,
        } => {
            let mut abt = PriceAbt::new(TableSource::path(prices), run.into_config()?);
            if let Some(path) = company {
                abt = abt.with_company(TableSource::path(path));
            }
            if let Some(path) = etf_info {
                abt = abt.with_etf_info(TableSource::path(path));
            }
            execute(&abt)?;
        }
        Commands::KeyMetrics {
            key_metrics,
            company,
            piotroski,
            price_abt,
            run,
        } => {
            let mut abt = KeyMetricAbt::new(TableSource::path(key_metrics), run.into_config()?);
            if let Some(path) = company {
                abt = abt.with_company(TableSource::path(path));
            }
            if let Some(path) = piotroski {
                abt = abt.with_piotroski(TableSource::path(path));
            }
            if let Some(path) = price_abt {
                abt = abt.with_price_returns(TableSource::path(path));
            }
            execute(&abt)?;
        }
        Commands::FinStatement {
            statements,
            company,
            run,
        } => {
            let mut abt = FinStatementAbt::new(
                TableSource::path(statements.income),
                TableSource::path(statements.balance),
                TableSource::path(statements.cashflow),
                run.into_config()?,
            );
            if let Some(path) = company {
                abt = abt.with_company(TableSource::path(path));
            }
            execute(&abt)?;
        }
        Commands::Piotroski {
            statements,
            propagate_missing,
            run,
        } => {
            let mut config = run.into_config()?;
            if propagate_missing {
                config.piotroski_policy = MissingHistoryPolicy::Propagate;
            }
            let abt = PiotroskiAbt::new(
                TableSource::path(statements.income),
                TableSource::path(statements.balance),
                TableSource::path(statements.cashflow),
                config,
            );
            execute(&abt)?;
        }
        Commands::IncomeStatement {
            income,
            company,
            run,
        } => {
            let mut abt = IncomeStatementAbt::new(TableSource::path(income), run.into_config()?);
            if let Some(path) = company {
                abt = abt.with_company(TableSource::path(path));
            }
            execute(&abt)?;
        }
        Commands::Etf {
            price_abt,
            company,
            run,
        } => {
            let mut abt = EtfAbt::new(TableSource::path(price_abt), run.into_config()?);
            if let Some(path) = company {
                abt = abt.with_company(TableSource::path(path));
            }
            execute(&abt)?;
        }
    }
    Ok(())
}

/// Assemble, persist and summarize one table.
fn execute(abt: &dyn Assembler) -> anyhow::Result<()> {
    let name = abt.info().name;
    if !abt.config().output.is_enabled() {
        info!(abt = name, "No output file configured, printing a preview only");
    }
    let table = abt.run().with_context(|| format!("assembling {name}"))?;
    println!("{name}: {} rows x {} columns", table.height(), table.width());
    println!("{}", table.head(Some(5)));
    Ok(())
}

/// List all available tables grouped by frequency.
fn list_tables(registry: &AbtRegistry) {
    println!("Available tables ({} total)\n", registry.len());
    for frequency in [abt::Frequency::Monthly, abt::Frequency::Quarterly] {
        println!("{frequency}:");
        for info in registry.by_frequency(frequency) {
            println!("  {} - {}", info.name, info.description);
        }
        println!();
    }
}

/// Show detailed information about a specific table.
fn show_table_info(registry: &AbtRegistry, name: &str) -> anyhow::Result<()> {
    let Some(info) = registry.get(name) else {
        bail!(
            "table '{name}' not found; available tables: {}",
            registry.names().join(", ")
        );
    };

    println!("Table: {}", info.name);
    println!("Description: {}", info.description);
    println!("Frequency: {}", info.frequency);
    println!("Default buffer: {} years", info.default_buffer_years);
    println!("Inputs:");
    for input in info.inputs {
        println!("  - {input}");
    }
    Ok(())
}
