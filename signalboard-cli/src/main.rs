//! Signalboard CLI: analyze symbols, print market summaries, manage config.
//!
//! Commands:
//! - `analyze`: run indicators, risk and recommendation for each symbol
//! - `summary`: price range, volume and volatility per symbol, optionally
//!   followed by the sector performance table
//! - `config init`: write a default TOML config
//!
//! Logs go to stderr (`RUST_LOG` overrides the filter); stdout carries only
//! the report.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use signalboard_core::{IndicatorName, Interval, MarketSummary, Period, SectorPerformance};
use signalboard_runner::export::batch_to_json;
use signalboard_runner::{
    export_csv, export_json, BatchReport, Pipeline, PipelineConfig, SourceKind, SymbolOutcome,
    SymbolReport, TracingObserver,
};

#[derive(Parser)]
#[command(
    name = "signalboard",
    version,
    about = "Technical indicators, risk and trade recommendations per symbol"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the symbols and data come from. Flags override the config file.
#[derive(Args)]
struct SourceArgs {
    /// Symbols to analyze (e.g., AAPL MSFT). Defaults to the config's list.
    symbols: Vec<String>,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lookback period: 1d 5d 1mo 3mo 6mo 1y 2y 5y 10y ytd max.
    #[arg(long)]
    period: Option<Period>,

    /// Bar interval: 1d 1wk 1mo.
    #[arg(long)]
    interval: Option<Interval>,

    /// Market data source: yahoo, csv or synthetic.
    #[arg(long)]
    source: Option<SourceKind>,

    /// Directory of <SYMBOL>.csv files for `--source csv`.
    #[arg(long)]
    csv_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run indicators, risk and recommendation for each symbol.
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        /// Account balance used for VaR and position sizing.
        #[arg(long)]
        balance: Option<f64>,

        /// Ask the advisory service for a second opinion (needs an API key).
        #[arg(long, default_value_t = false)]
        advisory: bool,

        /// Print the full batch as JSON instead of the text report.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write the full batch as JSON to this file.
        #[arg(long)]
        export_json: Option<PathBuf>,

        /// Write one CSV row per symbol to this file.
        #[arg(long)]
        export_csv: Option<PathBuf>,
    },
    /// Print price range, volume and volatility per symbol.
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        /// Also rank the sector ETFs by total return.
        #[arg(long, default_value_t = false)]
        sectors: bool,
    },
    /// Configuration file commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a config file with every default spelled out.
    Init {
        /// Destination path.
        #[arg(default_value = "signalboard.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            source,
            balance,
            advisory,
            json,
            export_json,
            export_csv,
        } => run_analyze(source, balance, advisory, json, export_json, export_csv),
        Commands::Summary { source, sectors } => run_summary(source, sectors),
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => run_config_init(&path, force),
        },
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("signalboard=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(args: SourceArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if !args.symbols.is_empty() {
        config.symbols = args.symbols;
    }
    if let Some(period) = args.period {
        config.period = period;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    if let Some(kind) = args.source {
        config.source.kind = kind;
    }
    if let Some(dir) = args.csv_dir {
        config.source.csv_dir = dir;
    }
    debug!(symbols = ?config.symbols, source = config.source.kind.as_str(), "config resolved");
    Ok(config)
}

fn run_analyze(
    source: SourceArgs,
    balance: Option<f64>,
    advisory: bool,
    json: bool,
    export_json_path: Option<PathBuf>,
    export_csv_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(source)?;
    if let Some(balance) = balance {
        config.account_balance = balance;
    }
    if advisory {
        config.advisory.enabled = true;
    }

    let pipeline = Pipeline::from_config(config)?;
    let batch = pipeline.run(&TracingObserver);

    if json {
        println!("{}", batch_to_json(&batch)?);
    } else {
        print_batch(&batch);
    }

    if let Some(path) = export_json_path {
        export_json(&path, &batch)?;
        eprintln!("JSON written to {}", path.display());
    }
    if let Some(path) = export_csv_path {
        export_csv(&path, &batch)?;
        eprintln!("CSV written to {}", path.display());
    }

    if batch.all_failed() {
        bail!("no symbol could be analyzed ({} failed)", batch.failed);
    }
    Ok(())
}

fn run_summary(source: SourceArgs, sectors: bool) -> Result<()> {
    let mut config = load_config(source)?;
    config.advisory.enabled = false;

    let pipeline = Pipeline::from_config(config)?;
    let batch = pipeline.run(&TracingObserver);

    for outcome in &batch.outcomes {
        match outcome {
            SymbolOutcome::Analyzed(report) => print_summary(&report.symbol, &report.summary),
            SymbolOutcome::Failed { symbol, reason } => println!("{symbol}\n  FAILED: {reason}\n"),
        }
    }

    if sectors {
        print!("{}", sector_table(&pipeline.sector_performance()));
    }

    if batch.all_failed() {
        bail!("no symbol could be summarized ({} failed)", batch.failed);
    }
    Ok(())
}

fn run_config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    PipelineConfig::default().write_to(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

// ─── Text report ────────────────────────────────────────────────────

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn print_batch(batch: &BatchReport) {
    for outcome in &batch.outcomes {
        match outcome {
            SymbolOutcome::Analyzed(report) => print_report(report),
            SymbolOutcome::Failed { symbol, reason } => println!("{symbol}\n  FAILED: {reason}\n"),
        }
    }
    println!(
        "{} analyzed, {} failed (config {})",
        batch.succeeded,
        batch.failed,
        batch.config_hash.short()
    );
}

fn print_report(report: &SymbolReport) {
    let rec = &report.recommendation;
    let risk = &report.risk;
    let ind = &report.indicators;

    println!("{}  {}  (risk: {})", report.symbol, rec.action, risk.risk_level);
    match (report.first_timestamp, report.last_timestamp) {
        (Some(first), Some(last)) => println!(
            "  {} bars, {} to {}",
            report.bars,
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ),
        _ => println!("  no bars"),
    }

    println!(
        "  close {:.2}  RSI {}  SMA 20 {}  SMA 50 {}  SMA 200 {}  EMA 50 {}",
        report.summary.latest_close,
        fmt_value(ind.latest(IndicatorName::Rsi)),
        fmt_value(ind.latest(IndicatorName::Sma20)),
        fmt_value(ind.latest(IndicatorName::Sma50)),
        fmt_value(ind.latest(IndicatorName::Sma200)),
        fmt_value(ind.latest(IndicatorName::Ema50)),
    );
    if let Some(macd) = ind.macd() {
        println!(
            "  MACD {}  signal {}  histogram {}",
            fmt_value(macd.latest_line()),
            fmt_value(macd.latest_signal()),
            fmt_value(macd.latest_histogram()),
        );
    }
    if let Some(bands) = ind.bollinger() {
        println!(
            "  Bollinger {} / {} / {}",
            fmt_value(bands.latest_upper()),
            fmt_value(bands.latest_middle()),
            fmt_value(bands.latest_lower()),
        );
    }
    for (name, reason) in ind.unavailable() {
        println!("  {name}: unavailable ({reason})");
    }

    println!(
        "  volatility {:.1}%  max drawdown {:.1}%  VaR {:.2}  position {:.2} shares",
        risk.volatility * 100.0,
        risk.max_drawdown * 100.0,
        risk.value_at_risk,
        risk.position_size,
    );

    println!("  reasons:");
    for reason in &rec.reasons {
        println!("    - {reason}");
    }
    if let Some(insights) = &rec.ai_insights {
        println!("  insights:");
        for insight in insights {
            println!("    - {insight}");
        }
    }
    if let Some(confidence) = rec.confidence_score {
        println!("  confidence {confidence:.2}");
    }
    println!();
}

fn print_summary(symbol: &str, summary: &MarketSummary) {
    println!("{symbol}  ({})", summary.interval.as_str());
    println!(
        "  close {:.2}  high {:.2}  low {:.2}  average {:.2}",
        summary.latest_close, summary.period_high, summary.period_low, summary.average_close
    );
    println!(
        "  volume {}  average {:.0}  relative {:.2}x",
        summary.recent_volume, summary.average_volume, summary.relative_volume
    );
    println!(
        "  volatility {:.2}% per bar, {:.1}% annualized  largest move {:.2}%",
        summary.bar_volatility_pct, summary.annualized_volatility_pct, summary.max_move_pct
    );
    println!();
}

fn sector_table(rows: &[SectorPerformance]) -> String {
    let mut out = String::from("SECTOR PERFORMANCE\n");
    out.push_str(&format!(
        "  {:<24} {:<6} {:>12} {:>12}\n",
        "Sector", "ETF", "Price", "Return"
    ));
    for row in rows {
        let price = row
            .current_price
            .map_or_else(|| "N/A".to_string(), |p| format!("${p:.2}"));
        let ret = row
            .total_return_pct
            .map_or_else(|| "N/A".to_string(), |r| format!("{r:.2}%"));
        out.push_str(&format!(
            "  {:<24} {:<6} {:>12} {:>12}\n",
            row.sector, row.etf, price, ret
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "signalboard",
            "analyze",
            "nvda",
            "--period",
            "1y",
            "--interval",
            "1wk",
            "--source",
            "synthetic",
        ]);
        let Commands::Analyze { source, .. } = cli.command else {
            panic!("expected analyze");
        };
        let config = load_config(source).unwrap();
        assert_eq!(config.symbols, vec!["nvda"]);
        assert_eq!(config.period, Period::OneYear);
        assert_eq!(config.interval, Interval::Weekly);
        assert_eq!(config.source.kind, SourceKind::Synthetic);
    }

    #[test]
    fn rejects_unknown_period() {
        assert!(Cli::try_parse_from(["signalboard", "summary", "--period", "7w"]).is_err());
    }

    #[test]
    fn config_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("signalboard.toml");

        run_config_init(&path, false).unwrap();
        assert!(run_config_init(&path, false).is_err());
        run_config_init(&path, true).unwrap();
        assert!(PipelineConfig::from_file(&path).is_ok());
    }

    #[test]
    fn summary_accepts_sectors_flag() {
        let cli = Cli::parse_from(["signalboard", "summary", "SPY", "--sectors"]);
        let Commands::Summary { source, sectors } = cli.command else {
            panic!("expected summary");
        };
        assert!(sectors);
        assert_eq!(source.symbols, vec!["SPY"]);
    }

    #[test]
    fn sector_table_marks_missing_rows() {
        let rows = vec![
            SectorPerformance {
                sector: "Technology".into(),
                etf: "XLK".into(),
                current_price: Some(210.5),
                total_return_pct: Some(12.5),
            },
            SectorPerformance {
                sector: "Utilities".into(),
                etf: "XLU".into(),
                current_price: None,
                total_return_pct: None,
            },
        ];
        let table = sector_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("XLK") && lines[2].contains("$210.50") && lines[2].contains("12.50%"));
        assert!(lines[3].contains("XLU") && lines[3].matches("N/A").count() == 2);
    }
}
