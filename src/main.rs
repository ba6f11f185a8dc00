use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use gaugeread::{BusId, Config, ErrorReport, GaugeError, TelemetrySession, TelemetrySnapshot};
use linux_embedded_hal::I2cdev;
use tokio::time::timeout;

/// Exit status when no fuel gauge could be bound. Partial readings still exit 0.
const EXIT_NOT_FOUND: i32 = 2;
const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Parser)]
#[command(name = "gaugeread", version)]
#[command(about = "Read voltage, state of charge and charge rate from a MAX17048 fuel gauge")]
struct Args {
    /// I2C bus number to use, skipping the cached bus and the bus scan
    #[arg(short, long, env = "GAUGEREAD_BUS")]
    bus: Option<BusId>,

    /// I2C address of the gauge (hex like 0x36 or decimal)
    #[arg(
        short,
        long,
        env = "GAUGEREAD_ADDRESS",
        value_parser = parse_address,
        default_value = "0x36"
    )]
    address: u8,

    /// Directory holding the i2c-N device nodes
    #[arg(long, env = "GAUGEREAD_DEVICE_DIR", default_value = "/dev")]
    device_dir: PathBuf,

    /// File remembering which bus the gauge was last found on
    #[arg(long, env = "GAUGEREAD_CACHE")]
    cache: Option<PathBuf>,

    /// Charge rate in %/hr above which the battery counts as charging
    #[arg(
        long,
        env = "GAUGEREAD_CHARGE_THRESHOLD",
        default_value_t = gaugeread::DEFAULT_CHARGE_THRESHOLD
    )]
    charge_threshold: f64,

    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Keep reading every SECS seconds until interrupted
    #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    watch: Option<u64>,

    /// Give up if binding or a single read takes longer than SECS seconds
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config {
            bus: self.bus,
            address: self.address,
            device_dir: self.device_dir.clone(),
            charge_threshold: self.charge_threshold,
            ..Config::default()
        };
        if let Some(cache) = &self.cache {
            config.cache_path = cache.clone();
        }
        config
    }
}

fn parse_address(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let address = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| e.to_string())?
    } else {
        s.parse().map_err(|e: std::num::ParseIntError| e.to_string())?
    };
    if address > 0x7f {
        return Err(format!("{address:#04x} is not a 7-bit address"));
    }
    Ok(address)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let args = Args::parse();
    let format = args.format;

    let code = match run(args).await {
        Ok(()) => 0,
        Err(err) => {
            log::debug!("{err:?}");
            print_error(format, &err);
            exit_code(&err)
        }
    };

    // Exit straight away rather than wait on a bus read that timed out.
    std::process::exit(code);
}

/// Binding failures anywhere in the error chain mean no gauge; anything else is a plain failure.
fn exit_code(err: &anyhow::Error) -> i32 {
    if err.chain().any(|cause| cause.is::<GaugeError>()) {
        EXIT_NOT_FOUND
    } else {
        EXIT_FAILURE
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let limit = Duration::from_secs(args.timeout);
    let config = args.config();

    let mut session = blocking(limit, move || TelemetrySession::open(&config))
        .await?
        .context("cannot bind the fuel gauge")?;

    let Some(period) = args.watch else {
        let (session, snapshot) = read_cycle(limit, session).await?;
        print_snapshot(args.format, &snapshot)?;
        session.close();
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(period));
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut interrupted => break,
        }
        let (next, snapshot) = read_cycle(limit, session).await?;
        session = next;
        print_snapshot(args.format, &snapshot)?;
    }

    session.close();
    Ok(())
}

/// Run a blocking bus operation off the runtime, bounded by `limit`.
async fn blocking<T, F>(limit: Duration, f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let value = timeout(limit, tokio::task::spawn_blocking(f))
        .await
        .map_err(|_| anyhow!("no response from the fuel gauge within {}s", limit.as_secs()))??;
    Ok(value)
}

async fn read_cycle(
    limit: Duration,
    mut session: TelemetrySession<I2cdev>,
) -> anyhow::Result<(TelemetrySession<I2cdev>, TelemetrySnapshot)> {
    blocking(limit, move || {
        let snapshot = session.read_snapshot();
        (session, snapshot)
    })
    .await
}

// A closed stdout (`gaugeread -w 5 | head -1`) surfaces as an error instead of a panic.
fn emit(out: &mut impl Write, line: impl Display) -> std::io::Result<()> {
    writeln!(out, "{line}")?;
    out.flush()
}

fn write_snapshot(
    out: &mut impl Write,
    format: Format,
    snapshot: &TelemetrySnapshot,
) -> anyhow::Result<()> {
    match format {
        Format::Json => emit(out, serde_json::to_string(snapshot)?),
        Format::Text => emit(out, snapshot),
    }
    .context("cannot write to stdout")
}

fn print_snapshot(format: Format, snapshot: &TelemetrySnapshot) -> anyhow::Result<()> {
    write_snapshot(&mut std::io::stdout().lock(), format, snapshot)
}

fn print_error(format: Format, err: &anyhow::Error) {
    let report = ErrorReport::new(format!("{err:#}"));
    let mut out = std::io::stdout().lock();
    let written = match format {
        Format::Json => match serde_json::to_string(&report) {
            Ok(json) => emit(&mut out, json),
            Err(_) => emit(&mut out, r#"{"error":"unprintable error"}"#),
        },
        Format::Text => emit(&mut out, format!("Error: {}", report.error)),
    };
    if let Err(write_err) = written {
        log::debug!("could not report error: {write_err}");
    }
}
