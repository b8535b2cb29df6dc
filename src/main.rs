use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fanremote::backend::waveform_for;
use fanremote::config::DEFAULT_SPIDEV;
use fanremote::protocol::{Address, FanCommand, LightCommand, Protocol};
use fanremote::{
    select_backend, Backend, HardwareConfig, Modulator, Outcome, PowerLevel, Transmit,
};

/// Send ceiling-fan remote commands with an RFM22 transceiver.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Linux spidev device
    #[arg(short, long, default_value = DEFAULT_SPIDEV)]
    spidev: String,

    /// nIRQ GPIO number
    #[arg(short, long)]
    irq: u64,

    /// Shutdown GPIO number
    #[arg(short = 'n', long)]
    shutdown: u64,

    /// Receiver address, as set on its DIP switches
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=15))]
    address: u8,

    /// Transmit power
    #[arg(
        short,
        long,
        alias = "txpower",
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(0..=7)
    )]
    power: u8,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Debug logging (implies verbose)
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fan-speed-only receivers
    Dumb {
        /// off, low, medium, high or light
        fan: FanCommand,
    },

    /// Receivers with combined fan and light control
    Smart {
        /// off, low, medium or high
        fan: FanCommand,
        /// 0-100, on or off
        light: LightCommand,
    },
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.debug {
            "debug"
        } else if cli.verbose {
            "info"
        } else {
            "warn"
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Build the waveform, then pick a backend with `select` and send it.
fn run<R, S>(cli: &Cli, select: S) -> Result<Outcome>
where
    R: Transmit,
    S: FnOnce(&HardwareConfig) -> fanremote::Result<Backend<R>>,
{
    let address = Address::new(cli.address)?;
    let power = PowerLevel::new(cli.power)?;
    let (protocol, fan, light) = match cli.command {
        Command::Dumb { fan } => (Protocol::Dumb, fan, None),
        Command::Smart { fan, light } => (Protocol::Smart, fan, Some(light)),
    };

    let waveform = waveform_for(protocol, address, fan, light, &Modulator::default())
        .with_context(|| format!("cannot send {} to {} receiver {}", fan, protocol, address))?;

    let config = HardwareConfig::new(&cli.spidev, cli.irq, cli.shutdown);
    let mut backend = select(&config).context("failed to select a backend")?;

    backend
        .transmit(&waveform, power)
        .with_context(|| format!("failed to send {} to {} receiver {}", fan, protocol, address))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli, select_backend)? {
        Outcome::Transmitted => info!("sent to address {}", cli.address),
        Outcome::DryRun => info!("dry run, nothing transmitted"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use fanremote::DummyBackend;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["fanremote", "-i", "17", "-n", "27"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn invalid_command_fails_before_backend_selection() {
        let cli = cli(&["-a", "4", "smart", "light", "50"]);

        let result = run(&cli, |_: &HardwareConfig| -> fanremote::Result<Backend<DummyBackend>> {
            panic!("backend selected for an invalid command")
        });

        assert!(result.is_err());
    }

    #[test]
    fn valid_command_selects_once_and_sends() {
        let cli = cli(&["-a", "9", "-p", "5", "dumb", "low"]);
        let selected = Cell::new(0);

        let outcome = run(&cli, |config: &HardwareConfig| {
            selected.set(selected.get() + 1);
            assert_eq!(config.irq_gpio, 17);
            assert_eq!(config.shutdown_gpio, 27);
            Ok(Backend::<DummyBackend>::Dummy(DummyBackend::new("test")))
        })
        .unwrap();

        assert_eq!(outcome, Outcome::DryRun);
        assert_eq!(selected.get(), 1);
    }
}
