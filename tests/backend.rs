mod common;

use std::io;
use std::sync::{Arc, Mutex};

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::{rig, Chip, FakeIrq, FakeRadio, FakeSdn, FakeSpi, VirtualDelay};
use fanremote::protocol::{Address, FanCommand, LightCommand, Protocol};
use fanremote::{
    select_backend, Backend, Error, HardwareConfig, Modulator, Outcome, PowerLevel, Transceiver,
    TransceiverConfig,
};

fn missing_hardware() -> HardwareConfig {
    HardwareConfig::new("/nonexistent/spidev9.9", 9999, 9998)
}

#[test]
fn unavailable_bus_selects_dummy() {
    let backend = select_backend(&missing_hardware()).unwrap();

    assert!(backend.is_dummy());
    match backend {
        Backend::Dummy(dummy) => assert!(dummy.reason().contains("unavailable")),
        Backend::Hardware(_) => panic!("hardware claimed without a bus"),
    }
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn fallback_is_logged_as_warning() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let backend =
        tracing::subscriber::with_default(subscriber, || select_backend(&missing_hardware()).unwrap());

    assert!(backend.is_dummy());
    let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("WARN"));
    assert!(logs.contains("Using dummy backend"));
}

#[test]
fn invalid_configuration_is_not_a_fallback() {
    let chip = Rc::new(RefCell::new(Chip::default()));
    let config = TransceiverConfig {
        frequency_khz: 100_000,
        ..TransceiverConfig::default()
    };

    let result: Result<Backend<FakeRadio>, Error> = Backend::probe(|| {
        Transceiver::new(
            FakeSpi(chip.clone()),
            FakeIrq(chip.clone()),
            FakeSdn(chip.clone()),
            VirtualDelay::default(),
            config,
        )
    });

    assert!(matches!(result, Err(Error::InvalidCommand { field: "frequency", .. })));
    assert!(chip.borrow().sdn_history.is_empty());
}

#[test]
fn invalid_configuration_is_rejected_before_opening_the_bus() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let mut config = missing_hardware();
    config.transceiver.poll_interval = Duration::ZERO;

    let result = tracing::subscriber::with_default(subscriber, || select_backend(&config));

    assert!(matches!(
        result,
        Err(Error::InvalidCommand {
            field: "poll interval",
            ..
        })
    ));
    let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(!logs.contains("Using dummy backend"));
}

#[cfg(target_os = "linux")]
#[test]
fn fallback_reason_names_the_os_error() {
    match select_backend(&missing_hardware()).unwrap() {
        Backend::Dummy(dummy) => {
            assert!(dummy.reason().contains("No such file or directory"));
            assert!(!dummy.reason().contains("SPIError"));
        }
        Backend::Hardware(_) => panic!("hardware claimed without a bus"),
    }
}

#[test]
fn selection_is_stable() {
    let config = missing_hardware();

    for _ in 0..3 {
        assert!(select_backend(&config).unwrap().is_dummy());
    }
}

#[test]
fn dummy_reports_success_as_dry_run() {
    let mut backend: Backend<FakeRadio> = Backend::probe(|| {
        Err(Error::HardwareUnavailable {
            resource: "/dev/spidev1.0".into(),
            reason: "permission denied".into(),
        })
    })
    .unwrap();
    let outcome = backend
        .send(
            Address::new(9).unwrap(),
            Protocol::Dumb,
            FanCommand::LightToggle,
            None,
            PowerLevel::default(),
            &Modulator::default(),
        )
        .unwrap();

    assert_eq!(outcome, Outcome::DryRun);
    assert!(backend.is_dummy());
}

#[test]
fn hardware_backend_transmits() {
    let (radio, rig) = rig(Chip::default());
    let mut backend = Backend::probe(|| Ok(radio)).unwrap();

    let outcome = backend
        .send(
            Address::new(14).unwrap(),
            Protocol::Smart,
            FanCommand::Medium,
            Some(LightCommand::On),
            PowerLevel::default(),
            &Modulator::default(),
        )
        .unwrap();

    assert_eq!(outcome, Outcome::Transmitted);
    assert!(!backend.is_dummy());
    assert!(!rig.chip.borrow().fifo.is_empty());
}

#[test]
fn smart_without_light_fails_on_either_backend() {
    let mut dummy = select_backend(&missing_hardware()).unwrap();
    let err = dummy
        .send(
            Address::new(1).unwrap(),
            Protocol::Smart,
            FanCommand::High,
            None,
            PowerLevel::default(),
            &Modulator::default(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCommand { .. }));

    let (radio, rig) = rig(Chip::default());
    let mut hardware = Backend::probe(|| Ok(radio)).unwrap();
    let err = hardware
        .send(
            Address::new(1).unwrap(),
            Protocol::Smart,
            FanCommand::High,
            None,
            PowerLevel::default(),
            &Modulator::default(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCommand { .. }));
    assert_eq!(rig.chip.borrow().transactions, 0);
}

#[test]
fn light_toggle_is_dumb_only() {
    let (radio, rig) = rig(Chip::default());
    let mut backend = Backend::probe(|| Ok(radio)).unwrap();

    let err = backend
        .send(
            Address::new(4).unwrap(),
            Protocol::Smart,
            FanCommand::LightToggle,
            Some(LightCommand::Off),
            PowerLevel::default(),
            &Modulator::default(),
        )
        .unwrap_err();

    assert!(matches!(err, Error::InvalidCommand { .. }));
    assert_eq!(rig.chip.borrow().transactions, 0);
}
