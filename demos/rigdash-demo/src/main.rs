//! Drive the whole pipeline without a truck: scenario generator in,
//! parameter store, watch list and persistent storage out.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;

use rigdash_core::units;
use rigdash_core::{
    AlertLevel, DiagEvent, J1708Ingest, J1939Ingest, ParamId, ParamStore, Source, WatchList,
};
use rigdash_sim::{Scenario, SimSink, Simulator};
use rigdash_store::{JsonFileBackend, MemBackend, Storage, TripId};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioArg {
    Idle,
    Highway,
    City,
    ColdStart,
    Acceleration,
    Fault,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::Idle => Scenario::Idle,
            ScenarioArg::Highway => Scenario::Highway,
            ScenarioArg::City => Scenario::City,
            ScenarioArg::ColdStart => Scenario::ColdStart,
            ScenarioArg::Acceleration => Scenario::Acceleration,
            ScenarioArg::Fault => Scenario::FaultInjection,
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "Run the rigdash data core against simulated bus traffic")]
struct Args {
    /// Driving scenario to simulate.
    #[arg(long, value_enum, default_value = "highway")]
    scenario: ScenarioArg,

    /// Seed for the scenario noise.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Simulated duration in milliseconds.
    #[arg(long, default_value_t = 60_000)]
    duration_ms: u64,

    /// Persist state to this JSON file instead of memory.
    #[arg(long)]
    state_file: Option<std::path::PathBuf>,
}

/// Everything the receive contexts share.
struct Dashboard {
    store: ParamStore,
    can: J1939Ingest,
    serial: J1708Ingest,
    now_ms: u64,
    serial_ms: u64,
    dtc_events: Vec<DiagEvent>,
}

struct Sink<'a> {
    dash: &'a mut Dashboard,
    now: u64,
}

impl SimSink for Sink<'_> {
    fn can_frame(&mut self, id: u32, data: &[u8]) {
        let d = &mut self.dash;
        if let Some(event) = d.can.handle_raw(id, data, self.now, &mut d.store) {
            d.dtc_events.push(event);
        }
    }

    fn j1708_message(&mut self, bytes: &[u8]) {
        let d = &mut self.dash;
        d.serial_ms = d.serial_ms.max(self.now).max(d.serial_ms + 12);
        for &byte in bytes {
            d.serial.push_byte(byte, d.serial_ms, &mut d.store);
            d.serial_ms += 1;
        }
    }
}

fn run<B: rigdash_store::Backend>(args: &Args, mut storage: Storage<B>) -> Result<()> {
    let mut sim = Simulator::new(args.seed);
    sim.set_scenario(args.scenario.into());

    let mut dash = Dashboard {
        store: ParamStore::new(),
        can: J1939Ingest::new(),
        serial: J1708Ingest::new(),
        now_ms: 0,
        serial_ms: 0,
        dtc_events: Vec::new(),
    };
    let mut watch = WatchList::new();
    watch.setup_defaults();

    if !storage.previous_shutdown_clean() {
        info!(
            crashes = storage.system().crash_count,
            "previous run did not shut down cleanly"
        );
    }
    storage.trip_reset(TripId::A, 0);

    const TICK_MS: u64 = 10;
    let mut last_odometer = sim.state().odometer_km;
    let mut last_fuel_time = 0u64;

    while dash.now_ms < args.duration_ms {
        dash.now_ms += TICK_MS;
        let now = dash.now_ms;
        sim.advance(TICK_MS, &mut Sink { dash: &mut dash, now });

        // The 100 ms display/compute tick.
        if now % 100 == 0 {
            compute_derived(&mut dash.store, now);
            watch.update(&dash.store);
        }

        // The storage tick: fold in what the truck moved and burned.
        if now % 1000 == 0 {
            let odometer = sim.state().odometer_km;
            let distance_delta = odometer - last_odometer;
            last_odometer = odometer;

            let fuel_delta = dash
                .store
                .get(ParamId::FuelRate)
                .map_or(0.0, |lph| lph * ((now - last_fuel_time) as f32 / 3_600_000.0));
            last_fuel_time = now;

            storage.periodic_update(now, distance_delta, fuel_delta)?;
            storage.trip_update(TripId::A, distance_delta, fuel_delta, 1);

            if let Some(hours) = dash.store.get(ParamId::EngineHours) {
                storage.set_engine_hours(hours);
            }
        }

        // Persist any diagnostics that arrived this tick.
        for event in dash.dtc_events.drain(..) {
            let (dtcs, active) = match &event {
                DiagEvent::Active { dtcs, .. } => (dtcs, true),
                DiagEvent::Historic { dtcs } => (dtcs, false),
            };
            for dtc in dtcs {
                storage.dtc_store(dtc.spn, dtc.fmi, dtc.source_address, now / 1000, active);
            }
        }
    }

    report(&dash, &watch, &storage);
    storage.shutdown()?;
    info!("clean shutdown recorded");
    Ok(())
}

/// Derived parameters live outside the core: the store is their sink,
/// not their producer.
fn compute_derived(store: &mut ParamStore, now_ms: u64) {
    if let (Some(speed), Some(rate)) = (
        store.get(ParamId::VehicleSpeed),
        store.get(ParamId::FuelRate),
    ) && rate > 0.1
        && speed > 1.0
    {
        let mpg = units::km_per_l_to_mpg(speed / rate);
        store.update(ParamId::CurrentMpg, mpg, Source::Computed, now_ms);
    }

    if let Some(speed) = store.get(ParamId::VehicleSpeed) {
        store.update(
            ParamId::SpeedMph,
            units::kmh_to_mph(speed),
            Source::Computed,
            now_ms,
        );
    }
    if let Some(coolant) = store.get(ParamId::CoolantTemp) {
        store.update(
            ParamId::CoolantTempF,
            units::c_to_f(coolant),
            Source::Computed,
            now_ms,
        );
    }
}

fn report<B: rigdash_store::Backend>(dash: &Dashboard, watch: &WatchList, storage: &Storage<B>) {
    let (valid, updates) = dash.store.stats();
    let (frames, can_errors) = dash.can.counters();
    let (messages, _) = dash.serial.counters();
    println!("--- rigdash summary ---");
    println!("CAN frames: {frames} ({can_errors} malformed), J1708 messages: {messages}");
    println!("parameters valid: {valid}, store updates: {updates}");

    for page in 0..4 {
        for item in watch.page_items(page) {
            let value = dash
                .store
                .get(item.param)
                .map_or_else(|| "---".to_string(), |v| format!("{v:.1}"));
            let marker = match item.alert {
                AlertLevel::Critical => " [CRIT]",
                AlertLevel::Warning => " [WARN]",
                _ => "",
            };
            println!(
                "  p{page} {label:>20}: {value} {unit}{marker}",
                label = item.label(),
                unit = item.unit(),
            );
        }
    }

    let trip = storage.trip(TripId::A);
    println!(
        "trip A: {:.2} km, {:.2} L, avg {:.1} km/h",
        trip.distance_km, trip.fuel_used_l, trip.avg_speed_kmh
    );
    println!(
        "history: {} stored codes, {} active",
        storage.dtc_history().len(),
        storage.active_dtc_count()
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    match &args.state_file {
        Some(path) => {
            let backend = JsonFileBackend::open(path)?;
            run(&args, Storage::open(backend)?)
        }
        None => run(&args, Storage::open(MemBackend::new())?),
    }
}
