//! The simulator: timers, emission and fault injection.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::debug;

use rig_j1708::message::MAX_MESSAGE_LEN;
use rig_j1939::id;

use crate::encode::{self, Fault, SA_ENGINE, SA_TRANSMISSION};
use crate::scenario::{Scenario, VehicleState, evolve};

/// Emission periods per parameter group, milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Engine speed (EEC1).
    pub eec1_ms: u64,
    /// Pedal position (EEC2).
    pub eec2_ms: u64,
    /// The slow group: ET1, EFLP1, IC1, TRF1, HOURS.
    pub et1_ms: u64,
    /// Vehicle speed (CCVS).
    pub ccvs_ms: u64,
    /// Fuel rate (LFE).
    pub lfe_ms: u64,
    /// Gears (ETC2).
    pub etc2_ms: u64,
    /// Battery (VEP1).
    pub vep1_ms: u64,
    /// Fuel level (DD).
    pub dd_ms: u64,
    /// Serial engine/transmission broadcasts.
    pub j1708_ms: u64,
}

impl Default for TimingConfig {
    /// Typical drivetrain broadcast rates.
    fn default() -> Self {
        Self {
            eec1_ms: 10,
            eec2_ms: 50,
            et1_ms: 1000,
            ccvs_ms: 100,
            lfe_ms: 100,
            etc2_ms: 100,
            vep1_ms: 1000,
            dd_ms: 1000,
            j1708_ms: 100,
        }
    }
}

/// DM1 period while a fault is active.
pub const DM1_FAULTED_MS: u64 = 1000;
/// DM1 period with no faults.
pub const DM1_CLEAR_MS: u64 = 5000;

/// Consumer of generated traffic.
///
/// The sink timestamps frames itself, the way a driver receive path would.
pub trait SimSink {
    /// One classic CAN frame with a 29-bit identifier.
    fn can_frame(&mut self, id: u32, data: &[u8]);

    /// One complete J1708 message including MID and checksum.
    fn j1708_message(&mut self, _bytes: &[u8]) {}
}

#[derive(Debug, Clone, Copy, Default)]
struct Timers {
    eec1: u64,
    eec2: u64,
    et1: u64,
    ccvs: u64,
    lfe: u64,
    etc2: u64,
    vep1: u64,
    dd: u64,
    dm1: u64,
    j1708: u64,
}

/// Deterministic traffic generator.
pub struct Simulator {
    scenario: Scenario,
    timing: TimingConfig,
    state: VehicleState,
    rng: SmallRng,
    elapsed_ms: u64,
    timers: Timers,
    faults: Vec<Fault>,
    j1708_enabled: bool,
}

impl Simulator {
    /// New simulator; the seed fixes every future noise sample.
    pub fn new(seed: u64) -> Self {
        Self {
            scenario: Scenario::Idle,
            timing: TimingConfig::default(),
            state: VehicleState::default(),
            rng: SmallRng::seed_from_u64(seed),
            elapsed_ms: 0,
            timers: Timers::default(),
            faults: Vec::new(),
            j1708_enabled: true,
        }
    }

    /// Switch scenario; scenario time restarts.
    pub fn set_scenario(&mut self, scenario: Scenario) {
        debug!(?scenario, "scenario change");
        self.scenario = scenario;
        self.elapsed_ms = 0;

        if scenario == Scenario::ColdStart {
            self.state.coolant_temp_c = -10.0;
            self.state.oil_temp_c = -5.0;
            self.state.engine_rpm = 0.0;
            self.state.battery_voltage = 12.4;
        }
        if scenario == Scenario::FaultInjection && self.faults.is_empty() {
            // An overheat on the coolant sensor, the classic demo fault.
            self.trigger_fault(110, 0);
            self.state.coolant_temp_c = 105.0;
        }
    }

    /// Active scenario.
    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Replace the emission periods.
    pub fn set_timing(&mut self, timing: TimingConfig) {
        self.timing = timing;
    }

    /// Current simulated state.
    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Overwrite the state (pair with [`Scenario::Custom`]).
    pub fn set_state(&mut self, state: VehicleState) {
        self.state = state;
    }

    /// Generate J1708 traffic as well as CAN (on by default).
    pub fn enable_j1708(&mut self, enabled: bool) {
        self.j1708_enabled = enabled;
    }

    /// Inject a fault; repeated injection bumps the occurrence count.
    pub fn trigger_fault(&mut self, spn: u32, fmi: u8) {
        if let Some(fault) = self
            .faults
            .iter_mut()
            .find(|f| f.spn == spn && f.fmi == fmi)
        {
            fault.occurrence = fault.occurrence.saturating_add(1);
            return;
        }
        self.faults.push(Fault {
            spn,
            fmi,
            occurrence: 1,
        });
    }

    /// Clear all injected faults.
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Advance simulated time and emit everything that came due.
    pub fn advance(&mut self, delta_ms: u64, sink: &mut dyn SimSink) {
        let delta_s = delta_ms as f32 / 1000.0;
        self.elapsed_ms += delta_ms;

        evolve(
            self.scenario,
            &mut self.state,
            &mut self.rng,
            self.elapsed_ms,
            delta_s,
        );

        let now = self.elapsed_ms;
        let state = self.state;

        if Self::due(&mut self.timers.eec1, now, self.timing.eec1_ms) {
            Self::send(sink, id::pgn::EEC1, SA_ENGINE, &encode::eec1(&state));
        }
        if Self::due(&mut self.timers.eec2, now, self.timing.eec2_ms) {
            Self::send(sink, id::pgn::EEC2, SA_ENGINE, &encode::eec2(&state));
        }
        if Self::due(&mut self.timers.ccvs, now, self.timing.ccvs_ms) {
            Self::send(sink, id::pgn::CCVS, SA_ENGINE, &encode::ccvs(&state));
        }
        if Self::due(&mut self.timers.lfe, now, self.timing.lfe_ms) {
            Self::send(sink, id::pgn::LFE, SA_ENGINE, &encode::lfe(&state));
        }
        if Self::due(&mut self.timers.etc2, now, self.timing.etc2_ms) {
            Self::send(sink, id::pgn::ETC2, SA_TRANSMISSION, &encode::etc2(&state));
        }
        if Self::due(&mut self.timers.vep1, now, self.timing.vep1_ms) {
            Self::send(sink, id::pgn::VEP1, SA_ENGINE, &encode::vep1(&state));
        }
        if Self::due(&mut self.timers.dd, now, self.timing.dd_ms) {
            Self::send(sink, id::pgn::DD, SA_ENGINE, &encode::dd(&state));
        }
        if Self::due(&mut self.timers.et1, now, self.timing.et1_ms) {
            // The slow one-second group travels together.
            Self::send(sink, id::pgn::ET1, SA_ENGINE, &encode::et1(&state));
            Self::send(sink, id::pgn::EFLP1, SA_ENGINE, &encode::eflp1(&state));
            Self::send(sink, id::pgn::IC1, SA_ENGINE, &encode::ic1(&state));
            Self::send(sink, id::pgn::AMB, SA_ENGINE, &encode::amb(&state));
            Self::send(sink, id::pgn::TRF1, SA_TRANSMISSION, &encode::trf1(&state));
            Self::send(sink, id::pgn::HOURS, SA_ENGINE, &encode::hours(&state));
        }

        let dm1_period = if self.faults.is_empty() {
            DM1_CLEAR_MS
        } else {
            DM1_FAULTED_MS
        };
        if Self::due(&mut self.timers.dm1, now, dm1_period) {
            self.emit_dm1(sink);
        }

        if self.j1708_enabled && Self::due(&mut self.timers.j1708, now, self.timing.j1708_ms) {
            let mut buf = [0u8; MAX_MESSAGE_LEN];
            let len = encode::j1708_engine(&state, &mut buf);
            if len > 0 {
                sink.j1708_message(&buf[..len]);
            }
            let len = encode::j1708_transmission(&state, &mut buf);
            if len > 0 {
                sink.j1708_message(&buf[..len]);
            }
        }
    }

    fn emit_dm1(&mut self, sink: &mut dyn SimSink) {
        let mut payload = Vec::new();
        encode::dm1_payload(&self.faults, &mut payload);

        if payload.len() <= 8 {
            Self::send(sink, id::pgn::DM1, SA_ENGINE, &payload);
        } else {
            let mut frames = Vec::new();
            encode::bam_frames(id::pgn::DM1, &payload, SA_ENGINE, &mut frames);
            for frame in frames {
                sink.can_frame(frame.id, &frame.data);
            }
        }
    }

    fn due(last: &mut u64, now: u64, period_ms: u64) -> bool {
        if now.saturating_sub(*last) >= period_ms {
            *last = now;
            true
        } else {
            false
        }
    }

    fn send(sink: &mut dyn SimSink, pgn: u32, source_address: u8, data: &[u8]) {
        sink.can_frame(encode::can_id(pgn, source_address), data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture {
        can: Vec<(u32, Vec<u8>)>,
        j1708: Vec<Vec<u8>>,
    }

    impl SimSink for Capture {
        fn can_frame(&mut self, id: u32, data: &[u8]) {
            self.can.push((id, data.to_vec()));
        }

        fn j1708_message(&mut self, bytes: &[u8]) {
            self.j1708.push(bytes.to_vec());
        }
    }

    fn pgns_of(capture: &Capture) -> Vec<u32> {
        capture
            .can
            .iter()
            .map(|(id, _)| rig_j1939::id::extract_pgn(*id))
            .collect()
    }

    #[test]
    fn emission_periods_are_respected() {
        let mut sim = Simulator::new(1);
        let mut capture = Capture::default();

        // One second in 10 ms steps.
        for _ in 0..100 {
            sim.advance(10, &mut capture);
        }

        let pgns = pgns_of(&capture);
        let count = |p: u32| pgns.iter().filter(|&&x| x == p).count();

        // 100 ticks of 10 ms: EEC1 every tick, CCVS every 10th.
        assert_eq!(count(id::pgn::EEC1), 100);
        assert_eq!(count(id::pgn::CCVS), 10);
        assert_eq!(count(id::pgn::EEC2), 20);
        assert_eq!(count(id::pgn::ET1), 1);
        assert_eq!(count(id::pgn::HOURS), 1);
        // No fault: the 5 s DM1 period has not elapsed yet.
        assert_eq!(count(id::pgn::DM1), 0);

        // Serial side emits two messages per period.
        assert_eq!(capture.j1708.len(), 20);
    }

    #[test]
    fn identical_seeds_produce_identical_traffic() {
        let run = || {
            let mut sim = Simulator::new(42);
            sim.set_scenario(Scenario::City);
            let mut capture = Capture::default();
            for _ in 0..200 {
                sim.advance(50, &mut capture);
            }
            capture.can
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn fault_injection_switches_dm1_to_one_second() {
        let mut sim = Simulator::new(3);
        sim.trigger_fault(110, 0);
        let mut capture = Capture::default();
        for _ in 0..30 {
            sim.advance(100, &mut capture);
        }

        let dm1s = pgns_of(&capture)
            .iter()
            .filter(|&&p| p == id::pgn::DM1)
            .count();
        assert_eq!(dm1s, 3);
    }

    #[test]
    fn multiple_faults_go_out_via_bam() {
        let mut sim = Simulator::new(3);
        sim.trigger_fault(110, 0);
        sim.trigger_fault(100, 1);
        let mut capture = Capture::default();
        for _ in 0..11 {
            sim.advance(100, &mut capture);
        }

        let pgns = pgns_of(&capture);
        assert!(pgns.contains(&id::pgn::TP_CM));
        assert!(pgns.contains(&id::pgn::TP_DT));
        assert!(!pgns.contains(&id::pgn::DM1));
    }

    #[test]
    fn repeated_injection_bumps_occurrence() {
        let mut sim = Simulator::new(0);
        sim.trigger_fault(629, 12);
        sim.trigger_fault(629, 12);
        assert_eq!(sim.faults.len(), 1);
        assert_eq!(sim.faults[0].occurrence, 2);
        sim.clear_faults();
        assert!(sim.faults.is_empty());
    }

    #[test]
    fn fault_scenario_injects_and_overheats() {
        let mut sim = Simulator::new(9);
        sim.set_scenario(Scenario::FaultInjection);
        assert_eq!(sim.faults.len(), 1);
        assert_eq!(sim.faults[0].spn, 110);
        assert!(sim.state().coolant_temp_c >= 100.0);
    }
}
