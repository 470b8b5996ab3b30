use crate::{
    constants::VAR_BIAS_M2,
    navigation::{Parameter, VariableKey},
    prelude::{
        AmbiguityFixMode, Config, Constellation, Error, Observable, PPPSolver, Profile, SV,
    },
    tests::{epoch, gps_sats, init_logger, Scenario, SyntheticSat, APRIORI_ECEF_M},
};

#[test]
fn static_convergence() {
    init_logger();

    let cfg = Config::static_preset(AmbiguityFixMode::Ils);
    let mut solver = PPPSolver::new(&cfg, APRIORI_ECEF_M);

    let scenario = Scenario::new(gps_sats());

    let mut solution = None;
    for i in 0..30 {
        solution = Some(
            solver
                .process(&scenario.epoch_observations(epoch(i)))
                .unwrap(),
        );
    }

    let solution = solution.unwrap();
    let (x0, y0, z0) = APRIORI_ECEF_M;
    let (x, y, z) = solution.position_m;

    assert!((x - x0 - scenario.dx_m.0).abs() < 5.0E-2, "x error: {}", x - x0 - scenario.dx_m.0);
    assert!((y - y0 - scenario.dx_m.1).abs() < 5.0E-2, "y error: {}", y - y0 - scenario.dx_m.1);
    assert!((z - z0 - scenario.dx_m.2).abs() < 5.0E-2, "z error: {}", z - z0 - scenario.dx_m.2);

    assert_eq!(solver.position(), Some(solution.position_m));

    let clock = solution
        .value(Parameter::ClockOffset(Constellation::GPS), None)
        .unwrap();
    assert!((clock - scenario.clock_m).abs() < 0.1, "clock: {}", clock);

    // noise free: postfit residuals vanish
    for ((_, observable), (_, postfit)) in solution.residuals.iter() {
        assert!(postfit.abs() < 1.0E-2, "{} postfit: {}", observable, postfit);
    }

    for sat in scenario.sats.iter() {
        let amb = solution
            .value(
                Parameter::Ambiguity(Observable::IonoFreePhase(sat.dual())),
                Some(sat.sv),
            )
            .unwrap();
        assert!(
            (amb - sat.if_ambiguity_m()).abs() < 0.1,
            "{} ambiguity: {} (expecting {})",
            sat.sv,
            amb,
            sat.if_ambiguity_m()
        );
    }
}

#[test]
fn cycle_slip_starts_new_arc() {
    init_logger();

    let cfg = Config::static_preset(AmbiguityFixMode::Ils);
    let mut solver = PPPSolver::new(&cfg, APRIORI_ECEF_M);
    let scenario = Scenario::new(gps_sats()[..5].to_vec());

    for i in 0..5 {
        solver.process(&scenario.epoch_observations(epoch(i))).unwrap();
    }

    let g02 = SV::new(Constellation::GPS, 2);
    let dual = scenario.sats[1].dual();
    let parameter = Parameter::Ambiguity(Observable::IonoFreePhase(dual));

    let mut observations = scenario.epoch_observations(epoch(5));
    observations
        .satellites
        .get_mut(&g02)
        .unwrap()
        .cycle_slip = true;

    let (prepared, apriori) = solver.pre_compute(&observations).unwrap();

    assert_eq!(prepared.arc(g02), Some(1));

    let old_arc = VariableKey::new(parameter).with_sv(g02).with_arc(0);
    let new_arc = VariableKey::new(parameter).with_sv(g02).with_arc(1);

    assert!(prepared.index.get(&old_arc).is_none());
    let slot = *prepared.index.get(&new_arc).unwrap();

    assert_eq!(apriori.p[(slot, slot)], VAR_BIAS_M2);
    assert_eq!(apriori.x[slot], 0.0);
    for i in 0..prepared.len() {
        if i != slot {
            assert_eq!(apriori.p[(slot, i)], 0.0);
            assert_eq!(apriori.p[(i, slot)], 0.0);
        }
    }

    // the new arc converges again
    solver.process(&observations).unwrap();
    assert!(solver.variable_value(&old_arc).is_none());
    assert!(solver.variable_value(&new_arc).is_some());
}

#[test]
fn failed_epoch_leaves_state_untouched() {
    init_logger();

    let cfg = Config::static_preset(AmbiguityFixMode::Ils);
    let mut solver = PPPSolver::new(&cfg, APRIORI_ECEF_M);
    let scenario = Scenario::new(gps_sats());

    for i in 0..3 {
        solver.process(&scenario.epoch_observations(epoch(i))).unwrap();
    }

    let state = solver.state().unwrap().clone();
    let covariance = solver.covariance().unwrap().clone();
    let keys = solver
        .variables()
        .iter()
        .map(|v| v.key)
        .collect::<Vec<_>>();

    // single satellite in sight
    let lonely = Scenario::new(gps_sats()[..1].to_vec());
    match solver.process(&lonely.epoch_observations(epoch(3))) {
        Err(Error::NotEnoughEquations { found, required }) => {
            assert_eq!(found, 2);
            assert_eq!(required, cfg.solver.min_equations);
        },
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(solver.state(), Some(&state));
    assert_eq!(solver.covariance(), Some(&covariance));
    assert_eq!(
        solver
            .variables()
            .iter()
            .map(|v| v.key)
            .collect::<Vec<_>>(),
        keys
    );

    // next epoch is processed normally
    solver.process(&scenario.epoch_observations(epoch(4))).unwrap();
}

#[test]
fn epochs_must_increase() {
    let cfg = Config::static_preset(AmbiguityFixMode::Round);
    let mut solver = PPPSolver::new(&cfg, APRIORI_ECEF_M);
    let scenario = Scenario::new(gps_sats());

    solver.process(&scenario.epoch_observations(epoch(1))).unwrap();

    for i in [0, 1] {
        assert_eq!(
            solver.process(&scenario.epoch_observations(epoch(i))),
            Err(Error::NonIncreasingEpoch(epoch(i)))
        );
    }

    solver.process(&scenario.epoch_observations(epoch(2))).unwrap();

    solver.reset();
    assert!(solver.state().is_none());
    assert!(solver.variables().is_empty());
    solver.process(&scenario.epoch_observations(epoch(0))).unwrap();
}

#[test]
fn kinematic_and_code_only() {
    init_logger();

    let mut cfg = Config::kinematic_preset(AmbiguityFixMode::Round);
    cfg.code_only = true;
    assert_eq!(cfg.profile, Profile::Kinematic);

    let mut solver = PPPSolver::new(&cfg, APRIORI_ECEF_M);
    let scenario = Scenario::new(gps_sats());

    let solution = solver
        .process(&scenario.epoch_observations(epoch(0)))
        .unwrap();

    assert!(solution
        .variables
        .keys()
        .all(|key| !key.is_ambiguity()));

    assert!(solution
        .residuals
        .keys()
        .all(|(_, observable)| !observable.is_phase()));
}

#[test]
fn stored_epochs() {
    let mut cfg = Config::static_preset(AmbiguityFixMode::Ils);
    cfg.solver.store_epochs = true;

    let mut solver = PPPSolver::new(&cfg, APRIORI_ECEF_M);
    let scenario = Scenario::new(gps_sats());

    for i in 0..4 {
        solver.process(&scenario.epoch_observations(epoch(i))).unwrap();
    }

    assert_eq!(solver.snapshots().len(), 4);

    let snapshot = solver.snapshots().get(&epoch(3)).unwrap();
    assert_eq!(Some(&snapshot.state), solver.state());
    assert_eq!(snapshot.observations.len(), 6);

    let snapshots = solver.take_snapshots();
    assert_eq!(snapshots.len(), 4);
    assert!(solver.snapshots().is_empty());
}

#[test]
fn single_clock_with_inter_system_bias() {
    init_logger();

    let mut cfg = Config::static_preset(AmbiguityFixMode::Ils);
    cfg.solver.inter_system_bias = true;

    let mut sats = gps_sats()[..4].to_vec();
    sats.push(SyntheticSat {
        sv: SV::new(Constellation::Galileo, 3),
        elevation_deg: 70.0,
        azimuth_deg: 45.0,
        n1: 4,
        n2: 1,
    });
    sats.push(SyntheticSat {
        sv: SV::new(Constellation::Galileo, 8),
        elevation_deg: 50.0,
        azimuth_deg: 160.0,
        n1: -6,
        n2: -2,
    });

    let scenario = Scenario::new(sats);
    let mut solver = PPPSolver::new(&cfg, APRIORI_ECEF_M);

    let mut solution = None;
    for i in 0..10 {
        solution = Some(
            solver
                .process(&scenario.epoch_observations(epoch(i)))
                .unwrap(),
        );
    }

    let solution = solution.unwrap();
    assert!(solution
        .find(Parameter::ClockOffset(Constellation::Galileo), None)
        .is_none());

    let clock = solution
        .value(Parameter::ClockOffset(Constellation::GPS), None)
        .unwrap();
    let isb = solution
        .value(Parameter::InterSystemBias(Constellation::Galileo), None)
        .unwrap();

    // both systems share the same clock in this scenario
    assert!((clock - scenario.clock_m).abs() < 0.1, "clock: {}", clock);
    assert!(isb.abs() < 0.1, "isb: {}", isb);
}
