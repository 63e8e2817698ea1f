#![warn(clippy::pedantic)]

use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use petgraph::graph::{EdgeIndex, NodeIndex};
use trussx::progress::{Milestone, ProgressReporter};
use trussx::task::submit_analysis;
use trussx::{
    force, point, AnalysisConfig, AnalysisError, Direction, InfluenceLoad, LoadCases, Side,
    SupportKind, Truss, TrussEditError,
};

const AREA: f64 = 0.002;
const MODULUS: f64 = 200.0e9;

struct TwoSpan {
    truss: Truss,
    joints: Vec<NodeIndex>,
    bars: Vec<EdgeIndex>,
}

/// Two triangles sharing a joint, resting on a pin and two rollers.
fn build_two_span_truss() -> TwoSpan {
    let mut truss = Truss::new();
    let joints: Vec<_> = [(0.0, 0.0), (4.0, 0.0), (2.0, 2.0), (8.0, 0.0), (6.0, 2.0)]
        .into_iter()
        .map(|(x, y)| truss.add_joint(point(x, y)))
        .collect();
    let bars = [(0, 1), (1, 2), (0, 2), (1, 3), (3, 4), (1, 4), (2, 4)]
        .into_iter()
        .map(|(start, end)| {
            truss
                .add_bar(joints[start], joints[end])
                .expect("bar connects distinct joints")
        })
        .collect();
    truss
        .set_properties_for_all(AREA, MODULUS)
        .expect("bar properties assignment succeeds");
    truss
        .set_support(joints[0], SupportKind::Fixed(Side::Bottom))
        .expect("pin assignment succeeds");
    truss
        .set_support(joints[1], SupportKind::Roller(Side::Bottom))
        .expect("roller assignment succeeds");
    truss
        .set_support(joints[3], SupportKind::Roller(Side::Bottom))
        .expect("roller assignment succeeds");
    TwoSpan {
        truss,
        joints,
        bars,
    }
}

/// Simple span with a king post: bottom chord 0-1-2, apex 3.
fn build_king_post_truss() -> (Truss, Vec<NodeIndex>) {
    let mut truss = Truss::new();
    let joints: Vec<_> = [(0.0, 0.0), (4.0, 0.0), (8.0, 0.0), (4.0, 3.0)]
        .into_iter()
        .map(|(x, y)| truss.add_joint(point(x, y)))
        .collect();
    for (start, end) in [(0, 1), (1, 2), (0, 3), (3, 2), (1, 3)] {
        truss
            .add_bar(joints[start], joints[end])
            .expect("bar connects distinct joints");
    }
    truss
        .set_properties_for_all(AREA, MODULUS)
        .expect("bar properties assignment succeeds");
    truss
        .set_support(joints[0], SupportKind::Fixed(Side::Bottom))
        .expect("pin assignment succeeds");
    truss
        .set_support(joints[2], SupportKind::Roller(Side::Bottom))
        .expect("roller assignment succeeds");
    (truss, joints)
}

#[test]
fn zero_loads_give_zero_results_in_every_case() {
    let TwoSpan {
        mut truss,
        joints,
        bars,
    } = build_two_span_truss();
    let report = truss.check(&AnalysisConfig::default());
    assert!(report.stable, "{}", report.note);

    let roller = truss.support_at(joints[3]).expect("roller exists");
    truss
        .add_joint_load(joints[2], force(0.0, 0.0), "apex")
        .expect("joint load assignment succeeds");
    truss
        .add_settlement(roller, 0.0)
        .expect("redundant roller accepts a settlement");
    truss
        .add_thermal_effect(bars[6], 0.0, 1.2e-5)
        .expect("redundant bar accepts a temperature change");
    truss
        .add_fabrication_error(bars[6], 0.0)
        .expect("redundant bar accepts a fabrication error");

    let results = truss
        .analyze(&LoadCases::all_static(), &AnalysisConfig::default())
        .expect("zero-load analysis succeeds");

    assert!(results
        .joint_deflections
        .iter()
        .all(|deflection| deflection.x == 0.0 && deflection.y == 0.0));
    assert!(results.bar_forces.iter().all(|&force| force == 0.0));
    assert!(results
        .support_reactions
        .iter()
        .all(|reaction| reaction.x == 0.0 && reaction.y == 0.0));
    assert!(results.statics.balanced);
    assert!(results.note.contains("sum Fx = 0.000 N"), "{}", results.note);
    assert!(results.note.contains("sum Fy = 0.000 N"), "{}", results.note);
}

#[test]
fn reactions_balance_the_applied_loads() {
    let TwoSpan {
        mut truss, joints, ..
    } = build_two_span_truss();
    truss
        .add_joint_load(joints[2], force(3_000.0, -12_000.0), "left apex")
        .expect("joint load assignment succeeds");
    truss
        .add_joint_load(joints[4], force(0.0, -8_000.0), "right apex")
        .expect("joint load assignment succeeds");

    let results = truss
        .analyze(&LoadCases::default(), &AnalysisConfig::default())
        .expect("analysis succeeds");

    let total_x: f64 = results.support_reactions.iter().map(|r| r.x).sum();
    let total_y: f64 = results.support_reactions.iter().map(|r| r.y).sum();
    assert_relative_eq!(total_x, -3_000.0, max_relative = 1.0e-6);
    assert_relative_eq!(total_y, 20_000.0, max_relative = 1.0e-6);
    assert!(results.statics.balanced, "{}", results.note);
    assert!(results.statics.sum_x.abs() < 1.0e-3);
    assert!(results.statics.sum_y.abs() < 1.0e-3);
}

#[test]
fn settlement_needs_a_check_and_a_redundant_support() {
    let TwoSpan {
        mut truss, joints, ..
    } = build_two_span_truss();
    let roller = truss.support_at(joints[3]).expect("roller exists");
    assert_eq!(
        truss.add_settlement(roller, 0.01),
        Err(TrussEditError::CheckRequired)
    );

    // Without the third support the truss is determinate and nothing may settle.
    truss.remove_support(roller).expect("roller exists");
    truss.check(&AnalysisConfig::default());
    let middle = truss.support_at(joints[1]).expect("middle roller exists");
    assert_eq!(
        truss.add_settlement(middle, 0.01),
        Err(TrussEditError::SettlementNotAllowed(middle))
    );
}

#[test]
fn settlement_of_a_redundant_roller_strains_the_truss() {
    let TwoSpan {
        mut truss, joints, ..
    } = build_two_span_truss();
    truss.check(&AnalysisConfig::default());
    let roller = truss.support_at(joints[3]).expect("roller exists");
    truss
        .add_settlement(roller, 0.005)
        .expect("redundant roller accepts a settlement");

    let results = truss
        .analyze(&LoadCases::default().with_settlements(), &AnalysisConfig::default())
        .expect("settlement analysis succeeds");

    assert_relative_eq!(results.joint_deflections[3].y, -0.005, max_relative = 1.0e-9);
    assert!(results.bar_forces.iter().any(|&force| force.abs() > 1.0));
    let total_y: f64 = results.support_reactions.iter().map(|r| r.y).sum();
    assert!(total_y.abs() < 1.0e-3, "self-equilibrated reactions, got {total_y}");
    assert!(results.statics.balanced, "{}", results.note);
}

#[test]
fn settlement_is_rejected_once_its_support_stops_being_redundant() {
    let TwoSpan {
        mut truss, joints, ..
    } = build_two_span_truss();
    let config = AnalysisConfig::default();
    truss.check(&config);
    let end = truss.support_at(joints[3]).expect("end roller exists");
    truss
        .add_settlement(end, 0.005)
        .expect("redundant roller accepts a settlement");

    let middle = truss.support_at(joints[1]).expect("middle roller exists");
    truss.remove_support(middle).expect("middle roller exists");
    let report = truss.check(&config);
    assert!(report.stable, "{}", report.note);
    assert!(report.redundant_supports.is_empty());

    // The end roller is now the second support of the snapshot.
    assert_eq!(
        truss.analyze(&LoadCases::default().with_settlements(), &config),
        Err(AnalysisError::IneligibleSettlement(1))
    );
    // Without the settlement case the model still solves.
    assert!(truss.analyze(&LoadCases::default(), &config).is_ok());
}

#[test]
fn thermal_effect_is_rejected_once_its_bar_stops_being_redundant() {
    let TwoSpan {
        mut truss, bars, ..
    } = build_two_span_truss();
    let config = AnalysisConfig::default();
    truss.check(&config);
    truss
        .add_thermal_effect(bars[6], 40.0, 1.2e-5)
        .expect("redundant bar accepts a temperature change");
    truss.remove_bar(bars[0]).expect("bar exists");

    // The heated bar moves up one place once the first bar is gone.
    assert_eq!(
        truss.analyze(&LoadCases::default().with_thermal(), &config),
        Err(AnalysisError::NonRedundantBar(5))
    );
}

#[test]
fn unstable_frames_produce_no_results() {
    let mut truss = Truss::new();
    let joints: Vec<_> = [(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (0.0, 3.0)]
        .into_iter()
        .map(|(x, y)| truss.add_joint(point(x, y)))
        .collect();
    for (start, end) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
        truss
            .add_bar(joints[start], joints[end])
            .expect("bar connects distinct joints");
    }
    truss
        .set_properties_for_all(AREA, MODULUS)
        .expect("bar properties assignment succeeds");
    truss
        .set_support(joints[0], SupportKind::Fixed(Side::Bottom))
        .expect("pin assignment succeeds");
    truss
        .set_support(joints[1], SupportKind::Roller(Side::Bottom))
        .expect("roller assignment succeeds");
    // Vertical, so the load is carried without engaging the sway mode.
    truss
        .add_joint_load(joints[2], force(0.0, -1_000.0), "corner")
        .expect("joint load assignment succeeds");

    let outcome = truss.analyze(&LoadCases::default(), &AnalysisConfig::default());
    match outcome {
        Err(AnalysisError::Unstable(note)) => assert!(note.contains("too few bars"), "{note}"),
        other => panic!("square frame without a diagonal must not solve: {other:?}"),
    }
}

#[test]
fn settlement_on_a_side_support_is_rejected_by_analysis() {
    let TwoSpan { truss, .. } = build_two_span_truss();
    let mut snapshot = truss.snapshot();
    snapshot.supports[2].kind = SupportKind::Roller(Side::Left);
    snapshot.loads.settlements.push(trussx::SupportSettlement {
        support: 2,
        settlement: 0.01,
    });

    let outcome = trussx::analysis::analyze(
        &snapshot,
        &LoadCases::default().with_settlements(),
        &AnalysisConfig::default(),
    );
    assert_eq!(outcome, Err(AnalysisError::IneligibleSettlement(2)));
}

#[test]
fn king_post_influence_line_peaks_at_mid_span() {
    let (mut truss, joints) = build_king_post_truss();
    truss
        .add_influence_load(InfluenceLoad {
            name: "axle".to_string(),
            direction: Direction::Forward,
            path: joints[..3].to_vec(),
            magnitudes: vec![10_000.0],
            offsets: vec![0.0],
        })
        .expect("influence load assignment succeeds");

    let results = truss
        .analyze(
            &LoadCases::default().with_influence("axle"),
            &AnalysisConfig::default(),
        )
        .expect("influence analysis succeeds");
    let influence = results.influence.expect("influence result is present");

    assert_eq!(influence.name, "axle");
    assert_eq!(influence.positions, vec![0.0, 4.0, 8.0]);

    // A unit load at mid-span hangs entirely from the king post.
    let post = &influence.ordinates[4];
    assert!(post[0].abs() < 1.0e-9);
    assert_relative_eq!(post[1], 1.0, max_relative = 1.0e-6);
    assert!(post[2].abs() < 1.0e-9);

    // The rafters meet at 3:4:5, so the tie carries 4/6 of the unit load.
    assert_relative_eq!(influence.ordinates[0][1], 2.0 / 3.0, max_relative = 1.0e-6);
    assert_relative_eq!(influence.ordinates[2][1], -5.0 / 6.0, max_relative = 1.0e-6);

    let envelope = &influence.envelopes[4];
    assert_relative_eq!(envelope.max, 10_000.0, max_relative = 1.0e-6);
    assert_eq!(envelope.max_position, "load #1 at joint 2");
    assert!(envelope.min.abs() < 1.0e-6);
}

#[test]
fn influence_ordinates_snap_with_the_configured_tolerance() {
    let (mut truss, joints) = build_king_post_truss();
    truss
        .add_influence_load(InfluenceLoad {
            name: "axle".to_string(),
            direction: Direction::Forward,
            path: joints[..3].to_vec(),
            magnitudes: vec![1.0],
            offsets: vec![0.0],
        })
        .expect("influence load assignment succeeds");
    let mut config = AnalysisConfig::default();
    config.tolerances.ordinate = 0.7;

    let results = truss
        .analyze(&LoadCases::default().with_influence("axle"), &config)
        .expect("influence analysis succeeds");
    let influence = results.influence.expect("influence result is present");

    // The tie ordinate of 2/3 falls below the tolerance; the post ordinate of 1 does not.
    assert_eq!(influence.ordinates[0][1], 0.0);
    assert_relative_eq!(influence.ordinates[4][1], 1.0, max_relative = 1.0e-6);
}

#[test]
fn unknown_influence_load_is_reported() {
    let (truss, _) = build_king_post_truss();
    let outcome = truss.analyze(
        &LoadCases::default().with_influence("missing"),
        &AnalysisConfig::default(),
    );
    assert_eq!(
        outcome,
        Err(AnalysisError::UnknownInfluenceLoad("missing".to_string()))
    );
}

#[test]
fn background_analysis_reports_every_milestone() {
    let (mut truss, joints) = build_king_post_truss();
    truss
        .add_joint_load(joints[3], force(0.0, -6_000.0), "apex")
        .expect("joint load assignment succeeds");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let progress = ProgressReporter::with_callback(Box::new(move |milestone: Milestone| {
        sink.lock().expect("progress log lock").push(milestone.percent());
    }));

    let handle = submit_analysis(
        truss.snapshot(),
        LoadCases::default(),
        AnalysisConfig::default(),
        progress,
    );
    let results = handle.wait().expect("background analysis succeeds");

    assert_relative_eq!(results.support_reactions[0].y, 3_000.0, max_relative = 1.0e-6);
    assert_relative_eq!(results.support_reactions[1].y, 3_000.0, max_relative = 1.0e-6);
    assert_eq!(*seen.lock().expect("progress log lock"), vec![0, 50, 75, 100]);
}
