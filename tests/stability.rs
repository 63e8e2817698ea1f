#![warn(clippy::pedantic)]

use petgraph::graph::{EdgeIndex, NodeIndex};
use trussx::{point, AnalysisConfig, Side, SupportKind, Truss};

fn add_bars(truss: &mut Truss, joints: &[NodeIndex], bars: &[(usize, usize)]) -> Vec<EdgeIndex> {
    bars.iter()
        .map(|&(start, end)| {
            truss
                .add_bar(joints[start], joints[end])
                .expect("bar connects distinct joints")
        })
        .collect()
}

fn build_triangle() -> Truss {
    let mut truss = Truss::new();
    let joints: Vec<_> = [(0.0, 0.0), (4.0, 0.0), (2.0, 2.0)]
        .into_iter()
        .map(|(x, y)| truss.add_joint(point(x, y)))
        .collect();
    add_bars(&mut truss, &joints, &[(0, 1), (1, 2), (0, 2)]);
    truss
        .set_support(joints[0], SupportKind::Fixed(Side::Bottom))
        .expect("pin assignment succeeds");
    truss
        .set_support(joints[1], SupportKind::Roller(Side::Bottom))
        .expect("roller assignment succeeds");
    truss
}

/// Two triangles sharing a joint, resting on a pin and two rollers.
fn build_two_span_truss() -> Truss {
    let mut truss = Truss::new();
    let joints: Vec<_> = [(0.0, 0.0), (4.0, 0.0), (2.0, 2.0), (8.0, 0.0), (6.0, 2.0)]
        .into_iter()
        .map(|(x, y)| truss.add_joint(point(x, y)))
        .collect();
    add_bars(
        &mut truss,
        &joints,
        &[(0, 1), (1, 2), (0, 2), (1, 3), (3, 4), (1, 4), (2, 4)],
    );
    truss
        .set_support(joints[0], SupportKind::Fixed(Side::Bottom))
        .expect("pin assignment succeeds");
    truss
        .set_support(joints[1], SupportKind::Roller(Side::Bottom))
        .expect("roller assignment succeeds");
    truss
        .set_support(joints[3], SupportKind::Roller(Side::Bottom))
        .expect("roller assignment succeeds");
    truss
}

fn reaction_components(truss: &Truss) -> usize {
    truss
        .snapshot()
        .supports
        .iter()
        .map(|support| support.kind.components())
        .sum()
}

#[test]
fn simple_triangle_is_determinate() {
    let mut truss = build_triangle();
    let report = truss.check(&AnalysisConfig::default());

    assert!(report.stable, "{}", report.note);
    assert_eq!(report.indeterminacy, Some(0));
    assert!(report.redundant_bars.is_empty());
    assert!(report.redundant_supports.is_empty());
    assert!(report.note.contains("statically determinate"));
}

#[test]
fn two_joints_are_too_few() {
    let mut truss = Truss::new();
    let a = truss.add_joint(point(0.0, 0.0));
    let b = truss.add_joint(point(3.0, 0.0));
    truss.add_bar(a, b).expect("bar connects distinct joints");
    truss
        .set_support(a, SupportKind::Fixed(Side::Bottom))
        .expect("pin assignment succeeds");

    let report = truss.check(&AnalysisConfig::default());
    assert!(!report.stable);
    assert_eq!(report.indeterminacy, None);
    assert!(report.note.contains("fewer than three joints"), "{}", report.note);
}

#[test]
fn indeterminacy_counts_bars_reactions_and_joints() {
    let mut truss = build_two_span_truss();
    let report = truss.check(&AnalysisConfig::default());
    assert!(report.stable, "{}", report.note);

    let expected = truss.bar_count() + reaction_components(&truss) - 2 * truss.joint_count();
    assert_eq!(report.indeterminacy, Some(expected));
    assert_eq!(expected, 1);
}

#[test]
fn repeated_checks_agree() {
    let mut truss = build_two_span_truss();
    let config = AnalysisConfig::default();
    let first = truss.check(&config);
    let second = truss.check(&config);

    assert_eq!(first, second);
    assert_eq!(truss.last_check(), Some(&second));
}

#[test]
fn removing_any_redundant_bar_keeps_the_truss_stable() {
    let mut truss = build_two_span_truss();
    let config = AnalysisConfig::default();
    let report = truss.check(&config);
    assert!(!report.redundant_bars.is_empty());

    let handles = truss.snapshot().handles;
    for &bar in &report.redundant_bars {
        let mut reduced = truss.clone();
        reduced
            .remove_bar(handles.bars[bar])
            .expect("redundant bar exists");
        let reduced_report = reduced.check(&config);
        assert!(reduced_report.stable, "bar {}: {}", bar + 1, reduced_report.note);
        assert_eq!(reduced_report.indeterminacy, Some(0));
    }
}

#[test]
fn removing_a_redundant_support_keeps_the_truss_stable() {
    let mut truss = build_two_span_truss();
    let config = AnalysisConfig::default();
    let report = truss.check(&config);
    assert!(!report.redundant_supports.is_empty());

    for &support in &report.redundant_supports {
        let mut reduced = truss.clone();
        let handle = truss.snapshot().handles.supports[support];
        reduced.remove_support(handle).expect("redundant support exists");
        let reduced_report = reduced.check(&config);
        assert!(
            reduced_report.stable,
            "support {}: {}",
            support + 1,
            reduced_report.note
        );
    }
}

#[test]
fn editing_discards_the_last_check() {
    let mut truss = build_triangle();
    truss.check(&AnalysisConfig::default());
    assert!(truss.last_check().is_some());

    let extra = truss.add_joint(point(2.0, -2.0));
    assert!(truss.last_check().is_none());

    let report = truss.check(&AnalysisConfig::default());
    assert!(!report.stable, "a loose joint cannot be stable");
    assert!(truss.joint_position(extra).is_some());
}
