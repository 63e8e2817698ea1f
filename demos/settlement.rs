use trussx::{point, AnalysisConfig, LoadCases, Side, SupportKind, Truss};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Two spans on three supports: one support more than statics needs.
    let mut truss = Truss::new();
    let joints: Vec<_> = [(0.0, 0.0), (4.0, 0.0), (2.0, 2.0), (8.0, 0.0), (6.0, 2.0)]
        .into_iter()
        .map(|(x, y)| truss.add_joint(point(x, y)))
        .collect();
    for (start, end) in [(0, 1), (1, 2), (0, 2), (1, 3), (3, 4), (1, 4), (2, 4)] {
        truss.add_bar(joints[start], joints[end])?;
    }
    truss.set_properties_for_all(0.002, 200.0e9)?;
    truss.set_support(joints[0], SupportKind::Fixed(Side::Bottom))?;
    truss.set_support(joints[1], SupportKind::Roller(Side::Bottom))?;
    let end = truss.set_support(joints[3], SupportKind::Roller(Side::Bottom))?;

    let config = AnalysisConfig::default();
    let report = truss.check(&config);
    println!("{}", report.note);

    // Settlements are only accepted on redundant supports of a checked truss.
    truss.add_settlement(end, 0.005)?;
    let results = truss.analyze(&LoadCases::default().with_settlements(), &config)?;

    for (index, force) in results.bar_forces.iter().enumerate() {
        println!("bar {}: {force:+.1} N", index + 1);
    }
    for (index, reaction) in results.support_reactions.iter().enumerate() {
        println!("support {}: Ry = {:+.1} N", index + 1, reaction.y);
    }
    println!("{}", results.note);

    Ok(())
}
