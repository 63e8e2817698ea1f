use trussx::{force, point, AnalysisConfig, LoadCases, Side, SupportKind, Truss};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut truss = Truss::new();
    let a = truss.add_joint(point(0.0, 0.0));
    let b = truss.add_joint(point(4.0, 0.0));
    let c = truss.add_joint(point(2.0, 2.0));
    truss.add_bar(a, b)?;
    truss.add_bar(b, c)?;
    truss.add_bar(a, c)?;
    truss.set_properties_for_all(0.01, 200.0e9)?;
    truss.set_support(a, SupportKind::Fixed(Side::Bottom))?;
    truss.set_support(b, SupportKind::Roller(Side::Bottom))?;
    truss.add_joint_load(c, force(0.0, -1_000.0), "apex")?;

    let config = AnalysisConfig::default();
    let report = truss.check(&config);
    println!("{}", report.note);

    let results = truss.analyze(&LoadCases::default(), &config)?;
    let apex = results.joint_deflections[2];
    println!("apex: dx = {:.3e} m, dy = {:.3e} m", apex.x, apex.y);
    for (index, force) in results.bar_forces.iter().enumerate() {
        println!("bar {}: {force:+.1} N", index + 1);
    }

    Ok(())
}
