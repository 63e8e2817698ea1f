use std::error::Error;
use std::{env, fs};

use log::info;
use trussx::report::render_summary;
use trussx::{
    force, point, AnalysisConfig, LoadCases, Side, SupportKind, Truss, TrussSnapshot,
};

/// Six-panel Pratt truss with a 10 kN load on every bottom chord joint.
fn pratt_truss() -> Result<Truss, Box<dyn Error>> {
    let mut truss = Truss::new();
    let bottom: Vec<_> = (0..=6)
        .map(|i| truss.add_joint(point(3.0 * f64::from(i), 0.0)))
        .collect();
    let top: Vec<_> = (1..=5)
        .map(|i| truss.add_joint(point(3.0 * f64::from(i), 4.0)))
        .collect();

    for pair in bottom.windows(2) {
        truss.add_bar(pair[0], pair[1])?;
    }
    for pair in top.windows(2) {
        truss.add_bar(pair[0], pair[1])?;
    }
    truss.add_bar(bottom[0], top[0])?;
    truss.add_bar(bottom[6], top[4])?;
    for (i, &joint) in top.iter().enumerate() {
        truss.add_bar(bottom[i + 1], joint)?;
    }
    // Diagonals slope down towards mid-span.
    truss.add_bar(top[0], bottom[2])?;
    truss.add_bar(top[1], bottom[3])?;
    truss.add_bar(top[3], bottom[3])?;
    truss.add_bar(top[4], bottom[4])?;

    truss.set_properties_for_all(0.005, 200.0e9)?;
    truss.set_support(bottom[0], SupportKind::Fixed(Side::Bottom))?;
    truss.set_support(bottom[6], SupportKind::Roller(Side::Bottom))?;
    for &joint in &bottom[1..6] {
        truss.add_joint_load(joint, force(0.0, -10_000.0), "bottom chord")?;
    }
    Ok(truss)
}

/// Analyse the Pratt truss, or a snapshot and config read from the paths given.
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // Optional arguments: a JSON snapshot and a JSON configuration.
    let mut args = env::args().skip(1);
    let snapshot = match args.next() {
        Some(path) => {
            info!("reading snapshot from {path}");
            serde_json::from_str::<TrussSnapshot>(&fs::read_to_string(path)?)?
        }
        None => pratt_truss()?.snapshot(),
    };
    let config = match args.next() {
        Some(path) => AnalysisConfig::from_json(&fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };

    let stability = trussx::checker::check(&snapshot, &config);
    let results = if stability.stable {
        Some(trussx::analysis::analyze(
            &snapshot,
            &LoadCases::default(),
            &config,
        )?)
    } else {
        None
    };

    print!("{}", render_summary(&stability, results.as_ref(), &config.units));
    Ok(())
}
