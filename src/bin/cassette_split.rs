//! Splits a monolithic cassette YAML file into per-port cassette files.
//!
//! Usage: `cassette_split <input.yaml> <output_dir>`
//!
//! Writes `<output_dir>/<port>.cassette.yaml`, the layout
//! `CassetteConfig::from_dir` picks up.

use std::collections::BTreeMap;
use std::path::Path;
use std::{env, fs, process};

use chrono::Utc;
use gitdiagram::cassette::config::CassetteConfig;
use gitdiagram::cassette::format::Interaction;

/// A per-port cassette that links back to the original recording session.
#[derive(serde::Serialize)]
struct PerPortCassette {
    name: String,
    recorded_at: chrono::DateTime<Utc>,
    version: String,
    source_session: String,
    interactions: Vec<Interaction>,
}

fn split_cassette(input: &Path, output_dir: &Path) -> Result<Vec<String>, String> {
    let cassette = CassetteConfig::read_cassette(input)?;

    let mut by_port: BTreeMap<String, Vec<Interaction>> = BTreeMap::new();
    for interaction in &cassette.interactions {
        by_port.entry(interaction.port.clone()).or_default().push(interaction.clone());
    }

    fs::create_dir_all(output_dir)
        .map_err(|e| format!("Failed to create {}: {e}", output_dir.display()))?;

    let mut written = Vec::new();
    for (port_name, interactions) in by_port {
        // Renumber sequences starting from 0
        let renumbered: Vec<Interaction> = interactions
            .into_iter()
            .zip(0..)
            .map(|(orig, seq)| Interaction { seq, ..orig })
            .collect();

        let per_port = PerPortCassette {
            name: format!("{}-{port_name}", cassette.name),
            recorded_at: cassette.recorded_at,
            version: cassette.version.clone(),
            source_session: cassette.name.clone(),
            interactions: renumbered,
        };

        let file_path = output_dir.join(format!("{port_name}.cassette.yaml"));
        let yaml = serde_yaml::to_string(&per_port)
            .map_err(|e| format!("Failed to serialize cassette for port {port_name}: {e}"))?;
        fs::write(&file_path, yaml)
            .map_err(|e| format!("Failed to write {}: {e}", file_path.display()))?;

        println!("Wrote {}", file_path.display());
        written.push(port_name);
    }

    Ok(written)
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: cassette_split <input.yaml> <output_dir>");
        process::exit(1);
    }

    if let Err(e) = split_cassette(Path::new(&args[1]), Path::new(&args[2])) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
