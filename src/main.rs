//! Command-line driver: compiles a GeoJSON tile into a routing graph.

mod config;
mod error;
mod export;
mod ingest;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tilegraph_core::TileBuilder;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "tilegraph", version, about = "Builds road-network graphs for map tiles")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a GeoJSON feature collection into a tile graph
    Compile {
        /// Input GeoJSON file
        input: PathBuf,
        /// TOML configuration; defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output JSON file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip the consistency checks after compilation
        #[arg(long)]
        no_validate: bool,
    },
    /// Parse a configuration file and print the effective settings
    CheckConfig { file: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Compile {
            input,
            config,
            output,
            no_validate,
        } => {
            let config = match config {
                Some(path) => Config::load(&path)?,
                None => Config::default(),
            };
            compile(&input, &config, !no_validate, output.as_deref())
        }
        Command::CheckConfig { file } => {
            let config = Config::load(&file)?;
            let tile = config.tile_config(true);
            println!("{}", serde_json::to_string_pretty(&tile)?);
            Ok(())
        }
    }
}

fn compile(
    input: &Path,
    config: &Config,
    validate: bool,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let text = std::fs::read_to_string(input).map_err(|e| CliError::io(input, e))?;
    let mut builder = TileBuilder::new(config.tile_config(validate));
    let report = ingest::load_features(&text, &mut builder)?;
    info!(
        "Read {} features from {} ({} skipped)",
        report.added,
        input.display(),
        report.skipped
    );

    let summary = builder.compile()?;
    info!(
        "Updated {} features, {} did not fit, {} streets built",
        summary.connect.updated,
        summary.connect.did_not_fit.len(),
        summary.streets.streets
    );

    match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| CliError::io(path, e))?;
            let mut writer = BufWriter::new(file);
            export::write_json(&builder, &mut writer)?;
            writer.flush().map_err(|e| CliError::io(path, e))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            export::write_json(&builder, &mut writer)?;
            writeln!(writer).map_err(|e| CliError::io("<stdout>", e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": "Main" },
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [10.0, 0.0]] }
            },
            {
                "type": "Feature",
                "properties": { "name": "Main" },
                "geometry": { "type": "LineString", "coordinates": [[10.0, 0.0], [20.0, 0.0]] }
            }
        ]
    }"#;

    #[test]
    fn compile_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tile.geojson");
        let output = dir.path().join("tile.json");
        std::fs::write(&input, INPUT).unwrap();

        compile(&input, &Config::default(), true, Some(&output)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(value["streets"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["nodes"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = compile(
            &dir.path().join("absent.geojson"),
            &Config::default(),
            true,
            None,
        );
        assert!(matches!(result, Err(CliError::Io { .. })));
    }

    #[test]
    fn cli_parses_compile_flags() {
        let cli = Cli::try_parse_from([
            "tilegraph",
            "compile",
            "in.geojson",
            "-c",
            "tile.toml",
            "--no-validate",
        ])
        .unwrap();
        match cli.command {
            Command::Compile {
                config,
                no_validate,
                output,
                ..
            } => {
                assert_eq!(config, Some(PathBuf::from("tile.toml")));
                assert!(no_validate);
                assert!(output.is_none());
            }
            Command::CheckConfig { .. } => panic!("wrong subcommand"),
        }
    }
}
