// SPDX-License-Identifier: MIT OR Apache-2.0
//! `nldp`: headless driver for the NLDP node graph engine.
//!
//! Validates the node layouts listed in the settings file, then builds and
//! cooks a small demo graph, logging each result.

mod settings;

use clap::Parser;
use nldp_graph::{EditorSession, NodeId, NodeLayout, PortId, SessionError};
use settings::{AppSettings, DEFAULT_SETTINGS_FILE};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Headless driver for the NLDP node graph engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Write default settings to the settings path and exit
    #[arg(long)]
    init: bool,

    /// Settings file; defaults apply when it does not exist
    #[arg(default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    if cli.init {
        if let Err(e) = AppSettings::default().save(&cli.settings) {
            eprintln!("Failed to write {}: {e}", cli.settings.display());
            std::process::exit(1);
        }
        println!("Wrote {}", cli.settings.display());
        return;
    }

    let settings = AppSettings::load_or_default(&cli.settings);

    let log_filter = settings
        .as_ref()
        .map_or("info", |settings| settings.log_filter.as_str());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting nldp v{}", env!("CARGO_PKG_VERSION"));

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(path = %cli.settings.display(), "Failed to load settings: {e}");
            std::process::exit(1);
        }
    };

    let invalid = validate_layouts(&settings);

    if let Err(e) = run_demo() {
        tracing::error!("Demo graph failed: {e}");
        std::process::exit(1);
    }

    if invalid > 0 {
        std::process::exit(2);
    }
}

/// Load every configured layout file, returning how many failed
fn validate_layouts(settings: &AppSettings) -> usize {
    let mut invalid = 0;
    for path in &settings.layouts {
        match NodeLayout::load(path) {
            Ok(layout) => tracing::info!(
                path = %path.display(),
                type_id = %layout.type_id,
                rows = layout.rows.len(),
                "Layout valid"
            ),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Invalid layout: {e}");
                invalid += 1;
            }
        }
    }
    invalid
}

/// Build `value + value -> output`, cook it, edit an input and cook again
fn run_demo() -> Result<(), SessionError> {
    let mut session = EditorSession::with_standard_nodes();
    let a = session.add_node("value", [0.0, 0.0])?;
    let b = session.add_node("value", [0.0, 80.0])?;
    let add = session.add_node("add", [200.0, 40.0])?;
    let sink = session.add_node("output", [400.0, 40.0])?;

    session.edit_field(a, 0, "5.0")?;
    session.edit_field(b, 0, "2.0")?;
    session.connect(PortId::new(a, 1), PortId::new(add, 0))?;
    session.connect(PortId::new(b, 1), PortId::new(add, 1))?;
    session.connect(PortId::new(add, 2), PortId::new(sink, 0))?;

    evaluate_and_report(&mut session, sink)?;

    session.edit_field(a, 0, "10.0")?;
    evaluate_and_report(&mut session, sink)?;
    Ok(())
}

fn evaluate_and_report(session: &mut EditorSession, node: NodeId) -> Result<(), SessionError> {
    session.evaluate(node)?;
    let report = session.read_values(node)?;
    tracing::info!("\n{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use nldp_graph::{DataType, NodeCategory, RowLayout};

    #[test]
    fn test_cli_args() {
        Cli::command().debug_assert();

        let cli = Cli::parse_from(["nldp"]);
        assert!(!cli.init);
        assert_eq!(cli.settings, PathBuf::from(DEFAULT_SETTINGS_FILE));

        let cli = Cli::parse_from(["nldp", "--init", "custom.ron"]);
        assert!(cli.init);
        assert_eq!(cli.settings, PathBuf::from("custom.ron"));
    }

    #[test]
    fn test_validate_layouts_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let valid = dir.path().join("scale.ron");
        let invalid = dir.path().join("broken.ron");
        let layout = NodeLayout::new("scale", "Scale", NodeCategory::Math)
            .row(RowLayout::dynamic("Value", DataType::Float, "1.0"))
            .row(RowLayout::output("Output", DataType::Float));
        std::fs::write(&valid, layout.to_ron().unwrap()).unwrap();
        std::fs::write(&invalid, "NodeLayout(type_id: \"broken\"").unwrap();

        let settings = AppSettings {
            log_filter: "info".to_string(),
            layouts: vec![valid, invalid, dir.path().join("missing.ron")],
        };
        assert_eq!(validate_layouts(&settings), 2);

        let settings = AppSettings {
            layouts: settings.layouts[..1].to_vec(),
            ..settings
        };
        assert_eq!(validate_layouts(&settings), 0);
    }

    #[test]
    fn test_demo_graph_runs() {
        run_demo().unwrap();
    }
}
