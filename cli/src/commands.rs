//! CLI command implementations.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use report::Format;
use simulator::io::scenario::{ScenarioFile, discover_scenarios};
use tracing::{debug, info};

/// Run a scenario and render its result to stdout.
pub async fn run_scenario(path: &Path, format: Format) -> Result<()> {
    let scenario = ScenarioFile::load(path).context("load scenario")?;
    let mut simulator = scenario.to_simulator();
    info!(scenario = %path.display(), name = simulator.name(), "running scenario");

    let result = simulator.run().await;
    debug!(
        outcome = result.outcome.label(),
        executed = result.executed(),
        overran = result.overran(),
        "scenario finished"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::render(format, &result, &mut out).context("render report")?;
    Ok(())
}

/// Load and validate a scenario without running it.
pub fn validate_scenario(path: &Path) -> Result<()> {
    let scenario = ScenarioFile::load(path).context("load scenario")?;
    println!("ok {}", scenario.simulator.name);
    Ok(())
}

/// List all scenarios in a directory.
pub fn list_scenarios(dir: &Path) -> Result<()> {
    let scenarios = discover_scenarios(dir)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for found in scenarios {
        writeln!(
            out,
            "{} {} {} tasks",
            found.id,
            found.scenario.simulator.name,
            found.scenario.tasks.len()
        )
        .context("write scenario list")?;
    }
    Ok(())
}
