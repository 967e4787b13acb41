//! Report rendering for simulation results.
//!
//! Consumes a finished [`SimulationResult`] and writes it to any sink. The
//! simulator has no dependency on this crate.

use std::io::Write;

use anyhow::{Context, Result};
use prettytable::format::{FormatBuilder, TableFormat};
use prettytable::{Cell, Row, Table};
use simulator::SimulationResult;
use simulator::core::durations::format_duration;

const SEPARATOR_HEAVY: &str = "================================";
const SEPARATOR_LIGHT: &str = "--------------------------------";

const LEGEND_SIMULATOR: &str = "SIMULATOR";
const LEGEND_TIMEOUT: &str = "TIMEOUT DURATION";
const LEGEND_OUTCOME: &str = "OUTCOME";

const HEADERS: [&str; 6] = ["NAME", "LATENCY", "OVERRUN", "TIME IN", "TIME OUT", "NOTE"];

/// Output format for a rendered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Table,
    Json,
}

/// Render `result` in the requested format.
pub fn render<W: Write>(format: Format, result: &SimulationResult, output: &mut W) -> Result<()> {
    match format {
        Format::Table => render_table(result, output),
        Format::Json => render_json(result, output),
    }
}

/// Write the human-readable table report.
///
/// ```text
/// ================================
/// SIMULATOR:my simulator
/// TIMEOUT DURATION:100ms
/// OUTCOME:halted by timeout
/// --------------------------------
/// NAME   |LATENCY |OVERRUN |TIME IN |TIME OUT |NOTE                        |
/// func 1 |10ms    |false   |100ms   |90ms     |budget 20ms                 |
/// ...
/// ================================
/// ```
pub fn render_table<W: Write>(result: &SimulationResult, output: &mut W) -> Result<()> {
    let mut table = Table::new();
    table.set_format(cell_format());
    table.add_row(Row::new(HEADERS.iter().map(|header| Cell::new(header)).collect()));
    for record in &result.records {
        table.add_row(Row::new(vec![
            Cell::new(&record.name),
            Cell::new(&format_duration(record.latency)),
            Cell::new(&record.overran.to_string()),
            Cell::new(&format_duration(record.time_in)),
            Cell::new(&format_duration(record.time_out)),
            Cell::new(&record.remark),
        ]));
    }

    writeln!(output, "{SEPARATOR_HEAVY}").context("write report")?;
    writeln!(output, "{LEGEND_SIMULATOR}:{}", result.name).context("write report")?;
    writeln!(output, "{LEGEND_TIMEOUT}:{}", format_duration(result.timeout))
        .context("write report")?;
    writeln!(output, "{LEGEND_OUTCOME}:{}", result.outcome.label()).context("write report")?;
    writeln!(output, "{SEPARATOR_LIGHT}").context("write report")?;
    table.print(output).context("write report table")?;
    writeln!(output, "{SEPARATOR_HEAVY}").context("write report")?;
    output.flush().context("flush report")?;
    Ok(())
}

/// Every cell padded to its column's widest cell plus one space and closed
/// with `|`. No outer left border and no line separators.
fn cell_format() -> TableFormat {
    FormatBuilder::new()
        .column_separator('|')
        .right_border('|')
        .padding(0, 1)
        .build()
}

/// Write the result as pretty-printed JSON with trailing newline.
pub fn render_json<W: Write>(result: &SimulationResult, output: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, result).context("serialize result json")?;
    writeln!(output).context("write report")?;
    output.flush().context("flush report")?;
    Ok(())
}
