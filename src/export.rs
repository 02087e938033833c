use anyhow::{Context, Result};

use crate::models::SimulationResult;

pub const CSV_FILENAME: &str = "simulation_results.csv";
pub const JSON_FILENAME: &str = "simulation_results.json";

/// Header plus one row. The `timestamp` column only exists when the result has one.
pub fn to_csv(result: &SimulationResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.serialize(result).context("serialize simulation result to csv")?;
    let bytes = wtr.into_inner().context("flush csv writer")?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}

/// A JSON array holding exactly one record.
pub fn to_json(result: &SimulationResult) -> Result<String> {
    serde_json::to_string_pretty(std::slice::from_ref(result))
        .context("serialize simulation result to json")
}
