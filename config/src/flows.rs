use eyre::{
    bail,
    Context as _,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    io,
    path::Path,
};

/// A process group analyzed in batch mode, together with the name its results are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEntry {
    pub id: String,
    pub flow_name: String,
}

/// Reads `id,flow_name` rows. Blank lines are skipped, surrounding whitespace is trimmed.
pub fn read_flows<R: io::Read>(reader: R) -> Result<Vec<FlowEntry>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut flows = Vec::new();
    for (index, record) in reader.deserialize::<FlowEntry>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let flow = record.wrap_err_with(|| format!("Invalid flow entry on line {line}"))?;
        if flow.id.is_empty() {
            bail!("Flow entry on line {line} has no process group id");
        }
        flows.push(flow);
    }
    Ok(flows)
}

pub fn load_flows(path: &Path) -> Result<Vec<FlowEntry>> {
    let file = std::fs::File::open(path).wrap_err_with(|| format!("Failed to open flows file {:?}", path))?;
    let flows = read_flows(file).wrap_err_with(|| format!("Failed to read flows file {:?}", path))?;
    debug!(path = %path.display(), count = flows.len(), "Loaded flows");
    Ok(flows)
}
