//! Offline batch scoring (`hsp-studio score`)

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use hsp_common::{BatchTable, Predictor, ReconciliationReport, Result, ScoredBatch};
use tracing::info;

/// Read a CSV table from `reader` and score it, highest score first
pub fn score_reader<R: Read>(predictor: &Predictor, reader: R) -> Result<ScoredBatch> {
    let table = BatchTable::from_csv_reader(reader)?;
    predictor.score_batch(table)
}

/// Score `input`, writing to `output` or stdout when no output is given
///
/// The input is read and scored in full before the output is opened, so a
/// failed run leaves no file behind and `output` may name the input itself.
pub fn score_file(
    predictor: &Predictor,
    input: &Path,
    output: Option<&Path>,
) -> Result<ReconciliationReport> {
    let scored = score_reader(predictor, BufReader::new(File::open(input)?))?;

    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            scored.write_csv(&mut writer)?;
            writer.flush()?;
            info!("Wrote scored table to {}", path.display());
        }
        None => scored.write_csv(io::stdout().lock())?,
    }

    if !scored.report.dropped.is_empty() {
        info!("Columns unknown to the model were ignored: {:?}", scored.report.dropped);
    }
    Ok(scored.report)
}
