//! Trial report for inspecting a finished search
//!
//! One CSV row per trial with the optimum flagged, suitable for scatter
//! plots of each hyperparameter against the loss.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::{Hyperparameters, Result};

use super::TrialHistory;

pub fn write_trials_csv<P: AsRef<Path>>(history: &TrialHistory, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    write_trials(history, File::create(path)?)?;

    log::info!("Wrote {} trials to {}", history.len(), path.display());
    Ok(())
}

pub fn write_trials<W: Write>(history: &TrialHistory, out: W) -> Result<()> {
    let best = history.best_index();
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["trial"];
    header.extend(Hyperparameters::NAMES);
    header.extend(["loss", "best"]);
    writer.write_record(&header)?;

    for (i, trial) in history.trials().iter().enumerate() {
        let mut row = vec![(i + 1).to_string()];
        row.extend(trial.params.to_array().iter().map(|v| format!("{:.6}", v)));
        row.push(format!("{:.6}", trial.loss));
        row.push(u8::from(best == Some(i)).to_string());
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
