//! JSON reporter

use crate::calibrate::CalibrationResult;
use anyhow::Result;

pub fn render(result: &CalibrationResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
