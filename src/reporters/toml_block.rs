//! `[ranges]` block for `deltacal.toml`

use crate::calibrate::CalibrationResult;
use crate::config::RangesConfig;
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct RangesDocument {
    ranges: RangesConfig,
}

pub fn render(result: &CalibrationResult) -> Result<String> {
    let doc = RangesDocument {
        ranges: RangesConfig {
            aa: (result.aa.range.min, result.aa.range.max),
            aaa: (result.aaa.range.min, result.aaa.range.max),
        },
    };
    let mut out = format!(
        "# Generated by deltacal ({} confidence). Advisory: review before use.\n",
        result.confidence
    );
    out.push_str(&toml::to_string(&doc)?);
    Ok(out)
}
