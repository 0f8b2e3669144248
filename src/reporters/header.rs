//! C header reporter: the four range constants the firmware compiles in

use crate::calibrate::{CalibrationResult, ClassRecommendation};
use crate::models::CellType;
use anyhow::Result;

fn define_lines(class: CellType, rec: &ClassRecommendation) -> [String; 2] {
    let prefix = class.constant_prefix();
    [
        format!("#define {:<24}{}", format!("{}_MIN", prefix), rec.range.min),
        format!("#define {:<24}{}", format!("{}_MAX", prefix), rec.range.max),
    ]
}

pub fn render(result: &CalibrationResult) -> Result<String> {
    let mut out = String::new();
    out.push_str("/* Generated by deltacal. Advisory: review before flashing. */\n");
    out.push_str(&format!(
        "/* Confidence: {}; AA {}, AAA {} */\n",
        result.confidence,
        result.aa.range.source.describe(),
        result.aaa.range.source.describe()
    ));
    if let Some(t) = &result.threshold {
        out.push_str(&format!(
            "/* One-sided alternative: |delta| <= {} mV is AA */\n",
            t.threshold
        ));
    }
    for class in CellType::all() {
        for line in define_lines(*class, result.recommendation(*class)) {
            out.push_str(&line);
            out.push('\n');
        }
    }
    Ok(out)
}
