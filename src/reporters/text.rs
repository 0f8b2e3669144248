//! Text (terminal) reporter

use crate::calibrate::{
    Calibration, ClassAnalysis, Confidence, Distribution, LevelEvaluation, OneSidedAnalysis,
    RangeSeparation, RangeSource, ThresholdSeparation, GAP_MIN_MV,
};
use crate::models::CellType;
use anyhow::Result;
use console::style;

const RULE: &str = "════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────";

/// One-sided tiers shown in the recommendation section
const TIERS: [(&str, f64); 3] = [
    ("ULTRA-CONSERVATIVE", 99.9),
    ("CONSERVATIVE", 99.0),
    ("BALANCED", 95.0),
];

/// Breakpoints listed per class
const GAP_ROWS: usize = 10;

fn confidence_label(c: Confidence) -> String {
    match c {
        Confidence::High => style(c.name()).green().bold().to_string(),
        Confidence::Medium => style(c.name()).yellow().bold().to_string(),
        Confidence::Low => style(c.name()).red().bold().to_string(),
    }
}

fn section(out: &mut String, title: &str) {
    out.push_str(&format!("\n{}\n", style(title).bold()));
    out.push_str(&format!("{}\n", style(THIN_RULE).dim()));
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Render the full calibration report
pub fn render(cal: &Calibration) -> Result<String> {
    let mut out = String::new();
    let r = &cal.result;

    out.push_str(&format!("\n{}\n", style("🔬 Dual-Range Delta Calibration").bold()));
    out.push_str(&format!("{}\n", style(RULE).dim()));
    out.push_str(&format!(
        "AA correct: {}  AA→AAA: {}  AAA correct: {}  AAA→AA: {}\n",
        r.samples.aa_correct, r.samples.aa_misdetected, r.samples.aaa_correct, r.samples.aaa_misdetected
    ));

    for class in CellType::all() {
        render_class(&mut out, cal.class(*class));
    }

    render_misdetections(&mut out, cal);

    if let Some(one_sided) = &cal.one_sided {
        render_one_sided(&mut out, one_sided);
    }

    section(&mut out, "📐 Dual-range options");
    for level in &cal.levels {
        render_level(&mut out, level);
    }

    render_final(&mut out, cal);
    Ok(out)
}

fn render_summary(out: &mut String, dist: &Distribution) {
    out.push_str(&format!("Count:   {}\n", dist.count));
    out.push_str(&format!("Mean:    {:.1} mV\n", dist.mean));
    out.push_str(&format!("Median:  {:.1} mV\n", dist.median));
    out.push_str(&format!("Mode:    {} mV\n", dist.mode));
    out.push_str(&format!("Std dev: {:.1} mV\n", dist.stddev));
    out.push_str(&format!("Range:   {} .. {} mV\n", dist.min, dist.max));
}

fn render_class(out: &mut String, analysis: &ClassAnalysis) {
    section(out, &format!("📊 {} correct detections", analysis.class));

    let Some(dist) = &analysis.correct else {
        out.push_str(&format!("{}\n", style("No correct samples").yellow()));
        return;
    };
    render_summary(out, dist);

    out.push_str("\nPercentiles:\n");
    for (p, v) in &analysis.ladder {
        out.push_str(&format!("  {:>5.1}%: {:>6} mV\n", p, v));
    }

    if !analysis.most_common.is_empty() {
        out.push_str("\nMost common deltas:\n");
        for (value, count) in &analysis.most_common {
            out.push_str(&format!(
                "  {:>6} mV: {:>6} ({:.1}%)\n",
                value,
                count,
                dist.share(*count)
            ));
        }
    }

    for hist in &analysis.histograms {
        out.push_str(&format!("\n{}:\n", hist.title));
        for c in &hist.counts {
            out.push_str(&format!(
                "  {:<20} [{:>5}, {:>5}): {:>6} ({:>5.1}%)\n",
                c.bucket.label, c.bucket.low, c.bucket.high, c.count, c.percent
            ));
        }
    }

    if !analysis.bands.is_empty() {
        out.push_str("\nShare by band:\n");
        for band in &analysis.bands {
            out.push_str(&format!(
                "  {:<20} {:>6} ({:>5.1}%)\n",
                band.label, band.count, band.percent
            ));
        }
    }

    out.push_str(&format!("\nBreakpoints (gaps > {} mV):\n", GAP_MIN_MV));
    if analysis.gaps.is_empty() {
        out.push_str("  none\n");
    }
    for gap in analysis.gaps.iter().take(GAP_ROWS) {
        out.push_str(&format!(
            "  {} mV → {} mV (size {} mV)\n",
            gap.from, gap.to, gap.size
        ));
    }
    if analysis.gaps.len() > GAP_ROWS {
        out.push_str(&format!("  … {} more\n", analysis.gaps.len() - GAP_ROWS));
    }
}

fn render_misdetections(out: &mut String, cal: &Calibration) {
    section(out, "🚨 Misdetections");
    for class in CellType::all() {
        let analysis = cal.class(*class);
        let (Some(dist), Some(abs)) = (&analysis.misdetected, &analysis.misdetected_abs) else {
            out.push_str(&format!("{} detected as {}: none recorded\n", class, class.other()));
            continue;
        };
        out.push_str(&format!("{} detected as {}:\n", class, class.other()));
        out.push_str(&format!("  Count:     {}\n", dist.count));
        out.push_str(&format!("  Range:     {} .. {} mV\n", dist.min, dist.max));
        out.push_str(&format!("  Mean:      {:.1} mV\n", dist.mean));
        out.push_str(&format!("  |Δ| range: {} .. {} mV\n", abs.min, abs.max));
        if !analysis.misdetected_common.is_empty() {
            let values: Vec<String> = analysis
                .misdetected_common
                .iter()
                .map(|(v, n)| format!("{} mV ×{}", v, n))
                .collect();
            out.push_str(&format!("  Most common: {}\n", values.join(", ")));
        }
    }
}

fn render_one_sided(out: &mut String, a: &OneSidedAnalysis) {
    section(out, &format!("🎯 One-sided |Δ| threshold ({})", a.class));
    let mis_total = a.misdetected_abs.as_ref().map_or(0, |d| d.count);
    let good_total = a.correct_abs.count;

    match a.min_misdetection() {
        Some(min) => out.push_str(&format!("Smallest misdetected |Δ|: {} mV\n", min)),
        None => out.push_str(&format!(
            "{}\n",
            style("No misdetections: separation is unproven").yellow()
        )),
    }

    for c in &a.candidates {
        let verdict = match c.separation {
            ThresholdSeparation::Clean { optimal } => {
                style(format!("clean, optimal {} mV", optimal)).green().to_string()
            }
            ThresholdSeparation::Overlap { low, high } => {
                style(format!("overlaps misdetections {}..{} mV", low, high)).red().to_string()
            }
            ThresholdSeparation::NoEvidence => "no evidence".to_string(),
        };
        out.push_str(&format!("  p{:<5} |Δ| <= {:>5} mV  {}\n", c.coverage, c.threshold, verdict));
    }

    out.push('\n');
    for (name, coverage) in TIERS {
        let Some(c) = a.candidate(coverage) else {
            continue;
        };
        out.push_str(&format!(
            "{} ({}%): threshold {} mV\n",
            style(name).bold(),
            coverage,
            c.threshold
        ));
        out.push_str(&format!(
            "  would catch {}/{} misdetections ({:.1}%)\n",
            c.caught_misdetections,
            mis_total,
            pct(c.caught_misdetections, mis_total)
        ));
        out.push_str(&format!(
            "  would lose {}/{} good {} ({:.2}%)\n",
            c.lost_correct,
            good_total,
            a.class,
            pct(c.lost_correct, good_total)
        ));
    }

    let rec = &a.recommendation;
    out.push_str(&format!(
        "\nRecommended: |Δ| <= {} mV (p{} tier, {}) confidence {}\n",
        rec.threshold,
        rec.coverage,
        if rec.clean { "clean" } else { "not clean" },
        confidence_label(rec.confidence)
    ));
}

fn render_level(out: &mut String, level: &LevelEvaluation) {
    out.push_str(&format!("\n{}% coverage:\n", level.level.percent));
    for class in CellType::all() {
        let range = level.range(*class);
        let effect = level.effect(*class);
        let source = if range.source == RangeSource::Empirical {
            String::new()
        } else {
            format!(" ({})", range.source.describe())
        };
        out.push_str(&format!(
            "  {:<3} {:>6} .. {:<6} mV{}\n",
            class, range.min, range.max, source
        ));
        if effect.total > 0 {
            out.push_str(&format!(
                "      loses {}/{} correct {} ({:.2}%)\n",
                effect.lost,
                effect.total,
                class,
                pct(effect.lost, effect.total)
            ));
        }
        out.push_str(&format!(
            "      admits {} correct {} samples\n",
            effect.leakage,
            class.other()
        ));
        let mis_total = effect.recovered + effect.missed;
        if mis_total > 0 {
            out.push_str(&format!(
                "      recovers {}/{} {} misdetections, misses {}\n",
                effect.recovered, mis_total, class, effect.missed
            ));
        }
    }
    match level.separation {
        RangeSeparation::Clean { gap } => out.push_str(&format!(
            "  {}\n",
            style(format!("✅ clean separation, gap {} mV", gap)).green()
        )),
        RangeSeparation::Overlap { low, high } => out.push_str(&format!(
            "  {}\n",
            style(format!("⚠️  overlap {}..{} mV", low, high)).yellow()
        )),
    }
}

fn render_final(out: &mut String, cal: &Calibration) {
    let r = &cal.result;
    section(out, "✨ Final recommendation");
    for class in CellType::all() {
        let rec = r.recommendation(*class);
        let prefix = class.constant_prefix();
        out.push_str(&format!("#define {:<24}{}\n", format!("{}_MIN", prefix), rec.range.min));
        out.push_str(&format!("#define {:<24}{}\n", format!("{}_MAX", prefix), rec.range.max));
    }
    out.push('\n');

    for class in CellType::all() {
        let rec = r.recommendation(*class);
        match rec.coverage_percent {
            Some(p) => out.push_str(&format!(
                "Expected {} coverage: {:.1}% ({}/{})\n",
                class, p, rec.covered, rec.total
            )),
            None => out.push_str(&format!(
                "Expected {} coverage: unknown ({})\n",
                class,
                rec.range.source.describe()
            )),
        }
    }

    if r.separated {
        out.push_str(&format!("Gap between ranges: {} mV\n", r.gap_mv));
    } else {
        out.push_str(&format!("Ranges overlap by {} mV\n", -r.gap_mv));
    }
    out.push_str(&format!("Confidence: {}\n", confidence_label(r.confidence)));

    if !r.warnings.is_empty() {
        out.push('\n');
        for w in &r.warnings {
            out.push_str(&format!("{} {}\n", style("⚠").yellow(), w));
        }
    }
    out.push_str(&format!(
        "\n{}\n",
        style("Advisory only: nothing is applied automatically.").dim()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_calibration;

    #[test]
    fn test_text_report_sections() {
        console::set_colors_enabled(false);
        let out = render(&test_calibration()).unwrap();
        assert!(out.contains("AA correct detections"));
        assert!(out.contains("Most common deltas"));
        assert!(out.contains("ULTRA-CONSERVATIVE (99.9%)"));
        assert!(out.contains("would catch 3/3 misdetections"));
        assert!(out.contains("#define AA_DETECTION_DELTA_MIN  -19"));
        assert!(out.contains("Expected AA coverage"));
        assert!(out.contains("Confidence: HIGH"));
    }

    #[test]
    fn test_tiers_use_raw_percentile_and_candidate_counts() {
        console::set_colors_enabled(false);
        let cal = test_calibration();
        let out = render(&cal).unwrap();
        let one_sided = cal.one_sided.as_ref().unwrap();
        let c = one_sided.candidate(95.0).unwrap();
        assert!(out.contains(&format!("BALANCED (95%): threshold {} mV", c.threshold)));
        assert!(out.contains(&format!(
            "would lose {}/{} good AA",
            c.lost_correct, one_sided.correct_abs.count
        )));
    }

    #[test]
    fn test_bands_and_breakpoints_are_reported() {
        console::set_colors_enabled(false);
        let out = render(&test_calibration()).unwrap();
        assert!(out.contains("Share by band:"));
        assert!(out.contains("|Δ| ≤ 50 mV"));
        assert!(out.contains("250–350 mV"));
        assert!(out.contains("Breakpoints (gaps > 10 mV):"));
    }
}
