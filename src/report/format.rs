//! Formatted terminal output.
//!
//! Formatting lives here so fitting code stays free of presentation concerns.

use crate::domain::FitResult;
use crate::report::{Residual, max_abs_residual};
use crate::segment::{SegmentedFit, SegmentedModel};

/// Header + one block per fit.
pub fn format_fit_summary(fit: &FitResult, n_points: usize) -> String {
    let mut out = String::new();
    out.push_str("=== dfit - dissolution fit ===\n");
    out.push_str(&format!("Model: {}\n", fit.model));
    out.push_str(&format!("Points: n={n_points}\n\n"));
    out.push_str(&format_fit_block(fit));
    out
}

/// Per-interval fits plus the boundary discontinuities of the assembled model.
pub fn format_segmented_summary(result: &SegmentedFit) -> String {
    let mut out = String::new();
    out.push_str("=== dfit - segmented dissolution fit ===\n");
    out.push_str(&format!(
        "Intervals: {} | time origin: {:?}\n",
        result.model.boundaries().interval_count(),
        result.model.origin()
    ));

    for (segment, fit) in result.model.segments().iter().zip(&result.fits) {
        let iv = segment.interval;
        let close = if iv.closed_right { "]" } else { ")" };
        out.push_str(&format!("\n[{}, {}{close} #{}\n", iv.start, iv.end, iv.index));
        out.push_str(&format_fit_block(fit));
    }

    out.push_str(&format!(
        "\nTotal RSS: {:.6e} | all converged: {}\n",
        result.total_rss(),
        if result.all_converged() { "yes" } else { "no" }
    ));
    out.push_str(&format_boundary_jumps(&result.model));
    out
}

/// Segment table for a loaded model file.
pub fn format_model_summary(model: &SegmentedModel) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<14} {:<26} {:<40}\n", "interval", "model", "params").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<14} {:-<26} {:-<40}\n", "", "", "").trim_end());
    out.push('\n');
    for s in model.segments() {
        out.push_str(
            format!(
                "{:<14} {:<26} {:<40}\n",
                format!("[{}, {}]", s.interval.start, s.interval.end),
                truncate(s.model.display_name(), 26),
                fmt_params(s.params.iter()),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Left/right values at interior boundaries; empty for a single interval.
pub fn format_boundary_jumps(model: &SegmentedModel) -> String {
    let jumps = model.boundary_jumps();
    if jumps.is_empty() {
        return String::new();
    }
    let mut out = String::from("\nBoundary jumps (diagnostic, not enforced):\n");
    for j in jumps {
        out.push_str(&format!(
            "  t={:<10} left={:<12.4} right={:<12.4} jump={:+.4}\n",
            j.boundary,
            j.left,
            j.right,
            j.jump()
        ));
    }
    out
}

/// One line naming the worst-fitted observation.
pub fn format_worst_residual(residuals: &[Residual]) -> String {
    match max_abs_residual(residuals) {
        Some(r) => format!(
            "Max |residual|: {:.4} at t={} (observed {:.4}, predicted {:.4})\n",
            r.residual.abs(),
            r.time,
            r.observed,
            r.predicted
        ),
        None => String::new(),
    }
}

fn format_fit_block(fit: &FitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("- model: {}\n", fit.model.display_name()));
    out.push_str(&format!("- params: {}\n", fmt_params(fit.params.iter())));
    out.push_str(&format!("- RSS={:.6e} RMSE={:.6}\n", fit.rss, fit.rmse));
    out.push_str(&format!(
        "- converged: {} ({} generation(s), {} evaluation(s))\n",
        if fit.converged { "yes" } else { "no" },
        fit.generations,
        fit.evaluations
    ));
    out
}

fn fmt_params<'a>(params: impl Iterator<Item = (&'a str, f64)>) -> String {
    let parts: Vec<String> = params.map(|(name, v)| format!("{name}={v:.6}")).collect();
    parts.join(", ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
