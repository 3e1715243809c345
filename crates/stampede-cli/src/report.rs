// Report rendering: plain text for the terminal, standalone HTML for
// sharing, and raw JSON for machines.

use stampede_core::{RunReport, TrendSummary};

fn fmt_ms(summary: &TrendSummary) -> String {
    format!(
        "avg {:.1}ms  p50 {:.1}ms  p90 {:.1}ms  p95 {:.1}ms  p99 {:.1}ms  max {:.1}ms",
        summary.avg, summary.p50, summary.p90, summary.p95, summary.p99, summary.max
    )
}

/// Render the terminal report
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let verdict = &report.verdict;
    let metrics = &report.metrics;

    out.push_str(&format!("=== Stampede report: {} ===\n", report.profile));
    out.push_str(&format!(
        "Started:  {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("Duration: {:.1}s\n", report.duration_secs));
    out.push_str(&format!(
        "Status:   {} ({})\n",
        verdict.status,
        if verdict.passed { "PASS" } else { "FAIL" }
    ));
    out.push('\n');

    out.push_str(&format!(
        "Requests: {} total, {} failed ({:.2}%), {:.1} MB received\n",
        metrics.total_requests,
        metrics.failed_requests,
        metrics.failure_rate * 100.0,
        metrics.bytes_received as f64 / (1024.0 * 1024.0)
    ));
    if let Some(latency) = &metrics.latency {
        out.push_str(&format!("Latency:  {}\n", fmt_ms(latency)));
    }
    if let Some(rate) = metrics.integrity_rate {
        out.push_str(&format!(
            "Integrity: {:.1}% across {} checks\n",
            rate * 100.0,
            metrics.integrity_checks
        ));
    }
    if let Some(recovery) = &metrics.recovery {
        out.push_str(&format!(
            "Recovery: avg {:.1}s  max {:.1}s ({} cycles)\n",
            recovery.avg, recovery.max, recovery.count
        ));
    }
    if let (Some(growth), Some(tier), Some(per_hour)) = (
        report.input.memory_growth_mb,
        verdict.memory_tier.as_ref(),
        verdict.leak_mb_per_hour,
    ) {
        out.push_str(&format!(
            "Memory:   {growth:+.1} MB growth ({per_hour:.1} MB/h, {tier})\n"
        ));
    }
    out.push('\n');

    out.push_str(&format!("Diagnosis: {}\n", verdict.diagnosis));
    out.push_str("Recommendations:\n");
    for rec in &verdict.recommendations {
        out.push_str(&format!("  - {rec}\n"));
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render a self-contained HTML report
pub fn render_html(report: &RunReport) -> String {
    let verdict = &report.verdict;
    let metrics = &report.metrics;
    let status_color = if verdict.passed { "#2e7d32" } else { "#c62828" };

    let mut rows = String::new();
    let mut row = |label: &str, value: String| {
        rows.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>\n",
            escape(label),
            escape(&value)
        ));
    };
    row("Started", report.started_at.to_rfc3339());
    row("Duration", format!("{:.1}s", report.duration_secs));
    row(
        "Requests",
        format!(
            "{} total, {} failed ({:.2}%)",
            metrics.total_requests,
            metrics.failed_requests,
            metrics.failure_rate * 100.0
        ),
    );
    if let Some(latency) = &metrics.latency {
        row("Latency", fmt_ms(latency));
    }
    if let Some(rate) = metrics.integrity_rate {
        row(
            "Integrity",
            format!("{:.1}% across {} checks", rate * 100.0, metrics.integrity_checks),
        );
    }
    if let Some(recovery) = &metrics.recovery {
        row(
            "Recovery",
            format!("avg {:.1}s, max {:.1}s", recovery.avg, recovery.max),
        );
    }
    if let (Some(growth), Some(tier), Some(per_hour)) = (
        report.input.memory_growth_mb,
        verdict.memory_tier.as_ref(),
        verdict.leak_mb_per_hour,
    ) {
        row("Memory", format!("{growth:+.1} MB ({per_hour:.1} MB/h, {tier})"));
    }
    row("Diagnosis", verdict.diagnosis.clone());

    let recommendations: String = verdict
        .recommendations
        .iter()
        .map(|r| format!("<li>{}</li>\n", escape(r)))
        .collect();

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <title>Stampede report: {profile}</title>\
         <style>body{{font-family:sans-serif;max-width:48rem;margin:2rem auto}}\
         th{{text-align:left;padding-right:1rem}}\
         .status{{color:{color};font-size:1.4rem}}</style></head><body>\n\
         <h1>Stampede report: {profile}</h1>\n\
         <p class=\"status\">{status} &mdash; {pass}</p>\n\
         <table>\n{rows}</table>\n\
         <h2>Recommendations</h2>\n<ul>\n{recommendations}</ul>\n\
         </body></html>\n",
        profile = escape(&report.profile),
        color = status_color,
        status = verdict.status,
        pass = if verdict.passed { "PASS" } else { "FAIL" },
        rows = rows,
        recommendations = recommendations,
    )
}

/// Render the raw report as pretty-printed JSON
pub fn render_json(report: &RunReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stampede_core::{
        analyze, AnalysisConfig, AnalysisInput, MetricsSnapshot, PassCriteria, SystemStatus,
    };

    fn sample_report(failure_rate: f64) -> RunReport {
        let input = AnalysisInput {
            total_requests: 1_000,
            failure_rate,
            latency: Some(TrendSummary {
                count: 1_000,
                avg: 25.0,
                min: 5.0,
                max: 180.0,
                p50: 20.0,
                p90: 60.0,
                p95: 90.0,
                p99: 150.0,
            }),
            integrity_rate: Some(1.0),
            recovery: None,
            memory_growth_mb: Some(12.0),
            degradation_ratio: None,
            elapsed_minutes: 10.0,
        };
        let criteria = PassCriteria {
            max_failure_rate: Some(0.05),
            ..PassCriteria::default()
        };
        let verdict = analyze(&input, &AnalysisConfig::default(), &criteria);
        RunReport {
            profile: "load".to_string(),
            started_at: Utc::now(),
            duration_secs: 600.0,
            verdict,
            input,
            metrics: MetricsSnapshot {
                total_requests: 1_000,
                failed_requests: (1_000.0 * failure_rate) as u64,
                bytes_received: 4 * 1024 * 1024,
                failure_rate,
                latency: None,
                integrity_rate: Some(1.0),
                integrity_checks: 40,
                recovery: None,
                memory: None,
                memory_now_mb: Some(112.0),
                last_response_ms: Some(21.0),
                leak_suspicions: 0,
            },
        }
    }

    #[test]
    fn test_text_report_names_profile_and_status() {
        let report = sample_report(0.0);
        let text = render_text(&report);
        assert!(text.contains("Stampede report: load"));
        assert!(text.contains("HEALTHY"));
        assert!(text.contains("PASS"));
        // 12 MB over 10 minutes normalizes to 72 MB/h.
        assert!(text.contains("72.0 MB/h, leak suspected"));
    }

    #[test]
    fn test_failing_report_renders_fail() {
        let report = sample_report(0.5);
        assert_eq!(report.verdict.status, SystemStatus::Critical);
        let text = render_text(&report);
        assert!(text.contains("FAIL"));
    }

    #[test]
    fn test_html_escapes_markup() {
        let mut report = sample_report(0.0);
        report.verdict.diagnosis = "latency < threshold & stable".to_string();
        let html = render_html(&report);
        assert!(html.contains("latency &lt; threshold &amp; stable"));
        assert!(html.contains("<h1>Stampede report: load</h1>"));
    }

    #[test]
    fn test_json_round_trips() {
        let report = sample_report(0.0);
        let json = render_json(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.profile, report.profile);
    }
}
