//! Rendering of finished scan sessions

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use camscout_common::{PortState, RtspProbeResult};
use camscout_orchestrator::SessionReport;

/// Render `report` and print it, or write it to `output` when given.
pub fn emit_report(report: &SessionReport, format: &str, output: Option<&Path>) -> Result<()> {
    let rendered = render(report, format)?;
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write results to {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn render(report: &SessionReport, format: &str) -> Result<String> {
    match format.trim().to_lowercase().as_str() {
        "json" | "j" => render_json(report),
        "csv" | "c" => Ok(render_csv(report)),
        "text" | "table" | "t" | "" => Ok(render_table(report)),
        other => Err(anyhow!("unknown output format '{}'", other)),
    }
}

/// Open ports first, then every path that answered with a status proving it exists.
fn render_table(report: &SessionReport) -> String {
    let mut out = String::new();
    let duration = report.duration().to_std().unwrap_or_default();

    if report.ports.is_empty() {
        let _ = writeln!(out, "\nNo hosts scanned.\n");
        return out;
    }

    let _ = writeln!(out, "\n{:-<80}", "");
    let _ = writeln!(out, "{:<20} {:<8} {:<10} {:<10}", "HOST", "PORT", "STATE", "LATENCY");
    let _ = writeln!(out, "{:-<80}", "");
    for port in report.ports.iter().filter(|p| p.state != PortState::Closed) {
        let _ = writeln!(
            out,
            "{:<20} {:<8} {:<10} {:<10}",
            port.host.to_string(),
            port.port,
            port.state,
            format_duration(port.latency)
        );
    }

    let streams: Vec<&RtspProbeResult> = report.reachable().collect();
    if !streams.is_empty() {
        let _ = writeln!(out, "\n{:-<110}", "");
        let _ = writeln!(out, "{:<64} {:<11} {:<10} {:<20}", "STREAM", "STATUS", "TAG", "DETAILS");
        let _ = writeln!(out, "{:-<110}", "");
        for probe in streams {
            let _ = writeln!(
                out,
                "{:<64} {:<11} {:<10} {:<20}",
                truncate(&probe.url(), 64),
                probe.classification,
                probe.manufacturer_tag.as_deref().unwrap_or("-"),
                details(probe)
            );
        }
    }

    if !report.validations.is_empty() {
        let _ = writeln!(out, "\nStream checks:");
        for check in &report.validations {
            let verdict = if check.playable {
                let codec = check.codec.as_deref().unwrap_or("?");
                let resolution = check.resolution.as_deref().unwrap_or("?");
                format!("playable ({codec} {resolution})")
            } else {
                format!("failed: {}", check.error.as_deref().unwrap_or("unknown"))
            };
            let _ = writeln!(out, "  {} {}", check.url, verdict);
        }
    }

    let stats = &report.stats;
    let _ = writeln!(out, "\nSummary:");
    let _ = writeln!(out, "  Ports probed: {}", stats.ports_probed);
    let _ = writeln!(out, "  Open ports: {}", stats.open_ports);
    let _ = writeln!(out, "  Paths probed: {}", stats.paths_probed);
    let _ = writeln!(out, "  Open streams: {}", stats.channels_ok);
    let _ = writeln!(out, "  Protected streams: {}", stats.channels_auth);
    let _ = writeln!(out, "  Errors: {}", stats.errors);
    if report.cancelled {
        let _ = writeln!(out, "  Cancelled before completion");
    }
    let _ = writeln!(out, "  Scan duration: {}", format_duration(duration));
    let _ = writeln!(out);
    out
}

fn render_json(report: &SessionReport) -> Result<String> {
    let duration = report.duration().to_std().unwrap_or_default();
    let streams = report
        .reachable()
        .map(|p| {
            let mut value = serde_json::to_value(p)?;
            value["url"] = json!(p.url());
            Ok(value)
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;
    let output = json!({
        "scan_info": {
            "session": report.id,
            "started_at": report.started_at,
            "finished_at": report.finished_at,
            "duration_seconds": duration.as_secs_f64(),
            "duration_formatted": format_duration(duration),
            "cancelled": report.cancelled,
            "stats": report.stats,
        },
        "ports": report.open_ports().collect::<Vec<_>>(),
        "streams": streams,
        "validations": report.validations,
    });
    let mut text = serde_json::to_string_pretty(&output)?;
    text.push('\n');
    Ok(text)
}

/// One row per probed path, reachable or not.
fn render_csv(report: &SessionReport) -> String {
    let mut out = String::from(
        "ip,port,path,method,status,classification,tag,stream_type,manufacturer,server,codec,resolution,url,latency_ms\n",
    );
    for probe in &report.probes {
        let sdp = probe.sdp.as_ref();
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            probe.host,
            probe.port,
            quote(&probe.path),
            probe.method,
            probe.status_code.map(|s| s.to_string()).unwrap_or_default(),
            probe.classification,
            quote(probe.manufacturer_tag.as_deref().unwrap_or("")),
            probe.stream_type.map(|s| s.to_string()).unwrap_or_default(),
            quote(probe.manufacturer.as_deref().unwrap_or("")),
            quote(probe.server_header.as_deref().unwrap_or("")),
            quote(sdp.and_then(|s| s.codec.as_deref()).unwrap_or("")),
            quote(sdp.and_then(|s| s.resolution.as_deref()).unwrap_or("")),
            quote(&probe.url()),
            probe.latency.as_millis()
        );
    }
    out
}

fn quote(field: &str) -> String {
    let escaped = field.replace('"', "\"\"").replace('\n', " ").replace('\r', "");
    format!("\"{escaped}\"")
}

fn details(probe: &RtspProbeResult) -> String {
    let mut parts = Vec::new();
    if let Some(sdp) = &probe.sdp {
        parts.extend(sdp.codec.clone());
        parts.extend(sdp.resolution.clone());
    }
    if let Some(kind) = probe.stream_type {
        parts.push(kind.to_string());
    }
    if let Some(vendor) = &probe.manufacturer {
        parts.push(vendor.clone());
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs == 0 {
        format!("{}ms", millis)
    } else if total_secs < 60 {
        if millis > 0 {
            format!("{}.{:03}s", total_secs, millis)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    }
}
