use std::fmt::Write;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use uptime_core::UrlStatus;

use crate::state::AppState;

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut out = String::with_capacity(4096);
    let scheduler = &state.scheduler;

    writeln!(out, "# TYPE uptime_monitor_info info").unwrap();
    writeln!(out, "# HELP uptime_monitor_info Information about the uptime monitor").unwrap();
    writeln!(
        out,
        "uptime_monitor_info{{created=\"{}\"}} 1",
        scheduler.created_at().to_rfc3339()
    )
    .unwrap();

    let monitor_state = scheduler.state().await.to_string();
    writeln!(out, "# TYPE uptime_monitor_state stateset").unwrap();
    writeln!(out, "# HELP uptime_monitor_state Current state of the monitoring loop").unwrap();
    for variant in &["running", "stopped"] {
        writeln!(
            out,
            "uptime_monitor_state{{state=\"{}\"}} {}",
            variant,
            if monitor_state == *variant { 1 } else { 0 }
        )
        .unwrap();
    }

    writeln!(out, "# TYPE uptime_monitor_ping_interval_seconds gauge").unwrap();
    writeln!(out, "# HELP uptime_monitor_ping_interval_seconds Configured ping interval").unwrap();
    writeln!(
        out,
        "uptime_monitor_ping_interval_seconds {}",
        scheduler.config().ping_interval.as_secs()
    )
    .unwrap();

    if let Some(t) = scheduler.last_cycle().await {
        writeln!(out, "# TYPE uptime_monitor_last_cycle_timestamp_seconds gauge").unwrap();
        writeln!(
            out,
            "# HELP uptime_monitor_last_cycle_timestamp_seconds Unix timestamp of the last ping cycle"
        )
        .unwrap();
        let secs = t.timestamp() as f64 + (t.timestamp_subsec_millis() as f64 / 1000.0);
        writeln!(out, "uptime_monitor_last_cycle_timestamp_seconds {:.3}", secs).unwrap();
    }

    let snapshot = scheduler.snapshot().await.unwrap_or_default();

    writeln!(out, "# TYPE uptime_monitor_urls gauge").unwrap();
    writeln!(out, "# HELP uptime_monitor_urls Number of monitored (owner, URL) pairs").unwrap();
    writeln!(out, "uptime_monitor_urls {}", snapshot.len()).unwrap();

    writeln!(out, "# TYPE uptime_url_status stateset").unwrap();
    writeln!(out, "# HELP uptime_url_status Current status per monitored URL").unwrap();
    for entry in &snapshot {
        for variant in &[UrlStatus::Pending, UrlStatus::Online, UrlStatus::Offline] {
            writeln!(
                out,
                "uptime_url_status{{owner_id=\"{}\",url=\"{}\",status=\"{}\"}} {}",
                entry.owner_id,
                entry.url,
                variant,
                if entry.state.status == *variant { 1 } else { 0 }
            )
            .unwrap();
        }
    }

    writeln!(out, "# TYPE uptime_url_response_time_seconds gauge").unwrap();
    writeln!(out, "# HELP uptime_url_response_time_seconds Last measured response time").unwrap();
    for entry in &snapshot {
        if let Some(rt) = entry.state.response_time_secs {
            writeln!(
                out,
                "uptime_url_response_time_seconds{{owner_id=\"{}\",url=\"{}\"}} {:.6}",
                entry.owner_id, entry.url, rt
            )
            .unwrap();
        }
    }

    writeln!(out, "# TYPE uptime_url_last_check_timestamp_seconds gauge").unwrap();
    writeln!(out, "# HELP uptime_url_last_check_timestamp_seconds Unix timestamp of the last check").unwrap();
    for entry in &snapshot {
        if let Some(t) = entry.state.last_check {
            let secs = t.timestamp() as f64 + (t.timestamp_subsec_millis() as f64 / 1000.0);
            writeln!(
                out,
                "uptime_url_last_check_timestamp_seconds{{owner_id=\"{}\",url=\"{}\"}} {:.3}",
                entry.owner_id, entry.url, secs
            )
            .unwrap();
        }
    }

    writeln!(out, "# EOF").unwrap();

    (
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        out,
    )
}
