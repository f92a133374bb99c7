mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use uptime_core::{
    normalize_url, notification_channel, AlertDispatcher, HttpProber, MemoryStore, MonitorConfig,
    OwnerId, Scheduler, UptimeStats, UrlStatus, WebhookConfig,
};

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    if GIT_HASH.is_empty() {
        // Leak is fine: called once, lives for the program's lifetime.
        Box::leak(VERSION.to_string().into_boxed_str())
    } else {
        Box::leak(format!("{VERSION} ({GIT_HASH})").into_boxed_str())
    }
}

/// URL uptime monitor: periodic health checks with per-owner alerting.
#[derive(Parser)]
#[command(name = "uptime-monitor", version = version_string(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Listen address (e.g. 0.0.0.0:8080). Overrides config file.
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Path to TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Monitor a single URL from the command line (no API server).
    Watch {
        /// URL to monitor. Scheme-less input gets https:// prepended.
        url: String,

        /// Ping interval in seconds.
        #[arg(long, default_value_t = 60)]
        interval: u64,

        /// Request timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Optional webhook URL to POST failure alerts to.
        #[arg(long)]
        webhook_url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { listen, config } => {
            run_serve(listen, config).await;
        }
        Commands::Watch {
            url,
            interval,
            timeout,
            webhook_url,
        } => {
            fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .init();
            run_watch(url, interval, timeout, webhook_url).await;
        }
    }
}

async fn run_serve(listen_override: Option<SocketAddr>, config_path: Option<PathBuf>) {
    let app_config = if let Some(ref path) = config_path {
        match config::AppConfig::load(path) {
            Ok(c) => {
                init_tracing(&c.server.log_format);
                tracing::info!(path = %path.display(), "Loaded config file");
                Some(c)
            }
            Err(e) => {
                init_tracing("pretty");
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
    } else {
        init_tracing("pretty");
        None
    };

    let listen = listen_override
        .or(app_config.as_ref().map(|c| c.server.listen))
        .unwrap_or_else(|| "0.0.0.0:8080".parse().unwrap());

    let monitor_config = app_config
        .as_ref()
        .map(|c| c.monitor.to_monitor_config())
        .unwrap_or_default();

    let webhooks = app_config
        .as_ref()
        .map(|c| c.webhook.clone())
        .unwrap_or_default();

    let (notification_tx, notification_rx) = notification_channel();
    let shared_client = HttpProber::build_client(monitor_config.request_timeout);

    let dispatcher_handle = if !webhooks.is_empty() {
        let dispatcher = AlertDispatcher::new(notification_rx, webhooks, shared_client.clone());
        let handle = tokio::spawn(dispatcher.run());
        tracing::info!("Alert dispatcher started");
        handle
    } else {
        tokio::spawn(async move {
            let mut rx = notification_rx;
            while rx.recv().await.is_some() {}
        })
    };

    let store = Arc::new(MemoryStore::from_config(&monitor_config));
    let prober = Arc::new(HttpProber::with_client(shared_client));

    let scheduler = match Scheduler::new(
        monitor_config,
        store,
        prober,
        Some(notification_tx.clone()),
    ) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!(error = %e, "Invalid monitor configuration");
            std::process::exit(1);
        }
    };

    if let Some(ref app_config) = app_config {
        for def in &app_config.urls {
            match scheduler.add_url(def.owner, &def.url).await {
                Ok(true) => {
                    tracing::info!(owner = def.owner, url = %def.url, "Registered URL from config")
                }
                Ok(false) => {
                    tracing::warn!(owner = def.owner, url = %def.url, "Duplicate URL in config, skipped")
                }
                Err(e) => {
                    tracing::error!(owner = def.owner, url = %def.url, error = %e, "Failed to register URL from config")
                }
            }
        }
    }

    scheduler.start().await;

    let state = uptime_api::state::AppState::new(Arc::clone(&scheduler));

    tracing::info!(%listen, "Starting uptime monitor API server");
    if let Err(e) = uptime_api::serve_with_state(listen, state, uptime_api::shutdown_signal()).await
    {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }

    tracing::info!("Shutdown signal received, stopping monitor...");
    scheduler.stop().await;

    drop(notification_tx);

    match tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher_handle).await {
        Ok(_) => tracing::info!("Alert dispatcher shut down"),
        Err(_) => tracing::warn!("Alert dispatcher did not shut down in time, aborting"),
    }

    tracing::info!("Shutdown complete");
}

async fn run_watch(url: String, interval: u64, timeout: u64, webhook_url: Option<String>) {
    let config = MonitorConfig::default()
        .with_ping_interval_secs(interval)
        .with_request_timeout_secs(timeout);

    let monitored_url = match normalize_url(&url) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("Invalid URL: {}", e);
            std::process::exit(1);
        }
    };

    let notification_tx = if let Some(ref wh_url) = webhook_url {
        let (tx, rx) = notification_channel();
        let wh_config = WebhookConfig {
            url: wh_url.clone(),
            events: vec![],
            timeout_ms: 5000,
            max_retries: 2,
            secret: None,
        };
        let client = HttpProber::build_client(config.request_timeout);
        let dispatcher = AlertDispatcher::new(rx, vec![wh_config], client);
        tokio::spawn(dispatcher.run());
        Some(tx)
    } else {
        None
    };

    let store = Arc::new(MemoryStore::from_config(&config));
    let prober = Arc::new(HttpProber::from_config(&config));

    let scheduler = match Scheduler::new(config, store, prober, notification_tx) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    const WATCH_OWNER: OwnerId = 0;
    if let Err(e) = scheduler.add_url(WATCH_OWNER, &monitored_url).await {
        eprintln!("Failed to register URL: {}", e);
        std::process::exit(1);
    }

    let multi = MultiProgress::new();
    let msg_style = ProgressStyle::with_template("{wide_msg}").expect("valid template");

    multi
        .println(format!(
            "{} {}",
            style("uptime-monitor").bold(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ))
        .ok();
    multi
        .println(format!(
            "  {} {}",
            style("url:     ").dim(),
            style(&monitored_url).bold()
        ))
        .ok();
    multi
        .println(format!("  {} {}s", style("interval:").dim(), interval))
        .ok();
    multi
        .println(format!("  {} {}s", style("timeout: ").dim(), timeout))
        .ok();
    if let Some(ref wh) = webhook_url {
        multi
            .println(format!("  {} {}", style("webhook: ").dim(), wh))
            .ok();
    }
    multi.println("").ok();
    multi
        .println(format!("{}", style("Press Ctrl+C to stop").dim()))
        .ok();
    multi.println("").ok();

    scheduler.start().await;

    let status_bar = multi.add(ProgressBar::new_spinner().with_style(msg_style));
    status_bar.set_message(format!(
        "{}\n  {}",
        format_separator(0),
        style("Waiting for first check...").dim()
    ));

    let mut last_seen_check = None;
    let mut check_num = 0u64;

    let shutdown = uptime_api::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
            _ = &mut shutdown => {
                status_bar.finish_and_clear();
                multi.println(format!("\n{}", style("Monitor stopped.").dim())).ok();
                scheduler.stop().await;
                return;
            }
        }

        let urls = match scheduler.urls(WATCH_OWNER).await {
            Ok(urls) => urls,
            Err(_) => continue,
        };
        let Some(state) = urls.get(&monitored_url) else {
            continue;
        };

        if state.last_check != last_seen_check {
            last_seen_check = state.last_check;
            check_num += 1;

            if state.status == UrlStatus::Offline {
                let ts = state
                    .last_check
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_default();
                let code = state.last_status_code.unwrap_or(0);
                let rt = state.response_time_secs.unwrap_or(0.0);
                multi
                    .println(format!(
                        "  {}  {} {}  {:.3}s",
                        style(ts).dim(),
                        style("DOWN").red().bold(),
                        style(format!("status={}", code)).red(),
                        rt,
                    ))
                    .ok();
            }
        }

        let stats = scheduler
            .uptime_stats(&monitored_url, WATCH_OWNER, 24)
            .await
            .unwrap_or_else(|_| UptimeStats::empty(24));

        let status_label = match state.status {
            UrlStatus::Online => style("ONLINE ").green().bold(),
            UrlStatus::Offline => style("OFFLINE").red().bold(),
            UrlStatus::Pending => style("PENDING").dim().bold(),
        };
        let rt = state
            .response_time_secs
            .map(|t| format!("{:.3}s", t))
            .unwrap_or_else(|| "-".into());
        let code = state
            .last_status_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".into());

        status_bar.set_message(format!(
            "{}\n  {}  status={:<4} time={:<8} checks={:<5} uptime={:.1}%",
            format_separator(check_num),
            status_label,
            code,
            rt,
            stats.total_checks,
            stats.uptime_percentage,
        ));
    }
}

fn format_separator(check_num: u64) -> String {
    let label = if check_num == 0 {
        String::new()
    } else {
        format!(" check {} ", check_num)
    };
    let width = 54usize.saturating_sub(label.len());
    format!(
        "{}{}{}",
        style("──").dim(),
        style(label).dim().bold(),
        style("─".repeat(width)).dim()
    )
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
