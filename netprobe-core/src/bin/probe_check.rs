//! Probe Check Binary
//!
//! Runs latency, download and upload once against the configured endpoints
//! and prints the results. Exits with status 1 if every probe failed.
//!
//! Run with: cargo run --bin probe_check
//! With settings: cargo run --bin probe_check -- settings.json

use netprobe_core::network_analyzer::{format_speed, MeasurementSession, ProbeRunner, SessionId};
use netprobe_core::settings::{load_settings, load_settings_from};
use netprobe_core::{ProbeKind, ProbeResult};
use std::path::Path;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    println!("=== NetProbe Check ===\n");

    let args: Vec<String> = std::env::args().collect();
    let settings = match args.get(1) {
        Some(path) => {
            println!("Settings file: {}\n", path);
            load_settings_from(Path::new(path))
        }
        None => load_settings(),
    };

    if let Err(e) = settings.validate() {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }

    println!("Latency:  {}", settings.targets.latency_url);
    println!("Download: {}", settings.targets.download_url_with_size());
    println!("Upload:   {}\n", settings.targets.upload_url);

    let runner = match ProbeRunner::new(&settings) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let mut session = MeasurementSession::new(SessionId(1)).with_upload();
    let results = session
        .run(&runner, |result| println!("  {}", describe(result)))
        .await;

    if results.iter().all(|r| !r.is_ok()) {
        eprintln!("\nERROR: every probe failed");
        std::process::exit(1);
    }
    println!("\nDone.");
}

fn describe(result: &ProbeResult) -> String {
    match (result.kind(), result.value()) {
        (ProbeKind::Latency, Some(ms)) => format!("✓ Latency: {} ms", ms as u64),
        (kind, Some(mbps)) => format!("✓ {}: {}", kind.label(), format_speed(mbps)),
        (kind, None) => format!(
            "✗ {}: failed ({})",
            kind.label(),
            result.failure_reason().unwrap_or("no detail")
        ),
    }
}
