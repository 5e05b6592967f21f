//! Loopback HTTP fixture for probe tests
//!
//! Routes:
//! - `/generate_204?delay_ms=N`  204 after an optional delay
//! - `/hang`                     never answers within any test timeout
//! - `/error`                    500
//! - `/down?bytes=N`             N bytes with Content-Length
//! - `/down_slow`                endless chunked body, 16 KiB every 5 ms
//! - `/down_empty`               200 with an empty body
//! - `/up`                       drains the request body, then 200
//! - `/up_reject`                drains the request body, then 500

#![allow(dead_code)]

use netprobe_core::network_analyzer::ProbeRunner;
use netprobe_core::settings::NetProbeSettings;
use std::io::{self, Read};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tiny_http::{Request, Response, Server, StatusCode};

pub struct LoopbackServer {
    port: u16,
}

impl LoopbackServer {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().map(|a| a.port()).unwrap();

        thread::spawn(move || {
            for request in server.incoming_requests() {
                thread::spawn(move || handle(request));
            }
        });

        Self { port }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    /// Settings pointing every probe at this server, with short timings
    pub fn settings(&self) -> NetProbeSettings {
        let mut settings = NetProbeSettings::default();
        settings.targets.latency_url = self.url("/generate_204");
        settings.targets.download_url = self.url("/down");
        settings.targets.download_bytes = 2_000_000;
        settings.targets.upload_url = self.url("/up");
        settings.timeouts.connect_ms = 1_000;
        settings.timeouts.read_ms = 2_000;
        settings.timeouts.window_ms = 300;
        settings
    }
}

/// Client that ignores proxy environment variables
pub fn loopback_client() -> reqwest::Client {
    client_with_connect_timeout(Duration::from_secs(1))
}

pub fn client_with_connect_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .connect_timeout(timeout)
        .build()
        .unwrap()
}

/// Address in a reserved private range that nothing answers
pub const UNROUTABLE_URL: &str = "http://10.255.255.1/generate_204";

pub fn runner(settings: &NetProbeSettings) -> ProbeRunner {
    ProbeRunner::with_client(loopback_client(), settings)
}

/// URL on a port nothing listens on
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/generate_204", port)
}

/// Poll `check` until it holds or `timeout` passes
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn handle(mut request: Request) {
    let url = request.url().to_string();
    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));

    let result = match path {
        "/generate_204" => {
            if let Some(ms) = query_param(query, "delay_ms") {
                thread::sleep(Duration::from_millis(ms));
            }
            request.respond(Response::empty(204))
        }
        "/hang" => {
            thread::sleep(Duration::from_secs(30));
            request.respond(Response::empty(204))
        }
        "/error" => request.respond(Response::empty(500)),
        "/down" => {
            let bytes = query_param(query, "bytes").unwrap_or(0) as usize;
            request.respond(Response::from_data(vec![0u8; bytes]))
        }
        "/down_slow" => request.respond(Response::new(
            StatusCode(200),
            Vec::new(),
            SlowReader {
                chunk: 16 * 1024,
                pause: Duration::from_millis(5),
            },
            None,
            None,
        )),
        "/down_empty" => request.respond(Response::from_data(Vec::new())),
        "/up" | "/up_reject" => {
            let _ = io::copy(request.as_reader(), &mut io::sink());
            let status = if path == "/up" { 200 } else { 500 };
            request.respond(Response::empty(status))
        }
        _ => request.respond(Response::empty(404)),
    };
    // Clients routinely hang up mid-body once their window closes
    let _ = result;
}

fn query_param(query: &str, name: &str) -> Option<u64> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .and_then(|(_, v)| v.parse().ok())
}

/// Endless body that trickles out at a fixed pace
struct SlowReader {
    chunk: usize,
    pause: Duration,
}

impl Read for SlowReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        thread::sleep(self.pause);
        let n = buf.len().min(self.chunk);
        buf[..n].fill(0xAB);
        Ok(n)
    }
}
