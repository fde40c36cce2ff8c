// tests/common/mod.rs

//! Shared fixtures: a canned-response HTTP server on localhost and
//! configuration that points every platform at it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cptrack::models::Config;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
enum Route {
    Reply {
        status: u16,
        body: String,
        delay: Duration,
    },
    Hang,
}

#[derive(Default)]
struct Routes {
    routes: HashMap<String, Route>,
    hits: HashMap<String, usize>,
    in_flight: HashMap<String, usize>,
    peaks: HashMap<String, usize>,
    in_flight_total: usize,
    peak_total: usize,
}

impl Routes {
    fn enter(&mut self, target: &str) {
        let current = self.in_flight.entry(target.to_string()).or_default();
        *current += 1;
        let current = *current;
        let peak = self.peaks.entry(target.to_string()).or_default();
        *peak = (*peak).max(current);
        self.in_flight_total += 1;
        self.peak_total = self.peak_total.max(self.in_flight_total);
    }

    fn leave(&mut self, target: &str) {
        if let Some(current) = self.in_flight.get_mut(target) {
            *current -= 1;
        }
        self.in_flight_total -= 1;
    }
}

/// Serves canned responses keyed by request target (`/path?query`), falling
/// back to the bare path. Unknown targets get a 404.
pub struct StubServer {
    addr: SocketAddr,
    routes: Arc<Mutex<Routes>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(Mutex::new(Routes::default()));

        let shared = Arc::clone(&routes);
        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let routes = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _ = serve(socket, routes).await;
                });
            }
        });

        Self {
            addr,
            routes,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn reply(&self, target: &str, status: u16, body: &str) {
        self.reply_after(target, status, body, Duration::ZERO);
    }

    /// Like `reply`, but hold each request for `delay` before answering.
    pub fn reply_after(&self, target: &str, status: u16, body: &str, delay: Duration) {
        self.routes.lock().unwrap().routes.insert(
            target.to_string(),
            Route::Reply {
                status,
                body: body.to_string(),
                delay,
            },
        );
    }

    /// Accept requests for `target` but never answer them.
    pub fn hang(&self, target: &str) {
        self.routes
            .lock()
            .unwrap()
            .routes
            .insert(target.to_string(), Route::Hang);
    }

    /// How many requests hit `target`.
    pub fn hits(&self, target: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .hits
            .get(target)
            .copied()
            .unwrap_or(0)
    }

    /// Most requests for `target` that were in flight at once.
    pub fn peak(&self, target: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .peaks
            .get(target)
            .copied()
            .unwrap_or(0)
    }

    /// Most requests in flight at once, across all targets.
    pub fn peak_total(&self) -> usize {
        self.routes.lock().unwrap().peak_total
    }

    /// Configuration with every platform pointed at this server.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.http.timeout_secs = 1;
        config.sync.request_delay_ms = 0;
        config.sync.retry.max_attempts = 2;
        config.sync.retry.base_delay_ms = 1;
        config.sync.retry.max_delay_ms = 5;
        config.platforms.codeforces = self.url();
        config.platforms.timus = self.url();
        config.platforms.codechef = self.url();
        config.platforms.projecteuler = self.url();
        config
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut socket: TcpStream, routes: Arc<Mutex<Routes>>) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&request);
    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let path = target.split('?').next().unwrap_or("/").to_string();

    let route = {
        let mut routes = routes.lock().unwrap();
        *routes.hits.entry(target.clone()).or_default() += 1;
        routes
            .routes
            .get(&target)
            .or_else(|| routes.routes.get(&path))
            .cloned()
    };

    let (status, body) = match route {
        Some(Route::Reply {
            status,
            body,
            delay,
        }) => {
            routes.lock().unwrap().enter(&target);
            tokio::time::sleep(delay).await;
            routes.lock().unwrap().leave(&target);
            (status, body)
        }
        Some(Route::Hang) => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return Ok(());
        }
        None => (404, "no such page".to_string()),
    };

    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

pub const CF_TOURIST: &str = "/api/user.info?handles=tourist";
pub const CF_TOURIST_RATING: &str = "/api/user.rating?handle=tourist";

pub const CF_USER_OK: &str = r#"{"status":"OK","result":[{"handle":"tourist","firstName":"Gennady","lastName":"Korotkevich","rating":3800,"maxRating":4009}]}"#;

pub const CF_USER_MISSING: &str =
    r#"{"status":"FAILED","comment":"handles: User with handle tourist not found"}"#;

pub const CF_CALL_LIMIT: &str = r#"{"status":"FAILED","comment":"Call limit exceeded"}"#;

/// One `user.rating` entry for contest `id`.
pub fn cf_change(id: u32, old: i32, new: i32) -> String {
    format!(
        r#"{{"contestId":{id},"contestName":"Codeforces Round {id}","handle":"tourist","rank":1,"ratingUpdateTimeSeconds":{},"oldRating":{old},"newRating":{new}}}"#,
        1_600_000_000 + i64::from(id) * 86_400
    )
}

/// A `user.rating` response with `changes`.
pub fn cf_rating(changes: &[String]) -> String {
    format!(r#"{{"status":"OK","result":[{}]}}"#, changes.join(","))
}
