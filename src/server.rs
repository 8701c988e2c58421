// HTTP/1.1 front end: accept loop, worker pool, per-request dispatch
use std::io::Write;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Srv;
use crate::context::Context;
use crate::filters::FilterChain;
use crate::http::{HttpRequest, HttpResponse};
use crate::scope::ScopeTree;

/// Everything a worker needs, frozen before the first connection is accepted.
pub struct Shared {
    pub scopes: ScopeTree,
    pub chain: FilterChain,
    pub buf_size: usize,
    pub client_timeout: u64,
    pub upstream_timeout: u64,
    active: AtomicUsize,
}

impl Shared {
    pub fn new(cfg: &Srv, scopes: ScopeTree, chain: FilterChain) -> Self {
        Shared {
            scopes,
            chain,
            buf_size: cfg.buffer_size,
            client_timeout: cfg.client_timeout,
            upstream_timeout: cfg.upstream_timeout,
            active: AtomicUsize::new(0),
        }
    }

    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

struct ThreadPool {
    sender: Option<mpsc::SyncSender<TcpStream>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    fn new(size: usize, shared: Arc<Shared>) -> Self {
        let (tx, rx) = mpsc::sync_channel::<TcpStream>(size * 2);
        let rx = Arc::new(Mutex::new(rx));
        let mut workers = Vec::with_capacity(size);

        for _ in 0..size {
            let rx = Arc::clone(&rx);
            let shared = Arc::clone(&shared);
            workers.push(thread::spawn(move || loop {
                let stream = {
                    let lock = match rx.lock() {
                        Ok(g) => g,
                        Err(_) => break,
                    };
                    lock.recv()
                };
                let Ok(s) = stream else { break };
                let _guard = ConnGuard::new(&shared.active);
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    handle_h1(s, &shared);
                }));
                if result.is_err() {
                    tracing::error!("Panic in handler (recovered)");
                }
            }));
        }

        ThreadPool { sender: Some(tx), workers }
    }

    fn dispatch(&self, stream: TcpStream) -> Result<(), TcpStream> {
        match &self.sender {
            Some(tx) => tx.try_send(stream).map_err(|e| match e {
                mpsc::TrySendError::Full(s) | mpsc::TrySendError::Disconnected(s) => s,
            }),
            None => Err(stream),
        }
    }

    fn shutdown(&mut self) {
        self.sender.take();
        for w in self.workers.drain(..) {
            let _ = w.join();
        }
    }
}

struct ConnGuard<'a>(&'a AtomicUsize);

impl<'a> ConnGuard<'a> {
    fn new(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        ConnGuard(count)
    }
}

impl Drop for ConnGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct Server {
    cfg: Srv,
    shared: Arc<Shared>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    pub fn new(cfg: Srv, scopes: ScopeTree, chain: FilterChain) -> Self {
        let shared = Arc::new(Shared::new(&cfg, scopes, chain));
        Server { cfg, shared, shutdown: Arc::new(AtomicBool::new(false)) }
    }

    /// Set to true to stop accepting and drain.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.cfg.listen_addr)?;
        self.serve(listener)
    }

    pub fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        let num_workers = if self.cfg.worker_threads > 0 {
            self.cfg.worker_threads
        } else {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(4) * 2
        };
        let local = listener.local_addr()?;
        tracing::info!("Listening on {local} (http) [HTTP/1.1]");
        tracing::info!(
            "Workers: {num_workers} | Max connections: {} | Locations: {}",
            self.cfg.max_connections,
            self.shared.scopes.len()
        );
        let top = self.shared.scopes.server();
        tracing::info!(
            "Server scope: root {} | file_etag {} | etag_format {}",
            top.root.display(),
            if top.file_etag { "on" } else { "off" },
            top.strategy
        );

        let mut pool = ThreadPool::new(num_workers, Arc::clone(&self.shared));
        listener.set_nonblocking(true)?;

        while !self.shutdown.load(Ordering::Acquire) {
            match listener.accept() {
                Ok((stream, _)) => {
                    let _ = stream.set_nonblocking(false);
                    if self.shared.active_connections() >= self.cfg.max_connections {
                        reject_overloaded(stream);
                        continue;
                    }
                    if let Err(s) = pool.dispatch(stream) {
                        reject_overloaded(s);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock
                           || e.kind() == std::io::ErrorKind::TimedOut => {
                    thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    tracing::error!("Accept error: {e}");
                    thread::sleep(Duration::from_millis(50));
                }
            }
        }

        self.drain();
        pool.shutdown();
        tracing::info!("Server stopped.");
        Ok(())
    }

    fn drain(&self) {
        let timeout_secs = self.cfg.shutdown_timeout;
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        tracing::info!("Draining connections...");
        loop {
            let active = self.shared.active_connections();
            if active == 0 {
                break;
            }
            if Instant::now() > deadline {
                tracing::warn!("Forcing shutdown with {active} active connections (timeout {timeout_secs}s)");
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }
    }
}

fn reject_overloaded(mut s: TcpStream) {
    let _ = s.write_all(&HttpResponse::error(503, "Server overloaded").to_bytes());
    let _ = s.shutdown(Shutdown::Both);
}

/// Produce the final response for one parsed request: content from the
/// matched location's upstream, then the header filter chain.
pub fn respond(shared: &Shared, req: &HttpRequest, ip: &str) -> HttpResponse {
    let loc = match req.normalized_path() {
        Ok(path) => shared.scopes.find(&path),
        Err(_) => shared.scopes.find(req.uri_path()),
    };
    let mut resp = match &loc.upstream {
        Some(addr) => crate::upstream::fetch(
            addr,
            req,
            Duration::from_secs(shared.upstream_timeout),
            shared.buf_size,
        ),
        None => HttpResponse::error(502, "No upstream configured"),
    };

    let mut ctx = Context::new(ip, loc);
    if shared.chain.run(req, &mut resp, &mut ctx).is_err() {
        resp = HttpResponse::error(500, "Internal Server Error");
    }
    crate::log::response(&ctx.client_ip, resp.status_code, ctx.elapsed_ms());
    resp
}

fn handle_h1(mut c: TcpStream, shared: &Shared) {
    let ip = c.peer_addr().map(|a| a.ip().to_string()).unwrap_or_else(|_| "?".into());
    let timeout = Some(Duration::from_secs(shared.client_timeout));
    let _ = c.set_read_timeout(timeout);
    let _ = c.set_write_timeout(timeout);
    let _ = c.set_nodelay(true);

    let raw = match crate::http::read_request(&mut c, shared.buf_size) {
        Ok(d) => d,
        Err(e) => {
            if let Some(code) = e.status() {
                let _ = c.write_all(&HttpResponse::error(code, &e.to_string()).to_bytes());
            }
            tracing::debug!("read error from {ip}: {e}");
            return;
        }
    };
    let Some(req) = HttpRequest::parse(&raw) else {
        let _ = c.write_all(&HttpResponse::error(400, "Bad Request").to_bytes());
        return;
    };

    crate::log::request(&req.method, &req.target, &ip);
    let resp = respond(shared, &req, &ip);
    if c.write_all(&resp.to_bytes()).is_err() {
        tracing::warn!("Failed to write response to client");
    }
    let _ = c.shutdown(Shutdown::Write);
}
