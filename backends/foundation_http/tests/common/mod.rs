//! Test HTTP server for the integration tests.
//!
//! WHY: The client has to be exercised against real sockets, including
//! keep-alive reuse and connections the server closes mid-way.
//!
//! WHAT: `TestHttpServer` listens on localhost, parses each request just
//! enough to hand it to a handler, records it, and writes back the
//! handler's bytes.
//!
//! HOW: stdlib `TcpListener` with a thread per connection. A connection is
//! served until the client closes it, the client sends `Connection: close`,
//! or the handler asks for the connection to be closed.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

type Handler = Arc<dyn Fn(&RecordedRequest) -> TestResponse + Send + Sync>;

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub version: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    fn wants_close(&self) -> bool {
        self.header("connection")
            .is_some_and(|value| value.eq_ignore_ascii_case("close"))
    }
}

/// Bytes to write back, and whether to close the connection afterwards.
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub bytes: Vec<u8>,
    pub close: bool,
}

impl TestResponse {
    /// `200 OK` with a `Content-Length` framed body.
    pub fn ok(body: impl AsRef<[u8]>) -> Self {
        Self::with_status(200, "OK", &[], body)
    }

    pub fn with_status(status: u16, reason: &str, headers: &[(&str, &str)], body: impl AsRef<[u8]>) -> Self {
        let body = body.as_ref();
        let mut head = format!("HTTP/1.1 {status} {reason}\r\n");
        for (name, value) in headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(body);
        Self { bytes, close: false }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self::with_status(status, "Redirect", &[("Location", location)], b"")
    }

    /// Writes `bytes` verbatim and closes the connection.
    pub fn raw(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            bytes: bytes.as_ref().to_vec(),
            close: true,
        }
    }
}

pub struct TestHttpServer {
    addr: String,
    port: u16,
    running: Arc<AtomicBool>,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestHttpServer {
    pub fn start() -> Self {
        Self::with_response(|_| TestResponse::ok(b"OK"))
    }

    pub fn with_response<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> TestResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let local = listener.local_addr().expect("local addr");
        let addr = format!("http://{local}");

        let running = Arc::new(AtomicBool::new(true));
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let server = Self {
            addr,
            port: local.port(),
            running: Arc::clone(&running),
            connections: Arc::clone(&connections),
            requests: Arc::clone(&requests),
        };

        thread::spawn(move || {
            listener.set_nonblocking(true).expect("non-blocking listener");
            while running.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        connections.fetch_add(1, Ordering::SeqCst);
                        let handler = Arc::clone(&handler);
                        let requests = Arc::clone(&requests);
                        thread::spawn(move || {
                            if let Err(err) = serve(stream, &handler, &requests) {
                                tracing::debug!("test server connection error: {err}");
                            }
                        });
                    }
                    Err(ref err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub fn base_url(&self) -> &str {
        &self.addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

fn serve(
    stream: TcpStream,
    handler: &Handler,
    requests: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    while let Some(request) = read_request(&mut reader)? {
        requests.lock().expect("requests lock").push(request.clone());
        let response = handler(&request);

        writer.write_all(&response.bytes)?;
        writer.flush()?;

        if response.close || request.wants_close() {
            writer.shutdown(std::net::Shutdown::Both)?;
            break;
        }
    }
    Ok(())
}

fn read_request(reader: &mut BufReader<TcpStream>) -> std::io::Result<Option<RecordedRequest>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    let mut parts = line.trim_end().splitn(3, ' ');
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();
    let version = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            break;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;

    Ok(Some(RecordedRequest {
        method,
        target,
        version,
        headers,
        body,
    }))
}
