// Minimal HTTP fixture for transfer tests: one request per connection,
// optional Range handling, optional drip-fed body so a test can observe
// mid-transfer state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct ServerOptions {
    pub body: Vec<u8>,
    /// Advertise `Accept-Ranges: bytes` on HEAD.
    pub advertise_ranges: bool,
    /// Answer Range requests with 206 and the requested suffix. When false
    /// (with `advertise_ranges` true) a Range request gets 200 + full body.
    pub honor_ranges: bool,
    /// Answer every GET with this status and an empty body.
    pub status_override: Option<u16>,
    /// Send the body in small flushed chunks with this pause between them.
    pub chunk_delay: Option<Duration>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            body: Vec::new(),
            advertise_ranges: true,
            honor_ranges: true,
            status_override: None,
            chunk_delay: None,
        }
    }
}

pub struct TestServer {
    pub url: String,
    gets: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

pub async fn spawn(options: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let gets = Arc::new(AtomicUsize::new(0));
    let options = Arc::new(options);

    let accept_gets = gets.clone();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(handle(socket, options.clone(), accept_gets.clone()));
        }
    });

    TestServer {
        url: format!("http://{}/model.bin", addr),
        gets,
    }
}

async fn handle(mut socket: TcpStream, options: Arc<ServerOptions>, gets: Arc<AtomicUsize>) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut buf).await else {
            return;
        };
        if n == 0 {
            return;
        }
        request.extend_from_slice(&buf[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let request = String::from_utf8_lossy(&request).into_owned();
    let total = options.body.len();

    if request.starts_with("HEAD") {
        let ranges = if options.advertise_ranges {
            "Accept-Ranges: bytes\r\n"
        } else {
            ""
        };
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
            total, ranges
        );
        let _ = socket.write_all(header.as_bytes()).await;
        return;
    }

    gets.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = options.status_override {
        let header = format!(
            "HTTP/1.1 {} Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            status
        );
        let _ = socket.write_all(header.as_bytes()).await;
        return;
    }

    let range_start = request.lines().find_map(|line| {
        line.to_ascii_lowercase()
            .strip_prefix("range: bytes=")
            .and_then(|spec| spec.split('-').next()?.parse::<usize>().ok())
    });

    let (header, body) = match range_start {
        Some(start) if options.honor_ranges && start > 0 && start < total => {
            let slice = options.body[start..].to_vec();
            (
                format!(
                    "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\nConnection: close\r\n\r\n",
                    slice.len(),
                    start,
                    total - 1,
                    total
                ),
                slice,
            )
        }
        _ => (
            format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                total
            ),
            options.body.clone(),
        ),
    };

    if socket.write_all(header.as_bytes()).await.is_err() {
        return;
    }
    match options.chunk_delay {
        Some(delay) => {
            for chunk in body.chunks(512) {
                if socket.write_all(chunk).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
                tokio::time::sleep(delay).await;
            }
        }
        None => {
            let _ = socket.write_all(&body).await;
        }
    }
    let _ = socket.flush().await;
}
