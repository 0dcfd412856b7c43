//! A scripted HTTP server for exercising the remote adapters over real sockets.
//!
//! Each accepted connection gets the next scripted reply and is then closed, so every request the
//! client makes lands on a fresh connection and is recorded in order.

use std::io::{BufRead as _, BufReader, Read as _, Write as _};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread;

/// A request as the server saw it: the head with lowercased header names, then the body.
pub(crate) struct Recorded {
    /// The body of the request.
    pub(crate) body: String,
    /// The request line and headers, header names lowercased.
    pub(crate) head: String,
}

/// A server answering with a fixed list of `(status, body)` replies.
pub(crate) struct StubServer {
    /// The requests seen so far.
    requests: Receiver<Recorded>,
    /// The base URL the server listens on.
    pub(crate) url: String,
}

impl StubServer {
    /// Starts a server on an ephemeral port that answers with `replies`, one per connection.
    pub(crate) fn start(replies: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, requests) = mpsc::channel();

        let _ = thread::spawn(move || {
            for (status, body) in replies {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let Some(request) = read_request(&stream) else {
                    return;
                };
                if tx.send(request).is_err() {
                    return;
                }
                let reason = if status < 400 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = (&stream).write_all(response.as_bytes());
            }
        });

        Self { requests, url }
    }

    /// Returns the requests answered so far, in order.
    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.try_iter().collect()
    }
}

/// Reads one request off `stream`, using `Content-Length` to find the end of the body.
fn read_request(stream: &TcpStream) -> Option<Recorded> {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    let mut length = 0;

    loop {
        let mut line = String::new();
        let _ = reader.read_line(&mut line).ok()?;
        if line.trim_end().is_empty() {
            break;
        }
        let line = match line.split_once(':') {
            Some((name, value)) => format!("{}:{value}", name.to_ascii_lowercase()),
            None => line,
        };
        if let Some(value) = line.strip_prefix("content-length:") {
            length = value.trim().parse().ok()?;
        }
        head.push_str(&line);
    }

    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(Recorded {
        body: String::from_utf8(body).ok()?,
        head,
    })
}
