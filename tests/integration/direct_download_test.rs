use avtool::core::download::{download_direct, DownloadPrompt, HttpDownload};
use avtool::core::retry::{RetryOutcome, RetryPolicy};
use avtool::{AvError, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::TempDir;

struct Answers {
    keep_going: bool,
    asked: Vec<u32>,
}

impl DownloadPrompt for Answers {
    fn continue_next_round(&mut self, round: u32) -> Result<bool> {
        self.asked.push(round);
        Ok(self.keep_going)
    }

    fn replacement_format(&mut self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Serves one canned response per connection, in order; returns how many were served
fn serve(responses: Vec<(u16, Vec<u8>)>) -> (String, JoinHandle<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/video.mp4", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let mut served = 0;
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                break;
            };

            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap_or(0) > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }

            let reason = if status == 200 { "OK" } else { "Error" };
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: video/mp4\r\nConnection: close\r\n\r\n",
                status,
                reason,
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
            served += 1;
        }
        served
    });

    (url, handle)
}

/// Sends the headers and the first `sent` bytes of a `declared` byte body, then stalls
/// until `release` fires
fn serve_stalled(declared: usize, sent: usize) -> (String, mpsc::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/video.mp4", listener.local_addr().unwrap());
    let (release, released) = mpsc::channel::<()>();

    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap_or(0) > 0 {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: video/mp4\r\n\r\n",
            declared
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&payload(sent));
        let _ = stream.flush();
        let _ = released.recv_timeout(Duration::from_secs(60));
    });

    (url, release)
}

fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn test_direct_download_writes_file() {
    let body = payload(20_000);
    let (url, server) = serve(vec![(200, body.clone())]);
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clip_720p.mp4");

    let download = HttpDownload::with_client(&url, &path, client(), None);
    let mut answers = Answers {
        keep_going: true,
        asked: Vec::new(),
    };
    let outcome = download_direct(download, RetryPolicy::direct(), &mut answers).unwrap();

    assert_eq!(outcome, RetryOutcome::Succeeded { round: 1, retry: 1 });
    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert_eq!(server.join().unwrap(), 1);
}

#[test]
fn test_server_error_is_retried() {
    let body = payload(5_000);
    let (url, server) = serve(vec![(500, b"oops".to_vec()), (200, body.clone())]);
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clip_360p.mp4");

    let download = HttpDownload::with_client(&url, &path, client(), None);
    let mut answers = Answers {
        keep_going: true,
        asked: Vec::new(),
    };
    let outcome = download_direct(download, RetryPolicy::new(1, 3), &mut answers).unwrap();

    assert_eq!(outcome, RetryOutcome::Succeeded { round: 1, retry: 2 });
    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert_eq!(server.join().unwrap(), 2);
}

#[test]
fn test_failed_round_removes_partial_file() {
    let (url, server) = serve(vec![(404, b"gone".to_vec())]);
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clip_1080p.mp4");

    let download = HttpDownload::with_client(&url, &path, client(), None);
    let mut answers = Answers {
        keep_going: false,
        asked: Vec::new(),
    };
    let outcome = download_direct(download, RetryPolicy::new(2, 1), &mut answers).unwrap();

    assert_eq!(outcome, RetryOutcome::Declined { round: 1 });
    assert_eq!(answers.asked, vec![1]);
    assert!(!path.exists());
    assert!(!temp.path().join("clip_1080p.mp4.part").exists());
    assert_eq!(server.join().unwrap(), 1);
}

#[test]
fn test_cancel_flag_aborts_and_cleans_up() {
    let (url, server) = serve(vec![(200, payload(50_000))]);
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clip_480p.mp4");

    let cancel = Arc::new(AtomicBool::new(true));
    let download = HttpDownload::with_client(&url, &path, client(), Some(cancel));
    let mut answers = Answers {
        keep_going: true,
        asked: Vec::new(),
    };
    let result = download_direct(download, RetryPolicy::direct(), &mut answers);

    assert!(matches!(result, Err(AvError::Cancelled)));
    assert!(answers.asked.is_empty());
    assert!(!path.exists());
    assert_eq!(server.join().unwrap(), 1);
}

#[test]
fn test_stalled_body_times_out() {
    let (url, release) = serve_stalled(100_000, 100);
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clip_720p.mp4");

    let client = HttpDownload::client_builder(Duration::from_secs(1))
        .no_proxy()
        .build()
        .unwrap();
    let download = HttpDownload::with_client(&url, &path, client, None);
    let part = download.part_path();

    let (done, finished) = mpsc::channel();
    thread::spawn(move || {
        let _ = done.send(download.fetch_once());
    });

    let result = finished
        .recv_timeout(Duration::from_secs(20))
        .expect("fetch_once should give up on a stalled body");
    let _ = release.send(());

    assert!(result.is_err());
    assert!(!path.exists());
    assert!(!part.exists());
}

#[test]
fn test_failed_attempt_keeps_existing_file() {
    let (url, server) = serve(vec![(500, b"oops".to_vec())]);
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("clip_720p.mp4");
    std::fs::write(&path, b"finished earlier").unwrap();

    let download = HttpDownload::with_client(&url, &path, client(), None);
    let part = download.part_path();
    let mut answers = Answers {
        keep_going: false,
        asked: Vec::new(),
    };
    let outcome = download_direct(download, RetryPolicy::new(1, 1), &mut answers).unwrap();

    assert_eq!(outcome, RetryOutcome::Exhausted { rounds: 1 });
    assert_eq!(std::fs::read(&path).unwrap(), b"finished earlier");
    assert!(!part.exists());
    assert_eq!(server.join().unwrap(), 1);
}

#[test]
fn test_part_path() {
    let download = HttpDownload::with_client(
        "http://example.com/v.mp4",
        std::path::Path::new("/videos/clip_480p.mp4"),
        client(),
        None,
    );
    assert_eq!(
        download.part_path(),
        std::path::PathBuf::from("/videos/clip_480p.mp4.part")
    );
}
