//! JSON-lines server: one request per stdin line, one response per stdout line.
//!
//! Requests are checked on a pool of worker threads sharing one `Container`,
//! so the import cache is reused across requests. Responses are written as
//! they complete and may be out of order; clients match them by `id`.

use crossbeam_channel::{bounded, Receiver, Sender};
use pkgcheck_core::{Container, Diagnostic};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: serde_json::Value,
    filename: PathBuf,
    /// Unsaved buffer contents; absent or empty reads the file
    #[serde(default)]
    src: Option<String>,
    #[serde(default)]
    include_tests: Option<bool>,
    #[serde(default)]
    all_errors: Option<bool>,
}

#[derive(Debug, Serialize)]
struct Response {
    id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<Vec<Diagnostic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Response {
    fn error(id: serde_json::Value, message: String) -> Self {
        Self {
            id,
            diagnostics: None,
            error: Some(message),
        }
    }
}

/// Serve requests from stdin until it closes.
pub fn run(container: Arc<Container>, workers: usize) -> anyhow::Result<()> {
    let workers = workers.max(1);
    let (job_tx, job_rx) = bounded::<String>(workers * 4);
    let (out_tx, out_rx) = bounded::<String>(workers * 8);

    let mut handles = Vec::with_capacity(workers);
    for i in 0..workers {
        let job_rx = job_rx.clone();
        let out_tx = out_tx.clone();
        let container = Arc::clone(&container);
        let handle = std::thread::Builder::new()
            .name(format!("pkgcheck-worker-{i}"))
            .spawn(move || worker_main(job_rx, out_tx, container))?;
        handles.push(handle);
    }
    // the output channel closes once every worker is done
    drop(out_tx);

    let reader = std::thread::spawn(move || -> std::io::Result<()> {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if job_tx.send(line).is_err() {
                break;
            }
        }
        Ok(())
    });

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for response in &out_rx {
        writeln!(out, "{response}")?;
        out.flush()?;
    }

    for handle in handles {
        if handle.join().is_err() {
            warn!("serve worker panicked");
        }
    }
    match reader.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("stdin reader panicked"),
    }
    Ok(())
}

fn worker_main(job_rx: Receiver<String>, out_tx: Sender<String>, container: Arc<Container>) {
    for line in &job_rx {
        let response = handle_line(&container, &line);
        let encoded = match serde_json::to_string(&response) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!("cannot encode response: {err}");
                continue;
            }
        };
        if out_tx.send(encoded).is_err() {
            break;
        }
    }
}

fn handle_line(container: &Container, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            return Response::error(serde_json::Value::Null, format!("invalid request: {err}"))
        }
    };
    debug!(file = %request.filename.display(), "serve request");

    let mut target = container.target(&request.filename);
    if let Some(include_tests) = request.include_tests {
        target = target.include_tests(include_tests);
    }
    if let Some(all_errors) = request.all_errors {
        target = target.all_errors(all_errors);
    }
    if let Some(src) = request.src {
        target = target.with_source(src.into_bytes());
    }

    match container.check(&target) {
        Ok(diagnostics) => Response {
            id: request.id,
            diagnostics: Some(diagnostics),
            error: None,
        },
        Err(err) => Response::error(request.id, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgcheck_core::CheckerConfig;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_request() {
        let container = Container::new(CheckerConfig::default());
        let response = handle_line(&container, "{not json");

        assert_eq!(response.id, serde_json::Value::Null);
        assert!(response.error.unwrap().starts_with("invalid request"));
    }

    #[test]
    fn test_request_with_buffer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.mini");
        std::fs::write(&path, "package main\n").unwrap();
        let container = Container::new(CheckerConfig::default());

        let line = serde_json::json!({
            "id": 7,
            "filename": path,
            "src": "package main\nvar x = y\n",
        })
        .to_string();
        let response = handle_line(&container, &line);

        assert_eq!(response.id, serde_json::json!(7));
        let diagnostics = response.diagnostics.unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "undeclared name: y");
    }

    #[test]
    fn test_fatal_error_response() {
        let dir = TempDir::new().unwrap();
        let container = Container::new(CheckerConfig::default());

        let line = serde_json::json!({"id": "a", "filename": dir.path().join("gone.mini")})
            .to_string();
        let response = handle_line(&container, &line);

        assert!(response.diagnostics.is_none());
        assert!(response.error.is_some());
    }
}
