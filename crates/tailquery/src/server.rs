//! Extension endpoint: newline-delimited JSON over a Unix socket.
//!
//! One request per line, one response per line:
//!
//! ```text
//! -> {"call":"generate","table":"tailscale_tags","context":{"constraints":{}}}
//! <- {"status":{"code":0,"message":"OK"},"response":[{"tag":"tag:prod"}]}
//! ```
//!
//! `ping` answers immediately, `routes` returns column definitions and
//! `generate` scans a table. Failures are reported in `status` with code 1;
//! the connection stays open.

use std::collections::BTreeMap;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tailquery_core::{
    CoreError, QueryContext, Row, TableKind, TablePlugin, TailnetService, Upstream, table_plugins,
};

// ── Wire types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Routes {
        #[serde(default)]
        table: Option<String>,
    },
    Generate {
        table: String,
        #[serde(default)]
        context: QueryContext,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default)]
    pub response: Vec<Row>,
}

impl Response {
    fn ok(rows: Vec<Row>) -> Self {
        Self {
            status: Status {
                code: 0,
                message: "OK".into(),
            },
            response: rows,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status {
                code: 1,
                message: message.into(),
            },
            response: Vec::new(),
        }
    }
}

// ── Endpoint ─────────────────────────────────────────────────────────

/// Request dispatcher shared by every connection.
pub struct Endpoint<U> {
    plugins: BTreeMap<&'static str, TablePlugin<U>>,
    response_timeout: Option<Duration>,
}

impl<U: Upstream> Endpoint<U> {
    pub fn new(service: &TailnetService<U>, response_timeout: Option<Duration>) -> Self {
        let plugins = table_plugins(service)
            .into_iter()
            .map(|plugin| (plugin.name(), plugin))
            .collect();
        Self {
            plugins,
            response_timeout,
        }
    }

    /// Answer one request line.
    pub async fn respond(&self, line: &str) -> Response {
        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => return Response::error(format!("invalid request: {e}")),
        };

        let Some(limit) = self.response_timeout else {
            return self.dispatch(request).await;
        };
        tokio::time::timeout(limit, self.dispatch(request))
            .await
            .unwrap_or_else(|_| {
                warn!(timeout_secs = limit.as_secs(), "request timed out");
                Response::error(format!("no response within {}s", limit.as_secs()))
            })
    }

    async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::ok(Vec::new()),
            Request::Routes { table } => match self.routes(table.as_deref()) {
                Ok(rows) => Response::ok(rows),
                Err(e) => Response::error(e.to_string()),
            },
            Request::Generate { table, context } => match self.generate(&table, &context).await {
                Ok(rows) => {
                    debug!(table = %table, rows = rows.len(), "generated");
                    Response::ok(rows)
                }
                Err(e) => {
                    warn!(table = %table, error = %e, "generate failed");
                    Response::error(e.to_string())
                }
            },
        }
    }

    fn plugin(&self, name: &str) -> Result<&TablePlugin<U>, CoreError> {
        self.plugins.get(name).ok_or_else(|| CoreError::UnknownTable {
            name: name.to_owned(),
        })
    }

    fn routes(&self, table: Option<&str>) -> Result<Vec<Row>, CoreError> {
        let kinds: Vec<TableKind> = match table {
            Some(name) => vec![self.plugin(name)?.kind()],
            None => self.plugins.values().map(TablePlugin::kind).collect(),
        };

        Ok(kinds
            .into_iter()
            .flat_map(|kind| {
                kind.columns().iter().map(move |c| {
                    Row::from([
                        ("table".to_owned(), kind.name().to_owned()),
                        ("name".to_owned(), c.name.to_owned()),
                        ("type".to_owned(), c.column_type.to_string()),
                    ])
                })
            })
            .collect())
    }

    async fn generate(&self, table: &str, ctx: &QueryContext) -> Result<Vec<Row>, CoreError> {
        self.plugin(table)?.generate(ctx).await
    }
}

// ── Socket lifecycle ─────────────────────────────────────────────────

/// Bind the listening socket, replacing a stale socket file left behind
/// by an earlier run. Any other kind of file at `path` is an error.
pub fn bind(path: &Path) -> io::Result<UnixListener> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            debug!(path = %path.display(), "removing stale socket");
            std::fs::remove_file(path)?;
        }
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists and is not a socket", path.display()),
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    UnixListener::bind(path)
}

/// Pause before the next `accept` after a failed one. Per-connection
/// failures retry at once; resource errors such as `EMFILE` back off.
fn accept_backoff(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => Duration::ZERO,
        _ => Duration::from_millis(100),
    }
}

/// Accept connections until `shutdown` fires or the socket file vanishes.
/// Accept failures are logged and do not stop the endpoint. The socket
/// file is removed on the way out.
pub async fn run<U: Upstream>(
    listener: UnixListener,
    path: PathBuf,
    endpoint: Arc<Endpoint<U>>,
    keep_alive: Duration,
    shutdown: CancellationToken,
) {
    info!(socket = %path.display(), "extension endpoint listening");

    let mut ticker = tokio::time::interval(keep_alive);
    ticker.tick().await; // first tick is immediate

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                if !path.exists() {
                    warn!(socket = %path.display(), "socket file removed, shutting down");
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    tokio::spawn(serve_connection(
                        stream,
                        Arc::clone(&endpoint),
                        shutdown.child_token(),
                    ));
                }
                Err(e) => {
                    let backoff = accept_backoff(&e);
                    warn!(error = %e, retry_in = ?backoff, "accept failed");
                    if !backoff.is_zero() {
                        tokio::select! {
                            () = shutdown.cancelled() => {}
                            () = tokio::time::sleep(backoff) => {}
                        }
                    }
                }
            },
        }
    }

    shutdown.cancel();
    match std::fs::remove_file(&path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            warn!(socket = %path.display(), error = %e, "failed to remove socket file");
        }
        _ => {}
    }
}

async fn serve_connection<U: Upstream>(
    stream: UnixStream,
    endpoint: Arc<Endpoint<U>>,
    cancel: CancellationToken,
) {
    debug!("connection opened");
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = endpoint.respond(&line).await;
        let mut out = match serde_json::to_vec(&response) {
            Ok(out) => out,
            Err(e) => {
                warn!(error = %e, "failed to encode response");
                break;
            }
        };
        out.push(b'\n');
        if let Err(e) = write.write_all(&out).await {
            debug!(error = %e, "write failed");
            break;
        }
    }
    debug!("connection closed");
}
