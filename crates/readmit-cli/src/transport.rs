//! Newline-delimited JSON transport over any async reader/writer pair.
//!
//! Each input line is one [`ServiceRequest`]. Requests are handled
//! concurrently on the blocking pool, so responses are written in completion
//! order; clients match them up through the echoed `id`.

use std::io;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, trace};

use readmit_core::{ReadmissionService, ServiceRequest, ServiceResponse};

use crate::logging::redact_value;

/// Decode one request line and handle it. Never fails; bad input becomes an error response.
pub fn dispatch(service: &ReadmissionService, line: &str) -> ServiceResponse {
    match parse_line(line) {
        Ok(value) => handle_value(service, value),
        Err(response) => response,
    }
}

fn parse_line(line: &str) -> Result<Value, ServiceResponse> {
    serde_json::from_str(line)
        .map_err(|error| ServiceResponse::error(format!("Invalid request: {error}")))
}

fn handle_value(service: &ReadmissionService, value: Value) -> ServiceResponse {
    let id = value.get("id").cloned();
    match serde_json::from_value::<ServiceRequest>(value) {
        Ok(request) => service.handle(request),
        Err(error) => ServiceResponse::error(format!("Invalid request: {error}")).with_id(id),
    }
}

fn encode(response: &ServiceResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|error| {
        error!(%error, "could not encode response");
        r#"{"status":"error","message":"response encoding failed"}"#.to_string()
    })
}

/// Request tasks that have not been reaped yet. Finished tasks are joined on every spawn.
struct InFlight {
    tasks: JoinSet<()>,
}

impl InFlight {
    fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        while let Some(joined) = self.tasks.try_join_next() {
            report(joined);
        }
        self.tasks.spawn(task);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tasks.len()
    }

    async fn finish(mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            report(joined);
        }
    }
}

fn report(joined: Result<(), JoinError>) {
    if let Err(error) = joined {
        error!(%error, "request task failed");
    }
}

/// Serve requests from `reader` until EOF and return how many were handled.
///
/// Blank lines are skipped. All in-flight requests finish before this returns.
pub async fn serve<R, W>(service: ReadmissionService, reader: R, writer: W) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    serve_with(move |value| handle_value(&service, value), reader, writer).await
}

async fn serve_with<H, R, W>(handler: H, reader: R, writer: W) -> io::Result<usize>
where
    H: Fn(Value) -> ServiceResponse + Clone + Send + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = receiver.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        writer.shutdown().await
    });

    let mut lines = reader.lines();
    let mut in_flight = InFlight::new();
    let mut handled = 0usize;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        handled += 1;
        trace!(request = redact_value(line), "received request");

        let value = match parse_line(line) {
            Ok(value) => value,
            Err(response) => {
                let _ = sender.send(encode(&response));
                continue;
            }
        };
        let id = value.get("id").cloned();
        let handler = handler.clone();
        let sender = sender.clone();
        in_flight.spawn(async move {
            let response = match tokio::task::spawn_blocking(move || handler(value)).await {
                Ok(response) => response,
                Err(error) => {
                    error!(%error, "request handler panicked");
                    ServiceResponse::error("Internal error while handling request").with_id(id)
                }
            };
            debug!(success = response.is_success(), "handled request");
            // The writer only stops on an I/O error, which `serve` reports below.
            let _ = sender.send(encode(&response));
        });
    }

    in_flight.finish().await;
    drop(sender);
    writer_task.await.map_err(io::Error::other)??;
    Ok(handled)
}
