// ABOUTME: HTTP reachability probe used for post-deploy validation.
// ABOUTME: One hyper http1 GET through the proxy per poll attempt.

use bytes::Bytes;
use http_body_util::Empty;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::health::CheckOutcome;

/// One reachability attempt against `http://host:port/`.
///
/// Any response below 500 counts as reachable: a TLS redirect or an auth
/// challenge still proves the proxy is routing to the app. Connection
/// failures and 5xx (nginx answering for a dead upstream) are pending, not
/// terminal: the upstream may still be warming up.
pub async fn http_check(host: &str, port: u16, timeout: Duration) -> CheckOutcome {
    match tokio::time::timeout(timeout, probe_once(host, port)).await {
        Ok(Ok(status)) if status < 500 => CheckOutcome::Ready,
        Ok(Ok(status)) => {
            tracing::debug!(status, "proxy answered with server error");
            CheckOutcome::StillPending
        }
        Ok(Err(e)) => {
            tracing::debug!("probe attempt failed: {}", e);
            CheckOutcome::StillPending
        }
        Err(_) => CheckOutcome::StillPending,
    }
}

async fn probe_once(
    host: &str,
    port: u16,
) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
    let stream = TcpStream::connect((host, port)).await?;
    let io = TokioIo::new(stream);

    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let request = Request::builder()
        .uri("/")
        .header(hyper::header::HOST, host)
        .body(Empty::<Bytes>::new())?;

    let response = sender.send_request(request).await?;
    Ok(response.status().as_u16())
}
