//! Protocol-upgrade tunnelling (WebSocket hot-reload sockets).
//!
//! # Data Flow
//! ```text
//! Client ──Upgrade──▶ Edge ──Upgrade──▶ Dev server
//! Client ◀───101───── Edge ◀───101───── Dev server
//! Client ◀══ raw bytes, both directions ══▶ Dev server
//! ```
//!
//! # Design Decisions
//! - Byte-level relay once both sides switched protocols; frames are not parsed
//! - A tunnel ends when either side closes or the process shuts down
//! - Dropping the tunnel task closes both sockets

use axum::http::{header, HeaderMap};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::copy_bidirectional;

use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// True when the request asks to switch protocols.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    connection_upgrade && headers.contains_key(header::UPGRADE)
}

/// Relay bytes between the client and upstream connections once both
/// upgrades complete.
pub fn spawn_tunnel(target: &'static str, client: OnUpgrade, upstream: OnUpgrade, shutdown: &Shutdown) {
    let mut shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let (client, upstream) = match tokio::try_join!(client, upstream) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(target_name = target, error = %e, "Protocol upgrade failed");
                metrics::record_upstream_failure(target, "upgrade");
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut upstream = TokioIo::new(upstream);
        metrics::tunnel_opened(target);
        tracing::debug!(target_name = target, "Upgrade tunnel opened");

        tokio::select! {
            result = copy_bidirectional(&mut client, &mut upstream) => match result {
                Ok((to_upstream, to_client)) => {
                    tracing::debug!(target_name = target, to_upstream, to_client, "Upgrade tunnel closed");
                }
                Err(e) => {
                    tracing::debug!(target_name = target, error = %e, "Upgrade tunnel closed with error");
                }
            },
            _ = shutdown.recv() => {
                tracing::debug!(target_name = target, "Closing upgrade tunnel for shutdown");
            }
        }

        metrics::tunnel_closed(target);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_upgrade_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        assert!(!is_upgrade_request(&headers));

        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, Upgrade"));
        assert!(is_upgrade_request(&headers));

        headers.remove(header::UPGRADE);
        assert!(!is_upgrade_request(&headers));
    }
}
