//! Background party directory gossip.
//!
//! Periodically sends our directory snapshot to every known party and merges
//! what they send back, so nodes converge on the same view without waiting
//! for inbound `/partyinfo` calls.

use crate::config::GossipConfig;
use relay_enclave::{PartyDirectory, PeerClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn a background gossip task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_gossip_task(
    directory: Arc<dyn PartyDirectory>,
    peers: Arc<dyn PeerClient>,
    config: GossipConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Gossip task disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        tracing::info!("Gossip task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;
            let merged = gossip_round(directory.as_ref(), peers.as_ref()).await;
            tracing::debug!("Gossip: merged {} peer snapshot(s)", merged);
        }
    })
}

/// Exchange snapshots with every known party once.
///
/// Returns the number of peer snapshots merged. Failures are logged and
/// skipped; an unreachable peer never stops the round.
pub async fn gossip_round(directory: &dyn PartyDirectory, peers: &dyn PeerClient) -> usize {
    let snapshot = match directory.serialize_snapshot().await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Gossip: failed to serialize snapshot: {}", e);
            return 0;
        }
    };

    let mut merged = 0;
    for url in directory.party_urls().await {
        let theirs = match peers.exchange_party_info(&url, &snapshot).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Gossip: {} unreachable: {}", url, e);
                continue;
            }
        };

        match directory.merge_update(&theirs).await {
            Ok(()) => merged += 1,
            Err(e) => tracing::warn!("Gossip: bad snapshot from {}: {}", url, e),
        }
    }

    merged
}
