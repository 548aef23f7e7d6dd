use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use libp2p::{gossipsub, mdns, swarm::SwarmEvent, PeerId, Swarm};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::behaviour::{DrmBehaviour, DrmBehaviourEvent};
use crate::errors::{NetworkError, Result};

pub const TRANSACTIONS_TOPIC: &str = "drm-consensus";
pub const VOTE_TOPIC: &str = "vote";

struct OutboundMessage {
    topic: String,
    data: Vec<u8>,
}

/// A libp2p gossipsub + mdns node joined to `drm-consensus` (transactions
/// and block updates) and, for validators, `vote` as well. See spec.md
/// §4.3: `new_node`, `publish`, `next`, `local_peer_id`.
pub struct GossipNode {
    local_peer_id: PeerId,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    inbound: HashMap<String, Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl GossipNode {
    pub fn new(topic_name: &str, is_validator: bool) -> Result<Self> {
        let mut swarm = build_swarm()?;

        let mut topic_names = vec![topic_name.to_string()];
        if is_validator {
            topic_names.push(VOTE_TOPIC.to_string());
        }

        let mut topic_hashes = HashMap::new();
        let mut inbound_txs = HashMap::new();
        let mut inbound = HashMap::new();
        for name in &topic_names {
            let topic = gossipsub::IdentTopic::new(name.clone());
            swarm
                .behaviour_mut()
                .gossipsub
                .subscribe(&topic)
                .map_err(|e| NetworkError::Join(format!("{name}: {e}")))?;
            topic_hashes.insert(topic.hash(), name.clone());

            let (tx, rx) = mpsc::unbounded_channel();
            inbound_txs.insert(name.clone(), tx);
            inbound.insert(name.clone(), Mutex::new(rx));
        }

        swarm
            .listen_on("/ip4/0.0.0.0/tcp/0".parse().expect("valid multiaddr"))
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        let local_peer_id = *swarm.local_peer_id();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(drive_swarm(swarm, topic_hashes, inbound_txs, outbound_rx, local_peer_id));

        Ok(Self {
            local_peer_id,
            outbound_tx,
            inbound,
        })
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    /// Best-effort fan-out to all known peers on `topic`.
    pub fn publish(&self, topic: &str, data: Vec<u8>) {
        let message = OutboundMessage {
            topic: topic.to_string(),
            data,
        };
        if self.outbound_tx.send(message).is_err() {
            warn!(topic, "gossip node's swarm task has stopped");
        }
    }

    /// Await the next undelivered message on `topic`. Delivery order
    /// across peers is not guaranteed.
    pub async fn next(&self, topic: &str) -> Option<Vec<u8>> {
        let rx = self.inbound.get(topic)?;
        rx.lock().await.recv().await
    }
}

fn build_swarm() -> Result<Swarm<DrmBehaviour>> {
    let swarm = libp2p::SwarmBuilder::with_new_identity()
        .with_tokio()
        .with_tcp(
            libp2p::tcp::Config::default(),
            libp2p::noise::Config::new,
            libp2p::yamux::Config::default,
        )
        .map_err(|e| NetworkError::Transport(e.to_string()))?
        .with_behaviour(|key| {
            let gossipsub_config = gossipsub::ConfigBuilder::default()
                .heartbeat_interval(Duration::from_secs(1))
                .validation_mode(gossipsub::ValidationMode::Permissive)
                .build()
                .expect("valid gossipsub config");
            let gossipsub = gossipsub::Behaviour::new(
                gossipsub::MessageAuthenticity::Signed(key.clone()),
                gossipsub_config,
            )
            .expect("valid gossipsub behaviour");
            let mdns = mdns::tokio::Behaviour::new(mdns::Config::default(), key.public().to_peer_id())
                .expect("mdns can always bind locally");
            Ok(DrmBehaviour { gossipsub, mdns })
        })
        .map_err(|e| NetworkError::Transport(e.to_string()))?
        .with_swarm_config(|c| c.with_idle_connection_timeout(Duration::from_secs(60)))
        .build();
    Ok(swarm)
}

async fn drive_swarm(
    mut swarm: Swarm<DrmBehaviour>,
    topic_hashes: HashMap<gossipsub::TopicHash, String>,
    inbound_txs: HashMap<String, mpsc::UnboundedSender<Vec<u8>>>,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    local_peer_id: PeerId,
) {
    let topics: HashMap<String, gossipsub::IdentTopic> = topic_hashes
        .values()
        .map(|name| (name.clone(), gossipsub::IdentTopic::new(name.clone())))
        .collect();

    loop {
        tokio::select! {
            event = swarm.select_next_some() => handle_swarm_event(&mut swarm, event, &topic_hashes, &inbound_txs, local_peer_id),
            Some(outbound) = outbound_rx.recv() => {
                if let Some(topic) = topics.get(&outbound.topic) {
                    if let Err(e) = swarm.behaviour_mut().gossipsub.publish(topic.clone(), outbound.data) {
                        debug!(topic = %outbound.topic, error = %e, "publish failed, no peers yet");
                    }
                }
            }
            else => break,
        }
    }
}

fn handle_swarm_event(
    swarm: &mut Swarm<DrmBehaviour>,
    event: SwarmEvent<DrmBehaviourEvent>,
    topic_hashes: &HashMap<gossipsub::TopicHash, String>,
    inbound_txs: &HashMap<String, mpsc::UnboundedSender<Vec<u8>>>,
    local_peer_id: PeerId,
) {
    match event {
        SwarmEvent::Behaviour(DrmBehaviourEvent::Mdns(mdns::Event::Discovered(peers))) => {
            for (peer_id, _addr) in peers {
                swarm.behaviour_mut().gossipsub.add_explicit_peer(&peer_id);
            }
        }
        SwarmEvent::Behaviour(DrmBehaviourEvent::Mdns(mdns::Event::Expired(peers))) => {
            for (peer_id, _addr) in peers {
                swarm.behaviour_mut().gossipsub.remove_explicit_peer(&peer_id);
            }
        }
        SwarmEvent::Behaviour(DrmBehaviourEvent::Gossipsub(gossipsub::Event::Message {
            message,
            propagation_source,
            ..
        })) => {
            if message.source == Some(local_peer_id) || propagation_source == local_peer_id {
                debug!("dropping self-echoed gossip message");
                return;
            }
            if let Some(name) = topic_hashes.get(&message.topic) {
                if let Some(tx) = inbound_txs.get(name) {
                    let _ = tx.send(message.data);
                }
            }
        }
        _ => {}
    }
}
