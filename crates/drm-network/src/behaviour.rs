use libp2p::{gossipsub, mdns, swarm::NetworkBehaviour};

/// Gossipsub carries topic traffic; mdns discovers peers on the local
/// network. Combined so a single swarm drives both. Mirrors the stack in
/// the original node's libp2p setup.
#[derive(NetworkBehaviour)]
pub struct DrmBehaviour {
    pub gossipsub: gossipsub::Behaviour,
    pub mdns: mdns::tokio::Behaviour,
}
