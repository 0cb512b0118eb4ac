pub mod client;
pub mod host;
pub mod wire;

pub use client::{BridgeClient, ChangeCallback, SubscriptionId};
pub use host::{FileBackend, MemoryBackend, StorageBackend, StorageHost};
pub use wire::{HostMessage, Request, RequestOp};

use tokio::sync::mpsc;

/// Client half of an in-process transport pair.
pub struct ClientEndpoint {
    pub outbound: mpsc::UnboundedSender<Request>,
    pub inbound: mpsc::UnboundedReceiver<HostMessage>,
}

/// Host half of an in-process transport pair.
pub struct HostEndpoint {
    pub requests: mpsc::UnboundedReceiver<Request>,
    pub responses: mpsc::UnboundedSender<HostMessage>,
}

/// Create a connected transport pair. The page/privileged boundary of the
/// original postMessage channel becomes a pair of unbounded channels;
/// tests can hold the host end open without serving it to simulate an
/// unresponsive privileged context.
pub fn channel() -> (ClientEndpoint, HostEndpoint) {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    (
        ClientEndpoint {
            outbound: req_tx,
            inbound: host_rx,
        },
        HostEndpoint {
            requests: req_rx,
            responses: host_tx,
        },
    )
}
