use crate::protocol::ClientMessage;
use crate::state::{Broker, Outbox};
use crate::types::{BrokerStats, ParticipantId};
use crate::ws::handlers;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Inbound events for the broker task
#[derive(Debug)]
pub enum BrokerEvent {
    Connect {
        id: ParticipantId,
        outbox: Outbox,
    },
    Message {
        id: ParticipantId,
        msg: ClientMessage,
    },
    Disconnect {
        id: ParticipantId,
    },
    Stats {
        reply: oneshot::Sender<BrokerStats>,
    },
}

/// Cloneable handle used by connection tasks and HTTP handlers
#[derive(Debug, Clone)]
pub struct BrokerHandle {
    tx: mpsc::Sender<BrokerEvent>,
}

impl BrokerHandle {
    /// Queue an event. Returns false once the broker task has stopped.
    pub async fn send(&self, event: BrokerEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    pub async fn connect(&self, id: ParticipantId, outbox: Outbox) -> bool {
        self.send(BrokerEvent::Connect { id, outbox }).await
    }

    pub async fn message(&self, id: ParticipantId, msg: ClientMessage) -> bool {
        self.send(BrokerEvent::Message { id, msg }).await
    }

    pub async fn disconnect(&self, id: ParticipantId) -> bool {
        self.send(BrokerEvent::Disconnect { id }).await
    }

    pub async fn stats(&self) -> Option<BrokerStats> {
        let (reply, rx) = oneshot::channel();
        if !self.send(BrokerEvent::Stats { reply }).await {
            return None;
        }
        rx.await.ok()
    }
}

/// Spawn the task that owns the broker.
///
/// Events are applied strictly one after another, fan-out included. The task
/// ends, dropping all session state, when every handle is gone.
pub fn spawn_broker(broker: Broker, capacity: usize) -> (BrokerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = tokio::spawn(run(broker, rx));
    (BrokerHandle { tx }, task)
}

async fn run(mut broker: Broker, mut rx: mpsc::Receiver<BrokerEvent>) {
    tracing::info!("Broker started");

    while let Some(event) = rx.recv().await {
        apply(&mut broker, event);
    }

    tracing::info!(
        participants = broker.registry().len(),
        "Broker stopped, dropping session state"
    );
}

fn apply(broker: &mut Broker, event: BrokerEvent) {
    match event {
        BrokerEvent::Connect { id, outbox } => {
            broker.connect(id, outbox);
        }
        BrokerEvent::Message { id, msg } => {
            handlers::handle_message(broker, &id, msg);
        }
        BrokerEvent::Disconnect { id } => {
            broker.disconnect(&id);
        }
        BrokerEvent::Stats { reply } => {
            // requester may have gone away
            let _ = reply.send(broker.stats());
        }
    }
}
