use std::sync::Arc;

use ride_share_data_management::DataManager;
use tokio::sync::broadcast;

use crate::{live::Envelope, mail::{MailQueue, Mailer}, session::SessionStore};

pub struct ServerState {
    // Channel used to send rendered fragments to all connected sockets.
    pub tx: broadcast::Sender<Envelope>,
    pub data_manager: DataManager,
    pub sessions: SessionStore,
    pub mail: MailQueue,
}

impl ServerState {
    /// Starts the mail worker, so this needs a running tokio runtime.
    pub fn new(data_manager: DataManager, mailer: Arc<dyn Mailer>, broadcast_capacity: usize, mail_capacity: usize) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(broadcast_capacity.max(1));

        Arc::new(Self {
            tx,
            data_manager,
            sessions: SessionStore::default(),
            mail: MailQueue::start(mailer, mail_capacity),
        })
    }
}
