//! Actor-based concurrency for the store
//!
//! All mutations funnel through a single actor task:
//! - One logical writer serializes every read-modify-write sequence
//! - Compare-and-swap versions still guard against stale snapshots
//!   held by callers
//! - Each committed mutation bumps a watch-channel change sequence so
//!   observers (admin views, other sessions) know to re-read
//!
//! Reads do not pass through the actor; they go straight to storage.

use crate::types::{ChatSession, SiteSettings, Transaction, User, WithdrawalRequest};
use crate::{Error, Metrics, Result, Storage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Message sent to the store actor
#[derive(Debug)]
pub enum StoreMessage {
    /// Insert a new user, optionally bumping the referral parent
    InsertUserWithParent {
        /// New user record (version 0)
        user: User,
        /// Parent with its referral counter already incremented
        parent: Option<User>,
        /// Responder
        response: oneshot::Sender<Result<(User, Option<User>)>>,
    },

    /// Compare-and-swap update of one user
    PutUser {
        /// Updated user carrying the version that was read
        user: User,
        /// Responder
        response: oneshot::Sender<Result<User>>,
    },

    /// Apply a conversion (user update + transaction append, atomic)
    RecordConversion {
        /// Updated user
        user: User,
        /// Conversion record
        transaction: Transaction,
        /// Responder
        response: oneshot::Sender<Result<User>>,
    },

    /// Insert a withdrawal request
    InsertWithdrawal {
        /// New request (version 0)
        request: WithdrawalRequest,
        /// Responder
        response: oneshot::Sender<Result<WithdrawalRequest>>,
    },

    /// Compare-and-swap update of a withdrawal request
    PutWithdrawal {
        /// Updated request
        request: WithdrawalRequest,
        /// Responder
        response: oneshot::Sender<Result<WithdrawalRequest>>,
    },

    /// Finalize a withdrawal (debit + status change, atomic)
    FinalizeWithdrawal {
        /// User with the balance already debited
        user: User,
        /// Request already moved to its terminal status
        request: WithdrawalRequest,
        /// Responder
        response: oneshot::Sender<Result<(User, WithdrawalRequest)>>,
    },

    /// Upsert a chat session
    PutChat {
        /// Session to write
        session: ChatSession,
        /// Responder
        response: oneshot::Sender<Result<ChatSession>>,
    },

    /// Upsert site settings
    PutSettings {
        /// Settings to write
        settings: SiteSettings,
        /// Responder
        response: oneshot::Sender<Result<SiteSettings>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes store mutations
#[derive(Debug)]
pub struct StoreActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<StoreMessage>,

    /// Change sequence published to observers
    changes: watch::Sender<u64>,

    /// Metrics collector
    metrics: Metrics,
}

impl StoreActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<StoreMessage>,
        changes: watch::Sender<u64>,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            mailbox,
            changes,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                StoreMessage::Shutdown => break,
                _ => self.handle_message(msg),
            }
        }
    }

    fn handle_message(&mut self, msg: StoreMessage) {
        let start = std::time::Instant::now();
        let mut committed = false;

        match msg {
            StoreMessage::InsertUserWithParent {
                user,
                parent,
                response,
            } => {
                let result = self.storage.insert_user_with_parent(&user, parent.as_ref());
                committed = self.observe(&result);
                if committed {
                    self.metrics.accounts_created.inc();
                }
                let _ = response.send(result);
            }

            StoreMessage::PutUser { user, response } => {
                let result = self.storage.put_user(&user);
                committed = self.observe(&result);
                let _ = response.send(result);
            }

            StoreMessage::RecordConversion {
                user,
                transaction,
                response,
            } => {
                let result = self.storage.record_conversion(&user, &transaction);
                committed = self.observe(&result);
                if committed {
                    self.metrics.conversions.inc();
                }
                let _ = response.send(result);
            }

            StoreMessage::InsertWithdrawal { request, response } => {
                let result = self.storage.insert_withdrawal(&request);
                committed = self.observe(&result);
                if committed {
                    self.metrics.withdrawal_requests.inc();
                }
                let _ = response.send(result);
            }

            StoreMessage::PutWithdrawal { request, response } => {
                let result = self.storage.put_withdrawal(&request);
                committed = self.observe(&result);
                let _ = response.send(result);
            }

            StoreMessage::FinalizeWithdrawal {
                user,
                request,
                response,
            } => {
                let result = self.storage.finalize_withdrawal(&user, &request);
                committed = self.observe(&result);
                if committed {
                    self.metrics.withdrawals_finalized.inc();
                }
                let _ = response.send(result);
            }

            StoreMessage::PutChat { session, response } => {
                let result = self.storage.put_chat(&session);
                committed = self.observe(&result);
                if committed {
                    self.metrics.chat_writes.inc();
                }
                let _ = response.send(result);
            }

            StoreMessage::PutSettings { settings, response } => {
                let result = self.storage.put_settings(&settings);
                committed = self.observe(&result);
                let _ = response.send(result);
            }

            StoreMessage::Shutdown => {
                // Handled in main loop
            }
        }

        if committed {
            self.changes.send_modify(|seq| *seq += 1);
        }
        self.metrics
            .mutation_duration
            .observe(start.elapsed().as_secs_f64());
    }

    /// Track outcome; returns true when the mutation committed
    fn observe<T>(&self, result: &Result<T>) -> bool {
        match result {
            Ok(_) => true,
            Err(Error::VersionConflict { .. }) => {
                self.metrics.write_conflicts.inc();
                false
            }
            Err(e) => {
                tracing::error!("Store mutation failed: {}", e);
                false
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct StoreHandle {
    sender: mpsc::Sender<StoreMessage>,
}

impl StoreHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<StoreMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> StoreMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Insert a new user, optionally bumping the referral parent
    pub async fn insert_user_with_parent(
        &self,
        user: User,
        parent: Option<User>,
    ) -> Result<(User, Option<User>)> {
        self.request(|response| StoreMessage::InsertUserWithParent {
            user,
            parent,
            response,
        })
        .await
    }

    /// Compare-and-swap update of one user
    pub async fn put_user(&self, user: User) -> Result<User> {
        self.request(|response| StoreMessage::PutUser { user, response })
            .await
    }

    /// Apply a conversion atomically
    pub async fn record_conversion(&self, user: User, transaction: Transaction) -> Result<User> {
        self.request(|response| StoreMessage::RecordConversion {
            user,
            transaction,
            response,
        })
        .await
    }

    /// Insert a withdrawal request
    pub async fn insert_withdrawal(&self, request: WithdrawalRequest) -> Result<WithdrawalRequest> {
        self.request(|response| StoreMessage::InsertWithdrawal { request, response })
            .await
    }

    /// Compare-and-swap update of a withdrawal request
    pub async fn put_withdrawal(&self, request: WithdrawalRequest) -> Result<WithdrawalRequest> {
        self.request(|response| StoreMessage::PutWithdrawal { request, response })
            .await
    }

    /// Finalize a withdrawal atomically
    pub async fn finalize_withdrawal(
        &self,
        user: User,
        request: WithdrawalRequest,
    ) -> Result<(User, WithdrawalRequest)> {
        self.request(|response| StoreMessage::FinalizeWithdrawal {
            user,
            request,
            response,
        })
        .await
    }

    /// Upsert a chat session
    pub async fn put_chat(&self, session: ChatSession) -> Result<ChatSession> {
        self.request(|response| StoreMessage::PutChat { session, response })
            .await
    }

    /// Upsert site settings
    pub async fn put_settings(&self, settings: SiteSettings) -> Result<SiteSettings> {
        self.request(|response| StoreMessage::PutSettings { settings, response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(StoreMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        // Wait for the actor to drop its mailbox (and storage handle) so
        // the database lock is released before shutdown returns.
        self.sender.closed().await;
        Ok(())
    }
}

/// Spawn the store actor
pub fn spawn_store_actor(
    storage: Arc<Storage>,
    metrics: Metrics,
) -> (StoreHandle, watch::Receiver<u64>) {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let (change_tx, change_rx) = watch::channel(0u64);
    let actor = StoreActor::new(storage, rx, change_tx, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    (StoreHandle::new(tx), change_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WalletAddress;
    use crate::Config;
    use rust_decimal::Decimal;

    fn test_storage() -> (Arc<Storage>, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Arc::new(Storage::open(&config).unwrap()), temp_dir)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (storage, _temp) = test_storage();
        let (handle, _changes) = spawn_store_actor(storage, Metrics::new().unwrap());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_insert_user_bumps_change_seq() {
        let (storage, _temp) = test_storage();
        let metrics = Metrics::new().unwrap();
        let (handle, changes) = spawn_store_actor(storage.clone(), metrics.clone());

        let user = crate::storage::tests::test_user("0xaaaa00000000000000000000000000000000aaaa");
        let (stored, _) = handle.insert_user_with_parent(user, None).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(*changes.borrow(), 1);
        assert_eq!(metrics.accounts_created.get(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_conflict_does_not_bump_change_seq() {
        let (storage, _temp) = test_storage();
        let metrics = Metrics::new().unwrap();
        let (handle, changes) = spawn_store_actor(storage.clone(), metrics.clone());

        let user = crate::storage::tests::test_user("0xbbbb00000000000000000000000000000000bbbb");
        let (stored, _) = handle.insert_user_with_parent(user, None).await.unwrap();

        let mut fresh = stored.clone();
        fresh.eth_balance = Decimal::from(1);
        handle.put_user(fresh).await.unwrap();
        assert_eq!(*changes.borrow(), 2);

        // Replay the stale snapshot
        let mut stale = stored;
        stale.eth_balance = Decimal::from(7);
        let err = handle.put_user(stale).await.unwrap_err();
        assert!(matches!(err, Error::VersionConflict { .. }));
        assert_eq!(*changes.borrow(), 2);
        assert_eq!(metrics.write_conflicts.get(), 1);

        let current = storage
            .get_user(&WalletAddress::new("0xbbbb00000000000000000000000000000000bbbb"))
            .unwrap();
        assert_eq!(current.eth_balance, Decimal::from(1));

        handle.shutdown().await.unwrap();
    }
}
