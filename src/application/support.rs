use super::deliver;
use super::metrics::SupportMetrics;
use crate::domain::admin::Admins;
use crate::domain::ids::ChatId;
use crate::domain::ports::{Button, Notification, SharedNotifier};
use crate::domain::support::{SupportOutcome, SupportState};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const ACCEPT_PREFIX: &str = "support_accept_";

#[derive(Debug, Default)]
struct DeskState {
    /// Customers waiting, oldest first.
    queue: VecDeque<ChatId>,
    /// customer -> admin
    sessions: HashMap<ChatId, ChatId>,
}

impl DeskState {
    fn state_of(&self, customer: ChatId) -> SupportState {
        if let Some(admin) = self.sessions.get(&customer) {
            SupportState::InSession { admin: *admin }
        } else if self.queue.contains(&customer) {
            SupportState::Queued
        } else {
            SupportState::Idle
        }
    }
}

/// Support hand-off: a FIFO waiting list plus customer/admin bindings.
///
/// Queue membership checked under the desk lock is the arbitration point
/// when several admins race to accept the same request.
pub struct SupportDesk {
    state: Mutex<DeskState>,
    notifier: SharedNotifier,
    admins: Admins,
    metrics: SupportMetrics,
}

impl SupportDesk {
    pub fn new(notifier: SharedNotifier, admins: Admins) -> Self {
        Self {
            state: Mutex::new(DeskState::default()),
            notifier,
            admins,
            metrics: SupportMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &SupportMetrics {
        &self.metrics
    }

    pub async fn state_of(&self, customer: ChatId) -> SupportState {
        self.state.lock().await.state_of(customer)
    }

    /// Customers currently waiting, oldest first.
    pub async fn queue(&self) -> Vec<ChatId> {
        self.state.lock().await.queue.iter().copied().collect()
    }

    pub async fn request_support(&self, customer: ChatId) -> SupportOutcome {
        let outcome = {
            let mut desk = self.state.lock().await;
            match desk.state_of(customer) {
                SupportState::Queued => SupportOutcome::AlreadyQueued,
                SupportState::InSession { .. } => SupportOutcome::AlreadyInSession,
                SupportState::Idle => {
                    desk.queue.push_back(customer);
                    SupportOutcome::Queued {
                        position: desk.queue.len(),
                    }
                }
            }
        };

        match outcome {
            SupportOutcome::AlreadyQueued => {
                self.metrics.record_duplicate_request();
                self.reply(customer, "You are already in the support queue.")
                    .await;
            }
            SupportOutcome::AlreadyInSession => {
                self.metrics.record_duplicate_request();
                self.reply(customer, "You are already in an active support session.")
                    .await;
            }
            _ => {
                info!(customer = %customer, "support requested");
                self.reply(
                    customer,
                    "You have been added to the support queue. \
                     An administrator will be with you shortly.",
                )
                .await;
                for admin in self.admins.iter() {
                    let offer = Notification::text(
                        admin,
                        format!("New support request from user {customer}"),
                    )
                    .with_button(Button::new(
                        "Accept Request",
                        format!("{ACCEPT_PREFIX}{customer}"),
                    ));
                    deliver(&self.notifier, offer).await;
                }
            }
        }
        outcome
    }

    /// First admin to claim a queued customer wins; later claims observe
    /// [`SupportOutcome::NoLongerValid`].
    pub async fn claim(&self, customer: ChatId, admin: ChatId) -> SupportOutcome {
        let claimed = {
            let mut desk = self.state.lock().await;
            match desk.queue.iter().position(|c| *c == customer) {
                Some(index) => {
                    desk.queue.remove(index);
                    desk.sessions.insert(customer, admin);
                    true
                }
                None => false,
            }
        };

        if !claimed {
            self.metrics.record_stale_claim();
            warn!(customer = %customer, admin = %admin, "stale support claim");
            self.reply(admin, "This support request is no longer valid.")
                .await;
            return SupportOutcome::NoLongerValid;
        }

        info!(customer = %customer, admin = %admin, "support request claimed");
        self.reply(
            customer,
            "An administrator has accepted your support request. \
             You can now communicate directly.",
        )
        .await;
        self.reply(admin, format!("You are now connected with user {customer}"))
            .await;
        SupportOutcome::Claimed { customer, admin }
    }

    /// Customer-initiated end of a session.
    pub async fn end_session(&self, customer: ChatId) -> SupportOutcome {
        let admin = self.state.lock().await.sessions.remove(&customer);
        let Some(admin) = admin else {
            self.reply(customer, "You are not in an active support session.")
                .await;
            return SupportOutcome::NotInSession;
        };

        info!(customer = %customer, admin = %admin, "support session ended by customer");
        self.reply(customer, "Support session ended.").await;
        self.reply(admin, format!("Support session with user {customer} has ended."))
            .await;
        SupportOutcome::Ended { customer, admin }
    }

    /// Admin-initiated end; only the admin bound to the session may end it.
    pub async fn end_session_by_admin(&self, admin: ChatId, customer: ChatId) -> SupportOutcome {
        let ended = {
            let mut desk = self.state.lock().await;
            if desk.sessions.get(&customer) == Some(&admin) {
                desk.sessions.remove(&customer);
                true
            } else {
                false
            }
        };
        if !ended {
            self.reply(admin, format!("You have no active session with user {customer}."))
                .await;
            return SupportOutcome::NotInSession;
        }

        info!(customer = %customer, admin = %admin, "support session ended by admin");
        self.reply(customer, "The administrator has ended the support session.")
            .await;
        self.reply(admin, format!("Support session with user {customer} has ended."))
            .await;
        SupportOutcome::Ended { customer, admin }
    }

    async fn reply(&self, chat_id: ChatId, text: impl Into<String>) {
        deliver(&self.notifier, Notification::text(chat_id, text)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryNotifier;
    use std::sync::Arc;

    const CUSTOMER: ChatId = ChatId(10);
    const A1: ChatId = ChatId(1);
    const A2: ChatId = ChatId(2);

    fn desk() -> (SupportDesk, InMemoryNotifier) {
        let notifier = InMemoryNotifier::new();
        let desk = SupportDesk::new(Arc::new(notifier.clone()), Admins::new([A1, A2]));
        (desk, notifier)
    }

    #[tokio::test]
    async fn test_request_fans_out_to_admins() {
        let (desk, notifier) = desk();
        assert_eq!(
            desk.request_support(CUSTOMER).await,
            SupportOutcome::Queued { position: 1 }
        );
        assert_eq!(desk.state_of(CUSTOMER).await, SupportState::Queued);

        let offers = notifier.sent_to(A1).await;
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].buttons[0].callback_data, "support_accept_10");
        assert_eq!(notifier.sent_to(A2).await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_request_is_noop() {
        let (desk, notifier) = desk();
        desk.request_support(CUSTOMER).await;
        notifier.drain().await;

        assert_eq!(
            desk.request_support(CUSTOMER).await,
            SupportOutcome::AlreadyQueued
        );
        assert_eq!(desk.queue().await, vec![CUSTOMER]);
        // only the informational reply, no new admin offers
        assert!(notifier.sent_to(A1).await.is_empty());
    }

    #[tokio::test]
    async fn test_claim_then_end() {
        let (desk, _notifier) = desk();
        desk.request_support(CUSTOMER).await;

        assert_eq!(
            desk.claim(CUSTOMER, A1).await,
            SupportOutcome::Claimed {
                customer: CUSTOMER,
                admin: A1
            }
        );
        assert_eq!(
            desk.state_of(CUSTOMER).await,
            SupportState::InSession { admin: A1 }
        );
        assert_eq!(
            desk.request_support(CUSTOMER).await,
            SupportOutcome::AlreadyInSession
        );
        assert_eq!(desk.claim(CUSTOMER, A2).await, SupportOutcome::NoLongerValid);

        assert_eq!(
            desk.end_session(CUSTOMER).await,
            SupportOutcome::Ended {
                customer: CUSTOMER,
                admin: A1
            }
        );
        assert_eq!(desk.state_of(CUSTOMER).await, SupportState::Idle);
        assert_eq!(desk.end_session(CUSTOMER).await, SupportOutcome::NotInSession);
    }

    #[tokio::test]
    async fn test_admin_end_requires_binding() {
        let (desk, notifier) = desk();
        desk.request_support(CUSTOMER).await;
        desk.claim(CUSTOMER, A1).await;
        notifier.drain().await;

        assert_eq!(
            desk.end_session_by_admin(A2, CUSTOMER).await,
            SupportOutcome::NotInSession
        );
        assert!(notifier.sent_to(CUSTOMER).await.is_empty());

        assert!(matches!(
            desk.end_session_by_admin(A1, CUSTOMER).await,
            SupportOutcome::Ended { .. }
        ));
        assert_eq!(notifier.sent_to(CUSTOMER).await.len(), 1);
        assert_eq!(desk.state_of(CUSTOMER).await, SupportState::Idle);
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let (desk, _notifier) = desk();
        desk.request_support(ChatId(7)).await;
        desk.request_support(ChatId(5)).await;
        assert_eq!(
            desk.request_support(ChatId(9)).await,
            SupportOutcome::Queued { position: 3 }
        );
        desk.claim(ChatId(5), A1).await;
        assert_eq!(desk.queue().await, vec![ChatId(7), ChatId(9)]);
    }
}
