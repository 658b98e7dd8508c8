use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::errors::AppResult;
use crate::metrics::SUBSCRIPTIONS_ACTIVE;
use crate::models::CourseRequest;
use crate::store::{ChangeEvent, CoordinationStore, COURSE_REP_REQUESTS};

const SNAPSHOT_BUFFER: usize = 16;

/// Scope of a live request query: a representative watches the requests they
/// authored, a lecturer watches the requests targeting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionRole {
    Representative,
    Lecturer,
}

/// Live, role-scoped request feed. Every delivery is a full snapshot of the
/// current result set, never a delta; deliveries are produced by a single
/// task per subscription, so a consumer never observes an older snapshot
/// after a newer one.
pub struct RequestSubscription {
    rx: mpsc::Receiver<Vec<CourseRequest>>,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl RequestSubscription {
    /// Next snapshot, or `None` once the subscription is cancelled.
    pub async fn next_snapshot(&mut self) -> Option<Vec<CourseRequest>> {
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }
        self.rx.recv().await
    }

    /// Stops delivery and releases the underlying watch resources.
    /// Idempotent: a second call is a no-op.
    pub fn unsubscribe(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.task.abort();
            SUBSCRIPTIONS_ACTIVE.dec();
            tracing::debug!("Request subscription cancelled");
        }
    }
}

impl Drop for RequestSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

pub struct SubscriptionService {
    store: Arc<dyn CoordinationStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self { store }
    }

    /// Opens a live query for the given role/user. The initial snapshot is
    /// delivered immediately; afterwards every committed mutation of the
    /// request collection re-runs the query and pushes the result set if it
    /// changed.
    ///
    /// The same shape would serve an announcement feed; only the query and
    /// the watched collection differ.
    pub async fn subscribe_requests(
        &self,
        role: SubscriptionRole,
        user_id: &str,
    ) -> AppResult<RequestSubscription> {
        // Subscribe to the change feed before the initial query so no commit
        // falls between the snapshot and the first watched event.
        let events = self.store.watch_requests();
        let initial = fetch_snapshot(&self.store, role, user_id).await?;

        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        // Channel is empty; this cannot fail.
        let _ = tx.try_send(initial.clone());

        let store = self.store.clone();
        let user_id = user_id.to_string();
        let task = tokio::spawn(run_feed(store, events, tx, role, user_id, initial));

        SUBSCRIPTIONS_ACTIVE.inc();
        Ok(RequestSubscription {
            rx,
            cancelled: Arc::new(AtomicBool::new(false)),
            task,
        })
    }
}

async fn run_feed(
    store: Arc<dyn CoordinationStore>,
    mut events: broadcast::Receiver<ChangeEvent>,
    tx: mpsc::Sender<Vec<CourseRequest>>,
    role: SubscriptionRole,
    user_id: String,
    mut last: Vec<CourseRequest>,
) {
    loop {
        match events.recv().await {
            Ok(event) if event.collection == COURSE_REP_REQUESTS => {}
            Ok(_) => continue,
            // Missed events are fine: the next query returns the current
            // state, which already reflects them.
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "Change feed lagged; re-querying");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }

        match fetch_snapshot(&store, role, &user_id).await {
            Ok(snapshot) => {
                // Only mutations visible to this subscriber produce a push.
                if snapshot == last {
                    continue;
                }
                last = snapshot.clone();
                if tx.send(snapshot).await.is_err() {
                    // Consumer gone.
                    break;
                }
            }
            Err(err) => {
                // Transient store failure: skip this push; the next event
                // re-runs the query.
                tracing::warn!("Snapshot query failed: {:#}", err);
            }
        }
    }
}

async fn fetch_snapshot(
    store: &Arc<dyn CoordinationStore>,
    role: SubscriptionRole,
    user_id: &str,
) -> AppResult<Vec<CourseRequest>> {
    match role {
        SubscriptionRole::Representative => store.list_requests_by_requester(user_id).await,
        SubscriptionRole::Lecturer => store.list_requests_by_lecturer(user_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ActorContext, ActorRole, AssignRepresentativePayload, CreateRequestPayload,
        RepresentativePermissions, RequestPriority, RequestStatus, RequestType,
        RespondToRequestPayload, ResponseDecision,
    };
    use crate::services::notification_service::LogNotifier;
    use crate::services::registry_service::RegistryService;
    use crate::services::request_service::RequestService;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn actor(user_id: &str, name: &str, role: ActorRole) -> ActorContext {
        ActorContext {
            user_id: user_id.to_string(),
            name: name.to_string(),
            role,
        }
    }

    fn create_payload(targets: &[&str], title: &str) -> CreateRequestPayload {
        CreateRequestPayload {
            request_type: RequestType::Assignment,
            course_code: "CS101".to_string(),
            course_name: "Intro to CS".to_string(),
            target_lecturer_ids: targets.iter().map(|s| s.to_string()).collect(),
            priority: RequestPriority::Normal,
            title: title.to_string(),
            description: "details".to_string(),
            reason_for_request: None,
            assignment: None,
            quiz: None,
        }
    }

    async fn setup() -> (Arc<MemoryStore>, RequestService, SubscriptionService) {
        let store = Arc::new(MemoryStore::new());
        let registry = RegistryService::new(store.clone());
        registry
            .assign_representative(
                &actor("lect-0", "Dr. Assigner", ActorRole::Lecturer),
                AssignRepresentativePayload {
                    course_code: "CS101".to_string(),
                    course_name: "Intro to CS".to_string(),
                    representative_user_id: "rep-1".to_string(),
                    representative_name: "Rita Rep".to_string(),
                    permissions: RepresentativePermissions::standard(),
                    contact_methods: vec![],
                },
            )
            .await
            .unwrap();
        let requests = RequestService::new(store.clone(), Arc::new(LogNotifier));
        let subscriptions = SubscriptionService::new(store.clone());
        (store, requests, subscriptions)
    }

    async fn expect_snapshot(sub: &mut RequestSubscription) -> Vec<CourseRequest> {
        tokio::time::timeout(Duration::from_secs(2), sub.next_snapshot())
            .await
            .expect("timed out waiting for snapshot")
            .expect("subscription ended unexpectedly")
    }

    async fn expect_no_snapshot(sub: &mut RequestSubscription) {
        let res = tokio::time::timeout(Duration::from_millis(200), sub.next_snapshot()).await;
        match res {
            Err(_) => {}          // timed out: nothing delivered
            Ok(None) => {}        // cancelled: nothing delivered
            Ok(Some(snap)) => panic!("unexpected snapshot with {} requests", snap.len()),
        }
    }

    #[tokio::test]
    async fn lecturer_feed_tracks_request_lifecycle() {
        let (_store, requests, subscriptions) = setup().await;
        let mut sub = subscriptions
            .subscribe_requests(SubscriptionRole::Lecturer, "lect-1")
            .await
            .unwrap();

        // Initial snapshot: nothing targets lect-1 yet.
        assert!(expect_snapshot(&mut sub).await.is_empty());

        let rep = actor("rep-1", "Rita Rep", ActorRole::Student);
        let request = requests
            .create_request(&rep, create_payload(&["lect-1", "lect-2"], "Assignment 1"))
            .await
            .unwrap();

        let snapshot = expect_snapshot(&mut sub).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, request.id);
        assert_eq!(snapshot[0].status, RequestStatus::Pending);

        let lecturer = actor("lect-1", "Dr. One", ActorRole::Lecturer);
        requests
            .respond_to_request(
                &lecturer,
                &request.id,
                RespondToRequestPayload {
                    decision: ResponseDecision::Approved,
                    comments: None,
                },
            )
            .await
            .unwrap();

        let snapshot = expect_snapshot(&mut sub).await;
        assert_eq!(snapshot[0].status, RequestStatus::Approved);
        assert_eq!(snapshot[0].approval_count, 1);

        // After cancellation nothing more is delivered.
        sub.unsubscribe();
        requests
            .create_request(&rep, create_payload(&["lect-1"], "Assignment 2"))
            .await
            .unwrap();
        assert!(sub.next_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn representative_feed_is_scoped_to_author() {
        let (store, requests, subscriptions) = setup().await;

        // A request authored by someone else, already persisted.
        let mut foreign = requests
            .create_request(
                &actor("rep-1", "Rita Rep", ActorRole::Student),
                create_payload(&["lect-1"], "By rep-1"),
            )
            .await
            .unwrap();
        foreign.requested_by_user_id = "rep-2".to_string();
        store.replace_request(foreign.version, &foreign).await.unwrap();

        let mut sub = subscriptions
            .subscribe_requests(SubscriptionRole::Representative, "rep-1")
            .await
            .unwrap();
        assert!(expect_snapshot(&mut sub).await.is_empty());

        let request = requests
            .create_request(
                &actor("rep-1", "Rita Rep", ActorRole::Student),
                create_payload(&["lect-1"], "Mine"),
            )
            .await
            .unwrap();
        let snapshot = expect_snapshot(&mut sub).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, request.id);
    }

    #[tokio::test]
    async fn irrelevant_mutations_do_not_push() {
        let (_store, requests, subscriptions) = setup().await;
        let mut sub = subscriptions
            .subscribe_requests(SubscriptionRole::Lecturer, "lect-9")
            .await
            .unwrap();
        assert!(expect_snapshot(&mut sub).await.is_empty());

        // Targets other lecturers only.
        requests
            .create_request(
                &actor("rep-1", "Rita Rep", ActorRole::Student),
                create_payload(&["lect-1"], "Not for lect-9"),
            )
            .await
            .unwrap();

        expect_no_snapshot(&mut sub).await;
    }

    #[tokio::test]
    async fn double_unsubscribe_is_a_noop() {
        let (_store, _requests, subscriptions) = setup().await;
        let sub = subscriptions
            .subscribe_requests(SubscriptionRole::Lecturer, "lect-1")
            .await
            .unwrap();
        sub.unsubscribe();
        sub.unsubscribe();
    }
}
