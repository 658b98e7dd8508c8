use std::sync::Arc;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use std::convert::Infallible;

use crate::errors::AppError;
use crate::extractors::Actor;
use crate::models::ActorRole;
use crate::services::subscription_service::{
    RequestSubscription, SubscriptionRole, SubscriptionService,
};
use crate::services::AppState;

/// SSE endpoint for the live request feed.
/// GET /api/v1/requests/stream
///
/// Students watch the requests they authored as representative; lecturers
/// (and admins) watch their inbox. Each event carries the full current
/// result set. Dropping the connection cancels the subscription and frees
/// its watch resources.
pub async fn request_stream(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, AppError> {
    let role = match actor.role {
        ActorRole::Student => SubscriptionRole::Representative,
        ActorRole::Lecturer | ActorRole::Admin => SubscriptionRole::Lecturer,
    };

    tracing::info!(
        user_id = %actor.user_id,
        role = ?role,
        "Client connected to request stream"
    );

    let subscription = SubscriptionService::new(state.store.clone())
        .subscribe_requests(role, &actor.user_id)
        .await?;

    Ok(Sse::new(snapshot_stream(subscription)).keep_alive(KeepAlive::default()))
}

fn snapshot_stream(
    subscription: RequestSubscription,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(subscription, |mut subscription| async move {
        let snapshot = subscription.next_snapshot().await?;
        let event = Event::default()
            .event("requests-snapshot")
            .json_data(&snapshot)
            .ok()?;
        Some((Ok(event), subscription))
    })
}
