//! In-memory CRM backend for the lead activity API.
//!
//! Serves every endpoint the activity store consumes plus the push socket
//! that carries email queue counters. The acting user is taken from the
//! bearer token (a user id); requests without one act as the first
//! registered user.

mod state;

pub use state::{Outcome, Rejection, ServerState};

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::Response,
    routing::{get, post, put},
};
use leadstream_core::wire::{
    EditComment, FeedResponse, HistoryResponse, LeadUpdate, LikeResponse, MutationResponse,
    NestedReply, NewComment, QuoteReply, RepliesResponse, SearchResponse,
};
use leadstream_core::{ActivityType, CurrentUser, Lead, PushEvent, QueueStats, Role};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, RwLockWriteGuard, watch};

/// Handle to a running (or ready to run) mock backend.
#[derive(Clone)]
pub struct MockCrm {
    state: Arc<RwLock<ServerState>>,
    queue: Arc<watch::Sender<QueueStats>>,
}

type Rejected = (StatusCode, Json<MutationResponse>);
type ApiResult<T> = Result<Json<T>, Rejected>;

fn reject(rejection: Rejection) -> Rejected {
    let status = StatusCode::from_u16(rejection.status).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(MutationResponse::rejected(rejection.message)))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl MockCrm {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_state(ServerState::new(name.into()))
    }

    pub fn from_state(state: ServerState) -> Self {
        let (queue, _) = watch::channel(QueueStats::default());
        Self {
            state: Arc::new(RwLock::new(state)),
            queue: Arc::new(queue),
        }
    }

    /// A backend with three users and two leads worth of history.
    ///
    /// Users: `u1` superadmin, `u2` admin, `u3` subadmin. `lead-1` is
    /// assigned to `u3`; `lead-2` to `u2`, so `u3` is denied access to it.
    pub fn seeded(name: impl Into<String>) -> Self {
        let mut state = ServerState::new(name.into());
        if let Err(e) = seed(&mut state) {
            tracing::warn!("seeding demo data failed: {}", e.message);
        }
        Self::from_state(state)
    }

    /// Direct access to the backing data.
    pub async fn state(&self) -> RwLockWriteGuard<'_, ServerState> {
        self.state.write().await
    }

    /// Push new queue counters to every connected socket.
    pub fn publish_queue(&self, stats: QueueStats) {
        self.queue.send_replace(stats);
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/leads/{lead}", put(update_lead))
            .route("/api/leads/{lead}/activity", get(feed))
            .route("/api/leads/{lead}/comments", post(add_comment))
            .route("/api/leads/{lead}/comments/search", get(search))
            .route(
                "/api/leads/{lead}/comments/{comment}",
                put(edit_comment).delete(delete_comment),
            )
            .route("/api/leads/{lead}/comments/{comment}/like", post(like))
            .route("/api/leads/{lead}/comments/{comment}/pin", post(pin))
            .route(
                "/api/leads/{lead}/comments/{comment}/important",
                post(important),
            )
            .route("/api/leads/{lead}/comments/{comment}/quote", post(quote_reply))
            .route("/api/leads/{lead}/comments/{comment}/replies", get(replies))
            .route("/api/leads/{lead}/comments/{comment}/history", get(history))
            .route("/api/leads/{lead}/replies", post(nested_reply))
            .route("/queue", post(publish_queue))
            .route("/socket", get(socket))
            .with_state(self.clone())
    }

    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Listening on http://{}", addr);
        }
        axum::serve(listener, self.router()).await
    }
}

fn seed(s: &mut ServerState) -> Outcome<()> {
    let root = CurrentUser::new("u1", "Root", Role::SuperAdmin);
    let dana = CurrentUser::new("u2", "Dana", Role::Admin);
    let sam = CurrentUser::new("u3", "Sam", Role::SubAdmin);
    s.add_user(root.clone());
    s.add_user(dana.clone());
    s.add_user(sam.clone());

    for (id, name, agent) in [("lead-1", "Acme Corp", &sam), ("lead-2", "Globex", &dana)] {
        s.add_lead(Lead {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("contact@{}.test", name.to_lowercase().replace(' ', "")),
            country: "ES".to_string(),
            status: "New".to_string(),
            ..Lead::default()
        });
        s.log(&root, id, ActivityType::Created, "Lead created")?;
        s.assign(&root, id, agent)?;
    }

    let question = s.add_comment(&dana, "lead-1", "Customer asked about a refund")?;
    let answer = s.reply(&sam, "lead-1", &question, "Refund approved", None)?;
    s.reply(&dana, "lead-1", &answer, "Thanks, closing this out", None)?;
    s.add_comment(&sam, "lead-1", "Follow-up call booked for Monday")?;
    Ok(())
}

async fn acting_user(crm: &MockCrm, headers: &HeaderMap) -> Result<CurrentUser, Rejected> {
    crm.state.read().await.user(bearer(headers)).map_err(reject)
}

async fn feed(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> ApiResult<FeedResponse> {
    let user = acting_user(&crm, &headers).await?;
    let (lead, activities) = crm.state().await.feed(&user, &lead_id).map_err(reject)?;
    Ok(Json(FeedResponse {
        success: true,
        message: None,
        lead,
        total_activities: activities.len() as u64,
        activities,
    }))
}

async fn add_comment(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    Json(req): Json<NewComment>,
) -> ApiResult<MutationResponse> {
    let user = acting_user(&crm, &headers).await?;
    crm.state()
        .await
        .add_comment(&user, &lead_id, &req.text)
        .map_err(reject)?;
    tracing::info!("New comment on {} by {}", lead_id, user.name);
    Ok(Json(MutationResponse::ok("Comment added successfully")))
}

async fn edit_comment(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path((lead_id, comment_id)): Path<(String, String)>,
    Json(req): Json<EditComment>,
) -> ApiResult<MutationResponse> {
    let user = acting_user(&crm, &headers).await?;
    crm.state()
        .await
        .edit_comment(&user, &lead_id, &comment_id, &req.content, req.reason)
        .map_err(reject)?;
    Ok(Json(MutationResponse::ok("Comment updated successfully")))
}

async fn delete_comment(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path((lead_id, comment_id)): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    let user = acting_user(&crm, &headers).await?;
    crm.state()
        .await
        .delete_comment(&user, &lead_id, &comment_id)
        .map_err(reject)?;
    Ok(Json(MutationResponse::ok("Comment deleted successfully")))
}

async fn like(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path((lead_id, comment_id)): Path<(String, String)>,
) -> ApiResult<LikeResponse> {
    let user = acting_user(&crm, &headers).await?;
    let likes = crm
        .state()
        .await
        .toggle_like(&user, &lead_id, &comment_id)
        .map_err(reject)?;
    Ok(Json(LikeResponse {
        success: true,
        message: None,
        likes,
    }))
}

async fn pin(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path((lead_id, comment_id)): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    let user = acting_user(&crm, &headers).await?;
    let message = crm
        .state()
        .await
        .toggle_pin(&user, &lead_id, &comment_id)
        .map_err(reject)?;
    Ok(Json(MutationResponse::ok(message)))
}

async fn important(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path((lead_id, comment_id)): Path<(String, String)>,
) -> ApiResult<MutationResponse> {
    let user = acting_user(&crm, &headers).await?;
    let message = crm
        .state()
        .await
        .toggle_important(&user, &lead_id, &comment_id)
        .map_err(reject)?;
    Ok(Json(MutationResponse::ok(message)))
}

async fn quote_reply(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path((lead_id, comment_id)): Path<(String, String)>,
    Json(req): Json<QuoteReply>,
) -> ApiResult<MutationResponse> {
    let user = acting_user(&crm, &headers).await?;
    crm.state()
        .await
        .reply(
            &user,
            &lead_id,
            &comment_id,
            &req.content,
            Some(req.quoted_comment),
        )
        .map_err(reject)?;
    Ok(Json(MutationResponse::ok("Reply added successfully")))
}

async fn nested_reply(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    Json(req): Json<NestedReply>,
) -> ApiResult<MutationResponse> {
    let user = acting_user(&crm, &headers).await?;
    crm.state()
        .await
        .reply(&user, &lead_id, &req.parent_comment_id, &req.content, None)
        .map_err(reject)?;
    Ok(Json(MutationResponse::ok("Reply added successfully")))
}

async fn replies(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path((lead_id, comment_id)): Path<(String, String)>,
) -> ApiResult<RepliesResponse> {
    let user = acting_user(&crm, &headers).await?;
    let replies = crm
        .state()
        .await
        .replies(&user, &lead_id, &comment_id)
        .map_err(reject)?;
    Ok(Json(RepliesResponse {
        success: true,
        message: None,
        replies,
    }))
}

async fn history(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path((lead_id, comment_id)): Path<(String, String)>,
) -> ApiResult<HistoryResponse> {
    let user = acting_user(&crm, &headers).await?;
    let history = crm
        .state()
        .await
        .history(&user, &lead_id, &comment_id)
        .map_err(reject)?;
    Ok(Json(HistoryResponse {
        success: true,
        message: None,
        history,
    }))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let user = acting_user(&crm, &headers).await?;
    let results = crm
        .state()
        .await
        .search(&user, &lead_id, &params.q)
        .map_err(reject)?;
    Ok(Json(SearchResponse {
        success: true,
        message: None,
        count: results.len() as u64,
        results,
    }))
}

async fn update_lead(
    State(crm): State<MockCrm>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    Json(update): Json<LeadUpdate>,
) -> ApiResult<MutationResponse> {
    let user = acting_user(&crm, &headers).await?;
    crm.state()
        .await
        .update_lead(&user, &lead_id, update)
        .map_err(reject)?;
    Ok(Json(MutationResponse::ok("Lead updated successfully")))
}

async fn publish_queue(
    State(crm): State<MockCrm>,
    Json(stats): Json<QueueStats>,
) -> Json<MutationResponse> {
    crm.publish_queue(stats);
    Json(MutationResponse::ok("Queue counters published"))
}

async fn socket(State(crm): State<MockCrm>, ws: WebSocketUpgrade) -> Response {
    let updates = crm.queue.subscribe();
    ws.on_upgrade(move |socket| push_queue_updates(socket, updates))
}

/// Send the current counters, then every change, until the peer leaves.
async fn push_queue_updates(mut socket: WebSocket, mut updates: watch::Receiver<QueueStats>) {
    loop {
        let stats = *updates.borrow_and_update();
        let frame = match serde_json::to_string(&PushEvent::queue_update(stats)) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("encoding queue update failed: {}", e);
                return;
            }
        };
        if socket.send(Message::Text(frame.into())).await.is_err() {
            return;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    // Anything else from the client is ignored; resend current state.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
