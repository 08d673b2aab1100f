//! End-to-end tests against the mock CRM backend.

use leadstream_client::{
    ActivityTreeStore, ApiConfig, ClientError, HttpLeadApi, InMemoryNotifier, Level, QueueMonitor,
    ReplyMode, StoreConfig,
};
use leadstream_core::{Activity, ActivityFilter, ActivityType, LeadField, QueueStats};
use leadstream_mock_crm::MockCrm;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn start() -> (MockCrm, String) {
    let crm = MockCrm::seeded("test");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(crm.clone().serve(listener));
    (crm, format!("127.0.0.1:{}", addr.port()))
}

fn store_for(
    addr: &str,
    token: &str,
    lead: &str,
) -> (Arc<ActivityTreeStore>, Arc<InMemoryNotifier>) {
    let api = HttpLeadApi::new(ApiConfig {
        base_url: format!("http://{}", addr),
        token: Some(token.to_string()),
        timeout_secs: 5,
    })
    .unwrap();
    let notifier = Arc::new(InMemoryNotifier::new());
    let store = ActivityTreeStore::new(
        lead,
        Arc::new(api),
        notifier.clone(),
        StoreConfig {
            redirect_delay: Duration::from_millis(20),
            redirect_path: "/leads".into(),
        },
    );
    (Arc::new(store), notifier)
}

fn find(activities: &[Activity], text: &str) -> Activity {
    activities
        .iter()
        .find(|a| a.text() == text)
        .cloned()
        .unwrap_or_else(|| panic!("no activity with text {:?}", text))
}

fn texts(activities: &[Activity]) -> Vec<&str> {
    activities.iter().map(Activity::text).collect()
}

#[tokio::test]
async fn feed_lists_top_level_entries_newest_first() {
    let (_crm, addr) = start().await;
    let (store, _) = store_for(&addr, "u3", "lead-1");
    store.load_feed(false).await.unwrap();

    assert_eq!(store.total_activities(), 6);
    assert_eq!(store.lead().unwrap().name, "Acme Corp");
    assert_eq!(
        texts(&store.visible_feed()),
        [
            "Follow-up call booked for Monday",
            "Customer asked about a refund",
            "Lead assigned to Sam",
            "Lead created",
        ]
    );

    store.set_filter(ActivityFilter::Comment);
    assert_eq!(store.visible_feed().len(), 2);
    store.set_filter(ActivityFilter::AssignmentChange);
    assert_eq!(
        store.visible_feed()[0].activity_type,
        ActivityType::AssignmentChange
    );
}

#[tokio::test]
async fn replies_flatten_under_the_original_comment() {
    let (_crm, addr) = start().await;
    let (store, _) = store_for(&addr, "u2", "lead-1");
    store.load_feed(false).await.unwrap();

    let question = find(&store.activities(), "Customer asked about a refund");
    assert!(store.toggle_expand(&question.id).await.unwrap());
    let bucket = store.reply_bucket(&question.id).unwrap();
    assert_eq!(texts(&bucket), ["Refund approved", "Thanks, closing this out"]);

    let deepest = find(&bucket, "Thanks, closing this out");
    store
        .submit_reply(&deepest, "Reopened: customer called back", ReplyMode::Nested)
        .await
        .unwrap();

    assert!(store.is_expanded(&question.id));
    let bucket = store.reply_bucket(&question.id).unwrap();
    assert_eq!(bucket.len(), 3);
    assert!(
        bucket
            .iter()
            .all(|r| r.parent_comment_id.as_deref() == Some(question.id.as_str()))
    );
    assert_eq!(store.reply_bucket(&deepest.id), None);
}

#[tokio::test]
async fn quote_reply_keeps_snapshot() {
    let (_crm, addr) = start().await;
    let (store, _) = store_for(&addr, "u1", "lead-1");
    store.load_feed(false).await.unwrap();

    let followup = find(&store.visible_feed(), "Follow-up call booked for Monday");
    store
        .submit_reply(&followup, "Moved to Tuesday", ReplyMode::Quote)
        .await
        .unwrap();

    let bucket = store.reply_bucket(&followup.id).unwrap();
    let quote = bucket[0].quoted_comment.clone().unwrap();
    assert_eq!(quote.author, "Sam");
    assert_eq!(quote.content, "Follow-up call booked for Monday");
}

#[tokio::test]
async fn likes_come_from_the_server() {
    let (_crm, addr) = start().await;
    let (store, _) = store_for(&addr, "u3", "lead-1");
    store.load_feed(false).await.unwrap();
    let followup = find(&store.activities(), "Follow-up call booked for Monday");

    store.toggle_like(&followup.id).await.unwrap();
    let liked = store.activity(&followup.id).unwrap();
    assert_eq!(liked.likes.len(), 1);
    assert_eq!(liked.likes[0].user_id, "u3");

    store.toggle_like(&followup.id).await.unwrap();
    assert!(store.activity(&followup.id).unwrap().likes.is_empty());
}

#[tokio::test]
async fn denied_lead_redirects() {
    let (_crm, addr) = start().await;
    let (store, notifier) = store_for(&addr, "u3", "lead-2");

    let err = store.load_feed(false).await.unwrap_err();
    assert!(matches!(err, ClientError::AccessDenied(_)));
    assert_eq!(notifier.with_level(Level::Error), ["Access denied"]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(notifier.redirects(), ["/leads"]);
}

#[tokio::test]
async fn edits_are_recorded_in_history() {
    let (_crm, addr) = start().await;
    let (store, _) = store_for(&addr, "u3", "lead-1");
    store.load_feed(false).await.unwrap();
    let followup = find(&store.activities(), "Follow-up call booked for Monday");

    store
        .edit_comment(&followup.id, "Follow-up call booked for Tuesday", Some("rescheduled"))
        .await
        .unwrap();

    let edited = store.activity(&followup.id).unwrap();
    assert!(edited.is_edited);
    let history = store.view_history(&followup.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "Follow-up call booked for Monday");
    assert_eq!(history[0].edit_reason.as_deref(), Some("rescheduled"));
}

#[tokio::test]
async fn server_rejections_surface_their_message() {
    let (_crm, addr) = start().await;
    let (store, notifier) = store_for(&addr, "u3", "lead-1");
    store.load_feed(false).await.unwrap();
    let before = store.activities();
    let question = find(&before, "Customer asked about a refund");

    assert!(store.toggle_pin(&question.id).await.is_err());
    assert!(store.delete_comment(&question.id).await.is_err());
    assert_eq!(
        notifier.with_level(Level::Error),
        [
            "Only admins can pin comments",
            "You do not have permission to delete this comment",
        ]
    );
    assert_eq!(store.activities(), before);
    assert!(notifier.redirects().is_empty());
}

#[tokio::test]
async fn search_overlay_includes_replies() {
    let (_crm, addr) = start().await;
    let (store, _) = store_for(&addr, "u2", "lead-1");
    store.load_feed(false).await.unwrap();

    assert_eq!(store.search_comments("refund").await.unwrap(), 2);
    let results = store.visible_feed();
    assert!(results.iter().any(|a| !a.is_top_level()));

    store.clear_search();
    assert!(store.visible_feed().iter().all(Activity::is_top_level));
}

#[tokio::test]
async fn saving_a_field_logs_the_change() {
    let (_crm, addr) = start().await;
    let (store, _) = store_for(&addr, "u2", "lead-1");
    store.load_feed(false).await.unwrap();

    store.begin_edit(LeadField::Status);
    store.set_field_value(LeadField::Status, "Qualified");
    store.save_field(LeadField::Status).await.unwrap();

    assert_eq!(store.lead().unwrap().status, "Qualified");
    let newest = &store.visible_feed()[0];
    assert_eq!(newest.activity_type, ActivityType::StatusChange);
    assert_eq!(newest.text(), "status changed from \"New\" to \"Qualified\"");
}

#[tokio::test]
async fn queue_monitor_follows_pushes() {
    let (crm, addr) = start().await;
    let monitor = QueueMonitor::connect(&format!("ws://{}/socket", addr))
        .await
        .unwrap();
    let mut updates = monitor.subscribe();

    let stats = QueueStats {
        pending: 5,
        processing: 2,
        failed: 1,
        total: 8,
    };
    crm.publish_queue(stats);

    tokio::time::timeout(Duration::from_secs(5), async {
        while *updates.borrow_and_update() != stats {
            updates.changed().await.unwrap();
        }
    })
    .await
    .unwrap();
    assert_eq!(monitor.latest(), stats);
    assert!(monitor.is_connected());
}
