#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end routing tests over a recording transport: the full path from
//! an inbound unit through the router, aggregator, and store.

use std::sync::{Arc, Mutex};

use {anyhow::Result, async_trait::async_trait};

use {
    festa_common::{
        transport::{Keyboard, Transport},
        types::{
            ButtonPress, ClientId, InboundEvent, InboundMessage, MessageContent, MessageHandle,
            OperatorId, actions,
        },
    },
    festa_config::{FestaConfig, schema::OperatorConfig},
    festa_orders::OrderAggregator,
    festa_persistence::Database,
    festa_router::{Responder, Router, content::labels},
    festa_store::{DraftStatus, SessionMode, StateStore, TimerSet},
};

const OP_A: i64 = 100;
const OP_B: i64 = 200;
const CLIENT: i64 = 1;

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(i64, String)>>,
    deleted: Mutex<Vec<(i64, MessageHandle)>>,
    next_handle: Mutex<i32>,
}

impl RecordingTransport {
    fn sent_to(&self, chat: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == chat)
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn deleted_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(
        &self,
        to: i64,
        text: &str,
        _keyboard: Option<Keyboard>,
    ) -> Result<MessageHandle> {
        self.sent.lock().unwrap().push((to, text.to_string()));
        let mut h = self.next_handle.lock().unwrap();
        *h += 1;
        Ok(MessageHandle(*h))
    }

    async fn send_image(
        &self,
        to: i64,
        _file_id: &str,
        caption: Option<&str>,
    ) -> Result<MessageHandle> {
        self.send_text(to, caption.unwrap_or("[photo]"), None).await
    }

    async fn edit_text(
        &self,
        to: i64,
        _message: MessageHandle,
        text: &str,
        _keyboard: Option<Keyboard>,
    ) -> Result<()> {
        self.sent.lock().unwrap().push((to, text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, to: i64, message: MessageHandle) -> Result<()> {
        self.deleted.lock().unwrap().push((to, message));
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> Result<()> {
        Ok(())
    }
}

struct Harness {
    router: Arc<Router>,
    store: Arc<StateStore>,
    transport: Arc<RecordingTransport>,
}

async fn harness() -> Harness {
    let mut config = FestaConfig::default();
    config.operators = vec![
        OperatorConfig {
            id: OP_A,
            name: "Mykola".into(),
        },
        OperatorConfig {
            id: OP_B,
            name: "Volodymyr".into(),
        },
    ];
    // Keep the business-hours gate out of the way for routing tests.
    config.hours.start_hour = 0;
    config.hours.end_hour = 24;
    let config = Arc::new(config);

    let store = Arc::new(StateStore::new());
    let timers = Arc::new(TimerSet::new());
    let transport = Arc::new(RecordingTransport::default());
    let db = Database::connect("sqlite::memory:").await.unwrap();

    let aggregator = OrderAggregator::new(
        Arc::clone(&store),
        Arc::clone(&timers),
        Arc::clone(&transport) as Arc<dyn Transport>,
        vec![OperatorId(OP_A), OperatorId(OP_B)],
        std::time::Duration::from_secs(300),
    );
    let responder = Responder::new(&config);
    let router = Router::new(
        Arc::clone(&config),
        Arc::clone(&store),
        timers,
        aggregator,
        Arc::clone(&transport) as Arc<dyn Transport>,
        db,
        responder,
    );

    Harness {
        router,
        store,
        transport,
    }
}

fn text_msg(chat_id: i64, text: &str) -> InboundEvent {
    InboundEvent::Message(InboundMessage {
        chat_id,
        sender_name: Some("Olena".into()),
        content: MessageContent::Text(text.into()),
    })
}

fn image_msg(chat_id: i64, file_id: &str, caption: Option<&str>) -> InboundEvent {
    InboundEvent::Message(InboundMessage {
        chat_id,
        sender_name: Some("Olena".into()),
        content: MessageContent::Image {
            file_id: file_id.into(),
            caption: caption.map(Into::into),
        },
    })
}

fn button(chat_id: i64, action: &str) -> InboundEvent {
    InboundEvent::Button(ButtonPress {
        chat_id,
        sender_name: Some("Olena".into()),
        callback_id: "cb".into(),
        message: Some(MessageHandle(999)),
        action: action.into(),
    })
}

#[tokio::test]
async fn complete_order_flows_to_queue_and_operators() {
    let h = harness().await;

    h.router
        .route(text_msg(CLIENT, "5 latex balloons, tomorrow"))
        .await;
    assert_eq!(
        h.store.draft(ClientId(CLIENT)).unwrap().status,
        DraftStatus::Ready
    );

    h.router.route(button(CLIENT, actions::SEND_ORDER)).await;
    assert!(h.store.is_waiting(ClientId(CLIENT)));
    assert_eq!(h.transport.sent_to(OP_A).len(), 1);
    assert_eq!(h.transport.sent_to(OP_B).len(), 1);
}

#[tokio::test]
async fn faq_question_never_opens_a_draft() {
    let h = harness().await;

    h.router
        .route(text_msg(CLIENT, "how much are 5 latex balloons?"))
        .await;
    assert!(h.store.draft(ClientId(CLIENT)).is_none());
    // The general responder answered (no assist configured → fallback).
    let replies = h.transport.sent_to(CLIENT);
    assert!(replies[0].contains(labels::MANAGER));
}

#[tokio::test]
async fn image_with_follow_up_becomes_caption() {
    let h = harness().await;

    h.router.route(image_msg(CLIENT, "file-9", None)).await;
    h.router.route(text_msg(CLIENT, "number 7, tomorrow")).await;

    let draft = h.store.draft(ClientId(CLIENT)).unwrap();
    assert_eq!(draft.primary, "number 7, tomorrow");
    assert_eq!(draft.status, DraftStatus::Ready);

    // A second pre-send note is rejected with a press-send prompt.
    h.router.route(text_msg(CLIENT, "make it gold")).await;
    let replies = h.transport.sent_to(CLIENT);
    assert!(replies.last().unwrap().contains("Send to manager"));
}

#[tokio::test]
async fn two_operators_race_for_one_client() {
    let h = harness().await;

    h.router
        .route(text_msg(CLIENT, "5 latex balloons, tomorrow"))
        .await;
    h.router.route(button(CLIENT, actions::SEND_ORDER)).await;

    let pickup = format!("{}{CLIENT}", actions::PICKUP_PREFIX);
    h.router.route(button(OP_A, &pickup)).await;
    h.router.route(button(OP_B, &pickup)).await;

    assert_eq!(h.store.operator_of(ClientId(CLIENT)), Some(OperatorId(OP_A)));
    let loser = h.transport.sent_to(OP_B);
    assert!(
        loser.last().unwrap().contains("already with"),
        "loser is told the client is taken: {loser:?}"
    );
}

#[tokio::test]
async fn pickup_retracts_outstanding_notices() {
    let h = harness().await;

    h.router
        .route(text_msg(CLIENT, "5 latex balloons, tomorrow"))
        .await;
    h.router.route(button(CLIENT, actions::SEND_ORDER)).await;
    assert_eq!(h.transport.deleted_count(), 0);

    h.router
        .route(button(OP_A, &format!("{}{CLIENT}", actions::PICKUP_PREFIX)))
        .await;
    // Both operators' notices were retracted best-effort.
    assert_eq!(h.transport.deleted_count(), 2);
}

#[tokio::test]
async fn relay_runs_both_ways_in_a_live_chat() {
    let h = harness().await;

    h.store.enqueue(ClientId(CLIENT), "order", None);
    h.router
        .route(button(OP_A, &format!("{}{CLIENT}", actions::PICKUP_PREFIX)))
        .await;

    h.router.route(text_msg(CLIENT, "is tomorrow ok?")).await;
    let to_op = h.transport.sent_to(OP_A);
    assert!(to_op.last().unwrap().contains("is tomorrow ok?"));

    h.router.route(text_msg(OP_A, "tomorrow works")).await;
    let to_client = h.transport.sent_to(CLIENT);
    assert!(to_client.last().unwrap().contains("tomorrow works"));
    assert!(to_client.last().unwrap().contains("Mykola"));
}

#[tokio::test]
async fn home_from_chat_tears_down_both_sides() {
    let h = harness().await;

    h.store.enqueue(ClientId(CLIENT), "order", None);
    h.router
        .route(button(OP_A, &format!("{}{CLIENT}", actions::PICKUP_PREFIX)))
        .await;
    assert_eq!(h.store.operator_of(ClientId(CLIENT)), Some(OperatorId(OP_A)));

    h.router.route(text_msg(CLIENT, labels::HOME)).await;

    assert_eq!(h.store.operator_of(ClientId(CLIENT)), None);
    assert_eq!(h.store.client_of(OperatorId(OP_A)), None);
    assert_eq!(h.store.session(CLIENT), SessionMode::Menu);
    let to_op = h.transport.sent_to(OP_A);
    assert!(to_op.last().unwrap().contains("ended the chat"));
}

#[tokio::test]
async fn broken_mirror_self_heals_on_relay() {
    let h = harness().await;

    // Session claims a chat that the assignment table doesn't know about.
    h.store
        .set_session(CLIENT, SessionMode::InManagerChat(OperatorId(OP_A)));

    h.router.route(text_msg(CLIENT, "anyone there?")).await;

    assert_eq!(h.store.session(CLIENT), SessionMode::Idle);
    let replies = h.transport.sent_to(CLIENT);
    assert!(replies.last().unwrap().contains("request a manager again"));
    // Nothing was relayed to the operator.
    assert!(h.transport.sent_to(OP_A).is_empty());
}

#[tokio::test]
async fn rate_limited_client_mutates_nothing() {
    let h = harness().await;

    for _ in 0..30 {
        h.router.route(text_msg(CLIENT, "hello")).await;
    }
    let sent_before = h.transport.sent_to(CLIENT).len();

    // The 31st message is blocked and opens no draft despite order intent.
    h.router
        .route(text_msg(CLIENT, "5 latex balloons, tomorrow"))
        .await;
    assert!(h.store.draft(ClientId(CLIENT)).is_none());
    let replies = h.transport.sent_to(CLIENT);
    assert_eq!(replies.len(), sent_before + 1);
    assert!(replies.last().unwrap().contains("wait"));
}

#[tokio::test]
async fn gratitude_short_circuits_the_state_machine() {
    let h = harness().await;

    h.router.route(text_msg(CLIENT, "thanks!")).await;
    let replies = h.transport.sent_to(CLIENT);
    assert!(replies[0].contains("welcome"));
    assert_eq!(h.store.session(CLIENT), SessionMode::Idle);
}

#[tokio::test]
async fn operator_commands_win_over_relay() {
    let h = harness().await;

    h.store.enqueue(ClientId(CLIENT), "order", None);
    h.router
        .route(button(OP_A, &format!("{}{CLIENT}", actions::PICKUP_PREFIX)))
        .await;
    let to_client_before = h.transport.sent_to(CLIENT).len();

    h.router.route(text_msg(OP_A, labels::OP_STATS)).await;

    // The stats reply went to the operator, nothing to the client.
    assert_eq!(h.transport.sent_to(CLIENT).len(), to_client_before);
    let to_op = h.transport.sent_to(OP_A);
    assert!(to_op.last().unwrap().contains("STATS"));
}

#[tokio::test]
async fn busy_operator_cannot_pick_up_a_second_client() {
    let h = harness().await;

    h.store.enqueue(ClientId(CLIENT), "order", None);
    h.store.enqueue(ClientId(2), "order", None);
    h.router
        .route(button(OP_A, &format!("{}{CLIENT}", actions::PICKUP_PREFIX)))
        .await;

    h.router
        .route(button(OP_A, &format!("{}2", actions::PICKUP_PREFIX)))
        .await;

    assert!(h.store.is_waiting(ClientId(2)), "second client untouched");
    let to_op = h.transport.sent_to(OP_A);
    assert!(to_op.last().unwrap().contains("End it before"));
}

#[tokio::test]
async fn prefilter_connect_enqueues_with_topic() {
    let h = harness().await;

    h.router.route(button(CLIENT, "filter:urgent")).await;

    let waiting = h.store.waiting();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].topic, "Urgent question");
    // Operators were notified.
    assert!(h.transport.sent_to(OP_A)[0].contains("Urgent question"));
}
