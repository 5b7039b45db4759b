//! The order-aggregation state machine.
//!
//! One draft per client, `Collecting -> Ready -> Sent`. The aggregator owns
//! every client-facing reply of the collection flow and the debounce timer
//! that auto-finalizes a quiet draft. All draft mutation goes through the
//! state store's synchronous operations; the `Sent` transition is
//! test-and-set inside one critical section so `finalize` fans out at most
//! once no matter how it is reached (explicit send, button, or timer).

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use {
    festa_common::{
        transport::{Button, Keyboard, Transport},
        types::{ClientId, MessageContent, OperatorId, actions},
    },
    festa_store::{
        ClarifyOutcome, DraftOrigin, DraftStatus, OrderDraft, SessionMode, StateStore, TimerKind,
        TimerSet,
    },
};

use crate::classify;

/// Canned acknowledgment for gratitude phrases.
pub const GRATITUDE_REPLY: &str = "You're welcome! Happy to help 🎈";

/// Reply while a prior request is already with the managers.
const PLEASE_WAIT_REPLY: &str =
    "Your previous request is already with our managers — please wait a moment, \
     someone will pick it up shortly.";

const SENT_REPLY: &str =
    "✅ Your request was passed to a manager. Please wait for a reply here.";

const CAPTION_SET_REPLY: &str =
    "I've got the photo and one note already. Press “📨 Send to manager” to pass \
     it on, or 🏠 to start over.";

pub struct OrderAggregator {
    store: Arc<StateStore>,
    timers: Arc<TimerSet>,
    transport: Arc<dyn Transport>,
    operators: Vec<OperatorId>,
    auto_finalize_after: Duration,
}

impl OrderAggregator {
    pub fn new(
        store: Arc<StateStore>,
        timers: Arc<TimerSet>,
        transport: Arc<dyn Transport>,
        operators: Vec<OperatorId>,
        auto_finalize_after: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            timers,
            transport,
            operators,
            auto_finalize_after,
        })
    }

    /// Keyboard offered while a draft is live.
    fn draft_keyboard() -> Keyboard {
        Keyboard::inline(vec![
            vec![Button::action("📨 Send to manager", actions::SEND_ORDER)],
            vec![Button::action("🏠 Main menu", actions::HOME)],
        ])
    }

    /// Open a draft from the first qualifying input.
    ///
    /// A second order-intent while a prior draft is `Sent` and unconnected
    /// yields a "please wait" reply instead of a second draft.
    pub async fn open_draft(
        self: &Arc<Self>,
        client: ClientId,
        sender_name: Option<String>,
        content: &MessageContent,
    ) {
        let mut draft = match content {
            MessageContent::Text(text) => OrderDraft::from_text(text.clone()),
            MessageContent::Image { file_id, caption } => {
                OrderDraft::from_image(file_id.clone(), caption.clone())
            },
        };
        draft.client_name = sender_name;

        if !self.store.insert_draft(client, draft) {
            debug!(%client, "draft already exists, asking the client to wait");
            self.reply(client, PLEASE_WAIT_REPLY, None).await;
            return;
        }

        self.review_and_reply(client).await;
        self.arm_auto_finalize(client);
    }

    /// Feed a follow-up message into a live draft: explicit send, or a
    /// clarification.
    pub async fn ingest(self: &Arc<Self>, client: ClientId, content: &MessageContent) {
        let text = content.text().unwrap_or_default().to_string();

        if classify::is_send_command(&text) {
            self.finalize(client).await;
            return;
        }

        let outcome = match content {
            MessageContent::Text(t) => self.store.with_draft(client, |d| d.clarify(t.clone())),
            // A second photo while collecting: treat its caption as a note.
            MessageContent::Image { caption, .. } => self.store.with_draft(client, |d| {
                d.clarify(caption.clone().unwrap_or_else(|| "[another photo]".into()))
            }),
        };

        match outcome {
            Some(ClarifyOutcome::Added) => {
                self.review_and_reply(client).await;
                self.arm_auto_finalize(client);
            },
            Some(ClarifyOutcome::CaptionAlreadySet) => {
                self.reply(client, CAPTION_SET_REPLY, Some(Self::draft_keyboard()))
                    .await;
            },
            Some(ClarifyOutcome::Locked) => {
                self.reply(client, PLEASE_WAIT_REPLY, None).await;
            },
            None => {
                // Draft vanished between routing and ingest (session reset).
                debug!(%client, "ingest on a missing draft, ignoring");
            },
        }
    }

    /// Re-evaluate completeness over the whole draft and tell the client what
    /// is still missing, or that it is ready to send.
    async fn review_and_reply(self: &Arc<Self>, client: ClientId) {
        let Some(draft) = self.store.draft(client) else {
            return;
        };

        let combined = format!("{} {}", draft.primary, draft.clarifications.join(" "));
        let report = classify::completeness(&combined);

        if draft.is_image() && draft.primary.is_empty() {
            self.reply(
                client,
                "Nice photo! Add one line with the details (what, how many, when) \
                 — or press “📨 Send to manager” right away.",
                Some(Self::draft_keyboard()),
            )
            .await;
            return;
        }

        if report.is_ready() {
            self.store
                .with_draft(client, |d| d.advance(DraftStatus::Ready));
            self.reply(
                client,
                "Looks complete! Press “📨 Send to manager” to pass your request on, \
                 or add another detail.",
                Some(Self::draft_keyboard()),
            )
            .await;
        } else {
            let missing: Vec<&str> = report.missing.iter().map(|s| s.label()).collect();
            self.reply(
                client,
                &format!(
                    "Got it! To pass this to a manager I still need: {}.",
                    missing.join(", ")
                ),
                Some(Self::draft_keyboard()),
            )
            .await;
        }
    }

    /// Finalize the draft: idempotent hand-off to the operators.
    ///
    /// Returns `true` when this call performed the hand-off; `false` when the
    /// draft was already `Sent` (or gone).
    pub async fn finalize(self: &Arc<Self>, client: ClientId) -> bool {
        self.timers.cancel(client.0, TimerKind::AutoFinalize);

        // Test-and-set under the store lock: only one caller sees `Some`.
        let handoff = self
            .store
            .with_draft(client, |d| {
                if d.status == DraftStatus::Sent {
                    None
                } else {
                    d.advance(DraftStatus::Sent);
                    d.locked = true;
                    Some((d.summary(), d.origin.clone(), d.client_name.clone()))
                }
            })
            .flatten();

        let Some((summary, origin, name)) = handoff else {
            debug!(%client, "finalize: draft already sent or missing, no-op");
            return false;
        };

        self.store.enqueue(client, "order", name.clone());
        self.store.set_session(client.0, SessionMode::Idle);

        self.fan_out(client, name.as_deref(), &summary, &origin).await;

        self.reply(client, SENT_REPLY, None).await;
        info!(%client, "order draft finalized and queued");
        true
    }

    /// Notify operators of the new request: the unassigned ones, or everyone
    /// (tagged as queued) when all are busy. Each notice handle is recorded
    /// for retraction on pickup. Send failures never abort the fan-out.
    async fn fan_out(
        &self,
        client: ClientId,
        sender_name: Option<&str>,
        summary: &str,
        origin: &DraftOrigin,
    ) {
        let free = self.store.unassigned_operators(&self.operators);
        let (targets, all_busy) = if free.is_empty() {
            (self.operators.clone(), true)
        } else {
            (free, false)
        };

        let who = match sender_name {
            Some(name) => format!("{name} (ID: {client})"),
            None => format!("ID: {client}"),
        };
        let tag = if all_busy {
            "\n(all managers are busy — the client is queued)"
        } else {
            ""
        };
        let text = format!(
            "🔔 New order request{tag}\n\n👤 {who}\n\n{summary}\n\nOpen “📋 Clients” to pick them up."
        );

        for op in targets {
            let sent = match origin {
                DraftOrigin::Image { file_id } => {
                    self.transport.send_image(op.0, file_id, Some(&text)).await
                },
                DraftOrigin::Text => self.transport.send_text(op.0, &text, None).await,
            };
            match sent {
                Ok(handle) => self.store.record_notice(client, op, handle),
                Err(e) => warn!(%client, operator = %op, error = %e, "order notice failed"),
            }
        }
    }

    /// Arm (or re-arm) the debounce timer. The callback re-checks freshness:
    /// `finalize` is a no-op when the draft is gone or already sent.
    fn arm_auto_finalize(self: &Arc<Self>, client: ClientId) {
        let agg = Arc::clone(self);
        self.timers.arm(
            client.0,
            TimerKind::AutoFinalize,
            self.auto_finalize_after,
            async move {
                if agg.finalize(client).await {
                    info!(%client, "quiet draft auto-finalized");
                }
            },
        );
    }

    /// Abort collection: discard the draft silently (no fan-out) and cancel
    /// the timer. Used by the "home" escape.
    pub fn abort(&self, client: ClientId) {
        self.timers.cancel_all(client.0);
        if self.store.remove_draft(client).is_some() {
            debug!(%client, "draft discarded");
        }
        self.store.set_session(client.0, SessionMode::Idle);
    }

    async fn reply(&self, client: ClientId, text: &str, keyboard: Option<Keyboard>) {
        if let Err(e) = self.transport.send_text(client.0, text, keyboard).await {
            warn!(%client, error = %e, "aggregator reply failed");
        }
    }
}
