//! The session router: one entry point per inbound unit, dispatching in
//! strict priority order. All shared-state mutation happens synchronously
//! before the first await of any handler; replies and persistence come after.

use std::sync::Arc;

use tracing::{debug, warn};

use {
    festa_common::{
        transport::{Button, Keyboard, Transport},
        types::{ButtonPress, ClientId, InboundEvent, InboundMessage, MessageContent, OperatorId,
                actions},
    },
    festa_config::FestaConfig,
    festa_orders::{OrderAggregator, aggregator::GRATITUDE_REPLY, classify},
    festa_persistence::{Database, message_log::LogKind},
    festa_store::{ProfileStep, RateDecision, RateLimiter, SessionMode, StateStore, TimerSet},
};

use crate::{
    content::{self, labels},
    responder::Responder,
};

pub struct Router {
    pub(crate) store: Arc<StateStore>,
    pub(crate) timers: Arc<TimerSet>,
    pub(crate) rate: RateLimiter,
    pub(crate) aggregator: Arc<OrderAggregator>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) db: Database,
    pub(crate) responder: Responder,
    pub(crate) config: Arc<FestaConfig>,
}

impl Router {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<FestaConfig>,
        store: Arc<StateStore>,
        timers: Arc<TimerSet>,
        aggregator: Arc<OrderAggregator>,
        transport: Arc<dyn Transport>,
        db: Database,
        responder: Responder,
    ) -> Arc<Self> {
        let limits = &config.limits;
        let rate = RateLimiter::new(
            std::time::Duration::from_secs(limits.window_secs),
            limits.max_messages,
            std::time::Duration::from_secs(limits.cooldown_secs),
        );
        Arc::new(Self {
            store,
            timers,
            rate,
            aggregator,
            transport,
            db,
            responder,
            config,
        })
    }

    /// Dispatch one inbound unit.
    pub async fn route(self: &Arc<Self>, event: InboundEvent) {
        match event {
            InboundEvent::Message(msg) => {
                if self.config.is_operator(msg.chat_id) {
                    self.operator_message(OperatorId(msg.chat_id), &msg).await;
                } else {
                    self.client_message(ClientId(msg.chat_id), &msg).await;
                }
            },
            InboundEvent::Button(press) => self.button(press).await,
        }
    }

    // ── Client path ─────────────────────────────────────────────────────────

    fn cooldown_notice(decision: &RateDecision) -> String {
        format!(
            "⏳ Too many messages at once. Please wait about {} min and try again.",
            decision.wait_minutes()
        )
    }

    async fn client_message(self: &Arc<Self>, client: ClientId, msg: &InboundMessage) {
        let text = msg.content.text().unwrap_or_default().to_string();

        // Rate limit first: a blocked message mutates nothing.
        if let decision @ RateDecision::Blocked { .. } = self.rate.check(client.0) {
            self.send(client.0, &Self::cooldown_notice(&decision), None).await;
            return;
        }

        if text == "/start" {
            self.store.set_session(client.0, SessionMode::Menu);
            let name = msg.sender_name.clone().unwrap_or_else(|| "friend".into());
            self.send(
                client.0,
                &format!(
                    "🎈 Hi, {name}!\n\nWelcome to {} — helium balloons and party \
                     decor.\n\nPick an option from the menu:",
                    self.config.storefront.name
                ),
                Some(content::main_menu()),
            )
            .await;
            return;
        }
        if text == "/end" {
            self.client_home(client).await;
            return;
        }

        // Live manager chat: relay verbatim, after checking the mirror.
        if let SessionMode::InManagerChat(op) = self.store.session(client.0) {
            if text == labels::HOME {
                self.client_home(client).await;
                return;
            }
            if self.store.client_of(op) == Some(client) {
                self.relay_to_operator(client, op, msg).await;
            } else {
                // Broken mirror: heal the session and ask the client to retry.
                warn!(%client, operator = %op, "assignment mirror broken, resetting session");
                self.store.reset_client(client);
                self.timers.cancel_all(client.0);
                self.send(
                    client.0,
                    "⚠️ The connection to the manager was lost. Please request \
                     a manager again.",
                    Some(content::main_menu()),
                )
                .await;
            }
            return;
        }

        // Gratitude interrupt: canned acknowledgment, no state-machine logic.
        if classify::is_gratitude(&text) {
            self.send(client.0, GRATITUDE_REPLY, None).await;
            return;
        }

        // Live draft: home escape, explicit send, or clarification.
        if self.store.has_live_draft(client) {
            if text == labels::HOME {
                self.aggregator.abort(client);
                self.send(
                    client.0,
                    "🏠 Main menu:\n\nPick an option:",
                    Some(content::main_menu()),
                )
                .await;
                return;
            }
            self.aggregator.ingest(client, &msg.content).await;
            return;
        }

        // Fixed menu vocabulary.
        if self.menu_dispatch(client, msg, &text).await {
            return;
        }

        // Wizard sub-flows claim the text next.
        match self.store.session(client.0) {
            SessionMode::ProfileWizard(step) => {
                self.profile_input(client, step, &text).await;
                return;
            },
            SessionMode::AwaitingSearch => {
                self.store.set_session(client.0, SessionMode::Menu);
                self.search_reply(client, &text).await;
                return;
            },
            _ => {},
        }

        // Order intent: a photo always qualifies; text goes through the
        // classifier (FAQ patterns win and fall through to the responder).
        let starts_order = match &msg.content {
            MessageContent::Image { .. } => true,
            MessageContent::Text(t) => classify::is_order_intent(t),
        };
        if starts_order {
            self.aggregator
                .open_draft(client, msg.sender_name.clone(), &msg.content)
                .await;
            return;
        }

        // Everything else: the general responder.
        let reply = self.responder.respond(client.0, &text).await;
        self.send(client.0, &reply, Some(content::main_menu())).await;
    }

    /// Handle one fixed menu label. Returns `false` when the text is not part
    /// of the menu vocabulary.
    async fn menu_dispatch(
        self: &Arc<Self>,
        client: ClientId,
        msg: &InboundMessage,
        text: &str,
    ) -> bool {
        match text {
            labels::CATALOG => {
                self.send(
                    client.0,
                    "🛍 Our catalog:\n\nPick a category:",
                    Some(content::catalog_menu()),
                )
                .await;
            },
            labels::FAQ => {
                self.send(
                    client.0,
                    "❓ Frequent questions:\n\nPick a topic:",
                    Some(content::faq_menu()),
                )
                .await;
            },
            labels::WEBSITE => {
                let site = &self.config.storefront.site_url;
                let keyboard = Keyboard::inline(vec![
                    vec![Button::url("🛒 Open the website", site.clone())],
                    vec![Button::action(labels::HOME, actions::HOME)],
                ]);
                self.send(
                    client.0,
                    &format!(
                        "🌐 Our website:\n👉 {site}\n\nThe full catalog and online \
                         ordering live there!"
                    ),
                    Some(keyboard),
                )
                .await;
            },
            labels::CONTACTS => {
                let store = &self.config.storefront;
                self.send(
                    client.0,
                    &format!(
                        "📞 {name} contacts:\n\n☎️ {phone}\n🌐 {site}\n\n🚚 Delivery \
                         across the city and suburbs.",
                        name = store.name,
                        phone = store.phone,
                        site = store.site_url
                    ),
                    Some(content::main_menu()),
                )
                .await;
            },
            labels::SEARCH => {
                self.store.set_session(client.0, SessionMode::AwaitingSearch);
                self.send(client.0, "🔍 Type a product name to search for:", None)
                    .await;
            },
            labels::MANAGER => {
                self.contact_manager(client, msg.sender_name.clone()).await;
            },
            labels::PROFILE => {
                self.show_profile(client).await;
            },
            labels::HOME => {
                self.client_home(client).await;
            },
            _ => return false,
        }
        true
    }

    /// The "talk to a manager" entry: business-hours gate, then the topic
    /// pre-filter.
    async fn contact_manager(self: &Arc<Self>, client: ClientId, sender_name: Option<String>) {
        let hours = &self.config.hours;
        if !hours.is_open_now() {
            self.send(
                client.0,
                &format!(
                    "⏰ You reached us outside working hours.\n\nManagers are \
                     available {}:00–{}:00.\n\nSee you then!",
                    hours.start_hour, hours.end_hour
                ),
                Some(content::main_menu()),
            )
            .await;
            return;
        }
        let name = sender_name.unwrap_or_else(|| "friend".into());
        self.send(
            client.0,
            &format!("💬 {name}, to speed things up, pick the topic of your question:"),
            Some(content::prefilter_menu()),
        )
        .await;
    }

    /// Put the client in the waiting queue and notify operators.
    pub(crate) async fn request_manager(
        self: &Arc<Self>,
        client: ClientId,
        sender_name: Option<String>,
        topic: &str,
    ) {
        if self.store.operator_of(client).is_some() {
            self.send(client.0, "You're already talking to a manager.", None)
                .await;
            return;
        }
        if !self.store.enqueue(client, topic, sender_name.clone()) {
            self.send(
                client.0,
                "⏳ Your request is already in the queue — a manager will be \
                 with you shortly.",
                None,
            )
            .await;
            return;
        }

        self.notify_operators(client, sender_name.as_deref(), topic)
            .await;
        self.send(
            client.0,
            "⏳ Your request was passed to a manager! Please wait for a reply.",
            None,
        )
        .await;
    }

    /// Notice fan-out for a plain (non-order) help request: unassigned
    /// operators, or everyone tagged as queued. Handles are recorded for
    /// retraction on pickup; failures are swallowed.
    async fn notify_operators(&self, client: ClientId, name: Option<&str>, topic: &str) {
        let operators: Vec<OperatorId> =
            self.config.operators.iter().map(|o| OperatorId(o.id)).collect();
        let free = self.store.unassigned_operators(&operators);
        let (targets, all_busy) = if free.is_empty() {
            (operators, true)
        } else {
            (free, false)
        };

        let who = match name {
            Some(n) => format!("{n} (ID: {client})"),
            None => format!("ID: {client}"),
        };
        let tag = if all_busy {
            "\n(all managers are busy — the client is queued)"
        } else {
            ""
        };
        let text = format!(
            "🔔 New client!{tag}\n\n📌 Topic: {topic}\n👤 {who}\n\nOpen “{}” to pick them up.",
            labels::OP_CLIENTS
        );

        for op in targets {
            match self.transport.send_text(op.0, &text, None).await {
                Ok(handle) => self.store.record_notice(client, op, handle),
                Err(e) => warn!(%client, operator = %op, error = %e, "client notice failed"),
            }
        }
    }

    /// Relay a client message into the live chat, with logging.
    async fn relay_to_operator(&self, client: ClientId, op: OperatorId, msg: &InboundMessage) {
        let name = msg.sender_name.as_deref().unwrap_or("Client");
        match &msg.content {
            MessageContent::Text(t) => {
                if let Err(e) = self
                    .transport
                    .send_text(op.0, &format!("👤 {name} ({client}): {t}"), None)
                    .await
                {
                    warn!(%client, operator = %op, error = %e, "relay to operator failed");
                    return;
                }
                if let Err(e) = self.db.log_message(client.0, op.0, t, LogKind::Client).await {
                    warn!(%client, error = %e, "message log write failed");
                }
            },
            MessageContent::Image { file_id, caption } => {
                let caption = format!(
                    "👤 {name} ({client}){}",
                    caption
                        .as_deref()
                        .map(|c| format!(": {c}"))
                        .unwrap_or_default()
                );
                if let Err(e) = self.transport.send_image(op.0, file_id, Some(&caption)).await {
                    warn!(%client, operator = %op, error = %e, "photo relay failed");
                    return;
                }
                if let Err(e) = self
                    .db
                    .log_message(client.0, op.0, "[photo]", LogKind::Client)
                    .await
                {
                    warn!(%client, error = %e, "message log write failed");
                }
            },
        }
    }

    /// "Home" from the client side: tear down whatever was in progress.
    pub(crate) async fn client_home(self: &Arc<Self>, client: ClientId) {
        let outcome = self.store.reset_client(client);
        self.timers.cancel_all(client.0);

        if let Some(op) = outcome.was_in_chat {
            self.send_with_menu(op.0, "✅ The client ended the chat.", content::operator_menu())
                .await;
        }
        // Whatever notices are still out for this client are now stale;
        // retract them best-effort.
        for (op, handle) in self.store.take_notices(client) {
            if let Err(e) = self.transport.delete_message(op.0, handle).await {
                debug!(operator = %op, error = %e, "notice retraction failed");
            }
        }

        self.store.set_session(client.0, SessionMode::Menu);
        self.send(
            client.0,
            "🏠 Main menu:\n\nPick an option:",
            Some(content::main_menu()),
        )
        .await;
    }

    // ── Search ──────────────────────────────────────────────────────────────

    async fn search_reply(&self, client: ClientId, query: &str) {
        let site = self.config.storefront.site_url.trim_end_matches('/');
        let encoded: String = query
            .trim()
            .chars()
            .map(|c| if c == ' ' { '+' } else { c })
            .collect();
        let keyboard = Keyboard::inline(vec![
            vec![Button::url(
                "🔍 Search results",
                format!("{site}/search/?q={encoded}"),
            )],
            vec![Button::action("💬 Ask a manager", "contact")],
            vec![Button::action(labels::HOME, actions::HOME)],
        ]);
        self.send(
            client.0,
            &format!("🔍 Search results for “{}”:", query.trim()),
            Some(keyboard),
        )
        .await;
    }

    // ── Buttons ─────────────────────────────────────────────────────────────

    async fn button(self: &Arc<Self>, press: ButtonPress) {
        if let Err(e) = self.transport.answer_callback(&press.callback_id, None).await {
            debug!(chat_id = press.chat_id, error = %e, "answer_callback failed");
        }

        if self.config.is_operator(press.chat_id) {
            self.operator_button(OperatorId(press.chat_id), &press).await;
        } else {
            self.client_button(ClientId(press.chat_id), &press).await;
        }
    }

    async fn client_button(self: &Arc<Self>, client: ClientId, press: &ButtonPress) {
        // Button presses are inbound units too; a cooling-down sender gets
        // the same notice and mutates nothing.
        if let decision @ RateDecision::Blocked { .. } = self.rate.check(client.0) {
            self.send(client.0, &Self::cooldown_notice(&decision), None).await;
            return;
        }

        let action = press.action.as_str();

        match action {
            actions::HOME => {
                if let Some(message) = press.message {
                    let _ = self.transport.delete_message(client.0, message).await;
                }
                self.client_home(client).await;
                return;
            },
            actions::SEND_ORDER => {
                self.aggregator.finalize(client).await;
                return;
            },
            "catalog" => {
                self.edit_or_send(
                    client.0,
                    press.message,
                    "🛍 Our catalog:\n\nPick a category:",
                    content::catalog_menu(),
                )
                .await;
                return;
            },
            "faq" => {
                self.edit_or_send(
                    client.0,
                    press.message,
                    "❓ Frequent questions:\n\nPick a topic:",
                    content::faq_menu(),
                )
                .await;
                return;
            },
            "contact" => {
                self.contact_manager(client, press.sender_name.clone()).await;
                return;
            },
            "profile:fill" => {
                self.store
                    .set_session(client.0, SessionMode::ProfileWizard(ProfileStep::Name));
                self.send(
                    client.0,
                    "📝 Let's fill in your profile!\n\nStep 1/3: what's your name?",
                    None,
                )
                .await;
                return;
            },
            "profile:show" => {
                self.show_profile(client).await;
                return;
            },
            "profile:edit" => {
                let keyboard = Keyboard::inline(vec![
                    vec![Button::action("📝 Change name", "edit:name")],
                    vec![Button::action("📞 Change phone", "edit:phone")],
                    vec![Button::action("🎂 Change birthday", "edit:birthday")],
                    vec![Button::action("⬅️ Back", "profile:show")],
                ]);
                self.edit_or_send(client.0, press.message, "✏️ What would you like to change?", keyboard)
                    .await;
                return;
            },
            "profile:notify" => {
                self.toggle_notifications(client).await;
                return;
            },
            "edit:name" => {
                self.store
                    .set_session(client.0, SessionMode::ProfileWizard(ProfileStep::Name));
                self.send(client.0, "Enter the new name:", None).await;
                return;
            },
            "edit:phone" => {
                self.store
                    .set_session(client.0, SessionMode::ProfileWizard(ProfileStep::Phone));
                self.send(client.0, "Enter the new phone number:", None).await;
                return;
            },
            "edit:birthday" => {
                self.edit_birthday(client).await;
                return;
            },
            _ => {},
        }

        if let Some(slug) = action.strip_prefix("cat:") {
            if let Some(section) = content::find_section(slug) {
                self.edit_or_send(
                    client.0,
                    press.message,
                    section.heading,
                    content::section_menu(section),
                )
                .await;
            }
            return;
        }
        if let Some(slug) = action.strip_prefix("item:") {
            if let Some(item) = content::find_item(slug) {
                let (text, keyboard) =
                    content::product_card(item, &self.config.storefront.site_url);
                self.edit_or_send(client.0, press.message, &text, keyboard).await;
            }
            return;
        }
        if let Some(slug) = action.strip_prefix("faq:") {
            if let Some(topic) = content::find_faq(slug) {
                let keyboard = Keyboard::inline(vec![
                    vec![Button::action("💬 Ask a manager", "contact")],
                    vec![Button::action("⬅️ Back to FAQ", "faq")],
                    vec![Button::action(labels::HOME, actions::HOME)],
                ]);
                self.edit_or_send(client.0, press.message, topic.text, keyboard).await;
            }
            return;
        }
        if let Some(slug) = action.strip_prefix("filter:") {
            if let Some(topic) = content::find_prefilter(slug) {
                if topic.direct {
                    self.request_manager(client, press.sender_name.clone(), topic.topic)
                        .await;
                } else {
                    let keyboard = Keyboard::inline(vec![
                        vec![Button::action(
                            "💬 Connect me to a manager",
                            format!("connect:{}", topic.slug),
                        )],
                        vec![Button::action(labels::HOME, actions::HOME)],
                    ]);
                    self.edit_or_send(
                        client.0,
                        press.message,
                        &format!(
                            "{}\n\nA manager can walk you through the details.",
                            topic.label
                        ),
                        keyboard,
                    )
                    .await;
                }
            }
            return;
        }
        if let Some(slug) = action.strip_prefix("connect:") {
            if let Some(topic) = content::find_prefilter(slug) {
                self.request_manager(client, press.sender_name.clone(), topic.topic)
                    .await;
            }
            return;
        }

        debug!(%client, action, "unknown client action ignored");
    }

    // ── Small helpers ───────────────────────────────────────────────────────

    pub(crate) async fn send(&self, to: i64, text: &str, keyboard: Option<Keyboard>) {
        if let Err(e) = self.transport.send_text(to, text, keyboard).await {
            warn!(to, error = %e, "send failed");
        }
    }

    pub(crate) async fn send_with_menu(&self, to: i64, text: &str, menu: Keyboard) {
        self.send(to, text, Some(menu)).await;
    }

    /// Edit the pressed message in place when possible, otherwise send fresh.
    async fn edit_or_send(
        &self,
        to: i64,
        message: Option<festa_common::types::MessageHandle>,
        text: &str,
        keyboard: Keyboard,
    ) {
        match message {
            Some(handle) => {
                if self
                    .transport
                    .edit_text(to, handle, text, Some(keyboard.clone()))
                    .await
                    .is_err()
                {
                    self.send(to, text, Some(keyboard)).await;
                }
            },
            None => self.send(to, text, Some(keyboard)).await,
        }
    }
}
