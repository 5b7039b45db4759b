//! The operator side: free-text relay into the live chat, the reserved
//! command vocabulary, the pickup protocol, and end-chat.

use std::sync::Arc;

use tracing::{debug, info, warn};

use {
    festa_common::{
        transport::{Button, Keyboard},
        types::{ButtonPress, ClientId, InboundMessage, MessageContent, OperatorId, actions},
    },
    festa_persistence::message_log::LogKind,
    festa_store::{BroadcastState, BroadcastStep, PickupOutcome, SessionMode},
};

use crate::{
    content::{self, labels},
    route::Router,
    wizard,
};

impl Router {
    pub(crate) async fn operator_message(self: &Arc<Self>, op: OperatorId, msg: &InboundMessage) {
        let text = msg.content.text().unwrap_or_default().to_string();

        if text == "/start" {
            let name = self.config.operator_name(op.0);
            self.send_with_menu(
                op.0,
                &format!("👨‍💼 Hi, {name}!\n🆔 ID: {op}\n✅ Ready to work."),
                content::operator_menu(),
            )
            .await;
            return;
        }
        if text == "/end" {
            self.end_chat_by_operator(op).await;
            return;
        }

        // Wizard sub-modes first.
        match self.store.session(op.0) {
            SessionMode::BroadcastWizard(step, state) => {
                self.broadcast_input(op, step, state, &text).await;
                return;
            },
            SessionMode::AwaitingHistorySearch => {
                self.store.set_session(op.0, SessionMode::Idle);
                self.history_search(op, text.trim()).await;
                return;
            },
            _ => {},
        }

        // Free text goes to the assigned client unless it is a reserved
        // command; the command vocabulary has absolute priority.
        if let Some(client) = self.store.client_of(op) {
            if !content::OPERATOR_COMMANDS.contains(&text.as_str()) {
                self.relay_to_client(op, client, msg).await;
                return;
            }
        }

        match text.as_str() {
            labels::OP_CLIENTS => self.clients_list(op).await,
            labels::OP_JOURNAL => self.journal(op).await,
            labels::OP_HISTORY => {
                self.store.set_session(op.0, SessionMode::AwaitingHistorySearch);
                self.send(
                    op.0,
                    "🔍 Enter a search query:\n\n• client ID\n• name\n• phone number",
                    None,
                )
                .await;
            },
            labels::OP_STATS => self.stats(op).await,
            labels::OP_BROADCAST => {
                self.store.set_session(
                    op.0,
                    SessionMode::BroadcastWizard(BroadcastStep::Title, BroadcastState::default()),
                );
                self.send(op.0, "📣 New broadcast\n\nStep 1/3: enter the title:", None)
                    .await;
            },
            labels::OP_END_CHAT => self.end_chat_by_operator(op).await,
            _ => {
                if self.store.client_of(op).is_none() {
                    self.send_with_menu(
                        op.0,
                        "👨‍💼 Please pick an action from the menu.",
                        content::operator_menu(),
                    )
                    .await;
                }
            },
        }
    }

    pub(crate) async fn operator_button(self: &Arc<Self>, op: OperatorId, press: &ButtonPress) {
        let action = press.action.as_str();

        if let Some(raw) = action.strip_prefix(actions::PICKUP_PREFIX) {
            match raw.parse::<i64>() {
                Ok(id) => self.pickup(op, ClientId(id)).await,
                Err(_) => debug!(operator = %op, action, "malformed pickup action"),
            }
            return;
        }
        if let Some(rest) = action.strip_prefix("history:") {
            let mut parts = rest.splitn(2, ':');
            let id = parts.next().and_then(|p| p.parse::<i64>().ok());
            let offset = parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
            if let Some(id) = id {
                self.history_page(op, ClientId(id), offset).await;
            }
            return;
        }

        debug!(operator = %op, action, "unknown operator action ignored");
    }

    /// The pickup protocol. State validation and commit happen inside the
    /// store; everything after is notification.
    pub(crate) async fn pickup(self: &Arc<Self>, op: OperatorId, client: ClientId) {
        match self.store.pickup(op, client) {
            PickupOutcome::Connected => {
                info!(operator = %op, %client, "operator picked up client");
                self.timers.cancel_all(client.0);

                // Best-effort retraction of the other operators' notices.
                for (target, handle) in self.store.take_notices(client) {
                    if let Err(e) = self.transport.delete_message(target.0, handle).await {
                        debug!(operator = %target, error = %e, "notice retraction failed");
                    }
                }

                let name = self.config.operator_name(op.0);
                self.send(
                    client.0,
                    &format!("👨‍💼 Manager {name} joined the chat!"),
                    Some(content::in_chat_menu()),
                )
                .await;
                let greeting = "How can I help you?";
                self.send(client.0, &format!("👨‍💼 {name}: {greeting}"), None).await;
                if let Err(e) = self
                    .db
                    .log_message(op.0, client.0, greeting, LogKind::Operator)
                    .await
                {
                    warn!(operator = %op, error = %e, "message log write failed");
                }

                self.send(op.0, &format!("✅ You're connected to client {client}."), None)
                    .await;
            },
            PickupOutcome::AlreadyYours => {
                self.send(op.0, "You're already talking to this client.", None)
                    .await;
            },
            PickupOutcome::OperatorBusy(current) => {
                self.send(
                    op.0,
                    &format!(
                        "🛑 You're already in a chat with client {current}. End it \
                         before picking up another one."
                    ),
                    None,
                )
                .await;
            },
            PickupOutcome::NotWaiting => {
                self.send(
                    op.0,
                    "The client is no longer available — picked up already or \
                     cancelled the request.",
                    None,
                )
                .await;
            },
            PickupOutcome::AssignedElsewhere(other) => {
                let other_name = self.config.operator_name(other.0);
                self.send(
                    op.0,
                    &format!("The client is already with {other_name}."),
                    None,
                )
                .await;
            },
        }
    }

    pub(crate) async fn end_chat_by_operator(self: &Arc<Self>, op: OperatorId) {
        if let Some(client) = self.store.end_chat_by_operator(op) {
            self.timers.cancel_all(client.0);
            for (target, handle) in self.store.take_notices(client) {
                if let Err(e) = self.transport.delete_message(target.0, handle).await {
                    debug!(operator = %target, error = %e, "notice retraction failed");
                }
            }
            self.send(
                client.0,
                "✅ The manager ended the chat.",
                Some(content::main_menu()),
            )
            .await;
        }
        self.send_with_menu(op.0, "✅ Chat closed.", content::operator_menu())
            .await;
    }

    async fn relay_to_client(&self, op: OperatorId, client: ClientId, msg: &InboundMessage) {
        let name = self.config.operator_name(op.0);
        match &msg.content {
            MessageContent::Text(t) => {
                if let Err(e) = self
                    .transport
                    .send_text(client.0, &format!("👨‍💼 {name}: {t}"), None)
                    .await
                {
                    warn!(operator = %op, %client, error = %e, "relay to client failed");
                    return;
                }
                if let Err(e) = self.db.log_message(op.0, client.0, t, LogKind::Operator).await {
                    warn!(operator = %op, error = %e, "message log write failed");
                }
            },
            MessageContent::Image { file_id, caption } => {
                let caption = format!(
                    "👨‍💼 {name}{}",
                    caption
                        .as_deref()
                        .map(|c| format!(": {c}"))
                        .unwrap_or_default()
                );
                if let Err(e) = self
                    .transport
                    .send_image(client.0, file_id, Some(&caption))
                    .await
                {
                    warn!(operator = %op, %client, error = %e, "photo relay failed");
                    return;
                }
                if let Err(e) = self
                    .db
                    .log_message(op.0, client.0, "[photo]", LogKind::Operator)
                    .await
                {
                    warn!(operator = %op, error = %e, "message log write failed");
                }
            },
        }
    }

    // ── Reserved commands ───────────────────────────────────────────────────

    async fn clients_list(self: &Arc<Self>, op: OperatorId) {
        let waiting = self.store.waiting();
        let chats = self.store.assignments();

        if waiting.is_empty() && chats.is_empty() {
            self.send_with_menu(op.0, "📋 CLIENTS:\n\n🔭 No active clients.", content::operator_menu())
                .await;
            return;
        }

        if !waiting.is_empty() {
            let rows = waiting
                .iter()
                .map(|entry| {
                    let label = match &entry.name {
                        Some(name) => format!("💬 {name} ({}) — {}", entry.client, entry.topic),
                        None => format!("💬 Client {} — {}", entry.client, entry.topic),
                    };
                    vec![Button::action(
                        label,
                        format!("{}{}", actions::PICKUP_PREFIX, entry.client.0),
                    )]
                })
                .collect();
            self.send(op.0, "⏳ WAITING:", Some(Keyboard::inline(rows))).await;
        }

        if !chats.is_empty() {
            let mut text = String::from("💬 ACTIVE CHATS:\n");
            for (chat_op, client) in chats {
                text.push_str(&format!(
                    "• {} ↔ client {client}\n",
                    self.config.operator_name(chat_op.0)
                ));
            }
            self.send(op.0, &text, None).await;
        }
    }

    async fn journal(self: &Arc<Self>, op: OperatorId) {
        let entries = match self.db.recent_log(10).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "journal read failed");
                self.send(op.0, "⚠️ The journal is unavailable right now.", None)
                    .await;
                return;
            },
        };

        if entries.is_empty() {
            self.send_with_menu(op.0, "📒 JOURNAL:\n\nEmpty so far.", content::operator_menu())
                .await;
            return;
        }

        let mut text = String::from("📒 JOURNAL (latest first):\n\n");
        for entry in entries {
            let icon = if entry.kind == "operator" {
                "👨‍💼"
            } else {
                "👤"
            };
            text.push_str(&format!(
                "{icon} {} → {}\n📝 {}\n\n",
                entry.from_id, entry.to_id, entry.body
            ));
        }
        self.send_with_menu(op.0, &text, content::operator_menu()).await;
    }

    async fn stats(self: &Arc<Self>, op: OperatorId) {
        let profiles = self.db.profile_count().await.unwrap_or_else(|e| {
            warn!(error = %e, "profile count failed");
            0
        });
        let messages = self.db.message_count().await.unwrap_or_else(|e| {
            warn!(error = %e, "message count failed");
            0
        });
        let operators: Vec<String> = self
            .config
            .operators
            .iter()
            .map(|o| o.name.clone())
            .collect();

        let text = format!(
            "📊 STATS:\n\n\
             👥 Profiles: {profiles}\n\
             ⏳ Waiting clients: {}\n\
             💬 Active chats: {}\n\
             📝 Logged messages: {messages}\n\n\
             👨‍💼 Managers: {}",
            self.store.waiting().len(),
            self.store.assignments().len(),
            operators.join(", ")
        );
        self.send_with_menu(op.0, &text, content::operator_menu()).await;
    }

    // ── History ─────────────────────────────────────────────────────────────

    async fn history_search(self: &Arc<Self>, op: OperatorId, query: &str) {
        let matches = match self.db.search_profiles(query, 5).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "history search failed");
                self.send(op.0, "⚠️ The search is unavailable right now.", None)
                    .await;
                return;
            },
        };

        match matches.len() {
            0 => {
                self.send(
                    op.0,
                    "❌ No client found.\nTry an ID, a name, or a phone number.",
                    None,
                )
                .await;
            },
            1 => self.history_page(op, ClientId(matches[0].chat_id), 0).await,
            _ => {
                let rows = matches
                    .iter()
                    .map(|p| {
                        let label = p
                            .name
                            .clone()
                            .unwrap_or_else(|| format!("Client {}", p.chat_id));
                        vec![Button::action(label, format!("history:{}:0", p.chat_id))]
                    })
                    .collect();
                self.send(op.0, "📋 Matching clients:", Some(Keyboard::inline(rows)))
                    .await;
            },
        }
    }

    const HISTORY_PAGE: u32 = 20;

    async fn history_page(self: &Arc<Self>, op: OperatorId, client: ClientId, offset: u32) {
        let profile = self.db.profile(client.0).await.ok().flatten();
        let page = match self
            .db
            .client_history(client.0, Self::HISTORY_PAGE, offset)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "history read failed");
                self.send(op.0, "⚠️ History is unavailable right now.", None).await;
                return;
            },
        };

        let mut header = match &profile {
            Some(p) => {
                let mut s = format!(
                    "👤 {} (ID: {client})\n",
                    p.name.as_deref().unwrap_or("No name")
                );
                if let Some(phone) = &p.phone {
                    s.push_str(&format!("📞 {phone}\n"));
                }
                s
            },
            None => format!("👤 Client ID: {client}\n"),
        };

        if page.is_empty() {
            header.push_str(if offset == 0 {
                "\n⚠️ No conversation history yet."
            } else {
                "\n⚠️ No more messages."
            });
            self.send(op.0, &header, None).await;
            return;
        }

        let mut text = format!("📂 CONVERSATION HISTORY\n\n{header}\n");
        for entry in page.iter().rev() {
            let icon = if entry.kind == "operator" {
                "👨‍💼"
            } else {
                "👤"
            };
            let body: String = entry.body.chars().take(200).collect();
            text.push_str(&format!("{icon} {body}\n"));
        }

        let mut nav = Vec::new();
        if offset > 0 {
            nav.push(Button::action(
                "⬅️ Earlier",
                format!("history:{client}:{}", offset.saturating_sub(Self::HISTORY_PAGE)),
            ));
        }
        if page.len() as u32 == Self::HISTORY_PAGE {
            nav.push(Button::action(
                "Later ➡️",
                format!("history:{client}:{}", offset + Self::HISTORY_PAGE),
            ));
        }
        let mut rows = Vec::new();
        if !nav.is_empty() {
            rows.push(nav);
        }
        rows.push(vec![Button::action(
            "💬 Start a chat with this client",
            format!("{}{}", actions::PICKUP_PREFIX, client.0),
        )]);

        self.send(op.0, &text, Some(Keyboard::inline(rows))).await;
    }

    // ── Broadcast ───────────────────────────────────────────────────────────

    async fn broadcast_input(
        self: &Arc<Self>,
        op: OperatorId,
        step: BroadcastStep,
        mut state: BroadcastState,
        text: &str,
    ) {
        match step {
            BroadcastStep::Title => {
                state.title = Some(text.trim().to_string());
                self.store
                    .set_session(op.0, SessionMode::BroadcastWizard(BroadcastStep::Body, state));
                self.send(op.0, "Step 2/3: enter the broadcast text:", None).await;
            },
            BroadcastStep::Body => {
                state.body = Some(text.trim().to_string());
                self.store.set_session(
                    op.0,
                    SessionMode::BroadcastWizard(BroadcastStep::EndDate, state),
                );
                self.send(op.0, "Step 3/3: enter the end date (DD.MM.YYYY):", None)
                    .await;
            },
            BroadcastStep::EndDate => {
                let Some(date) = wizard::parse_date(text) else {
                    self.send(
                        op.0,
                        "❌ That doesn't look like a date. Try again (example: 31.12.2026):",
                        None,
                    )
                    .await;
                    return;
                };
                if date < chrono::Utc::now().date_naive() {
                    self.send(op.0, "❌ The end date can't be in the past. Try again:", None)
                        .await;
                    return;
                }

                self.store.set_session(op.0, SessionMode::Idle);
                let title = state.title.unwrap_or_default();
                let body = state.body.unwrap_or_default();
                let message = format!(
                    "🎁 {title}\n\n{body}\n\n⏰ Until: {}",
                    text.trim()
                );

                let audience = match self.db.broadcast_audience().await {
                    Ok(audience) => audience,
                    Err(e) => {
                        warn!(error = %e, "broadcast audience query failed");
                        Vec::new()
                    },
                };

                let mut delivered = 0usize;
                for chat_id in &audience {
                    match self.transport.send_text(*chat_id, &message, None).await {
                        Ok(_) => delivered += 1,
                        Err(e) => warn!(chat_id, error = %e, "broadcast send failed"),
                    }
                }

                info!(operator = %op, delivered, total = audience.len(), "broadcast finished");
                self.send_with_menu(
                    op.0,
                    &format!(
                        "✅ Broadcast sent!\n\n📋 {title}\n👥 Delivered to {delivered} of {} clients.",
                        audience.len()
                    ),
                    content::operator_menu(),
                )
                .await;
            },
        }
    }
}
