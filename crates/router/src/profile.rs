//! Client profile: the three-step wizard, the profile card, and the
//! notification toggle. Persistence failures are non-fatal: the flow
//! continues and the write is retried on the next step.

use std::sync::Arc;

use tracing::warn;

use {
    festa_common::{
        transport::{Button, Keyboard},
        types::{ClientId, actions},
    },
    festa_persistence::profiles::Profile,
    festa_store::{ProfileStep, SessionMode},
};

use crate::{content::labels, route::Router, wizard};

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

impl Router {
    async fn load_or_new_profile(&self, client: ClientId) -> Profile {
        match self.db.profile(client.0).await {
            Ok(Some(profile)) => profile,
            Ok(None) => Profile::new(client.0),
            Err(e) => {
                warn!(%client, error = %e, "profile read failed, starting fresh");
                Profile::new(client.0)
            },
        }
    }

    async fn save_profile(&self, profile: &Profile) {
        if let Err(e) = self.db.upsert_profile(profile).await {
            warn!(chat_id = profile.chat_id, error = %e, "profile write failed");
        }
    }

    pub(crate) async fn show_profile(self: &Arc<Self>, client: ClientId) {
        let profile = self.load_or_new_profile(client).await;

        if profile.name.is_none() {
            let keyboard = Keyboard::inline(vec![
                vec![Button::action("📝 Fill in my profile", "profile:fill")],
                vec![Button::action(labels::HOME, actions::HOME)],
            ]);
            self.send(
                client.0,
                "👤 Your profile is empty so far.\n\nFill it in to get personal \
                 discounts and birthday treats!",
                Some(keyboard),
            )
            .await;
            return;
        }

        let notifications = if profile.notifications {
            "✅ on"
        } else {
            "❌ off"
        };
        let member_days = (now_secs() - profile.created_at).max(0) / 86_400;
        let text = format!(
            "👤 Your profile:\n\n\
             📝 Name: {name}\n\
             📞 Phone: {phone}\n\
             🎂 Birthday: {birthday}\n\
             🔔 Notifications: {notifications}\n\
             📅 With us: {member_days} days",
            name = profile.name.as_deref().unwrap_or("—"),
            phone = profile.phone.as_deref().unwrap_or("not set"),
            birthday = profile.birthday.as_deref().unwrap_or("not set"),
        );
        let keyboard = Keyboard::inline(vec![
            vec![Button::action("✏️ Edit my details", "profile:edit")],
            vec![Button::action("🔔 Notification settings", "profile:notify")],
            vec![Button::action(labels::HOME, actions::HOME)],
        ]);
        self.send(client.0, &text, Some(keyboard)).await;
    }

    /// One wizard step. Invalid input re-prompts and stays on the step.
    pub(crate) async fn profile_input(self: &Arc<Self>, client: ClientId, step: ProfileStep, text: &str) {
        match step {
            ProfileStep::Name => {
                let mut profile = self.load_or_new_profile(client).await;
                profile.name = Some(text.trim().to_string());
                self.save_profile(&profile).await;

                self.store
                    .set_session(client.0, SessionMode::ProfileWizard(ProfileStep::Phone));
                self.send(
                    client.0,
                    "📞 Step 2/3: your phone number\n(format: +380XXXXXXXXX)",
                    None,
                )
                .await;
            },
            ProfileStep::Phone => {
                let Some(phone) = wizard::validate_phone(text) else {
                    self.send(
                        client.0,
                        "❌ That doesn't look like a phone number.\nTry again \
                         (example: +380501234567):",
                        None,
                    )
                    .await;
                    return;
                };
                let mut profile = self.load_or_new_profile(client).await;
                profile.phone = Some(phone);
                self.save_profile(&profile).await;

                self.store
                    .set_session(client.0, SessionMode::ProfileWizard(ProfileStep::Birthday));
                self.send(
                    client.0,
                    "🎂 Step 3/3: your birthday\n(format: DD.MM.YYYY, example: 15.03.1990)",
                    None,
                )
                .await;
            },
            ProfileStep::Birthday => {
                if wizard::parse_date(text).is_none() {
                    self.send(
                        client.0,
                        "❌ That doesn't look like a date.\nTry again (example: 15.03.1990):",
                        None,
                    )
                    .await;
                    return;
                }
                let mut profile = self.load_or_new_profile(client).await;
                let now = now_secs();
                if let Err(days) = wizard::birthday_edit_allowed(profile.birthday_changed_at, now) {
                    self.store.set_session(client.0, SessionMode::Menu);
                    self.send(
                        client.0,
                        &format!("⛔ The birthday can be changed again in {days} days."),
                        Some(crate::content::main_menu()),
                    )
                    .await;
                    return;
                }
                profile.birthday = Some(text.trim().to_string());
                profile.birthday_changed_at = Some(now);
                self.save_profile(&profile).await;

                self.store.set_session(client.0, SessionMode::Menu);
                self.send(
                    client.0,
                    "✅ Profile saved!\n\nYou'll now get:\n• 🎁 personal discounts\n\
                     • 🎂 birthday greetings\n• 🎊 seasonal offers",
                    Some(crate::content::main_menu()),
                )
                .await;
            },
        }
    }

    pub(crate) async fn toggle_notifications(self: &Arc<Self>, client: ClientId) {
        let mut profile = self.load_or_new_profile(client).await;
        profile.notifications = !profile.notifications;
        self.save_profile(&profile).await;

        let status = if profile.notifications {
            "on"
        } else {
            "off"
        };
        self.send(client.0, &format!("🔔 Notifications are now {status}."), None)
            .await;
        self.show_profile(client).await;
    }

    pub(crate) async fn edit_birthday(self: &Arc<Self>, client: ClientId) {
        let profile = self.load_or_new_profile(client).await;
        if let Err(days) = wizard::birthday_edit_allowed(profile.birthday_changed_at, now_secs()) {
            self.send(
                client.0,
                &format!("🎂 The birthday can be changed again in {days} days."),
                None,
            )
            .await;
            return;
        }
        self.store
            .set_session(client.0, SessionMode::ProfileWizard(ProfileStep::Birthday));
        self.send(client.0, "Enter the new birthday (DD.MM.YYYY):", None)
            .await;
    }
}
