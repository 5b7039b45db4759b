//! Manual long-polling loop.
//!
//! Updates are processed strictly in order, one at a time: each inbound unit
//! runs to completion (or its first suspension point inside the router)
//! before the next is picked up, which preserves per-party ordering.

use std::sync::Arc;

use {
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use festa_router::Router;

use crate::inbound;

/// Start polling for updates. Returns a `CancellationToken`; cancelling it
/// stops the loop.
pub async fn start_polling(bot: Bot, router: Arc<Router>) -> anyhow::Result<CancellationToken> {
    // Verify credentials before entering the loop.
    let me = bot.get_me().await?;
    info!(username = ?me.username, "telegram bot connected");

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().await?;

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    tokio::spawn(async move {
        let mut offset: i32 = 0;

        loop {
            if cancel_clone.is_cancelled() {
                info!("telegram polling stopped");
                break;
            }

            let result = bot
                .get_updates()
                .offset(offset)
                .timeout(30)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
                .await;

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        let event = match update.kind {
                            UpdateKind::Message(msg) => inbound::map_message(&msg),
                            UpdateKind::CallbackQuery(query) => inbound::map_callback(&query),
                            other => {
                                debug!("ignoring update: {other:?}");
                                None
                            },
                        };
                        if let Some(event) = event {
                            router.route(event).await;
                        }
                    }
                },
                Err(e) => {
                    // Another instance is polling with the same token; stop
                    // rather than fight over updates.
                    if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        error!("another bot instance is running with this token, stopping");
                        cancel_clone.cancel();
                        break;
                    }
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                },
            }
        }
    });

    Ok(cancel)
}
