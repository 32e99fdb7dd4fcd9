//! check_social_inbox: poll the relay, verify, store, wake.

use async_trait::async_trait;
use chrono::Duration;

use automaton_core::message::InboxStatus;
use automaton_core::{InboxMessage, Result};
use automaton_crypto::{NONCE_TTL_SECS, nonce_dedup_key, validate_inbound};

use crate::context::TickContext;
use crate::scheduler::{HeartbeatTask, TaskOutcome};

const POLL_LIMIT: u32 = 50;

/// Pulls messages from the relay, runs the full validation pipeline
/// (addresses, sizes, timestamp window, signature recovery), drops
/// replayed nonces via the dedup table, and stores what survives.
pub struct CheckSocialInbox;

#[async_trait]
impl HeartbeatTask for CheckSocialInbox {
    fn name(&self) -> &'static str {
        "check_social_inbox"
    }

    async fn run(&self, ctx: &TickContext) -> Result<TaskOutcome> {
        let Some(relay) = ctx.deps.relay.as_ref() else {
            return Ok(TaskOutcome::quiet());
        };

        let cursor = ctx.deps.store.get_kv("inbox_cursor")?;
        let poll = relay.poll(cursor.as_deref(), POLL_LIMIT).await?;

        let mut stored = 0usize;
        for message in &poll.messages {
            if let Err(e) = validate_inbound(message) {
                ctx.deps.logger.warn(
                    "inbox",
                    &format!("dropped invalid message {}: {e}", message.id),
                );
                continue;
            }

            // Replay protection: a nonce seen within the window is dropped.
            let nonce_key = nonce_dedup_key(&message.nonce);
            let now_iso = automaton_core::id::to_iso(ctx.started_at);
            if ctx.deps.store.dedup_exists(&nonce_key, &now_iso)? {
                ctx.deps
                    .logger
                    .warn("inbox", &format!("dropped replayed nonce {}", message.nonce));
                continue;
            }
            let ttl =
                automaton_core::id::to_iso(ctx.started_at + Duration::seconds(NONCE_TTL_SECS));
            ctx.deps
                .store
                .insert_dedup(&nonce_key, "check_social_inbox", &ttl)?;

            let inserted = ctx.deps.store.insert_inbox_message(&InboxMessage {
                id: message.id.clone(),
                from: message.from.to_lowercase(),
                to: message.to.to_lowercase(),
                content: message.content.clone(),
                received_at: now_iso,
                status: InboxStatus::Received,
                retry_count: 0,
                max_retries: 3,
            })?;
            if inserted {
                stored += 1;
            }
        }

        if let Some(next_cursor) = poll.next_cursor {
            ctx.deps.store.set_kv("inbox_cursor", &next_cursor)?;
        }

        ctx.deps
            .metrics
            .add("inbox_messages", stored as f64, &[]);

        if stored > 0 {
            Ok(TaskOutcome::wake(format!("{stored} new messages")))
        } else {
            Ok(TaskOutcome::quiet())
        }
    }
}
