// Moderation engine - core business logic for warn/ban escalation.
//
// This service handles:
// - Warning accumulation with expiry (through the WarnStore port)
// - Automatic ban once the warn threshold is reached
// - Scheduling deferred message deletions per the policy table
// - Cancelling pending deletions when someone else got there first
//
// It is the sole writer of warn-ledger state and the sole driver of the
// timer scheduler for moderation events. NO transport dependencies here -
// sends, deletes and bans go through the ModerationGateway port.

use super::moderation_models::{GatewayError, MessageRef, WarnError, WarnOutcome, WarnSource};
use crate::core::config::DelaySetting;
use crate::core::policy::{DeleteCategory, DeletionPolicies};
use crate::core::scheduler::{CancelHandle, SchedulerError, TimerScheduler};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// One retry with a short backoff for transient transport failures.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error(transparent)]
    Store(#[from] WarnError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

// ============================================================================
// PORTS
// ============================================================================

/// Per-chat, per-user ledger of warning timestamps.
///
/// All counting is expiry-aware: a warning is expired once strictly more
/// than `expire_after` has passed since it was issued. `None` means
/// warnings never expire.
#[async_trait]
pub trait WarnStore: Send + Sync {
    /// Append a warning, sweep expired entries, and return the count of
    /// active warnings after insertion.
    async fn add_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        source: WarnSource,
        now: DateTime<Utc>,
        expire_after: Option<Duration>,
    ) -> Result<u32, WarnError>;

    /// Sweep expired entries, then count what is left.
    async fn count_active(
        &self,
        chat_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
        expire_after: Option<Duration>,
    ) -> Result<u32, WarnError>;

    /// Drop the most recent warning (manual unwarn). Returns the number of
    /// warnings remaining.
    async fn remove_newest(&self, chat_id: i64, user_id: i64) -> Result<u32, WarnError>;

    /// Clear the ledger (used after a ban).
    async fn reset(&self, chat_id: i64, user_id: i64) -> Result<(), WarnError>;
}

/// Outbound moderation actions. Implemented by the Telegram API client;
/// mocked in tests.
#[async_trait]
pub trait ModerationGateway: Send + Sync {
    /// Post a warn notification; returns a reference to the posted message.
    async fn send_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        count: u32,
        threshold: u32,
    ) -> Result<MessageRef, GatewayError>;

    /// Post a ban notification; returns a reference to the posted message.
    async fn send_ban_notice(&self, chat_id: i64, user_id: i64)
        -> Result<MessageRef, GatewayError>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), GatewayError>;

    async fn ban_user(&self, chat_id: i64, user_id: i64) -> Result<(), GatewayError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The moderation engine. `Banned` is never stored: the ledger reset on ban
/// makes the user logically clean again, so state is always derived from
/// ledger size.
pub struct ModerationService<S: WarnStore, G: ModerationGateway + 'static> {
    store: S,
    gateway: Arc<G>,
    policies: DeletionPolicies,
    scheduler: TimerScheduler,
    threshold: u32,
    expire_after: Option<Duration>,
    /// Per-(chat, user) critical sections; unrelated keys stay concurrent.
    key_locks: DashMap<(i64, i64), Arc<Mutex<()>>>,
    /// Pending deletions by (chat, message), so an admin action can cancel
    /// the timer instead of racing it.
    pending_deletions: Arc<DashMap<(i64, i64), CancelHandle>>,
}

impl<S: WarnStore, G: ModerationGateway + 'static> ModerationService<S, G> {
    pub fn new(
        store: S,
        gateway: Arc<G>,
        policies: DeletionPolicies,
        scheduler: TimerScheduler,
        threshold: u32,
        expire_after: Option<Duration>,
    ) -> Self {
        Self {
            store,
            gateway,
            policies,
            scheduler,
            threshold,
            expire_after,
            key_locks: DashMap::new(),
            pending_deletions: Arc::new(DashMap::new()),
        }
    }

    /// Issue a warning and evaluate the ban threshold.
    ///
    /// Both the automatic path (flagged message) and admin `/warn` commands
    /// go through here; only `source` differs. When `offending_message` is
    /// given it is deleted immediately.
    pub async fn issue_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        offending_message: Option<i64>,
        source: WarnSource,
    ) -> Result<WarnOutcome, ModerationError> {
        // Critical section per (chat, user): two in-flight warnings for the
        // same user must not both observe a count below the threshold.
        let lock = self.key_lock(chat_id, user_id);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let count = self
            .store
            .add_warning(chat_id, user_id, source, now, self.expire_after)
            .await?;

        if let Some(message_id) = offending_message {
            self.schedule_deletion_after(chat_id, message_id, Duration::ZERO)
                .await?;
        }

        if count >= self.threshold {
            return self.ban(chat_id, user_id, count).await;
        }

        let category = match source {
            WarnSource::Auto => DeleteCategory::WarnAuto,
            WarnSource::Manual => DeleteCategory::WarnManual,
        };
        match self
            .gateway
            .send_warning(chat_id, user_id, count, self.threshold)
            .await
        {
            Ok(notice) => {
                self.apply_delete_policy(notice.chat_id, notice.message_id, category)
                    .await?;
            }
            // A failed notification doesn't undo the warning.
            Err(err) => tracing::warn!(chat_id, user_id, "Failed to send warn notice: {err}"),
        }

        Ok(WarnOutcome::Warned {
            count,
            threshold: self.threshold,
        })
    }

    async fn ban(
        &self,
        chat_id: i64,
        user_id: i64,
        count: u32,
    ) -> Result<WarnOutcome, ModerationError> {
        match self.ban_with_retry(chat_id, user_id).await {
            Ok(()) => {}
            Err(GatewayError::AlreadyBanned) => {
                tracing::debug!(chat_id, user_id, "User was already banned");
            }
            Err(err) => return Err(err.into()),
        }

        // Reset makes the user logically clean again; ban/unban bookkeeping
        // beyond this point is the transport side's concern.
        self.store.reset(chat_id, user_id).await?;
        tracing::info!(chat_id, user_id, count, "Banned user at warn threshold");

        match self.gateway.send_ban_notice(chat_id, user_id).await {
            Ok(notice) => {
                self.apply_delete_policy(notice.chat_id, notice.message_id, DeleteCategory::Ban)
                    .await?;
            }
            Err(err) => tracing::warn!(chat_id, user_id, "Failed to send ban notice: {err}"),
        }

        Ok(WarnOutcome::Banned { count })
    }

    async fn ban_with_retry(&self, chat_id: i64, user_id: i64) -> Result<(), GatewayError> {
        match self.gateway.ban_user(chat_id, user_id).await {
            Err(err) if err.is_transient() => {
                tracing::warn!(chat_id, user_id, "Ban failed, retrying once: {err}");
                tokio::time::sleep(RETRY_BACKOFF).await;
                self.gateway.ban_user(chat_id, user_id).await
            }
            other => other,
        }
    }

    /// Remove the most recent warning (admin `/unwarn`). Returns the number
    /// of warnings remaining.
    pub async fn unwarn(&self, chat_id: i64, user_id: i64) -> Result<u32, ModerationError> {
        let lock = self.key_lock(chat_id, user_id);
        let _guard = lock.lock().await;

        Ok(self.store.remove_newest(chat_id, user_id).await?)
    }

    /// Current active warning count for a user.
    pub async fn active_warnings(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<u32, ModerationError> {
        Ok(self
            .store
            .count_active(chat_id, user_id, Utc::now(), self.expire_after)
            .await?)
    }

    /// Schedule deletion of a message per its category policy. Returns
    /// whether a deletion was actually scheduled (Disabled short-circuits).
    pub async fn apply_delete_policy(
        &self,
        chat_id: i64,
        message_id: i64,
        category: DeleteCategory,
    ) -> Result<bool, ModerationError> {
        match self.policies.resolve(category) {
            DelaySetting::Disabled => Ok(false),
            DelaySetting::After(delay) => {
                self.schedule_deletion_after(chat_id, message_id, delay)
                    .await?;
                Ok(true)
            }
        }
    }

    /// Length-triggered deletion; evaluated independently of the category
    /// policies and stacking with them. Whichever timer fires first wins;
    /// the later one observes the message as already gone.
    pub async fn apply_custom_policy(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<bool, ModerationError> {
        match self.policies.custom_delay(text) {
            Some(delay) => {
                self.schedule_deletion_after(chat_id, message_id, delay)
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// An admin (or another actor) already removed the message: cancel the
    /// pending timer so it doesn't fire into a no-op delete attempt.
    pub fn note_message_deleted(&self, chat_id: i64, message_id: i64) {
        if let Some((_, handle)) = self.pending_deletions.remove(&(chat_id, message_id)) {
            handle.cancel();
        }
    }

    async fn schedule_deletion_after(
        &self,
        chat_id: i64,
        message_id: i64,
        delay: Duration,
    ) -> Result<(), ModerationError> {
        let gateway = Arc::clone(&self.gateway);
        let pending = Arc::clone(&self.pending_deletions);
        let action = async move {
            delete_message_action(gateway.as_ref(), chat_id, message_id).await;
            pending.remove(&(chat_id, message_id));
        };

        let handle = self.scheduler.schedule(delay, action).await?;
        if !delay.is_zero() {
            self.pending_deletions.insert((chat_id, message_id), handle);
        }
        Ok(())
    }

    fn key_lock(&self, chat_id: i64, user_id: i64) -> Arc<Mutex<()>> {
        self.key_locks
            .entry((chat_id, user_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Fired deletion action. "Message already gone" is success - cancellation
/// races with moderators are expected. Transient transport failures get one
/// retry; anything else is logged and dropped so one failing action never
/// blocks unrelated events.
async fn delete_message_action<G: ModerationGateway>(gateway: &G, chat_id: i64, message_id: i64) {
    let result = match gateway.delete_message(chat_id, message_id).await {
        Err(err) if err.is_transient() => {
            tokio::time::sleep(RETRY_BACKOFF).await;
            gateway.delete_message(chat_id, message_id).await
        }
        other => other,
    };

    match result {
        Ok(()) => {}
        Err(GatewayError::AlreadyDeleted) => {
            tracing::debug!(chat_id, message_id, "Message was already gone");
        }
        Err(err) => tracing::warn!(chat_id, message_id, "Failed to delete message: {err}"),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;

    /// In-memory store for testing, with real expiry semantics.
    struct MockWarnStore {
        ledgers: DashMap<(i64, i64), Vec<DateTime<Utc>>>,
    }

    impl MockWarnStore {
        fn new() -> Self {
            Self {
                ledgers: DashMap::new(),
            }
        }

        fn sweep(
            entries: &mut Vec<DateTime<Utc>>,
            now: DateTime<Utc>,
            expire_after: Option<Duration>,
        ) {
            if let Some(window) = expire_after.and_then(|w| chrono::Duration::from_std(w).ok()) {
                entries.retain(|issued_at| now.signed_duration_since(*issued_at) <= window);
            }
        }
    }

    #[async_trait]
    impl WarnStore for MockWarnStore {
        async fn add_warning(
            &self,
            chat_id: i64,
            user_id: i64,
            _source: WarnSource,
            now: DateTime<Utc>,
            expire_after: Option<Duration>,
        ) -> Result<u32, WarnError> {
            let mut entry = self.ledgers.entry((chat_id, user_id)).or_default();
            entry.push(now);
            Self::sweep(&mut entry, now, expire_after);
            Ok(entry.len() as u32)
        }

        async fn count_active(
            &self,
            chat_id: i64,
            user_id: i64,
            now: DateTime<Utc>,
            expire_after: Option<Duration>,
        ) -> Result<u32, WarnError> {
            let mut entry = self.ledgers.entry((chat_id, user_id)).or_default();
            Self::sweep(&mut entry, now, expire_after);
            Ok(entry.len() as u32)
        }

        async fn remove_newest(&self, chat_id: i64, user_id: i64) -> Result<u32, WarnError> {
            let mut entry = self.ledgers.entry((chat_id, user_id)).or_default();
            entry.pop();
            Ok(entry.len() as u32)
        }

        async fn reset(&self, chat_id: i64, user_id: i64) -> Result<(), WarnError> {
            self.ledgers.remove(&(chat_id, user_id));
            Ok(())
        }
    }

    /// Gateway that records every call; failure modes are configurable.
    struct MockGateway {
        calls: StdMutex<Vec<String>>,
        next_message_id: AtomicI64,
        ban_transient_failures: AtomicU32,
        delete_reports_already_gone: bool,
    }

    impl MockGateway {
        fn new() -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                next_message_id: AtomicI64::new(1000),
                ban_transient_failures: AtomicU32::new(0),
                delete_reports_already_gone: false,
            }
        }

        fn failing_bans(count: u32) -> Self {
            let gateway = Self::new();
            gateway.ban_transient_failures.store(count, Ordering::SeqCst);
            gateway
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count_of(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ModerationGateway for MockGateway {
        async fn send_warning(
            &self,
            chat_id: i64,
            _user_id: i64,
            count: u32,
            threshold: u32,
        ) -> Result<MessageRef, GatewayError> {
            self.record(format!("warn {count}/{threshold}"));
            Ok(MessageRef {
                chat_id,
                message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            })
        }

        async fn send_ban_notice(
            &self,
            chat_id: i64,
            user_id: i64,
        ) -> Result<MessageRef, GatewayError> {
            self.record(format!("ban-notice {user_id}"));
            Ok(MessageRef {
                chat_id,
                message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            })
        }

        async fn delete_message(&self, _chat_id: i64, message_id: i64) -> Result<(), GatewayError> {
            self.record(format!("delete {message_id}"));
            if self.delete_reports_already_gone {
                return Err(GatewayError::AlreadyDeleted);
            }
            Ok(())
        }

        async fn ban_user(&self, _chat_id: i64, user_id: i64) -> Result<(), GatewayError> {
            self.record(format!("ban {user_id}"));
            if self.ban_transient_failures.load(Ordering::SeqCst) > 0 {
                self.ban_transient_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(GatewayError::Transport {
                    message: "flaky network".to_string(),
                    transient: true,
                });
            }
            Ok(())
        }
    }

    fn policies(json: &str) -> DeletionPolicies {
        let config: Config = serde_json::from_str(json).unwrap();
        DeletionPolicies::from_config(&config).unwrap()
    }

    fn service(
        gateway: Arc<MockGateway>,
        threshold: u32,
        policy_json: &str,
    ) -> ModerationService<MockWarnStore, MockGateway> {
        ModerationService::new(
            MockWarnStore::new(),
            gateway,
            policies(policy_json),
            TimerScheduler::new(),
            threshold,
            Some(Duration::from_secs(100)),
        )
    }

    const PLAIN: &str = r#"{ "master": 1, "numberOfWarnsToBan": 3 }"#;

    #[tokio::test]
    async fn warnings_below_threshold_just_warn() {
        let gateway = Arc::new(MockGateway::new());
        let engine = service(Arc::clone(&gateway), 3, PLAIN);

        let first = engine
            .issue_warning(-10, 7, None, WarnSource::Auto)
            .await
            .unwrap();
        let second = engine
            .issue_warning(-10, 7, None, WarnSource::Auto)
            .await
            .unwrap();

        assert_eq!(first, WarnOutcome::Warned { count: 1, threshold: 3 });
        assert_eq!(second, WarnOutcome::Warned { count: 2, threshold: 3 });
        assert_eq!(gateway.count_of("ban "), 0);
        assert_eq!(gateway.count_of("warn "), 2);
    }

    #[tokio::test]
    async fn reaching_threshold_bans_once_and_resets_the_ledger() {
        let gateway = Arc::new(MockGateway::new());
        let engine = service(Arc::clone(&gateway), 3, PLAIN);

        for _ in 0..2 {
            engine
                .issue_warning(-10, 7, None, WarnSource::Auto)
                .await
                .unwrap();
        }
        let third = engine
            .issue_warning(-10, 7, None, WarnSource::Auto)
            .await
            .unwrap();

        assert_eq!(third, WarnOutcome::Banned { count: 3 });
        assert_eq!(gateway.count_of("ban 7"), 1);
        assert_eq!(gateway.count_of("ban-notice"), 1);
        assert_eq!(engine.active_warnings(-10, 7).await.unwrap(), 0);

        // A fresh warning afterwards starts a new escalation from 1.
        let fourth = engine
            .issue_warning(-10, 7, None, WarnSource::Auto)
            .await
            .unwrap();
        assert_eq!(fourth, WarnOutcome::Warned { count: 1, threshold: 3 });
    }

    #[tokio::test]
    async fn manual_warnings_count_toward_the_same_threshold() {
        let gateway = Arc::new(MockGateway::new());
        let engine = service(Arc::clone(&gateway), 2, PLAIN);

        engine
            .issue_warning(-10, 7, None, WarnSource::Auto)
            .await
            .unwrap();
        let outcome = engine
            .issue_warning(-10, 7, None, WarnSource::Manual)
            .await
            .unwrap();

        assert_eq!(outcome, WarnOutcome::Banned { count: 2 });
    }

    #[tokio::test]
    async fn unwarn_removes_the_newest_warning() {
        let gateway = Arc::new(MockGateway::new());
        let engine = service(Arc::clone(&gateway), 3, PLAIN);

        engine
            .issue_warning(-10, 7, None, WarnSource::Manual)
            .await
            .unwrap();
        engine
            .issue_warning(-10, 7, None, WarnSource::Manual)
            .await
            .unwrap();

        assert_eq!(engine.unwarn(-10, 7).await.unwrap(), 1);
        assert_eq!(engine.active_warnings(-10, 7).await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn offending_message_is_deleted_immediately_and_notice_per_policy() {
        let gateway = Arc::new(MockGateway::new());
        let engine = service(
            Arc::clone(&gateway),
            3,
            r#"{ "master": 1, "numberOfWarnsToBan": 3, "deleteWarnsAfter": 5000 }"#,
        );

        engine
            .issue_warning(-10, 7, Some(555), WarnSource::Auto)
            .await
            .unwrap();

        // Offending message went immediately; the warn notice has not yet.
        assert_eq!(gateway.count_of("delete 555"), 1);
        assert_eq!(gateway.count_of("delete 1000"), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(gateway.count_of("delete 1000"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_policy_never_schedules_a_deletion() {
        let gateway = Arc::new(MockGateway::new());
        let engine = service(Arc::clone(&gateway), 3, PLAIN);

        let scheduled = engine
            .apply_delete_policy(-10, 42, DeleteCategory::Join)
            .await
            .unwrap();
        assert!(!scheduled);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(gateway.count_of("delete"), 0);
    }

    #[tokio::test]
    async fn already_deleted_is_swallowed() {
        let mut gateway = MockGateway::new();
        gateway.delete_reports_already_gone = true;
        let gateway = Arc::new(gateway);
        let engine = service(Arc::clone(&gateway), 3, PLAIN);

        // Immediate deletion of the offending message hits AlreadyDeleted;
        // the warning itself still succeeds.
        let outcome = engine
            .issue_warning(-10, 7, Some(555), WarnSource::Auto)
            .await
            .unwrap();
        assert_eq!(outcome, WarnOutcome::Warned { count: 1, threshold: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_deletion_never_fires() {
        let gateway = Arc::new(MockGateway::new());
        let engine = service(
            Arc::clone(&gateway),
            3,
            r#"{ "master": 1, "numberOfWarnsToBan": 3, "deleteJoinsAfter": 5000 }"#,
        );

        let scheduled = engine
            .apply_delete_policy(-10, 42, DeleteCategory::Join)
            .await
            .unwrap();
        assert!(scheduled);

        // A moderator deleted it manually before the timer fired.
        engine.note_message_deleted(-10, 42);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(gateway.count_of("delete"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_policy_applies_only_over_length_threshold() {
        let gateway = Arc::new(MockGateway::new());
        let engine = service(
            Arc::clone(&gateway),
            3,
            r#"{
                "master": 1,
                "numberOfWarnsToBan": 3,
                "deleteCustom": { "longerThan": 5, "after": 1000 }
            }"#,
        );

        assert!(engine
            .apply_custom_policy(-10, 42, "longer than five")
            .await
            .unwrap());
        assert!(!engine.apply_custom_policy(-10, 43, "tiny").await.unwrap());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(gateway.count_of("delete 42"), 1);
        assert_eq!(gateway.count_of("delete 43"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_ban_failure_is_retried_once() {
        let gateway = Arc::new(MockGateway::failing_bans(1));
        let engine = service(Arc::clone(&gateway), 1, PLAIN);

        let outcome = engine
            .issue_warning(-10, 7, None, WarnSource::Auto)
            .await
            .unwrap();

        assert_eq!(outcome, WarnOutcome::Banned { count: 1 });
        assert_eq!(gateway.count_of("ban 7"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_ban_failure_surfaces_after_one_retry() {
        let gateway = Arc::new(MockGateway::failing_bans(5));
        let engine = service(Arc::clone(&gateway), 1, PLAIN);

        let result = engine.issue_warning(-10, 7, None, WarnSource::Auto).await;

        assert!(result.is_err());
        // Exactly one retry, not a loop.
        assert_eq!(gateway.count_of("ban 7"), 2);
        // The ledger was not reset; the next query still sees the warning.
        assert_eq!(engine.active_warnings(-10, 7).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_warnings_for_one_user_trigger_exactly_one_ban() {
        let gateway = Arc::new(MockGateway::new());
        let engine = Arc::new(service(Arc::clone(&gateway), 2, PLAIN));

        let a = Arc::clone(&engine);
        let b = Arc::clone(&engine);
        let (first, second) = tokio::join!(
            a.issue_warning(-10, 7, None, WarnSource::Auto),
            b.issue_warning(-10, 7, None, WarnSource::Auto),
        );

        let outcomes = [first.unwrap(), second.unwrap()];
        let bans = outcomes
            .iter()
            .filter(|o| matches!(o, WarnOutcome::Banned { .. }))
            .count();
        assert_eq!(bans, 1);
        assert_eq!(gateway.count_of("ban 7"), 1);
    }
}
