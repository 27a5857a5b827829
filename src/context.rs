//! Per-user pending image contexts with time-based expiry.
//!
//! A user who sends an image gets a context holding its bytes. The next text
//! message from that user consumes it and turns into an image edit request.
//! Contexts older than the TTL are discarded before every lookup.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::Mutex;

use crate::types::ImageData;

/// The last image a user sent, waiting for an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImageContext {
    pub user_id: String,
    pub image: ImageData,
    pub received_at: DateTime<Utc>,
}

/// Lock-guarded map of user id to pending image context.
#[derive(Debug)]
pub struct ContextStore {
    ttl: chrono::Duration,
    entries: Mutex<HashMap<String, PendingImageContext>>,
}

impl ContextStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `image` as the user's context, replacing any previous one.
    pub async fn put(&self, user_id: &str, image: ImageData) {
        self.put_at(user_id, image, Utc::now()).await;
    }

    pub async fn put_at(&self, user_id: &str, image: ImageData, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        self.sweep_locked(&mut entries, now);
        debug!(
            "Storing image context for {user_id} ({} bytes)",
            image.bytes.len()
        );
        entries.insert(
            user_id.to_string(),
            PendingImageContext {
                user_id: user_id.to_string(),
                image,
                received_at: now,
            },
        );
    }

    /// Remove and return the user's context if it has not expired.
    pub async fn take_if_fresh(&self, user_id: &str) -> Option<PendingImageContext> {
        self.take_if_fresh_at(user_id, Utc::now()).await
    }

    pub async fn take_if_fresh_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Option<PendingImageContext> {
        let mut entries = self.entries.lock().await;
        self.sweep_locked(&mut entries, now);
        entries.remove(user_id)
    }

    /// Put back a context taken by [`take_if_fresh`](Self::take_if_fresh).
    ///
    /// The original `received_at` is kept, so a restored context expires when
    /// it would have anyway. A context stored for the user in the meantime wins.
    pub async fn restore(&self, context: PendingImageContext) {
        self.restore_at(context, Utc::now()).await;
    }

    pub async fn restore_at(&self, context: PendingImageContext, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        self.sweep_locked(&mut entries, now);
        if !self.is_fresh(&context, now) {
            debug!("Not restoring expired context for {}", context.user_id);
            return;
        }
        entries
            .entry(context.user_id.clone())
            .or_insert(context);
    }

    /// Drop every expired context. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        self.sweep_locked(&mut entries, now)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn is_fresh(&self, context: &PendingImageContext, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(context.received_at) <= self.ttl
    }

    fn sweep_locked(
        &self,
        entries: &mut HashMap<String, PendingImageContext>,
        now: DateTime<Utc>,
    ) -> usize {
        let before = entries.len();
        entries.retain(|_, context| self.is_fresh(context, now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Swept {removed} expired image contexts");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    fn image(byte: u8) -> ImageData {
        ImageData::new(vec![byte; 4], "image/jpeg")
    }

    fn minutes(n: i64) -> chrono::Duration {
        chrono::Duration::minutes(n)
    }

    #[tokio::test]
    async fn context_is_fresh_at_nine_minutes() -> Result<(), &'static str> {
        let store = ContextStore::new(TTL);
        let t = Utc::now();
        store.put_at("U1", image(1), t).await;

        let context = store
            .take_if_fresh_at("U1", t + minutes(9))
            .await
            .ok_or("expected a fresh context")?;
        assert_eq!(context.image, image(1));
        assert_eq!(context.received_at, t);
        Ok(())
    }

    #[tokio::test]
    async fn context_is_expired_at_eleven_minutes() {
        let store = ContextStore::new(TTL);
        let t = Utc::now();
        store.put_at("U1", image(1), t).await;

        assert!(store.take_if_fresh_at("U1", t + minutes(11)).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn context_exactly_at_ttl_is_still_fresh() {
        let store = ContextStore::new(TTL);
        let t = Utc::now();
        store.put_at("U1", image(1), t).await;

        assert!(store.take_if_fresh_at("U1", t + minutes(10)).await.is_some());
    }

    #[tokio::test]
    async fn take_consumes_the_context() {
        let store = ContextStore::new(TTL);
        let t = Utc::now();
        store.put_at("U1", image(1), t).await;

        assert!(store.take_if_fresh_at("U1", t).await.is_some());
        assert!(store.take_if_fresh_at("U1", t).await.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_and_refreshes_timestamp() -> Result<(), &'static str> {
        let store = ContextStore::new(TTL);
        let t = Utc::now();
        store.put_at("U1", image(1), t).await;
        store.put_at("U1", image(2), t + minutes(8)).await;

        assert_eq!(store.len().await, 1);
        let context = store
            .take_if_fresh_at("U1", t + minutes(15))
            .await
            .ok_or("second image should still be fresh")?;
        assert_eq!(context.image, image(2));
        Ok(())
    }

    #[tokio::test]
    async fn lookups_sweep_other_users() {
        let store = ContextStore::new(TTL);
        let t = Utc::now();
        store.put_at("U1", image(1), t).await;
        store.put_at("U2", image(2), t + minutes(5)).await;

        assert!(store.take_if_fresh_at("U3", t + minutes(12)).await.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn sweep_reports_removed_count() {
        let store = ContextStore::new(TTL);
        let t = Utc::now();
        store.put_at("U1", image(1), t).await;
        store.put_at("U2", image(2), t).await;
        store.put_at("U3", image(3), t + minutes(20)).await;

        // The third put already swept the first two.
        assert_eq!(store.sweep_at(t + minutes(20)).await, 0);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.sweep_at(t + minutes(31)).await, 1);
    }

    #[tokio::test]
    async fn restore_keeps_original_timestamp() {
        let store = ContextStore::new(TTL);
        let t = Utc::now();
        store.put_at("U1", image(1), t).await;
        let Some(context) = store.take_if_fresh_at("U1", t + minutes(1)).await else {
            panic!("expected a context");
        };

        store.restore_at(context, t + minutes(2)).await;
        assert!(store.take_if_fresh_at("U1", t + minutes(11)).await.is_none());
    }

    #[tokio::test]
    async fn restore_does_not_clobber_newer_image() -> Result<(), &'static str> {
        let store = ContextStore::new(TTL);
        let t = Utc::now();
        store.put_at("U1", image(1), t).await;
        let context = store
            .take_if_fresh_at("U1", t)
            .await
            .ok_or("expected a context")?;
        store.put_at("U1", image(2), t + minutes(1)).await;

        store.restore_at(context, t + minutes(1)).await;
        let current = store
            .take_if_fresh_at("U1", t + minutes(1))
            .await
            .ok_or("expected the newer context")?;
        assert_eq!(current.image, image(2));
        Ok(())
    }
}
