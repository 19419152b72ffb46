use crate::ports::Clock;
use crate::storage::KeyValue;
use crate::types::Notification;

use super::{Store, StoreError};

impl<S: KeyValue, C: Clock> Store<S, C> {
    /// The session user's notifications, most recent first.
    pub fn session_notifications(&self) -> Result<Vec<Notification>, StoreError> {
        let user = self.session.as_ref().ok_or(StoreError::Unauthenticated)?;
        Ok(self
            .notifications
            .iter()
            .filter(|notification| notification.user_id == user.id)
            .cloned()
            .collect())
    }

    /// Flips `isRead` for the session user's notifications only; other
    /// users' entries are untouched. Idempotent.
    pub fn mark_notifications_as_read(&mut self) -> Result<(), StoreError> {
        let user_id = self
            .session
            .as_ref()
            .map(|user| user.id.clone())
            .ok_or(StoreError::Unauthenticated)?;
        for notification in &mut self.notifications {
            if notification.user_id == user_id {
                notification.is_read = true;
            }
        }
        self.persist_notifications();
        Ok(())
    }
}
