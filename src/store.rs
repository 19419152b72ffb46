use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;

use crate::attachments::{self, ExternalPayload};
use crate::ports::Clock;
use crate::storage::KeyValue;
use crate::types::{ChatMessage, Homework, Notice, Notification, StaffRole, User};

use std::time::Duration;

mod accounts;
mod content;
mod notifications;

pub const USERS_KEY: &str = "mvps-all-users";
pub const SESSION_KEY: &str = "mvps-user";
pub const NOTICES_KEY: &str = "mvps-all-notices";
pub const MESSAGES_KEY: &str = "mvps-all-messages";
pub const HOMEWORK_KEY: &str = "mvps-all-homework";
pub const NOTIFICATIONS_KEY: &str = "mvps-all-notifications";

pub const AVATAR_PREFIX: &str = "mvps-avatar-";
pub const NOTICE_IMAGE_PREFIX: &str = "mvps-notice-image-";
pub const NOTICE_FILE_PREFIX: &str = "mvps-notice-file-";

pub const MAX_PROFILE_UPDATES_PER_MONTH: u32 = 2;

const COLLECTION_KEYS: [&str; 5] = [
    USERS_KEY,
    NOTICES_KEY,
    MESSAGES_KEY,
    HOMEWORK_KEY,
    NOTIFICATIONS_KEY,
];

#[derive(Debug, PartialEq, Eq)]
pub enum StoreError {
    EmailTaken,
    RoleTaken(StaffRole),
    Unauthenticated,
    UnknownUser,
    UpdateQuotaExceeded,
    NotATeacher,
    SetupAlreadyComplete,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::EmailTaken => f.write_str("an account with this email already exists"),
            StoreError::RoleTaken(role) => {
                write!(f, "the {} role is already filled", role.as_str())
            }
            StoreError::Unauthenticated => f.write_str("no user is signed in"),
            StoreError::UnknownUser => f.write_str("no such user"),
            StoreError::UpdateQuotaExceeded => {
                f.write_str("monthly profile update limit reached")
            }
            StoreError::NotATeacher => f.write_str("account is not a teacher"),
            StoreError::SetupAlreadyComplete => {
                f.write_str("teacher setup has already been completed")
            }
        }
    }
}

/// Single authority for all domain collections and the session. In-memory
/// state is the runtime source of truth; the key-value layer is a mirror,
/// rewritten key-by-key on every mutation and read back only at startup
/// (plus the deliberate user-list re-read inside `login`).
pub struct Store<S, C> {
    kv: S,
    clock: C,
    latency: Duration,
    users: Vec<User>,
    notices: Vec<Notice>,
    messages: Vec<ChatMessage>,
    homework: Vec<Homework>,
    notifications: Vec<Notification>,
    session: Option<User>,
}

impl<S: KeyValue, C: Clock> Store<S, C> {
    /// Loads every collection, seeding absent ones with the default (empty)
    /// dataset. Unparsable state wipes the namespace and reseeds; startup
    /// never fails on bad data.
    pub fn open(kv: S, clock: C, latency: Duration) -> Self {
        let mut store = Self {
            kv,
            clock,
            latency,
            users: Vec::new(),
            notices: Vec::new(),
            messages: Vec::new(),
            homework: Vec::new(),
            notifications: Vec::new(),
            session: None,
        };
        if let Err(err) = store.load() {
            eprintln!("discarding corrupt persisted state: {err}");
            store.reset_to_defaults();
        }
        store
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn homework(&self) -> &[Homework] {
        &self.homework
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref()
    }

    fn load(&mut self) -> Result<(), serde_json::Error> {
        let users: Vec<User> = self.load_collection(USERS_KEY)?;
        self.users = users
            .into_iter()
            .map(|mut user| {
                user.avatar = attachments::hydrate(user.avatar.take(), AVATAR_PREFIX, &self.kv);
                user
            })
            .collect();

        let notices: Vec<Notice> = self.load_collection(NOTICES_KEY)?;
        self.notices = notices
            .into_iter()
            .map(|mut notice| {
                notice.image_url =
                    attachments::hydrate(notice.image_url.take(), NOTICE_IMAGE_PREFIX, &self.kv);
                notice.file_url =
                    attachments::hydrate(notice.file_url.take(), NOTICE_FILE_PREFIX, &self.kv);
                notice
            })
            .collect();

        self.messages = self.load_collection(MESSAGES_KEY)?;
        self.homework = self.load_collection(HOMEWORK_KEY)?;
        self.notifications = self.load_collection(NOTIFICATIONS_KEY)?;

        self.session = match self.kv.get(SESSION_KEY) {
            Some(raw) => {
                let mut user: User = serde_json::from_str(&raw)?;
                user.avatar = attachments::hydrate(user.avatar.take(), AVATAR_PREFIX, &self.kv);
                Some(user)
            }
            None => None,
        };
        Ok(())
    }

    fn load_collection<T: DeserializeOwned>(
        &mut self,
        key: &str,
    ) -> Result<Vec<T>, serde_json::Error> {
        match self.kv.get(key) {
            Some(raw) => serde_json::from_str(&raw),
            None => {
                if let Err(err) = self.kv.set(key, "[]") {
                    eprintln!("failed to seed '{key}': {err}");
                }
                Ok(Vec::new())
            }
        }
    }

    fn reset_to_defaults(&mut self) {
        self.kv.remove(SESSION_KEY);
        for key in COLLECTION_KEYS {
            self.kv.remove(key);
        }
        self.users = Vec::new();
        self.notices = Vec::new();
        self.messages = Vec::new();
        self.homework = Vec::new();
        self.notifications = Vec::new();
        self.session = None;
        for key in COLLECTION_KEYS {
            if let Err(err) = self.kv.set(key, "[]") {
                eprintln!("failed to seed '{key}': {err}");
            }
        }
    }

    fn set_json<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                if let Err(err) = self.kv.set(key, &raw) {
                    eprintln!("failed to persist '{key}': {err}");
                }
            }
            Err(err) => eprintln!("failed to encode '{key}': {err}"),
        }
    }

    /// Writes an externalized payload; a failed write (capacity) drops the
    /// stored reference instead of leaving it dangling.
    fn apply_payload(&mut self, field: &mut Option<String>, payload: Option<ExternalPayload>) {
        let Some(payload) = payload else {
            return;
        };
        if let Err(err) = self.kv.set(&payload.key, &payload.payload) {
            eprintln!("dropping oversized field '{}': {err}", payload.key);
            *field = None;
        }
    }

    fn persist_users(&mut self) {
        let mut stored = self.users.clone();
        for user in &mut stored {
            let (value, payload) =
                attachments::externalize(user.avatar.as_deref(), AVATAR_PREFIX, &user.id);
            user.avatar = value;
            self.apply_payload(&mut user.avatar, payload);
        }
        self.set_json(USERS_KEY, &stored);
    }

    fn persist_session(&mut self) {
        match self.session.clone() {
            Some(mut user) => {
                let (value, payload) =
                    attachments::externalize(user.avatar.as_deref(), AVATAR_PREFIX, &user.id);
                user.avatar = value;
                self.apply_payload(&mut user.avatar, payload);
                self.set_json(SESSION_KEY, &user);
            }
            None => self.kv.remove(SESSION_KEY),
        }
    }

    fn persist_notices(&mut self) {
        let mut stored = self.notices.clone();
        for notice in &mut stored {
            let (value, payload) = attachments::externalize(
                notice.image_url.as_deref(),
                NOTICE_IMAGE_PREFIX,
                &notice.id,
            );
            notice.image_url = value;
            self.apply_payload(&mut notice.image_url, payload);

            let (value, payload) =
                attachments::externalize(notice.file_url.as_deref(), NOTICE_FILE_PREFIX, &notice.id);
            notice.file_url = value;
            self.apply_payload(&mut notice.file_url, payload);
            if notice.file_url.is_none() {
                notice.file_name = None;
                notice.file_type = None;
            }
        }
        self.set_json(NOTICES_KEY, &stored);
    }

    fn persist_messages(&mut self) {
        let messages = self.messages.clone();
        self.set_json(MESSAGES_KEY, &messages);
    }

    fn persist_homework(&mut self) {
        let homework = self.homework.clone();
        self.set_json(HOMEWORK_KEY, &homework);
    }

    fn persist_notifications(&mut self) {
        let notifications = self.notifications.clone();
        self.set_json(NOTIFICATIONS_KEY, &notifications);
    }

    #[cfg(test)]
    pub(crate) fn kv(&self) -> &S {
        &self.kv
    }

    #[cfg(test)]
    pub(crate) fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }
}

fn unix_millis(now: OffsetDateTime) -> i128 {
    now.unix_timestamp_nanos() / 1_000_000
}

fn month_of(now: OffsetDateTime) -> u8 {
    u8::from(now.month())
}

/// Ids follow the original `<prefix><unix millis>` shape, with a short
/// random suffix so entities created within the same millisecond stay
/// distinct.
fn entity_id(prefix: &str, now: OffsetDateTime) -> String {
    let suffix: u16 = rand::random();
    format!("{prefix}{}-{suffix:04x}", unix_millis(now))
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests;
