use crate::ports::Clock;
use crate::storage::KeyValue;
use crate::types::{
    ChatMessage, Homework, HomeworkDraft, MessageDraft, Notice, NoticeDraft, Notification,
    NotificationKind, RoleProfile,
};

use super::{Store, StoreError, entity_id, unix_millis};

impl<S: KeyValue, C: Clock> Store<S, C> {
    /// Posts a notice as the session user and fans a notification out to
    /// every other known user. Most recent notice first.
    pub fn add_notice(&mut self, draft: NoticeDraft) -> Result<Notice, StoreError> {
        let author = self.session.clone().ok_or(StoreError::Unauthenticated)?;
        let now = self.clock.now();
        let notice = Notice {
            id: entity_id("N", now),
            title: draft.title,
            content: draft.content,
            author: author.name.clone(),
            date: now,
            image_url: draft.image_url,
            file_url: draft.file_url,
            file_name: draft.file_name,
            file_type: draft.file_type,
        };
        self.notices.insert(0, notice.clone());

        let fanned: Vec<Notification> = self
            .users
            .iter()
            .filter(|user| user.id != author.id)
            .map(|user| Notification {
                id: format!("NOTIF-N-{}-{}", unix_millis(now), user.id),
                user_id: user.id.clone(),
                kind: NotificationKind::NewNotice,
                title: format!("New Notice: {}", notice.title),
                message: format!("A new notice has been posted by {}.", notice.author),
                link: "/dashboard/notice-board".to_string(),
                timestamp: now,
                is_read: false,
            })
            .collect();
        self.prepend_notifications(fanned);

        self.persist_notices();
        self.persist_notifications();
        Ok(notice)
    }

    /// Appends a chat message. No notification fan-out: chat surfaces
    /// through the conversation view, not the notification center.
    pub fn send_message(&mut self, draft: MessageDraft) -> ChatMessage {
        let now = self.clock.now();
        let message = ChatMessage {
            id: entity_id("M", now),
            sender_id: draft.sender_id,
            receiver_id: draft.receiver_id,
            content: draft.content,
            image_url: draft.image_url,
            timestamp: now,
        };
        self.messages.push(message.clone());
        self.persist_messages();
        message
    }

    /// Records homework as the session user and notifies every student in
    /// the target class.
    pub fn add_homework(&mut self, draft: HomeworkDraft) -> Result<Homework, StoreError> {
        if self.session.is_none() {
            return Err(StoreError::Unauthenticated);
        }
        let now = self.clock.now();
        let homework = Homework {
            id: entity_id("HW", now),
            teacher_id: draft.teacher_id,
            title: draft.title,
            description: draft.description,
            subject: draft.subject,
            class: draft.class,
            due_date: draft.due_date,
        };
        self.homework.insert(0, homework.clone());
        self.persist_homework();

        let fanned: Vec<Notification> = self
            .users
            .iter()
            .filter(|user| match &user.profile {
                RoleProfile::Student(student) => student.class == homework.class,
                RoleProfile::Staff(_) => false,
            })
            .map(|student| Notification {
                id: format!("NOTIF-HW-{}-{}", unix_millis(now), student.id),
                user_id: student.id.clone(),
                kind: NotificationKind::NewHomework,
                title: format!("New Homework: {}", homework.subject),
                message: format!(
                    "Your teacher assigned new homework: \"{}\". Due: {}",
                    homework.title, homework.due_date
                ),
                link: "/dashboard/homework".to_string(),
                timestamp: now,
                is_read: false,
            })
            .collect();
        self.prepend_notifications(fanned);
        self.persist_notifications();
        Ok(homework)
    }

    pub(super) fn prepend_notifications(&mut self, fanned: Vec<Notification>) {
        if fanned.is_empty() {
            return;
        }
        let existing = std::mem::take(&mut self.notifications);
        self.notifications = fanned.into_iter().chain(existing).collect();
    }
}
