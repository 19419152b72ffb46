use super::*;
use crate::storage::{DirStore, MemoryStore};
use crate::types::{
    NotificationKind, RoleProfile, SignupDetails, SignupRole, StaffRole, TeacherSetup,
};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use time::macros::datetime;

const LATENCY: Duration = Duration::from_millis(500);

#[derive(Clone)]
struct TestClock {
    now: Arc<Mutex<OffsetDateTime>>,
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl TestClock {
    fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            slept: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn set_now(&self, now: OffsetDateTime) {
        *self.now.lock().expect("now lock") = now;
    }

    fn sleep_durations(&self) -> Vec<Duration> {
        self.slept.lock().expect("slept lock").clone()
    }
}

impl Clock for TestClock {
    type Sleep<'a>
        = std::future::Ready<()>
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("now lock")
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        self.slept.lock().expect("slept lock").push(duration);
        std::future::ready(())
    }
}

fn new_store() -> (Store<MemoryStore, TestClock>, TestClock) {
    let clock = TestClock::new(datetime!(2025-08-15 10:00 UTC));
    let store = Store::open(MemoryStore::default(), clock.clone(), LATENCY);
    (store, clock)
}

fn student(name: &str, email: &str, class: &str) -> SignupDetails {
    SignupDetails {
        name: name.to_string(),
        email: email.to_string(),
        password: "password".to_string(),
        avatar: None,
        role: SignupRole::Student {
            class: class.to_string(),
            favourite_subject: None,
            bio: None,
        },
    }
}

fn staff(name: &str, email: &str, staff_role: StaffRole) -> SignupDetails {
    SignupDetails {
        name: name.to_string(),
        email: email.to_string(),
        password: "password".to_string(),
        avatar: None,
        role: SignupRole::Staff { staff_role },
    }
}

fn notice(title: &str) -> crate::types::NoticeDraft {
    crate::types::NoticeDraft {
        title: title.to_string(),
        content: "Details to follow.".to_string(),
        image_url: None,
        file_url: None,
        file_name: None,
        file_type: None,
    }
}

fn create_temp_root(test_name: &str) -> PathBuf {
    let mut root = std::env::temp_dir();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    root.push(format!("mvps-{}-{}", test_name, nanos));
    std::fs::create_dir_all(&root).expect("create temp dir");
    root
}

#[tokio::test]
async fn signup__should_reject_duplicate_email_case_insensitively() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("first signup");

    // When
    let result = store.signup(student("Other", "ALICE@Example.COM", "10B")).await;

    // Then
    assert_eq!(result.unwrap_err(), StoreError::EmailTaken);
    assert_eq!(store.users().len(), 1);
}

#[tokio::test]
async fn signup__should_reject_second_holder_of_singleton_role() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(staff("Mrs. Rao", "rao@example.com", StaffRole::Director))
        .await
        .expect("first director");

    // When
    let result = store
        .signup(staff("Mr. Shah", "shah@example.com", StaffRole::Director))
        .await;

    // Then
    assert_eq!(result.unwrap_err(), StoreError::RoleTaken(StaffRole::Director));
    assert_eq!(store.users().len(), 1);
}

#[tokio::test]
async fn signup__should_allow_multiple_teachers() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(staff("Mr. Verma", "verma@example.com", StaffRole::Teacher))
        .await
        .expect("first teacher");

    // When
    let second = store
        .signup(staff("Mrs. Iyer", "iyer@example.com", StaffRole::Teacher))
        .await;

    // Then
    assert!(second.is_ok());
    assert_eq!(store.users().len(), 2);
}

#[tokio::test]
async fn signup__should_generate_roll_no_and_start_student_session() {
    // Given
    let (mut store, _) = new_store();

    // When
    let user = store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup");

    // Then
    let RoleProfile::Student(profile) = &user.profile else {
        panic!("expected student profile");
    };
    assert!(profile.roll_no.starts_with("MVPS"));
    assert_eq!(profile.roll_no.len(), "MVPS".len() + 6);
    assert!(profile.roll_no["MVPS".len()..].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(store.current_user().map(|u| u.id.as_str()), Some(user.id.as_str()));
    assert!(store.kv().get(SESSION_KEY).is_some());
}

#[tokio::test]
async fn signup__should_bump_roll_no_when_the_derived_serial_is_taken() {
    // Given
    let (mut store, clock) = new_store();
    let serial = unix_millis(clock.now()).rem_euclid(1_000_000) as u64;
    let first = store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("first signup");
    let RoleProfile::Student(profile) = &first.profile else {
        panic!("expected student profile");
    };
    assert_eq!(profile.roll_no, format!("MVPS{serial:06}"));

    // When
    let second = store
        .signup(student("Bob", "bob@example.com", "10A"))
        .await
        .expect("second signup");

    // Then
    let RoleProfile::Student(profile) = &second.profile else {
        panic!("expected student profile");
    };
    assert_eq!(profile.roll_no, format!("MVPS{:06}", (serial + 1) % 1_000_000));
}

#[tokio::test]
async fn signup__should_not_start_session_for_staff() {
    // Given
    let (mut store, _) = new_store();

    // When
    store
        .signup(staff("Mr. Verma", "verma@example.com", StaffRole::Teacher))
        .await
        .expect("signup");

    // Then
    assert!(store.current_user().is_none());
    assert!(store.kv().get(SESSION_KEY).is_none());
}

#[tokio::test]
async fn signup__should_mark_teacher_setup_incomplete() {
    // Given
    let (mut store, _) = new_store();

    // When
    let teacher = store
        .signup(staff("Mr. Verma", "verma@example.com", StaffRole::Teacher))
        .await
        .expect("signup teacher");
    let principal = store
        .signup(staff("Mrs. Rao", "rao@example.com", StaffRole::Principal))
        .await
        .expect("signup principal");

    // Then
    let RoleProfile::Staff(profile) = &teacher.profile else {
        panic!("expected staff profile");
    };
    assert!(!profile.is_setup_complete);
    let RoleProfile::Staff(profile) = &principal.profile else {
        panic!("expected staff profile");
    };
    assert!(profile.is_setup_complete);
}

#[tokio::test]
async fn login__should_return_none_for_wrong_password() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(staff("Mr. Verma", "verma@example.com", StaffRole::Teacher))
        .await
        .expect("signup");

    // When
    let result = store.login("verma@example.com", "wrong").await;

    // Then
    assert!(result.is_none());
    assert!(store.current_user().is_none());
}

#[tokio::test]
async fn login__should_match_email_case_insensitively_and_persist_session() {
    // Given
    let (mut store, clock) = new_store();
    store
        .signup(staff("Mr. Verma", "Verma@Example.com", StaffRole::Teacher))
        .await
        .expect("signup");

    // When
    let user = store.login("verma@example.com", "password").await;

    // Then
    assert!(user.is_some());
    assert!(store.current_user().is_some());
    assert!(store.kv().get(SESSION_KEY).is_some());
    // both signup and login simulate network latency
    assert_eq!(clock.sleep_durations(), vec![LATENCY, LATENCY]);
}

#[tokio::test]
async fn login__should_see_users_persisted_by_another_client() {
    // Given
    let (mut store, _) = new_store();
    let ghost = r#"[{
        "id": "U1",
        "name": "Ghost",
        "email": "ghost@example.com",
        "password": "password",
        "role": "student",
        "class": "10A",
        "rollNo": "MVPS000001"
    }]"#;
    store.kv_mut().set(USERS_KEY, ghost).expect("plant user list");

    // When
    let user = store.login("ghost@example.com", "password").await;

    // Then
    assert_eq!(user.map(|u| u.name), Some("Ghost".to_string()));
}

#[tokio::test]
async fn logout__should_clear_session_and_persisted_reference() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup");

    // When
    store.logout();

    // Then
    assert!(store.current_user().is_none());
    assert!(store.kv().get(SESSION_KEY).is_none());
}

#[tokio::test]
async fn update_user__should_enforce_monthly_quota() {
    // Given
    let (mut store, _) = new_store();
    let user = store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup");

    // When
    let mut renamed = user.clone();
    renamed.name = "Alice A.".to_string();
    let first = store.update_user(renamed).expect("first update");
    assert_eq!(first.profile_update_count, 1);

    let mut renamed = first.clone();
    renamed.name = "Alice B.".to_string();
    let second = store.update_user(renamed).expect("second update");
    assert_eq!(second.profile_update_count, 2);
    assert_eq!(store.remaining_updates(&user.id), Ok(0));

    let mut renamed = second.clone();
    renamed.name = "Alice C.".to_string();
    let third = store.update_user(renamed);

    // Then
    assert_eq!(third.unwrap_err(), StoreError::UpdateQuotaExceeded);
    assert_eq!(store.users()[0].name, "Alice B.");
}

#[tokio::test]
async fn update_user__should_reset_quota_on_month_change() {
    // Given
    let (mut store, clock) = new_store();
    let user = store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup");
    for name in ["Alice A.", "Alice B."] {
        let mut renamed = store.users()[0].clone();
        renamed.name = name.to_string();
        store.update_user(renamed).expect("update");
    }
    assert_eq!(store.remaining_updates(&user.id), Ok(0));

    // When
    clock.set_now(datetime!(2025-09-01 08:00 UTC));

    // Then
    assert_eq!(store.remaining_updates(&user.id), Ok(2));
    let mut renamed = store.users()[0].clone();
    renamed.name = "Alice September".to_string();
    let updated = store.update_user(renamed).expect("update in new month");
    assert_eq!(updated.profile_update_count, 1);
    assert_eq!(updated.last_update_month, Some(9));
}

#[tokio::test]
async fn update_user__should_reject_email_already_held_by_another_user() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(staff("Mr. Verma", "verma@example.com", StaffRole::Teacher))
        .await
        .expect("signup teacher");
    let alice = store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup student");

    // When
    let mut updated = alice.clone();
    updated.email = "VERMA@example.com".to_string();
    let result = store.update_user(updated);

    // Then
    assert_eq!(result.unwrap_err(), StoreError::EmailTaken);
}

#[tokio::test]
async fn update_user__should_reject_taking_a_held_singleton_role() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(staff("Mrs. Rao", "rao@example.com", StaffRole::Principal))
        .await
        .expect("signup principal");
    let teacher = store
        .signup(staff("Mr. Verma", "verma@example.com", StaffRole::Teacher))
        .await
        .expect("signup teacher");

    // When
    let mut updated = teacher.clone();
    if let RoleProfile::Staff(profile) = &mut updated.profile {
        profile.staff_role = StaffRole::Principal;
    }
    let result = store.update_user(updated);

    // Then
    assert_eq!(result.unwrap_err(), StoreError::RoleTaken(StaffRole::Principal));
}

#[tokio::test]
async fn update_user__should_return_unknown_user_for_missing_id() {
    // Given
    let (mut store, _) = new_store();
    let stranger = crate::types::User {
        id: "U-missing".to_string(),
        name: "Nobody".to_string(),
        email: "nobody@example.com".to_string(),
        password: "password".to_string(),
        avatar: None,
        profile_update_count: 0,
        last_update_month: None,
        profile: RoleProfile::Student(crate::types::StudentProfile {
            class: "10A".to_string(),
            roll_no: "MVPS999999".to_string(),
            favourite_subject: None,
            bio: None,
        }),
    };

    // When
    let result = store.update_user(stranger);

    // Then
    assert_eq!(result.unwrap_err(), StoreError::UnknownUser);
}

#[tokio::test]
async fn complete_teacher_setup__should_run_exactly_once() {
    // Given
    let (mut store, _) = new_store();
    let teacher = store
        .signup(staff("Mr. Verma", "verma@example.com", StaffRole::Teacher))
        .await
        .expect("signup teacher");
    let setup = TeacherSetup {
        is_class_teacher: true,
        class_teacher_of: Some("10A".to_string()),
        subjects: vec!["Physics".to_string()],
        classes_taught: vec!["10A".to_string(), "10B".to_string()],
    };

    // When
    let updated = store
        .complete_teacher_setup(&teacher.id, setup.clone())
        .expect("complete setup");

    // Then
    let RoleProfile::Staff(profile) = &updated.profile else {
        panic!("expected staff profile");
    };
    assert!(profile.is_setup_complete);
    assert!(profile.is_class_teacher);
    assert_eq!(profile.class_teacher_of.as_deref(), Some("10A"));
    assert_eq!(
        store.complete_teacher_setup(&teacher.id, setup).unwrap_err(),
        StoreError::SetupAlreadyComplete
    );
}

#[tokio::test]
async fn complete_teacher_setup__should_reject_non_teachers() {
    // Given
    let (mut store, _) = new_store();
    let principal = store
        .signup(staff("Mrs. Rao", "rao@example.com", StaffRole::Principal))
        .await
        .expect("signup principal");
    let setup = TeacherSetup {
        is_class_teacher: false,
        class_teacher_of: None,
        subjects: Vec::new(),
        classes_taught: Vec::new(),
    };

    // When
    let result = store.complete_teacher_setup(&principal.id, setup);

    // Then
    assert_eq!(result.unwrap_err(), StoreError::NotATeacher);
}

#[tokio::test]
async fn delete_user__should_cascade_messages_and_homework() {
    // Given
    let (mut store, _) = new_store();
    let teacher = store
        .signup(staff("Mr. Verma", "verma@example.com", StaffRole::Teacher))
        .await
        .expect("signup teacher");
    let alice = store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup alice");
    let bob = store
        .signup(student("Bob", "bob@example.com", "10A"))
        .await
        .expect("signup bob");

    store.send_message(crate::types::MessageDraft {
        sender_id: alice.id.clone(),
        receiver_id: teacher.id.clone(),
        content: "Question about homework".to_string(),
        image_url: None,
    });
    store.send_message(crate::types::MessageDraft {
        sender_id: teacher.id.clone(),
        receiver_id: bob.id.clone(),
        content: "See the notice board".to_string(),
        image_url: None,
    });
    store.send_message(crate::types::MessageDraft {
        sender_id: alice.id.clone(),
        receiver_id: bob.id.clone(),
        content: "Lunch?".to_string(),
        image_url: None,
    });
    store
        .add_homework(crate::types::HomeworkDraft {
            teacher_id: teacher.id.clone(),
            title: "Chapter 4 problems".to_string(),
            description: "Questions 1-10".to_string(),
            subject: "Physics".to_string(),
            class: "10A".to_string(),
            due_date: "2025-08-22".to_string(),
        })
        .expect("add homework");

    // When
    store.delete_user(&teacher.id).expect("delete teacher");

    // Then
    assert!(store.users().iter().all(|user| user.id != teacher.id));
    assert!(store
        .messages()
        .iter()
        .all(|m| m.sender_id != teacher.id && m.receiver_id != teacher.id));
    assert_eq!(store.messages().len(), 1);
    assert!(store.homework().iter().all(|h| h.teacher_id != teacher.id));
    assert!(store.homework().is_empty());
}

#[tokio::test]
async fn delete_user__should_log_out_the_deleted_session_user() {
    // Given
    let (mut store, _) = new_store();
    let alice = store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup");
    assert!(store.current_user().is_some());

    // When
    store.delete_user(&alice.id).expect("delete");

    // Then
    assert!(store.current_user().is_none());
    assert!(store.kv().get(SESSION_KEY).is_none());
}

#[tokio::test]
async fn delete_account_by_email__should_match_case_insensitively() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(student("Alice", "Alice@Example.com", "10A"))
        .await
        .expect("signup");

    // When
    let deleted = store.delete_account_by_email("alice@example.com").await;

    // Then
    assert!(deleted);
    assert!(store.users().is_empty());
    assert!(!store.delete_account_by_email("alice@example.com").await);
}

#[tokio::test]
async fn add_notice__should_require_a_session() {
    // Given
    let (mut store, _) = new_store();

    // When
    let result = store.add_notice(notice("Sports Day"));

    // Then
    assert_eq!(result.unwrap_err(), StoreError::Unauthenticated);
    assert!(store.notices().is_empty());
}

#[tokio::test]
async fn add_notice__should_fan_out_to_every_other_user() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(staff("Mrs. Rao", "rao@example.com", StaffRole::Principal))
        .await
        .expect("signup principal");
    store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup alice");
    store
        .signup(student("Bob", "bob@example.com", "10B"))
        .await
        .expect("signup bob");
    let principal = store
        .login("rao@example.com", "password")
        .await
        .expect("login principal");

    // When
    store.add_notice(notice("Sports Day")).expect("add notice");

    // Then
    assert_eq!(store.notifications().len(), store.users().len() - 1);
    assert!(store
        .notifications()
        .iter()
        .all(|n| n.user_id != principal.id));
    assert!(store
        .notifications()
        .iter()
        .all(|n| n.kind == NotificationKind::NewNotice));
}

#[tokio::test]
async fn add_notice__should_prepend_most_recent_first() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup");

    // When
    store.add_notice(notice("First")).expect("first notice");
    store.add_notice(notice("Second")).expect("second notice");

    // Then
    assert_eq!(store.notices()[0].title, "Second");
    assert_eq!(store.notices()[1].title, "First");
}

#[tokio::test]
async fn add_homework__should_notify_only_students_in_the_class() {
    // Given
    let (mut store, _) = new_store();
    let teacher = store
        .signup(staff("Mr. Verma", "verma@example.com", StaffRole::Teacher))
        .await
        .expect("signup teacher");
    let alice = store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup alice");
    let carol = store
        .signup(student("Carol", "carol@example.com", "10A"))
        .await
        .expect("signup carol");
    store
        .signup(student("Bob", "bob@example.com", "10B"))
        .await
        .expect("signup bob");
    store.login("verma@example.com", "password").await.expect("login");

    // When
    store
        .add_homework(crate::types::HomeworkDraft {
            teacher_id: teacher.id.clone(),
            title: "Chapter 4 problems".to_string(),
            description: "Questions 1-10".to_string(),
            subject: "Physics".to_string(),
            class: "10A".to_string(),
            due_date: "2025-08-22".to_string(),
        })
        .expect("add homework");

    // Then
    let recipients: Vec<&str> = store
        .notifications()
        .iter()
        .map(|n| n.user_id.as_str())
        .collect();
    assert_eq!(store.notifications().len(), 2);
    assert!(recipients.contains(&alice.id.as_str()));
    assert!(recipients.contains(&carol.id.as_str()));
    assert!(store
        .notifications()
        .iter()
        .all(|n| n.kind == NotificationKind::NewHomework));
}

#[tokio::test]
async fn add_homework__should_require_a_session() {
    // Given
    let (mut store, _) = new_store();

    // When
    let result = store.add_homework(crate::types::HomeworkDraft {
        teacher_id: "U1".to_string(),
        title: "Chapter 4 problems".to_string(),
        description: "Questions 1-10".to_string(),
        subject: "Physics".to_string(),
        class: "10A".to_string(),
        due_date: "2025-08-22".to_string(),
    });

    // Then
    assert_eq!(result.unwrap_err(), StoreError::Unauthenticated);
}

#[tokio::test]
async fn send_message__should_append_in_chronological_order() {
    // Given
    let (mut store, _) = new_store();

    // When
    store.send_message(crate::types::MessageDraft {
        sender_id: "U1".to_string(),
        receiver_id: "U2".to_string(),
        content: "First".to_string(),
        image_url: None,
    });
    store.send_message(crate::types::MessageDraft {
        sender_id: "U2".to_string(),
        receiver_id: "U1".to_string(),
        content: "Second".to_string(),
        image_url: None,
    });

    // Then
    assert_eq!(store.messages()[0].content, "First");
    assert_eq!(store.messages()[1].content, "Second");
    assert!(store.kv().get(MESSAGES_KEY).expect("persisted messages").contains("Second"));
}

#[tokio::test]
async fn mark_notifications_as_read__should_only_touch_the_session_user() {
    // Given
    let (mut store, _) = new_store();
    store
        .signup(staff("Mrs. Rao", "rao@example.com", StaffRole::Principal))
        .await
        .expect("signup principal");
    let alice = store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup alice");
    let bob = store
        .signup(student("Bob", "bob@example.com", "10B"))
        .await
        .expect("signup bob");
    store.login("rao@example.com", "password").await.expect("login");
    store.add_notice(notice("Sports Day")).expect("add notice");
    store.login("alice@example.com", "password").await.expect("login alice");

    // When
    store.mark_notifications_as_read().expect("mark read");

    // Then
    for notification in store.notifications() {
        if notification.user_id == alice.id {
            assert!(notification.is_read);
        } else if notification.user_id == bob.id {
            assert!(!notification.is_read);
        }
    }

    // idempotent
    let snapshot = store.notifications().to_vec();
    store.mark_notifications_as_read().expect("mark read again");
    assert_eq!(store.notifications(), snapshot.as_slice());
}

#[tokio::test]
async fn mark_notifications_as_read__should_require_a_session() {
    // Given
    let (mut store, _) = new_store();

    // When
    let result = store.mark_notifications_as_read();

    // Then
    assert_eq!(result.unwrap_err(), StoreError::Unauthenticated);
}

#[tokio::test]
async fn signup__should_externalize_avatar_into_its_own_entry() {
    // Given
    let (mut store, _) = new_store();
    let mut details = student("Alice", "alice@example.com", "10A");
    details.avatar = Some("data:image/png;base64,iVBORw0KGgo=".to_string());

    // When
    let user = store.signup(details).await.expect("signup");

    // Then
    let avatar_key = format!("{AVATAR_PREFIX}{}", user.id);
    assert_eq!(
        store.kv().get(&avatar_key).as_deref(),
        Some("data:image/png;base64,iVBORw0KGgo=")
    );
    let stored_users = store.kv().get(USERS_KEY).expect("persisted users");
    assert!(stored_users.contains(&avatar_key));
    assert!(!stored_users.contains("data:image"));
    // the in-memory view keeps the full payload
    assert_eq!(
        store.users()[0].avatar.as_deref(),
        Some("data:image/png;base64,iVBORw0KGgo=")
    );
}

#[tokio::test]
async fn signup__should_drop_avatar_when_payload_exceeds_capacity() {
    // Given
    let clock = TestClock::new(datetime!(2025-08-15 10:00 UTC));
    let mut store = Store::open(MemoryStore::new(2048), clock, LATENCY);
    let mut details = student("Alice", "alice@example.com", "10A");
    details.avatar = Some(format!("data:image/png;base64,{}", "A".repeat(4096)));

    // When
    let user = store.signup(details).await.expect("signup");

    // Then
    let stored_users = store.kv().get(USERS_KEY).expect("persisted users");
    assert!(!stored_users.contains("data:image"));
    assert!(!stored_users.contains(AVATAR_PREFIX));
    assert!(store.kv().get(&format!("{AVATAR_PREFIX}{}", user.id)).is_none());
    // the session keeps the full payload for this process lifetime
    assert!(store
        .current_user()
        .and_then(|u| u.avatar.as_deref())
        .is_some_and(|avatar| avatar.len() > 4096));
}

#[tokio::test]
async fn add_notice__should_drop_oversized_file_with_its_name_and_type() {
    // Given
    let clock = TestClock::new(datetime!(2025-08-15 10:00 UTC));
    let mut store = Store::open(MemoryStore::new(2048), clock, LATENCY);
    store
        .signup(student("Alice", "alice@example.com", "10A"))
        .await
        .expect("signup");
    let mut draft = notice("Syllabus");
    draft.file_url = Some(format!("data:application/pdf;base64,{}", "A".repeat(4096)));
    draft.file_name = Some("syllabus.pdf".to_string());
    draft.file_type = Some("application/pdf".to_string());

    // When
    let posted = store.add_notice(draft).expect("add notice");

    // Then
    let stored = store.kv().get(NOTICES_KEY).expect("persisted notices");
    assert!(!stored.contains("data:application"));
    assert!(!stored.contains(NOTICE_FILE_PREFIX));
    assert!(!stored.contains("syllabus.pdf"));
    assert!(!stored.contains("application/pdf"));
    assert!(store
        .kv()
        .get(&format!("{NOTICE_FILE_PREFIX}{}", posted.id))
        .is_none());
    // the in-memory notice keeps all three for this process lifetime
    let notice = &store.notices()[0];
    assert!(notice.file_url.as_deref().is_some_and(|url| url.len() > 4096));
    assert_eq!(notice.file_name.as_deref(), Some("syllabus.pdf"));
    assert_eq!(notice.file_type.as_deref(), Some("application/pdf"));
}

#[tokio::test]
async fn delete_user__should_remove_the_externalized_avatar_entry() {
    // Given
    let (mut store, _) = new_store();
    let mut details = student("Alice", "alice@example.com", "10A");
    details.avatar = Some("data:image/png;base64,iVBORw0KGgo=".to_string());
    let user = store.signup(details).await.expect("signup");
    let avatar_key = format!("{AVATAR_PREFIX}{}", user.id);
    assert!(store.kv().get(&avatar_key).is_some());

    // When
    store.delete_user(&user.id).expect("delete");

    // Then
    assert!(store.kv().get(&avatar_key).is_none());
}

#[tokio::test]
async fn open__should_reseed_after_corrupt_state() {
    // Given
    let mut kv = MemoryStore::default();
    kv.set(USERS_KEY, "{definitely not json").expect("plant garbage");
    let clock = TestClock::new(datetime!(2025-08-15 10:00 UTC));

    // When
    let store = Store::open(kv, clock, LATENCY);

    // Then
    assert!(store.users().is_empty());
    assert_eq!(store.kv().get(USERS_KEY).as_deref(), Some("[]"));
    assert_eq!(store.kv().get(NOTICES_KEY).as_deref(), Some("[]"));
    assert!(store.current_user().is_none());
}

#[tokio::test]
async fn open__should_seed_absent_collections_immediately() {
    // Given
    let kv = MemoryStore::default();
    let clock = TestClock::new(datetime!(2025-08-15 10:00 UTC));

    // When
    let store = Store::open(kv, clock, LATENCY);

    // Then
    for key in [
        USERS_KEY,
        NOTICES_KEY,
        MESSAGES_KEY,
        HOMEWORK_KEY,
        NOTIFICATIONS_KEY,
    ] {
        assert_eq!(store.kv().get(key).as_deref(), Some("[]"));
    }
}

#[tokio::test]
async fn store__should_round_trip_through_a_restart() {
    // Given
    let root = create_temp_root("store-restart");
    let clock = TestClock::new(datetime!(2025-08-15 10:00 UTC));
    let (users_before, notices_before, session_before) = {
        let kv = DirStore::open(&root, crate::storage::DEFAULT_QUOTA_BYTES).expect("open kv");
        let mut store = Store::open(kv, clock.clone(), LATENCY);
        let mut details = student("Alice", "alice@example.com", "10A");
        details.avatar = Some("data:image/png;base64,iVBORw0KGgo=".to_string());
        store.signup(details).await.expect("signup");
        let mut draft = notice("Sports Day");
        draft.image_url = Some("data:image/jpeg;base64,/9j/4AAQ".to_string());
        store.add_notice(draft).expect("add notice");
        store.send_message(crate::types::MessageDraft {
            sender_id: "U1".to_string(),
            receiver_id: "U2".to_string(),
            content: "Hello".to_string(),
            image_url: None,
        });
        (
            store.users().to_vec(),
            store.notices().to_vec(),
            store.current_user().cloned(),
        )
    };

    // When
    let kv = DirStore::open(&root, crate::storage::DEFAULT_QUOTA_BYTES).expect("reopen kv");
    let store = Store::open(kv, clock, LATENCY);

    // Then
    assert_eq!(store.users(), users_before.as_slice());
    assert_eq!(store.notices(), notices_before.as_slice());
    assert_eq!(store.current_user().cloned(), session_before);
    assert_eq!(
        store.users()[0].avatar.as_deref(),
        Some("data:image/png;base64,iVBORw0KGgo=")
    );
    assert_eq!(
        store.notices()[0].image_url.as_deref(),
        Some("data:image/jpeg;base64,/9j/4AAQ")
    );
    assert_eq!(store.messages().len(), 1);

    std::fs::remove_dir_all(&root).expect("cleanup");
}
