use crate::ports::Clock;
use crate::storage::KeyValue;
use crate::types::{
    RoleProfile, SignupDetails, SignupRole, StaffProfile, StaffRole, StudentProfile, TeacherSetup,
    User,
};

use super::{
    AVATAR_PREFIX, MAX_PROFILE_UPDATES_PER_MONTH, Store, StoreError, USERS_KEY, entity_id,
    month_of,
};
use crate::attachments;

impl<S: KeyValue, C: Clock> Store<S, C> {
    /// Case-insensitive email match plus exact password match against the
    /// freshest persisted user list, so a signup committed by another client
    /// is visible here. A miss is an expected outcome, not a fault.
    pub async fn login(&mut self, email: &str, password: &str) -> Option<User> {
        self.clock.sleep(self.latency).await;
        self.reload_users();

        let found = self
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email) && user.password == password)
            .cloned()?;

        self.session = Some(found.clone());
        self.persist_session();
        Some(found)
    }

    pub async fn signup(&mut self, details: SignupDetails) -> Result<User, StoreError> {
        self.clock.sleep(self.latency).await;

        if self
            .users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(&details.email))
        {
            return Err(StoreError::EmailTaken);
        }
        if let SignupRole::Staff { staff_role } = &details.role {
            if staff_role.is_singleton()
                && self
                    .users
                    .iter()
                    .any(|user| user.staff_role() == Some(*staff_role))
            {
                return Err(StoreError::RoleTaken(*staff_role));
            }
        }

        let now = self.clock.now();
        let profile = match details.role {
            SignupRole::Student {
                class,
                favourite_subject,
                bio,
            } => RoleProfile::Student(StudentProfile {
                class,
                roll_no: self.next_roll_no(now),
                favourite_subject,
                bio,
            }),
            SignupRole::Staff { staff_role } => RoleProfile::Staff(StaffProfile {
                staff_role,
                // only teachers go through the setup wizard
                is_setup_complete: staff_role != StaffRole::Teacher,
                is_class_teacher: false,
                class_teacher_of: None,
                subjects: Vec::new(),
                classes_taught: Vec::new(),
            }),
        };

        let user = User {
            id: entity_id("U", now),
            name: details.name,
            email: details.email,
            password: details.password,
            avatar: details.avatar,
            profile_update_count: 0,
            last_update_month: Some(month_of(now)),
            profile,
        };

        let auto_login = matches!(user.profile, RoleProfile::Student(_));
        self.users.push(user.clone());
        self.persist_users();
        if auto_login {
            self.session = Some(user.clone());
            self.persist_session();
        }
        Ok(user)
    }

    /// Clears the session from memory and persistence. No other side
    /// effects.
    pub fn logout(&mut self) {
        self.session = None;
        self.persist_session();
    }

    /// Replaces the user record, guarding the monthly update quota and
    /// re-validating email uniqueness and singleton roles. Quota bookkeeping
    /// fields are owned by the store; whatever the caller passed for them is
    /// overwritten.
    pub fn update_user(&mut self, mut updated: User) -> Result<User, StoreError> {
        let index = self
            .users
            .iter()
            .position(|user| user.id == updated.id)
            .ok_or(StoreError::UnknownUser)?;

        if self.users.iter().any(|user| {
            user.id != updated.id && user.email.eq_ignore_ascii_case(&updated.email)
        }) {
            return Err(StoreError::EmailTaken);
        }
        if let Some(role) = updated.staff_role() {
            if role.is_singleton()
                && self
                    .users
                    .iter()
                    .any(|user| user.id != updated.id && user.staff_role() == Some(role))
            {
                return Err(StoreError::RoleTaken(role));
            }
        }

        let month = month_of(self.clock.now());
        let existing = &self.users[index];
        let spent = if existing.last_update_month == Some(month) {
            existing.profile_update_count
        } else {
            0
        };
        if spent >= MAX_PROFILE_UPDATES_PER_MONTH {
            return Err(StoreError::UpdateQuotaExceeded);
        }
        updated.profile_update_count = spent + 1;
        updated.last_update_month = Some(month);

        self.users[index] = updated.clone();
        if self
            .session
            .as_ref()
            .is_some_and(|user| user.id == updated.id)
        {
            self.session = Some(updated.clone());
            self.persist_session();
        }
        self.persist_users();
        Ok(updated)
    }

    /// How many profile updates the user has left in the current calendar
    /// month.
    pub fn remaining_updates(&self, user_id: &str) -> Result<u32, StoreError> {
        let user = self
            .users
            .iter()
            .find(|user| user.id == user_id)
            .ok_or(StoreError::UnknownUser)?;
        let month = month_of(self.clock.now());
        let spent = if user.last_update_month == Some(month) {
            user.profile_update_count
        } else {
            0
        };
        Ok(MAX_PROFILE_UPDATES_PER_MONTH.saturating_sub(spent))
    }

    /// One-shot teacher onboarding. Does not count against the profile
    /// update quota.
    pub fn complete_teacher_setup(
        &mut self,
        user_id: &str,
        setup: TeacherSetup,
    ) -> Result<User, StoreError> {
        let index = self
            .users
            .iter()
            .position(|user| user.id == user_id)
            .ok_or(StoreError::UnknownUser)?;

        let RoleProfile::Staff(staff) = &mut self.users[index].profile else {
            return Err(StoreError::NotATeacher);
        };
        if staff.staff_role != StaffRole::Teacher {
            return Err(StoreError::NotATeacher);
        }
        if staff.is_setup_complete {
            return Err(StoreError::SetupAlreadyComplete);
        }

        staff.is_class_teacher = setup.is_class_teacher;
        staff.class_teacher_of = if setup.is_class_teacher {
            setup.class_teacher_of
        } else {
            None
        };
        staff.subjects = setup.subjects;
        staff.classes_taught = setup.classes_taught;
        staff.is_setup_complete = true;

        let user = self.users[index].clone();
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.id == user.id)
        {
            self.session = Some(user.clone());
            self.persist_session();
        }
        self.persist_users();
        Ok(user)
    }

    /// Removes the user, cascading to their chat messages and (for staff)
    /// authored homework, and drops the externalized avatar entry. Logs out
    /// if the session user was deleted.
    pub fn delete_user(&mut self, user_id: &str) -> Result<(), StoreError> {
        let index = self
            .users
            .iter()
            .position(|user| user.id == user_id)
            .ok_or(StoreError::UnknownUser)?;
        let removed = self.users.remove(index);
        self.kv.remove(&format!("{AVATAR_PREFIX}{user_id}"));

        self.messages
            .retain(|message| message.sender_id != user_id && message.receiver_id != user_id);
        self.persist_messages();

        if removed.is_staff() {
            self.homework.retain(|homework| homework.teacher_id != user_id);
            self.persist_homework();
        }

        self.persist_users();
        if self
            .session
            .as_ref()
            .is_some_and(|user| user.id == user_id)
        {
            self.logout();
        }
        Ok(())
    }

    /// Account recovery path: deletes the account matching the email, with
    /// the same cascade as [`Store::delete_user`]. Returns whether an
    /// account matched.
    pub async fn delete_account_by_email(&mut self, email: &str) -> bool {
        self.clock.sleep(self.latency).await;
        let found = self
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .map(|user| user.id.clone());
        match found {
            Some(id) => self.delete_user(&id).is_ok(),
            None => false,
        }
    }

    fn reload_users(&mut self) {
        let Some(raw) = self.kv.get(USERS_KEY) else {
            return;
        };
        match serde_json::from_str::<Vec<User>>(&raw) {
            Ok(users) => {
                self.users = users
                    .into_iter()
                    .map(|mut user| {
                        user.avatar =
                            attachments::hydrate(user.avatar.take(), AVATAR_PREFIX, &self.kv);
                        user
                    })
                    .collect();
            }
            Err(err) => eprintln!("ignoring unreadable persisted user list: {err}"),
        }
    }

    /// Roll numbers are `MVPS` plus six digits derived from the signup
    /// instant, bumped until unused.
    fn next_roll_no(&self, now: time::OffsetDateTime) -> String {
        let mut serial = (super::unix_millis(now).rem_euclid(1_000_000)) as u64;
        loop {
            let candidate = format!("MVPS{serial:06}");
            let taken = self.users.iter().any(|user| match &user.profile {
                RoleProfile::Student(student) => student.roll_no == candidate,
                RoleProfile::Staff(_) => false,
            });
            if !taken {
                return candidate;
            }
            serial = (serial + 1) % 1_000_000;
        }
    }
}
