//! In-memory reference implementation of the collaborator traits.
//!
//! Backs the demo server and the integration tests. No persistence, no
//! real email: OTP codes are logged at debug level as the stand-in for
//! delivery. Production deployments implement the traits against their
//! own directory instead.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;

use chatwire_protocol::UserId;

use crate::{
    AuthService, Availability, FriendService, NewUser, ProfileService,
    ProfileUpdate, ServiceError, UserProfile,
};

const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;
const AVATAR_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];
const MIN_PASSWORD_LEN: usize = 6;

/// One stored account.
#[derive(Debug, Clone)]
struct Account {
    profile: UserProfile,
    password: String,
    verified: bool,
}

/// Directed relationship between two users.
///
/// `Pending` and `Blocked` are stored under `(from, to)`; `Accepted` is
/// stored under both directions so listing either side is a plain scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Pending,
    Accepted,
    Blocked,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    users: HashMap<UserId, Account>,
    by_username: HashMap<String, UserId>,
    by_email: HashMap<String, UserId>,
    otps: HashMap<UserId, String>,
    links: HashMap<(UserId, UserId), Link>,
}

impl Inner {
    fn account(&self, user_id: UserId) -> Result<&Account, ServiceError> {
        self.users.get(&user_id).ok_or(ServiceError::UserNotFound)
    }

    fn account_mut(
        &mut self,
        user_id: UserId,
    ) -> Result<&mut Account, ServiceError> {
        self.users
            .get_mut(&user_id)
            .ok_or(ServiceError::UserNotFound)
    }

    fn issue_otp(&mut self, user_id: UserId) -> String {
        let code = format!("{:06}", rand::rng().random_range(0..1_000_000));
        self.otps.insert(user_id, code.clone());
        // Stand-in for email delivery.
        tracing::debug!(%user_id, %code, "OTP issued");
        code
    }

    fn link_between(&self, a: UserId, b: UserId) -> Option<Link> {
        self.links
            .get(&(a, b))
            .or_else(|| self.links.get(&(b, a)))
            .copied()
    }
}

/// All three collaborator traits over in-process maps.
///
/// A single mutex guards the whole directory; operations are short and
/// never await while holding it. Clones share the same store, so one
/// directory can serve as the auth, profile, and friend collaborator of
/// the same server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The OTP code currently pending for `username`, if any. Stands in
    /// for reading the email that would carry it; used by the demo and
    /// the test suites.
    pub async fn pending_otp(&self, username: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        let user_id = inner.by_username.get(username)?;
        inner.otps.get(user_id).cloned()
    }

    /// Creates a pre-verified account, skipping the OTP flow. For demo
    /// seeding and tests.
    pub async fn seed_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> UserId {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let user_id = UserId(inner.next_id);
        let profile = UserProfile {
            user_id,
            username: username.to_owned(),
            email: email.to_owned(),
            full_name: full_name.map(str::to_owned),
            avatar_url: None,
            status_message: None,
            availability: Availability::Offline,
        };
        inner.by_username.insert(username.to_owned(), user_id);
        inner.by_email.insert(email.to_owned(), user_id);
        inner.users.insert(
            user_id,
            Account {
                profile,
                password: password.to_owned(),
                verified: true,
            },
        );
        user_id
    }
}

impl AuthService for InMemoryDirectory {
    async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserProfile, ServiceError> {
        let inner = self.inner.lock().await;
        let user_id = *inner
            .by_username
            .get(username)
            .ok_or(ServiceError::InvalidCredentials)?;
        let account = inner.account(user_id)?;
        if account.password != password {
            return Err(ServiceError::InvalidCredentials);
        }
        if !account.verified {
            return Err(ServiceError::NotVerified);
        }
        Ok(account.profile.clone())
    }

    async fn register(
        &self,
        new_user: NewUser,
    ) -> Result<UserProfile, ServiceError> {
        if new_user.password.len() < MIN_PASSWORD_LEN {
            return Err(ServiceError::PasswordTooShort);
        }
        let mut inner = self.inner.lock().await;
        if inner.by_username.contains_key(&new_user.username) {
            return Err(ServiceError::UsernameTaken);
        }
        if inner.by_email.contains_key(&new_user.email) {
            return Err(ServiceError::EmailTaken);
        }

        inner.next_id += 1;
        let user_id = UserId(inner.next_id);
        let profile = UserProfile {
            user_id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            full_name: new_user.full_name,
            avatar_url: None,
            status_message: None,
            availability: Availability::Offline,
        };
        inner.by_username.insert(new_user.username, user_id);
        inner.by_email.insert(new_user.email, user_id);
        inner.users.insert(
            user_id,
            Account {
                profile: profile.clone(),
                password: new_user.password,
                verified: false,
            },
        );
        inner.issue_otp(user_id);
        tracing::info!(%user_id, username = %profile.username, "account registered");
        Ok(profile)
    }

    async fn logout(&self, user_id: UserId) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        let account = inner.account_mut(user_id)?;
        account.profile.availability = Availability::Offline;
        Ok(())
    }

    async fn verify_otp(
        &self,
        username: &str,
        code: &str,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        let user_id = *inner
            .by_username
            .get(username)
            .ok_or(ServiceError::UserNotFound)?;
        let matches = inner
            .otps
            .get(&user_id)
            .is_some_and(|expected| expected == code);
        if !matches {
            return Err(ServiceError::OtpInvalid);
        }
        inner.otps.remove(&user_id);
        inner.account_mut(user_id)?.verified = true;
        Ok(())
    }

    async fn resend_otp(&self, username: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        let user_id = *inner
            .by_username
            .get(username)
            .ok_or(ServiceError::UserNotFound)?;
        inner.issue_otp(user_id);
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        let user_id = *inner
            .by_email
            .get(email)
            .ok_or(ServiceError::EmailNotRegistered)?;
        inner.issue_otp(user_id);
        Ok(())
    }

    async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(ServiceError::PasswordTooShort);
        }
        let mut inner = self.inner.lock().await;
        let user_id = *inner
            .by_email
            .get(email)
            .ok_or(ServiceError::EmailNotRegistered)?;
        let matches = inner
            .otps
            .get(&user_id)
            .is_some_and(|expected| expected == otp);
        if !matches {
            return Err(ServiceError::OtpInvalid);
        }
        inner.otps.remove(&user_id);
        inner.account_mut(user_id)?.password = new_password.to_owned();
        Ok(())
    }
}

impl ProfileService for InMemoryDirectory {
    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, ServiceError> {
        let mut inner = self.inner.lock().await;

        if let Some(email) = &update.email {
            // Moving to an email someone else already owns is a conflict.
            if inner
                .by_email
                .get(email)
                .is_some_and(|owner| *owner != user_id)
            {
                return Err(ServiceError::EmailTaken);
            }
            let old_email = inner.account(user_id)?.profile.email.clone();
            inner.by_email.remove(&old_email);
            inner.by_email.insert(email.clone(), user_id);
        }

        let account = inner.account_mut(user_id)?;
        let profile = &mut account.profile;
        if let Some(full_name) = update.full_name {
            profile.full_name = Some(full_name);
        }
        if let Some(email) = update.email {
            profile.email = email;
        }
        if let Some(status_message) = update.status_message {
            profile.status_message = Some(status_message);
        }
        if let Some(availability) = update.availability {
            profile.availability = availability;
        }
        if let Some(avatar_url) = update.avatar_url {
            profile.avatar_url = Some(avatar_url);
        }
        Ok(profile.clone())
    }

    async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(ServiceError::PasswordTooShort);
        }
        let mut inner = self.inner.lock().await;
        let account = inner.account_mut(user_id)?;
        if account.password != old_password {
            return Err(ServiceError::WrongPassword);
        }
        account.password = new_password.to_owned();
        Ok(())
    }

    async fn store_avatar(
        &self,
        user_id: UserId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        if bytes.len() > MAX_AVATAR_BYTES {
            return Err(ServiceError::AvatarTooLarge);
        }
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .ok_or(ServiceError::InvalidAvatarFormat)?;
        if !AVATAR_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ServiceError::InvalidAvatarFormat);
        }

        let mut inner = self.inner.lock().await;
        let account = inner.account_mut(user_id)?;
        let url = format!("/avatars/{}.{extension}", user_id.0);
        account.profile.avatar_url = Some(url.clone());
        Ok(url)
    }

    async fn user_info(
        &self,
        user_id: UserId,
    ) -> Result<UserProfile, ServiceError> {
        let inner = self.inner.lock().await;
        Ok(inner.account(user_id)?.profile.clone())
    }

    async fn set_availability(
        &self,
        user_id: UserId,
        availability: Availability,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        inner.account_mut(user_id)?.profile.availability = availability;
        Ok(())
    }
}

impl FriendService for InMemoryDirectory {
    async fn send_request(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> Result<(), ServiceError> {
        if user_id == friend_id {
            return Err(ServiceError::SelfFriendRequest);
        }
        let mut inner = self.inner.lock().await;
        inner.account(user_id)?;
        inner.account(friend_id)?;

        match inner.link_between(user_id, friend_id) {
            Some(Link::Accepted) => Err(ServiceError::AlreadyFriends),
            Some(Link::Pending) => Err(ServiceError::RequestAlreadySent),
            Some(Link::Blocked) => Err(ServiceError::Blocked),
            None => {
                inner.links.insert((user_id, friend_id), Link::Pending);
                tracing::info!(from = %user_id, to = %friend_id, "friend request sent");
                Ok(())
            }
        }
    }

    async fn accept(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        // Only the recipient of a pending request can accept it.
        if inner.links.get(&(friend_id, user_id)) != Some(&Link::Pending) {
            return Err(ServiceError::NoPendingRequest);
        }
        inner.links.remove(&(friend_id, user_id));
        inner.links.insert((user_id, friend_id), Link::Accepted);
        inner.links.insert((friend_id, user_id), Link::Accepted);
        Ok(())
    }

    async fn reject(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        if inner.links.get(&(friend_id, user_id)) != Some(&Link::Pending) {
            return Err(ServiceError::NoPendingRequest);
        }
        inner.links.remove(&(friend_id, user_id));
        Ok(())
    }

    async fn unfriend(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        if inner.links.get(&(user_id, friend_id)) != Some(&Link::Accepted) {
            return Err(ServiceError::NotFriends);
        }
        inner.links.remove(&(user_id, friend_id));
        inner.links.remove(&(friend_id, user_id));
        Ok(())
    }

    async fn block(
        &self,
        user_id: UserId,
        blocked_id: UserId,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().await;
        inner.account(user_id)?;
        inner.account(blocked_id)?;
        // Blocking severs whatever stood between the two users.
        inner.links.remove(&(user_id, blocked_id));
        inner.links.remove(&(blocked_id, user_id));
        inner.links.insert((user_id, blocked_id), Link::Blocked);
        Ok(())
    }

    async fn friends(
        &self,
        user_id: UserId,
    ) -> Result<Vec<UserProfile>, ServiceError> {
        let inner = self.inner.lock().await;
        inner.account(user_id)?;
        let mut out: Vec<UserProfile> = inner
            .links
            .iter()
            .filter(|((from, _), link)| {
                *from == user_id && **link == Link::Accepted
            })
            .filter_map(|((_, to), _)| {
                inner.users.get(to).map(|a| a.profile.clone())
            })
            .collect();
        out.sort_by_key(|p| p.user_id.0);
        Ok(out)
    }

    async fn pending(
        &self,
        user_id: UserId,
    ) -> Result<Vec<UserProfile>, ServiceError> {
        let inner = self.inner.lock().await;
        inner.account(user_id)?;
        let mut out: Vec<UserProfile> = inner
            .links
            .iter()
            .filter(|((_, to), link)| {
                *to == user_id && **link == Link::Pending
            })
            .filter_map(|((from, _), _)| {
                inner.users.get(from).map(|a| a.profile.clone())
            })
            .collect();
        out.sort_by_key(|p| p.user_id.0);
        Ok(out)
    }

    async fn search(
        &self,
        user_id: UserId,
        keyword: &str,
    ) -> Result<Vec<UserProfile>, ServiceError> {
        let inner = self.inner.lock().await;
        inner.account(user_id)?;
        let needle = keyword.to_lowercase();
        let mut out: Vec<UserProfile> = inner
            .users
            .values()
            .filter(|account| account.profile.user_id != user_id)
            .filter(|account| {
                let p = &account.profile;
                p.username.to_lowercase().contains(&needle)
                    || p.full_name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .map(|account| account.profile.clone())
            .collect();
        out.sort_by_key(|p| p.user_id.0);
        Ok(out)
    }
}

// =========================================================================
// Tests
// =========================================================================
