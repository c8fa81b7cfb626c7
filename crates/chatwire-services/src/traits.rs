//! The collaborator traits the dispatch router calls into.
//!
//! Chatwire doesn't implement these itself; it defines the seam and calls
//! whatever implementation the server was built with. The contract every
//! implementation must keep: each operation either completes or returns a
//! [`ServiceError`] whose message is fit to show a user. Panicking or
//! blocking forever inside an operation stalls the one connection whose
//! request is being handled, nothing else, but is still a bug.
//!
//! All traits are `Send + Sync + 'static` because one instance is shared
//! by every connection task for the lifetime of the server, and the
//! returned futures are `Send` because those tasks hop threads. The
//! methods are spelled in desugared form to carry that bound; impls can
//! still use plain `async fn`.

use std::future::Future;

use chatwire_protocol::UserId;

use crate::{
    Availability, NewUser, ProfileUpdate, ServiceError, UserProfile,
};

/// Account authentication and credential lifecycle.
pub trait AuthService: Send + Sync + 'static {
    /// Validates credentials and returns the account's profile.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<UserProfile, ServiceError>> + Send;

    /// Creates a new, unverified account and issues its first OTP code.
    fn register(
        &self,
        new_user: NewUser,
    ) -> impl Future<Output = Result<UserProfile, ServiceError>> + Send;

    /// Tears down server-side login state, if the implementation keeps
    /// any. Connection-level cleanup is not its job.
    fn logout(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Confirms the OTP code issued at registration, marking the account
    /// verified.
    fn verify_otp(
        &self,
        username: &str,
        code: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Issues a fresh OTP code for an unverified account.
    fn resend_otp(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Starts a password reset: issues an OTP to the account that owns
    /// `email`.
    fn forgot_password(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Completes a password reset with the OTP from
    /// [`forgot_password`](Self::forgot_password).
    fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

/// Profile reads and edits.
pub trait ProfileService: Send + Sync + 'static {
    /// Applies a partial profile edit and returns the updated profile.
    fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> impl Future<Output = Result<UserProfile, ServiceError>> + Send;

    /// Changes the password after checking the old one.
    fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Stores avatar bytes and returns the URL they are served from.
    fn store_avatar(
        &self,
        user_id: UserId,
        file_name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;

    /// Fetches a profile by id.
    fn user_info(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<UserProfile, ServiceError>> + Send;

    /// Sets the user's availability.
    fn set_availability(
        &self,
        user_id: UserId,
        availability: Availability,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;
}

/// The friend graph: requests, acceptance, blocking, listing, search.
pub trait FriendService: Send + Sync + 'static {
    /// Sends a friend request from `user_id` to `friend_id`.
    ///
    /// Repeats are rejected loudly: a second identical request fails with
    /// [`ServiceError::RequestAlreadySent`] (or
    /// [`ServiceError::AlreadyFriends`] once accepted), never a silent
    /// duplicate.
    fn send_request(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Accepts a pending request that `friend_id` sent to `user_id`.
    fn accept(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Rejects a pending request that `friend_id` sent to `user_id`.
    fn reject(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Removes an existing friendship.
    fn unfriend(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Blocks another user, severing any friendship or pending request.
    fn block(
        &self,
        user_id: UserId,
        blocked_id: UserId,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Lists confirmed friends.
    fn friends(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<UserProfile>, ServiceError>> + Send;

    /// Lists users with a request pending toward `user_id`.
    fn pending(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<UserProfile>, ServiceError>> + Send;

    /// Searches users by username or full name, excluding the searcher.
    fn search(
        &self,
        user_id: UserId,
        keyword: &str,
    ) -> impl Future<Output = Result<Vec<UserProfile>, ServiceError>> + Send;
}
