//! The dispatch router: one message type, one collaborator operation.
//!
//! [`dispatch`] is a pure mapping from a request envelope to its response
//! envelope. Every handler follows the same contract:
//!
//! - missing or malformed required fields → the paired response kind with
//!   `success:false` and a human-readable error, never a panic;
//! - exactly one collaborator call, whose failure is caught and copied
//!   into the error string (no stack traces cross the wire);
//! - a kind that isn't a known request → a generic ERROR envelope, and
//!   the connection loop keeps going.
//!
//! Field names and types are validated here, at the boundary, so the
//! collaborators never see a raw payload.

use serde_json::Value;

use chatwire_protocol::{Envelope, MessageType, UserId, WireCodec};
use chatwire_services::{
    AuthService, Availability, FriendService, NewUser, ProfileService,
    ProfileUpdate, ServiceError, UserProfile,
};

use crate::server::ServerState;

/// Routes one decoded request to its handler and returns the response.
pub(crate) async fn dispatch<A, P, F, C>(
    state: &ServerState<A, P, F, C>,
    request: &Envelope,
) -> Envelope
where
    A: AuthService,
    P: ProfileService,
    F: FriendService,
    C: WireCodec,
{
    use MessageType::*;
    match request.kind() {
        // Authentication
        LoginRequest => login(&state.auth, request).await,
        RegisterRequest => register(&state.auth, request).await,
        LogoutRequest => logout(&state.auth, request).await,
        VerifyOtpRequest => verify_otp(&state.auth, request).await,
        ResendOtpRequest => resend_otp(&state.auth, request).await,
        ForgotPasswordRequest => forgot_password(&state.auth, request).await,
        ResetPasswordRequest => reset_password(&state.auth, request).await,

        // Profile
        UpdateProfileRequest => update_profile(&state.profiles, request).await,
        ChangePasswordRequest => change_password(&state.profiles, request).await,
        UploadAvatarRequest => upload_avatar(&state.profiles, request).await,
        GetUserInfoRequest => get_user_info(&state.profiles, request).await,
        StatusUpdate => status_update(&state.profiles, request).await,

        // Friend graph
        AddFriendRequest => add_friend(&state.friends, request).await,
        AcceptFriendRequest => accept_friend(&state.friends, request).await,
        RejectFriendRequest => reject_friend(&state.friends, request).await,
        UnfriendRequest => unfriend(&state.friends, request).await,
        BlockFriendRequest => block_friend(&state.friends, request).await,
        GetFriendsRequest => get_friends(&state.friends, request).await,
        GetPendingRequestsRequest => {
            get_pending_requests(&state.friends, request).await
        }
        SearchUsersRequest => search_users(&state.friends, request).await,

        // Response kinds and ERROR are not requests; decoding accepted
        // them (they're in the closed set) but nothing routes them.
        other => Envelope::builder(MessageType::Error)
            .error(format!("Unsupported message type: {other}"))
            .build(),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Required fields absent or of the wrong type.
fn invalid(kind: MessageType) -> Envelope {
    Envelope::builder(kind)
        .error("Missing required fields")
        .build()
}

/// A collaborator failure, with its message copied verbatim.
fn failure(kind: MessageType, err: &ServiceError) -> Envelope {
    Envelope::builder(kind).error(err.to_string()).build()
}

/// A bare success with a human-readable confirmation.
fn confirmation(kind: MessageType, text: &str) -> Envelope {
    Envelope::builder(kind).put("message", text).build()
}

/// A profile as a payload value (`{"userId": .., "username": .., ...}`).
fn profile_value(profile: &UserProfile) -> Value {
    serde_json::to_value(profile).unwrap_or_default()
}

fn parse_availability(s: &str) -> Option<Availability> {
    serde_json::from_value(Value::String(s.to_owned())).ok()
}

// ---------------------------------------------------------------------------
// Authentication handlers
// ---------------------------------------------------------------------------

async fn login<A: AuthService>(auth: &A, request: &Envelope) -> Envelope {
    let kind = request.kind().response();
    let (Some(username), Some(password)) =
        (request.get_str("username"), request.get_str("password"))
    else {
        return invalid(kind);
    };

    match auth.login(username, password).await {
        Ok(profile) => {
            let mut builder = Envelope::builder(kind)
                .put("userId", profile.user_id.0)
                .put("username", profile.username.clone())
                .put("email", profile.email.clone());
            if let Some(full_name) = &profile.full_name {
                builder = builder.put("fullName", full_name.clone());
            }
            if let Some(avatar_url) = &profile.avatar_url {
                builder = builder.put("avatarUrl", avatar_url.clone());
            }
            if let Some(status_message) = &profile.status_message {
                builder = builder.put("statusMessage", status_message.clone());
            }
            builder.build()
        }
        Err(e) => failure(kind, &e),
    }
}

async fn register<A: AuthService>(auth: &A, request: &Envelope) -> Envelope {
    let kind = request.kind().response();
    let (Some(username), Some(email), Some(password)) = (
        request.get_str("username"),
        request.get_str("email"),
        request.get_str("password"),
    ) else {
        return invalid(kind);
    };

    let new_user = NewUser {
        username: username.to_owned(),
        email: email.to_owned(),
        password: password.to_owned(),
        full_name: request.get_str("fullName").map(str::to_owned),
    };

    match auth.register(new_user).await {
        Ok(_) => confirmation(
            kind,
            "Registration successful! Verify the OTP code sent to your email.",
        ),
        Err(e) => failure(kind, &e),
    }
}

async fn logout<A: AuthService>(auth: &A, request: &Envelope) -> Envelope {
    let kind = request.kind().response();
    let Some(user_id) = request.get_user_id("userId") else {
        return Envelope::builder(kind).error("Invalid user ID").build();
    };

    match auth.logout(user_id).await {
        Ok(()) => Envelope::new(kind),
        Err(e) => failure(kind, &e),
    }
}

async fn verify_otp<A: AuthService>(auth: &A, request: &Envelope) -> Envelope {
    let kind = request.kind().response();
    let (Some(username), Some(code)) =
        (request.get_str("username"), request.get_str("otpCode"))
    else {
        return invalid(kind);
    };

    match auth.verify_otp(username, code).await {
        Ok(()) => confirmation(kind, "Verification successful!"),
        Err(e) => failure(kind, &e),
    }
}

async fn resend_otp<A: AuthService>(auth: &A, request: &Envelope) -> Envelope {
    let kind = request.kind().response();
    let Some(username) = request.get_str("username") else {
        return invalid(kind);
    };

    match auth.resend_otp(username).await {
        Ok(()) => confirmation(kind, "A new OTP code has been sent!"),
        Err(e) => failure(kind, &e),
    }
}

async fn forgot_password<A: AuthService>(
    auth: &A,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let Some(email) = request.get_str("email") else {
        return invalid(kind);
    };

    match auth.forgot_password(email).await {
        Ok(()) => {
            confirmation(kind, "An OTP code has been sent to your email")
        }
        Err(e) => failure(kind, &e),
    }
}

async fn reset_password<A: AuthService>(
    auth: &A,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let (Some(email), Some(code), Some(new_password)) = (
        request.get_str("email"),
        request.get_str("otpCode"),
        request.get_str("newPassword"),
    ) else {
        return invalid(kind);
    };

    match auth.reset_password(email, code, new_password).await {
        Ok(()) => confirmation(kind, "Password reset successful!"),
        Err(e) => failure(kind, &e),
    }
}

// ---------------------------------------------------------------------------
// Profile handlers
// ---------------------------------------------------------------------------

async fn update_profile<P: ProfileService>(
    profiles: &P,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let Some(user_id) = request.get_user_id("userId") else {
        return invalid(kind);
    };

    let availability = match request.get_str("availability") {
        Some(s) => match parse_availability(s) {
            Some(a) => Some(a),
            None => {
                return Envelope::builder(kind)
                    .error("Invalid availability value")
                    .build();
            }
        },
        None => None,
    };

    let update = ProfileUpdate {
        full_name: request.get_str("fullName").map(str::to_owned),
        email: request.get_str("email").map(str::to_owned),
        status_message: request.get_str("statusMessage").map(str::to_owned),
        availability,
        avatar_url: request.get_str("avatarUrl").map(str::to_owned),
    };

    match profiles.update_profile(user_id, update).await {
        Ok(profile) => Envelope::builder(kind)
            .put("message", "Profile updated successfully")
            .put("user", profile_value(&profile))
            .build(),
        Err(e) => failure(kind, &e),
    }
}

async fn change_password<P: ProfileService>(
    profiles: &P,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let (Some(user_id), Some(old_password), Some(new_password)) = (
        request.get_user_id("userId"),
        request.get_str("oldPassword"),
        request.get_str("newPassword"),
    ) else {
        return invalid(kind);
    };

    match profiles
        .change_password(user_id, old_password, new_password)
        .await
    {
        Ok(()) => confirmation(kind, "Password changed successfully"),
        Err(e) => failure(kind, &e),
    }
}

async fn upload_avatar<P: ProfileService>(
    profiles: &P,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let (Some(user_id), Some(file_name)) = (
        request.get_user_id("userId"),
        request.get_str("fileName"),
    ) else {
        return invalid(kind);
    };
    if request.get("fileData").is_none() {
        return invalid(kind);
    }
    // Present but not a decodable base64 string.
    let Some(bytes) = request.get_bytes("fileData") else {
        return Envelope::builder(kind)
            .error("Invalid file data format")
            .build();
    };

    match profiles.store_avatar(user_id, file_name, &bytes).await {
        Ok(avatar_url) => Envelope::builder(kind)
            .put("message", "Avatar uploaded successfully")
            .put("avatarUrl", avatar_url)
            .build(),
        Err(e) => failure(kind, &e),
    }
}

async fn get_user_info<P: ProfileService>(
    profiles: &P,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let Some(user_id) = request.get_user_id("userId") else {
        return invalid(kind);
    };

    match profiles.user_info(user_id).await {
        Ok(profile) => Envelope::builder(kind)
            .put("user", profile_value(&profile))
            .build(),
        Err(e) => failure(kind, &e),
    }
}

async fn status_update<P: ProfileService>(
    profiles: &P,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let (Some(user_id), Some(status)) = (
        request.get_user_id("userId"),
        request.get_str("status"),
    ) else {
        return invalid(kind);
    };
    let Some(availability) = parse_availability(status) else {
        return Envelope::builder(kind)
            .error("Invalid availability value")
            .build();
    };

    match profiles.set_availability(user_id, availability).await {
        Ok(()) => confirmation(kind, "Status updated successfully"),
        Err(e) => failure(kind, &e),
    }
}

// ---------------------------------------------------------------------------
// Friend graph handlers
// ---------------------------------------------------------------------------

/// Pulls the `(userId, friendId)` pair most friend operations need.
fn user_pair(request: &Envelope) -> Option<(UserId, UserId)> {
    Some((
        request.get_user_id("userId")?,
        request.get_user_id("friendId")?,
    ))
}

async fn add_friend<F: FriendService>(
    friends: &F,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let Some((user_id, friend_id)) = user_pair(request) else {
        return invalid(kind);
    };

    match friends.send_request(user_id, friend_id).await {
        Ok(()) => confirmation(kind, "Friend request sent successfully"),
        Err(e) => failure(kind, &e),
    }
}

async fn accept_friend<F: FriendService>(
    friends: &F,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let Some((user_id, friend_id)) = user_pair(request) else {
        return invalid(kind);
    };

    match friends.accept(user_id, friend_id).await {
        Ok(()) => confirmation(kind, "Friend request accepted"),
        Err(e) => failure(kind, &e),
    }
}

async fn reject_friend<F: FriendService>(
    friends: &F,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let Some((user_id, friend_id)) = user_pair(request) else {
        return invalid(kind);
    };

    match friends.reject(user_id, friend_id).await {
        Ok(()) => confirmation(kind, "Friend request rejected"),
        Err(e) => failure(kind, &e),
    }
}

async fn unfriend<F: FriendService>(
    friends: &F,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let Some((user_id, friend_id)) = user_pair(request) else {
        return invalid(kind);
    };

    match friends.unfriend(user_id, friend_id).await {
        Ok(()) => confirmation(kind, "Friend removed successfully"),
        Err(e) => failure(kind, &e),
    }
}

async fn block_friend<F: FriendService>(
    friends: &F,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let (Some(user_id), Some(blocked_id)) = (
        request.get_user_id("userId"),
        request.get_user_id("blockedUserId"),
    ) else {
        return invalid(kind);
    };

    match friends.block(user_id, blocked_id).await {
        Ok(()) => confirmation(kind, "User blocked successfully"),
        Err(e) => failure(kind, &e),
    }
}

async fn get_friends<F: FriendService>(
    friends: &F,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let Some(user_id) = request.get_user_id("userId") else {
        return invalid(kind);
    };

    match friends.friends(user_id).await {
        Ok(list) => Envelope::builder(kind)
            .put("count", list.len())
            .put("friends", serde_json::to_value(&list).unwrap_or_default())
            .build(),
        Err(e) => failure(kind, &e),
    }
}

async fn get_pending_requests<F: FriendService>(
    friends: &F,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let Some(user_id) = request.get_user_id("userId") else {
        return invalid(kind);
    };

    match friends.pending(user_id).await {
        Ok(list) => Envelope::builder(kind)
            .put("count", list.len())
            .put("requests", serde_json::to_value(&list).unwrap_or_default())
            .build(),
        Err(e) => failure(kind, &e),
    }
}

async fn search_users<F: FriendService>(
    friends: &F,
    request: &Envelope,
) -> Envelope {
    let kind = request.kind().response();
    let (Some(user_id), Some(keyword)) = (
        request.get_user_id("userId"),
        request.get_str("keyword"),
    ) else {
        return invalid(kind);
    };

    match friends.search(user_id, keyword).await {
        Ok(list) => Envelope::builder(kind)
            .put("count", list.len())
            .put("users", serde_json::to_value(&list).unwrap_or_default())
            .build(),
        Err(e) => failure(kind, &e),
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chatwire_protocol::JsonLineCodec;
    use chatwire_services::InMemoryDirectory;
    use chatwire_session::SessionRegistry;

    type MemState = ServerState<
        InMemoryDirectory,
        InMemoryDirectory,
        InMemoryDirectory,
        JsonLineCodec,
    >;

    async fn state_with_alice() -> MemState {
        let directory = InMemoryDirectory::new();
        directory
            .seed_user("alice", "alice@example.com", "secret1", None)
            .await;
        ServerState {
            registry: Arc::new(SessionRegistry::new()),
            auth: directory.clone(),
            profiles: directory.clone(),
            friends: directory,
            codec: JsonLineCodec,
        }
    }

    #[tokio::test]
    async fn test_missing_fields_answer_with_paired_response_kind() {
        let state = state_with_alice().await;
        let request = Envelope::builder(MessageType::LoginRequest)
            .put("username", "alice") // password missing
            .build();

        let response = dispatch(&state, &request).await;
        assert_eq!(response.kind(), MessageType::LoginResponse);
        assert!(!response.is_success());
        assert_eq!(response.error(), Some("Missing required fields"));
    }

    #[tokio::test]
    async fn test_wrongly_typed_field_reads_as_missing() {
        let state = state_with_alice().await;
        // userId as a string instead of a number.
        let request = Envelope::builder(MessageType::GetUserInfoRequest)
            .put("userId", "forty-two")
            .build();

        let response = dispatch(&state, &request).await;
        assert_eq!(response.kind(), MessageType::GetUserInfoResponse);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_non_request_kind_is_unsupported() {
        let state = state_with_alice().await;
        let request = Envelope::new(MessageType::LoginResponse);

        let response = dispatch(&state, &request).await;
        assert_eq!(response.kind(), MessageType::Error);
        assert!(!response.is_success());
        assert!(
            response
                .error()
                .is_some_and(|e| e.contains("Unsupported message type"))
        );
    }

    #[tokio::test]
    async fn test_collaborator_error_becomes_error_envelope() {
        let state = state_with_alice().await;
        let request = Envelope::builder(MessageType::LoginRequest)
            .put("username", "alice")
            .put("password", "wrong")
            .build();

        let response = dispatch(&state, &request).await;
        assert_eq!(response.kind(), MessageType::LoginResponse);
        assert!(!response.is_success());
        assert_eq!(response.error(), Some("Invalid username or password"));
    }

    #[tokio::test]
    async fn test_status_update_rejects_unknown_availability() {
        let state = state_with_alice().await;
        let request = Envelope::builder(MessageType::StatusUpdate)
            .put("userId", 1)
            .put("status", "NAPPING")
            .build();

        let response = dispatch(&state, &request).await;
        assert_eq!(response.kind(), MessageType::StatusUpdate);
        assert_eq!(response.error(), Some("Invalid availability value"));
    }
}
