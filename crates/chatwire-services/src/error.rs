//! Error type shared by all collaborator operations.

/// A failure reported by a collaborator.
///
/// The `#[error(...)]` strings are user-facing: the dispatch router copies
/// them verbatim into the `error` field of the response envelope, so they
/// are written as messages, not as diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    // -- Authentication --
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account not verified")]
    NotVerified,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Email not registered")]
    EmailNotRegistered,

    #[error("OTP code is wrong or has expired")]
    OtpInvalid,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Current password is incorrect")]
    WrongPassword,

    // -- Users & profiles --
    #[error("User not found")]
    UserNotFound,

    #[error("Avatar size exceeds 5MB limit")]
    AvatarTooLarge,

    #[error("Invalid file format. Only PNG, JPG, JPEG, GIF allowed")]
    InvalidAvatarFormat,

    // -- Friend graph --
    #[error("Cannot send friend request to yourself")]
    SelfFriendRequest,

    #[error("Already friends")]
    AlreadyFriends,

    #[error("Friend request already sent")]
    RequestAlreadySent,

    #[error("No pending friend request")]
    NoPendingRequest,

    #[error("Users are not friends")]
    NotFriends,

    #[error("Cannot send friend request")]
    Blocked,

    /// Backend failure (lost database, I/O error, ...). The message is
    /// the collaborator's own; no stack traces cross this boundary.
    #[error("Service error: {0}")]
    Backend(String),
}
