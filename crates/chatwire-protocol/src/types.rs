//! Core protocol types for Chatwire's wire format.
//!
//! Everything here travels "on the wire": these structures are serialized
//! to a single line of JSON, written to the socket, and parsed back on the
//! other side. The [`Envelope`] is the unit of communication; every request
//! and every response is one envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user account.
///
/// A newtype wrapper over `u64`: you can't accidentally pass some other
/// numeric id where a `UserId` is expected, and signatures like
/// `fn is_online(user: UserId)` read better than `fn is_online(user: u64)`.
///
/// `#[serde(transparent)]` makes `UserId(42)` serialize as plain `42`,
/// which is what the payload field `userId` carries on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MessageType — the closed set of operation tags
// ---------------------------------------------------------------------------

/// The operation/response tag of an envelope.
///
/// This is a closed set: the codec rejects tags outside it so a reader
/// never crashes on input it doesn't understand (the caller answers with
/// an [`Error`](MessageType::Error) envelope instead).
///
/// `#[serde(rename_all = "SCREAMING_SNAKE_CASE")]` gives the wire form,
/// e.g. `LoginRequest` becomes `"LOGIN_REQUEST"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // -- Authentication --
    LoginRequest,
    LoginResponse,
    RegisterRequest,
    RegisterResponse,
    LogoutRequest,
    LogoutResponse,
    VerifyOtpRequest,
    VerifyOtpResponse,
    ResendOtpRequest,
    ResendOtpResponse,
    ForgotPasswordRequest,
    ForgotPasswordResponse,
    ResetPasswordRequest,
    ResetPasswordResponse,

    // -- Profile --
    UpdateProfileRequest,
    UpdateProfileResponse,
    ChangePasswordRequest,
    ChangePasswordResponse,
    UploadAvatarRequest,
    UploadAvatarResponse,
    GetUserInfoRequest,
    GetUserInfoResponse,
    StatusUpdate,

    // -- Friend graph --
    AddFriendRequest,
    AddFriendResponse,
    AcceptFriendRequest,
    AcceptFriendResponse,
    RejectFriendRequest,
    RejectFriendResponse,
    UnfriendRequest,
    UnfriendResponse,
    BlockFriendRequest,
    BlockFriendResponse,
    GetFriendsRequest,
    GetFriendsResponse,
    GetPendingRequestsRequest,
    GetPendingRequestsResponse,
    SearchUsersRequest,
    SearchUsersResponse,

    /// Generic failure reply for input that can't be decoded or routed.
    Error,
}

impl MessageType {
    /// The response tag paired with this request tag.
    ///
    /// Response tags (and `StatusUpdate`, which answers with itself) map
    /// to themselves, so a dispatcher can always build its reply with
    /// `request.kind().response()`.
    pub fn response(self) -> MessageType {
        use MessageType::*;
        match self {
            LoginRequest => LoginResponse,
            RegisterRequest => RegisterResponse,
            LogoutRequest => LogoutResponse,
            VerifyOtpRequest => VerifyOtpResponse,
            ResendOtpRequest => ResendOtpResponse,
            ForgotPasswordRequest => ForgotPasswordResponse,
            ResetPasswordRequest => ResetPasswordResponse,
            UpdateProfileRequest => UpdateProfileResponse,
            ChangePasswordRequest => ChangePasswordResponse,
            UploadAvatarRequest => UploadAvatarResponse,
            GetUserInfoRequest => GetUserInfoResponse,
            AddFriendRequest => AddFriendResponse,
            AcceptFriendRequest => AcceptFriendResponse,
            RejectFriendRequest => RejectFriendResponse,
            UnfriendRequest => UnfriendResponse,
            BlockFriendRequest => BlockFriendResponse,
            GetFriendsRequest => GetFriendsResponse,
            GetPendingRequestsRequest => GetPendingRequestsResponse,
            SearchUsersRequest => SearchUsersResponse,
            other => other,
        }
    }

    /// The wire form of the tag, e.g. `"LOGIN_REQUEST"`.
    pub fn as_str(self) -> &'static str {
        use MessageType::*;
        match self {
            LoginRequest => "LOGIN_REQUEST",
            LoginResponse => "LOGIN_RESPONSE",
            RegisterRequest => "REGISTER_REQUEST",
            RegisterResponse => "REGISTER_RESPONSE",
            LogoutRequest => "LOGOUT_REQUEST",
            LogoutResponse => "LOGOUT_RESPONSE",
            VerifyOtpRequest => "VERIFY_OTP_REQUEST",
            VerifyOtpResponse => "VERIFY_OTP_RESPONSE",
            ResendOtpRequest => "RESEND_OTP_REQUEST",
            ResendOtpResponse => "RESEND_OTP_RESPONSE",
            ForgotPasswordRequest => "FORGOT_PASSWORD_REQUEST",
            ForgotPasswordResponse => "FORGOT_PASSWORD_RESPONSE",
            ResetPasswordRequest => "RESET_PASSWORD_REQUEST",
            ResetPasswordResponse => "RESET_PASSWORD_RESPONSE",
            UpdateProfileRequest => "UPDATE_PROFILE_REQUEST",
            UpdateProfileResponse => "UPDATE_PROFILE_RESPONSE",
            ChangePasswordRequest => "CHANGE_PASSWORD_REQUEST",
            ChangePasswordResponse => "CHANGE_PASSWORD_RESPONSE",
            UploadAvatarRequest => "UPLOAD_AVATAR_REQUEST",
            UploadAvatarResponse => "UPLOAD_AVATAR_RESPONSE",
            GetUserInfoRequest => "GET_USER_INFO_REQUEST",
            GetUserInfoResponse => "GET_USER_INFO_RESPONSE",
            StatusUpdate => "STATUS_UPDATE",
            AddFriendRequest => "ADD_FRIEND_REQUEST",
            AddFriendResponse => "ADD_FRIEND_RESPONSE",
            AcceptFriendRequest => "ACCEPT_FRIEND_REQUEST",
            AcceptFriendResponse => "ACCEPT_FRIEND_RESPONSE",
            RejectFriendRequest => "REJECT_FRIEND_REQUEST",
            RejectFriendResponse => "REJECT_FRIEND_RESPONSE",
            UnfriendRequest => "UNFRIEND_REQUEST",
            UnfriendResponse => "UNFRIEND_RESPONSE",
            BlockFriendRequest => "BLOCK_FRIEND_REQUEST",
            BlockFriendResponse => "BLOCK_FRIEND_RESPONSE",
            GetFriendsRequest => "GET_FRIENDS_REQUEST",
            GetFriendsResponse => "GET_FRIENDS_RESPONSE",
            GetPendingRequestsRequest => "GET_PENDING_REQUESTS_REQUEST",
            GetPendingRequestsResponse => "GET_PENDING_REQUESTS_RESPONSE",
            SearchUsersRequest => "SEARCH_USERS_REQUEST",
            SearchUsersResponse => "SEARCH_USERS_RESPONSE",
            Error => "ERROR",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Envelope — the unit of communication
// ---------------------------------------------------------------------------

/// Current time in milliseconds since the Unix epoch.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// The self-contained unit of communication.
///
/// One envelope is one logical request or response:
///
/// ```text
/// ┌──────────────────────────────────────────┐
/// │ type: LOGIN_REQUEST                      │  which operation
/// │ data: { "username": .., "password": .. } │  dynamically typed payload
/// │ timestamp: 1718000000000                 │  informational only
/// │ success: true   error: absent            │  outcome
/// └──────────────────────────────────────────┘
/// ```
///
/// The outcome fields are never independently inconsistent: setting an
/// error forces `success` to `false`, and deserialization re-applies the
/// same rule to whatever the peer sent (via `#[serde(from)]`).
///
/// Envelopes are constructed through [`EnvelopeBuilder`], handed to the
/// codec, and discarded once the response handler has seen them. Nothing
/// outlives the socket write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireEnvelope")]
pub struct Envelope {
    #[serde(rename = "type")]
    kind: MessageType,
    data: Map<String, Value>,
    timestamp: i64,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Raw wire shape used only for deserialization. Missing `data`, `success`
/// or `error` fields take their defaults; the conversion into [`Envelope`]
/// enforces the outcome invariant.
#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    kind: MessageType,
    #[serde(default)]
    data: Map<String, Value>,
    #[serde(default = "now_millis")]
    timestamp: i64,
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

impl From<WireEnvelope> for Envelope {
    fn from(wire: WireEnvelope) -> Self {
        // error present wins over whatever the peer put in `success`.
        let success = wire.success && wire.error.is_none();
        Envelope {
            kind: wire.kind,
            data: wire.data,
            timestamp: wire.timestamp,
            success,
            error: wire.error,
        }
    }
}

impl Envelope {
    /// Creates an empty, successful envelope stamped with the current time.
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            data: Map::new(),
            timestamp: now_millis(),
            success: true,
            error: None,
        }
    }

    /// Starts building an envelope of the given kind.
    pub fn builder(kind: MessageType) -> EnvelopeBuilder {
        EnvelopeBuilder::new(kind)
    }

    /// The operation/response tag.
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    /// Creation instant in milliseconds since the Unix epoch.
    /// Informational only; nothing in the protocol depends on it.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Whether the operation succeeded. Always `false` when an error
    /// string is present.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The error string, if the operation failed with one.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The raw payload mapping. Keys are unique; no ordering is promised.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Records a failure. Forces `success` to `false`; the two outcome
    /// fields can never disagree.
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.success = false;
    }

    /// Inserts a payload value under `key`, replacing any previous value.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Inserts a binary payload value as base64 text. The wire is
    /// line-oriented text, so raw bytes can't travel as-is.
    pub fn put_bytes(&mut self, key: impl Into<String>, bytes: &[u8]) {
        self.data.insert(key.into(), Value::String(BASE64.encode(bytes)));
    }

    /// Raw payload value lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Payload value as a string slice, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Payload value as an `i64`, if present and numeric.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }

    /// Payload value as a `u64`, if present and numeric.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(Value::as_u64)
    }

    /// Payload value as a `UserId`, if present and numeric.
    pub fn get_user_id(&self, key: &str) -> Option<UserId> {
        self.get_u64(key).map(UserId)
    }

    /// Payload value as a bool, if present and boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    /// Payload value decoded from base64, if present, a string, and
    /// valid base64. Undecodable content is treated the same as absent;
    /// callers that require the field report it as missing/invalid.
    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.get_str(key).and_then(|s| BASE64.decode(s).ok())
    }
}

// ---------------------------------------------------------------------------
// EnvelopeBuilder
// ---------------------------------------------------------------------------

/// Fluent construction of envelopes.
///
/// ```rust
/// use chatwire_protocol::{Envelope, MessageType};
///
/// let resp = Envelope::builder(MessageType::LoginResponse)
///     .put("userId", 42)
///     .put("username", "alice")
///     .build();
/// assert!(resp.is_success());
///
/// let fail = Envelope::builder(MessageType::LoginResponse)
///     .error("Invalid username or password")
///     .build();
/// assert!(!fail.is_success());
/// ```
pub struct EnvelopeBuilder {
    envelope: Envelope,
}

impl EnvelopeBuilder {
    /// Starts a new builder for the given message kind.
    pub fn new(kind: MessageType) -> Self {
        Self {
            envelope: Envelope::new(kind),
        }
    }

    /// Adds a payload entry.
    pub fn put(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.envelope.put(key, value);
        self
    }

    /// Adds a binary payload entry (base64 on the wire).
    pub fn put_bytes(mut self, key: impl Into<String>, bytes: &[u8]) -> Self {
        self.envelope.put_bytes(key, bytes);
        self
    }

    /// Overrides the success flag.
    pub fn success(mut self, success: bool) -> Self {
        self.envelope.success = success;
        self
    }

    /// Marks the envelope failed with the given error string.
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.envelope.set_error(error);
        self
    }

    /// Finishes the envelope. Whatever order the builder methods ran in,
    /// an error string forces `success` to `false` here.
    pub fn build(mut self) -> Envelope {
        if self.envelope.error.is_some() {
            self.envelope.success = false;
        }
        self.envelope
    }
}

// =========================================================================
// Tests
// =========================================================================
