//! Two-factor authentication and device trust.
//!
//! TOTP enrolment is not enforced yet. These functions keep the call sites and routes in place
//! and always succeed: no secret is issued, any code verifies, and every device is trusted.

use crate::types::UserId;

/// Secret to show the user during enrolment. Empty until TOTP is enforced.
pub fn generate_secret() -> String {
    String::new()
}

/// Check `code` for `user_id` and remember the device on success.
pub fn verify_totp_and_trust_device(user_id: UserId, code: &str) -> bool {
    tracing::debug!(user_id = %user_id, code_len = code.len(), "2FA verification accepted");
    true
}

pub fn is_current_device_trusted(_user_id: UserId) -> bool {
    true
}
