//! One-time password issuance and validation

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, rngs::OsRng};
use subtle::ConstantTimeEq;

use crate::models::User;

/// Number of digits in a generated code
pub const OTP_LENGTH: usize = 6;

/// How long a code stays valid after issuance
pub const OTP_TTL_MINUTES: i64 = 10;

/// Generate a fresh code and its expiry timestamp.
///
/// Codes come from the operating system RNG, not a seeded PRNG, so they
/// stay unpredictable to a caller who knows the account id and request
/// timing. The caller persists both values on the account in one write.
pub fn generate() -> (String, DateTime<Utc>) {
    let code: u32 = OsRng.gen_range(0..1_000_000);
    let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);

    (format!("{:0width$}", code, width = OTP_LENGTH), expires_at)
}

/// Check a submitted code against the account's pending OTP.
///
/// Returns true iff a code is pending, the submitted code matches it
/// under constant-time comparison, and the expiry has not passed. The
/// three failure cases are not distinguished for callers. A consumed
/// code has both fields cleared, so repeat submissions fail closed.
pub fn verify(user: &User, submitted: &str) -> bool {
    let (Some(code), Some(expires_at)) = (user.otp_code.as_deref(), user.otp_expires_at) else {
        return false;
    };

    let matches: bool = code.as_bytes().ct_eq(submitted.as_bytes()).into();
    matches && Utc::now() <= expires_at
}
