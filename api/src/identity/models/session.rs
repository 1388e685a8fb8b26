use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::Engine;
use chrono::NaiveDateTime;

const TOKEN_PREFIX: &str = "nwsr_";
const FALLBACK_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct Session {
    pub id: i32,
    pub token: String,
    pub active: bool,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub identity_id: i32,
}

#[derive(Clone, Debug)]
pub struct NewSession {
    pub token: String,
    pub active: bool,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub identity_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// `now + ttl_days`, or the fallback lifetime when the TTL is not positive or
/// overflows the calendar.
fn expiry(now: NaiveDateTime, ttl_days: i64) -> NaiveDateTime {
    let expires_at = (ttl_days > 0)
        .then(|| chrono::Duration::try_days(ttl_days))
        .flatten()
        .and_then(|ttl| now.checked_add_signed(ttl));

    expires_at.unwrap_or_else(|| {
        tracing::error!(ttl_days, "Invalid session TTL, using {FALLBACK_TTL_DAYS} days");
        now + chrono::Duration::days(FALLBACK_TTL_DAYS)
    })
}

impl Session {
    pub fn new_with_identity_id(identity_id: i32, ttl_days: i64) -> NewSession {
        let mut session_bytes = [0u8; 96];
        OsRng.fill_bytes(&mut session_bytes);

        let token =
            TOKEN_PREFIX.to_owned() + &base64::engine::general_purpose::STANDARD.encode(session_bytes);

        let now = chrono::Utc::now().naive_utc();

        NewSession {
            active: true,
            token,
            issued_at: now,
            expires_at: expiry(now, ttl_days),
            identity_id,
            created_at: now,
            updated_at: now,
        }
    }
}

impl NewSession {
    pub fn lifetime(&self) -> time::Duration {
        time::Duration::seconds((self.expires_at - self.issued_at).num_seconds())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tokens_are_prefixed_and_unique() {
        let a = Session::new_with_identity_id(1, 30);
        let b = Session::new_with_identity_id(1, 30);

        assert!(a.token.starts_with(TOKEN_PREFIX));
        assert_ne!(a.token, b.token);
        assert_eq!(a.lifetime(), time::Duration::days(30));
    }

    #[test]
    fn test_out_of_range_ttl_uses_the_fallback() {
        for ttl_days in [1_000_000_000, i64::MAX, 0, -5] {
            let session = Session::new_with_identity_id(1, ttl_days);

            assert!(session.expires_at > session.issued_at);
            assert_eq!(session.lifetime(), time::Duration::days(FALLBACK_TTL_DAYS));
        }

        let week = Session::new_with_identity_id(1, 7);
        assert_eq!(week.lifetime(), time::Duration::days(7));
    }
}
