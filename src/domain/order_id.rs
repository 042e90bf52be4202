use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

const PREFIX: &str = "ORD";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const FINGERPRINT_LEN: usize = 6;

/// Builds human-readable order ids of the form
/// `ORD<yyyymmddHHMMSS><FINGERPRINT>`.
///
/// The fingerprint is the first six upper-case hex digits of the SHA-256 of the
/// customer email. The generator holds no state: two calls for the same email
/// within the same second return the same base id. Callers that need
/// uniqueness ask for a sequenced variant (`generate_with_sequence`) when the
/// store reports a collision.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderIdGenerator;

impl OrderIdGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, customer_email: &str, at: DateTime<Utc>) -> String {
        format!(
            "{PREFIX}{}{}",
            at.format(TIMESTAMP_FORMAT),
            fingerprint(customer_email)
        )
    }

    /// Sequence 0 is the base id; any other value appends `-NN`.
    pub fn generate_with_sequence(
        &self,
        customer_email: &str,
        at: DateTime<Utc>,
        sequence: u32,
    ) -> String {
        let base = self.generate(customer_email, at);
        if sequence == 0 {
            base
        } else {
            format!("{base}-{sequence:02}")
        }
    }

    /// Checks the shape of an id produced by this generator.
    pub fn is_well_formed(order_id: &str) -> bool {
        let Some(rest) = order_id.strip_prefix(PREFIX) else {
            return false;
        };
        let (base, suffix) = match rest.split_once('-') {
            Some((base, suffix)) => (base, Some(suffix)),
            None => (rest, None),
        };
        let ts_len = 14;
        let base = base.as_bytes();
        base.len() == ts_len + FINGERPRINT_LEN
            && base[..ts_len].iter().all(u8::is_ascii_digit)
            && base[ts_len..]
                .iter()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(b))
            && suffix.is_none_or(|s| s.len() >= 2 && s.bytes().all(|b| b.is_ascii_digit()))
    }
}

fn fingerprint(identity: &str) -> String {
    let digest = Sha256::digest(identity.as_bytes());
    let mut hex = hex::encode_upper(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}
