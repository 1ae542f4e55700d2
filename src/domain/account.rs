use super::ids::AccountId;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

const BECH32_CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Profile of a registered account holder.
///
/// Holds no balance: the balance is always derived from the ledger.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AccountProfile {
    pub id: AccountId,
    pub email: String,
    pub full_name: String,
    /// Deposit address shown to the account holder.
    pub wallet_code: String,
    pub registered_at: DateTime<Utc>,
}

impl AccountProfile {
    pub fn new(id: AccountId, email: &str, full_name: &str) -> Result<Self, LedgerError> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(LedgerError::ValidationError(format!(
                "Invalid email address for account {}",
                id
            )));
        }
        Ok(Self {
            id,
            email: email.to_string(),
            full_name: full_name.trim().to_string(),
            wallet_code: generate_wallet_code(&mut rand::thread_rng()),
            registered_at: Utc::now(),
        })
    }
}

/// Generates a bech32-looking deposit address: "bc1" followed by 39 to 59
/// characters of the bech32 alphabet.
pub fn generate_wallet_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let length = rng.gen_range(39..=59);
    let mut code = String::with_capacity(3 + length);
    code.push_str("bc1");
    for _ in 0..length {
        let idx = rng.gen_range(0..BECH32_CHARSET.len());
        code.push(BECH32_CHARSET[idx] as char);
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_code_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let code = generate_wallet_code(&mut rng);
            assert!(code.starts_with("bc1"));
            assert!((42..=62).contains(&code.len()));
            assert!(code[3..].bytes().all(|b| BECH32_CHARSET.contains(&b)));
        }
    }

    #[test]
    fn test_profile_requires_email() {
        let id = AccountId::new("a1").unwrap();
        assert!(AccountProfile::new(id.clone(), "nope", "Alice").is_err());

        let profile = AccountProfile::new(id, " alice@example.com ", " Alice Doe ").unwrap();
        assert_eq!(profile.email, "alice@example.com");
        assert_eq!(profile.full_name, "Alice Doe");
    }
}
