// Token Provider Port: random hex tokens and claim verification codes.

use rand::Rng;

/// Verification codes are drawn uniformly from `[1, 10^9]`.
pub const VERIFICATION_CODE_MAX: i64 = 1_000_000_000;

/// Number of hex characters in an api key (128 bits).
pub const API_KEY_HEX_CHARS: usize = 32;

/// Token provider interface (allows deterministic tokens in tests)
pub trait TokenProvider: Send + Sync {
    /// Random lowercase hex string of `chars` characters.
    fn hex_string(&self, chars: usize) -> String;

    /// Fresh per-claim verification code.
    fn verification_code(&self) -> i64;

    fn api_key(&self) -> String {
        self.hex_string(API_KEY_HEX_CHARS)
    }
}

/// OS-randomness-backed provider (production)
pub struct RandomTokenProvider;

impl TokenProvider for RandomTokenProvider {
    fn hex_string(&self, chars: usize) -> String {
        let mut bytes = vec![0u8; chars.div_ceil(2)];
        rand::thread_rng().fill(bytes.as_mut_slice());
        let mut s = hex::encode(bytes);
        s.truncate(chars);
        s
    }

    fn verification_code(&self) -> i64 {
        rand::thread_rng().gen_range(1..=VERIFICATION_CODE_MAX)
    }
}

pub mod mocks {
    use super::TokenProvider;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Deterministic provider: sequential codes and predictable hex strings.
    pub struct SequentialTokenProvider {
        next: AtomicI64,
    }

    impl SequentialTokenProvider {
        pub fn new(start: i64) -> Self {
            Self {
                next: AtomicI64::new(start),
            }
        }

        fn bump(&self) -> i64 {
            self.next.fetch_add(1, Ordering::SeqCst)
        }
    }

    impl TokenProvider for SequentialTokenProvider {
        fn hex_string(&self, chars: usize) -> String {
            format!("{:0>width$x}", self.bump(), width = chars)
        }

        fn verification_code(&self) -> i64 {
            self.bump()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_string_has_requested_length() {
        let provider = RandomTokenProvider;
        assert_eq!(provider.hex_string(32).len(), 32);
        assert_eq!(provider.hex_string(7).len(), 7);
        assert!(provider.api_key().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn verification_code_in_range() {
        let provider = RandomTokenProvider;
        for _ in 0..1000 {
            let code = provider.verification_code();
            assert!((1..=VERIFICATION_CODE_MAX).contains(&code));
        }
    }
}
