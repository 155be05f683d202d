//! Typed decoding of hook revert selectors
//!
//! Chain reverts surface as 4-byte custom-error selectors. Known selectors
//! map to named variants; anything else is preserved as `Unknown`.

use alloy::primitives::keccak256;

/// Decoded hook revert reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRevert {
    InvalidCommitment,
    SlippageExceededForUser,
    CurrencyNotSettled,
    DeadlineExpired,
    InsufficientCommitments,
    BatchConditionsNotMet,
    InvalidNonce,
    Unknown([u8; 4]),
}

impl HookRevert {
    pub const INVALID_COMMITMENT: [u8; 4] = [0xc0, 0x67, 0x89, 0xfa];
    pub const SLIPPAGE_EXCEEDED_FOR_USER: [u8; 4] = [0x56, 0xa2, 0x70, 0xff];
    pub const CURRENCY_NOT_SETTLED: [u8; 4] = [0x52, 0x12, 0xcb, 0xa1];

    /// First four bytes of keccak256 over a custom-error signature
    fn sig_selector(signature: &str) -> [u8; 4] {
        let digest = keccak256(signature.as_bytes());
        [digest[0], digest[1], digest[2], digest[3]]
    }

    /// Map a revert selector to a typed reason
    pub fn from_selector(selector: [u8; 4]) -> Self {
        if selector == Self::INVALID_COMMITMENT {
            HookRevert::InvalidCommitment
        } else if selector == Self::SLIPPAGE_EXCEEDED_FOR_USER {
            HookRevert::SlippageExceededForUser
        } else if selector == Self::CURRENCY_NOT_SETTLED {
            HookRevert::CurrencyNotSettled
        } else if selector == Self::sig_selector("DeadlineExpired()") {
            HookRevert::DeadlineExpired
        } else if selector == Self::sig_selector("InsufficientCommitments()") {
            HookRevert::InsufficientCommitments
        } else if selector == Self::sig_selector("BatchConditionsNotMet()") {
            HookRevert::BatchConditionsNotMet
        } else if selector == Self::sig_selector("InvalidNonce()") {
            HookRevert::InvalidNonce
        } else {
            HookRevert::Unknown(selector)
        }
    }

    /// Machine-readable kind for logs and history entries
    pub fn kind(&self) -> &'static str {
        match self {
            HookRevert::InvalidCommitment => "invalid_commitment",
            HookRevert::SlippageExceededForUser => "slippage_exceeded_for_user",
            HookRevert::CurrencyNotSettled => "currency_not_settled",
            HookRevert::DeadlineExpired => "deadline_expired",
            HookRevert::InsufficientCommitments => "insufficient_commitments",
            HookRevert::BatchConditionsNotMet => "batch_conditions_not_met",
            HookRevert::InvalidNonce => "invalid_nonce",
            HookRevert::Unknown(_) => "unknown_revert",
        }
    }
}

impl std::fmt::Display for HookRevert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookRevert::InvalidCommitment => write!(f, "InvalidCommitment"),
            HookRevert::SlippageExceededForUser => write!(f, "SlippageExceededForUser"),
            HookRevert::CurrencyNotSettled => write!(f, "CurrencyNotSettled"),
            HookRevert::DeadlineExpired => write!(f, "DeadlineExpired"),
            HookRevert::InsufficientCommitments => write!(f, "InsufficientCommitments"),
            HookRevert::BatchConditionsNotMet => write!(f, "BatchConditionsNotMet"),
            HookRevert::InvalidNonce => write!(f, "InvalidNonce"),
            HookRevert::Unknown(sel) => write!(
                f,
                "Unknown(0x{:02x}{:02x}{:02x}{:02x})",
                sel[0], sel[1], sel[2], sel[3]
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_selectors_decode() {
        assert_eq!(
            HookRevert::from_selector([0xc0, 0x67, 0x89, 0xfa]),
            HookRevert::InvalidCommitment
        );
        assert_eq!(
            HookRevert::from_selector([0x56, 0xa2, 0x70, 0xff]),
            HookRevert::SlippageExceededForUser
        );
        assert_eq!(
            HookRevert::from_selector([0x52, 0x12, 0xcb, 0xa1]),
            HookRevert::CurrencyNotSettled
        );
    }

    #[test]
    fn signature_selectors_decode() {
        let sel = HookRevert::sig_selector("DeadlineExpired()");
        assert_eq!(HookRevert::from_selector(sel), HookRevert::DeadlineExpired);

        let sel = HookRevert::sig_selector("InvalidNonce()");
        assert_eq!(HookRevert::from_selector(sel), HookRevert::InvalidNonce);
    }

    #[test]
    fn unknown_selector_is_preserved() {
        let decoded = HookRevert::from_selector([0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decoded, HookRevert::Unknown([0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(decoded.to_string(), "Unknown(0xdeadbeef)");
    }
}
