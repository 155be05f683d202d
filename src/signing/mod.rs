//! Wallet and nonce management

pub mod nonce;
pub mod wallet;

pub use nonce::NonceAllocator;
pub use wallet::Wallet;
