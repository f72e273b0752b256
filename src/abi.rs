// src/abi.rs
use alloy::primitives::{keccak256, Address, U256};
use rust_decimal::Decimal;

use crate::ledger::BalanceLookupError;

/// Both respect tokens use 18 decimals
pub const RESPECT_DECIMALS: u32 = 18;

pub const ERC20_BALANCE_OF: &str = "balanceOf(address)";
pub const ERC1155_BALANCE_OF: &str = "balanceOf(address,uint256)";

/// First four bytes of keccak256(signature)
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn address_word(owner: Address) -> [u8; 32] {
    // address occupies the low 20 bytes of the word
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(owner.as_slice());
    word
}

/// Calldata for ERC-20 `balanceOf(owner)`
pub fn encode_erc20_balance_of(owner: Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&selector(ERC20_BALANCE_OF));
    data.extend_from_slice(&address_word(owner));
    data
}

/// Calldata for ERC-1155 `balanceOf(owner, id)`
pub fn encode_erc1155_balance_of(owner: Address, id: U256) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&selector(ERC1155_BALANCE_OF));
    data.extend_from_slice(&address_word(owner));
    data.extend_from_slice(&id.to_be_bytes::<32>());
    data
}

/// Decode a single `uint256` return value
pub fn decode_uint256(data: &[u8]) -> Result<U256, BalanceLookupError> {
    // an empty return means no contract at the target or a silent revert
    if data.len() < 32 {
        return Err(BalanceLookupError::Malformed(format!(
            "expected a 32-byte uint256, got {} bytes",
            data.len()
        )));
    }
    U256::try_from_be_slice(&data[..32])
        .ok_or_else(|| BalanceLookupError::Malformed("uint256 out of range".to_string()))
}

/// Scale a raw token amount by 10^18 into a `Decimal`
pub fn scale_respect(raw: U256) -> Result<Decimal, BalanceLookupError> {
    if raw > U256::from(u128::MAX) {
        return Err(BalanceLookupError::Overflow(raw));
    }
    let units = i128::try_from(raw.to::<u128>()).map_err(|_| BalanceLookupError::Overflow(raw))?;

    Decimal::try_from_i128_with_scale(units, RESPECT_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|_| BalanceLookupError::Overflow(raw))
}
