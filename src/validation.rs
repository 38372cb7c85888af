use bs58;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid Solana address format: {0}")]
    InvalidSolanaAddress(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub fn validate_solana_address(address: &str) -> Result<(), ValidationError> {
    // Check if address is empty
    if address.trim().is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    // Decode base58 string
    let decoded = match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => return Err(ValidationError::InvalidSolanaAddress(address.to_string())),
    };

    // Validate length (Solana addresses are 32 bytes)
    if decoded.len() != 32 {
        return Err(ValidationError::InvalidSolanaAddress(address.to_string()));
    }

    Ok(())
}

/// Validate and convert a base58 address into a `Pubkey`.
pub fn parse_pubkey(address: &str) -> Result<Pubkey, ValidationError> {
    validate_solana_address(address)?;
    address
        .parse::<Pubkey>()
        .map_err(|_| ValidationError::InvalidSolanaAddress(address.to_string()))
}

pub fn validate_limit(limit: Option<&str>, default: u32, max: u32) -> Result<u32, ValidationError> {
    let Some(raw) = limit else {
        return Ok(default);
    };

    let value: u32 = raw
        .parse()
        .map_err(|_| ValidationError::InvalidParameter(format!("limit must be a number: {}", raw)))?;

    if value == 0 || value > max {
        return Err(ValidationError::InvalidParameter(format!(
            "limit must be between 1 and {}",
            max
        )));
    }

    Ok(value)
}
