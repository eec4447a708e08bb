use phonenumber::country;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhoneError {
    #[error("Invalid phone number. Check if phone number is correct and try again.")]
    Invalid,
    #[error("Unknown phone region: {0}")]
    UnknownRegion(String),
}

/// Parse an ISO 3166 alpha-2 region code such as `ES`.
pub fn parse_region(code: &str) -> Result<country::Id, PhoneError> {
    code.trim()
        .to_uppercase()
        .parse()
        .map_err(|_| PhoneError::UnknownRegion(code.to_string()))
}

/// Normalize a phone number to E.164, reading national numbers as belonging
/// to `region`. Numbers that do not parse, or parse but are not valid for
/// their region, are rejected.
pub fn normalize_phone(raw: &str, region: country::Id) -> Result<String, PhoneError> {
    let number = phonenumber::parse(Some(region), raw.trim()).map_err(|_| PhoneError::Invalid)?;
    if !phonenumber::is_valid(&number) {
        return Err(PhoneError::Invalid);
    }
    Ok(number.format().mode(phonenumber::Mode::E164).to_string())
}
