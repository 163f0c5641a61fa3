use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidKeyValue(String),

    #[error("Component '{component}' cannot be empty in '{input}'.")]
    EmptyComponent {
        component: &'static str,
        input: String,
    },

    #[error("Invalid vector '{0}'. Expected three comma-separated numbers (e.g., '0.3,0.15,0.3').")]
    InvalidVector(String),
}

/// Splits `KEY=VALUE` at the first `=`. Whitespace around the key is ignored.
pub fn parse_key_value(input: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidKeyValue(input.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::EmptyComponent {
            component: "key",
            input: input.to_string(),
        });
    }
    if value.trim().is_empty() {
        return Err(ParseError::EmptyComponent {
            component: "value",
            input: input.to_string(),
        });
    }
    Ok((key, value))
}

/// Parses `x,y,z`, optionally wrapped in square brackets.
pub fn parse_vector3(input: &str) -> Result<[f32; 3], ParseError> {
    let invalid = || ParseError::InvalidVector(input.to_string());
    let inner = input
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');

    let components = inner
        .split(',')
        .map(|c| c.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    <[f32; 3]>::try_from(components).map_err(|_| invalid())
}
