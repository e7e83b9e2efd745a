//! Random reference codes with bounded collision retries.

use std::future::Future;

use rand::Rng;

use crate::error::AppError;

const UPPER_ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Shape of a generated code.
#[derive(Debug, Clone, Copy)]
pub struct CodeSpec {
    pub length: usize,
    pub alphabet: &'static [u8],
    pub max_attempts: u32,
}

impl CodeSpec {
    /// 9-character upper-case alphanumeric code, up to 5 draws.
    pub const REFERENCE: CodeSpec = CodeSpec {
        length: 9,
        alphabet: UPPER_ALPHANUMERIC,
        max_attempts: 5,
    };

    /// Draw one code without checking uniqueness
    pub fn draw(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())] as char)
            .collect()
    }
}

/// Generate a code for which `exists` resolves to `false`.
///
/// Draws at most `spec.max_attempts` candidates; returns `AppError::Conflict`
/// once they are all taken.
pub async fn generate_unique_code<F, Fut>(spec: CodeSpec, mut exists: F) -> Result<String, AppError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    if spec.length == 0 || spec.alphabet.is_empty() {
        return Err(AppError::InvalidInput(
            "Code length and alphabet must be non-empty".to_string(),
        ));
    }

    for attempt in 1..=spec.max_attempts {
        let candidate = spec.draw();
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        tracing::debug!(attempt, max_attempts = spec.max_attempts, "Generated code already taken");
    }

    Err(AppError::Conflict(format!(
        "Could not generate a unique code after {} attempts",
        spec.max_attempts
    )))
}
