//! Local token estimator
//!
//! Used only when a vendor response carries no usage block. The estimate is
//! one token per four characters, rounded up, and applied the same way for
//! every vendor so costs stay comparable.

/// Characters per estimated token
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a piece of text
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    let tokens = chars.div_ceil(CHARS_PER_TOKEN);
    u32::try_from(tokens).unwrap_or(u32::MAX)
}
