//! Numeric passcode generation backed by the OS CSPRNG.

use anyhow::{anyhow, Context, Result};
use rand::{rngs::OsRng, RngCore};

use super::models::OtpCode;

pub const MIN_CODE_LENGTH: usize = 4;
pub const MAX_CODE_LENGTH: usize = 10;

// Largest multiple of 10 that fits in a byte; bytes at or above it are redrawn
// so every digit is uniform.
const DIGIT_REJECTION_BOUND: u8 = 250;

pub trait CodeGenerator: Send + Sync {
    /// Produce a new code.
    ///
    /// # Errors
    /// Returns an error if the entropy source is unavailable.
    fn generate(&self) -> Result<OtpCode>;

    fn code_length(&self) -> usize;
}

#[derive(Clone, Copy, Debug)]
pub struct OtpCodec {
    length: usize,
}

impl OtpCodec {
    /// # Errors
    /// Returns an error if `length` is outside `MIN_CODE_LENGTH..=MAX_CODE_LENGTH`.
    pub fn new(length: usize) -> Result<Self> {
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&length) {
            return Err(anyhow!(
                "code length must be between {MIN_CODE_LENGTH} and {MAX_CODE_LENGTH}, got {length}"
            ));
        }
        Ok(Self { length })
    }
}

impl Default for OtpCodec {
    fn default() -> Self {
        Self { length: 6 }
    }
}

impl CodeGenerator for OtpCodec {
    fn generate(&self) -> Result<OtpCode> {
        let mut digits = String::with_capacity(self.length);
        let mut buf = [0u8; 16];

        while digits.len() < self.length {
            OsRng
                .try_fill_bytes(&mut buf)
                .context("failed to read from OS entropy source")?;
            for byte in buf {
                if byte >= DIGIT_REJECTION_BOUND {
                    continue;
                }
                digits.push(char::from(b'0' + byte % 10));
                if digits.len() == self.length {
                    break;
                }
            }
        }

        Ok(OtpCode::new(digits))
    }

    fn code_length(&self) -> usize {
        self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn generates_fixed_width_digits() -> Result<()> {
        let codec = OtpCodec::default();
        for _ in 0..200 {
            let code = codec.generate()?;
            assert_eq!(code.expose().len(), 6);
            assert!(code.expose().bytes().all(|b| b.is_ascii_digit()));
        }
        Ok(())
    }

    #[test]
    fn honours_configured_length() -> Result<()> {
        for length in MIN_CODE_LENGTH..=MAX_CODE_LENGTH {
            let codec = OtpCodec::new(length)?;
            assert_eq!(codec.code_length(), length);
            assert_eq!(codec.generate()?.expose().len(), length);
        }
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_length() {
        assert!(OtpCodec::new(3).is_err());
        assert!(OtpCodec::new(11).is_err());
    }

    #[test]
    fn every_digit_appears() -> Result<()> {
        let codec = OtpCodec::new(10)?;
        let mut seen = [false; 10];
        for _ in 0..100 {
            for b in codec.generate()?.expose().bytes() {
                seen[usize::from(b - b'0')] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
        Ok(())
    }
}
