use std::fmt;

use rand::Rng;

/// Six digit one-time code authorizing a secret reset.
#[derive(Clone, PartialEq, Eq)]
pub struct Otp(String);

impl Otp {
    const LOWEST: u32 = 100_000;
    const HIGHEST: u32 = 999_999;

    pub fn generate() -> Otp {
        Otp::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Otp {
        Otp(rng.gen_range(Self::LOWEST..=Self::HIGHEST).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Surrounding whitespace in the supplied code is ignored.
    pub fn verify(&self, supplied: &str) -> bool {
        let supplied = supplied.trim().as_bytes();
        let expected = self.0.as_bytes();
        if supplied.len() != expected.len() {
            return false;
        }
        expected.iter().zip(supplied)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b)) == 0
    }
}

impl fmt::Display for Otp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Otp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Otp(..)")
    }
}

pub fn generate_otp() -> Otp {
    Otp::generate()
}

pub fn verify_otp(expected: &Otp, supplied: &str) -> bool {
    expected.verify(supplied)
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;

    #[test]
    fn codes_have_six_digits() {
        let mut rng = StdRng::seed_from_u64(1208);
        for _ in 0..200 {
            let otp = Otp::generate_with(&mut rng);
            assert_eq!(otp.as_str().len(), 6);
            let value: u32 = otp.as_str().parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[rstest]
    #[case("482913", true)]
    #[case(" 482913\n", true)]
    #[case("482914", false)]
    #[case("48291", false)]
    #[case("4829130", false)]
    #[case("", false)]
    fn verify_matches_exact_code(#[case] supplied: &str, #[case] expected: bool) {
        let otp = Otp("482913".to_owned());
        assert_eq!(verify_otp(&otp, supplied), expected);
    }

    #[test]
    fn generated_code_verifies() {
        let otp = generate_otp();
        assert!(verify_otp(&otp, &otp.to_string()));
    }
}
