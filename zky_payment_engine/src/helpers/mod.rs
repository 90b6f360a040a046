use rand::Rng;
use ztg_common::Idr;

use crate::db_types::ReferenceId;

/// All reference ids carry this storefront prefix.
pub const REFERENCE_PREFIX: &str = "ZKY";
const REFERENCE_SUFFIX_LEN: usize = 8;
const REFERENCE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Inclusive bounds of the fee disambiguator, in whole rupiah.
pub const MIN_FEE: i64 = 5;
pub const MAX_FEE: i64 = 10;

/// Generate a fresh customer-facing order id: the `ZKY` prefix followed by 8 uppercase alphanumerics.
pub fn new_reference_id() -> ReferenceId {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERENCE_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..REFERENCE_CHARSET.len());
            REFERENCE_CHARSET[idx] as char
        })
        .collect();
    ReferenceId(format!("{REFERENCE_PREFIX}{suffix}"))
}

/// Draw a fee disambiguator. The fee's only purpose is to make `amount + fee` distinguishable between orders
/// that share a base price, so the range is small and the distribution does not matter beyond being spread.
pub fn random_fee() -> Idr {
    let fee = rand::thread_rng().gen_range(MIN_FEE..=MAX_FEE);
    Idr::from(fee)
}

#[cfg(test)]
mod test {
    use regex::Regex;

    use super::*;

    #[test]
    fn reference_ids_match_the_public_pattern() {
        let re = Regex::new(r"^ZKY[A-Z0-9]{8}$").unwrap();
        for _ in 0..200 {
            let id = new_reference_id();
            assert!(re.is_match(id.as_str()), "{id} does not match the reference pattern");
        }
    }

    #[test]
    fn fees_stay_in_bounds() {
        for _ in 0..200 {
            let fee = random_fee().value();
            assert!((MIN_FEE..=MAX_FEE).contains(&fee), "fee {fee} out of range");
        }
    }
}
