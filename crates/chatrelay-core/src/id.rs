//! Conversation identifiers.
//!
//! Ids are client-facing and end up in URLs, so they are drawn from a
//! URL-safe 64-symbol alphabet.

use rand::Rng;

/// URL-safe alphabet (same symbol set as nanoid's `urlAlphabet`).
pub const URL_ALPHABET: &[u8; 64] =
    b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

pub const CONVERSATION_ID_LEN: usize = 10;

/// Generate a fresh random conversation id.
pub fn new_conversation_id() -> String {
    new_id_with(&mut rand::thread_rng(), CONVERSATION_ID_LEN)
}

pub fn new_id_with<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| URL_ALPHABET[rng.gen_range(0..URL_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[test]
    fn default_ids_have_ten_url_safe_chars() {
        let id = new_conversation_id();
        assert_eq!(id.len(), CONVERSATION_ID_LEN);
        assert!(id.bytes().all(|b| URL_ALPHABET.contains(&b)));
    }

    #[test]
    fn ids_differ() {
        assert_ne!(new_conversation_id(), new_conversation_id());
    }

    proptest! {
        #[test]
        fn seeded_ids_stay_in_alphabet(seed in any::<u64>(), len in 0usize..32) {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            let id = new_id_with(&mut rng, len);
            prop_assert_eq!(id.len(), len);
            prop_assert!(id.bytes().all(|b| URL_ALPHABET.contains(&b)));
        }
    }
}
