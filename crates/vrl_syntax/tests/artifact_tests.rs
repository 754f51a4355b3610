//! Tests for loading compiled grammar artifacts

use proptest::prelude::*;
use vrl_syntax::language::{ARTIFACT_MAGIC, ARTIFACT_VERSION};
use vrl_syntax::testing::{ambiguous_language, statements_language};
use vrl_syntax::{parse, InvalidGrammar, Language};

#[test]
fn test_loaded_language_parses_like_builder_output() {
    let built = statements_language();
    let loaded = Language::load(&built.to_bytes()).unwrap();
    assert_eq!(loaded.name(), "statements");
    assert_eq!(loaded.symbol_count(), built.symbol_count());
    assert_eq!(loaded.state_count(), built.state_count());
    for text in ["", "let a; a + 1;", "a + ; b", "# only trivia\n"] {
        assert_eq!(parse(text, &loaded).unwrap().to_sexp(), parse(text, &built).unwrap().to_sexp());
    }
}

#[test]
fn test_artifact_encoding_is_stable() {
    let first = statements_language().to_bytes();
    assert_eq!(first, statements_language().to_bytes());
    assert_eq!(Language::load(&first).unwrap().to_bytes(), first);
    assert_eq!(&first[..4], ARTIFACT_MAGIC);
    assert_eq!(u16::from_le_bytes([first[4], first[5]]), ARTIFACT_VERSION);
}

#[test]
fn test_languages_have_distinct_artifacts() {
    assert_ne!(statements_language().to_bytes(), ambiguous_language().to_bytes());
    assert_ne!(
        Language::load(&statements_language().to_bytes()).unwrap(),
        Language::load(&ambiguous_language().to_bytes()).unwrap()
    );
}

#[test]
fn test_empty_and_garbage_input() {
    assert_eq!(Language::load(&[]).unwrap_err(), InvalidGrammar::BadMagic);
    assert_eq!(Language::load(b"not a grammar at all").unwrap_err(), InvalidGrammar::BadMagic);
}

#[test]
fn test_future_version_is_rejected() {
    let mut bytes = statements_language().to_bytes();
    bytes[4..6].copy_from_slice(&7u16.to_le_bytes());
    let error = Language::load(&bytes).unwrap_err();
    assert_eq!(
        error,
        InvalidGrammar::UnsupportedVersion {
            found: 7,
            expected: ARTIFACT_VERSION,
        }
    );
    assert!(error.to_string().contains("version 7"));
}

#[test]
fn test_extended_payload_is_rejected() {
    let mut bytes = statements_language().to_bytes();
    bytes.extend_from_slice(b"extra");
    assert!(matches!(
        Language::load(&bytes),
        Err(InvalidGrammar::LengthMismatch { .. })
    ));
}

proptest! {
    #[test]
    fn prop_every_truncation_is_rejected(cut in 0usize..4096) {
        let bytes = statements_language().to_bytes();
        let cut = cut % bytes.len();
        prop_assert!(Language::load(&bytes[..cut]).is_err());
    }

    #[test]
    fn prop_single_byte_corruption_is_rejected(index in 0usize..4096, mask in 1u8..=255) {
        let mut bytes = statements_language().to_bytes();
        let index = index % bytes.len();
        bytes[index] ^= mask;
        prop_assert!(Language::load(&bytes).is_err());
    }
}
