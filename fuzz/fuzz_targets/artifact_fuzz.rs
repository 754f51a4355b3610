#![no_main]
use libfuzzer_sys::fuzz_target;
use vrl_syntax::Language;

// Arbitrary bytes must load or fail cleanly; whatever loads must parse.
fuzz_target!(|data: &[u8]| {
    if let Ok(language) = Language::load(data) {
        assert_eq!(Language::load(&language.to_bytes()).ok().as_ref(), Some(&language));
        let _ = vrl_syntax::parse("a; let b;", &language);
    }
});
