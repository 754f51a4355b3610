#![no_main]
use libfuzzer_sys::fuzz_target;
use vrl_syntax::testing::statements_language;
use vrl_syntax::{parse, reparse, Edit};

// Input layout: two offset bytes, then `old` and `replacement` split at the
// first 0xff byte.
fuzz_target!(|data: &[u8]| {
    let [a, b, rest @ ..] = data else {
        return;
    };
    let (old, replacement) = match rest.iter().position(|&byte| byte == 0xff) {
        Some(split) => (&rest[..split], &rest[split + 1..]),
        None => (rest, &[][..]),
    };
    let old = String::from_utf8_lossy(old);
    let replacement = String::from_utf8_lossy(replacement);
    let len = old.len() + 1;
    let (start, end) = {
        let (x, y) = (usize::from(*a) % len, usize::from(*b) % len);
        (x.min(y), x.max(y))
    };

    let language = statements_language();
    let Ok(prior) = parse(&old, &language) else {
        return;
    };
    let (edit, text) = Edit::from_change(&old, start..end, &replacement);
    let reparsed = reparse(&prior, edit, &text).expect("from_change yields a consistent edit");
    assert_eq!(reparsed, parse(&text, &language).expect("unlimited budget"));
});
