#![no_main]
use libfuzzer_sys::fuzz_target;
use vrl_syntax::testing::{ambiguous_language, statements_language, vrl_language};
use vrl_syntax::{ParseBudget, Parser, ParserConfig};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let config = ParserConfig::default().with_budget(ParseBudget::unlimited().with_max_tokens(100_000));
    for language in [statements_language(), ambiguous_language(), vrl_language()] {
        let parser = Parser::with_config(language, config.clone());
        let Ok(tree) = parser.parse(&text) else {
            continue;
        };
        assert_eq!(tree.text(), text);
        assert_eq!(tree.root().range().as_usize_range(), 0..text.len());
        assert_eq!(tree.has_errors(), tree.errors().next().is_some());
    }
});
