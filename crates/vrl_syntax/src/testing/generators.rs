//! # Source Generators
//!
//! Deterministic generation of statements-language source text for
//! benchmarks and fuzzing. Property tests use `proptest` strategies instead.

/// Configuration for [`SourceGenerator`]
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Maximum operands in one binary chain
    pub max_operands: usize,
    /// Chance in percent that a statement is a declaration
    pub declaration_percent: u32,
    /// Chance in percent of a comment after a statement
    pub comment_percent: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_operands: 4,
            declaration_percent: 25,
            comment_percent: 10,
        }
    }
}

/// Seeded generator of well-formed statements-language programs.
///
/// ```rust
/// use vrl_syntax::testing::{statements_language, SourceGenerator};
///
/// let text = SourceGenerator::new(7).program(20);
/// let tree = vrl_syntax::parse(&text, &statements_language()).unwrap();
/// assert!(!tree.has_errors());
/// ```
#[derive(Debug, Clone)]
pub struct SourceGenerator {
    state: u64,
    config: GeneratorConfig,
}

impl SourceGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, GeneratorConfig::default())
    }

    #[must_use]
    pub fn with_config(seed: u64, config: GeneratorConfig) -> Self {
        Self {
            state: seed ^ 0x9e37_79b9_7f4a_7c15,
            config,
        }
    }

    /// `statements` statements separated by newlines.
    pub fn program(&mut self, statements: usize) -> String {
        let mut text = String::new();
        for _ in 0..statements {
            self.statement(&mut text);
            text.push('\n');
        }
        text
    }

    fn statement(&mut self, out: &mut String) {
        if self.chance(self.config.declaration_percent) {
            out.push_str("let ");
            self.identifier(out);
            out.push(';');
        } else {
            let operands = 1 + self.below(self.config.max_operands.max(1));
            for index in 0..operands {
                if index > 0 {
                    out.push_str(" + ");
                }
                if self.chance(30) {
                    out.push_str(&self.below(1000).to_string());
                } else {
                    self.identifier(out);
                }
            }
            out.push(';');
        }
        if self.chance(self.config.comment_percent) {
            out.push_str(" # note");
        }
    }

    fn identifier(&mut self, out: &mut String) {
        // `let` is reserved
        const NAMES: [&str; 8] = ["a", "b", "count", "total", "x_1", "value", "item", "sum"];
        out.push_str(NAMES[self.below(NAMES.len())]);
    }

    fn chance(&mut self, percent: u32) -> bool {
        self.below(100) < percent as usize
    }

    fn below(&mut self, bound: usize) -> usize {
        // xorshift64*
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        let value = self.state.wrapping_mul(0x2545_f491_4f6c_dd1d);
        (value >> 33) as usize % bound.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_text() {
        assert_eq!(SourceGenerator::new(3).program(10), SourceGenerator::new(3).program(10));
        assert_ne!(SourceGenerator::new(3).program(10), SourceGenerator::new(4).program(10));
    }

    #[test]
    fn test_program_has_requested_statements() {
        let text = SourceGenerator::new(1).program(12);
        assert_eq!(text.lines().count(), 12);
        assert!(text.lines().all(|line| line.contains(';')));
    }
}
