//! Random contiguous word snippets drawn from a post body.

use rand::Rng;

use crate::error::{ServiceError, ServiceResult};

/// Picks a random contiguous run of words whose length is bounded by
/// `min_words`/`max_words`.
///
/// * more than `min_words` words: length in `[min_words, min(max_words, n)]`
/// * `1..=min_words` words: length in `[1, n]`
/// * no words: the placeholder `Quote {ordinal}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetGenerator {
    min_words: usize,
    max_words: usize,
}

impl SnippetGenerator {
    pub fn new(min_words: usize, max_words: usize) -> ServiceResult<Self> {
        if min_words == 0 {
            return Err(ServiceError::Config(
                "snippet min_words must be at least 1".to_string(),
            ));
        }
        if min_words > max_words {
            return Err(ServiceError::Config(format!(
                "snippet min_words ({}) exceeds max_words ({})",
                min_words, max_words
            )));
        }
        Ok(Self {
            min_words,
            max_words,
        })
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Snippet of `text` for the `ordinal`-th record (1-based, only used by
    /// the placeholder).
    pub fn generate<R: Rng + ?Sized>(&self, text: &str, ordinal: usize, rng: &mut R) -> String {
        let words = tokenize(text);
        self.generate_from_words(&words, ordinal, rng)
    }

    /// Same as [`generate`](Self::generate) over an already tokenized body.
    pub fn generate_from_words<R: Rng + ?Sized>(
        &self,
        words: &[&str],
        ordinal: usize,
        rng: &mut R,
    ) -> String {
        let n = words.len();
        if n == 0 {
            return placeholder(ordinal);
        }

        // n == min_words deliberately takes the short-post branch.
        let len = if n > self.min_words {
            rng.gen_range(self.min_words..=self.max_words.min(n))
        } else {
            rng.gen_range(1..=n)
        };
        let start = rng.gen_range(0..=n - len);
        words[start..start + len].join(" ")
    }
}

/// Whitespace tokenization with empty tokens discarded.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

fn placeholder(ordinal: usize) -> String {
    format!("Quote {}", ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn is_contiguous_run(snippet: &str, text: &str) -> bool {
        let words = tokenize(text);
        let part = tokenize(snippet);
        !part.is_empty() && words.windows(part.len()).any(|w| w == part.as_slice())
    }

    #[test]
    fn test_rejects_bad_bounds() {
        assert!(SnippetGenerator::new(0, 5).is_err());
        assert!(SnippetGenerator::new(6, 5).is_err());
        assert!(SnippetGenerator::new(3, 3).is_ok());
    }

    #[test]
    fn test_long_body_length_within_bounds() {
        let generator = SnippetGenerator::new(3, 7).unwrap();
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..2000 {
            let snippet = generator.generate(text, i + 1, &mut rng);
            let count = tokenize(&snippet).len();
            assert!((3..=7).contains(&count), "{} words in {:?}", count, snippet);
            assert!(is_contiguous_run(&snippet, text));
        }
    }

    #[test]
    fn test_five_word_body_yields_three_to_five_words() {
        let generator = SnippetGenerator::new(3, 7).unwrap();
        let text = "the quick brown fox jumps";
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen_lengths = std::collections::BTreeSet::new();
        for i in 0..1000 {
            let snippet = generator.generate(text, i + 1, &mut rng);
            let count = tokenize(&snippet).len();
            assert!((3..=5).contains(&count));
            assert!(text.contains(&snippet));
            seen_lengths.insert(count);
        }
        assert_eq!(seen_lengths.into_iter().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn test_short_body_uses_one_to_n() {
        let generator = SnippetGenerator::new(3, 7).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for text in ["solo", "two words", "  padded \t words\n "] {
            let n = tokenize(text).len();
            for i in 0..500 {
                let snippet = generator.generate(text, i + 1, &mut rng);
                let count = tokenize(&snippet).len();
                assert!((1..=n).contains(&count));
                assert!(is_contiguous_run(&snippet, text));
            }
        }
    }

    #[test]
    fn test_body_of_exactly_min_words_can_yield_single_word() {
        // Exactly min_words falls into the short-post branch.
        let generator = SnippetGenerator::new(3, 7).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let lengths: std::collections::BTreeSet<usize> = (0..500)
            .map(|i| tokenize(&generator.generate("alpha beta gamma", i + 1, &mut rng)).len())
            .collect();
        assert!(lengths.contains(&1));
        assert!(lengths.iter().all(|len| (1..=3).contains(len)));
    }

    #[test]
    fn test_empty_body_returns_placeholder() {
        let generator = SnippetGenerator::new(3, 7).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(generator.generate("", 1, &mut rng), "Quote 1");
        assert_eq!(generator.generate(" \n\t ", 42, &mut rng), "Quote 42");
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let generator = SnippetGenerator::new(3, 7).unwrap();
        let text = "a b c d e f g h i j k l m n o p";
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50)
                .map(|i| generator.generate(text, i + 1, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
    }
}
