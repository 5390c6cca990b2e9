//! Property tests for the heuristic fallback

use dn_core::heuristic;
use dn_core::HeuristicConfig;
use proptest::prelude::*;

proptest! {
    #[test]
    fn summary_never_exceeds_word_budget(text in "[a-zA-Z ,.\n]{0,400}", words in 1usize..40) {
        let cfg = HeuristicConfig::default().with_summary_words(words);
        let summary = heuristic::summarize(&text, &cfg);
        prop_assert!(summary.split_whitespace().count() <= words);
        prop_assert_eq!(summary.trim(), summary.as_str());
    }

    #[test]
    fn tags_are_normalised_and_bounded(text in "[a-zA-Z0-9!?' \n]{0,400}") {
        let cfg = HeuristicConfig::default();
        let tags = heuristic::tags(&text, &cfg);
        prop_assert!(tags.len() <= cfg.max_tags);
        for tag in &tags {
            prop_assert!(tag.len() >= cfg.min_tag_len);
            prop_assert!(tag.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            prop_assert!(!cfg.stop_words.contains(tag));
        }
    }

    #[test]
    fn heuristic_is_deterministic(text in "[a-z ]{0,200}") {
        let cfg = HeuristicConfig::default();
        prop_assert_eq!(heuristic::tags(&text, &cfg), heuristic::tags(&text, &cfg));
        prop_assert_eq!(heuristic::summarize(&text, &cfg), heuristic::summarize(&text, &cfg));
    }
}
