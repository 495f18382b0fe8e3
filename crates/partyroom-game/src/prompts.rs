//! Prompt decks and the built-in prompt lists.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;

pub const BUILTIN_TRUTHS: &[&str] = &[
    "What is the most embarrassing thing you have done in public?",
    "What is a secret you have never told anyone in this room?",
    "Who was your first crush?",
    "What is the biggest lie you have ever told?",
    "What is your most irrational fear?",
    "What is the worst gift you have ever received?",
    "What is something you pretend to like but actually hate?",
    "What is the last thing you searched for on your phone?",
    "Have you ever blamed someone else for something you did?",
    "What is the most childish thing you still do?",
    "Which person in this room would you trade lives with for a day?",
    "What habit of yours would you most like to break?",
];

pub const BUILTIN_DARES: &[&str] = &[
    "Do ten push-ups.",
    "Sing the chorus of the last song you listened to.",
    "Speak in an accent until your next turn.",
    "Do your best impression of another player.",
    "Show the last photo in your camera roll.",
    "Dance with no music for thirty seconds.",
    "Balance a spoon on your nose for ten seconds.",
    "Tell a joke; if nobody laughs, tell another one.",
    "Talk like a news anchor for the next minute.",
    "Draw a portrait of the player to your left without looking.",
    "Hold a plank for thirty seconds.",
    "Eat a spoonful of a condiment of the group's choice.",
];

pub const BUILTIN_MOST_LIKELY: &[&str] = &[
    "Who is most likely to become famous?",
    "Who is most likely to forget their own birthday?",
    "Who is most likely to survive a zombie apocalypse?",
    "Who is most likely to cry during a movie?",
    "Who is most likely to get lost in their own city?",
    "Who is most likely to win a reality show?",
    "Who is most likely to adopt ten cats?",
    "Who is most likely to text the wrong person?",
    "Who is most likely to start a business?",
    "Who is most likely to laugh at the wrong moment?",
];

pub const BUILTIN_COMPATIBILITY: &[&str] = &[
    "Beach holiday or mountain cabin?",
    "What is the best pizza topping?",
    "Morning person or night owl?",
    "Which season is the best?",
    "Cats or dogs?",
    "What would you order for a last meal?",
    "Which city would you move to tomorrow?",
    "Coffee or tea?",
    "What is the best movie genre?",
    "Stay in or go out on a Friday night?",
];

/// A list of prompts drawn without repetition until every prompt has been
/// used, then reshuffled.
#[derive(Debug, Clone)]
pub struct PromptDeck {
    prompts: Vec<String>,
    used: HashSet<usize>,
}

impl PromptDeck {
    /// Builds a deck from `custom`, or from `builtin` when `custom` has no
    /// non-blank entry.
    pub fn or_builtin(custom: &[String], builtin: &[&str]) -> Self {
        let prompts: Vec<String> = custom
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if prompts.is_empty() {
            Self::new(builtin.iter().map(|p| p.to_string()).collect())
        } else {
            Self::new(prompts)
        }
    }

    pub fn new(prompts: Vec<String>) -> Self {
        Self {
            prompts,
            used: HashSet::new(),
        }
    }

    /// Draws a prompt uniformly among the ones not yet used. Once the deck
    /// is exhausted it starts over.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.prompts.is_empty() {
            return None;
        }
        if self.used.len() >= self.prompts.len() {
            self.used.clear();
        }
        let unused: Vec<usize> = (0..self.prompts.len())
            .filter(|i| !self.used.contains(i))
            .collect();
        let idx = *unused.choose(rng)?;
        self.used.insert(idx);
        self.prompts.get(idx).cloned()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_draws_every_prompt_once_before_repeating() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut deck = PromptDeck::new(vec!["a".into(), "b".into(), "c".into()]);

        let mut seen: Vec<String> = (0..3).filter_map(|_| deck.draw(&mut rng)).collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);

        // Exhausted: the next three draws are a fresh cycle.
        let mut again: Vec<String> = (0..3).filter_map(|_| deck.draw(&mut rng)).collect();
        again.sort();
        assert_eq!(again, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_blank_custom_prompts_fall_back_to_builtin() {
        let deck = PromptDeck::or_builtin(&["  ".into()], BUILTIN_DARES);
        assert_eq!(deck.len(), BUILTIN_DARES.len());

        let deck = PromptDeck::or_builtin(&[" Sing ".into()], BUILTIN_DARES);
        assert_eq!(deck.len(), 1);
    }

    #[test]
    fn test_empty_deck_draws_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(PromptDeck::new(Vec::new()).draw(&mut rng), None);
    }
}
