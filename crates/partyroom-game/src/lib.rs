//! Party game state machines for Partyroom.
//!
//! A room owns one [`GameState`] and feeds it player actions and fired
//! timers. The game answers with a [`Transition`] describing what to send
//! and which timers to arm; it never touches connections or the clock
//! itself, so every rule here is tested without a runtime.
//!
//! | Game | Type | Players |
//! |------|------|---------|
//! | Truth or dare | [`TruthOrDare`] | 2–12 |
//! | Most likely | [`QuestionGame`] ([`QuestionMode::MostLikely`]) | 3–12 |
//! | Compatibility | [`QuestionGame`] ([`QuestionMode::Compatibility`]) | 2 |

mod error;
mod media;
mod options;
mod player;
mod prompts;
mod question;
mod rules;
mod state;
mod truth_or_dare;

pub use error::GameError;
pub use media::{MediaResolver, PassthroughMedia, PrefixMedia};
pub use options::{GameOptions, ScoringRules, TurnTimings, VoterPolicy};
pub use player::{Player, leaders, scoreboard};
pub use prompts::PromptDeck;
pub use question::{QuestionGame, QuestionMode};
pub use rules::{GameAction, GameRules, GameTimer, Recipient, Transition};
pub use state::{GameState, PlayerLimits, limits};
pub use truth_or_dare::TruthOrDare;
