//! User record persistence.
//!
//! Every user's name, screening score history and mood diary live in a single
//! JSON document keyed by user id. The whole document is read, mutated and
//! rewritten on every change.

mod record;
mod store;

pub use record::{DiagnosisEntry, MoodEntry, Timestamp, UserRecord};
pub use store::{MOOD_SCORE_MAX, MOOD_SCORE_MIN, UserStore, Users};
