//! Per-user survey sessions and scoring.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::channels::UserId;
use crate::error::{Error, SurveyError};
use crate::history::{DiagnosisEntry, UserStore};
use crate::survey::{AnswerOption, QUESTION_COUNT, Question, Severity, total_score};

/// In-progress questionnaire for one user.
#[derive(Debug, Clone)]
pub struct SurveySession {
    answers: Vec<AnswerOption>,
    last_activity: Instant,
}

impl SurveySession {
    fn new() -> Self {
        Self {
            answers: Vec::with_capacity(QUESTION_COUNT),
            last_activity: Instant::now(),
        }
    }

    pub fn answers(&self) -> &[AnswerOption] {
        &self.answers
    }

    /// Index of the question awaiting an answer.
    pub fn next_index(&self) -> usize {
        self.answers.len()
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() >= QUESTION_COUNT
    }
}

/// What happens after an accepted answer.
#[derive(Debug, Clone)]
pub enum Progress {
    Next(Question),
    Completed(Outcome),
}

/// Result of a finished survey.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub total: u32,
    pub severity: Severity,
    /// Full score history including the entry just added.
    pub history: Vec<DiagnosisEntry>,
}

/// Owns every user's survey session and writes finished scores to the store.
pub struct SurveyEngine {
    sessions: Mutex<HashMap<UserId, SurveySession>>,
    store: Arc<UserStore>,
    session_ttl: Duration,
}

impl SurveyEngine {
    pub fn new(store: Arc<UserStore>, session_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            store,
            session_ttl,
        }
    }

    /// Start (or restart) a survey and return the first question.
    pub fn begin(&self, user: UserId) -> Question {
        let replaced = self.sessions().insert(user, SurveySession::new()).is_some();
        tracing::debug!(user_id = user, replaced, "Survey started");
        Question::FIRST
    }

    /// Record the answer to question `question_index`.
    ///
    /// The index must match the number of answers already collected and the
    /// label must be one of the known options; otherwise nothing changes.
    pub fn submit_answer(
        &self,
        user: UserId,
        question_index: usize,
        label: &str,
    ) -> Result<Progress, Error> {
        let option = AnswerOption::from_label(label).ok_or_else(|| SurveyError::UnknownAnswer {
            label: label.to_string(),
        })?;
        self.submit_option(user, question_index, option)
    }

    /// Same as [`submit_answer`](Self::submit_answer) with an already parsed option.
    ///
    /// The answer that completes the survey takes the session out of the map
    /// under the same lock that accepted it, so a concurrent [`begin`](Self::begin)
    /// can neither change the scored answers nor be evicted by the scoring.
    pub fn submit_option(
        &self,
        user: UserId,
        question_index: usize,
        option: AnswerOption,
    ) -> Result<Progress, Error> {
        let completed = {
            let mut sessions = self.sessions();
            let expired = sessions
                .get(&user)
                .is_some_and(|s| s.last_activity.elapsed() > self.session_ttl);
            if expired {
                sessions.remove(&user);
                tracing::debug!(user_id = user, "Dropped expired survey session");
            }

            let session = sessions.get_mut(&user).ok_or_else(|| SurveyError::NoSession {
                user_id: user.to_string(),
            })?;

            let expected = session.next_index();
            if question_index != expected || session.is_complete() {
                return Err(SurveyError::OutOfSequence {
                    expected,
                    got: question_index,
                }
                .into());
            }

            session.answers.push(option);
            session.last_activity = Instant::now();
            if session.is_complete() {
                sessions.remove(&user)
            } else {
                None
            }
        };

        if let Some(session) = completed {
            return self.record(user, session).map(Progress::Completed);
        }

        Question::get(question_index + 1)
            .map(Progress::Next)
            .ok_or_else(|| {
                SurveyError::OutOfSequence {
                    expected: QUESTION_COUNT,
                    got: question_index + 1,
                }
                .into()
            })
    }

    /// Score a session holding all answers and end it.
    ///
    /// A session still missing answers is rejected with
    /// [`SurveyError::Incomplete`] and left as it is.
    pub fn finalize(&self, user: UserId) -> Result<Outcome, Error> {
        let session = {
            let mut sessions = self.sessions();
            let session = sessions.get(&user).ok_or_else(|| SurveyError::NoSession {
                user_id: user.to_string(),
            })?;
            if session.answers.len() != QUESTION_COUNT {
                return Err(SurveyError::Incomplete {
                    answered: session.answers.len(),
                    expected: QUESTION_COUNT,
                }
                .into());
            }
            sessions.remove(&user)
        };

        match session {
            Some(session) => self.record(user, session),
            None => Err(SurveyError::NoSession {
                user_id: user.to_string(),
            }
            .into()),
        }
    }

    /// Append the total of a completed session to the user's history.
    ///
    /// The session has already left the map. If the write fails it goes back
    /// without its last answer, so pressing the last button again retries.
    /// A survey restarted in the meantime wins.
    fn record(&self, user: UserId, mut session: SurveySession) -> Result<Outcome, Error> {
        let total = total_score(&session.answers);
        let severity = Severity::from_total(total);

        let history = match self.store.append_diagnosis(user, total) {
            Ok(history) => history,
            Err(e) => {
                session.answers.pop();
                session.last_activity = Instant::now();
                self.sessions().entry(user).or_insert(session);
                return Err(e.into());
            }
        };

        tracing::info!(
            user_id = user,
            score = total,
            severity = severity.as_str(),
            "Survey completed"
        );

        Ok(Outcome {
            total,
            severity,
            history,
        })
    }

    /// Drop the user's session, returning whether one existed.
    pub fn evict(&self, user: UserId) -> bool {
        self.sessions().remove(&user).is_some()
    }

    /// Drop sessions idle for longer than the configured TTL.
    pub fn evict_expired(&self) -> usize {
        let ttl = self.session_ttl;
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, s| s.last_activity.elapsed() <= ttl);
        before - sessions.len()
    }

    pub fn session(&self, user: UserId) -> Option<SurveySession> {
        self.sessions().get(&user).cloned()
    }

    pub fn is_active(&self, user: UserId) -> bool {
        self.sessions().contains_key(&user)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions().len()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<UserId, SurveySession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
