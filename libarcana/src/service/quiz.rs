//! Quiz session and flows

use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::events::{Event, Flow};
use super::navigation::Page;
use super::notifications::Severity;
use super::ArcanaService;
use crate::error::{PreconditionError, Result};
use crate::gateway::{QuizAnswer, QuizScore, QuizSubmission};
use crate::profile::Achievement;
use crate::rewards::{rewards_for, Reward};
use crate::types::{QuizQuestion, QuizResult};

/// Questions taken from the front of the bank for each quiz
pub const QUIZ_LENGTH: usize = 5;

/// An open quiz: its questions and the answers given so far
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    answers: BTreeMap<u32, usize>,
}

impl QuizSession {
    /// Open a quiz over the first [`QUIZ_LENGTH`] questions of `bank`
    ///
    /// Questions repeating an earlier id are skipped.
    pub fn from_bank(bank: &[QuizQuestion]) -> Option<Self> {
        let mut seen = BTreeSet::new();
        let questions: Vec<QuizQuestion> = bank
            .iter()
            .filter(|question| seen.insert(question.id))
            .take(QUIZ_LENGTH)
            .cloned()
            .collect();

        if questions.is_empty() {
            return None;
        }
        Some(Self {
            questions,
            answers: BTreeMap::new(),
        })
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn answer_for(&self, question_id: u32) -> Option<usize> {
        self.answers.get(&question_id).copied()
    }

    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn is_complete(&self) -> bool {
        self.answered() == self.total()
    }

    /// Record an answer; a later answer to the same question replaces it
    pub fn answer(
        &mut self,
        question_id: u32,
        option: usize,
    ) -> std::result::Result<(), PreconditionError> {
        let question = self
            .questions
            .iter()
            .find(|question| question.id == question_id)
            .ok_or(PreconditionError::UnknownQuestion(question_id))?;

        if option >= question.options.len() {
            return Err(PreconditionError::InvalidOption {
                question_id,
                option,
            });
        }

        self.answers.insert(question_id, option);
        Ok(())
    }

    /// Answers in question order, with correctness graded locally
    pub fn graded_answers(&self) -> Vec<QuizAnswer> {
        self.questions
            .iter()
            .filter_map(|question| {
                self.answer_for(question.id).map(|answer| QuizAnswer {
                    question_id: question.id,
                    answer,
                    correct: answer == question.correct,
                })
            })
            .collect()
    }
}

/// Result of a submitted quiz as seen by the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizOutcome {
    /// Authoritative score from the service
    pub score: QuizScore,
    pub reward: Reward,
    /// Locally graded answers, for display
    pub answers: Vec<QuizAnswer>,
    /// New level, if the reward crossed a level boundary
    pub level_up: Option<u32>,
}

impl ArcanaService {
    /// Open a quiz over the first questions of the bank and show it
    pub fn start_quiz(&mut self) -> Result<&QuizSession> {
        self.ensure_ready()?;

        let session = QuizSession::from_bank(&self.catalog.quiz_questions)
            .ok_or_else(|| self.reject(PreconditionError::NoQuizQuestions))?;

        debug!(questions = session.total(), "Starting quiz");
        // Any quiz already in progress is replaced
        self.quiz = Some(session);
        self.go(Page::Quiz);

        self.quiz
            .as_ref()
            .ok_or_else(|| PreconditionError::NoActiveQuiz.into())
    }

    /// Upsert the answer to one question of the active quiz
    pub fn answer_question(&mut self, question_id: u32, option: usize) -> Result<()> {
        let outcome = match self.quiz.as_mut() {
            Some(session) => session
                .answer(question_id, option)
                .map(|()| (session.answered(), session.total())),
            None => Err(PreconditionError::NoActiveQuiz),
        };

        let (answered, total) = outcome.map_err(|e| self.reject(e))?;
        self.event_bus.emit(Event::QuizAnswered {
            question_id,
            option,
            answered,
            total,
        });
        Ok(())
    }

    /// Submit the active quiz once every question is answered
    ///
    /// On failure the session is kept so the user can retry.
    pub async fn submit_quiz(&mut self) -> Result<QuizOutcome> {
        let session = match self.quiz.as_ref() {
            Some(session) => session,
            None => return Err(self.reject(PreconditionError::NoActiveQuiz)),
        };
        if !session.is_complete() {
            let incomplete = PreconditionError::QuizIncomplete {
                answered: session.answered(),
                total: session.total(),
            };
            return Err(self.reject(incomplete));
        }

        let answers = session.graded_answers();
        let submission = QuizSubmission {
            answers: answers.clone(),
            user_id: self.profile.id.clone(),
        };

        debug!(answers = answers.len(), "Submitting quiz");
        self.event_bus.emit(Event::FlowStarted {
            flow: Flow::QuizSubmit,
        });

        let score = match self.gateway.submit_quiz(&submission).await {
            Ok(score) => score,
            Err(err) => {
                warn!("Quiz submission failed: {}", err);
                let message = err.service_message().unwrap_or("Error submitting quiz");
                self.notify(message, Severity::Error);
                self.finish(Flow::QuizSubmit, false);
                return Err(err);
            }
        };

        let reward = rewards_for(score.percentage);
        let (old_level, new_level) = self.profile.add_experience(reward.experience);
        self.profile.set_balance(score.new_balance);
        self.profile.record_quiz(QuizResult {
            score: score.score,
            total: score.total,
            percentage: score.percentage,
            coins_earned: score.coins_earned,
            new_balance: score.new_balance,
            experience_earned: reward.experience,
            timestamp: Utc::now(),
        });
        self.save_profile();

        self.quiz = None;
        self.go(Page::Home);

        info!(
            score = score.score,
            total = score.total,
            percentage = score.percentage,
            experience = reward.experience,
            "Quiz completed"
        );
        self.notify(
            format!(
                "Quiz completed! Score: {}/{} ({:.1}%). You earned {} coins and {} XP!",
                score.score, score.total, score.percentage, score.coins_earned, reward.experience
            ),
            Severity::Success,
        );

        let level_up = (new_level > old_level).then_some(new_level);
        if let Some(level) = level_up {
            self.notify(format!("Level up! You are now level {}", level), Severity::Info);
        }

        self.award_achievements(&[Achievement::PerfectQuiz, Achievement::CoinCollector]);
        self.finish(Flow::QuizSubmit, true);

        Ok(QuizOutcome {
            score,
            reward,
            answers,
            level_up,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(count: u32) -> Vec<QuizQuestion> {
        (1..=count)
            .map(|id| QuizQuestion {
                id,
                question: format!("Question {}", id),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct: 1,
            })
            .collect()
    }

    #[test]
    fn test_session_takes_first_questions_in_order() {
        let session = QuizSession::from_bank(&bank(8)).unwrap();
        let ids: Vec<u32> = session.questions().iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_small_bank_uses_all_questions() {
        let session = QuizSession::from_bank(&bank(3)).unwrap();
        assert_eq!(session.total(), 3);
        assert!(QuizSession::from_bank(&[]).is_none());
    }

    #[test]
    fn test_answer_is_last_write_wins() {
        let mut session = QuizSession::from_bank(&bank(5)).unwrap();
        session.answer(2, 0).unwrap();
        session.answer(2, 2).unwrap();
        assert_eq!(session.answered(), 1);
        assert_eq!(session.answer_for(2), Some(2));
    }

    #[test]
    fn test_answer_validation() {
        let mut session = QuizSession::from_bank(&bank(5)).unwrap();
        assert_eq!(
            session.answer(9, 0),
            Err(PreconditionError::UnknownQuestion(9))
        );
        assert_eq!(
            session.answer(1, 3),
            Err(PreconditionError::InvalidOption {
                question_id: 1,
                option: 3
            })
        );
        assert_eq!(session.answered(), 0);
    }

    #[test]
    fn test_completion_and_grading() {
        let mut session = QuizSession::from_bank(&bank(5)).unwrap();
        for id in 1..=4 {
            session.answer(id, 1).unwrap();
        }
        assert!(!session.is_complete());

        session.answer(5, 0).unwrap();
        assert!(session.is_complete());

        let graded = session.graded_answers();
        assert_eq!(graded.len(), 5);
        assert_eq!(graded.iter().filter(|a| a.correct).count(), 4);
        assert!(!graded[4].correct);
    }

    #[test]
    fn test_repeated_ids_do_not_block_completion() {
        let mut questions = bank(6);
        questions[1].id = 1;
        questions[1].question = "Duplicate of question 1".to_string();

        let mut session = QuizSession::from_bank(&questions).unwrap();
        let ids: Vec<u32> = session.questions().iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 3, 4, 5, 6]);

        for id in ids {
            session.answer(id, 1).unwrap();
        }
        assert_eq!(session.answered(), session.total());
        assert!(session.is_complete());
        assert_eq!(session.graded_answers().len(), 5);
    }
}
