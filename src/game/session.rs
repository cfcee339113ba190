// src/game/session.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};

use crate::{
    config::{POINTS_PER_CORRECT_ANSWER, QUIZ_SESSION_SIZE},
    game::backend::{ClientError, QuizBackend, ScoreReport},
    models::question::{CatalogEntry, ImageSlot, StoredImage},
};

/// Where a quiz session is in its play-through.
///
/// `Presenting(i)` waits for an answer to question `i`; `Checking(i)` has
/// checked it and waits for the player to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    Idle,
    Loading,
    Presenting(usize),
    Checking(usize),
    Finished,
}

/// Label of the advance action once a question has been checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceLabel {
    NextQuestion,
    Finish,
}

impl fmt::Display for AdvanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvanceLabel::NextQuestion => write!(f, "Next Question"),
            AdvanceLabel::Finish => write!(f, "Finish"),
        }
    }
}

/// The message shown to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    None,
    NoGameData,
    EnterAnswer,
    Correct,
    Incorrect { expected: String },
    GameOver(ScoreReport),
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::None => Ok(()),
            Feedback::NoGameData => write!(f, "No game data available. Please try again later."),
            Feedback::EnterAnswer => write!(f, "Please enter an answer."),
            Feedback::Correct => write!(f, "Correct! +{} points", POINTS_PER_CORRECT_ANSWER),
            Feedback::Incorrect { expected } => write!(f, "Incorrect! Correct answer: {}", expected),
            Feedback::GameOver(report) => write!(
                f,
                "Game Over! Final Score: {} | Time: {}m {}s | Correct Answers: {}/{}",
                report.score,
                report.time_spent_seconds / 60,
                report.time_spent_seconds % 60,
                report.correct,
                report.total
            ),
        }
    }
}

/// Result of checking an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The session was not waiting for an answer.
    Ignored,
    /// Blank input; nothing changed.
    EmptyInput,
    Correct,
    Incorrect { expected: String },
}

/// Result of moving to the next question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The session was not in a state that can advance.
    Ignored,
    Presented(usize),
    Finished(ScoreReport),
}

/// What an Enter keypress did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnterAction {
    Checked(CheckOutcome),
    Advanced(Step),
}

#[derive(Debug)]
pub enum QuizError {
    /// `start` was called while a play-through is running.
    InProgress,
    /// The catalog is empty.
    NoQuestions,
    /// The catalog could not be fetched.
    Catalog(ClientError),
}

impl fmt::Display for QuizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizError::InProgress => write!(f, "a quiz is already running"),
            QuizError::NoQuestions => write!(f, "no questions available"),
            QuizError::Catalog(e) => write!(f, "could not load questions: {}", e),
        }
    }
}

impl std::error::Error for QuizError {}

/// Images of the question currently on screen. A slot stays empty when its
/// fetch failed.
#[derive(Debug, Clone, Default)]
pub struct ImagePair {
    pub first: Option<StoredImage>,
    pub second: Option<StoredImage>,
}

/// One play-through of the quiz.
///
/// All state of the client lives here; each transition is a method taking the
/// backend it needs explicitly.
#[derive(Debug)]
pub struct QuizSession {
    state: QuizState,
    session_size: usize,
    questions: Vec<CatalogEntry>,
    score: i64,
    correct: i64,
    started_at: Option<DateTime<Utc>>,
    feedback: Feedback,
    input_enabled: bool,
    advance_label: AdvanceLabel,
    images: ImagePair,
    high_score: Option<i64>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    pub fn new() -> Self {
        Self::with_size(QUIZ_SESSION_SIZE)
    }

    /// A session drawing at most `session_size` questions.
    pub fn with_size(session_size: usize) -> Self {
        Self {
            state: QuizState::Idle,
            session_size,
            questions: Vec::new(),
            score: 0,
            correct: 0,
            started_at: None,
            feedback: Feedback::None,
            input_enabled: false,
            advance_label: AdvanceLabel::NextQuestion,
            images: ImagePair::default(),
            high_score: None,
        }
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn questions(&self) -> &[CatalogEntry] {
        &self.questions
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn correct(&self) -> i64 {
        self.correct
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn advance_label(&self) -> AdvanceLabel {
        self.advance_label
    }

    pub fn images(&self) -> &ImagePair {
        &self.images
    }

    /// Last high score reported by the server, if a session was submitted.
    pub fn high_score(&self) -> Option<i64> {
        self.high_score
    }

    /// The question on screen, in `Presenting` or `Checking`.
    pub fn current_question(&self) -> Option<&CatalogEntry> {
        match self.state {
            QuizState::Presenting(i) | QuizState::Checking(i) => self.questions.get(i),
            _ => None,
        }
    }

    /// Whether the answer check is available (only while presenting).
    pub fn can_check(&self) -> bool {
        matches!(self.state, QuizState::Presenting(_))
    }

    /// Whether the advance action is available (only after a check).
    pub fn can_advance(&self) -> bool {
        matches!(self.state, QuizState::Checking(_))
    }

    /// Fetches the catalog and begins a play-through.
    ///
    /// Picks a uniformly random subset of at most `session_size` questions.
    /// When the catalog is empty or unavailable the session shows a message
    /// and goes back to `Idle`.
    pub async fn start<B, R>(&mut self, backend: &B, rng: &mut R) -> Result<Step, QuizError>
    where
        B: QuizBackend + ?Sized,
        R: Rng + ?Sized,
    {
        if !matches!(self.state, QuizState::Idle | QuizState::Finished) {
            return Err(QuizError::InProgress);
        }

        self.state = QuizState::Loading;

        let mut candidates = match backend.game_data().await {
            Ok(questions) => questions,
            Err(e) => {
                tracing::error!("Error fetching game data: {}", e);
                self.abort_start();
                return Err(QuizError::Catalog(e));
            }
        };

        if candidates.is_empty() {
            self.abort_start();
            return Err(QuizError::NoQuestions);
        }

        candidates.shuffle(rng);
        candidates.truncate(self.session_size);

        self.questions = candidates;
        self.score = 0;
        self.correct = 0;
        self.started_at = Some(Utc::now());
        self.feedback = Feedback::None;

        Ok(self.load_next(backend).await)
    }

    fn abort_start(&mut self) {
        self.state = QuizState::Idle;
        self.feedback = Feedback::NoGameData;
        self.questions.clear();
    }

    /// Moves to the next question, or finishes after the last one.
    ///
    /// Does nothing outside of a running play-through, so a session finishes
    /// exactly once.
    pub async fn load_next<B>(&mut self, backend: &B) -> Step
    where
        B: QuizBackend + ?Sized,
    {
        let next = match self.state {
            QuizState::Loading => 0,
            QuizState::Presenting(i) | QuizState::Checking(i) => i + 1,
            QuizState::Idle | QuizState::Finished => return Step::Ignored,
        };

        if next >= self.questions.len() {
            return Step::Finished(self.finish(backend).await);
        }

        let (user_id, question_id) = {
            let question = &self.questions[next];
            (question.user_id, question.question_id)
        };

        let (first, second) = tokio::join!(
            backend.question_image(user_id, question_id, ImageSlot::First),
            backend.question_image(user_id, question_id, ImageSlot::Second),
        );

        self.images = ImagePair {
            first: first
                .map_err(|e| tracing::warn!("Image 1 of question {} failed: {}", question_id, e))
                .ok(),
            second: second
                .map_err(|e| tracing::warn!("Image 2 of question {} failed: {}", question_id, e))
                .ok(),
        };
        self.feedback = Feedback::None;
        self.input_enabled = true;
        self.advance_label = AdvanceLabel::NextQuestion;
        self.state = QuizState::Presenting(next);

        Step::Presented(next)
    }

    /// Checks a guess against the current question.
    ///
    /// Case-insensitive exact match after trimming the input. A correct guess
    /// scores once; afterwards the session waits for the player to advance.
    pub fn check_answer(&mut self, raw_input: &str) -> CheckOutcome {
        let QuizState::Presenting(index) = self.state else {
            return CheckOutcome::Ignored;
        };

        let guess = raw_input.trim();
        if guess.is_empty() {
            self.feedback = Feedback::EnterAnswer;
            return CheckOutcome::EmptyInput;
        }

        let expected = self.questions[index].answer.clone();
        let outcome = if guess.to_lowercase() == expected.to_lowercase() {
            self.score += POINTS_PER_CORRECT_ANSWER;
            self.correct += 1;
            self.feedback = Feedback::Correct;
            CheckOutcome::Correct
        } else {
            self.feedback = Feedback::Incorrect {
                expected: expected.clone(),
            };
            self.input_enabled = false;
            CheckOutcome::Incorrect { expected }
        };

        self.advance_label = if index + 1 >= self.questions.len() {
            AdvanceLabel::Finish
        } else {
            AdvanceLabel::NextQuestion
        };
        self.state = QuizState::Checking(index);

        outcome
    }

    /// The "Next Question" / "Finish" action. Only available after a check.
    pub async fn advance<B>(&mut self, backend: &B) -> Step
    where
        B: QuizBackend + ?Sized,
    {
        if !self.can_advance() {
            return Step::Ignored;
        }
        self.load_next(backend).await
    }

    /// Enter in the answer field: checks while an answer is awaited, advances
    /// otherwise.
    pub async fn on_enter<B>(&mut self, backend: &B, raw_input: &str) -> EnterAction
    where
        B: QuizBackend + ?Sized,
    {
        if self.can_check() {
            EnterAction::Checked(self.check_answer(raw_input))
        } else {
            EnterAction::Advanced(self.advance(backend).await)
        }
    }

    /// Ends the play-through and submits the tally.
    ///
    /// A failed submission is logged and leaves the known high score as it
    /// was. The session is then ready for another `start`.
    async fn finish<B>(&mut self, backend: &B) -> ScoreReport
    where
        B: QuizBackend + ?Sized,
    {
        let time_spent_seconds = self
            .started_at
            .map(|started| (Utc::now() - started).num_seconds().max(0))
            .unwrap_or(0);

        let report = ScoreReport {
            score: self.score,
            correct: self.correct,
            total: self.questions.len() as i64,
            time_spent_seconds,
        };

        self.state = QuizState::Finished;
        self.feedback = Feedback::GameOver(report);
        self.input_enabled = false;

        match backend.submit_score(&report).await {
            Ok(high_score) => self.high_score = Some(high_score),
            Err(e) => tracing::error!("Error submitting score: {}", e),
        }

        self.questions.clear();
        self.images = ImagePair::default();
        self.started_at = None;

        report
    }
}
