// src/game/mod.rs

//! Client side of the quiz: the play-through state machine and the server
//! calls it depends on.

pub mod backend;
pub mod http;
pub mod session;

pub use backend::{ClientError, QuizBackend, ScoreReport};
pub use http::HttpBackend;
pub use session::{
    AdvanceLabel, CheckOutcome, EnterAction, Feedback, QuizError, QuizSession, QuizState, Step,
};
