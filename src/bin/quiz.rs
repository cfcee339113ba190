// src/bin/quiz.rs

//! Terminal quiz client. Every line typed is an Enter keypress in the answer
//! field: it checks the answer, or moves on once the answer was checked.

use std::env;

use dotenvy::dotenv;
use picquiz::game::{
    CheckOutcome, EnterAction, HttpBackend, QuizError, QuizSession, QuizState, Step,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

fn describe_question(session: &QuizSession) {
    let QuizState::Presenting(index) = session.state() else {
        return;
    };
    let Some(question) = session.current_question() else {
        return;
    };

    println!();
    println!(
        "Question {}/{} (by {}) | score {}",
        index + 1,
        session.questions().len(),
        question.username,
        session.score()
    );

    let images = session.images();
    for (number, image) in [(1, &images.first), (2, &images.second)] {
        match image {
            Some(image) => println!("  image {}: {} ({} bytes)", number, image.content_type, image.data.len()),
            None => println!("  image {}: unavailable", number),
        }
    }
    println!("Your answer:");
}

fn report_step(session: &QuizSession, step: Step) {
    match step {
        Step::Presented(_) => describe_question(session),
        Step::Finished(_) => {
            println!("{}", session.feedback());
            if let Some(high_score) = session.high_score() {
                println!("High score: {}", high_score);
            }
            println!("Press Enter to play again, or type 'q' to quit.");
        }
        Step::Ignored => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let server = env::var("QUIZ_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let email = env::var("QUIZ_EMAIL")?;
    let password = env::var("QUIZ_PASSWORD")?;

    let backend = HttpBackend::new(&server)?;
    backend.login(&email, &password).await?;
    println!("Logged in as {}. Press Enter to start, or type 'q' to quit.", email);

    let mut session = QuizSession::new();
    let mut rng = rand::thread_rng();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match session.state() {
            QuizState::Idle | QuizState::Finished => {
                if line.trim().eq_ignore_ascii_case("q") {
                    break;
                }
                match session.start(&backend, &mut rng).await {
                    Ok(step) => report_step(&session, step),
                    Err(QuizError::InProgress) => {}
                    Err(e) => {
                        tracing::warn!("Could not start: {}", e);
                        println!("{}", session.feedback());
                    }
                }
            }
            QuizState::Presenting(_) | QuizState::Checking(_) => {
                match session.on_enter(&backend, &line).await {
                    EnterAction::Checked(CheckOutcome::Ignored) => {}
                    EnterAction::Checked(_) => {
                        println!("{}", session.feedback());
                        if session.can_advance() {
                            println!("Press Enter for: {}", session.advance_label());
                        }
                    }
                    EnterAction::Advanced(step) => report_step(&session, step),
                }
            }
            QuizState::Loading => {}
        }
    }

    backend.logout().await?;
    Ok(())
}
