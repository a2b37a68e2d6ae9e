use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::TryRecvError;

use recall_lib::session::{ActiveQuestion, QuestionPhase, SessionController, SessionEvent};

use crate::app::App;
use crate::render::terminal::{self, paint, Color};

pub async fn run(
    app: &App,
    learning: Option<&str>,
    native: Option<&str>,
    videos: Option<&str>,
    use_color: bool,
) -> Result<()> {
    let mut session = app.session();
    let mut events = session.subscribe();

    if learning.is_some() || native.is_some() {
        let learning = learning.unwrap_or(&app.config.learning_lang).to_string();
        let native = native.unwrap_or(&app.config.native_lang).to_string();
        session.set_languages(&learning, &native);
    }

    session.start();
    if let Some(word) = videos {
        println!("Preparing videos for {}...", word);
        session.prepare_video_questions(word);
    }
    session.run_until_idle().await;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut answered = 0usize;

    loop {
        print_events(&mut events, use_color);
        print_notices(&mut session, use_color);

        let Some(question) = session.current().cloned() else {
            println!("Nothing left to practice.");
            break;
        };
        print_question(&question, session.queue().count(), use_color);

        let Some(line) = input.next_line().await.context("Failed to read answer")? else {
            break;
        };
        let correct = match line.trim().to_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            "q" | "quit" => break,
            _ => {
                println!("Answer y (knew it), n (didn't) or q (quit).");
                continue;
            }
        };

        session.answer(correct)?;
        answered += 1;
        session.run_until_idle().await;

        if let Some(badge) = session.take_celebration() {
            let message = format!("Badge earned: {}", badge.name);
            println!("{}", paint(&message, Color::YELLOW, use_color));
        }
        if session.phase().can_advance() {
            session.advance()?;
            session.run_until_idle().await;
        }
    }

    println!("Answered {}, score {}", answered, session.score());
    Ok(())
}

fn print_question(question: &ActiveQuestion, queued: usize, use_color: bool) {
    println!();
    println!(
        "{}  {}",
        paint(&question.item.word, Color::BOLD, use_color),
        paint(
            &format!("({}, {} queued)", question.item.question_type, queued),
            Color::DIM,
            use_color,
        )
    );
    if let Some(retention) = question.retention {
        println!("  {}", terminal::retention_bar(retention, 20, use_color));
    }
    if let Some(media) = &question.item.media {
        println!("  video: {}", media);
    }
    if question.phase == QuestionPhase::Presented {
        print!("Did you know it? [y/n/q] ");
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
}

fn print_events(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>, use_color: bool) {
    loop {
        match events.try_recv() {
            Ok(SessionEvent::Feedback(feedback)) => {
                let (text, color) = if feedback.correct {
                    ("correct", Color::GREEN)
                } else {
                    ("missed", Color::RED)
                };
                println!("{}", paint(text, color, use_color));
            }
            Ok(SessionEvent::ScoreChanged { score, delta }) => {
                println!("Score {:+} → {}", delta, score);
            }
            Ok(SessionEvent::VideosComplete { word, ready, failed }) => {
                println!("Videos for {}: {} ready, {} failed", word, ready, failed);
            }
            Ok(_) => {}
            Err(TryRecvError::Lagged(skipped)) => {
                log::debug!("Skipped {} session events", skipped);
            }
            Err(_) => break,
        }
    }
}

fn print_notices(session: &mut SessionController, use_color: bool) {
    for notice in session.notices() {
        println!("{}", paint(&notice.message, Color::RED, use_color));
        session.dismiss_notice(notice.id);
    }
}
