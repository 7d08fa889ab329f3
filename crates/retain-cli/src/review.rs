//! Interactive review session
//!
//! Enter reveals the answer, `1`-`4` rates it. Anything typed after the key
//! is kept as the item's note, e.g. `3 think of "perro" as "pair of"`.
//! `q` pauses the session at either prompt.

use std::io::Write;

use chrono::Utc;
use colored::{ColoredString, Colorize};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast;

use retain_core::{
    DeckFilter, PreviewResults, Rating, SessionController, SessionError, SessionEvent,
    SessionState, SessionSummary,
};

use crate::{phase_label, short_id, AppContext};

type Input = Lines<BufReader<Stdin>>;

/// Run review command
pub async fn run_review(ctx: &AppContext, deck: DeckFilter) -> anyhow::Result<()> {
    let scheduler = ctx.config.build_scheduler()?;
    let (events, rx) = broadcast::channel(ctx.config.event_capacity);
    let log_task = tokio::spawn(log_events(rx));

    let session =
        SessionController::start_with_events(ctx.store.clone(), scheduler, deck, events, Utc::now())
            .await?;
    session.on_session_complete(|summary| {
        println!();
        println!(
            "{} {} reviewed",
            "Session complete!".green().bold(),
            summary.reviewed
        );
    });

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let finished = review_loop(&session, &mut input).await?;

    if finished && session.state() == SessionState::SessionComplete {
        let reflection = if session.summary().reviewed > 0 {
            prompt(&mut input, "Reflection on this session (Enter to skip): ")
                .await?
                .unwrap_or_default()
        } else {
            String::new()
        };
        session.reflect(&reflection)?;
        print_summary(&session.finish()?);
    } else {
        let (reviewed, total) = session.progress();
        println!();
        println!(
            "{} {}/{} reviewed, the rest stay due",
            "Session paused.".yellow().bold(),
            reviewed,
            total
        );
    }

    drop(session);
    let _ = log_task.await;
    Ok(())
}

/// Returns `false` if the learner quit early
async fn review_loop(session: &SessionController, input: &mut Input) -> anyhow::Result<bool> {
    while let Some(item) = session.current_item() {
        let (reviewed, total) = session.progress();
        println!();
        println!(
            "{} {} {}",
            format!("[{}/{}]", reviewed + 1, total).cyan().bold(),
            short_id(&item.id).dimmed(),
            phase_label(&item)
        );
        println!("{}", item.front.white().bold());

        match prompt(input, "Enter to reveal, q to quit: ").await? {
            Some(line) if line.trim().eq_ignore_ascii_case("q") => return Ok(false),
            None => return Ok(false),
            Some(_) => {}
        }

        let revealed = session.reveal()?;
        println!("{}", "-".repeat(40).dimmed());
        println!("{}", revealed.back);
        if let Some(note) = &revealed.state.note {
            println!("{} {}", "note:".dimmed(), note.dimmed());
        }
        print_choices(&session.preview_all()?);

        loop {
            let Some(line) = prompt(input, "> ").await? else {
                return Ok(false);
            };
            let (key, note) = match parse_rating_line(&line) {
                RatingInput::Quit => return Ok(false),
                RatingInput::Empty => continue,
                RatingInput::Key { key, note } => (key, note),
            };

            match session.commit_key(key, note).await {
                Ok(outcome) => {
                    println!(
                        "{} next review in {}",
                        rating_label(outcome.rating),
                        outcome.estimate.bold()
                    );
                    break;
                }
                Err(SessionError::UnknownKey(_)) => {
                    println!("{}", "Press 1, 2, 3 or 4, or q to quit".dimmed());
                }
                Err(e) if e.is_stale() => {
                    println!(
                        "{} {} (restart the review to pick up the stored state)",
                        "Item changed elsewhere:".red().bold(),
                        e
                    );
                    return Ok(false);
                }
                Err(e) if e.is_retryable() => {
                    println!(
                        "{} {} (press the key again to retry)",
                        "Could not save:".red().bold(),
                        e
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(true)
}

/// One line typed at the rating prompt
#[derive(Debug, PartialEq, Eq)]
enum RatingInput<'a> {
    Quit,
    Empty,
    Key { key: char, note: Option<&'a str> },
}

fn parse_rating_line(line: &str) -> RatingInput<'_> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return RatingInput::Quit;
    }
    let Some(key) = line.chars().next() else {
        return RatingInput::Empty;
    };
    let note = line[key.len_utf8()..].trim();
    RatingInput::Key {
        key,
        note: (!note.is_empty()).then_some(note),
    }
}

async fn prompt(input: &mut Input, text: &str) -> anyhow::Result<Option<String>> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

fn print_choices(previews: &PreviewResults) {
    let choices: Vec<String> = previews
        .iter()
        .map(|preview| {
            format!(
                "{} {} ({})",
                preview.rating.key().to_string().bold(),
                rating_label(preview.rating),
                preview.estimate
            )
        })
        .collect();
    println!("{}", choices.join("   "));
}

fn rating_label(rating: Rating) -> ColoredString {
    match rating {
        Rating::Again => rating.label().red(),
        Rating::Hard => rating.label().yellow(),
        Rating::Good => rating.label().green(),
        Rating::Easy => rating.label().cyan(),
    }
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("{}", "=== Session Summary ===".cyan().bold());
    println!("{}: {}", "Deck".white().bold(), summary.deck);
    println!(
        "{}: {}/{}",
        "Reviewed".white().bold(),
        summary.reviewed,
        summary.total
    );
    for rating in Rating::ALL {
        println!("  {:6} {}", rating_label(rating), summary.ratings.get(rating));
    }
    if let Some(rate) = summary.retention_rate() {
        println!("{}: {:.0}%", "Recalled".white().bold(), rate * 100.0);
    }
    println!("{}: {}", "Graduated".white().bold(), summary.graduated);
    println!("{}: {}", "Lapsed".white().bold(), summary.lapsed);
    if let Some(completed) = summary.completed_at {
        let minutes = (completed - summary.started_at).num_minutes();
        println!("{}: {} min", "Duration".white().bold(), minutes);
    }
    if let Some(reflection) = &summary.reflection {
        println!("{}: {}", "Reflection".white().bold(), reflection);
    }
}

/// Mirror session events into the debug log until the channel closes
async fn log_events(mut rx: broadcast::Receiver<SessionEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::debug!(kind = event.kind(), %json, "Session event"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize session event"),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Session event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
