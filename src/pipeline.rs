//! Fan-out orchestration: one completion task per question under a shared
//! deadline.
//!
//! The result set is allocated before dispatch with one pending [`Answer`]
//! per question. Each task returns `(index, TaskOutcome)` and the aggregator
//! writes slot `index`; an index belongs to exactly one task, so the slots
//! need no lock. In-flight completion calls are bounded by a process-wide
//! [`Semaphore`]; waiting for a permit counts against the deadline.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, warn};

use crate::deadline::Deadline;
use crate::extract::Question;
use crate::llm::{CompletionClient, ProviderError};
use crate::profile::UserProfile;
use crate::prompt;

/// Terminal state of one question's task. `Pending` only exists while the
/// batch is running; [`answer_questions`] never returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Pending,
    Completed,
    Failed,
    TimedOut,
}

/// One slot of the result set. `answer` is empty unless `status` is
/// [`AnswerStatus::Completed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub index: usize,
    pub question: String,
    pub answer: String,
    pub status: AnswerStatus,
}

impl Answer {
    fn pending(q: &Question) -> Self {
        Self {
            index: q.index,
            question: q.text.clone(),
            answer: String::new(),
            status: AnswerStatus::Pending,
        }
    }

    fn record(&mut self, outcome: TaskOutcome) {
        if self.status != AnswerStatus::Pending {
            return;
        }
        match outcome {
            TaskOutcome::Completed(text) => {
                self.answer = text;
                self.status = AnswerStatus::Completed;
            }
            TaskOutcome::Failed(e) => {
                warn!(index = self.index, kind = e.kind(), error = %e, "question task failed");
                self.status = AnswerStatus::Failed;
            }
            TaskOutcome::TimedOut => {
                debug!(index = self.index, "question task timed out");
                self.status = AnswerStatus::TimedOut;
            }
        }
    }
}

/// What a single task reports back to the aggregator.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed(String),
    Failed(ProviderError),
    TimedOut,
}

/// Answer every question concurrently and return one [`Answer`] per
/// question, in input order. Never fails: tasks that error or miss the
/// deadline leave an empty answer in their slot.
pub async fn answer_questions(
    questions: Vec<Question>,
    profile: Arc<UserProfile>,
    client: &CompletionClient,
    limiter: Arc<Semaphore>,
    deadline: Deadline,
) -> Vec<Answer> {
    let started = Instant::now();
    let mut slots: Vec<Answer> = questions.iter().map(Answer::pending).collect();
    debug!(
        questions = slots.len(),
        budget_ms = deadline.remaining().as_millis() as u64,
        "dispatching question tasks"
    );

    let mut tasks = JoinSet::new();
    for (slot, q) in questions.into_iter().enumerate() {
        let task = run_task(
            slot,
            q.text,
            Arc::clone(&profile),
            client.clone(),
            Arc::clone(&limiter),
            deadline.clone(),
        );
        tasks.spawn(task.in_current_span());
    }

    let mut expired = false;
    loop {
        tokio::select! {
            biased;
            joined = tasks.join_next() => match joined {
                None => break,
                Some(Ok((slot, outcome))) => slots[slot].record(outcome),
                Some(Err(e)) => warn!(error = %e, "question task did not finish"),
            },
            _ = deadline.expired() => {
                expired = true;
                deadline.cancel();
                tasks.abort_all();
                break;
            }
        }
    }

    // Reap aborted tasks so their futures, and any open provider calls, are
    // dropped before the batch returns. Late outcomes are discarded.
    while tasks.join_next().await.is_some() {}

    for answer in slots.iter_mut().filter(|a| a.status == AnswerStatus::Pending) {
        answer.status = if expired { AnswerStatus::TimedOut } else { AnswerStatus::Failed };
    }

    let count = |s: AnswerStatus| slots.iter().filter(|a| a.status == s).count();
    info!(
        questions = slots.len(),
        completed = count(AnswerStatus::Completed),
        failed = count(AnswerStatus::Failed),
        timed_out = count(AnswerStatus::TimedOut),
        deadline_hit = expired,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "answered form questions"
    );

    slots
}

async fn run_task(
    slot: usize,
    question: String,
    profile: Arc<UserProfile>,
    client: CompletionClient,
    limiter: Arc<Semaphore>,
    deadline: Deadline,
) -> (usize, TaskOutcome) {
    let _permit = tokio::select! {
        biased;
        _ = deadline.expired() => return (slot, TaskOutcome::TimedOut),
        permit = limiter.acquire_owned() => match permit {
            Ok(p) => p,
            Err(_) => {
                return (
                    slot,
                    TaskOutcome::Failed(ProviderError::Transport("completion limiter closed".into())),
                );
            }
        },
    };

    let prompt = prompt::compose(&profile, &question);
    let outcome = match client.complete(&deadline, &prompt).await {
        Ok(text) => TaskOutcome::Completed(text),
        Err(ProviderError::DeadlineExceeded) => TaskOutcome::TimedOut,
        Err(e) => TaskOutcome::Failed(e),
    };
    (slot, outcome)
}
