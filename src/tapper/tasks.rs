//! Decides what to do with each task in the task list.

use std::fmt;

use super::models::{Task, TaskKind};
use crate::config::AnswerBook;

/// Endpoint suffix used to claim a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEndpoint {
    Check,
    Complete,
}

impl TaskEndpoint {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for TaskEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyCompleted,
    NeedsManualAction,
    NoKnownAnswer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPlan {
    Skip(SkipReason),
    Submit {
        endpoint: TaskEndpoint,
        answer: Option<String>,
    },
}

/// Plans a single task.
///
/// Channel subscriptions are verified with `check`, everything else is
/// claimed with `complete`. Video quizzes are only submitted when the
/// answer book knows the title.
#[must_use]
pub fn plan_task(task: &Task, answers: &AnswerBook) -> TaskPlan {
    if task.completed {
        return TaskPlan::Skip(SkipReason::AlreadyCompleted);
    }
    if task.kind.is_excluded() {
        return TaskPlan::Skip(SkipReason::NeedsManualAction);
    }

    let endpoint = if task.kind == TaskKind::SubscribeToChannel {
        TaskEndpoint::Check
    } else {
        TaskEndpoint::Complete
    };

    if task.kind == TaskKind::YoutubeWatch {
        return match answers.lookup(&task.title) {
            Some(answer) => TaskPlan::Submit {
                endpoint,
                answer: Some(answer.to_owned()),
            },
            None => TaskPlan::Skip(SkipReason::NoKnownAnswer),
        };
    }

    TaskPlan::Submit {
        endpoint,
        answer: None,
    }
}
