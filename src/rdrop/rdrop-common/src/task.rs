/*
 * rdrop federated maildrop
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
//!
//! A task is a named, ordered list of steps bound to an argument bundle
//! (the implementing type). Building a task does nothing, [`run`] executes
//! the steps one after the other, each awaited before the next one starts.
//!
//! Values produced by a step are written in the task's [`Task::State`] and
//! read by the following steps. The first failing step aborts the run: the
//! remaining steps never execute.
//!
//! ```
//! # use rdrop_common::{task::{self, Task}, TaskError};
//! #[derive(Debug, Clone, Copy, strum::EnumIter, strum::IntoStaticStr)]
//! #[strum(serialize_all = "snake_case")]
//! enum Step {
//!     Double,
//!     Check,
//! }
//!
//! struct Doubler(u32);
//!
//! #[async_trait::async_trait]
//! impl Task for Doubler {
//!     const NAME: &'static str = "doubler";
//!     type Step = Step;
//!     type State = Option<u32>;
//!     type Context = ();
//!
//!     async fn step(&self, _: &(), step: Step, state: &mut Option<u32>) -> Result<(), TaskError> {
//!         match step {
//!             Step::Double => *state = Some(self.0 * 2),
//!             Step::Check => {
//!                 let value = TaskError::produced(*state, "value")?;
//!                 if value > 10 {
//!                     return Err(TaskError::MalformedPayload("too big".to_string()));
//!                 }
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! assert_eq!(task::run(&Doubler(2), &()).await.unwrap(), Some(4));
//! assert_eq!(task::run(&Doubler(6), &()).await.unwrap_err().step, "check");
//! # });
//! ```

use crate::TaskError;

/// Definition of a task, see the [module documentation](self).
#[async_trait::async_trait]
pub trait Task: Send + Sync {
    /// Name of the task, used in logs and failures.
    const NAME: &'static str;

    /// The steps, executed in declaration order.
    type Step: Copy
        + std::fmt::Debug
        + Send
        + Sync
        + strum::IntoEnumIterator
        + Into<&'static str>;

    /// Values accumulated by the steps.
    type State: Default + Send;

    /// Collaborators available to every step.
    type Context: Send + Sync + ?Sized;

    /// Execute one step.
    async fn step(
        &self,
        ctx: &Self::Context,
        step: Self::Step,
        state: &mut Self::State,
    ) -> Result<(), TaskError>;
}

/// A task aborted by one of its steps.
#[derive(Debug, thiserror::Error)]
#[error("task `{task}` failed at step `{step}`: {error}")]
pub struct TaskFailure {
    /// [`Task::NAME`] of the failed task.
    pub task: &'static str,
    /// Name of the failing step.
    pub step: &'static str,
    /// Error returned by the step.
    pub error: TaskError,
}

/// Execute all the steps of `task` in order.
///
/// # Errors
///
/// * the first step failure, see [`TaskFailure`]
#[tracing::instrument(name = "task", skip_all, fields(task = T::NAME))]
pub async fn run<T: Task>(task: &T, ctx: &T::Context) -> Result<T::State, TaskFailure> {
    let mut state = T::State::default();

    let steps = <T::Step as strum::IntoEnumIterator>::iter().collect::<Vec<_>>();
    for step in steps {
        let name: &'static str = step.into();
        tracing::trace!(step = name, "Step started.");

        if let Err(error) = task.step(ctx, step, &mut state).await {
            tracing::warn!(step = name, %error, "Task aborted.");
            return Err(TaskFailure {
                task: T::NAME,
                step: name,
                error,
            });
        }
    }

    tracing::debug!("Task succeeded.");
    Ok(state)
}
