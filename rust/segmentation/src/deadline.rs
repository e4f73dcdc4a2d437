// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall-clock budgets for the quadratic stages.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Optional time limit for one pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    stage: &'static str,
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(stage: &'static str, limit: Option<Duration>) -> Self {
        Self {
            stage,
            started: Instant::now(),
            limit,
        }
    }

    /// A deadline that never expires.
    pub fn unbounded(stage: &'static str) -> Self {
        Self::new(stage, None)
    }

    /// Fails with [`Error::Timeout`] once the limit has elapsed.
    pub fn check(&self) -> Result<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let elapsed = self.started.elapsed();
        if elapsed > limit {
            return Err(Error::Timeout {
                stage: self.stage,
                elapsed,
            });
        }
        Ok(())
    }
}
