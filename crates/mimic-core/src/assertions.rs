//! Call-history assertions.
//!
//! Each assertion gathers what it needs under the arena lock and formats the
//! failure message afterwards, since rendering argument values may lock other
//! mocks.

use crate::call::{render_list, Call};
use crate::error::{Error, Result};
use crate::node::Mock;

impl Mock {
    fn snapshot(&self) -> (String, Vec<Call>) {
        let (name, calls) = {
            let arena = self.arena().lock();
            (
                arena.short_name(self.id()),
                arena.node(self.id()).calls.clone(),
            )
        };
        (name, self.release_calls(&calls))
    }

    /// Fails unless the mock was called at least once.
    pub fn assert_called(&self) -> Result<()> {
        let (name, calls) = self.snapshot();
        if calls.is_empty() {
            return Err(Error::assertion(format!(
                "Expected '{}' to have been called.",
                name
            )));
        }
        Ok(())
    }

    /// Fails unless the mock was called exactly once.
    pub fn assert_called_once(&self) -> Result<()> {
        let (name, calls) = self.snapshot();
        if calls.len() != 1 {
            return Err(Error::assertion(format!(
                "Expected '{}' to have been called once. Called {} times.{}",
                name,
                calls.len(),
                calls_suffix(&calls)
            )));
        }
        Ok(())
    }

    pub fn assert_not_called(&self) -> Result<()> {
        let (name, calls) = self.snapshot();
        if !calls.is_empty() {
            return Err(Error::assertion(format!(
                "Expected '{}' to not have been called. Called {} times.{}",
                name,
                calls.len(),
                calls_suffix(&calls)
            )));
        }
        Ok(())
    }

    /// Fails unless the most recent call had exactly these arguments.
    pub fn assert_called_with(&self, expected: &Call) -> Result<()> {
        let (name, calls) = self.snapshot();
        match calls.last() {
            None => Err(Error::assertion(format!(
                "expected call not found.\nExpected: {}\n  Actual: not called.",
                expected.render_as(&name)
            ))),
            Some(actual) if actual.same_args(expected) => Ok(()),
            Some(actual) => Err(Error::assertion(format!(
                "expected call not found.\nExpected: {}\n  Actual: {}",
                expected.render_as(&name),
                actual.render_as(&name)
            ))),
        }
    }

    pub fn assert_called_once_with(&self, expected: &Call) -> Result<()> {
        let (name, calls) = self.snapshot();
        if calls.len() != 1 {
            return Err(Error::assertion(format!(
                "Expected '{}' to be called once. Called {} times.{}",
                name,
                calls.len(),
                calls_suffix(&calls)
            )));
        }
        self.assert_called_with(expected)
    }

    /// Fails unless some call, at any point, had these arguments.
    pub fn assert_any_call(&self, expected: &Call) -> Result<()> {
        let (name, calls) = self.snapshot();
        if calls.iter().any(|c| c.same_args(expected)) {
            return Ok(());
        }
        Err(Error::assertion(format!(
            "{} call not found",
            expected.render_as(&name)
        )))
    }

    /// Check `expected` against `mock_calls`.
    ///
    /// In order, the calls must appear as a contiguous run. With `any_order`
    /// each expected call must match a distinct recorded call.
    pub fn assert_has_calls(&self, expected: &[Call], any_order: bool) -> Result<()> {
        let actual = self.mock_calls();
        if any_order {
            let mut remaining = actual.clone();
            let mut missing = Vec::new();
            for call in expected {
                match remaining.iter().position(|c| c == call) {
                    Some(index) => {
                        remaining.remove(index);
                    }
                    None => missing.push(call.clone()),
                }
            }
            if missing.is_empty() {
                return Ok(());
            }
            return Err(Error::assertion(format!(
                "{} not all found in call list",
                render_list(&missing)
            )));
        }

        if expected.is_empty() || actual.windows(expected.len()).any(|w| w == expected) {
            return Ok(());
        }
        Err(Error::assertion(format!(
            "Calls not found.\nExpected: {}\n  Actual: {}",
            render_list(expected),
            render_list(&actual)
        )))
    }
}

fn calls_suffix(calls: &[Call]) -> String {
    if calls.is_empty() {
        String::new()
    } else {
        format!("\nCalls: {}", render_list(calls))
    }
}
