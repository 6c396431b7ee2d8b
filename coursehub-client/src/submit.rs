use std::cell::Cell;

use crate::Error;

/// Whether a controller has a request in flight
#[derive(Debug, Default)]
pub struct Submitting(Cell<bool>);

impl Submitting {
    pub fn is_set(&self) -> bool {
        self.0.get()
    }

    /// Marks a submission as started, until the guard is dropped
    ///
    /// Fails with `Error::Busy` if one already is.
    pub fn start(&self) -> Result<SubmitGuard<'_>, Error> {
        match self.0.replace(true) {
            true => Err(Error::Busy),
            false => Ok(SubmitGuard(&self.0)),
        }
    }
}

#[must_use]
pub struct SubmitGuard<'a>(&'a Cell<bool>);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
