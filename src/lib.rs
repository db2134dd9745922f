//! Kette: placing service function chains onto substrate networks
//!
//! A service chain is an ordered sequence of network functions that user traffic must
//! traverse on its way to an egress. This crate places such chains onto a capacitated
//! substrate network with a greedy heuristic: demands are ordered by weight, each one
//! is routed along the cheapest of its k shortest paths, and the chain's functions are
//! assigned to nodes along that path so that the worst resource utilization stays low.

#![deny(missing_docs, missing_debug_implementations)]

use indicatif::{ProgressBar, ProgressBarIter, ProgressFinish, ProgressIterator, ProgressStyle};

pub mod algorithms;
pub mod chain;
mod error;
pub mod explorer;
pub mod input;
pub mod placement;
pub mod scenario;
pub mod solver;
pub mod substrate;
#[cfg(test)]
mod tests;

pub use error::{Error, Result};

pub(crate) const PROGRESS_TEMPLATE: &str =
    "{msg:50} {pos:>9}/{len:<9} {elapsed:>3}/{eta:<3} [{wide_bar}] {percent:>3}%";

/// The shared progress style
pub fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(PROGRESS_TEMPLATE)
        .unwrap()
        .progress_chars("##-")
}

pub(crate) fn my_progress(
    msg: impl Into<String>,
    len: usize,
    keep: bool,
    show: bool,
) -> ProgressBar {
    if show {
        ProgressBar::new(len as u64)
            .with_style(progress_style())
            .with_finish(if keep {
                ProgressFinish::AndLeave
            } else {
                ProgressFinish::AndClear
            })
            .with_message(msg.into())
    } else {
        ProgressBar::hidden()
    }
}

pub(crate) trait MyProgressIterator
where
    Self: Sized + Iterator,
{
    /// Wrap an iterator with a custom progress bar.
    fn my_progress_with(self, progress: ProgressBar) -> ProgressBarIter<Self>;

    /// Wrap an iterator with default styling.
    fn my_progress(self, msg: impl Into<String>, keep: bool, show: bool) -> ProgressBarIter<Self>
    where
        Self: ExactSizeIterator,
    {
        let len = self.len();
        self.my_progress_count(msg, len, keep, show)
    }

    /// Wrap an iterator with an explicit element count and default styling.
    fn my_progress_count(
        self,
        msg: impl Into<String>,
        len: usize,
        keep: bool,
        show: bool,
    ) -> ProgressBarIter<Self> {
        self.my_progress_with(my_progress(msg, len, keep, show))
    }
}

impl<I, T: Iterator<Item = I>> MyProgressIterator for T {
    fn my_progress_with(self, progress: ProgressBar) -> ProgressBarIter<Self> {
        self.progress_with(progress)
    }
}
