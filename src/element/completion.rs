use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

/// How a single play invocation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Every stream of the element reported rest.
    Finished,
    /// A reset or a newer play superseded this one.
    Interrupted,
    /// The element has no animation for this request; nothing was started.
    Skipped,
}

/// Completion signal returned by `play_in` / `play_out`.
///
/// Awaiting it never blocks the scheduler: it is resolved by the controller when the last
/// stream rests, or dropped (and thus resolved as interrupted) when the play is superseded.
#[derive(Debug)]
#[must_use = "a completion does nothing unless awaited or polled"]
pub struct PlayCompletion {
    rx: Option<oneshot::Receiver<()>>,
}

impl PlayCompletion {
    pub(crate) fn pending() -> (oneshot::Sender<()>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx: Some(rx) })
    }

    pub(crate) fn skipped() -> Self {
        Self { rx: None }
    }
}

impl Future for PlayCompletion {
    type Output = PlayOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(rx) = this.rx.as_mut() else {
            return Poll::Ready(PlayOutcome::Skipped);
        };
        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(PlayOutcome::Finished),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(PlayOutcome::Interrupted),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Union of every element completion started by one page-level request.
pub type PageCompletion = futures::future::JoinAll<PlayCompletion>;

/// Wait for all of `completions`, however many the template produced.
pub fn join_completions(completions: Vec<PlayCompletion>) -> PageCompletion {
    futures::future::join_all(completions)
}
