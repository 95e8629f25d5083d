use super::Resources;
use flume::{Receiver, Sender};
use tracing::{instrument, trace};

/// A thread which releases the resources of dropped [`DecodeContext`]s.
///
/// Tearing down a context finishes its byte stream, which may block (e.g., on closing a
/// socket or file). Contexts opened with a disposer send that work here, rather than
/// running it on whichever thread dropped them.
///
/// The thread exits once every handle to it has been dropped.
///
/// [`DecodeContext`]: super::DecodeContext
#[derive(Clone, Debug)]
pub struct DisposalThread(Sender<Resources>);

impl Default for DisposalThread {
    fn default() -> Self {
        Self::run()
    }
}

impl DisposalThread {
    /// Spawns a new disposal thread.
    #[must_use]
    pub fn run() -> Self {
        let (tx, rx) = flume::unbounded();
        std::thread::spawn(move || {
            trace!("Disposal thread started.");
            runner(rx);
            trace!("Disposal thread finished.");
        });

        Self(tx)
    }

    pub(crate) fn dispose(&self, resources: Resources) {
        if let Err(e) = self.0.send(resources) {
            trace!("Disposal thread gone, releasing inline.");
            e.into_inner().release();
        }
    }
}

#[instrument(skip(rx))]
fn runner(rx: Receiver<Resources>) {
    while let Ok(resources) = rx.recv() {
        resources.release();
    }
}
