use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

enum Command<T> {
    Push(T),
    Cancel,
    Flush,
}

/// Delivers at most one value per quiet window: every `push` restarts the
/// window and only the latest value reaches `on_settle`. Dropping the
/// debouncer aborts its task together with any pending value.
#[derive(Debug)]
pub struct Debouncer<T> {
    commands: UnboundedSender<Command<T>>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn spawn<F>(window: Duration, on_settle: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (commands, receiver) = unbounded_channel();
        let task = tokio::spawn(run(window, receiver, on_settle));
        Self { commands, task }
    }

    pub fn push(&self, value: T) {
        self.send(Command::Push(value));
    }

    /// Drops the pending value, if any, without delivering it.
    pub fn cancel(&self) {
        self.send(Command::Cancel);
    }

    /// Delivers the pending value, if any, without waiting for the window.
    pub fn flush(&self) {
        self.send(Command::Flush);
    }

    fn send(&self, command: Command<T>) {
        if self.commands.send(command).is_err() {
            debug!("debouncer task is gone");
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T, F>(window: Duration, mut commands: UnboundedReceiver<Command<T>>, mut on_settle: F)
where
    F: FnMut(T),
{
    let mut pending: Option<T> = None;
    loop {
        let Some(value) = pending.take() else {
            match commands.recv().await {
                Some(Command::Push(value)) => pending = Some(value),
                Some(Command::Cancel) | Some(Command::Flush) => {}
                None => return,
            }
            continue;
        };
        let interrupted = tokio::select! {
            biased;
            command = commands.recv() => Some(command),
            _ = sleep(window) => None,
        };
        match interrupted {
            None | Some(Some(Command::Flush)) => on_settle(value),
            Some(Some(Command::Push(next))) => pending = Some(next),
            Some(Some(Command::Cancel)) => {}
            Some(None) => return,
        }
    }
}
