use std::{
    result::Result,
    sync::{
        atomic::{AtomicI32, Ordering},
        mpsc::{Receiver, RecvError, SendError, Sender, TryRecvError},
        Arc,
    },
    thread::JoinHandle,
};

/// A single background thread fed through a channel.
/// Tasks are executed in submission order, results come back in the same order.
/// The pending counter is raised on `send` and lowered once the matching result has been produced,
/// so `is_running` is already true right after a submission.
pub struct AsyncTaskGuard<TaskItem, ResultItem> {
    task_sender: Sender<TaskItem>,
    result_receiver: Receiver<ResultItem>,
    _thread_task: JoinHandle<()>,
    nb: Arc<AtomicI32>,
}

impl<TaskItem, ResultItem> AsyncTaskGuard<TaskItem, ResultItem>
where
    TaskItem: Send + 'static,
    ResultItem: Send + 'static,
{
    pub fn new<F>(name: &str, f: F) -> std::io::Result<Self>
    where
        F: Fn(TaskItem) -> ResultItem + Send + 'static,
    {
        //https://doc.rust-lang.org/rust-by-example/std_misc/channels.html
        let (task_sender, th_task_receiver) = std::sync::mpsc::channel::<TaskItem>();
        let (th_result_sender, result_receiver) = std::sync::mpsc::channel();
        let nb = Arc::new(AtomicI32::new(0));
        let th_nb = Arc::clone(&nb);
        let thread_task = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(elt) = th_task_receiver.recv() {
                    // lowered even if `f` panics so the counter never stays stuck
                    let _guard = scopeguard::guard((), |_| {
                        th_nb.fetch_sub(1, Ordering::AcqRel);
                    });
                    if th_result_sender.send(f(elt)).is_err() {
                        tracing::debug!("result receiver is gone, stopping task thread");
                        break;
                    }
                }
            })?;
        Ok(Self {
            task_sender,
            result_receiver,
            _thread_task: thread_task,
            nb,
        })
    }
    pub fn send(&self, value: TaskItem) -> Result<(), SendError<TaskItem>> {
        self.nb.fetch_add(1, Ordering::AcqRel);
        self.task_sender.send(value).map_err(|e| {
            self.nb.fetch_sub(1, Ordering::AcqRel);
            e
        })
    }
    pub fn recv(&self) -> Result<ResultItem, RecvError> {
        self.result_receiver.recv()
    }
    pub fn try_recv(&self) -> Result<ResultItem, TryRecvError> {
        self.result_receiver.try_recv()
    }

    pub fn count(&self) -> i32 {
        self.nb.load(Ordering::Acquire)
    }
    pub fn is_running(&self) -> bool {
        self.count() != 0
    }
}
