use std::{future::Future, pin::Pin, sync::Arc};
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

type ShutdownTask = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Owns the receiving end: whoever holds this waits for the shutdown reason.
pub struct ShutdownManager<A> {
  pub shutdown: Arc<Shutdown<A>>,
  receiver: oneshot::Receiver<A>,
}

impl<A> ShutdownManager<A> {
  pub fn new() -> Self {
    let (sender, receiver) = oneshot::channel();
    Self {
      shutdown: Arc::new(Shutdown {
        sender: Mutex::new(Some(sender)),
        tasks: Mutex::new(Vec::new()),
      }),
      receiver,
    }
  }

  pub async fn await_shutdown(self) -> Result<A, oneshot::error::RecvError> {
    self.receiver.await
  }
}

pub struct Shutdown<A> {
  sender: Mutex<Option<oneshot::Sender<A>>>,
  tasks: Mutex<Vec<(&'static str, ShutdownTask)>>,
}

impl<A> Shutdown<A> {
  /// Tasks run in reverse registration order. Registering after the trigger
  /// runs the task straight away.
  pub async fn register_shutdown_task<F>(&self, description: &'static str, task: F)
  where
    F: FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static,
  {
    // Held across the push so a concurrent trigger cannot miss this task.
    let sender = self.sender.lock().await;
    if sender.is_none() {
      drop(sender);
      info!("Shutdown already triggered, running {} now", description);
      task().await;
      return;
    }
    self.tasks.lock().await.push((description, Box::new(task)));
  }

  /// Only the first call has any effect; returns whether it was this one.
  pub async fn trigger(&self, reason: A) -> bool {
    let Some(sender) = self.sender.lock().await.take() else {
      return false;
    };
    info!("Triggering shutdown");

    let tasks = std::mem::take(&mut *self.tasks.lock().await);
    let total = tasks.len();
    for (index, (description, task)) in tasks.into_iter().rev().enumerate() {
      info!("[{}/{}] Running shutdown task: {}", index + 1, total, description);
      task().await;
    }

    if sender.send(reason).is_err() {
      warn!("Nobody is waiting for the shutdown reason");
    }
    true
  }

  pub async fn is_triggered(&self) -> bool {
    self.sender.lock().await.is_none()
  }
}
