//! Reader/worker/cleaner subscriber pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use payflow_core::bus::{EventHandler, Subscriber};
use payflow_core::error::DomainError;
use payflow_core::event::{Event, QUEUE_MESSAGE_ID_KEY, RECEIPT_HANDLE_KEY};

use crate::queue::{QueueClient, QueueMessage, ReceiveOptions};

/// Tuning knobs for the subscriber pipeline.
#[derive(Debug, Clone)]
pub struct SubscriberOptions {
    /// Name used in logs.
    pub name: String,
    /// Number of reader tasks long-polling the queue.
    pub readers: usize,
    /// Number of worker tasks invoking the handler.
    pub workers: usize,
    /// Number of cleaner tasks acking or extending messages.
    pub cleaners: usize,
    /// Capacity of the inbound and outbound channels.
    pub channel_capacity: usize,
    /// Maximum messages per receive call.
    pub max_messages: usize,
    /// Long-poll wait per receive call.
    pub wait_time: Duration,
    /// Visibility timeout applied on receive.
    pub visibility_timeout: Duration,
    /// Reader back-off after an empty receive.
    pub sleep_after_empty_receive: Duration,
    /// Reader back-off after a receive error.
    pub sleep_after_error: Duration,
    /// Whether successfully handled messages are deleted.
    pub ack: bool,
    /// Whether failed messages get their visibility timeout extended.
    pub extend_visibility_on_error: bool,
    /// Receive-count bucket size for the extension formula.
    pub receive_count_range: u32,
    /// Extra visibility added per receive-count bucket.
    pub visibility_timeout_offset: Duration,
    /// Upper bound for the extended visibility timeout.
    pub max_visibility_timeout: Duration,
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            name: "queue-subscriber".to_owned(),
            readers: 1,
            workers: 30,
            cleaners: 2,
            channel_capacity: 10,
            max_messages: 5,
            wait_time: Duration::from_secs(15),
            visibility_timeout: Duration::from_secs(30),
            sleep_after_empty_receive: Duration::from_secs(10),
            sleep_after_error: Duration::from_secs(20),
            ack: true,
            extend_visibility_on_error: true,
            receive_count_range: 3,
            visibility_timeout_offset: Duration::from_secs(30),
            max_visibility_timeout: Duration::from_secs(900),
        }
    }
}

/// A message travelling through the pipeline with its parsed envelope and,
/// after the worker stage, the handler outcome.
struct PipelineMessage {
    message: QueueMessage,
    event: Event,
    error: Option<DomainError>,
}

struct Running {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

/// Subscriber that owns three pools of cooperating tasks — readers,
/// workers, cleaners — joined by two bounded channels.
///
/// `start`/`stop` are idempotent and safe to call concurrently. Stopping
/// signals every task through a watch channel, then joins them; in-flight
/// messages that were neither acked nor extended simply reappear after
/// their visibility timeout (at-least-once delivery).
pub struct QueueSubscriber {
    queue: Arc<dyn QueueClient>,
    handler: Arc<dyn EventHandler>,
    options: SubscriberOptions,
    running: Mutex<Option<Running>>,
}

impl QueueSubscriber {
    /// Creates a stopped subscriber.
    #[must_use]
    pub fn new(
        queue: Arc<dyn QueueClient>,
        handler: Arc<dyn EventHandler>,
        options: SubscriberOptions,
    ) -> Self {
        Self {
            queue,
            handler,
            options,
            running: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Subscriber for QueueSubscriber {
    async fn start(&self) -> Result<(), DomainError> {
        let mut guard = self.running.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.options.channel_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.options.channel_capacity);
        let inbound_rx = Arc::new(Mutex::new(inbound_rx));
        let outbound_rx = Arc::new(Mutex::new(outbound_rx));

        let mut tasks = Vec::new();

        for _ in 0..self.options.readers {
            tasks.push(tokio::spawn(reader_loop(
                Arc::clone(&self.queue),
                self.options.clone(),
                inbound_tx.clone(),
                shutdown_rx.clone(),
            )));
        }
        drop(inbound_tx);

        for _ in 0..self.options.workers {
            tasks.push(tokio::spawn(worker_loop(
                Arc::clone(&self.handler),
                Arc::clone(&inbound_rx),
                outbound_tx.clone(),
                shutdown_rx.clone(),
            )));
        }
        drop(outbound_tx);

        for _ in 0..self.options.cleaners {
            tasks.push(tokio::spawn(cleaner_loop(
                Arc::clone(&self.queue),
                self.options.clone(),
                Arc::clone(&outbound_rx),
                shutdown_rx.clone(),
            )));
        }

        *guard = Some(Running {
            shutdown: shutdown_tx,
            tasks,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), DomainError> {
        let mut guard = self.running.lock().await;
        let Some(running) = guard.take() else {
            return Ok(());
        };

        let _ = running.shutdown.send(true);
        for task in running.tasks {
            let _ = task.await;
        }
        Ok(())
    }
}

/// Sleeps for `period`, returning false when shutdown fires first.
async fn idle(shutdown: &mut watch::Receiver<bool>, period: Duration) -> bool {
    tokio::select! {
        _ = shutdown.changed() => false,
        () = tokio::time::sleep(period) => true,
    }
}

async fn reader_loop(
    queue: Arc<dyn QueueClient>,
    options: SubscriberOptions,
    inbound: mpsc::Sender<PipelineMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    let receive = ReceiveOptions {
        max_messages: options.max_messages,
        wait_time: options.wait_time,
        visibility_timeout: options.visibility_timeout,
    };

    loop {
        if *shutdown.borrow() {
            return;
        }

        let received = tokio::select! {
            _ = shutdown.changed() => return,
            result = queue.receive(&receive) => result,
        };

        match received {
            Err(e) => {
                warn!(subscriber = %options.name, error = %e, "queue receive failed");
                if !idle(&mut shutdown, options.sleep_after_error).await {
                    return;
                }
            }
            Ok(messages) if messages.is_empty() => {
                if !idle(&mut shutdown, options.sleep_after_empty_receive).await {
                    return;
                }
            }
            Ok(messages) => {
                for message in messages {
                    let mut event = match Event::from_json(message.body.as_bytes()) {
                        Ok(event) => event,
                        Err(e) => {
                            // Not acked: the broker redelivers until its
                            // dead-letter policy absorbs the message.
                            warn!(
                                subscriber = %options.name,
                                message_id = %message.message_id,
                                error = %e,
                                "dropping unparseable message"
                            );
                            continue;
                        }
                    };

                    event.metadata.set(QUEUE_MESSAGE_ID_KEY, &*message.message_id);
                    event
                        .metadata
                        .set(RECEIPT_HANDLE_KEY, &*message.receipt_handle);
                    for (key, value) in &message.attributes {
                        event.metadata.set(key.clone(), value.clone());
                    }

                    let item = PipelineMessage {
                        message,
                        event,
                        error: None,
                    };
                    tokio::select! {
                        _ = shutdown.changed() => return,
                        sent = inbound.send(item) => {
                            if sent.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn worker_loop(
    handler: Arc<dyn EventHandler>,
    inbound: Arc<Mutex<mpsc::Receiver<PipelineMessage>>>,
    outbound: mpsc::Sender<PipelineMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let next = {
            let mut rx = inbound.lock().await;
            tokio::select! {
                _ = shutdown.changed() => None,
                item = rx.recv() => item,
            }
        };
        let Some(mut item) = next else {
            return;
        };

        item.error = handler.handle(&item.event).await.err();

        tokio::select! {
            _ = shutdown.changed() => return,
            sent = outbound.send(item) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

async fn cleaner_loop(
    queue: Arc<dyn QueueClient>,
    options: SubscriberOptions,
    outbound: Arc<Mutex<mpsc::Receiver<PipelineMessage>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let next = {
            let mut rx = outbound.lock().await;
            tokio::select! {
                _ = shutdown.changed() => None,
                item = rx.recv() => item,
            }
        };
        let Some(item) = next else {
            return;
        };

        if let Err(e) = clean(queue.as_ref(), &options, &item).await {
            warn!(
                subscriber = %options.name,
                message_id = %item.message.message_id,
                error = %e,
                "cleaner step failed"
            );
        }
    }
}

async fn clean(
    queue: &dyn QueueClient,
    options: &SubscriberOptions,
    item: &PipelineMessage,
) -> Result<(), DomainError> {
    match &item.error {
        Some(handler_error) => {
            if options.extend_visibility_on_error {
                let timeout = extended_visibility(options, item.message.receive_count);
                debug!(
                    subscriber = %options.name,
                    message_id = %item.message.message_id,
                    receive_count = item.message.receive_count,
                    timeout_secs = timeout.as_secs(),
                    error = %handler_error,
                    "handler failed, extending visibility timeout"
                );
                queue
                    .change_visibility(&item.message.receipt_handle, timeout)
                    .await?;
            }
            Ok(())
        }
        None => {
            if options.ack {
                queue.delete(&item.message.receipt_handle).await?;
            }
            Ok(())
        }
    }
}

/// Visibility back-off: `base + (receive_count / range) * offset`, capped.
fn extended_visibility(options: &SubscriberOptions, receive_count: u32) -> Duration {
    let steps = receive_count / options.receive_count_range;
    let extended = options.visibility_timeout + options.visibility_timeout_offset * steps;
    extended.min(options.max_visibility_timeout)
}
