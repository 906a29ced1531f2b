//! Command dispatcher and response correlator.
//!
//! Outbound: build a [`Command`], publish it on `cam/{id}/cmd`, record it in
//! the operation log. Inbound: match `result` and `upload` messages against
//! pending awaits and the log.
//!
//! Awaited commands live in a pending table keyed by [`CommandId`]. Removal
//! from that table is the single point where a waiter is completed, so a
//! reply racing a timeout completes the waiter at most once and duplicate
//! replies find nothing to complete.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::oneshot;

use camlink_domain::automation::Transition;
use camlink_domain::command::{AwaitTarget, Command, CommandId, Operation, Origin};
use camlink_domain::error::{CamlinkError, DeviceError, TimeoutError};
use camlink_domain::event::LiveEvent;
use camlink_domain::operation_log::OperationLog;
use camlink_domain::telemetry::{CommandReply, UploadNotice};
use camlink_domain::time::Timestamp;

use crate::ports::{Clock, CommandTransport, EventPublisher, OperationLogRepository};
use crate::services::manual_override::ManualOverrides;

const MAX_ID_ATTEMPTS: usize = 16;

/// What settled an awaited command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The device replied `ok = true`.
    Reply(CommandReply),
    /// The device uploaded the artifact produced by the command.
    Upload(UploadNotice),
}

struct PendingRequest {
    client_id: String,
    created_at: Timestamp,
    target: AwaitTarget,
    completion: oneshot::Sender<Result<Completion, CamlinkError>>,
}

impl PendingRequest {
    fn settled_by_reply(&self, reply: &CommandReply) -> bool {
        match self.target {
            AwaitTarget::Result => true,
            AwaitTarget::Upload => !reply.ok,
        }
    }
}

/// Issues commands and correlates the device replies.
pub struct CommandDispatcher<T, L, P, C> {
    transport: T,
    logs: L,
    publisher: P,
    clock: C,
    overrides: Arc<ManualOverrides>,
    pending: DashMap<CommandId, PendingRequest>,
}

impl<T, L, P, C> CommandDispatcher<T, L, P, C>
where
    T: CommandTransport + Send + Sync,
    L: OperationLogRepository + Send + Sync,
    P: EventPublisher + Send + Sync,
    C: Clock + Send + Sync,
{
    pub fn new(
        transport: T,
        logs: L,
        publisher: P,
        clock: C,
        overrides: Arc<ManualOverrides>,
    ) -> Self {
        Self {
            transport,
            logs,
            publisher,
            clock,
            overrides,
            pending: DashMap::new(),
        }
    }

    /// Current time as seen by this dispatcher.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// When a human last commanded `client_id`.
    pub fn last_manual(&self, client_id: &str) -> Option<Timestamp> {
        self.overrides.last(client_id)
    }

    /// Number of awaits still waiting for their reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Publish a command and return without waiting for the device.
    ///
    /// The operation log gets a `pending` row before the command leaves, so a
    /// fast reply always finds it.
    ///
    /// # Errors
    ///
    /// Returns [`CamlinkError::Validation`] for an invalid operation and
    /// [`CamlinkError::Transport`] when the broker refused the message; the
    /// log row is then marked failed.
    #[tracing::instrument(skip(self, operation), fields(op = operation.name()))]
    pub async fn dispatch(
        &self,
        client_id: &str,
        operation: Operation,
        origin: Origin,
    ) -> Result<Command, CamlinkError> {
        let command = Command::with_id(
            CommandId::generate(),
            client_id,
            operation,
            self.clock.now(),
        )?;
        self.log_pending(&command).await;
        if let Err(err) = self.send(&command).await {
            self.settle_log(command.id, false, &err.to_string()).await;
            return Err(err);
        }
        self.mark_origin(&command, origin);
        Ok(command)
    }

    /// Publish a command and wait for the message that settles it.
    ///
    /// The pending entry is registered before publishing. On timeout it is
    /// evicted and [`CamlinkError::Timeout`] is returned, unless a reply took
    /// the entry first; a reply arriving after eviction only updates the log.
    ///
    /// # Errors
    ///
    /// Besides the [`dispatch`](Self::dispatch) errors, returns
    /// [`CamlinkError::Timeout`] when nothing settled the command in time and
    /// [`CamlinkError::Device`] when the device replied `ok = false`.
    #[tracing::instrument(skip(self, operation), fields(op = operation.name()))]
    pub async fn dispatch_and_await(
        &self,
        client_id: &str,
        operation: Operation,
        origin: Origin,
        timeout: Duration,
    ) -> Result<Completion, CamlinkError> {
        let (command, mut receiver) = self.register(client_id, operation)?;
        self.log_pending(&command).await;
        if let Err(err) = self.send(&command).await {
            self.pending.remove(&command.id);
            self.settle_log(command.id, false, &err.to_string()).await;
            return Err(err);
        }
        self.mark_origin(&command, origin);

        match tokio::time::timeout(timeout, &mut receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) | Err(_) => self.expire(command, receiver, timeout).await,
        }
    }

    /// Trigger a capture and wait for the uploaded file.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch_and_await`](Self::dispatch_and_await).
    pub async fn capture_and_wait(
        &self,
        client_id: &str,
        timeout: Duration,
    ) -> Result<UploadNotice, CamlinkError> {
        match self
            .dispatch_and_await(client_id, Operation::Capture, Origin::Manual, timeout)
            .await?
        {
            Completion::Upload(notice) => Ok(notice),
            Completion::Reply(reply) => Err(DeviceError {
                client_id: client_id.to_string(),
                cmd_id: reply.id,
                info: format!("capture acknowledged without upload: {}", reply.info),
            }
            .into()),
        }
    }

    /// Publish the command realising an automation transition and record it.
    ///
    /// # Errors
    ///
    /// Returns the transport error; nothing is logged then.
    #[tracing::instrument(skip(self, transition), fields(actuator = ?transition.actuator))]
    pub async fn dispatch_automated(
        &self,
        client_id: &str,
        transition: &Transition,
    ) -> Result<Command, CamlinkError> {
        let command = Command::with_id(
            CommandId::generate(),
            client_id,
            transition.operation.clone(),
            self.clock.now(),
        )?;
        self.send(&command).await?;
        tracing::info!(cmd_id = %command.id, reason = %transition.reason, "automation command sent");
        let row = OperationLog::automated(
            client_id,
            &command.operation,
            transition.reason.clone(),
            command.issued_at,
        );
        match self.logs.create(row).await {
            Ok(row) => self.publisher.publish(LiveEvent::Log(row)),
            Err(err) => tracing::warn!(error = %err, "unable to record automation command"),
        }
        Ok(command)
    }

    /// Correlate a `result` message.
    ///
    /// Returns `true` when it completed a waiter or a pending log row.
    #[tracing::instrument(skip(self, reply), fields(cmd_id = %reply.id, ok = reply.ok))]
    pub async fn handle_result(&self, client_id: &str, reply: CommandReply) -> bool {
        let fulfilled = match self
            .pending
            .remove_if(&reply.id, |_, pending| pending.settled_by_reply(&reply))
        {
            Some((_, pending)) => {
                if pending.client_id != client_id {
                    tracing::warn!(expected = %pending.client_id, "reply came from another device");
                }
                let outcome = if reply.ok {
                    Ok(Completion::Reply(reply.clone()))
                } else {
                    Err(DeviceError {
                        client_id: client_id.to_string(),
                        cmd_id: reply.id,
                        info: reply.info.clone(),
                    }
                    .into())
                };
                Self::complete(pending, outcome);
                true
            }
            None => false,
        };

        let logged = self.settle_log(reply.id, reply.ok, &reply.info).await;
        if !fulfilled && !logged {
            tracing::info!("unmatched or duplicate result, ignored");
        }
        fulfilled || logged
    }

    /// Correlate an upload confirmation and announce the capture.
    ///
    /// Returns `true` when it completed a waiter or a pending log row.
    #[tracing::instrument(skip(self, notice), fields(file_name = %notice.file_name))]
    pub async fn handle_upload(&self, client_id: &str, notice: UploadNotice) -> bool {
        let cmd_id = notice.command_id();
        self.publisher.publish(LiveEvent::Capture {
            client_id: client_id.to_string(),
            cmd_id,
            file_name: notice.file_name.clone(),
        });
        let Some(cmd_id) = cmd_id else {
            tracing::info!("upload without command id");
            return false;
        };

        let fulfilled = match self.pending.remove(&cmd_id) {
            Some((_, pending)) => {
                Self::complete(pending, Ok(Completion::Upload(notice.clone())));
                true
            }
            None => false,
        };
        let info = format!("uploaded {}", notice.file_name);
        let logged = self.settle_log(cmd_id, true, &info).await;
        fulfilled || logged
    }

    fn register(
        &self,
        client_id: &str,
        operation: Operation,
    ) -> Result<(Command, oneshot::Receiver<Result<Completion, CamlinkError>>), CamlinkError> {
        let now = self.clock.now();
        let target = operation.await_target();
        let mut candidate = Command::with_id(CommandId::generate(), client_id, operation, now)?;
        for _ in 0..MAX_ID_ATTEMPTS {
            if let Entry::Vacant(slot) = self.pending.entry(candidate.id) {
                let (sender, receiver) = oneshot::channel();
                slot.insert(PendingRequest {
                    client_id: candidate.client_id.clone(),
                    created_at: now,
                    target,
                    completion: sender,
                });
                return Ok((candidate, receiver));
            }
            tracing::debug!(cmd_id = %candidate.id, "command id already pending, regenerating");
            candidate.id = CommandId::generate();
        }
        Err(CamlinkError::Transport(
            "no free command id after repeated attempts".into(),
        ))
    }

    /// Evict an await whose deadline passed. When a correlator already took
    /// the entry, its completion was sent and wins over the timeout.
    async fn expire(
        &self,
        command: Command,
        receiver: oneshot::Receiver<Result<Completion, CamlinkError>>,
        timeout: Duration,
    ) -> Result<Completion, CamlinkError> {
        if self.pending.remove(&command.id).is_none()
            && let Ok(outcome) = receiver.await
        {
            return outcome;
        }
        tracing::warn!(cmd_id = %command.id, ?timeout, "no reply before deadline");
        Err(TimeoutError {
            client_id: command.client_id,
            cmd_id: command.id,
            after: timeout,
        }
        .into())
    }

    fn complete(pending: PendingRequest, outcome: Result<Completion, CamlinkError>) {
        let waited = pending.created_at;
        if pending.completion.send(outcome).is_err() {
            tracing::debug!(%waited, "waiter already gone");
        }
    }

    async fn send(&self, command: &Command) -> Result<(), CamlinkError> {
        self.transport
            .publish(&command.topic(), command.to_bytes())
            .await
            .inspect_err(|err| tracing::warn!(cmd_id = %command.id, error = %err, "publish failed"))?;
        tracing::debug!(cmd_id = %command.id, topic = %command.topic(), "command published");
        Ok(())
    }

    fn mark_origin(&self, command: &Command, origin: Origin) {
        if origin == Origin::Manual {
            self.overrides.record(&command.client_id, command.issued_at);
        }
    }

    async fn log_pending(&self, command: &Command) {
        match self.logs.create(OperationLog::pending(command)).await {
            Ok(row) => self.publisher.publish(LiveEvent::Log(row)),
            Err(err) => tracing::warn!(cmd_id = %command.id, error = %err, "unable to log command"),
        }
    }

    async fn settle_log(&self, cmd_id: CommandId, ok: bool, info: &str) -> bool {
        match self.logs.complete_by_cmd_id(cmd_id, ok, info).await {
            Ok(Some(row)) => {
                self.publisher.publish(LiveEvent::Log(row));
                true
            }
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(%cmd_id, error = %err, "unable to update operation log");
                false
            }
        }
    }
}
