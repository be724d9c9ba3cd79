// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared per-device state driven by the scheduler and the facade.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::command::{Command, ControlCommand, QueryCommand};
use crate::config::SyncConfig;
use crate::control::{Decision, PowerController, SuspendReason};
use crate::error::{CommandError, Error, TransportError};
use crate::event::{DeviceId, EventBus, SyncEvent};
use crate::gateway::{Ack, CommandGateway};
use crate::protocol::{DeviceLink, LinkGuard, Transport};
use crate::scheduler::{PollControl, PollCycle};
use crate::state::{DeviceSnapshot, StateCache, Transition};
use crate::telemetry::{Normalizer, RawTelemetry};

#[derive(Debug)]
pub(super) struct MinerCore<T> {
    pub(super) id: DeviceId,
    pub(super) config: SyncConfig,
    pub(super) link: Arc<DeviceLink<T>>,
    pub(super) gateway: CommandGateway<T>,
    pub(super) normalizer: Mutex<Normalizer>,
    pub(super) cache: StateCache,
    pub(super) controller: Mutex<PowerController>,
    pub(super) events: EventBus,
    pub(super) control: Arc<PollControl>,
}

impl<T: Transport> MinerCore<T> {
    pub(super) fn new(transport: T, config: SyncConfig) -> Self {
        let link = Arc::new(DeviceLink::new(transport, config.retry()));
        Self {
            id: DeviceId::new(),
            gateway: CommandGateway::new(Arc::clone(&link), config.command_interval()),
            normalizer: Mutex::new(Normalizer::new(*config.telemetry())),
            cache: StateCache::new(config.offline_threshold()),
            controller: Mutex::new(PowerController::new(
                *config.control(),
                config.command_interval(),
            )),
            events: EventBus::new(),
            control: Arc::new(PollControl::new()),
            link,
            config,
        }
    }

    /// Runs one poll round, then one controller evaluation.
    pub(super) async fn poll(&self) -> Result<Arc<DeviceSnapshot>, Error> {
        let (transition, restart) = {
            let link = self.link.acquire().await;
            let fetched = fetch(&link).await;
            let raw = match fetched {
                Ok(raw) => raw,
                Err(err) => {
                    drop(link);
                    return Err(self.poll_failed(err.into()).await);
                }
            };
            if self.cache.is_closed() {
                return Err(Error::NotRunning);
            }
            let normalized = self.normalizer.lock().normalize(&raw);
            let snapshot = match normalized {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    drop(link);
                    return Err(self.poll_failed(err.into()).await);
                }
            };
            let restart = snapshot.restart_detected;
            (self.cache.update(snapshot), restart)
        };

        match transition {
            Transition::Closed => return Err(Error::NotRunning),
            Transition::CameOnline => {
                tracing::info!(device = %self.id, "Device online");
                self.events.publish(SyncEvent::online(self.id));
            }
            Transition::Unchanged | Transition::WentOffline => {}
        }
        if restart {
            self.events.publish(SyncEvent::CounterReset { device_id: self.id });
        }

        let snapshot = self.cache.read().ok_or(Error::NotRunning)?;
        self.run_controller(&snapshot).await;
        Ok(snapshot)
    }

    async fn poll_failed(&self, err: Error) -> Error {
        tracing::warn!(
            device = %self.id,
            error = %err,
            failures = self.cache.consecutive_failures() + 1,
            "Poll failed"
        );
        if matches!(self.cache.mark_poll_failure(), Transition::WentOffline) {
            self.events.publish(SyncEvent::offline(
                self.id,
                self.cache.consecutive_failures(),
            ));
            if let Some(snapshot) = self.cache.read() {
                self.run_controller(&snapshot).await;
            }
        }
        err
    }

    async fn run_controller(&self, snapshot: &DeviceSnapshot) {
        let now = Instant::now();
        let decision = {
            let mut controller = self.controller.lock();
            let before = controller.suspend_reason();
            let decision = controller.evaluate(snapshot, now, self.gateway.is_busy());
            self.publish_suspension(before, controller.suspend_reason());
            decision
        };

        let Decision::Issue { watts, error_watts } = decision else {
            tracing::trace!(?decision, "No power adjustment");
            return;
        };
        tracing::debug!(
            watts,
            error_watts,
            measured = snapshot.power_watts,
            "Adjusting power limit"
        );

        let command = ControlCommand::SetPowerTarget { watts };
        match self.gateway.try_submit(&command).await {
            Ok(_) => {
                self.controller.lock().record_issued(watts, now);
                self.control.request_refresh();
            }
            Err(CommandError::Busy | CommandError::Throttled { .. }) => {
                tracing::debug!(watts, "Command slot unavailable, skipping adjustment");
            }
            Err(err) => {
                tracing::warn!(device = %self.id, watts, error = %err, "Power adjustment failed");
                self.events.publish(SyncEvent::command_failed(
                    self.id,
                    command.name(),
                    err.to_string(),
                ));
                let (before, after) = {
                    let mut controller = self.controller.lock();
                    let before = controller.suspend_reason();
                    controller.record_failure();
                    (before, controller.suspend_reason())
                };
                self.publish_suspension(before, after);
            }
        }
    }

    /// Submits an operator command, pausing polling while it is in flight.
    pub(super) async fn operator(&self, command: ControlCommand) -> Result<Ack, Error> {
        let result = {
            let _pause = self.control.pause();
            self.gateway
                .submit(&command, self.config.operator_wait())
                .await
        };

        match result {
            Ok(ack) => {
                self.control.request_refresh();
                Ok(ack)
            }
            Err(err) => {
                tracing::warn!(
                    device = %self.id,
                    command = command.name(),
                    error = %err,
                    "Operator command failed"
                );
                self.events.publish(SyncEvent::command_failed(
                    self.id,
                    command.name(),
                    err.to_string(),
                ));
                Err(err.into())
            }
        }
    }

    pub(super) fn publish_suspension(
        &self,
        before: Option<SuspendReason>,
        after: Option<SuspendReason>,
    ) {
        if before == after {
            return;
        }
        let event = match after {
            Some(reason) => SyncEvent::ControllerSuspended {
                device_id: self.id,
                reason,
            },
            None => SyncEvent::ControllerResumed { device_id: self.id },
        };
        self.events.publish(event);
    }
}

impl<T: Transport> PollCycle for MinerCore<T> {
    async fn poll_cycle(&self) {
        // Other failures are logged and recorded by `poll`.
        if let Err(Error::NotRunning) = self.poll().await {
            tracing::trace!(device = %self.id, "State cache closed, poll result dropped");
        }
    }
}

/// Issues every query of a round in order over one held link.
///
/// A transient failure aborts the round; any other failure leaves the
/// section absent.
async fn fetch<T: Transport>(link: &LinkGuard<'_, T>) -> Result<RawTelemetry, TransportError> {
    let mut raw = RawTelemetry::new();
    for query in QueryCommand::POLL_ROUND {
        match link.call(&query).await {
            Ok(response) => raw.insert(query, response),
            Err(err) if err.is_transient() => return Err(err),
            Err(err) => {
                tracing::warn!(command = query.name(), error = %err, "Query failed, section skipped");
            }
        }
    }
    Ok(raw)
}
