// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	future::Future,
	sync::Arc,
	time::{Duration, Instant},
};

use fabric_abi::{
	data::GuidFFI,
	operation::{BeginWithDescriptionFn, EndWithOutputFn},
	testability::{
		ChaosDescriptionFFI, ChaosReportFFI, ChaosScheduleDescriptionFFI, NodeTransitionProgressFFI,
		PartitionProgressFFI, TestCommandStatusListFFI, TestManagementClientVTableFFI,
	},
};
use fabric_interop::{AsyncBridge, CancellationToken, ClientConfig, InteropError, Result};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
	CancelTestCommandDescription, ChaosDescription, ChaosParameters, ChaosReport, ChaosReportRequest,
	ChaosScheduleDescription, InvokeDataLossDescription, InvokeQuorumLossDescription, NodeTransitionDescription,
	NodeTransitionProgress, PartitionDataLossProgress, PartitionProgress, PartitionQuorumLossProgress,
	PartitionRestartProgress, RestartPartitionDescription, TestCommandListDescription, TestCommandProgressState,
	TestCommandStatusList, TestCommandType,
};
use crate::{
	channel::{Channel, finish, finish_with},
	native::NativeTestManagementClient,
};

const INVOKE_DATA_LOSS: &str = "FaultAnalysisService.InvokeDataLossAsync";
const INVOKE_QUORUM_LOSS: &str = "FaultAnalysisService.InvokeQuorumLossAsync";
const RESTART_PARTITION: &str = "FaultAnalysisService.RestartPartitionAsync";
const GET_DATA_LOSS_PROGRESS: &str = "FaultAnalysisService.GetInvokeDataLossProgress";
const GET_QUORUM_LOSS_PROGRESS: &str = "FaultAnalysisService.GetInvokeQuorumLossProgress";
const GET_RESTART_PROGRESS: &str = "FaultAnalysisService.GetRestartPartitionProgress";
const GET_TEST_COMMAND_STATUS_LIST: &str = "FaultAnalysisService.GetTestCommandStatusListAsync";
const CANCEL_TEST_COMMAND: &str = "FaultAnalysisService.CancelTestCommandAsync";
const START_CHAOS: &str = "FaultAnalysisService.StartChaos";
const STOP_CHAOS: &str = "FaultAnalysisService.StopChaos";
const GET_CHAOS_REPORT: &str = "FaultAnalysisService.GetChaosReportAsync";
const GET_CHAOS: &str = "FaultAnalysisService.GetChaosAsync";
const GET_CHAOS_SCHEDULE: &str = "FaultAnalysisService.GetChaosScheduleAsync";
const SET_CHAOS_SCHEDULE: &str = "FaultAnalysisService.SetChaosScheduleAsync";
const START_NODE_TRANSITION: &str = "FaultAnalysisService.StartNodeTransitionAsync";
const GET_NODE_TRANSITION_PROGRESS: &str = "FaultAnalysisService.GetNodeTransitionProgressAsync";

/// Starts, tracks and cancels fault commands and chaos runs.
///
/// Every method comes in two forms: the plain one uses the configured
/// default timeout and cannot be cancelled, the `_with` one takes both
/// explicitly. Cheap to clone.
#[derive(Clone)]
pub struct TestManagementClient {
	channel: Channel<TestManagementClientVTableFFI>,
}

impl TestManagementClient {
	pub(crate) fn new(bridge: AsyncBridge, config: Arc<ClientConfig>, native: NativeTestManagementClient) -> Self {
		Self {
			channel: Channel::new(bridge, config, native),
		}
	}

	fn default_timeout(&self) -> Duration {
		self.channel.config().default_timeout
	}

	/// Induces data loss on the selected partition.
	pub async fn start_partition_data_loss(&self, description: &InvokeDataLossDescription) -> Result<()> {
		self.start_partition_data_loss_with(description, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::start_partition_data_loss", level = "debug", skip_all, fields(operation_id = %description.operation_id))]
	pub async fn start_partition_data_loss_with(
		&self,
		description: &InvokeDataLossDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<()> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				INVOKE_DATA_LOSS,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_start_partition_data_loss,
				finish(vtable.end_start_partition_data_loss, INVOKE_DATA_LOSS),
			)
			.await
	}

	/// Puts the selected partition into quorum loss for the requested duration.
	pub async fn start_partition_quorum_loss(&self, description: &InvokeQuorumLossDescription) -> Result<()> {
		self.start_partition_quorum_loss_with(description, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::start_partition_quorum_loss", level = "debug", skip_all, fields(operation_id = %description.operation_id))]
	pub async fn start_partition_quorum_loss_with(
		&self,
		description: &InvokeQuorumLossDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<()> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				INVOKE_QUORUM_LOSS,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_start_partition_quorum_loss,
				finish(vtable.end_start_partition_quorum_loss, INVOKE_QUORUM_LOSS),
			)
			.await
	}

	/// Restarts some or all replicas of the selected partition.
	pub async fn start_partition_restart(&self, description: &RestartPartitionDescription) -> Result<()> {
		self.start_partition_restart_with(description, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::start_partition_restart", level = "debug", skip_all, fields(operation_id = %description.operation_id))]
	pub async fn start_partition_restart_with(
		&self,
		description: &RestartPartitionDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<()> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				RESTART_PARTITION,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_start_partition_restart,
				finish(vtable.end_start_partition_restart, RESTART_PARTITION),
			)
			.await
	}

	pub async fn get_partition_data_loss_progress(&self, operation_id: Uuid) -> Result<PartitionDataLossProgress> {
		self.get_partition_data_loss_progress_with(operation_id, self.default_timeout(), &CancellationToken::new())
			.await
	}

	#[instrument(name = "client::get_partition_data_loss_progress", level = "debug", skip_all, fields(operation_id = %operation_id))]
	pub async fn get_partition_data_loss_progress_with(
		&self,
		operation_id: Uuid,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<PartitionDataLossProgress> {
		let vtable = self.channel.vtable();
		self.progress(
			GET_DATA_LOSS_PROGRESS,
			operation_id,
			timeout,
			cancel,
			vtable.begin_get_partition_data_loss_progress,
			vtable.end_get_partition_data_loss_progress,
		)
		.await
	}

	pub async fn get_partition_quorum_loss_progress(&self, operation_id: Uuid) -> Result<PartitionQuorumLossProgress> {
		self.get_partition_quorum_loss_progress_with(operation_id, self.default_timeout(), &CancellationToken::new())
			.await
	}

	#[instrument(name = "client::get_partition_quorum_loss_progress", level = "debug", skip_all, fields(operation_id = %operation_id))]
	pub async fn get_partition_quorum_loss_progress_with(
		&self,
		operation_id: Uuid,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<PartitionQuorumLossProgress> {
		let vtable = self.channel.vtable();
		self.progress(
			GET_QUORUM_LOSS_PROGRESS,
			operation_id,
			timeout,
			cancel,
			vtable.begin_get_partition_quorum_loss_progress,
			vtable.end_get_partition_quorum_loss_progress,
		)
		.await
	}

	pub async fn get_partition_restart_progress(&self, operation_id: Uuid) -> Result<PartitionRestartProgress> {
		self.get_partition_restart_progress_with(operation_id, self.default_timeout(), &CancellationToken::new())
			.await
	}

	#[instrument(name = "client::get_partition_restart_progress", level = "debug", skip_all, fields(operation_id = %operation_id))]
	pub async fn get_partition_restart_progress_with(
		&self,
		operation_id: Uuid,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<PartitionRestartProgress> {
		let vtable = self.channel.vtable();
		self.progress(
			GET_RESTART_PROGRESS,
			operation_id,
			timeout,
			cancel,
			vtable.begin_get_partition_restart_progress,
			vtable.end_get_partition_restart_progress,
		)
		.await
	}

	async fn progress(
		&self,
		operation: &'static str,
		operation_id: Uuid,
		timeout: Duration,
		cancel: &CancellationToken,
		begin: BeginWithDescriptionFn<GuidFFI>,
		end: EndWithOutputFn<PartitionProgressFFI>,
	) -> Result<PartitionProgress> {
		if operation_id.is_nil() {
			return Err(InteropError::invalid_argument("operation_id", "must not be nil"));
		}
		let end = finish_with::<PartitionProgress>(end, PartitionProgressFFI::empty, operation);
		self.channel.invoke(operation, operation_id, timeout, cancel, begin, end).await
	}

	/// Polls a command's progress until it reaches a terminal state.
	///
	/// Gives up with [`InteropError::Timeout`] once the configured operation
	/// timeout has passed. Node transitions report a different progress shape;
	/// wait for those with [`TestManagementClient::wait_for_node_transition`].
	#[instrument(name = "client::wait_for_test_command", level = "debug", skip_all, fields(operation_id = %operation_id, command_type = ?command_type))]
	pub async fn wait_for_test_command(
		&self,
		command_type: TestCommandType,
		operation_id: Uuid,
		poll_interval: Duration,
	) -> Result<PartitionProgress> {
		self.poll_until_terminal(operation_id, poll_interval, |progress: &PartitionProgress| progress.state, move || async move {
			match command_type {
				TestCommandType::DataLoss => self.get_partition_data_loss_progress(operation_id).await,
				TestCommandType::QuorumLoss => self.get_partition_quorum_loss_progress(operation_id).await,
				TestCommandType::RestartPartition => self.get_partition_restart_progress(operation_id).await,
				TestCommandType::NodeTransition => Err(InteropError::invalid_argument(
					"command_type",
					"node transitions are awaited with wait_for_node_transition",
				)),
			}
		})
		.await
	}

	/// Polls a node transition until it reaches a terminal state.
	#[instrument(name = "client::wait_for_node_transition", level = "debug", skip_all, fields(operation_id = %operation_id))]
	pub async fn wait_for_node_transition(
		&self,
		operation_id: Uuid,
		poll_interval: Duration,
	) -> Result<NodeTransitionProgress> {
		self.poll_until_terminal(
			operation_id,
			poll_interval,
			|progress: &NodeTransitionProgress| progress.state,
			move || self.get_node_transition_progress(operation_id),
		)
		.await
	}

	async fn poll_until_terminal<P, F, Fut>(
		&self,
		operation_id: Uuid,
		poll_interval: Duration,
		state_of: fn(&P) -> TestCommandProgressState,
		mut poll: F,
	) -> Result<P>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<P>>,
	{
		let deadline = Instant::now() + self.channel.config().operation_timeout;
		loop {
			let progress = poll().await?;
			let state = state_of(&progress);
			if state.is_terminal() {
				return Ok(progress);
			}
			if Instant::now() >= deadline {
				return Err(InteropError::Timeout {
					operation: format!("waiting for test command {operation_id}"),
				});
			}
			debug!(state = ?state, "test command still in progress");
			tokio::time::sleep(poll_interval).await;
		}
	}

	pub async fn get_test_command_status_list(
		&self,
		description: &TestCommandListDescription,
	) -> Result<TestCommandStatusList> {
		self.get_test_command_status_list_with(description, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_test_command_status_list", level = "debug", skip_all)]
	pub async fn get_test_command_status_list_with(
		&self,
		description: &TestCommandListDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<TestCommandStatusList> {
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				GET_TEST_COMMAND_STATUS_LIST,
				*description,
				timeout,
				cancel,
				vtable.begin_get_test_command_status_list,
				finish_with::<TestCommandStatusList>(
					vtable.end_get_test_command_status_list,
					TestCommandStatusListFFI::empty,
					GET_TEST_COMMAND_STATUS_LIST,
				),
			)
			.await
	}

	/// Cancels a running command; `force` skips rolling back its effects.
	pub async fn cancel_test_command(&self, operation_id: Uuid, force: bool) -> Result<()> {
		self.cancel_test_command_with(operation_id, force, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::cancel_test_command", level = "debug", skip_all, fields(operation_id = %operation_id, force))]
	pub async fn cancel_test_command_with(
		&self,
		operation_id: Uuid,
		force: bool,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<()> {
		let description = CancelTestCommandDescription::new(operation_id, force);
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				CANCEL_TEST_COMMAND,
				description,
				timeout,
				cancel,
				vtable.begin_cancel_test_command,
				finish(vtable.end_cancel_test_command, CANCEL_TEST_COMMAND),
			)
			.await
	}

	pub async fn start_chaos(&self, parameters: &ChaosParameters) -> Result<()> {
		self.start_chaos_with(parameters, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::start_chaos", level = "debug", skip_all, fields(max_concurrent_faults = parameters.max_concurrent_faults))]
	pub async fn start_chaos_with(
		&self,
		parameters: &ChaosParameters,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<()> {
		parameters.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				START_CHAOS,
				parameters.clone(),
				timeout,
				cancel,
				vtable.begin_start_chaos,
				finish(vtable.end_start_chaos, START_CHAOS),
			)
			.await
	}

	pub async fn stop_chaos(&self) -> Result<()> {
		self.stop_chaos_with(self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::stop_chaos", level = "debug", skip_all)]
	pub async fn stop_chaos_with(&self, timeout: Duration, cancel: &CancellationToken) -> Result<()> {
		let vtable = self.channel.vtable();
		self.channel
			.invoke_bare(
				STOP_CHAOS,
				timeout,
				cancel,
				vtable.begin_stop_chaos,
				finish(vtable.end_stop_chaos, STOP_CHAOS),
			)
			.await
	}

	/// Reports whether chaos is running and with which parameters.
	pub async fn get_chaos(&self) -> Result<ChaosDescription> {
		self.get_chaos_with(self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_chaos", level = "debug", skip_all)]
	pub async fn get_chaos_with(&self, timeout: Duration, cancel: &CancellationToken) -> Result<ChaosDescription> {
		let vtable = self.channel.vtable();
		self.channel
			.invoke_bare(
				GET_CHAOS,
				timeout,
				cancel,
				vtable.begin_get_chaos,
				finish_with::<ChaosDescription>(vtable.end_get_chaos, ChaosDescriptionFFI::empty, GET_CHAOS),
			)
			.await
	}

	pub async fn get_chaos_schedule(&self) -> Result<ChaosScheduleDescription> {
		self.get_chaos_schedule_with(self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_chaos_schedule", level = "debug", skip_all)]
	pub async fn get_chaos_schedule_with(
		&self,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<ChaosScheduleDescription> {
		let vtable = self.channel.vtable();
		self.channel
			.invoke_bare(
				GET_CHAOS_SCHEDULE,
				timeout,
				cancel,
				vtable.begin_get_chaos_schedule,
				finish_with::<ChaosScheduleDescription>(
					vtable.end_get_chaos_schedule,
					ChaosScheduleDescriptionFFI::empty,
					GET_CHAOS_SCHEDULE,
				),
			)
			.await
	}

	/// Replaces the stored chaos schedule.
	///
	/// `description.version` must match the version last read through
	/// [`TestManagementClient::get_chaos_schedule`]; a stale version is
	/// rejected by the native side.
	pub async fn set_chaos_schedule(&self, description: &ChaosScheduleDescription) -> Result<()> {
		self.set_chaos_schedule_with(description, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::set_chaos_schedule", level = "debug", skip_all, fields(version = description.version))]
	pub async fn set_chaos_schedule_with(
		&self,
		description: &ChaosScheduleDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<()> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				SET_CHAOS_SCHEDULE,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_set_chaos_schedule,
				finish(vtable.end_set_chaos_schedule, SET_CHAOS_SCHEDULE),
			)
			.await
	}

	/// Starts or stops a node; track it with the same operation id.
	pub async fn start_node_transition(&self, description: &NodeTransitionDescription) -> Result<()> {
		self.start_node_transition_with(description, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::start_node_transition", level = "debug", skip_all, fields(operation_id = %description.operation_id, node = description.transition.node_name()))]
	pub async fn start_node_transition_with(
		&self,
		description: &NodeTransitionDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<()> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				START_NODE_TRANSITION,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_start_node_transition,
				finish(vtable.end_start_node_transition, START_NODE_TRANSITION),
			)
			.await
	}

	pub async fn get_node_transition_progress(&self, operation_id: Uuid) -> Result<NodeTransitionProgress> {
		self.get_node_transition_progress_with(operation_id, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_node_transition_progress", level = "debug", skip_all, fields(operation_id = %operation_id))]
	pub async fn get_node_transition_progress_with(
		&self,
		operation_id: Uuid,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<NodeTransitionProgress> {
		if operation_id.is_nil() {
			return Err(InteropError::invalid_argument("operation_id", "must not be nil"));
		}
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				GET_NODE_TRANSITION_PROGRESS,
				operation_id,
				timeout,
				cancel,
				vtable.begin_get_node_transition_progress,
				finish_with::<NodeTransitionProgress>(
					vtable.end_get_node_transition_progress,
					NodeTransitionProgressFFI::empty,
					GET_NODE_TRANSITION_PROGRESS,
				),
			)
			.await
	}

	/// Fetches one page of chaos events.
	///
	/// Follow [`ChaosReport::next_request`] for the remaining pages.
	pub async fn get_chaos_report(&self, request: &ChaosReportRequest) -> Result<ChaosReport> {
		self.get_chaos_report_with(request, self.default_timeout(), &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_chaos_report", level = "debug", skip_all)]
	pub async fn get_chaos_report_with(
		&self,
		request: &ChaosReportRequest,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<ChaosReport> {
		request.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				GET_CHAOS_REPORT,
				request.clone(),
				timeout,
				cancel,
				vtable.begin_get_chaos_report,
				finish_with::<ChaosReport>(vtable.end_get_chaos_report, ChaosReportFFI::empty, GET_CHAOS_REPORT),
			)
			.await
	}
}
