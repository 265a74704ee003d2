// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::{Duration, UNIX_EPOCH};

use fabric_abi::{
	constants::{
		E_INVALIDARG, FABRIC_E_CHAOS_ALREADY_RUNNING, FABRIC_E_INSTANCE_ID_MISMATCH, FABRIC_E_KEY_NOT_FOUND,
		FABRIC_E_NODE_IS_UP, FABRIC_E_NODE_NOT_FOUND, FABRIC_E_NODE_TRANSITION_IN_PROGRESS,
		FABRIC_E_PARTITION_NOT_FOUND, FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS, FABRIC_E_TIMEOUT,
	},
	query::{NODE_STATUS_DOWN, NODE_STATUS_UP},
	testability::{CHAOS_EVENT_WAITING, TEST_COMMAND_STATE_FAULTED, TEST_COMMAND_TYPE_DATA_LOSS},
};
use fabric_client::{
	ApartmentConfig, CancellationToken, ChaosEventKind, ChaosParameters, ChaosReportFilter, ChaosReportRequest,
	ChaosSchedule, ChaosScheduleActiveDays, ChaosScheduleDescription, ChaosScheduleJob, ChaosScheduleStatus,
	ChaosStatus, ChaosTimeOfDay, ChaosTimeRange, ClientConfig, DataLossMode, FabricClient, InvokeDataLossDescription,
	InvokeQuorumLossDescription, NativeErrorCode, NativeTestManagementClient, NodeTransitionDescription,
	NodeTransitionTarget, PartitionSelector, QuorumLossMode, RestartPartitionDescription, RestartPartitionMode,
	TestCommandListDescription, TestCommandProgressState, TestCommandStateFilter, TestCommandType,
	TestCommandTypeFilter, TestManagementClient,
};
use fabric_testing::{Completion, SimulatedCluster, SimulatedNode, SimulatedPartition, init_tracing};
use uuid::Uuid;

const SERVICE: &str = "fabric:/app/svc";
const PARTITION: [u8; 16] = [0x11; 16];

fn client(cluster: &SimulatedCluster) -> TestManagementClient {
	init_tracing();
	let config = ClientConfig::default().with_apartment(ApartmentConfig::default().with_threads(2));
	let fabric = FabricClient::new(config).unwrap();
	let (vtable, instance) = cluster.test_management_client();
	let native = unsafe { NativeTestManagementClient::from_raw(vtable, instance) }.unwrap();
	fabric.test_management_client(native)
}

fn cluster_with_singleton() -> SimulatedCluster {
	let cluster = SimulatedCluster::new();
	cluster.add_partition(SimulatedPartition::singleton(SERVICE, PARTITION));
	cluster
}

fn data_loss(operation_id: Uuid) -> InvokeDataLossDescription {
	InvokeDataLossDescription::new(operation_id, PartitionSelector::singleton(SERVICE), DataLossMode::Full)
}

#[tokio::test]
async fn test_data_loss_progresses_to_completion() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);
	let operation_id = Uuid::new_v4();

	client.start_partition_data_loss(&data_loss(operation_id)).await.unwrap();
	assert_eq!(cluster.last_timeout_ms(), 60_000);

	let commands = cluster.commands();
	assert_eq!(commands.len(), 1);
	assert_eq!(commands[0].operation_id, *operation_id.as_bytes());
	assert_eq!(commands[0].command_type, TEST_COMMAND_TYPE_DATA_LOSS);

	let progress = client.get_partition_data_loss_progress(operation_id).await.unwrap();
	assert_eq!(progress.state, TestCommandProgressState::Running);
	let selected = progress.selected_partition.unwrap();
	assert_eq!(selected.service_name, SERVICE);
	assert_eq!(selected.partition_id, Uuid::from_bytes(PARTITION));
	assert_eq!(progress.error, None);

	let progress = client.get_partition_data_loss_progress(operation_id).await.unwrap();
	assert_eq!(progress.state, TestCommandProgressState::Completed);

	let counters = cluster.counters();
	assert_eq!(counters.begins(), 3);
	assert_eq!(counters.ends(), 3);
	assert_eq!(counters.releases(), 3);
}

#[tokio::test]
async fn test_synchronous_completion_through_the_client() {
	let cluster = cluster_with_singleton().with_completion(Completion::Inline);
	let client = client(&cluster);

	client.start_partition_data_loss(&data_loss(Uuid::new_v4())).await.unwrap();

	assert_eq!(cluster.counters().callbacks(), 1);
	assert_eq!(cluster.counters().ends(), 1);
}

#[tokio::test]
async fn test_duplicate_operation_id_is_rejected_by_the_cluster() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);
	let operation_id = Uuid::new_v4();

	client.start_partition_data_loss(&data_loss(operation_id)).await.unwrap();
	let err = client.start_partition_data_loss(&data_loss(operation_id)).await.unwrap_err();

	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS)));
	assert_eq!(cluster.commands().len(), 1);
}

#[tokio::test]
async fn test_selectors_resolve_partitions() {
	let cluster = SimulatedCluster::new();
	cluster.add_partition(SimulatedPartition::ranged(SERVICE, [1; 16], 0, 99));
	cluster.add_partition(SimulatedPartition::ranged(SERVICE, [2; 16], 100, 199));
	cluster.add_partition(SimulatedPartition::named("fabric:/app/named", [3; 16], "east"));
	let client = client(&cluster);

	let restart = RestartPartitionDescription::new(
		Uuid::new_v4(),
		PartitionSelector::uniform_int64(SERVICE, 150),
		RestartPartitionMode::OnlyActiveSecondaries,
	);
	client.start_partition_restart(&restart).await.unwrap();

	let by_id = RestartPartitionDescription::new(
		Uuid::new_v4(),
		PartitionSelector::partition_id(SERVICE, Uuid::from_bytes([1; 16])),
		RestartPartitionMode::AllReplicasOrInstances,
	);
	client.start_partition_restart(&by_id).await.unwrap();

	let named = InvokeDataLossDescription::new(
		Uuid::new_v4(),
		PartitionSelector::named("fabric:/app/named", "east"),
		DataLossMode::Partial,
	);
	client.start_partition_data_loss(&named).await.unwrap();

	let targets: Vec<[u8; 16]> = cluster.commands().iter().map(|c| c.partition_id).collect();
	assert_eq!(targets, vec![[2; 16], [1; 16], [3; 16]]);
}

#[tokio::test]
async fn test_unmatched_selector_reports_partition_not_found() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);

	let description = InvokeDataLossDescription::new(
		Uuid::new_v4(),
		PartitionSelector::named(SERVICE, "missing"),
		DataLossMode::Partial,
	);
	let err = client.start_partition_data_loss(&description).await.unwrap_err();

	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_PARTITION_NOT_FOUND)));
}

#[tokio::test]
async fn test_invalid_request_never_reaches_native() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);

	let description = InvokeDataLossDescription::new(
		Uuid::new_v4(),
		PartitionSelector::singleton("app/svc"),
		DataLossMode::Full,
	);
	let err = client.start_partition_data_loss(&description).await.unwrap_err();
	assert!(err.is_invalid_argument());

	let quorum = InvokeQuorumLossDescription::new(
		Uuid::new_v4(),
		PartitionSelector::singleton(SERVICE),
		QuorumLossMode::QuorumReplicas,
		Duration::ZERO,
	);
	assert!(client.start_partition_quorum_loss(&quorum).await.unwrap_err().is_invalid_argument());

	assert!(client.get_partition_restart_progress(Uuid::nil()).await.unwrap_err().is_invalid_argument());
	assert!(cluster.calls().is_empty());
}

#[tokio::test]
async fn test_explicit_timeout_is_forwarded() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);

	let quorum = InvokeQuorumLossDescription::new(
		Uuid::new_v4(),
		PartitionSelector::random(SERVICE),
		QuorumLossMode::AllReplicas,
		Duration::from_secs(30),
	);
	client.start_partition_quorum_loss_with(&quorum, Duration::from_millis(1_500), &CancellationToken::new()).await.unwrap();
	assert_eq!(cluster.last_timeout_ms(), 1_500);

	client.stop_chaos_with(Duration::MAX, &CancellationToken::new()).await.unwrap();
	assert_eq!(cluster.last_timeout_ms(), u32::MAX);
}

#[tokio::test]
async fn test_begin_failure_skips_the_callback() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);
	cluster.fail_begin("start_partition_data_loss", E_INVALIDARG);

	let err = client.start_partition_data_loss(&data_loss(Uuid::new_v4())).await.unwrap_err();

	assert_eq!(err.native_code(), Some(NativeErrorCode(E_INVALIDARG)));
	assert!(!err.is_invalid_argument());
	assert_eq!(cluster.counters().callbacks(), 0);
	assert_eq!(cluster.counters().ends(), 0);
	assert!(cluster.commands().is_empty());
}

#[tokio::test]
async fn test_native_timeout_surfaces_from_end() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);
	cluster.fail_end("get_test_command_status_list", FABRIC_E_TIMEOUT);

	let err = client.get_test_command_status_list(&TestCommandListDescription::default()).await.unwrap_err();

	assert!(err.is_timeout());
	assert_eq!(cluster.counters().ends(), 1);
	assert_eq!(cluster.counters().releases(), 1);
}

#[tokio::test]
async fn test_status_list_filters_by_type_and_state() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);
	let lost = Uuid::new_v4();
	let restarted = Uuid::new_v4();

	client.start_partition_data_loss(&data_loss(lost)).await.unwrap();
	let restart = RestartPartitionDescription::new(
		restarted,
		PartitionSelector::singleton(SERVICE),
		RestartPartitionMode::AllReplicasOrInstances,
	);
	client.start_partition_restart(&restart).await.unwrap();
	cluster.set_command_state(*restarted.as_bytes(), TEST_COMMAND_STATE_FAULTED);

	let all = client.get_test_command_status_list(&TestCommandListDescription::default()).await.unwrap();
	assert_eq!(all.len(), 2);

	let data_loss_only = TestCommandListDescription::new(TestCommandStateFilter::ALL, TestCommandTypeFilter::DATA_LOSS);
	let list = client.get_test_command_status_list(&data_loss_only).await.unwrap();
	assert_eq!(list.len(), 1);
	assert_eq!(list.find(lost).unwrap().command_type, TestCommandType::DataLoss);

	let failed = TestCommandListDescription::new(TestCommandStateFilter::FAILED, TestCommandTypeFilter::ALL);
	let list = client.get_test_command_status_list(&failed).await.unwrap();
	assert_eq!(list.len(), 1);
	assert_eq!(list.find(restarted).unwrap().state, TestCommandProgressState::Faulted);
}

#[tokio::test]
async fn test_cancel_test_command() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);
	let operation_id = Uuid::new_v4();
	let quorum = InvokeQuorumLossDescription::new(
		operation_id,
		PartitionSelector::singleton(SERVICE),
		QuorumLossMode::QuorumReplicas,
		Duration::from_secs(10),
	);

	client.start_partition_quorum_loss(&quorum).await.unwrap();
	client.cancel_test_command(operation_id, true).await.unwrap();

	let progress = client.get_partition_quorum_loss_progress(operation_id).await.unwrap();
	assert_eq!(progress.state, TestCommandProgressState::ForceCancelled);

	let err = client.cancel_test_command(Uuid::new_v4(), false).await.unwrap_err();
	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_KEY_NOT_FOUND)));
}

#[tokio::test]
async fn test_progress_of_unknown_command() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);

	let err = client.get_partition_data_loss_progress(Uuid::new_v4()).await.unwrap_err();

	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_KEY_NOT_FOUND)));
}

#[tokio::test]
async fn test_wait_for_test_command_polls_until_terminal() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);
	let operation_id = Uuid::new_v4();
	let restart = RestartPartitionDescription::new(
		operation_id,
		PartitionSelector::singleton(SERVICE),
		RestartPartitionMode::AllReplicasOrInstances,
	);
	client.start_partition_restart(&restart).await.unwrap();

	let progress = client
		.wait_for_test_command(TestCommandType::RestartPartition, operation_id, Duration::from_millis(1))
		.await
		.unwrap();

	assert_eq!(progress.state, TestCommandProgressState::Completed);
	let polls = cluster.calls().iter().filter(|call| **call == "get_partition_restart_progress").count();
	assert_eq!(polls, 2);
}

#[tokio::test]
async fn test_chaos_lifecycle() {
	let cluster = SimulatedCluster::new();
	let client = client(&cluster);
	let parameters = ChaosParameters::default()
		.with_max_concurrent_faults(3)
		.with_time_to_run(Duration::from_secs(600))
		.with_context("run", "nightly");

	let description = client.get_chaos().await.unwrap();
	assert_eq!(description.status, ChaosStatus::Stopped);
	assert_eq!(description.parameters, None);

	client.start_chaos(&parameters).await.unwrap();
	let started = cluster.chaos().parameters.unwrap();
	assert_eq!(started.max_concurrent_faults, 3);
	assert_eq!(started.time_to_run_secs, 600);
	assert_eq!(started.context, vec![("run".to_string(), "nightly".to_string())]);

	let description = client.get_chaos().await.unwrap();
	assert!(description.is_running());
	assert_eq!(description.schedule_status, ChaosScheduleStatus::Stopped);
	assert_eq!(description.parameters, Some(parameters.clone()));

	let err = client.start_chaos(&parameters).await.unwrap_err();
	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_CHAOS_ALREADY_RUNNING)));

	let report = client.get_chaos_report(&ChaosReportFilter::until_now().into()).await.unwrap();
	assert_eq!(report.status, ChaosStatus::Running);

	client.stop_chaos().await.unwrap();
	let report = client.get_chaos_report(&ChaosReportFilter::until_now().into()).await.unwrap();
	assert_eq!(report.status, ChaosStatus::Stopped);
	let kinds: Vec<ChaosEventKind> = report.events.iter().map(|event| event.kind).collect();
	assert_eq!(kinds, vec![ChaosEventKind::Started, ChaosEventKind::Stopped]);
	assert_eq!(report.continuation_token, None);
}

#[tokio::test]
async fn test_chaos_report_pages_with_continuation_tokens() {
	let cluster = SimulatedCluster::new().with_report_page_size(2);
	for i in 0..5 {
		cluster.record_chaos_event(CHAOS_EVENT_WAITING, &format!("waiting {i}"));
	}
	let client = client(&cluster);

	let mut request: ChaosReportRequest = ChaosReportFilter::until_now().into();
	let mut reasons = Vec::new();
	let mut pages = 0;
	loop {
		let report = client.get_chaos_report(&request).await.unwrap();
		pages += 1;
		reasons.extend(report.events.iter().map(|event| event.reason.clone()));
		match report.next_request() {
			Some(next) => request = next,
			None => break,
		}
	}

	assert_eq!(pages, 3);
	assert_eq!(reasons, (0..5).map(|i| format!("waiting {i}")).collect::<Vec<_>>());

	let err = client.get_chaos_report(&ChaosReportRequest::Continuation(String::new())).await.unwrap_err();
	assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn test_dropping_the_client_releases_the_instance() {
	let cluster = cluster_with_singleton();
	let client = client(&cluster);
	let clone = client.clone();

	client.start_partition_data_loss(&data_loss(Uuid::new_v4())).await.unwrap();
	drop(client);
	assert_eq!(cluster.instance_releases(), 0);

	drop(clone);
	assert_eq!(cluster.instance_releases(), 1);
}

fn schedule_around(now_utc_ms: i64, starts_in: i64) -> ChaosSchedule {
	let start = UNIX_EPOCH + Duration::from_millis((now_utc_ms + starts_in) as u64);
	ChaosSchedule::new(start, start + Duration::from_secs(30 * 24 * 3600))
		.with_parameters("light", ChaosParameters::default().with_context("tier", "light"))
		.with_parameters("heavy", ChaosParameters::default().with_max_concurrent_faults(4))
		.with_job(
			ChaosScheduleJob::new("light", ChaosScheduleActiveDays::WEEKDAYS)
				.with_time_range(ChaosTimeRange::new(ChaosTimeOfDay::new(9, 0), ChaosTimeOfDay::new(17, 30))),
		)
		.with_job(ChaosScheduleJob::new("heavy", ChaosScheduleActiveDays::WEEKEND).with_time_range(ChaosTimeRange::WHOLE_DAY))
}

#[tokio::test]
async fn test_chaos_schedule_round_trips_through_the_cluster() {
	let cluster = SimulatedCluster::new();
	let client = client(&cluster);

	let stored = client.get_chaos_schedule().await.unwrap();
	assert_eq!(stored.version, 0);
	assert!(stored.schedule.jobs.is_empty());

	let schedule = schedule_around(cluster.now_utc_ms(), -60_000);
	client.set_chaos_schedule(&ChaosScheduleDescription::new(stored.version, schedule.clone())).await.unwrap();

	let stored = client.get_chaos_schedule().await.unwrap();
	assert_eq!(stored.version, 1);
	assert_eq!(stored.schedule, schedule);
	assert_eq!(cluster.chaos_schedule().jobs.len(), 2);

	let description = client.get_chaos().await.unwrap();
	assert_eq!(description.schedule_status, ChaosScheduleStatus::Active);
	assert!(!description.is_running());
}

#[tokio::test]
async fn test_future_schedule_is_pending() {
	let cluster = SimulatedCluster::new();
	let client = client(&cluster);

	let schedule = schedule_around(cluster.now_utc_ms(), 3_600_000);
	client.set_chaos_schedule(&ChaosScheduleDescription::new(0, schedule)).await.unwrap();

	assert_eq!(client.get_chaos().await.unwrap().schedule_status, ChaosScheduleStatus::Pending);
}

#[tokio::test]
async fn test_stale_schedule_version_is_rejected() {
	let cluster = SimulatedCluster::new();
	let client = client(&cluster);
	let schedule = schedule_around(cluster.now_utc_ms(), 0);

	client.set_chaos_schedule(&ChaosScheduleDescription::new(0, schedule.clone())).await.unwrap();
	let err = client.set_chaos_schedule(&ChaosScheduleDescription::new(0, schedule)).await.unwrap_err();

	assert_eq!(err.native_code(), Some(NativeErrorCode(E_INVALIDARG)));
	assert_eq!(cluster.chaos_schedule().version, 1);
}

#[tokio::test]
async fn test_invalid_schedule_never_reaches_native() {
	let cluster = SimulatedCluster::new();
	let client = client(&cluster);
	let schedule = schedule_around(cluster.now_utc_ms(), 0)
		.with_job(ChaosScheduleJob::new("missing", ChaosScheduleActiveDays::SUNDAY).with_time_range(ChaosTimeRange::WHOLE_DAY));

	let err = client.set_chaos_schedule(&ChaosScheduleDescription::new(0, schedule)).await.unwrap_err();

	assert!(err.is_invalid_argument());
	assert!(cluster.calls().is_empty());
}

fn cluster_with_node(name: &str, instance_id: u64) -> SimulatedCluster {
	let cluster = SimulatedCluster::new();
	cluster.add_node(SimulatedNode::up(name).with_instance_id(instance_id));
	cluster
}

#[tokio::test]
async fn test_stop_then_start_a_node() {
	let cluster = cluster_with_node("node-1", 7);
	let client = client(&cluster);
	let stop = Uuid::new_v4();

	client
		.start_node_transition(&NodeTransitionDescription::stop(stop, "node-1", 7, Duration::from_secs(600)))
		.await
		.unwrap();
	assert_eq!(cluster.node_transitions()[0].stop_duration_secs, 600);

	let progress = client.wait_for_node_transition(stop, Duration::from_millis(1)).await.unwrap();
	assert_eq!(progress.state, TestCommandProgressState::Completed);
	assert_eq!(
		progress.target,
		Some(NodeTransitionTarget {
			node_name: "node-1".to_string(),
			node_instance_id: 7,
		})
	);
	assert_eq!(cluster.nodes()[0].status, NODE_STATUS_DOWN);

	let start = Uuid::new_v4();
	client.start_node_transition(&NodeTransitionDescription::start(start, "node-1", 7)).await.unwrap();
	let progress = client.wait_for_node_transition(start, Duration::from_millis(1)).await.unwrap();
	assert_eq!(progress.state, TestCommandProgressState::Completed);
	assert_eq!(cluster.nodes()[0].status, NODE_STATUS_UP);
	assert_eq!(cluster.nodes()[0].instance_id, 8);

	let transitions = TestCommandListDescription::new(TestCommandStateFilter::ALL, TestCommandTypeFilter::NODE_TRANSITION);
	let list = client.get_test_command_status_list(&transitions).await.unwrap();
	assert_eq!(list.len(), 2);
	assert!(list.iter().all(|status| status.command_type == TestCommandType::NodeTransition));
}

#[tokio::test]
async fn test_starting_an_up_node_faults() {
	let cluster = cluster_with_node("node-1", 1);
	let client = client(&cluster);
	let operation_id = Uuid::new_v4();

	client.start_node_transition(&NodeTransitionDescription::start(operation_id, "node-1", 1)).await.unwrap();
	let progress = client.wait_for_node_transition(operation_id, Duration::from_millis(1)).await.unwrap();

	assert_eq!(progress.state, TestCommandProgressState::Faulted);
	assert_eq!(progress.error, Some(NativeErrorCode(FABRIC_E_NODE_IS_UP)));
}

#[tokio::test]
async fn test_node_transition_rejections() {
	let cluster = cluster_with_node("node-1", 3);
	let client = client(&cluster);
	let stop_for = Duration::from_secs(60);

	let err = client
		.start_node_transition(&NodeTransitionDescription::stop(Uuid::new_v4(), "node-9", 3, stop_for))
		.await
		.unwrap_err();
	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_NODE_NOT_FOUND)));

	let err = client
		.start_node_transition(&NodeTransitionDescription::stop(Uuid::new_v4(), "node-1", 2, stop_for))
		.await
		.unwrap_err();
	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_INSTANCE_ID_MISMATCH)));

	let first = Uuid::new_v4();
	client.start_node_transition(&NodeTransitionDescription::stop(first, "node-1", 3, stop_for)).await.unwrap();
	let err = client
		.start_node_transition(&NodeTransitionDescription::stop(Uuid::new_v4(), "node-1", 3, stop_for))
		.await
		.unwrap_err();
	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_NODE_TRANSITION_IN_PROGRESS)));

	let err = client.start_node_transition(&NodeTransitionDescription::start(first, "node-1", 3)).await.unwrap_err();
	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS)));

	let err = client
		.start_node_transition(&NodeTransitionDescription::stop(Uuid::new_v4(), "node-1", 3, Duration::ZERO))
		.await
		.unwrap_err();
	assert!(err.is_invalid_argument());
	assert_eq!(cluster.node_transitions().len(), 1);
}

#[tokio::test]
async fn test_node_transitions_are_not_awaited_as_partition_commands() {
	let cluster = cluster_with_node("node-1", 1);
	let client = client(&cluster);

	let err = client
		.wait_for_test_command(TestCommandType::NodeTransition, Uuid::new_v4(), Duration::from_millis(1))
		.await
		.unwrap_err();

	assert!(err.is_invalid_argument());
	assert!(cluster.calls().is_empty());
}

#[tokio::test]
async fn test_cancelling_a_node_transition() {
	let cluster = cluster_with_node("node-1", 1);
	let client = client(&cluster);
	let operation_id = Uuid::new_v4();

	client
		.start_node_transition(&NodeTransitionDescription::stop(operation_id, "node-1", 1, Duration::from_secs(60)))
		.await
		.unwrap();
	client.cancel_test_command(operation_id, false).await.unwrap();

	let progress = client.get_node_transition_progress(operation_id).await.unwrap();
	assert_eq!(progress.state, TestCommandProgressState::Cancelled);
	assert_eq!(cluster.nodes()[0].status, NODE_STATUS_UP);
}
