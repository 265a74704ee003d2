// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::BTreeMap, time::Duration};

use fabric_abi::{
	constants::{FABRIC_E_APPLICATION_NOT_FOUND, FABRIC_E_NOT_READY, FABRIC_E_PARTITION_NOT_FOUND},
	query::{NODE_STATUS_DOWN, NODE_STATUS_REMOVED, REPLICA_ROLE_ACTIVE_SECONDARY, SERVICE_KIND_STATELESS},
};
use fabric_client::{
	ApartmentConfig, ApplicationQueryDescription, ApplicationStatus, CancellationToken, ClientConfig, FabricClient,
	HealthState, NativeErrorCode, NativeQueryClient, NodeQueryDescription, NodeStatus, NodeStatusFilter,
	PartitionQueryDescription, PartitionScheme, PartitionStatus, QueryClient, ReplicaQueryDescription, ReplicaRole,
	ReplicaStatus, ServiceKind, ServiceQueryDescription, ServiceStatus,
};
use fabric_testing::{
	SimulatedApplication, SimulatedCluster, SimulatedNode, SimulatedPartition, SimulatedReplica, SimulatedService,
	init_tracing,
};
use uuid::Uuid;

fn client(cluster: &SimulatedCluster) -> QueryClient {
	init_tracing();
	let config = ClientConfig::default()
		.with_default_timeout(Duration::from_secs(15))
		.with_apartment(ApartmentConfig::default().with_threads(1));
	let fabric = FabricClient::new(config).unwrap();
	let (vtable, instance) = cluster.query_client();
	let native = unsafe { NativeQueryClient::from_raw(vtable, instance) }.unwrap();
	fabric.query_client(native)
}

fn five_nodes() -> SimulatedCluster {
	let cluster = SimulatedCluster::new();
	cluster.add_node(SimulatedNode::up("node-0").seed());
	cluster.add_node(SimulatedNode::up("node-1"));
	cluster.add_node(SimulatedNode::up("node-2").with_status(NODE_STATUS_DOWN));
	cluster.add_node(SimulatedNode::up("node-3"));
	cluster.add_node(SimulatedNode::up("node-4").with_status(NODE_STATUS_REMOVED));
	cluster
}

#[tokio::test]
async fn test_node_list_copies_every_field() {
	let cluster = five_nodes();
	let client = client(&cluster);

	let list = client.get_node_list(&NodeQueryDescription::default().with_node_name("node-0")).await.unwrap();

	assert_eq!(cluster.last_timeout_ms(), 15_000);
	assert_eq!(list.continuation_token, None);
	let node = &list.nodes[0];
	assert_eq!(node.name, "node-0");
	assert_eq!(node.ip_address_or_fqdn, "node-0.cluster.local");
	assert_eq!(node.node_type, "NodeType0");
	assert_eq!(node.code_version, "10.1.0.0");
	assert_eq!(node.status, NodeStatus::Up);
	assert!(node.is_seed_node);
	assert_eq!(node.upgrade_domain, "UD0");
	assert_eq!(node.fault_domain, "fd:/0");
	assert_eq!(node.health_state, HealthState::Ok);
	assert_eq!(node.up_time, Duration::from_secs(3600));
}

#[tokio::test]
async fn test_node_status_filter() {
	let cluster = five_nodes();
	let client = client(&cluster);

	let down = client
		.get_node_list(&NodeQueryDescription::default().with_status_filter(NodeStatusFilter::DOWN))
		.await
		.unwrap();
	assert_eq!(down.nodes.len(), 1);
	assert_eq!(down.nodes[0].status, NodeStatus::Down);

	let gone = NodeQueryDescription::default().with_status_filter(NodeStatusFilter::DOWN | NodeStatusFilter::REMOVED);
	let gone = client.get_node_list(&gone).await.unwrap();
	let names: Vec<&str> = gone.nodes.iter().map(|node| node.name.as_str()).collect();
	assert_eq!(names, vec!["node-2", "node-4"]);
}

#[tokio::test]
async fn test_node_list_pages() {
	let cluster = five_nodes();
	let client = client(&cluster);

	let first = client.get_node_list(&NodeQueryDescription::default().with_max_results(2)).await.unwrap();
	assert_eq!(first.nodes.len(), 2);
	let token = first.continuation_token.unwrap();

	let second = client
		.get_node_list(&NodeQueryDescription::default().with_max_results(2).with_continuation_token(token))
		.await
		.unwrap();
	assert_eq!(second.nodes[0].name, "node-2");

	let all = client.get_all_nodes(&NodeQueryDescription::default().with_max_results(2)).await.unwrap();
	let names: Vec<String> = all.into_iter().map(|node| node.name).collect();
	assert_eq!(names, (0..5).map(|i| format!("node-{i}")).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_partition_list_for_a_service() {
	let cluster = SimulatedCluster::new();
	cluster.add_partition(SimulatedPartition::ranged("fabric:/app/svc", [1; 16], 0, 49));
	cluster.add_partition(SimulatedPartition::ranged("fabric:/app/svc", [2; 16], 50, 99));
	cluster.add_partition(SimulatedPartition {
		service_kind: SERVICE_KIND_STATELESS,
		..SimulatedPartition::named("fabric:/app/web", [3; 16], "east")
	});
	let client = client(&cluster);

	let list = client.get_partition_list(&PartitionQueryDescription::new("fabric:/app/svc")).await.unwrap();
	assert_eq!(list.partitions.len(), 2);
	let second = &list.partitions[1];
	assert_eq!(second.id, Uuid::from_bytes([2; 16]));
	assert_eq!(second.service_kind, ServiceKind::Stateful);
	assert_eq!(
		second.scheme,
		PartitionScheme::Int64Range {
			low_key: 50,
			high_key: 99
		}
	);
	assert_eq!(second.status, PartitionStatus::Ready);
	assert_eq!(second.replica_count, 3);
	assert_eq!(second.min_replica_set_size, Some(2));

	let web = client.get_partition_list(&PartitionQueryDescription::new("fabric:/app/web")).await.unwrap();
	assert_eq!(
		web.partitions[0].scheme,
		PartitionScheme::Named {
			name: "east".to_string()
		}
	);
	assert_eq!(web.partitions[0].min_replica_set_size, None);
}

#[tokio::test]
async fn test_partition_id_filter() {
	let cluster = SimulatedCluster::new();
	cluster.add_partition(SimulatedPartition::ranged("fabric:/app/svc", [1; 16], 0, 49));
	cluster.add_partition(SimulatedPartition::ranged("fabric:/app/svc", [2; 16], 50, 99));
	let client = client(&cluster);

	let description = PartitionQueryDescription::new("fabric:/app/svc").with_partition_id(Uuid::from_bytes([1; 16]));
	let list = client.get_partition_list(&description).await.unwrap();

	assert_eq!(list.partitions.len(), 1);
	assert_eq!(list.partitions[0].id, Uuid::from_bytes([1; 16]));
}

#[tokio::test]
async fn test_empty_service_name_is_rejected_locally() {
	let cluster = SimulatedCluster::new();
	let client = client(&cluster);

	let err = client.get_partition_list(&PartitionQueryDescription::new("")).await.unwrap_err();

	assert!(err.is_invalid_argument());
	assert!(cluster.calls().is_empty());
}

#[tokio::test]
async fn test_native_failure_keeps_its_code() {
	let cluster = five_nodes();
	let client = client(&cluster);
	cluster.fail_end("get_node_list", FABRIC_E_NOT_READY);

	let err = client
		.get_node_list_with(&NodeQueryDescription::default(), Duration::from_secs(1), &CancellationToken::new())
		.await
		.unwrap_err();

	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_NOT_READY)));
	assert_eq!(cluster.last_timeout_ms(), 1_000);
	assert_eq!(cluster.counters().releases(), 1);
}

#[tokio::test]
async fn test_concurrent_queries_share_one_instance() {
	let cluster = five_nodes();
	let client = client(&cluster);

	let handles: Vec<_> = (0..5)
		.map(|i| {
			let client = client.clone();
			tokio::spawn(async move {
				client.get_node_list(&NodeQueryDescription::default().with_node_name(format!("node-{i}"))).await
			})
		})
		.collect();

	for (i, handle) in handles.into_iter().enumerate() {
		let list = handle.await.unwrap().unwrap();
		assert_eq!(list.nodes[0].name, format!("node-{i}"));
	}
	assert_eq!(cluster.counters().ends(), 5);

	drop(client);
	assert_eq!(cluster.instance_releases(), 1);
}

fn shop() -> SimulatedCluster {
	let cluster = SimulatedCluster::new();
	cluster.add_application(SimulatedApplication::ready("fabric:/shop", "ShopType").with_parameter("CartCount", "3"));
	cluster.add_application(SimulatedApplication::ready("fabric:/billing", "BillingType"));
	cluster.add_application(SimulatedApplication::ready("fabric:/audit", "BillingType"));
	cluster.add_service(SimulatedService::stateful("fabric:/shop", "fabric:/shop/cart"));
	cluster.add_service(SimulatedService::stateless("fabric:/shop", "fabric:/shop/web"));
	cluster.add_service(SimulatedService::stateful("fabric:/billing", "fabric:/billing/ledger"));
	cluster.add_partition(SimulatedPartition::singleton("fabric:/shop/cart", [1; 16]));
	cluster.add_partition(SimulatedPartition {
		service_kind: SERVICE_KIND_STATELESS,
		..SimulatedPartition::singleton("fabric:/shop/web", [2; 16])
	});
	cluster.add_replica(SimulatedReplica::primary([1; 16], 11, "node-0"));
	cluster.add_replica(SimulatedReplica::primary([1; 16], 12, "node-1").with_role(REPLICA_ROLE_ACTIVE_SECONDARY));
	cluster.add_replica(SimulatedReplica::primary([1; 16], 13, "node-2").with_role(REPLICA_ROLE_ACTIVE_SECONDARY));
	cluster.add_replica(SimulatedReplica::instance([2; 16], 21, "node-0"));
	cluster
}

#[tokio::test]
async fn test_application_list_copies_parameters() {
	let cluster = shop();
	let client = client(&cluster);

	let list = client
		.get_application_list(&ApplicationQueryDescription::default().with_application_name("fabric:/shop"))
		.await
		.unwrap();

	assert_eq!(list.applications.len(), 1);
	let application = &list.applications[0];
	assert_eq!(application.type_name, "ShopType");
	assert_eq!(application.type_version, "1.0.0");
	assert_eq!(application.status, ApplicationStatus::Ready);
	assert_eq!(application.parameters, BTreeMap::from([("CartCount".to_string(), "3".to_string())]));
}

#[tokio::test]
async fn test_application_list_by_type_pages() {
	let cluster = shop();
	let client = client(&cluster);
	let description = ApplicationQueryDescription::default().with_application_type_name("BillingType").with_max_results(1);

	let first = client.get_application_list(&description).await.unwrap();
	assert_eq!(first.applications[0].name, "fabric:/billing");
	assert!(first.applications[0].parameters.is_empty());
	let token = first.continuation_token.unwrap();

	let second = client.get_application_list(&description.clone().with_continuation_token(token)).await.unwrap();
	assert_eq!(second.applications[0].name, "fabric:/audit");
	assert_eq!(second.continuation_token, None);
}

#[tokio::test]
async fn test_service_list_for_an_application() {
	let cluster = shop();
	let client = client(&cluster);

	let list = client.get_service_list(&ServiceQueryDescription::new("fabric:/shop")).await.unwrap();

	let names: Vec<&str> = list.services.iter().map(|service| service.name.as_str()).collect();
	assert_eq!(names, vec!["fabric:/shop/cart", "fabric:/shop/web"]);
	assert_eq!(list.services[0].kind, ServiceKind::Stateful);
	assert_eq!(list.services[0].has_persisted_state, Some(true));
	assert_eq!(list.services[0].type_name, "cartType");
	assert_eq!(list.services[1].kind, ServiceKind::Stateless);
	assert_eq!(list.services[1].has_persisted_state, None);
	assert_eq!(list.services[1].status, ServiceStatus::Active);

	let paged = client
		.get_service_list(&ServiceQueryDescription::new("fabric:/shop").with_max_results(1))
		.await
		.unwrap();
	assert_eq!(paged.services.len(), 1);
	assert_eq!(paged.continuation_token.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_service_list_of_unknown_application() {
	let cluster = shop();
	let client = client(&cluster);

	let err = client.get_service_list(&ServiceQueryDescription::new("fabric:/missing")).await.unwrap_err();

	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_APPLICATION_NOT_FOUND)));
}

#[tokio::test]
async fn test_malformed_application_name_never_reaches_native() {
	let cluster = shop();
	let client = client(&cluster);

	let err = client.get_service_list(&ServiceQueryDescription::new("shop")).await.unwrap_err();

	assert!(err.is_invalid_argument());
	assert!(cluster.calls().is_empty());
}

#[tokio::test]
async fn test_replica_list_roles() {
	let cluster = shop();
	let client = client(&cluster);

	let list = client.get_replica_list(&ReplicaQueryDescription::new(Uuid::from_bytes([1; 16]))).await.unwrap();

	let roles: Vec<Option<ReplicaRole>> = list.replicas.iter().map(|replica| replica.role).collect();
	assert_eq!(
		roles,
		vec![Some(ReplicaRole::Primary), Some(ReplicaRole::ActiveSecondary), Some(ReplicaRole::ActiveSecondary)]
	);
	assert_eq!(list.replicas[0].node_name, "node-0");
	assert_eq!(list.replicas[0].address, "tcp://node-0:2011");
	assert_eq!(list.replicas[0].status, ReplicaStatus::Ready);

	let instances = client.get_replica_list(&ReplicaQueryDescription::new(Uuid::from_bytes([2; 16]))).await.unwrap();
	assert_eq!(instances.replicas.len(), 1);
	assert_eq!(instances.replicas[0].service_kind, ServiceKind::Stateless);
	assert_eq!(instances.replicas[0].role, None);
}

#[tokio::test]
async fn test_replica_id_filter_and_paging() {
	let cluster = shop();
	let client = client(&cluster);
	let partition = Uuid::from_bytes([1; 16]);

	let one = client
		.get_replica_list(&ReplicaQueryDescription::new(partition).with_replica_or_instance_id(12))
		.await
		.unwrap();
	assert_eq!(one.replicas.len(), 1);
	assert_eq!(one.replicas[0].id, 12);

	let first = client.get_replica_list(&ReplicaQueryDescription::new(partition).with_max_results(2)).await.unwrap();
	assert_eq!(first.replicas.len(), 2);
	let rest = client
		.get_replica_list(
			&ReplicaQueryDescription::new(partition)
				.with_max_results(2)
				.with_continuation_token(first.continuation_token.unwrap()),
		)
		.await
		.unwrap();
	assert_eq!(rest.replicas[0].id, 13);
	assert_eq!(rest.continuation_token, None);
}

#[tokio::test]
async fn test_replica_list_of_unknown_partition() {
	let cluster = shop();
	let client = client(&cluster);

	let err = client.get_replica_list(&ReplicaQueryDescription::new(Uuid::from_bytes([9; 16]))).await.unwrap_err();

	assert_eq!(err.native_code(), Some(NativeErrorCode(FABRIC_E_PARTITION_NOT_FOUND)));
	assert_eq!(cluster.calls(), vec!["get_replica_list"]);
}
