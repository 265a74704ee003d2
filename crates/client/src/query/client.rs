// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{sync::Arc, time::Duration};

use fabric_abi::query::{
	ApplicationListFFI, NodeListFFI, PartitionListFFI, QueryClientVTableFFI, ReplicaListFFI, ServiceListFFI,
};
use fabric_interop::{AsyncBridge, CancellationToken, ClientConfig, Result};
use tracing::instrument;

use super::{
	ApplicationList, ApplicationQueryDescription, Node, NodeList, NodeQueryDescription, PartitionList,
	PartitionQueryDescription, ReplicaList, ReplicaQueryDescription, ServiceList, ServiceQueryDescription,
};
use crate::{
	channel::{Channel, finish_with},
	native::NativeQueryClient,
};

const GET_NODE_LIST: &str = "QueryManager.GetNodeList";
const GET_PARTITION_LIST: &str = "QueryManager.GetPartitionList";
const GET_APPLICATION_LIST: &str = "QueryManager.GetApplicationList";
const GET_SERVICE_LIST: &str = "QueryManager.GetServiceList";
const GET_REPLICA_LIST: &str = "QueryManager.GetReplicaList";

/// Reads the cluster topology. Cheap to clone.
#[derive(Clone)]
pub struct QueryClient {
	channel: Channel<QueryClientVTableFFI>,
}

impl QueryClient {
	pub(crate) fn new(bridge: AsyncBridge, config: Arc<ClientConfig>, native: NativeQueryClient) -> Self {
		Self {
			channel: Channel::new(bridge, config, native),
		}
	}

	pub async fn get_node_list(&self, description: &NodeQueryDescription) -> Result<NodeList> {
		let timeout = self.channel.config().default_timeout;
		self.get_node_list_with(description, timeout, &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_node_list", level = "debug", skip_all, fields(node = ?description.node_name_filter))]
	pub async fn get_node_list_with(
		&self,
		description: &NodeQueryDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<NodeList> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				GET_NODE_LIST,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_get_node_list,
				finish_with::<NodeList>(vtable.end_get_node_list, NodeListFFI::empty, GET_NODE_LIST),
			)
			.await
	}

	/// Follows continuation tokens until every matching node has been read.
	pub async fn get_all_nodes(&self, description: &NodeQueryDescription) -> Result<Vec<Node>> {
		let mut description = description.clone();
		let mut nodes = Vec::new();
		loop {
			let page = self.get_node_list(&description).await?;
			nodes.extend(page.nodes);
			match page.continuation_token {
				Some(token) => description.continuation_token = Some(token),
				None => return Ok(nodes),
			}
		}
	}

	pub async fn get_partition_list(&self, description: &PartitionQueryDescription) -> Result<PartitionList> {
		let timeout = self.channel.config().default_timeout;
		self.get_partition_list_with(description, timeout, &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_partition_list", level = "debug", skip_all, fields(service = %description.service_name))]
	pub async fn get_partition_list_with(
		&self,
		description: &PartitionQueryDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<PartitionList> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				GET_PARTITION_LIST,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_get_partition_list,
				finish_with::<PartitionList>(vtable.end_get_partition_list, PartitionListFFI::empty, GET_PARTITION_LIST),
			)
			.await
	}

	pub async fn get_application_list(&self, description: &ApplicationQueryDescription) -> Result<ApplicationList> {
		let timeout = self.channel.config().default_timeout;
		self.get_application_list_with(description, timeout, &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_application_list", level = "debug", skip_all, fields(application = ?description.application_name_filter))]
	pub async fn get_application_list_with(
		&self,
		description: &ApplicationQueryDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<ApplicationList> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				GET_APPLICATION_LIST,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_get_application_list,
				finish_with::<ApplicationList>(
					vtable.end_get_application_list,
					ApplicationListFFI::empty,
					GET_APPLICATION_LIST,
				),
			)
			.await
	}

	pub async fn get_service_list(&self, description: &ServiceQueryDescription) -> Result<ServiceList> {
		let timeout = self.channel.config().default_timeout;
		self.get_service_list_with(description, timeout, &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_service_list", level = "debug", skip_all, fields(application = %description.application_name))]
	pub async fn get_service_list_with(
		&self,
		description: &ServiceQueryDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<ServiceList> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				GET_SERVICE_LIST,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_get_service_list,
				finish_with::<ServiceList>(vtable.end_get_service_list, ServiceListFFI::empty, GET_SERVICE_LIST),
			)
			.await
	}

	pub async fn get_replica_list(&self, description: &ReplicaQueryDescription) -> Result<ReplicaList> {
		let timeout = self.channel.config().default_timeout;
		self.get_replica_list_with(description, timeout, &CancellationToken::new()).await
	}

	#[instrument(name = "client::get_replica_list", level = "debug", skip_all, fields(partition = %description.partition_id))]
	pub async fn get_replica_list_with(
		&self,
		description: &ReplicaQueryDescription,
		timeout: Duration,
		cancel: &CancellationToken,
	) -> Result<ReplicaList> {
		description.validate()?;
		let vtable = self.channel.vtable();
		self.channel
			.invoke(
				GET_REPLICA_LIST,
				description.clone(),
				timeout,
				cancel,
				vtable.begin_get_replica_list,
				finish_with::<ReplicaList>(vtable.end_get_replica_list, ReplicaListFFI::empty, GET_REPLICA_LIST),
			)
			.await
	}
}
