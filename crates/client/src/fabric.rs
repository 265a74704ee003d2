// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use fabric_interop::{AsyncBridge, ClientConfig, Result};
use tracing::debug;

use crate::{
	native::{NativeQueryClient, NativeTestManagementClient},
	query::QueryClient,
	testability::TestManagementClient,
};

/// Entry point owning the apartment that every client shares
#[derive(Clone)]
pub struct FabricClient {
	bridge: AsyncBridge,
	config: Arc<ClientConfig>,
}

impl FabricClient {
	pub fn new(config: ClientConfig) -> Result<Self> {
		let bridge = AsyncBridge::new(&config.apartment)?;
		debug!(threads = config.apartment.threads, "fabric client started");
		Ok(Self::with_bridge(bridge, config))
	}

	pub fn with_bridge(bridge: AsyncBridge, config: ClientConfig) -> Self {
		Self {
			bridge,
			config: Arc::new(config),
		}
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	pub fn bridge(&self) -> &AsyncBridge {
		&self.bridge
	}

	pub fn test_management_client(&self, native: NativeTestManagementClient) -> TestManagementClient {
		TestManagementClient::new(self.bridge.clone(), self.config.clone(), native)
	}

	pub fn query_client(&self, native: NativeQueryClient) -> QueryClient {
		QueryClient::new(self.bridge.clone(), self.config.clone(), native)
	}
}
