// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Cluster topology queries

mod application;
mod client;
mod node;
mod partition;
mod replica;
mod service;

pub use application::{Application, ApplicationList, ApplicationQueryDescription, ApplicationStatus};
pub use client::QueryClient;
pub use node::{HealthState, Node, NodeList, NodeQueryDescription, NodeStatus, NodeStatusFilter};
pub use partition::{Partition, PartitionList, PartitionQueryDescription, PartitionScheme, PartitionStatus, ServiceKind};
pub use replica::{Replica, ReplicaList, ReplicaQueryDescription, ReplicaRole, ReplicaStatus};
pub use service::{Service, ServiceList, ServiceQueryDescription, ServiceStatus};
