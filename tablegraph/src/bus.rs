// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::db::sql::table_name;
use crate::manager::Sender;

/// Sender for cross-service communication bus.
pub type ServiceSender = Sender<ServiceMessage>;

/// Messages which can be sent on the communication bus.
#[derive(Clone, Debug, PartialEq)]
pub enum ServiceMessage {
    /// A row of a tenant table changed.
    TableEvent(TableEvent),
}

/// Kind of change observed on a tenant table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableAction {
    Insert,
    Update,
    Delete,
}

impl TableAction {
    /// Parses the lowercase wire token of an action.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "insert" => Some(TableAction::Insert),
            "update" => Some(TableAction::Update),
            "delete" => Some(TableAction::Delete),
            _ => None,
        }
    }

    /// Returns the lowercase wire token of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableAction::Insert => "insert",
            TableAction::Update => "update",
            TableAction::Delete => "delete",
        }
    }
}

/// A change observed on one tenant table, fanned out to event stream subscribers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableEvent {
    pub action: TableAction,

    /// Tenant (schema namespace) the table lives under.
    #[serde(rename = "subgraphId")]
    pub tenant: String,

    /// Entity type name the table is derived from.
    #[serde(rename = "typeName")]
    pub entity: String,

    /// Chain partition the table belongs to.
    #[serde(rename = "chainId")]
    pub chain: String,

    /// Row data carried by the notification.
    pub data: serde_json::Value,

    /// Milliseconds since the Unix epoch at which the event was observed.
    pub timestamp: u64,
}

impl TableEvent {
    /// Returns a new event stamped with the current time.
    pub fn new(
        action: TableAction,
        tenant: &str,
        entity: &str,
        chain: &str,
        data: serde_json::Value,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);

        Self {
            action,
            tenant: tenant.to_string(),
            entity: entity.to_string(),
            chain: chain.to_string(),
            data,
            timestamp,
        }
    }

    /// Returns the qualified name of the table this event originated from.
    pub fn table_name(&self) -> String {
        table_name(&self.tenant, &self.entity, &self.chain)
    }
}
