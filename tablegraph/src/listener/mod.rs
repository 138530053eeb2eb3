// SPDX-License-Identifier: AGPL-3.0-or-later

//! Database change listener.
//!
//! A dedicated PostgreSQL connection subscribes to the `table_events` notification channel.
//! Triggers installed next to the tenant tables publish one JSON payload per changed row,
//! which is parsed back into (tenant, entity, chain) coordinates and fanned onto the service
//! bus for event stream subscribers.
use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sqlx::postgres::PgListener;

use crate::bus::{ServiceMessage, ServiceSender, TableAction, TableEvent};
use crate::context::Context;
use crate::manager::Shutdown;

/// Notification channel the database triggers publish to.
const NOTIFY_CHANNEL: &str = "table_events";

/// Delay before a broken listener connection is dialed again.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Tables are named `<entity_lowercase>_<chain>`.
static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)_(\d+)$").expect("Table name pattern is valid"));

/// Notification payload published by the database triggers.
#[derive(Debug, Clone, Deserialize)]
struct NotificationPayload {
    action: String,
    schema_name: String,
    table_name: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Splits a physical table name into entity type name and chain, the schema name is the tenant.
///
/// The entity half is capitalised back into the declared type name spelling.
fn parse_table_name(table_name: &str, schema_name: &str) -> Option<(String, String, String)> {
    let captures = TABLE_NAME.captures(table_name)?;

    let raw_entity = captures.get(1)?.as_str();
    let chain = captures.get(2)?.as_str();

    let mut chars = raw_entity.chars();
    let entity = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => return None,
    };

    Some((schema_name.to_string(), entity, chain.to_string()))
}

/// Converts a raw notification into a bus event, `None` for payloads we don't understand.
fn into_event(payload: NotificationPayload) -> Option<TableEvent> {
    let action = TableAction::parse(&payload.action)?;
    let (tenant, entity, chain) = parse_table_name(&payload.table_name, &payload.schema_name)?;

    Some(TableEvent::new(action, &tenant, &entity, &chain, payload.data))
}

/// Connects, subscribes and forwards notifications until the connection breaks.
async fn listen(database_url: &str, tx: &ServiceSender) -> Result<()> {
    let mut listener = PgListener::connect(database_url).await?;
    listener.listen(NOTIFY_CHANNEL).await?;
    info!("Connected to database, listening on '{}'", NOTIFY_CHANNEL);

    loop {
        let notification = listener.recv().await?;

        let payload: NotificationPayload = match serde_json::from_str(notification.payload()) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Ignoring malformed table event payload: {}", err);
                continue;
            }
        };

        match into_event(payload) {
            Some(event) => {
                debug!(
                    "Database event: {} on {}",
                    event.action.as_str(),
                    event.table_name()
                );
                // Send errors just mean nobody is subscribed right now
                let _ = tx.send(ServiceMessage::TableEvent(event));
            }
            None => debug!("Ignoring notification for unrecognized table"),
        }
    }
}

/// Start database listener service.
pub async fn listener_service(
    context: Context,
    signal: Shutdown,
    tx: ServiceSender,
) -> Result<()> {
    let database_url = context.config.database_url.clone();

    let work = tokio::task::spawn(async move {
        loop {
            if let Err(err) = listen(&database_url, &tx).await {
                error!("Database listener failed: {}", err);
            }

            info!(
                "Reconnecting database listener in {} seconds",
                RECONNECT_DELAY.as_secs()
            );
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    });

    tokio::select! { _ = work => (), _ = signal => () };

    debug!("Database listener connection closed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::bus::TableAction;

    use super::{into_event, parse_table_name, NotificationPayload};

    #[test]
    fn splits_table_names() {
        assert_eq!(
            parse_table_name("post_1", "acme"),
            Some(("acme".to_string(), "Post".to_string(), "1".to_string()))
        );
        assert_eq!(
            parse_table_name("token_transfer_137", "acme"),
            Some((
                "acme".to_string(),
                "Token_transfer".to_string(),
                "137".to_string()
            ))
        );
        assert_eq!(parse_table_name("no-chain-suffix", "acme"), None);
    }

    #[test]
    fn converts_payloads_to_events() {
        let payload = NotificationPayload {
            action: "insert".to_string(),
            schema_name: "acme".to_string(),
            table_name: "post_1".to_string(),
            data: json!({ "id": 1 }),
        };

        let event = into_event(payload).unwrap();
        assert_eq!(event.action, TableAction::Insert);
        assert_eq!(event.tenant, "acme");
        assert_eq!(event.entity, "Post");
        assert_eq!(event.chain, "1");
    }

    #[test]
    fn drops_unknown_actions() {
        let payload = NotificationPayload {
            action: "truncate".to_string(),
            schema_name: "acme".to_string(),
            table_name: "post_1".to_string(),
            data: json!({}),
        };

        assert!(into_event(payload).is_none());
    }
}
