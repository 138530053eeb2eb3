// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use crate::bus::ServiceSender;
use crate::graphql::GraphQLSchemaManager;
use crate::schema::ContractProvider;

/// Shared context for all HTTP routes.
#[derive(Clone)]
pub struct HttpServiceContext {
    /// Executable schemas by (tenant, chain), built on first use.
    pub schemas: GraphQLSchemaManager,

    /// Compiler and loader for tenant contracts.
    pub provider: ContractProvider,

    /// Sender onto the service bus, used by the event routes.
    pub tx: ServiceSender,

    /// Directory the log inspection route reads from.
    pub log_dir: PathBuf,
}

impl HttpServiceContext {
    pub fn new(
        schemas: GraphQLSchemaManager,
        provider: ContractProvider,
        tx: ServiceSender,
        log_dir: PathBuf,
    ) -> Self {
        Self {
            schemas,
            provider,
            tx,
            log_dir,
        }
    }
}
