// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fs;
use std::path::PathBuf;

use log::debug;
use tokio::sync::broadcast::{channel, Receiver, Sender};

use crate::contract::{derive_filter_inputs, derive_query_type};
use crate::schema::errors::ProviderError;
use crate::sdl::errors::SdlError;
use crate::sdl::{list_entities, strip_root_query, EntityType};

/// File name of the schema document inside a tenant's directory.
const SCHEMA_FILE_NAME: &str = "schema.graphql";

/// A compiled query contract for one tenant and chain.
///
/// Compilation is pure: the same schema document always compiles to the same contract, so
/// contracts can be cached or recompiled freely and concurrent compilation of the same pair is
/// safe to race.
#[derive(Debug, Clone)]
pub struct Contract {
    /// Tenant this contract was compiled for.
    pub tenant: String,

    /// Chain partition this contract was compiled for.
    pub chain: String,

    /// Entity types in declaration order.
    pub entities: Vec<EntityType>,

    /// Complete derived SDL: stripped base document, filter inputs and root query type.
    pub sdl: String,
}

impl Contract {
    /// Compiles a schema document into the derived contract.
    pub fn compile(tenant: &str, chain: &str, document: &str) -> Result<Self, ProviderError> {
        let base = strip_root_query(document)?;
        let entities = list_entities(&base)?;
        let filter_inputs = derive_filter_inputs(&entities)?;
        let query_type = derive_query_type(&entities)?;

        let sdl = format!("{}\n{}\n{}", base, filter_inputs, query_type);

        Ok(Self {
            tenant: tenant.to_string(),
            chain: chain.to_string(),
            entities,
            sdl,
        })
    }

    /// Looks up an entity of this contract by type name.
    pub fn entity(&self, name: &str) -> Option<&EntityType> {
        self.entities.iter().find(|entity| entity.name == name)
    }
}

/// Loads tenant schema documents and compiles them into contracts.
///
/// Schema sources are resolved as `<base_path>/<tenant>/schema.graphql`. The provider holds no
/// compiled state itself, memoization of executable schemas happens one level up; it only
/// announces invalidated tenants on a broadcast channel so those memos can be dropped.
#[derive(Clone, Debug)]
pub struct ContractProvider {
    /// Directory holding one sub-directory per tenant.
    base_path: PathBuf,

    /// Sender for broadcast channel informing subscribers about invalidated tenants.
    tx: Sender<String>,
}

impl ContractProvider {
    /// Returns a provider resolving schema documents below the given directory.
    pub fn new(base_path: PathBuf) -> Self {
        let (tx, _) = channel(64);

        Self { base_path, tx }
    }

    /// Returns receiver for the tenant invalidation broadcast channel.
    pub fn on_invalidated(&self) -> Receiver<String> {
        self.tx.subscribe()
    }

    /// Reads the schema document of a tenant.
    pub fn read_document(&self, tenant: &str) -> Result<String, ProviderError> {
        let path = self.base_path.join(tenant).join(SCHEMA_FILE_NAME);

        if !path.is_file() {
            return Err(ProviderError::UnknownTenant(tenant.to_string()));
        }

        let document = fs::read_to_string(&path).map_err(SdlError::Source)?;
        debug!("Read schema document from {:?}", path);

        Ok(document)
    }

    /// Compiles the contract for a (tenant, chain) pair from its schema source.
    pub fn contract(&self, tenant: &str, chain: &str) -> Result<Contract, ProviderError> {
        let document = self.read_document(tenant)?;
        Contract::compile(tenant, chain, &document)
    }

    /// Validates that a tenant's schema document compiles, without keeping the result.
    ///
    /// Used by the deployment webhook to reject broken documents early.
    pub fn validate(&self, tenant: &str) -> Result<(), ProviderError> {
        let document = self.read_document(tenant)?;
        Contract::compile(tenant, "0", &document).map(|_| ())
    }

    /// Announces that all compiled state of a tenant became stale.
    ///
    /// Subscribers drop their memoized schemas, the next query recompiles from source.
    pub fn invalidate(&self, tenant: &str) {
        if self.tx.send(tenant.to_string()).is_err() {
            debug!("No subscriber has been informed about invalidated tenant");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{Contract, ContractProvider};

    const TEST_SCHEMA: &str = r#"
        type Post {
          id: ID
          title: String
        }

        type Query {
          ignored: Post
        }
    "#;

    #[test]
    fn compiles_contract_from_document() {
        let contract = Contract::compile("acme", "1", TEST_SCHEMA).unwrap();

        assert_eq!(contract.entities.len(), 1);
        assert!(contract.sdl.contains("input PostWhereInput"));
        assert!(contract.sdl.contains("type Query"));
        // The author-supplied root type was replaced by the derived one
        assert!(!contract.sdl.contains("ignored"));
    }

    #[test]
    fn compilation_is_deterministic() {
        let first = Contract::compile("acme", "1", TEST_SCHEMA).unwrap();
        let second = Contract::compile("acme", "1", TEST_SCHEMA).unwrap();

        assert_eq!(first.sdl, second.sdl);
    }

    #[test]
    fn resolves_documents_by_tenant_directory() {
        let base = tempfile::tempdir().unwrap();
        fs::create_dir_all(base.path().join("acme")).unwrap();
        fs::write(base.path().join("acme").join("schema.graphql"), TEST_SCHEMA).unwrap();

        let provider = ContractProvider::new(base.path().to_path_buf());

        assert!(provider.contract("acme", "1").is_ok());
        assert!(provider.validate("acme").is_ok());
        assert!(provider.contract("unknown", "1").is_err());
    }

    #[test]
    fn announces_invalidated_tenants() {
        let base = tempfile::tempdir().unwrap();
        let provider = ContractProvider::new(base.path().to_path_buf());
        let mut rx = provider.on_invalidated();

        provider.invalidate("acme");

        assert_eq!(rx.try_recv().unwrap(), "acme");
    }
}
