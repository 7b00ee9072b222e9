//! CLI command implementations
//!
//! Every command boots the same way:
//!
//! 1. Load and validate the config
//! 2. Apply the log level
//! 3. Load the data directory into a memory store
//! 4. Open the audit store (journal file or `audits` collection)
//!
//! Writing commands save the data directory before responding.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::audit::{AuditFeedQuery, AuditRecorder, DocumentAuditStore, FileAuditStore};
use crate::config::CrmConfig;
use crate::gateway::{EntityCatalog, EntityDescriptor, EntityGateway};
use crate::observability::{Logger, MetricsRegistry};
use crate::query::QueryRequest;
use crate::store::MemoryStore;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// Booted subsystems for one command
pub struct Runtime {
    pub config: CrmConfig,
    pub store: Arc<MemoryStore>,
    pub gateway: EntityGateway<MemoryStore>,
    pub catalog: EntityCatalog,
}

impl Runtime {
    pub fn boot(config_path: &Path) -> CliResult<Self> {
        let config = CrmConfig::load(config_path)?;
        Logger::set_min_severity(config.severity()?);
        Self::from_config(config)
    }

    pub fn from_config(config: CrmConfig) -> CliResult<Self> {
        let store = Arc::new(MemoryStore::load_dir(&config.data_dir)?);
        let metrics = Arc::new(MetricsRegistry::new());

        let recorder = match &config.audit_log {
            Some(path) => AuditRecorder::new(FileAuditStore::open(path)?, metrics),
            None => AuditRecorder::new(DocumentAuditStore::new(Arc::clone(&store)), metrics),
        };

        let gateway = EntityGateway::new(Arc::clone(&store), Arc::new(recorder))
            .with_operator_policy(config.operator_policy)
            .with_max_limit(config.max_limit);

        Ok(Self {
            config,
            store,
            gateway,
            catalog: EntityCatalog::crm(),
        })
    }

    fn entity(&self, name: &str) -> CliResult<&EntityDescriptor> {
        Ok(self.catalog.get(name)?)
    }

    fn persist(&self) -> CliResult<()> {
        self.store.save_dir(&self.config.data_dir)?;
        Ok(())
    }

    /// Runs one command against this runtime and returns its response data.
    pub fn execute(&self, command: &Command, input: Option<Value>) -> CliResult<Value> {
        match command {
            Command::Query { entity, .. } => self.query(entity, body(input)?),
            Command::Compile { entity, .. } => self.compile(entity, body(input)?),
            Command::Get { entity, id, .. } => self.get(entity, id),
            Command::Create { entity, user, .. } => self.create(entity, body(input)?, *user),
            Command::Update {
                entity, id, user, ..
            } => self.update(entity, id, body(input)?, *user),
            Command::Delete { entity, id, .. } => self.delete(entity, id),
            Command::Audit {
                entity,
                user,
                limit,
                ..
            } => self.audit(entity.as_deref(), *user, *limit),
        }
    }

    fn query(&self, entity: &str, request: Value) -> CliResult<Value> {
        let entity = self.entity(entity)?;
        let query = self
            .gateway
            .parse_request(serde_json::from_value::<QueryRequest>(request)?)?;
        let connection = self.gateway.find(entity, &query)?;
        Ok(serde_json::to_value(connection)?)
    }

    fn compile(&self, entity: &str, request: Value) -> CliResult<Value> {
        let entity = self.entity(entity)?;
        let query = self
            .gateway
            .parse_request(serde_json::from_value::<QueryRequest>(request)?)?;
        Ok(self.gateway.plan(entity, &query)?.to_json())
    }

    fn get(&self, entity: &str, id: &Uuid) -> CliResult<Value> {
        let descriptor = self.entity(entity)?;
        Ok(self.gateway.find_one(descriptor, id)?.unwrap_or(Value::Null))
    }

    fn create(&self, entity: &str, values: Value, user: Uuid) -> CliResult<Value> {
        let entity = self.entity(entity)?;
        let response = match values {
            Value::Array(items) => self
                .gateway
                .create_many(entity, items, user)
                .map(|mutations| Value::Array(mutations.iter().map(|m| m.to_json()).collect())),
            other => self.gateway.create_one(entity, other, user).map(|m| m.to_json()),
        };
        // Documents written before a failure are already audited
        self.persist()?;
        Ok(response?)
    }

    fn update(&self, entity: &str, id: &Uuid, patch: Value, user: Uuid) -> CliResult<Value> {
        let entity = self.entity(entity)?;
        let mutation = self.gateway.update_one(entity, id, patch, user)?;
        self.persist()?;
        Ok(mutation.to_json())
    }

    fn delete(&self, entity: &str, id: &Uuid) -> CliResult<Value> {
        let entity = self.entity(entity)?;
        let node = self.gateway.delete_one(entity, id)?;
        self.persist()?;
        Ok(node)
    }

    fn audit(&self, entity: Option<&str>, user: Option<Uuid>, limit: Option<usize>) -> CliResult<Value> {
        // Catalog names map to their audit target name
        let target_entity = entity.map(|name| match self.catalog.get(name) {
            Ok(descriptor) => descriptor.audit_name.clone(),
            Err(_) => name.to_string(),
        });
        let records = self.gateway.audit().recent(&AuditFeedQuery {
            target_entity,
            user_id: user,
            limit,
        })?;
        Ok(json!({
            "nodes": records,
            "totalCount": records.len(),
        }))
    }
}

fn body(input: Option<Value>) -> CliResult<Value> {
    input.ok_or_else(|| CliError::input("request body required"))
}

fn config_path(command: &Command) -> &Path {
    match command {
        Command::Query { config, .. }
        | Command::Compile { config, .. }
        | Command::Get { config, .. }
        | Command::Create { config, .. }
        | Command::Update { config, .. }
        | Command::Delete { config, .. }
        | Command::Audit { config, .. } => config,
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run one command, writing its response or error to stdout
pub fn run_command(command: Command) -> CliResult<()> {
    let result = dispatch(&command);
    match result {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(&e)?;
            Err(e)
        }
    }
}

fn dispatch(command: &Command) -> CliResult<Value> {
    let runtime = Runtime::boot(config_path(command))?;
    let input = if command.reads_stdin() {
        Some(read_request()?)
    } else {
        None
    };
    runtime.execute(command, input)
}
