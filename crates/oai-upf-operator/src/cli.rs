//!
//! # Command line
//!
//! `dispatch` runs one trigger against a host state file and a local workload root,
//! `render` prints the configuration for given NRF values.
//!

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fiveg_interface::nrf::NrfInfo;
use fiveg_interface::{MemoryRelationStore, RelationId, RelationStore};

use crate::config::{DEFAULT_APP_NAME, ModelInfo, UpfConfig};
use crate::controller::{Host, Outcome, Trigger, UpfOperator};
use crate::k8::{KubectlClient, StatefulSetClient};
use crate::render::{ConfigContext, ConfigRenderer};
use crate::status::UnitStatus;
use crate::workload::{LocalWorkload, Workload};

#[derive(Debug, Parser)]
#[command(
    about = "Operator of the OpenAirInterface 5G User Plane Function",
    name = "oai-upf-operator",
    max_term_width = 100
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Handle one lifecycle trigger
    Dispatch(DispatchOpt),
    /// Print the UPF configuration file
    Render(RenderOpt),
}

impl Cli {
    pub fn process(self) -> Result<()> {
        match self.command {
            Command::Dispatch(opt) => opt.process(),
            Command::Render(opt) => opt.process(),
        }
    }
}

/// Operator configuration file, defaults when absent
#[derive(Debug, Clone, Args)]
pub struct ConfigOpt {
    #[arg(long, short = 'c', env = "UPF_OPERATOR_CONFIG")]
    config: Option<PathBuf>,
}

impl ConfigOpt {
    fn load(&self) -> Result<UpfConfig> {
        match &self.config {
            Some(path) => Ok(UpfConfig::from_file(path)?),
            None => Ok(UpfConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerKind {
    Install,
    ConfigChanged,
    RelationJoined,
    RelationChanged,
    RelationBroken,
}

#[derive(Debug, Args)]
pub struct DispatchOpt {
    /// Trigger to handle
    #[arg(value_enum)]
    trigger: TriggerKind,

    /// Relation name, for relation triggers
    #[arg(long, required_if_eq_any([
        ("trigger", "relation-joined"),
        ("trigger", "relation-changed"),
        ("trigger", "relation-broken"),
    ]))]
    relation: Option<String>,

    /// Relation id, defaults to the first relation with that name
    #[arg(long)]
    relation_id: Option<RelationId>,

    /// Host state file, updated in place
    #[arg(long, default_value = "host-state.yaml")]
    state: PathBuf,

    /// Directory standing in for the workload container filesystem
    #[arg(long)]
    workload_root: PathBuf,

    /// kubectl executable used on install
    #[arg(long, default_value = "kubectl")]
    kubectl: String,

    #[command(flatten)]
    config: ConfigOpt,
}

impl DispatchOpt {
    pub fn process(self) -> Result<()> {
        let config = self.config.load()?;
        let mut state = HostState::load(&self.state)?;
        let trigger = self.trigger(&state)?;

        let mut operator = UpfOperator::new(config, state.model.clone())?;
        let mut workload = LocalWorkload::new(&self.workload_root);
        let client = KubectlClient::new(&self.kubectl);
        let outcome = state.dispatch(&mut operator, &mut workload, &client, &trigger)?;

        state.save(&self.state)?;
        println!("{}", outcome.status);
        Ok(())
    }

    fn trigger(&self, state: &HostState) -> Result<Trigger> {
        let relation = || -> Result<(String, RelationId)> {
            let name = self
                .relation
                .clone()
                .context("relation triggers need --relation")?;
            let id = match self.relation_id {
                Some(id) => id,
                None => state
                    .relations
                    .relation(&name)
                    .map(|relation| relation.id)
                    .with_context(|| format!("no {name} relation in host state"))?,
            };
            Ok((name, id))
        };

        Ok(match self.trigger {
            TriggerKind::Install => Trigger::Install,
            TriggerKind::ConfigChanged => Trigger::ConfigChanged,
            TriggerKind::RelationJoined => {
                let (relation, id) = relation()?;
                Trigger::RelationJoined { relation, id }
            }
            TriggerKind::RelationChanged => {
                let (relation, id) = relation()?;
                Trigger::RelationChanged { relation, id }
            }
            TriggerKind::RelationBroken => {
                let (relation, id) = relation()?;
                Trigger::RelationBroken { relation, id }
            }
        })
    }
}

#[derive(Debug, Args)]
pub struct RenderOpt {
    #[command(flatten)]
    config: ConfigOpt,

    #[arg(long, default_value = DEFAULT_APP_NAME)]
    app_name: String,

    /// Model (namespace) the UPF runs in
    #[arg(long)]
    model: String,

    #[arg(long)]
    nrf_ipv4_address: String,

    #[arg(long)]
    nrf_fqdn: String,

    #[arg(long, default_value = "80")]
    nrf_port: String,

    #[arg(long, default_value = "v1")]
    nrf_api_version: String,
}

impl RenderOpt {
    pub fn process(self) -> Result<()> {
        let config = self.config.load()?;
        let model = ModelInfo::new(self.app_name, self.model);
        let nrf = NrfInfo {
            ipv4_address: self.nrf_ipv4_address,
            fqdn: self.nrf_fqdn,
            port: self.nrf_port,
            api_version: self.nrf_api_version,
        };
        let content = ConfigRenderer::new()?.render(&ConfigContext::new(&config, &model, &nrf))?;
        println!("{content}");
        Ok(())
    }
}

/// What the orchestration host knows about this unit, persisted between dispatches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostState {
    pub model: ModelInfo,
    #[serde(default)]
    pub leader: bool,
    pub relations: MemoryRelationStore,
    #[serde(default)]
    pub status: UnitStatus,
    /// Triggers to deliver again
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<Trigger>,
}

impl HostState {
    pub fn new(model: ModelInfo) -> Self {
        let relations = MemoryRelationStore::new(model.app_name.clone());
        Self {
            model,
            leader: false,
            relations,
            status: UnitStatus::default(),
            deferred: vec![],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read host state {}", path.display()))?;
        let state = serde_yaml::from_str(&contents)
            .with_context(|| format!("invalid host state {}", path.display()))?;
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)?;
        fs::write(path, contents)
            .with_context(|| format!("unable to write host state {}", path.display()))?;
        debug!(path = %path.display(), "host state saved");
        Ok(())
    }

    /// Run one trigger and record its outcome.
    ///
    /// Deferred triggers are delivered again first, and stay queued while still deferred.
    /// A newly deferred trigger is queued once, a broken relation is removed once handled.
    pub fn dispatch(
        &mut self,
        operator: &mut UpfOperator,
        workload: &mut dyn Workload,
        client: &dyn StatefulSetClient,
        trigger: &Trigger,
    ) -> Result<Outcome> {
        for queued in std::mem::take(&mut self.deferred) {
            debug!(trigger = ?queued, "delivering deferred trigger");
            let outcome = self.handle(operator, workload, client, &queued)?;
            if outcome.deferred {
                self.deferred.push(queued);
            }
        }

        let outcome = self.handle(operator, workload, client, trigger)?;
        if outcome.deferred && !self.deferred.contains(trigger) {
            info!(?trigger, "deferring");
            self.deferred.push(trigger.clone());
        }
        self.status = outcome.status.clone();
        Ok(outcome)
    }

    fn handle(
        &mut self,
        operator: &mut UpfOperator,
        workload: &mut dyn Workload,
        client: &dyn StatefulSetClient,
        trigger: &Trigger,
    ) -> Result<Outcome> {
        let mut host = Host {
            relations: &mut self.relations,
            workload,
            k8: client,
            is_leader: self.leader,
        };
        let outcome = operator.handle(trigger, &mut host)?;

        if let Trigger::RelationBroken { id, .. } = trigger {
            self.relations.remove_relation(*id);
        }
        Ok(outcome)
    }
}
