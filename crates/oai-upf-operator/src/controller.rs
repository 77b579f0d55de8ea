//!
//! # UPF workload controller
//!
//! Every trigger ends in one reconciliation pass. The decision is made by [`reconcile`]
//! from a snapshot of the inputs, the resulting actions are then applied to the workload.
//!

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use fiveg_interface::nrf::{NrfAvailable, NrfInfo, NrfRequires};
use fiveg_interface::upf::{UpfInfo, UpfProvides};
use fiveg_interface::{RelationId, RelationStore, Validation};

use crate::config::{ModelInfo, UpfConfig};
use crate::error::{OperatorError, RenderError, WorkloadError};
use crate::k8::{ServicePortsPatcher, StatefulSetClient, StatefulSetPatcher, upf_service_ports};
use crate::render::{ConfigContext, ConfigRenderer};
use crate::status::{UnitStatus, WorkloadState};
use crate::workload::{Layer, Workload, config_file_path, upf_layer};

pub const NRF_RELATION_NAME: &str = "fiveg-nrf";
pub const UPF_RELATION_NAME: &str = "fiveg-upf";
pub const UPF_LAYER_LABEL: &str = "upf";

/// Lifecycle notification delivered by the orchestration host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Trigger {
    Install,
    ConfigChanged,
    RelationJoined { relation: String, id: RelationId },
    RelationChanged { relation: String, id: RelationId },
    RelationBroken { relation: String, id: RelationId },
}

/// Inputs of one reconciliation pass, read once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub runtime_reachable: bool,
    /// `None` while no NRF relation is established
    pub nrf: Option<Validation<NrfInfo>>,
}

impl Snapshot {
    /// Observe the host, treating relation `broken` as already gone.
    ///
    /// The NRF record is read from the first remaining `fiveg-nrf` relation.
    pub fn observe(
        nrf: &NrfRequires,
        relations: &dyn RelationStore,
        workload: &dyn Workload,
        broken: Option<RelationId>,
    ) -> Self {
        let remaining = relations
            .relations(nrf.relation_name())
            .into_iter()
            .find(|relation| Some(relation.id) != broken);
        Self {
            runtime_reachable: workload.can_connect(),
            nrf: remaining.map(|relation| nrf.snapshot_for(relations, relation.id)),
        }
    }
}

/// Change to apply to the workload container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    PushConfig { path: String, content: String },
    AddLayer {
        label: String,
        layer: Layer,
        combine: bool,
    },
    Replan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub state: WorkloadState,
    /// The trigger should be delivered again later
    pub deferred: bool,
    pub actions: Vec<Action>,
}

impl Reconciliation {
    fn waiting(state: WorkloadState) -> Self {
        Self {
            state,
            deferred: state == WorkloadState::WaitingForRuntime,
            actions: vec![],
        }
    }
}

/// Decide what the workload needs from one consistent snapshot.
///
/// Rendering only happens once the NRF capability is complete, so identical snapshots
/// always give identical actions. The trigger does not take part in the decision, it is
/// only recorded on the tracing span.
#[instrument(skip_all, fields(trigger = ?trigger))]
pub fn reconcile(
    trigger: &Trigger,
    snapshot: &Snapshot,
    config: &UpfConfig,
    model: &ModelInfo,
    renderer: &ConfigRenderer,
) -> Result<Reconciliation, RenderError> {
    if !snapshot.runtime_reachable {
        debug!("workload container not reachable, deferring");
        return Ok(Reconciliation::waiting(WorkloadState::WaitingForRuntime));
    }

    let Some(nrf) = &snapshot.nrf else {
        debug!("{NRF_RELATION_NAME} relation not created");
        return Ok(Reconciliation::waiting(WorkloadState::WaitingForRelation));
    };

    let nrf = match nrf {
        Validation::Complete(nrf) => nrf,
        Validation::Incomplete(missing) => {
            debug!(?missing, "NRF data incomplete");
            return Ok(Reconciliation::waiting(
                WorkloadState::WaitingForCapability,
            ));
        }
    };

    let content = renderer.render(&ConfigContext::new(config, model, nrf))?;
    Ok(Reconciliation {
        state: WorkloadState::Active,
        deferred: false,
        actions: vec![
            Action::PushConfig {
                path: config_file_path(),
                content,
            },
            Action::AddLayer {
                label: UPF_LAYER_LABEL.to_owned(),
                layer: upf_layer(),
                combine: true,
            },
            Action::Replan,
        ],
    })
}

/// Apply actions in order, stopping at the first failure
pub fn apply(actions: &[Action], workload: &mut dyn Workload) -> Result<(), WorkloadError> {
    for action in actions {
        match action {
            Action::PushConfig { path, content } => workload.push(path, content)?,
            Action::AddLayer {
                label,
                layer,
                combine,
            } => workload.add_layer(label, layer, *combine)?,
            Action::Replan => workload.replan()?,
        }
    }
    Ok(())
}

/// Everything the host lends to a trigger
pub struct Host<'a> {
    pub relations: &'a mut dyn RelationStore,
    pub workload: &'a mut dyn Workload,
    pub k8: &'a dyn StatefulSetClient,
    pub is_leader: bool,
}

/// Result of handling one trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub state: WorkloadState,
    pub status: UnitStatus,
    pub deferred: bool,
    /// Set when this trigger found the NRF capability complete
    pub nrf_available: Option<NrfAvailable>,
}

/// Operator of the User Plane Function
pub struct UpfOperator {
    config: UpfConfig,
    model: ModelInfo,
    renderer: ConfigRenderer,
    nrf: NrfRequires,
    upf: UpfProvides,
}

impl UpfOperator {
    pub fn new(config: UpfConfig, model: ModelInfo) -> Result<Self, OperatorError> {
        Ok(Self {
            config,
            model,
            renderer: ConfigRenderer::new()?,
            nrf: NrfRequires::new(NRF_RELATION_NAME),
            upf: UpfProvides::new(UPF_RELATION_NAME),
        })
    }

    pub fn config(&self) -> &UpfConfig {
        &self.config
    }

    pub fn model(&self) -> &ModelInfo {
        &self.model
    }

    pub fn nrf(&self) -> &NrfRequires {
        &self.nrf
    }

    /// Handle one trigger to completion
    #[instrument(skip(self, host), fields(app = %self.model.app_name))]
    pub fn handle(&mut self, trigger: &Trigger, host: &mut Host) -> Result<Outcome, OperatorError> {
        let mut nrf_available = None;
        let mut broken = None;

        match trigger {
            Trigger::Install => self.install(host.k8)?,
            Trigger::ConfigChanged => {}
            Trigger::RelationJoined { relation, id } if relation == self.upf.relation_name() => {
                self.publish_upf_information(host, *id)?
            }
            Trigger::RelationChanged { relation, id } if relation == self.nrf.relation_name() => {
                nrf_available = self.nrf.on_relation_changed(&*host.relations, *id);
                if let Some(available) = &nrf_available {
                    info!(relation_id = available.relation_id, "NRF available");
                }
            }
            Trigger::RelationBroken { relation, id } if relation == self.nrf.relation_name() => {
                self.nrf.on_relation_broken();
                broken = Some(*id);
            }
            Trigger::RelationJoined { relation, .. }
            | Trigger::RelationChanged { relation, .. }
            | Trigger::RelationBroken { relation, .. } => {
                debug!(%relation, "nothing to do for relation");
            }
        }

        let snapshot = Snapshot::observe(&self.nrf, &*host.relations, &*host.workload, broken);
        let reconciliation = reconcile(trigger, &snapshot, &self.config, &self.model, &self.renderer)?;
        apply(&reconciliation.actions, host.workload)?;

        let status = reconciliation.state.unit_status();
        info!(%status, deferred = reconciliation.deferred, "reconciled");
        Ok(Outcome {
            state: reconciliation.state,
            status,
            deferred: reconciliation.deferred,
            nrf_available,
        })
    }

    fn install(&self, client: &dyn StatefulSetClient) -> Result<(), OperatorError> {
        let name = &self.model.app_name;
        let namespace = &self.model.model_name;
        StatefulSetPatcher::new(client, namespace.as_str()).ensure_patched(name)?;
        ServicePortsPatcher::new(client, namespace.as_str()).patch(name, &upf_service_ports())?;
        Ok(())
    }

    fn publish_upf_information(
        &self,
        host: &mut Host,
        relation_id: RelationId,
    ) -> Result<(), OperatorError> {
        if !host.is_leader {
            debug!("not leader, not publishing UPF information");
            return Ok(());
        }
        let info = UpfInfo {
            ipv4_address: self.config.upf_ipv4_address.clone(),
            fqdn: self.model.upf_fqdn(),
        };
        self.upf
            .set_upf_information(&mut *host.relations, &info, relation_id)
            .inspect_err(|err| warn!(%err, "failed to publish UPF information"))?;
        info!(relation_id, "UPF information published");
        Ok(())
    }
}
