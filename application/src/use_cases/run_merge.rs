//! Run merge use case
//!
//! Plans the pipeline graph for one series, validates it, and executes it
//! level by level. Worker nodes of a level (group loads, denoising, the
//! merge itself) run concurrently on a bounded [`JoinSet`]; lightweight
//! nodes (gradient table, reports, QC assembly, sinks) run inline. Every
//! node runs at most once and the first failure stops the run.

use crate::config::ExecutionParams;
use crate::ports::denoiser::{DenoiseError, Denoiser};
use crate::ports::derivatives_sink::{Derivative, DerivativesSink, SinkError, WrittenArtifact};
use crate::ports::gradient_store::GradientStore;
use crate::ports::image_store::{ImageStore, StoreError};
use crate::ports::mask_overlap::MaskOverlap;
use crate::ports::progress::{NoProgress, PipelineProgress};
use crate::ports::qc_source::QcSource;
use crate::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use dwimerge_domain::{
    AcquisitionGroup, AcquisitionGroupSet, ArtifactRef, ArtifactSlot, BeforeAfterQc,
    ConfoundTraces, DenoisePlacement, DomainError, DwiSeries, GradientScheme, GradientTable,
    GroupData, GroupId, MergeConfig, MergedDataset, NodeKind, OutputKind, PipelineGraph,
    PipelineNode, PlanOptions, PreMergeQc, QcAggregator, QcInputs, SamplingSchemeReport,
    SeriesQcRecord, Signal,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Errors that can occur during a merge run
#[derive(Error, Debug)]
pub enum RunMergeError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Denoise error: {0}")]
    Denoise(#[from] DenoiseError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Node '{node}' did not complete: {message}")]
    Execution { node: String, message: String },
}

impl RunMergeError {
    /// Stable label for logs and exit messages
    pub fn kind(&self) -> &'static str {
        match self {
            RunMergeError::Domain(e) => e.kind(),
            RunMergeError::Store(_) => "store",
            RunMergeError::Denoise(_) => "denoise",
            RunMergeError::Sink(_) => "sink",
            RunMergeError::Execution { .. } => "execution",
        }
    }
}

/// Run-level artifacts outside the per-group slots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunArtifacts {
    pub anatomical_mask: Option<ArtifactRef>,
    pub dwi_mask: Option<ArtifactRef>,
    /// Pre-merge QC produced by the motion-correction step
    pub raw_qc: Option<ArtifactRef>,
    pub confounds: Option<ArtifactRef>,
    pub hmc_optimization_data: Option<ArtifactRef>,
    pub cnr_map: Option<ArtifactRef>,
}

impl RunArtifacts {
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions::default()
            .with_masks(self.anatomical_mask.is_some() && self.dwi_mask.is_some())
            .with_pre_merge_qc(self.raw_qc.is_some())
    }
}

/// Input for the RunMerge use case
#[derive(Debug, Clone)]
pub struct RunMergeInput {
    /// Series name recorded in the QC record
    pub series_name: String,
    pub groups: AcquisitionGroupSet,
    pub config: MergeConfig,
    pub artifacts: RunArtifacts,
}

impl RunMergeInput {
    pub fn new(
        series_name: impl Into<String>,
        groups: AcquisitionGroupSet,
        config: MergeConfig,
    ) -> Self {
        Self {
            series_name: series_name.into(),
            groups,
            config,
            artifacts: RunArtifacts::default(),
        }
    }

    pub fn with_artifacts(mut self, artifacts: RunArtifacts) -> Self {
        self.artifacts = artifacts;
        self
    }

    fn group_ids(&self) -> Vec<GroupId> {
        self.groups.ids().into_iter().cloned().collect()
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunMergeOutput {
    /// Final dataset (denoised when denoising ran after the merge)
    pub dataset: MergedDataset,
    pub gradient_table: GradientTable,
    pub qc: SeriesQcRecord,
    pub sampling: SamplingSchemeReport,
    pub written: Vec<WrittenArtifact>,
    pub placement: DenoisePlacement,
}

/// Adapters a run talks to
#[derive(Clone)]
pub struct MergePorts {
    pub images: Arc<dyn ImageStore>,
    pub gradients: Arc<dyn GradientStore>,
    pub denoiser: Arc<dyn Denoiser>,
    pub masks: Arc<dyn MaskOverlap>,
    pub qc: Arc<dyn QcSource>,
    pub sink: Arc<dyn DerivativesSink>,
}

/// Owned inputs of a worker node
enum Job {
    LoadGroup(AcquisitionGroup),
    DenoiseGroup(GroupData),
    Merge(Vec<GroupData>),
    DenoiseMerged(MergedDataset),
    MaskOverlap {
        anatomical: ArtifactRef,
        dwi: ArtifactRef,
    },
    LoadPreMergeQc(ArtifactRef),
    BeforeAfterQc {
        groups: Vec<GroupData>,
        merged: MergedDataset,
    },
}

enum NodeOutput {
    GroupLoaded(GroupData),
    GroupDenoised { data: GroupData, noise: DwiSeries },
    Merged(MergedDataset),
    MergedDenoised { dataset: MergedDataset, noise: DwiSeries },
    GradientTable(GradientTable),
    Dice(f64),
    PreMergeQc(PreMergeQc),
    MergedQc(BeforeAfterQc),
    Sampling(SamplingSchemeReport),
    SeriesQc {
        record: SeriesQcRecord,
        stacked_confounds: Option<ConfoundTraces>,
    },
    Written(Vec<WrittenArtifact>),
}

/// Signals produced so far; written only by the executor
#[derive(Default)]
struct RunState {
    groups: HashMap<GroupId, GroupData>,
    denoised_groups: HashMap<GroupId, GroupData>,
    group_noise: HashMap<GroupId, DwiSeries>,
    merged: Option<MergedDataset>,
    denoised: Option<MergedDataset>,
    merged_noise: Option<DwiSeries>,
    gradient_table: Option<GradientTable>,
    dice: Option<f64>,
    pre_qc: Option<PreMergeQc>,
    merged_qc: Option<BeforeAfterQc>,
    sampling: Option<SamplingSchemeReport>,
    series_qc: Option<SeriesQcRecord>,
    stacked_confounds: Option<ConfoundTraces>,
    written: Vec<WrittenArtifact>,
}

impl RunState {
    fn apply(&mut self, output: NodeOutput) {
        match output {
            NodeOutput::GroupLoaded(data) => {
                self.groups.insert(data.id().clone(), data);
            }
            NodeOutput::GroupDenoised { data, noise } => {
                self.group_noise.insert(data.id().clone(), noise);
                self.denoised_groups.insert(data.id().clone(), data);
            }
            NodeOutput::Merged(dataset) => self.merged = Some(dataset),
            NodeOutput::MergedDenoised { dataset, noise } => {
                self.denoised = Some(dataset);
                self.merged_noise = Some(noise);
            }
            NodeOutput::GradientTable(table) => self.gradient_table = Some(table),
            NodeOutput::Dice(score) => self.dice = Some(score),
            NodeOutput::PreMergeQc(qc) => self.pre_qc = Some(qc),
            NodeOutput::MergedQc(qc) => self.merged_qc = Some(qc),
            NodeOutput::Sampling(report) => self.sampling = Some(report),
            NodeOutput::SeriesQc {
                record,
                stacked_confounds,
            } => {
                self.series_qc = Some(record);
                self.stacked_confounds = stacked_confounds;
            }
            NodeOutput::Written(mut written) => self.written.append(&mut written),
        }
    }

    fn signal<'a, T>(value: &'a Option<T>, node: &str, signal: Signal) -> Result<&'a T, DomainError> {
        value
            .as_ref()
            .ok_or_else(|| DomainError::missing_input(node, signal.name()))
    }

    fn group(&self, node: &str, id: &GroupId) -> Result<&GroupData, DomainError> {
        self.groups
            .get(id)
            .ok_or_else(|| DomainError::missing_input(node, Signal::GroupData(id.clone()).name()))
    }

    /// Denoised dataset when post-merge denoising ran, the merge result otherwise
    fn final_dataset(&self, node: &str) -> Result<&MergedDataset, DomainError> {
        self.denoised
            .as_ref()
            .or(self.merged.as_ref())
            .ok_or_else(|| DomainError::missing_input(node, Signal::MergedDataset.name()))
    }

    fn into_output(
        mut self,
        placement: DenoisePlacement,
    ) -> Result<RunMergeOutput, DomainError> {
        const NODE: &str = "run";
        let dataset = match self.denoised.take().or(self.merged.take()) {
            Some(dataset) => dataset,
            None => return Err(DomainError::missing_input(NODE, Signal::MergedDataset.name())),
        };
        Ok(RunMergeOutput {
            dataset,
            gradient_table: self
                .gradient_table
                .ok_or_else(|| DomainError::missing_input(NODE, Signal::GradientTable.name()))?,
            qc: self
                .series_qc
                .ok_or_else(|| DomainError::missing_input(NODE, Signal::SeriesQc.name()))?,
            sampling: self
                .sampling
                .ok_or_else(|| DomainError::missing_input(NODE, Signal::SamplingReport.name()))?,
            written: self.written,
            placement,
        })
    }
}

/// What a worker task needs; cloned into each task
#[derive(Clone)]
struct WorkerContext {
    ports: MergePorts,
    config: MergeConfig,
}

impl WorkerContext {
    async fn run(self, job: Job) -> Result<NodeOutput, RunMergeError> {
        let extent = self.config.denoise.extent();
        match job {
            Job::LoadGroup(group) => Ok(NodeOutput::GroupLoaded(self.load_group(&group).await?)),
            Job::DenoiseGroup(data) => {
                let out = self
                    .ports
                    .denoiser
                    .denoise(data.image(), extent, data.id().as_str())
                    .await?;
                Ok(NodeOutput::GroupDenoised {
                    data: data.with_image(out.image)?,
                    noise: out.noise,
                })
            }
            Job::Merge(groups) => {
                let strategy = self.config.build_strategy();
                let dataset = strategy.merge(&groups)?;
                info!(
                    "Merged {} groups into {} volumes ({})",
                    groups.len(),
                    dataset.volume_count(),
                    strategy.kind().display_name()
                );
                Ok(NodeOutput::Merged(dataset))
            }
            Job::DenoiseMerged(dataset) => {
                let out = self
                    .ports
                    .denoiser
                    .denoise(dataset.image(), extent, "merged")
                    .await?;
                Ok(NodeOutput::MergedDenoised {
                    dataset: dataset.with_image(out.image)?,
                    noise: out.noise,
                })
            }
            Job::MaskOverlap { anatomical, dwi } => {
                let score = self.ports.masks.dice(&anatomical, &dwi).await?;
                debug!("Mask overlap (dice): {:.4}", score);
                Ok(NodeOutput::Dice(score))
            }
            Job::LoadPreMergeQc(artifact) => Ok(NodeOutput::PreMergeQc(
                self.ports.qc.pre_merge_qc(&artifact).await?,
            )),
            Job::BeforeAfterQc { groups, merged } => Ok(NodeOutput::MergedQc(
                BeforeAfterQc::compute(&groups, &merged, self.config.b0_threshold)?,
            )),
        }
    }

    async fn load_group(&self, group: &AcquisitionGroup) -> Result<GroupData, RunMergeError> {
        let images = &self.ports.images;
        let gradients = &self.ports.gradients;

        let (image, raw_concatenated, b0_reference) = tokio::try_join!(
            images.load(&group.image),
            images.load(&group.raw_concatenated_image),
            images.load(&group.b0_reference),
        )?;
        let (bvals, bvecs, original_bvecs) = tokio::try_join!(
            gradients.load_bvals(&group.bval),
            gradients.load_bvecs(&group.bvec),
            gradients.load_bvecs(&group.original_bvec),
        )?;

        if original_bvecs.is_empty() {
            warn!("Group {} has no usable original b-vectors", group.id);
        }

        let scheme = GradientScheme::new(bvals, bvecs)?;
        let data = GroupData::new(
            group.id.clone(),
            image,
            scheme,
            original_bvecs,
            raw_concatenated,
            b0_reference,
            group.original_image.clone(),
        )?;
        debug!(
            "Loaded group {}: {} volumes on {}",
            group.id,
            data.volume_count(),
            data.image().grid()
        );
        Ok(data)
    }
}

/// Use case for merging the acquisition groups of one series
pub struct RunMergeUseCase {
    ports: MergePorts,
    params: ExecutionParams,
    logger: Arc<dyn RunLogger>,
}

impl RunMergeUseCase {
    pub fn new(ports: MergePorts) -> Self {
        Self {
            ports,
            params: ExecutionParams::default(),
            logger: Arc::new(NoRunLogger),
        }
    }

    pub fn with_execution_params(mut self, params: ExecutionParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_run_logger(mut self, logger: Arc<dyn RunLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Validate the configuration and build the graph without executing it
    pub fn plan(&self, input: &RunMergeInput) -> Result<PipelineGraph, RunMergeError> {
        input.config.validate()?;
        let graph = PipelineGraph::plan(
            &input.group_ids(),
            &input.config,
            input.artifacts.plan_options(),
        )?;
        Ok(graph)
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, input: RunMergeInput) -> Result<RunMergeOutput, RunMergeError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RunMergeInput,
        progress: &dyn PipelineProgress,
    ) -> Result<RunMergeOutput, RunMergeError> {
        let graph = self.plan(&input)?;
        let levels = graph.levels()?;
        let placement = input.config.denoise.placement();

        info!(
            "Running {} with {} groups: {} nodes in {} levels, strategy {}, denoise {}",
            input.series_name,
            input.groups.len(),
            graph.len(),
            levels.len(),
            input.config.strategy,
            placement
        );
        progress.on_run_start(graph.len());

        let result = self.run_levels(&input, &levels, progress).await;

        progress.on_run_complete(result.is_ok());
        self.logger.log(RunEvent::new(
            "run_finished",
            json!({
                "series": input.series_name,
                "success": result.is_ok(),
                "error": result.as_ref().err().map(|e| e.to_string()),
            }),
        ));

        Ok(result?.into_output(placement)?)
    }

    async fn run_levels(
        &self,
        input: &RunMergeInput,
        levels: &[Vec<&PipelineNode>],
        progress: &dyn PipelineProgress,
    ) -> Result<RunState, RunMergeError> {
        let semaphore = Arc::new(Semaphore::new(self.params.max_parallel_groups.max(1)));
        let context = WorkerContext {
            ports: self.ports.clone(),
            config: input.config.clone(),
        };
        let mut state = RunState::default();

        for level in levels {
            let (inline, workers): (Vec<&PipelineNode>, Vec<&PipelineNode>) =
                level.iter().copied().partition(|n| n.is_lightweight());

            let mut join_set = JoinSet::new();
            for node in workers {
                let job = match Self::prepare_job(node, input, &state) {
                    Ok(job) => job,
                    Err(e) => {
                        join_set.abort_all();
                        let e = RunMergeError::from(e);
                        self.node_failed(node, &e, progress);
                        return Err(e);
                    }
                };
                self.node_started(node, progress);

                let context = context.clone();
                let semaphore = Arc::clone(&semaphore);
                let node = node.clone();
                join_set.spawn(async move {
                    let result = match semaphore.acquire_owned().await {
                        Ok(_permit) => context.run(job).await,
                        Err(e) => Err(RunMergeError::Execution {
                            node: node.id.clone(),
                            message: e.to_string(),
                        }),
                    };
                    (node, result)
                });
            }

            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((node, Ok(output))) => {
                        self.node_finished(&node, progress);
                        state.apply(output);
                    }
                    Ok((node, Err(e))) => {
                        join_set.abort_all();
                        self.node_failed(&node, &e, progress);
                        return Err(e);
                    }
                    Err(e) => {
                        join_set.abort_all();
                        warn!("Task join error: {}", e);
                        return Err(RunMergeError::Execution {
                            node: "<worker>".to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }

            for node in inline {
                self.node_started(node, progress);
                match self.run_inline(node, input, &state).await {
                    Ok(output) => {
                        self.node_finished(node, progress);
                        state.apply(output);
                    }
                    Err(e) => {
                        self.node_failed(node, &e, progress);
                        return Err(e);
                    }
                }
            }
        }

        Ok(state)
    }

    /// Snapshot a worker node's inputs from the run state
    fn prepare_job(
        node: &PipelineNode,
        input: &RunMergeInput,
        state: &RunState,
    ) -> Result<Job, DomainError> {
        let id = node.id.as_str();
        match &node.kind {
            NodeKind::LoadGroup(g) => input
                .groups
                .get(g)
                .cloned()
                .map(Job::LoadGroup)
                .ok_or_else(|| DomainError::missing_input(id, g.as_str())),
            NodeKind::DenoiseGroup(g) => Ok(Job::DenoiseGroup(state.group(id, g)?.clone())),
            NodeKind::Merge => {
                let groups = node
                    .inputs
                    .iter()
                    .map(|signal| match signal {
                        Signal::DenoisedGroup(g) => state
                            .denoised_groups
                            .get(g)
                            .cloned()
                            .ok_or_else(|| DomainError::missing_input(id, signal.name())),
                        Signal::GroupData(g) => state.group(id, g).cloned(),
                        other => Err(DomainError::validation(
                            "pipeline",
                            format!("merge cannot consume '{other}'"),
                        )),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Job::Merge(groups))
            }
            NodeKind::DenoiseMerged => Ok(Job::DenoiseMerged(
                RunState::signal(&state.merged, id, Signal::MergedDataset)?.clone(),
            )),
            NodeKind::MaskOverlap => {
                let anatomical = input
                    .artifacts
                    .anatomical_mask
                    .clone()
                    .ok_or_else(|| DomainError::missing_input(id, "anatomical_mask"))?;
                let dwi = input
                    .artifacts
                    .dwi_mask
                    .clone()
                    .ok_or_else(|| DomainError::missing_input(id, "dwi_mask"))?;
                Ok(Job::MaskOverlap { anatomical, dwi })
            }
            NodeKind::LoadPreMergeQc => input
                .artifacts
                .raw_qc
                .clone()
                .map(Job::LoadPreMergeQc)
                .ok_or_else(|| DomainError::missing_input(id, "raw_qc")),
            NodeKind::BeforeAfterQc => {
                let groups = input
                    .groups
                    .ids()
                    .into_iter()
                    .map(|g| state.group(id, g).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Job::BeforeAfterQc {
                    groups,
                    merged: state.final_dataset(id)?.clone(),
                })
            }
            NodeKind::GradientTable
            | NodeKind::SamplingReport
            | NodeKind::SeriesQc
            | NodeKind::WriteDerivatives => Err(DomainError::validation(
                "pipeline",
                format!("'{id}' is not a worker node"),
            )),
        }
    }

    async fn run_inline(
        &self,
        node: &PipelineNode,
        input: &RunMergeInput,
        state: &RunState,
    ) -> Result<NodeOutput, RunMergeError> {
        let id = node.id.as_str();
        let threshold = input.config.b0_threshold;
        match &node.kind {
            NodeKind::GradientTable => Ok(NodeOutput::GradientTable(
                state.final_dataset(id)?.gradient_table(threshold)?,
            )),
            NodeKind::SamplingReport => {
                let table = RunState::signal(&state.gradient_table, id, Signal::GradientTable)?;
                let dataset = state.final_dataset(id)?;
                let source_files = input
                    .groups
                    .field_values(ArtifactSlot::OriginalImage)
                    .into_iter()
                    .map(|a| a.file_name())
                    .collect();
                Ok(NodeOutput::Sampling(SamplingSchemeReport::new(
                    table,
                    dataset.provenance(),
                    threshold,
                    source_files,
                )?))
            }
            NodeKind::SeriesQc => {
                let aggregator = QcAggregator::new(
                    input.series_name.clone(),
                    input.config.strategy,
                    input.group_ids(),
                    threshold,
                );
                let confounds = self.load_confounds(input).await?;
                let stacked_confounds = match input.artifacts.confounds {
                    Some(_) => None,
                    None => confounds.clone(),
                };
                let inputs = QcInputs {
                    t1_dice_score: state.dice,
                    pre_merge: state.pre_qc.clone(),
                    before_after: state.merged_qc.clone(),
                    gradient_table: state.gradient_table.clone(),
                    confounds,
                };
                Ok(NodeOutput::SeriesQc {
                    record: aggregator.aggregate(inputs)?,
                    stacked_confounds,
                })
            }
            NodeKind::WriteDerivatives => Ok(NodeOutput::Written(
                self.write_derivatives(id, input, state).await?,
            )),
            _ => Err(DomainError::validation("pipeline", format!("'{id}' is not an inline node")).into()),
        }
    }

    /// Run-level confounds, else the per-group traces stacked in group order
    async fn load_confounds(
        &self,
        input: &RunMergeInput,
    ) -> Result<Option<ConfoundTraces>, RunMergeError> {
        if let Some(artifact) = &input.artifacts.confounds {
            return Ok(Some(self.ports.qc.confounds(artifact).await?));
        }
        let per_group: Option<Vec<&ArtifactRef>> =
            input.groups.iter().map(|g| g.confounds.as_ref()).collect();
        let Some(per_group) = per_group else {
            debug!("No confounds available for QC");
            return Ok(None);
        };
        let mut traces = Vec::with_capacity(per_group.len());
        for artifact in per_group {
            traces.push(self.ports.qc.confounds(artifact).await?);
        }
        Ok(Some(ConfoundTraces::concat_rows(&traces)?))
    }

    async fn write_derivatives(
        &self,
        node: &str,
        input: &RunMergeInput,
        state: &RunState,
    ) -> Result<Vec<WrittenArtifact>, RunMergeError> {
        let dataset = state.final_dataset(node)?;
        let table = RunState::signal(&state.gradient_table, node, Signal::GradientTable)?;
        let merged_qc = RunState::signal(&state.merged_qc, node, Signal::MergedQc)?;
        let series_qc = RunState::signal(&state.series_qc, node, Signal::SeriesQc)?;
        let sampling = RunState::signal(&state.sampling, node, Signal::SamplingReport)?;

        let merged_qc = to_json(OutputKind::MergedQc, merged_qc)?;
        let series_qc = to_json(OutputKind::SeriesQc, series_qc)?;
        let sampling = to_json(OutputKind::SamplingScheme, sampling)?;

        let mut outputs: Vec<(OutputKind, Option<&str>, Derivative<'_>)> = vec![
            (OutputKind::MergedImage, None, Derivative::Image(dataset.image())),
            (OutputKind::MergedBval, None, Derivative::Bvals(dataset.bvals())),
            (OutputKind::MergedBvec, None, Derivative::Bvecs(dataset.bvecs())),
            (OutputKind::BvalsT1, None, Derivative::Bvals(dataset.bvals())),
            (OutputKind::BvecsT1, None, Derivative::Bvecs(dataset.bvecs())),
            (OutputKind::GradientTableT1, None, Derivative::GradientTable(table)),
            (OutputKind::MergedQc, None, Derivative::Json(&merged_qc)),
            (OutputKind::SeriesQc, None, Derivative::Json(&series_qc)),
            (OutputKind::SamplingScheme, None, Derivative::Json(&sampling)),
        ];
        for g in input.groups.ids() {
            if let Some(noise) = state.group_noise.get(g) {
                outputs.push((OutputKind::NoiseImage, Some(g.as_str()), Derivative::Image(noise)));
            }
        }
        if let Some(noise) = &state.merged_noise {
            outputs.push((OutputKind::NoiseImage, None, Derivative::Image(noise)));
        }

        let artifacts = &input.artifacts;
        let passthrough = [
            (OutputKind::DwiMaskT1, &artifacts.dwi_mask),
            (OutputKind::CnrMapT1, &artifacts.cnr_map),
            (OutputKind::Confounds, &artifacts.confounds),
            (OutputKind::HmcOptimizationData, &artifacts.hmc_optimization_data),
        ];
        for (kind, artifact) in passthrough {
            if let Some(artifact) = artifact {
                outputs.push((kind, None, Derivative::Copy(artifact)));
            }
        }
        if let Some(traces) = &state.stacked_confounds {
            outputs.push((OutputKind::Confounds, None, Derivative::Confounds(traces)));
        }

        let mut written = Vec::with_capacity(outputs.len());
        for (kind, label, derivative) in outputs {
            let artifact = self.ports.sink.write(kind, label, derivative).await?;
            debug!("Wrote {} to {}", kind, artifact.path.display());
            written.push(artifact);
        }
        Ok(written)
    }

    fn node_started(&self, node: &PipelineNode, progress: &dyn PipelineProgress) {
        debug!("Starting node {}", node.id);
        progress.on_node_start(node);
        self.logger
            .log(RunEvent::new("node_started", json!({ "node": node.id })));
    }

    fn node_finished(&self, node: &PipelineNode, progress: &dyn PipelineProgress) {
        debug!("Finished node {}", node.id);
        progress.on_node_complete(node, true);
        self.logger
            .log(RunEvent::new("node_finished", json!({ "node": node.id })));
    }

    fn node_failed(&self, node: &PipelineNode, error: &RunMergeError, progress: &dyn PipelineProgress) {
        warn!("Node {} failed: {}", node.id, error);
        progress.on_node_complete(node, false);
        self.logger.log(RunEvent::new(
            "node_failed",
            json!({
                "node": node.id,
                "kind": error.kind(),
                "error": error.to_string(),
            }),
        ));
    }
}

fn to_json<T: Serialize>(kind: OutputKind, value: &T) -> Result<serde_json::Value, SinkError> {
    serde_json::to_value(value).map_err(|e| SinkError::Encode {
        kind,
        message: e.to_string(),
    })
}
