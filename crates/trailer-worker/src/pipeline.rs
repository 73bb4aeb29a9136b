//! End-to-end trailer job orchestration.
//!
//! A job runs probe → analysis → personalization → timelines → render →
//! packaging on the calling task. Only rendering fans out. Input, analysis
//! and storage errors fail the whole job; render errors drop one variant.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;
use tracing::{info, Instrument};
use trailer_models::{
    Assembly, AssemblyStatus, Job, JobRequest, Personalization, Profile, ProviderStatus, SceneAnalysis, Timeline,
    DURATION_TOLERANCE,
};
use trailer_storage::{ArtifactStore, LocalArtifactStore, R2ArtifactStore};
use trailer_vision::VisionClient;

use crate::analysis::{AnalysisRequest, FfmpegFrameSampler, SceneAnalyzer, SyntheticAnalyzer, VisionAnalyzer};
use crate::config::{AnalysisMode, StorageBackend, WorkerConfig};
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::package::{store_captions, store_storyboard, store_trailer, StoryboardInput};
use crate::personalize::personalize;
use crate::probe::{resolve_duration, DurationProbe, FfprobeDurationProbe};
use crate::profiles::ProfileCatalog;
use crate::render::{render_all, FfmpegRenderer, RenderOutcome, TrailerRenderer};
use crate::timeline::build_timeline;

/// Provider status keys on the job.
pub mod providers {
    pub const PROBE: &str = "probe";
    pub const ANALYSIS: &str = "analysis";
    pub const RENDER: &str = "render";
    pub const STORAGE: &str = "storage";
}

/// Pipeline with its collaborators.
#[derive(Clone)]
pub struct TrailerPipeline {
    config: WorkerConfig,
    profiles: Arc<ProfileCatalog>,
    probe: Arc<dyn DurationProbe>,
    analyzer: Arc<dyn SceneAnalyzer>,
    renderer: Arc<dyn TrailerRenderer>,
    store: Arc<dyn ArtifactStore>,
}

impl TrailerPipeline {
    pub fn new(
        config: WorkerConfig,
        profiles: ProfileCatalog,
        probe: Arc<dyn DurationProbe>,
        analyzer: Arc<dyn SceneAnalyzer>,
        renderer: Arc<dyn TrailerRenderer>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config,
            profiles: Arc::new(profiles),
            probe,
            analyzer,
            renderer,
            store,
        }
    }

    /// Wire the production collaborators selected by `config`.
    pub async fn from_config(config: WorkerConfig) -> WorkerResult<Self> {
        let profiles = ProfileCatalog::load_or_builtin(config.profiles_path.as_deref()).await?;

        let analyzer: Arc<dyn SceneAnalyzer> = match config.analysis_mode {
            AnalysisMode::Synthetic => Arc::new(SyntheticAnalyzer::new(config.min_scene_len, config.max_scene_len)),
            AnalysisMode::Vision => {
                let client = VisionClient::from_env()?;
                let client_config = client.config().clone();
                // Covers the client's own retries
                let request_timeout = client_config.timeout * (client_config.max_retries + 1) + Duration::from_secs(1);
                info!(url = %client_config.base_url, "Using vision analysis");
                Arc::new(VisionAnalyzer::new(
                    Arc::new(client),
                    Arc::new(FfmpegFrameSampler),
                    config.frame_samples,
                    config.bucket_count,
                    request_timeout,
                ))
            }
        };

        let store: Arc<dyn ArtifactStore> = match config.storage {
            StorageBackend::Local => Arc::new(LocalArtifactStore::new(&config.storage_dir)),
            StorageBackend::R2 => Arc::new(R2ArtifactStore::from_env()?),
        };

        let renderer = Arc::new(FfmpegRenderer::new(config.render_timeout_secs));

        Ok(Self::new(
            config,
            profiles,
            Arc::new(FfprobeDurationProbe),
            analyzer,
            renderer,
            store,
        ))
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn profiles(&self) -> &ProfileCatalog {
        &self.profiles
    }

    /// Run one job to a terminal state.
    ///
    /// Never returns an error: failures are recorded on the returned job.
    pub async fn run_job(&self, request: JobRequest) -> Job {
        let mut job = Job::new(&request).start();
        let logger = JobLogger::new(&job.id, "job");
        let span = logger.create_span();

        let result = self.execute(&mut job, &logger).instrument(span).await;

        match result {
            Ok(()) => {
                metrics::record_job("completed");
                logger.log_completion(&format!(
                    "{} trailers, {} deliverables, {} warnings",
                    job.trailer_keys().len(),
                    job.deliverables.len(),
                    job.warnings.len()
                ));
                job.complete()
            }
            Err(e) => {
                metrics::record_job("failed");
                logger.log_error(&format!("{} ({})", e, e.kind()));
                job.fail(e.to_failure())
            }
        }
    }

    async fn execute(&self, job: &mut Job, logger: &JobLogger) -> WorkerResult<()> {
        // Input checks run before any stage
        job.config.validate()?;
        let profile = self.profiles.get(&job.profile_id)?.clone();
        if !tokio::fs::try_exists(&job.asset_path).await.unwrap_or(false) {
            return Err(WorkerError::AssetNotFound(job.asset_path.clone()));
        }

        let seed = job.config.seed.unwrap_or_else(rand::random);
        job.seed = Some(seed);
        let mut rng = StdRng::seed_from_u64(seed);

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let work_dir = tempfile::Builder::new()
            .prefix(&format!("job_{}_", job.id))
            .tempdir_in(&self.config.work_dir)?;
        logger.log_start(&format!(
            "profile={} seed={} target={}s",
            profile.id, seed, job.config.target_duration
        ));

        // Probe
        let started = Instant::now();
        let duration = resolve_duration(self.probe.as_ref(), &job.asset_path, &mut rng).await;
        job.source_duration = Some(duration.seconds);
        job.duration_is_fallback = duration.is_fallback;
        if duration.is_fallback {
            let message = format!("source duration unknown, using {:.1}s fallback", duration.seconds);
            logger.for_stage("probe").log_warning(&message);
            job.set_provider(providers::PROBE, ProviderStatus::degraded("ffprobe", &message));
            job.warn(message);
        } else {
            job.set_provider(providers::PROBE, ProviderStatus::ok("ffprobe"));
        }
        finish_stage(job, "probe", started);

        // Analysis
        let started = Instant::now();
        let analysis = self
            .analyze(job, &profile, duration.seconds, work_dir.path(), &mut rng, logger)
            .await?;
        finish_stage(job, "analysis", started);

        // Personalization
        let started = Instant::now();
        let outcome = personalize(&analysis, &profile, job.config.target_duration, &mut rng);
        for warning in outcome.warnings {
            logger.for_stage("personalize").log_warning(&warning);
            job.warn(warning);
        }
        let personalization = outcome.personalization;
        finish_stage(job, "personalize", started);

        // Timelines
        let started = Instant::now();
        let max_duration = job.config.target_duration + DURATION_TOLERANCE;
        let timelines: Vec<Timeline> = personalization
            .variants
            .iter()
            .map(|v| build_timeline(v, duration.seconds, max_duration, &profile.preferences.audio_style, &mut rng))
            .collect();
        finish_stage(job, "timeline", started);

        job.analysis = Some(analysis);
        job.personalization = Some(personalization);

        // Render
        let started = Instant::now();
        let outcomes = self.render(job, &timelines, &work_dir, logger).await?;
        finish_stage(job, "render", started);

        // Package
        let started = Instant::now();
        self.package(job, &profile, seed, &timelines, &outcomes, logger).await?;
        finish_stage(job, "package", started);

        Ok(())
    }

    async fn analyze(
        &self,
        job: &mut Job,
        profile: &Profile,
        duration: f64,
        work_dir: &Path,
        rng: &mut StdRng,
        logger: &JobLogger,
    ) -> WorkerResult<SceneAnalysis> {
        let logger = logger.for_stage("analysis");
        let mode = self.analyzer.mode();
        logger.log_start(mode);

        let request = AnalysisRequest {
            asset_path: &job.asset_path,
            duration,
            profile,
            work_dir,
        };

        match self.analyzer.analyze(&request, rng).await {
            Ok(analysis) => {
                metrics::record_coverage(analysis.coverage_seconds, analysis.coverage_ratio);
                logger.log_completion(&format!(
                    "{} scenes, coverage {:.1}s ({:.0}%)",
                    analysis.scenes.len(),
                    analysis.coverage_seconds,
                    analysis.coverage_ratio * 100.0
                ));
                job.set_provider(providers::ANALYSIS, ProviderStatus::ok(mode));
                Ok(analysis)
            }
            Err(e) => {
                let e = match e {
                    WorkerError::Vision(v) => WorkerError::analysis_failed(v.to_string()),
                    other => other,
                };
                job.set_provider(providers::ANALYSIS, ProviderStatus::failed(mode, e.to_string()));
                Err(e)
            }
        }
    }

    async fn render(
        &self,
        job: &mut Job,
        timelines: &[Timeline],
        work_dir: &TempDir,
        logger: &JobLogger,
    ) -> WorkerResult<Vec<RenderOutcome>> {
        let logger = logger.for_stage("render");
        let pool = self.config.render_pool_size(timelines.len());
        logger.log_start(&format!("{} variants, pool {}", timelines.len(), pool));

        let outcomes = render_all(
            Arc::clone(&self.renderer),
            &job.asset_path,
            timelines,
            job.config.output_format,
            work_dir.path(),
            pool,
        )
        .await;

        let mut rendered = 0;
        for (outcome, timeline) in outcomes.iter().zip(timelines) {
            let assembly = match &outcome.result {
                Ok(_) => {
                    rendered += 1;
                    Assembly {
                        variant: outcome.variant,
                        timeline: timeline.clone(),
                        status: AssemblyStatus::Rendered,
                        output_key: Some(crate::render::trailer_file_name(outcome.variant, job.config.output_format)),
                        error: None,
                    }
                }
                Err(e) => {
                    let message = format!(
                        "variant {} ({}) was not rendered: {}",
                        outcome.variant, timeline.variant_name, e
                    );
                    logger.log_warning(&message);
                    job.warn(message);
                    Assembly {
                        variant: outcome.variant,
                        timeline: timeline.clone(),
                        status: AssemblyStatus::Failed,
                        output_key: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            job.assemblies.push(assembly);
        }

        logger.log_progress(&format!("{}/{} variants rendered", rendered, timelines.len()));
        let mode = self.renderer.mode();
        if rendered == 0 {
            job.set_provider(providers::RENDER, ProviderStatus::failed(mode, "no variant rendered"));
            return Err(WorkerError::render_failed(format!(
                "none of {} variants rendered",
                timelines.len()
            )));
        }
        if rendered < timelines.len() {
            job.set_provider(
                providers::RENDER,
                ProviderStatus::degraded(mode, format!("{} of {} variants rendered", rendered, timelines.len())),
            );
        } else {
            job.set_provider(providers::RENDER, ProviderStatus::ok(mode));
        }
        logger.log_completion(&format!("{} of {} variants rendered", rendered, timelines.len()));
        Ok(outcomes)
    }

    async fn package(
        &self,
        job: &mut Job,
        profile: &Profile,
        seed: u64,
        timelines: &[Timeline],
        outcomes: &[RenderOutcome],
        logger: &JobLogger,
    ) -> WorkerResult<()> {
        let logger = logger.for_stage("package");
        let backend = self.store.name().to_string();

        match self.store_deliverables(job, profile, seed, timelines, outcomes).await {
            Ok(deliverables) => {
                for deliverable in deliverables {
                    job.add_deliverable(deliverable);
                }
                job.set_provider(providers::STORAGE, ProviderStatus::ok(&backend));
                logger.log_completion(&format!("{} deliverables stored", job.deliverables.len()));
                Ok(())
            }
            Err(e) => {
                job.set_provider(providers::STORAGE, ProviderStatus::failed(&backend, e.to_string()));
                Err(e)
            }
        }
    }

    async fn store_deliverables(
        &self,
        job: &Job,
        profile: &Profile,
        seed: u64,
        timelines: &[Timeline],
        outcomes: &[RenderOutcome],
    ) -> WorkerResult<Vec<trailer_models::Deliverable>> {
        let store = self.store.as_ref();
        let format = job.config.output_format;
        let personalization: &Personalization = job
            .personalization
            .as_ref()
            .ok_or_else(|| WorkerError::render_failed("personalization missing at packaging"))?;

        let mut deliverables = Vec::new();
        for outcome in outcomes {
            let Ok(path) = &outcome.result else {
                continue;
            };
            deliverables.push(store_trailer(store, &job.id, outcome.variant, path, format).await?);

            if job.config.captions {
                let index = outcome.variant - 1;
                if let (Some(timeline), Some(variant)) = (timelines.get(index), personalization.variants.get(index)) {
                    let tracks = store_captions(
                        store,
                        &job.id,
                        outcome.variant,
                        timeline,
                        &variant.selected_scenes,
                        &job.config.languages,
                    )
                    .await?;
                    deliverables.extend(tracks);
                }
            }
        }

        if job.config.storyboard {
            if let Some(analysis) = job.analysis.as_ref() {
                let input = StoryboardInput {
                    profile,
                    seed,
                    target_duration: job.config.target_duration,
                    duration_is_fallback: job.duration_is_fallback,
                    analysis,
                    ranked: &personalization.ranked,
                    variants: &personalization.variants,
                    timelines,
                };
                deliverables.push(store_storyboard(store, &job.id, &input).await?);
            }
        }

        Ok(deliverables)
    }
}

fn finish_stage(job: &mut Job, stage: &str, started: Instant) {
    let elapsed = started.elapsed();
    job.record_timing(stage, elapsed.as_millis() as u64);
    metrics::record_stage(stage, elapsed.as_secs_f64());
}
