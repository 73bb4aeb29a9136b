//! End-to-end pipeline runs with in-process probe, renderer and provider.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use trailer_media::MediaResult;
use trailer_models::{
    AssemblyStatus, FailureKind, Job, JobConfig, JobRequest, JobState, OutputFormat, ProviderStatusKind,
    DURATION_TOLERANCE,
};
use trailer_storage::{ArtifactStore, LocalArtifactStore};
use trailer_vision::{VisionClient, VisionClientConfig};
use trailer_worker::analysis::FrameSampler;
use trailer_worker::{
    DurationProbe, ProfileCatalog, RenderRequest, SceneAnalyzer, SyntheticAnalyzer, TrailerPipeline, TrailerRenderer,
    VisionAnalyzer, WorkerConfig, WorkerError, WorkerResult,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedProbe(Option<f64>);

#[async_trait]
impl DurationProbe for FixedProbe {
    async fn probe_duration(&self, _path: &Path) -> Option<f64> {
        self.0
    }
}

/// Writes a placeholder file per variant, failing the listed variants.
struct FakeRenderer {
    fail: BTreeSet<usize>,
}

#[async_trait]
impl TrailerRenderer for FakeRenderer {
    fn mode(&self) -> &'static str {
        "fake"
    }

    async fn render(&self, request: &RenderRequest<'_>) -> WorkerResult<()> {
        if self.fail.contains(&request.variant) {
            let scene = &request.timeline.entries[0].scene_id;
            return Err(WorkerError::segment_failed(scene, "ffmpeg exited with status 1"));
        }
        let body = format!("{} clips", request.timeline.entries.len());
        tokio::fs::write(request.output_path, body).await?;
        Ok(())
    }
}

struct StubSampler;

#[async_trait]
impl FrameSampler for StubSampler {
    async fn sample(&self, _asset: &Path, dir: &Path, duration: f64, count: usize) -> MediaResult<Vec<(f64, PathBuf)>> {
        let mut frames = Vec::new();
        for (i, ts) in trailer_media::sample_timestamps(duration, count).into_iter().enumerate() {
            let frame = dir.join(format!("frame_{:04}.jpg", i));
            tokio::fs::write(&frame, [0xFF, 0xD8, 0xFF, 0xD9]).await?;
            frames.push((ts, frame));
        }
        Ok(frames)
    }
}

struct Harness {
    dir: TempDir,
    asset: PathBuf,
    store: Arc<LocalArtifactStore>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("feature.mp4");
        std::fs::write(&asset, b"not really a video").unwrap();
        let store = Arc::new(LocalArtifactStore::new(dir.path().join("artifacts")));
        Self { dir, asset, store }
    }

    fn config(&self) -> WorkerConfig {
        WorkerConfig {
            work_dir: self.dir.path().join("work"),
            ..Default::default()
        }
    }

    fn pipeline(&self, duration: Option<f64>, analyzer: Arc<dyn SceneAnalyzer>, fail: &[usize]) -> TrailerPipeline {
        TrailerPipeline::new(
            self.config(),
            ProfileCatalog::builtin(),
            Arc::new(FixedProbe(duration)),
            analyzer,
            Arc::new(FakeRenderer {
                fail: fail.iter().copied().collect(),
            }),
            self.store.clone(),
        )
    }

    fn synthetic(&self, duration: Option<f64>, fail: &[usize]) -> TrailerPipeline {
        self.pipeline(duration, Arc::new(SyntheticAnalyzer::default()), fail)
    }

    fn request(&self, profile: &str, target: f64, seed: u64) -> JobRequest {
        JobRequest::new(profile, &self.asset).with_config(JobConfig {
            target_duration: target,
            seed: Some(seed),
            ..Default::default()
        })
    }

    async fn read(&self, job: &Job, key: &str) -> Vec<u8> {
        self.store.get(&job.id, key).await.unwrap()
    }
}

#[tokio::test]
async fn test_four_variants_near_target() {
    let h = Harness::new();
    let job = h
        .synthetic(Some(120.0), &[])
        .run_job(h.request("action_enthusiast", 60.0, 42))
        .await;

    assert_eq!(job.state, JobState::Completed, "{:?}", job.failure);
    let p = job.personalization.as_ref().unwrap();
    assert_eq!(p.variants.len(), 4, "{:?}", job.warnings);
    for v in &p.variants {
        assert!(
            (58.0..=62.0).contains(&v.estimated_duration),
            "{} = {}",
            v.name,
            v.estimated_duration
        );
    }
    assert!(p.canonical.estimated_duration <= 60.0 + DURATION_TOLERANCE);

    assert_eq!(job.trailer_keys().len(), 4);
    assert!(job.deliverables.contains_key("captions_variant_1_en.srt"));
    assert!(job.deliverables.contains_key("storyboard.json"));
    assert_eq!(job.providers["analysis"].mode, "synthetic");
    assert_eq!(job.providers["render"].status, ProviderStatusKind::Ok);
    assert_eq!(job.providers["storage"].mode, "local");

    let stages: Vec<&str> = job.timings.iter().map(|t| t.stage.as_str()).collect();
    assert_eq!(stages, vec!["probe", "analysis", "personalize", "timeline", "render", "package"]);
}

/// Number of scene subsets whose total lands within tolerance of `target`.
fn window_sets(durations: &[f64], target: f64) -> usize {
    (1u32..1 << durations.len())
        .filter(|mask| {
            let total: f64 = (0..durations.len())
                .filter(|i| mask >> i & 1 == 1)
                .map(|i| durations[i])
                .sum();
            (total - target).abs() <= DURATION_TOLERANCE
        })
        .count()
}

#[tokio::test]
async fn test_variants_and_timelines_fit_budget_across_seeds() {
    let h = Harness::new();
    let pipeline = h.synthetic(Some(120.0), &[]);
    let target = 60.0;
    let in_window = |d: f64| (target - DURATION_TOLERANCE..=target + DURATION_TOLERANCE).contains(&d);

    for profile in ["action_enthusiast", "romance_devotee", "thriller_seeker", "family_viewer"] {
        for seed in 0..50 {
            let job = pipeline.run_job(h.request(profile, target, seed)).await;
            assert_eq!(job.state, JobState::Completed, "{} seed {}: {:?}", profile, seed, job.failure);

            let durations: Vec<f64> = job.analysis.as_ref().unwrap().scenes.iter().map(|s| s.duration).collect();
            let available = window_sets(&durations, target);
            let p = job.personalization.as_ref().unwrap();
            if available > 0 {
                assert!(in_window(p.canonical.estimated_duration), "{} seed {}", profile, seed);
                for v in &p.variants {
                    assert!(
                        in_window(v.estimated_duration),
                        "{} seed {}: {} = {}",
                        profile,
                        seed,
                        v.name,
                        v.estimated_duration
                    );
                }
            }
            if available >= 4 {
                assert_eq!(p.variants.len(), 4, "{} seed {}: {:?}", profile, seed, job.warnings);
            }

            for assembly in &job.assemblies {
                let timeline = &assembly.timeline;
                assert!(
                    timeline.estimated_duration <= target + DURATION_TOLERANCE + 1e-9,
                    "{} seed {}: timeline {} runs {}",
                    profile,
                    seed,
                    assembly.variant,
                    timeline.estimated_duration
                );
                let raw: f64 = p.variants[assembly.variant - 1].estimated_duration;
                assert!(timeline.estimated_duration >= raw - 1e-9);
            }
        }
    }
}

#[tokio::test]
async fn test_variants_are_distinct() {
    let h = Harness::new();
    for seed in [1, 2, 3] {
        let job = h
            .synthetic(Some(120.0), &[])
            .run_job(h.request("thriller_seeker", 60.0, seed))
            .await;
        let variants = &job.personalization.as_ref().unwrap().variants;
        for (i, a) in variants.iter().enumerate() {
            for b in &variants[i + 1..] {
                assert!(a.jaccard(b) < 1.0, "seed {}: {} equals {}", seed, a.name, b.name);
            }
        }
    }
}

#[tokio::test]
async fn test_target_above_footage_is_underfilled() {
    let h = Harness::new();
    let job = h
        .synthetic(Some(120.0), &[])
        .run_job(h.request("family_viewer", 500.0, 9))
        .await;

    assert_eq!(job.state, JobState::Completed);
    let analysis = job.analysis.as_ref().unwrap();
    let p = job.personalization.as_ref().unwrap();
    assert!(p.canonical.underfilled);
    assert_eq!(p.canonical.scenes.len(), analysis.scenes.len());
    assert!(p.canonical.estimated_duration < 500.0);
    assert!(!p.variants.is_empty());
    assert!(job.warnings.iter().any(|w| w.contains("below")));
}

#[tokio::test]
async fn test_vision_timeout_fails_analysis() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"labels": [{"name": "Car", "confidence": 90.0}]}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = VisionClient::new(VisionClientConfig {
        base_url: server.uri(),
        timeout: Duration::from_millis(200),
        max_retries: 0,
    })
    .unwrap();
    let analyzer = VisionAnalyzer::new(Arc::new(client), Arc::new(StubSampler), 6, 3, Duration::from_secs(2));

    let h = Harness::new();
    let job = h
        .pipeline(Some(120.0), Arc::new(analyzer), &[])
        .run_job(h.request("action_enthusiast", 60.0, 4))
        .await;

    assert_eq!(job.state, JobState::Failed);
    let failure = job.failure.as_ref().unwrap();
    assert_eq!(failure.kind, FailureKind::AnalysisError);
    assert!(job.deliverables.is_empty());
    assert!(job.analysis.is_none());
    assert_eq!(job.providers["analysis"].status, ProviderStatusKind::Failed);
    assert_eq!(job.providers["analysis"].mode, "vision");
}

#[tokio::test]
async fn test_vision_analysis_feeds_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "labels": [{"name": "Explosion", "confidence": 97.0}, {"name": "Street", "confidence": 80.0}],
            "faces": [{"emotion": "EXCITEMENT", "confidence": 88.0}],
            "celebrities": []
        })))
        .mount(&server)
        .await;

    let client = VisionClient::new(VisionClientConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
        max_retries: 0,
    })
    .unwrap();
    let analyzer = VisionAnalyzer::new(Arc::new(client), Arc::new(StubSampler), 10, 5, Duration::from_secs(5));

    let h = Harness::new();
    let job = h
        .pipeline(Some(100.0), Arc::new(analyzer), &[])
        .run_job(h.request("action_enthusiast", 40.0, 4))
        .await;

    assert_eq!(job.state, JobState::Completed, "{:?}", job.failure);
    let analysis = job.analysis.as_ref().unwrap();
    assert_eq!(analysis.scenes.len(), 5);
    assert_eq!(analysis.scenes[0].labels[0], "explosion");
    assert!((analysis.coverage_ratio - 1.0).abs() < 1e-9);
    let ranked = &job.personalization.as_ref().unwrap().ranked;
    assert!(ranked.iter().all(|r| r.matched_tags == vec!["explosion".to_string()]));
}

#[tokio::test]
async fn test_failed_render_is_isolated() {
    let h = Harness::new();
    let job = h
        .synthetic(Some(120.0), &[2])
        .run_job(h.request("action_enthusiast", 60.0, 42))
        .await;

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.trailer_keys().len(), 3);
    assert!(!job.deliverables.contains_key("trailer_variant_2.mp4"));
    assert!(!job.deliverables.contains_key("captions_variant_2_en.srt"));
    assert!(job
        .warnings
        .iter()
        .any(|w| w.contains("variant 2") && w.contains("Middle Climax")));
    assert_eq!(job.assemblies[1].status, AssemblyStatus::Failed);
    assert!(job.assemblies[1].error.as_ref().unwrap().contains("scene_"));
    assert_eq!(job.providers["render"].status, ProviderStatusKind::Degraded);
}

#[tokio::test]
async fn test_all_renders_failing_fails_job() {
    let h = Harness::new();
    let job = h
        .synthetic(Some(120.0), &[1, 2, 3, 4])
        .run_job(h.request("romance_devotee", 30.0, 3))
        .await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.failure.as_ref().unwrap().kind, FailureKind::RenderError);
    assert!(job.trailer_keys().is_empty());
}

#[tokio::test]
async fn test_same_seed_same_storyboard() {
    let h = Harness::new();
    let pipeline = h.synthetic(Some(137.5), &[]);
    let a = pipeline.run_job(h.request("thriller_seeker", 45.0, 2024)).await;
    let b = pipeline.run_job(h.request("thriller_seeker", 45.0, 2024)).await;

    assert_ne!(a.id, b.id);
    assert_eq!(
        serde_json::to_string(&a.analysis).unwrap(),
        serde_json::to_string(&b.analysis).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&a.personalization).unwrap(),
        serde_json::to_string(&b.personalization).unwrap()
    );
    assert_eq!(h.read(&a, "storyboard.json").await, h.read(&b, "storyboard.json").await);
    assert_eq!(
        h.read(&a, "captions_variant_1_en.srt").await,
        h.read(&b, "captions_variant_1_en.srt").await
    );
}

#[tokio::test]
async fn test_timelines_and_coverage_are_clamped() {
    let h = Harness::new();
    for (duration, seed) in [(95.0, 1), (121.3, 2), (150.0, 3)] {
        let job = h
            .synthetic(Some(duration), &[])
            .run_job(h.request("action_enthusiast", 60.0, seed))
            .await;
        let analysis = job.analysis.as_ref().unwrap();
        assert!(analysis.scenes.last().unwrap().end <= duration);
        assert!(analysis.coverage_ratio <= 1.0);

        for assembly in &job.assemblies {
            for entry in &assembly.timeline.entries {
                assert!(entry.source_start >= 0.0);
                assert!(entry.source_start < entry.source_end);
                assert!(entry.source_end <= duration);
                assert!(entry.out_point - entry.in_point >= 0.0);
            }
        }
    }
}

#[tokio::test]
async fn test_probe_fallback_is_recorded() {
    let h = Harness::new();
    let job = h
        .synthetic(None, &[])
        .run_job(h.request("family_viewer", 30.0, 11))
        .await;

    assert_eq!(job.state, JobState::Completed);
    assert!(job.duration_is_fallback);
    let d = job.source_duration.unwrap();
    assert!((90.0..=150.0).contains(&d));
    assert_eq!(job.providers["probe"].status, ProviderStatusKind::Degraded);
}

#[tokio::test]
async fn test_input_errors_run_no_stage() {
    let h = Harness::new();
    let pipeline = h.synthetic(Some(120.0), &[]);

    let unknown = pipeline.run_job(h.request("nobody", 60.0, 1)).await;
    assert_eq!(unknown.failure.as_ref().unwrap().kind, FailureKind::InputError);
    assert!(unknown.timings.is_empty());

    let missing = pipeline
        .run_job(JobRequest::new("action_enthusiast", h.dir.path().join("missing.mp4")))
        .await;
    assert_eq!(missing.state, JobState::Failed);
    assert_eq!(missing.failure.as_ref().unwrap().kind, FailureKind::InputError);

    let bad_target = pipeline.run_job(h.request("action_enthusiast", -5.0, 1)).await;
    assert_eq!(bad_target.failure.as_ref().unwrap().kind, FailureKind::InputError);

    let repeated = JobRequest::new("action_enthusiast", &h.asset).with_config(JobConfig {
        languages: vec!["en".into(), "en".into()],
        seed: Some(1),
        ..Default::default()
    });
    let repeated = pipeline.run_job(repeated).await;
    assert_eq!(repeated.failure.as_ref().unwrap().kind, FailureKind::InputError);
    assert!(repeated.timings.is_empty());
    assert!(repeated.deliverables.is_empty());
}

#[tokio::test]
async fn test_output_format_and_languages() {
    let h = Harness::new();
    let request = JobRequest::new("romance_devotee", &h.asset).with_config(JobConfig {
        target_duration: 40.0,
        languages: vec!["es".into(), "de".into()],
        output_format: OutputFormat::Webm,
        storyboard: false,
        seed: Some(8),
        ..Default::default()
    });
    let job = h.synthetic(Some(120.0), &[]).run_job(request).await;

    assert_eq!(job.state, JobState::Completed);
    assert!(job.deliverables.contains_key("trailer_variant_1.webm"));
    assert_eq!(job.deliverables["trailer_variant_1.webm"].content_type, "video/webm");
    assert!(job.deliverables.contains_key("captions_variant_1_es.srt"));
    assert!(job.deliverables.contains_key("captions_variant_1_de.srt"));
    assert!(!job.deliverables.contains_key("captions_variant_1_en.srt"));
    assert!(!job.deliverables.contains_key("storyboard.json"));
}
