//! Source duration probing.

use std::path::Path;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

/// Fallback duration bounds when probing is unavailable.
pub const FALLBACK_DURATION_MIN: f64 = 90.0;
pub const FALLBACK_DURATION_MAX: f64 = 150.0;

/// Reads the duration of a media asset.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration in seconds, or `None` when unknown.
    async fn probe_duration(&self, path: &Path) -> Option<f64>;
}

/// Probe backed by `ffprobe`.
#[derive(Debug, Clone, Default)]
pub struct FfprobeDurationProbe;

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        match trailer_media::get_duration(path).await {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(path = %path.display(), "Duration probe failed: {}", e);
                None
            }
        }
    }
}

/// Duration chosen for a job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceDuration {
    pub seconds: f64,
    pub is_fallback: bool,
}

/// Probe `path`, falling back to a seeded duration in [90, 150] seconds.
///
/// The generator is only advanced when the fallback is used.
pub async fn resolve_duration(probe: &dyn DurationProbe, path: &Path, rng: &mut StdRng) -> SourceDuration {
    match probe.probe_duration(path).await {
        Some(d) if d.is_finite() && d > 0.0 => SourceDuration {
            seconds: d,
            is_fallback: false,
        },
        other => {
            let seconds = rng.random_range(FALLBACK_DURATION_MIN..=FALLBACK_DURATION_MAX);
            warn!(
                path = %path.display(),
                probed = ?other,
                fallback = seconds,
                "Using fallback source duration"
            );
            SourceDuration {
                seconds,
                is_fallback: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct FixedProbe(Option<f64>);

    #[async_trait]
    impl DurationProbe for FixedProbe {
        async fn probe_duration(&self, _path: &Path) -> Option<f64> {
            self.0
        }
    }

    #[tokio::test]
    async fn test_probed_duration_is_used() {
        let mut rng = StdRng::seed_from_u64(1);
        let d = resolve_duration(&FixedProbe(Some(120.0)), Path::new("a.mp4"), &mut rng).await;
        assert_eq!(d, SourceDuration { seconds: 120.0, is_fallback: false });
    }

    #[tokio::test]
    async fn test_garbage_falls_back() {
        for probed in [None, Some(0.0), Some(-3.0), Some(f64::NAN)] {
            let mut rng = StdRng::seed_from_u64(7);
            let d = resolve_duration(&FixedProbe(probed), Path::new("a.mp4"), &mut rng).await;
            assert!(d.is_fallback);
            assert!((FALLBACK_DURATION_MIN..=FALLBACK_DURATION_MAX).contains(&d.seconds));
        }
    }

    #[tokio::test]
    async fn test_fallback_is_seeded() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let da = resolve_duration(&FixedProbe(None), Path::new("a.mp4"), &mut a).await;
        let db = resolve_duration(&FixedProbe(None), Path::new("a.mp4"), &mut b).await;
        assert_eq!(da, db);
    }
}
