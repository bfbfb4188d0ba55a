use std::cmp::Ordering;

use super::{ClientProfile, DownloadJob, DownloadRequest, FormatInfo, StrategyKind};

/// Narrow, audio-preferring selector used by the primary attempt.
pub const PRIMARY_FORMAT: &str = "bestaudio/best";

/// The escalation ladder for one job, built from the configured fallback list.
#[derive(Debug, Clone)]
pub struct StrategyPlan {
    fallback_formats: Vec<String>,
}

impl StrategyPlan {
    /// `fallback_formats` runs most audio-specific first, most general last.
    pub fn new(fallback_formats: Vec<String>) -> Self {
        Self { fallback_formats }
    }

    pub fn fallback_formats(&self) -> &[String] {
        &self.fallback_formats
    }

    /// Every state in escalation order, terminal states excluded.
    pub fn sequence(&self) -> Vec<StrategyKind> {
        let mut kinds = Vec::with_capacity(self.fallback_formats.len() + 3);
        kinds.push(StrategyKind::Primary);
        kinds.extend((0..self.fallback_formats.len()).map(StrategyKind::FormatFallback));
        kinds.push(StrategyKind::ManualProbe);
        kinds.push(StrategyKind::AlternateExtractor);
        kinds
    }

    /// Builds the transfer request for a strategy. Manual probing needs the
    /// probed format id, see [`StrategyPlan::manual_request`].
    pub fn request_for(&self, kind: StrategyKind, job: &DownloadJob) -> Option<DownloadRequest> {
        match kind {
            StrategyKind::Primary => Some(base_request(job, Some(PRIMARY_FORMAT.to_string()), ClientProfile::Minimal)),
            StrategyKind::FormatFallback(i) => self
                .fallback_formats
                .get(i)
                .map(|spec| base_request(job, Some(spec.clone()), ClientProfile::Unconstrained)),
            StrategyKind::ManualProbe => None,
            StrategyKind::AlternateExtractor => Some(base_request(job, Some(PRIMARY_FORMAT.to_string()), ClientProfile::Alternate)),
        }
    }

    pub fn manual_request(&self, job: &DownloadJob, format_id: &str) -> DownloadRequest {
        base_request(job, Some(format_id.to_string()), ClientProfile::Unconstrained)
    }
}

fn base_request(job: &DownloadJob, format: Option<String>, client: ClientProfile) -> DownloadRequest {
    DownloadRequest {
        url: job.normalized_url.clone(),
        output_dir: job.output_dir.clone(),
        bitrate_kbps: job.bitrate_kbps,
        allow_playlist: job.allow_playlist,
        format,
        client,
    }
}

/// Best audio-only stream by (audio bitrate, sample rate, size).
pub fn pick_best_audio_format(formats: &[FormatInfo]) -> Option<&FormatInfo> {
    first_max_by(formats.iter().filter(|f| f.is_audio_only()), |f| {
        [f.abr.unwrap_or(0.0), f.asr.unwrap_or(0) as f64, f.size() as f64]
    })
}

/// Stream for the manual probe: audio-only if any exist, otherwise the one
/// maximizing (has audio, bitrate).
pub fn pick_manual_format(formats: &[FormatInfo]) -> Option<&FormatInfo> {
    pick_best_audio_format(formats).or_else(|| {
        first_max_by(formats.iter(), |f| {
            [
                if f.has_audio() { 1.0 } else { 0.0 },
                f.tbr.or(f.abr).unwrap_or(0.0),
                0.0,
            ]
        })
    })
}

/// Maximum by a lexicographic key; on ties the earliest item wins.
fn first_max_by<'a, I, K>(items: I, key: K) -> Option<&'a FormatInfo>
where
    I: Iterator<Item = &'a FormatInfo>,
    K: Fn(&FormatInfo) -> [f64; 3],
{
    let mut best: Option<(&FormatInfo, [f64; 3])> = None;
    for item in items {
        let k = key(item);
        let better = match &best {
            None => true,
            Some((_, current)) => compare_keys(&k, current) == Ordering::Greater,
        };
        if better {
            best = Some((item, k));
        }
    }
    best.map(|(item, _)| item)
}

fn compare_keys(a: &[f64; 3], b: &[f64; 3]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
