use std::collections::hash_map::{Entry, HashMap};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::{EncodeError, Result, SegmenterError},
    segmenter::{SegmentReport, Segmenter},
    video::MediaBackend,
};

/// Outcome of processing one input file
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<SegmentReport>,
}

/// Per-file results of a batch run, in input order
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn total_segments(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|r| r.segments_written)
            .sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// List the videos in `dir` whose extension is in `extensions`
///
/// Non-recursive; hidden files and directories are skipped and the result
/// is sorted so runs are reproducible.
pub fn discover_inputs<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut inputs = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if !path.is_file() || is_hidden_file(&path) {
            continue;
        }

        if has_allowed_extension(&path, extensions) {
            inputs.push(path);
        } else {
            debug!("Skipping {:?}: unsupported extension", path);
        }
    }

    inputs.sort();
    Ok(inputs)
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Base name shared by all segments of `input`
fn segment_prefix(input: &Path) -> Result<&str> {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SegmenterError::generic(format!("{:?} has no usable base name", input)))
}

/// Pair every input with the earlier input already owning its segment prefix
///
/// `clip.avi` and `clip.mp4` would both write `clip_segment_<i>`; only the
/// first in input order keeps the prefix. Keys are compared case-insensitively
/// so the same holds on case-insensitive filesystems.
fn claim_prefixes(inputs: Vec<PathBuf>) -> Vec<(PathBuf, Option<PathBuf>)> {
    let mut owners: HashMap<String, PathBuf> = HashMap::new();
    inputs
        .into_iter()
        .map(|input| {
            let owner = match segment_prefix(&input) {
                Ok(prefix) => match owners.entry(prefix.to_lowercase()) {
                    Entry::Occupied(owner) => Some(owner.get().clone()),
                    Entry::Vacant(slot) => {
                        slot.insert(input.clone());
                        None
                    }
                },
                Err(_) => None,
            };
            (input, owner)
        })
        .collect()
}

fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Runs the segmenter over every video in the input directory
///
/// Files are independent: a failure on one is logged and recorded in the
/// summary, and the batch carries on with the next.
pub struct BatchDriver<B: MediaBackend> {
    config: Config,
    backend: B,
}

impl<B: MediaBackend> BatchDriver<B> {
    pub fn new(config: Config, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate, discover inputs, and segment each of them
    pub fn run(&self) -> Result<BatchSummary> {
        self.config.validate()?;

        let input_dir = &self.config.input.dir;
        let output_dir = &self.config.output.dir;

        let inputs = discover_inputs(input_dir, &self.config.input.extensions)?;
        if inputs.is_empty() {
            warn!("No supported video files found in {}", input_dir.display());
            return Ok(BatchSummary::default());
        }

        std::fs::create_dir_all(output_dir)?;

        let jobs = self.config.batch.effective_jobs().min(inputs.len());
        info!("Processing {} videos from {} into {} ({} backend, {} job{})",
              inputs.len(), input_dir.display(), output_dir.display(),
              self.backend.name(), jobs, if jobs == 1 { "" } else { "s" });

        let work = claim_prefixes(inputs);
        let outcomes: Vec<FileOutcome> = if jobs <= 1 {
            work.into_iter().map(|(input, owner)| self.run_one(input, owner)).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| SegmenterError::generic(format!("Failed to start worker pool: {}", e)))?;
            pool.install(|| {
                work.into_par_iter()
                    .map(|(input, owner)| self.run_one(input, owner))
                    .collect()
            })
        };

        let summary = BatchSummary { outcomes };
        info!("Batch complete: {} succeeded, {} failed, {} segments written",
              summary.succeeded(), summary.failed(), summary.total_segments());
        Ok(summary)
    }

    fn run_one(&self, input: PathBuf, prefix_owner: Option<PathBuf>) -> FileOutcome {
        let result = match prefix_owner {
            Some(owner) => Err(self.prefix_taken(&input, &owner)),
            None => self.process_file(&input),
        };
        if let Err(e) = &result {
            if e.is_per_file() {
                warn!("Skipping {}: {}", input.display(), e.user_message());
            } else {
                error!("Failed on {}: {}", input.display(), e);
            }
        }
        FileOutcome { input, result }
    }

    fn prefix_taken(&self, input: &Path, owner: &Path) -> SegmenterError {
        EncodeError::PrefixTaken {
            path: input.display().to_string(),
            prefix: segment_prefix(input).unwrap_or_default().to_string(),
            claimed_by: owner.display().to_string(),
        }
        .into()
    }

    /// Segment a single input file into the configured output directory
    pub fn process_file(&self, input: &Path) -> Result<SegmentReport> {
        let metadata = self.backend.probe(input, &self.config.source)?;
        let plan = self.config.plan(metadata.fps);
        let output = &self.config.output;

        info!("Input Video: {:.2}s at {:.2} FPS, {} resolution.",
              metadata.duration_seconds(), metadata.fps, metadata.resolution);
        info!("Output Video: {:.2} FPS, {} frames per segment, frame interval {}.",
              output.frame_rate, plan.frames_per_segment, plan.frame_interval);

        let prefix = segment_prefix(input)?;

        let mut source = self.backend.open_source(&metadata)?;
        let report = Segmenter::new(&self.backend, output, plan).segment(source.as_mut(), prefix)?;

        info!("Video '{}' successfully split into {} segments.", input.display(), report.segments_written);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::testing::{FakeBackend, FakeInput};
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    fn config_for(input: &Path, output: &Path) -> Config {
        let mut config = Config::default();
        config.input.dir = input.to_path_buf();
        config.output.dir = output.to_path_buf();
        config.output.width = 64;
        config.output.height = 48;
        config
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.mov");
        touch(dir.path(), "a.MP4");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), ".hidden.mp4");
        touch(dir.path(), "c.mkv");
        touch(dir.path(), "d.avi");
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let inputs = discover_inputs(dir.path(), &Config::default().input.extensions).unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.MP4", "b.mov", "c.mkv", "d.avi"]);
    }

    #[test]
    fn test_discover_missing_dir_is_error() {
        assert!(discover_inputs("/no/such/input/dir", &["mp4".to_string()]).is_err());
    }

    #[test]
    fn test_batch_continues_past_unavailable_source() {
        let input_dir = tempdir().unwrap();
        let output_root = tempdir().unwrap();
        let output_dir = output_root.path().join("segments");

        let good = touch(input_dir.path(), "good.mp4");
        touch(input_dir.path(), "broken.avi");
        let other = touch(input_dir.path(), "other.mkv");

        let backend = FakeBackend::new()
            .with_input(&good, FakeInput::new(30.0, 900))
            .with_input(&other, FakeInput::new(30.0, 10));

        let driver = BatchDriver::new(config_for(input_dir.path(), &output_dir), backend);
        let summary = driver.run().unwrap();

        assert_eq!(summary.outcomes.len(), 3);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());

        let broken = &summary.outcomes[0];
        assert!(broken.input.ends_with("broken.avi"));
        assert!(matches!(&broken.result, Err(e) if e.is_per_file()));

        // 900 frames at 30 -> 15 fps, 75 per segment
        assert_eq!(summary.outcomes[1].result.as_ref().unwrap().segments_written, 6);
        // 10 frames -> 5 kept -> one partial segment
        assert_eq!(summary.outcomes[2].result.as_ref().unwrap().segment_frames, vec![5]);
        assert_eq!(summary.total_segments(), 7);

        assert!(output_dir.join("good_segment_5.mp4").exists());
        assert!(output_dir.join("other_segment_0.mp4").exists());
        assert!(!output_dir.join("broken_segment_0.mp4").exists());
    }

    #[test]
    fn test_probed_frame_rate_drives_the_stride() {
        let input_dir = tempdir().unwrap();
        let output_dir = tempdir().unwrap();
        let clip = touch(input_dir.path(), "fast.mp4");

        let backend = FakeBackend::new().with_input(&clip, FakeInput::new(60.0, 120));
        let driver = BatchDriver::new(config_for(input_dir.path(), output_dir.path()), backend);

        let report = driver.process_file(&clip).unwrap();
        assert_eq!(report.frames_selected, 30);
        assert_eq!(report.segment_frames, vec![30]);
    }

    #[test]
    fn test_fallback_metadata_when_probing_disabled() {
        let input_dir = tempdir().unwrap();
        let output_dir = tempdir().unwrap();
        let clip = touch(input_dir.path(), "fast.mp4");

        let backend = FakeBackend::new().with_input(&clip, FakeInput::new(60.0, 120));
        let mut config = config_for(input_dir.path(), output_dir.path());
        config.source.probe_metadata = false;
        let driver = BatchDriver::new(config, backend);

        // Assumed 30 fps: every second frame is kept
        let report = driver.process_file(&clip).unwrap();
        assert_eq!(report.frames_selected, 60);
    }

    #[test]
    fn test_parallel_run_matches_sequential() {
        let input_dir = tempdir().unwrap();
        let output_dir = tempdir().unwrap();

        let mut backend = FakeBackend::new();
        for (i, frames) in [0u64, 3, 151, 450, 900].iter().enumerate() {
            let path = touch(input_dir.path(), &format!("clip{}.mp4", i));
            backend = backend.with_input(path, FakeInput::new(30.0, *frames));
        }

        let mut config = config_for(input_dir.path(), output_dir.path());
        config.batch.jobs = 3;
        let summary = BatchDriver::new(config, backend).run().unwrap();

        let segments: Vec<u64> = summary
            .outcomes
            .iter()
            .map(|o| o.result.as_ref().unwrap().segments_written)
            .collect();
        assert_eq!(segments, vec![0, 1, 2, 3, 6]);
        assert!(!output_dir.path().join("clip0_segment_0.mp4").exists());
    }

    #[test]
    fn test_shared_base_name_keeps_first_input_only() {
        let input_dir = tempdir().unwrap();
        let output_dir = tempdir().unwrap();
        let avi = touch(input_dir.path(), "clip.avi");
        let mp4 = touch(input_dir.path(), "clip.mp4");

        let backend = FakeBackend::new()
            .with_input(&avi, FakeInput::new(30.0, 300))
            .with_input(&mp4, FakeInput::new(30.0, 600));

        let mut config = config_for(input_dir.path(), output_dir.path());
        config.batch.jobs = 2;
        let summary = BatchDriver::new(config, backend).run().unwrap();

        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total_segments(), 2);

        assert!(summary.outcomes[0].input.ends_with("clip.avi"));
        assert_eq!(summary.outcomes[0].result.as_ref().unwrap().segments_written, 2);

        let skipped = &summary.outcomes[1];
        assert!(skipped.input.ends_with("clip.mp4"));
        assert!(matches!(
            &skipped.result,
            Err(SegmenterError::Encode(EncodeError::PrefixTaken { prefix, .. })) if prefix == "clip"
        ));
        assert!(skipped.result.as_ref().unwrap_err().is_per_file());

        assert!(output_dir.path().join("clip_segment_1.mp4").exists());
        assert!(!output_dir.path().join("clip_segment_2.mp4").exists());
    }

    #[test]
    fn test_claim_prefixes_ignores_case() {
        let work = claim_prefixes(vec![
            PathBuf::from("in/Run.mov"),
            PathBuf::from("in/run.mp4"),
            PathBuf::from("in/walk.mp4"),
        ]);
        assert_eq!(work[0].1, None);
        assert_eq!(work[1].1, Some(PathBuf::from("in/Run.mov")));
        assert_eq!(work[2].1, None);
    }

    #[test]
    fn test_empty_input_dir() {
        let input_dir = tempdir().unwrap();
        let output_dir = tempdir().unwrap();
        let driver = BatchDriver::new(config_for(input_dir.path(), output_dir.path()), FakeBackend::new());

        let summary = driver.run().unwrap();
        assert!(summary.outcomes.is_empty());
        assert!(summary.is_success());
    }

    #[test]
    fn test_invalid_config_stops_before_work() {
        let input_dir = tempdir().unwrap();
        let output_dir = tempdir().unwrap();
        let mut config = config_for(input_dir.path(), output_dir.path());
        config.output.segment_length_seconds = -1.0;

        let err = BatchDriver::new(config, FakeBackend::new()).run().unwrap_err();
        assert!(!err.is_per_file());
    }
}
