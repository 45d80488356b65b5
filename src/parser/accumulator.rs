use std::time::Duration;

use chrono::Utc;

use crate::parser::classify::{classify, Event, QualityKind};
use crate::result::{DeviceInfo, ExperimentRun, RunResult};

/// Folds classified output lines into a single [`RunResult`].
///
/// Two slots are under construction at any time: the result itself and the
/// experiment run currently receiving training samples. A run is sealed into
/// the result when the next experiment starts or when [`finish`] is called,
/// and only if it recorded at least one sample.
///
/// [`finish`]: ResultAccumulator::finish
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    result: RunResult,
    current: ExperimentRun,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rate requested by the job; kept unless the output reports one.
    pub fn with_expected_rate(mut self, bits_per_pixel: Option<f64>) -> Self {
        self.result.bits_per_pixel = bits_per_pixel;
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.result.elapsed = elapsed;
        self
    }

    /// Classify and apply one line. Unrecognized lines are ignored.
    pub fn push_line(&mut self, line: &str) {
        if let Some(event) = classify(line) {
            self.push(event);
        }
    }

    pub fn push(&mut self, event: Event) {
        let result = &mut self.result;
        match event {
            Event::BaseRate { bits_per_pixel } => {
                result.bits_per_pixel = Some(bits_per_pixel);
            }
            Event::SelectedRate {
                bits_per_pixel,
                psnr,
            } => {
                result.bits_per_pixel = Some(bits_per_pixel);
                result.overall_psnr = Some(psnr);
            }
            Event::CombinedQuality {
                psnr,
                bits_per_pixel,
            } => {
                result.combined_bc_psnr = Some(psnr);
                result.combined_bc_bits_per_pixel = Some(bits_per_pixel);
            }
            Event::DecompressionTiming { milliseconds, .. } => {
                result.decompression_time = Some(milliseconds);
            }
            Event::Dimensions(dimensions) => {
                result.dimensions = Some(dimensions);
            }
            Event::ExperimentStart {
                index,
                bits_per_pixel,
            } => {
                let previous =
                    std::mem::replace(&mut self.current, ExperimentRun::new(index, bits_per_pixel));
                Self::seal(result, previous);
            }
            Event::FileSize {
                bytes,
                bits_per_pixel,
            } => {
                result.saved_file_size = Some(bytes);
                result.saved_file_bits_per_pixel = Some(bits_per_pixel);
            }
            Event::LatentShapeDescriptor(shape) => {
                result.latent_shape = Some(shape);
            }
            Event::PerLevelQuality { psnr, .. } => {
                result.per_mip_psnr.push(psnr);
            }
            Event::NetworkVersion(version) => {
                result.network_version = Some(version);
            }
            Event::OverallQuality { kind, psnr } => match kind {
                QualityKind::Alternate => result.overall_psnr_fp8 = Some(psnr),
                QualityKind::Standard => result.overall_psnr = Some(psnr),
            },
            Event::TrainingStep(sample) => {
                self.current.learning_curve.push(sample);
            }
            Event::SystemDescriptor {
                device_name,
                graphics_api,
                features,
            } => {
                result.device = Some(DeviceInfo {
                    name: device_name,
                    graphics_api,
                    features,
                });
            }
        }
    }

    /// Number of experiment runs sealed so far.
    pub fn sealed_runs(&self) -> usize {
        self.result.experiments.len()
    }

    pub fn finish(mut self) -> RunResult {
        let current = std::mem::take(&mut self.current);
        Self::seal(&mut self.result, current);
        self.result.finished_at = Some(Utc::now());
        self.result
    }

    // Runs without samples are dropped.
    fn seal(result: &mut RunResult, run: ExperimentRun) {
        if !run.is_empty() {
            result.experiments.push(run);
        }
    }
}

/// Parse a complete captured output in one go.
pub fn parse_output(output: &str) -> RunResult {
    let mut accumulator = ResultAccumulator::new();
    for line in output.lines() {
        accumulator.push_line(line);
    }
    accumulator.finish()
}
