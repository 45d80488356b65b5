//! Structured outcome of a single tool invocation.
//!
//! Every metric is optional: `None` means the tool never reported it, which is
//! different from a measured zero.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub steps: u32,
    #[serde(with = "metric")]
    pub ms_per_step: f64,
    #[serde(with = "metric")]
    pub psnr: f64,
}

/// One experiment inside a job's output, with its learning curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRun {
    pub index: Option<u32>,
    #[serde(default, with = "metric::option")]
    pub bits_per_pixel: Option<f64>,
    pub learning_curve: Vec<TrainingSample>,
}

impl ExperimentRun {
    pub fn new(index: u32, bits_per_pixel: f64) -> Self {
        Self {
            index: Some(index),
            bits_per_pixel: Some(bits_per_pixel),
            learning_curve: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.learning_curve.is_empty()
    }

    /// Quality reached at the last recorded step.
    pub fn final_psnr(&self) -> Option<f64> {
        self.learning_curve.last().map(|s| s.psnr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatentShape {
    pub grid_size_scale: u32,
    pub high_res_features: u32,
    pub high_res_quant_bits: u32,
    pub low_res_features: u32,
    pub low_res_quant_bits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureDimensions {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub mip_levels: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GpuFeature {
    DP4a,
    FP16,
    CoopVecInt8,
    CoopVecFP8,
}

impl std::fmt::Display for GpuFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuFeature::DP4a => write!(f, "DP4a"),
            GpuFeature::FP16 => write!(f, "FP16"),
            GpuFeature::CoopVecInt8 => write!(f, "CoopVecInt8"),
            GpuFeature::CoopVecFP8 => write!(f, "CoopVecFP8"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub graphics_api: String,
    pub features: BTreeSet<GpuFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Wall time of the whole tool invocation.
    pub elapsed: Duration,
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(default, with = "metric::option")]
    pub bits_per_pixel: Option<f64>,
    #[serde(default, with = "metric::option")]
    pub overall_psnr: Option<f64>,
    /// PSNR measured with the alternate (FP8) weights.
    #[serde(default, with = "metric::option")]
    pub overall_psnr_fp8: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "metric::seq")]
    pub per_mip_psnr: Vec<f64>,

    #[serde(default, with = "metric::option")]
    pub combined_bc_psnr: Option<f64>,
    #[serde(default, with = "metric::option")]
    pub combined_bc_bits_per_pixel: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experiments: Vec<ExperimentRun>,

    /// Milliseconds.
    #[serde(default, with = "metric::option")]
    pub decompression_time: Option<f64>,
    pub saved_file_size: Option<u64>,
    #[serde(default, with = "metric::option")]
    pub saved_file_bits_per_pixel: Option<f64>,

    pub device: Option<DeviceInfo>,

    pub dimensions: Option<TextureDimensions>,
    pub latent_shape: Option<LatentShape>,
    pub network_version: Option<String>,
}

impl RunResult {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Serde adapters for metrics the tool may report as `inf`.
///
/// JSON has no infinity, and serde_json writes non-finite floats as `null`,
/// which would read back as "never reported". Non-finite values are written
/// as the strings `"inf"`, `"-inf"` and `"nan"` instead.
pub(crate) mod metric {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    struct Metric(f64);

    impl Serialize for Metric {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let value = self.0;
            if value.is_finite() {
                serializer.serialize_f64(value)
            } else if value.is_nan() {
                serializer.serialize_str("nan")
            } else if value > 0.0 {
                serializer.serialize_str("inf")
            } else {
                serializer.serialize_str("-inf")
            }
        }
    }

    impl<'de> Deserialize<'de> for Metric {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            match Repr::deserialize(deserializer)? {
                Repr::Number(value) => Ok(Metric(value)),
                Repr::Text(text) => match text.as_str() {
                    "inf" => Ok(Metric(f64::INFINITY)),
                    "-inf" => Ok(Metric(f64::NEG_INFINITY)),
                    "nan" => Ok(Metric(f64::NAN)),
                    other => Err(D::Error::custom(format!("invalid metric value {:?}", other))),
                },
            }
        }
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        Metric(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Metric::deserialize(deserializer).map(|m| m.0)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<f64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.map(Metric).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<f64>, D::Error> {
            Ok(Option::<Metric>::deserialize(deserializer)?.map(|m| m.0))
        }
    }

    pub mod seq {
        use super::*;

        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|&v| Metric(v)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<f64>, D::Error> {
            Ok(Vec::<Metric>::deserialize(deserializer)?
                .into_iter()
                .map(|m| m.0)
                .collect())
        }
    }
}
