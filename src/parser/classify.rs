use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::result::{GpuFeature, LatentShape, TextureDimensions, TrainingSample};

/// Decimal number or the literal `inf`.
const NUMBER: &str = r"(?:[0-9.]+|inf)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityKind {
    Standard,
    /// FP8 inference weights.
    Alternate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingSource {
    Cuda,
    Graphics,
}

/// A recognized record from the tool's standard output.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BaseRate {
        bits_per_pixel: f64,
    },
    SelectedRate {
        bits_per_pixel: f64,
        psnr: f64,
    },
    CombinedQuality {
        psnr: f64,
        bits_per_pixel: f64,
    },
    DecompressionTiming {
        source: TimingSource,
        milliseconds: f64,
    },
    Dimensions(TextureDimensions),
    ExperimentStart {
        index: u32,
        bits_per_pixel: f64,
    },
    FileSize {
        bytes: u64,
        bits_per_pixel: f64,
    },
    LatentShapeDescriptor(LatentShape),
    PerLevelQuality {
        level: u32,
        psnr: f64,
    },
    NetworkVersion(String),
    OverallQuality {
        kind: QualityKind,
        psnr: f64,
    },
    TrainingStep(TrainingSample),
    SystemDescriptor {
        device_name: String,
        graphics_api: String,
        features: BTreeSet<GpuFeature>,
    },
}

type Builder = fn(&Captures<'_>) -> Option<Event>;

struct LinePattern {
    regex: Regex,
    build: Builder,
}

fn pattern(template: &str, build: Builder) -> LinePattern {
    let source = format!("^{}", template.replace("{num}", NUMBER));
    LinePattern {
        regex: Regex::new(&source).expect("line pattern is a valid regex"),
        build,
    }
}

// Order matters: the first pattern that matches a line wins.
static PATTERNS: LazyLock<Vec<LinePattern>> = LazyLock::new(|| {
    vec![
        pattern(
            r"Base compression rate: --bitsPerPixel (?P<bpp>{num})",
            |c| {
                Some(Event::BaseRate {
                    bits_per_pixel: metric(c, "bpp")?,
                })
            },
        ),
        pattern(
            r"Selected compression rate: (?P<bpp>{num}) bpp, (?P<psnr>{num}) dB PSNR",
            |c| {
                Some(Event::SelectedRate {
                    bits_per_pixel: metric(c, "bpp")?,
                    psnr: metric(c, "psnr")?,
                })
            },
        ),
        pattern(
            r"Combined BCn PSNR: (?P<psnr>{num}) dB, bit rate: (?P<bpp>{num}) bpp",
            |c| {
                Some(Event::CombinedQuality {
                    psnr: metric(c, "psnr")?,
                    bits_per_pixel: metric(c, "bpp")?,
                })
            },
        ),
        pattern(r"CUDA decompression time: (?P<ms>{num}) ms", |c| {
            Some(Event::DecompressionTiming {
                source: TimingSource::Cuda,
                milliseconds: metric(c, "ms")?,
            })
        }),
        pattern(
            r"Dimensions: (?P<width>\d+)x(?P<height>\d+), (?P<channels>\d+) channels, (?P<mips>\d+) mip level\(s\)",
            |c| {
                Some(Event::Dimensions(TextureDimensions {
                    width: integer(c, "width")?,
                    height: integer(c, "height")?,
                    channels: integer(c, "channels")?,
                    mip_levels: integer(c, "mips")?,
                }))
            },
        ),
        pattern(r"Experiment (?P<index>\d+): (?P<bpp>{num}) bpp", |c| {
            Some(Event::ExperimentStart {
                index: integer(c, "index")?,
                bits_per_pixel: metric(c, "bpp")?,
            })
        }),
        pattern(
            r"File size: (?P<bytes>\d+) bytes, (?P<bpp>{num}) bits per pixel",
            |c| {
                Some(Event::FileSize {
                    bytes: integer(c, "bytes")?,
                    bits_per_pixel: metric(c, "bpp")?,
                })
            },
        ),
        pattern(
            r"Median decompression time over \d+ iterations: (?P<ms>{num}) ms",
            |c| {
                Some(Event::DecompressionTiming {
                    source: TimingSource::Graphics,
                    milliseconds: metric(c, "ms")?,
                })
            },
        ),
        pattern(
            r"Latent shape: --gridSizeScale (?P<gss>\d+) --highResFeatures (?P<hrf>\d+) --lowResFeatures (?P<lrf>\d+) --highResQuantBits (?P<hrqb>\d+) --lowResQuantBits (?P<lrqb>\d+)",
            |c| {
                Some(Event::LatentShapeDescriptor(LatentShape {
                    grid_size_scale: integer(c, "gss")?,
                    high_res_features: integer(c, "hrf")?,
                    high_res_quant_bits: integer(c, "hrqb")?,
                    low_res_features: integer(c, "lrf")?,
                    low_res_quant_bits: integer(c, "lrqb")?,
                }))
            },
        ),
        pattern(r"MIP\s+(?P<level>\d+)\s+PSNR: (?P<psnr>{num}) dB", |c| {
            Some(Event::PerLevelQuality {
                level: integer(c, "level")?,
                psnr: metric(c, "psnr")?,
            })
        }),
        pattern(r"Network version: (?P<version>[A-Z_]+)", |c| {
            Some(Event::NetworkVersion(c["version"].to_string()))
        }),
        pattern(
            r"Overall PSNR \((?P<kind>\w+) weights\): (?P<psnr>{num}) dB",
            |c| {
                let kind = if &c["kind"] == "FP8" {
                    QualityKind::Alternate
                } else {
                    QualityKind::Standard
                };
                Some(Event::OverallQuality {
                    kind,
                    psnr: metric(c, "psnr")?,
                })
            },
        ),
        pattern(
            r"Training: (?P<steps>\d+) steps, (?P<ms>{num}) ms/step, intermediate PSNR: (?P<psnr>{num}) dB",
            |c| {
                Some(Event::TrainingStep(TrainingSample {
                    steps: integer(c, "steps")?,
                    ms_per_step: metric(c, "ms")?,
                    psnr: metric(c, "psnr")?,
                }))
            },
        ),
        pattern(
            r"Using (?P<gpu>.+) with (?P<api>.+) API\. DP4a \[(?P<dp4a>[YN])\], FP16 \[(?P<fp16>[YN])\], CoopVec-Int8 \[(?P<cvi8>[YN])\], CoopVec-FP8 \[(?P<cvfp8>[YN])\]",
            |c| {
                let features = [
                    ("dp4a", GpuFeature::DP4a),
                    ("fp16", GpuFeature::FP16),
                    ("cvi8", GpuFeature::CoopVecInt8),
                    ("cvfp8", GpuFeature::CoopVecFP8),
                ]
                .into_iter()
                .filter(|(group, _)| &c[*group] == "Y")
                .map(|(_, feature)| feature)
                .collect();
                Some(Event::SystemDescriptor {
                    device_name: c["gpu"].to_string(),
                    graphics_api: c["api"].to_string(),
                    features,
                })
            },
        ),
    ]
});

/// Classify one line of tool output.
///
/// Returns `None` for lines that match no known record; the tool prints plenty
/// of unrelated diagnostics and those are expected. A line that matches a
/// record's shape but carries an unparseable number is also `None`.
pub fn classify(line: &str) -> Option<Event> {
    for p in PATTERNS.iter() {
        if let Some(captures) = p.regex.captures(line) {
            return (p.build)(&captures);
        }
    }
    None
}

/// Parse a float field, mapping `inf` to positive infinity.
pub fn parse_metric(text: &str) -> Option<f64> {
    if text == "inf" {
        return Some(f64::INFINITY);
    }
    text.parse().ok()
}

fn metric(c: &Captures<'_>, name: &str) -> Option<f64> {
    parse_metric(c.name(name)?.as_str())
}

fn integer<T: std::str::FromStr>(c: &Captures<'_>, name: &str) -> Option<T> {
    c.name(name)?.as_str().parse().ok()
}
