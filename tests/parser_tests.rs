use std::time::Duration;

use ntc_runner::parser::{
    classify, parse_metric, parse_output, Event, QualityKind, ResultAccumulator, TimingSource,
};
use ntc_runner::result::{GpuFeature, LatentShape, RunResult, TextureDimensions, TrainingSample};

fn step(steps: u32, ms: f64, psnr: f64) -> Event {
    Event::TrainingStep(TrainingSample {
        steps,
        ms_per_step: ms,
        psnr,
    })
}

// =============================================================================
// Line classification
// =============================================================================

#[test]
fn test_classify_selected_rate() {
    let event = classify("Selected compression rate: 4.00 bpp, 31.50 dB PSNR");
    assert_eq!(
        event,
        Some(Event::SelectedRate {
            bits_per_pixel: 4.0,
            psnr: 31.5
        })
    );
}

#[test]
fn test_classify_infinite_psnr() {
    let event = classify("Selected compression rate: 8.00 bpp, inf dB PSNR").unwrap();
    match event {
        Event::SelectedRate { psnr, .. } => {
            assert!(psnr.is_infinite());
            assert!(psnr > 0.0);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_classify_base_rate() {
    assert_eq!(
        classify("Base compression rate: --bitsPerPixel 2.5"),
        Some(Event::BaseRate {
            bits_per_pixel: 2.5
        })
    );
}

#[test]
fn test_classify_combined_bc_quality() {
    assert_eq!(
        classify("Combined BCn PSNR: 38.25 dB, bit rate: 5.33 bpp"),
        Some(Event::CombinedQuality {
            psnr: 38.25,
            bits_per_pixel: 5.33
        })
    );
}

#[test]
fn test_classify_decompression_timings() {
    assert_eq!(
        classify("CUDA decompression time: 1.75 ms"),
        Some(Event::DecompressionTiming {
            source: TimingSource::Cuda,
            milliseconds: 1.75
        })
    );
    assert_eq!(
        classify("Median decompression time over 100 iterations: 0.42 ms"),
        Some(Event::DecompressionTiming {
            source: TimingSource::Graphics,
            milliseconds: 0.42
        })
    );
}

#[test]
fn test_classify_dimensions() {
    assert_eq!(
        classify("Dimensions: 2048x1024, 9 channels, 12 mip level(s)"),
        Some(Event::Dimensions(TextureDimensions {
            width: 2048,
            height: 1024,
            channels: 9,
            mip_levels: 12
        }))
    );
}

#[test]
fn test_classify_experiment_start() {
    assert_eq!(
        classify("Experiment 3: 1.25 bpp"),
        Some(Event::ExperimentStart {
            index: 3,
            bits_per_pixel: 1.25
        })
    );
}

#[test]
fn test_classify_file_size() {
    assert_eq!(
        classify("File size: 1048576 bytes, 4.00 bits per pixel"),
        Some(Event::FileSize {
            bytes: 1_048_576,
            bits_per_pixel: 4.0
        })
    );
}

#[test]
fn test_classify_latent_shape() {
    let line = "Latent shape: --gridSizeScale 4 --highResFeatures 16 --lowResFeatures 12 \
                --highResQuantBits 2 --lowResQuantBits 4";
    assert_eq!(
        classify(line),
        Some(Event::LatentShapeDescriptor(LatentShape {
            grid_size_scale: 4,
            high_res_features: 16,
            high_res_quant_bits: 2,
            low_res_features: 12,
            low_res_quant_bits: 4,
        }))
    );
}

#[test]
fn test_classify_mip_psnr_with_padding() {
    assert_eq!(
        classify("MIP  10 PSNR: 44.10 dB"),
        Some(Event::PerLevelQuality {
            level: 10,
            psnr: 44.1
        })
    );
}

#[test]
fn test_classify_network_version() {
    assert_eq!(
        classify("Network version: NTC_NETWORK_MEDIUM"),
        Some(Event::NetworkVersion("NTC_NETWORK_MEDIUM".to_string()))
    );
}

#[test]
fn test_classify_overall_psnr_kinds() {
    assert_eq!(
        classify("Overall PSNR (FP16 weights): 32.00 dB"),
        Some(Event::OverallQuality {
            kind: QualityKind::Standard,
            psnr: 32.0
        })
    );
    assert_eq!(
        classify("Overall PSNR (FP8 weights): 31.20 dB"),
        Some(Event::OverallQuality {
            kind: QualityKind::Alternate,
            psnr: 31.2
        })
    );
}

#[test]
fn test_classify_training_step() {
    assert_eq!(
        classify("Training: 5000 steps, 0.35 ms/step, intermediate PSNR: inf dB"),
        Some(step(5000, 0.35, f64::INFINITY))
    );
}

#[test]
fn test_classify_system_descriptor() {
    let event = classify(
        "Using NVIDIA GeForce RTX 4090 with DX12 API. DP4a [Y], FP16 [N], CoopVec-Int8 [Y], CoopVec-FP8 [N]",
    )
    .unwrap();

    match event {
        Event::SystemDescriptor {
            device_name,
            graphics_api,
            features,
        } => {
            assert_eq!(device_name, "NVIDIA GeForce RTX 4090");
            assert_eq!(graphics_api, "DX12");
            assert_eq!(
                features.into_iter().collect::<Vec<_>>(),
                vec![GpuFeature::DP4a, GpuFeature::CoopVecInt8]
            );
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn test_classify_ignores_unrecognized_lines() {
    assert_eq!(classify(""), None);
    assert_eq!(classify("Loading 12 images from textures/brick"), None);
    assert_eq!(classify("  Selected compression rate: 4.00 bpp, 31.50 dB PSNR"), None);
    assert_eq!(classify("Training: many steps"), None);
}

#[test]
fn test_classify_rejects_malformed_numbers() {
    assert_eq!(classify("Selected compression rate: 4.0.0 bpp, 31.50 dB PSNR"), None);
}

#[test]
fn test_parse_metric() {
    assert_eq!(parse_metric("12.5"), Some(12.5));
    assert_eq!(parse_metric("inf"), Some(f64::INFINITY));
    assert_eq!(parse_metric("nan?"), None);
}

// =============================================================================
// Accumulation
// =============================================================================

#[test]
fn test_experiment_runs_are_sealed_in_order() {
    let mut acc = ResultAccumulator::new();
    acc.push(Event::ExperimentStart {
        index: 1,
        bits_per_pixel: 2.0,
    });
    acc.push(step(1000, 0.5, 25.0));
    acc.push(step(2000, 0.5, 27.0));
    acc.push(Event::ExperimentStart {
        index: 2,
        bits_per_pixel: 4.0,
    });
    assert_eq!(acc.sealed_runs(), 1);
    acc.push(step(1000, 0.6, 30.0));

    let result = acc.finish();

    assert_eq!(result.experiments.len(), 2);
    assert_eq!(result.experiments[0].index, Some(1));
    assert_eq!(result.experiments[0].bits_per_pixel, Some(2.0));
    assert_eq!(result.experiments[0].learning_curve.len(), 2);
    assert_eq!(result.experiments[0].final_psnr(), Some(27.0));
    assert_eq!(result.experiments[1].bits_per_pixel, Some(4.0));
    assert_eq!(result.experiments[1].learning_curve.len(), 1);
}

#[test]
fn test_empty_experiment_is_dropped() {
    let mut acc = ResultAccumulator::new();
    acc.push(Event::ExperimentStart {
        index: 1,
        bits_per_pixel: 1.0,
    });
    acc.push(Event::ExperimentStart {
        index: 2,
        bits_per_pixel: 2.0,
    });
    acc.push(step(100, 1.0, 20.0));
    acc.push(Event::ExperimentStart {
        index: 3,
        bits_per_pixel: 3.0,
    });

    let result = acc.finish();

    assert_eq!(result.experiments.len(), 1);
    assert_eq!(result.experiments[0].index, Some(2));
}

#[test]
fn test_scalar_only_output_has_no_runs() {
    let result = parse_output(
        "Selected compression rate: 4.00 bpp, 31.50 dB PSNR\n\
         Overall PSNR (FP8 weights): 31.10 dB\n",
    );

    assert_eq!(result.bits_per_pixel, Some(4.0));
    assert_eq!(result.overall_psnr, Some(31.5));
    assert_eq!(result.overall_psnr_fp8, Some(31.1));
    assert!(result.experiments.is_empty());
}

#[test]
fn test_expected_rate_is_fallback_only() {
    let result = ResultAccumulator::new().with_expected_rate(Some(3.0)).finish();
    assert_eq!(result.bits_per_pixel, Some(3.0));

    let mut acc = ResultAccumulator::new().with_expected_rate(Some(3.0));
    acc.push_line("Base compression rate: --bitsPerPixel 2.75");
    assert_eq!(acc.finish().bits_per_pixel, Some(2.75));
}

#[test]
fn test_elapsed_is_carried_through() {
    let result = ResultAccumulator::new()
        .with_elapsed(Duration::from_millis(1250))
        .finish();
    assert_eq!(result.elapsed, Duration::from_millis(1250));
    assert!(result.finished_at.is_some());
}

#[test]
fn test_mip_psnr_keeps_encounter_order() {
    let result = parse_output(
        "MIP 0 PSNR: 40.00 dB\n\
         MIP 1 PSNR: 38.50 dB\n\
         MIP 2 PSNR: inf dB\n",
    );
    assert_eq!(result.per_mip_psnr, vec![40.0, 38.5, f64::INFINITY]);
}

#[test]
fn test_full_describe_and_compress_log() {
    let log = "\
Using Test GPU with Vulkan API. DP4a [Y], FP16 [Y], CoopVec-Int8 [Y], CoopVec-FP8 [Y]
Dimensions: 512x512, 4 channels, 10 mip level(s)
Network version: NTC_NETWORK_LARGE
Latent shape: --gridSizeScale 2 --highResFeatures 8 --lowResFeatures 8 --highResQuantBits 4 --lowResQuantBits 2
Training: 1000 steps, 0.20 ms/step, intermediate PSNR: 30.00 dB
Training: 2000 steps, 0.19 ms/step, intermediate PSNR: 33.00 dB
Selected compression rate: 3.00 bpp, 33.50 dB PSNR
Combined BCn PSNR: 32.00 dB, bit rate: 8.00 bpp
File size: 98304 bytes, 3.00 bits per pixel
CUDA decompression time: 0.80 ms
Median decompression time over 50 iterations: 0.60 ms
";
    let result = parse_output(log);

    let device = result.device.unwrap();
    assert_eq!(device.features.len(), 4);
    assert_eq!(result.dimensions.unwrap().mip_levels, 10);
    assert_eq!(result.network_version.as_deref(), Some("NTC_NETWORK_LARGE"));
    assert_eq!(result.latent_shape.unwrap().grid_size_scale, 2);
    assert_eq!(result.experiments.len(), 1);
    assert_eq!(result.experiments[0].index, None);
    assert_eq!(result.experiments[0].learning_curve.len(), 2);
    assert_eq!(result.bits_per_pixel, Some(3.0));
    assert_eq!(result.overall_psnr, Some(33.5));
    assert_eq!(result.combined_bc_psnr, Some(32.0));
    assert_eq!(result.combined_bc_bits_per_pixel, Some(8.0));
    assert_eq!(result.saved_file_size, Some(98304));
    assert_eq!(result.saved_file_bits_per_pixel, Some(3.0));
    // Last reported timing wins.
    assert_eq!(result.decompression_time, Some(0.6));
}

// =============================================================================
// JSON output
// =============================================================================

#[test]
fn test_infinite_metrics_survive_json() {
    let result = parse_output(
        "Selected compression rate: 4.00 bpp, inf dB PSNR\n\
         MIP 0 PSNR: inf dB\n\
         MIP 1 PSNR: 41.00 dB\n\
         Training: 1000 steps, 0.30 ms/step, intermediate PSNR: inf dB\n",
    );
    assert_eq!(result.overall_psnr, Some(f64::INFINITY));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["overall_psnr"], "inf");
    assert_eq!(json["bits_per_pixel"], 4.0);
    assert_eq!(json["per_mip_psnr"][0], "inf");
    assert_eq!(json["per_mip_psnr"][1], 41.0);
    assert!(json["overall_psnr_fp8"].is_null());

    let restored: RunResult = serde_json::from_value(json).unwrap();
    assert_eq!(restored.overall_psnr, Some(f64::INFINITY));
    assert_eq!(restored.overall_psnr_fp8, None);
    assert_eq!(restored.per_mip_psnr, vec![f64::INFINITY, 41.0]);
    assert_eq!(
        restored.experiments[0].learning_curve[0].psnr,
        f64::INFINITY
    );
}

#[test]
fn test_metric_json_rejects_unknown_text() {
    let err = serde_json::from_str::<TrainingSample>(
        r#"{"steps": 1, "ms_per_step": 0.5, "psnr": "high"}"#,
    );
    assert!(err.is_err());
}
