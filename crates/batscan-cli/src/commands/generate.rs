//! Synthetic test recording generation.

use batscan_io::write_wav;
use clap::Args;
use std::f32::consts::PI;
use std::path::PathBuf;

#[derive(Args)]
pub struct GenerateArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Recording duration in seconds
    #[arg(long, default_value = "1.0")]
    duration: f32,

    /// Sample rate in Hz
    #[arg(long, default_value = "384000")]
    sample_rate: u32,

    /// Sweep start frequency in kHz (high edge of the call)
    #[arg(long, default_value = "45.0")]
    start_khz: f32,

    /// Sweep end frequency in kHz (low edge of the call)
    #[arg(long, default_value = "25.0")]
    end_khz: f32,

    /// Pulse duration in milliseconds
    #[arg(long, default_value = "3.0")]
    pulse_ms: f32,

    /// Interval between pulses in milliseconds
    #[arg(long, default_value = "100.0")]
    interval_ms: f32,

    /// Pulse amplitude (0-1)
    #[arg(long, default_value = "0.5")]
    amplitude: f32,

    /// Background white noise amplitude (0-1)
    #[arg(long, default_value = "0.005")]
    noise: f32,

    /// Noise generator seed
    #[arg(long, default_value = "1")]
    seed: u32,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    if args.duration <= 0.0 || args.sample_rate == 0 {
        anyhow::bail!("duration and sample rate must be positive");
    }
    let sr = args.sample_rate as f32;
    let n = (args.duration * sr) as usize;

    let mut state = args.seed | 1;
    let mut samples: Vec<f32> = (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            args.noise * (state as i32 as f32) / (i32::MAX as f32)
        })
        .collect();

    let pulse_len = (args.pulse_ms / 1000.0 * sr) as usize;
    let hop = ((args.interval_ms / 1000.0 * sr) as usize).max(pulse_len + 1);
    let f0 = args.start_khz * 1000.0;
    let sweep = (args.end_khz - args.start_khz) * 1000.0 / (args.pulse_ms / 1000.0);

    let mut pulses = 0usize;
    let mut at = hop / 2;
    while at + pulse_len < n {
        for i in 0..pulse_len {
            let t = i as f32 / sr;
            samples[at + i] += args.amplitude * (2.0 * PI * (f0 * t + 0.5 * sweep * t * t)).sin();
        }
        pulses += 1;
        at += hop;
    }

    write_wav(&args.output, &samples, args.sample_rate)?;
    println!(
        "Wrote {} ({} pulses, {:.0}->{:.0} kHz, {:.1} s at {} Hz)",
        args.output.display(),
        pulses,
        args.start_khz,
        args.end_khz,
        args.duration,
        args.sample_rate
    );
    Ok(())
}
