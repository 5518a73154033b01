//! Recording analysis command.

use crate::pipeline::analyze_recording;
use batscan_config::AnalysisSettings;
use batscan_io::{SampleSource, WavSampleSource, read_labels, sidecar_path};
use batscan_model::{Recording, classify, reference_templates, remove_outliers};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input WAV file or folder of recordings
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Analysis settings TOML file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Envelope threshold factor override
    #[arg(long)]
    threshold_factor: Option<f32>,

    /// Drop statistically outlying pulses before reporting
    #[arg(long)]
    remove_outliers: bool,

    /// Score each pass against the reference call templates
    #[arg(long)]
    classify: bool,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut settings = match &args.settings {
        Some(path) => AnalysisSettings::load(path)?,
        None => AnalysisSettings::default(),
    };
    if let Some(factor) = args.threshold_factor {
        settings.envelope.threshold_factor = factor;
        settings.validate()?;
    }

    let files = collect_recordings(&args.input)?;
    if files.is_empty() {
        anyhow::bail!("no WAV recordings found in {}", args.input.display());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );
    if files.len() == 1 {
        pb.finish_and_clear();
    }

    let mut analyzed = 0usize;
    for (number, path) in files.iter().enumerate() {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        match analyze_one(path, number, &settings) {
            Ok(mut recording) => {
                report(&mut recording, args.remove_outliers, args.classify);
                analyzed += 1;
            }
            // A bad file aborts only itself; the batch carries on.
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "skipping recording"),
        }
        pb.inc(1);
    }
    if files.len() > 1 {
        pb.finish_with_message("done");
        println!("\nAnalyzed {analyzed} of {} recordings", files.len());
    }

    Ok(())
}

fn analyze_one(
    path: &Path,
    number: usize,
    settings: &AnalysisSettings,
) -> anyhow::Result<Recording> {
    let source = WavSampleSource::open(path)?;
    let mut recording = Recording::new(
        number,
        path.to_path_buf(),
        source.sample_rate(),
        source.num_frames(),
    );

    let sidecar = sidecar_path(path);
    if sidecar.exists() {
        recording.apply_labels(&read_labels(&sidecar)?);
    }
    recording.create_passes();

    analyze_recording(&source, &mut recording, settings)?;
    Ok(recording)
}

fn report(recording: &mut Recording, drop_outliers: bool, classify_passes: bool) {
    println!(
        "\n{} ({:.1} s, {} Hz)",
        recording.path.display(),
        recording.duration_s(),
        recording.sample_rate
    );

    let templates = reference_templates();
    for segment in &mut recording.segments {
        if !segment.label.is_empty() {
            println!("  segment {} \"{}\"", segment.number, segment.label);
        }
        for pass in &mut segment.passes {
            if drop_outliers {
                let removed = remove_outliers(pass);
                if !removed.is_empty() {
                    println!("  removed {} outlying pulse(s)", removed.len());
                }
            }
            println!("  {}", pass.summary());
            if pass.pulse_count() > 0 {
                let interval = pass.mean_interval_estimate();
                println!("    refined interval {interval:.0} ms");
                if classify_passes {
                    println!("    match: {}", classify(pass.stats(), &templates));
                }
            }
        }
    }
}

/// A folder yields its WAV files in name order; a file yields itself.
fn collect_recordings(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(input)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    files.sort();
    Ok(files)
}
