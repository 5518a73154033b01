//! Recording inspection command.

use batscan_io::{read_metadata_chunks, read_labels, read_wav_info, sidecar_path};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// Recording to inspect
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Print full metadata chunk contents instead of a preview
    #[arg(long)]
    full: bool,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let info = read_wav_info(&args.input)?;
    println!("{}", args.input.display());
    println!(
        "  {} ch, {} Hz, {} bit, {} frames, {:.2} s",
        info.channels, info.sample_rate, info.bits_per_sample, info.num_frames, info.duration_secs
    );

    match read_metadata_chunks(&args.input) {
        Ok(chunks) if chunks.is_empty() => println!("  no embedded metadata"),
        Ok(chunks) => {
            for chunk in chunks {
                let text = chunk.text();
                if args.full {
                    println!("  [{}] {}", chunk.id, text);
                } else {
                    let preview: String = text.chars().take(72).collect();
                    let ellipsis = if text.chars().count() > 72 { "..." } else { "" };
                    println!("  [{}] {preview}{ellipsis}", chunk.id);
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not read metadata chunks"),
    }

    let sidecar = sidecar_path(&args.input);
    if sidecar.exists() {
        let labels = read_labels(&sidecar)?;
        println!("  {} labelled segment(s):", labels.len());
        for (start, end, comment) in labels {
            println!("    {start:.2}-{end:.2} s  {comment}");
        }
    }

    Ok(())
}
