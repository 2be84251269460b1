//! Tour command implementation.

use crate::cli::output::narration_summary;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::synthesis::{MediaSynthesisClient, ProgressEvent};
use crate::tour::{InterestTag, StageUpdate, TourPipeline, TourRequest};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Options for one `tour` invocation.
#[derive(Debug, Clone)]
pub struct TourOptions {
    pub location: String,
    pub interests: Vec<InterestTag>,
    pub duration: u32,
    pub no_audio: bool,
    pub save_text: bool,
    pub output: Option<String>,
}

/// Run the tour command.
pub async fn run_tour(options: TourOptions, settings: Settings) -> Result<()> {
    let request = TourRequest::new(&options.location, options.interests, options.duration)?;

    let output_dir = options
        .output
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(|| settings.output_dir());

    let operation = if options.no_audio {
        Operation::Narrate
    } else {
        Operation::NarrateWithAudio
    };
    if let Err(e) = preflight::check(operation, &settings, &output_dir) {
        Output::error(&format!("{}", e));
        Output::info("Run 'wayfare config path' to find the configuration file.");
        return Err(e.into());
    }

    Output::info(&format!(
        "Creating a {}-minute tour of {} ({})",
        request.duration_minutes(),
        request.location(),
        request.interests_label()
    ));

    let pipeline = TourPipeline::from_settings(&settings)?;
    let spinner = Output::spinner("Starting tour research...");
    let status = |update: StageUpdate| {
        if update.is_done {
            spinner.suspend(|| Output::stage_done(&update.stage, &update.message));
        } else {
            spinner.set_message(update.message);
        }
    };

    let outcome = match pipeline.run_detailed(&request, &status).await {
        Ok(outcome) => {
            spinner.finish_and_clear();
            outcome
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let failed = outcome.sections.failed();
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|t| t.name()).collect();
        Output::warning(&format!(
            "Some topics could not be researched and use placeholder text: {}",
            names.join(", ")
        ));
    }
    let narration = outcome.narration;

    Output::header(&format!("Your tour of {}", request.location()));
    println!("{}\n", narration);
    Output::kv("Length", &narration_summary(&narration));

    if options.save_text {
        let path = write_text(&output_dir, &request, &narration)?;
        Output::success(&format!("Saved narration to {}", path.display()));
    }

    if options.no_audio {
        return Ok(());
    }

    synthesize_audio(&settings, &output_dir, &request, &narration).await
}

/// Narrate the text to MP3. Failure is reported, not returned: the text is
/// already delivered.
async fn synthesize_audio(
    settings: &Settings,
    output_dir: &Path,
    request: &TourRequest,
    narration: &str,
) -> Result<()> {
    let client = MediaSynthesisClient::new(settings)?;
    let bar = Output::progress_bar(100, "Preparing audio...");
    let progress = |event: ProgressEvent| {
        bar.set_position((event.fraction * 100.0).round() as u64);
        bar.set_message(event.message);
    };

    match client.synthesize(narration, &progress).await {
        Ok(audio) => {
            bar.finish_and_clear();
            std::fs::create_dir_all(output_dir)?;
            let path = output_dir.join(request.audio_file_name());
            std::fs::write(&path, &audio)?;
            Output::success(&format!(
                "Saved audio to {} ({:.1} MB)",
                path.display(),
                audio.len() as f64 / (1024.0 * 1024.0)
            ));
        }
        Err(e) => {
            bar.abandon();
            Output::synthesis_failure(e.kind, &e.message);
            Output::info(
                "Your text tour is ready above. You can try generating audio again later.",
            );
        }
    }

    Ok(())
}

fn write_text(output_dir: &Path, request: &TourRequest, narration: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}_tour.md", request.slug()));
    let content = format!(
        "# Audio tour of {}\n\n_{} minutes · {}_\n\n{}\n",
        request.location(),
        request.duration_minutes(),
        request.interests_label(),
        narration
    );
    std::fs::write(&path, content)?;
    Ok(path)
}
