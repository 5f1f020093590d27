use clap::Parser;
use indicatif::ProgressBar;
use log::{error, info, warn};
use std::process::ExitCode;

use yolo_dataset_tool::config::{Cli, Command};
use yolo_dataset_tool::io::write_report;
use yolo_dataset_tool::utils::create_progress_bar;
use yolo_dataset_tool::yolo_dataset::describe_dataset;
use yolo_dataset_tool::{
    organize_dataset, organize_many, process_dataset, prune_unlabeled, rename_sequential,
    sample_images, PairMatcher, Result, RunOutcome,
};

// Exit status when a run finished but skipped or failed some files
const EXIT_WITH_WARNINGS: u8 = 3;

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(RunOutcome::Clean) => ExitCode::SUCCESS,
        Ok(RunOutcome::CompletedWithWarnings) => {
            warn!("Completed with warnings, see the summary above.");
            ExitCode::from(EXIT_WITH_WARNINGS)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<RunOutcome> {
    match command {
        Command::Split(args) => {
            let report_path = args.report.clone();
            let job = args.into_job()?;

            info!("Starting the dataset split...");
            let pb = create_progress_bar(0, "Split");
            let summary = process_dataset(&job, &progress_callback(&pb))?;
            pb.finish_with_message("Split complete");

            summary.print_summary();
            if let Some(path) = report_path {
                write_report(&path, &summary)?;
                info!("Wrote run report to {}", path.display());
            }
            Ok(summary.outcome)
        }
        Command::Organize(args) => {
            let options = args.transfer.to_options();
            let matcher = PairMatcher::new();
            let pb = create_progress_bar(0, "Organize");
            let report = match args.sources.as_slice() {
                [source] => organize_dataset(
                    source,
                    &args.output,
                    &matcher,
                    &options,
                    &progress_callback(&pb),
                )?,
                sources => organize_many(
                    sources,
                    &args.output,
                    &matcher,
                    &options,
                    &progress_callback(&pb),
                )?,
            };
            pb.finish_with_message("Organize complete");

            report.print_summary();
            Ok(RunOutcome::from_warnings(report.stats.has_warnings()))
        }
        Command::Yaml(args) => {
            describe_dataset(&args.dataset, &args.classes)?;
            Ok(RunOutcome::Clean)
        }
        Command::Sample(args) => {
            sample_images(&args.source, &args.output, &args.to_options())?;
            Ok(RunOutcome::Clean)
        }
        Command::Prune(args) => {
            let mut matcher = PairMatcher::new().label_extension(&args.label_ext);
            if let Some(labels) = &args.labels {
                matcher = matcher.label_dir(labels);
            }
            let report = prune_unlabeled(&args.dir, &matcher, args.dry_run)?;
            Ok(RunOutcome::from_warnings(!report.failed.is_empty()))
        }
        Command::Rename(args) => {
            rename_sequential(&args.dir, &args.to_options())?;
            Ok(RunOutcome::Clean)
        }
    }
}

/// Adapt a progress bar to the `(completed, total)` callback of the library
fn progress_callback(pb: &ProgressBar) -> impl Fn(usize, usize) + Sync + '_ {
    move |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    }
}
