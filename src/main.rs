#![allow(non_snake_case)]
use RustedPotential::Utils::logger::save_field_to_csv;
use RustedPotential::Utils::plots::plot_heatmap;
use RustedPotential::potential::{
    ComputeSettings, Locale, ReconstructionStrategy, compute_with_settings,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "potential",
    about = "Potential energy U(x, y) of a planar conservative force field"
)]
struct Cli {
    /// Force component Fx(x, y)
    #[arg(long, allow_hyphen_values = true)]
    fx: String,

    /// Force component Fy(x, y)
    #[arg(long, allow_hyphen_values = true)]
    fy: String,

    /// Write a heat map of U to this PNG file
    #[arg(long)]
    png: Option<PathBuf>,

    /// Write the sampled grid to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Log level
    #[arg(long, value_parser = ["debug", "info", "warn", "error", "off"])]
    loglevel: Option<String>,

    /// Also write the log to log_<date>_<time>.txt
    #[arg(long)]
    log_file: bool,

    /// Language of error messages: en or ru
    #[arg(long, default_value = "en")]
    locale: Locale,

    /// Sum the two antiderivatives directly instead of correcting the y part
    #[arg(long)]
    additive: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = ComputeSettings {
        strategy: if cli.additive {
            ReconstructionStrategy::Additive
        } else {
            ReconstructionStrategy::ResidualCorrected
        },
        locale: cli.locale,
        loglevel: cli.loglevel.clone(),
        log_to_file: cli.log_file,
    };
    let error_label = match cli.locale {
        Locale::En => "Error",
        Locale::Ru => "Ошибка",
    };

    let solution = match compute_with_settings(&cli.fx, &cli.fy, &settings) {
        Ok(solution) => solution,
        Err(failure) => {
            eprintln!("{}: {}", error_label, failure.message);
            return ExitCode::FAILURE;
        }
    };
    println!("U(x, y) = {}", solution.potential.expr());
    println!(
        "min U = {}, max U = {}",
        solution.field.min(),
        solution.field.max()
    );

    if let Some(path) = &cli.csv {
        if let Err(e) = save_field_to_csv(&solution.field, path) {
            eprintln!("{}: {}: {}", error_label, path.display(), e);
            return ExitCode::FAILURE;
        }
        println!("grid saved to {}", path.display());
    }
    if let Some(path) = &cli.png {
        if let Err(e) = plot_heatmap(&solution.field, "U(x, y)", path) {
            eprintln!("{}: {}: {}", error_label, path.display(), e);
            return ExitCode::FAILURE;
        }
        println!("heat map saved to {}", path.display());
    }
    ExitCode::SUCCESS
}
