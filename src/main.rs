use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{arg, Command};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use ferrite_cwgan::io::data::provider_for;
use ferrite_cwgan::io::loss_log::CsvLossLog;
use ferrite_cwgan::io::preview::save_class_grid;
use ferrite_cwgan::{TaskKind, TrainConfig, Trainer};

fn cli() -> Command {
    Command::new("ferrite-cwgan")
        .about("Trains a conditional Wasserstein GAN with gradient penalty")
        .arg(
            arg!(<CONFIG> "Path to the training configuration json")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(<RUN_DIR> "Directory receiving params, checkpoints and losses")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(--samples [SAMPLES] "Generated digits per class in the image-task preview")
                .default_value("8")
                .value_parser(clap::value_parser!(usize)),
        )
}

fn main() {
    env_logger::init();
    let matches = cli().get_matches();

    let config = matches.get_one::<PathBuf>("CONFIG").unwrap();
    let run_dir = matches.get_one::<PathBuf>("RUN_DIR").unwrap();
    let samples = *matches.get_one::<usize>("samples").unwrap();

    if let Err(e) = run(config, run_dir, samples) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(config_path: &Path, run_dir: &Path, samples: usize) -> Result<()> {
    let config = TrainConfig::load_json(config_path)?;
    fs::create_dir_all(run_dir)
        .with_context(|| format!("cannot create run directory {}", run_dir.display()))?;
    config.save_json(&run_dir.join("params.json"))?;

    let dataset = provider_for(config.task)
        .load(&config.data_path)
        .with_context(|| format!("loading {}", config.data_path.display()))?;
    info!("Number of training examples: {}", dataset.len());

    let task = config.task.build();
    let mut trainer = Trainer::new(config.clone(), task.as_ref(), dataset, run_dir)?;
    let outcome = trainer.train();

    // losses are kept even when training stopped on an unstable step
    trainer.save_losses(&CsvLossLog::new(run_dir))?;
    let report = outcome?;
    for failure in &report.failed_checkpoints {
        warn!("missing checkpoint: {failure}");
    }
    info!("Finished {} iterations", report.iterations);

    if config.task == TaskKind::Image && samples > 0 {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let path = run_dir.join("samples.png");
        save_class_grid(trainer.model().generator(), samples, &path, &mut rng)?;
        info!("Wrote sample grid to {}", path.display());
    }
    Ok(())
}
