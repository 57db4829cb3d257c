use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::error::{Result, WganError};
use crate::gan::penalty::Interpolation;
use crate::gan::task::TaskKind;
use crate::optim::optimizer::OptimizerKind;

/// Hyperparameters of one training run, as read from the run's JSON config.
///
/// The fields without a default are required. The resolved configuration
/// is written back into the run directory as `params.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Bound used by weight clipping, when enabled.
    pub clip_value: f64,
    pub noise_dims: usize,
    /// `"Adam"` or `"RMSprop"`; used for both networks.
    pub optimizer: OptimizerKind,
    pub gen_lr: f64,
    pub critic_lr: f64,
    pub gp_weight: f64,
    /// Critic steps taken before every generator step.
    pub num_critic_iters: usize,
    pub batch_size: usize,
    pub epochs: usize,
    /// Checkpoint whenever `iteration % weight_saving_interval == 0`.
    pub weight_saving_interval: usize,
    pub data_path: PathBuf,
    #[serde(default)]
    pub task: TaskKind,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub weight_clipping: bool,
    #[serde(default)]
    pub save_critic: bool,
    /// Seed for every random draw of the run; OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainConfig {
    /// Rejects values that would make training meaningless or panic later.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(WganError::Configuration(msg.to_string()));
        if self.batch_size == 0 {
            return fail("batch_size must be at least 1");
        }
        if self.noise_dims == 0 {
            return fail("noise_dims must be at least 1");
        }
        if self.weight_saving_interval == 0 {
            return fail("weight_saving_interval must be at least 1");
        }
        if self.num_critic_iters == 0 {
            return fail("num_critic_iters must be at least 1");
        }
        for (name, rate) in [("gen_lr", self.gen_lr), ("critic_lr", self.critic_lr)] {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(WganError::Configuration(format!("{name} must be a positive number, got {rate}")));
            }
        }
        if !(self.gp_weight.is_finite() && self.gp_weight >= 0.0) {
            return fail("gp_weight must be a non-negative number");
        }
        if self.weight_clipping && !(self.clip_value.is_finite() && self.clip_value > 0.0) {
            return fail("clip_value must be positive when weight_clipping is enabled");
        }
        Ok(())
    }

    /// Reads and validates a configuration file.
    pub fn load_json(path: &Path) -> Result<TrainConfig> {
        let file = std::fs::File::open(path).map_err(|e| {
            WganError::Configuration(format!("cannot open {}: {e}", path.display()))
        })?;
        let reader = std::io::BufReader::new(file);
        let config: TrainConfig = serde_json::from_reader(reader)
            .map_err(|e| WganError::Configuration(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let persistence = |detail: String| WganError::Persistence { path: path.to_path_buf(), detail };
        let file = std::fs::File::create(path).map_err(|e| persistence(e.to_string()))?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| persistence(e.to_string()))?;
        writer.flush().map_err(|e| persistence(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "clip_value": 0.01,
        "noise_dims": 10,
        "optimizer": "RMSprop",
        "gen_lr": 0.0001,
        "critic_lr": 0.0001,
        "gp_weight": 10.0,
        "num_critic_iters": 5,
        "batch_size": 32,
        "epochs": 3,
        "weight_saving_interval": 100,
        "data_path": "data/jets.txt"
    }"#;

    #[test]
    fn optional_fields_take_defaults() {
        let config: TrainConfig = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(config.optimizer, OptimizerKind::RmsProp);
        assert_eq!(config.task, TaskKind::Vector);
        assert_eq!(config.interpolation, Interpolation::StandardNormal);
        assert!(!config.weight_clipping);
        assert!(!config.save_critic);
        assert_eq!(config.seed, None);
        config.validate().unwrap();
    }

    #[test]
    fn unknown_names_are_rejected() {
        let bad_optimizer = MINIMAL.replace("RMSprop", "SGD");
        assert!(serde_json::from_str::<TrainConfig>(&bad_optimizer).is_err());
        let bad_task = MINIMAL.replace("\"epochs\"", "\"task\": \"audio\", \"epochs\"");
        assert!(serde_json::from_str::<TrainConfig>(&bad_task).is_err());
    }

    #[test]
    fn zero_sizes_fail_validation() {
        let base: TrainConfig = serde_json::from_str(MINIMAL).unwrap();
        for mutate in [
            (|c: &mut TrainConfig| c.batch_size = 0) as fn(&mut TrainConfig),
            |c: &mut TrainConfig| c.noise_dims = 0,
            |c: &mut TrainConfig| c.weight_saving_interval = 0,
        ] {
            let mut config = base.clone();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(WganError::Configuration(_))));
        }
    }

    #[test]
    fn params_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let mut config: TrainConfig = serde_json::from_str(MINIMAL).unwrap();
        config.seed = Some(7);
        config.save_json(&path).unwrap();
        assert_eq!(TrainConfig::load_json(&path).unwrap(), config);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn params_file_reports_a_failed_flush() {
        let config: TrainConfig = serde_json::from_str(MINIMAL).unwrap();
        assert!(matches!(
            config.save_json(Path::new("/dev/full")),
            Err(WganError::Persistence { .. })
        ));
    }
}
