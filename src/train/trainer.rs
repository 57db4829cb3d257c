use std::path::Path;
use std::sync::mpsc;
use std::time::Instant;

use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Result, WganError};
use crate::gan::clipping::WeightClipping;
use crate::gan::model::ConditionalWgan;
use crate::gan::penalty::GradientPenalty;
use crate::gan::task::Task;
use crate::io::checkpoint::{CheckpointSink, JsonCheckpointSink, NetworkRole};
use crate::io::data::Dataset;
use crate::io::loss_log::LossLogSink;
use crate::math::matrix::Matrix;
use crate::optim::optimizer::Optimizer;
use crate::train::history::LossHistory;
use crate::train::sampler::{BatchSampler, UniformSampler};
use crate::train::stats::IterationStats;
use crate::train::train_config::TrainConfig;

/// Where the trainer is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Idle,
    Running { epoch: usize, batch: usize, critic_substep: usize },
    Checkpointing { iteration: usize },
    Done,
}

/// Summary returned by `Trainer::train`.
#[derive(Debug)]
pub struct TrainingReport {
    pub iterations: usize,
    /// Checkpoint writes that failed; training carried on past each of them.
    pub failed_checkpoints: Vec<WganError>,
}

/// Alternates critic and generator updates over a dataset.
///
/// Each iteration takes `num_critic_iters` critic steps on fresh batches,
/// one generator step on another fresh batch, then estimates the
/// Wasserstein distance on that same batch with fresh noise.
pub struct Trainer {
    config: TrainConfig,
    model: ConditionalWgan,
    dataset: Dataset,
    sampler: Box<dyn BatchSampler>,
    checkpoints: Box<dyn CheckpointSink>,
    rng: StdRng,
    history: LossHistory,
    state: TrainerState,
    progress_tx: Option<mpsc::Sender<IterationStats>>,
    failed_checkpoints: Vec<WganError>,
}

impl Trainer {
    /// Builds the task's networks and checks the dataset against them.
    /// Checkpoints go under `run_dir` unless another sink is attached.
    pub fn new(config: TrainConfig, task: &dyn Task, dataset: Dataset, run_dir: &Path) -> Result<Trainer> {
        config.validate()?;
        if dataset.condition_dims() != task.condition_dims() || dataset.target_dims() != task.target_dims() {
            return Err(WganError::Data(format!(
                "{} task expects {} → {} values per example, dataset has {} → {}",
                task.name(),
                task.condition_dims(),
                task.target_dims(),
                dataset.condition_dims(),
                dataset.target_dims()
            )));
        }
        if config.batch_size > dataset.len() {
            return Err(WganError::InsufficientData {
                batch_size: config.batch_size,
                available: dataset.len(),
            });
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let model = ConditionalWgan::new(
            task.build_generator(config.noise_dims, &mut rng),
            task.build_critic(&mut rng),
            Optimizer::new(config.optimizer, config.gen_lr),
            Optimizer::new(config.optimizer, config.critic_lr),
            GradientPenalty::new(config.gp_weight, config.interpolation),
            config.weight_clipping.then(|| WeightClipping::new(config.clip_value)),
        );
        info!(
            "{} task: generator {} parameters, critic {} parameters, {} training examples",
            task.name(),
            model.generator().network.parameter_count(),
            model.critic().network.parameter_count(),
            dataset.len()
        );

        Ok(Trainer {
            config,
            model,
            dataset,
            sampler: Box::new(UniformSampler),
            checkpoints: Box::new(JsonCheckpointSink::new(run_dir)),
            rng,
            history: LossHistory::new(),
            state: TrainerState::Idle,
            progress_tx: None,
            failed_checkpoints: Vec::new(),
        })
    }

    pub fn with_sampler(mut self, sampler: Box<dyn BatchSampler>) -> Trainer {
        self.sampler = sampler;
        self
    }

    pub fn with_checkpoint_sink(mut self, sink: Box<dyn CheckpointSink>) -> Trainer {
        self.checkpoints = sink;
        self
    }

    /// Sends one `IterationStats` per completed iteration. A dropped
    /// receiver does not stop training.
    pub fn with_progress(mut self, tx: mpsc::Sender<IterationStats>) -> Trainer {
        self.progress_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn model(&self) -> &ConditionalWgan {
        &self.model
    }

    pub fn history(&self) -> &LossHistory {
        &self.history
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn batches_per_epoch(&self) -> usize {
        self.dataset.len() / self.config.batch_size
    }

    fn next_batch(&mut self) -> Result<(Matrix, Matrix)> {
        let indices = self.sampler.sample(self.dataset.len(), self.config.batch_size, &mut self.rng)?;
        Ok(self.dataset.batch(&indices))
    }

    /// Runs iteration `iteration` in full: critic steps, generator step,
    /// Wasserstein estimate and, when due, a checkpoint.
    ///
    /// A non-finite loss is still recorded before the error is returned.
    pub fn run_iteration(&mut self, iteration: usize) -> Result<IterationStats> {
        let started = Instant::now();
        let per_epoch = self.batches_per_epoch().max(1);
        let (epoch, batch) = (iteration / per_epoch, iteration % per_epoch);

        let mut critic_total = 0.0;
        for critic_substep in 0..self.config.num_critic_iters {
            self.state = TrainerState::Running { epoch, batch, critic_substep };
            let (x, y) = self.next_batch()?;
            let update = self.model.critic_update(&x, &y, &mut self.rng);
            self.history.critic_losses.push(update.loss);
            critic_total += update.loss;
            self.model.apply_critic_update(&update)?;
        }

        let (x, y) = self.next_batch()?;
        let update = self.model.generator_update(&x, &mut self.rng);
        self.history.generator_losses.push(update.loss);
        self.model.apply_generator_update(&update)?;

        let estimate = self.model.wasserstein_estimate(&x, &y, &mut self.rng);
        self.history.wass_estimates.push(estimate);

        if iteration % self.config.weight_saving_interval == 0 {
            self.state = TrainerState::Checkpointing { iteration };
            self.save_checkpoints(iteration);
        }
        self.state = TrainerState::Running {
            epoch,
            batch,
            critic_substep: self.config.num_critic_iters.saturating_sub(1),
        };
        info!("Iteration: {iteration}  Wasserstein Estimate: {estimate}");

        let stats = IterationStats {
            iteration,
            epoch,
            critic_loss: critic_total / self.config.num_critic_iters as f64,
            generator_loss: update.loss,
            wasserstein_estimate: estimate,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        if let Some(tx) = &self.progress_tx {
            // receiver gone: keep training, stop reporting
            if tx.send(stats.clone()).is_err() {
                self.progress_tx = None;
            }
        }
        Ok(stats)
    }

    fn save_checkpoints(&mut self, iteration: usize) {
        let mut roles = vec![NetworkRole::Generator];
        if self.config.save_critic {
            roles.push(NetworkRole::Critic);
        }
        for role in roles {
            let network = match role {
                NetworkRole::Generator => &self.model.generator().network,
                NetworkRole::Critic => &self.model.critic().network,
            };
            if let Err(e) = self.checkpoints.save(role, iteration, network) {
                error!("checkpoint at iteration {iteration} failed: {e}");
                self.failed_checkpoints.push(e);
            }
        }
    }

    /// Runs every epoch to completion.
    pub fn train(&mut self) -> Result<TrainingReport> {
        let per_epoch = self.batches_per_epoch();
        let mut iterations = 0;
        for epoch in 0..self.config.epochs {
            let started = Instant::now();
            for batch in 0..per_epoch {
                self.run_iteration(epoch * per_epoch + batch)?;
                iterations += 1;
            }
            info!("Time for epoch {epoch}: {:.1}s", started.elapsed().as_secs_f64());
        }
        self.state = TrainerState::Done;
        Ok(TrainingReport {
            iterations,
            failed_checkpoints: std::mem::take(&mut self.failed_checkpoints),
        })
    }

    /// Writes `critic_losses.csv` and `generator_losses.csv` through `sink`.
    ///
    /// Both files are attempted; the first failure is returned.
    pub fn save_losses(&self, sink: &dyn LossLogSink) -> Result<()> {
        let critic = sink.write("critic_", &self.history.critic_columns());
        let generator = sink.write("generator_", &self.history.generator_columns());
        critic.and(generator)
    }
}
