//! Supervised training: epochs of activate + propagate over a dataset.

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cost::Cost;
use crate::error::{NetworkError, Result};
use crate::network::Network;
use crate::rate::RatePolicy;

/// One input/target pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub input: Vec<f64>,
    pub output: Vec<f64>,
}

impl Sample {
    pub fn new(input: impl Into<Vec<f64>>, output: impl Into<Vec<f64>>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }
}

/// Hold-out validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossValidate {
    /// Fraction of the dataset held out for measuring error, in (0, 1).
    pub test_size: f64,
    /// Stop once the held-out error reaches this value.
    pub test_error: Option<f64>,
}

/// Options for [`Network::train`].
///
/// At least one of `iterations` and `error` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    /// Maximum number of epochs; unbounded when `None`.
    pub iterations: Option<usize>,
    /// Target error; training stops once the epoch error is at or below it.
    pub error: Option<f64>,
    pub cost: Cost,
    /// Base learning rate fed to `rate_policy`.
    pub rate: f64,
    pub rate_policy: RatePolicy,
    /// Weights are updated every `batch_size` samples and at the end of the set.
    pub batch_size: usize,
    pub momentum: f64,
    /// Dropout probability for hidden nodes.
    pub dropout: f64,
    /// Shuffle the training samples after every epoch.
    pub shuffle: bool,
    /// Clear node state after every epoch.
    pub clear: bool,
    pub cross_validate: Option<CrossValidate>,
    /// Log progress every this many epochs.
    pub log: Option<usize>,
    /// Invoke the `train_with` callback every this many epochs.
    pub schedule: Option<usize>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            iterations: None,
            error: None,
            cost: Cost::Mse,
            rate: 0.3,
            rate_policy: RatePolicy::Fixed,
            batch_size: 1,
            momentum: 0.0,
            dropout: 0.0,
            shuffle: false,
            clear: false,
            cross_validate: None,
            log: None,
            schedule: None,
        }
    }
}

/// Progress passed to the schedule callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub iteration: usize,
    pub error: f64,
}

/// Outcome of a training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainResult {
    /// Error of the last epoch (held-out error when cross-validating).
    pub error: f64,
    pub iterations: usize,
    pub time: Duration,
}

/// Outcome of [`Network::test`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    /// Mean cost over the set.
    pub error: f64,
    pub time: Duration,
}

impl Network {
    /// Train on `set` until the error target or the iteration cap is reached.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::MissingStopCriterion`] if neither `iterations` nor `error` is set
    /// - [`NetworkError::EmptyDataset`] for an empty set
    /// - [`NetworkError::InputSizeMismatch`] / [`NetworkError::OutputSizeMismatch`]
    ///   for samples that do not fit the network
    /// - [`NetworkError::BatchTooLarge`] if `batch_size` exceeds the set length
    /// - [`NetworkError::InvalidCrossValidation`] for a hold-out fraction that
    ///   leaves either side empty
    pub fn train<R: Rng>(
        &mut self,
        set: &[Sample],
        options: &TrainOptions,
        rng: &mut R,
    ) -> Result<TrainResult> {
        self.train_with(set, options, rng, |_| {})
    }

    /// [`train`](Self::train) with a callback invoked every `options.schedule` epochs.
    ///
    /// # Errors
    ///
    /// Same as [`train`](Self::train).
    pub fn train_with<R, F>(
        &mut self,
        set: &[Sample],
        options: &TrainOptions,
        rng: &mut R,
        mut schedule: F,
    ) -> Result<TrainResult>
    where
        R: Rng,
        F: FnMut(&Progress),
    {
        if options.iterations.is_none() && options.error.is_none() {
            return Err(NetworkError::MissingStopCriterion);
        }
        self.check_set(set)?;
        let batch_size = options.batch_size.max(1);
        if batch_size > set.len() {
            return Err(NetworkError::BatchTooLarge {
                batch_size,
                len: set.len(),
            });
        }

        let (mut train_set, test_set) = match options.cross_validate {
            Some(cv) => {
                let (train, test) = split(set, cv.test_size)?;
                (train.to_vec(), test.to_vec())
            }
            None => (set.to_vec(), Vec::new()),
        };

        self.dropout = options.dropout;
        let target_error = options.error.unwrap_or(f64::NEG_INFINITY);
        let start = Instant::now();
        let mut error = f64::INFINITY;
        let mut iteration = 0;

        while error > target_error && !matches!(options.iterations, Some(cap) if iteration >= cap) {
            if let Some(CrossValidate {
                test_error: Some(test_error),
                ..
            }) = options.cross_validate
            {
                if error <= test_error {
                    break;
                }
            }

            iteration += 1;
            let rate = options.rate_policy.rate(options.rate, iteration);

            if options.cross_validate.is_some() {
                self.train_epoch(&train_set, batch_size, rate, options, rng)?;
                if options.clear {
                    self.clear();
                }
                error = self.test(&test_set, options.cost)?.error;
            } else {
                error = self.train_epoch(&train_set, batch_size, rate, options, rng)?;
            }
            if options.clear {
                self.clear();
            }

            if options.shuffle {
                train_set.shuffle(rng);
            }
            if options.log.is_some_and(|every| every > 0 && iteration % every == 0) {
                log::info!("iteration {iteration}: error {error:.6}, rate {rate:.6}");
            }
            if options.schedule.is_some_and(|every| every > 0 && iteration % every == 0) {
                schedule(&Progress { iteration, error });
            }
        }

        if options.clear {
            self.clear();
        }
        if options.dropout > 0.0 {
            self.rescale_hidden_masks();
        }

        Ok(TrainResult {
            error,
            iterations: iteration,
            time: start.elapsed(),
        })
    }

    /// Mean cost over `set` using untraced activation.
    ///
    /// # Errors
    ///
    /// [`NetworkError::EmptyDataset`] or a size mismatch for samples that do
    /// not fit the network.
    pub fn test(&mut self, set: &[Sample], cost: Cost) -> Result<TestResult> {
        self.check_set(set)?;
        if self.dropout > 0.0 {
            self.rescale_hidden_masks();
        }

        let start = Instant::now();
        let mut total = 0.0;
        for sample in set {
            let output = self.activate_no_trace(&sample.input)?;
            total += cost.calculate(&sample.output, &output);
        }
        #[allow(clippy::cast_precision_loss)]
        let error = total / set.len() as f64;

        Ok(TestResult {
            error,
            time: start.elapsed(),
        })
    }

    fn train_epoch<R: Rng>(
        &mut self,
        set: &[Sample],
        batch_size: usize,
        rate: f64,
        options: &TrainOptions,
        rng: &mut R,
    ) -> Result<f64> {
        let mut total = 0.0;
        for (i, sample) in set.iter().enumerate() {
            let update = (i + 1) % batch_size == 0 || i + 1 == set.len();
            let output = self.activate_training(&sample.input, rng)?;
            self.propagate(rate, options.momentum, update, &sample.output)?;
            total += options.cost.calculate(&sample.output, &output);
        }
        #[allow(clippy::cast_precision_loss)]
        let error = total / set.len() as f64;
        Ok(error)
    }

    pub(crate) fn check_set(&self, set: &[Sample]) -> Result<()> {
        if set.is_empty() {
            return Err(NetworkError::EmptyDataset);
        }
        for sample in set {
            if sample.input.len() != self.input_size() {
                return Err(NetworkError::InputSizeMismatch {
                    expected: self.input_size(),
                    found: sample.input.len(),
                });
            }
            if sample.output.len() != self.output_size() {
                return Err(NetworkError::OutputSizeMismatch {
                    expected: self.output_size(),
                    found: sample.output.len(),
                });
            }
        }
        Ok(())
    }

    /// Scale hidden activations by the keep probability for inference.
    fn rescale_hidden_masks(&mut self) {
        let keep = 1.0 - self.dropout;
        let hidden_start = self.input_size() + self.output_size();
        for i in hidden_start..self.order.len() {
            let id = self.order[i];
            self.nodes[id].mask = keep;
        }
    }
}

/// Split off the trailing `test_size` fraction as a hold-out set.
fn split(set: &[Sample], test_size: f64) -> Result<(&[Sample], &[Sample])> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(NetworkError::InvalidCrossValidation(test_size));
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let train_len = ((1.0 - test_size) * set.len() as f64).ceil() as usize;
    if train_len == 0 || train_len >= set.len() {
        return Err(NetworkError::InvalidCrossValidation(test_size));
    }
    Ok(set.split_at(train_len))
}
