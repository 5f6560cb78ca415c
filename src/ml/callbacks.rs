// ============================================================
// Layer 5 — Training Callbacks
// ============================================================
// The two monitors the training loop consults after every
// epoch, both watching validation loss:
//
//   BestCheckpoint — "save only the best": signals a save when
//                    val_loss beats everything seen so far.
//
//   EarlyStopping  — stops training once val_loss has failed to
//                    improve for `patience` epochs in a row, and
//                    remembers which epoch was best so the loop
//                    can roll the weights back to it.
//
// An improvement is a strict decrease (min_delta = 0).
// NaN never counts as an improvement. Epochs are numbered from 1,
// and the first epoch never stops the run.
//
// Neither struct touches the model or the filesystem, which
// keeps the stopping rules testable without a backend.

/// Strictly lower, and not NaN
pub fn is_improvement(current: f64, best: f64) -> bool {
    current < best
}

/// Tracks the best monitored value for checkpoint-on-improvement.
#[derive(Debug, Clone)]
pub struct BestCheckpoint {
    best:       f64,
    best_epoch: Option<usize>,
}

impl Default for BestCheckpoint {
    fn default() -> Self {
        Self { best: f64::INFINITY, best_epoch: None }
    }
}

impl BestCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when this epoch should be written to disk.
    pub fn observe(&mut self, epoch: usize, val_loss: f64) -> bool {
        if is_improvement(val_loss, self.best) {
            self.best       = val_loss;
            self.best_epoch = Some(epoch);
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> Option<(usize, f64)> {
        self.best_epoch.map(|e| (e, self.best))
    }
}

/// Outcome of feeding one epoch's val_loss to EarlyStopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// New best; keep these weights
    Improved,
    /// No improvement yet, still within patience
    Waiting,
    /// Patience exhausted; end training
    Stop,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:      usize,
    best:          f64,
    best_epoch:    Option<usize>,
    wait:          usize,
    stopped_epoch: Option<usize>,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: f64::INFINITY,
            best_epoch: None,
            wait: 0,
            stopped_epoch: None,
        }
    }

    pub fn observe(&mut self, epoch: usize, val_loss: f64) -> Verdict {
        if is_improvement(val_loss, self.best) {
            self.best       = val_loss;
            self.best_epoch = Some(epoch);
            self.wait       = 0;
            return Verdict::Improved;
        }

        self.wait += 1;
        if self.wait >= self.patience && epoch > 1 {
            self.stopped_epoch = Some(epoch);
            Verdict::Stop
        } else {
            Verdict::Waiting
        }
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    /// Epoch at which training was halted, if it was
    pub fn stopped_epoch(&self) -> Option<usize> {
        self.stopped_epoch
    }

    pub fn wait(&self) -> usize {
        self.wait
    }
}
