use anyhow::{bail, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    prelude::*,
};
use std::fmt;

/// Output channels of the three conv blocks
const CONV_CHANNELS: [usize; 3] = [32, 64, 128];
const KERNEL: usize = 3;
const POOL: usize = 2;

#[derive(Config, Debug)]
pub struct CnnClassifierConfig {
    pub num_classes: usize,
    pub img_height:  usize,
    pub img_width:   usize,
    #[config(default = 512)]
    pub hidden_units: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl CnnClassifierConfig {
    /// Spatial size after the three conv + pool blocks, as (height, width).
    /// Each block maps s → floor((s - 2) / 2).
    pub fn feature_map(&self) -> Result<(usize, usize)> {
        fn shrink(mut s: usize) -> Option<usize> {
            for _ in 0..CONV_CHANNELS.len() {
                s = s.checked_sub(KERNEL - 1)? / POOL;
            }
            (s > 0).then_some(s)
        }

        match (shrink(self.img_height), shrink(self.img_width)) {
            (Some(h), Some(w)) => Ok((h, w)),
            _ => bail!(
                "input {}x{} is too small: the three conv/pool blocks need at least 22x22",
                self.img_height,
                self.img_width
            ),
        }
    }

    /// Length of the flattened feature vector fed to the first dense layer
    pub fn flat_features(&self) -> Result<usize> {
        let (h, w) = self.feature_map()?;
        Ok(CONV_CHANNELS[2] * h * w)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_classes < 2 {
            bail!("need at least 2 classes, got {}", self.num_classes);
        }
        if self.hidden_units == 0 {
            bail!("hidden_units must be positive");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        self.feature_map().map(|_| ())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<CnnClassifier<B>> {
        self.validate()?;
        let d = self.flat_features()?;

        let [c1, c2, c3] = CONV_CHANNELS;
        Ok(CnnClassifier {
            conv1: Conv2dConfig::new([3, c1], [KERNEL, KERNEL]).init(device),
            conv2: Conv2dConfig::new([c1, c2], [KERNEL, KERNEL]).init(device),
            conv3: Conv2dConfig::new([c2, c3], [KERNEL, KERNEL]).init(device),
            pool: MaxPool2dConfig::new([POOL, POOL])
                .with_strides([POOL, POOL])
                .init(),
            fc1: LinearConfig::new(d, self.hidden_units).init(device),
            fc2: LinearConfig::new(self.hidden_units, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            activation: Relu::new(),
        })
    }

    /// Keras-style per-layer table, computed from the config alone.
    pub fn summary(&self) -> Result<ModelSummary> {
        self.validate()?;
        let conv_params = |c_in: usize, c_out: usize| (KERNEL * KERNEL * c_in + 1) * c_out;
        let dense_params = |n_in: usize, n_out: usize| n_in * n_out + n_out;

        let mut layers = Vec::new();
        let (mut h, mut w, mut c) = (self.img_height, self.img_width, 3);

        for (i, &out) in CONV_CHANNELS.iter().enumerate() {
            let suffix = if i == 0 { String::new() } else { format!("_{i}") };
            h -= KERNEL - 1;
            w -= KERNEL - 1;
            layers.push(LayerSummary::new(format!("conv2d{suffix}"), vec![out, h, w], conv_params(c, out)));
            h /= POOL;
            w /= POOL;
            layers.push(LayerSummary::new(format!("max_pooling2d{suffix}"), vec![out, h, w], 0));
            c = out;
        }

        let d = c * h * w;
        layers.push(LayerSummary::new("flatten", vec![d], 0));
        layers.push(LayerSummary::new("dense", vec![self.hidden_units], dense_params(d, self.hidden_units)));
        layers.push(LayerSummary::new("dropout", vec![self.hidden_units], 0));
        layers.push(LayerSummary::new(
            "dense_1",
            vec![self.num_classes],
            dense_params(self.hidden_units, self.num_classes),
        ));

        Ok(ModelSummary { layers })
    }
}

/// Three conv/pool blocks, one hidden dense layer with dropout,
/// and a linear head producing one logit per class.
#[derive(Module, Debug)]
pub struct CnnClassifier<B: Backend> {
    conv1: Conv2d<B>, // 3 -> 32
    conv2: Conv2d<B>, // 32 -> 64
    conv3: Conv2d<B>, // 64 -> 128
    pool:  MaxPool2d, // 2x2, stride 2

    fc1: Linear<B>, // d -> hidden_units
    fc2: Linear<B>, // hidden_units -> num_classes

    dropout:    Dropout,
    activation: Relu,
}

impl<B: Backend> CnnClassifier<B> {
    /// images: [batch, 3, height, width] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.activation.forward(self.conv1.forward(images)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));
        let x = self.pool.forward(self.activation.forward(self.conv3.forward(x)));

        let x: Tensor<B, 2> = x.flatten(1, 3);

        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Class probabilities, [batch, num_classes]
    pub fn predict_proba(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(images), 1)
    }

    /// Categorical cross-entropy on the logits, plus the logits themselves
    /// so callers can compute accuracy without a second forward pass.
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }
}

/// Number of rows whose argmax equals the target
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [batch, 1]; flatten before comparing with [batch]
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

// ─── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSummary {
    pub name:         String,
    /// Per-sample output shape (channel-first for conv layers)
    pub output_shape: Vec<usize>,
    pub params:       usize,
}

impl LayerSummary {
    fn new(name: impl Into<String>, output_shape: Vec<usize>, params: usize) -> Self {
        Self { name: name.into(), output_shape, params }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub layers: Vec<LayerSummary>,
}

impl ModelSummary {
    pub fn total_params(&self) -> usize {
        self.layers.iter().map(|l| l.params).sum()
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<20} {:<24} {:>12}", "Layer", "Output Shape", "Param #")?;
        writeln!(f, "{}", "=".repeat(58))?;
        for l in &self.layers {
            let dims: Vec<String> = l.output_shape.iter().map(ToString::to_string).collect();
            let shape = format!("(None, {})", dims.join(", "));
            writeln!(f, "{:<20} {:<24} {:>12}", l.name, shape, l.params)?;
        }
        writeln!(f, "{}", "=".repeat(58))?;
        write!(f, "Total params: {}", self.total_params())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_feature_map_for_default_input() {
        let cfg = CnnClassifierConfig::new(4, 224, 224);
        assert_eq!(cfg.feature_map().unwrap(), (26, 26));
        assert_eq!(cfg.flat_features().unwrap(), 86_528);
    }

    #[test]
    fn test_summary_matches_reference_parameter_count() {
        let summary = CnnClassifierConfig::new(4, 224, 224).summary().unwrap();
        assert_eq!(summary.layers.len(), 10);
        assert_eq!(summary.layers[0].params, 896);
        assert_eq!(summary.layers[0].output_shape, vec![32, 222, 222]);
        assert_eq!(summary.layers[5].output_shape, vec![128, 26, 26]);
        assert_eq!(summary.total_params(), 44_398_148);
    }

    #[test]
    fn test_too_small_input_is_rejected() {
        assert!(CnnClassifierConfig::new(2, 21, 64).feature_map().is_err());
        assert!(CnnClassifierConfig::new(2, 22, 22).feature_map().is_ok());
        let device = Default::default();
        assert!(CnnClassifierConfig::new(2, 16, 16).init::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_invalid_hyperparameters_are_rejected() {
        assert!(CnnClassifierConfig::new(1, 32, 32).validate().is_err());
        assert!(CnnClassifierConfig::new(3, 32, 32).with_dropout(1.0).validate().is_err());
        assert!(CnnClassifierConfig::new(3, 32, 32).with_hidden_units(0).validate().is_err());
    }

    #[test]
    fn test_forward_shape_and_param_count() {
        let device = Default::default();
        let cfg    = CnnClassifierConfig::new(3, 22, 30).with_hidden_units(16);
        let model  = cfg.init::<TestBackend>(&device).unwrap();

        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 22, 30], &device);
        assert_eq!(model.forward(images).dims(), [2, 3]);
        assert_eq!(model.num_params(), cfg.summary().unwrap().total_params());
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Default::default();
        let model  = CnnClassifierConfig::new(4, 24, 24)
            .with_hidden_units(8)
            .init::<TestBackend>(&device)
            .unwrap();

        let images = Tensor::<TestBackend, 4>::ones([1, 3, 24, 24], &device);
        let probs: Vec<f32> = model.predict_proba(images).into_data().convert::<f32>().to_vec().unwrap();
        assert_eq!(probs.len(), 4);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_count_correct() {
        let device  = Default::default();
        let logits  = Tensor::<TestBackend, 2>::from_floats([[2.0, 1.0], [0.0, 3.0], [5.0, 4.0]], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 1], &device);
        assert_eq!(count_correct(logits, targets), 2);
    }
}
