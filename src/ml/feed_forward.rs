// ============================================================
// Layer 5 — Position-wise Feed-Forward Network
// ============================================================
// Applied identically to every position:
//
//   input  → hidden   ReLU, dropout
//   hidden → hidden   ReLU, dropout     × (num_layers - 2)
//   hidden → output                     (no activation)
//
// Dropout is only active on an autodiff backend, so a model
// returned by `.valid()` evaluates deterministically.

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::error::{ModelError, ModelResult};

#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
    pub output_size: usize,
    #[config(default = 4)]
    pub num_layers:  usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<FeedForward<B>> {
        if self.num_layers < 2 {
            return Err(ModelError::config(format!(
                "feed-forward network needs at least 2 layers, got {}",
                self.num_layers
            )));
        }
        if self.input_size == 0 || self.hidden_size == 0 || self.output_size == 0 {
            return Err(ModelError::config("feed-forward layer sizes must be positive"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }

        let mut layers = Vec::with_capacity(self.num_layers);
        layers.push(LinearConfig::new(self.input_size, self.hidden_size).init(device));
        for _ in 0..self.num_layers - 2 {
            layers.push(LinearConfig::new(self.hidden_size, self.hidden_size).init(device));
        }
        layers.push(LinearConfig::new(self.hidden_size, self.output_size).init(device));

        Ok(FeedForward {
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
        })
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    layers:  Vec<Linear<B>>,
    dropout: Dropout,
}

impl<B: Backend> FeedForward<B> {
    /// x: [batch, seq, input_size] → [batch, seq, output_size]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let last = self.layers.len() - 1;
        let mut x = x;
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if i < last {
                x = self.dropout.forward(relu(x));
            }
        }
        x
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_layer_count_follows_config() {
        let device = Default::default();
        for n in 2..6 {
            let ffn = FeedForwardConfig::new(8, 16, 8)
                .with_num_layers(n)
                .init::<TestBackend>(&device)
                .unwrap();
            assert_eq!(ffn.num_layers(), n);
        }
    }

    #[test]
    fn test_maps_input_width_to_output_width() {
        let device = Default::default();
        let ffn    = FeedForwardConfig::new(8, 32, 5)
            .with_num_layers(2)
            .init::<TestBackend>(&device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::random([3, 4, 8], Distribution::Default, &device);
        assert_eq!(ffn.forward(x).dims(), [3, 4, 5]);
    }

    #[test]
    fn test_acts_on_each_position_independently() {
        let device = Default::default();
        let ffn    = FeedForwardConfig::new(4, 8, 4).init::<TestBackend>(&device).unwrap();
        let x      = Tensor::<TestBackend, 3>::random([1, 3, 4], Distribution::Default, &device);

        let whole = ffn.forward(x.clone());
        let first = ffn.forward(x.slice([0..1, 0..1, 0..4]));
        let diff  = (whole.slice([0..1, 0..1, 0..4]) - first)
            .abs()
            .max()
            .into_scalar()
            .elem::<f32>();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_single_layer_is_rejected() {
        let device = Default::default();
        let err    = FeedForwardConfig::new(4, 8, 4)
            .with_num_layers(1)
            .init::<TestBackend>(&device)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }

    #[test]
    fn test_dropout_of_one_is_rejected() {
        let device = Default::default();
        let err    = FeedForwardConfig::new(4, 8, 4)
            .with_dropout(1.0)
            .init::<TestBackend>(&device)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }
}
