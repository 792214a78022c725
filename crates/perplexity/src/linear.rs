#![forbid(unsafe_code)]

use crate::error::ModelError;

/// Dense layer: out = W * in + b
pub struct Linear {
    /// input dimension
    pub in_dim: usize,
    /// output dimension
    pub out_dim: usize,
    /// weights in row-major order: out_dim x in_dim
    pub weights: Vec<f32>,
    /// bias vector of length out_dim
    pub bias: Vec<f32>,
}

impl Linear {
    /// Build a layer from a raw buffer laid out as weights followed by biases.
    pub fn from_raw(in_dim: usize, out_dim: usize, raw: &[f32]) -> Result<Self, ModelError> {
        let expected = out_dim * in_dim + out_dim;
        if raw.len() != expected {
            return Err(ModelError::WeightSize { got: raw.len(), expected });
        }
        let (weights, bias) = raw.split_at(out_dim * in_dim);
        Ok(Self { in_dim, out_dim, weights: weights.to_vec(), bias: bias.to_vec() })
    }

    /// Zero weights and biases.
    pub fn zeros(in_dim: usize, out_dim: usize) -> Self {
        Self { in_dim, out_dim, weights: vec![0.0; in_dim * out_dim], bias: vec![0.0; out_dim] }
    }

    /// Forward pass for a one-hot input with the hot entry at `index`:
    /// column `index` of W plus the bias.
    pub fn forward_one_hot(&self, index: usize) -> Option<Vec<f32>> {
        if index >= self.in_dim {
            return None;
        }
        self.weights
            .chunks_exact(self.in_dim)
            .zip(&self.bias)
            .map(|(row, b)| row.get(index).map(|w| w + b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_splits_weights_and_bias() {
        // 2 inputs -> 2 outputs; W = [[1, 2], [3, 4]], b = [0.5, -0.5]
        let l = Linear::from_raw(2, 2, &[1.0, 2.0, 3.0, 4.0, 0.5, -0.5]).unwrap();
        assert_eq!(l.weights, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(l.bias, vec![0.5, -0.5]);
    }

    #[test]
    fn from_raw_rejects_wrong_size() {
        assert!(matches!(
            Linear::from_raw(2, 2, &[1.0; 4]),
            Err(ModelError::WeightSize { got: 4, expected: 6 })
        ));
    }

    #[test]
    fn one_hot_selects_a_column_plus_bias() {
        let l = Linear::from_raw(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.5, -0.5]).unwrap();
        assert_eq!(l.forward_one_hot(1), Some(vec![2.5, 4.5]));
        assert_eq!(l.forward_one_hot(0), Some(vec![1.5, 3.5]));
        assert_eq!(l.forward_one_hot(3), None);
    }

    #[test]
    fn zeros_layer_outputs_zeros() {
        assert_eq!(Linear::zeros(4, 3).forward_one_hot(2), Some(vec![0.0; 3]));
    }
}
