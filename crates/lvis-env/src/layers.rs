// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Capability interface for the simulator's layers.

use ndarray::ArrayViewD;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::environment::Environment;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// Clamped to an environment state every trial.
    Input,
    /// Driven only by the network.
    Hidden,
    /// Clamped to the target during training, read back for scoring.
    Target,
}

pub trait ExternalLayer {
    fn kind(&self) -> LayerKind;

    /// Environment state this layer is bound to.
    fn name(&self) -> &str;

    fn apply_external_input(&mut self, input: ArrayViewD<'_, f32>);

    /// Current activation, flattened.
    fn read_activation(&self) -> Vec<f32>;
}

/// Pushes each Input and Target layer's same-named environment state into it.
/// Hidden layers and layers without a matching state are skipped. Returns the
/// number of layers that received input.
pub fn apply_trial_inputs<E>(env: &E, layers: &mut [Box<dyn ExternalLayer>]) -> usize
where
    E: Environment + ?Sized,
{
    let mut applied = 0;
    for layer in layers.iter_mut() {
        if layer.kind() == LayerKind::Hidden {
            continue;
        }
        match env.state(layer.name()) {
            Some(state) => {
                layer.apply_external_input(state);
                applied += 1;
            }
            None => trace!(layer = layer.name(), "no environment state for layer"),
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    struct Fixed(Vec<(String, ArrayD<f32>)>);

    impl Environment for Fixed {
        fn init(&mut self, _run: i64) {}

        fn step(&mut self) -> bool {
            true
        }

        fn state(&self, name: &str) -> Option<ArrayViewD<'_, f32>> {
            self.0.iter().find(|(n, _)| n == name).map(|(_, a)| a.view())
        }

        fn current_label(&self) -> Option<(&str, usize)> {
            None
        }
    }

    struct Recorder {
        kind: LayerKind,
        name: String,
        activation: Vec<f32>,
    }

    impl ExternalLayer for Recorder {
        fn kind(&self) -> LayerKind {
            self.kind
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn apply_external_input(&mut self, input: ArrayViewD<'_, f32>) {
            self.activation = input.iter().copied().collect();
        }

        fn read_activation(&self) -> Vec<f32> {
            self.activation.clone()
        }
    }

    fn layer(kind: LayerKind, name: &str) -> Box<dyn ExternalLayer> {
        Box::new(Recorder {
            kind,
            name: name.to_string(),
            activation: Vec::new(),
        })
    }

    #[test]
    fn hidden_layers_are_left_alone() {
        let env = Fixed(vec![
            ("V1l16".into(), ArrayD::from_elem(IxDyn(&[2, 2]), 0.5)),
            ("Output".into(), ArrayD::from_elem(IxDyn(&[3]), 1.0)),
            ("IT".into(), ArrayD::from_elem(IxDyn(&[1]), 9.0)),
        ]);
        let mut layers = vec![
            layer(LayerKind::Input, "V1l16"),
            layer(LayerKind::Hidden, "IT"),
            layer(LayerKind::Target, "Output"),
            layer(LayerKind::Input, "V1h16"),
        ];
        assert_eq!(apply_trial_inputs(&env, &mut layers), 2);
        assert_eq!(layers[0].read_activation(), [0.5; 4]);
        assert!(layers[1].read_activation().is_empty());
        assert_eq!(layers[2].read_activation(), [1.0; 3]);
        assert!(layers[3].read_activation().is_empty());
    }
}
