//! Prior (anchor) box generation
//!
//! Raw detector outputs are positional: entry `i` of every output tensor
//! belongs to anchor `i` of the list produced here. The order is level,
//! then grid row, then grid column, then min size.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::DetectorConfig;

/// Anchor in center form, normalized to the network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

/// Generate the ordered anchor list for a detector at the given input size.
pub fn generate(config: &DetectorConfig, input_width: u32, input_height: u32) -> Vec<Anchor> {
    let (in_w, in_h) = (input_width as f32, input_height as f32);
    let mut anchors = Vec::with_capacity(anchor_count(config, input_width, input_height));

    for (sizes, &step) in config.min_sizes.iter().zip(config.steps.iter()) {
        let (rows, cols) = feature_map(step, input_width, input_height);
        let step = step as f32;

        for i in 0..rows {
            for j in 0..cols {
                let cx = (j as f32 + 0.5) * step / in_w;
                let cy = (i as f32 + 0.5) * step / in_h;
                for &size in sizes {
                    anchors.push(Anchor {
                        cx,
                        cy,
                        w: size as f32 / in_w,
                        h: size as f32 / in_h,
                    });
                }
            }
        }
    }

    anchors
}

/// Number of anchors `generate` emits, without materializing them.
pub fn anchor_count(config: &DetectorConfig, input_width: u32, input_height: u32) -> usize {
    config
        .min_sizes
        .iter()
        .zip(config.steps.iter())
        .map(|(sizes, &step)| {
            let (rows, cols) = feature_map(step, input_width, input_height);
            rows * cols * sizes.len()
        })
        .sum()
}

fn feature_map(step: u32, input_width: u32, input_height: u32) -> (usize, usize) {
    (
        input_height.div_ceil(step) as usize,
        input_width.div_ceil(step) as usize,
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PriorKey {
    min_sizes: Vec<Vec<u32>>,
    steps: Vec<u32>,
    width: u32,
    height: u32,
}

/// Memoized anchor lists keyed by layout and input resolution.
#[derive(Default)]
pub struct PriorCache {
    entries: RwLock<HashMap<PriorKey, Arc<[Anchor]>>>,
}

impl PriorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, config: &DetectorConfig, width: u32, height: u32) -> Arc<[Anchor]> {
        let key = PriorKey {
            min_sizes: config.min_sizes.clone(),
            steps: config.steps.clone(),
            width,
            height,
        };

        if let Some(anchors) = self.entries.read().get(&key) {
            return anchors.clone();
        }

        let mut entries = self.entries.write();
        // Another caller may have filled it between the locks
        if let Some(anchors) = entries.get(&key) {
            return anchors.clone();
        }

        let anchors: Arc<[Anchor]> = generate(config, width, height).into();
        debug!("Generated {} priors for {}x{}", anchors.len(), width, height);
        entries.insert(key, anchors.clone());
        anchors
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
