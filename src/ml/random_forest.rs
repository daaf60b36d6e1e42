/*!
 * # Random Forest Regressor
 *
 * Bagged CART regression trees. Every tree is grown on a bootstrap sample of
 * the training rows and considers all features at each split, so the
 * ensemble only varies through its bootstrap draws. Sampling uses a seeded
 * `StdRng` which keeps predictions reproducible for identical input.
 */

use crate::errors::ServiceError;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Hyper-parameters for [`RandomForestRegressor::fit`]
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, sample: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Sum of squared errors of both children
    sse: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    targets: &'a [f64],
    n_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

impl TreeBuilder<'_> {
    fn build(&self, indices: &mut [usize], depth: usize) -> Node {
        let mean = indices.iter().map(|&i| self.targets[i]).sum::<f64>() / indices.len() as f64;

        let depth_exhausted = self.max_depth.map_or(false, |max| depth >= max);
        if indices.len() < self.min_samples_split || depth_exhausted || self.is_pure(indices) {
            return Node::Leaf(mean);
        }

        let Some(best) = self.best_split(indices) else {
            return Node::Leaf(mean);
        };

        let (mut left, mut right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.rows[i][best.feature] <= best.threshold);

        if left.is_empty() || right.is_empty() {
            return Node::Leaf(mean);
        }

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(&mut left, depth + 1)),
            right: Box::new(self.build(&mut right, depth + 1)),
        }
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        let first = self.targets[indices[0]];
        indices.iter().all(|&i| self.targets[i] == first)
    }

    fn best_split(&self, indices: &mut [usize]) -> Option<SplitCandidate> {
        let n = indices.len() as f64;
        let total_sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.targets[i].powi(2)).sum();
        let parent_sse = total_sq - total_sum * total_sum / n;

        let mut best: Option<SplitCandidate> = None;

        for feature in 0..self.n_features {
            indices.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..indices.len() - 1 {
                let idx = indices[pos];
                let y = self.targets[idx];
                left_sum += y;
                left_sq += y * y;

                let here = self.rows[idx][feature];
                let next = self.rows[indices[pos + 1]][feature];
                if here == next {
                    continue;
                }

                let left_n = (pos + 1) as f64;
                let right_n = n - left_n;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n)
                    + (right_sq - right_sum * right_sum / right_n);

                if best.as_ref().map_or(true, |b| sse < b.sse) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (here + next) / 2.0,
                        sse,
                    });
                }
            }
        }

        best.filter(|b| b.sse < parent_sse)
    }
}

/// Ensemble of regression trees averaged at prediction time
#[derive(Debug)]
pub struct RandomForestRegressor {
    trees: Vec<Node>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Grow the forest on `rows` (one feature vector per sample) and `targets`.
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        params: &ForestParams,
    ) -> Result<Self, ServiceError> {
        if rows.is_empty() {
            return Err(ServiceError::InvalidInput(
                "random forest needs at least one training sample".to_string(),
            ));
        }
        if rows.len() != targets.len() {
            return Err(ServiceError::InternalError(format!(
                "feature rows ({}) and targets ({}) differ in length",
                rows.len(),
                targets.len()
            )));
        }
        let n_features = rows[0].len();
        if rows.iter().any(|row| row.len() != n_features) {
            return Err(ServiceError::InternalError(
                "feature rows have inconsistent widths".to_string(),
            ));
        }
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(ServiceError::ComputationError(
                "random forest targets must be finite".to_string(),
            ));
        }

        let builder = TreeBuilder {
            rows,
            targets,
            n_features,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
        };

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = rows.len();
        let trees = (0..params.n_trees.max(1))
            .map(|_| {
                let mut sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                builder.build(&mut sample, 0)
            })
            .collect();

        Ok(Self { trees, n_features })
    }

    /// Mean prediction of all trees for one feature vector
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ServiceError> {
        if sample.len() != self.n_features {
            return Err(ServiceError::InternalError(format!(
                "expected {} features, got {}",
                self.n_features,
                sample.len()
            )));
        }
        let total: f64 = self.trees.iter().map(|tree| tree.predict(sample)).sum();
        Ok(total / self.trees.len() as f64)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
