//! The hypergame population: cap enforcement, posterior weights, and the
//! state-variance diversity filter.

use std::collections::HashSet;

use crate::likelihood::LikelihoodTree;
use crate::model::Model;
use crate::ports::rules::RulesEngine;

pub struct Population<E: RulesEngine> {
    models: Vec<Model<E>>,
    cap: usize,
}

impl<E: RulesEngine> Population<E> {
    pub fn new(cap: usize) -> Self {
        Population {
            models: Vec::new(),
            cap,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn push(&mut self, model: Model<E>) {
        self.models.push(model);
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }

    pub fn models(&self) -> &[Model<E>] {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut Vec<Model<E>> {
        &mut self.models
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Model<E>) -> bool,
    {
        self.models.retain(keep);
    }

    /// Posterior probability per model: the likelihood-tree product,
    /// normalised over the population. When every product is zero the
    /// posterior degenerates to a uniform weight of 1.0 per model.
    pub fn posteriors(&self, tree: &LikelihoodTree) -> Vec<f64> {
        let raw: Vec<f64> = self
            .models
            .iter()
            .map(|m| tree.relative_likelihood(m.hash_path()))
            .collect();
        let total: f64 = raw.iter().sum();
        if total > 0.0 {
            raw.into_iter().map(|v| v / total).collect()
        } else {
            vec![1.0; self.models.len()]
        }
    }

    /// Drop the leading model when its likelihood product has collapsed to
    /// zero and at least one other model is alive.
    pub fn drop_leading_zero_posterior(&mut self, tree: &LikelihoodTree) {
        if self.models.len() > 1
            && tree.relative_likelihood(self.models[0].hash_path()) <= 0.0
        {
            self.models.remove(0);
        }
    }

    /// Drop the overflow beyond the cap in insertion order. The plain
    /// alternative to [`Population::filter_by_variance`].
    pub fn truncate_to_cap(&mut self) {
        self.models.truncate(self.cap);
    }

    /// Reduce the population to the cap, keeping the highest-posterior
    /// model and then greedily adding the model whose current-state fluent
    /// set differs most from everything already chosen.
    ///
    /// Variance is the symmetric difference between a candidate's fluents
    /// and the union of the chosen states' fluents. Ties break by higher
    /// posterior, then by insertion order.
    pub fn filter_by_variance(&mut self, engine: &E, tree: &LikelihoodTree) {
        if self.models.len() <= self.cap {
            return;
        }
        let posteriors = self.posteriors(tree);

        let mut remaining: Vec<(Model<E>, f64)> =
            std::mem::take(&mut self.models).into_iter().zip(posteriors).collect();

        // Seed with the most plausible model.
        let seed_index = index_of_max_by(&remaining, |(_, p)| *p);
        let (seed, _) = remaining.remove(seed_index);
        let mut chosen_fluents: HashSet<E::Term> = engine.fluents(seed.current_state());
        let mut chosen = vec![seed];

        while chosen.len() < self.cap && !remaining.is_empty() {
            let mut best_index = 0;
            let mut best_variance = usize::MIN;
            let mut best_posterior = f64::MIN;
            for (index, (model, posterior)) in remaining.iter().enumerate() {
                let fluents = engine.fluents(model.current_state());
                let variance = fluents.symmetric_difference(&chosen_fluents).count();
                let better = variance > best_variance
                    || (variance == best_variance && *posterior > best_posterior);
                if index == 0 || better {
                    best_index = index;
                    best_variance = variance;
                    best_posterior = *posterior;
                }
            }
            let (model, _) = remaining.remove(best_index);
            chosen_fluents.extend(engine.fluents(model.current_state()));
            chosen.push(model);
        }

        self.models = chosen;
    }
}

/// Index of the greatest key; the first occurrence wins ties, preserving
/// insertion order.
fn index_of_max_by<T, F>(items: &[T], mut key: F) -> usize
where
    F: FnMut(&T) -> f64,
{
    let mut best = 0;
    let mut best_key = f64::MIN;
    for (index, item) in items.iter().enumerate() {
        let k = key(item);
        if index == 0 || k > best_key {
            best = index;
            best_key = k;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::doors::{Doors, DoorsMove, SEEKER};
    use crate::types::{JointMove, PathHash, Percepts};

    fn joint(seeker: usize, hider: usize) -> JointMove<DoorsMove> {
        JointMove::new(vec![DoorsMove::new(seeker), DoorsMove::new(hider)])
    }

    /// A model advanced along the given hider doors, seeker always at 0.
    fn model_via(engine: &Doors, hider_doors: &[usize]) -> Model<Doors> {
        let mut model = Model::new();
        model
            .initialize(engine.initial_state(), Percepts::empty())
            .unwrap();
        for (i, &door) in hider_doors.iter().enumerate() {
            model
                .advance(engine, i + 1, SEEKER, joint(0, door), engine.doors())
                .unwrap();
        }
        model
    }

    fn flat_tree() -> LikelihoodTree {
        let mut tree = LikelihoodTree::new(PathHash::initial());
        tree.set_value(tree.root(), 100.0);
        tree
    }

    #[test]
    fn posteriors_normalise_neutral_products() {
        let engine = Doors::new(3, 4);
        let mut population = Population::new(4);
        population.push(model_via(&engine, &[1]));
        population.push(model_via(&engine, &[2]));

        // Unexpanded tree: every product is the neutral 1.0, so posteriors
        // normalise to a half each.
        let tree = flat_tree();
        let posteriors = population.posteriors(&tree);
        assert_eq!(posteriors, vec![0.5, 0.5]);
    }

    #[test]
    fn posteriors_degenerate_to_unit_weights_when_products_vanish() {
        let engine = Doors::new(2, 3);
        let a = model_via(&engine, &[0]);
        let b = model_via(&engine, &[1]);

        let mut tree = flat_tree();
        tree.expand(
            tree.root(),
            &[(a.action_path_hash(), 0.0), (b.action_path_hash(), 0.0)],
        );

        let mut population = Population::new(4);
        population.push(a);
        population.push(b);
        assert_eq!(population.posteriors(&tree), vec![1.0, 1.0]);
    }

    #[test]
    fn posteriors_follow_the_likelihood_tree() {
        let engine = Doors::new(2, 3);
        let mut population = Population::new(4);
        let a = model_via(&engine, &[0]);
        let b = model_via(&engine, &[1]);

        let mut tree = flat_tree();
        tree.expand(
            tree.root(),
            &[
                (a.action_path_hash(), 75.0),
                (b.action_path_hash(), 25.0),
            ],
        );
        population.push(a);
        population.push(b);

        let posteriors = population.posteriors(&tree);
        assert!((posteriors[0] - 0.75).abs() < 1e-9);
        assert!((posteriors[1] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn truncation_keeps_insertion_order() {
        let engine = Doors::new(3, 5);
        let mut population = Population::new(2);
        let first = model_via(&engine, &[0]);
        let first_hash = first.action_path_hash();
        population.push(first);
        population.push(model_via(&engine, &[1]));
        population.push(model_via(&engine, &[2]));

        population.truncate_to_cap();
        assert_eq!(population.len(), 2);
        assert_eq!(population.models()[0].action_path_hash(), first_hash);
    }

    #[test]
    fn variance_filter_enforces_the_cap() {
        let engine = Doors::new(3, 5);
        let mut population = Population::new(2);
        population.push(model_via(&engine, &[0]));
        population.push(model_via(&engine, &[1]));
        population.push(model_via(&engine, &[2]));
        population.push(model_via(&engine, &[0, 1]));

        population.filter_by_variance(&engine, &flat_tree());
        assert_eq!(population.len(), 2);
    }

    #[test]
    fn variance_filter_keeps_the_most_plausible_model_first() {
        let engine = Doors::new(2, 3);
        let a = model_via(&engine, &[0]); // meets: fluents {Round 1, Meetings 1}
        let b = model_via(&engine, &[1]); // misses: fluents {Round 1, Meetings 0}

        let mut tree = flat_tree();
        tree.expand(
            tree.root(),
            &[
                (a.action_path_hash(), 10.0),
                (b.action_path_hash(), 90.0),
            ],
        );

        let mut population = Population::new(1);
        let b_hash = b.action_path_hash();
        population.push(a);
        population.push(b);
        population.filter_by_variance(&engine, &tree);

        assert_eq!(population.len(), 1);
        assert_eq!(population.models()[0].action_path_hash(), b_hash);
    }

    #[test]
    fn variance_filter_prefers_the_most_different_state() {
        let engine = Doors::new(3, 5);
        // Seed state after two meetings; candidates: one more meeting
        // (similar) vs two misses (different Round and Meetings fluents).
        let seed = model_via(&engine, &[0, 0]);
        let similar = model_via(&engine, &[0, 0]);
        let different = model_via(&engine, &[1, 2]);

        let mut tree = flat_tree();
        tree.expand(tree.root(), &[(seed.action_path_hash(), 100.0)]);

        let different_hash = different.action_path_hash();
        let mut population = Population::new(2);
        population.push(seed);
        population.push(similar);
        population.push(different);
        population.filter_by_variance(&engine, &tree);

        assert_eq!(population.len(), 2);
        assert!(
            population
                .models()
                .iter()
                .any(|m| m.action_path_hash() == different_hash),
            "the state with disjoint fluents must survive the filter"
        );
    }

    #[test]
    fn leading_zero_posterior_model_is_dropped_only_with_peers() {
        let engine = Doors::new(2, 3);
        let dead = model_via(&engine, &[0]);
        let alive = model_via(&engine, &[1]);

        let mut tree = flat_tree();
        tree.expand(
            tree.root(),
            &[
                (dead.action_path_hash(), 0.0),
                (alive.action_path_hash(), 50.0),
            ],
        );

        let mut population = Population::new(4);
        population.push(dead.clone());
        population.drop_leading_zero_posterior(&tree);
        assert_eq!(population.len(), 1, "a lone model survives");

        population.push(alive);
        population.drop_leading_zero_posterior(&tree);
        assert_eq!(population.len(), 1, "the dead leader is culled");
        assert!(tree.relative_likelihood(population.models()[0].hash_path()) > 0.0);
    }
}
