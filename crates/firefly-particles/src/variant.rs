//! Particle variants and weighted selection

use crate::reconstruction::{
    ButterflyShape, DisintegratorShape, ReconstructionStrategy, SimpleShape,
};
use firefly_core::{FireflyError, Result};

/// Which reconstruction shape a variant uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// The source triangle tumbling around a velocity-derived axis
    Simple,
    /// Four-triangle flapping wings morphing out of the facet
    Butterfly,
    /// Four-triangle fragment blooming out of the facet
    Disintegrator,
}

static SIMPLE: SimpleShape = SimpleShape;
static BUTTERFLY: ButterflyShape = ButterflyShape;
static DISINTEGRATOR: DisintegratorShape = DisintegratorShape;

impl VariantKind {
    pub const NAMES: [&'static str; 3] = ["simple", "butterfly", "disintegrator"];

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(Self::Simple),
            "butterfly" => Ok(Self::Butterfly),
            "disintegrator" => Ok(Self::Disintegrator),
            other => Err(FireflyError::InvalidEnumValue {
                value: other.to_string(),
                allowed: Self::NAMES.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Butterfly => "butterfly",
            Self::Disintegrator => "disintegrator",
        }
    }

    pub fn strategy(&self) -> &'static dyn ReconstructionStrategy {
        match self {
            Self::Simple => &SIMPLE,
            Self::Butterfly => &BUTTERFLY,
            Self::Disintegrator => &DISINTEGRATOR,
        }
    }

    /// Visual scale used when a variant leaves `size` unset
    pub fn default_size(&self) -> f32 {
        match self {
            Self::Simple => 1.0,
            Self::Butterfly => 0.005,
            Self::Disintegrator => 0.01,
        }
    }
}

/// Shared per-variant parameters; particles reference one by `SharedIndex`
#[derive(Debug, Clone, PartialEq)]
pub struct VariantParams {
    pub kind: VariantKind,
    /// Relative selection weight, non-negative
    pub weight: f32,
    /// Base lifetime in seconds before life randomization
    pub life: f32,
    /// Visual scale of the reconstructed shape
    pub size: f32,
}

impl VariantParams {
    pub fn new(kind: VariantKind) -> Self {
        Self {
            kind,
            weight: 1.0,
            life: 4.0,
            size: kind.default_size(),
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_life(mut self, life: f32) -> Self {
        self.life = life;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// The stock pair: tumbling shards and butterflies, evenly weighted
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(VariantKind::Simple),
            Self::new(VariantKind::Butterfly),
        ]
    }
}

/// Cumulative distribution over variant keys.
///
/// `select(u)` returns the first entry whose cumulative weight exceeds `u`.
#[derive(Debug, Clone)]
pub struct VariantTable<K> {
    entries: Vec<(f32, K)>,
}

impl<K: Copy> VariantTable<K> {
    /// Build from `(weight, key)` pairs.
    ///
    /// Fails when the list is empty, any weight is negative or non-finite, or
    /// every weight is zero.
    pub fn build(weights: impl IntoIterator<Item = (f32, K)>) -> Result<Self> {
        let pairs: Vec<(f32, K)> = weights.into_iter().collect();
        if pairs.is_empty() {
            return Err(FireflyError::InvalidConfig(
                "at least one variant is required".into(),
            ));
        }
        if let Some((w, _)) = pairs.iter().find(|(w, _)| !w.is_finite() || *w < 0.0) {
            return Err(FireflyError::InvalidConfig(format!(
                "variant weight must be a finite non-negative number, got {w}"
            )));
        }
        let total: f32 = pairs.iter().map(|(w, _)| w).sum();
        if total <= 0.0 {
            return Err(FireflyError::InvalidConfig(
                "variant weights sum to zero".into(),
            ));
        }

        let mut running = 0.0;
        let entries = pairs
            .into_iter()
            .map(|(w, key)| {
                running += w;
                (running / total, key)
            })
            .collect();
        Ok(Self { entries })
    }

    /// Map a uniform sample in [0, 1) to a key
    pub fn select(&self, sample: f32) -> K {
        let top = self.entries.last().map_or(1.0, |(cumulative, _)| *cumulative);
        self.entries
            .iter()
            .find(|(cumulative, _)| sample < *cumulative)
            // Rounding can leave the top just under 1; clamp to the last
            // entry that actually carries weight
            .or_else(|| self.entries.iter().find(|(cumulative, _)| *cumulative >= top))
            .map(|(_, key)| *key)
            .unwrap_or(self.entries[0].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_selection() {
        let table = VariantTable::build([(2.0, 0usize), (1.0, 1usize)]).unwrap();
        assert_eq!(table.select(0.0), 0);
        assert_eq!(table.select(0.5), 0);
        assert_eq!(table.select(0.66), 0);
        assert_eq!(table.select(0.67), 1);
        assert_eq!(table.select(0.9), 1);
    }

    #[test]
    fn zero_weight_is_never_picked() {
        let table = VariantTable::build([(1.0, 'a'), (0.0, 'b'), (1.0, 'c')]).unwrap();
        for i in 0..100 {
            assert_ne!(table.select(i as f32 / 100.0), 'b');
        }
    }

    #[test]
    fn sample_at_one_clamps_to_last() {
        let table = VariantTable::build([(1.0, 'a'), (3.0, 'b'), (0.0, 'c')]).unwrap();
        assert_eq!(table.select(1.0), 'b');
    }

    #[test]
    fn bad_weights_are_rejected() {
        assert!(VariantTable::<u8>::build([]).is_err());
        assert!(VariantTable::build([(0.0, 1u8), (0.0, 2u8)]).is_err());
        assert!(VariantTable::build([(-1.0, 1u8), (2.0, 2u8)]).is_err());
        assert!(VariantTable::build([(f32::NAN, 1u8)]).is_err());
    }

    #[test]
    fn kind_names_round_trip() {
        for name in VariantKind::NAMES {
            assert_eq!(VariantKind::parse(name).unwrap().name(), name);
        }
        assert!(VariantKind::parse("moth").is_err());
    }

    #[test]
    fn defaults_are_evenly_weighted() {
        let variants = VariantParams::defaults();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].kind, VariantKind::Simple);
        assert_eq!(variants[1].kind, VariantKind::Butterfly);
        assert_eq!(variants[0].weight, variants[1].weight);
        assert_eq!(variants[1].size, 0.005);
    }
}
