//! Genome validity and repair
//!
//! The continuous optimizers treat the genome builder as a black box: a
//! decoded genome is checked with [`GenomeBuilder::is_genome_valid`] and, if
//! needed, fixed in place with [`GenomeBuilder::make_genome_valid`].

use std::sync::Arc;

use rand::RngCore;

use crate::genome::genome::Genome;
use crate::parameters::tree::ParameterTree;

/// Checks and repairs genomes
pub trait GenomeBuilder: Send + Sync {
    /// Whether the genome is a valid configuration
    fn is_genome_valid(&self, genome: &Genome) -> bool;

    /// Turn the genome into the nearest valid one, in place.
    ///
    /// Must be a no-op for valid genomes.
    fn make_genome_valid(&self, genome: &mut Genome);

    /// Create a random valid genome
    fn create_random_genome(&self, age: u32, rng: &mut dyn RngCore) -> Genome;
}

/// Genome builder checking genes against the domains of a parameter tree
///
/// A genome is valid if it holds a gene for every tree parameter and every
/// gene lies inside its domain. Repair clamps and rounds numeric genes,
/// replaces unknown categorical values by the domain default (or first
/// value), and fills missing genes the same way.
#[derive(Clone, Debug)]
pub struct TreeGenomeBuilder {
    tree: Arc<ParameterTree>,
}

impl TreeGenomeBuilder {
    /// Create a builder for a tree
    pub fn new(tree: Arc<ParameterTree>) -> Self {
        Self { tree }
    }

    /// The parameter tree
    pub fn tree(&self) -> &Arc<ParameterTree> {
        &self.tree
    }
}

impl GenomeBuilder for TreeGenomeBuilder {
    fn is_genome_valid(&self, genome: &Genome) -> bool {
        self.tree.parameters().all(|(id, domain)| {
            genome
                .gene_value(id)
                .map_or(false, |value| domain.contains(value))
        })
    }

    fn make_genome_valid(&self, genome: &mut Genome) {
        for (id, domain) in self.tree.parameters() {
            let repaired = match genome.gene_value(id) {
                Some(value) if domain.contains(value) => continue,
                Some(value) => domain.repair(value),
                None => domain.fallback_value(),
            };
            genome.set_gene(id, repaired);
        }
    }

    fn create_random_genome(&self, age: u32, rng: &mut dyn RngCore) -> Genome {
        let mut genome = Genome::new(age);
        for (id, domain) in self.tree.parameters() {
            genome.set_gene(id, domain.generate_random(rng));
        }
        genome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::allele::Allele;
    use crate::parameters::domain::Domain;
    use crate::parameters::tree::ParameterNode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn builder() -> TreeGenomeBuilder {
        let tree = ParameterTree::new(ParameterNode::and(vec![
            ParameterNode::value("a", Domain::integer(0, 10).unwrap()),
            ParameterNode::value(
                "b",
                Domain::categorical(["x", "y"])
                    .unwrap()
                    .with_default(Allele::from("y"))
                    .unwrap(),
            ),
            ParameterNode::value("c", Domain::continuous(-1.0, 1.0).unwrap()),
        ]))
        .unwrap();
        TreeGenomeBuilder::new(Arc::new(tree))
    }

    #[test]
    fn test_random_genomes_are_valid() {
        let builder = builder();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let genome = builder.create_random_genome(0, &mut rng);
            assert!(builder.is_genome_valid(&genome));
        }
    }

    #[test]
    fn test_repair_invalid_genome() {
        let builder = builder();
        let mut genome = Genome::from_genes(
            [("a", Allele::Int(42)), ("b", Allele::from("z"))],
            2,
        );
        assert!(!builder.is_genome_valid(&genome));

        builder.make_genome_valid(&mut genome);
        assert!(builder.is_genome_valid(&genome));
        assert_eq!(genome.gene_value("a"), Some(&Allele::Int(10)));
        assert_eq!(genome.gene_value("b"), Some(&Allele::from("y")));
        assert_eq!(genome.gene_value("c"), Some(&Allele::Float(-1.0)));
        assert_eq!(genome.age(), 2);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let builder = builder();
        let mut rng = StdRng::seed_from_u64(3);
        let genome = builder.create_random_genome(0, &mut rng);
        let mut repaired = genome.clone();
        builder.make_genome_valid(&mut repaired);
        assert_eq!(genome, repaired);
    }
}
