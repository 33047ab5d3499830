//! CMA-ES Refinement Phase
//!
//! This example refines a random genetic population with one CMA-ES phase.
//! The parameter tree mixes continuous, log-scaled, integer and categorical
//! parameters; all of them are continuized for the run.

use gray_tune::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

const TREE: &str = r#"{
    "type": "and",
    "children": [
        {"type": "value", "identifier": "x", "domain": {"kind": "continuous", "min": -5.0, "max": 5.0}},
        {"type": "value", "identifier": "y", "domain": {"kind": "continuous", "min": -5.0, "max": 5.0}},
        {"type": "value", "identifier": "rate", "domain": {"kind": "log", "min": 0.001, "max": 10.0}},
        {"type": "value", "identifier": "depth", "domain": {"kind": "integer", "min": 1, "max": 20}},
        {"type": "value", "identifier": "mode", "domain": {"kind": "categorical", "values": ["fast", "slow"]}}
    ]
}"#;

/// Shifted sphere: optimum at x = 1, y = -2, rate = 0.1, depth = 7, mode = fast
fn cost(genome: &Genome) -> f64 {
    let value = |id: &str| genome.gene_value(id).and_then(Allele::as_f64).unwrap_or(f64::MAX);
    let mode = if genome.gene_value("mode") == Some(&Allele::from("fast")) {
        0.0
    } else {
        1.0
    };
    (value("x") - 1.0).powi(2)
        + (value("y") + 2.0).powi(2)
        + (value("rate") / 0.1).ln().powi(2)
        + ((value("depth") - 7.0) / 5.0).powi(2)
        + mode
}

fn best(genomes: &[Genome]) -> Option<&Genome> {
    genomes.iter().min_by(|a, b| cost(a).total_cmp(&cost(b)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== CMA-ES Refinement Phase ===\n");

    let mut rng = StdRng::seed_from_u64(42);
    let tree = Arc::new(ParameterTree::from_json(TREE)?);
    let builder: Arc<dyn GenomeBuilder> = Arc::new(TreeGenomeBuilder::new(tree.clone()));

    // A population as a genetic tuner would hand it over
    let competitive: Vec<Genome> = (0..8)
        .map(|age| builder.create_random_genome(age % 3, &mut rng))
        .collect();
    let non_competitive: Vec<Genome> = (0..8)
        .map(|_| builder.create_random_genome(0, &mut rng))
        .collect();
    let population = Population::new(competitive, non_competitive);

    if let Some(genome) = best(population.competitive()) {
        println!("Best before: {:.6}  {}", cost(genome), genome);
    }

    let configuration = StrategyConfiguration {
        maximum_number_generations: 60,
        ..Default::default()
    };
    let mut strategy = CmaEsStrategy::new(tree, builder, configuration)?;
    let mut sorter = GenomeFitnessSorter::new(cost);

    strategy.initialize(population, None, &mut rng)?;
    let refined = strategy.run_phase(&mut sorter, &mut rng)?;

    if let Some(genome) = best(refined.competitive()) {
        println!("Best after:  {:.6}  {}", cost(genome), genome);
    }
    println!("\nEvaluations: {}", sorter.evaluations());
    println!("Competitive genomes: {}", refined.competitive().len());

    Ok(())
}
