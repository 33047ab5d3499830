//! Resuming a Refinement Phase
//!
//! This example interrupts a JADE phase halfway, writes its status to disk
//! and continues it in a fresh strategy. Given the same random generator
//! state, the resumed phase ends exactly where an uninterrupted one would.

use gray_tune::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

const TREE: &str = r#"{
    "type": "and",
    "children": [
        {"type": "value", "identifier": "x", "domain": {"kind": "continuous", "min": -5.0, "max": 5.0}},
        {"type": "value", "identifier": "y", "domain": {"kind": "continuous", "min": -5.0, "max": 5.0}},
        {"type": "value", "identifier": "mode", "domain": {"kind": "categorical", "values": ["a", "b"]}}
    ]
}"#;

fn cost(genome: &Genome) -> f64 {
    let value = |id: &str| genome.gene_value(id).and_then(Allele::as_f64).unwrap_or(f64::MAX);
    (value("x") - 1.0).powi(2) + (value("y") + 2.0).powi(2)
}

fn strategy(tree: &Arc<ParameterTree>) -> TuneResult<DifferentialEvolutionStrategy> {
    DifferentialEvolutionStrategy::new(
        tree.clone(),
        Arc::new(TreeGenomeBuilder::new(tree.clone())),
        StrategyConfiguration {
            maximum_number_generations: 40,
            ..Default::default()
        },
        DifferentialEvolutionConfiguration::default(),
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Resuming a Refinement Phase ===\n");

    let status_path = std::env::temp_dir().join("gray_tune_resume.status");
    let tree = Arc::new(ParameterTree::from_json(TREE)?);
    let builder = TreeGenomeBuilder::new(tree.clone());

    let mut rng = StdRng::seed_from_u64(7);
    let competitive: Vec<Genome> = (0..10)
        .map(|_| builder.create_random_genome(0, &mut rng))
        .collect();
    let population = Population::new(competitive, Vec::new());
    let mut sorter = GenomeFitnessSorter::new(cost);

    // Uninterrupted reference run
    let mut reference_rng = rng.clone();
    let mut reference = strategy(&tree)?;
    reference.initialize(population.clone(), None, &mut reference_rng)?;
    let expected = reference.run_phase(&mut sorter, &mut reference_rng)?;

    // Interrupted run
    let mut first = strategy(&tree)?;
    first.initialize(population, None, &mut rng)?;
    for _ in 0..20 {
        if first.perform_iteration(&mut sorter, &mut rng)? {
            break;
        }
    }
    println!(
        "Interrupted after {} generations, writing {:?}",
        first.current_generation(),
        status_path
    );
    first.dump_status(&status_path, StatusFormat::Binary)?;

    let mut second = strategy(&tree)?;
    second.use_status_dump(&status_path)?;
    println!("Resumed at generation {}", second.current_generation());
    let resumed = second.run_phase(&mut sorter, &mut rng)?;

    let best = |genomes: &[Genome]| genomes.iter().map(cost).fold(f64::MAX, f64::min);
    println!("\nBest cost, uninterrupted: {:.8}", best(expected.competitive()));
    println!("Best cost, resumed:       {:.8}", best(resumed.competitive()));
    println!("Identical populations:    {}", expected == resumed);

    std::fs::remove_file(&status_path)?;
    Ok(())
}
