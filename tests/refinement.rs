//! Refinement runs through the public API: resuming engines from status
//! dumps and full strategy phases on a sphere-like cost

use std::sync::Arc;

use gray_tune::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

const TREE: &str = r#"{
    "type": "and",
    "children": [
        {"type": "value", "identifier": "x", "domain": {"kind": "continuous", "min": -5.0, "max": 5.0}},
        {"type": "value", "identifier": "y", "domain": {"kind": "continuous", "min": -5.0, "max": 5.0}},
        {"type": "value", "identifier": "scale", "domain": {"kind": "log", "min": 0.01, "max": 100.0}},
        {"type": "value", "identifier": "mode", "domain": {"kind": "categorical", "values": ["fast", "slow"]}}
    ]
}"#;

fn tree() -> Arc<ParameterTree> {
    Arc::new(ParameterTree::from_json(TREE).unwrap())
}

fn builder(tree: &Arc<ParameterTree>) -> Arc<dyn GenomeBuilder> {
    Arc::new(TreeGenomeBuilder::new(tree.clone()))
}

fn sphere(genome: &Genome) -> f64 {
    let value = |id: &str| genome.gene_value(id).and_then(Allele::as_f64).unwrap_or(f64::MAX);
    let penalty = if genome.gene_value("mode") == Some(&Allele::from("slow")) {
        1.0
    } else {
        0.0
    };
    value("x").powi(2) + value("y").powi(2) + value("scale").ln().powi(2) + penalty
}

fn random_population(tree: &Arc<ParameterTree>, size: usize, rng: &mut StdRng) -> Population {
    let builder = builder(tree);
    let competitive = (0..size)
        .map(|age| builder.create_random_genome(age as u32 % 3, rng))
        .collect();
    let non_competitive = (0..size)
        .map(|_| builder.create_random_genome(0, rng))
        .collect();
    Population::new(competitive, non_competitive)
}

fn best_cost(genomes: &[Genome]) -> f64 {
    genomes.iter().map(sphere).fold(f64::MAX, f64::min)
}

#[test]
fn cma_es_resume_matches_uninterrupted_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cmaes.status");
    let tree = tree();
    let space = || ContinuizedSearchSpace::new(tree.clone(), builder(&tree));
    let mut sorter = GenomeFitnessSorter::new(sphere);
    let mut rng = StdRng::seed_from_u64(20);

    let mut original = CmaEs::new(space());
    let configuration = CmaEsConfiguration::new(8, vec![7.0; 4], 2.0).unwrap();
    original
        .initialize(configuration, default_termination_criteria(50).unwrap())
        .unwrap();
    for _ in 0..4 {
        original.next_generation(&mut sorter, &mut rng).unwrap();
    }
    original.dump_status(&path, StatusFormat::Binary).unwrap();
    let mut resumed_rng = rng.clone();

    let mut resumed = CmaEs::new(space());
    resumed
        .use_status_dump(&path, default_termination_criteria(50).unwrap())
        .unwrap();
    assert_eq!(resumed.elements(), original.elements());

    for _ in 0..6 {
        let expected = original.next_generation(&mut sorter, &mut rng).unwrap();
        let actual = resumed.next_generation(&mut sorter, &mut resumed_rng).unwrap();
        assert_eq!(actual, expected);
        assert_eq!(resumed.elements(), original.elements());
        assert_eq!(resumed.sorted_population(), original.sorted_population());
    }
    assert_eq!(resumed.generation(), 10);
}

#[test]
fn differential_evolution_resume_matches_uninterrupted_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("de.status");
    let tree = tree();
    let space = || PartialSearchSpace::new(&tree, builder(&tree), 4);
    let mut sorter = GenomeFitnessSorter::new(sphere);
    let mut rng = StdRng::seed_from_u64(21);

    let mut original = DifferentialEvolution::new(space());
    let population = random_population(&tree, 6, &mut rng);
    let points = population
        .competitive()
        .iter()
        .map(|g| original.factory().create_from_genome(g))
        .collect::<TuneResult<Vec<_>>>()
        .unwrap();
    original
        .initialize(DifferentialEvolutionConfiguration::default(), points)
        .unwrap();
    for _ in 0..3 {
        original.next_generation(&mut sorter, &mut rng).unwrap();
    }
    original.dump_status(&path, StatusFormat::Json).unwrap();
    let mut resumed_rng = rng.clone();

    let mut resumed = DifferentialEvolution::new(space());
    resumed.use_status_dump(&path).unwrap();
    assert_eq!(resumed.state(), original.state());

    for _ in 0..5 {
        original.next_generation(&mut sorter, &mut rng).unwrap();
        resumed.next_generation(&mut sorter, &mut resumed_rng).unwrap();
    }
    assert_eq!(resumed.state(), original.state());
    assert_eq!(resumed.generation(), 8);
}

#[test]
fn cma_es_phase_improves_sphere() {
    let tree = tree();
    let mut rng = StdRng::seed_from_u64(22);
    let population = random_population(&tree, 6, &mut rng);
    let mut strategy = CmaEsStrategy::new(
        tree.clone(),
        builder(&tree),
        StrategyConfiguration {
            maximum_number_generations: 30,
            ..Default::default()
        },
    )
    .unwrap();
    let mut sorter = GenomeFitnessSorter::new(sphere);

    strategy.initialize(population.clone(), None, &mut rng).unwrap();
    let result = strategy.run_phase(&mut sorter, &mut rng).unwrap();

    assert_eq!(result.competitive().len(), population.competitive().len());
    assert_eq!(result.non_competitive(), population.non_competitive());
    assert!(best_cost(result.competitive()) < best_cost(population.competitive()));
    let builder = builder(&tree);
    assert!(result.competitive().iter().all(|g| builder.is_genome_valid(g)));
}

#[test]
fn cma_es_local_phase_replaces_incumbent_with_last_generation_best() {
    let tree = tree();
    let mut rng = StdRng::seed_from_u64(24);
    let population = random_population(&tree, 4, &mut rng);
    let incumbent = population.competitive()[0].clone();

    let mut strategy = CmaEsStrategy::new(
        tree.clone(),
        builder(&tree),
        StrategyConfiguration {
            maximum_number_generations: 5,
            focus_on_incumbent: true,
            ..Default::default()
        },
    )
    .unwrap();
    // Nothing the run samples beats the incumbent
    let cheapest = incumbent.clone();
    let mut sorter = GenomeFitnessSorter::new(move |genome: &Genome| {
        if genome.is_equal_by_gene_values(&cheapest) {
            -1.0
        } else {
            sphere(genome)
        }
    });

    strategy
        .initialize(population.clone(), Some(incumbent.clone()), &mut rng)
        .unwrap();
    let result = strategy.run_phase(&mut sorter, &mut rng).unwrap();

    let replaced = &result.competitive()[0];
    assert!(!replaced.is_equal_by_gene_values(&incumbent));
    assert_eq!(replaced.age(), incumbent.age());
    assert_eq!(&result.competitive()[1..], &population.competitive()[1..]);
}

#[test]
fn differential_evolution_local_phase_refines_incumbent() {
    let tree = tree();
    let mut rng = StdRng::seed_from_u64(23);
    let population = random_population(&tree, 6, &mut rng);
    let incumbent_index = population
        .competitive()
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| sphere(a).total_cmp(&sphere(b)))
        .map(|(i, _)| i)
        .unwrap();
    let incumbent = population.competitive()[incumbent_index].clone();

    let mut strategy = DifferentialEvolutionStrategy::new(
        tree.clone(),
        builder(&tree),
        StrategyConfiguration {
            maximum_number_generations: 20,
            focus_on_incumbent: true,
            population_size: Some(8),
            ..Default::default()
        },
        DifferentialEvolutionConfiguration::default(),
    )
    .unwrap();
    let mut sorter = GenomeFitnessSorter::new(sphere);

    strategy
        .initialize(population.clone(), Some(incumbent.clone()), &mut rng)
        .unwrap();
    let result = strategy.run_phase(&mut sorter, &mut rng).unwrap();

    for (i, (before, after)) in population
        .competitive()
        .iter()
        .zip(result.competitive())
        .enumerate()
    {
        if i == incumbent_index {
            assert!(sphere(after) <= sphere(before));
            assert_eq!(after.age(), before.age());
            // "mode" has two values and is never continuized
            assert_eq!(after.gene_value("mode"), incumbent.gene_value("mode"));
        } else {
            assert_eq!(after, before);
        }
    }
}
