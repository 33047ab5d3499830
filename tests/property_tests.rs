//! Property-based tests for gray-tune
//!
//! Uses proptest to verify invariants and properties of the library.

use std::sync::Arc;

use gray_tune::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn tree_with_categories(categories: usize) -> Arc<ParameterTree> {
    let values: Vec<String> = (0..categories).map(|i| format!("c{}", i)).collect();
    Arc::new(
        ParameterTree::new(ParameterNode::and(vec![
            ParameterNode::value("alpha", Domain::continuous(-3.0, 7.5).unwrap()),
            ParameterNode::value("beta", Domain::log(0.001, 50.0).unwrap()),
            ParameterNode::value("cat", Domain::categorical(values).unwrap()),
            ParameterNode::value("depth", Domain::integer(-4, 12).unwrap()),
            ParameterNode::value("width", Domain::discrete_log(1, 1024).unwrap()),
        ]))
        .unwrap(),
    )
}

fn encoding() -> impl Strategy<Value = CategoricalEncoding> {
    prop_oneof![
        Just(CategoricalEncoding::Ordinal),
        Just(CategoricalEncoding::Binary),
        Just(CategoricalEncoding::OneHot),
    ]
}

proptest! {
    // ==================== Transformation Properties ====================

    #[test]
    fn transformation_round_trip(
        categories in 1usize..12,
        encoding in encoding(),
        seed in any::<u64>()
    ) {
        let tree = tree_with_categories(categories);
        let builder = TreeGenomeBuilder::new(tree.clone());
        let transformation = GenomeTransformation::new(tree, encoding);
        let mut rng = StdRng::seed_from_u64(seed);

        let genome = builder.create_random_genome(0, &mut rng);
        let features = transformation.convert_genome_to_array(&genome).unwrap();
        prop_assert_eq!(features.len(), transformation.feature_count());

        let decoded = transformation.convert_back(&features).unwrap();
        prop_assert!(decoded.is_equal_by_gene_values(&genome));
        let tolerant = transformation.convert_back_tolerant(&features).unwrap();
        prop_assert!(tolerant.is_equal_by_gene_values(&genome));
    }

    #[test]
    fn categorical_feature_lengths(categories in 2usize..64) {
        let expected_binary = (categories as f64).log2().ceil() as usize;
        prop_assert_eq!(CategoricalEncoding::Ordinal.feature_length(categories), 1);
        prop_assert_eq!(CategoricalEncoding::Binary.feature_length(categories), expected_binary);
        prop_assert_eq!(CategoricalEncoding::OneHot.feature_length(categories), categories);
    }

    #[test]
    fn transformation_feature_lengths_follow_tree_order(
        categories in 2usize..12,
        encoding in encoding()
    ) {
        let transformation = GenomeTransformation::new(tree_with_categories(categories), encoding);
        let lengths = transformation.feature_lengths();
        prop_assert_eq!(lengths.len(), 5);
        prop_assert_eq!(lengths[2], encoding.feature_length(categories));
        for (i, &length) in lengths.iter().enumerate() {
            if i != 2 {
                prop_assert_eq!(length, 1);
            }
        }
        prop_assert_eq!(
            transformation.categorical_feature_groups(),
            vec![(2..2 + lengths[2]).collect::<Vec<_>>()]
        );
    }

    #[test]
    fn tolerant_conversion_never_fails(
        encoding in encoding(),
        features in prop::collection::vec(-1e6..1e6f64, 16)
    ) {
        let tree = tree_with_categories(5);
        let builder = TreeGenomeBuilder::new(tree.clone());
        let transformation = GenomeTransformation::new(tree, encoding);
        let features = &features[..transformation.feature_count()];

        let genome = transformation.convert_back_tolerant(features).unwrap();
        prop_assert!(builder.is_genome_valid(&genome));
    }

    // ==================== Domain Properties ====================

    #[test]
    fn rounding_valid_values_is_identity(value in -3.0..7.5f64, integer in -4i64..=12) {
        let continuous = Domain::continuous(-3.0, 7.5).unwrap();
        prop_assert_eq!(continuous.round_to_valid(value), value);
        let discrete = Domain::integer(-4, 12).unwrap();
        prop_assert_eq!(discrete.round_to_valid(integer as f64), integer as f64);
    }

    #[test]
    fn rounding_saturates_at_bounds(excess in 1e-6..1e9f64) {
        let continuous = Domain::continuous(0.0, 1.0).unwrap();
        prop_assert_eq!(continuous.round_to_valid(1.0 + excess), 1.0);
        prop_assert_eq!(continuous.round_to_valid(-excess), 0.0);

        let log = Domain::log(1.0, 16.0).unwrap();
        prop_assert_eq!(log.round_to_valid(1.0 - excess.min(1.0)), 1.0);
        prop_assert_eq!(log.round_to_valid(16.0 + excess), 16.0);
    }

    // ==================== Search Point Properties ====================

    #[test]
    fn map_into_bounds_stays_in_bounds(
        limits in prop::collection::vec((-100.0..100.0f64, 0.0..50.0f64), 1..10),
        offsets in prop::collection::vec(-1e4..1e4f64, 10)
    ) {
        let lower: Vec<f64> = limits.iter().map(|(l, _)| *l).collect();
        let upper: Vec<f64> = limits.iter().map(|(l, w)| l + w).collect();
        let bounds = MultiBounds::from_limits(&lower, &upper).unwrap();
        let values: Vec<f64> = offsets[..lower.len()].to_vec();

        let mapped = map_into_bounds(&values, &bounds).unwrap();
        prop_assert_eq!(mapped.len(), values.len());
        for ((value, l), u) in mapped.iter().zip(&lower).zip(&upper) {
            prop_assert!(*value >= *l && *value <= *u);
        }
    }

    // ==================== Termination Properties ====================

    #[test]
    fn max_iterations_is_monotone(max in 1usize..100, generation in 0usize..200) {
        let criterion = MaxIterations::new(max).unwrap();
        let elements = CmaEsElements {
            generation,
            ..Default::default()
        };
        prop_assert_eq!(criterion.is_met(&elements).unwrap(), generation >= max);
    }
}

#[test]
fn max_iterations_rejects_zero() {
    assert!(matches!(
        MaxIterations::new(0),
        Err(TerminationError::InvalidArgument(_))
    ));
}

#[test]
fn feature_lengths_of_seven_categories() {
    assert_eq!(CategoricalEncoding::Ordinal.feature_length(7), 1);
    assert_eq!(CategoricalEncoding::Binary.feature_length(7), 3);
    assert_eq!(CategoricalEncoding::OneHot.feature_length(7), 7);
}
