//! Genome ⇄ real vector conversion
//!
//! A [`GenomeTransformation`] maps genomes to fixed-order feature vectors and
//! back. Parameters are laid out in lexicographic identifier order. Numeric
//! parameters take one feature holding their value; categorical parameters
//! take one or more features, depending on the [`CategoricalEncoding`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GenomeError;
use crate::genome::genome::Genome;
use crate::parameters::domain::Domain;
use crate::parameters::tree::ParameterTree;

/// How categorical values are spread over features
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoricalEncoding {
    /// One feature holding the category index
    #[default]
    Ordinal,
    /// `ceil(log2(N))` features holding the binary digits of the index,
    /// most significant first
    Binary,
    /// `N` features, exactly one of them set to 1
    OneHot,
}

impl CategoricalEncoding {
    /// Number of features a categorical domain with `size` values consumes
    pub fn feature_length(&self, size: usize) -> usize {
        match self {
            Self::Ordinal => 1,
            Self::Binary => binary_digits(size),
            Self::OneHot => size.max(1),
        }
    }
}

fn binary_digits(size: usize) -> usize {
    if size <= 2 {
        1
    } else {
        (usize::BITS - (size - 1).leading_zeros()) as usize
    }
}

/// Bidirectional genome ⇄ feature vector mapping for one parameter tree
#[derive(Clone, Debug)]
pub struct GenomeTransformation {
    tree: Arc<ParameterTree>,
    encoding: CategoricalEncoding,
    feature_lengths: Vec<usize>,
}

impl GenomeTransformation {
    /// Create a transformation
    pub fn new(tree: Arc<ParameterTree>, encoding: CategoricalEncoding) -> Self {
        let feature_lengths = tree
            .parameters()
            .map(|(_, domain)| match domain {
                Domain::Categorical { values, .. } => encoding.feature_length(values.len()),
                _ => 1,
            })
            .collect();
        Self {
            tree,
            encoding,
            feature_lengths,
        }
    }

    /// The parameter tree
    pub fn tree(&self) -> &Arc<ParameterTree> {
        &self.tree
    }

    /// The categorical encoding
    pub fn encoding(&self) -> CategoricalEncoding {
        self.encoding
    }

    /// Features consumed per parameter, in identifier order
    pub fn feature_lengths(&self) -> &[usize] {
        &self.feature_lengths
    }

    /// Total length of a converted genome
    pub fn feature_count(&self) -> usize {
        self.feature_lengths.iter().sum()
    }

    /// Feature index sets of all categorical parameters
    pub fn categorical_feature_groups(&self) -> Vec<Vec<usize>> {
        let mut offset = 0;
        let mut groups = Vec::new();
        for ((_, domain), &length) in self.tree.parameters().zip(&self.feature_lengths) {
            if domain.is_categorical() {
                groups.push((offset..offset + length).collect());
            }
            offset += length;
        }
        groups
    }

    /// Identifier of the parameter a feature belongs to
    pub fn parameter_of_feature(&self, feature: usize) -> Option<&str> {
        let mut offset = 0;
        for (id, &length) in self.tree.identifiers().zip(&self.feature_lengths) {
            if feature < offset + length {
                return Some(id);
            }
            offset += length;
        }
        None
    }

    /// Convert a genome to its feature vector
    pub fn convert_genome_to_array(&self, genome: &Genome) -> Result<Vec<f64>, GenomeError> {
        let mut features = Vec::with_capacity(self.feature_count());
        for ((id, domain), &length) in self.tree.parameters().zip(&self.feature_lengths) {
            let value = genome
                .gene_value(id)
                .ok_or_else(|| GenomeError::MissingGene(id.to_string()))?;
            let outside = || GenomeError::ValueOutsideDomain {
                identifier: id.to_string(),
                value: value.to_string(),
            };

            match domain {
                Domain::Categorical { .. } => {
                    let index = domain.category_index(value).ok_or_else(outside)?;
                    self.encode_category(index, length, &mut features);
                }
                _ => features.push(value.as_f64().ok_or_else(outside)?),
            }
        }
        Ok(features)
    }

    /// Decode a feature vector produced by [`convert_genome_to_array`](Self::convert_genome_to_array)
    pub fn convert_back(&self, features: &[f64]) -> Result<Genome, GenomeError> {
        self.check_length(features)?;

        let mut genome = Genome::new(0);
        let mut offset = 0;
        for ((id, domain), &length) in self.tree.parameters().zip(&self.feature_lengths) {
            let group = &features[offset..offset + length];
            offset += length;

            let invalid = |reason: String| GenomeError::InvalidEncoding {
                identifier: id.to_string(),
                reason,
            };
            let allele = match domain {
                Domain::Categorical { .. } => {
                    let index = self.decode_category(group).map_err(invalid)?;
                    domain
                        .category(index)
                        .cloned()
                        .ok_or_else(|| invalid(format!("category index {} out of range", index)))?
                }
                _ => domain
                    .allele_from_value(group[0])
                    .filter(|allele| domain.contains(allele))
                    .ok_or_else(|| GenomeError::ValueOutsideDomain {
                        identifier: id.to_string(),
                        value: group[0].to_string(),
                    })?,
            };
            genome.set_gene(id, allele);
        }
        Ok(genome)
    }

    /// Round arbitrary features to the nearest values a genome can produce.
    ///
    /// Never fails on the values themselves: numeric features saturate at
    /// their domain bounds, categorical groups snap to the nearest code.
    pub fn round_to_valid_values(&self, features: &[f64]) -> Result<Vec<f64>, GenomeError> {
        self.check_length(features)?;

        let mut rounded = Vec::with_capacity(features.len());
        let mut offset = 0;
        for ((_, domain), &length) in self.tree.parameters().zip(&self.feature_lengths) {
            let group = &features[offset..offset + length];
            offset += length;

            match domain {
                Domain::Categorical { values, .. } => {
                    let index = match self.encoding {
                        CategoricalEncoding::Ordinal => domain.round_to_valid(group[0]) as usize,
                        CategoricalEncoding::Binary => group
                            .iter()
                            .fold(0usize, |acc, &d| (acc << 1) | usize::from(d >= 0.5))
                            .min(values.len() - 1),
                        CategoricalEncoding::OneHot => arg_max(group),
                    };
                    self.encode_category(index, length, &mut rounded);
                }
                _ => rounded.push(domain.round_to_valid(group[0])),
            }
        }
        Ok(rounded)
    }

    /// Round, then decode. Only fails on a length mismatch.
    pub fn convert_back_tolerant(&self, features: &[f64]) -> Result<Genome, GenomeError> {
        let rounded = self.round_to_valid_values(features)?;
        self.convert_back(&rounded)
    }

    fn check_length(&self, features: &[f64]) -> Result<(), GenomeError> {
        let expected = self.feature_count();
        if features.len() != expected {
            return Err(GenomeError::DimensionMismatch {
                expected,
                actual: features.len(),
            });
        }
        Ok(())
    }

    fn encode_category(&self, index: usize, length: usize, out: &mut Vec<f64>) {
        match self.encoding {
            CategoricalEncoding::Ordinal => out.push(index as f64),
            CategoricalEncoding::Binary => {
                for digit in (0..length).rev() {
                    out.push(((index >> digit) & 1) as f64);
                }
            }
            CategoricalEncoding::OneHot => {
                out.extend((0..length).map(|i| if i == index { 1.0 } else { 0.0 }));
            }
        }
    }

    fn decode_category(&self, group: &[f64]) -> Result<usize, String> {
        match self.encoding {
            CategoricalEncoding::Ordinal => {
                let value = group[0];
                if value < 0.0 || value.fract() != 0.0 {
                    return Err(format!("{} is not an ordinal index", value));
                }
                Ok(value as usize)
            }
            CategoricalEncoding::Binary => group.iter().try_fold(0usize, |acc, &digit| {
                if digit == 0.0 || digit == 1.0 {
                    Ok((acc << 1) | digit as usize)
                } else {
                    Err(format!("{} is not a binary digit", digit))
                }
            }),
            CategoricalEncoding::OneHot => {
                let ones: Vec<usize> = group
                    .iter()
                    .enumerate()
                    .filter(|(_, &v)| v == 1.0)
                    .map(|(i, _)| i)
                    .collect();
                let zeros = group.iter().filter(|&&v| v == 0.0).count();
                if ones.len() != 1 || ones.len() + zeros != group.len() {
                    return Err("one-hot group needs exactly one 1 and zeros elsewhere".to_string());
                }
                Ok(ones[0])
            }
        }
    }
}

fn arg_max(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &value) in values.iter().enumerate() {
        if value > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::allele::Allele;
    use crate::parameters::tree::ParameterNode;
    use approx::assert_relative_eq;

    fn mixed_tree() -> Arc<ParameterTree> {
        Arc::new(
            ParameterTree::new(ParameterNode::and(vec![
                ParameterNode::value("cont", Domain::continuous(0.0, 1.0).unwrap()),
                ParameterNode::value("int", Domain::integer(0, 1).unwrap()),
                ParameterNode::value("log", Domain::log(1.0, 16.0).unwrap()),
                ParameterNode::value(
                    "seven",
                    Domain::categorical(["a", "b", "c", "d", "e", "f", "g"]).unwrap(),
                ),
            ]))
            .unwrap(),
        )
    }

    fn genome() -> Genome {
        Genome::from_genes(
            [
                ("cont", Allele::Float(0.25)),
                ("int", Allele::Int(1)),
                ("log", Allele::Float(2.0)),
                ("seven", Allele::from("f")),
            ],
            0,
        )
    }

    #[test]
    fn test_feature_lengths() {
        let tree = mixed_tree();
        let ordinal = GenomeTransformation::new(tree.clone(), CategoricalEncoding::Ordinal);
        let binary = GenomeTransformation::new(tree.clone(), CategoricalEncoding::Binary);
        let one_hot = GenomeTransformation::new(tree, CategoricalEncoding::OneHot);

        assert_eq!(ordinal.feature_lengths(), &[1, 1, 1, 1]);
        assert_eq!(binary.feature_lengths(), &[1, 1, 1, 3]);
        assert_eq!(one_hot.feature_lengths(), &[1, 1, 1, 7]);
    }

    #[test]
    fn test_binary_digits() {
        assert_eq!(binary_digits(1), 1);
        assert_eq!(binary_digits(2), 1);
        assert_eq!(binary_digits(3), 2);
        assert_eq!(binary_digits(4), 2);
        assert_eq!(binary_digits(7), 3);
        assert_eq!(binary_digits(8), 3);
        assert_eq!(binary_digits(9), 4);
    }

    #[test]
    fn test_encodings() {
        let tree = mixed_tree();
        let binary = GenomeTransformation::new(tree.clone(), CategoricalEncoding::Binary);
        assert_eq!(
            binary.convert_genome_to_array(&genome()).unwrap(),
            vec![0.25, 1.0, 2.0, 1.0, 0.0, 1.0]
        );

        let one_hot = GenomeTransformation::new(tree, CategoricalEncoding::OneHot);
        assert_eq!(
            one_hot.convert_genome_to_array(&genome()).unwrap(),
            vec![0.25, 1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_round_trip_for_every_encoding() {
        for encoding in [
            CategoricalEncoding::Ordinal,
            CategoricalEncoding::Binary,
            CategoricalEncoding::OneHot,
        ] {
            let transformation = GenomeTransformation::new(mixed_tree(), encoding);
            let array = transformation.convert_genome_to_array(&genome()).unwrap();
            let back = transformation.convert_back(&array).unwrap();
            assert!(back.is_equal_by_gene_values(&genome()), "{:?}", encoding);
        }
    }

    #[test]
    fn test_convert_back_rejects_wrong_length() {
        let transformation = GenomeTransformation::new(mixed_tree(), CategoricalEncoding::Ordinal);
        assert_eq!(
            transformation.convert_back(&[0.0]).unwrap_err(),
            GenomeError::DimensionMismatch {
                expected: 4,
                actual: 1
            }
        );
    }

    #[test]
    fn test_convert_back_rejects_invalid_one_hot() {
        let transformation = GenomeTransformation::new(mixed_tree(), CategoricalEncoding::OneHot);
        let features = vec![0.25, 1.0, 2.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert!(matches!(
            transformation.convert_back(&features),
            Err(GenomeError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn test_tolerant_rounding() {
        let transformation = GenomeTransformation::new(mixed_tree(), CategoricalEncoding::Ordinal);
        let rounded = transformation
            .round_to_valid_values(&[1.5, 0.3, 0.3, 9.7])
            .unwrap();
        assert_eq!(rounded, vec![1.0, 0.0, 1.0, 6.0]);

        let rounded = transformation
            .round_to_valid_values(&[0.6, 0.8, 4.0, -2.0])
            .unwrap();
        assert_relative_eq!(rounded[0], 0.6);
        assert_eq!(rounded[1], 1.0);
        assert_relative_eq!(rounded[2], 4.0, epsilon = 1e-12);
        assert_eq!(rounded[3], 0.0);
    }

    #[test]
    fn test_tolerant_rounding_is_idempotent_on_valid_values() {
        let transformation = GenomeTransformation::new(mixed_tree(), CategoricalEncoding::OneHot);
        let array = transformation.convert_genome_to_array(&genome()).unwrap();
        assert_eq!(transformation.round_to_valid_values(&array).unwrap(), array);
    }

    #[test]
    fn test_tolerant_binary_saturates_index() {
        let tree = Arc::new(
            ParameterTree::new(ParameterNode::value(
                "c",
                Domain::categorical(["a", "b", "c"]).unwrap(),
            ))
            .unwrap(),
        );
        let transformation = GenomeTransformation::new(tree, CategoricalEncoding::Binary);
        let genome = transformation.convert_back_tolerant(&[0.9, 0.7]).unwrap();
        assert_eq!(genome.gene_value("c"), Some(&Allele::from("c")));
    }

    #[test]
    fn test_categorical_groups_and_parameter_lookup() {
        let transformation = GenomeTransformation::new(mixed_tree(), CategoricalEncoding::OneHot);
        assert_eq!(
            transformation.categorical_feature_groups(),
            vec![vec![3, 4, 5, 6, 7, 8, 9]]
        );
        assert_eq!(transformation.parameter_of_feature(2), Some("log"));
        assert_eq!(transformation.parameter_of_feature(9), Some("seven"));
        assert_eq!(transformation.parameter_of_feature(10), None);
    }
}
