use anyhow::Result;
use copse_dataset::{Ensemble, Subset};
use copse_evaluate::{
	build_boost_prediction_matrix, build_boost_probability_matrix, build_prediction_matrix,
	build_probability_matrix, compute_average_accuracy, compute_boosting_accuracy,
	compute_voted_accuracy, EvaluateOptions, VotedAccuracy,
};
use copse_metrics::{
	compute_probability_metrics, ConfusionMatrixOutput, ProbabilityMetricsOutput, StreamingMetric,
};
use rand::Rng;

/// The result of evaluating an ensemble on a held out subset.
#[derive(Debug)]
pub struct Evaluation {
	/// The plurality vote of the trees.
	pub voted: VotedAccuracy,
	/// The mean accuracy of the individual trees.
	pub average_accuracy: Option<f32>,
	/// The weighted vote of the trees. This is `None` unless the ensemble was trained with boosting.
	pub boosting: Option<VotedAccuracy>,
	/// The precision, recall and F-measure of each class under the plurality vote.
	pub voted_metrics: ConfusionMatrixOutput,
	/// The metrics of the class probabilities averaged over the trees, weighted by the boosting weights if there are any.
	pub probability_metrics: ProbabilityMetricsOutput,
}

/// Evaluate `ensemble` on `subset`. Random tie breaks in the plurality vote draw from `rng`.
pub fn evaluate<R>(
	ensemble: &Ensemble,
	subset: &Subset,
	options: &EvaluateOptions,
	rng: &mut R,
) -> Result<Evaluation>
where
	R: Rng + ?Sized,
{
	let matrix = build_prediction_matrix(ensemble, subset);
	let voted = compute_voted_accuracy(&matrix, options, rng);
	let average_accuracy = compute_average_accuracy(&matrix);
	let boosting = if ensemble.boosting_betas.is_some() {
		let matrix = build_boost_prediction_matrix(ensemble, subset)?;
		Some(compute_boosting_accuracy(&matrix))
	} else {
		None
	};
	let voted_metrics = voted.confusion_matrix.clone().finalize();
	let probabilities = if ensemble.boosting_betas.is_some() {
		build_boost_probability_matrix(ensemble, subset)?
	} else {
		build_probability_matrix(ensemble, subset)
	};
	let labels: Vec<usize> = subset.examples.iter().map(|example| example.class).collect();
	let probability_metrics = compute_probability_metrics(probabilities.view(), &labels);
	log::info!(
		"evaluated {} trees on {} examples: voted accuracy {:?}, average accuracy {:?}",
		ensemble.n_trees(),
		subset.n_examples(),
		voted.accuracy,
		average_accuracy,
	);
	if let Some(boosting) = &boosting {
		log::info!("boosting accuracy {:?}", boosting.accuracy);
	}
	log::info!(
		"precision {}, recall {}, f-measure {}",
		voted_metrics.precision_average,
		voted_metrics.recall_average,
		voted_metrics.f_measure_average,
	);
	log::info!(
		"brier score {:?}, cross entropy {:?}, auc roc {:?}, calibration {:?}, refinement {:?}",
		probability_metrics.brier_score.overall,
		probability_metrics.cross_entropy.overall,
		probability_metrics.auc_roc.overall,
		probability_metrics.calibration.calibration.class_average,
		probability_metrics.calibration.refinement.class_average,
	);
	Ok(Evaluation {
		voted,
		average_accuracy,
		boosting,
		voted_metrics,
		probability_metrics,
	})
}

#[cfg(test)]
use copse_dataset::{
	AttributeType, BranchNode, BranchSplit, Example, LeafNode, Metadata, Node, Tree,
};

#[test]
fn test_evaluate() {
	let metadata = Metadata {
		n_classes: 2,
		attribute_types: vec![AttributeType::Continuous],
		n_discrete_values: vec![0],
		n_examples_per_class: vec![],
	};
	let examples = vec![
		Example::new(vec![0], 0),
		Example::new(vec![1], 0),
		Example::new(vec![2], 1),
		Example::new(vec![3], 0),
	];
	let subset = Subset::new(metadata, vec![vec![0.0, 1.0, 2.0, 3.0]], examples);
	let tree = Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				attribute_index: 0,
				split: BranchSplit::Continuous { threshold: 1.5 },
				children: vec![1, 2],
			}),
			Node::Leaf(LeafNode::from_class_counts(vec![2, 0])),
			Node::Leaf(LeafNode::from_class_counts(vec![0, 1])),
		],
	};
	let mut ensemble = Ensemble {
		n_classes: 2,
		trees: vec![tree],
		boosting_betas: None,
	};
	let options = crate::Options::default();
	let mut rng = options.rng();
	let evaluation = evaluate(&ensemble, &subset, &options.evaluate, &mut rng).unwrap();
	assert_eq!(evaluation.voted.accuracy, Some(0.75));
	assert_eq!(evaluation.average_accuracy, Some(0.75));
	assert!(evaluation.boosting.is_none());
	// Example 3 is labeled 0 but falls in the class 1 leaf.
	let recall: Vec<f32> = evaluation
		.voted_metrics
		.class_metrics
		.iter()
		.map(|class| class.recall)
		.collect();
	assert_eq!(recall, vec![2.0 / 3.0, 1.0]);
	assert_eq!(evaluation.voted_metrics.class_metrics[1].precision, 0.5);
	let probability_metrics = &evaluation.probability_metrics;
	assert_eq!(probability_metrics.classification.accuracy, Some(0.75));
	// The leaves predict class probabilities (3/4, 1/4) and (1/3, 2/3).
	assert_eq!(
		probability_metrics.auc_roc.per_class,
		vec![Some(5.0 / 6.0), Some(5.0 / 6.0)]
	);
	let brier_score = probability_metrics.brier_score.overall.unwrap();
	assert!((brier_score - (2.0 * 0.125 + 10.0 / 9.0) / 4.0).abs() < 1e-6);
	ensemble.boosting_betas = Some(vec![0.5]);
	let evaluation = evaluate(&ensemble, &subset, &options.evaluate, &mut rng).unwrap();
	assert_eq!(evaluation.boosting.unwrap().accuracy, Some(0.75));
}
