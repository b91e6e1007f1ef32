/*!
This crate evaluates a trained [`Ensemble`](../copse_dataset/struct.Ensemble.html) on a held out [`Subset`](../copse_dataset/struct.Subset.html).

Evaluation has two steps. First, every tree classifies every example to build a prediction matrix. For plain ensembles this records each tree's predicted class. For boosted ensembles it records a per-class score weighted by the trees' boosting weights. Second, the matrix is reduced to accuracies and a confusion matrix by voting.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod classify;
mod prediction_matrix;
mod voting;

pub use self::classify::{classify_example, find_example_probabilities};
pub use self::prediction_matrix::{
	build_boost_prediction_matrix, build_boost_probability_matrix, build_prediction_matrix,
	build_probability_matrix, BoostPredictionMatrix, PredictionMatrix,
};
pub use self::voting::{
	compute_average_accuracy, compute_boosting_accuracy, compute_voted_accuracy,
	count_class_votes_from_matrix, find_best_class, VotedAccuracy,
};

/// These are the options for evaluating an ensemble.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EvaluateOptions {
	/// If true, a plurality vote tied between several classes goes to one of them chosen uniformly at random. Otherwise it goes to the tied class with the lowest index.
	pub break_ties_randomly: bool,
}

impl Default for EvaluateOptions {
	fn default() -> EvaluateOptions {
		EvaluateOptions {
			break_ties_randomly: true,
		}
	}
}
