use super::{mean::Mean, per_class::PerClassOutput, StreamingMetric};
use ndarray::prelude::*;
use num_traits::ToPrimitive;
use std::cmp::Ordering;

/**
Compute the area under the receiver operating characteristic curve of each class against the rest. The overall value averages the areas of every pair of classes, where the area of a pair `(i, k)` is the mean of the area of class `i` against class `k`, scored by the probabilities of class `i`, and the area of class `k` against class `i`, scored by the probabilities of class `k`. [Learn more](https://link.springer.com/article/10.1023/A:1010920819831).

The shape of `probabilities` is (n_examples, n_classes).
*/
pub fn auc_roc(probabilities: ArrayView2<f32>, labels: &[usize]) -> PerClassOutput {
	let n_classes = probabilities.ncols();
	let per_class = (0..n_classes)
		.map(|class| {
			let mut scores: Vec<(f32, bool)> = probabilities
				.column(class)
				.iter()
				.zip(labels.iter())
				.map(|(probability, label)| (*probability, *label == class))
				.collect();
			binary_auc_roc(&mut scores)
		})
		.collect();
	let mut overall = Mean::new();
	for class_a in 0..n_classes {
		for class_b in 0..class_a {
			let a_against_b = pair_auc_roc(probabilities, labels, class_a, class_b);
			let b_against_a = pair_auc_roc(probabilities, labels, class_b, class_a);
			if let (Some(a_against_b), Some(b_against_a)) = (a_against_b, b_against_a) {
				overall.update((a_against_b + b_against_a) / 2.0);
			}
		}
	}
	PerClassOutput::new(per_class, overall.finalize())
}

/// The area of `positive` against `negative`, using only the examples labeled with one of the two classes.
fn pair_auc_roc(
	probabilities: ArrayView2<f32>,
	labels: &[usize],
	positive: usize,
	negative: usize,
) -> Option<f32> {
	let mut scores: Vec<(f32, bool)> = probabilities
		.column(positive)
		.iter()
		.zip(labels.iter())
		.filter(|(_, label)| **label == positive || **label == negative)
		.map(|(probability, label)| (*probability, *label == positive))
		.collect();
	binary_auc_roc(&mut scores)
}

/**
This function computes the area under the curve of true positive rate against false positive rate using the trapezoid method. Examples with equal scores are added to the curve together, so a tied (positive, negative) pair counts one half. The result is `None` unless there is at least one positive and one negative.
*/
fn binary_auc_roc(scores: &mut [(f32, bool)]) -> Option<f32> {
	let n_positives = scores.iter().filter(|(_, positive)| *positive).count();
	let n_negatives = scores.len() - n_positives;
	if n_positives == 0 || n_negatives == 0 {
		return None;
	}
	let n_positives = n_positives.to_f64().unwrap();
	let n_negatives = n_negatives.to_f64().unwrap();
	scores.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
	let mut auc_roc = 0.0f64;
	let (mut true_positives, mut false_positives) = (0usize, 0usize);
	let (mut left_true_positives, mut left_false_positives) = (0usize, 0usize);
	for (index, (score, positive)) in scores.iter().enumerate() {
		if *positive {
			true_positives += 1;
		} else {
			false_positives += 1;
		}
		let is_last_with_score = scores.get(index + 1).map_or(true, |(next_score, _)| {
			next_score.partial_cmp(score) != Some(Ordering::Equal)
		});
		if is_last_with_score {
			let y_left = left_true_positives.to_f64().unwrap() / n_positives;
			let y_right = true_positives.to_f64().unwrap() / n_positives;
			let dx = (false_positives - left_false_positives).to_f64().unwrap() / n_negatives;
			auc_roc += (y_left + y_right) / 2.0 * dx;
			left_true_positives = true_positives;
			left_false_positives = false_positives;
		}
	}
	auc_roc.to_f32()
}

#[test]
fn test_auc_roc() {
	let probabilities = arr2(&[
		[0.5f32, 0.25, 0.25],
		[0.5, 0.5, 0.0],
		[0.25, 0.5, 0.25],
		[0.5, 0.25, 0.25],
		[0.25, 0.25, 0.5],
		[0.0, 0.75, 0.25],
	]);
	let labels = [0, 0, 1, 1, 2, 2];
	insta::assert_debug_snapshot!(auc_roc(probabilities.view(), &labels), @r###"
 PerClassOutput {
     per_class: [
         Some(
             0.875,
         ),
         Some(
             0.4375,
         ),
         Some(
             0.8125,
         ),
     ],
     class_average: Some(
         0.7083333,
     ),
     overall: Some(
         0.7083333,
     ),
 }
 "###);
}

#[test]
fn test_binary_auc_roc() {
	let mut scores = [(0.9, true), (0.4, true), (0.4, false), (0.2, false)];
	assert_eq!(binary_auc_roc(&mut scores), Some(0.875));
	let mut scores = [(0.5, true), (0.5, false), (0.5, true)];
	assert_eq!(binary_auc_roc(&mut scores), Some(0.5));
	let mut scores = [(0.1, true), (0.9, false)];
	assert_eq!(binary_auc_roc(&mut scores), Some(0.0));
	let mut scores = [(0.1, true), (0.9, true)];
	assert_eq!(binary_auc_roc(&mut scores), None);
	assert_eq!(binary_auc_roc(&mut []), None);
}

#[test]
fn test_auc_roc_missing_class() {
	let probabilities = arr2(&[[0.75f32, 0.25, 0.0], [0.25, 0.75, 0.0]]);
	let output = auc_roc(probabilities.view(), &[0, 1]);
	assert_eq!(output.per_class, vec![Some(1.0), Some(1.0), None]);
	assert_eq!(output.class_average, Some(1.0));
	assert_eq!(output.overall, Some(1.0));
}
