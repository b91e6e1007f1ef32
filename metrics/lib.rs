/*!
This crate defines the [`StreamingMetric`](trait.StreamingMetric.html) trait and the metrics used to score ensembles. [`Accuracy`](struct.Accuracy.html) and [`ConfusionMatrix`](struct.ConfusionMatrix.html) score predicted classes. [`compute_probability_metrics`](fn.compute_probability_metrics.html) scores predicted class probabilities with the Brier score, cross entropy, AUC ROC, calibration and refinement.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod accuracy;
mod auc_roc;
mod brier_score;
mod calibration;
mod confusion_matrix;
mod cross_entropy;
mod mean;
mod per_class;
mod probability;

pub use self::accuracy::Accuracy;
pub use self::auc_roc::auc_roc;
pub use self::brier_score::BrierScore;
pub use self::calibration::{calibration, CalibrationOutput};
pub use self::confusion_matrix::{ClassMetrics, ConfusionMatrix, ConfusionMatrixOutput};
pub use self::cross_entropy::CrossEntropy;
pub use self::mean::Mean;
pub use self::per_class::{ClassProbabilities, PerClassOutput};
pub use self::probability::{compute_probability_metrics, ProbabilityMetricsOutput};

/**
The `StreamingMetric` trait defines a common interface to metrics that can be computed in a streaming manner, where the input is available in chunks, such as accuracy.

After being initialized, a value of type `T` implementing the `StreamingMetric` trait can have `update()` called on it with values of the associated type `Input`. Multiple values of `T` can be merged together by calling `merge()`. This is useful when the examples being scored are spread across ranks. When finished aggregating, you can call `finalize()` on the metric to produce the associated type `Output`.

# Examples

Here is a basic example implementation of a `Min` metric, which takes `f32`s as input and produces an `f32` as output that is the minimum of all the inputs.

```
use copse_metrics::StreamingMetric;

struct Min(f32);

impl StreamingMetric<'_> for Min {
	type Input = f32;
	type Output = f32;
	fn update(&mut self, input: Self::Input) {
		self.0 = self.0.min(input)
	}
	fn merge(&mut self, other: Self) { self.0 = self.0.min(other.0) }
	fn finalize(self) -> Self::Output { self.0 }
}
```

The seemingly unused generic lifetime `'a` exists here to allow `Input`s and `Output`s to borrow from their enclosing scope.
*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}
