/*!
This module defines the `Config` struct, which is read from a YAML file to configure a run. Every field is optional. Fields that are missing take their default values when the config is resolved to [`Options`](../struct.Options.html).
*/

use copse_evaluate::EvaluateOptions;
use copse_skew::SkewOptions;
use copse_split::SplitOptions;
use copse_transport::TransportOptions;

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	pub n_trees: Option<usize>,
	pub seed: Option<u64>,
	pub split: Option<SplitOptions>,
	pub skew: Option<SkewOptions>,
	pub evaluate: Option<EvaluateOptions>,
	pub transport: Option<TransportOptions>,
}
