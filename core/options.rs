use crate::config::Config;
use copse_evaluate::EvaluateOptions;
use copse_skew::SkewOptions;
use copse_split::SplitOptions;
use copse_transport::TransportOptions;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

/// These are the resolved options for a run. The coordinator resolves them from its config and broadcasts them to every worker.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Options {
	/// This is the number of trees to grow for each partition.
	pub n_trees: usize,
	/// This seeds the random number generator shared by every randomized step of the run.
	pub seed: u64,
	pub split: SplitOptions,
	/// Balanced learning is enabled if this is `Some`.
	pub skew: Option<SkewOptions>,
	pub evaluate: EvaluateOptions,
	pub transport: TransportOptions,
}

impl Default for Options {
	fn default() -> Options {
		Options {
			n_trees: 100,
			seed: 42,
			split: SplitOptions::default(),
			skew: None,
			evaluate: EvaluateOptions::default(),
			transport: TransportOptions::default(),
		}
	}
}

impl Options {
	pub fn from_config(config: Option<Config>) -> Options {
		let config = config.unwrap_or_default();
		let default = Options::default();
		Options {
			n_trees: config.n_trees.unwrap_or(default.n_trees),
			seed: config.seed.unwrap_or(default.seed),
			split: config.split.unwrap_or(default.split),
			skew: config.skew,
			evaluate: config.evaluate.unwrap_or(default.evaluate),
			transport: config.transport.unwrap_or(default.transport),
		}
	}

	/// Create the random number generator for this run. Every randomized step must draw from the one generator in a fixed order for the run to be reproducible.
	pub fn rng(&self) -> Xoshiro256Plus {
		Xoshiro256Plus::seed_from_u64(self.seed)
	}
}

#[cfg(test)]
use copse_split::SplitCriterion;

#[test]
fn test_from_config() {
	assert_eq!(Options::from_config(None), Options::default());
	let config = Config {
		n_trees: Some(10),
		split: Some(SplitOptions {
			criterion: SplitCriterion::Hellinger,
			..Default::default()
		}),
		..Default::default()
	};
	let options = Options::from_config(Some(config));
	assert_eq!(options.n_trees, 10);
	assert_eq!(options.seed, 42);
	assert_eq!(options.split.criterion, SplitCriterion::Hellinger);
	assert_eq!(options.skew, None);
	assert_eq!(options.transport.ceiling, 25_000_000);
}

#[test]
fn test_rng() {
	use rand::Rng;
	let options = Options::default();
	let (mut a, mut b) = (options.rng(), options.rng());
	for _ in 0..4 {
		assert_eq!(a.gen::<u64>(), b.gen::<u64>());
	}
}
