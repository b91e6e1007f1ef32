/*!
This crate ties the copse crates together. It loads a [`Config`](config/struct.Config.html) from YAML, resolves it to [`Options`](struct.Options.html), shares the options from the coordinator with every worker, and evaluates trained ensembles.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod config;
mod evaluation;
mod options;

pub use self::config::Config;
pub use self::evaluation::{evaluate, Evaluation};
pub use self::options::Options;

use anyhow::{Context, Result};
use copse_transport::{broadcast_options, Channel, ROOT_RANK};
use std::path::Path;

/// Read and parse the config file at `config_path`, if there is one.
pub fn load_config(config_path: Option<&Path>) -> Result<Option<Config>> {
	if let Some(config_path) = config_path {
		let config = std::fs::read_to_string(config_path)
			.with_context(|| format!("failed to read config file {}", config_path.display()))?;
		let config = parse_config(&config)
			.with_context(|| format!("failed to parse config file {}", config_path.display()))?;
		Ok(Some(config))
	} else {
		Ok(None)
	}
}

fn parse_config(config: &str) -> Result<Config> {
	Ok(serde_yaml::from_str(config)?)
}

/**
Give every rank the coordinator's options. The coordinator resolves its options from `config`. Workers ignore `config` and receive the coordinator's options.
*/
pub fn share_options<C>(channel: &C, config: Option<Config>) -> Result<Options>
where
	C: Channel + ?Sized,
{
	let options = if channel.rank() == ROOT_RANK {
		Some(Options::from_config(config))
	} else {
		None
	};
	let options = broadcast_options(channel, options)?;
	log::debug!("rank {} received options {:?}", channel.rank(), options);
	Ok(options)
}

#[cfg(test)]
use copse_split::SplitCriterion;

#[test]
fn test_parse_config() {
	let config = parse_config(
		r#"
n_trees: 25
seed: 7
split:
  criterion: hellinger
  min_examples_per_split: 5
skew:
  minority_classes: [1]
  proportions: [0.5]
  sampling:
    type: ivoting
    bite_size: 100
evaluate:
  break_ties_randomly: false
"#,
	)
	.unwrap();
	let options = Options::from_config(Some(config));
	insta::assert_debug_snapshot!(options, @r###"
 Options {
     n_trees: 25,
     seed: 7,
     split: SplitOptions {
         criterion: Hellinger,
         min_examples_per_split: 5,
         dynamic_bounds: false,
         split_on_zero_gain: false,
         random_attributes: None,
     },
     skew: Some(
         SkewOptions {
             minority_classes: [
                 1,
             ],
             proportions: [
                 0.5,
             ],
             sampling: Ivoting {
                 bite_size: 100,
             },
         },
     ),
     evaluate: EvaluateOptions {
         break_ties_randomly: false,
     },
     transport: TransportOptions {
         ceiling: 25000000,
     },
 }
 "###);
}

#[test]
fn test_parse_config_errors() {
	assert!(parse_config("n_trees: many").is_err());
	assert!(parse_config("trees: 10").is_err());
	let error = parse_config("split:\n  criterion: gini").unwrap_err();
	assert!(error.to_string().contains("gini"));
}

#[test]
fn test_load_config() {
	assert!(load_config(None).unwrap().is_none());
	let error = load_config(Some(Path::new("/nonexistent/copse.yaml"))).unwrap_err();
	assert!(error.to_string().contains("failed to read config file"));
}

#[test]
fn test_share_options() {
	use copse_transport::LocalNetwork;
	let channels = LocalNetwork::new(3).into_channels();
	let handles: Vec<_> = channels
		.into_iter()
		.map(|channel| {
			std::thread::spawn(move || {
				let config = if channel.rank() == ROOT_RANK {
					Some(Config {
						n_trees: Some(3),
						split: Some(copse_split::SplitOptions {
							criterion: SplitCriterion::ExtremelyRandom,
							..Default::default()
						}),
						..Default::default()
					})
				} else {
					None
				};
				share_options(&channel, config)
			})
		})
		.collect();
	for handle in handles {
		let options = handle.join().unwrap().unwrap();
		assert_eq!(options.n_trees, 3);
		assert_eq!(options.split.criterion, SplitCriterion::ExtremelyRandom);
	}
}
