//! Seeded scenario generator used by the fuzzer.
//!
//! The same seed, step count and configuration always produce the same
//! scenario. Ticker periods are kept long enough that a single advance
//! delivers at most `max_ticks_per_advance` ticks, so every generated
//! scenario passes [`Scenario::validate`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use virtick_config::SimulatorConfig;

use crate::scenario::{Scenario, Step};

pub fn generate(seed: u64, steps: usize, config: &SimulatorConfig) -> Scenario {
    let mut rng = StdRng::seed_from_u64(seed);
    let steps = steps.clamp(1, config.max_steps);
    let min_period = config
        .max_step_ms
        .div_ceil(config.max_ticks_per_advance)
        .max(1);

    let mut live: Vec<String> = Vec::new();
    let mut next_id = 0usize;
    let mut out = Vec::with_capacity(steps);

    // The last slot is reserved for a closing advance.
    while out.len() + 1 < steps {
        let step = match rng.random_range(0..100) {
            0..=34 => {
                next_id += 1;
                let name = format!("t{next_id}");
                live.push(name.clone());
                Step::Timer {
                    name,
                    after_ms: rng.random_range(0..=config.max_step_ms),
                }
            }
            35..=49 => {
                next_id += 1;
                let name = format!("k{next_id}");
                live.push(name.clone());
                Step::Ticker {
                    name,
                    every_ms: rng.random_range(min_period..=config.max_step_ms.max(min_period)),
                }
            }
            50..=84 if !live.is_empty() => {
                let index = rng.random_range(0..live.len());
                Step::Stop {
                    name: live.swap_remove(index),
                }
            }
            _ => Step::Advance {
                ms: rng.random_range(1..=config.max_step_ms),
            },
        };
        out.push(step);
    }
    out.push(Step::Advance {
        ms: config.max_step_ms,
    });

    Scenario::new(format!("fuzz-{seed}"), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn same_seed_same_scenario() {
        let config = SimulatorConfig::default();
        assert_eq!(generate(7, 50, &config), generate(7, 50, &config));
        assert_ne!(generate(7, 50, &config), generate(8, 50, &config));
    }

    #[test]
    fn ends_with_an_advance() {
        let config = SimulatorConfig::default();
        let scenario = generate(1, 1, &config);
        assert_eq!(
            scenario.steps,
            vec![Step::Advance {
                ms: config.max_step_ms
            }]
        );
    }

    proptest! {
        #[test]
        fn generated_scenarios_validate(seed in any::<u64>(), steps in 1usize..200) {
            let config = SimulatorConfig {
                max_steps: 100,
                max_step_ms: 500,
                max_ticks_per_advance: 10,
                ..SimulatorConfig::default()
            };
            let scenario = generate(seed, steps, &config);
            prop_assert!(scenario.steps.len() <= config.max_steps);
            prop_assert!(scenario.validate(&config).is_ok());
            for step in &scenario.steps {
                match step {
                    Step::Ticker { every_ms, .. } => prop_assert!(*every_ms >= 50),
                    Step::Advance { ms } => prop_assert!((1..=500).contains(ms)),
                    Step::Timer { after_ms, .. } => prop_assert!(*after_ms <= 500),
                    _ => {}
                }
            }
        }
    }
}
