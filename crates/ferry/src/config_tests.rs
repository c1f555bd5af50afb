// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{sample_passengers, Config, K_MAX, P_MAX};
use clap::Parser;
use yare::parameterized;

fn base_args() -> Vec<&'static str> {
    vec!["ferry", "--n", "4", "--m", "1", "--k", "2", "--t1-ms", "100", "--t2-ms", "100", "--r", "2", "--p", "3"]
}

fn parse(args: &[&str]) -> Config {
    Config::try_parse_from(args).expect("args should parse")
}

#[test]
fn defaults_are_applied() {
    let config = parse(&base_args());
    assert!((config.bike_prob - 0.3).abs() < f64::EPSILON);
    assert_eq!(config.give_up_ms, 15000);
    assert_eq!(config.shutdown_timeout_ms, 5000);
    assert_eq!(config.log_format, "text");
    assert_eq!(config.log_level, "info");
    assert!(config.log_path.is_none());
}

#[test]
fn well_formed_config_validates() {
    assert!(parse(&base_args()).validate().is_ok());
}

#[parameterized(
    n_zero = { &["ferry", "--n", "0", "--m", "0", "--k", "1", "--t1-ms", "1", "--t2-ms", "1", "--r", "1", "--p", "0"] },
    m_not_less_than_n = { &["ferry", "--n", "2", "--m", "2", "--k", "1", "--t1-ms", "1", "--t2-ms", "1", "--r", "1", "--p", "0"] },
    k_zero = { &["ferry", "--n", "2", "--m", "0", "--k", "0", "--t1-ms", "1", "--t2-ms", "1", "--r", "1", "--p", "0"] },
    k_not_less_than_n = { &["ferry", "--n", "2", "--m", "0", "--k", "2", "--t1-ms", "1", "--t2-ms", "1", "--r", "1", "--p", "0"] },
    t1_zero = { &["ferry", "--n", "2", "--m", "0", "--k", "1", "--t1-ms", "0", "--t2-ms", "1", "--r", "1", "--p", "0"] },
    t2_zero = { &["ferry", "--n", "2", "--m", "0", "--k", "1", "--t1-ms", "1", "--t2-ms", "0", "--r", "1", "--p", "0"] },
    r_zero = { &["ferry", "--n", "2", "--m", "0", "--k", "1", "--t1-ms", "1", "--t2-ms", "1", "--r", "0", "--p", "0"] },
)]
fn invalid_configs_are_rejected(args: &[&str]) {
    assert!(parse(args).validate().is_err());
}

#[test]
fn k_above_max_is_rejected() {
    let config = Config {
        n: K_MAX + 100,
        m: 0,
        k: K_MAX + 1,
        t1_ms: 1,
        t2_ms: 1,
        r: 1,
        p: 0,
        bike_prob: 0.0,
        log_path: None,
        give_up_ms: 1000,
        shutdown_timeout_ms: 1000,
        log_format: "text".into(),
        log_level: "info".into(),
    };
    assert!(config.validate().is_err());
}

#[test]
fn p_above_max_is_rejected() {
    let config = Config {
        n: 10,
        m: 0,
        k: 1,
        t1_ms: 1,
        t2_ms: 1,
        r: 1,
        p: P_MAX + 1,
        bike_prob: 0.0,
        log_path: None,
        give_up_ms: 1000,
        shutdown_timeout_ms: 1000,
        log_format: "text".into(),
        log_level: "info".into(),
    };
    assert!(config.validate().is_err());
}

#[test]
fn bike_prob_out_of_range_is_rejected() {
    let mut config = parse(&base_args());
    config.bike_prob = 1.5;
    assert!(config.validate().is_err());
}

#[test]
fn as_sim_config_carries_millisecond_fields_as_durations() {
    let config = parse(&base_args());
    let sim = config.as_sim_config();
    assert_eq!(sim.t1, std::time::Duration::from_millis(100));
    assert_eq!(sim.t2, std::time::Duration::from_millis(100));
    assert_eq!(sim.n, 4);
    assert_eq!(sim.m, 1);
    assert_eq!(sim.k, 2);
    assert_eq!(sim.r, 2);
}

#[test]
fn sample_passengers_respects_count_and_bike_probability_extremes() {
    let mut rng = rand::rng();
    let none = sample_passengers(20, 0.0, &mut rng);
    assert_eq!(none.len(), 20);
    assert!(none.iter().all(|p| !p.has_bike));

    let all = sample_passengers(20, 1.0, &mut rng);
    assert_eq!(all.len(), 20);
    assert!(all.iter().all(|p| p.has_bike));
}
