// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn defaults_match_ak_engine_defaults_when_no_env_set() {
    for key in [
        "AK_MAX_DEPTH",
        "AK_POLL_INTERVAL_SECS",
        "AK_MAX_CONCURRENT_EXECUTIONS",
        "AK_AGENT_TIMEOUT_SECS",
        "AK_WORKSPACE_RETENTION_DAYS",
        "AK_DEFAULT_BUDGET",
    ] {
        std::env::remove_var(key);
    }
    let defaults = KernelConfig::default();
    let resolved = kernel_config_from_env();
    assert_eq!(resolved.max_depth, defaults.max_depth);
    assert_eq!(resolved.max_concurrent_executions, defaults.max_concurrent_executions);
    assert_eq!(resolved.default_budget, defaults.default_budget);
}

#[test]
#[serial]
fn env_override_takes_precedence_over_default() {
    std::env::set_var("AK_MAX_DEPTH", "9");
    std::env::set_var("AK_DEFAULT_BUDGET", "42");
    let resolved = kernel_config_from_env();
    assert_eq!(resolved.max_depth, 9);
    assert_eq!(resolved.default_budget, 42);
    std::env::remove_var("AK_MAX_DEPTH");
    std::env::remove_var("AK_DEFAULT_BUDGET");
}
