//! Configuration utility functions
//!
//! This module provides helper functions for reading configuration
//! overrides from environment variables.

/// Get a boolean value from an environment variable or use the default
pub fn get_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => val.to_lowercase() == "true" || val == "1",
        Err(_) => default,
    }
}

/// Get a u8 value from an environment variable or use the default
pub fn get_env_u8(key: &str, default: u8) -> u8 {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a u32 value from an environment variable or use the default
pub fn get_env_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a u64 value from an environment variable or use the default
pub fn get_env_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a usize value from an environment variable or use the default
pub fn get_env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a f64 value from an environment variable or use the default
pub fn get_env_f64(key: &str, default: f64) -> f64 {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get an optional usize; unset or unparsable values yield `None`
pub fn get_env_opt_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|val| val.parse().ok())
}

/// Get an optional u64; unset or unparsable values yield `None`
pub fn get_env_opt_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|val| val.parse().ok())
}
