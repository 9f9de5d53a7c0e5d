//! Per-cycle target planning: which variables to build this poll, crossed
//! with each variable's forecast-hour schedule.

use capabilities::{ModelCapability, Registry};

/// Resolves the variables a poll iteration should build: the explicit
/// `--vars` list (normalized, skipping unknown/component-only vars) or, if
/// none was given, every buildable variable in the model's catalog.
pub fn resolve_vars_to_schedule(registry: &Registry, model: &ModelCapability, requested: &[String]) -> Vec<String> {
    let mut resolved = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let mut push = |var_key: String| {
        if seen.insert(var_key.clone()) {
            resolved.push(var_key);
        }
    };

    if !requested.is_empty() {
        for raw in requested {
            match registry.normalize_var_key(&model.model_id, raw) {
                Ok(key) => {
                    let var = &model.variable_catalog[&key];
                    if var.is_buildable() {
                        push(key);
                    } else {
                        tracing::info!(model = %model.model_id, var = %key, "skipping component-only var");
                    }
                }
                Err(_) => tracing::warn!(model = %model.model_id, requested = %raw, "skipping unknown var"),
            }
        }
        return resolved;
    }

    let mut keys: Vec<&String> = model.variable_catalog.keys().collect();
    keys.sort();
    for key in keys {
        if model.variable_catalog[key].is_buildable() {
            push(key.clone());
        }
    }
    resolved
}

/// Resolves the primary variables used to gate promotion, falling back to
/// `tmp2m` (or the first schedulable var) when none of the requested ones
/// resolve.
pub fn resolve_primary_vars(model: &ModelCapability, requested: &[String], schedulable: &[String]) -> Vec<String> {
    let mut resolved = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for raw in requested {
        let key = raw.to_ascii_lowercase();
        if model.variable_catalog.contains_key(&key) && seen.insert(key.clone()) {
            resolved.push(key);
        }
    }
    if resolved.is_empty() {
        if model.variable_catalog.contains_key("tmp2m") {
            resolved.push("tmp2m".to_string());
        } else if let Some(first) = schedulable.first() {
            resolved.push(first.clone());
        }
    }
    resolved
}

/// Cross-products `vars_to_build` with the model's per-cycle forecast-hour
/// schedule, honoring each variable's `min_fh`/`max_fh` constraints.
pub fn scheduled_targets_for_cycle(model: &ModelCapability, vars_to_build: &[String], cycle_hour: u32) -> Vec<(String, u32)> {
    let fhs = model.target_fhs(cycle_hour);
    let mut targets = Vec::new();
    for var_key in vars_to_build {
        let Some(var) = model.variable_catalog.get(var_key) else { continue };
        let min_fh = var.constraints.min_fh.unwrap_or(0);
        let max_fh = var.constraints.max_fh.unwrap_or(u32::MAX);
        for &fh in &fhs {
            if fh < min_fh || fh > max_fh {
                continue;
            }
            targets.push((var_key.clone(), fh));
        }
    }
    targets
}
