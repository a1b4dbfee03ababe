//! Case folding of desired entries.
//!
//! GitHub treats environment and variable names case-insensitively (variables are even
//! reported upper-cased), so names are lowercased once, before any comparison or API call.

use crate::EnvironmentEntry;

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;

/// Lowercases the environment name and every variable name of an entry.
pub fn normalize_entry(entry: &mut EnvironmentEntry) {
    entry.name = entry.name.to_lowercase();
    if let Some(variables) = entry.variables.as_mut() {
        for variable in variables {
            variable.name = variable.name.to_lowercase();
        }
    }
}

/// Normalizes every entry of a desired-state list.
pub fn normalize_entries(mut entries: Vec<EnvironmentEntry>) -> Vec<EnvironmentEntry> {
    entries.iter_mut().for_each(normalize_entry);
    entries
}
