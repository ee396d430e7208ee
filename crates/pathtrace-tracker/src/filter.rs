use pathtrace_model::choice::{ChoiceGenerator, CgKind};

/// A generator is relevant if no kinds are configured, or if its kind is
/// one of `allowed` or specializes one of them.
pub fn is_relevant(allowed: &[CgKind], cg: &dyn ChoiceGenerator) -> bool {
    let kind = cg.kind();
    allowed.is_empty() || allowed.iter().any(|ancestor| kind.is_a(*ancestor))
}

/// True if `value` starts with any non-empty exclusion prefix.
pub fn is_excluded(excludes: &[String], value: &str) -> bool {
    excludes
        .iter()
        .any(|prefix| !prefix.is_empty() && value.starts_with(prefix.as_str()))
}
