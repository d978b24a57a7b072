//! Component confidence scoring and workload evidence review.

use autoblueprint_common::hash;
use autoblueprint_workload_schema::{WorkloadRecord, DEFAULT_MIN_COMPONENT_CONFIDENCE};
use serde::{Deserialize, Serialize};

/// Every named component starts here.
pub const BASE_CONFIDENCE: f64 = 0.4;
/// Added when at least one discovery row has the component's name.
pub const DISCOVERY_MATCH_WEIGHT: f64 = 0.4;
pub const VERSION_WEIGHT: f64 = 0.1;
pub const TYPE_WEIGHT: f64 = 0.05;
pub const MAX_CONFIDENCE: f64 = 0.95;

/// The facts a component's confidence is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentSignals {
    pub discovery_matches: usize,
    pub has_version: bool,
    pub has_type: bool,
}

/// Score a classified component.
pub fn component_confidence(signals: ComponentSignals) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if signals.discovery_matches > 0 {
        confidence += DISCOVERY_MATCH_WEIGHT;
    }
    if signals.has_version {
        confidence += VERSION_WEIGHT;
    }
    if signals.has_type {
        confidence += TYPE_WEIGHT;
    }
    // Two decimals keeps float noise out of the artifact.
    (confidence.min(MAX_CONFIDENCE) * 100.0).round() / 100.0
}

/// Whether a component may appear in generated templates.
pub fn is_eligible(confidence: f64) -> bool {
    confidence >= DEFAULT_MIN_COMPONENT_CONFIDENCE
}

/// Stable identifier for a classified (name, version, type) triple.
/// Absent parts hash as empty strings.
pub fn component_id(name: &str, version: Option<&str>, component_type: Option<&str>) -> String {
    let digest = hash::sha256_str(&format!(
        "{}:{}:{}",
        name,
        version.unwrap_or(""),
        component_type.unwrap_or("")
    ));
    format!("cmp_{}", &digest[..12])
}

/// Evidence review for a persisted workload.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkloadReview {
    pub workload_id: String,
    pub total_components: usize,
    pub eligible_components: usize,
    pub mean_confidence: f64,
    /// Components backed only by the classifier's word.
    pub without_discovery_evidence: Vec<String>,
    /// Components the template will omit.
    pub below_threshold: Vec<String>,
    pub warnings: Vec<String>,
}

/// Summarize how well a workload's components are supported.
pub fn review_workload(workload: &WorkloadRecord) -> WorkloadReview {
    let floor = workload.iac_intent.min_component_confidence;
    let components = &workload.software_components;

    let label = |c: &autoblueprint_workload_schema::WorkloadComponent| {
        format!("[{}] {}", c.component_id, c.name)
    };

    let without_discovery_evidence: Vec<String> = components
        .iter()
        .filter(|c| !c.has_discovery_evidence())
        .map(label)
        .collect();
    let below_threshold: Vec<String> = components
        .iter()
        .filter(|c| !(c.eligible_for_iac && c.confidence >= floor))
        .map(label)
        .collect();

    let mean_confidence = if components.is_empty() {
        0.0
    } else {
        components.iter().map(|c| c.confidence).sum::<f64>() / components.len() as f64
    };

    let mut warnings = Vec::new();
    if components.is_empty() {
        warnings.push("Workload has no software components".to_string());
    }
    if !without_discovery_evidence.is_empty() {
        warnings.push(format!(
            "{} components lack discovery evidence",
            without_discovery_evidence.len()
        ));
    }
    if workload.host_spec.is_empty() {
        warnings.push("No host specs recorded, sizing falls back to template defaults".to_string());
    }

    WorkloadReview {
        workload_id: workload.metadata.workload_id.clone(),
        total_components: components.len(),
        eligible_components: components.len() - below_threshold.len(),
        mean_confidence,
        without_discovery_evidence,
        below_threshold,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(matches: usize, version: bool, kind: bool) -> ComponentSignals {
        ComponentSignals {
            discovery_matches: matches,
            has_version: version,
            has_type: kind,
        }
    }

    #[test]
    fn test_confidence_weights() {
        assert_eq!(component_confidence(signals(0, false, false)), 0.4);
        assert_eq!(component_confidence(signals(1, false, false)), 0.8);
        assert_eq!(component_confidence(signals(0, true, false)), 0.5);
        assert_eq!(component_confidence(signals(0, false, true)), 0.45);
        assert_eq!(component_confidence(signals(0, true, true)), 0.55);
        assert_eq!(component_confidence(signals(3, true, true)), 0.95);
    }

    #[test]
    fn test_confidence_monotonic_and_bounded() {
        for matches in [0, 1, 2] {
            for version in [false, true] {
                for kind in [false, true] {
                    let base = component_confidence(signals(matches, version, kind));
                    assert!((BASE_CONFIDENCE..=MAX_CONFIDENCE).contains(&base));
                    assert!(component_confidence(signals(matches + 1, version, kind)) >= base);
                    assert!(component_confidence(signals(matches, true, kind)) >= base);
                    assert!(component_confidence(signals(matches, version, true)) >= base);
                }
            }
        }
    }

    #[test]
    fn test_eligibility_requires_discovery_match() {
        assert!(!is_eligible(component_confidence(signals(0, true, true))));
        assert!(is_eligible(component_confidence(signals(1, false, false))));
        assert!(is_eligible(0.6));
    }

    #[test]
    fn test_component_id_deterministic() {
        let a = component_id("Java 17", Some("17.0.2"), Some("runtime"));
        let b = component_id("Java 17", Some("17.0.2"), Some("runtime"));
        assert_eq!(a, b);
        assert!(a.starts_with("cmp_"));
        assert_eq!(a.len(), 16);
        assert!(a[4..].chars().all(|c| c.is_ascii_hexdigit()));

        assert_ne!(a, component_id("Java 17", Some("17.0.3"), Some("runtime")));
        assert_ne!(a, component_id("Java 17", Some("17.0.2"), None));
        assert_ne!(a, component_id("Java 11", Some("17.0.2"), Some("runtime")));
    }
}
