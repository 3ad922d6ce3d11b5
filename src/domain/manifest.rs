//! Per-tool installation manifest.
//!
//! Produced by the external agent during analysis and merely persisted here.
//! The complexity assessment mirrors what downstream aggregation consumes.

use serde::{Deserialize, Serialize};

/// Structured description of what a tool needs, produced by the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolManifest {
    /// Tool this manifest describes
    pub tool_id: String,

    /// Chosen installation method (binary_release, pip, npm, source_build, ...)
    pub installation_method: String,

    /// Number of prerequisites the procedure must provide
    pub prerequisites_count: u32,

    /// Whether installing requires compiling from source
    pub requires_compilation: bool,

    /// Agent's difficulty score, 1 (trivial) to 10 (hostile)
    pub complexity_score: u8,

    /// One-line explanation of the score
    pub complexity_summary: String,
}

impl ToolManifest {
    /// Minimal manifest for a tool with a straightforward install path.
    pub fn simple(tool_id: &str, installation_method: &str) -> Self {
        Self {
            tool_id: tool_id.to_string(),
            installation_method: installation_method.to_string(),
            prerequisites_count: 0,
            requires_compilation: false,
            complexity_score: 1,
            complexity_summary: "single-step install, no prerequisites".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_simple() {
        let manifest = ToolManifest::simple("ripgrep", "binary_release");
        assert_eq!(manifest.tool_id, "ripgrep");
        assert_eq!(manifest.installation_method, "binary_release");
        assert_eq!(manifest.prerequisites_count, 0);
        assert!(!manifest.requires_compilation);
        assert_eq!(manifest.complexity_score, 1);
    }

    #[test]
    fn test_manifest_serialization_round_trip() {
        let manifest = ToolManifest {
            tool_id: "gdal".to_string(),
            installation_method: "apt".to_string(),
            prerequisites_count: 4,
            requires_compilation: true,
            complexity_score: 7,
            complexity_summary: "native libraries plus source build".to_string(),
        };

        let json = serde_json::to_string(&manifest).unwrap();
        let back: ToolManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
    }
}
