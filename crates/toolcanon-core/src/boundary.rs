//! Host-facing response: structured data plus a text summary.

use serde::{Deserialize, Serialize};

use crate::compact::{compact, CompactionConfig};
use crate::domain::error::Result;
use crate::domain::result::CanonicalResult;
use crate::present;
use crate::validate::{validate_canonical, validate_compact};

/// Which projection the caller wants.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    Full,
    #[default]
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub representation: Representation,
    pub success: bool,
    /// The serialized canonical or compact result.
    pub data: serde_json::Value,
    /// Rendered text of the same result.
    pub summary: String,
}

/// Validate `result`, project it and render both the structured data and the
/// text summary from the same projection.
pub fn respond(
    result: &CanonicalResult,
    representation: Representation,
    cfg: &CompactionConfig,
) -> Result<Response> {
    validate_canonical(result)?;
    let (data, summary) = match representation {
        Representation::Full => (serde_json::to_value(result)?, present::render_canonical(result)),
        Representation::Compact => {
            let compacted = compact(result, cfg);
            validate_compact(&compacted, result)?;
            (
                serde_json::to_value(&compacted)?,
                present::render_compact(&compacted),
            )
        }
    };
    Ok(Response {
        representation,
        success: result.success,
        data,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::CanonError;
    use crate::domain::raw::RawOutput;
    use crate::domain::result::{Children, InputFormat, InvocationContext, ResultKind};

    fn empty_build() -> CanonicalResult {
        CanonicalResult::new(
            Children::empty(ResultKind::Diagnostics),
            InvocationContext::from_raw("go-build", &RawOutput::stdout("", 0), InputFormat::None),
        )
    }

    #[test]
    fn test_compact_response_omits_empty_diagnostics() {
        let resp = respond(&empty_build(), Representation::Compact, &CompactionConfig::default())
            .expect("respond");
        assert!(resp.success);
        assert!(resp.data["children"].get("diagnostics").is_none());
        assert_eq!(resp.data["counts"]["total"], 0);
        assert_eq!(resp.data["counts"]["errors"], 0);
        assert!(resp.summary.starts_with("go-build: ok"));
    }

    #[test]
    fn test_full_response_carries_children() {
        let resp = respond(&empty_build(), Representation::Full, &CompactionConfig::default())
            .expect("respond");
        assert!(resp.data["children"]["diagnostics"].is_array());
        assert!(resp.data.get("strategies").is_none());
    }

    #[test]
    fn test_invalid_result_is_fatal() {
        let mut bad = empty_build();
        bad.success = false;
        let err = respond(&bad, Representation::Full, &CompactionConfig::default())
            .expect_err("validation must fail");
        assert!(matches!(err, CanonError::Validation(_)));
    }
}
