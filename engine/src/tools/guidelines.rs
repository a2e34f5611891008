//! Clinical guideline lookup
//!
//! Keyword search over a small built-in knowledge base. A retrieval backend
//! can replace the table without changing the tool's contract.

use async_trait::async_trait;
use sdk::core_tool::{arg_str, expect_arity, CoreTool};
use sdk::types::ToolError;
use serde_json::Value;

pub const NO_MATCH: &str = "No specific guideline found for this query.";

struct Guideline {
    keywords: &'static [&'static str],
    text: &'static str,
}

const GUIDELINES: &[Guideline] = &[
    Guideline {
        keywords: &["BIRADS 4", "BI-RADS 4", "ACR 4", "MASS"],
        text: "GUIDELINES 2024 (HAS/ACR):\n\
               - ACR 4 (suspicious abnormality): positive predictive value for cancer between 2% and 95%.\n\
               - Required action: histological proof (core needle or vacuum-assisted biopsy).\n\
               - Radio-clinical discordance: if a mass is seen on imaging but the clinical exam or the history \
               (e.g. mastectomy) contradicts it, patient identity and image integrity must be verified.",
    },
    Guideline {
        keywords: &["MASTECTOMY"],
        text: "SURGERY GUIDELINES:\n\
               - Total mastectomy: complete removal of the mammary gland.\n\
               - Follow-up: no mammography on the operated side, except after flap reconstruction with clinical doubt.\n\
               - Error risk: an image showing abundant breast tissue on a mastectomy side indicates a record or labelling error.",
    },
];

/// Looks up clinical guidelines (`rag_tool`)
pub struct GuidelineTool;

impl GuidelineTool {
    /// First guideline whose keywords appear in the query, case-insensitively
    pub fn search(query: &str) -> &'static str {
        let query = query.to_uppercase();

        GUIDELINES
            .iter()
            .find(|g| g.keywords.iter().any(|k| query.contains(k)))
            .map(|g| g.text)
            .unwrap_or(NO_MATCH)
    }
}

#[async_trait]
impl CoreTool for GuidelineTool {
    fn name(&self) -> &str {
        "rag_tool"
    }

    fn description(&self) -> &str {
        "Searches official clinical protocols and guidelines."
    }

    fn usage(&self) -> &str {
        "[query]"
    }

    async fn invoke(&self, args: Vec<Value>) -> Result<Value, ToolError> {
        expect_arity(&args, 1)?;
        Ok(Value::String(Self::search(&arg_str(&args[0])).to_string()))
    }
}
