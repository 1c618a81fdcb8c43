//! Output formatting for transform results.

use crate::cli::OutputFormat;
use miette::{IntoDiagnostic, Result};
use sfc_transform::TransformOutput;

/// Render a transform result.
pub fn render(output: &TransformOutput, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(output).into_diagnostic(),
        OutputFormat::Code => Ok(output.code.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render() {
        let output = TransformOutput {
            code: "exports.default = {}\n".to_string(),
            map: "{\"version\":3}".to_string(),
        };
        assert_eq!(render(&output, OutputFormat::Code).unwrap(), output.code);

        let json: serde_json::Value =
            serde_json::from_str(&render(&output, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["map"], "{\"version\":3}");
    }
}
