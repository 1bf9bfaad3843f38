//! Parallel batch parsing
//!
//! Uses Rayon to parse independent resources concurrently. Each parse
//! stays sequential; only separate resources run side by side.

use std::sync::Arc;

use rayon::prelude::*;

use super::MarkupParser;
use crate::class::ContainerInfo;
use crate::error::Result;
use crate::markup::Markup;
use crate::resource::MarkupResourceStream;

/// Parse many resources in parallel. Results keep the input order.
pub fn parse_parallel(
    parser: &MarkupParser,
    resources: &[&dyn MarkupResourceStream],
    container: Option<&ContainerInfo>,
) -> Vec<Result<Arc<Markup>>> {
    resources
        .par_iter()
        .map(|resource| parser.parse_resource(*resource, container))
        .collect()
}

/// Parse many markup strings in parallel
pub fn parse_strs_parallel(parser: &MarkupParser, inputs: &[&str]) -> Vec<Result<Arc<Markup>>> {
    inputs.par_iter().map(|input| parser.parse_str(input)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::StringResource;
    use crate::settings::MarkupSettings;

    #[test]
    fn test_parse_strs_parallel() {
        let parser = MarkupParser::new(MarkupSettings::default());
        let inputs = ["<p wicket:id=\"a\"></p>", "<a><b></a>", "<i wicket:id=\"c\"/>"];
        let results = parse_strs_parallel(&parser, &inputs);
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().is_ok_and(|m| m.find_component_index("a").is_some()));
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_parse_parallel_keeps_order() {
        let parser = MarkupParser::new(MarkupSettings::default());
        let owned: Vec<StringResource> = (0..16)
            .map(|i| StringResource::new(format!("r{i}.html"), format!("<b wicket:id=\"c{i}\">{i}</b>")))
            .collect();
        let resources: Vec<&dyn MarkupResourceStream> = owned.iter().map(|r| r as &dyn MarkupResourceStream).collect();
        let results = parse_parallel(&parser, &resources, None);
        for (i, result) in results.iter().enumerate() {
            let markup = result.as_ref().unwrap();
            assert_eq!(markup.resource().name, format!("r{i}.html"));
            assert!(markup.find_component_index(&format!("c{i}")).is_some());
        }
    }
}
