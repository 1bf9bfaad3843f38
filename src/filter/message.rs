//! Localized message markers
//!
//! `<img wicket:message="alt:logo.alt,title:logo.title">` turns a plain tag
//! into a component tag with the automatic id `_message_attr_<n>` so the
//! rendering layer can fill in the attributes. `<wicket:message>` must
//! name its resource key.

use super::{MarkupFilter, Upstream};
use crate::error::Result;
use crate::markup::TagBuilder;

/// Prefix of automatic ids given to tags with message attributes
pub const MESSAGE_ATTRIBUTE_ID: &str = "_message_attr_";

pub struct MessageHandler {
    counter: usize,
}

impl MessageHandler {
    pub const PRIORITY: u32 = 40;

    pub fn new() -> Self {
        MessageHandler { counter: 0 }
    }
}

impl Default for MessageHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupFilter for MessageHandler {
    fn name(&self) -> &str {
        "MessageHandler"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn next_tag(&mut self, upstream: &mut Upstream<'_, '_>) -> Result<Option<TagBuilder>> {
        let Some(mut tag) = upstream.next_tag()? else {
            return Ok(None);
        };
        if tag.is_close() {
            return Ok(Some(tag));
        }

        if upstream.context().is_reserved_named(&tag, "message") {
            if tag.attribute("key").map_or(true, |k| k.trim().is_empty()) {
                let ns = upstream.context().namespace().to_string();
                return Err(upstream.namespace_error(
                    &tag,
                    format!("<{ns}:message> requires a non-empty 'key' attribute"),
                ));
            }
            return Ok(Some(tag));
        }

        let attribute = upstream.context().attribute_name("message");
        let Some(value) = tag.attribute(&attribute) else {
            return Ok(Some(tag));
        };
        let malformed = value
            .split(',')
            .map(str::trim)
            .any(|pair| match pair.split_once(':') {
                Some((attr, key)) => attr.trim().is_empty() || key.trim().is_empty(),
                None => true,
            });
        if malformed {
            return Err(upstream.namespace_error(
                &tag,
                format!("wrong format of {attribute}: expected 'attribute:key[,attribute:key]'"),
            ));
        }
        if tag.id().is_none() {
            self.counter += 1;
            tag.set_id(format!("{MESSAGE_ATTRIBUTE_ID}{}", self.counter));
            tag.set_modified(true);
        }
        Ok(Some(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarkupError;
    use crate::filter::test_support::*;
    use crate::filter::{Filter, ReservedTagIdentifier};

    fn run(input: &str) -> Result<Vec<TagBuilder>> {
        let mut chain = chain_of(vec![
            Filter::ReservedTag(ReservedTagIdentifier::new(&[])),
            Filter::Message(MessageHandler::new()),
        ]);
        run_chain(&mut chain, input, &mut context())
    }

    #[test]
    fn test_message_attribute_gets_auto_id() {
        let tags = run("<img wicket:message=\"alt:logo\"/><a wicket:message=\"title:t\">x</a>").unwrap();
        assert_eq!(tags[0].id(), Some("_message_attr_1"));
        assert!(tags[0].is_modified());
        assert_eq!(tags[1].id(), Some("_message_attr_2"));
    }

    #[test]
    fn test_component_keeps_its_id() {
        let tags = run("<a wicket:id=\"link\" wicket:message=\"title:t\">x</a>").unwrap();
        assert_eq!(tags[0].id(), Some("link"));
    }

    #[test]
    fn test_malformed_message_attribute() {
        assert!(matches!(run("<img wicket:message=\"alt\"/>").unwrap_err(), MarkupError::Namespace { .. }));
    }

    #[test]
    fn test_message_tag_requires_key() {
        assert!(run("<wicket:message key=\"hello\">Hi</wicket:message>").is_ok());
        assert!(matches!(
            run("<wicket:message>Hi</wicket:message>").unwrap_err(),
            MarkupError::Namespace { .. }
        ));
    }
}
