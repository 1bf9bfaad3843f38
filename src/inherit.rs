//! Markup inheritance
//!
//! A derived markup containing `<wicket:extend>` is merged into the markup
//! of its base class: the extend body replaces the body of the base's
//! `<wicket:child>` anchor.
//!
//! ```text
//! base:     <html><body onload="b"><wicket:child/></body></html>
//! derived:  <wicket:head>..</wicket:head><body onload="a"><wicket:extend><p>X</p></wicket:extend>
//! merged:   <html><head><wicket:head>..</wicket:head></head>
//!           <body onload="a;b"><wicket:child><p>X</p></wicket:child></body></html>
//! ```
//!
//! The merge works on the flattened, thawed items of both markups and
//! rebuilds the fragment tree at the end, so neither input is touched and
//! all close tags are linked to the merged open tags. Plain tags the merge
//! must edit or anchor on (`<body>`, `<head>`) are looked up inside raw
//! text as well, since they are only cut out of the text when a filter
//! accepted them.

use std::sync::Arc;

use crate::core::tokenizer::Tokenizer;
use crate::error::{InheritanceError, Result};
use crate::filter::header::HEADER_ID;
use crate::markup::{Markup, RawMarkup, TagBuilder, TagInfo, TagKind};
use crate::parser::tree::{build_tree, to_items, FlatItem};

/// Body attributes whose values are concatenated instead of overwritten
const UNION_ATTRIBUTES: &[&str] = &["onload", "onunload"];

/// True if the markup extends a base markup
pub fn is_inherited(markup: &Markup) -> bool {
    markup
        .flatten()
        .iter()
        .filter_map(|e| e.as_tag())
        .any(|t| is_reserved(t, "extend") && !t.is_close())
}

fn is_reserved(tag: &TagInfo, name: &str) -> bool {
    tag.is_reserved() && tag.name().eq_ignore_ascii_case(name)
}

fn is_plain(tag: &TagInfo, name: &str, kind: TagKind) -> bool {
    tag.kind() == kind && tag.has_name(None, name)
}

/// Merge `derived` into `base`.
///
/// `page` says whether the owning class is a page, in which case a
/// `<head>` is synthesized around relocated header contributions when the
/// base has none. The result is attributed to the derived resource.
pub fn merge(derived: &Markup, base: &Markup, page: bool) -> Result<Arc<Markup>> {
    let mut derived_items = to_items(derived.root());
    stamp(&mut derived_items, derived.markup_class());
    let mut base_items = to_items(base.root());
    stamp(&mut base_items, base.markup_class());

    let Some((extend_open, extend_close)) = find_extend(&derived_items, derived)? else {
        return Ok(Arc::new(derived.deep_copy()));
    };
    let heads = collect_heads(&derived_items, extend_open, extend_close);

    union_body_attributes(&derived_items, &mut base_items, derived.markup_class());
    relocate_heads(&mut base_items, heads, page, derived.markup_class());

    let children: Vec<FlatItem> = match extend_close {
        Some(close) => derived_items[extend_open + 1..close].to_vec(),
        None => Vec::new(),
    };
    let child_count = children.len();
    splice_into_child(&mut base_items, children, base)?;

    let root = build_tree(base_items, derived.markup_class().map(str::to_string), "")?;
    let merged = base.with_root(root, derived.resource().clone());
    tracing::debug!(
        derived = %derived.resource().name,
        base = %base.resource().name,
        children = child_count,
        "merged inherited markup"
    );
    Ok(Arc::new(merged))
}

/// Stamp every tag that has no markup class yet with `class`
fn stamp(items: &mut [FlatItem], class: Option<&str>) {
    let Some(class) = class else {
        return;
    };
    for tag in items.iter_mut().filter_map(FlatItem::as_tag_mut) {
        if tag.markup_class().is_none() {
            tag.set_markup_class(class);
        }
    }
}

/// Index of the matching close of the reserved region opened at `open`
fn region_end(items: &[FlatItem], open: usize, name: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, item) in items.iter().enumerate().skip(open) {
        let Some(tag) = item.as_tag() else {
            continue;
        };
        if !is_reserved(tag, name) {
            continue;
        }
        if tag.is_open() {
            depth += 1;
        } else if tag.is_close() {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Locate `<ns:extend>`: its open index and (unless open-close) its close
/// index. Only `<ns:head>` regions may come before it.
fn find_extend(items: &[FlatItem], derived: &Markup) -> Result<Option<(usize, Option<usize>)>> {
    let Some(open) = items
        .iter()
        .position(|i| i.as_tag().is_some_and(|t| is_reserved(t, "extend") && !t.is_close()))
    else {
        return Ok(None);
    };

    let mut i = 0;
    while i < open {
        if let Some(tag) = items[i].as_tag() {
            if is_reserved(tag, "head") {
                if tag.is_open() {
                    i = region_end(items, i, "head").unwrap_or(i);
                }
            } else if tag.is_reserved() {
                return Err(InheritanceError::MisplacedExtend {
                    resource: derived.resource().name.clone(),
                    namespace: derived.namespace().to_string(),
                    found: tag.name().to_string(),
                }
                .into());
            }
        }
        i += 1;
    }

    let close = match items[open].as_tag() {
        Some(tag) if tag.is_open_close() => None,
        _ => region_end(items, open, "extend"),
    };
    Ok(Some((open, close)))
}

/// `<ns:head>` regions of the derived markup outside the extend region
fn collect_heads(items: &[FlatItem], extend_open: usize, extend_close: Option<usize>) -> Vec<FlatItem> {
    let extend_end = extend_close.unwrap_or(extend_open);
    let mut heads = Vec::new();
    let mut i = 0;
    while i < items.len() {
        if (extend_open..=extend_end).contains(&i) {
            i = extend_end + 1;
            continue;
        }
        match items[i].as_tag() {
            Some(tag) if is_reserved(tag, "head") && tag.is_open_close() => {
                heads.push(items[i].clone());
            }
            Some(tag) if is_reserved(tag, "head") && tag.is_open() => {
                let end = region_end(items, i, "head").unwrap_or(i);
                heads.extend_from_slice(&items[i..=end]);
                i = end;
            }
            _ => {}
        }
        i += 1;
    }
    heads
}

/// Tags found in raw markup text, in order. Scanning stops at the first
/// malformed tag.
fn tags_in_raw(text: &str) -> Vec<TagBuilder> {
    let mut tokenizer = Tokenizer::new(text);
    let mut tags = Vec::new();
    while let Ok(Some(tag)) = tokenizer.next_tag() {
        tags.push(tag);
    }
    tags
}

/// Find the first tag at or after `from` satisfying `pred`, whether it was
/// accepted or is still part of raw text. A tag found in raw text is split
/// out: with `promote` it becomes an item of its own, otherwise the raw
/// text is only split right before it. Returns the index of the tag item,
/// or of the raw item starting with the tag.
fn find_tag(items: &mut Vec<FlatItem>, from: usize, promote: bool, pred: &dyn Fn(&TagInfo) -> bool) -> Option<usize> {
    for i in from..items.len() {
        let found = match &items[i] {
            FlatItem::Tag(tag) if pred(&**tag) => return Some(i),
            FlatItem::Tag(_) => continue,
            FlatItem::Raw(raw) => tags_in_raw(raw.as_str())
                .into_iter()
                .find(|t| pred(&**t))
                .map(|tag| (raw.as_str().to_string(), tag)),
        };
        let Some((text, tag)) = found else {
            continue;
        };

        let mut replacement = Vec::with_capacity(3);
        let before = &text[..tag.pos()];
        if !before.is_empty() {
            replacement.push(FlatItem::Raw(RawMarkup::new(before)));
        }
        let at = i + replacement.len();
        if promote {
            let after = &text[tag.end()..];
            replacement.push(FlatItem::Tag(tag));
            if !after.is_empty() {
                replacement.push(FlatItem::Raw(RawMarkup::new(after)));
            }
        } else {
            replacement.push(FlatItem::Raw(RawMarkup::new(&text[tag.pos()..])));
        }
        items.splice(i..=i, replacement);
        return Some(at);
    }
    None
}

/// Concatenate `onload`/`onunload` of the derived `<body>` in front of the
/// base's values
fn union_body_attributes(derived: &[FlatItem], base: &mut Vec<FlatItem>, class: Option<&str>) {
    let is_body = |t: &TagInfo| is_plain(t, "body", TagKind::Open);
    let derived_body = derived.iter().find_map(|item| match item {
        FlatItem::Tag(tag) if is_body(&**tag) => Some(tag.clone()),
        FlatItem::Tag(_) => None,
        FlatItem::Raw(raw) => tags_in_raw(raw.as_str()).into_iter().find(|t| is_body(&**t)),
    });
    let Some(derived_body) = derived_body else {
        return;
    };
    let wanted: Vec<(&str, &str)> = UNION_ATTRIBUTES
        .iter()
        .filter_map(|name| derived_body.attribute(name).map(|value| (*name, value)))
        .collect();
    if wanted.is_empty() {
        return;
    }

    let Some(open) = find_tag(base, 0, true, &is_body) else {
        return;
    };
    // A body promoted out of raw text needs its close tag promoted as well
    let promoted = base[open].as_tag().is_some_and(|t| t.id().is_none() && !t.is_modified());
    if promoted {
        find_tag(base, open + 1, true, &|t| is_plain(t, "body", TagKind::Close));
    }

    let Some(body) = base[open].as_tag_mut() else {
        return;
    };
    for (name, value) in wanted {
        let merged = match body.attribute(name) {
            Some(existing) if value.ends_with(';') => format!("{value}{existing}"),
            Some(existing) => format!("{value};{existing}"),
            None => value.to_string(),
        };
        body.set_attribute(name, merged);
    }
    if let Some(class) = class {
        if body.markup_class().is_none() {
            body.set_markup_class(class);
        }
    }
}

/// Insert the derived header contributions into the base
fn relocate_heads(base: &mut Vec<FlatItem>, heads: Vec<FlatItem>, page: bool, class: Option<&str>) {
    if heads.is_empty() {
        return;
    }

    let after_base_heads = base.iter().rposition(|item| {
        item.as_tag()
            .is_some_and(|t| is_reserved(t, "head") && (t.is_close() || t.is_open_close()))
    });
    if let Some(last) = after_base_heads {
        base.splice(last + 1..last + 1, heads);
        return;
    }

    let has_head = find_tag(base, 0, false, &|t| is_plain(t, "head", TagKind::Open)).is_some();
    let at = find_tag(base, 0, false, &|t| is_plain(t, "head", TagKind::Close))
        .or_else(|| find_tag(base, 0, false, &|t| is_plain(t, "body", TagKind::Open)))
        .unwrap_or(0);

    if page && !has_head {
        let mut open = TagBuilder::new(TagKind::Open, None, "head");
        open.set_id(HEADER_ID);
        if let Some(class) = class {
            open.set_markup_class(class);
        }
        let close = open.synthesize_close();
        let mut wrapped = Vec::with_capacity(heads.len() + 2);
        wrapped.push(FlatItem::Tag(open));
        wrapped.extend(heads);
        wrapped.push(FlatItem::Tag(close));
        base.splice(at..at, wrapped);
    } else {
        base.splice(at..at, heads);
    }
}

/// Replace the body of the base's `<ns:child>` anchor with `children`
fn splice_into_child(base_items: &mut Vec<FlatItem>, children: Vec<FlatItem>, base: &Markup) -> Result<()> {
    // A merged base still carries the child markers of its own bases; the
    // anchor is the one contributed by the base class itself
    let is_child = |i: &FlatItem| i.as_tag().is_some_and(|t| is_reserved(t, "child") && !t.is_close());
    let own = base_items.iter().rposition(|i| {
        is_child(i) && i.as_tag().and_then(|t| t.markup_class()) == base.markup_class()
    });
    let Some(open) = own.or_else(|| base_items.iter().rposition(is_child)) else {
        return Err(InheritanceError::MissingChild {
            resource: base.resource().name.clone(),
            namespace: base.namespace().to_string(),
        }
        .into());
    };

    let close = match base_items[open].as_tag_mut() {
        Some(tag) if tag.is_open_close() => {
            tag.set_kind(TagKind::Open);
            let close = tag.synthesize_close();
            base_items.insert(open + 1, FlatItem::Tag(close));
            open + 1
        }
        _ => match region_end(base_items, open, "child") {
            Some(close) => close,
            None => {
                return Err(InheritanceError::MissingChild {
                    resource: base.resource().name.clone(),
                    namespace: base.namespace().to_string(),
                }
                .into())
            }
        },
    };
    base_items.splice(open + 1..close, children);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassKind, ContainerInfo, MarkupClass};
    use crate::error::MarkupError;
    use crate::markup::MarkupElement;
    use crate::parser::MarkupParser;
    use crate::resource::{ResourceInfo, StringResource};
    use crate::settings::MarkupSettings;

    fn parse(name: &str, class: &str, text: &str) -> Arc<Markup> {
        let resource = StringResource::new(name, text)
            .with_info(ResourceInfo::named(name).with_markup_class(class));
        MarkupParser::new(MarkupSettings::default())
            .parse_resource(&resource, None)
            .unwrap()
    }

    fn parse_page(class: &Arc<MarkupClass>, text: &str) -> Arc<Markup> {
        let resource = StringResource::new(format!("{}.html", class.name()), text);
        MarkupParser::new(MarkupSettings::default())
            .parse_resource(&resource, Some(&ContainerInfo::new(class.clone())))
            .unwrap()
    }

    #[test]
    fn test_one_level_merge() {
        let base = parse("Base.html", "Base", "<html><wicket:child/></html>");
        let derived = parse("Derived.html", "Derived", "<wicket:extend><p>X</p></wicket:extend>");
        assert!(is_inherited(&derived));
        assert!(!is_inherited(&base));

        let merged = merge(&derived, &base, false).unwrap();
        assert_eq!(merged.to_stripped_string(), "<html><p>X</p></html>");
        assert_eq!(merged.resource().name, "Derived.html");
        assert_eq!(base.to_markup_string(), "<html><wicket:child/></html>");
    }

    #[test]
    fn test_placeholder_content_replaced() {
        let base = parse("Base.html", "Base", "<div><wicket:child>placeholder</wicket:child></div>");
        let derived = parse("Derived.html", "Derived", "<wicket:extend>real</wicket:extend>");
        let merged = merge(&derived, &base, false).unwrap();
        assert_eq!(merged.to_markup_string(), "<div><wicket:child>real</wicket:child></div>");
    }

    #[test]
    fn test_onload_union() {
        let base_class = Arc::new(MarkupClass::new("BasePage", ClassKind::Page));
        let derived_class = Arc::new(MarkupClass::extending("DerivedPage", ClassKind::Page, base_class.clone()));
        let base = parse_page(&base_class, "<html><body onload=\"b\"><wicket:child/></body></html>");
        let derived = parse_page(
            &derived_class,
            "<html><body onload=\"a\"><wicket:extend>x</wicket:extend></body></html>",
        );
        let merged = merge(&derived, &base, true).unwrap();
        let body = merged
            .flatten()
            .iter()
            .filter_map(MarkupElement::as_tag)
            .find(|t| t.name() == "body" && t.is_open())
            .unwrap();
        assert_eq!(body.attribute("onload"), Some("a;b"));
    }

    #[test]
    fn test_onload_union_in_raw_body() {
        let base = parse("Base.html", "Base", "<html><body onunload=\"b()\"><wicket:child/></body></html>");
        let derived = parse(
            "Derived.html",
            "Derived",
            "<html><body onunload=\"a();\"><wicket:extend>x</wicket:extend></body></html>",
        );
        let merged = merge(&derived, &base, false).unwrap();
        assert_eq!(
            merged.to_stripped_string(),
            "<html><body onunload=\"a();b()\">x</body></html>"
        );
    }

    #[test]
    fn test_heads_relocated_before_head_close() {
        let base = parse(
            "Base.html",
            "Base",
            "<html><head><title>T</title></head><body><wicket:child/></body></html>",
        );
        let derived = parse(
            "Derived.html",
            "Derived",
            "<wicket:head><style>p{}</style></wicket:head><wicket:extend>x</wicket:extend>",
        );
        let merged = merge(&derived, &base, false).unwrap();
        assert_eq!(
            merged.to_stripped_string(),
            "<html><head><title>T</title><style>p{}</style></head><body>x</body></html>"
        );
    }

    #[test]
    fn test_heads_follow_base_heads() {
        let base = parse(
            "Base.html",
            "Base",
            "<wicket:head><b>1</b></wicket:head><wicket:panel><wicket:child/></wicket:panel>",
        );
        let derived = parse(
            "Derived.html",
            "Derived",
            "<wicket:head><i>2</i></wicket:head><wicket:extend>x</wicket:extend>",
        );
        let merged = merge(&derived, &base, false).unwrap();
        assert_eq!(merged.to_stripped_string(), "<b>1</b><i>2</i>x");
    }

    #[test]
    fn test_page_without_head_gets_one() {
        let base = parse("Base.html", "Base", "<html><body><wicket:child/></body></html>");
        let derived = parse(
            "Derived.html",
            "Derived",
            "<wicket:head><meta x=\"1\"></wicket:head><wicket:extend>x</wicket:extend>",
        );
        let merged = merge(&derived, &base, true).unwrap();
        assert_eq!(
            merged.to_stripped_string(),
            "<html><head><meta x=\"1\"></head><body>x</body></html>"
        );
        assert!(merged.find_component_index(HEADER_ID).is_some());
    }

    #[test]
    fn test_missing_child_fails() {
        let base = parse("Base.html", "Base", "<html></html>");
        let derived = parse("Derived.html", "Derived", "<wicket:extend>x</wicket:extend>");
        let err = merge(&derived, &base, false).unwrap_err();
        assert!(matches!(err, MarkupError::Inheritance(InheritanceError::MissingChild { .. })));
    }

    #[test]
    fn test_misplaced_extend_fails() {
        let base = parse("Base.html", "Base", "<wicket:child/>");
        let derived = parse(
            "Derived.html",
            "Derived",
            "<wicket:panel>p</wicket:panel><wicket:extend>x</wicket:extend>",
        );
        let err = merge(&derived, &base, false).unwrap_err();
        assert!(matches!(
            err,
            MarkupError::Inheritance(InheritanceError::MisplacedExtend { ref found, .. }) if found == "panel"
        ));
    }

    #[test]
    fn test_tags_stamped_with_origin_class() {
        let base = parse("Base.html", "Base", "<div wicket:id=\"outer\"><wicket:child/></div>");
        let derived = parse(
            "Derived.html",
            "Derived",
            "<wicket:extend><span wicket:id=\"inner\"></span></wicket:extend>",
        );
        let merged = merge(&derived, &base, false).unwrap();
        let outer = merged.root().find_fragment(|t| t.id() == Some("outer")).unwrap();
        let inner = merged.root().find_fragment(|t| t.id() == Some("inner")).unwrap();
        assert_eq!(outer.markup_class(), Some("Base"));
        assert_eq!(inner.markup_class(), Some("Derived"));
        assert_eq!(inner.tag().unwrap().markup_class(), Some("Derived"));
        assert!(merged.find_component_index("outer/_child/inner").is_some());
    }

    #[test]
    fn test_merge_into_merged_base_uses_own_anchor() {
        let a = parse("A.html", "A", "<main><wicket:child/></main>");
        let b = parse("B.html", "B", "<wicket:extend><nav><wicket:child/></nav></wicket:extend>");
        let c = parse("C.html", "C", "<wicket:extend>c</wicket:extend>");
        let ab = merge(&b, &a, false).unwrap();
        assert_eq!(ab.markup_class(), Some("B"));
        let abc = merge(&c, &ab, false).unwrap();
        assert_eq!(abc.to_stripped_string(), "<main><nav>c</nav></main>");
    }

    #[test]
    fn test_merged_close_tags_link_to_merged_opens() {
        let base = parse("Base.html", "Base", "<div wicket:id=\"a\"><wicket:child/></div>");
        let derived = parse("Derived.html", "Derived", "<wicket:extend>y</wicket:extend>");
        let merged = merge(&derived, &base, false).unwrap();
        let div = merged.root().find_fragment(|t| t.id() == Some("a")).unwrap();
        assert!(div.close_tag().unwrap().closes(div.tag().unwrap()));
    }
}
