//! Markup Reader
//!
//! Builds the navigation arena from the rendered page with html5ever. Only
//! tags, classes, ids and `href` are read; markup shape is not validated
//! beyond absence checks, and an absent navigation container means the
//! feature is simply not on this page.

use html5ever::parse_document;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use tendril::TendrilSink;

use crate::config::MarkupContract;
use crate::tree::{NavTree, NavTreeBuilder, NodeId};

lazy_static! {
    /// Targets that do not navigate anywhere: fragment-only and script links.
    static ref NON_NAVIGABLE_HREF_RE: Regex = Regex::new(r"(?i)^\s*(#|javascript:)").unwrap();

    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// What the rendered page offers to the behavior layer.
#[derive(Debug, Default)]
pub struct PageMarkup {
    pub navigation: Option<NavTree>,
    pub sidebar: SidebarMarkup,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidebarMarkup {
    pub site_container: bool,
    pub toggle: bool,
    pub toggle_mobile: bool,
}

impl SidebarMarkup {
    /// The sidebar feature needs its container; the controls are optional.
    pub fn is_present(&self) -> bool {
        self.site_container
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOM HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_html(html: &str) -> Option<RcDom> {
    match parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
    {
        Ok(dom) => Some(dom),
        Err(e) => {
            log::warn!("[ThemeNative] Failed to parse page markup: {}", e);
            None
        }
    }
}

fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attribute(handle: &Handle, attr_name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn has_class(handle: &Handle, class: &str) -> bool {
    attribute(handle, "class")
        .map(|value| value.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// First element in document order matching `pred`, including `handle` itself.
fn find_element<F>(handle: &Handle, pred: &F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    if matches!(handle.data, NodeData::Element { .. }) && pred(handle) {
        return Some(handle.clone());
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_element(child, pred) {
            return Some(found);
        }
    }
    None
}

fn text_content(handle: &Handle) -> String {
    fn collect(handle: &Handle, out: &mut String) {
        match &handle.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            _ => {
                for child in handle.children.borrow().iter() {
                    collect(child, out);
                }
            }
        }
    }

    let mut raw = String::new();
    collect(handle, &mut raw);
    WHITESPACE_RE.replace_all(raw.trim(), " ").to_string()
}

pub fn is_navigable_href(href: &str) -> bool {
    !NON_NAVIGABLE_HREF_RE.is_match(href)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAVIGATION WALK
// ═══════════════════════════════════════════════════════════════════════════════

fn walk_items(
    handle: &Handle,
    current_item: Option<NodeId>,
    contract: &MarkupContract,
    builder: &mut NavTreeBuilder,
    labelled: &mut Vec<bool>,
) {
    for child in handle.children.borrow().iter() {
        let Some(tag) = tag_name(child) else {
            continue;
        };

        if tag.eq_ignore_ascii_case(&contract.item_tag) {
            let id = builder.add_node(current_item);
            labelled.push(false);
            walk_items(child, Some(id), contract, builder, labelled);
            continue;
        }

        if let Some(item) = current_item {
            if tag == "a" {
                read_link(child, item, builder, labelled);
            }
            if has_class(child, &contract.toggle_class) {
                builder.mark_toggle(item);
            }
        }

        walk_items(child, current_item, contract, builder, labelled);
    }
}

/// The first link of an item names it; the first navigable link targets it.
fn read_link(
    link: &Handle,
    item: NodeId,
    builder: &mut NavTreeBuilder,
    labelled: &mut [bool],
) {
    if !labelled[item.index()] {
        builder.set_label(item, &text_content(link));
        labelled[item.index()] = true;
    }
    if builder.has_href(item) {
        return;
    }
    if let Some(href) = attribute(link, "href") {
        if is_navigable_href(&href) {
            builder.set_href(item, href.trim());
        }
    }
}

fn navigation_from_dom(dom: &RcDom, contract: &MarkupContract) -> Option<NavTree> {
    let container = find_element(&dom.document, &|h: &Handle| {
        has_class(h, &contract.container_class)
    });
    let Some(container) = container else {
        log::debug!(
            "[ThemeNative] No .{} on this page, navigation inert",
            contract.container_class
        );
        return None;
    };

    let mut builder = NavTree::builder();
    let mut labelled = Vec::new();
    walk_items(&container, None, contract, &mut builder, &mut labelled);
    Some(builder.build())
}

fn sidebar_from_dom(dom: &RcDom, contract: &MarkupContract) -> SidebarMarkup {
    let by_id = |id: &str| {
        find_element(&dom.document, &|h: &Handle| {
            attribute(h, "id").as_deref() == Some(id)
        })
        .is_some()
    };

    SidebarMarkup {
        site_container: find_element(&dom.document, &|h: &Handle| {
            has_class(h, &contract.site_container_class)
        })
        .is_some(),
        toggle: by_id(&contract.sidebar_toggle_id),
        toggle_mobile: by_id(&contract.sidebar_toggle_mobile_id),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the navigation tree, or `None` when the page has no navigation.
pub fn read_navigation(html: &str, contract: &MarkupContract) -> Option<NavTree> {
    let dom = parse_html(html)?;
    navigation_from_dom(&dom, contract)
}

/// Read everything the behavior layer needs from one parse.
pub fn read_page(html: &str, contract: &MarkupContract) -> PageMarkup {
    let Some(dom) = parse_html(html) else {
        return PageMarkup::default();
    };
    PageMarkup {
        navigation: navigation_from_dom(&dom, contract),
        sidebar: sidebar_from_dom(&dom, contract),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <div class="site-container">
          <button id="sidebar-toggle">Menu</button>
          <nav class="sidebar-nav">
            <ul>
              <li class="has-children">
                <a href="/guide/">Guide</a>
                <button class="nav-toggle" aria-expanded="false"></button>
                <ul class="nav-children">
                  <li><a href="/guide/setup/">Setup</a>
                    <ul><li><a href="/guide/setup/linux">Linux</a></li></ul>
                  </li>
                  <li><a href="/guide/usage">  Usage
                       guide </a></li>
                </ul>
              </li>
              <li><a href="#">Reference</a>
                <ul><li><a href="/reference/api">API</a></li></ul>
              </li>
              <li><a href="/">Home</a></li>
            </ul>
          </nav>
        </div>
    "##;

    #[test]
    fn test_reads_hierarchy_in_document_order() {
        let tree = read_navigation(PAGE, &MarkupContract::default()).unwrap();
        let keys: Vec<Option<&str>> = tree
            .iter()
            .map(|n| n.key.as_ref().map(|k| k.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                Some("/guide"),
                Some("/guide/setup"),
                Some("/guide/setup/linux"),
                Some("/guide/usage"),
                None,
                Some("/reference/api"),
                Some("/"),
            ]
        );

        let guide = tree.find_by_key("/guide").unwrap();
        let linux = tree.find_by_key("/guide/setup/linux").unwrap();
        assert_eq!(tree.roots().len(), 3);
        assert_eq!(tree.get(guide).unwrap().children.len(), 2);
        assert_eq!(tree.depth(linux), 2);
    }

    #[test]
    fn test_labels_and_toggles() {
        let tree = read_navigation(PAGE, &MarkupContract::default()).unwrap();
        let guide = tree.get(tree.find_by_key("/guide").unwrap()).unwrap();
        assert_eq!(guide.label, "Guide");
        assert!(guide.has_toggle);

        let usage = tree.get(tree.find_by_key("/guide/usage").unwrap()).unwrap();
        assert_eq!(usage.label, "Usage guide");
        assert!(!usage.has_toggle);

        let reference = tree.get(NodeId(4)).unwrap();
        assert_eq!(reference.label, "Reference");
        assert!(reference.key.is_none());
        assert!(reference.has_children());
    }

    #[test]
    fn test_missing_container_is_inert() {
        let html = "<html><body><p>No navigation here</p></body></html>";
        assert!(read_navigation(html, &MarkupContract::default()).is_none());
        assert!(read_navigation("", &MarkupContract::default()).is_none());
    }

    #[test]
    fn test_custom_contract() {
        let html = r#"
            <aside class="toc"><div class="entry"><a href="/a/">A</a>
              <div class="entry"><a href="/a/b">B</a></div></div></aside>
        "#;
        let contract = MarkupContract {
            container_class: "toc".to_string(),
            item_tag: "div".to_string(),
            ..MarkupContract::default()
        };
        let tree = read_navigation(html, &contract).unwrap();
        let b = tree.find_by_key("/a/b").unwrap();
        assert_eq!(tree.ancestors(b).count(), 1);
    }

    #[test]
    fn test_sidebar_markup() {
        let page = read_page(PAGE, &MarkupContract::default());
        assert!(page.sidebar.is_present());
        assert!(page.sidebar.toggle);
        assert!(!page.sidebar.toggle_mobile);
        assert!(page.navigation.is_some());

        let bare = read_page("<p>hi</p>", &MarkupContract::default());
        assert!(!bare.sidebar.is_present());
    }

    #[test]
    fn test_non_navigable_hrefs() {
        assert!(!is_navigable_href("#"));
        assert!(!is_navigable_href("#section"));
        assert!(!is_navigable_href("JavaScript:void(0)"));
        assert!(is_navigable_href("/guide"));
        assert!(is_navigable_href(""));
    }
}
