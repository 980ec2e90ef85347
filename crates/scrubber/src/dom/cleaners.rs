// ABOUTME: Rule-driven DOM cleaners: the seven ordered sanitization stages applied to a DocumentTree.
// ABOUTME: Comments, empty tags, scripts, styles, attributes, excluded selectors, excluded tags, in that order.

use anyhow::anyhow;
use dom_query::NodeRef;
use tracing::debug;

use super::compiled::CompiledSelectors;
use super::DocumentTree;
use crate::error::ScrubError;
use crate::options::Ruleset;

const SCRIPT_TAG: &str = "script";
const STYLE_TAG: &str = "style";

/// What each stage removed during one [`sanitize`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub comments: usize,
    pub empty_tags: usize,
    pub scripts: usize,
    pub styles: usize,
    pub attributes: usize,
    pub selector_matches: usize,
    pub excluded_tags: usize,
}

impl CleanReport {
    /// Total number of nodes and attributes removed.
    pub fn total(&self) -> usize {
        self.comments
            + self.empty_tags
            + self.scripts
            + self.styles
            + self.attributes
            + self.selector_matches
            + self.excluded_tags
    }
}

/// Apply every enabled stage to the tree, in fixed order.
///
/// Later stages see the tree as left by earlier ones. The only failure is an
/// unparsable entry in `excluded_selectors`; stages before it have already
/// mutated the tree when that happens.
pub fn sanitize(tree: &mut DocumentTree, rules: &Ruleset) -> Result<CleanReport, ScrubError> {
    let compiled = CompiledSelectors::compile(&rules.excluded_selectors);
    sanitize_with(tree, rules, &compiled)
}

/// Like [`sanitize`], reading selectors from a set compiled ahead of time.
pub fn sanitize_with(
    tree: &mut DocumentTree,
    rules: &Ruleset,
    compiled: &CompiledSelectors,
) -> Result<CleanReport, ScrubError> {
    let mut report = CleanReport::default();

    if rules.remove_comments {
        report.comments = strip_comments(tree);
        debug!(removed = report.comments, "stripped comments");
    }

    if rules.remove_empty_tags {
        report.empty_tags = prune_empty_tags(tree);
        debug!(removed = report.empty_tags, "pruned empty tags");
    }

    if rules.remove_scripts {
        report.scripts = remove_tag(tree, SCRIPT_TAG);
        debug!(removed = report.scripts, "removed scripts");
    }

    if rules.remove_styles {
        report.styles = remove_tag(tree, STYLE_TAG);
        debug!(removed = report.styles, "removed styles");
    }

    // Full removal wins over the partial list
    if rules.remove_attributes {
        report.attributes = strip_all_attributes(tree);
        debug!(removed = report.attributes, "stripped all attributes");
    } else if !rules.excluded_attributes.is_empty() {
        report.attributes = strip_attributes(tree, &rules.excluded_attributes);
        debug!(removed = report.attributes, "stripped excluded attributes");
    }

    if !rules.excluded_selectors.is_empty() {
        report.selector_matches = remove_selectors(tree, &rules.excluded_selectors, compiled)?;
        debug!(removed = report.selector_matches, "removed excluded selectors");
    }

    if !rules.excluded_tags.is_empty() {
        report.excluded_tags = rules
            .excluded_tags
            .iter()
            .map(|tag| remove_tag(tree, tag))
            .sum();
        debug!(removed = report.excluded_tags, "removed excluded tags");
    }

    Ok(report)
}

/// Remove every comment node, at any depth. Returns how many were removed.
pub fn strip_comments(tree: &mut DocumentTree) -> usize {
    let comments: Vec<NodeRef> = tree
        .root()
        .descendants()
        .into_iter()
        .filter(|n| n.is_comment())
        .collect();

    for node in &comments {
        node.remove_from_parent();
    }
    comments.len()
}

/// True when an element has no element children and no non-whitespace text.
fn is_empty_element(node: &NodeRef) -> bool {
    let has_element_child = node.children().into_iter().any(|c| c.is_element());
    !has_element_child && node.text().trim().is_empty()
}

/// Remove empty elements in one top-down pass.
///
/// The element list is captured before anything is removed and each element is
/// tested once, in document order. A parent is tested before its children, so
/// a parent emptied by this pass survives until the next run. Void elements
/// such as `<br>` and `<img>` have no children and no text, so they count as
/// empty.
pub fn prune_empty_tags(tree: &mut DocumentTree) -> usize {
    let candidates = tree.elements();
    let mut removed = 0;

    for node in &candidates {
        if is_empty_element(node) {
            node.remove_from_parent();
            removed += 1;
        }
    }
    removed
}

/// Remove every element with the given tag name, subtree included.
///
/// Names compare ASCII case-insensitively, since the parser lowercases HTML tag names.
pub fn remove_tag(tree: &mut DocumentTree, tag: &str) -> usize {
    let matches: Vec<NodeRef> = tree
        .elements()
        .into_iter()
        .filter(|n| n.node_name().is_some_and(|name| name.eq_ignore_ascii_case(tag)))
        .collect();

    for node in &matches {
        node.remove_from_parent();
    }
    matches.len()
}

/// Strip every attribute from every element. Returns the number of attributes removed.
pub fn strip_all_attributes(tree: &mut DocumentTree) -> usize {
    let mut removed = 0;
    for node in tree.elements() {
        let count = node.attrs().len();
        if count > 0 {
            node.remove_all_attrs();
            removed += count;
        }
    }
    removed
}

/// Strip the named attributes from every element that carries them.
///
/// Elements without a named attribute are left alone.
pub fn strip_attributes(tree: &mut DocumentTree, names: &[String]) -> usize {
    let mut removed = 0;
    for node in tree.elements() {
        for name in names {
            if node.has_attr(name) {
                node.remove_attr(name);
                removed += 1;
            }
        }
    }
    removed
}

/// Remove every subtree matched by each selector, in list order.
///
/// Each selector runs against the tree left by the previous one. Fails on the
/// first selector that does not parse.
pub fn remove_selectors(
    tree: &mut DocumentTree,
    selectors: &[String],
    compiled: &CompiledSelectors,
) -> Result<usize, ScrubError> {
    let mut removed = 0;

    for css in selectors {
        let matcher = compiled
            .get(css)
            .map_err(|msg| ScrubError::stage("ExcludedSelectors", Some(anyhow!(msg))))?;

        let matched = tree.document().select_matcher(&matcher);
        removed += matched.length();
        matched.remove();
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rules() -> Ruleset {
        Ruleset::default()
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_ruleset_leaves_document_untouched() {
        let input = "<p>Hello <!--c--><b></b></p>";
        let before = DocumentTree::parse(input).to_html();

        let mut tree = DocumentTree::parse(input);
        let report = sanitize(&mut tree, &rules()).unwrap();

        assert_eq!(report.total(), 0);
        assert_eq!(tree.to_html(), before);
    }

    #[test]
    fn strips_comments_at_every_depth() {
        let mut tree =
            DocumentTree::parse("<!--top--><div><!--a--><p>text<!--b--><span><!--c--></span></p></div>");
        let removed = strip_comments(&mut tree);

        assert_eq!(removed, 4);
        assert_eq!(tree.comment_count(), 0);
        assert!(tree.to_html().contains("<p>text<span></span></p>"));
    }

    #[test]
    fn empty_tag_pruning_is_single_pass() {
        let mut tree = DocumentTree::parse("<div><p></p></div>");
        prune_empty_tags(&mut tree);

        // The <p> goes; the <div> was tested while it still held the <p>
        assert_eq!(tree.count("p"), 0);
        assert_eq!(tree.count("div"), 1);
        assert!(tree.to_html().contains("<div></div>"));

        // A second run removes the now-empty parent
        prune_empty_tags(&mut tree);
        assert_eq!(tree.count("div"), 0);
    }

    #[test]
    fn whitespace_only_elements_are_empty() {
        let mut tree = DocumentTree::parse("<ul><li>  \n </li><li>keep</li></ul>");
        prune_empty_tags(&mut tree);

        assert_eq!(tree.count("li"), 1);
        assert!(tree.to_html().contains("<li>keep</li>"));
    }

    #[test]
    fn elements_with_text_survive_pruning() {
        let mut tree = DocumentTree::parse("<div><span>x</span><b></b></div>");
        let removed = prune_empty_tags(&mut tree);

        assert_eq!(removed, 2); // <b> plus the empty <head>
        assert_eq!(tree.count("span"), 1);
        assert_eq!(tree.count("b"), 0);
    }

    #[test]
    fn void_elements_count_as_empty() {
        let mut tree = DocumentTree::parse("<p>line<br>next</p><img src=\"a.png\">");
        prune_empty_tags(&mut tree);

        assert_eq!(tree.count("br"), 0);
        assert_eq!(tree.count("img"), 0);
        assert_eq!(tree.count("p"), 1);
    }

    #[test]
    fn removes_scripts_and_styles_with_subtrees() {
        let mut tree = DocumentTree::parse(
            "<head><style>p{color:red}</style></head><body><p>keep</p><script>alert(1)</script></body>",
        );
        let r = Ruleset {
            remove_scripts: true,
            remove_styles: true,
            ..rules()
        };
        let report = sanitize(&mut tree, &r).unwrap();

        assert_eq!(report.scripts, 1);
        assert_eq!(report.styles, 1);
        let html = tree.to_html();
        assert!(!html.contains("alert"));
        assert!(!html.contains("color:red"));
        assert!(html.contains("<p>keep</p>"));
    }

    #[test]
    fn full_attribute_removal_wins_over_partial_list() {
        let mut tree = DocumentTree::parse(r#"<a href="/x" class="c" data-id="1">l</a>"#);
        let r = Ruleset {
            remove_attributes: true,
            excluded_attributes: list(&["class"]),
            ..rules()
        };
        let report = sanitize(&mut tree, &r).unwrap();

        assert_eq!(report.attributes, 3);
        assert!(tree.to_html().contains("<a>l</a>"));
    }

    #[test]
    fn partial_attribute_removal_keeps_unnamed_attributes() {
        let mut tree =
            DocumentTree::parse(r#"<a href="/x" class="c" onclick="go()">l</a><p class="d">t</p>"#);
        let removed = strip_attributes(&mut tree, &list(&["class", "onclick"]));

        assert_eq!(removed, 3);
        let html = tree.to_html();
        assert!(html.contains(r#"<a href="/x">l</a>"#));
        assert!(html.contains("<p>t</p>"));
    }

    #[test]
    fn missing_attribute_is_a_noop() {
        let input = r#"<p id="a">t</p>"#;
        let before = DocumentTree::parse(input).to_html();
        let mut tree = DocumentTree::parse(input);

        assert_eq!(strip_attributes(&mut tree, &list(&["data-missing"])), 0);
        assert_eq!(tree.to_html(), before);
    }

    #[test]
    fn selectors_run_in_order_against_mutated_tree() {
        let mut tree = DocumentTree::parse(
            r#"<div class="ad"><p class="promo">x</p></div><p class="promo">y</p><p>z</p>"#,
        );
        let compiled = CompiledSelectors::compile([".ad", ".promo"]);
        let removed = remove_selectors(&mut tree, &list(&[".ad", ".promo"]), &compiled).unwrap();

        // The nested .promo left with its .ad parent, so the second selector matches one node
        assert_eq!(removed, 2);
        assert_eq!(tree.count("p"), 1);
        assert!(tree.to_html().contains("<p>z</p>"));
    }

    #[test]
    fn selector_matching_nothing_is_a_noop() {
        let input = "<p>t</p>";
        let before = DocumentTree::parse(input).to_html();
        let mut tree = DocumentTree::parse(input);

        let removed =
            remove_selectors(&mut tree, &list(&["aside.missing"]), &CompiledSelectors::new()).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(tree.to_html(), before);
    }

    #[test]
    fn invalid_selector_is_a_stage_error() {
        let mut tree = DocumentTree::parse("<p>t</p>");
        let r = Ruleset {
            excluded_selectors: list(&["p", "[[["]),
            ..rules()
        };
        let err = sanitize(&mut tree, &r).unwrap_err();

        assert!(err.is_stage());
        assert!(err.to_string().contains("[[["));
    }

    #[test]
    fn shared_selector_set_serves_several_trees() {
        let r = Ruleset {
            excluded_selectors: list(&[":is(h1, h2)", "p.note"]),
            ..rules()
        };
        let compiled = CompiledSelectors::compile(&r.excluded_selectors);

        let mut a = DocumentTree::parse("<h1>a</h1><h2>b</h2><p>c</p>");
        let mut b = DocumentTree::parse(r#"<p class="note">n</p><h2>t</h2>"#);
        assert_eq!(sanitize_with(&mut a, &r, &compiled).unwrap().selector_matches, 2);
        assert_eq!(sanitize_with(&mut b, &r, &compiled).unwrap().selector_matches, 2);
        assert_eq!(a.count("p"), 1);
        assert_eq!(b.count("p"), 0);

        let bad = Ruleset {
            excluded_selectors: list(&["[[["]),
            ..rules()
        };
        let compiled = CompiledSelectors::compile(&bad.excluded_selectors);
        let err = sanitize_with(&mut a, &bad, &compiled).unwrap_err();
        assert!(err.is_stage());
    }

    #[test]
    fn excluded_tags_remove_subtrees() {
        let mut tree = DocumentTree::parse("<nav><a>home</a></nav><main><p>body</p></main><footer>f</footer>");
        let r = Ruleset {
            excluded_tags: list(&["nav", "FOOTER"]),
            ..rules()
        };
        let report = sanitize(&mut tree, &r).unwrap();

        assert_eq!(report.excluded_tags, 2);
        assert_eq!(tree.count("a"), 0);
        assert_eq!(tree.count("main"), 1);
    }

    #[test]
    fn selector_on_script_is_redundant_after_script_stage() {
        let input = "<div><script>x()</script><p>keep</p></div>";
        let selector_only = Ruleset {
            excluded_selectors: list(&["script"]),
            ..rules()
        };
        let both = Ruleset {
            remove_scripts: true,
            ..selector_only.clone()
        };

        let mut a = DocumentTree::parse(input);
        let mut b = DocumentTree::parse(input);
        sanitize(&mut a, &selector_only).unwrap();
        let report = sanitize(&mut b, &both).unwrap();

        assert_eq!(a.to_html(), b.to_html());
        assert_eq!(report.scripts, 1);
        assert_eq!(report.selector_matches, 0);
    }

    #[test]
    fn all_boolean_stages_together() {
        let mut tree = DocumentTree::parse(
            r#"<div class="wrap"><div><script>/*x*/<!--c--></script></div><!--note--><p style="a">text</p></div>"#,
        );
        let r = Ruleset {
            remove_comments: true,
            remove_empty_tags: true,
            remove_scripts: true,
            remove_styles: true,
            remove_attributes: true,
            ..rules()
        };
        sanitize(&mut tree, &r).unwrap();

        let html = tree.to_html();
        assert_eq!(tree.comment_count(), 0);
        assert_eq!(tree.count("script"), 0);
        assert!(!html.contains("class="));
        assert!(!html.contains("style="));
        assert!(html.contains("<p>text</p>"));
    }

    #[test]
    fn each_stage_is_idempotent() {
        let input = r#"<!--c--><div id="a"><script>s</script><style>t</style><nav>n</nav><p class="x">p</p></div>"#;
        let mut tree = DocumentTree::parse(input);
        let r = Ruleset {
            remove_comments: true,
            remove_scripts: true,
            remove_styles: true,
            excluded_attributes: list(&["class"]),
            excluded_selectors: list(&["nav"]),
            excluded_tags: list(&["style"]),
            ..rules()
        };
        sanitize(&mut tree, &r).unwrap();
        let once = tree.to_html();

        let again = sanitize(&mut tree, &r).unwrap();
        assert_eq!(again.total(), 0);
        assert_eq!(tree.to_html(), once);
    }
}
