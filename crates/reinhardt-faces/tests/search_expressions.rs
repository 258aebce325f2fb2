//! Search expressions resolved against a realistic page.

use reinhardt_faces::component::{ComponentId, ComponentNode, ComponentTree};
use reinhardt_faces::error::SearchError;
use reinhardt_faces::search::{SearchExpressionContext, SearchExpressionResolver, SearchHint};
use rstest::{fixture, rstest};

struct Checkout {
	tree: ComponentTree,
	submit: ComponentId,
	street: ComponentId,
}

/// ```text
/// root
/// ├── header
/// └── checkout (form)
///     ├── address (naming container)
///     │   ├── street
///     │   └── city
///     ├── billing (naming container)
///     │   ├── street
///     │   └── city
///     └── submit
/// ```
#[fixture]
fn checkout() -> Checkout {
	let mut tree = ComponentTree::new("/checkout.xhtml");
	let root = tree.root();
	tree.append_child(root, ComponentNode::new("faces.Output").with_id("header"))
		.unwrap();
	let form = tree
		.append_child(root, ComponentNode::new("faces.Form").with_id("checkout").form())
		.unwrap();
	let mut street = None;
	for group in ["address", "billing"] {
		let container = tree
			.append_child(form, ComponentNode::new("faces.Panel").with_id(group).naming_container())
			.unwrap();
		let id = tree
			.append_child(container, ComponentNode::new("faces.Input").with_id("street"))
			.unwrap();
		street.get_or_insert(id);
		tree.append_child(container, ComponentNode::new("faces.Input").with_id("city"))
			.unwrap();
	}
	let submit = tree
		.append_child(form, ComponentNode::new("faces.Button").with_id("submit"))
		.unwrap();
	Checkout {
		tree,
		submit,
		street: street.unwrap(),
	}
}

#[rstest]
fn test_multiple_references_resolve_in_order(checkout: Checkout) {
	// Arrange
	let resolver = SearchExpressionResolver::new();
	let ctx = SearchExpressionContext::new(&checkout.tree, checkout.submit);

	// Act
	let ids = resolver
		.resolve_client_ids(&ctx, "address:street, billing:city @this")
		.unwrap();

	// Assert
	assert_eq!(ids, vec!["checkout:address:street", "checkout:billing:city", "checkout:submit"]);
}

#[rstest]
fn test_id_keyword_finds_every_match(checkout: Checkout) {
	let resolver = SearchExpressionResolver::new();
	let ctx = SearchExpressionContext::new(&checkout.tree, checkout.submit);

	let all = resolver.resolve_components(&ctx, "@form:@id(street)").unwrap();
	let single = resolver.resolve_component(&ctx, "@form:@id(street)").unwrap();

	assert_eq!(all.len(), 2);
	assert_eq!(single, Some(checkout.street));
}

#[rstest]
#[case("@parent:@next:city", "checkout:billing:city")]
#[case("@form:@previous", "header")]
#[case("@namingcontainer:@next:street", "checkout:billing:street")]
#[case(":@root:@child(1):submit", "checkout:submit")]
#[case(":checkout:billing:street", "checkout:billing:street")]
fn test_chained_expressions(checkout: Checkout, #[case] expression: &str, #[case] expected: &str) {
	let resolver = SearchExpressionResolver::new();
	let ctx = SearchExpressionContext::new(&checkout.tree, checkout.street);

	let client_id = resolver.resolve_client_id(&ctx, expression).unwrap();

	assert_eq!(client_id.as_deref(), Some(expected));
}

#[rstest]
fn test_sibling_scope_is_not_searched(checkout: Checkout) {
	// "city" from inside address must not find billing's city first
	let resolver = SearchExpressionResolver::new();
	let ctx = SearchExpressionContext::new(&checkout.tree, checkout.street);

	let client_id = resolver.resolve_client_id(&ctx, "city").unwrap();

	assert_eq!(client_id.as_deref(), Some("checkout:address:city"));
}

#[rstest]
#[case("@child(9)")]
#[case("nowhere")]
#[case("billing:nowhere")]
fn test_unmatched_expressions(checkout: Checkout, #[case] expression: &str) {
	// Arrange
	let resolver = SearchExpressionResolver::new();
	let strict = SearchExpressionContext::new(&checkout.tree, checkout.submit);
	let lenient = strict.clone().with_hint(SearchHint::IgnoreNoResult);

	// Act
	let err = resolver.resolve_components(&strict, expression).unwrap_err();
	let empty = resolver.resolve_components(&lenient, expression).unwrap();

	// Assert
	match err {
		SearchError::ComponentNotFound { expression: e, source_id } => {
			assert_eq!(e, expression);
			assert_eq!(source_id, "checkout:submit");
		}
		other => panic!("unexpected error: {other}"),
	}
	assert!(empty.is_empty());
}

#[rstest]
#[case("@all", true)]
#[case("@none", true)]
#[case("@form", false)]
#[case("@form:@all", true)]
#[case("@all:@form", false)]
#[case("submit", false)]
fn test_passthrough_detection(checkout: Checkout, #[case] expression: &str, #[case] expected: bool) {
	let resolver = SearchExpressionResolver::new();
	let ctx = SearchExpressionContext::new(&checkout.tree, checkout.submit);

	assert_eq!(resolver.is_passthrough_expression(&ctx, expression), expected);
}

#[rstest]
fn test_client_side_resolution_leaves_form_to_the_browser(checkout: Checkout) {
	let resolver = SearchExpressionResolver::new();
	let ctx =
		SearchExpressionContext::new(&checkout.tree, checkout.submit).with_hint(SearchHint::ResolveClientSide);

	let client_id = resolver.resolve_client_id(&ctx, "@form").unwrap();

	assert_eq!(client_id.as_deref(), Some("@form"));
}
