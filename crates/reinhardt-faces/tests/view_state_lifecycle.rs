//! Render, postback and restore across requests.

use std::sync::Arc;

use proptest::prelude::*;
use reinhardt_faces::component::{ComponentNode, ComponentTree};
use reinhardt_faces::context::FacesContext;
use reinhardt_faces::error::ViewStateError;
use reinhardt_faces::settings::{FacesSettings, StateSavingMethod};
use reinhardt_faces::state::{DecodeOutcome, DynamicActions, ViewRestorer, ViewStateCodec};
use rstest::{fixture, rstest};

const VIEW: &str = "/register.xhtml";

/// Rebuilds the register page from its "source": a form with the given inputs.
fn build(view_id: &str, inputs: &[&str]) -> ComponentTree {
	let mut tree = ComponentTree::new(view_id);
	let form = tree
		.append_child(tree.root(), ComponentNode::new("faces.Form").with_id("form").form())
		.unwrap();
	for id in inputs {
		tree.append_child(form, ComponentNode::new("faces.Input").with_id(*id))
			.unwrap();
	}
	tree.mark_initial_state();
	tree
}

fn set_value(tree: &mut ComponentTree, client_id: &str, value: &str) {
	let id = tree.find_by_client_id(client_id).unwrap();
	tree.node_mut(id).unwrap().set_attribute("value", value);
}

fn value(tree: &ComponentTree, client_id: &str) -> Option<String> {
	tree.node(tree.find_by_client_id(client_id)?)?.attribute("value")
}

fn codec(method: StateSavingMethod) -> ViewStateCodec {
	ViewStateCodec::new(&FacesSettings {
		state_saving_method: method,
		..FacesSettings::default()
	})
	.unwrap()
}

#[fixture]
fn server_codec() -> ViewStateCodec {
	codec(StateSavingMethod::Server)
}

#[rstest]
#[case(StateSavingMethod::Server)]
#[case(StateSavingMethod::Client)]
fn test_values_survive_postback(#[case] method: StateSavingMethod) {
	// Arrange
	let codec = codec(method);
	let mut rendered = build(VIEW, &["name", "email"]);
	set_value(&mut rendered, "form:name", "Ada");
	set_value(&mut rendered, "form:email", "ada@example.com");
	let token = codec.encode(&mut FacesContext::new(), &rendered).unwrap();

	// Act
	let mut rebuilt = build(VIEW, &["name", "email"]);
	let report = codec
		.restore(&mut FacesContext::new(), &mut rebuilt, Some(&token))
		.unwrap();

	// Assert
	assert_eq!(report.applied, 2);
	assert_eq!(value(&rebuilt, "form:name").as_deref(), Some("Ada"));
	assert_eq!(value(&rebuilt, "form:email").as_deref(), Some("ada@example.com"));
}

#[rstest]
fn test_restore_twice_gives_same_tree(server_codec: ViewStateCodec) {
	// Arrange
	let mut rendered = build(VIEW, &["name"]);
	set_value(&mut rendered, "form:name", "Grace");
	let token = server_codec.encode(&mut FacesContext::new(), &rendered).unwrap();
	let snapshot = server_codec
		.decode(&mut FacesContext::new(), VIEW, Some(&token))
		.unwrap()
		.snapshot()
		.cloned()
		.unwrap();
	let mut rebuilt = build(VIEW, &["name"]);

	// Act
	let first = ViewRestorer.restore(&mut rebuilt, &snapshot, &mut DynamicActions::new());
	let after_first = value(&rebuilt, "form:name");
	let second = ViewRestorer.restore(&mut rebuilt, &snapshot, &mut DynamicActions::new());

	// Assert
	assert_eq!(first, second);
	assert_eq!(after_first, value(&rebuilt, "form:name"));
	assert_eq!(after_first.as_deref(), Some("Grace"));
}

#[rstest]
fn test_removed_component_does_not_disturb_others(server_codec: ViewStateCodec) {
	// Arrange
	let mut rendered = build(VIEW, &["a", "x", "b"]);
	set_value(&mut rendered, "form:a", "1");
	set_value(&mut rendered, "form:x", "2");
	set_value(&mut rendered, "form:b", "3");
	let token = server_codec.encode(&mut FacesContext::new(), &rendered).unwrap();

	// Act
	let mut rebuilt = build(VIEW, &["a", "b"]);
	let report = server_codec
		.restore(&mut FacesContext::new(), &mut rebuilt, Some(&token))
		.unwrap();

	// Assert
	assert_eq!(value(&rebuilt, "form:a").as_deref(), Some("1"));
	assert_eq!(value(&rebuilt, "form:b").as_deref(), Some("3"));
	assert_eq!(report.discarded_entries, 1);
}

#[rstest]
fn test_reordered_siblings_keep_their_values(server_codec: ViewStateCodec) {
	// Arrange
	let mut rendered = build(VIEW, &["a", "x", "b"]);
	set_value(&mut rendered, "form:a", "1");
	set_value(&mut rendered, "form:x", "2");
	set_value(&mut rendered, "form:b", "3");
	let token = server_codec.encode(&mut FacesContext::new(), &rendered).unwrap();

	// Act
	let mut rebuilt = build(VIEW, &["a", "b", "x"]);
	let report = server_codec
		.restore(&mut FacesContext::new(), &mut rebuilt, Some(&token))
		.unwrap();

	// Assert
	assert_eq!(value(&rebuilt, "form:a").as_deref(), Some("1"));
	assert_eq!(value(&rebuilt, "form:x").as_deref(), Some("2"));
	assert_eq!(value(&rebuilt, "form:b").as_deref(), Some("3"));
	assert_eq!(report.applied, 3);
	assert_eq!(report.discarded_entries, 0);
}

/// A form with a `header` facet and a plain panel that has both a `label`
/// facet and a child.
fn build_with_facets() -> ComponentTree {
	let mut tree = ComponentTree::new(VIEW);
	let form = tree
		.append_child(tree.root(), ComponentNode::new("faces.Form").with_id("form").form())
		.unwrap();
	tree.append_child(form, ComponentNode::new("faces.Input").with_id("name"))
		.unwrap();
	tree.set_facet(form, "header", ComponentNode::new("faces.Output").with_id("title"))
		.unwrap();
	let group = tree
		.append_child(form, ComponentNode::new("faces.Panel").with_id("group"))
		.unwrap();
	tree.append_child(group, ComponentNode::new("faces.Input").with_id("city"))
		.unwrap();
	tree.set_facet(group, "label", ComponentNode::new("faces.Output").with_id("caption"))
		.unwrap();
	tree.mark_initial_state();
	tree
}

#[rstest]
#[case(StateSavingMethod::Server)]
#[case(StateSavingMethod::Client)]
fn test_facet_and_child_values_land_on_their_own_nodes(#[case] method: StateSavingMethod) {
	// Arrange
	let codec = codec(method);
	let mut rendered = build_with_facets();
	for (client_id, text) in [
		("form:title", "Register"),
		("form:name", "Ada"),
		("form:group", "shipping"),
		("form:caption", "Where to?"),
		("form:city", "London"),
	] {
		set_value(&mut rendered, client_id, text);
	}
	let token = codec.encode(&mut FacesContext::new(), &rendered).unwrap();

	// Act
	let mut rebuilt = build_with_facets();
	let report = codec
		.restore(&mut FacesContext::new(), &mut rebuilt, Some(&token))
		.unwrap();

	// Assert
	assert_eq!(report.applied, 5);
	assert_eq!(report.discarded_entries, 0);
	assert_eq!(value(&rebuilt, "form:title").as_deref(), Some("Register"));
	assert_eq!(value(&rebuilt, "form:name").as_deref(), Some("Ada"));
	assert_eq!(value(&rebuilt, "form:group").as_deref(), Some("shipping"));
	assert_eq!(value(&rebuilt, "form:caption").as_deref(), Some("Where to?"));
	assert_eq!(value(&rebuilt, "form:city").as_deref(), Some("London"));
}

#[rstest]
fn test_added_component_keeps_default(server_codec: ViewStateCodec) {
	let mut rendered = build(VIEW, &["a", "b"]);
	set_value(&mut rendered, "form:a", "1");
	set_value(&mut rendered, "form:b", "3");
	let token = server_codec.encode(&mut FacesContext::new(), &rendered).unwrap();

	let mut rebuilt = build(VIEW, &["a", "new", "b"]);
	server_codec.restore(&mut FacesContext::new(), &mut rebuilt, Some(&token));

	assert_eq!(value(&rebuilt, "form:a").as_deref(), Some("1"));
	assert_eq!(value(&rebuilt, "form:new"), None);
	assert_eq!(value(&rebuilt, "form:b").as_deref(), Some("3"));
}

#[rstest]
fn test_dynamic_component_is_recreated_on_postback(server_codec: ViewStateCodec) {
	// Arrange
	let mut rendered = build(VIEW, &["name"]);
	let mut ctx = FacesContext::new();
	let form = rendered.find_by_client_id("form").unwrap();
	ctx.add_child(
		&mut rendered,
		form,
		ComponentNode::new("faces.Output")
			.with_id("greeting")
			.with_attribute("value", "hello"),
	)
	.unwrap()
	.unwrap();
	let token = server_codec.encode(&mut ctx, &rendered).unwrap();

	// Act
	let mut rebuilt = build(VIEW, &["name"]);
	let mut postback = FacesContext::new();
	let report = server_codec
		.restore(&mut postback, &mut rebuilt, Some(&token))
		.unwrap();

	// Assert
	assert_eq!(report.replayed_actions, 1);
	assert_eq!(value(&rebuilt, "form:greeting").as_deref(), Some("hello"));
	assert_eq!(postback.dynamic_actions().len(), 1);
}

#[rstest]
fn test_dynamic_addition_persists_over_two_postbacks(server_codec: ViewStateCodec) {
	let mut rendered = build(VIEW, &[]);
	let mut ctx = FacesContext::new();
	let form = rendered.find_by_client_id("form").unwrap();
	ctx.add_child(&mut rendered, form, ComponentNode::new("faces.Output").with_id("extra"))
		.unwrap();
	let first = server_codec.encode(&mut ctx, &rendered).unwrap();

	let mut second_tree = build(VIEW, &[]);
	let mut second_ctx = FacesContext::new();
	server_codec.restore(&mut second_ctx, &mut second_tree, Some(&first));
	set_value(&mut second_tree, "form:extra", "kept");
	let second = server_codec.encode(&mut second_ctx, &second_tree).unwrap();

	let mut third_tree = build(VIEW, &[]);
	server_codec.restore(&mut FacesContext::new(), &mut third_tree, Some(&second));

	assert_eq!(value(&third_tree, "form:extra").as_deref(), Some("kept"));
}

#[rstest]
fn test_stateless_view_round_trip(server_codec: ViewStateCodec) {
	let mut rendered = build(VIEW, &["name"]);
	rendered.set_transient(true);
	let token = server_codec.encode(&mut FacesContext::new(), &rendered).unwrap();

	let mut rebuilt = build(VIEW, &["name"]);
	let report = server_codec.restore(&mut FacesContext::new(), &mut rebuilt, Some(&token));

	assert_eq!(token, "stateless");
	assert!(report.is_none());
	assert!(rebuilt.is_transient());
}

#[rstest]
fn test_evicted_view_behaves_as_fresh() {
	// Arrange
	let codec = ViewStateCodec::new(&FacesSettings {
		number_of_logical_views: 2,
		..FacesSettings::default()
	})
	.unwrap();
	let tree = build(VIEW, &["name"]);
	let tokens: Vec<String> = (0..3)
		.map(|_| codec.encode(&mut FacesContext::new(), &tree).unwrap())
		.collect();

	// Act
	let oldest = codec.decode(&mut FacesContext::new(), VIEW, Some(&tokens[0])).unwrap();
	let newest = codec.decode(&mut FacesContext::new(), VIEW, Some(&tokens[2])).unwrap();

	// Assert
	assert!(matches!(oldest, DecodeOutcome::Missing));
	assert!(matches!(newest, DecodeOutcome::Restored(_)));
	assert_eq!(codec.store().logical_view_count(), 2);
}

#[rstest]
fn test_client_state_needs_the_same_secret() {
	// Arrange
	let secret = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
	let settings = FacesSettings {
		state_saving_method: StateSavingMethod::Client,
		client_state_secret: Some(secret.to_string()),
		..FacesSettings::default()
	};
	let writer = ViewStateCodec::new(&settings).unwrap();
	let reader = ViewStateCodec::new(&settings).unwrap();
	let stranger = codec(StateSavingMethod::Client);
	let token = writer
		.encode(&mut FacesContext::new(), &build(VIEW, &["name"]))
		.unwrap();

	// Act
	let same = reader.decode(&mut FacesContext::new(), VIEW, Some(&token));
	let other = stranger.decode(&mut FacesContext::new(), VIEW, Some(&token));

	// Assert
	assert!(matches!(same, Ok(DecodeOutcome::Restored(_))));
	assert!(matches!(other, Err(ViewStateError::CorruptBlob(_))));
}

#[rstest]
fn test_concurrent_views_do_not_mix() {
	// Arrange
	let codec = Arc::new(codec(StateSavingMethod::Server));

	// Act
	let results: Vec<(String, Option<String>)> = std::thread::scope(|scope| {
		let handles: Vec<_> = (0..8)
			.map(|i| {
				let codec = Arc::clone(&codec);
				scope.spawn(move || {
					let view = format!("/view{i}.xhtml");
					let expected = format!("value-{i}");
					let mut rendered = build(&view, &["field"]);
					set_value(&mut rendered, "form:field", &expected);
					let token = codec.encode(&mut FacesContext::new(), &rendered).unwrap();

					let mut rebuilt = build(&view, &["field"]);
					codec.restore(&mut FacesContext::new(), &mut rebuilt, Some(&token));
					(expected, value(&rebuilt, "form:field"))
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	// Assert
	for (expected, restored) in results {
		assert_eq!(restored.as_deref(), Some(expected.as_str()));
	}
}

proptest! {
	#[test]
	fn prop_decode_never_panics(raw in "\\PC{0,64}") {
		let codec = codec(StateSavingMethod::Server);
		let mut ctx = FacesContext::new();

		let outcome = codec.decode_or_fresh(&mut ctx, VIEW, Some(&raw));

		prop_assert!(!matches!(outcome, DecodeOutcome::Restored(_)));
	}

	#[test]
	fn prop_client_decode_rejects_tampering(flip in 0usize..64) {
		let codec = codec(StateSavingMethod::Client);
		let token = codec.encode(&mut FacesContext::new(), &build(VIEW, &["name"])).unwrap();
		let mut bytes = token.into_bytes();
		let index = flip % bytes.len();
		bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
		let tampered = String::from_utf8(bytes).unwrap();

		let outcome = codec.decode_or_fresh(&mut FacesContext::new(), VIEW, Some(&tampered));

		prop_assert!(matches!(outcome, DecodeOutcome::Missing));
	}
}
