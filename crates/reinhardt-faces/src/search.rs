//! Search expressions: references from one component to others.
//!
//! An expression is a list of references separated by spaces or commas. A
//! reference is either a naming-container relative id (`name`,
//! `form:name`, `:form:name`) or a chain of `@keywords` and ids joined
//! with `:`, evaluated left to right (`@form:name`, `@parent:@child(0)`).
//!
//! ```
//! use reinhardt_faces::component::{ComponentNode, ComponentTree};
//! use reinhardt_faces::search::{SearchExpressionContext, SearchExpressionResolver};
//!
//! let mut tree = ComponentTree::new("/search.xhtml");
//! let form = tree
//!     .append_child(tree.root(), ComponentNode::new("faces.Form").with_id("f").form())
//!     .unwrap();
//! let name = tree.append_child(form, ComponentNode::new("faces.Input").with_id("name")).unwrap();
//! let submit = tree.append_child(form, ComponentNode::new("faces.Button").with_id("go")).unwrap();
//!
//! let resolver = SearchExpressionResolver::new();
//! let ctx = SearchExpressionContext::new(&tree, submit);
//! assert_eq!(resolver.resolve_client_ids(&ctx, "@form name").unwrap(), vec!["f", "f:name"]);
//! assert_eq!(resolver.resolve_component(&ctx, "@previous").unwrap(), Some(name));
//! ```

mod keywords;

use std::collections::HashSet;
use std::fmt;

pub use keywords::{
	AllResolver, ChildResolver, CompositeResolver, FormResolver, IdResolver, NamingContainerResolver,
	NextResolver, NoneResolver, ParentResolver, PreviousResolver, RootResolver, SearchKeywordResolver,
	ThisResolver, builtin_resolvers,
};

use crate::component::{ComponentId, ComponentTree, NAMING_CONTAINER_SEPARATOR};
use crate::composite::CompositeStackManager;
use crate::error::{SearchError, SearchResult};

/// Prefix marking a keyword.
pub const KEYWORD_PREFIX: char = '@';

/// Characters separating references in a multi-reference expression.
pub const EXPRESSION_SEPARATORS: [char; 2] = [' ', ','];

/// Options changing how an expression is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SearchHint {
	/// An expression matching nothing is not an error.
	IgnoreNoResult,
	/// `@this` and `@form` may be left for the client to resolve.
	ResolveClientSide,
	/// Do not fall back to a root-wide client id search.
	SkipVirtualComponents,
	/// Stop at the first match.
	ResolveSingleComponent,
}

/// Everything a resolution needs: the tree, the component the expression
/// belongs to and the active hints.
#[derive(Debug, Clone)]
pub struct SearchExpressionContext<'a> {
	tree: &'a ComponentTree,
	source: ComponentId,
	hints: HashSet<SearchHint>,
	composite_stacks: Option<&'a CompositeStackManager>,
}

impl<'a> SearchExpressionContext<'a> {
	/// Context for expressions written on `source`, with no hints.
	pub fn new(tree: &'a ComponentTree, source: ComponentId) -> Self {
		Self {
			tree,
			source,
			hints: HashSet::new(),
			composite_stacks: None,
		}
	}

	/// Adds `hint`.
	pub fn with_hint(mut self, hint: SearchHint) -> Self {
		self.hints.insert(hint);
		self
	}

	/// Lets `@composite` consult the tree creation stack while the tree is
	/// still being built.
	pub fn with_composite_stacks(mut self, stacks: &'a CompositeStackManager) -> Self {
		self.composite_stacks = Some(stacks);
		self
	}

	/// Tree being searched.
	pub fn tree(&self) -> &'a ComponentTree {
		self.tree
	}

	/// Component the expression belongs to.
	pub fn source(&self) -> ComponentId {
		self.source
	}

	/// Whether `hint` is active.
	pub fn has_hint(&self, hint: SearchHint) -> bool {
		self.hints.contains(&hint)
	}

	/// Stacks set by [`Self::with_composite_stacks`].
	pub fn composite_stacks(&self) -> Option<&'a CompositeStackManager> {
		self.composite_stacks
	}

	fn source_client_id(&self) -> String {
		self.tree.client_id(self.source).unwrap_or_default()
	}
}

/// Resolves search expressions through a chain of keyword resolvers.
pub struct SearchExpressionResolver {
	resolvers: Vec<Box<dyn SearchKeywordResolver>>,
}

impl fmt::Debug for SearchExpressionResolver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SearchExpressionResolver")
			.field("resolvers", &self.resolvers.len())
			.finish()
	}
}

impl Default for SearchExpressionResolver {
	fn default() -> Self {
		Self::new()
	}
}

impl SearchExpressionResolver {
	/// Resolver with the built-in keywords.
	pub fn new() -> Self {
		Self {
			resolvers: builtin_resolvers(),
		}
	}

	/// Puts `resolver` in front of the chain, so it can claim keywords before
	/// the built-ins do.
	pub fn with_resolver(mut self, resolver: impl SearchKeywordResolver + 'static) -> Self {
		self.resolvers.insert(0, Box::new(resolver));
		self
	}

	/// Resolves a single reference to one client id.
	///
	/// Passthrough expressions come back as written.
	pub fn resolve_client_id(
		&self,
		ctx: &SearchExpressionContext<'_>,
		expression: &str,
	) -> SearchResult<Option<String>> {
		let ctx = ctx.clone().with_hint(SearchHint::ResolveSingleComponent);
		let expression = expression.trim();
		if !expression.is_empty() && self.is_passthrough_expression(&ctx, expression) {
			return Ok(Some(expression.to_string()));
		}
		let found = self.resolve_single(&ctx, expression)?;
		Ok(found.and_then(|id| ctx.tree.client_id(id)))
	}

	/// Resolves every reference of `expressions` to client ids.
	pub fn resolve_client_ids(
		&self,
		ctx: &SearchExpressionContext<'_>,
		expressions: &str,
	) -> SearchResult<Vec<String>> {
		let mut client_ids = Vec::new();
		for expression in split_expressions(expressions) {
			if self.is_passthrough_expression(ctx, &expression) {
				client_ids.push(expression);
				continue;
			}
			let mut found = Vec::new();
			self.invoke_on_component(ctx, ctx.source, &expression, &mut found)?;
			client_ids.extend(found.into_iter().filter_map(|id| ctx.tree.client_id(id)));
		}
		if client_ids.is_empty() && !ctx.has_hint(SearchHint::IgnoreNoResult) {
			return Err(self.not_found(ctx, expressions));
		}
		Ok(client_ids)
	}

	/// Resolves a single reference to one component.
	pub fn resolve_component(
		&self,
		ctx: &SearchExpressionContext<'_>,
		expression: &str,
	) -> SearchResult<Option<ComponentId>> {
		let ctx = ctx.clone().with_hint(SearchHint::ResolveSingleComponent);
		self.resolve_single(&ctx, expression.trim())
	}

	/// Resolves every reference of `expressions` to components.
	pub fn resolve_components(
		&self,
		ctx: &SearchExpressionContext<'_>,
		expressions: &str,
	) -> SearchResult<Vec<ComponentId>> {
		let mut found = Vec::new();
		for expression in split_expressions(expressions) {
			self.invoke_on_component(ctx, ctx.source, &expression, &mut found)?;
		}
		if found.is_empty() && !ctx.has_hint(SearchHint::IgnoreNoResult) {
			return Err(self.not_found(ctx, expressions));
		}
		Ok(found)
	}

	fn resolve_single(
		&self,
		ctx: &SearchExpressionContext<'_>,
		expression: &str,
	) -> SearchResult<Option<ComponentId>> {
		let mut found = Vec::new();
		self.invoke_on_component(ctx, ctx.source, expression, &mut found)?;
		match found.first() {
			Some(id) => Ok(Some(*id)),
			None if ctx.has_hint(SearchHint::IgnoreNoResult) => Ok(None),
			None => Err(self.not_found(ctx, expression)),
		}
	}

	/// Evaluates one reference starting at `previous`, collecting matches
	/// into `found`.
	pub fn invoke_on_component(
		&self,
		ctx: &SearchExpressionContext<'_>,
		previous: ComponentId,
		expression: &str,
		found: &mut Vec<ComponentId>,
	) -> SearchResult<()> {
		let expression = expression.trim();
		if expression.is_empty() {
			return Ok(());
		}

		if !expression.contains(KEYWORD_PREFIX) {
			if let Some(target) = ctx.tree.find_component(previous, expression) {
				found.push(target);
			} else if !ctx.has_hint(SearchHint::SkipVirtualComponents) {
				let client_id = expression
					.strip_prefix(NAMING_CONTAINER_SEPARATOR)
					.unwrap_or(expression);
				if let Some(target) = ctx.tree.find_by_client_id(client_id) {
					found.push(target);
				}
			}
			return Ok(());
		}

		if let Some(rest) = absolute_keyword(expression) {
			return self.invoke_on_component(ctx, ctx.tree.root(), rest, found);
		}

		let command = extract_first_command(expression);
		let remaining = remaining_after(expression, command);

		match command.strip_prefix(KEYWORD_PREFIX) {
			Some(keyword) => {
				let resolver = self.resolver_for(ctx, keyword)?;
				match remaining {
					None => found.extend(resolver.resolve(ctx, previous, keyword)),
					Some(_) if resolver.is_leaf(ctx, keyword) => {
						return Err(SearchError::LeafKeyword {
							keyword: keyword.to_string(),
							expression: expression.to_string(),
						});
					}
					Some(rest) => {
						for target in resolver.resolve(ctx, previous, keyword) {
							self.invoke_on_component(ctx, target, rest, found)?;
							if ctx.has_hint(SearchHint::ResolveSingleComponent) && !found.is_empty() {
								break;
							}
						}
					}
				}
			}
			None => {
				if let Some(target) = ctx.tree.find_component(previous, command) {
					match remaining {
						None => found.push(target),
						Some(rest) => self.invoke_on_component(ctx, target, rest, found)?,
					}
				}
			}
		}
		Ok(())
	}

	/// Whether the whole reference may be handed to the client unresolved.
	///
	/// The last command of a chain decides.
	pub fn is_passthrough_expression(&self, ctx: &SearchExpressionContext<'_>, expression: &str) -> bool {
		let expression = expression.trim();
		if !expression.contains(KEYWORD_PREFIX) {
			return false;
		}
		if let Some(rest) = absolute_keyword(expression) {
			return self.is_passthrough_expression(ctx, rest);
		}
		let command = extract_first_command(expression);
		match remaining_after(expression, command) {
			Some(rest) => self.is_passthrough_expression(ctx, rest),
			None => command
				.strip_prefix(KEYWORD_PREFIX)
				.and_then(|keyword| {
					self.resolvers
						.iter()
						.find(|r| r.is_resolver_for_keyword(ctx, keyword))
						.map(|r| r.is_passthrough(ctx, keyword))
				})
				.unwrap_or(false),
		}
	}

	/// Whether every reference in `expressions` uses known keywords and
	/// chains nothing after a leaf keyword.
	pub fn is_valid_expression(&self, ctx: &SearchExpressionContext<'_>, expressions: &str) -> bool {
		split_expressions(expressions)
			.iter()
			.all(|expression| self.is_valid_reference(ctx, expression))
	}

	fn is_valid_reference(&self, ctx: &SearchExpressionContext<'_>, expression: &str) -> bool {
		if !expression.contains(KEYWORD_PREFIX) {
			return true;
		}
		if let Some(rest) = absolute_keyword(expression) {
			return self.is_valid_reference(ctx, rest);
		}
		let command = extract_first_command(expression);
		let remaining = remaining_after(expression, command);
		if let Some(keyword) = command.strip_prefix(KEYWORD_PREFIX) {
			let Ok(resolver) = self.resolver_for(ctx, keyword) else {
				return false;
			};
			if remaining.is_some() && resolver.is_leaf(ctx, keyword) {
				return false;
			}
		}
		remaining.is_none_or(|rest| self.is_valid_reference(ctx, rest))
	}

	fn resolver_for(
		&self,
		ctx: &SearchExpressionContext<'_>,
		keyword: &str,
	) -> SearchResult<&dyn SearchKeywordResolver> {
		self.resolvers
			.iter()
			.find(|r| r.is_resolver_for_keyword(ctx, keyword))
			.map(Box::as_ref)
			.ok_or_else(|| SearchError::UnknownKeyword(keyword.to_string()))
	}

	fn not_found(&self, ctx: &SearchExpressionContext<'_>, expression: &str) -> SearchError {
		tracing::debug!(expression, "Search expression matched no component");
		SearchError::ComponentNotFound {
			expression: expression.to_string(),
			source_id: ctx.source_client_id(),
		}
	}
}

/// `:@keyword...` restarts the chain at the root.
fn absolute_keyword(expression: &str) -> Option<&str> {
	expression
		.strip_prefix(NAMING_CONTAINER_SEPARATOR)
		.filter(|rest| rest.starts_with(KEYWORD_PREFIX))
}

fn remaining_after<'e>(expression: &'e str, command: &str) -> Option<&'e str> {
	if command.len() >= expression.len() {
		return None;
	}
	// skip the separator following the command
	Some(expression.get(command.len() + 1..).unwrap_or(""))
}

/// Splits a multi-reference expression on spaces and commas, keeping
/// separators inside parentheses.
pub fn split_expressions(expressions: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	let mut buffer = String::new();
	let mut parentheses = 0usize;

	for c in expressions.chars() {
		match c {
			'(' => parentheses += 1,
			')' => parentheses = parentheses.saturating_sub(1),
			_ => {}
		}
		if parentheses == 0 && EXPRESSION_SEPARATORS.contains(&c) {
			if !buffer.is_empty() {
				tokens.push(std::mem::take(&mut buffer));
			}
		} else {
			buffer.push(c);
		}
	}
	if !buffer.is_empty() {
		tokens.push(buffer);
	}
	tokens
}

/// The first command of a chain: everything up to the first `:` that is not
/// the leading character, or up to the parenthesis closing the first
/// argument list.
pub fn extract_first_command(expression: &str) -> &str {
	let mut parentheses: i32 = -1;
	for (i, c) in expression.char_indices() {
		if c == '(' {
			if parentheses == -1 {
				parentheses = 0;
			}
			parentheses += 1;
		}
		if c == ')' {
			parentheses -= 1;
		}
		if parentheses == 0 {
			return &expression[..i + c.len_utf8()];
		}
		if parentheses == -1 && i > 0 && c == NAMING_CONTAINER_SEPARATOR {
			return &expression[..i];
		}
	}
	expression
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::ComponentNode;
	use rstest::{fixture, rstest};

	struct Page {
		tree: ComponentTree,
		form: ComponentId,
		first: ComponentId,
		second: ComponentId,
		table: ComponentId,
		cell: ComponentId,
	}

	#[fixture]
	fn page() -> Page {
		let mut tree = ComponentTree::new("/page.xhtml");
		let root = tree.root();
		let form = tree
			.append_child(root, ComponentNode::new("faces.Form").with_id("f").form())
			.unwrap();
		let first = tree
			.append_child(form, ComponentNode::new("faces.Input").with_id("first"))
			.unwrap();
		let second = tree
			.append_child(form, ComponentNode::new("faces.Input").with_id("second"))
			.unwrap();
		let table = tree
			.append_child(form, ComponentNode::new("faces.Table").with_id("t").naming_container())
			.unwrap();
		let cell = tree
			.append_child(table, ComponentNode::new("faces.Output").with_id("cell"))
			.unwrap();
		Page {
			tree,
			form,
			first,
			second,
			table,
			cell,
		}
	}

	#[rstest]
	#[case("a b", vec!["a", "b"])]
	#[case("a,b", vec!["a", "b"])]
	#[case(" a ,  b ", vec!["a", "b"])]
	#[case("@child(0, 1) x", vec!["@child(0, 1)", "x"])]
	#[case("", vec![])]
	fn test_split_expressions(#[case] input: &str, #[case] expected: Vec<&str>) {
		assert_eq!(split_expressions(input), expected);
	}

	#[rstest]
	#[case("@form:name", "@form")]
	#[case(":form:name", ":form")]
	#[case("@child(2):@parent", "@child(2)")]
	#[case("@id(a:b)", "@id(a:b)")]
	#[case("plain", "plain")]
	fn test_extract_first_command(#[case] expression: &str, #[case] expected: &str) {
		assert_eq!(extract_first_command(expression), expected);
	}

	#[rstest]
	#[case("@this", "f:first")]
	#[case("@next", "second")]
	#[case("@parent", "f")]
	#[case("@form", "f")]
	#[case("@form:second", "f:second")]
	#[case("@parent:@child(2):cell", "f:t:cell")]
	#[case("@root:@id(cell)", "f:t:cell")]
	#[case(":@root:@id(cell)", "f:t:cell")]
	#[case("second", "f:second")]
	#[case("t:cell", "f:t:cell")]
	fn test_resolve_client_id(page: Page, #[case] expression: &str, #[case] expected: &str) {
		// Arrange
		let resolver = SearchExpressionResolver::new();
		let ctx = SearchExpressionContext::new(&page.tree, page.first);

		// Act
		let client_id = resolver.resolve_client_id(&ctx, expression).unwrap();

		// Assert
		assert_eq!(client_id.as_deref(), Some(expected));
	}

	#[rstest]
	fn test_namingcontainer_is_strict_ancestor(page: Page) {
		let resolver = SearchExpressionResolver::new();
		let ctx = SearchExpressionContext::new(&page.tree, page.table);

		let found = resolver.resolve_component(&ctx, "@namingcontainer").unwrap();

		assert_eq!(found, Some(page.form));
	}

	#[rstest]
	fn test_passthrough_keywords_are_returned_verbatim(page: Page) {
		let resolver = SearchExpressionResolver::new();
		let ctx = SearchExpressionContext::new(&page.tree, page.cell);

		let ids = resolver.resolve_client_ids(&ctx, "@all @none").unwrap();

		assert_eq!(ids, vec!["@all", "@none"]);
	}

	#[rstest]
	fn test_client_side_hint_makes_form_and_this_passthrough(page: Page) {
		let resolver = SearchExpressionResolver::new();
		let ctx = SearchExpressionContext::new(&page.tree, page.cell).with_hint(SearchHint::ResolveClientSide);

		let ids = resolver.resolve_client_ids(&ctx, "@this @form @parent").unwrap();

		assert_eq!(ids, vec!["@this", "@form", "f:t"]);
	}

	#[rstest]
	#[case("@all:first")]
	#[case("@none:@parent")]
	fn test_keyword_after_leaf_is_rejected(page: Page, #[case] expression: &str) {
		let resolver = SearchExpressionResolver::new();
		let ctx = SearchExpressionContext::new(&page.tree, page.first);

		let err = resolver.resolve_components(&ctx, expression).unwrap_err();

		assert!(matches!(err, SearchError::LeafKeyword { .. }));
		assert!(!resolver.is_valid_expression(&ctx, expression));
	}

	#[rstest]
	fn test_unknown_keyword(page: Page) {
		let resolver = SearchExpressionResolver::new();
		let ctx = SearchExpressionContext::new(&page.tree, page.first);

		let err = resolver.resolve_components(&ctx, "@sibling").unwrap_err();

		assert!(matches!(err, SearchError::UnknownKeyword(ref k) if k == "sibling"));
		assert!(!resolver.is_valid_expression(&ctx, "@sibling"));
		assert!(resolver.is_valid_expression(&ctx, "@form:first @parent"));
	}

	#[rstest]
	fn test_no_result_is_an_error_unless_ignored(page: Page) {
		let resolver = SearchExpressionResolver::new();
		let strict = SearchExpressionContext::new(&page.tree, page.first);
		let lenient = strict.clone().with_hint(SearchHint::IgnoreNoResult);

		let err = resolver.resolve_component(&strict, "missing").unwrap_err();
		let none = resolver.resolve_component(&lenient, "missing").unwrap();

		assert!(
			matches!(err, SearchError::ComponentNotFound { ref source_id, .. } if source_id == "f:first")
		);
		assert_eq!(none, None);
	}

	#[rstest]
	fn test_client_id_fallback_can_be_skipped(page: Page) {
		// "f:second" is outside the table's scope, only the client id search finds it
		let resolver = SearchExpressionResolver::new();
		let ctx = SearchExpressionContext::new(&page.tree, page.cell);
		let skipping = ctx
			.clone()
			.with_hint(SearchHint::SkipVirtualComponents)
			.with_hint(SearchHint::IgnoreNoResult);

		assert_eq!(resolver.resolve_component(&ctx, ":f:t:cell").unwrap(), Some(page.cell));
		assert_eq!(resolver.resolve_component(&ctx, "f:second").unwrap(), Some(page.second));
		assert_eq!(resolver.resolve_component(&skipping, "f:second").unwrap(), None);
	}

	#[rstest]
	fn test_custom_resolver_runs_before_builtins(page: Page) {
		struct FirstInput;
		impl SearchKeywordResolver for FirstInput {
			fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
				keyword == "parent"
			}
			fn resolve(
				&self,
				ctx: &SearchExpressionContext<'_>,
				_current: ComponentId,
				_keyword: &str,
			) -> Vec<ComponentId> {
				ctx.tree().find_by_client_id("f:first").into_iter().collect()
			}
		}
		let resolver = SearchExpressionResolver::new().with_resolver(FirstInput);
		let ctx = SearchExpressionContext::new(&page.tree, page.cell);

		let found = resolver.resolve_component(&ctx, "@parent").unwrap();

		assert_eq!(found, Some(page.first));
	}
}
