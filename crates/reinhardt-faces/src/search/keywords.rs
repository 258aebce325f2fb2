//! Built-in `@keyword` resolvers.

use super::{SearchExpressionContext, SearchHint};
use crate::component::ComponentId;

/// Resolves one family of `@keywords` relative to a component.
///
/// Resolvers form a chain: the first one that claims a keyword through
/// [`is_resolver_for_keyword`](Self::is_resolver_for_keyword) resolves it.
pub trait SearchKeywordResolver: Send + Sync {
	/// Whether this resolver handles `keyword` (without the `@`).
	fn is_resolver_for_keyword(&self, ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool;

	/// Components `keyword` refers to when evaluated at `current`.
	fn resolve(
		&self,
		ctx: &SearchExpressionContext<'_>,
		current: ComponentId,
		keyword: &str,
	) -> Vec<ComponentId>;

	/// Whether the keyword may be handed to the client unresolved.
	fn is_passthrough(&self, _ctx: &SearchExpressionContext<'_>, _keyword: &str) -> bool {
		false
	}

	/// Whether nothing may follow the keyword in a chained expression.
	fn is_leaf(&self, _ctx: &SearchExpressionContext<'_>, _keyword: &str) -> bool {
		false
	}
}

/// The chain used when no custom resolvers are registered.
pub fn builtin_resolvers() -> Vec<Box<dyn SearchKeywordResolver>> {
	vec![
		Box::new(ThisResolver),
		Box::new(ParentResolver),
		Box::new(FormResolver),
		Box::new(NamingContainerResolver),
		Box::new(CompositeResolver),
		Box::new(RootResolver),
		Box::new(AllResolver),
		Box::new(NoneResolver),
		Box::new(NextResolver),
		Box::new(PreviousResolver),
		Box::new(ChildResolver),
		Box::new(IdResolver),
	]
}

/// Extracts `arg` from `name(arg)`.
fn argument<'k>(keyword: &'k str, name: &str) -> Option<&'k str> {
	keyword
		.strip_prefix(name)?
		.strip_prefix('(')?
		.strip_suffix(')')
		.map(str::trim)
}

/// `@this`: the component itself.
#[derive(Debug, Clone, Copy)]
pub struct ThisResolver;

impl SearchKeywordResolver for ThisResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "this"
	}

	fn resolve(&self, _ctx: &SearchExpressionContext<'_>, current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		vec![current]
	}

	fn is_passthrough(&self, ctx: &SearchExpressionContext<'_>, _keyword: &str) -> bool {
		ctx.has_hint(SearchHint::ResolveClientSide)
	}
}

/// `@parent`: the direct parent.
#[derive(Debug, Clone, Copy)]
pub struct ParentResolver;

impl SearchKeywordResolver for ParentResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "parent"
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		ctx.tree().parent(current).into_iter().collect()
	}
}

/// `@form`: the closest enclosing form, the component itself included.
#[derive(Debug, Clone, Copy)]
pub struct FormResolver;

impl SearchKeywordResolver for FormResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "form"
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		ctx.tree().closest_form(current).into_iter().collect()
	}

	fn is_passthrough(&self, ctx: &SearchExpressionContext<'_>, _keyword: &str) -> bool {
		ctx.has_hint(SearchHint::ResolveClientSide)
	}
}

/// `@namingcontainer`: the closest naming container above the component.
#[derive(Debug, Clone, Copy)]
pub struct NamingContainerResolver;

impl SearchKeywordResolver for NamingContainerResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "namingcontainer"
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		ctx.tree()
			.closest(current, false, |n| n.kind().is_naming_container())
			.into_iter()
			.collect()
	}
}

/// `@composite`: the enclosing composite component.
///
/// While the tree is being built and `current` is a frame of the tree
/// creation stack, the frame below it is the answer. Otherwise the live tree
/// is walked.
#[derive(Debug, Clone, Copy)]
pub struct CompositeResolver;

impl SearchKeywordResolver for CompositeResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "composite"
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		let from_stack = ctx.composite_stacks().and_then(|stacks| {
			stacks
				.tree_creation()
				.frames()
				.contains(&current)
				.then(|| stacks.tree_creation_parent(current))
		});
		match from_stack {
			Some(parent) => parent.into_iter().collect(),
			None => ctx.tree().composite_parent(current).into_iter().collect(),
		}
	}
}

/// `@root`: the view root.
#[derive(Debug, Clone, Copy)]
pub struct RootResolver;

impl SearchKeywordResolver for RootResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "root"
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, _current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		vec![ctx.tree().root()]
	}
}

/// `@all`: the whole view. Resolves to the root on the server.
#[derive(Debug, Clone, Copy)]
pub struct AllResolver;

impl SearchKeywordResolver for AllResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "all"
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, _current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		vec![ctx.tree().root()]
	}

	fn is_passthrough(&self, _ctx: &SearchExpressionContext<'_>, _keyword: &str) -> bool {
		true
	}

	fn is_leaf(&self, _ctx: &SearchExpressionContext<'_>, _keyword: &str) -> bool {
		true
	}
}

/// `@none`: nothing.
#[derive(Debug, Clone, Copy)]
pub struct NoneResolver;

impl SearchKeywordResolver for NoneResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "none"
	}

	fn resolve(&self, _ctx: &SearchExpressionContext<'_>, _current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		Vec::new()
	}

	fn is_passthrough(&self, _ctx: &SearchExpressionContext<'_>, _keyword: &str) -> bool {
		true
	}

	fn is_leaf(&self, _ctx: &SearchExpressionContext<'_>, _keyword: &str) -> bool {
		true
	}
}

/// `@next`: the following sibling.
#[derive(Debug, Clone, Copy)]
pub struct NextResolver;

impl SearchKeywordResolver for NextResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "next"
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		ctx.tree().next_sibling(current).into_iter().collect()
	}
}

/// `@previous`: the preceding sibling.
#[derive(Debug, Clone, Copy)]
pub struct PreviousResolver;

impl SearchKeywordResolver for PreviousResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		keyword == "previous"
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, current: ComponentId, _keyword: &str) -> Vec<ComponentId> {
		ctx.tree().previous_sibling(current).into_iter().collect()
	}
}

/// `@child(n)`: the n-th child, zero based.
#[derive(Debug, Clone, Copy)]
pub struct ChildResolver;

impl SearchKeywordResolver for ChildResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		argument(keyword, "child").is_some_and(|n| n.parse::<usize>().is_ok())
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, current: ComponentId, keyword: &str) -> Vec<ComponentId> {
		argument(keyword, "child")
			.and_then(|n| n.parse::<usize>().ok())
			.and_then(|n| ctx.tree().children(current).get(n).copied())
			.into_iter()
			.collect()
	}
}

/// `@id(x)`: every component with local id `x` in the subtree of the
/// component, itself included.
#[derive(Debug, Clone, Copy)]
pub struct IdResolver;

impl SearchKeywordResolver for IdResolver {
	fn is_resolver_for_keyword(&self, _ctx: &SearchExpressionContext<'_>, keyword: &str) -> bool {
		argument(keyword, "id").is_some_and(|id| !id.is_empty())
	}

	fn resolve(&self, ctx: &SearchExpressionContext<'_>, current: ComponentId, keyword: &str) -> Vec<ComponentId> {
		let Some(id) = argument(keyword, "id") else {
			return Vec::new();
		};
		let tree = ctx.tree();
		let matches = tree
			.pre_order(current)
			.into_iter()
			.filter(|c| tree.node(*c).is_some_and(|n| n.id() == id));
		if ctx.has_hint(SearchHint::ResolveSingleComponent) {
			matches.take(1).collect()
		} else {
			matches.collect()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("child(2)", "child", Some("2"))]
	#[case("child( 2 )", "child", Some("2"))]
	#[case("id(name)", "id", Some("name"))]
	#[case("child", "child", None)]
	#[case("children(1)", "child", None)]
	#[case("id(x", "id", None)]
	fn test_argument(#[case] keyword: &str, #[case] name: &str, #[case] expected: Option<&str>) {
		assert_eq!(argument(keyword, name), expected);
	}
}
