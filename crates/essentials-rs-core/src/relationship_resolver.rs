//! Working out which packages must be installed alongside the user's picks.
//!
//! # Usage
//! 1. Index manifests into a [`ManifestIndex`](crate::ManifestIndex).
//! 1. Call [`compute_forced()`] with the visible repositories and the user's choices.
//! 1. Merge the result with the choices through [`effective_selection()`](crate::selection::effective_selection).
//!
//! Resolution only reads the index. It never fetches, so it is cheap enough to rerun
//! on every toggle or filter change. Dependencies are matched by exact identifier;
//! versions are not considered.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::config::starts_with_ignore_case;
use crate::metadb::ManifestIndex;

/// Repositories that have to be installed because something the user picked depends
/// on them, directly or transitively. Never contains a user-selected repository.
///
/// `visible` and `user_selected` correspond by index; extra entries in the longer one
/// are ignored.
pub fn compute_forced(visible: &[String], user_selected: &[bool], manifests: &ManifestIndex, namespace: &str) -> BTreeSet<String> {
	compute_forced_sources(visible, user_selected, manifests, namespace).into_keys().collect()
}

/// Like [`compute_forced()`] but also names, for each forced repository, the
/// repository whose dependency first reached it in breadth first order.
pub fn compute_forced_sources(visible: &[String], user_selected: &[bool], manifests: &ManifestIndex, namespace: &str) -> BTreeMap<String, String> {
	let roots: Vec<&str> = visible.iter()
		.zip(user_selected)
		.filter(|(_, selected)| **selected)
		.map(|(name, _)| name.as_str())
		.collect();
	let user_set: HashSet<&str> = roots.iter().copied().collect();

	let mut forced = BTreeMap::<String, String>::new();
	if roots.is_empty() {
		return forced;
	}

	/* Breadth first over dependency edges. Each repository is queued at most once so cycles terminate. */
	let mut visited: HashSet<&str> = user_set.clone();
	let mut queue: VecDeque<&str> = roots.into_iter().collect();

	while let Some(current) = queue.pop_front() {
		/* Unindexed or unavailable manifests are dead ends */
		let meta = match manifests.meta(current) {
			Some(m) => m,
			None => continue,
		};

		for dependency in &meta.dependencies {
			if dependency.is_empty() || !starts_with_ignore_case(dependency, namespace) {
				continue;
			}

			/* Nothing publishes this identifier yet, or the publisher is private. Not an error. */
			let target = match manifests.identifiers().repository_for(dependency) {
				Some(t) if !t.is_empty() => t,
				_ => continue,
			};

			if target == current {
				continue;
			}

			if !user_set.contains(target) && !forced.contains_key(target) {
				log::trace!("{} forced by {} through {}", target, current, dependency);
				forced.insert(target.to_string(), current.to_string());
			}

			if visited.insert(target) {
				queue.push_back(target);
			}
		}
	}

	forced.retain(|repository, _| !user_set.contains(repository.as_str()));
	forced
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::metadb::{ManifestError, PackageMeta};

	const NS: &str = "com.unityessentials.";

	fn index(packages: &[(&str, &str, &[&str])]) -> ManifestIndex {
		let mut index = ManifestIndex::default();
		for (repository, identifier, dependencies) in packages {
			index.record(repository, Ok(PackageMeta {
				identifier: identifier.to_string(),
				dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
			}));
		}
		index
	}

	fn names(names: &[&str]) -> Vec<String> {
		names.iter().map(|n| n.to_string()).collect()
	}

	fn set(names: &[&str]) -> BTreeSet<String> {
		names.iter().map(|n| n.to_string()).collect()
	}

	#[test]
	fn transitive_chain() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.b"]),
			("B", "com.unityessentials.b", &["com.unityessentials.c"]),
			("C", "com.unityessentials.c", &[]),
		]);
		let visible = names(&["A", "B", "C"]);
		let forced = compute_forced(&visible, &[true, false, false], &manifests, NS);
		assert_eq!(forced, set(&["B", "C"]));
	}

	#[test]
	fn cycle_terminates() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.b"]),
			("B", "com.unityessentials.b", &["com.unityessentials.a"]),
		]);
		let visible = names(&["A", "B"]);
		assert_eq!(compute_forced(&visible, &[true, false], &manifests, NS), set(&["B"]));
	}

	#[test]
	fn selected_dependency_is_not_forced() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.b"]),
			("B", "com.unityessentials.b", &["com.unityessentials.c"]),
			("C", "com.unityessentials.c", &[]),
		]);
		let visible = names(&["A", "B", "C"]);
		let forced = compute_forced(&visible, &[true, true, false], &manifests, NS);
		assert_eq!(forced, set(&["C"]));
	}

	#[test]
	fn outside_namespace_is_ignored() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unity.textmeshpro", "com.other.b"]),
			("B", "com.other.b", &[]),
		]);
		let visible = names(&["A", "B"]);
		assert!(compute_forced(&visible, &[true, false], &manifests, NS).is_empty());
	}

	#[test]
	fn namespace_ignores_case() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["COM.UnityEssentials.B"]),
			("B", "COM.UnityEssentials.B", &[]),
		]);
		let visible = names(&["A", "B"]);
		assert_eq!(compute_forced(&visible, &[true, false], &manifests, NS), set(&["B"]));
	}

	#[test]
	fn unresolved_dependency_is_silent() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.private"]),
		]);
		let visible = names(&["A"]);
		assert!(compute_forced(&visible, &[true], &manifests, NS).is_empty());
	}

	#[test]
	fn malformed_dependency_manifest_is_never_forced() {
		let mut manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.c"]),
		]);
		manifests.record("C", Err(ManifestError::Malformed("expected value".to_string())));
		let visible = names(&["A", "C"]);
		assert!(compute_forced(&visible, &[true, false], &manifests, NS).is_empty());
	}

	#[test]
	fn self_dependency_is_skipped() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.a"]),
		]);
		let visible = names(&["A"]);
		assert!(compute_forced(&visible, &[true], &manifests, NS).is_empty());
	}

	#[test]
	fn hidden_dependency_is_forced() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.b"]),
			("B", "com.unityessentials.b", &[]),
		]);
		/* B is filtered out of the visible list but still has to be installed */
		let visible = names(&["A"]);
		assert_eq!(compute_forced(&visible, &[true], &manifests, NS), set(&["B"]));
	}

	#[test]
	fn nothing_selected() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.b"]),
			("B", "com.unityessentials.b", &[]),
		]);
		let visible = names(&["A", "B"]);
		assert!(compute_forced(&visible, &[false, false], &manifests, NS).is_empty());
	}

	#[test]
	fn mismatched_lengths_use_shorter() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.b"]),
			("B", "com.unityessentials.b", &[]),
		]);
		let visible = names(&["A", "B"]);
		assert_eq!(compute_forced(&visible, &[true], &manifests, NS), set(&["B"]));
		assert!(compute_forced(&names(&[]), &[true, true], &manifests, NS).is_empty());
	}

	#[test]
	fn repeated_calls_agree() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.b", "com.unityessentials.c"]),
			("B", "com.unityessentials.b", &["com.unityessentials.d"]),
			("C", "com.unityessentials.c", &["com.unityessentials.d"]),
			("D", "com.unityessentials.d", &["com.unityessentials.a"]),
		]);
		let visible = names(&["A", "B", "C", "D"]);
		let first = compute_forced(&visible, &[true, false, false, false], &manifests, NS);
		let second = compute_forced(&visible, &[true, false, false, false], &manifests, NS);
		assert_eq!(first, second);
		assert_eq!(first, set(&["B", "C", "D"]));
	}

	#[test]
	fn sources_name_first_requirer() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.b"]),
			("B", "com.unityessentials.b", &["com.unityessentials.c"]),
			("C", "com.unityessentials.c", &[]),
			("X", "com.unityessentials.x", &["com.unityessentials.c"]),
		]);
		let visible = names(&["A", "B", "C", "X"]);
		let sources = compute_forced_sources(&visible, &[true, false, false, true], &manifests, NS);
		assert_eq!(sources.get("B").map(String::as_str), Some("A"));
		/* X is a root so it is processed before B */
		assert_eq!(sources.get("C").map(String::as_str), Some("X"));
	}

	#[test]
	fn duplicate_identifier_resolves_to_first() {
		let manifests = index(&[
			("A", "com.unityessentials.a", &["com.unityessentials.core"]),
			("Core", "com.unityessentials.core", &[]),
			("CoreFork", "com.unityessentials.core", &[]),
		]);
		let visible = names(&["A", "Core", "CoreFork"]);
		assert_eq!(compute_forced(&visible, &[true, false, false], &manifests, NS), set(&["Core"]));
	}
}
