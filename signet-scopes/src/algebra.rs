//! The scope algebra: meets of individual scopes and of scope collections.
//!
//! `combine` computes the effective intersection (the meet) of two scopes:
//! the most permissive scope that both inputs imply. Two scopes with no
//! common permission space have no meet. There is no total order here;
//! subsumption is a partial order and two scopes can be incomparable yet
//! still combinable, so every operation must be deterministic under input
//! reordering.

use crate::collection::ScopeCollection;
use crate::pattern::Scope;

/// The meet of two scopes, or `None` when they denote disjoint permission
/// spaces.
///
/// Equal scopes are their own meet. When exactly one pattern covers the
/// other's text, the narrower scope is the meet. Otherwise wildcard
/// unification is attempted in both directions: the wildcards of one side
/// are filled with the corresponding text of the other, which produces the
/// most specific literal-filled pattern both sides admit (neither original
/// pattern can express that intersection on its own).
pub fn combine(a: &Scope, b: &Scope) -> Option<Scope> {
    if a == b {
        return Some(a.clone());
    }
    let a_covers = a.allows(b);
    let b_covers = b.allows(a);
    match (a_covers, b_covers) {
        // Mutual textual cover between distinct normalized scopes is not
        // reachable with the matcher classes in `pattern`, but stay
        // deterministic if it ever happens.
        (true, true) => Some(a.min(b).clone()),
        (true, false) => Some(b.clone()),
        (false, true) => Some(a.clone()),
        (false, false) => unify(a, b).or_else(|| unify(b, a)),
    }
}

/// Fill `template`'s wildcard segments with the text they capture from
/// `subject`, then check the result against `subject`'s own pattern.
fn unify(template: &Scope, subject: &Scope) -> Option<Scope> {
    let captures = template.unifier().captures(subject.as_str())?;
    let mut group = 0;
    let mut domains = Vec::with_capacity(3);
    for domain in template.as_str().split(':') {
        let mut segments = Vec::new();
        for segment in domain.split('.') {
            if segment.bytes().all(|b| b == b'*') {
                group += 1;
                let captured = captures.get(group)?.as_str();
                if captured.is_empty() {
                    return None;
                }
                // A `*` slot must not widen into a captured `**`.
                if segment == "*" && captured.contains('*') {
                    segments.push("*".to_string());
                } else {
                    segments.push(captured.to_string());
                }
            } else {
                segments.push(segment.to_string());
            }
        }
        domains.push(segments.join("."));
    }
    let candidate = Scope::parse(&domains.join(":")).ok()?;
    subject.allows(&candidate).then_some(candidate)
}

/// Pairwise meet of two collections: every combinable `(a, b)` pair
/// contributes its meet, and the result is reduced to an antichain.
pub fn combine_collections(a: &ScopeCollection, b: &ScopeCollection) -> ScopeCollection {
    let mut out = ScopeCollection::new();
    for x in a.iter() {
        for y in b.iter() {
            if let Some(met) = combine(x, y) {
                out.insert(met);
            }
        }
    }
    out.simplified()
}
